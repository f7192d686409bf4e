use std::io;

use actix_web::{middleware, web, App, HttpServer};
use parking_reservations::{routes, Config, PgStore, ReservationEngine};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    // initialize DB pool outside of `HttpServer::new` so that it is shared across all workers
    let store = PgStore::connect(&config.database_url, config.max_connections).map_err(|e| {
        log::error!("Failed to connect to database: {}", e);
        io::Error::other(e)
    })?;

    log::info!(
        "booking policy: one booking per user = {}, same-time exit = {:?}",
        config.policy.one_booking_per_user,
        config.policy.same_time_exit
    );

    let engine = web::Data::new(ReservationEngine::new(store, config.policy));

    log::info!("starting HTTP server at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(engine.clone())
            .app_data(routes::json_config())
            .wrap(middleware::Logger::default())
            .configure(routes::configure::<PgStore>)
    })
    .bind((config.host.clone(), config.port))?
    .run()
    .await
}
