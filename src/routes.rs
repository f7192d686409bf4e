use std::sync::LazyLock;

use actix_web::{error, web, HttpResponse, Responder};
use chrono::Local;
use regex::Regex;

use crate::engine::ReservationEngine;
use crate::error::{BookingError, CancelError, StoreError};
use crate::interval::{parse_date, parse_time, parse_timestamp, truncate_to_minute};
use crate::models::{
    ApiResponse, AvailabilityQuery, AvailableSlotsResponse, BookSlotRequest, CancelRequest,
    CancelResponse, WindowQuery,
};
use crate::slots::SLOTS;
use crate::store::ReservationStore;

static USER_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]{1,64}$").expect("user id pattern is valid"));

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiResponse {
        message: message.to_string(),
    })
}

fn booking_error_response(err: &BookingError) -> HttpResponse {
    let body = ApiResponse {
        message: err.to_string(),
    };
    match err {
        BookingError::InvalidSlot(_) | BookingError::InvalidInterval { .. } => {
            HttpResponse::BadRequest().json(body)
        }
        BookingError::SlotConflict(_) | BookingError::UserConflict(_) => {
            HttpResponse::Conflict().json(body)
        }
        BookingError::Store(_) => store_error_response(),
    }
}

fn cancel_error_response(err: &CancelError) -> HttpResponse {
    let body = ApiResponse {
        message: err.to_string(),
    };
    match err {
        CancelError::NotFound(_) => HttpResponse::NotFound().json(body),
        CancelError::NotOwner(_) => HttpResponse::Forbidden().json(body),
        CancelError::Store(_) => store_error_response(),
    }
}

fn store_error_response() -> HttpResponse {
    HttpResponse::InternalServerError().json(ApiResponse {
        message: "reservation store unavailable".to_string(),
    })
}

async fn list_slots() -> impl Responder {
    HttpResponse::Ok().json(SLOTS)
}

async fn available_slots<S: ReservationStore + 'static>(
    engine: web::Data<ReservationEngine<S>>,
    query: web::Query<WindowQuery>,
) -> actix_web::Result<impl Responder> {
    let Some(date) = parse_date(&query.date) else {
        return Ok(bad_request("date should be formatted as YYYY-MM-DD"));
    };
    let (Some(entry), Some(exit)) = (parse_time(&query.entry_time), parse_time(&query.exit_time))
    else {
        return Ok(bad_request("entry_time and exit_time should be formatted as HH:MM"));
    };

    let response = web::block(move || {
        let window = engine.normalize(date, entry, exit)?;
        let slots = engine.available_slots(&window)?;
        Ok::<_, BookingError>(AvailableSlotsResponse { window, slots })
    })
    .await?
    .map_err(|e| {
        log::warn!("Failed to list available slots: {:?}", e);
        let response = booking_error_response(&e);
        error::InternalError::from_response(e, response)
    })?;

    Ok(HttpResponse::Ok().json(response))
}

async fn availability<S: ReservationStore + 'static>(
    engine: web::Data<ReservationEngine<S>>,
    query: web::Query<AvailabilityQuery>,
) -> actix_web::Result<impl Responder> {
    let query = query.into_inner();

    let at = match query.at.as_deref() {
        None => truncate_to_minute(Local::now().naive_local()),
        Some(raw) => match parse_timestamp(raw) {
            Some(at) => at,
            None => return Ok(bad_request("at should be formatted as YYYY-MM-DD HH:MM")),
        },
    };

    if let Some(user_id) = query.user_id.as_deref() {
        if !USER_ID_RE.is_match(user_id) {
            return Ok(bad_request("user_id should be Alphanumeric with no special characters"));
        }
    }

    let snapshot = web::block(move || engine.availability(at, query.user_id.as_deref()))
        .await?
        .map_err(|e: StoreError| {
            log::error!("Failed to compute availability: {:?}", e);
            error::InternalError::from_response(e, store_error_response())
        })?;

    Ok(HttpResponse::Ok().json(snapshot))
}

async fn book_slot<S: ReservationStore + 'static>(
    engine: web::Data<ReservationEngine<S>>,
    form: web::Json<BookSlotRequest>,
) -> actix_web::Result<impl Responder> {
    let form = form.into_inner();

    if !USER_ID_RE.is_match(&form.user_id) {
        return Ok(bad_request("user_id should be Alphanumeric with no special characters"));
    }
    let Some(date) = parse_date(&form.date) else {
        return Ok(bad_request("date should be formatted as YYYY-MM-DD"));
    };
    let Some(entry) = parse_time(&form.entry_time) else {
        return Ok(bad_request("entry_time should be formatted as HH:MM"));
    };
    let Some(exit) = parse_time(&form.exit_time) else {
        return Ok(bad_request("exit_time should be formatted as HH:MM"));
    };

    let reservation = web::block(move || {
        let range = engine.normalize(date, entry, exit)?;
        engine.book(&form.user_id, &form.slot_id, range.start(), range.end())
    })
    .await?
    .map_err(|e| {
        log::warn!("Failed to book slot: {}", e);
        let response = booking_error_response(&e);
        error::InternalError::from_response(e, response)
    })?;

    Ok(HttpResponse::Created().json(reservation))
}

async fn cancel_reservation<S: ReservationStore + 'static>(
    engine: web::Data<ReservationEngine<S>>,
    form: web::Json<CancelRequest>,
) -> actix_web::Result<impl Responder> {
    let form = form.into_inner();

    if !USER_ID_RE.is_match(&form.user_id) {
        return Ok(bad_request("user_id should be Alphanumeric with no special characters"));
    }

    let cancellation = web::block(move || engine.cancel(form.reservation_id, &form.user_id))
        .await?
        .map_err(|e| {
            log::warn!("Failed to cancel reservation: {}", e);
            let response = cancel_error_response(&e);
            error::InternalError::from_response(e, response)
        })?;

    let message = if cancellation.early_termination {
        format!(
            "Parking session on slot {} ended early",
            cancellation.reservation.slot_id
        )
    } else {
        format!(
            "Reservation for slot {} cancelled",
            cancellation.reservation.slot_id
        )
    };

    Ok(HttpResponse::Ok().json(CancelResponse {
        message,
        early_termination: cancellation.early_termination,
    }))
}

async fn user_reservations<S: ReservationStore + 'static>(
    engine: web::Data<ReservationEngine<S>>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let user_id = path.into_inner();

    if !USER_ID_RE.is_match(&user_id) {
        return Ok(bad_request("user_id should be Alphanumeric with no special characters"));
    }

    let now = truncate_to_minute(Local::now().naive_local());
    let rows = web::block(move || engine.reservations_for_user(&user_id, now))
        .await?
        .map_err(|e| {
            log::error!("Failed to list reservations: {:?}", e);
            error::InternalError::from_response(e, store_error_response())
        })?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Turns malformed JSON bodies into `{"message": ...}` responses.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let detail = err.to_string();
        let response = match err {
            error::JsonPayloadError::ContentType => {
                HttpResponse::UnsupportedMediaType().body("Unsupported Media Type")
            }
            error::JsonPayloadError::Deserialize(ref err) => {
                HttpResponse::BadRequest().json(ApiResponse {
                    message: err.to_string(),
                })
            }
            _ => HttpResponse::BadRequest().json(ApiResponse { message: detail }),
        };
        error::InternalError::from_response(err, response).into()
    })
}

/// Registers every endpoint for an engine backed by `S`.
pub fn configure<S: ReservationStore + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/slots").route(web::get().to(list_slots)))
        .service(web::resource("/slots/available").route(web::get().to(available_slots::<S>)))
        .service(web::resource("/availability").route(web::get().to(availability::<S>)))
        .service(web::resource("/book").route(web::post().to(book_slot::<S>)))
        .service(web::resource("/cancel").route(web::post().to(cancel_reservation::<S>)))
        .service(
            web::resource("/users/{user_id}/reservations")
                .route(web::get().to(user_reservations::<S>)),
        );
}
