use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};

use super::{ReservationStore, StoreOps};
use crate::error::StoreError;
use crate::models::{NewReservation, Reservation};
use crate::schema::reservations;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// Reservations kept in PostgreSQL, accessed through an r2d2 pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder().max_size(max_connections).build(manager)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

enum TxError<E> {
    Database(diesel::result::Error),
    Op(E),
}

impl<E> From<diesel::result::Error> for TxError<E> {
    fn from(err: diesel::result::Error) -> Self {
        TxError::Database(err)
    }
}

impl ReservationStore for PgStore {
    fn read<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut dyn StoreOps) -> Result<T, StoreError>,
    {
        let mut conn = self.pool.get()?;
        f(&mut *conn)
    }

    fn atomically<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn StoreOps) -> Result<T, E>,
    {
        let mut pooled = self.pool.get().map_err(StoreError::from)?;
        let conn: &mut PgConnection = &mut pooled;

        conn.transaction::<T, TxError<E>, _>(|conn| {
            // Self-conflicting lock: concurrent admissions queue here and each one
            // sees every row committed before it.
            diesel::sql_query("LOCK TABLE reservations IN SHARE ROW EXCLUSIVE MODE")
                .execute(conn)?;
            f(conn).map_err(TxError::Op)
        })
        .map_err(|e| match e {
            TxError::Database(err) => E::from(StoreError::from(err)),
            TxError::Op(err) => err,
        })
    }
}

impl StoreOps for PgConnection {
    fn insert(&mut self, new: &NewReservation) -> Result<Reservation, StoreError> {
        let reservation = diesel::insert_into(reservations::table)
            .values(new)
            .returning(Reservation::as_returning())
            .get_result(self)?;

        Ok(reservation)
    }

    fn delete_by_id(&mut self, reservation_id: i32) -> Result<bool, StoreError> {
        let deleted = diesel::delete(reservations::table.find(reservation_id)).execute(self)?;

        Ok(deleted > 0)
    }

    fn find_by_id(&mut self, reservation_id: i32) -> Result<Option<Reservation>, StoreError> {
        let reservation = reservations::table
            .find(reservation_id)
            .select(Reservation::as_select())
            .first(self)
            .optional()?;

        Ok(reservation)
    }

    fn query_by_slot(&mut self, slot_id: &str) -> Result<Vec<Reservation>, StoreError> {
        let rows = reservations::table
            .filter(reservations::slot_id.eq(slot_id))
            .order(reservations::start_at.asc())
            .select(Reservation::as_select())
            .load(self)?;

        Ok(rows)
    }

    fn query_by_user(&mut self, user_id: &str) -> Result<Vec<Reservation>, StoreError> {
        let rows = reservations::table
            .filter(reservations::user_id.eq(user_id))
            .order(reservations::start_at.asc())
            .select(Reservation::as_select())
            .load(self)?;

        Ok(rows)
    }

    fn query_all(&mut self) -> Result<Vec<Reservation>, StoreError> {
        let rows = reservations::table
            .order((reservations::start_at.asc(), reservations::reservation_id.asc()))
            .select(Reservation::as_select())
            .load(self)?;

        Ok(rows)
    }
}
