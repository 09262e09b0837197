use sqlx::{Error as DbError, postgres::PgRow};

mod collection;
mod database;
mod synclient;

pub use database::PostgresStore;

/// Row type that can rebuild itself from a Postgres row.
pub trait DbRow {
    fn id(&self) -> &str;
    fn from_row(row: &PgRow) -> std::result::Result<Self, DbError>
    where
        Self: Sized;
}

/// Collection that creates its own table and indexes.
pub trait DbInit {
    fn init(&self);
}
