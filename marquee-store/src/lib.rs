pub mod app_config;
pub mod database;
pub mod retry;
pub mod seat_repo;

pub use database::DbClient;
pub use retry::RetryStrategy;
pub use seat_repo::PostgresSeatStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("Seat not found: {0}")]
    SeatNotFound(uuid::Uuid),
}
