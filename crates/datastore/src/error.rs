use common::ProductId;
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional stock decrement affected zero rows: the product was
    /// concurrently exhausted (or does not exist) between the read check
    /// and the write. The surrounding transaction has been rolled back.
    #[error("stock conflict on product {product_id}: conditional decrement affected no rows")]
    StockConflict { product_id: ProductId },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
