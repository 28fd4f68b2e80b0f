//! Store errors.

/// A failed table operation.
///
/// Accumulators log these and drop the batch; a failed reset skips the
/// connection cycle.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A statement failed.
    #[error("query failed: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Creating the mirror tables failed.
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The in-memory table was told to fail this operation.
    #[cfg(any(test, feature = "test-util"))]
    #[error("injected failure during {operation}")]
    Injected {
        /// The operation that failed.
        operation: &'static str,
    },
}
