//! Store error types.

use crate::domain::DomainError;

/// Errors from the relational store.
///
/// Mostly infrastructure failures. Business-rule rejections on rides and
/// bookings are reported through their own error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Query or connection failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Embedded migrations failed to apply
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Input rejected before it was written
    #[error("invalid input: {0}")]
    Invalid(#[source] DomainError),

    /// A row holds a value the domain does not accept
    #[error("corrupt row in {table}: {source}")]
    Corrupt {
        table: &'static str,
        #[source]
        source: DomainError,
    },
}

impl StoreError {
    pub(crate) fn corrupt(table: &'static str) -> impl FnOnce(DomainError) -> StoreError {
        move |source| StoreError::Corrupt { table, source }
    }
}
