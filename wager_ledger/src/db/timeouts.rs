//! Database timeout helpers
//!
//! Bounds statement execution and row-lock waits so a stuck connection or a
//! long-held lock surfaces as an error instead of an indefinite hang.

use std::time::Duration;
use tokio::time::timeout;

/// Default timeout for a single statement (5 seconds)
pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time a transaction waits for a row lock (3 seconds)
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(3);

/// Error type for timeout operations
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    /// Statement timed out
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Row lock was not granted in time
    #[error("Row lock wait timed out after {0:?}")]
    LockWait(Duration),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for timeout operations
pub type TimeoutResult<T> = Result<T, TimeoutError>;

/// Execute a query with timeout
///
/// # Arguments
///
/// * `duration` - Timeout duration
/// * `future` - Async operation to execute
///
/// # Returns
///
/// * `TimeoutResult<T>` - Result or timeout error
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> TimeoutResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(TimeoutError::Database(e)),
        Err(_) => Err(TimeoutError::Timeout(duration)),
    }
}

/// Wait for a lock acquisition future, giving up after `duration`
pub async fn with_lock_timeout<F, T>(duration: Duration, future: F) -> TimeoutResult<T>
where
    F: std::future::Future<Output = T>,
{
    timeout(duration, future)
        .await
        .map_err(|_| TimeoutError::LockWait(duration))
}
