//! Structured logging configuration.
//!
//! Library code logs through the `log` facade; the subscriber installed here
//! bridges those records into `tracing` so both end up on stderr.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var. Output goes to
/// stderr so command results on stdout stay machine-readable.
///
/// # Example
///
/// ```no_run
/// wl_cli::logging::init();
/// tracing::info!("Ledger starting");
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::debug!("Structured logging initialized");
}

/// Log a completed balance mutation
///
/// # Arguments
///
/// * `command` - CLI command that triggered the mutation
/// * `account_id` - Account that was mutated
/// * `amount` - Signed change applied to the balance
/// * `balance` - Balance after commit
pub fn log_mutation(command: &str, account_id: i64, amount: &str, balance: &str) {
    tracing::info!(
        command = command,
        account_id = account_id,
        amount = amount,
        balance = balance,
        "Mutation committed"
    );
}

/// Log performance metric
///
/// Anything slower than a second is reported at warn level; a healthy
/// ledger call is a handful of milliseconds.
///
/// # Example
///
/// ```
/// use std::time::Instant;
/// use wl_cli::logging::log_performance;
///
/// let start = Instant::now();
/// // ... do work ...
/// let duration = start.elapsed().as_millis() as u64;
/// log_performance("withdraw", duration, Some("account 7"));
/// ```
pub fn log_performance(operation: &str, duration_ms: u64, metadata: Option<&str>) {
    if duration_ms > 1000 {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            metadata = metadata,
            "PERFORMANCE: Slow operation"
        );
    } else {
        tracing::debug!(
            operation = operation,
            duration_ms = duration_ms,
            metadata = metadata,
            "Performance metric"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_mutation() {
        // Just ensure it doesn't panic
        log_mutation("deposit", 1, "+10.00", "10.00");
        log_mutation("withdraw", 1, "-2.50", "7.50");
    }

    #[test]
    fn test_log_performance() {
        log_performance("wager", 5, Some("account 1"));
        log_performance("slow_wager", 2000, None);
    }
}
