//! Bounded retry for model calls
//!
//! Attempts run back to back without delay. The caller decides what
//! to fall back to when every attempt has failed.

use std::fmt::Display;
use std::future::Future;

use tracing::{error, info, warn};

use crate::error::IntelligenceError;

/// Runs `attempt` up to `max_attempts` times (at least once) and returns
/// the first success.
pub async fn with_retries<T, E, F, Fut>(
    operation: &'static str,
    max_attempts: usize,
    mut attempt: F,
) -> Result<T, IntelligenceError>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = max_attempts.max(1);
    let mut last_error = String::new();

    for attempt_number in 1..=max_attempts {
        info!(
            "Attempt {}/{}: sending {} request",
            attempt_number, max_attempts, operation
        );
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(
                    "{} attempt {}/{} failed: {}",
                    operation, attempt_number, max_attempts, e
                );
                last_error = e.to_string();
            }
        }
    }

    error!("All {} attempts failed", operation);
    Err(IntelligenceError::Exhausted {
        operation,
        attempts: max_attempts,
        last_error,
    })
}
