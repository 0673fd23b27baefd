//! Deadlines for remote calls
//!
//! Every call that leaves the process (federation store, member cluster API)
//! goes through [`with_timeout`] so a hung peer costs at most one call
//! timeout instead of stalling a whole pass.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::Error;

/// Run `operation`, failing with `on_elapsed()` if it exceeds `limit`
///
/// A zero `limit` disables the deadline.
pub async fn with_timeout<T, Fut, E>(
    limit: Duration,
    operation_name: &str,
    operation: Fut,
    on_elapsed: E,
) -> Result<T, Error>
where
    Fut: Future<Output = Result<T, Error>>,
    E: FnOnce(String) -> Error,
{
    if limit.is_zero() {
        return operation.await;
    }

    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                operation = %operation_name,
                timeout_ms = limit.as_millis(),
                "Remote call timed out"
            );
            Err(on_elapsed(format!(
                "{operation_name} timed out after {}s",
                limit.as_secs_f64()
            )))
        }
    }
}
