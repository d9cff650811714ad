use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::types::{ChatError, ChatResult};

/// Bound a store operation. Expiry drops the future, which rolls back any open transaction.
pub async fn with_timeout<T, F>(limit: Duration, operation: &'static str, future: F) -> ChatResult<T>
where
    F: Future<Output = ChatResult<T>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, timeout_ms = limit.as_millis() as u64, "store operation timed out");
            Err(ChatError::store_unavailable(format!(
                "{operation} did not finish within {}ms",
                limit.as_millis()
            )))
        }
    }
}
