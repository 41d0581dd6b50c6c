use std::future::Future;
use std::time::Duration;

use storage::repository::StorageError;

/// Outcome of a store call bounded by a timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCallError {
    Storage(StorageError),
    Timeout,
}

/// Await `call`, giving up after `limit`.
pub(crate) async fn within<T, F>(limit: Duration, call: F) -> Result<T, StoreCallError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(StoreCallError::Storage),
        Err(_elapsed) => Err(StoreCallError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, StorageError>(1)
        };
        assert_eq!(
            within(Duration::from_secs(1), slow).await,
            Err(StoreCallError::Timeout)
        );
    }

    #[tokio::test]
    async fn storage_errors_pass_through() {
        let failing = async { Err::<u8, _>(StorageError::NotFound) };
        assert_eq!(
            within(Duration::from_secs(1), failing).await,
            Err(StoreCallError::Storage(StorageError::NotFound))
        );
    }
}
