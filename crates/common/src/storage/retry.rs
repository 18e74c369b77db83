use std::future::Future;

use crate::hub::HubConfig;

use super::StorageError;

/// Run `op` against `config`, and if it fails with a recoverable error, get a
/// fresh config from `reconnect` and run `op` exactly once more.
///
/// The retry sees only the config `reconnect` produced. A second failure is
/// returned as-is.
pub async fn with_reconnect<R, Op, OpFut, Re, ReFut>(
    operation: &str,
    config: HubConfig,
    mut op: Op,
    reconnect: Re,
) -> Result<R, StorageError>
where
    Op: FnMut(HubConfig) -> OpFut,
    OpFut: Future<Output = Result<R, StorageError>>,
    Re: FnOnce() -> ReFut,
    ReFut: Future<Output = Result<HubConfig, StorageError>>,
{
    match op(config).await {
        Err(e) if e.is_recoverable() => {
            tracing::warn!(
                "{}: {}; reconnecting to hub and retrying once",
                operation,
                e
            );
            let fresh = reconnect().await?;
            op(fresh).await
        }
        result => result,
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn config(token: &str) -> HubConfig {
        HubConfig {
            address: "1A".into(),
            url_prefix: "https://gaia.example.com/".into(),
            token: token.into(),
            server: "https://hub.example.com".into(),
            max_file_upload_size_megabytes: None,
        }
    }

    fn unauthorized() -> StorageError {
        StorageError::Unauthorized("upload".into())
    }

    #[tokio::test]
    async fn test_retries_once_with_fresh_config() {
        let seen = parking_lot::Mutex::new(Vec::new());
        let reconnects = AtomicUsize::new(0);
        let reconnects = &reconnects;

        let result = with_reconnect(
            "upload",
            config("stale"),
            |config| {
                seen.lock().push(config.token.clone());
                async move {
                    if config.token == "stale" {
                        Err(unauthorized())
                    } else {
                        Ok(config.token)
                    }
                }
            },
            || async move {
                reconnects.fetch_add(1, Ordering::SeqCst);
                Ok(config("fresh"))
            },
        )
        .await
        .unwrap();

        assert_eq!(result, "fresh");
        assert_eq!(*seen.lock(), vec!["stale", "fresh"]);
        assert_eq!(reconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_failure_surfaces() {
        let attempts = AtomicUsize::new(0);
        let result: Result<(), _> = with_reconnect(
            "upload",
            config("stale"),
            |_| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(unauthorized()) }
            },
            || async { Ok(config("fresh")) },
        )
        .await;

        assert!(matches!(result, Err(StorageError::Unauthorized(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unrecoverable_error_is_not_retried() {
        let attempts = AtomicUsize::new(0);
        let reconnects = AtomicUsize::new(0);
        let reconnects = &reconnects;
        let result: Result<(), _> = with_reconnect(
            "delete",
            config("t"),
            |_| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(StorageError::DoesNotExist("a.txt".into())) }
            },
            || async move {
                reconnects.fetch_add(1, Ordering::SeqCst);
                Ok(config("fresh"))
            },
        )
        .await;

        assert!(matches!(result, Err(StorageError::DoesNotExist(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(reconnects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_reconnect_surfaces() {
        let result: Result<(), _> = with_reconnect(
            "list_files",
            config("t"),
            |_| async { Err(unauthorized()) },
            || async { Err(StorageError::InvalidParameter("no hub".into())) },
        )
        .await;
        assert!(matches!(result, Err(StorageError::InvalidParameter(_))));
    }
}
