//! Retry logic for transient SOAP errors.
//!
//! Provides exponential backoff for SOAP requests that fail with
//! transient faults (701, 714, 716) or timeouts.

use std::future::Future;
use std::time::Duration;

use super::soap::{SoapError, SoapResult};

/// Retry delays for transient SOAP errors (exponential backoff).
const RETRY_DELAYS_MS: [u64; 3] = [200, 500, 1000];

/// Executes a SOAP operation with retry logic for transient errors.
///
/// Retries on transient SOAP faults and timeouts with exponential backoff
/// (200ms, 500ms, 1000ms). Non-transient errors return immediately.
///
/// # Arguments
/// * `action` - Action name for logging
/// * `operation` - Closure that performs the SOAP request
pub(crate) async fn with_retry<T, F, Fut>(action: &str, mut operation: F) -> SoapResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SoapResult<T>>,
{
    let mut last_error: Option<SoapError> = None;
    for (attempt, &delay_ms) in std::iter::once(&0)
        .chain(RETRY_DELAYS_MS.iter())
        .enumerate()
    {
        if attempt > 0 {
            log::info!(
                "[Sonos] Retrying {} (attempt {}/{}) after {}ms",
                action,
                attempt + 1,
                RETRY_DELAYS_MS.len() + 1,
                delay_ms
            );
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        match operation().await {
            Ok(r) => return Ok(r),
            Err(e) if e.is_transient() => {
                log::warn!("[Sonos] {} transient error: {}", action, e);
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or(SoapError::Parse))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fault(code: u16) -> SoapError {
        SoapError::Fault {
            code: Some(code),
            description: String::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicUsize::new(0);
        let result = with_retry("Play", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(fault(701))
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_all_delays() {
        let calls = AtomicUsize::new(0);
        let result: SoapResult<()> = with_retry("Play", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(fault(716)) }
        })
        .await;

        assert_eq!(result.unwrap_err().fault_code(), Some(716));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_fault_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: SoapResult<()> = with_retry("Seek", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(fault(402)) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
