//! Retry wrapper for `ProviderDriver::initiate_call` (spec §7): transient
//! errors get up to two retries with exponential backoff, 200ms then 1s.
//! Every other `ProviderDriver` operation, and every non-transient error
//! here, is not retried.

use crate::driver::ProviderDriver;
use crate::error::{ProviderError, Result};
use crate::types::InitiateCallResult;
use std::time::Duration;

const BACKOFF: [Duration; 2] = [Duration::from_millis(200), Duration::from_secs(1)];

/// Calls `driver.initiate_call(...)`, retrying up to `BACKOFF.len()` times
/// if the error is transient (`Timeout`, `NetworkError`, or a 5xx from the
/// carrier). Non-transient errors (`AuthFailed`, `InvalidTo`, `InvalidFrom`,
/// `RateLimited`, ...) return immediately on the first attempt.
pub async fn initiate_call_with_retry(
    driver: &dyn ProviderDriver,
    to_e164: &str,
    from_e164: &str,
    media_callback_url: &str,
    status_callback_url: &str,
) -> Result<InitiateCallResult> {
    let mut attempt = 0usize;
    loop {
        match driver.initiate_call(to_e164, from_e164, media_callback_url, status_callback_url).await {
            Ok(result) => return Ok(result),
            Err(err) if err.is_transient() && attempt < BACKOFF.len() => {
                tracing::warn!(
                    attempt,
                    error = %err,
                    backoff_ms = BACKOFF[attempt].as_millis(),
                    "transient provider error on initiate_call, retrying"
                );
                tokio::time::sleep(BACKOFF[attempt]).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StatusResult;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct FlakyDriver {
        errors: Mutex<Vec<ProviderError>>,
    }

    #[async_trait]
    impl ProviderDriver for FlakyDriver {
        async fn initiate_call(
            &self,
            _to: &str,
            _from: &str,
            _media_cb: &str,
            _status_cb: &str,
        ) -> Result<InitiateCallResult> {
            let mut errors = self.errors.lock();
            if let Some(err) = errors.pop() {
                Err(err)
            } else {
                Ok(InitiateCallResult { provider_call_id: "ok".into(), initial_status: "initiated".into() })
            }
        }

        async fn get_status(&self, _provider_call_id: &str) -> Result<StatusResult> {
            unimplemented!()
        }

        async fn end_call(&self, _provider_call_id: &str) -> Result<bool> {
            unimplemented!()
        }

        async fn validate_credentials(&self) -> Result<()> {
            unimplemented!()
        }

        fn answer_script(&self, _call_id: &str, _public_ws_base: &str) -> Vec<u8> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn retries_transient_errors_then_succeeds() {
        let driver = FlakyDriver { errors: Mutex::new(vec![ProviderError::Timeout, ProviderError::NetworkError("reset".into())]) };
        let result = initiate_call_with_retry(&driver, "+15551230001", "+15557654321", "cb", "sc").await;
        assert!(result.is_ok());
        assert!(driver.errors.lock().is_empty());
    }

    #[tokio::test]
    async fn gives_up_after_two_retries() {
        let driver = FlakyDriver {
            errors: Mutex::new(vec![
                ProviderError::Timeout,
                ProviderError::Timeout,
                ProviderError::Timeout,
            ]),
        };
        let result = initiate_call_with_retry(&driver, "+15551230001", "+15557654321", "cb", "sc").await;
        assert_eq!(result.unwrap_err(), ProviderError::Timeout);
    }

    #[tokio::test]
    async fn non_transient_errors_are_not_retried() {
        let driver = FlakyDriver { errors: Mutex::new(vec![ProviderError::AuthFailed]) };
        let result = initiate_call_with_retry(&driver, "+15551230001", "+15557654321", "cb", "sc").await;
        assert_eq!(result.unwrap_err(), ProviderError::AuthFailed);
    }

    #[tokio::test]
    async fn rate_limited_is_not_retried() {
        let driver = FlakyDriver { errors: Mutex::new(vec![ProviderError::RateLimited]) };
        let result = initiate_call_with_retry(&driver, "+15551230001", "+15557654321", "cb", "sc").await;
        assert_eq!(result.unwrap_err(), ProviderError::RateLimited);
    }

    #[tokio::test]
    async fn a_5xx_response_is_treated_as_transient() {
        let driver = FlakyDriver {
            errors: Mutex::new(vec![ProviderError::UnknownProviderError("http 503".into())]),
        };
        let result = initiate_call_with_retry(&driver, "+15551230001", "+15557654321", "cb", "sc").await;
        assert!(result.is_ok());
    }
}
