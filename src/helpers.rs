use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::error::Error;

pub const MAX_RETRIES: u32 = 3;
pub const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Runs `call` up to `MAX_RETRIES` times while it fails with a retryable
/// error, sleeping `attempt * RETRY_BACKOFF` between attempts.
pub async fn with_retry<T, F, Fut>(name: &str, mut call: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, Error>>,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < MAX_RETRIES => {
                warn!("{} failed on attempt {}: {}", name, attempt, err);
                sleep(RETRY_BACKOFF * attempt).await;
                attempt += 1;
            },
            Err(err) => return Err(err),
        }
    }
}

pub mod serde_bigint {
    use std::str::FromStr;

    use bigdecimal::num_bigint::BigInt;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigInt, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        BigInt::from_str(&value).map_err(de::Error::custom)
    }
}

pub mod serde_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        STANDARD.decode(value).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn retries_server_errors() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retry("test", || async move {
            let call = counter.fetch_add(1, Ordering::SeqCst);
            if call < 2 {
                return Err(Error::Upstream {
                    status: 503,
                    message: String::from("unavailable"),
                });
            }
            Ok(call)
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), Error> = with_retry("test", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::Upstream {
                status: 502,
                message: String::from("bad gateway"),
            })
        })
        .await;

        assert!(matches!(result, Err(Error::Upstream { status: 502, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES);
    }

    #[tokio::test]
    async fn client_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), Error> = with_retry("test", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::Upstream {
                status: 404,
                message: String::from("not found"),
            })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
