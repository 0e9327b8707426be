//! Generic retry driver wrapping any fallible async step in
//! exponential-backoff retries (spec §4.2, §9 "Retries as a decorator").
//!
//! Growth is `min(start * factor^n, border)`, which is exactly what
//! `backoff::ExponentialBackoff` computes when configured with
//! `initial_interval`/`multiplier`/`max_interval` and an unbounded
//! `max_elapsed_time` — the teacher itself has no generic retry utility,
//! so this is grounded on the `backoff` crate as used (with the `tokio`
//! feature) by the `get-convex/convex-backend` example pack member.
//!
//! Applied at the ETL loop boundary and at each paginated DB/search call,
//! not wrapped around the whole pipeline (spec §9): a transient failure
//! mid-stream re-runs only the current page, because producer/merger/
//! enricher already resume from an explicit cursor (`last_order_value`,
//! the last-advanced watermark) rather than from the beginning.

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use tracing::warn;

use crate::config::BackoffConfig;
use crate::error::CatalogError;

#[derive(Debug, Clone)]
pub struct BackoffDriver {
    start: Duration,
    factor: f64,
    border: Duration,
}

impl BackoffDriver {
    pub fn new(cfg: &BackoffConfig) -> Self {
        Self {
            start: cfg.start,
            factor: cfg.factor,
            border: cfg.border,
        }
    }

    fn policy(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.start,
            multiplier: self.factor,
            max_interval: self.border,
            randomization_factor: 0.0,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        }
    }

    /// Retries `op` until it succeeds or returns a non-transient error.
    /// Today every exception the original treats as transient maps to
    /// [`CatalogError::Transient`], so in practice this retries forever
    /// on transport failures (spec §4.2's open revision point).
    pub async fn retry<T, F, Fut>(&self, mut op: F) -> Result<T, CatalogError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CatalogError>>,
    {
        backoff::future::retry(self.policy(), || async {
            op().await.map_err(|err| {
                if err.is_transient() {
                    warn!(error = %err, "transient failure, retrying with backoff");
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            })
        })
        .await
        .map_err(|err| match err {
            backoff::Error::Permanent(inner) => inner,
            backoff::Error::Transient { err: inner, .. } => inner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn driver() -> BackoffDriver {
        BackoffDriver::new(&BackoffConfig {
            start: Duration::from_millis(1),
            factor: 2.0,
            border: Duration::from_millis(5),
        })
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let attempts = AtomicUsize::new(0);
        let result = driver()
            .retry(|| async {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(CatalogError::Transient("connection reset".into()))
                } else {
                    Ok(42)
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_failures() {
        let attempts = AtomicUsize::new(0);
        let result = driver()
            .retry(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(CatalogError::Invalid("bad query".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
