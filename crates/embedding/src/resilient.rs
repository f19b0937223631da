// Resilient embedder wrapper: retries with exponential backoff and a
// thermal-aware per-call timeout that widens as a run goes on, since local
// backends (Ollama, remote-mlx) slow down under sustained load.

use crate::provider::{Embedder, EmbeddingError, Role};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryConfig {
  pub max_retries: u32,
  pub initial_backoff: Duration,
  pub max_backoff: Duration,
  pub backoff_multiplier: f64,
  pub add_jitter: bool,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      max_retries: 10,
      initial_backoff: Duration::from_secs(1),
      max_backoff: Duration::from_secs(512),
      backoff_multiplier: 2.0,
      add_jitter: true,
    }
  }
}

impl RetryConfig {
  pub fn for_local() -> Self {
    Self {
      max_retries: 5,
      initial_backoff: Duration::from_millis(500),
      max_backoff: Duration::from_secs(64),
      backoff_multiplier: 2.0,
      add_jitter: true,
    }
  }

  pub fn for_cloud() -> Self {
    Self::default()
  }

  /// `1s, 2s, 4s, ..., 512s` over 10 attempts before jitter.
  pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
    let base = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
    let mut backoff = Duration::from_secs_f64(base.min(self.max_backoff.as_secs_f64()));

    if self.add_jitter {
      let jitter_factor = 1.0 + (rand_f64() * 0.25);
      backoff = Duration::from_secs_f64(backoff.as_secs_f64() * jitter_factor);
    }

    backoff.min(self.max_backoff)
  }
}

fn rand_f64() -> f64 {
  use std::time::{SystemTime, UNIX_EPOCH};
  let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().subsec_nanos();
  (nanos as f64 / u32::MAX as f64).fract()
}

const THERMAL_BASE_SECS: f64 = 60.0;
const THERMAL_PROGRESSION: f64 = 1.5;
const THERMAL_CAP_MULTIPLIER: f64 = 3.0;
const THERMAL_HALF_LIFE_BATCHES: f64 = 31.25;
const LAST_BATCH_BOOST: f64 = 1.5;

/// `base * min(progression ^ (completed_batches / 31.25), 3.0)`. Widens the
/// per-call timeout as a long-running embed job accumulates batches, to
/// tolerate thermal throttling on local backends rather than flapping into
/// false timeouts deep into a run.
pub fn thermal_timeout(completed_batches: u64, boost_last: bool) -> Duration {
  let exponent = completed_batches as f64 / THERMAL_HALF_LIFE_BATCHES;
  let factor = THERMAL_PROGRESSION.powf(exponent).min(THERMAL_CAP_MULTIPLIER);
  let mut secs = THERMAL_BASE_SECS * factor;
  if boost_last {
    secs *= LAST_BATCH_BOOST;
  }
  Duration::from_secs_f64(secs)
}

pub fn is_retryable_error(error: &EmbeddingError) -> bool {
  match error {
    EmbeddingError::Network(_) => true,
    EmbeddingError::Http(status) => *status == 429 || (500..600).contains(status),
    EmbeddingError::ProviderError(msg) => {
      msg.contains("429") || msg.contains("502") || msg.contains("503") || msg.contains("504")
    }
    EmbeddingError::Timeout => true,
    _ => false,
  }
}

/// Wraps any `Embedder` with retry-with-backoff and the thermal timeout.
/// `completed_batches` increments once per successful `embed()` call and
/// feeds the next call's timeout; it is never reset, so it should be
/// constructed once per indexing run.
pub struct ResilientEmbedder<E: Embedder> {
  inner: E,
  config: RetryConfig,
  completed_batches: AtomicU64,
}

impl<E: Embedder> ResilientEmbedder<E> {
  pub fn new(embedder: E) -> Self {
    Self { inner: embedder, config: RetryConfig::default(), completed_batches: AtomicU64::new(0) }
  }

  pub fn with_config(embedder: E, config: RetryConfig) -> Self {
    Self { inner: embedder, config, completed_batches: AtomicU64::new(0) }
  }

  pub fn completed_batches(&self) -> u64 {
    self.completed_batches.load(Ordering::Relaxed)
  }

  async fn embed_with_retry(
    &self,
    texts: &[String],
    role: Role,
    boost_last: bool,
  ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let mut last_error = None;
    let completed = self.completed_batches.load(Ordering::Relaxed);
    let timeout = thermal_timeout(completed, boost_last);

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let backoff = self.config.backoff_for_attempt(attempt - 1);
        debug!("retry attempt {} after {:?}", attempt, backoff);
        sleep(backoff).await;
      }

      match tokio::time::timeout(timeout, self.inner.embed(texts, role)).await {
        Ok(Ok(result)) => {
          self.completed_batches.fetch_add(1, Ordering::Relaxed);
          return Ok(result);
        }
        Ok(Err(e)) => {
          if is_retryable_error(&e) && attempt < self.config.max_retries {
            warn!("retryable embedding error on attempt {}: {}", attempt + 1, e);
            last_error = Some(e);
            continue;
          }
          return Err(e);
        }
        Err(_) => {
          warn!("embed request timed out after {:?} on attempt {}", timeout, attempt + 1);
          last_error = Some(EmbeddingError::Timeout);
          if attempt < self.config.max_retries {
            continue;
          }
        }
      }
    }

    Err(last_error.unwrap_or_else(|| EmbeddingError::ProviderError("max retries exceeded".to_string())))
  }

  /// Like `embed`, but applies the last-batch timeout boost. Callers that
  /// know this is the final batch of a run should use this instead.
  pub async fn embed_final(&self, texts: &[String], role: Role) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    self.embed_with_retry(texts, role, true).await
  }
}

#[async_trait]
impl<E: Embedder + Send + Sync> Embedder for ResilientEmbedder<E> {
  fn id(&self) -> String {
    self.inner.id()
  }

  fn dim(&self) -> usize {
    self.inner.dim()
  }

  async fn available(&self) -> bool {
    self.inner.available().await
  }

  async fn embed(&self, texts: &[String], role: Role) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    self.embed_with_retry(texts, role, false).await
  }

  async fn close(&self) {
    self.inner.close().await
  }
}

pub fn wrap_resilient<E: Embedder>(embedder: E) -> ResilientEmbedder<E> {
  ResilientEmbedder::new(embedder)
}

pub fn wrap_resilient_arc<E>(embedder: E) -> Arc<dyn Embedder + Send + Sync>
where
  E: Embedder + Send + Sync + 'static,
{
  Arc::new(ResilientEmbedder::new(embedder))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn retry_config_defaults_match_documented_schedule() {
    let config = RetryConfig::default();
    assert_eq!(config.max_retries, 10);
    assert_eq!(config.initial_backoff, Duration::from_secs(1));
    assert_eq!(config.max_backoff, Duration::from_secs(512));
  }

  #[test]
  fn retry_config_for_local_is_faster() {
    let config = RetryConfig::for_local();
    assert!(config.initial_backoff < Duration::from_secs(1));
    assert!(config.max_backoff < RetryConfig::default().max_backoff);
  }

  #[test]
  fn backoff_calculation_produces_doubling_schedule() {
    let config = RetryConfig { add_jitter: false, ..RetryConfig::default() };
    assert_eq!(config.backoff_for_attempt(0), Duration::from_secs(1));
    assert_eq!(config.backoff_for_attempt(1), Duration::from_secs(2));
    assert_eq!(config.backoff_for_attempt(2), Duration::from_secs(4));
    assert_eq!(config.backoff_for_attempt(9), Duration::from_secs(512));
  }

  #[test]
  fn backoff_respects_max() {
    let config = RetryConfig { add_jitter: false, ..RetryConfig::default() };
    // 1 * 2^10 = 1024s, capped at 512
    assert_eq!(config.backoff_for_attempt(10), Duration::from_secs(512));
  }

  #[test]
  fn is_retryable_error_classifies_known_statuses() {
    assert!(is_retryable_error(&EmbeddingError::Network("connection reset".to_string())));
    assert!(is_retryable_error(&EmbeddingError::Timeout));
    assert!(is_retryable_error(&EmbeddingError::ProviderError("status 429".to_string())));
    assert!(is_retryable_error(&EmbeddingError::ProviderError("got 503".to_string())));
    assert!(!is_retryable_error(&EmbeddingError::ProviderError("invalid input".to_string())));
    assert!(!is_retryable_error(&EmbeddingError::InvalidInput("bad".to_string())));
  }

  #[test]
  fn is_retryable_error_fails_fast_on_4xx_http() {
    assert!(!is_retryable_error(&EmbeddingError::Http(400)));
    assert!(!is_retryable_error(&EmbeddingError::Http(404)));
    assert!(is_retryable_error(&EmbeddingError::Http(429)));
    assert!(is_retryable_error(&EmbeddingError::Http(503)));
  }

  #[test]
  fn rand_f64_is_bounded() {
    for _ in 0..100 {
      let val = rand_f64();
      assert!((0.0..=1.0).contains(&val));
    }
  }

  #[test]
  fn thermal_timeout_starts_at_base() {
    assert_eq!(thermal_timeout(0, false), Duration::from_secs_f64(60.0));
  }

  #[test]
  fn thermal_timeout_widens_with_completed_batches() {
    let early = thermal_timeout(0, false);
    let later = thermal_timeout(63, false); // 2 half-lives
    assert!(later > early);
  }

  #[test]
  fn thermal_timeout_caps_at_triple_base() {
    let far = thermal_timeout(10_000, false);
    assert!(far <= Duration::from_secs_f64(60.0 * 3.0 + 1.0));
  }

  #[test]
  fn thermal_timeout_boosts_last_batch() {
    let normal = thermal_timeout(0, false);
    let boosted = thermal_timeout(0, true);
    assert_eq!(boosted.as_secs_f64(), normal.as_secs_f64() * 1.5);
  }
}
