use foundations::telemetry::metrics::{metrics, Counter, Gauge};

#[metrics]
pub mod http_server {
  /// Number of HTTP requests.
  pub fn requests_total(endpoint_name: &'static str) -> Counter;

  /// Number of successful HTTP requests.
  pub fn requests_success_total(endpoint_name: &'static str) -> Counter;

  /// Number of failed requests.
  pub fn requests_failed_total(endpoint_name: &'static str) -> Counter;

  /// Number of credential lookups, by kind of credential.
  pub fn token_lookups_total(kind: &'static str) -> Counter;

  /// Number of credential lookups that didn't match any token.
  pub fn token_lookup_misses_total(kind: &'static str) -> Counter;
}

#[metrics]
pub mod token_updater {
  /// Number of bulk `last_updated` writes issued.
  pub fn flushes_total() -> Counter;

  /// Number of bulk `last_updated` writes that failed.  The batch is dropped in that case.
  pub fn flushes_failed_total() -> Counter;

  /// Number of distinct token ids written across all flushes.
  pub fn tokens_flushed_total() -> Counter;

  /// Number of distinct token ids in the most recent flush.
  pub fn last_batch_size() -> Gauge;
}
