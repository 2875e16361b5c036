//! Error taxonomy for the drill engine.
//!
//! Repository and generation failures are terminal for the call that raised
//! them; nothing here is retried internally. Pregeneration swallows
//! `GenerationError` at the step level (see `practice::similar`).

use thiserror::Error;

/// Failure talking to the external record store.
#[derive(Debug, Error)]
pub enum RepositoryError {
  #[error("store request failed: {0}")]
  Http(#[from] reqwest::Error),
  /// The store answered but rejected the request (non-zero API code).
  #[error("store rejected request (code {code}): {msg}")]
  Api { code: i64, msg: String },
  #[error("malformed store payload: {0}")]
  Malformed(String),
  #[error("missing store configuration: {0}")]
  Config(&'static str),
}

/// Failure producing similar-question variants.
#[derive(Debug, Error)]
pub enum GenerationError {
  #[error("generation request failed: {0}")]
  Http(#[from] reqwest::Error),
  #[error("generation auth rejected: {0}")]
  Auth(String),
  #[error("unusable generation response: {0}")]
  Malformed(String),
  #[error("reference question has no usable content")]
  EmptyReference,
}

/// A required configuration value was not found in config.toml or the
/// environment.
#[derive(Debug, Error)]
#[error("missing configuration value: {0}")]
pub struct ConfigError(pub &'static str);
