//! Engine error type.
//!
//! The only failure the UI must treat specially is a persistence failure
//! while recording an answer: a silently dropped answer would desynchronize
//! the frozen remediation question set and the resume index, so those errors
//! are flagged retryable and surfaced to the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("trail not found: {0}")]
  TrailNotFound(String),

  #[error("round not found: {0}")]
  RoundNotFound(String),

  #[error("mission not found: {0}")]
  MissionNotFound(String),

  #[error("mission {0} is locked")]
  MissionLocked(String),

  /// No subject has any remaining topic; the caller shows an empty-trail
  /// state instead of an error page.
  #[error("catalog exhausted: no subject has remaining topics")]
  CatalogExhausted,

  #[error("persistence write failed: {0}")]
  StorageWrite(String),

  #[error("invalid request: {0}")]
  InvalidRequest(String),
}

impl EngineError {
  /// Whether the caller should retry the same call. Only write failures
  /// qualify; everything else is a caller or state error.
  pub fn is_retryable(&self) -> bool {
    matches!(self, EngineError::StorageWrite(_))
  }
}
