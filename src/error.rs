//! Error taxonomy for remote operations.

use thiserror::Error;

/// Errors surfaced by the remote collection client and the layers above it.
///
/// Cloneable so that concurrent consumers sharing a de-duplicated in-flight
/// fetch can each receive the settlement outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
  /// Transport-level failure with no HTTP response.
  #[error("network unreachable: {0}")]
  Network(String),

  /// 401/403 from the server. Never retried; clearing the session is the
  /// job of the credential-divergence check, not of this error.
  #[error("unauthorized")]
  Unauthorized,

  /// 404 for a named resource.
  #[error("not found: {0}")]
  NotFound(String),

  /// 409 on create/sign-up paths.
  #[error("conflict: {0}")]
  Conflict(String),

  /// Any other non-success HTTP status.
  #[error("server returned status {0}")]
  Status(u16),

  /// Response body did not match the expected schema. Fatal for the single
  /// operation; never silently coerced.
  #[error("invalid response: {0}")]
  Schema(String),
}

impl ApiError {
  /// Map a non-success HTTP status to the taxonomy.
  pub fn from_status(status: u16, detail: String) -> Self {
    match status {
      401 | 403 => ApiError::Unauthorized,
      404 => ApiError::NotFound(detail),
      409 => ApiError::Conflict(detail),
      code => ApiError::Status(code),
    }
  }

  /// Whether an automatic retry is permitted for read queries.
  ///
  /// Mutations are never retried; reads retry transient failures but not
  /// an unambiguous not-found, an authorization failure, or a schema
  /// mismatch (retrying those cannot change the outcome).
  pub fn retryable_for_reads(&self) -> bool {
    match self {
      ApiError::Network(_) => true,
      ApiError::Status(code) => *code >= 500,
      ApiError::Unauthorized
      | ApiError::NotFound(_)
      | ApiError::Conflict(_)
      | ApiError::Schema(_) => false,
    }
  }
}
