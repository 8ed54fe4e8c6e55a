//! Credential provider seam.
//!
//! The identity provider itself is an external collaborator; the rest of
//! the application only ever sees "a bearer token for the current
//! principal, or none". Every remote call re-derives its credential live
//! from this trait; the persisted principal is display convenience only.

use async_trait::async_trait;

/// Supplies a short-lived bearer token for the signed-in principal.
///
/// Absence of a token is allowed: requests go out without an
/// `Authorization` header and the server answers 401/403.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
  async fn bearer_token(&self) -> Option<String>;
}

/// Reads the token from the environment.
///
/// Checks TODOQ_API_TOKEN first, then TODO_API_TOKEN as fallback.
pub struct EnvCredentialProvider;

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
  async fn bearer_token(&self) -> Option<String> {
    std::env::var("TODOQ_API_TOKEN")
      .or_else(|_| std::env::var("TODO_API_TOKEN"))
      .ok()
      .filter(|token| !token.is_empty())
  }
}

/// Fixed credential, for tests and embedding.
pub struct StaticCredential(pub Option<String>);

#[async_trait]
impl CredentialProvider for StaticCredential {
  async fn bearer_token(&self) -> Option<String> {
    self.0.clone()
  }
}
