//! Persisted session state.
//!
//! The signed-in principal is kept in a versioned JSON file under the
//! platform data directory so it survives restarts, until explicit logout
//! or a detected divergence from the credential provider's live session.
//! It is a display convenience and a gate for the login redirect only;
//! authorization always re-derives the bearer token live.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::auth::CredentialProvider;

/// Bumped whenever the persisted schema changes; a mismatch clears the
/// session rather than migrating.
const SESSION_VERSION: u32 = 1;

/// The authenticated user's profile, as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
  pub id: String,
  pub firebase_id: String,
  pub first_name: String,
  pub last_name: String,
  pub full_name: String,
  pub email: String,
  pub profile_picture_url: Option<String>,
  pub is_deleted: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
  version: u32,
  principal: Option<Principal>,
}

/// File-backed store for the current principal.
pub struct SessionStore {
  path: PathBuf,
  principal: Option<Principal>,
}

impl SessionStore {
  /// Open the store at the default location, loading any persisted
  /// principal. An unreadable file or a version mismatch yields an empty
  /// session.
  pub fn open() -> Result<Self> {
    Self::open_at(Self::default_path()?)
  }

  pub fn open_at(path: PathBuf) -> Result<Self> {
    let principal = match std::fs::read_to_string(&path) {
      Ok(contents) => match serde_json::from_str::<PersistedSession>(&contents) {
        Ok(persisted) if persisted.version == SESSION_VERSION => persisted.principal,
        Ok(persisted) => {
          warn!(
            found = persisted.version,
            expected = SESSION_VERSION,
            "session schema version mismatch; clearing session"
          );
          None
        }
        Err(err) => {
          warn!(%err, "unreadable session file; clearing session");
          None
        }
      },
      Err(_) => None,
    };

    Ok(Self { path, principal })
  }

  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("todoq").join("session.json"))
  }

  pub fn principal(&self) -> Option<&Principal> {
    self.principal.as_ref()
  }

  pub fn set_principal(&mut self, principal: Principal) -> Result<()> {
    self.principal = Some(principal);
    self.persist()
  }

  pub fn clear(&mut self) -> Result<()> {
    self.principal = None;
    self.persist()
  }

  /// Clear the cached principal when the credential provider has no live
  /// session for it. Returns true if the session was cleared.
  pub async fn reconcile(&mut self, credentials: &dyn CredentialProvider) -> Result<bool> {
    if self.principal.is_some() && credentials.bearer_token().await.is_none() {
      warn!("cached principal has no live credential; clearing session");
      self.clear()?;
      return Ok(true);
    }
    Ok(false)
  }

  fn persist(&self) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create session directory: {}", e))?;
    }

    let persisted = PersistedSession {
      version: SESSION_VERSION,
      principal: self.principal.clone(),
    };
    let contents = serde_json::to_string_pretty(&persisted)?;
    std::fs::write(&self.path, contents)
      .map_err(|e| eyre!("Failed to write session file {}: {}", self.path.display(), e))?;

    Ok(())
  }
}
