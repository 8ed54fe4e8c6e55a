//! Optimistic mutation engine.
//!
//! Each mutation runs IDLE → PENDING → settled. On entering PENDING the
//! engine cancels the key's in-flight fetch, snapshots the cache entry and
//! applies a provisional patch, then issues the remote call. A successful
//! settlement discards the snapshot and invalidates the key so the next
//! sync replaces provisional fields (temp id, local timestamps) with
//! authoritative server state; a failed settlement restores the snapshot
//! exactly.
//!
//! Mutations against the same key are not serialized: each one snapshots
//! at its own PENDING entry, so a later failure can roll back past an
//! earlier success. Accepted for a single-user, single-device client.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::{QueryCache, QueryKey};
use crate::error::ApiError;

use super::client::TodosApi;
use super::keys::TodoQueryKey;
use super::types::{CacheEntry, Todo, TodoDraft, TodoStatus};

/// One mutation against the collection.
#[derive(Debug, Clone)]
pub enum TodoMutation {
  Create(TodoDraft),
  Update { id: String, draft: TodoDraft },
  Delete { id: String },
}

/// Outcome of a settled mutation, carrying the authoritative server value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
  Created(Todo),
  Updated(Todo),
  Deleted { id: String },
}

/// Locally-unique provisional id. Random rather than time-derived: rapid
/// successive creates must not collide.
fn temp_id() -> String {
  format!("temp-{}", Uuid::new_v4())
}

/// Apply the provisional patch for `mutation` to a cache entry.
///
/// Pure with respect to the cache: the caller owns snapshotting and
/// rollback. An absent entry stays absent: an unfetched key gets no
/// provisional row and converges via the settle-time invalidation.
pub fn apply_provisional_patch(
  mutation: &TodoMutation,
  entry: Option<CacheEntry>,
) -> Option<CacheEntry> {
  let mut entry = entry?;
  let now = Utc::now();

  match mutation {
    TodoMutation::Create(draft) => {
      let provisional = Todo {
        id: temp_id(),
        title: draft.title.clone(),
        description: draft.description.clone(),
        image_url: None,
        status: TodoStatus::Todo,
        created_at: now,
        updated_at: now,
      };
      if let Some(first) = entry.pages.first_mut() {
        first.todos.insert(0, provisional);
      }
    }
    TodoMutation::Update { id, draft } => {
      for page in &mut entry.pages {
        for todo in &mut page.todos {
          if todo.id == *id {
            todo.title = draft.title.clone();
            todo.description = draft.description.clone();
            todo.status = draft.status;
            todo.updated_at = now;
          }
        }
      }
    }
    TodoMutation::Delete { id } => {
      for page in &mut entry.pages {
        page.todos.retain(|todo| todo.id != *id);
      }
    }
  }

  Some(entry)
}

#[derive(Clone)]
pub struct MutationEngine {
  cache: QueryCache,
  api: Arc<dyn TodosApi>,
}

impl MutationEngine {
  pub fn new(cache: QueryCache, api: Arc<dyn TodosApi>) -> Self {
    Self { cache, api }
  }

  /// Run one mutation to settlement.
  ///
  /// The provisional patch is visible to readers of the key for the whole
  /// PENDING window. Mutations are never retried; the error from a failed
  /// settlement is surfaced to the caller after rollback.
  pub async fn execute(
    &self,
    key: &TodoQueryKey,
    mutation: TodoMutation,
  ) -> Result<MutationOutcome, ApiError> {
    // a stale in-flight response must not clobber the provisional patch
    self.cache.cancel_in_flight(key);

    let snapshot = self.cache.get(key);
    self.cache.set(key, |entry| apply_provisional_patch(&mutation, entry));
    let patched = self.cache.get(key);
    debug!(key = %key.description(), "mutation pending");

    let result = match &mutation {
      TodoMutation::Create(draft) => {
        self.api.create_todo(draft).await.map(MutationOutcome::Created)
      }
      TodoMutation::Update { id, draft } => {
        self.api.update_todo(id, draft).await.map(MutationOutcome::Updated)
      }
      TodoMutation::Delete { id } => self
        .api
        .delete_todo(id)
        .await
        .map(|()| MutationOutcome::Deleted { id: id.clone() }),
    };

    match result {
      Ok(outcome) => {
        self.cache.invalidate(key);
        debug!(key = %key.description(), "mutation settled");
        Ok(outcome)
      }
      Err(err) => {
        if self.cache.get(key) != patched {
          // another mutation interleaved; its effect is discarded with ours
          debug!(key = %key.description(), "rollback discards interleaved changes");
        }
        warn!(key = %key.description(), %err, "mutation failed; rolling back");
        self.cache.restore(key, snapshot);
        Err(err)
      }
    }
  }
}
