//! Pagination/filter coordinator for the todo list.
//!
//! A `TodoFeed` ties one query key to the cache and the remote client:
//! it exposes the flattened item sequence, drives forward-only infinite
//! pagination, and revalidates after invalidation. Changing search or
//! status selects a new key; the old sequence is abandoned, never merged.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::{QueryCache, QueryKey, WriteMode};
use crate::error::ApiError;

use super::client::{ListParams, TodosApi};
use super::keys::TodoQueryKey;
use super::types::{Todo, TodosPage};

const READ_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

fn list_params(key: &TodoQueryKey, limit: u32, page: u32) -> ListParams {
  ListParams {
    page,
    limit,
    search: key.search.clone(),
    // the status set passes through unfiltered; an empty set is not
    // special-cased here
    status: key.status.iter().copied().collect(),
  }
}

/// Fetch one list page, retrying transient failures. Mutations never come
/// through here; only reads are retried.
async fn fetch_page(api: &dyn TodosApi, params: ListParams) -> Result<TodosPage, ApiError> {
  let mut attempt = 1;
  loop {
    match api.list_todos(&params).await {
      Ok(page) => return Ok(page),
      Err(err) if err.retryable_for_reads() && attempt < READ_ATTEMPTS => {
        debug!(%err, attempt, "list fetch failed; retrying");
        tokio::time::sleep(RETRY_BASE_DELAY * attempt).await;
        attempt += 1;
      }
      Err(err) => return Err(err),
    }
  }
}

pub struct TodoFeed {
  cache: QueryCache,
  api: Arc<dyn TodosApi>,
  key: TodoQueryKey,
  limit: u32,
}

impl TodoFeed {
  pub fn new(cache: QueryCache, api: Arc<dyn TodosApi>, key: TodoQueryKey, limit: u32) -> Self {
    Self { cache, api, key, limit }
  }

  pub fn key(&self) -> &TodoQueryKey {
    &self.key
  }

  /// Switch to a new {search, status} tuple. Pagination restarts from
  /// page 1 under the new key; the old key's cursor is untouched.
  pub fn set_filter(&mut self, key: TodoQueryKey) {
    if key != self.key {
      debug!(from = %self.key.description(), to = %key.description(), "filter changed");
      self.key = key;
    }
  }

  /// All fetched pages for the current key, flattened in page order.
  pub fn todos(&self) -> Vec<Todo> {
    self
      .cache
      .get(&self.key)
      .map(|entry| entry.flatten())
      .unwrap_or_default()
  }

  /// True iff the last fetched page reports a successor. False until the
  /// first fetch lands.
  pub fn has_more(&self) -> bool {
    self
      .cache
      .get(&self.key)
      .map(|entry| entry.has_more())
      .unwrap_or(false)
  }

  /// Fetch the next page and append it. Concurrent calls for the same key
  /// share a single network call; a call with no successor page is a
  /// no-op.
  pub async fn load_more(&self) -> Result<(), ApiError> {
    let cache = self.cache.clone();
    let api = Arc::clone(&self.api);
    let key = self.key.clone();
    let limit = self.limit;

    self
      .cache
      .fetch(&self.key, WriteMode::Append, move || async move {
        let page = match cache.get(&key) {
          Some(entry) if !entry.pages.is_empty() => match entry.next_page() {
            Some(page) => page,
            None => return Ok(Vec::new()),
          },
          _ => 1,
        };
        Ok(vec![fetch_page(api.as_ref(), list_params(&key, limit, page)).await?])
      })
      .await
  }

  /// Drop all pages for the key and refetch from page 1.
  pub async fn refetch(&self) -> Result<(), ApiError> {
    self.cache.cancel_in_flight(&self.key);
    self.cache.set(&self.key, |_| None);

    let api = Arc::clone(&self.api);
    let key = self.key.clone();
    let limit = self.limit;

    self
      .cache
      .fetch(&self.key, WriteMode::Replace, move || async move {
        Ok(vec![fetch_page(api.as_ref(), list_params(&key, limit, 1)).await?])
      })
      .await
  }

  /// Revalidate after invalidation: refetch the previously covered page
  /// window from page 1 and replace the entry wholesale. Stale pages stay
  /// visible until the replacement arrives. A fresh entry is a no-op.
  pub async fn sync(&self) -> Result<(), ApiError> {
    let entry = self.cache.get(&self.key);
    if entry.is_some() && !self.cache.is_stale(&self.key) {
      return Ok(());
    }
    let window = entry.map(|entry| entry.pages.len().max(1)).unwrap_or(1);

    let api = Arc::clone(&self.api);
    let key = self.key.clone();
    let limit = self.limit;

    self
      .cache
      .fetch(&self.key, WriteMode::Replace, move || async move {
        let mut pages = Vec::with_capacity(window);
        let mut page = 1;
        for _ in 0..window {
          let fetched = fetch_page(api.as_ref(), list_params(&key, limit, page)).await?;
          let next = fetched.info.next_page;
          pages.push(fetched);
          match next {
            Some(n) => page = n,
            None => break,
          }
        }
        Ok(pages)
      })
      .await
  }
}
