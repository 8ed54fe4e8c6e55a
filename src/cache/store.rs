//! Process-wide keyed store of fetched pages.
//!
//! One `QueryCache` is created at startup and handed by reference to the
//! feed and the mutation engine; it is the sole authoritative holder of the
//! working set. All reads and writes of cached pages go through the
//! get/set/invalidate/cancel_in_flight contract.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::debug;

use super::key::QueryKey;
use crate::error::ApiError;
use crate::todos::types::{CacheEntry, TodosPage};

/// How a completed fetch is written into the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
  /// Append fetched pages after the existing ones. Appending extends a
  /// stale entry without freshening it; only a wholesale replacement
  /// clears staleness.
  Append,
  /// Replace the entry's pages wholesale and mark the entry fresh.
  Replace,
}

/// None while the fetch is running, Some once it has settled.
type Settlement = Option<Result<(), ApiError>>;

#[derive(Default)]
struct Slot {
  entry: Option<CacheEntry>,
  stale: bool,
  /// Bumped by cancellation and invalidation; a fetch only applies its
  /// result if the epoch it started under is still current.
  epoch: u64,
  /// Present while a fetch for this key is running.
  in_flight: Option<watch::Receiver<Settlement>>,
}

enum FetchRole {
  Leader { tx: watch::Sender<Settlement>, epoch: u64 },
  Waiter(watch::Receiver<Settlement>),
}

/// Keyed store of fetched pages with per-key in-flight de-duplication.
#[derive(Clone, Default)]
pub struct QueryCache {
  slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl QueryCache {
  pub fn new() -> Self {
    Self::default()
  }

  // A poisoned lock only means a panic elsewhere; the map itself is
  // still coherent, so recover the guard.
  fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
    self.slots.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// The current entry for `key`, if any pages have been cached.
  pub fn get(&self, key: &impl QueryKey) -> Option<CacheEntry> {
    self
      .lock()
      .get(&key.cache_hash())
      .and_then(|slot| slot.entry.clone())
  }

  /// Apply `updater` to the current entry (or to its absence).
  pub fn set(
    &self,
    key: &impl QueryKey,
    updater: impl FnOnce(Option<CacheEntry>) -> Option<CacheEntry>,
  ) {
    let mut slots = self.lock();
    let slot = slots.entry(key.cache_hash()).or_default();
    slot.entry = updater(slot.entry.take());
  }

  /// Restore an exact prior value, as captured by `get`. Mutation rollback:
  /// the entry after restoration equals the snapshot, including absence.
  pub fn restore(&self, key: &impl QueryKey, snapshot: Option<CacheEntry>) {
    let mut slots = self.lock();
    let slot = slots.entry(key.cache_hash()).or_default();
    slot.entry = snapshot;
  }

  /// Mark the entry stale, forcing the next read-side sync to refetch.
  /// Cached pages stay visible until the replacement arrives. Any fetch
  /// currently in flight is prevented from applying its result.
  pub fn invalidate(&self, key: &impl QueryKey) {
    let mut slots = self.lock();
    let slot = slots.entry(key.cache_hash()).or_default();
    slot.stale = true;
    slot.epoch += 1;
    slot.in_flight = None;
    debug!(key = %key.description(), "invalidated");
  }

  pub fn is_stale(&self, key: &impl QueryKey) -> bool {
    self
      .lock()
      .get(&key.cache_hash())
      .map(|slot| slot.stale)
      .unwrap_or(false)
  }

  /// Abort any pending fetch for `key`: its response is ignored on arrival
  /// and a new fetch may start immediately. A stale in-flight response must
  /// never clobber an optimistic write.
  pub fn cancel_in_flight(&self, key: &impl QueryKey) {
    let mut slots = self.lock();
    if let Some(slot) = slots.get_mut(&key.cache_hash()) {
      if slot.in_flight.take().is_some() {
        debug!(key = %key.description(), "cancelled in-flight fetch");
      }
      slot.epoch += 1;
    }
  }

  /// Drop every entry (logout).
  pub fn clear(&self) {
    self.lock().clear();
  }

  /// Run `fetcher` for `key`, writing the fetched pages per `mode`.
  ///
  /// At most one fetch per key is in flight at a time: if a fetch is
  /// already running, this call does not issue another one but awaits the
  /// running fetch's settlement and returns its outcome.
  pub async fn fetch<F, Fut>(
    &self,
    key: &impl QueryKey,
    mode: WriteMode,
    fetcher: F,
  ) -> Result<(), ApiError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<TodosPage>, ApiError>>,
  {
    let hash = key.cache_hash();

    let role = {
      let mut slots = self.lock();
      let slot = slots.entry(hash.clone()).or_default();
      match &slot.in_flight {
        Some(rx) => FetchRole::Waiter(rx.clone()),
        None => {
          let (tx, rx) = watch::channel(None);
          slot.in_flight = Some(rx);
          FetchRole::Leader {
            tx,
            epoch: slot.epoch,
          }
        }
      }
    };

    let (tx, epoch) = match role {
      FetchRole::Waiter(mut rx) => {
        // Share the outcome of the fetch already in flight.
        loop {
          if let Some(outcome) = rx.borrow_and_update().clone() {
            return outcome;
          }
          if rx.changed().await.is_err() {
            return Err(ApiError::Network("in-flight fetch abandoned".into()));
          }
        }
      }
      FetchRole::Leader { tx, epoch } => (tx, epoch),
    };

    debug!(key = %key.description(), ?mode, "fetching");
    let outcome = fetcher().await;
    let settlement: Result<(), ApiError> = outcome.as_ref().map(|_| ()).map_err(Clone::clone);

    {
      let mut slots = self.lock();
      if let Some(slot) = slots.get_mut(&hash) {
        // Skip applying if the fetch was cancelled or invalidated while
        // running; a newer fetch may already own the slot.
        if slot.epoch == epoch {
          if let Ok(pages) = outcome {
            let mut entry = slot.entry.take().unwrap_or_default();
            match mode {
              WriteMode::Replace => {
                entry.pages = pages;
                slot.stale = false;
              }
              WriteMode::Append => entry.pages.extend(pages),
            }
            slot.entry = Some(entry);
          }
          slot.in_flight = None;
        }
      }
    }

    let _ = tx.send(Some(settlement.clone()));
    settlement
  }
}
