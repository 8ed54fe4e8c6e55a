//! Query key derivation for the todo collection.

use std::collections::BTreeSet;

use crate::cache::QueryKey;

use super::types::TodoStatus;

/// The {search, status} tuple identifying one independently paginated
/// result sequence.
///
/// Status is a set: comparison is order-independent, so equal inputs
/// always derive the same key. Changing either component selects a new
/// key; the old sequence's pages and cursor are never merged into it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoQueryKey {
  pub search: String,
  pub status: BTreeSet<TodoStatus>,
}

impl TodoQueryKey {
  pub fn new(search: impl Into<String>, status: impl IntoIterator<Item = TodoStatus>) -> Self {
    Self {
      search: search.into(),
      status: status.into_iter().collect(),
    }
  }
}

impl QueryKey for TodoQueryKey {
  fn key_material(&self) -> String {
    let statuses: Vec<&str> = self.status.iter().map(TodoStatus::as_str).collect();
    format!("todos:{}:{}", self.search, statuses.join(","))
  }

  fn description(&self) -> String {
    match (self.search.is_empty(), self.status.is_empty()) {
      (true, true) => "todos".to_string(),
      (false, true) => format!("todos matching '{}'", self.search),
      (true, false) => format!("todos with status {}", self.key_status_list()),
      (false, false) => format!(
        "todos matching '{}' with status {}",
        self.search,
        self.key_status_list()
      ),
    }
  }
}

impl TodoQueryKey {
  fn key_status_list(&self) -> String {
    self
      .status
      .iter()
      .map(TodoStatus::as_str)
      .collect::<Vec<_>>()
      .join("|")
  }
}
