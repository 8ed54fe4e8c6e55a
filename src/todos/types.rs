use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Lifecycle status of a todo.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TodoStatus {
  #[default]
  Todo,
  InProgress,
  Completed,
}

impl TodoStatus {
  pub const ALL: [TodoStatus; 3] = [TodoStatus::Todo, TodoStatus::InProgress, TodoStatus::Completed];

  /// Wire representation, as sent in `status` query parameters and forms.
  pub fn as_str(&self) -> &'static str {
    match self {
      TodoStatus::Todo => "TODO",
      TodoStatus::InProgress => "IN_PROGRESS",
      TodoStatus::Completed => "COMPLETED",
    }
  }
}

impl fmt::Display for TodoStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TodoStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_uppercase().replace('-', "_").as_str() {
      "TODO" => Ok(TodoStatus::Todo),
      "IN_PROGRESS" => Ok(TodoStatus::InProgress),
      "COMPLETED" => Ok(TodoStatus::Completed),
      other => Err(format!(
        "unknown status '{}' (expected todo, in-progress or completed)",
        other
      )),
    }
  }
}

/// A todo item as held in the working set.
///
/// `id` and the timestamps are server-assigned; provisional items carry a
/// locally-unique temp id until the settle-time refetch replaces them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
  pub id: String,
  pub title: String,
  pub description: Option<String>,
  pub image_url: Option<Url>,
  pub status: TodoStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Pagination metadata for one fetched page. Page boundaries are
/// server-determined and never recomputed client-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
  pub page: u32,
  pub limit: u32,
  /// Result count in this page.
  pub results: u32,
  /// Total result count across all pages under the current filter.
  pub total: u32,
  pub next_page: Option<u32>,
  pub previous_page: Option<u32>,
}

/// One fetched page: an ordered sequence of todos plus its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodosPage {
  pub todos: Vec<Todo>,
  pub info: PageInfo,
}

/// All fetched pages for one query key, in fetch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheEntry {
  pub pages: Vec<TodosPage>,
}

impl CacheEntry {
  /// Concatenation of all fetched pages, in page order then item order
  /// within page. No de-duplication beyond server-provided page contents.
  pub fn flatten(&self) -> Vec<Todo> {
    self
      .pages
      .iter()
      .flat_map(|page| page.todos.iter().cloned())
      .collect()
  }

  /// The page number to fetch next, from the last fetched page's cursor.
  pub fn next_page(&self) -> Option<u32> {
    self.pages.last().and_then(|page| page.info.next_page)
  }

  /// True iff the last fetched page reports a successor.
  pub fn has_more(&self) -> bool {
    self.next_page().is_some()
  }
}

/// An image attached to a create/update form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
  pub file_name: String,
  pub bytes: Vec<u8>,
}

/// Input to a create or update mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoDraft {
  pub title: String,
  pub description: Option<String>,
  pub image: Option<ImageUpload>,
  pub status: TodoStatus,
}

impl TodoDraft {
  /// Draft for a full-replacement update. The form always sends every
  /// field, so unspecified ones carry over from the todo's current state
  /// rather than resetting to defaults.
  pub fn for_edit(
    current: Todo,
    title: Option<String>,
    description: Option<String>,
    status: Option<TodoStatus>,
    image: Option<ImageUpload>,
  ) -> Self {
    Self {
      title: title.unwrap_or(current.title),
      description: description.or(current.description),
      image,
      status: status.unwrap_or(current.status),
    }
  }
}

/// Input to the sign-up operation.
#[derive(Debug, Clone, Default)]
pub struct SignUpDraft {
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub password: String,
  pub profile_picture: Option<ImageUpload>,
}
