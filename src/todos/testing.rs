//! In-memory fake of the todo API for exercising the feed and the
//! mutation engine without a server.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::ApiError;

use super::client::{ListParams, TodosApi};
use super::types::{PageInfo, Todo, TodoDraft, TodoStatus, TodosPage};

pub fn todo(id: &str, title: &str) -> Todo {
  let at = "2025-01-01T00:00:00Z".parse().unwrap();
  Todo {
    id: id.into(),
    title: title.into(),
    description: None,
    image_url: None,
    status: TodoStatus::Todo,
    created_at: at,
    updated_at: at,
  }
}

/// Server-side collection with configurable failures and latency.
pub struct FakeApi {
  items: Mutex<Vec<Todo>>,
  pub list_calls: AtomicU32,
  pub last_params: Mutex<Option<ListParams>>,
  fail_lists: Mutex<Option<(u32, ApiError)>>,
  fail_mutations: AtomicBool,
  list_delay: Mutex<Option<Duration>>,
  mutation_delay: Mutex<Option<Duration>>,
  next_id: AtomicU32,
}

impl FakeApi {
  pub fn new(items: Vec<Todo>) -> Self {
    Self {
      items: Mutex::new(items),
      list_calls: AtomicU32::new(0),
      last_params: Mutex::new(None),
      fail_lists: Mutex::new(None),
      fail_mutations: AtomicBool::new(false),
      list_delay: Mutex::new(None),
      mutation_delay: Mutex::new(None),
      next_id: AtomicU32::new(0),
    }
  }

  /// Fail the next `count` list calls with `error`.
  pub fn fail_next_lists(&self, count: u32, error: ApiError) {
    *self.fail_lists.lock().unwrap() = Some((count, error));
  }

  pub fn fail_mutations(&self, on: bool) {
    self.fail_mutations.store(on, Ordering::SeqCst);
  }

  pub fn set_list_delay(&self, delay: Duration) {
    *self.list_delay.lock().unwrap() = Some(delay);
  }

  pub fn set_mutation_delay(&self, delay: Duration) {
    *self.mutation_delay.lock().unwrap() = Some(delay);
  }

  pub fn items(&self) -> Vec<Todo> {
    self.items.lock().unwrap().clone()
  }

  fn page_of(items: &[Todo], page: u32, limit: u32) -> TodosPage {
    let total = items.len() as u32;
    let start = ((page - 1) * limit) as usize;
    let todos: Vec<Todo> = items.iter().skip(start).take(limit as usize).cloned().collect();
    let last_page = total.div_ceil(limit).max(1);

    TodosPage {
      info: PageInfo {
        page,
        limit,
        results: todos.len() as u32,
        total,
        next_page: (page < last_page).then(|| page + 1),
        previous_page: (page > 1).then(|| page - 1),
      },
      todos,
    }
  }

  async fn mutation_gate(&self) -> Result<(), ApiError> {
    let delay = *self.mutation_delay.lock().unwrap();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
    if self.fail_mutations.load(Ordering::SeqCst) {
      return Err(ApiError::Network("mutation refused".into()));
    }
    Ok(())
  }
}

#[async_trait]
impl TodosApi for FakeApi {
  async fn list_todos(&self, params: &ListParams) -> Result<TodosPage, ApiError> {
    self.list_calls.fetch_add(1, Ordering::SeqCst);
    *self.last_params.lock().unwrap() = Some(params.clone());

    let delay = *self.list_delay.lock().unwrap();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }

    {
      let mut fail = self.fail_lists.lock().unwrap();
      if let Some((remaining, error)) = fail.as_mut() {
        if *remaining > 0 {
          *remaining -= 1;
          return Err(error.clone());
        }
      }
    }

    let items = self.items.lock().unwrap();
    let filtered: Vec<Todo> = items
      .iter()
      .filter(|todo| params.search.is_empty() || todo.title.contains(&params.search))
      .filter(|todo| params.status.is_empty() || params.status.contains(&todo.status))
      .cloned()
      .collect();

    Ok(Self::page_of(&filtered, params.page.max(1), params.limit.max(1)))
  }

  async fn get_todo(&self, id: &str) -> Result<Todo, ApiError> {
    self
      .items
      .lock()
      .unwrap()
      .iter()
      .find(|todo| todo.id == id)
      .cloned()
      .ok_or_else(|| ApiError::NotFound(id.to_string()))
  }

  async fn create_todo(&self, draft: &TodoDraft) -> Result<Todo, ApiError> {
    self.mutation_gate().await?;

    let id = format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
    let now = Utc::now();
    let created = Todo {
      id,
      title: draft.title.clone(),
      description: draft.description.clone(),
      image_url: None,
      status: draft.status,
      created_at: now,
      updated_at: now,
    };
    self.items.lock().unwrap().insert(0, created.clone());
    Ok(created)
  }

  async fn update_todo(&self, id: &str, draft: &TodoDraft) -> Result<Todo, ApiError> {
    self.mutation_gate().await?;

    let mut items = self.items.lock().unwrap();
    let todo = items
      .iter_mut()
      .find(|todo| todo.id == id)
      .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
    todo.title = draft.title.clone();
    todo.description = draft.description.clone();
    todo.status = draft.status;
    todo.updated_at = Utc::now();
    Ok(todo.clone())
  }

  async fn delete_todo(&self, id: &str) -> Result<(), ApiError> {
    self.mutation_gate().await?;

    let mut items = self.items.lock().unwrap();
    let before = items.len();
    items.retain(|todo| todo.id != id);
    if items.len() == before {
      return Err(ApiError::NotFound(id.to_string()));
    }
    Ok(())
  }
}
