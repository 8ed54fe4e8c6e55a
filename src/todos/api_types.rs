//! Serde-deserializable types matching the todo API responses.
//!
//! These are separate from domain types so that schema validation is an
//! explicit step: a response that fails conversion is rejected as a fatal
//! error for that operation, never silently coerced.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

use crate::error::ApiError;
use crate::session::Principal;

use super::types::{PageInfo, Todo, TodoStatus, TodosPage};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTodo {
  pub id: String,
  pub title: String,
  pub description: Option<String>,
  pub image_url: Option<Url>,
  pub status: TodoStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl ApiTodo {
  pub fn into_domain(self) -> Result<Todo, ApiError> {
    if self.id.is_empty() {
      return Err(ApiError::Schema("todo with empty id".into()));
    }
    if self.title.is_empty() {
      return Err(ApiError::Schema(format!("todo {} has an empty title", self.id)));
    }

    Ok(Todo {
      id: self.id,
      title: self.title,
      description: self.description,
      image_url: self.image_url,
      status: self.status,
      created_at: self.created_at,
      updated_at: self.updated_at,
    })
  }
}

/// `GET /api/v1/todos` response body.
#[derive(Debug, Deserialize)]
pub struct ApiTodosResponse {
  pub todos: Vec<ApiTodo>,
  pub info: PageInfo,
}

impl ApiTodosResponse {
  pub fn into_domain(self) -> Result<TodosPage, ApiError> {
    let todos = self
      .todos
      .into_iter()
      .map(ApiTodo::into_domain)
      .collect::<Result<Vec<_>, _>>()?;

    Ok(TodosPage { todos, info: self.info })
  }
}

/// `POST`/`PUT` todo response body.
#[derive(Debug, Deserialize)]
pub struct ApiTodoResponse {
  pub todo: ApiTodo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUser {
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

impl ApiUser {
  pub fn into_domain(self) -> Result<Principal, ApiError> {
    if self.id.is_empty() || self.email.is_empty() {
      return Err(ApiError::Schema("user with empty id or email".into()));
    }

    Ok(Principal {
      id: self.id,
      firebase_id: self.firebase_id,
      first_name: self.first_name,
      last_name: self.last_name,
      full_name: self.full_name,
      email: self.email,
      profile_picture_url: self.profile_picture_url,
      is_deleted: self.is_deleted,
      created_at: self.created_at,
      updated_at: self.updated_at,
    })
  }
}

/// Auth endpoints response body.
#[derive(Debug, Deserialize)]
pub struct ApiUserResponse {
  pub user: ApiUser,
}
