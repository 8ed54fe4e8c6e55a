//! Remote collection client for the todo API.

use async_trait::async_trait;
use reqwest::multipart;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::auth::CredentialProvider;
use crate::error::ApiError;
use crate::session::Principal;

use super::api_types::{ApiTodoResponse, ApiTodosResponse, ApiUserResponse};
use super::types::{SignUpDraft, Todo, TodoDraft, TodoStatus, TodosPage};

const TODOS_PATH: &str = "/api/v1/todos";
const LOGIN_PATH: &str = "/api/v1/auth/login";
const SIGN_UP_PATH: &str = "/api/v1/auth/sign-up";

/// Parameters for one list-page request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
  pub page: u32,
  pub limit: u32,
  pub search: String,
  /// Serialized as repeated `status` query parameters, one per value.
  /// An empty vec means "filter not applied" (server-defined default).
  pub status: Vec<TodoStatus>,
}

impl ListParams {
  /// Query pairs for the request. Falsy values (empty search, zero
  /// page/limit) are omitted rather than sent as empty parameters.
  pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if self.page != 0 {
      pairs.push(("page", self.page.to_string()));
    }
    if self.limit != 0 {
      pairs.push(("limit", self.limit.to_string()));
    }
    if !self.search.is_empty() {
      pairs.push(("search", self.search.clone()));
    }
    for status in &self.status {
      pairs.push(("status", status.as_str().to_string()));
    }
    pairs
  }
}

/// The four collection operations, as seen by the feed and the mutation
/// engine. A trait so those layers can be exercised without a server.
#[async_trait]
pub trait TodosApi: Send + Sync {
  async fn list_todos(&self, params: &ListParams) -> Result<TodosPage, ApiError>;
  async fn get_todo(&self, id: &str) -> Result<Todo, ApiError>;
  async fn create_todo(&self, draft: &TodoDraft) -> Result<Todo, ApiError>;
  async fn update_todo(&self, id: &str, draft: &TodoDraft) -> Result<Todo, ApiError>;
  async fn delete_todo(&self, id: &str) -> Result<(), ApiError>;
}

/// HTTP client for the todo API.
///
/// Every request re-derives its bearer credential live from the
/// credential provider; a missing token sends no Authorization header and
/// the server's 401/403 is reported as unauthorized.
pub struct TodosClient {
  http: reqwest::Client,
  base_url: String,
  credentials: Arc<dyn CredentialProvider>,
}

impl TodosClient {
  pub fn new(base_url: &str, credentials: Arc<dyn CredentialProvider>) -> Self {
    Self {
      http: reqwest::Client::new(),
      base_url: base_url.trim_end_matches('/').to_string(),
      credentials,
    }
  }

  fn endpoint(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  async fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match self.credentials.bearer_token().await {
      Some(token) => request.bearer_auth(token),
      None => request,
    }
  }

  /// Send a request and classify any non-success status per the error
  /// taxonomy.
  async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
    let response = request
      .send()
      .await
      .map_err(|err| ApiError::Network(err.to_string()))?;

    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }

    let detail = response.text().await.unwrap_or_default();
    Err(ApiError::from_status(status.as_u16(), detail))
  }

  async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let body = response
      .text()
      .await
      .map_err(|err| ApiError::Network(err.to_string()))?;
    serde_json::from_str(&body).map_err(|err| ApiError::Schema(err.to_string()))
  }

  fn draft_form(draft: &TodoDraft) -> multipart::Form {
    let mut form = multipart::Form::new()
      .text("title", draft.title.clone())
      .text("status", draft.status.as_str().to_string());
    if let Some(description) = &draft.description {
      form = form.text("description", description.clone());
    }
    if let Some(image) = &draft.image {
      let part = multipart::Part::bytes(image.bytes.clone()).file_name(image.file_name.clone());
      form = form.part("image", part);
    }
    form
  }

  /// Exchange an identity-provider token for the principal's profile.
  pub async fn login(&self, email: &str, id_token: &str) -> Result<Principal, ApiError> {
    let body = serde_json::json!({ "email": email, "firebaseIdToken": id_token });
    let request = self.authorize(self.http.post(self.endpoint(LOGIN_PATH)).json(&body)).await;
    let response = self.send(request).await?;
    let decoded: ApiUserResponse = Self::decode(response).await?;
    decoded.user.into_domain()
  }

  /// Register a new account. A duplicate email surfaces as a conflict.
  pub async fn sign_up(&self, draft: &SignUpDraft) -> Result<Principal, ApiError> {
    let mut form = multipart::Form::new()
      .text("firstName", draft.first_name.clone())
      .text("lastName", draft.last_name.clone())
      .text("email", draft.email.clone())
      .text("password", draft.password.clone());
    if let Some(picture) = &draft.profile_picture {
      let part =
        multipart::Part::bytes(picture.bytes.clone()).file_name(picture.file_name.clone());
      form = form.part("profilePicture", part);
    }

    let request = self
      .authorize(self.http.post(self.endpoint(SIGN_UP_PATH)).multipart(form))
      .await;
    let response = self.send(request).await?;
    let decoded: ApiUserResponse = Self::decode(response).await?;
    decoded.user.into_domain()
  }
}

#[async_trait]
impl TodosApi for TodosClient {
  async fn list_todos(&self, params: &ListParams) -> Result<TodosPage, ApiError> {
    let request = self
      .authorize(self.http.get(self.endpoint(TODOS_PATH)).query(&params.query_pairs()))
      .await;
    let response = self.send(request).await?;
    let decoded: ApiTodosResponse = Self::decode(response).await?;
    decoded.into_domain()
  }

  async fn get_todo(&self, id: &str) -> Result<Todo, ApiError> {
    let url = format!("{}/{}", self.endpoint(TODOS_PATH), id);
    let request = self.authorize(self.http.get(url)).await;
    let response = self.send(request).await?;
    let decoded: ApiTodoResponse = Self::decode(response).await?;
    decoded.todo.into_domain()
  }

  async fn create_todo(&self, draft: &TodoDraft) -> Result<Todo, ApiError> {
    let request = self
      .authorize(self.http.post(self.endpoint(TODOS_PATH)).multipart(Self::draft_form(draft)))
      .await;
    let response = self.send(request).await?;
    let decoded: ApiTodoResponse = Self::decode(response).await?;
    decoded.todo.into_domain()
  }

  async fn update_todo(&self, id: &str, draft: &TodoDraft) -> Result<Todo, ApiError> {
    let url = format!("{}/{}", self.endpoint(TODOS_PATH), id);
    let request = self
      .authorize(self.http.put(url).multipart(Self::draft_form(draft)))
      .await;
    let response = self.send(request).await?;
    let decoded: ApiTodoResponse = Self::decode(response).await?;
    decoded.todo.into_domain()
  }

  async fn delete_todo(&self, id: &str) -> Result<(), ApiError> {
    let url = format!("{}/{}", self.endpoint(TODOS_PATH), id);
    let request = self.authorize(self.http.delete(url)).await;
    // 2xx with no body required
    self.send(request).await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::auth::StaticCredential;
  use wiremock::matchers::{header, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn client(server: &MockServer, token: Option<&str>) -> TodosClient {
    TodosClient::new(
      &server.uri(),
      Arc::new(StaticCredential(token.map(String::from))),
    )
  }

  fn todos_body(ids: &[&str], next_page: Option<u32>) -> serde_json::Value {
    let todos: Vec<serde_json::Value> = ids
      .iter()
      .map(|id| {
        serde_json::json!({
          "id": id,
          "title": format!("todo {}", id),
          "description": null,
          "imageUrl": null,
          "status": "TODO",
          "createdAt": "2025-01-01T00:00:00Z",
          "updatedAt": "2025-01-01T00:00:00Z"
        })
      })
      .collect();
    serde_json::json!({
      "todos": todos,
      "info": {
        "page": 1,
        "limit": 10,
        "results": ids.len(),
        "total": ids.len(),
        "nextPage": next_page,
        "previousPage": null
      }
    })
  }

  #[test]
  fn test_query_pairs_repeat_status_and_prune_falsy() {
    let params = ListParams {
      page: 2,
      limit: 10,
      search: String::new(),
      status: vec![TodoStatus::Todo, TodoStatus::Completed],
    };
    assert_eq!(
      params.query_pairs(),
      vec![
        ("page", "2".to_string()),
        ("limit", "10".to_string()),
        ("status", "TODO".to_string()),
        ("status", "COMPLETED".to_string()),
      ]
    );

    // omission means "filter not applied", not an empty parameter
    let bare = ListParams::default();
    assert!(bare.query_pairs().is_empty());
  }

  #[tokio::test]
  async fn test_list_attaches_bearer_and_status_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v1/todos"))
      .and(header("Authorization", "Bearer secret"))
      .and(query_param("page", "1"))
      .and(query_param("search", "milk"))
      .and(query_param("status", "TODO"))
      .respond_with(ResponseTemplate::new(200).set_body_json(todos_body(&["a"], None)))
      .mount(&server)
      .await;

    let params = ListParams {
      page: 1,
      limit: 10,
      search: "milk".into(),
      status: vec![TodoStatus::Todo],
    };
    let page = client(&server, Some("secret")).list_todos(&params).await.unwrap();
    assert_eq!(page.todos.len(), 1);
    assert_eq!(page.todos[0].id, "a");
  }

  #[tokio::test]
  async fn test_missing_token_sends_no_header_and_401_maps_to_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v1/todos"))
      .respond_with(ResponseTemplate::new(401))
      .mount(&server)
      .await;

    let err = client(&server, None)
      .list_todos(&ListParams::default())
      .await
      .unwrap_err();
    assert_eq!(err, ApiError::Unauthorized);
  }

  #[tokio::test]
  async fn test_schema_invalid_body_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v1/todos"))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "unexpected": true })),
      )
      .mount(&server)
      .await;

    let err = client(&server, Some("secret"))
      .list_todos(&ListParams::default())
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Schema(_)));
  }

  #[tokio::test]
  async fn test_create_decodes_created_todo() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/v1/todos"))
      .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
        "todo": {
          "id": "srv-1",
          "title": "Test Todo",
          "description": "Test Description",
          "imageUrl": null,
          "status": "TODO",
          "createdAt": "2025-01-01T00:00:00Z",
          "updatedAt": "2025-01-01T00:00:00Z"
        }
      })))
      .mount(&server)
      .await;

    let draft = TodoDraft {
      title: "Test Todo".into(),
      description: Some("Test Description".into()),
      ..TodoDraft::default()
    };
    let todo = client(&server, Some("secret")).create_todo(&draft).await.unwrap();
    assert_eq!(todo.id, "srv-1");
  }

  #[tokio::test]
  async fn test_get_decodes_single_todo() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v1/todos/abc"))
      .and(header("Authorization", "Bearer secret"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "todo": {
          "id": "abc",
          "title": "Fetched",
          "description": null,
          "imageUrl": null,
          "status": "IN_PROGRESS",
          "createdAt": "2025-01-01T00:00:00Z",
          "updatedAt": "2025-01-01T00:00:00Z"
        }
      })))
      .mount(&server)
      .await;

    let todo = client(&server, Some("secret")).get_todo("abc").await.unwrap();
    assert_eq!(todo.id, "abc");
    assert_eq!(todo.status, TodoStatus::InProgress);
  }

  #[tokio::test]
  async fn test_sign_up_conflict_surfaces_as_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/v1/auth/sign-up"))
      .respond_with(ResponseTemplate::new(409).set_body_string("email taken"))
      .mount(&server)
      .await;

    let draft = SignUpDraft {
      email: "a@b.c".into(),
      ..SignUpDraft::default()
    };
    let err = client(&server, None).sign_up(&draft).await.unwrap_err();
    assert_eq!(err, ApiError::Conflict("email taken".into()));
  }

  #[tokio::test]
  async fn test_delete_accepts_empty_success_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
      .and(path("/api/v1/todos/abc"))
      .respond_with(ResponseTemplate::new(204))
      .mount(&server)
      .await;

    client(&server, Some("secret")).delete_todo("abc").await.unwrap();
  }
}
