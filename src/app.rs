//! Application wiring and top-level operations.

use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;

use crate::auth::{CredentialProvider, EnvCredentialProvider};
use crate::cache::QueryCache;
use crate::config::Config;
use crate::session::{Principal, SessionStore};
use crate::todos::client::{TodosApi, TodosClient};
use crate::todos::feed::TodoFeed;
use crate::todos::keys::TodoQueryKey;
use crate::todos::mutations::{MutationEngine, MutationOutcome, TodoMutation};
use crate::todos::types::{ImageUpload, SignUpDraft, Todo, TodoDraft, TodoStatus};

/// Owns the process-wide state: the session, the credential provider and
/// the one query cache every feed and mutation goes through.
pub struct App {
  config: Config,
  session: SessionStore,
  credentials: Arc<dyn CredentialProvider>,
  client: Arc<TodosClient>,
  cache: QueryCache,
}

impl App {
  pub async fn new(config: Config) -> Result<Self> {
    let credentials: Arc<dyn CredentialProvider> = Arc::new(EnvCredentialProvider);
    let client = Arc::new(TodosClient::new(&config.api.url, Arc::clone(&credentials)));

    let mut session = SessionStore::open()?;
    // a cached principal without a live credential is forcibly cleared
    session.reconcile(credentials.as_ref()).await?;

    Ok(Self {
      config,
      session,
      credentials,
      client,
      cache: QueryCache::new(),
    })
  }

  fn api(&self) -> Arc<dyn TodosApi> {
    Arc::clone(&self.client) as Arc<dyn TodosApi>
  }

  fn require_principal(&self) -> Result<&Principal> {
    self
      .session
      .principal()
      .ok_or_else(|| eyre!("Not signed in. Run `todoq login` first."))
  }

  /// Fetch up to `pages` pages for the given filter and return the
  /// flattened sequence.
  pub async fn list(
    &self,
    search: String,
    status: Vec<TodoStatus>,
    pages: u32,
  ) -> Result<Vec<Todo>> {
    self.require_principal()?;

    let key = TodoQueryKey::new(search, status);
    let feed = TodoFeed::new(self.cache.clone(), self.api(), key, self.config.page_limit);

    let mut fetched = 0;
    loop {
      feed.load_more().await?;
      fetched += 1;
      if fetched >= pages.max(1) || !feed.has_more() {
        break;
      }
    }

    Ok(feed.todos())
  }

  pub async fn create(&self, draft: TodoDraft) -> Result<Todo> {
    self.require_principal()?;
    match self.engine().execute(&TodoQueryKey::default(), TodoMutation::Create(draft)).await? {
      MutationOutcome::Created(todo) => Ok(todo),
      other => Err(eyre!("unexpected mutation outcome: {:?}", other)),
    }
  }

  /// Update a todo. The PUT replaces the whole resource, so fields left
  /// unspecified are filled in from the todo's current state first.
  pub async fn update(
    &self,
    id: String,
    title: Option<String>,
    description: Option<String>,
    status: Option<TodoStatus>,
    image: Option<ImageUpload>,
  ) -> Result<Todo> {
    self.require_principal()?;
    let current = self.client.get_todo(&id).await?;
    let draft = TodoDraft::for_edit(current, title, description, status, image);
    let mutation = TodoMutation::Update { id, draft };
    match self.engine().execute(&TodoQueryKey::default(), mutation).await? {
      MutationOutcome::Updated(todo) => Ok(todo),
      other => Err(eyre!("unexpected mutation outcome: {:?}", other)),
    }
  }

  pub async fn delete(&self, id: String) -> Result<()> {
    self.require_principal()?;
    self
      .engine()
      .execute(&TodoQueryKey::default(), TodoMutation::Delete { id })
      .await?;
    Ok(())
  }

  fn engine(&self) -> MutationEngine {
    MutationEngine::new(self.cache.clone(), self.api())
  }

  /// Exchange the identity provider's live token for the principal's
  /// profile and persist it.
  pub async fn login(&mut self, email: String) -> Result<Principal> {
    let token = self
      .credentials
      .bearer_token()
      .await
      .ok_or_else(|| eyre!(
        "No identity-provider token available. Sign in with the identity provider and export TODOQ_API_TOKEN."
      ))?;

    let principal = self.client.login(&email, &token).await?;
    self.session.set_principal(principal.clone())?;
    Ok(principal)
  }

  /// Clear the session and drop every cached page.
  pub fn logout(&mut self) -> Result<()> {
    self.cache.clear();
    self.session.clear()
  }

  pub fn whoami(&self) -> Option<&Principal> {
    self.session.principal()
  }

  pub async fn sign_up(&self, draft: SignUpDraft) -> Result<Principal> {
    Ok(self.client.sign_up(&draft).await?)
  }
}
