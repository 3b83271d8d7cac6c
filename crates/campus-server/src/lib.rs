//! HTTP server for Campus.
//!
//! Wraps the [`campus_api`] router with Basic authentication and request
//! tracing, backed by any [`SchoolStore`].

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware, routing::get};
use campus_core::{Identity, registry::Registry, store::SchoolStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{Account, AuthConfig};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  #[serde(default)]
  pub accounts:   Vec<Account>,
  /// Usernames granted the admin role at startup.
  #[serde(default)]
  pub admins:     Vec<String>,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state for the server's router.
pub struct AppState<S> {
  pub registry: Arc<Registry<S>>,
  pub auth:     Arc<AuthConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      registry: Arc::clone(&self.registry),
      auth:     Arc::clone(&self.auth),
    }
  }
}

impl<S: SchoolStore> AppState<S> {
  /// Wrap `store` in a registry, load accounts, and grant configured admins
  /// their role.
  pub async fn from_config(store: S, config: &ServerConfig) -> Result<Self, Error> {
    let auth = AuthConfig::new(&config.accounts)?;
    let registry = Registry::new(store);
    for admin in &config.admins {
      registry.bootstrap_admin(&Identity::new(admin.as_str())).await?;
    }
    Ok(Self {
      registry: Arc::new(registry),
      auth:     Arc::new(auth),
    })
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full server [`Router`]: `/health` plus the authenticated `/api`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: SchoolStore + 'static,
{
  let api = campus_api::api_router(state.registry)
    .layer(middleware::from_fn_with_state(state.auth, auth::authenticate));

  Router::new()
    .route("/health", get(|| async { "ok" }))
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::Engine as _;
  use base64::engine::general_purpose::STANDARD as B64;
  use campus_store_sqlite::SqliteStore;
  use serde_json::Value;
  use tower::ServiceExt as _;

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let config = ServerConfig {
      host:       "127.0.0.1".to_string(),
      port:       8080,
      store_path: PathBuf::from(":memory:"),
      accounts:   vec![
        Account {
          username:      "head".to_string(),
          password_hash: auth::hash_password("chalk").unwrap(),
        },
        Account {
          username:      "pupil".to_string(),
          password_hash: auth::hash_password("crayon").unwrap(),
        },
      ],
      admins:     vec!["head".to_string()],
    };
    AppState::from_config(store, &config).await.unwrap()
  }

  fn auth_header(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  async fn get(
    state: AppState<SqliteStore>,
    uri: &str,
    auth: Option<String>,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(auth) = auth {
      builder = builder.header(header::AUTHORIZATION, auth);
    }
    let req = builder.body(Body::empty()).unwrap();
    router(state).oneshot(req).await.unwrap()
  }

  async fn json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  #[tokio::test]
  async fn health_needs_no_auth() {
    let resp = get(make_state().await, "/health", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn api_without_credentials_is_401_with_challenge() {
    let resp = get(make_state().await, "/api/session", None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let challenge = resp
      .headers()
      .get(header::WWW_AUTHENTICATE)
      .unwrap()
      .to_str()
      .unwrap()
      .to_owned();
    assert!(challenge.starts_with("Basic"));
    assert_eq!(json(resp).await["kind"], "unauthenticated");
  }

  #[tokio::test]
  async fn wrong_password_is_401() {
    let resp = get(
      make_state().await,
      "/api/session",
      Some(auth_header("pupil", "chalk")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn session_reports_authenticated_identity() {
    let resp = get(
      make_state().await,
      "/api/session",
      Some(auth_header("pupil", "crayon")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json(resp).await["identity"], "pupil");
  }

  #[tokio::test]
  async fn configured_admins_are_bootstrapped() {
    let state = make_state().await;
    let head = get(
      state.clone(),
      "/api/caller/admin",
      Some(auth_header("head", "chalk")),
    )
    .await;
    assert_eq!(json(head).await, Value::Bool(true));

    let pupil = get(state, "/api/caller/admin", Some(auth_header("pupil", "crayon"))).await;
    assert_eq!(json(pupil).await, Value::Bool(false));
  }
}
