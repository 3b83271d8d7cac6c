//! Session state and the authentication seam.
//!
//! The interactive ceremony itself is external: an [`Authenticator`] runs it
//! and yields a [`SchoolBackend`] bound to the resulting identity. The portal
//! only tracks which phase the session is in.

use std::{future::Future, sync::Arc};

use campus_core::{
  Identity, Result,
  backend::{LocalBackend, SchoolBackend},
  registry::Registry,
  store::SchoolStore,
};

use crate::client::{ApiClient, ApiConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
  /// Startup; nothing is known yet.
  #[default]
  Initializing,
  Unauthenticated,
  /// A login ceremony is pending.
  Authenticating,
  Authenticated,
}

/// What a call to `Portal::login` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
  LoggedIn(Identity),
  /// Another login was already pending; this call did nothing.
  InProgress,
  /// A logout arrived while the ceremony was pending; its result was dropped.
  Cancelled,
}

/// Runs a login ceremony.
pub trait Authenticator: Send + Sync {
  type Backend: SchoolBackend + Clone + 'static;

  fn authenticate(&self) -> impl Future<Output = Result<Self::Backend>> + Send + '_;
}

// ─── Password ─────────────────────────────────────────────────────────────────

/// HTTP Basic credentials, checked against the server's `/session` endpoint.
pub struct PasswordAuthenticator {
  pub config: ApiConfig,
}

impl Authenticator for PasswordAuthenticator {
  type Backend = ApiClient;

  async fn authenticate(&self) -> Result<ApiClient> {
    let client = ApiClient::new(self.config.clone())?;
    let identity = client.whoami().await?;
    tracing::debug!(%identity, "credentials accepted");
    Ok(client.with_identity(identity))
  }
}

// ─── Local ────────────────────────────────────────────────────────────────────

/// Logs straight in as a fixed identity against an in-process registry.
pub struct LocalAuthenticator<S> {
  pub registry: Arc<Registry<S>>,
  pub identity: Identity,
}

impl<S: SchoolStore + 'static> Authenticator for LocalAuthenticator<S> {
  type Backend = LocalBackend<S>;

  async fn authenticate(&self) -> Result<LocalBackend<S>> {
    Ok(LocalBackend::new(
      Arc::clone(&self.registry),
      self.identity.clone(),
    ))
  }
}
