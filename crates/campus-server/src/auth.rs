//! HTTP Basic authentication against argon2-hashed accounts.
//!
//! A verified username becomes the request's [`Identity`]; the
//! [`authenticate`] middleware inserts it into the request extensions where
//! [`campus_api::Caller`] picks it up.

use std::{collections::HashMap, sync::Arc};

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  extract::{Request, State},
  http::HeaderMap,
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use campus_core::Identity;
use rand_core::OsRng;
use serde::Deserialize;
use tracing::warn;

use crate::error::Error;

/// One login accepted by this server instance.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Credentials accepted as valid, keyed by username.
#[derive(Clone, Default)]
pub struct AuthConfig {
  accounts: HashMap<String, String>,
}

impl AuthConfig {
  /// Build from configured accounts, rejecting hashes that do not parse.
  pub fn new(accounts: &[Account]) -> Result<Self, Error> {
    let mut map = HashMap::with_capacity(accounts.len());
    for account in accounts {
      PasswordHash::new(&account.password_hash).map_err(|_| Error::InvalidHash {
        username: account.username.clone(),
      })?;
      map.insert(account.username.clone(), account.password_hash.clone());
    }
    Ok(Self { accounts: map })
  }
}

/// Produce an argon2 PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| Error::Hash(e.to_string()))?
      .to_string(),
  )
}

/// Verify Basic credentials from headers and return the caller's identity.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<Identity, Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  let Some(stored) = config.accounts.get(username) else {
    warn!(username, "login for unknown account");
    return Err(Error::Unauthorized);
  };

  let parsed_hash = PasswordHash::new(stored).map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| {
      warn!(username, "wrong password");
      Error::Unauthorized
    })?;

  Ok(Identity::new(username))
}

/// Middleware: authenticate the request or answer 401.
pub async fn authenticate(
  State(auth): State<Arc<AuthConfig>>,
  mut req: Request,
  next: Next,
) -> Result<Response, Error> {
  let identity = verify_auth(req.headers(), &auth)?;
  req.extensions_mut().insert(identity);
  Ok(next.run(req).await)
}
