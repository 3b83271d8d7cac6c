//! Handlers for the caller's own account.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/session` | `{"identity": "..."}` |
//! | `GET`  | `/profile` | `null` until profile setup |
//! | `PUT`  | `/profile` | Body: [`Profile`]; 204 |
//! | `GET`  | `/role` | `"admin" \| "user" \| "guest"` |
//! | `GET`  | `/caller/admin` | `true` / `false` |
//! | `GET`  | `/caller/approved` | `true` / `false` |
//! | `POST` | `/roles` | Body: `{"identity":"...","role":"admin"}`; admin only |

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use campus_core::{
  Identity,
  identity::{Profile, Role},
  registry::Registry,
  store::SchoolStore,
};
use serde::{Deserialize, Serialize};

use crate::{caller::Caller, error::ApiError};

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionBody {
  pub identity: Identity,
}

/// `GET /session`
pub async fn whoami(Caller(caller): Caller) -> Json<SessionBody> {
  Json(SessionBody { identity: caller })
}

/// `GET /profile`
pub async fn get_profile<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
) -> Result<Json<Option<Profile>>, ApiError> {
  Ok(Json(registry.get_caller_user_profile(&caller).await?))
}

/// `PUT /profile`
pub async fn save_profile<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
  Json(profile): Json<Profile>,
) -> Result<StatusCode, ApiError> {
  registry.save_caller_user_profile(&caller, profile).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /role`
pub async fn role<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
) -> Result<Json<Role>, ApiError> {
  Ok(Json(registry.get_caller_user_role(&caller).await?))
}

/// `GET /caller/admin`
pub async fn is_admin<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
) -> Result<Json<bool>, ApiError> {
  Ok(Json(registry.is_caller_admin(&caller).await?))
}

/// `GET /caller/approved`
pub async fn is_approved<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
) -> Result<Json<bool>, ApiError> {
  Ok(Json(registry.is_caller_approved(&caller).await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssignRoleBody {
  pub identity: Identity,
  pub role:     Role,
}

/// `POST /roles`
pub async fn assign_role<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
  Json(body): Json<AssignRoleBody>,
) -> Result<StatusCode, ApiError> {
  registry
    .assign_caller_user_role(&caller, body.identity, body.role)
    .await?;
  Ok(StatusCode::NO_CONTENT)
}
