//! Handlers for `/approvals` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/approvals` | Admin only; oldest request first |
//! | `POST` | `/approvals/request` | Opens a pending request for the caller; 204 |
//! | `PUT`  | `/approvals/{identity}` | Body: `{"status":"approved"}`; admin only |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use campus_core::{
  Identity,
  approval::{ApprovalRecord, ApprovalStatus},
  registry::Registry,
  store::SchoolStore,
};
use serde::{Deserialize, Serialize};

use crate::{caller::Caller, error::ApiError};

/// Body of every approval decision endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct DecisionBody {
  pub status: ApprovalStatus,
}

/// `GET /approvals`
pub async fn list<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
) -> Result<Json<Vec<ApprovalRecord>>, ApiError> {
  Ok(Json(registry.list_approvals(&caller).await?))
}

/// `POST /approvals/request`
pub async fn request<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
) -> Result<StatusCode, ApiError> {
  registry.request_approval(&caller).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `PUT /approvals/{identity}`
pub async fn set<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
  Path(subject): Path<Identity>,
  Json(body): Json<DecisionBody>,
) -> Result<StatusCode, ApiError> {
  registry.set_approval(&caller, subject, body.status).await?;
  Ok(StatusCode::NO_CONTENT)
}
