//! Handlers for `/teachers` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/teachers` | Admin only |
//! | `POST` | `/teachers` | Body: [`TeacherRegistration`]; 201 + the stored teacher |
//! | `GET`  | `/teachers/{id}` | 404 if not found |
//! | `PUT`  | `/teachers/{id}/approval` | Body: `{"status":"approved"}`; admin only |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use campus_core::{
  Error,
  registry::Registry,
  roster::{Teacher, TeacherRegistration},
  store::SchoolStore,
};
use uuid::Uuid;

use crate::{approvals::DecisionBody, caller::Caller, error::ApiError};

/// `GET /teachers`
pub async fn list<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
) -> Result<Json<Vec<Teacher>>, ApiError> {
  Ok(Json(registry.list_teachers(&caller).await?))
}

/// `POST /teachers`
pub async fn register<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
  Json(body): Json<TeacherRegistration>,
) -> Result<impl IntoResponse, ApiError> {
  let teacher = registry.register_teacher(&caller, body).await?;
  Ok((StatusCode::CREATED, Json(teacher)))
}

/// `GET /teachers/{id}`
pub async fn get_one<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Teacher>, ApiError> {
  let teacher = registry
    .get_teacher_by_id(&caller, id)
    .await?
    .ok_or_else(|| Error::NotFound(format!("teacher {id}")))?;
  Ok(Json(teacher))
}

/// `PUT /teachers/{id}/approval`
pub async fn decide<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<DecisionBody>,
) -> Result<StatusCode, ApiError> {
  registry.approve_teacher(&caller, id, body.status).await?;
  Ok(StatusCode::NO_CONTENT)
}
