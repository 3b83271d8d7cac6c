//! Handlers for `/students` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/students` | Admin only; `?approved=true` lists approved students for any approved caller |
//! | `POST` | `/students` | Body: [`StudentRegistration`]; 201 + the stored student |
//! | `GET`  | `/students/{id}` | 404 if not found |
//! | `GET`  | `/students/{id}/approved` | `true` only for an existing, approved student |
//! | `PUT`  | `/students/{id}/approval` | Body: `{"status":"approved"}`; admin only |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use campus_core::{
  Error,
  registry::Registry,
  roster::{Student, StudentRegistration},
  store::SchoolStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{approvals::DecisionBody, caller::Caller, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub approved: bool,
}

/// `GET /students[?approved=true]`
pub async fn list<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Student>>, ApiError> {
  let students = if params.approved {
    registry.get_all_approved_students(&caller).await?
  } else {
    registry.list_students(&caller).await?
  };
  Ok(Json(students))
}

// ─── Register ─────────────────────────────────────────────────────────────────

/// `POST /students`
pub async fn register<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
  Json(body): Json<StudentRegistration>,
) -> Result<impl IntoResponse, ApiError> {
  let student = registry.register_student(&caller, body).await?;
  Ok((StatusCode::CREATED, Json(student)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /students/{id}`
pub async fn get_one<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Student>, ApiError> {
  let student = registry
    .get_student_by_id(&caller, id)
    .await?
    .ok_or_else(|| Error::NotFound(format!("student {id}")))?;
  Ok(Json(student))
}

/// `GET /students/{id}/approved`
pub async fn is_approved<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<bool>, ApiError> {
  Ok(Json(registry.is_student_approved(&caller, id).await?))
}

// ─── Decide ───────────────────────────────────────────────────────────────────

/// `PUT /students/{id}/approval`
pub async fn decide<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<DecisionBody>,
) -> Result<StatusCode, ApiError> {
  registry.approve_student(&caller, id, body.status).await?;
  Ok(StatusCode::NO_CONTENT)
}
