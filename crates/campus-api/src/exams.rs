//! Handlers for `/exams` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/exams` | Approved callers; ordered by exam date |
//! | `POST` | `/exams` | Body: [`NewExam`]; 201 + the stored exam; admins and approved teachers |
//! | `GET`  | `/exams/{id}` | 404 if not found |
//! | `POST` | `/exams/{id}/marks` | Body: `{"student_id":"...","marks":87}`; returns the graded mark |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use campus_core::{
  Error,
  exam::{Exam, ExamMark, NewExam},
  registry::Registry,
  store::SchoolStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{caller::Caller, error::ApiError};

/// `GET /exams`
pub async fn list<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
) -> Result<Json<Vec<Exam>>, ApiError> {
  Ok(Json(registry.list_exams(&caller).await?))
}

/// `POST /exams`
pub async fn create<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
  Json(body): Json<NewExam>,
) -> Result<impl IntoResponse, ApiError> {
  let exam = registry.add_exam(&caller, body).await?;
  Ok((StatusCode::CREATED, Json(exam)))
}

/// `GET /exams/{id}`
pub async fn get_one<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Exam>, ApiError> {
  let exam = registry
    .get_exam(&caller, id)
    .await?
    .ok_or_else(|| Error::NotFound(format!("exam {id}")))?;
  Ok(Json(exam))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkBody {
  pub student_id: Uuid,
  pub marks:      u32,
}

/// `POST /exams/{id}/marks`
pub async fn record_mark<S: SchoolStore>(
  State(registry): State<Arc<Registry<S>>>,
  Caller(caller): Caller,
  Path(exam_id): Path<Uuid>,
  Json(body): Json<MarkBody>,
) -> Result<Json<ExamMark>, ApiError> {
  let mark = registry
    .record_exam_mark(&caller, exam_id, body.student_id, body.marks)
    .await?;
  Ok(Json(mark))
}
