//! JSON REST API for Campus.
//!
//! Exposes an axum [`Router`] backed by a shared [`Registry`] over any
//! [`SchoolStore`]. Authentication, TLS, and transport concerns are the
//! caller's responsibility: the router expects an
//! [`Identity`](campus_core::Identity) in each request's extensions (see
//! [`Caller`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", campus_api::api_router(registry.clone()))
//! ```

pub mod approvals;
pub mod caller;
pub mod error;
pub mod exams;
pub mod session;
pub mod students;
pub mod teachers;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use campus_core::{registry::Registry, store::SchoolStore};

pub use caller::Caller;
pub use error::ApiError;

/// Build a fully-materialised API router for `registry`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(registry: Arc<Registry<S>>) -> Router<()>
where
  S: SchoolStore + 'static,
{
  Router::new()
    // Caller
    .route("/session", get(session::whoami))
    .route(
      "/profile",
      get(session::get_profile::<S>).put(session::save_profile::<S>),
    )
    .route("/role", get(session::role::<S>))
    .route("/caller/admin", get(session::is_admin::<S>))
    .route("/caller/approved", get(session::is_approved::<S>))
    .route("/roles", post(session::assign_role::<S>))
    // Approvals
    .route("/approvals", get(approvals::list::<S>))
    .route("/approvals/request", post(approvals::request::<S>))
    .route("/approvals/{identity}", put(approvals::set::<S>))
    // Students
    .route("/students", get(students::list::<S>).post(students::register::<S>))
    .route("/students/{id}", get(students::get_one::<S>))
    .route("/students/{id}/approved", get(students::is_approved::<S>))
    .route("/students/{id}/approval", put(students::decide::<S>))
    // Teachers
    .route("/teachers", get(teachers::list::<S>).post(teachers::register::<S>))
    .route("/teachers/{id}", get(teachers::get_one::<S>))
    .route("/teachers/{id}/approval", put(teachers::decide::<S>))
    // Exams
    .route("/exams", get(exams::list::<S>).post(exams::create::<S>))
    .route("/exams/{id}", get(exams::get_one::<S>))
    .route("/exams/{id}/marks", post(exams::record_mark::<S>))
    .with_state(registry)
}
