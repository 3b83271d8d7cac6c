//! The `SchoolBackend` trait: every remote operation, as seen by one caller.
//!
//! A backend value is bound to the [`Identity`] it was authenticated as, so
//! no method takes a caller argument. Client code (the portal, the CLI)
//! depends only on this trait; the HTTP client and [`LocalBackend`] are
//! interchangeable behind it.

use std::{future::Future, sync::Arc};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  Identity, Result,
  approval::{ApprovalRecord, ApprovalStatus},
  exam::{Exam, ExamMark, NewExam},
  identity::{Profile, Role},
  registry::Registry,
  roster::{Student, StudentRegistration, Teacher, TeacherRegistration},
  store::SchoolStore,
};

pub trait SchoolBackend: Send + Sync {
  /// The caller every request is made as.
  fn identity(&self) -> &Identity;

  // ── Caller ────────────────────────────────────────────────────────────

  /// `None` when the caller has never completed profile setup.
  fn get_caller_user_profile(
    &self,
  ) -> impl Future<Output = Result<Option<Profile>>> + Send + '_;

  fn save_caller_user_profile(
    &self,
    profile: Profile,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  fn get_caller_user_role(&self) -> impl Future<Output = Result<Role>> + Send + '_;

  fn is_caller_admin(&self) -> impl Future<Output = Result<bool>> + Send + '_;

  fn is_caller_approved(&self) -> impl Future<Output = Result<bool>> + Send + '_;

  fn request_approval(&self) -> impl Future<Output = Result<()>> + Send + '_;

  // ── Administration ────────────────────────────────────────────────────

  fn list_approvals(
    &self,
  ) -> impl Future<Output = Result<Vec<ApprovalRecord>>> + Send + '_;

  fn set_approval(
    &self,
    subject: Identity,
    status: ApprovalStatus,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  fn assign_caller_user_role(
    &self,
    identity: Identity,
    role: Role,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  // ── Roster ────────────────────────────────────────────────────────────

  fn register_student(
    &self,
    input: StudentRegistration,
  ) -> impl Future<Output = Result<Student>> + Send + '_;

  fn register_teacher(
    &self,
    input: TeacherRegistration,
  ) -> impl Future<Output = Result<Teacher>> + Send + '_;

  fn get_all_approved_students(
    &self,
  ) -> impl Future<Output = Result<Vec<Student>>> + Send + '_;

  /// Every student regardless of status (admin only).
  fn list_students(&self) -> impl Future<Output = Result<Vec<Student>>> + Send + '_;

  /// Every teacher regardless of status (admin only).
  fn list_teachers(&self) -> impl Future<Output = Result<Vec<Teacher>>> + Send + '_;

  fn get_student_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Student>>> + Send + '_;

  fn get_teacher_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Teacher>>> + Send + '_;

  fn is_student_approved(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool>> + Send + '_;

  fn approve_student(
    &self,
    id: Uuid,
    status: ApprovalStatus,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  fn approve_teacher(
    &self,
    id: Uuid,
    status: ApprovalStatus,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  // ── Exams ─────────────────────────────────────────────────────────────

  fn add_exam(
    &self,
    subject: String,
    exam_date: NaiveDate,
  ) -> impl Future<Output = Result<Exam>> + Send + '_;

  fn get_exam(&self, id: Uuid) -> impl Future<Output = Result<Option<Exam>>> + Send + '_;

  fn list_exams(&self) -> impl Future<Output = Result<Vec<Exam>>> + Send + '_;

  fn record_exam_mark(
    &self,
    exam_id: Uuid,
    student_id: Uuid,
    marks: u32,
  ) -> impl Future<Output = Result<ExamMark>> + Send + '_;
}

// ─── LocalBackend ────────────────────────────────────────────────────────────

/// An in-process backend: a shared [`Registry`] plus the caller it acts as.
///
/// Cloning is cheap; the registry is reference-counted.
pub struct LocalBackend<S> {
  registry: Arc<Registry<S>>,
  caller:   Identity,
}

impl<S> Clone for LocalBackend<S> {
  fn clone(&self) -> Self {
    Self {
      registry: Arc::clone(&self.registry),
      caller:   self.caller.clone(),
    }
  }
}

impl<S: SchoolStore> LocalBackend<S> {
  pub fn new(registry: Arc<Registry<S>>, caller: Identity) -> Self {
    Self { registry, caller }
  }
}

impl<S: SchoolStore> SchoolBackend for LocalBackend<S> {
  fn identity(&self) -> &Identity { &self.caller }

  async fn get_caller_user_profile(&self) -> Result<Option<Profile>> {
    self.registry.get_caller_user_profile(&self.caller).await
  }

  async fn save_caller_user_profile(&self, profile: Profile) -> Result<()> {
    self
      .registry
      .save_caller_user_profile(&self.caller, profile)
      .await
  }

  async fn get_caller_user_role(&self) -> Result<Role> {
    self.registry.get_caller_user_role(&self.caller).await
  }

  async fn is_caller_admin(&self) -> Result<bool> {
    self.registry.is_caller_admin(&self.caller).await
  }

  async fn is_caller_approved(&self) -> Result<bool> {
    self.registry.is_caller_approved(&self.caller).await
  }

  async fn request_approval(&self) -> Result<()> {
    self.registry.request_approval(&self.caller).await
  }

  async fn list_approvals(&self) -> Result<Vec<ApprovalRecord>> {
    self.registry.list_approvals(&self.caller).await
  }

  async fn set_approval(&self, subject: Identity, status: ApprovalStatus) -> Result<()> {
    self
      .registry
      .set_approval(&self.caller, subject, status)
      .await
  }

  async fn assign_caller_user_role(&self, identity: Identity, role: Role) -> Result<()> {
    self
      .registry
      .assign_caller_user_role(&self.caller, identity, role)
      .await
  }

  async fn register_student(&self, input: StudentRegistration) -> Result<Student> {
    self.registry.register_student(&self.caller, input).await
  }

  async fn register_teacher(&self, input: TeacherRegistration) -> Result<Teacher> {
    self.registry.register_teacher(&self.caller, input).await
  }

  async fn get_all_approved_students(&self) -> Result<Vec<Student>> {
    self.registry.get_all_approved_students(&self.caller).await
  }

  async fn list_students(&self) -> Result<Vec<Student>> {
    self.registry.list_students(&self.caller).await
  }

  async fn list_teachers(&self) -> Result<Vec<Teacher>> {
    self.registry.list_teachers(&self.caller).await
  }

  async fn get_student_by_id(&self, id: Uuid) -> Result<Option<Student>> {
    self.registry.get_student_by_id(&self.caller, id).await
  }

  async fn get_teacher_by_id(&self, id: Uuid) -> Result<Option<Teacher>> {
    self.registry.get_teacher_by_id(&self.caller, id).await
  }

  async fn is_student_approved(&self, id: Uuid) -> Result<bool> {
    self.registry.is_student_approved(&self.caller, id).await
  }

  async fn approve_student(&self, id: Uuid, status: ApprovalStatus) -> Result<()> {
    self.registry.approve_student(&self.caller, id, status).await
  }

  async fn approve_teacher(&self, id: Uuid, status: ApprovalStatus) -> Result<()> {
    self.registry.approve_teacher(&self.caller, id, status).await
  }

  async fn add_exam(&self, subject: String, exam_date: NaiveDate) -> Result<Exam> {
    self
      .registry
      .add_exam(&self.caller, NewExam { subject, exam_date })
      .await
  }

  async fn get_exam(&self, id: Uuid) -> Result<Option<Exam>> {
    self.registry.get_exam(&self.caller, id).await
  }

  async fn list_exams(&self) -> Result<Vec<Exam>> {
    self.registry.list_exams(&self.caller).await
  }

  async fn record_exam_mark(
    &self,
    exam_id: Uuid,
    student_id: Uuid,
    marks: u32,
  ) -> Result<ExamMark> {
    self
      .registry
      .record_exam_mark(&self.caller, exam_id, student_id, marks)
      .await
  }
}
