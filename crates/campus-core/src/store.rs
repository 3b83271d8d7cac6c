//! The `SchoolStore` trait: persistence for every record the registry owns.
//!
//! The trait is implemented by storage backends (e.g. `campus-store-sqlite`).
//! It performs no authorization; that is the job of
//! [`Registry`](crate::registry::Registry), which is the only intended caller.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Identity,
  approval::{ApprovalRecord, ApprovalStatus},
  exam::{Exam, ExamMark, NewExam},
  identity::{Profile, Role},
  roster::{EntityKind, Student, StudentRegistration, Teacher, TeacherRegistration},
};

/// Outcome of a registration write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registered<T> {
  Created(T),
  /// The owner already holds a record of this kind; nothing was written.
  Exists(EntityKind),
}

impl<T> Registered<T> {
  pub fn created(self) -> Option<T> {
    match self {
      Self::Created(v) => Some(v),
      Self::Exists(_) => None,
    }
  }
}

/// Abstraction over a school record store backend.
///
/// Student and teacher `status` fields returned by this trait must be
/// projected from the owner's approval record (or `pending` when the owner
/// has none); stores never persist them separately.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait SchoolStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Profiles & roles ──────────────────────────────────────────────────

  fn get_profile(
    &self,
    identity: Identity,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// Insert or replace the profile owned by `identity`.
  fn put_profile(
    &self,
    identity: Identity,
    profile: Profile,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The explicitly assigned role, if any.
  fn get_role(
    &self,
    identity: Identity,
  ) -> impl Future<Output = Result<Option<Role>, Self::Error>> + Send + '_;

  fn put_role(
    &self,
    identity: Identity,
    role: Role,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Approvals ─────────────────────────────────────────────────────────

  fn get_approval(
    &self,
    subject: Identity,
  ) -> impl Future<Output = Result<Option<ApprovalRecord>, Self::Error>> + Send + '_;

  fn list_approvals(
    &self,
  ) -> impl Future<Output = Result<Vec<ApprovalRecord>, Self::Error>> + Send + '_;

  /// Insert `record` unless its subject already has one.
  /// Returns `true` when the record was written.
  fn insert_approval(
    &self,
    record: ApprovalRecord,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Overwrite the subject's record only if its current status is
  /// `expected`. Returns `true` when the record was written.
  fn update_approval(
    &self,
    record: ApprovalRecord,
    expected: ApprovalStatus,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Students ──────────────────────────────────────────────────────────

  /// Persist a student owned by `owner` and, in the same transaction, give
  /// `owner` a pending approval record if it has none.
  ///
  /// An owner holds at most one student or teacher record. The check and the
  /// write are atomic: of two concurrent registrations for one owner, exactly
  /// one is `Created`.
  fn register_student(
    &self,
    owner: Identity,
    input: StudentRegistration,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Registered<Student>, Self::Error>> + Send + '_;

  fn get_student(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  fn find_student_by_owner(
    &self,
    owner: Identity,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  /// List students, optionally only those whose projected status matches.
  fn list_students(
    &self,
    status: Option<ApprovalStatus>,
  ) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + '_;

  // ── Teachers ──────────────────────────────────────────────────────────

  /// Teacher counterpart of [`SchoolStore::register_student`].
  fn register_teacher(
    &self,
    owner: Identity,
    input: TeacherRegistration,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Registered<Teacher>, Self::Error>> + Send + '_;

  fn get_teacher(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Teacher>, Self::Error>> + Send + '_;

  fn find_teacher_by_owner(
    &self,
    owner: Identity,
  ) -> impl Future<Output = Result<Option<Teacher>, Self::Error>> + Send + '_;

  fn list_teachers(
    &self,
    status: Option<ApprovalStatus>,
  ) -> impl Future<Output = Result<Vec<Teacher>, Self::Error>> + Send + '_;

  // ── Exams ─────────────────────────────────────────────────────────────

  fn add_exam(
    &self,
    input: NewExam,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Exam, Self::Error>> + Send + '_;

  /// Retrieve an exam with all of its marks. Returns `None` if not found.
  fn get_exam(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Exam>, Self::Error>> + Send + '_;

  fn list_exams(
    &self,
  ) -> impl Future<Output = Result<Vec<Exam>, Self::Error>> + Send + '_;

  /// Insert or replace the mark for `mark.student_id` on `exam_id`.
  fn put_exam_mark(
    &self,
    exam_id: Uuid,
    mark: ExamMark,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
