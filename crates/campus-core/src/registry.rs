//! [`Registry`]: the authoritative implementation of every school operation.
//!
//! Each method receives the authenticated caller and decides, before touching
//! any record, whether that caller may perform the operation. Transports
//! (`campus-api`, [`LocalBackend`](crate::backend::LocalBackend)) only forward
//! the caller; they never make authorization decisions themselves.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Identity, Result,
  approval::{ApprovalRecord, ApprovalStatus, Transition},
  exam::{Exam, ExamMark, NewExam},
  identity::{Profile, Role, UserType},
  roster::{EntityKind, Student, StudentRegistration, Teacher, TeacherRegistration},
  store::{Registered, SchoolStore},
  validate::ValidationErrors,
};

/// How often a compare-and-set approval write is retried after losing a race.
const DECIDE_ATTEMPTS: usize = 3;

pub struct Registry<S> {
  store: S,
}

impl<S: SchoolStore> Registry<S> {
  pub fn new(store: S) -> Self { Self { store } }

  pub fn store(&self) -> &S { &self.store }

  /// Grant `identity` the admin role unconditionally. Used at server startup
  /// for configured administrators.
  pub async fn bootstrap_admin(&self, identity: &Identity) -> Result<()> {
    self
      .store
      .put_role(identity.clone(), Role::Admin)
      .await
      .map_err(Error::store)?;
    info!(%identity, "bootstrapped admin");
    Ok(())
  }

  // ── Capability checks ─────────────────────────────────────────────────

  async fn role_of(&self, identity: &Identity) -> Result<Role> {
    if let Some(role) = self
      .store
      .get_role(identity.clone())
      .await
      .map_err(Error::store)?
    {
      return Ok(role);
    }
    let has_profile = self
      .store
      .get_profile(identity.clone())
      .await
      .map_err(Error::store)?
      .is_some();
    Ok(if has_profile { Role::User } else { Role::Guest })
  }

  async fn approval_status(&self, identity: &Identity) -> Result<Option<ApprovalStatus>> {
    Ok(
      self
        .store
        .get_approval(identity.clone())
        .await
        .map_err(Error::store)?
        .map(|r| r.status),
    )
  }

  async fn require_admin(&self, caller: &Identity, action: &str) -> Result<()> {
    if self.role_of(caller).await? == Role::Admin {
      return Ok(());
    }
    warn!(%caller, action, "denied: admin only");
    Err(Error::Forbidden(format!("{action} requires the admin role")))
  }

  /// Admins, and users whose approval record is `approved`.
  async fn can_browse(&self, caller: &Identity) -> Result<bool> {
    Ok(match self.role_of(caller).await? {
      Role::Admin => true,
      Role::User => self
        .approval_status(caller)
        .await?
        .is_some_and(ApprovalStatus::is_approved),
      Role::Guest => false,
    })
  }

  async fn require_approved(&self, caller: &Identity, action: &str) -> Result<()> {
    if self.can_browse(caller).await? {
      return Ok(());
    }
    warn!(%caller, action, "denied: not approved");
    Err(Error::Forbidden(format!("{action} requires an approved account")))
  }

  /// Admins, and owners of an approved teacher record.
  async fn require_grader(&self, caller: &Identity, action: &str) -> Result<()> {
    if self.role_of(caller).await? == Role::Admin {
      return Ok(());
    }
    let teacher = self
      .store
      .find_teacher_by_owner(caller.clone())
      .await
      .map_err(Error::store)?;
    if teacher.is_some_and(|t| t.status.is_approved()) {
      return Ok(());
    }
    warn!(%caller, action, "denied: not an approved teacher");
    Err(Error::Forbidden(format!(
      "{action} requires an admin or an approved teacher"
    )))
  }

  // ── Profiles & roles ──────────────────────────────────────────────────

  pub async fn get_caller_user_profile(&self, caller: &Identity) -> Result<Option<Profile>> {
    self
      .store
      .get_profile(caller.clone())
      .await
      .map_err(Error::store)
  }

  /// Save the caller's own profile.
  ///
  /// An `entity_id` must name a record of the matching kind owned by the
  /// caller. When it is omitted and the caller already owns such a record,
  /// the link is filled in.
  pub async fn save_caller_user_profile(
    &self,
    caller: &Identity,
    mut profile: Profile,
  ) -> Result<()> {
    profile.validate()?;
    profile.name = profile.name.trim().to_owned();

    if profile.user_type == UserType::Admin
      && self.role_of(caller).await? != Role::Admin
    {
      warn!(%caller, "denied: self-declared admin profile");
      return Err(Error::Forbidden(
        "only admins may declare an admin profile".into(),
      ));
    }

    profile.entity_id = match (profile.user_type, profile.entity_id) {
      (UserType::Student, Some(id)) => {
        let owner = self
          .store
          .get_student(id)
          .await
          .map_err(Error::store)?
          .map(|s| s.owner);
        Some(check_link(caller, "student", id, owner)?)
      }
      (UserType::Teacher, Some(id)) => {
        let owner = self
          .store
          .get_teacher(id)
          .await
          .map_err(Error::store)?
          .map(|t| t.owner);
        Some(check_link(caller, "teacher", id, owner)?)
      }
      (UserType::Student, None) => self
        .store
        .find_student_by_owner(caller.clone())
        .await
        .map_err(Error::store)?
        .map(|s| s.student_id),
      (UserType::Teacher, None) => self
        .store
        .find_teacher_by_owner(caller.clone())
        .await
        .map_err(Error::store)?
        .map(|t| t.teacher_id),
      (_, _) => None,
    };

    self
      .store
      .put_profile(caller.clone(), profile.clone())
      .await
      .map_err(Error::store)?;
    info!(%caller, user_type = %profile.user_type, "profile saved");
    Ok(())
  }

  /// The explicitly assigned role, else `user` once a profile exists, else
  /// `guest`.
  pub async fn get_caller_user_role(&self, caller: &Identity) -> Result<Role> {
    self.role_of(caller).await
  }

  pub async fn is_caller_admin(&self, caller: &Identity) -> Result<bool> {
    Ok(self.role_of(caller).await? == Role::Admin)
  }

  /// `true` exactly when the caller's approval record is `approved`.
  pub async fn is_caller_approved(&self, caller: &Identity) -> Result<bool> {
    Ok(
      self
        .approval_status(caller)
        .await?
        .is_some_and(ApprovalStatus::is_approved),
    )
  }

  pub async fn assign_caller_user_role(
    &self,
    caller: &Identity,
    identity: Identity,
    role: Role,
  ) -> Result<()> {
    self.require_admin(caller, "assigning roles").await?;
    if identity == *caller && role != Role::Admin {
      return Err(Error::Conflict("admins cannot demote themselves".into()));
    }
    self
      .store
      .put_role(identity.clone(), role)
      .await
      .map_err(Error::store)?;
    info!(%identity, %role, by = %caller, "role assigned");
    Ok(())
  }

  // ── Approvals ─────────────────────────────────────────────────────────

  /// Open a pending approval request for the caller. A caller that already
  /// has a record keeps it unchanged.
  pub async fn request_approval(&self, caller: &Identity) -> Result<()> {
    let inserted = self
      .store
      .insert_approval(ApprovalRecord::pending(caller.clone(), Utc::now()))
      .await
      .map_err(Error::store)?;
    if inserted {
      info!(%caller, "approval requested");
    }
    Ok(())
  }

  /// Every approval record, oldest request first.
  pub async fn list_approvals(&self, caller: &Identity) -> Result<Vec<ApprovalRecord>> {
    self.require_admin(caller, "listing approvals").await?;
    let mut records = self.store.list_approvals().await.map_err(Error::store)?;
    records.sort_by(|a, b| a.requested_at.cmp(&b.requested_at));
    Ok(records)
  }

  pub async fn set_approval(
    &self,
    caller: &Identity,
    subject: Identity,
    status: ApprovalStatus,
  ) -> Result<()> {
    self.require_admin(caller, "setting approvals").await?;
    self.decide(caller, &subject, status).await
  }

  pub async fn approve_student(
    &self,
    caller: &Identity,
    id: Uuid,
    status: ApprovalStatus,
  ) -> Result<()> {
    self.require_admin(caller, "approving students").await?;
    let student = self
      .store
      .get_student(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("student {id}")))?;
    self.decide(caller, &student.owner, status).await
  }

  pub async fn approve_teacher(
    &self,
    caller: &Identity,
    id: Uuid,
    status: ApprovalStatus,
  ) -> Result<()> {
    self.require_admin(caller, "approving teachers").await?;
    let teacher = self
      .store
      .get_teacher(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("teacher {id}")))?;
    self.decide(caller, &teacher.owner, status).await
  }

  /// Apply `status` to `subject`'s record under the transition rules.
  ///
  /// Writes are compare-and-set on the prior status; after a lost race the
  /// record is re-read and the rules applied to what won.
  async fn decide(
    &self,
    admin: &Identity,
    subject: &Identity,
    status: ApprovalStatus,
  ) -> Result<()> {
    for _ in 0..DECIDE_ATTEMPTS {
      let now = Utc::now();
      let current = self
        .store
        .get_approval(subject.clone())
        .await
        .map_err(Error::store)?;

      let written = match current {
        None => {
          let mut record = ApprovalRecord::pending(subject.clone(), now);
          if status != ApprovalStatus::Pending {
            record = record.decided(status, admin.clone(), now);
          }
          self
            .store
            .insert_approval(record)
            .await
            .map_err(Error::store)?
        }
        Some(record) => match record.status.transition(status)? {
          Transition::Unchanged => return Ok(()),
          Transition::Apply => {
            let expected = record.status;
            self
              .store
              .update_approval(record.decided(status, admin.clone(), now), expected)
              .await
              .map_err(Error::store)?
          }
        },
      };

      if written {
        info!(%subject, %status, by = %admin, "approval decided");
        return Ok(());
      }
      debug!(%subject, "approval changed concurrently; re-reading");
    }
    Err(Error::Conflict(format!(
      "approval for {subject} keeps changing; try again"
    )))
  }

  // ── Registration ──────────────────────────────────────────────────────

  pub async fn register_student(
    &self,
    caller: &Identity,
    input: StudentRegistration,
  ) -> Result<Student> {
    input.validate()?;

    let student = match self
      .store
      .register_student(caller.clone(), input.normalized(), Utc::now())
      .await
      .map_err(Error::store)?
    {
      Registered::Created(student) => student,
      Registered::Exists(kind) => return Err(already_registered(caller, kind)),
    };
    self
      .link_profile(caller, UserType::Student, student.student_id)
      .await?;
    info!(%caller, student_id = %student.student_id, "student registered");
    Ok(student)
  }

  pub async fn register_teacher(
    &self,
    caller: &Identity,
    input: TeacherRegistration,
  ) -> Result<Teacher> {
    input.validate()?;

    let teacher = match self
      .store
      .register_teacher(caller.clone(), input.normalized(), Utc::now())
      .await
      .map_err(Error::store)?
    {
      Registered::Created(teacher) => teacher,
      Registered::Exists(kind) => return Err(already_registered(caller, kind)),
    };
    self
      .link_profile(caller, UserType::Teacher, teacher.teacher_id)
      .await?;
    info!(%caller, teacher_id = %teacher.teacher_id, "teacher registered");
    Ok(teacher)
  }

  /// Point an unlinked profile of the matching type at a new record.
  async fn link_profile(
    &self,
    caller: &Identity,
    user_type: UserType,
    id: Uuid,
  ) -> Result<()> {
    let profile = self
      .store
      .get_profile(caller.clone())
      .await
      .map_err(Error::store)?;
    if let Some(mut profile) = profile
      && profile.user_type == user_type
      && profile.entity_id.is_none()
    {
      profile.entity_id = Some(id);
      self
        .store
        .put_profile(caller.clone(), profile)
        .await
        .map_err(Error::store)?;
    }
    Ok(())
  }

  // ── Roster reads ──────────────────────────────────────────────────────

  pub async fn get_all_approved_students(&self, caller: &Identity) -> Result<Vec<Student>> {
    self.require_approved(caller, "listing students").await?;
    self
      .store
      .list_students(Some(ApprovalStatus::Approved))
      .await
      .map_err(Error::store)
  }

  pub async fn list_students(&self, caller: &Identity) -> Result<Vec<Student>> {
    self.require_admin(caller, "listing all students").await?;
    self.store.list_students(None).await.map_err(Error::store)
  }

  pub async fn list_teachers(&self, caller: &Identity) -> Result<Vec<Teacher>> {
    self.require_admin(caller, "listing all teachers").await?;
    self.store.list_teachers(None).await.map_err(Error::store)
  }

  /// Visible to admins and approved users; otherwise only to the owner.
  /// Callers who may not browse get `Forbidden` whether or not the record
  /// exists.
  pub async fn get_student_by_id(&self, caller: &Identity, id: Uuid) -> Result<Option<Student>> {
    let student = self.store.get_student(id).await.map_err(Error::store)?;
    if self.can_browse(caller).await? {
      return Ok(student);
    }
    match student {
      Some(s) if s.owner == *caller => Ok(Some(s)),
      _ => Err(Error::Forbidden("viewing students requires an approved account".into())),
    }
  }

  pub async fn get_teacher_by_id(&self, caller: &Identity, id: Uuid) -> Result<Option<Teacher>> {
    let teacher = self.store.get_teacher(id).await.map_err(Error::store)?;
    if self.can_browse(caller).await? {
      return Ok(teacher);
    }
    match teacher {
      Some(t) if t.owner == *caller => Ok(Some(t)),
      _ => Err(Error::Forbidden("viewing teachers requires an approved account".into())),
    }
  }

  /// `true` only for an existing student whose status is `approved`.
  pub async fn is_student_approved(&self, _caller: &Identity, id: Uuid) -> Result<bool> {
    Ok(
      self
        .store
        .get_student(id)
        .await
        .map_err(Error::store)?
        .is_some_and(|s| s.status.is_approved()),
    )
  }

  // ── Exams ─────────────────────────────────────────────────────────────

  pub async fn add_exam(&self, caller: &Identity, input: NewExam) -> Result<Exam> {
    self.require_grader(caller, "adding exams").await?;
    input.validate()?;
    let input = NewExam {
      subject: input.subject.trim().to_owned(),
      ..input
    };
    let exam = self
      .store
      .add_exam(input, Utc::now())
      .await
      .map_err(Error::store)?;
    info!(%caller, exam_id = %exam.exam_id, subject = %exam.subject, "exam added");
    Ok(exam)
  }

  pub async fn get_exam(&self, caller: &Identity, id: Uuid) -> Result<Option<Exam>> {
    self.require_approved(caller, "viewing exams").await?;
    self.store.get_exam(id).await.map_err(Error::store)
  }

  pub async fn list_exams(&self, caller: &Identity) -> Result<Vec<Exam>> {
    self.require_approved(caller, "listing exams").await?;
    self.store.list_exams().await.map_err(Error::store)
  }

  /// Record (or replace) one student's mark on an exam.
  pub async fn record_exam_mark(
    &self,
    caller: &Identity,
    exam_id: Uuid,
    student_id: Uuid,
    marks: u32,
  ) -> Result<ExamMark> {
    self.require_grader(caller, "recording marks").await?;
    let mark = ExamMark::new(student_id, marks)?;

    if self
      .store
      .get_exam(exam_id)
      .await
      .map_err(Error::store)?
      .is_none()
    {
      return Err(Error::NotFound(format!("exam {exam_id}")));
    }
    let student = self
      .store
      .get_student(student_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("student {student_id}")))?;
    if !student.status.is_approved() {
      return Err(Error::Conflict(format!(
        "student {student_id} is not approved"
      )));
    }

    self
      .store
      .put_exam_mark(exam_id, mark.clone())
      .await
      .map_err(Error::store)?;
    info!(%caller, %exam_id, %student_id, marks, "mark recorded");
    Ok(mark)
  }
}

fn check_link(
  caller: &Identity,
  kind: &str,
  id: Uuid,
  owner: Option<Identity>,
) -> Result<Uuid> {
  match owner {
    None => {
      let mut errors = ValidationErrors::new();
      errors.push("entity_id", format!("no {kind} with id {id}"));
      Err(Error::Validation(errors))
    }
    Some(owner) if owner != *caller => Err(Error::Forbidden(format!(
      "{kind} {id} belongs to another account"
    ))),
    Some(_) => Ok(id),
  }
}

fn already_registered(caller: &Identity, kind: EntityKind) -> Error {
  warn!(%caller, %kind, "registration refused: owner already holds a record");
  Error::Conflict(format!("already registered as a {kind}"))
}
