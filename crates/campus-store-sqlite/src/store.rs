//! [`SqliteStore`]: the SQLite implementation of [`SchoolStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use campus_core::{
  Identity,
  approval::{ApprovalRecord, ApprovalStatus},
  exam::{Exam, ExamMark, NewExam},
  identity::{Profile, Role},
  roster::{EntityKind, Student, StudentRegistration, Teacher, TeacherRegistration},
  store::{Registered, SchoolStore},
};

use crate::{
  Result,
  encode::{
    RawApproval, RawExam, RawMark, RawProfile, RawStudent, RawTeacher,
    decode_enum, decode_role, encode_date, encode_dt, encode_list, encode_uuid,
  },
  schema::SCHEMA,
};

/// Student columns in [`RawStudent`] order, with status projected from the
/// owner's approval row.
const STUDENT_SELECT: &str = "
  SELECT s.student_id, s.full_name, s.guardian_name, s.contact_number,
         s.class_assignment, s.registered_at,
         COALESCE(a.status, 'pending') AS status, s.owner
  FROM students s
  LEFT JOIN approvals a ON a.subject = s.owner";

/// Teacher columns in [`RawTeacher`] order, with status projected from the
/// owner's approval row.
const TEACHER_SELECT: &str = "
  SELECT t.teacher_id, t.full_name, t.contact_number, t.subjects, t.classes,
         t.registered_at,
         COALESCE(a.status, 'pending') AS status, t.owner
  FROM teachers t
  LEFT JOIN approvals a ON a.subject = t.owner";

const APPROVAL_SELECT: &str =
  "SELECT subject, status, requested_at, decided_at, decided_by FROM approvals";

/// A registration transaction's result: the owner's approval status, or the
/// kind of record the owner already holds.
type Claim = std::result::Result<String, String>;

/// Reserve `owner` for a record of `kind` inside `tx`. Returns the kind the
/// owner already holds instead when it is taken.
fn claim_owner(
  tx: &rusqlite::Transaction<'_>,
  owner: &str,
  kind: EntityKind,
) -> rusqlite::Result<Option<String>> {
  let held: Option<String> = tx
    .query_row(
      "SELECT kind FROM registrations WHERE owner = ?1",
      rusqlite::params![owner],
      |r| r.get(0),
    )
    .optional()?;
  if held.is_none() {
    tx.execute(
      "INSERT INTO registrations (owner, kind) VALUES (?1, ?2)",
      rusqlite::params![owner, kind.to_string()],
    )?;
  }
  Ok(held)
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Campus record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a student query whose trailing clause binds `param` as `?1`.
  async fn query_students(
    &self,
    clause: &'static str,
    param: Option<String>,
  ) -> Result<Vec<Student>> {
    let raws: Vec<RawStudent> = self
      .conn
      .call(move |conn| {
        let sql = format!("{STUDENT_SELECT} {clause}");
        let mut stmt = conn.prepare(&sql)?;
        let rows = match param {
          Some(p) => stmt
            .query_map(rusqlite::params![p], RawStudent::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
          None => stmt
            .query_map([], RawStudent::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStudent::into_student).collect()
  }

  /// Teacher counterpart of [`Self::query_students`].
  async fn query_teachers(
    &self,
    clause: &'static str,
    param: Option<String>,
  ) -> Result<Vec<Teacher>> {
    let raws: Vec<RawTeacher> = self
      .conn
      .call(move |conn| {
        let sql = format!("{TEACHER_SELECT} {clause}");
        let mut stmt = conn.prepare(&sql)?;
        let rows = match param {
          Some(p) => stmt
            .query_map(rusqlite::params![p], RawTeacher::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
          None => stmt
            .query_map([], RawTeacher::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTeacher::into_teacher).collect()
  }

  /// Read exams (optionally just one) together with all of their marks.
  async fn query_exams(&self, id: Option<Uuid>) -> Result<Vec<Exam>> {
    let id_str = id.map(encode_uuid);

    let (exams, marks): (Vec<RawExam>, Vec<RawMark>) = self
      .conn
      .call(move |conn| {
        let exam_sql = "SELECT exam_id, subject, exam_date, created_at FROM exams";
        let mark_sql = "SELECT exam_id, student_id, marks, grade FROM exam_marks";

        let (exams, marks) = if let Some(id) = id_str {
          let exams = conn
            .prepare(&format!("{exam_sql} WHERE exam_id = ?1"))?
            .query_map(rusqlite::params![id], RawExam::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          let marks = conn
            .prepare(&format!("{mark_sql} WHERE exam_id = ?1 ORDER BY student_id"))?
            .query_map(rusqlite::params![id], RawMark::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          (exams, marks)
        } else {
          let exams = conn
            .prepare(&format!("{exam_sql} ORDER BY exam_date, created_at"))?
            .query_map([], RawExam::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          let marks = conn
            .prepare(&format!("{mark_sql} ORDER BY exam_id, student_id"))?
            .query_map([], RawMark::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          (exams, marks)
        };
        Ok((exams, marks))
      })
      .await?;

    exams.into_iter().map(|e| e.into_exam(&marks)).collect()
  }
}

// ─── SchoolStore impl ────────────────────────────────────────────────────────

impl SchoolStore for SqliteStore {
  type Error = crate::Error;

  // ── Profiles & roles ──────────────────────────────────────────────────────

  async fn get_profile(&self, identity: Identity) -> Result<Option<Profile>> {
    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT name, user_type, entity_id FROM profiles WHERE identity = ?1",
            rusqlite::params![identity.as_str()],
            |row| {
              Ok(RawProfile {
                name:      row.get(0)?,
                user_type: row.get(1)?,
                entity_id: row.get(2)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn put_profile(&self, identity: Identity, profile: Profile) -> Result<()> {
    let user_type = profile.user_type.to_string();
    let entity_id = profile.entity_id.map(encode_uuid);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO profiles (identity, name, user_type, entity_id)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(identity) DO UPDATE SET
             name      = excluded.name,
             user_type = excluded.user_type,
             entity_id = excluded.entity_id",
          rusqlite::params![identity.as_str(), profile.name, user_type, entity_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_role(&self, identity: Identity) -> Result<Option<Role>> {
    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT role FROM roles WHERE identity = ?1",
            rusqlite::params![identity.as_str()],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    raw.as_deref().map(decode_role).transpose()
  }

  async fn put_role(&self, identity: Identity, role: Role) -> Result<()> {
    let role_str = role.to_string();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO roles (identity, role) VALUES (?1, ?2)
           ON CONFLICT(identity) DO UPDATE SET role = excluded.role",
          rusqlite::params![identity.as_str(), role_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Approvals ─────────────────────────────────────────────────────────────

  async fn get_approval(&self, subject: Identity) -> Result<Option<ApprovalRecord>> {
    let raw: Option<RawApproval> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("{APPROVAL_SELECT} WHERE subject = ?1"),
            rusqlite::params![subject.as_str()],
            RawApproval::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawApproval::into_record).transpose()
  }

  async fn list_approvals(&self) -> Result<Vec<ApprovalRecord>> {
    let raws: Vec<RawApproval> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(APPROVAL_SELECT)?;
        let rows = stmt
          .query_map([], RawApproval::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawApproval::into_record).collect()
  }

  async fn insert_approval(&self, record: ApprovalRecord) -> Result<bool> {
    let status       = record.status.to_string();
    let requested_at = encode_dt(record.requested_at);
    let decided_at   = record.decided_at.map(encode_dt);
    let decided_by   = record.decided_by.map(|i| i.as_str().to_owned());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO approvals (subject, status, requested_at, decided_at, decided_by)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(subject) DO NOTHING",
          rusqlite::params![
            record.subject.as_str(),
            status,
            requested_at,
            decided_at,
            decided_by,
          ],
        )?)
      })
      .await?;
    Ok(changed == 1)
  }

  async fn update_approval(
    &self,
    record: ApprovalRecord,
    expected: ApprovalStatus,
  ) -> Result<bool> {
    let status     = record.status.to_string();
    let expected   = expected.to_string();
    let decided_at = record.decided_at.map(encode_dt);
    let decided_by = record.decided_by.map(|i| i.as_str().to_owned());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE approvals
           SET status = ?2, decided_at = ?3, decided_by = ?4
           WHERE subject = ?1 AND status = ?5",
          rusqlite::params![
            record.subject.as_str(),
            status,
            decided_at,
            decided_by,
            expected,
          ],
        )?)
      })
      .await?;
    Ok(changed == 1)
  }

  // ── Students ──────────────────────────────────────────────────────────────

  async fn register_student(
    &self,
    owner: Identity,
    input: StudentRegistration,
    at: DateTime<Utc>,
  ) -> Result<Registered<Student>> {
    let student_id = Uuid::new_v4();
    let id_str     = encode_uuid(student_id);
    let owner_str  = owner.as_str().to_owned();
    let at_str     = encode_dt(at);
    let row        = input.clone();

    let outcome: Claim = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(held) = claim_owner(&tx, &owner_str, EntityKind::Student)? {
          return Ok(Err(held));
        }
        tx.execute(
          "INSERT INTO students (
             student_id, owner, full_name, guardian_name, contact_number,
             class_assignment, registered_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            owner_str,
            row.full_name,
            row.guardian_name,
            row.contact_number,
            row.class_assignment,
            at_str,
          ],
        )?;
        tx.execute(
          "INSERT INTO approvals (subject, status, requested_at)
           VALUES (?1, 'pending', ?2)
           ON CONFLICT(subject) DO NOTHING",
          rusqlite::params![owner_str, at_str],
        )?;
        let status = tx.query_row(
          "SELECT status FROM approvals WHERE subject = ?1",
          rusqlite::params![owner_str],
          |r| r.get(0),
        )?;
        tx.commit()?;
        Ok(Ok(status))
      })
      .await?;
    let status = match outcome {
      Ok(status) => status,
      Err(held) => return Ok(Registered::Exists(decode_enum("entity kind", &held)?)),
    };

    Ok(Registered::Created(Student {
      student_id,
      full_name: input.full_name,
      guardian_name: input.guardian_name,
      contact_number: input.contact_number,
      class_assignment: input.class_assignment,
      registered_at: at,
      status: decode_enum("approval status", &status)?,
      owner,
    }))
  }

  async fn get_student(&self, id: Uuid) -> Result<Option<Student>> {
    Ok(
      self
        .query_students("WHERE s.student_id = ?1", Some(encode_uuid(id)))
        .await?
        .pop(),
    )
  }

  async fn find_student_by_owner(&self, owner: Identity) -> Result<Option<Student>> {
    Ok(
      self
        .query_students("WHERE s.owner = ?1", Some(owner.as_str().to_owned()))
        .await?
        .pop(),
    )
  }

  async fn list_students(&self, status: Option<ApprovalStatus>) -> Result<Vec<Student>> {
    match status {
      Some(s) => {
        self
          .query_students(
            "WHERE COALESCE(a.status, 'pending') = ?1 ORDER BY s.registered_at",
            Some(s.to_string()),
          )
          .await
      }
      None => self.query_students("ORDER BY s.registered_at", None).await,
    }
  }

  // ── Teachers ──────────────────────────────────────────────────────────────

  async fn register_teacher(
    &self,
    owner: Identity,
    input: TeacherRegistration,
    at: DateTime<Utc>,
  ) -> Result<Registered<Teacher>> {
    let teacher_id = Uuid::new_v4();
    let id_str     = encode_uuid(teacher_id);
    let owner_str  = owner.as_str().to_owned();
    let at_str     = encode_dt(at);
    let subjects   = encode_list(&input.subjects)?;
    let classes    = encode_list(&input.classes)?;
    let full_name  = input.full_name.clone();
    let contact    = input.contact_number.clone();

    let outcome: Claim = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(held) = claim_owner(&tx, &owner_str, EntityKind::Teacher)? {
          return Ok(Err(held));
        }
        tx.execute(
          "INSERT INTO teachers (
             teacher_id, owner, full_name, contact_number, subjects, classes,
             registered_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str, owner_str, full_name, contact, subjects, classes, at_str,
          ],
        )?;
        tx.execute(
          "INSERT INTO approvals (subject, status, requested_at)
           VALUES (?1, 'pending', ?2)
           ON CONFLICT(subject) DO NOTHING",
          rusqlite::params![owner_str, at_str],
        )?;
        let status = tx.query_row(
          "SELECT status FROM approvals WHERE subject = ?1",
          rusqlite::params![owner_str],
          |r| r.get(0),
        )?;
        tx.commit()?;
        Ok(Ok(status))
      })
      .await?;
    let status = match outcome {
      Ok(status) => status,
      Err(held) => return Ok(Registered::Exists(decode_enum("entity kind", &held)?)),
    };

    Ok(Registered::Created(Teacher {
      teacher_id,
      full_name: input.full_name,
      contact_number: input.contact_number,
      subjects: input.subjects,
      classes: input.classes,
      registered_at: at,
      status: decode_enum("approval status", &status)?,
      owner,
    }))
  }

  async fn get_teacher(&self, id: Uuid) -> Result<Option<Teacher>> {
    Ok(
      self
        .query_teachers("WHERE t.teacher_id = ?1", Some(encode_uuid(id)))
        .await?
        .pop(),
    )
  }

  async fn find_teacher_by_owner(&self, owner: Identity) -> Result<Option<Teacher>> {
    Ok(
      self
        .query_teachers("WHERE t.owner = ?1", Some(owner.as_str().to_owned()))
        .await?
        .pop(),
    )
  }

  async fn list_teachers(&self, status: Option<ApprovalStatus>) -> Result<Vec<Teacher>> {
    match status {
      Some(s) => {
        self
          .query_teachers(
            "WHERE COALESCE(a.status, 'pending') = ?1 ORDER BY t.registered_at",
            Some(s.to_string()),
          )
          .await
      }
      None => self.query_teachers("ORDER BY t.registered_at", None).await,
    }
  }

  // ── Exams ─────────────────────────────────────────────────────────────────

  async fn add_exam(&self, input: NewExam, at: DateTime<Utc>) -> Result<Exam> {
    let exam = Exam {
      exam_id:    Uuid::new_v4(),
      subject:    input.subject,
      exam_date:  input.exam_date,
      created_at: at,
      marks:      Vec::new(),
    };

    let id_str   = encode_uuid(exam.exam_id);
    let subject  = exam.subject.clone();
    let date_str = encode_date(exam.exam_date);
    let at_str   = encode_dt(at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO exams (exam_id, subject, exam_date, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, subject, date_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(exam)
  }

  async fn get_exam(&self, id: Uuid) -> Result<Option<Exam>> {
    Ok(self.query_exams(Some(id)).await?.pop())
  }

  async fn list_exams(&self) -> Result<Vec<Exam>> { self.query_exams(None).await }

  async fn put_exam_mark(&self, exam_id: Uuid, mark: ExamMark) -> Result<()> {
    let exam_str    = encode_uuid(exam_id);
    let student_str = encode_uuid(mark.student_id);
    let grade       = mark.grade.to_string();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO exam_marks (exam_id, student_id, marks, grade)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(exam_id, student_id) DO UPDATE SET
             marks = excluded.marks,
             grade = excluded.grade",
          rusqlite::params![exam_str, student_str, mark.marks, grade],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
