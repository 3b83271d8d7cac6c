//! Cache keys for reads and the invalidation table for writes.
//!
//! Every read the portal performs is identified by a [`QueryKey`]; keys are
//! grouped into [`QueryFamily`] values. A successful [`Mutation`] drops every
//! cached entry in the families it lists, which is the only way a cached
//! value is ever refreshed.
//!
//! | Mutation | Invalidates |
//! |----------|-------------|
//! | `SaveProfile` | profile, role |
//! | `RequestApproval` | approval, approvals |
//! | `SetApproval` | approval, approvals, students, teachers |
//! | `AssignRole` | role |
//! | `RegisterStudent` | profile, approval, approvals, students |
//! | `RegisterTeacher` | profile, approval, approvals, teachers |
//! | `ApproveStudent` / `ApproveTeacher` | approval, approvals, students, teachers |
//! | `AddExam` / `RecordMark` | exams |

use campus_core::Identity;
use uuid::Uuid;

/// One cacheable read, including its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
  Profile,
  Role,
  IsAdmin,
  IsApproved,
  Approvals,
  ApprovedStudents,
  Students,
  Teachers,
  Student(Uuid),
  Teacher(Uuid),
  StudentApproved(Uuid),
  Exams,
  Exam(Uuid),
}

/// A group of related [`QueryKey`]s invalidated together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryFamily {
  Profile,
  Role,
  /// The caller's own approval state.
  Approval,
  /// The admin's view of every approval record.
  Approvals,
  Students,
  Teachers,
  Exams,
}

impl QueryKey {
  pub fn family(&self) -> QueryFamily {
    match self {
      Self::Profile => QueryFamily::Profile,
      Self::Role | Self::IsAdmin => QueryFamily::Role,
      Self::IsApproved => QueryFamily::Approval,
      Self::Approvals => QueryFamily::Approvals,
      Self::ApprovedStudents
      | Self::Students
      | Self::Student(_)
      | Self::StudentApproved(_) => QueryFamily::Students,
      Self::Teachers | Self::Teacher(_) => QueryFamily::Teachers,
      Self::Exams | Self::Exam(_) => QueryFamily::Exams,
    }
  }
}

/// A write, keyed finely enough that two submissions of the same form
/// collide while unrelated writes do not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mutation {
  SaveProfile,
  RequestApproval,
  SetApproval(Identity),
  AssignRole(Identity),
  RegisterStudent,
  RegisterTeacher,
  ApproveStudent(Uuid),
  ApproveTeacher(Uuid),
  AddExam,
  RecordMark { exam_id: Uuid, student_id: Uuid },
}

impl Mutation {
  /// Families whose cached entries are stale once this mutation succeeds.
  pub fn invalidates(&self) -> &'static [QueryFamily] {
    use QueryFamily::*;
    match self {
      Self::SaveProfile => &[Profile, Role],
      Self::RequestApproval => &[Approval, Approvals],
      Self::SetApproval(_) | Self::ApproveStudent(_) | Self::ApproveTeacher(_) => {
        &[Approval, Approvals, Students, Teachers]
      }
      Self::AssignRole(_) => &[Role],
      Self::RegisterStudent => &[Profile, Approval, Approvals, Students],
      Self::RegisterTeacher => &[Profile, Approval, Approvals, Teachers],
      Self::AddExam | Self::RecordMark { .. } => &[Exams],
    }
  }

  /// Human-readable name, used in notices and `Busy` errors.
  pub fn label(&self) -> &'static str {
    match self {
      Self::SaveProfile => "saving the profile",
      Self::RequestApproval => "requesting approval",
      Self::SetApproval(_) => "updating the approval",
      Self::AssignRole(_) => "assigning the role",
      Self::RegisterStudent => "student registration",
      Self::RegisterTeacher => "teacher registration",
      Self::ApproveStudent(_) => "updating the student",
      Self::ApproveTeacher(_) => "updating the teacher",
      Self::AddExam => "adding the exam",
      Self::RecordMark { .. } => "recording the mark",
    }
  }

  /// Notice shown when the mutation succeeds.
  pub fn success_message(&self) -> &'static str {
    match self {
      Self::SaveProfile => "Profile saved",
      Self::RequestApproval => "Approval requested",
      Self::SetApproval(_) | Self::ApproveStudent(_) | Self::ApproveTeacher(_) => {
        "Approval updated"
      }
      Self::AssignRole(_) => "Role assigned",
      Self::RegisterStudent | Self::RegisterTeacher => {
        "Registration submitted; awaiting approval"
      }
      Self::AddExam => "Exam added",
      Self::RecordMark { .. } => "Mark recorded",
    }
  }
}
