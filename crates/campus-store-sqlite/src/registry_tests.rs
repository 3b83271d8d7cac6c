//! Authorization and approval-flow tests for `Registry` over a real store.

use campus_core::{
  Error, ErrorKind, Identity,
  approval::ApprovalStatus,
  exam::{Grade, NewExam},
  identity::{Profile, Role, UserType},
  registry::Registry,
  roster::{StudentRegistration, TeacherRegistration},
};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::SqliteStore;

async fn registry() -> (Registry<SqliteStore>, Identity) {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  let registry = Registry::new(store);
  let admin = Identity::new("admin");
  registry.bootstrap_admin(&admin).await.unwrap();
  (registry, admin)
}

fn id(s: &str) -> Identity { Identity::new(s) }

fn student_form(name: &str) -> StudentRegistration {
  StudentRegistration {
    full_name:        name.into(),
    guardian_name:    "Guardian".into(),
    contact_number:   "555 123 4567".into(),
    class_assignment: "9A".into(),
  }
}

fn teacher_form(name: &str) -> TeacherRegistration {
  TeacherRegistration {
    full_name:      name.into(),
    contact_number: "5559876543".into(),
    subjects:       vec!["Chemistry".into()],
    classes:        vec![],
  }
}

fn exam(subject: &str) -> NewExam {
  NewExam {
    subject:   subject.into(),
    exam_date: NaiveDate::from_ymd_opt(2025, 5, 20).unwrap(),
  }
}

// ─── Roles ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn role_derives_from_profile() {
  let (r, _) = registry().await;
  let user = id("u1");
  assert_eq!(r.get_caller_user_role(&user).await.unwrap(), Role::Guest);

  r.save_caller_user_profile(&user, Profile::new("U One", UserType::Student))
    .await
    .unwrap();
  assert_eq!(r.get_caller_user_role(&user).await.unwrap(), Role::User);
  assert!(!r.is_caller_admin(&user).await.unwrap());
}

#[tokio::test]
async fn only_admins_assign_roles() {
  let (r, admin) = registry().await;
  let err = r
    .assign_caller_user_role(&id("u1"), id("u1"), Role::Admin)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);

  r.assign_caller_user_role(&admin, id("u2"), Role::Admin)
    .await
    .unwrap();
  assert!(r.is_caller_admin(&id("u2")).await.unwrap());
}

#[tokio::test]
async fn admin_cannot_demote_self() {
  let (r, admin) = registry().await;
  let err = r
    .assign_caller_user_role(&admin, admin.clone(), Role::User)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn self_declared_admin_profile_is_forbidden() {
  let (r, admin) = registry().await;
  let err = r
    .save_caller_user_profile(&id("u1"), Profile::new("Mallory", UserType::Admin))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);

  r.save_caller_user_profile(&admin, Profile::new("Head", UserType::Admin))
    .await
    .unwrap();
}

#[tokio::test]
async fn blank_profile_name_is_a_validation_error() {
  let (r, _) = registry().await;
  let err = r
    .save_caller_user_profile(&id("u1"), Profile::new("   ", UserType::Student))
    .await
    .unwrap_err();
  let Error::Validation(fields) = err else {
    panic!("expected validation error, got {err:?}");
  };
  assert!(fields.get("name").is_some());
  assert!(r.get_caller_user_profile(&id("u1")).await.unwrap().is_none());
}

#[tokio::test]
async fn registration_links_existing_profile() {
  let (r, _) = registry().await;
  let user = id("stu");
  r.save_caller_user_profile(&user, Profile::new("Stu", UserType::Student))
    .await
    .unwrap();
  let student = r.register_student(&user, student_form("Stu")).await.unwrap();

  let profile = r.get_caller_user_profile(&user).await.unwrap().unwrap();
  assert_eq!(profile.entity_id, Some(student.student_id));
}

#[tokio::test]
async fn profile_cannot_claim_another_owners_record() {
  let (r, _) = registry().await;
  let student = r
    .register_student(&id("owner"), student_form("Owner"))
    .await
    .unwrap();

  let mut claim = Profile::new("Thief", UserType::Student);
  claim.entity_id = Some(student.student_id);
  let err = r
    .save_caller_user_profile(&id("thief"), claim)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);

  let mut dangling = Profile::new("Ghost", UserType::Student);
  dangling.entity_id = Some(Uuid::new_v4());
  let err = r
    .save_caller_user_profile(&id("ghost"), dangling)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
}

// ─── Approvals ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn non_admin_cannot_decide_or_list() {
  let (r, _) = registry().await;
  let user = id("u1");
  r.request_approval(&user).await.unwrap();

  let err = r
    .set_approval(&user, user.clone(), ApprovalStatus::Approved)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);
  assert_eq!(
    r.list_approvals(&user).await.unwrap_err().kind(),
    ErrorKind::Forbidden
  );
  assert!(!r.is_caller_approved(&user).await.unwrap());
}

#[tokio::test]
async fn set_approval_is_visible_in_listing() {
  let (r, admin) = registry().await;
  let user = id("u1");
  r.request_approval(&user).await.unwrap();
  r.set_approval(&admin, user.clone(), ApprovalStatus::Approved)
    .await
    .unwrap();

  let records = r.list_approvals(&admin).await.unwrap();
  let record = records.iter().find(|a| a.subject == user).unwrap();
  assert_eq!(record.status, ApprovalStatus::Approved);
  assert_eq!(record.decided_by, Some(admin));
  assert!(r.is_caller_approved(&user).await.unwrap());
}

#[tokio::test]
async fn repeated_approval_is_idempotent() {
  let (r, admin) = registry().await;
  let user = id("u1");
  r.request_approval(&user).await.unwrap();
  r.set_approval(&admin, user.clone(), ApprovalStatus::Approved)
    .await
    .unwrap();
  r.set_approval(&admin, user.clone(), ApprovalStatus::Approved)
    .await
    .unwrap();
  assert!(r.is_caller_approved(&user).await.unwrap());
}

#[tokio::test]
async fn decided_record_cannot_flip() {
  let (r, admin) = registry().await;
  let user = id("u1");
  r.request_approval(&user).await.unwrap();
  r.set_approval(&admin, user.clone(), ApprovalStatus::Rejected)
    .await
    .unwrap();

  let err = r
    .set_approval(&admin, user.clone(), ApprovalStatus::Approved)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidTransition { .. }));
  assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn request_approval_keeps_existing_decision() {
  let (r, admin) = registry().await;
  let user = id("u1");
  r.request_approval(&user).await.unwrap();
  r.set_approval(&admin, user.clone(), ApprovalStatus::Approved)
    .await
    .unwrap();
  r.request_approval(&user).await.unwrap();
  assert!(r.is_caller_approved(&user).await.unwrap());
}

#[tokio::test]
async fn approve_student_updates_projected_status() {
  let (r, admin) = registry().await;
  let user = id("stu");
  let student = r.register_student(&user, student_form("Stu")).await.unwrap();
  assert!(!r.is_student_approved(&user, student.student_id).await.unwrap());

  r.approve_student(&admin, student.student_id, ApprovalStatus::Approved)
    .await
    .unwrap();

  assert!(r.is_student_approved(&user, student.student_id).await.unwrap());
  assert!(r.is_caller_approved(&user).await.unwrap());
  let listed = r.get_all_approved_students(&admin).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].status, ApprovalStatus::Approved);
}

#[tokio::test]
async fn approving_unknown_student_is_not_found() {
  let (r, admin) = registry().await;
  let err = r
    .approve_student(&admin, Uuid::new_v4(), ApprovalStatus::Approved)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
  assert!(!r.is_student_approved(&admin, Uuid::new_v4()).await.unwrap());
}

// ─── Registration & roster reads ─────────────────────────────────────────────

#[tokio::test]
async fn second_registration_conflicts() {
  let (r, _) = registry().await;
  let user = id("dup");
  r.register_student(&user, student_form("Dup")).await.unwrap();
  let err = r
    .register_teacher(&user, teacher_form("Dup"))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn racing_student_and_teacher_forms_leave_one_record() {
  let (r, admin) = registry().await;
  let user = id("twin");
  let (student, teacher) = tokio::join!(
    r.register_student(&user, student_form("Twin")),
    r.register_teacher(&user, teacher_form("Twin")),
  );
  let loser = match (student, teacher) {
    (Ok(_), Err(err)) | (Err(err), Ok(_)) => err,
    other => panic!("expected exactly one registration, got {other:?}"),
  };
  assert_eq!(loser.kind(), ErrorKind::Conflict);

  let students = r.list_students(&admin).await.unwrap();
  let teachers = r.list_teachers(&admin).await.unwrap();
  assert_eq!(students.len() + teachers.len(), 1);
}

#[tokio::test]
async fn racing_student_forms_conflict_instead_of_failing() {
  let (r, admin) = registry().await;
  let user = id("echo");
  let (first, second) = tokio::join!(
    r.register_student(&user, student_form("Echo")),
    r.register_student(&user, student_form("Echo Again")),
  );
  let loser = match (first, second) {
    (Ok(_), Err(err)) | (Err(err), Ok(_)) => err,
    other => panic!("expected exactly one registration, got {other:?}"),
  };
  assert_eq!(loser.kind(), ErrorKind::Conflict);
  assert_eq!(r.list_students(&admin).await.unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_registration_writes_nothing() {
  let (r, admin) = registry().await;
  let mut form = student_form("Bad");
  form.contact_number = "12".into();
  let err = r.register_student(&id("bad"), form).await.unwrap_err();
  let Error::Validation(fields) = err else {
    panic!("expected validation error, got {err:?}");
  };
  assert!(fields.get("contact_number").is_some());
  assert!(r.list_students(&admin).await.unwrap().is_empty());
}

#[tokio::test]
async fn unapproved_caller_sees_only_own_record() {
  let (r, _) = registry().await;
  let owner = id("owner");
  let student = r.register_student(&owner, student_form("Owner")).await.unwrap();

  let own = r.get_student_by_id(&owner, student.student_id).await.unwrap();
  assert!(own.is_some());

  let err = r
    .get_student_by_id(&id("stranger"), student.student_id)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);
  let err = r
    .get_student_by_id(&id("stranger"), Uuid::new_v4())
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);
  assert_eq!(
    r.get_all_approved_students(&owner).await.unwrap_err().kind(),
    ErrorKind::Forbidden
  );
}

#[tokio::test]
async fn approved_caller_browses_roster() {
  let (r, admin) = registry().await;
  r.save_caller_user_profile(&id("t"), Profile::new("T", UserType::Teacher))
    .await
    .unwrap();
  let teacher = r.register_teacher(&id("t"), teacher_form("T")).await.unwrap();
  r.approve_teacher(&admin, teacher.teacher_id, ApprovalStatus::Approved)
    .await
    .unwrap();
  let student = r.register_student(&id("s"), student_form("S")).await.unwrap();

  let seen = r
    .get_student_by_id(&id("t"), student.student_id)
    .await
    .unwrap();
  assert_eq!(seen.map(|s| s.full_name), Some("S".to_owned()));
  assert!(
    r.get_teacher_by_id(&id("t"), Uuid::new_v4())
      .await
      .unwrap()
      .is_none()
  );
  assert_eq!(
    r.list_teachers(&id("t")).await.unwrap_err().kind(),
    ErrorKind::Forbidden
  );
}

// ─── Exams ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pending_teacher_cannot_add_exam() {
  let (r, _) = registry().await;
  r.register_teacher(&id("t"), teacher_form("T")).await.unwrap();
  let err = r.add_exam(&id("t"), exam("Chemistry")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn approved_teacher_grades_approved_student() {
  let (r, admin) = registry().await;
  r.save_caller_user_profile(&id("s"), Profile::new("S", UserType::Student))
    .await
    .unwrap();
  let teacher = r.register_teacher(&id("t"), teacher_form("T")).await.unwrap();
  r.approve_teacher(&admin, teacher.teacher_id, ApprovalStatus::Approved)
    .await
    .unwrap();
  let student = r.register_student(&id("s"), student_form("S")).await.unwrap();

  let created = r.add_exam(&id("t"), exam("  Chemistry ")).await.unwrap();
  assert_eq!(created.subject, "Chemistry");

  let err = r
    .record_exam_mark(&id("t"), created.exam_id, student.student_id, 88)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);

  r.approve_student(&admin, student.student_id, ApprovalStatus::Approved)
    .await
    .unwrap();
  let mark = r
    .record_exam_mark(&id("t"), created.exam_id, student.student_id, 88)
    .await
    .unwrap();
  assert_eq!(mark.grade, Grade::A);

  let fetched = r.get_exam(&id("s"), created.exam_id).await.unwrap().unwrap();
  assert_eq!(fetched.marks, vec![mark]);
}

#[tokio::test]
async fn marks_above_maximum_are_rejected() {
  let (r, admin) = registry().await;
  let created = r.add_exam(&admin, exam("Maths")).await.unwrap();
  let err = r
    .record_exam_mark(&admin, created.exam_id, Uuid::new_v4(), 101)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let err = r
    .record_exam_mark(&admin, Uuid::new_v4(), Uuid::new_v4(), 50)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn exams_require_approval_to_view() {
  let (r, admin) = registry().await;
  r.add_exam(&admin, exam("Maths")).await.unwrap();
  assert_eq!(
    r.list_exams(&id("guest")).await.unwrap_err().kind(),
    ErrorKind::Forbidden
  );
  assert_eq!(r.list_exams(&admin).await.unwrap().len(), 1);
}
