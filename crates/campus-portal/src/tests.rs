use std::sync::Arc;

use campus_core::{
  Error, ErrorKind, Identity, Result,
  approval::ApprovalStatus,
  backend::LocalBackend,
  identity::{Profile, Role, UserType},
  registry::Registry,
  roster::{EntityKind, StudentRegistration},
};
use campus_store_sqlite::SqliteStore;
use tokio::sync::Notify;

use crate::{
  Portal,
  notice::NoticeLevel,
  route::{Page, Route},
  session::{Authenticator, LocalAuthenticator, LoginOutcome, SessionStatus},
};

type TestPortal = Portal<LocalBackend<SqliteStore>>;

async fn registry() -> Arc<Registry<SqliteStore>> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let registry = Registry::new(store);
  registry
    .bootstrap_admin(&Identity::new("admin"))
    .await
    .unwrap();
  Arc::new(registry)
}

fn as_user(
  registry: &Arc<Registry<SqliteStore>>,
  name: &str,
) -> LocalAuthenticator<SqliteStore> {
  LocalAuthenticator {
    registry: Arc::clone(registry),
    identity: Identity::new(name),
  }
}

async fn signed_in(registry: &Arc<Registry<SqliteStore>>, name: &str) -> TestPortal {
  let portal = Portal::new();
  portal.init().await;
  portal.login(&as_user(registry, name)).await.unwrap();
  portal.take_notices();
  portal
}

fn student_form() -> StudentRegistration {
  StudentRegistration {
    full_name:        "Ada Obi".into(),
    guardian_name:    "Grace Obi".into(),
    contact_number:   "+44 20 7946 0958".into(),
    class_assignment: "7B".into(),
  }
}

/// Fails every ceremony, as an unreachable identity provider would.
struct Unreachable;

impl Authenticator for Unreachable {
  type Backend = LocalBackend<SqliteStore>;

  async fn authenticate(&self) -> Result<Self::Backend> {
    Err(Error::Unavailable("identity provider did not answer".into()))
  }
}

/// Holds the ceremony open until `gate` is notified.
struct Gated {
  inner: LocalAuthenticator<SqliteStore>,
  gate:  Arc<Notify>,
}

impl Authenticator for Gated {
  type Backend = LocalBackend<SqliteStore>;

  async fn authenticate(&self) -> Result<Self::Backend> {
    self.gate.notified().await;
    self.inner.authenticate().await
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn starts_initializing_then_unauthenticated() {
  let portal = TestPortal::new();
  assert_eq!(portal.status().await, SessionStatus::Initializing);
  assert_eq!(portal.route(&Page::Home).await, Route::Loading);

  portal.init().await;
  assert_eq!(portal.status().await, SessionStatus::Unauthenticated);
  assert_eq!(portal.route(&Page::Home).await, Route::Landing);
  assert_eq!(
    portal.route(&Page::parse("/admin")).await,
    Route::Login {
      return_to: Some("/admin".into()),
    }
  );
}

#[tokio::test]
async fn login_then_logout() {
  let registry = registry().await;
  let portal = TestPortal::new();
  portal.init().await;

  let outcome = portal.login(&as_user(&registry, "ada")).await.unwrap();
  assert_eq!(outcome, LoginOutcome::LoggedIn(Identity::new("ada")));
  assert_eq!(portal.status().await, SessionStatus::Authenticated);
  assert_eq!(portal.identity().await, Some(Identity::new("ada")));

  portal.logout().await;
  assert_eq!(portal.status().await, SessionStatus::Unauthenticated);
  assert_eq!(portal.identity().await, None);
  assert_eq!(portal.profile().await.unwrap_err().kind(), ErrorKind::Unauthenticated);

  let levels: Vec<_> = portal.take_notices().into_iter().map(|n| n.level).collect();
  assert_eq!(levels, [NoticeLevel::Success, NoticeLevel::Info]);
}

#[tokio::test]
async fn next_identity_never_sees_previous_cache() {
  let registry = registry().await;
  let portal = signed_in(&registry, "ada").await;
  portal
    .save_profile(&Profile::new("Ada", UserType::Student))
    .await
    .unwrap();
  assert_eq!(portal.profile().await.unwrap().unwrap().name, "Ada");
  assert_eq!(portal.role().await.unwrap(), Role::User);

  portal.logout().await;
  portal.login(&as_user(&registry, "bo")).await.unwrap();

  assert_eq!(portal.route_cached(&Page::Home).await, Route::Loading);
  assert_eq!(portal.profile().await.unwrap(), None);
  assert_eq!(portal.role().await.unwrap(), Role::Guest);
}

#[tokio::test]
async fn failed_login_restores_previous_status() {
  let portal = TestPortal::new();
  portal.init().await;

  let err = portal.login(&Unreachable).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Unavailable);
  assert_eq!(portal.status().await, SessionStatus::Unauthenticated);

  let notices = portal.take_notices();
  assert_eq!(notices.len(), 1);
  assert_eq!(notices[0].level, NoticeLevel::Error);
  assert_eq!(notices[0].kind, Some(ErrorKind::Unavailable));
}

#[tokio::test]
async fn second_login_while_pending_is_ignored() {
  let registry = registry().await;
  let portal = TestPortal::new();
  portal.init().await;
  let gated = Gated {
    inner: as_user(&registry, "ada"),
    gate:  Arc::new(Notify::new()),
  };

  let (first, second) = tokio::join!(portal.login(&gated), async {
    let outcome = portal.login(&gated).await;
    assert_eq!(portal.route(&Page::Home).await, Route::Authenticating);
    gated.gate.notify_one();
    outcome
  });

  assert_eq!(second.unwrap(), LoginOutcome::InProgress);
  assert_eq!(first.unwrap(), LoginOutcome::LoggedIn(Identity::new("ada")));
  assert_eq!(portal.status().await, SessionStatus::Authenticated);
}

#[tokio::test]
async fn logout_during_login_cancels_it() {
  let registry = registry().await;
  let portal = TestPortal::new();
  portal.init().await;
  let gated = Gated {
    inner: as_user(&registry, "ada"),
    gate:  Arc::new(Notify::new()),
  };

  let (outcome, ()) = tokio::join!(portal.login(&gated), async {
    portal.logout().await;
    gated.gate.notify_one();
  });

  assert_eq!(outcome.unwrap(), LoginOutcome::Cancelled);
  assert_eq!(portal.status().await, SessionStatus::Unauthenticated);
  assert_eq!(portal.identity().await, None);
}

// ─── Routing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn route_cached_waits_for_a_fetch() {
  let registry = registry().await;
  let portal = signed_in(&registry, "ada").await;

  assert_eq!(portal.route_cached(&Page::Home).await, Route::Loading);
  assert_eq!(portal.route(&Page::Home).await, Route::ProfileSetup);
  assert_eq!(portal.route_cached(&Page::Home).await, Route::ProfileSetup);
}

#[tokio::test]
async fn student_walks_through_onboarding() {
  let registry = registry().await;
  let student = signed_in(&registry, "ada").await;
  let admin = signed_in(&registry, "admin").await;

  student
    .save_profile(&Profile::new("Ada", UserType::Student))
    .await
    .unwrap();
  assert_eq!(
    student.route(&Page::Student).await,
    Route::Registration(EntityKind::Student)
  );

  let registered = student.register_student(&student_form()).await.unwrap();
  assert_eq!(registered.status, ApprovalStatus::Pending);
  assert_eq!(
    student.route(&Page::Student).await,
    Route::AwaitingApproval(EntityKind::Student)
  );

  let (pending, processed) = admin.approval_queue().await.unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].subject, Identity::new("ada"));
  assert!(processed.is_empty());

  admin
    .approve_student(registered.student_id, ApprovalStatus::Approved)
    .await
    .unwrap();
  let (pending, processed) = admin.approval_queue().await.unwrap();
  assert!(pending.is_empty());
  assert_eq!(processed[0].decided_by, Some(Identity::new("admin")));
  assert!(admin.is_student_approved(registered.student_id).await.unwrap());

  // The student's snapshot predates the decision until it is refreshed.
  assert_eq!(
    student.route(&Page::Student).await,
    Route::AwaitingApproval(EntityKind::Student)
  );
  student.refresh().await;
  assert_eq!(student.route(&Page::Student).await, Route::StudentDashboard);
  assert_eq!(student.route(&Page::Admin).await, Route::StudentDashboard);
}

#[tokio::test]
async fn admin_lands_on_dashboard() {
  let registry = registry().await;
  let admin = signed_in(&registry, "admin").await;
  admin
    .save_profile(&Profile::new("Head", UserType::Admin))
    .await
    .unwrap();

  assert!(admin.is_admin().await.unwrap());
  assert_eq!(admin.route(&Page::Home).await, Route::AdminDashboard);
  assert_eq!(
    admin.route(&Page::AdminApprovals).await,
    Route::AdminApprovals
  );
}

#[tokio::test]
async fn guest_profile_waits_for_access() {
  let registry = registry().await;
  let portal = signed_in(&registry, "wanderer").await;
  portal
    .save_profile(&Profile::new("Wanderer", UserType::Guest))
    .await
    .unwrap();
  assert_eq!(portal.route(&Page::Teacher).await, Route::AccessPending);
}

// ─── Mutations ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn invalid_form_never_reaches_backend() {
  let registry = registry().await;
  let student = signed_in(&registry, "ada").await;
  let admin = signed_in(&registry, "admin").await;

  let mut form = student_form();
  form.contact_number = "call me".into();
  let err = student.register_student(&form).await.unwrap_err();
  match &err {
    Error::Validation(fields) => assert!(fields.get("contact_number").is_some()),
    other => panic!("expected validation error, got {other:?}"),
  }
  assert!(admin.students().await.unwrap().is_empty());

  let notices = student.take_notices();
  assert_eq!(notices[0].kind, Some(ErrorKind::Validation));

  // The form is still ours to fix and resubmit.
  form.contact_number = "0161 496 0000".into();
  let student_record = student.register_student(&form).await.unwrap();
  assert_eq!(student_record.full_name, "Ada Obi");
}

#[tokio::test]
async fn mutation_invalidates_cached_reads() {
  let registry = registry().await;
  let portal = signed_in(&registry, "ada").await;

  assert!(!portal.is_approved().await.unwrap());
  portal.request_approval().await.unwrap();

  let admin = signed_in(&registry, "admin").await;
  assert_eq!(admin.approvals().await.unwrap().len(), 1);
  admin
    .set_approval(Identity::new("ada"), ApprovalStatus::Approved)
    .await
    .unwrap();
  let records = admin.approvals().await.unwrap();
  assert_eq!(records[0].status, ApprovalStatus::Approved);

  let err = admin
    .set_approval(Identity::new("ada"), ApprovalStatus::Rejected)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);

  portal.refresh().await;
  assert!(portal.is_approved().await.unwrap());
}

#[tokio::test]
async fn teacher_adds_exam_and_records_mark() {
  let registry = registry().await;
  let admin = signed_in(&registry, "admin").await;
  let teacher = signed_in(&registry, "tess").await;
  let student = signed_in(&registry, "ada").await;

  teacher
    .save_profile(&Profile::new("Tess", UserType::Teacher))
    .await
    .unwrap();
  let t = teacher
    .register_teacher(&campus_core::roster::TeacherRegistration {
      full_name:      "Tess Marr".into(),
      contact_number: "0161 496 0001".into(),
      subjects:       vec!["Maths".into()],
      classes:        vec!["7B".into()],
    })
    .await
    .unwrap();
  let s = student.register_student(&student_form()).await.unwrap();

  admin
    .approve_teacher(t.teacher_id, ApprovalStatus::Approved)
    .await
    .unwrap();
  admin
    .approve_student(s.student_id, ApprovalStatus::Approved)
    .await
    .unwrap();
  teacher.refresh().await;

  let date = chrono::NaiveDate::from_ymd_opt(2026, 6, 12).unwrap();
  let err = teacher.add_exam("  ", date).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let exam = teacher.add_exam("  Maths ", date).await.unwrap();
  assert_eq!(exam.subject, "Maths");
  assert_eq!(teacher.exams().await.unwrap().len(), 1);

  let mark = teacher
    .record_mark(exam.exam_id, s.student_id, 93)
    .await
    .unwrap();
  assert_eq!(mark.marks, 93);

  let exam = teacher.exam(exam.exam_id).await.unwrap().unwrap();
  assert_eq!(exam.marks.len(), 1);

  let err = teacher
    .record_mark(exam.exam_id, s.student_id, 101)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn mutations_need_a_session() {
  let portal = TestPortal::new();
  portal.init().await;
  let err = portal.request_approval().await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Unauthenticated);
  assert!(!portal.is_pending(&crate::query::Mutation::RequestApproval));
}
