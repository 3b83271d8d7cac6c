//! [`Portal`]: the client-side session, cache and data-access layer.
//!
//! A `Portal` owns everything that lives for one signed-in user: the backend
//! handle, the query cache, in-flight mutations and pending notices. Reads go
//! through the cache; writes go through [`Portal::mutate`], which guards
//! against duplicate submission and invalidates the families a mutation
//! touches.

use std::future::Future;

use chrono::NaiveDate;
use campus_core::{
  Error, Identity, Result,
  approval::{ApprovalRecord, ApprovalStatus, split_pending},
  backend::SchoolBackend,
  exam::{Exam, ExamMark, NewExam},
  identity::{Profile, Role},
  roster::{Student, StudentRegistration, Teacher, TeacherRegistration},
};
use dashmap::DashSet;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  access::{Access, Loadable, ProfileState},
  cache::QueryCache,
  notice::{Notice, Notices},
  query::{Mutation, QueryFamily, QueryKey},
  route::{self, Page, Route},
  session::{Authenticator, LoginOutcome, SessionStatus},
};

struct Session<B> {
  status:  SessionStatus,
  backend: Option<B>,
}

/// Removes its mutation from the in-flight set when dropped.
struct InFlight<'a> {
  set:      &'a DashSet<Mutation>,
  mutation: Mutation,
}

impl<'a> InFlight<'a> {
  fn acquire(set: &'a DashSet<Mutation>, mutation: &Mutation) -> Option<Self> {
    set.insert(mutation.clone()).then(|| Self {
      set,
      mutation: mutation.clone(),
    })
  }
}

impl Drop for InFlight<'_> {
  fn drop(&mut self) { self.set.remove(&self.mutation); }
}

pub struct Portal<B> {
  session:   RwLock<Session<B>>,
  cache:     QueryCache,
  in_flight: DashSet<Mutation>,
  notices:   Notices,
}

impl<B: SchoolBackend + Clone + 'static> Default for Portal<B> {
  fn default() -> Self { Self::new() }
}

impl<B: SchoolBackend + Clone + 'static> Portal<B> {
  pub fn new() -> Self {
    Self {
      session:   RwLock::new(Session {
        status:  SessionStatus::Initializing,
        backend: None,
      }),
      cache:     QueryCache::new(),
      in_flight: DashSet::new(),
      notices:   Notices::default(),
    }
  }

  // ── Session ───────────────────────────────────────────────────────────────

  /// Finish startup. There is no persisted session, so this always lands
  /// in `Unauthenticated`.
  pub async fn init(&self) {
    let mut session = self.session.write().await;
    if session.status == SessionStatus::Initializing {
      session.status = SessionStatus::Unauthenticated;
    }
  }

  pub async fn status(&self) -> SessionStatus { self.session.read().await.status }

  pub async fn identity(&self) -> Option<Identity> {
    self
      .session
      .read()
      .await
      .backend
      .as_ref()
      .map(|b| b.identity().clone())
  }

  /// Run `auth`'s ceremony. A second call while one is pending does nothing.
  /// On failure the previous session is left exactly as it was.
  pub async fn login<A>(&self, auth: &A) -> Result<LoginOutcome>
  where
    A: Authenticator<Backend = B>,
  {
    let previous = {
      let mut session = self.session.write().await;
      if session.status == SessionStatus::Authenticating {
        debug!("login already in progress");
        return Ok(LoginOutcome::InProgress);
      }
      std::mem::replace(&mut session.status, SessionStatus::Authenticating)
    };

    match auth.authenticate().await {
      Ok(backend) => {
        let mut session = self.session.write().await;
        if session.status != SessionStatus::Authenticating {
          debug!("login finished after logout; discarding");
          return Ok(LoginOutcome::Cancelled);
        }
        let identity = backend.identity().clone();
        self.cache.clear().await;
        session.backend = Some(backend);
        session.status = SessionStatus::Authenticated;
        drop(session);

        info!(%identity, "signed in");
        self.notices.push(Notice::success(format!("Signed in as {identity}")));
        Ok(LoginOutcome::LoggedIn(identity))
      }
      Err(e) => {
        let mut session = self.session.write().await;
        if session.status == SessionStatus::Authenticating {
          session.status = previous;
        }
        drop(session);

        tracing::warn!(error = %e, "sign-in failed");
        self.notices.push(Notice::error("Signing in", &e));
        Err(e)
      }
    }
  }

  /// Forget the identity and everything fetched under it.
  pub async fn logout(&self) {
    let identity = {
      let mut session = self.session.write().await;
      session.status = SessionStatus::Unauthenticated;
      self.cache.clear().await;
      session.backend.take().map(|b| b.identity().clone())
    };
    if let Some(identity) = identity {
      info!(%identity, "signed out");
      self.notices.push(Notice::info("Signed out"));
    }
  }

  /// Drop every cached read so the next access refetches. Changes made by
  /// other users (an admin's approval, say) only show up after this.
  pub async fn refresh(&self) {
    self
      .cache
      .invalidate(&[
        QueryFamily::Profile,
        QueryFamily::Role,
        QueryFamily::Approval,
        QueryFamily::Approvals,
        QueryFamily::Students,
        QueryFamily::Teachers,
        QueryFamily::Exams,
      ])
      .await;
  }

  /// Notices raised since the last call, oldest first.
  pub fn take_notices(&self) -> Vec<Notice> { self.notices.drain() }

  /// Whether `mutation` is currently running, so a UI can disable its control.
  pub fn is_pending(&self, mutation: &Mutation) -> bool {
    self.in_flight.contains(mutation)
  }

  async fn backend(&self) -> Result<B> {
    self
      .session
      .read()
      .await
      .backend
      .clone()
      .ok_or(Error::Unauthenticated)
  }

  // ── Plumbing ──────────────────────────────────────────────────────────────

  /// Return the cached value for `key`, fetching and caching it on a miss.
  async fn query<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce(B) -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    if let Some(v) = self.cache.get::<T>(&key).await {
      return Ok(v);
    }
    // Sign-in and sign-out bump the generation under the session write lock,
    // so this pair always belongs to the same identity.
    let (backend, generation) = {
      let session = self.session.read().await;
      let backend = session.backend.clone().ok_or(Error::Unauthenticated)?;
      (backend, self.cache.generation().await)
    };
    debug!(?key, "cache miss");
    let value = fetch(backend).await?;
    self.cache.put(key, generation, value.clone()).await;
    Ok(value)
  }

  /// Run a write under the duplicate-submission guard, then invalidate and
  /// report. Validation errors raised inside `run` before it touches the
  /// backend are reported the same way.
  async fn mutate<T, F, Fut>(&self, mutation: Mutation, run: F) -> Result<T>
  where
    F: FnOnce(B) -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let result = match InFlight::acquire(&self.in_flight, &mutation) {
      None => Err(Error::Busy(mutation.label().to_owned())),
      Some(_guard) => match self.backend().await {
        Ok(backend) => run(backend).await,
        Err(e) => Err(e),
      },
    };

    match &result {
      Ok(_) => {
        self.cache.invalidate(mutation.invalidates()).await;
        self.notices.push(Notice::success(mutation.success_message()));
      }
      Err(e) => self.notices.push(Notice::error(mutation.label(), e)),
    }
    result
  }

  // ── Caller reads ──────────────────────────────────────────────────────────

  pub async fn profile(&self) -> Result<Option<Profile>> {
    self
      .query(QueryKey::Profile, |b| async move {
        b.get_caller_user_profile().await
      })
      .await
  }

  pub async fn role(&self) -> Result<Role> {
    self
      .query(QueryKey::Role, |b| async move { b.get_caller_user_role().await })
      .await
  }

  pub async fn is_admin(&self) -> Result<bool> {
    self
      .query(QueryKey::IsAdmin, |b| async move { b.is_caller_admin().await })
      .await
  }

  pub async fn is_approved(&self) -> Result<bool> {
    self
      .query(QueryKey::IsApproved, |b| async move {
        b.is_caller_approved().await
      })
      .await
  }

  /// The caller's capabilities, read through the cache.
  pub async fn access(&self) -> Result<Access> {
    let (profile, role, approved) =
      tokio::try_join!(self.profile(), self.role(), self.is_approved())?;
    Ok(Access {
      role,
      profile: profile.map_or(ProfileState::Unset, ProfileState::Set),
      approved,
    })
  }

  /// [`Self::access`] from cached values only; `None` if any part is missing.
  pub async fn access_cached(&self) -> Option<Access> {
    let profile = self.cache.get::<Option<Profile>>(&QueryKey::Profile).await?;
    let role = self.cache.get::<Role>(&QueryKey::Role).await?;
    let approved = self.cache.get::<bool>(&QueryKey::IsApproved).await?;
    Some(Access {
      role,
      profile: profile.map_or(ProfileState::Unset, ProfileState::Set),
      approved,
    })
  }

  // ── Routing ───────────────────────────────────────────────────────────────

  /// Resolve `page`, fetching the access snapshot if needed.
  pub async fn route(&self, page: &Page) -> Route {
    let status = self.status().await;
    let access = if status == SessionStatus::Authenticated {
      Loadable::from_result(self.access().await)
    } else {
      Loadable::Loading
    };
    route::resolve(status, &access, page)
  }

  /// Resolve `page` without any network call.
  pub async fn route_cached(&self, page: &Page) -> Route {
    let status = self.status().await;
    let access = match self.access_cached().await {
      Some(a) => Loadable::Ready(a),
      None => Loadable::Loading,
    };
    route::resolve(status, &access, page)
  }

  // ── Approvals ─────────────────────────────────────────────────────────────

  pub async fn approvals(&self) -> Result<Vec<ApprovalRecord>> {
    self
      .query(QueryKey::Approvals, |b| async move { b.list_approvals().await })
      .await
  }

  /// Approvals split into `(pending, processed)`.
  pub async fn approval_queue(&self) -> Result<(Vec<ApprovalRecord>, Vec<ApprovalRecord>)> {
    Ok(split_pending(self.approvals().await?))
  }

  // ── Roster reads ──────────────────────────────────────────────────────────

  pub async fn approved_students(&self) -> Result<Vec<Student>> {
    self
      .query(QueryKey::ApprovedStudents, |b| async move {
        b.get_all_approved_students().await
      })
      .await
  }

  pub async fn students(&self) -> Result<Vec<Student>> {
    self
      .query(QueryKey::Students, |b| async move { b.list_students().await })
      .await
  }

  pub async fn teachers(&self) -> Result<Vec<Teacher>> {
    self
      .query(QueryKey::Teachers, |b| async move { b.list_teachers().await })
      .await
  }

  pub async fn student(&self, id: Uuid) -> Result<Option<Student>> {
    self
      .query(QueryKey::Student(id), move |b| async move {
        b.get_student_by_id(id).await
      })
      .await
  }

  pub async fn teacher(&self, id: Uuid) -> Result<Option<Teacher>> {
    self
      .query(QueryKey::Teacher(id), move |b| async move {
        b.get_teacher_by_id(id).await
      })
      .await
  }

  pub async fn is_student_approved(&self, id: Uuid) -> Result<bool> {
    self
      .query(QueryKey::StudentApproved(id), move |b| async move {
        b.is_student_approved(id).await
      })
      .await
  }

  // ── Exam reads ────────────────────────────────────────────────────────────

  pub async fn exams(&self) -> Result<Vec<Exam>> {
    self
      .query(QueryKey::Exams, |b| async move { b.list_exams().await })
      .await
  }

  pub async fn exam(&self, id: Uuid) -> Result<Option<Exam>> {
    self
      .query(QueryKey::Exam(id), move |b| async move { b.get_exam(id).await })
      .await
  }

  // ── Mutations ─────────────────────────────────────────────────────────────

  pub async fn save_profile(&self, profile: &Profile) -> Result<()> {
    let profile = profile.clone();
    self
      .mutate(Mutation::SaveProfile, |b| async move {
        profile.validate()?;
        b.save_caller_user_profile(profile).await
      })
      .await
  }

  pub async fn request_approval(&self) -> Result<()> {
    self
      .mutate(Mutation::RequestApproval, |b| async move {
        b.request_approval().await
      })
      .await
  }

  pub async fn set_approval(&self, subject: Identity, status: ApprovalStatus) -> Result<()> {
    self
      .mutate(Mutation::SetApproval(subject.clone()), |b| async move {
        b.set_approval(subject, status).await
      })
      .await
  }

  pub async fn assign_role(&self, identity: Identity, role: Role) -> Result<()> {
    self
      .mutate(Mutation::AssignRole(identity.clone()), |b| async move {
        b.assign_caller_user_role(identity, role).await
      })
      .await
  }

  /// Submit the student form. The form is only borrowed, so it stays
  /// available for a retry after any failure.
  pub async fn register_student(&self, form: &StudentRegistration) -> Result<Student> {
    let form = form.clone();
    self
      .mutate(Mutation::RegisterStudent, |b| async move {
        form.validate()?;
        b.register_student(form.normalized()).await
      })
      .await
  }

  pub async fn register_teacher(&self, form: &TeacherRegistration) -> Result<Teacher> {
    let form = form.clone();
    self
      .mutate(Mutation::RegisterTeacher, |b| async move {
        form.validate()?;
        b.register_teacher(form.normalized()).await
      })
      .await
  }

  pub async fn approve_student(&self, id: Uuid, status: ApprovalStatus) -> Result<()> {
    self
      .mutate(Mutation::ApproveStudent(id), |b| async move {
        b.approve_student(id, status).await
      })
      .await
  }

  pub async fn approve_teacher(&self, id: Uuid, status: ApprovalStatus) -> Result<()> {
    self
      .mutate(Mutation::ApproveTeacher(id), |b| async move {
        b.approve_teacher(id, status).await
      })
      .await
  }

  pub async fn add_exam(&self, subject: &str, exam_date: NaiveDate) -> Result<Exam> {
    let input = NewExam {
      subject: subject.trim().to_owned(),
      exam_date,
    };
    self
      .mutate(Mutation::AddExam, |b| async move {
        input.validate()?;
        b.add_exam(input.subject, input.exam_date).await
      })
      .await
  }

  pub async fn record_mark(
    &self,
    exam_id: Uuid,
    student_id: Uuid,
    marks: u32,
  ) -> Result<ExamMark> {
    self
      .mutate(Mutation::RecordMark { exam_id, student_id }, |b| async move {
        ExamMark::new(student_id, marks)?;
        b.record_exam_mark(exam_id, student_id, marks).await
      })
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use campus_core::{
    ErrorKind, backend::LocalBackend, identity::UserType, registry::Registry,
  };
  use campus_store_sqlite::SqliteStore;
  use std::sync::Arc;

  use tokio::sync::Notify;

  use crate::session::LocalAuthenticator;

  fn local(
    registry: &Arc<Registry<SqliteStore>>,
    who: &str,
  ) -> LocalAuthenticator<SqliteStore> {
    LocalAuthenticator {
      registry: registry.clone(),
      identity: Identity::new(who),
    }
  }

  #[tokio::test]
  async fn fetch_spanning_a_sign_in_is_not_cached() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let registry = Arc::new(Registry::new(store));
    registry
      .save_caller_user_profile(
        &Identity::new("ann"),
        Profile::new("Ann", UserType::Student),
      )
      .await
      .unwrap();
    let portal: Portal<LocalBackend<SqliteStore>> = Portal::new();
    portal.init().await;
    portal.login(&local(&registry, "ann")).await.unwrap();

    let gates = (Notify::new(), Notify::new());
    let (started, release) = (&gates.0, &gates.1);
    let stale = portal.query(QueryKey::Profile, |b| async move {
      started.notify_one();
      release.notified().await;
      b.get_caller_user_profile().await
    });
    let switch = async {
      started.notified().await;
      portal.logout().await;
      portal.login(&local(&registry, "ben")).await.unwrap();
      release.notify_one();
    };
    let (stale, ()) = tokio::join!(stale, switch);
    assert_eq!(stale.unwrap().map(|p| p.name), Some("Ann".to_owned()));

    assert_eq!(portal.identity().await, Some(Identity::new("ben")));
    assert_eq!(portal.profile().await.unwrap(), None);
  }

  #[tokio::test]
  async fn logout_leaves_nothing_cached() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let registry = Arc::new(Registry::new(store));
    let portal: Portal<LocalBackend<SqliteStore>> = Portal::new();
    portal.init().await;
    portal.login(&local(&registry, "cal")).await.unwrap();
    portal.role().await.unwrap();
    assert!(portal.cache.get::<Role>(&QueryKey::Role).await.is_some());

    portal.logout().await;
    assert!(portal.cache.get::<Role>(&QueryKey::Role).await.is_none());
  }

  #[tokio::test]
  async fn duplicate_submission_fails_fast() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let auth = LocalAuthenticator {
      registry: Arc::new(Registry::new(store)),
      identity: Identity::new("ruth"),
    };
    let portal: Portal<LocalBackend<SqliteStore>> = Portal::new();
    portal.init().await;
    portal.login(&auth).await.unwrap();

    let guard = InFlight::acquire(&portal.in_flight, &Mutation::RequestApproval).unwrap();
    assert!(portal.is_pending(&Mutation::RequestApproval));

    let err = portal.request_approval().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Busy);

    drop(guard);
    assert!(!portal.is_pending(&Mutation::RequestApproval));
    portal.request_approval().await.unwrap();
  }
}
