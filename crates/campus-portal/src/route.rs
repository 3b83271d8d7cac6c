//! The route shell: which screen a request for a page actually shows.

use std::fmt;

use campus_core::{
  identity::UserType,
  roster::EntityKind,
};

use crate::{
  access::{Access, Loadable, ProfileState},
  session::SessionStatus,
};

/// A requested location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
  Home,
  Login,
  ProfileSetup,
  RegisterStudent,
  RegisterTeacher,
  Admin,
  AdminApprovals,
  Teacher,
  Student,
  Unknown(String),
}

impl Page {
  pub fn parse(path: &str) -> Self {
    let trimmed = path.trim_end_matches('/');
    match trimmed {
      "" => Self::Home,
      "/login" => Self::Login,
      "/profile/setup" => Self::ProfileSetup,
      "/register/student" => Self::RegisterStudent,
      "/register/teacher" => Self::RegisterTeacher,
      "/admin" => Self::Admin,
      "/admin/approvals" => Self::AdminApprovals,
      "/teacher" => Self::Teacher,
      "/student" => Self::Student,
      _ => Self::Unknown(path.to_owned()),
    }
  }

  pub fn path(&self) -> &str {
    match self {
      Self::Home => "/",
      Self::Login => "/login",
      Self::ProfileSetup => "/profile/setup",
      Self::RegisterStudent => "/register/student",
      Self::RegisterTeacher => "/register/teacher",
      Self::Admin => "/admin",
      Self::AdminApprovals => "/admin/approvals",
      Self::Teacher => "/teacher",
      Self::Student => "/student",
      Self::Unknown(p) => p,
    }
  }
}

/// The screen to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
  Loading,
  Landing,
  Login { return_to: Option<String> },
  Authenticating,
  /// Access could not be determined; offer a retry.
  Unavailable { message: String },
  ProfileSetup,
  /// Signed in with a profile that grants nothing yet.
  AccessPending,
  Registration(EntityKind),
  AwaitingApproval(EntityKind),
  AdminDashboard,
  AdminApprovals,
  TeacherDashboard,
  StudentDashboard,
}

impl fmt::Display for Route {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Loading => f.write_str("loading"),
      Self::Landing => f.write_str("landing"),
      Self::Login { return_to: Some(to) } => write!(f, "login (then {to})"),
      Self::Login { return_to: None } => f.write_str("login"),
      Self::Authenticating => f.write_str("authenticating"),
      Self::Unavailable { message } => write!(f, "unavailable: {message}"),
      Self::ProfileSetup => f.write_str("profile setup"),
      Self::AccessPending => f.write_str("access pending"),
      Self::Registration(kind) => write!(f, "{kind} registration"),
      Self::AwaitingApproval(kind) => write!(f, "{kind} awaiting approval"),
      Self::AdminDashboard => f.write_str("admin dashboard"),
      Self::AdminApprovals => f.write_str("admin approvals"),
      Self::TeacherDashboard => f.write_str("teacher dashboard"),
      Self::StudentDashboard => f.write_str("student dashboard"),
    }
  }
}

/// Decide what `page` shows for a session in `status` with `access`.
///
/// Never yields a dashboard while anything is still loading. Pages the
/// caller may not see fall back to the caller's default screen.
pub fn resolve(status: SessionStatus, access: &Loadable<Access>, page: &Page) -> Route {
  match status {
    SessionStatus::Initializing => return Route::Loading,
    SessionStatus::Authenticating => return Route::Authenticating,
    SessionStatus::Unauthenticated => {
      return match page {
        Page::Home => Route::Landing,
        Page::Login => Route::Login { return_to: None },
        other => Route::Login {
          return_to: Some(other.path().to_owned()),
        },
      };
    }
    SessionStatus::Authenticated => {}
  }

  let access = match access {
    Loadable::Loading => return Route::Loading,
    Loadable::Failed { message, .. } => {
      return Route::Unavailable {
        message: message.clone(),
      };
    }
    Loadable::Ready(a) => a,
  };

  let profile = match &access.profile {
    ProfileState::Unset => return Route::ProfileSetup,
    ProfileState::Set(p) => p,
  };

  if access.is_admin() {
    return match page {
      Page::AdminApprovals => Route::AdminApprovals,
      _ => Route::AdminDashboard,
    };
  }

  let kind = match profile.user_type {
    UserType::Student => EntityKind::Student,
    UserType::Teacher => EntityKind::Teacher,
    UserType::Guest | UserType::Admin => return Route::AccessPending,
  };

  if profile.entity_id.is_none() {
    return Route::Registration(kind);
  }
  if !access.approved {
    return Route::AwaitingApproval(kind);
  }
  match kind {
    EntityKind::Student => Route::StudentDashboard,
    EntityKind::Teacher => Route::TeacherDashboard,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use campus_core::{
    ErrorKind,
    identity::{Profile, Role},
  };
  use uuid::Uuid;

  fn ready(role: Role, profile: Option<Profile>, approved: bool) -> Loadable<Access> {
    Loadable::Ready(Access {
      role,
      profile: profile.map_or(ProfileState::Unset, ProfileState::Set),
      approved,
    })
  }

  fn linked(user_type: UserType) -> Profile {
    let mut p = Profile::new("Someone", user_type);
    p.entity_id = Some(Uuid::new_v4());
    p
  }

  fn authed(access: &Loadable<Access>, path: &str) -> Route {
    resolve(SessionStatus::Authenticated, access, &Page::parse(path))
  }

  #[test]
  fn page_parsing() {
    assert_eq!(Page::parse("/"), Page::Home);
    assert_eq!(Page::parse(""), Page::Home);
    assert_eq!(Page::parse("/admin/approvals/"), Page::AdminApprovals);
    assert_eq!(Page::parse("/nowhere"), Page::Unknown("/nowhere".into()));
  }

  #[test]
  fn never_a_dashboard_while_loading() {
    for page in ["/", "/admin", "/student"] {
      let p = Page::parse(page);
      assert_eq!(
        resolve(SessionStatus::Initializing, &Loadable::Loading, &p),
        Route::Loading
      );
      assert_eq!(
        resolve(SessionStatus::Authenticated, &Loadable::Loading, &p),
        Route::Loading
      );
    }
  }

  #[test]
  fn deep_links_redirect_to_login() {
    let route = resolve(
      SessionStatus::Unauthenticated,
      &Loadable::Loading,
      &Page::parse("/admin/approvals"),
    );
    assert_eq!(
      route,
      Route::Login {
        return_to: Some("/admin/approvals".into())
      }
    );
    assert_eq!(
      resolve(SessionStatus::Unauthenticated, &Loadable::Loading, &Page::Home),
      Route::Landing
    );
  }

  #[test]
  fn failed_access_is_a_retry_state_not_guest() {
    let failed = Loadable::Failed {
      kind:    ErrorKind::Unavailable,
      message: "timed out".into(),
    };
    assert_eq!(
      authed(&failed, "/student"),
      Route::Unavailable {
        message: "timed out".into()
      }
    );
  }

  #[test]
  fn missing_profile_always_means_setup() {
    let access = ready(Role::Guest, None, false);
    for page in ["/", "/admin", "/student", "/register/teacher", "/x"] {
      assert_eq!(authed(&access, page), Route::ProfileSetup);
    }
    // Even an admin role does not skip setup.
    assert_eq!(authed(&ready(Role::Admin, None, false), "/admin"), Route::ProfileSetup);
  }

  #[test]
  fn guest_and_unbacked_admin_profiles_wait() {
    let guest = ready(Role::User, Some(Profile::new("G", UserType::Guest)), false);
    assert_eq!(authed(&guest, "/"), Route::AccessPending);

    let claimed = ready(Role::User, Some(Profile::new("A", UserType::Admin)), false);
    assert_eq!(authed(&claimed, "/admin"), Route::AccessPending);
  }

  #[test]
  fn admins_reach_admin_pages_only() {
    let admin = ready(Role::Admin, Some(Profile::new("H", UserType::Admin)), false);
    assert_eq!(authed(&admin, "/admin/approvals"), Route::AdminApprovals);
    assert_eq!(authed(&admin, "/student"), Route::AdminDashboard);
    assert_eq!(authed(&admin, "/"), Route::AdminDashboard);
  }

  #[test]
  fn unlinked_profile_goes_to_registration() {
    let access = ready(Role::User, Some(Profile::new("S", UserType::Student)), false);
    assert_eq!(
      authed(&access, "/student"),
      Route::Registration(EntityKind::Student)
    );
  }

  #[test]
  fn pending_then_approved_student() {
    let pending = ready(Role::User, Some(linked(UserType::Student)), false);
    assert_eq!(
      authed(&pending, "/student"),
      Route::AwaitingApproval(EntityKind::Student)
    );

    let approved = ready(Role::User, Some(linked(UserType::Student)), true);
    assert_eq!(authed(&approved, "/student"), Route::StudentDashboard);
    // Other dashboards fall back to the caller's own.
    assert_eq!(authed(&approved, "/admin"), Route::StudentDashboard);
  }

  #[test]
  fn approved_teacher_dashboard() {
    let approved = ready(Role::User, Some(linked(UserType::Teacher)), true);
    assert_eq!(authed(&approved, "/"), Route::TeacherDashboard);
  }
}
