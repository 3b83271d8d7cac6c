//! Async HTTP client wrapping the Campus JSON API.
//!
//! [`ApiClient`] implements [`SchoolBackend`], translating HTTP failures back
//! into [`campus_core::Error`] values with the kind the server reported.

use std::time::Duration;

use chrono::NaiveDate;
use campus_core::{
  Error, ErrorKind, Identity, Result,
  approval::{ApprovalRecord, ApprovalStatus},
  backend::SchoolBackend,
  exam::{Exam, ExamMark},
  identity::{Profile, Role},
  roster::{Student, StudentRegistration, Teacher, TeacherRegistration},
  validate::ValidationErrors,
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use uuid::Uuid;

/// Connection settings for the Campus API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

/// Async HTTP client for the Campus JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:   Client,
  config:   ApiConfig,
  identity: Identity,
}

/// Error body returned by the server; every field is optional so that
/// proxies answering with their own bodies still decode.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireError {
  error:  String,
  kind:   Option<ErrorKind>,
  fields: ValidationErrors,
}

#[derive(Deserialize)]
struct SessionBody {
  identity: Identity,
}

/// The error kind implied by an HTTP status alone.
pub fn kind_for_status(status: StatusCode) -> ErrorKind {
  match status {
    StatusCode::UNAUTHORIZED => ErrorKind::Unauthenticated,
    StatusCode::FORBIDDEN => ErrorKind::Forbidden,
    StatusCode::NOT_FOUND => ErrorKind::NotFound,
    StatusCode::CONFLICT => ErrorKind::Conflict,
    StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorKind::Validation,
    StatusCode::TOO_MANY_REQUESTS => ErrorKind::Busy,
    StatusCode::BAD_GATEWAY
    | StatusCode::SERVICE_UNAVAILABLE
    | StatusCode::GATEWAY_TIMEOUT => ErrorKind::Unavailable,
    _ => ErrorKind::Internal,
  }
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;
    let identity = Identity::new(config.username.as_str());
    Ok(Self {
      client,
      config,
      identity,
    })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  /// `prefix` followed by one percent-encoded path segment.
  fn segment_url(&self, prefix: &str, segment: &str) -> Result<Url> {
    let mut url = Url::parse(&self.url(prefix))
      .map_err(|e| Error::Internal(format!("invalid base URL: {e}")))?;
    let url_display = url.to_string();
    url
      .path_segments_mut()
      .map_err(|()| Error::Internal(format!("base URL cannot hold a path: {url_display}")))?
      .push(segment);
    Ok(url)
  }

  fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    self.authorize(self.client.request(method, self.url(path)))
  }

  /// Send `req`; non-success statuses become errors.
  async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
    let resp = req
      .send()
      .await
      .map_err(|e| Error::Unavailable(format!("{what}: {e}")))?;

    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }

    // Framework rejections (malformed JSON, missing fields) arrive as plain
    // text; keep it as the message rather than dropping it.
    let text = resp.text().await.unwrap_or_default();
    let body: WireError = serde_json::from_str(&text).unwrap_or_default();
    let kind = body.kind.unwrap_or_else(|| kind_for_status(status));
    let detail = text.trim();
    let message = if !body.error.is_empty() {
      body.error
    } else if detail.is_empty() || body.kind.is_some() {
      format!("{what} → {status}")
    } else {
      format!("{what} → {status}: {detail}")
    };
    Err(Error::from_parts(kind, message, body.fields))
  }

  async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
    resp
      .json()
      .await
      .map_err(|e| Error::Internal(format!("decoding {what}: {e}")))
  }

  async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
    let what = format!("GET {path}");
    let resp = self.send(self.request(Method::GET, path), &what).await?;
    Self::decode(resp, &what).await
  }

  /// Like [`Self::get`], but a 404 is an empty result rather than an error.
  async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
    match self.get(path).await {
      Ok(v) => Ok(Some(v)),
      Err(Error::NotFound(_)) => Ok(None),
      Err(e) => Err(e),
    }
  }

  async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    body: &B,
  ) -> Result<T> {
    let what = format!("{method} {path}");
    let resp = self
      .send(self.request(method, path).json(body), &what)
      .await?;
    Self::decode(resp, &what).await
  }

  /// Send a request whose success response has no body.
  async fn send_unit(
    &self,
    method: Method,
    path: &str,
    body: Option<serde_json::Value>,
  ) -> Result<()> {
    let what = format!("{method} {path}");
    let mut req = self.request(method, path);
    if let Some(body) = body {
      req = req.json(&body);
    }
    self.send(req, &what).await?;
    Ok(())
  }

  /// Act as `identity` from now on, e.g. the name the server resolved the
  /// configured username to.
  pub fn with_identity(mut self, identity: Identity) -> Self {
    self.identity = identity;
    self
  }

  /// `GET /api/session`: the identity the server authenticated us as.
  pub async fn whoami(&self) -> Result<Identity> {
    let body: SessionBody = self.get("/session").await?;
    Ok(body.identity)
  }
}

impl SchoolBackend for ApiClient {
  fn identity(&self) -> &Identity { &self.identity }

  // ── Caller ────────────────────────────────────────────────────────────────

  async fn get_caller_user_profile(&self) -> Result<Option<Profile>> {
    self.get("/profile").await
  }

  async fn save_caller_user_profile(&self, profile: Profile) -> Result<()> {
    self
      .send_unit(Method::PUT, "/profile", Some(serde_json::to_value(profile)?))
      .await
  }

  async fn get_caller_user_role(&self) -> Result<Role> { self.get("/role").await }

  async fn is_caller_admin(&self) -> Result<bool> { self.get("/caller/admin").await }

  async fn is_caller_approved(&self) -> Result<bool> {
    self.get("/caller/approved").await
  }

  async fn request_approval(&self) -> Result<()> {
    self
      .send_unit(Method::POST, "/approvals/request", None)
      .await
  }

  // ── Administration ────────────────────────────────────────────────────────

  async fn list_approvals(&self) -> Result<Vec<ApprovalRecord>> {
    self.get("/approvals").await
  }

  async fn set_approval(&self, subject: Identity, status: ApprovalStatus) -> Result<()> {
    let url = self.segment_url("/approvals", subject.as_str())?;
    let what = format!("PUT {}", url.path());
    let req = self
      .authorize(self.client.put(url))
      .json(&json!({ "status": status }));
    self.send(req, &what).await?;
    Ok(())
  }

  async fn assign_caller_user_role(&self, identity: Identity, role: Role) -> Result<()> {
    self
      .send_unit(
        Method::POST,
        "/roles",
        Some(json!({ "identity": identity, "role": role })),
      )
      .await
  }

  // ── Roster ────────────────────────────────────────────────────────────────

  async fn register_student(&self, input: StudentRegistration) -> Result<Student> {
    self.send_json(Method::POST, "/students", &input).await
  }

  async fn register_teacher(&self, input: TeacherRegistration) -> Result<Teacher> {
    self.send_json(Method::POST, "/teachers", &input).await
  }

  async fn get_all_approved_students(&self) -> Result<Vec<Student>> {
    self.get("/students?approved=true").await
  }

  async fn list_students(&self) -> Result<Vec<Student>> { self.get("/students").await }

  async fn list_teachers(&self) -> Result<Vec<Teacher>> { self.get("/teachers").await }

  async fn get_student_by_id(&self, id: Uuid) -> Result<Option<Student>> {
    self.get_optional(&format!("/students/{id}")).await
  }

  async fn get_teacher_by_id(&self, id: Uuid) -> Result<Option<Teacher>> {
    self.get_optional(&format!("/teachers/{id}")).await
  }

  async fn is_student_approved(&self, id: Uuid) -> Result<bool> {
    self.get(&format!("/students/{id}/approved")).await
  }

  async fn approve_student(&self, id: Uuid, status: ApprovalStatus) -> Result<()> {
    self
      .send_unit(
        Method::PUT,
        &format!("/students/{id}/approval"),
        Some(json!({ "status": status })),
      )
      .await
  }

  async fn approve_teacher(&self, id: Uuid, status: ApprovalStatus) -> Result<()> {
    self
      .send_unit(
        Method::PUT,
        &format!("/teachers/{id}/approval"),
        Some(json!({ "status": status })),
      )
      .await
  }

  // ── Exams ─────────────────────────────────────────────────────────────────

  async fn add_exam(&self, subject: String, exam_date: NaiveDate) -> Result<Exam> {
    self
      .send_json(
        Method::POST,
        "/exams",
        &json!({ "subject": subject, "exam_date": exam_date }),
      )
      .await
  }

  async fn get_exam(&self, id: Uuid) -> Result<Option<Exam>> {
    self.get_optional(&format!("/exams/{id}")).await
  }

  async fn list_exams(&self) -> Result<Vec<Exam>> { self.get("/exams").await }

  async fn record_exam_mark(
    &self,
    exam_id: Uuid,
    student_id: Uuid,
    marks: u32,
  ) -> Result<ExamMark> {
    self
      .send_json(
        Method::POST,
        &format!("/exams/{exam_id}/marks"),
        &json!({ "student_id": student_id, "marks": marks }),
      )
      .await
  }
}
