//! `campus`: command-line client for the Campus school portal.
//!
//! # Usage
//!
//! ```text
//! campus --url http://localhost:8080 --user ada --password secret whoami
//! campus --config ~/.config/campus/config.toml route /student
//! campus students register --name "Ada Obi" --guardian "Grace Obi" \
//!   --contact "0161 496 0000" --class 7B
//! ```

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use campus_core::{
  Error, ErrorKind, Identity,
  approval::{ApprovalRecord, ApprovalStatus},
  exam::Exam,
  identity::{Profile, Role, UserType},
  roster::{Student, StudentRegistration, Teacher, TeacherRegistration},
};
use campus_portal::{
  Portal,
  client::{ApiClient, ApiConfig},
  notice::{Notice, NoticeLevel},
  route::Page,
  session::PasswordAuthenticator,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "campus", about = "Command-line client for the Campus school portal")]
struct Args {
  /// Path to a TOML config file (url, username, password).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the campus server (default: http://localhost:8080).
  #[arg(long, env = "CAMPUS_URL")]
  url: Option<String>,

  /// API username.
  #[arg(long, env = "CAMPUS_USER")]
  user: Option<String>,

  /// API password (plaintext).
  #[arg(long, env = "CAMPUS_PASSWORD")]
  password: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show who the server thinks you are.
  Whoami,
  /// Show which screen a page resolves to for you.
  Route {
    #[arg(default_value = "/")]
    path: String,
  },
  #[command(subcommand)]
  Profile(ProfileCommand),
  /// Ask an admin for access.
  RequestApproval,
  #[command(subcommand)]
  Approvals(ApprovalsCommand),
  #[command(subcommand)]
  Roles(RolesCommand),
  #[command(subcommand)]
  Students(StudentsCommand),
  #[command(subcommand)]
  Teachers(TeachersCommand),
  #[command(subcommand)]
  Exams(ExamsCommand),
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
  Show,
  Set {
    #[arg(long)]
    name:      String,
    /// admin, teacher, student or guest.
    #[arg(long = "type")]
    user_type: UserType,
  },
}

#[derive(Subcommand, Debug)]
enum ApprovalsCommand {
  /// Pending requests first, then decided ones.
  List,
  Set {
    identity: Identity,
    status:   ApprovalStatus,
  },
}

#[derive(Subcommand, Debug)]
enum RolesCommand {
  Assign { identity: Identity, role: Role },
}

#[derive(Subcommand, Debug)]
enum StudentsCommand {
  Register {
    #[arg(long)]
    name:     String,
    #[arg(long)]
    guardian: String,
    #[arg(long)]
    contact:  String,
    #[arg(long)]
    class:    String,
  },
  /// Every student (admin only).
  List,
  /// Approved students only.
  Approved,
  Show { id: Uuid },
  Approve {
    id:     Uuid,
    #[arg(default_value = "approved")]
    status: ApprovalStatus,
  },
}

#[derive(Subcommand, Debug)]
enum TeachersCommand {
  Register {
    #[arg(long)]
    name:     String,
    #[arg(long)]
    contact:  String,
    /// Repeat or comma-separate.
    #[arg(long = "subject", value_delimiter = ',')]
    subjects: Vec<String>,
    #[arg(long = "class", value_delimiter = ',')]
    classes:  Vec<String>,
  },
  List,
  Show { id: Uuid },
  Approve {
    id:     Uuid,
    #[arg(default_value = "approved")]
    status: ApprovalStatus,
  },
}

#[derive(Subcommand, Debug)]
enum ExamsCommand {
  List,
  Add {
    subject: String,
    /// YYYY-MM-DD
    date:    NaiveDate,
  },
  Show { id: Uuid },
  Mark {
    exam_id:    Uuid,
    student_id: Uuid,
    marks:      u32,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();
  match run(args).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      report(&e);
      ExitCode::FAILURE
    }
  }
}

/// The last line of defence: a short message plus what to try next.
fn report(err: &anyhow::Error) {
  match err.downcast_ref::<Error>() {
    Some(Error::Validation(fields)) => {
      eprintln!("error: some fields need attention");
      for e in &fields.0 {
        eprintln!("  {}: {}", e.field, e.message);
      }
    }
    Some(e) => {
      eprintln!("error: {e}");
      eprintln!("hint: {}", hint(e.kind()));
    }
    None => {
      eprintln!("error: something went wrong");
      eprintln!("  {err:#}");
    }
  }
}

fn hint(kind: ErrorKind) -> &'static str {
  match kind {
    ErrorKind::Unauthenticated => "check --user and --password (or CAMPUS_USER / CAMPUS_PASSWORD)",
    ErrorKind::Forbidden => "your account lacks access; ask an admin or run `campus route`",
    ErrorKind::NotFound => "check the id; list commands show what exists",
    ErrorKind::Validation => "fix the input and try again",
    ErrorKind::Conflict => "the record changed or was already decided; reload and retry",
    ErrorKind::Unavailable => "the server could not be reached; check --url and try again",
    ErrorKind::Busy => "wait for the earlier request to finish",
    ErrorKind::Internal => "this is a bug or a server fault; try again later",
  }
}

async fn run(args: Args) -> Result<()> {
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // Flags override the config file, which overrides defaults.
  let config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| "http://localhost:8080".to_string()),
    username: args
      .user
      .or_else(|| (!file_cfg.username.is_empty()).then(|| file_cfg.username.clone()))
      .unwrap_or_default(),
    password: args
      .password
      .or_else(|| (!file_cfg.password.is_empty()).then(|| file_cfg.password.clone()))
      .unwrap_or_default(),
  };

  let portal: Portal<ApiClient> = Portal::new();
  portal.init().await;

  // Only `route` is meaningful without credentials.
  if config.username.is_empty() {
    if let Command::Route { path } = &args.command {
      println!("{}", portal.route(&Page::parse(path)).await);
      return Ok(());
    }
    return Err(Error::Unauthenticated.into());
  }

  let login = portal.login(&PasswordAuthenticator { config }).await;
  print_notices(portal.take_notices());
  login?;

  let result = dispatch(&portal, args.command).await;
  print_notices(portal.take_notices());
  result
}

async fn dispatch(portal: &Portal<ApiClient>, command: Command) -> Result<()> {
  match command {
    Command::Whoami => {
      let identity = portal.identity().await.ok_or(Error::Unauthenticated)?;
      let role = portal.role().await?;
      println!("{identity} ({role})");
    }
    Command::Route { path } => {
      println!("{}", portal.route(&Page::parse(&path)).await);
    }

    Command::Profile(ProfileCommand::Show) => match portal.profile().await? {
      Some(p) => print_profile(&p),
      None => println!("no profile yet; run `campus profile set`"),
    },
    Command::Profile(ProfileCommand::Set { name, user_type }) => {
      let mut profile = Profile::new(name, user_type);
      if let Some(existing) = portal.profile().await?
        && existing.user_type == user_type
      {
        profile.entity_id = existing.entity_id;
      }
      portal.save_profile(&profile).await?;
    }

    Command::RequestApproval => portal.request_approval().await?,

    Command::Approvals(ApprovalsCommand::List) => {
      let (pending, processed) = portal.approval_queue().await?;
      println!("pending ({}):", pending.len());
      pending.iter().for_each(print_approval);
      println!("processed ({}):", processed.len());
      processed.iter().for_each(print_approval);
    }
    Command::Approvals(ApprovalsCommand::Set { identity, status }) => {
      portal.set_approval(identity, status).await?;
    }

    Command::Roles(RolesCommand::Assign { identity, role }) => {
      portal.assign_role(identity, role).await?;
    }

    Command::Students(cmd) => students(portal, cmd).await?,
    Command::Teachers(cmd) => teachers(portal, cmd).await?,
    Command::Exams(cmd) => exams(portal, cmd).await?,
  }
  Ok(())
}

async fn students(portal: &Portal<ApiClient>, cmd: StudentsCommand) -> Result<()> {
  match cmd {
    StudentsCommand::Register { name, guardian, contact, class } => {
      let student = portal
        .register_student(&StudentRegistration {
          full_name:        name,
          guardian_name:    guardian,
          contact_number:   contact,
          class_assignment: class,
        })
        .await?;
      print_student(&student);
    }
    StudentsCommand::List => portal.students().await?.iter().for_each(print_student),
    StudentsCommand::Approved => {
      portal.approved_students().await?.iter().for_each(print_student)
    }
    StudentsCommand::Show { id } => {
      let student = portal
        .student(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("student {id}")))?;
      print_student(&student);
    }
    StudentsCommand::Approve { id, status } => portal.approve_student(id, status).await?,
  }
  Ok(())
}

async fn teachers(portal: &Portal<ApiClient>, cmd: TeachersCommand) -> Result<()> {
  match cmd {
    TeachersCommand::Register { name, contact, subjects, classes } => {
      let teacher = portal
        .register_teacher(&TeacherRegistration {
          full_name: name,
          contact_number: contact,
          subjects,
          classes,
        })
        .await?;
      print_teacher(&teacher);
    }
    TeachersCommand::List => portal.teachers().await?.iter().for_each(print_teacher),
    TeachersCommand::Show { id } => {
      let teacher = portal
        .teacher(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("teacher {id}")))?;
      print_teacher(&teacher);
    }
    TeachersCommand::Approve { id, status } => portal.approve_teacher(id, status).await?,
  }
  Ok(())
}

async fn exams(portal: &Portal<ApiClient>, cmd: ExamsCommand) -> Result<()> {
  match cmd {
    ExamsCommand::List => {
      for exam in portal.exams().await? {
        println!(
          "{}  {}  {}  ({} marks)",
          exam.exam_id,
          exam.exam_date,
          exam.subject,
          exam.marks.len()
        );
      }
    }
    ExamsCommand::Add { subject, date } => {
      let exam = portal.add_exam(&subject, date).await?;
      print_exam(&exam);
    }
    ExamsCommand::Show { id } => {
      let exam = portal
        .exam(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("exam {id}")))?;
      print_exam(&exam);
    }
    ExamsCommand::Mark { exam_id, student_id, marks } => {
      let mark = portal.record_mark(exam_id, student_id, marks).await?;
      println!("{}  {}  {}", mark.student_id, mark.marks, mark.grade);
    }
  }
  Ok(())
}

// ─── Output ───────────────────────────────────────────────────────────────────

fn print_notices(notices: Vec<Notice>) {
  for notice in notices {
    let tag = match notice.level {
      NoticeLevel::Info => "info",
      NoticeLevel::Success => "ok",
      NoticeLevel::Error => "failed",
    };
    eprintln!("[{tag}] {}", notice.message);
  }
}

fn print_profile(p: &Profile) {
  match p.entity_id {
    Some(id) => println!("{} ({}, record {id})", p.name, p.user_type),
    None => println!("{} ({})", p.name, p.user_type),
  }
}

fn print_approval(r: &ApprovalRecord) {
  match (&r.decided_by, r.decided_at) {
    (Some(by), Some(at)) => println!(
      "  {}  {}  requested {}  decided by {by} at {at}",
      r.subject, r.status, r.requested_at
    ),
    _ => println!("  {}  {}  requested {}", r.subject, r.status, r.requested_at),
  }
}

fn print_student(s: &Student) {
  println!(
    "{}  {}  class {}  guardian {}  {}  [{}]",
    s.student_id, s.full_name, s.class_assignment, s.guardian_name, s.contact_number, s.status
  );
}

fn print_teacher(t: &Teacher) {
  println!(
    "{}  {}  {}  subjects {}  classes {}  [{}]",
    t.teacher_id,
    t.full_name,
    t.contact_number,
    t.subjects.join(", "),
    t.classes.join(", "),
    t.status
  );
}

fn print_exam(e: &Exam) {
  println!("{}  {}  {}", e.exam_id, e.exam_date, e.subject);
  for mark in &e.marks {
    println!("  {}  {:>3}  {}", mark.student_id, mark.marks, mark.grade);
  }
}
