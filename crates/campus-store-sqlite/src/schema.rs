//! SQL schema for the Campus SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS profiles (
    identity   TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    user_type  TEXT NOT NULL,    -- 'admin' | 'teacher' | 'student' | 'guest'
    entity_id  TEXT              -- students.student_id or teachers.teacher_id
);

-- Explicit role assignments only; callers without a row derive their role.
CREATE TABLE IF NOT EXISTS roles (
    identity  TEXT PRIMARY KEY,
    role      TEXT NOT NULL      -- 'admin' | 'user' | 'guest'
);

-- The single source of approval state. Student and teacher status is a
-- projection of the owner's row here.
CREATE TABLE IF NOT EXISTS approvals (
    subject       TEXT PRIMARY KEY,
    status        TEXT NOT NULL,  -- 'pending' | 'approved' | 'rejected'
    requested_at  TEXT NOT NULL,
    decided_at    TEXT,
    decided_by    TEXT
);

CREATE TABLE IF NOT EXISTS students (
    student_id        TEXT PRIMARY KEY,
    owner             TEXT NOT NULL UNIQUE,
    full_name         TEXT NOT NULL,
    guardian_name     TEXT NOT NULL,
    contact_number    TEXT NOT NULL,
    class_assignment  TEXT NOT NULL,
    registered_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS teachers (
    teacher_id      TEXT PRIMARY KEY,
    owner           TEXT NOT NULL UNIQUE,
    full_name       TEXT NOT NULL,
    contact_number  TEXT NOT NULL,
    subjects        TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    classes         TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    registered_at   TEXT NOT NULL
);

-- One row per owner that holds a student or teacher record. Both
-- registrations claim the owner here first, so an owner holds at most one.
CREATE TABLE IF NOT EXISTS registrations (
    owner  TEXT PRIMARY KEY,
    kind   TEXT NOT NULL         -- 'student' | 'teacher'
);

INSERT OR IGNORE INTO registrations (owner, kind)
    SELECT owner, 'student' FROM students;
INSERT OR IGNORE INTO registrations (owner, kind)
    SELECT owner, 'teacher' FROM teachers;

CREATE TABLE IF NOT EXISTS exams (
    exam_id     TEXT PRIMARY KEY,
    subject     TEXT NOT NULL,
    exam_date   TEXT NOT NULL,   -- YYYY-MM-DD
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS exam_marks (
    exam_id     TEXT NOT NULL REFERENCES exams(exam_id),
    student_id  TEXT NOT NULL REFERENCES students(student_id),
    marks       INTEGER NOT NULL CHECK (marks BETWEEN 0 AND 100),
    grade       TEXT NOT NULL,
    PRIMARY KEY (exam_id, student_id)
);

CREATE INDEX IF NOT EXISTS approvals_status_idx ON approvals(status);
CREATE INDEX IF NOT EXISTS exams_date_idx       ON exams(exam_date);

PRAGMA user_version = 2;
";
