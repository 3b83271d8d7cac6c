//! User-facing notices raised by the portal.
//!
//! Failures never panic or vanish: each one is recorded here with its
//! [`ErrorKind`] so a front end can show it and offer the right recovery.

use std::sync::{Mutex, PoisonError};

use campus_core::{Error, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
  Info,
  Success,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub level:   NoticeLevel,
  pub message: String,
  /// Set for error notices.
  pub kind:    Option<ErrorKind>,
}

impl Notice {
  pub fn info(message: impl Into<String>) -> Self {
    Self {
      level:   NoticeLevel::Info,
      message: message.into(),
      kind:    None,
    }
  }

  pub fn success(message: impl Into<String>) -> Self {
    Self {
      level:   NoticeLevel::Success,
      message: message.into(),
      kind:    None,
    }
  }

  pub fn error(context: &str, err: &Error) -> Self {
    Self {
      level:   NoticeLevel::Error,
      message: format!("{context} failed: {err}"),
      kind:    Some(err.kind()),
    }
  }
}

/// An append-only queue of notices, drained by whoever renders them.
#[derive(Default)]
pub struct Notices {
  queue: Mutex<Vec<Notice>>,
}

impl Notices {
  pub fn push(&self, notice: Notice) {
    self
      .queue
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(notice);
  }

  /// Remove and return every pending notice, oldest first.
  pub fn drain(&self) -> Vec<Notice> {
    std::mem::take(&mut *self.queue.lock().unwrap_or_else(PoisonError::into_inner))
  }
}
