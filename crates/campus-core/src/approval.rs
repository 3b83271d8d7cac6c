//! Approval records and the transition rules that govern them.
//!
//! An [`ApprovalRecord`] is the only mutable approval state in the system.
//! The `status` carried by students and teachers is projected from the record
//! of their owner when they are read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Identity, Result};

/// Where a subject stands in the approval workflow.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalStatus {
  #[default]
  Pending,
  Approved,
  Rejected,
}

/// The effect of applying a requested status to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  /// The record already has the requested status; nothing to write.
  Unchanged,
  /// The record moves to the requested status.
  Apply,
}

impl ApprovalStatus {
  /// `approved` and `rejected` admit no further change.
  pub fn is_terminal(self) -> bool { !matches!(self, Self::Pending) }

  pub fn is_approved(self) -> bool { matches!(self, Self::Approved) }

  /// Decide whether a record in `self` may move to `to`.
  ///
  /// Only `pending` records can be decided. Re-submitting the current status
  /// is accepted as a no-op.
  pub fn transition(self, to: Self) -> Result<Transition> {
    match (self, to) {
      (from, to) if from == to => Ok(Transition::Unchanged),
      (from, to) if from.is_terminal() || !to.is_terminal() => {
        Err(Error::InvalidTransition { from, to })
      }
      _ => Ok(Transition::Apply),
    }
  }
}

/// The approval gate on one caller's access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
  pub subject:      Identity,
  pub status:       ApprovalStatus,
  pub requested_at: DateTime<Utc>,
  pub decided_at:   Option<DateTime<Utc>>,
  pub decided_by:   Option<Identity>,
}

impl ApprovalRecord {
  /// A fresh, undecided request.
  pub fn pending(subject: Identity, at: DateTime<Utc>) -> Self {
    Self {
      subject,
      status: ApprovalStatus::Pending,
      requested_at: at,
      decided_at: None,
      decided_by: None,
    }
  }

  /// This record with `status` applied by `by` at `at`.
  pub fn decided(
    mut self,
    status: ApprovalStatus,
    by: Identity,
    at: DateTime<Utc>,
  ) -> Self {
    self.status = status;
    self.decided_at = Some(at);
    self.decided_by = Some(by);
    self
  }
}

/// Split records into `(pending, processed)`, each oldest request first.
pub fn split_pending(
  mut records: Vec<ApprovalRecord>,
) -> (Vec<ApprovalRecord>, Vec<ApprovalRecord>) {
  records.sort_by(|a, b| a.requested_at.cmp(&b.requested_at));
  records
    .into_iter()
    .partition(|r| r.status == ApprovalStatus::Pending)
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::ErrorKind;

  #[test]
  fn pending_can_be_decided_either_way() {
    use ApprovalStatus::*;
    assert_eq!(Pending.transition(Approved).unwrap(), Transition::Apply);
    assert_eq!(Pending.transition(Rejected).unwrap(), Transition::Apply);
  }

  #[test]
  fn same_status_is_a_no_op() {
    use ApprovalStatus::*;
    for s in [Pending, Approved, Rejected] {
      assert_eq!(s.transition(s).unwrap(), Transition::Unchanged);
    }
  }

  #[test]
  fn decided_records_do_not_reopen_or_flip() {
    use ApprovalStatus::*;
    for (from, to) in [
      (Approved, Rejected),
      (Rejected, Approved),
      (Approved, Pending),
      (Rejected, Pending),
    ] {
      let err = from.transition(to).unwrap_err();
      assert_eq!(err.kind(), ErrorKind::Conflict, "{from} -> {to}");
    }
  }

  #[test]
  fn only_decisions_are_terminal() {
    assert!(!ApprovalStatus::Pending.is_terminal());
    assert!(ApprovalStatus::Approved.is_terminal());
    assert!(ApprovalStatus::Rejected.is_terminal());
  }

  #[test]
  fn split_keeps_request_order() {
    let at = |s| Utc.timestamp_opt(s, 0).unwrap();
    let admin = Identity::new("admin");
    let records = vec![
      ApprovalRecord::pending(Identity::new("c"), at(30)),
      ApprovalRecord::pending(Identity::new("a"), at(10))
        .decided(ApprovalStatus::Approved, admin, at(40)),
      ApprovalRecord::pending(Identity::new("b"), at(20)),
    ];

    let (pending, processed) = split_pending(records);
    let names: Vec<_> = pending.iter().map(|r| r.subject.as_str()).collect();
    assert_eq!(names, ["b", "c"]);
    assert_eq!(processed.len(), 1);
    assert_eq!(processed[0].decided_by, Some(Identity::new("admin")));
  }
}
