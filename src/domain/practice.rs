use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Binary mastery state recorded after each answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mastery {
  Mastered,
  Unmastered,
}

impl Mastery {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "mastered" => Some(Self::Mastered),
      "unmastered" => Some(Self::Unmastered),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Mastered => "mastered",
      Self::Unmastered => "unmastered",
    }
  }
}

/// Per-question practice state, mirrored from the external practice table.
///
/// At most one record is authoritative per `question_id`; duplicates from
/// prior double-writes lose to the greatest `last_practice` (see
/// `practice::records::fetch_all`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeRecord {
  pub question_id: String,
  /// Opaque handle of the row in the external practice table.
  pub record_id: String,
  pub last_practice: DateTime<Utc>,
  pub mastery: Mastery,
  pub practice_count: i64,
  pub next_due: DateTime<Utc>,
}
