//! External record store collaborators.
//!
//! The engine never talks HTTP directly; it goes through these traits.
//! `bitable` provides the Feishu Bitable implementation of both. Tests
//! substitute in-memory implementations.

pub mod bitable;

use chrono::{DateTime, Utc};

use crate::domain::{Mastery, QuestionRecord};
use crate::error::RepositoryError;

pub use bitable::BitableClient;

/// Read-only source of the mistake-question corpus.
pub trait QuestionStore {
  /// Fetch every question, paginating as needed.
  fn fetch_questions(&self) -> Result<Vec<QuestionRecord>, RepositoryError>;
}

/// Mutable fields of a practice-table row, written on every answer.
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeFields {
  pub question_id: String,
  pub last_practice: DateTime<Utc>,
  pub mastery: Mastery,
  pub practice_count: i64,
  pub next_due: DateTime<Utc>,
}

/// A raw practice-table row as the store returns it. Duplicated
/// `question_id`s are possible here; deduplication happens in
/// `practice::records::fetch_all`.
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeRow {
  /// Opaque store handle for this row.
  pub record_id: String,
  pub fields: PracticeFields,
}

/// The practice table: one row per answer-tracked question.
pub trait PracticeTable {
  fn search_rows(&self) -> Result<Vec<PracticeRow>, RepositoryError>;

  /// Insert a new row, returning its store handle.
  fn create_row(&self, fields: &PracticeFields) -> Result<String, RepositoryError>;

  /// Overwrite the mutable fields of an existing row.
  fn update_row(&self, record_id: &str, fields: &PracticeFields) -> Result<(), RepositoryError>;
}
