//! Calendar-day no-repeat tracking for original questions.
//!
//! AI variants are ephemeral and never tracked here. The tracked date is
//! checked on every access; crossing local midnight clears the set (the
//! session owner also clears the similar cache and pregeneration state on
//! that signal, see `session::SessionState::roll_over`).

use chrono::NaiveDate;
use std::collections::HashSet;

use crate::domain::QuestionRecord;

#[derive(Debug, Clone)]
pub struct DailyTracker {
  day: NaiveDate,
  practiced: HashSet<String>,
}

impl DailyTracker {
  pub fn new(today: NaiveDate) -> Self {
    Self { day: today, practiced: HashSet::new() }
  }

  /// Clear the practiced set if `today` differs from the tracked date.
  /// Returns true when a reset happened.
  pub fn reset_if_new_day(&mut self, today: NaiveDate) -> bool {
    if self.day == today {
      return false;
    }
    self.day = today;
    self.practiced.clear();
    true
  }

  pub fn mark_practiced(&mut self, question_id: &str, today: NaiveDate) {
    self.reset_if_new_day(today);
    if question_id.is_empty() {
      return;
    }
    self.practiced.insert(question_id.to_string());
  }

  pub fn is_practiced_today(&mut self, question_id: &str, today: NaiveDate) -> bool {
    self.reset_if_new_day(today);
    self.practiced.contains(question_id)
  }

  /// Drop questions already shown today.
  pub fn filter_unpracticed<'a>(
    &mut self,
    questions: &'a [QuestionRecord],
    today: NaiveDate,
  ) -> Vec<&'a QuestionRecord> {
    self.reset_if_new_day(today);
    questions
      .iter()
      .filter(|q| !self.practiced.contains(&q.id))
      .collect()
  }
}
