//! Mastery state transition on each answer.
//!
//! Exactly one store write per answer, no retries. A failed write leaves the
//! in-memory map untouched, so caller and store never disagree about what
//! was committed.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::domain::{Mastery, PracticeRecord};
use crate::error::RepositoryError;
use crate::srs;
use crate::store::{PracticeFields, PracticeTable};

/// Apply an answer to a question: bump the count, compute the new due time,
/// write through to the practice table, then mirror the result into
/// `practice_map` so the scheduler sees it without a re-fetch.
pub fn record_answer(
  table: &dyn PracticeTable,
  practice_map: &mut HashMap<String, PracticeRecord>,
  question_id: &str,
  mastery: Mastery,
  now: DateTime<Utc>,
) -> Result<(), RepositoryError> {
  let previous = practice_map.get(question_id);
  let practice_count = previous.map_or(0, |r| r.practice_count) + 1;
  let next_due = srs::next_due(mastery, practice_count, now);

  let fields = PracticeFields {
    question_id: question_id.to_string(),
    last_practice: now,
    mastery,
    practice_count,
    next_due,
  };

  let record_id = match previous {
    Some(record) => {
      table.update_row(&record.record_id, &fields)?;
      record.record_id.clone()
    }
    None => table.create_row(&fields)?,
  };

  practice_map.insert(
    question_id.to_string(),
    PracticeRecord {
      question_id: question_id.to_string(),
      record_id,
      last_practice: now,
      mastery,
      practice_count,
      next_due,
    },
  );
  Ok(())
}
