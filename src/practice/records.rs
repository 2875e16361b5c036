//! In-memory mirror of the external practice table.

use std::collections::HashMap;

use crate::domain::PracticeRecord;
use crate::error::RepositoryError;
use crate::store::{PracticeRow, PracticeTable};

/// Fetch every practice row and collapse duplicates.
///
/// The external store can hold more than one row per question (leftovers of
/// prior double-writes). The row with the greatest `last_practice` is
/// authoritative; on an exact tie the first row encountered wins.
pub fn fetch_all(
  table: &dyn PracticeTable,
) -> Result<HashMap<String, PracticeRecord>, RepositoryError> {
  let rows = table.search_rows()?;
  let mut map: HashMap<String, PracticeRecord> = HashMap::new();
  for row in rows {
    let candidate = to_record(row);
    match map.get(&candidate.question_id) {
      Some(existing) if existing.last_practice >= candidate.last_practice => {}
      _ => {
        map.insert(candidate.question_id.clone(), candidate);
      }
    }
  }
  Ok(map)
}

fn to_record(row: PracticeRow) -> PracticeRecord {
  PracticeRecord {
    question_id: row.fields.question_id,
    record_id: row.record_id,
    last_practice: row.fields.last_practice,
    mastery: row.fields.mastery,
    practice_count: row.fields.practice_count,
    next_due: row.fields.next_due,
  }
}
