//! Due-time driven question selection.
//!
//! Overdue questions always beat not-yet-due ones; among overdue questions
//! the longest overdue goes first. Never-practiced questions count as due at
//! the epoch, so they are taken before anything with a future due time.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::domain::{PracticeRecord, QuestionRecord};

/// Pick the next question to present.
///
/// Candidates without an id or without content are skipped. The sort is
/// stable, so repeated ties (same due bucket, equal due times) resolve in
/// input order and the selection is deterministic.
pub fn pick_next<'a>(
  candidates: &[&'a QuestionRecord],
  practice_map: &HashMap<String, PracticeRecord>,
  now: DateTime<Utc>,
) -> Option<&'a QuestionRecord> {
  let mut eligible: Vec<&QuestionRecord> = candidates
    .iter()
    .copied()
    .filter(|q| !q.id.is_empty() && q.has_content())
    .collect();

  eligible.sort_by_key(|q| {
    let due = practice_map
      .get(&q.id)
      .map(|r| r.next_due)
      .unwrap_or(DateTime::UNIX_EPOCH);
    (due > now, due)
  });

  eligible.first().copied()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Mastery;
  use chrono::Duration;

  fn question(id: &str, text: &str) -> QuestionRecord {
    QuestionRecord {
      id: id.to_string(),
      subject: Some("math".to_string()),
      knowledge_points: vec!["fractions".to_string()],
      text: text.to_string(),
      attachments: vec![],
      reason_type: String::new(),
      reason_detail: String::new(),
      created_time: 0,
    }
  }

  fn record(question_id: &str, next_due: DateTime<Utc>) -> PracticeRecord {
    PracticeRecord {
      question_id: question_id.to_string(),
      record_id: format!("prac-{question_id}"),
      last_practice: next_due - Duration::days(1),
      mastery: Mastery::Unmastered,
      practice_count: 1,
      next_due,
    }
  }

  #[test]
  fn test_empty_candidates() {
    let map = HashMap::new();
    assert_eq!(pick_next(&[], &map, Utc::now()), None);
  }

  #[test]
  fn test_skips_blank_content_and_missing_id() {
    let blank = question("q1", "  ");
    let no_id = question("", "valid text");
    let map = HashMap::new();
    assert_eq!(pick_next(&[&blank, &no_id], &map, Utc::now()), None);
  }

  #[test]
  fn test_never_practiced_selected_first() {
    let now = Utc::now();
    let fresh = question("fresh", "new one");
    let due_soon = question("soon", "scheduled");
    let mut map = HashMap::new();
    map.insert("soon".to_string(), record("soon", now + Duration::hours(1)));

    // Never-practiced counts as due at the epoch, ahead of future due times.
    let picked = pick_next(&[&due_soon, &fresh], &map, now);
    assert_eq!(picked.map(|q| q.id.as_str()), Some("fresh"));
  }

  #[test]
  fn test_due_beats_not_due_regardless_of_order() {
    let now = Utc::now();
    let overdue = question("overdue", "a");
    let future = question("future", "b");
    let mut map = HashMap::new();
    map.insert("overdue".to_string(), record("overdue", now - Duration::minutes(1)));
    map.insert("future".to_string(), record("future", now + Duration::days(3)));

    for order in [[&future, &overdue], [&overdue, &future]] {
      let picked = pick_next(&order, &map, now);
      assert_eq!(picked.map(|q| q.id.as_str()), Some("overdue"));
    }
  }

  #[test]
  fn test_earliest_due_among_overdue() {
    let now = Utc::now();
    let older = question("older", "a");
    let newer = question("newer", "b");
    let mut map = HashMap::new();
    map.insert("older".to_string(), record("older", now - Duration::days(5)));
    map.insert("newer".to_string(), record("newer", now - Duration::hours(1)));

    let picked = pick_next(&[&newer, &older], &map, now);
    assert_eq!(picked.map(|q| q.id.as_str()), Some("older"));
  }

  #[test]
  fn test_ties_resolve_in_input_order() {
    let now = Utc::now();
    let a = question("a", "first");
    let b = question("b", "second");
    let due = now - Duration::hours(2);
    let mut map = HashMap::new();
    map.insert("a".to_string(), record("a", due));
    map.insert("b".to_string(), record("b", due));

    assert_eq!(pick_next(&[&a, &b], &map, now).map(|q| q.id.as_str()), Some("a"));
    assert_eq!(pick_next(&[&b, &a], &map, now).map(|q| q.id.as_str()), Some("b"));
  }

  #[test]
  fn test_only_future_questions_still_returns_one() {
    let now = Utc::now();
    let later = question("later", "a");
    let soonest = question("soonest", "b");
    let mut map = HashMap::new();
    map.insert("later".to_string(), record("later", now + Duration::days(7)));
    map.insert("soonest".to_string(), record("soonest", now + Duration::hours(2)));

    // Nothing is due; the least-far-away future question is shown.
    let picked = pick_next(&[&later, &soonest], &map, now);
    assert_eq!(picked.map(|q| q.id.as_str()), Some("soonest"));
  }

  #[test]
  fn test_image_only_question_has_content() {
    let mut q = question("img", "");
    q.attachments.push(crate::domain::Attachment {
      name: "scan.png".to_string(),
      url: None,
      mime: Some("image/png".to_string()),
    });
    let map = HashMap::new();
    let picked = pick_next(&[&q], &map, Utc::now());
    assert_eq!(picked.map(|p| p.id.as_str()), Some("img"));
  }
}
