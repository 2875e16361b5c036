use chrono::{DateTime, Duration, Utc};

use crate::domain::Mastery;

/// Retry window for a question answered "unmastered", short enough to come
/// back within the same sitting.
pub const RETRY_DELAY_MINUTES: i64 = 5;

/// Ebbinghaus-style spacing table: days until the next review after the
/// n-th answer on a mastered question.
pub fn interval_days(practice_count: i64) -> i64 {
  match practice_count {
    ..=1 => 1,
    2 => 3,
    3 => 7,
    4 => 14,
    _ => 30,
  }
}

/// Compute when a question becomes eligible again after an answer.
///
/// Mastered answers push the question out along the spacing table;
/// unmastered answers schedule a short same-session retry.
pub fn next_due(mastery: Mastery, practice_count: i64, now: DateTime<Utc>) -> DateTime<Utc> {
  match mastery {
    Mastery::Mastered => now + Duration::days(interval_days(practice_count)),
    Mastery::Unmastered => now + Duration::minutes(RETRY_DELAY_MINUTES),
  }
}
