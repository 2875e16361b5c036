//! Session lifecycle and the drill state machine.
//!
//! `SessionState` is created at session start, reset on date rollover, and
//! discarded at session end. The UI loop drives `advance` with discrete
//! events; every transition is a function of (state, event) plus the two
//! collaborators, so the whole flow is testable without a rendering layer.
//!
//! Phases: `Idle → Original(question) → [Variant(slot 0) → Variant(slot 1)]
//! → Original(next) → … → Finished`. The variant detour opens only after an
//! original is answered "unmastered", and closes after a mastered variant or
//! after both slots are exhausted.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

use crate::domain::{Mastery, PracticeRecord, QuestionRecord};
use crate::error::RepositoryError;
use crate::llm::SimilarGenerator;
use crate::practice::daily::DailyTracker;
use crate::practice::feedback::record_answer;
use crate::practice::similar::{pregenerate_step, PregenState, SimilarCache, VARIANTS_PER_QUESTION};
use crate::srs::pick_next;
use crate::store::PracticeTable;

/// All mutable engine state for one learner session.
#[derive(Debug, Clone)]
pub struct SessionState {
  pub practice_map: HashMap<String, PracticeRecord>,
  pub daily: DailyTracker,
  pub cache: SimilarCache,
  pub pregen: PregenState,
}

impl SessionState {
  /// Build session state from a fresh practice-map fetch. The pregeneration
  /// queue holds every schedulable question not yet practiced today, in
  /// corpus order.
  pub fn start(
    practice_map: HashMap<String, PracticeRecord>,
    questions: &[QuestionRecord],
    today: NaiveDate,
  ) -> Self {
    let mut daily = DailyTracker::new(today);
    let queue = daily
      .filter_unpracticed(questions, today)
      .into_iter()
      .filter(|q| !q.id.is_empty() && q.has_content())
      .map(|q| q.id.clone())
      .collect();
    Self {
      practice_map,
      daily,
      cache: SimilarCache::default(),
      pregen: PregenState::new(queue),
    }
  }

  /// Date-rollover check, run on every engine access. Crossing midnight
  /// clears the daily set, the variant cache, and the pregeneration state.
  pub fn roll_over(&mut self, today: NaiveDate) {
    if self.daily.reset_if_new_day(today) {
      self.cache.clear();
      self.pregen.clear();
      tracing::info!("new day {}: cleared daily set, variant cache and pregeneration state", today);
    }
  }
}

/// Where the drill currently stands. States carry question ids, not
/// references, so the state can outlive corpus re-fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrillState {
  Idle,
  /// An original, repository-backed question is on screen.
  Original { question_id: String },
  /// An AI variant of `question_id` is on screen.
  Variant { question_id: String, slot: usize },
  /// Nothing left to show: every candidate lacks content or was shown today.
  Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrillEvent {
  Start,
  Answered(Mastery),
  /// A UI refresh tick. Runs one cooperative pregeneration step and leaves
  /// the visible state alone.
  Refresh,
}

/// What the UI should render for a state.
#[derive(Debug, Clone, PartialEq)]
pub enum DrillCard<'a> {
  Original(&'a QuestionRecord),
  Variant {
    reference: &'a QuestionRecord,
    slot: usize,
    text: &'a str,
  },
}

/// Resolve the current state to displayable content.
pub fn current_card<'a>(
  session: &'a SessionState,
  state: &DrillState,
  questions: &'a [QuestionRecord],
) -> Option<DrillCard<'a>> {
  match state {
    DrillState::Idle | DrillState::Finished => None,
    DrillState::Original { question_id } => questions
      .iter()
      .find(|q| &q.id == question_id)
      .map(DrillCard::Original),
    DrillState::Variant { question_id, slot } => {
      let reference = questions.iter().find(|q| &q.id == question_id)?;
      let text = session.cache.get(question_id, *slot)?;
      Some(DrillCard::Variant { reference, slot: *slot, text })
    }
  }
}

/// Apply one event to the drill.
///
/// Repository write failures propagate with the state unchanged; generation
/// failures never do, the drill falls through to the next scheduled
/// question instead.
pub fn advance(
  session: &mut SessionState,
  state: &DrillState,
  event: DrillEvent,
  questions: &[QuestionRecord],
  table: &dyn PracticeTable,
  generator: &dyn SimilarGenerator,
  now: DateTime<Utc>,
  today: NaiveDate,
) -> Result<DrillState, RepositoryError> {
  session.roll_over(today);

  match (state, event) {
    (_, DrillEvent::Refresh) => {
      pregenerate_step(&mut session.cache, &mut session.pregen, questions, generator);
      Ok(state.clone())
    }

    (DrillState::Idle | DrillState::Finished, DrillEvent::Start) => {
      Ok(show_next(session, questions, now, today))
    }

    (DrillState::Original { question_id }, DrillEvent::Answered(mastery)) => {
      record_answer(table, &mut session.practice_map, question_id, mastery, now)?;
      match mastery {
        Mastery::Mastered => Ok(show_next(session, questions, now, today)),
        Mastery::Unmastered => Ok(enter_variant_detour(session, question_id, questions, now, today, generator)),
      }
    }

    (DrillState::Variant { question_id, slot }, DrillEvent::Answered(mastery)) => {
      // Variants never touch practice records.
      let next_slot = slot + 1;
      if mastery == Mastery::Unmastered
        && next_slot < VARIANTS_PER_QUESTION
        && session.cache.get(question_id, next_slot).is_some()
      {
        Ok(DrillState::Variant { question_id: question_id.clone(), slot: next_slot })
      } else {
        Ok(show_next(session, questions, now, today))
      }
    }

    // Start while something is showing, or an answer with nothing on
    // screen: ignore.
    (state, DrillEvent::Start | DrillEvent::Answered(_)) => Ok(state.clone()),
  }
}

fn show_next(
  session: &mut SessionState,
  questions: &[QuestionRecord],
  now: DateTime<Utc>,
  today: NaiveDate,
) -> DrillState {
  let candidates = session.daily.filter_unpracticed(questions, today);
  match pick_next(&candidates, &session.practice_map, now) {
    Some(question) => {
      let question_id = question.id.clone();
      session.daily.mark_practiced(&question_id, today);
      DrillState::Original { question_id }
    }
    None => DrillState::Finished,
  }
}

/// On-demand side of the variant cache: make sure slot 0 exists, then show
/// it. A generation failure (or a vanished reference) skips straight to the
/// next scheduled question.
fn enter_variant_detour(
  session: &mut SessionState,
  question_id: &str,
  questions: &[QuestionRecord],
  now: DateTime<Utc>,
  today: NaiveDate,
  generator: &dyn SimilarGenerator,
) -> DrillState {
  if !session.cache.contains(question_id) {
    let Some(reference) = questions.iter().find(|q| q.id == question_id) else {
      return show_next(session, questions, now, today);
    };
    match generator.generate(reference, VARIANTS_PER_QUESTION) {
      Ok(texts) => {
        session.cache.fill(question_id, texts);
        session.pregen.mark_done(question_id);
      }
      Err(e) => {
        tracing::warn!("on-demand generation failed for question {}: {}", question_id, e);
        return show_next(session, questions, now, today);
      }
    }
  }

  match session.cache.get(question_id, 0) {
    Some(_) => DrillState::Variant { question_id: question_id.to_string(), slot: 0 },
    None => show_next(session, questions, now, today),
  }
}
