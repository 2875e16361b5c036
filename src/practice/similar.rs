//! Similar-question cache and cooperative pregeneration.
//!
//! Pregeneration absorbs generation latency ahead of need: each step does at
//! most one generation call, so it can run on every refresh cycle without
//! hurting interactive latency. Failures are swallowed here and retried on a
//! later step; they must never interrupt the drill flow.

use std::collections::{HashMap, HashSet};

use crate::domain::QuestionRecord;
use crate::llm::SimilarGenerator;

/// Variants cached per question per day.
pub const VARIANTS_PER_QUESTION: usize = 2;

/// Session-scoped cache of generated variants, keyed by question id.
/// Cleared on day rollover.
#[derive(Debug, Clone, Default)]
pub struct SimilarCache {
  entries: HashMap<String, Vec<String>>,
}

impl SimilarCache {
  pub fn get(&self, question_id: &str, slot: usize) -> Option<&str> {
    self
      .entries
      .get(question_id)
      .and_then(|texts| texts.get(slot))
      .map(String::as_str)
  }

  pub fn contains(&self, question_id: &str) -> bool {
    self.entries.contains_key(question_id)
  }

  /// Store up to `VARIANTS_PER_QUESTION` variants for a question.
  pub fn fill(&mut self, question_id: &str, mut texts: Vec<String>) {
    texts.truncate(VARIANTS_PER_QUESTION);
    self.entries.insert(question_id.to_string(), texts);
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }
}

/// Pregeneration bookkeeping: the session's eligible questions in order, and
/// the subset whose cache entry is already filled. Rebuilt each session;
/// restarting from an empty `done` set is safe because filled entries are
/// simply re-marked without a new generation call.
#[derive(Debug, Clone, Default)]
pub struct PregenState {
  pub queue: Vec<String>,
  pub done: HashSet<String>,
}

impl PregenState {
  pub fn new(queue: Vec<String>) -> Self {
    Self { queue, done: HashSet::new() }
  }

  pub fn clear(&mut self) {
    self.queue.clear();
    self.done.clear();
  }

  /// Mark a question's cache entry as filled without generating, used by the
  /// on-demand path so later steps skip it.
  pub fn mark_done(&mut self, question_id: &str) {
    self.done.insert(question_id.to_string());
  }
}

/// One cooperative unit of pregeneration work.
///
/// Scans the queue for the first question not yet done; at most one
/// generation call happens per invocation. Returns true if a cache entry was
/// filled. A failed generation leaves the question un-done for a later step.
pub fn pregenerate_step(
  cache: &mut SimilarCache,
  pregen: &mut PregenState,
  questions: &[QuestionRecord],
  generator: &dyn SimilarGenerator,
) -> bool {
  let Some(id) = pregen
    .queue
    .iter()
    .find(|id| !pregen.done.contains(*id))
    .cloned()
  else {
    return false;
  };

  if cache.contains(&id) {
    // Filled by the on-demand path before pregeneration got here.
    pregen.done.insert(id);
    return false;
  }

  let Some(reference) = questions.iter().find(|q| q.id == id) else {
    // Question disappeared from the corpus mid-session; nothing to generate.
    pregen.done.insert(id);
    return false;
  };

  match generator.generate(reference, VARIANTS_PER_QUESTION) {
    Ok(texts) => {
      cache.fill(&id, texts);
      pregen.done.insert(id);
      true
    }
    Err(e) => {
      tracing::warn!("pregeneration failed for question {}: {}", id, e);
      false
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::GenerationError;
  use std::cell::RefCell;

  fn question(id: &str) -> QuestionRecord {
    QuestionRecord {
      id: id.to_string(),
      subject: None,
      knowledge_points: vec![],
      text: format!("question {id}"),
      attachments: vec![],
      reason_type: String::new(),
      reason_detail: String::new(),
      created_time: 0,
    }
  }

  struct ScriptedGenerator {
    calls: RefCell<Vec<String>>,
    fail_ids: HashSet<String>,
  }

  impl ScriptedGenerator {
    fn new() -> Self {
      Self { calls: RefCell::new(vec![]), fail_ids: HashSet::new() }
    }

    fn failing_on(ids: &[&str]) -> Self {
      Self {
        calls: RefCell::new(vec![]),
        fail_ids: ids.iter().map(|s| s.to_string()).collect(),
      }
    }
  }

  impl SimilarGenerator for ScriptedGenerator {
    fn generate(
      &self,
      reference: &QuestionRecord,
      count: usize,
    ) -> Result<Vec<String>, GenerationError> {
      self.calls.borrow_mut().push(reference.id.clone());
      if self.fail_ids.contains(&reference.id) {
        return Err(GenerationError::Malformed("scripted failure".into()));
      }
      Ok((0..count).map(|i| format!("variant {i} of {}", reference.id)).collect())
    }
  }

  #[test]
  fn test_cache_slots() {
    let mut cache = SimilarCache::default();
    cache.fill("q1", vec!["first".into(), "second".into(), "extra".into()]);

    assert_eq!(cache.get("q1", 0), Some("first"));
    assert_eq!(cache.get("q1", 1), Some("second"));
    assert_eq!(cache.get("q1", 2), None); // truncated to 2
    assert_eq!(cache.get("q2", 0), None);
  }

  #[test]
  fn test_step_fills_in_queue_order() {
    let questions = vec![question("a"), question("b")];
    let mut cache = SimilarCache::default();
    let mut pregen = PregenState::new(vec!["a".into(), "b".into()]);
    let generator = ScriptedGenerator::new();

    assert!(pregenerate_step(&mut cache, &mut pregen, &questions, &generator));
    assert!(cache.contains("a"));
    assert!(!cache.contains("b"));

    assert!(pregenerate_step(&mut cache, &mut pregen, &questions, &generator));
    assert!(cache.contains("b"));

    // Queue exhausted: further steps are no-ops.
    assert!(!pregenerate_step(&mut cache, &mut pregen, &questions, &generator));
    assert_eq!(generator.calls.borrow().len(), 2);
  }

  #[test]
  fn test_step_one_generation_per_invocation() {
    let questions = vec![question("a"), question("b"), question("c")];
    let mut cache = SimilarCache::default();
    let mut pregen = PregenState::new(vec!["a".into(), "b".into(), "c".into()]);
    let generator = ScriptedGenerator::new();

    pregenerate_step(&mut cache, &mut pregen, &questions, &generator);
    assert_eq!(generator.calls.borrow().len(), 1);
  }

  #[test]
  fn test_failed_step_retries_later() {
    let questions = vec![question("a")];
    let mut cache = SimilarCache::default();
    let mut pregen = PregenState::new(vec!["a".into()]);
    let generator = ScriptedGenerator::failing_on(&["a"]);

    assert!(!pregenerate_step(&mut cache, &mut pregen, &questions, &generator));
    assert!(!pregen.done.contains("a"));

    // The same question is attempted again on the next step.
    assert!(!pregenerate_step(&mut cache, &mut pregen, &questions, &generator));
    assert_eq!(generator.calls.borrow().len(), 2);
  }

  #[test]
  fn test_on_demand_fill_skipped_without_regeneration() {
    let questions = vec![question("a"), question("b")];
    let mut cache = SimilarCache::default();
    let mut pregen = PregenState::new(vec!["a".into(), "b".into()]);
    let generator = ScriptedGenerator::new();

    // "a" was filled on demand while answering.
    cache.fill("a", vec!["v0".into(), "v1".into()]);
    pregen.mark_done("a");

    assert!(pregenerate_step(&mut cache, &mut pregen, &questions, &generator));
    assert_eq!(generator.calls.borrow().as_slice(), ["b"]);
  }

  #[test]
  fn test_cached_but_not_marked_done_is_not_regenerated() {
    let questions = vec![question("a")];
    let mut cache = SimilarCache::default();
    let mut pregen = PregenState::new(vec!["a".into()]);
    let generator = ScriptedGenerator::new();

    cache.fill("a", vec!["v0".into()]);

    assert!(!pregenerate_step(&mut cache, &mut pregen, &questions, &generator));
    assert!(pregen.done.contains("a"));
    assert!(generator.calls.borrow().is_empty());
  }

  #[test]
  fn test_vanished_question_marked_done() {
    let questions = vec![question("b")];
    let mut cache = SimilarCache::default();
    let mut pregen = PregenState::new(vec!["a".into(), "b".into()]);
    let generator = ScriptedGenerator::new();

    assert!(!pregenerate_step(&mut cache, &mut pregen, &questions, &generator));
    assert!(pregen.done.contains("a"));
    assert!(pregenerate_step(&mut cache, &mut pregen, &questions, &generator));
    assert!(cache.contains("b"));
  }
}
