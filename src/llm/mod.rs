//! Similar-question generation collaborator.

pub mod chat;

use crate::domain::QuestionRecord;
use crate::error::GenerationError;

pub use chat::ChatCompletionsGenerator;

/// Produces AI variants of a reference question.
///
/// Implementations return exactly `count` texts; padding a short response
/// or truncating a long one is their responsibility (see `fit_to_count`).
pub trait SimilarGenerator {
  fn generate(
    &self,
    reference: &QuestionRecord,
    count: usize,
  ) -> Result<Vec<String>, GenerationError>;
}

/// Pad (by repeating the last text) or truncate so the result has exactly
/// `count` entries. An empty input is an error; there is nothing to repeat.
pub fn fit_to_count(mut texts: Vec<String>, count: usize) -> Result<Vec<String>, GenerationError> {
  if texts.is_empty() {
    return Err(GenerationError::Malformed(
      "model returned no usable lines".into(),
    ));
  }
  while texts.len() < count {
    let last = texts.last().cloned().unwrap_or_default();
    texts.push(last);
  }
  texts.truncate(count);
  Ok(texts)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_fit_to_count_truncates() {
    let out = fit_to_count(vec!["a".into(), "b".into(), "c".into()], 2).unwrap();
    assert_eq!(out, vec!["a", "b"]);
  }

  #[test]
  fn test_fit_to_count_pads_with_last() {
    let out = fit_to_count(vec!["only".into()], 2).unwrap();
    assert_eq!(out, vec!["only", "only"]);
  }

  #[test]
  fn test_fit_to_count_empty_is_error() {
    assert!(fit_to_count(vec![], 2).is_err());
  }
}
