//! OpenAI-style chat-completions client for similar-question generation.
//!
//! Defaults target Zhipu's endpoint and `glm-4.6v`. One blocking call per
//! `generate`, 60 s timeout, no retry; auth failures map to
//! `GenerationError::Auth` so the caller can surface a key problem
//! distinctly from a flaky network.

use serde_json::{json, Value};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::domain::QuestionRecord;
use crate::error::GenerationError;
use crate::llm::{fit_to_count, SimilarGenerator};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 2000;

pub struct ChatCompletionsGenerator {
  http: reqwest::blocking::Client,
  api_url: String,
  api_key: String,
  model: String,
}

impl ChatCompletionsGenerator {
  pub fn new(config: &LlmConfig) -> Result<Self, GenerationError> {
    let http = reqwest::blocking::Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()?;
    Ok(Self {
      http,
      api_url: completions_url(&config.api_base),
      api_key: config.api_key.clone(),
      model: config.model.clone(),
    })
  }
}

/// Accept either a bare API base or a full `/chat/completions` URL.
fn completions_url(api_base: &str) -> String {
  if api_base.ends_with("/chat/completions") {
    api_base.to_string()
  } else {
    format!("{}/chat/completions", api_base.trim_end_matches('/'))
  }
}

/// Build the generation prompt: keep knowledge point, question type and
/// difficulty; vary only numbers, names and scenery; one question per line
/// with no numbering or commentary.
pub fn build_prompt(reference: &QuestionRecord, count: usize) -> Result<String, GenerationError> {
  let description = if !reference.text.trim().is_empty() {
    reference.text.trim().to_string()
  } else if reference.image_attachments().next().is_some() {
    // Vision input is not wired up; describe the gap so the model still has
    // a usable instruction when only a photo exists.
    "(the reference question exists only as a photo; generate questions on the same knowledge points)".to_string()
  } else {
    return Err(GenerationError::EmptyReference);
  };

  let knowledge = if reference.knowledge_points.is_empty() {
    String::new()
  } else {
    format!("Knowledge points: {}\n", reference.knowledge_points.join(", "))
  };

  Ok(format!(
    "You are an experienced teacher writing drill questions modeled on a reference question.\n\
     \n\
     Reference question: {description}\n\
     {knowledge}\
     Write {count} similar questions. Requirements:\n\
     1. Keep the same knowledge points, solution method, question type and difficulty.\n\
     2. Change only the variable parts: concrete numbers, names, objects and scenery. \
     The structure and solution steps must stay the same.\n\
     3. Output one question per line. No numbering, no prefixes, no explanations. \
     Every line must be a complete, independent, directly usable question.\n\
     4. Every question must be solvable, free of logic errors, and comparable in \
     difficulty to the reference. Do not repeat the reference verbatim.\n\
     \n\
     Output exactly {count} lines."
  ))
}

/// Split the model output into candidate questions: one per non-blank line.
pub fn split_response(content: &str) -> Vec<String> {
  content
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty())
    .map(str::to_string)
    .collect()
}

impl SimilarGenerator for ChatCompletionsGenerator {
  fn generate(
    &self,
    reference: &QuestionRecord,
    count: usize,
  ) -> Result<Vec<String>, GenerationError> {
    let prompt = build_prompt(reference, count)?;
    let payload = json!({
      "model": self.model,
      "messages": [{ "role": "user", "content": prompt }],
      "temperature": TEMPERATURE,
      "max_tokens": MAX_TOKENS,
    });

    let resp = self
      .http
      .post(&self.api_url)
      .bearer_auth(&self.api_key)
      .json(&payload)
      .send()?;

    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
      let detail = resp.text().unwrap_or_default();
      return Err(GenerationError::Auth(format!("HTTP {status}: {detail}")));
    }
    if !status.is_success() {
      let detail = resp.text().unwrap_or_default();
      return Err(GenerationError::Malformed(format!(
        "HTTP {status}: {}",
        detail.chars().take(200).collect::<String>()
      )));
    }

    let body: Value = resp.json()?;
    let content = body
      .pointer("/choices/0/message/content")
      .and_then(Value::as_str)
      .ok_or_else(|| GenerationError::Malformed(format!("no choices in response: {body}")))?;

    fit_to_count(split_response(content), count)
  }
}
