//! Feishu Bitable client: tenant auth, paginated record search, and
//! practice-table writes.
//!
//! All calls are blocking with a bounded timeout and no retry; any
//! non-success HTTP status or non-zero API `code` surfaces as a
//! `RepositoryError`.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::time::{Duration, Instant};

use crate::config::FeishuConfig;
use crate::domain::{Attachment, QuestionRecord};
use crate::error::RepositoryError;
use crate::store::{PracticeFields, PracticeRow, PracticeTable, QuestionStore};

const DEFAULT_BASE_URL: &str = "https://open.feishu.cn/open-apis";
const PAGE_SIZE: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Tenant tokens are valid for two hours; refresh after 50 minutes like the
/// upstream tooling does.
const TOKEN_TTL: Duration = Duration::from_secs(50 * 60);

// Field names of the mistake-question table.
const FIELD_SUBJECT: &str = "学科";
const FIELD_KNOWLEDGE_POINTS: &str = "知识点";
const FIELD_CONTENT: &str = "去手写";
const FIELD_REASON_TYPE: &str = "不会/做错";
const FIELD_REASON_DETAIL: &str = "不会/做错原因";

// Field names of the practice table.
const FIELD_QUESTION_ID: &str = "question_id";
const FIELD_LAST_PRACTICE: &str = "last_practice_time";
const FIELD_MASTERY: &str = "mastery";
const FIELD_PRACTICE_COUNT: &str = "practice_count";
const FIELD_NEXT_DUE: &str = "next_due_time";

struct CachedToken {
  token: String,
  fetched_at: Instant,
}

pub struct BitableClient {
  http: reqwest::blocking::Client,
  base_url: String,
  app_id: String,
  app_secret: String,
  app_token: String,
  question_table: String,
  practice_table: Option<String>,
  token: RefCell<Option<CachedToken>>,
}

impl BitableClient {
  pub fn new(config: &FeishuConfig) -> Result<Self, RepositoryError> {
    let http = reqwest::blocking::Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()?;
    Ok(Self {
      http,
      base_url: DEFAULT_BASE_URL.to_string(),
      app_id: config.app_id.clone(),
      app_secret: config.app_secret.clone(),
      app_token: config.app_token.clone(),
      question_table: config.question_table.clone(),
      practice_table: config.practice_table.clone(),
      token: RefCell::new(None),
    })
  }

  fn tenant_token(&self) -> Result<String, RepositoryError> {
    if let Some(cached) = self.token.borrow().as_ref() {
      if cached.fetched_at.elapsed() < TOKEN_TTL {
        return Ok(cached.token.clone());
      }
    }

    let url = format!("{}/auth/v3/tenant_access_token/internal/", self.base_url);
    let resp = self
      .http
      .post(url)
      .json(&json!({ "app_id": self.app_id, "app_secret": self.app_secret }))
      .send()?
      .error_for_status()?;
    let body: Value = resp.json()?;
    check_api_code(&body)?;

    let token = body
      .get("tenant_access_token")
      .and_then(Value::as_str)
      .ok_or_else(|| RepositoryError::Malformed("no tenant_access_token in auth response".into()))?
      .to_string();
    *self.token.borrow_mut() = Some(CachedToken {
      token: token.clone(),
      fetched_at: Instant::now(),
    });
    Ok(token)
  }

  /// Fetch every record of a table, following `page_token` until the store
  /// reports no more pages.
  fn search_records(&self, table_id: &str) -> Result<Vec<Value>, RepositoryError> {
    let token = self.tenant_token()?;
    let url = format!(
      "{}/bitable/v1/apps/{}/tables/{}/records/search",
      self.base_url, self.app_token, table_id
    );

    let mut records = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
      let mut payload = json!({ "page_size": PAGE_SIZE });
      if let Some(pt) = &page_token {
        payload["page_token"] = json!(pt);
      }

      let resp = self
        .http
        .post(&url)
        .bearer_auth(&token)
        .json(&payload)
        .send()?
        .error_for_status()?;
      let body: Value = resp.json()?;
      check_api_code(&body)?;

      let data = body
        .get("data")
        .ok_or_else(|| RepositoryError::Malformed("search response without data".into()))?;
      if let Some(items) = data.get("items").and_then(Value::as_array) {
        records.extend(items.iter().cloned());
      }

      let has_more = data.get("has_more").and_then(Value::as_bool).unwrap_or(false);
      if !has_more {
        break;
      }
      page_token = data
        .get("page_token")
        .and_then(Value::as_str)
        .map(str::to_string);
      if page_token.is_none() {
        break;
      }
    }
    Ok(records)
  }

  fn practice_table_id(&self) -> Result<&str, RepositoryError> {
    self
      .practice_table
      .as_deref()
      .ok_or(RepositoryError::Config("practice_table_id"))
  }

  fn practice_fields_payload(fields: &PracticeFields) -> Value {
    json!({
      (FIELD_QUESTION_ID): fields.question_id,
      (FIELD_LAST_PRACTICE): fields.last_practice.timestamp_millis(),
      (FIELD_MASTERY): fields.mastery.as_str(),
      (FIELD_PRACTICE_COUNT): fields.practice_count,
      (FIELD_NEXT_DUE): fields.next_due.timestamp_millis(),
    })
  }
}

impl QuestionStore for BitableClient {
  fn fetch_questions(&self) -> Result<Vec<QuestionRecord>, RepositoryError> {
    let raw = self.search_records(&self.question_table)?;
    Ok(raw.iter().map(parse_question).collect())
  }
}

impl PracticeTable for BitableClient {
  fn search_rows(&self) -> Result<Vec<PracticeRow>, RepositoryError> {
    let table_id = self.practice_table_id()?.to_string();
    let raw = self.search_records(&table_id)?;
    raw.iter().map(parse_practice_row).collect()
  }

  fn create_row(&self, fields: &PracticeFields) -> Result<String, RepositoryError> {
    let token = self.tenant_token()?;
    let url = format!(
      "{}/bitable/v1/apps/{}/tables/{}/records",
      self.base_url,
      self.app_token,
      self.practice_table_id()?
    );
    let resp = self
      .http
      .post(url)
      .bearer_auth(&token)
      .json(&json!({ "fields": Self::practice_fields_payload(fields) }))
      .send()?
      .error_for_status()?;
    let body: Value = resp.json()?;
    check_api_code(&body)?;

    body
      .pointer("/data/record/record_id")
      .and_then(Value::as_str)
      .map(str::to_string)
      .ok_or_else(|| RepositoryError::Malformed("create response without record_id".into()))
  }

  fn update_row(&self, record_id: &str, fields: &PracticeFields) -> Result<(), RepositoryError> {
    let token = self.tenant_token()?;
    let url = format!(
      "{}/bitable/v1/apps/{}/tables/{}/records/{}",
      self.base_url,
      self.app_token,
      self.practice_table_id()?,
      record_id
    );
    let resp = self
      .http
      .put(url)
      .bearer_auth(&token)
      .json(&json!({ "fields": Self::practice_fields_payload(fields) }))
      .send()?
      .error_for_status()?;
    let body: Value = resp.json()?;
    check_api_code(&body)
  }
}

fn check_api_code(body: &Value) -> Result<(), RepositoryError> {
  let code = body.get("code").and_then(Value::as_i64).unwrap_or(0);
  if code == 0 {
    return Ok(());
  }
  let msg = body
    .get("msg")
    .and_then(Value::as_str)
    .unwrap_or("unknown error")
    .to_string();
  Err(RepositoryError::Api { code, msg })
}

/// Flatten a Bitable field value to plain text. Rich-text fields come back
/// as arrays of `{ "text": ... }` segments; list fields join with newlines.
pub fn normalize_text(value: Option<&Value>) -> String {
  match value {
    None | Some(Value::Null) => String::new(),
    Some(Value::String(s)) => s.trim().to_string(),
    Some(Value::Number(n)) => n.to_string(),
    Some(Value::Bool(b)) => b.to_string(),
    Some(Value::Array(items)) => items
      .iter()
      .map(|item| match item {
        Value::String(s) => s.trim().to_string(),
        Value::Object(obj) => obj
          .get("text")
          .and_then(Value::as_str)
          .unwrap_or_default()
          .trim()
          .to_string(),
        other => normalize_text(Some(other)),
      })
      .filter(|s| !s.is_empty())
      .collect::<Vec<_>>()
      .join("\n"),
    Some(Value::Object(obj)) => obj
      .get("text")
      .and_then(Value::as_str)
      .unwrap_or_default()
      .trim()
      .to_string(),
  }
}

/// Coerce a scalar-or-list field to a list of strings.
pub fn normalize_list(value: Option<&Value>) -> Vec<String> {
  match value {
    None | Some(Value::Null) => vec![],
    Some(Value::Array(items)) => items
      .iter()
      .map(|item| normalize_text(Some(item)))
      .filter(|s| !s.is_empty())
      .collect(),
    Some(other) => {
      let text = normalize_text(Some(other));
      if text.is_empty() { vec![] } else { vec![text] }
    }
  }
}

/// Pull attachments out of a Bitable attachment field, tolerating the url
/// key variants the API uses (`download_url`, `tmp_url`, `url`).
pub fn extract_attachments(value: Option<&Value>) -> Vec<Attachment> {
  let Some(Value::Array(items)) = value else {
    return vec![];
  };
  items
    .iter()
    .filter_map(Value::as_object)
    // Rich-text fields come back as `{ "text": ..., "type": "text" }`
    // segment objects; those are handled by normalize_text, not here.
    .filter(|item| {
      ["download_url", "tmp_url", "url", "file_name"]
        .iter()
        .any(|key| item.contains_key(*key))
        || !item.contains_key("text")
    })
    .map(|item| Attachment {
      name: item
        .get("name")
        .or_else(|| item.get("file_name"))
        .and_then(Value::as_str)
        .unwrap_or("attachment")
        .to_string(),
      url: ["download_url", "tmp_url", "url"]
        .iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str))
        .map(str::to_string),
      mime: item
        .get("mime_type")
        .or_else(|| item.get("type"))
        .and_then(Value::as_str)
        .map(str::to_string),
    })
    .collect()
}

fn parse_question(item: &Value) -> QuestionRecord {
  let empty = Map::new();
  let fields = item
    .get("fields")
    .and_then(Value::as_object)
    .unwrap_or(&empty);

  // The content field holds either an attachment list or transcribed text.
  let content = fields.get(FIELD_CONTENT);
  let attachments = extract_attachments(content);
  let text = if attachments.is_empty() {
    normalize_text(content)
  } else {
    String::new()
  };

  let created_time = match item.get("created_time") {
    Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
    Some(Value::String(s)) => s.parse().unwrap_or(0),
    _ => 0,
  };

  QuestionRecord {
    id: item
      .get("record_id")
      .and_then(Value::as_str)
      .unwrap_or_default()
      .to_string(),
    subject: {
      let s = normalize_text(fields.get(FIELD_SUBJECT));
      if s.is_empty() { None } else { Some(s) }
    },
    knowledge_points: normalize_list(fields.get(FIELD_KNOWLEDGE_POINTS)),
    text,
    attachments,
    reason_type: normalize_text(fields.get(FIELD_REASON_TYPE)),
    reason_detail: normalize_text(fields.get(FIELD_REASON_DETAIL)),
    created_time,
  }
}

fn parse_practice_row(item: &Value) -> Result<PracticeRow, RepositoryError> {
  let record_id = item
    .get("record_id")
    .and_then(Value::as_str)
    .ok_or_else(|| RepositoryError::Malformed("practice row without record_id".into()))?
    .to_string();
  let empty = Map::new();
  let fields = item
    .get("fields")
    .and_then(Value::as_object)
    .unwrap_or(&empty);

  let question_id = normalize_text(fields.get(FIELD_QUESTION_ID));
  if question_id.is_empty() {
    return Err(RepositoryError::Malformed(format!(
      "practice row {record_id} without question_id"
    )));
  }

  let mastery = crate::domain::Mastery::from_str(&normalize_text(fields.get(FIELD_MASTERY)))
    .unwrap_or(crate::domain::Mastery::Unmastered);

  Ok(PracticeRow {
    record_id,
    fields: PracticeFields {
      question_id,
      last_practice: parse_millis(fields.get(FIELD_LAST_PRACTICE)),
      mastery,
      practice_count: parse_int(fields.get(FIELD_PRACTICE_COUNT)),
      next_due: parse_millis(fields.get(FIELD_NEXT_DUE)),
    },
  })
}

fn parse_int(value: Option<&Value>) -> i64 {
  match value {
    Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
    Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
    _ => 0,
  }
}

fn parse_millis(value: Option<&Value>) -> DateTime<Utc> {
  DateTime::from_timestamp_millis(parse_int(value)).unwrap_or(DateTime::UNIX_EPOCH)
}
