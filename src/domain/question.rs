use serde::{Deserialize, Serialize};

const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "gif", "bmp", "webp", "svg"];

/// File attached to a mistake question in the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
  pub name: String,
  pub url: Option<String>,
  pub mime: Option<String>,
}

impl Attachment {
  /// True if the attachment looks like an image, by MIME type first,
  /// falling back to the file extension.
  pub fn is_image(&self) -> bool {
    if let Some(mime) = &self.mime {
      return mime.starts_with("image/");
    }
    match self.name.rsplit_once('.') {
      Some((_, ext)) => IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
      None => false,
    }
  }
}

/// A logged mistake question, owned by the external record store.
/// Immutable for this engine; only the store writes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
  /// Store record id. Empty ids mark rows the store returned without one;
  /// such rows are never scheduled.
  pub id: String,
  pub subject: Option<String>,
  pub knowledge_points: Vec<String>,
  /// Transcribed question text. May be empty when the question lives in
  /// `attachments` as a photo.
  pub text: String,
  pub attachments: Vec<Attachment>,
  /// Why the question was missed ("didn't know" vs "made a mistake"), kept
  /// for display only.
  pub reason_type: String,
  pub reason_detail: String,
  /// Store creation timestamp in epoch milliseconds.
  pub created_time: i64,
}

impl QuestionRecord {
  /// A question is schedulable only if there is something to show.
  pub fn has_content(&self) -> bool {
    !self.text.trim().is_empty() || !self.attachments.is_empty()
  }

  pub fn image_attachments(&self) -> impl Iterator<Item = &Attachment> {
    self.attachments.iter().filter(|a| a.is_image())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn attachment(name: &str, mime: Option<&str>) -> Attachment {
    Attachment {
      name: name.to_string(),
      url: Some("https://example.test/f".to_string()),
      mime: mime.map(str::to_string),
    }
  }

  #[test]
  fn test_is_image_by_mime() {
    assert!(attachment("whatever", Some("image/png")).is_image());
    assert!(!attachment("photo.png", Some("application/pdf")).is_image());
  }

  #[test]
  fn test_is_image_by_extension() {
    assert!(attachment("scan.JPG", None).is_image());
    assert!(attachment("q.webp", None).is_image());
    assert!(!attachment("notes.docx", None).is_image());
    assert!(!attachment("no_extension", None).is_image());
  }

  #[test]
  fn test_has_content() {
    let mut q = QuestionRecord {
      id: "rec1".to_string(),
      subject: None,
      knowledge_points: vec![],
      text: "   ".to_string(),
      attachments: vec![],
      reason_type: String::new(),
      reason_detail: String::new(),
      created_time: 0,
    };
    assert!(!q.has_content());

    q.text = "2 + 2 = ?".to_string();
    assert!(q.has_content());

    q.text = String::new();
    q.attachments.push(attachment("scan.png", None));
    assert!(q.has_content());
  }
}
