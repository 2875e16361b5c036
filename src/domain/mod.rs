pub mod practice;
pub mod question;

pub use practice::{Mastery, PracticeRecord};
pub use question::{Attachment, QuestionRecord};
