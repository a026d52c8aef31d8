use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    OpenEnded,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::OpenEnded => "open_ended",
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row payload for an insert into the `questions` table.
///
/// Rows read back from the table are passed through as JSON: other writers use
/// different columns and the store owns the id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewQuestion {
    #[validate(length(min = 1))]
    pub test_id: String,
    pub content: String,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
    pub topic: String,
    pub difficulty: String,
    pub question_type: QuestionType,
}
