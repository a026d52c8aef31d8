use crate::models::question::QuestionType;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateQuestionsPayload {
    #[validate(length(min = 1, message = "At least one topic is required"))]
    pub topics: Vec<String>,
    pub difficulty: String,
    #[validate(range(min = 1, message = "count must be at least 1"))]
    pub count: u32,
    pub question_types: Vec<QuestionType>,
}

/// Non-file fields of the document upload form.
#[derive(Debug, Clone, Validate)]
pub struct DocumentGenerationOptions {
    pub difficulty: String,
    #[validate(range(min = 1, message = "count must be at least 1"))]
    pub count: u32,
    pub question_types: Vec<QuestionType>,
}

impl DocumentGenerationOptions {
    pub fn default_question_types() -> Vec<QuestionType> {
        vec![QuestionType::MultipleChoice, QuestionType::TrueFalse]
    }

    /// `question_types` arrives as a JSON-encoded string; anything unparseable
    /// falls back to multiple choice plus true/false.
    pub fn parse_question_types(raw: Option<&str>) -> Vec<QuestionType> {
        raw.and_then(|s| serde_json::from_str::<Vec<QuestionType>>(s).ok())
            .unwrap_or_else(Self::default_question_types)
    }
}

/// The LLM's parsed output is passed through without schema checks.
#[derive(Debug, Serialize, Deserialize)]
pub struct GeneratedQuestionsResponse {
    pub questions: JsonValue,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentQuestionsResponse {
    pub questions: JsonValue,
    pub document_preview: String,
}
