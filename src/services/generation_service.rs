use crate::dto::question_dto::{
    DocumentGenerationOptions, DocumentQuestionsResponse, GenerateQuestionsPayload,
    GeneratedQuestionsResponse,
};
use crate::error::{Error, Result};
use crate::models::question::QuestionType;
use crate::providers::llm::LlmClient;
use crate::utils::text::{take_chars, trimmed_char_count, truncate_with_marker};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Instant;

/// Documents with less trimmed text than this are rejected before any LLM call.
pub const MIN_DOCUMENT_CHARS: usize = 100;
pub const PREVIEW_CHARS: usize = 500;

const OPEN_ENDED_INSTRUCTIONS: &str = "For open-ended questions, provide:
1. The question text
2. A sample answer or key points (as correct_answer)
3. An explanation of what a good answer should include
4. No options array needed";

const TRUE_FALSE_INSTRUCTIONS: &str = "For true/false questions, provide:
1. The question text
2. Options array with [\"True\", \"False\"]
3. The correct answer (either \"True\" or \"False\")";

const MULTIPLE_CHOICE_INSTRUCTIONS: &str = "For multiple choice questions, provide:
1. The question text
2. 4 possible answers in options array
3. The correct answer";

const RESPONSE_FORMAT: &str = "Format as a JSON array of objects with fields: content, options, correct_answer, explanation, topic, difficulty, question_type";

#[derive(Clone)]
pub struct GenerationService {
    llm: Option<Arc<dyn LlmClient>>,
    max_document_chars: usize,
}

impl GenerationService {
    pub fn new(llm: Option<Arc<dyn LlmClient>>, max_document_chars: usize) -> Self {
        Self {
            llm,
            max_document_chars,
        }
    }

    fn llm(&self) -> Result<&Arc<dyn LlmClient>> {
        self.llm.as_ref().ok_or_else(|| {
            Error::ServiceUnavailable(
                "Question generation service is not available. Please check the LLM API key configuration."
                    .to_string(),
            )
        })
    }

    pub async fn generate_from_topics(
        &self,
        payload: &GenerateQuestionsPayload,
    ) -> Result<GeneratedQuestionsResponse> {
        let llm = self.llm()?;
        let prompt = build_topic_prompt(payload);

        let raw = llm.generate(&prompt).await.map_err(|e| {
            tracing::error!(error = %e, "topic question generation failed");
            Error::Internal(format!("Question generation failed: {}", e))
        })?;

        let questions = parse_generated_questions(&raw)?;
        Ok(GeneratedQuestionsResponse { questions })
    }

    /// Runs the document pipeline on already-extracted text.
    pub async fn generate_from_document_text(
        &self,
        document_text: &str,
        options: &DocumentGenerationOptions,
    ) -> Result<DocumentQuestionsResponse> {
        let llm = self.llm()?;
        let document_text = prepare_document_text(document_text, self.max_document_chars)?;
        let prompt = build_document_prompt(&document_text, options);

        let started = Instant::now();
        let raw = llm.generate(&prompt).await.map_err(|e| {
            tracing::error!(error = %e, "document question generation failed");
            Error::Internal(format!("Question generation from document failed: {}", e))
        })?;
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            prompt_chars = prompt.chars().count(),
            "LLM call finished"
        );

        let started = Instant::now();
        let questions = parse_generated_questions(&raw)?;
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "LLM response parsed"
        );

        Ok(DocumentQuestionsResponse {
            questions,
            document_preview: take_chars(&document_text, PREVIEW_CHARS).to_string(),
        })
    }
}

fn join_types(types: &[QuestionType]) -> String {
    types
        .iter()
        .map(QuestionType::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn build_topic_prompt(payload: &GenerateQuestionsPayload) -> String {
    format!(
        "Generate {count} exam questions about {topics} with {difficulty} difficulty.
For each question, provide:
1. The question text
2. 4 possible answers (for multiple choice)
3. The correct answer
4. A brief explanation
5. The question type (one of: {types})

{format}
",
        count = payload.count,
        topics = payload.topics.join(", "),
        difficulty = payload.difficulty,
        types = join_types(&payload.question_types),
        format = RESPONSE_FORMAT,
    )
}

/// Rejects near-empty documents and cuts long ones to the character budget.
pub fn prepare_document_text(text: &str, max_chars: usize) -> Result<String> {
    if trimmed_char_count(text) < MIN_DOCUMENT_CHARS {
        return Err(Error::BadRequest(
            "Document appears to be empty or too short. Please upload a document with sufficient content."
                .to_string(),
        ));
    }
    Ok(truncate_with_marker(text, max_chars))
}

/// Instruction block for the requested types.
///
/// Only one block is ever chosen: open-ended wins over true/false, which wins over
/// multiple choice. Mixed requests therefore get a single type's instructions.
pub fn type_instructions(types: &[QuestionType]) -> &'static str {
    if types.contains(&QuestionType::OpenEnded) {
        OPEN_ENDED_INSTRUCTIONS
    } else if types.contains(&QuestionType::TrueFalse) {
        TRUE_FALSE_INSTRUCTIONS
    } else {
        MULTIPLE_CHOICE_INSTRUCTIONS
    }
}

pub fn build_document_prompt(document_text: &str, options: &DocumentGenerationOptions) -> String {
    format!(
        "Based on the following document content, generate {count} exam questions with {difficulty} difficulty.

Document Content:
{document_text}

{instructions}

For each question, provide:
1. The question text (as 'content')
2. Options array (for multiple choice/true-false) or omit for open-ended
3. The correct answer
4. A brief explanation
5. The question type (one of: {types})

The questions should be based on the content provided in the document above. Make sure the questions test understanding of the key concepts, facts, and information presented in the document.

Format as a JSON array of objects with fields: content, options (if applicable), correct_answer, explanation, topic, difficulty, question_type
",
        count = options.count,
        difficulty = options.difficulty,
        instructions = type_instructions(&options.question_types),
        types = join_types(&options.question_types),
    )
}

/// Text between the first pair of ``` fences, minus a leading `json` hint.
/// Unfenced input is returned trimmed.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let inner = trimmed.splitn(3, "```").nth(1).unwrap_or_default();
    inner.trim_start_matches("json").trim()
}

pub fn parse_generated_questions(raw: &str) -> Result<JsonValue> {
    serde_json::from_str(strip_code_fence(raw)).map_err(|e| {
        tracing::warn!(error = %e, "LLM returned unparseable JSON");
        Error::Internal(format!("Failed to parse generated questions JSON: {}", e))
    })
}
