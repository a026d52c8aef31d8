use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Json},
};
use std::time::Instant;
use validator::Validate;

use crate::{
    dto::question_dto::{DocumentGenerationOptions, GenerateQuestionsPayload},
    error::{Error, Result},
    models::question::NewQuestion,
    AppState,
};

#[axum::debug_handler]
pub async fn generate_questions(
    State(state): State<AppState>,
    Json(payload): Json<GenerateQuestionsPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let res = state.generation_service.generate_from_topics(&payload).await?;
    Ok(Json(res))
}

#[axum::debug_handler]
pub async fn generate_from_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let started = Instant::now();

    let mut file: Option<(String, bytes::Bytes)> = None;
    let mut difficulty = "medium".to_string();
    let mut count: u32 = 5;
    let mut question_types: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                file = Some((filename, data));
            }
            "difficulty" => difficulty = field.text().await?,
            "count" => {
                let raw = field.text().await?;
                count = raw.trim().parse().map_err(|_| {
                    Error::BadRequest(format!("count must be a positive integer, got '{}'", raw))
                })?;
            }
            "question_types" => question_types = Some(field.text().await?),
            _ => {}
        }
    }

    let (filename, data) = file.ok_or_else(|| Error::BadRequest("file is required".to_string()))?;
    let options = DocumentGenerationOptions {
        difficulty,
        count,
        question_types: DocumentGenerationOptions::parse_question_types(question_types.as_deref()),
    };
    options.validate()?;

    tracing::info!(
        filename = %filename,
        size = data.len(),
        difficulty = %options.difficulty,
        count = options.count,
        "generating questions from document"
    );

    let extract_started = Instant::now();
    let text = state
        .document_service
        .extract_text_from_document(&filename, &data)
        .await?;
    tracing::info!(
        elapsed_ms = extract_started.elapsed().as_millis() as u64,
        chars = text.chars().count(),
        "document text extracted"
    );

    let res = state
        .generation_service
        .generate_from_document_text(&text, &options)
        .await?;
    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "document question generation finished"
    );
    Ok(Json(res))
}

#[axum::debug_handler]
pub async fn create_question(
    State(state): State<AppState>,
    Json(payload): Json<NewQuestion>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let question = state.question_service.create_question(&payload).await?;
    Ok(Json(question))
}

#[axum::debug_handler]
pub async fn get_test_questions(
    State(state): State<AppState>,
    Path(test_id): Path<String>,
) -> Result<impl IntoResponse> {
    let questions = state.question_service.get_test_questions(&test_id).await?;
    Ok(Json(questions))
}
