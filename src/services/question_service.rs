use crate::error::{Error, Result};
use crate::models::question::NewQuestion;
use crate::providers::table_store::QuestionStore;
use serde_json::Value as JsonValue;
use std::sync::Arc;

#[derive(Clone)]
pub struct QuestionService {
    store: Option<Arc<dyn QuestionStore>>,
}

impl QuestionService {
    pub fn new(store: Option<Arc<dyn QuestionStore>>) -> Self {
        Self { store }
    }

    fn store(&self) -> Result<&Arc<dyn QuestionStore>> {
        self.store.as_ref().ok_or_else(|| {
            Error::ServiceUnavailable(
                "Database service is not available. Please check Supabase configuration.".to_string(),
            )
        })
    }

    /// Inserts the question and returns the stored row, generated columns included.
    pub async fn create_question(&self, question: &NewQuestion) -> Result<JsonValue> {
        let store = self.store()?;

        let rows = store.insert_question(question).await.map_err(|e| {
            tracing::error!(test_id = %question.test_id, error = %e, "question insert failed");
            Error::Internal(format!("Question creation failed: {}", e))
        })?;

        let created = rows
            .into_iter()
            .next()
            .ok_or_else(|| Error::Internal("Failed to create question".to_string()))?;
        tracing::info!(test_id = %question.test_id, id = %created["id"], "question created");
        Ok(created)
    }

    pub async fn get_test_questions(&self, test_id: &str) -> Result<Vec<JsonValue>> {
        let store = self.store()?;

        let questions = store.questions_for_test(test_id).await.map_err(|e| {
            tracing::error!(test_id, error = %e, "question lookup failed");
            Error::Internal(format!("Failed to fetch questions: {}", e))
        })?;
        tracing::debug!(test_id, count = questions.len(), "questions fetched");
        Ok(questions)
    }
}
