use super::supabase::{read_json, ProviderError, SupabaseClient};
use crate::models::question::NewQuestion;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value as JsonValue;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Inserts one row and returns the rows the store reports as inserted, undecoded.
    async fn insert_question(
        &self,
        question: &NewQuestion,
    ) -> Result<Vec<JsonValue>, ProviderError>;

    async fn questions_for_test(&self, test_id: &str) -> Result<Vec<JsonValue>, ProviderError>;
}

/// `questions` table behind Supabase PostgREST.
#[derive(Clone)]
pub struct SupabaseQuestionStore {
    client: SupabaseClient,
    path: String,
}

impl SupabaseQuestionStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self::with_table(client, "questions")
    }

    pub fn with_table(client: SupabaseClient, table: &str) -> Self {
        Self {
            client,
            path: format!("rest/v1/{}", table),
        }
    }
}

#[async_trait]
impl QuestionStore for SupabaseQuestionStore {
    async fn insert_question(
        &self,
        question: &NewQuestion,
    ) -> Result<Vec<JsonValue>, ProviderError> {
        let res = self
            .client
            .request(Method::POST, &self.path, None)?
            .header("Prefer", "return=representation")
            .json(question)
            .send()
            .await?;
        read_json(res).await
    }

    async fn questions_for_test(&self, test_id: &str) -> Result<Vec<JsonValue>, ProviderError> {
        let filter = format!("eq.{}", test_id);
        let res = self
            .client
            .request(Method::GET, &self.path, None)?
            .query(&[("select", "*"), ("test_id", filter.as_str())])
            .send()
            .await?;
        read_json(res).await
    }
}
