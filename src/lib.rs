pub mod config;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod providers;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::providers::{
    identity::{IdentityProvider, SupabaseAuth},
    llm::build_llm_client,
    supabase::SupabaseClient,
    table_store::{QuestionStore, SupabaseQuestionStore},
};
use crate::services::{
    auth_service::AuthService, document_service::DocumentService,
    generation_service::GenerationService, question_service::QuestionService,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub question_service: QuestionService,
    pub generation_service: GenerationService,
    pub document_service: DocumentService,
}

impl AppState {
    /// Builds every outbound client once. Missing or unusable provider settings
    /// leave the matching service unconfigured; its routes then answer 503.
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        let supabase = supabase_client(config, http_client.clone());
        let identity: Option<Arc<dyn IdentityProvider>> = supabase
            .clone()
            .map(|c| Arc::new(SupabaseAuth::new(c)) as Arc<dyn IdentityProvider>);
        let store: Option<Arc<dyn QuestionStore>> = supabase
            .map(|c| Arc::new(SupabaseQuestionStore::new(c)) as Arc<dyn QuestionStore>);

        Ok(Self {
            auth_service: AuthService::new(
                identity,
                config.supabase_url.clone(),
                config.supabase_key.is_some(),
            ),
            question_service: QuestionService::new(store),
            generation_service: GenerationService::new(
                build_llm_client(config, http_client),
                config.max_document_chars,
            ),
            document_service: DocumentService::new(config.tools.clone()),
        })
    }
}

fn supabase_client(config: &Config, http: Client) -> Option<SupabaseClient> {
    let (Some(url), Some(key)) = (&config.supabase_url, &config.supabase_key) else {
        tracing::warn!(
            url_set = config.supabase_url.is_some(),
            key_set = config.supabase_key.is_some(),
            "SUPABASE_URL or SUPABASE_KEY missing; auth and question storage disabled"
        );
        return None;
    };

    match SupabaseClient::new(url, key.clone(), http) {
        Ok(client) => {
            tracing::info!(url = %client.base_url(), "Supabase client initialized");
            Some(client)
        }
        Err(e) => {
            tracing::error!(url = %url, error = %e, "could not initialize Supabase client");
            None
        }
    }
}
