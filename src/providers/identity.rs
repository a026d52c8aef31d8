use super::supabase::{ensure_success, read_json, ProviderError, SupabaseClient};
use crate::models::user::{Session, SignUpOutcome};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value as JsonValue};

/// Credential store and session issuer the auth routes delegate to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<String>,
    ) -> Result<SignUpOutcome, ProviderError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError>;

    /// Revokes the session the access token belongs to.
    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError>;

    async fn reset_password_email(&self, email: &str) -> Result<(), ProviderError>;
}

/// Supabase Auth (GoTrue) over its REST API.
#[derive(Clone)]
pub struct SupabaseAuth {
    client: SupabaseClient,
}

impl SupabaseAuth {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<String>,
    ) -> Result<SignUpOutcome, ProviderError> {
        let payload = json!({
            "email": email,
            "password": password,
            "data": { "full_name": full_name },
        });

        let res = self
            .client
            .request(Method::POST, "auth/v1/signup", None)?
            .json(&payload)
            .send()
            .await?;
        let body: JsonValue = read_json(res).await?;
        Ok(SignUpOutcome::from_provider_body(body))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        let res = self
            .client
            .request(Method::POST, "auth/v1/token", None)?
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        read_json(res).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        let res = self
            .client
            .request(Method::POST, "auth/v1/logout", Some(access_token))?
            .send()
            .await?;
        ensure_success(res).await?;
        Ok(())
    }

    async fn reset_password_email(&self, email: &str) -> Result<(), ProviderError> {
        let res = self
            .client
            .request(Method::POST, "auth/v1/recover", None)?
            .json(&json!({ "email": email }))
            .send()
            .await?;
        ensure_success(res).await?;
        Ok(())
    }
}
