use crate::dto::auth_dto::{LoginResponse, MessageResponse, RegisterResponse};
use crate::error::{Error, Result};
use crate::providers::identity::IdentityProvider;
use crate::providers::supabase::{ProviderError, TransportFault};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

const ALREADY_EXISTS_CODES: &[&str] = &["user_already_exists", "email_exists"];
const INVALID_CREDENTIALS_CODES: &[&str] = &["invalid_credentials", "invalid_grant"];
const EMAIL_NOT_CONFIRMED_CODES: &[&str] = &["email_not_confirmed"];

const TLS_ERROR: &str =
    "SSL/TLS connection error. Please check your network settings or firewall.";

/// Forwards account operations to the identity provider and turns its failures
/// into client-facing errors.
#[derive(Clone)]
pub struct AuthService {
    provider: Option<Arc<dyn IdentityProvider>>,
    provider_url: Option<String>,
    key_set: bool,
}

impl AuthService {
    pub fn new(
        provider: Option<Arc<dyn IdentityProvider>>,
        provider_url: Option<String>,
        key_set: bool,
    ) -> Self {
        Self {
            provider,
            provider_url,
            key_set,
        }
    }

    fn configured_url(&self) -> &str {
        self.provider_url.as_deref().unwrap_or("Not set")
    }

    fn provider_or(&self, message: &str) -> Result<&Arc<dyn IdentityProvider>> {
        self.provider
            .as_ref()
            .ok_or_else(|| Error::ServiceUnavailable(message.to_string()))
    }

    /// Reports whether a provider client exists. No request is made.
    pub fn connection_status(&self) -> JsonValue {
        if self.provider.is_some() {
            json!({
                "status": "success",
                "message": "Supabase client is initialized",
                "url": self.configured_url(),
                "url_configured": self.provider_url.is_some(),
                "note": "Client initialized. Actual connection will be tested on login/register.",
            })
        } else {
            json!({
                "status": "error",
                "message": "Supabase client is not initialized. Check your .env file for SUPABASE_URL and SUPABASE_KEY",
                "url": self.configured_url(),
                "key_set": self.key_set,
            })
        }
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: Option<String>,
    ) -> Result<RegisterResponse> {
        let provider = self.provider_or(
            "Cannot connect to authentication service. Please check your network connection and try again.",
        )?;

        tracing::info!(email, "registering user");
        let outcome = provider
            .sign_up(email, password, full_name)
            .await
            .map_err(|e| {
                tracing::warn!(email, error = %e, "registration rejected");
                register_error(e)
            })?;

        Ok(RegisterResponse {
            message: "User registered successfully".to_string(),
            user: outcome.user,
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let provider = self.provider_or(
            "Authentication service is not configured. Please check Supabase configuration in backend.",
        )?;

        tracing::info!(email, "password sign-in");
        let session = provider
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| {
                tracing::warn!(email, error = %e, "sign-in failed");
                self.login_error(e)
            })?;

        if session.access_token.is_none() {
            return Err(Error::Unauthorized(
                "Login failed: Invalid credentials or no session created".to_string(),
            ));
        }

        Ok(LoginResponse {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            user: session.user,
        })
    }

    /// Revokes the caller's session when a token is supplied.
    pub async fn logout(&self, access_token: Option<&str>) -> Result<MessageResponse> {
        let provider = self.provider_or("Authentication service is not configured.")?;

        if let Some(token) = access_token {
            provider.sign_out(token).await.map_err(|e| {
                tracing::error!(error = %e, "sign-out failed");
                Error::Internal(format!("Logout failed: {}", e))
            })?;
        } else {
            tracing::debug!("logout without bearer token");
        }

        Ok(MessageResponse::new("Logged out successfully"))
    }

    pub async fn reset_password(&self, email: &str) -> Result<MessageResponse> {
        let provider = self.provider_or("Authentication service is not configured.")?;

        tracing::info!(email, "sending password reset email");
        provider.reset_password_email(email).await.map_err(|e| {
            tracing::warn!(email, error = %e, "password reset failed");
            Error::BadRequest(format!("Password reset failed: {}", e))
        })?;

        Ok(MessageResponse::new("Password reset email sent"))
    }

    fn login_error(&self, err: ProviderError) -> Error {
        let message = err.to_string();

        // legacy deployments report this as `invalid_grant`
        if err.has_code(EMAIL_NOT_CONFIRMED_CODES) || message.contains("Email not confirmed") {
            return Error::Unauthorized(message);
        }
        if err.has_code(INVALID_CREDENTIALS_CODES)
            || (err.code().is_none() && message.contains("Invalid login credentials"))
        {
            return Error::Unauthorized("Invalid email or password".to_string());
        }

        match err.transport_fault() {
            Some(TransportFault::Dns) => Error::ServiceUnavailable(format!(
                "Cannot resolve Supabase hostname. Please check if Supabase URL is correct: {}",
                self.configured_url()
            )),
            Some(TransportFault::Timeout) => Error::ServiceUnavailable(
                "Connection to authentication service timed out. Please check your firewall settings or try again."
                    .to_string(),
            ),
            Some(TransportFault::Tls) => Error::ServiceUnavailable(TLS_ERROR.to_string()),
            Some(TransportFault::Refused) => Error::ServiceUnavailable(
                "Connection to Supabase was refused. Please check your firewall or network settings."
                    .to_string(),
            ),
            Some(TransportFault::Other) | None => {
                Error::Internal(format!("Authentication error: {}", message))
            }
        }
    }
}

fn register_error(err: ProviderError) -> Error {
    let message = err.to_string();
    let lower = message.to_lowercase();

    if err.has_code(ALREADY_EXISTS_CODES)
        || (err.code().is_none()
            && (lower.contains("already registered") || lower.contains("already exists")))
    {
        return Error::BadRequest(
            "An account with this email already exists. Please login instead.".to_string(),
        );
    }

    match err.transport_fault() {
        Some(TransportFault::Dns | TransportFault::Refused | TransportFault::Other) => {
            Error::ServiceUnavailable(
                "Cannot reach Supabase service. This might be a temporary network issue. Please try again in a moment."
                    .to_string(),
            )
        }
        Some(TransportFault::Timeout) => Error::ServiceUnavailable(
            "Connection to registration service timed out. Please try again.".to_string(),
        ),
        Some(TransportFault::Tls) => Error::ServiceUnavailable(TLS_ERROR.to_string()),
        None => Error::BadRequest(format!("Registration failed: {}", message)),
    }
}
