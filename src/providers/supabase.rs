use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::error::Error as StdError;
use std::io;
use url::Url;

/// Failure talking to Supabase (auth or PostgREST).
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider answered with a non-success status.
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The request never got an answer.
    #[error("{detail}")]
    Transport {
        fault: TransportFault,
        detail: String,
    },

    #[error("Invalid response from provider: {0}")]
    Decode(String),

    #[error("Invalid provider URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFault {
    Dns,
    Timeout,
    Tls,
    Refused,
    Other,
}

impl TransportFault {
    /// Timeouts and refused connections are known from typed error data. DNS and TLS
    /// failures are only visible in the error chain text.
    pub fn classify(timed_out: bool, refused: bool, chain: &str) -> Self {
        if timed_out {
            return TransportFault::Timeout;
        }
        if refused {
            return TransportFault::Refused;
        }
        let lower = chain.to_lowercase();
        if [
            "dns error",
            "failed to lookup address",
            "name or service not known",
            "getaddrinfo",
            "no such host",
        ]
        .iter()
        .any(|p| lower.contains(p))
        {
            TransportFault::Dns
        } else if ["certificate", "tls", "ssl"].iter().any(|p| lower.contains(p)) {
            TransportFault::Tls
        } else if lower.contains("connection refused") {
            TransportFault::Refused
        } else if lower.contains("timed out") || lower.contains("timeout") {
            TransportFault::Timeout
        } else {
            TransportFault::Other
        }
    }
}

impl ProviderError {
    pub fn code(&self) -> Option<&str> {
        match self {
            ProviderError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn has_code(&self, codes: &[&str]) -> bool {
        self.code().map(|c| codes.contains(&c)).unwrap_or(false)
    }

    pub fn transport_fault(&self) -> Option<TransportFault> {
        match self {
            ProviderError::Transport { fault, .. } => Some(*fault),
            _ => None,
        }
    }

    /// Builds an `Api` error from the status and raw body of a failed response.
    pub fn from_body(status: u16, body: &str) -> Self {
        let parsed: Option<JsonValue> = serde_json::from_str(body).ok();
        let field = |name: &str| -> Option<String> {
            parsed
                .as_ref()
                .and_then(|v| v.get(name))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        };

        let code = field("error_code")
            .or_else(|| field("code"))
            .or_else(|| field("error"));
        let message = field("msg")
            .or_else(|| field("message"))
            .or_else(|| field("error_description"))
            .or_else(|| field("error"))
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("provider returned status {}", status)
                } else {
                    body.trim().to_string()
                }
            });

        ProviderError::Api {
            status,
            code,
            message,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ProviderError::Decode(error_chain(&err));
        }
        let detail = error_chain(&err);
        let refused = io_error_kind(&err) == Some(io::ErrorKind::ConnectionRefused);
        ProviderError::Transport {
            fault: TransportFault::classify(err.is_timeout(), refused, &detail),
            detail,
        }
    }
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join(": ")
}

fn io_error_kind(err: &(dyn StdError + 'static)) -> Option<io::ErrorKind> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        current = e.source();
    }
    None
}

/// Shared connection details for a Supabase project.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: &str, api_key: String, http: Client) -> Result<Self, ProviderError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Request carrying the project `apikey` header and the given bearer token.
    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
    ) -> Result<RequestBuilder, ProviderError> {
        let url = self.base_url.join(path)?;
        Ok(self
            .http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer.unwrap_or(&self.api_key)))
    }
}

pub(crate) async fn ensure_success(res: Response) -> Result<Response, ProviderError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(ProviderError::from_body(status.as_u16(), &body))
}

pub(crate) async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T, ProviderError> {
    let res = ensure_success(res).await?;
    let text = res.text().await?;
    serde_json::from_str(&text).map_err(|e| ProviderError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_gotrue_error_code_and_message() {
        let err = ProviderError::from_body(
            400,
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        );
        assert!(err.has_code(&["invalid_credentials"]));
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[test]
    fn reads_legacy_oauth_style_errors() {
        let err = ProviderError::from_body(
            400,
            r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#,
        );
        assert_eq!(err.code(), Some("invalid_grant"));
        assert_eq!(err.to_string(), "Email not confirmed");
    }

    #[test]
    fn falls_back_to_raw_body_or_status() {
        let err = ProviderError::from_body(502, "Bad Gateway");
        assert_eq!(err.to_string(), "Bad Gateway");
        assert_eq!(err.code(), None);

        let err = ProviderError::from_body(500, "");
        assert_eq!(err.to_string(), "provider returned status 500");
    }

    #[test]
    fn classifies_transport_faults() {
        assert_eq!(TransportFault::classify(true, false, "anything"), TransportFault::Timeout);
        assert_eq!(TransportFault::classify(false, true, "anything"), TransportFault::Refused);
        assert_eq!(
            TransportFault::classify(
                false,
                false,
                "error sending request: error trying to connect: dns error: failed to lookup address information"
            ),
            TransportFault::Dns
        );
        assert_eq!(
            TransportFault::classify(false, false, "invalid peer certificate: UnknownIssuer"),
            TransportFault::Tls
        );
        assert_eq!(
            TransportFault::classify(
                false,
                false,
                "tcp connect error: Connection refused (os error 111)"
            ),
            TransportFault::Refused
        );
        assert_eq!(TransportFault::classify(false, false, "broken pipe"), TransportFault::Other);
    }

    #[test]
    fn normalizes_base_url_for_joins() {
        let client = SupabaseClient::new(
            "https://project.supabase.co",
            "key".to_string(),
            Client::new(),
        )
        .unwrap();
        assert_eq!(
            client.base_url().join("auth/v1/signup").unwrap().as_str(),
            "https://project.supabase.co/auth/v1/signup"
        );

        let nested = SupabaseClient::new("http://localhost:54321/base", "key".into(), Client::new())
            .unwrap();
        assert_eq!(
            nested.base_url().join("rest/v1/questions").unwrap().as_str(),
            "http://localhost:54321/base/rest/v1/questions"
        );
    }

    #[test]
    fn rejects_unparseable_urls() {
        assert!(matches!(
            SupabaseClient::new("not a url", "key".into(), Client::new()),
            Err(ProviderError::InvalidUrl(_))
        ));
    }
}
