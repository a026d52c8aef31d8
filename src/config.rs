use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    Gemini,
    OpenAi,
}

impl std::str::FromStr for LlmProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            other => Err(format!("unknown LLM provider '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub llm_provider: LlmProviderKind,
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub llm_model: Option<String>,
    pub max_document_chars: usize,
    pub max_upload_bytes: usize,
    pub http_timeout_secs: u64,
    pub tools: ToolPaths,
    pub log_format: LogFormat,
    /// Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
}

/// Executables the document extractor shells out to.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub pdftotext: String,
    pub libreoffice: String,
    pub tesseract: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            pdftotext: "pdftotext".to_string(),
            libreoffice: "libreoffice".to_string(),
            tesseract: "tesseract".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

pub const DEFAULT_MAX_DOCUMENT_CHARS: usize = 10_000;

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let defaults = ToolPaths::default();
        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:8000"),
            supabase_url: get_env_opt("SUPABASE_URL"),
            supabase_key: get_env_opt("SUPABASE_KEY"),
            llm_provider: get_env_parse_or("LLM_PROVIDER", LlmProviderKind::Gemini)?,
            gemini_api_key: get_env_opt("GEMINI_API_KEY"),
            openai_api_key: get_env_opt("OPENAI_API_KEY"),
            llm_model: get_env_opt("LLM_MODEL"),
            max_document_chars: get_env_parse_or("MAX_DOCUMENT_CHARS", DEFAULT_MAX_DOCUMENT_CHARS)?,
            max_upload_bytes: get_env_parse_or("MAX_UPLOAD_BYTES", 50 * 1024 * 1024)?,
            http_timeout_secs: get_env_parse_or("HTTP_TIMEOUT_SECS", 60)?,
            tools: ToolPaths {
                pdftotext: get_env_or("PDFTOTEXT_BIN", &defaults.pdftotext),
                libreoffice: get_env_or("LIBREOFFICE_BIN", &defaults.libreoffice),
                tesseract: get_env_or("TESSERACT_BIN", &defaults.tesseract),
            },
            log_format: match get_env_opt("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            cors_allowed_origins: get_env_list("CORS_ALLOWED_ORIGINS"),
        })
    }

    /// API key for whichever LLM provider is selected.
    pub fn llm_api_key(&self) -> Option<&str> {
        match self.llm_provider {
            LlmProviderKind::Gemini => self.gemini_api_key.as_deref(),
            LlmProviderKind::OpenAi => self.openai_api_key.as_deref(),
        }
    }
}

fn get_env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or(name: &str, default: &str) -> String {
    get_env_opt(name).unwrap_or_else(|| default.to_string())
}

fn get_env_list(name: &str) -> Vec<String> {
    get_env_opt(name)
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
