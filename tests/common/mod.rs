#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use quizgen_backend::{
    config::ToolPaths,
    models::{
        question::NewQuestion,
        user::{Session, SignUpOutcome},
    },
    providers::{
        identity::IdentityProvider,
        llm::{LlmClient, LlmError},
        supabase::ProviderError,
        table_store::QuestionStore,
    },
    routes,
    services::{
        auth_service::AuthService, document_service::DocumentService,
        generation_service::GenerationService, question_service::QuestionService,
    },
    AppState,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

pub const BOUNDARY: &str = "quizgen-test-boundary";
pub const SUPABASE_URL: &str = "https://project.supabase.co";

/// Accepts exactly one email/password pair.
pub struct FakeIdentity {
    pub email: String,
    pub password: String,
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        _full_name: Option<String>,
    ) -> Result<SignUpOutcome, ProviderError> {
        if email == self.email {
            return Err(ProviderError::from_body(
                422,
                r#"{"code":422,"error_code":"user_already_exists","msg":"User already registered"}"#,
            ));
        }
        Ok(SignUpOutcome {
            user: Some(json!({ "id": "new-user", "email": email })),
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        if email == self.email && password == self.password {
            Ok(Session {
                access_token: Some("access-token".into()),
                refresh_token: Some("refresh-token".into()),
                user: Some(json!({ "id": "user-1", "email": email })),
            })
        } else {
            Err(ProviderError::from_body(
                400,
                r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
            ))
        }
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn reset_password_email(&self, _email: &str) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// In-memory `questions` table with serial ids.
#[derive(Default)]
pub struct FakeStore {
    rows: Mutex<Vec<JsonValue>>,
}

#[async_trait]
impl QuestionStore for FakeStore {
    async fn insert_question(&self, question: &NewQuestion) -> Result<Vec<JsonValue>, ProviderError> {
        let mut rows = self.rows.lock().unwrap();
        let mut row = serde_json::to_value(question).unwrap();
        row["id"] = json!(rows.len() + 1);
        rows.push(row.clone());
        Ok(vec![row])
    }

    async fn questions_for_test(&self, test_id: &str) -> Result<Vec<JsonValue>, ProviderError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|q| q["test_id"] == test_id)
            .cloned()
            .collect())
    }
}

/// Returns a canned reply and keeps every prompt it was sent.
pub struct RecordingLlm {
    reply: Result<String, (u16, String)>,
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingLlm {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err((status, body.to_string())),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for RecordingLlm {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err((status, body)) => Err(LlmError::Api {
                status: *status,
                body: body.clone(),
            }),
        }
    }
}

/// Tool paths that cannot exist, so nothing shells out during tests.
pub fn missing_tools() -> ToolPaths {
    ToolPaths {
        pdftotext: "/nonexistent/pdftotext".into(),
        libreoffice: "/nonexistent/libreoffice".into(),
        tesseract: "/nonexistent/tesseract".into(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub llm: Arc<RecordingLlm>,
}

pub fn app_with(llm: Arc<RecordingLlm>, max_document_chars: usize) -> TestApp {
    let identity: Arc<dyn IdentityProvider> = Arc::new(FakeIdentity {
        email: "ada@example.com".into(),
        password: "correct horse".into(),
    });
    let store: Arc<dyn QuestionStore> = Arc::new(FakeStore::default());
    let llm_client: Arc<dyn LlmClient> = llm.clone();

    let state = AppState {
        auth_service: AuthService::new(Some(identity), Some(SUPABASE_URL.into()), true),
        question_service: QuestionService::new(Some(store)),
        generation_service: GenerationService::new(Some(llm_client), max_document_chars),
        document_service: DocumentService::new(missing_tools()),
    };
    TestApp {
        router: routes::router(state),
        llm,
    }
}

pub fn app() -> TestApp {
    app_with(RecordingLlm::replying("[]"), 10_000)
}

/// Everything unconfigured, as when the environment has no provider keys.
pub fn bare_app() -> Router {
    routes::router(AppState {
        auth_service: AuthService::new(None, None, false),
        question_service: QuestionService::new(None),
        generation_service: GenerationService::new(None, 10_000),
        document_service: DocumentService::new(missing_tools()),
    })
}

pub async fn send(router: &Router, req: Request<Body>) -> (StatusCode, JsonValue) {
    let res = router.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

pub fn json_request(method: &str, uri: &str, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Minimal `.docx` holding one paragraph per entry.
pub fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}
