pub mod auth;
pub mod health;
pub mod questions;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

/// All application routes, without transport layers.
pub fn router(state: AppState) -> Router {
    let auth_api = Router::new()
        .route("/test-connection", get(health::test_connection))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/reset-password", post(auth::reset_password));

    let questions_api = Router::new()
        .route("/generate", post(questions::generate_questions))
        .route(
            "/generate-from-document",
            post(questions::generate_from_document),
        )
        .route("/create", post(questions::create_question))
        .route("/test/:test_id", get(questions::get_test_questions));

    Router::new()
        .route("/health", get(health::health))
        .nest("/auth", auth_api)
        .nest("/questions", questions_api)
        .with_state(state)
}
