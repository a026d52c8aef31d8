pub mod auth_service;
pub mod document_service;
pub mod generation_service;
pub mod question_service;
