pub mod auth_dto;
pub mod question_dto;
