use axum::http::{header::AUTHORIZATION, HeaderMap};

/// Token from an `Authorization: Bearer <token>` header.
///
/// Missing headers, other schemes and empty tokens all yield `None`; the caller
/// decides whether that is an error.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth_str = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
