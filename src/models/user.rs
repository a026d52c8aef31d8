use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Session issued by the identity provider on a password sign-in.
///
/// The user record is passed through untouched; the service keeps no copy of it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<JsonValue>,
}

/// Result of a sign-up. Depending on the provider's email confirmation setting
/// the answer is either a bare user or a session wrapping the user.
#[derive(Debug, Clone, Default)]
pub struct SignUpOutcome {
    pub user: Option<JsonValue>,
}

impl SignUpOutcome {
    pub fn from_provider_body(body: JsonValue) -> Self {
        if let Some(user) = body.get("user").filter(|u| !u.is_null()) {
            return Self {
                user: Some(user.clone()),
            };
        }
        if body.get("id").is_some() {
            return Self { user: Some(body) };
        }
        Self { user: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sign_up_accepts_bare_user_or_session() {
        let bare = SignUpOutcome::from_provider_body(json!({"id": "u1", "email": "a@b.c"}));
        assert_eq!(bare.user.unwrap()["id"], "u1");

        let wrapped = SignUpOutcome::from_provider_body(
            json!({"access_token": "t", "user": {"id": "u2"}}),
        );
        assert_eq!(wrapped.user.unwrap()["id"], "u2");

        let empty = SignUpOutcome::from_provider_body(json!({}));
        assert!(empty.user.is_none());
    }
}
