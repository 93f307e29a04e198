use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for a password-reset link.
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

/// Request body redeeming a reset token.
#[derive(Debug, Deserialize)]
pub struct ResetConfirmRequest {
    pub token: String,
    pub password: String,
}

/// Profile fields a user may change; absent fields are left untouched.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub learning_preferences: Option<serde_json::Value>,
}

/// Public part of the user returned after login or registration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub uuid: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_premium: bool,
}

/// Response returned after login or register.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: PublicUser,
}

/// Full profile as served by GET /api/auth/profile.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub uuid: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_premium: bool,
    pub neural_profile: serde_json::Value,
    pub learning_preferences: Option<serde_json::Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub profile: Profile,
}

/// Generic `{success, message}` body for endpoints with nothing to return.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_serializes_camel_case() {
        let user = PublicUser {
            id: 1,
            uuid: Uuid::new_v4(),
            email: "a@b.com".into(),
            first_name: "Jo".into(),
            last_name: "Xu".into(),
            is_premium: false,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["firstName"], "Jo");
        assert_eq!(json["isPremium"], false);
        assert!(json.get("is_premium").is_none());
    }

    #[test]
    fn register_request_reads_camel_case_body() {
        let payload: RegisterRequest = serde_json::from_str(
            r#"{"email":"a@b.com","password":"Abcdef1!","firstName":"Jo","lastName":"Xu"}"#,
        )
        .unwrap();
        assert_eq!(payload.first_name, "Jo");
        assert_eq!(payload.last_name, "Xu");
    }
}
