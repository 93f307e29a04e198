use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use rand::RngCore;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use crate::{error::ApiError, state::AppState};

use super::dto::{
    AuthResponse, LoginRequest, MessageResponse, ProfileResponse, RegisterRequest,
    ResetConfirmRequest, ResetRequest, UpdateProfileRequest,
};
use super::extractors::AuthUser;
use super::password::{hash_password, verify_password};
use super::repo::{is_unique_violation, User};
use super::services::{validate_profile_update, validate_registration};

const RESET_TOKEN_TTL: Duration = Duration::hours(1);

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/profile", get(get_profile).put(update_profile))
        .route("/auth/password-reset/request", post(request_password_reset))
        .route("/auth/password-reset/confirm", post(confirm_password_reset))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let errors = validate_registration(&payload);
    if !errors.is_empty() {
        warn!(email = %payload.email, ?errors, "registration rejected");
        return Err(ApiError::Validation(errors));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::DuplicateEmail);
    }

    let hash = hash_password(&payload.password)?;
    let user = match User::create(
        &state.db,
        &payload.email,
        &hash,
        payload.first_name.trim(),
        payload.last_name.trim(),
    )
    .await
    {
        Ok(u) => u,
        Err(e) if is_unique_violation(&e) => return Err(ApiError::DuplicateEmail),
        Err(e) => return Err(e.into()),
    };

    let token = state.tokens.issue(user.id, &user.email);

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(Json(AuthResponse {
        success: true,
        message: "Registration successful".into(),
        token,
        user: user.public(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    // Unknown email and wrong password answer identically so the endpoint
    // cannot be used to enumerate accounts.
    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login with unknown email");
            ApiError::InvalidCredentials
        })?;

    // Lockout wins over everything, including a correct password.
    let now = OffsetDateTime::now_utc();
    if user.is_locked(now) {
        warn!(user_id = user.id, "login attempt on locked account");
        return Err(ApiError::AccountLocked);
    }

    if !user.is_active {
        warn!(user_id = user.id, "login attempt on deactivated account");
        return Err(ApiError::AccountDeactivated);
    }

    if !verify_password(&payload.password, &user.password_hash)? {
        User::record_login_failure(
            &state.db,
            user.id,
            state.config.lockout.max_attempts,
            state.config.lockout.lock_minutes,
        )
        .await?;
        warn!(user_id = user.id, attempts = user.login_attempts + 1, "wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    User::record_login_success(&state.db, user.id).await?;
    let token = state.tokens.issue(user.id, &user.email);

    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        success: true,
        message: "Login successful".into(),
        token,
        user: user.public(),
    }))
}

#[instrument(skip(state, auth), fields(user_id = auth.0.user_id))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = User::find_by_id(&state.db, auth.0.user_id)
        .await?
        .ok_or(ApiError::NotFound("Profile"))?;

    Ok(Json(ProfileResponse {
        success: true,
        profile: user.profile(),
    }))
}

#[instrument(skip(state, auth, payload), fields(user_id = auth.0.user_id))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let errors = validate_profile_update(&payload);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let user = User::update_profile(
        &state.db,
        auth.0.user_id,
        payload.first_name.as_deref().map(str::trim),
        payload.last_name.as_deref().map(str::trim),
        payload.learning_preferences.as_ref(),
    )
    .await?
    .ok_or(ApiError::NotFound("Profile"))?;

    info!(user_id = user.id, "profile updated");
    Ok(Json(ProfileResponse {
        success: true,
        profile: user.profile(),
    }))
}

fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[instrument(skip(state, payload))]
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<ResetRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();

    // The response is the same whether or not the email exists.
    if let Some(user) = User::find_by_email(&state.db, &email).await? {
        let token = generate_reset_token();
        let expires = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;
        User::set_reset_token(&state.db, user.id, &token, expires).await?;
        state
            .mailer
            .send(
                &user.email,
                "Lumenis Academy password reset",
                &format!("Use this token within one hour to reset your password: {token}"),
            )
            .await?;
        info!(user_id = user.id, "reset token issued");
    }

    Ok(Json(MessageResponse {
        success: true,
        message: "If the email exists, a reset link has been sent".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<ResetConfirmRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.password.len() < 8 {
        return Err(ApiError::Validation(vec![
            "Password must be at least 8 characters".into(),
        ]));
    }

    let user = User::find_by_reset_token(&state.db, &payload.token)
        .await?
        .ok_or(ApiError::InvalidResetToken)?;

    let hash = hash_password(&payload.password)?;
    User::redeem_reset_token(&state.db, user.id, &hash).await?;

    info!(user_id = user.id, "password reset completed");
    Ok(Json(MessageResponse {
        success: true,
        message: "Password updated".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::default_neural_profile;
    use crate::auth::dto::PublicUser;
    use uuid::Uuid;

    #[test]
    fn auth_response_matches_the_client_contract() {
        let body = AuthResponse {
            success: true,
            message: "Login successful".into(),
            token: "a.b.c".into(),
            user: PublicUser {
                id: 3,
                uuid: Uuid::new_v4(),
                email: "a@b.com".into(),
                first_name: "Jo".into(),
                last_name: "Xu".into(),
                is_premium: false,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["token"], "a.b.c");
        assert_eq!(json["user"]["isPremium"], false);
    }

    #[test]
    fn reset_tokens_are_64_hex_chars_and_unique() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn profile_response_nests_the_neural_profile() {
        let body = ProfileResponse {
            success: true,
            profile: crate::auth::dto::Profile {
                uuid: Uuid::new_v4(),
                email: "a@b.com".into(),
                first_name: "Jo".into(),
                last_name: "Xu".into(),
                is_premium: true,
                neural_profile: default_neural_profile(),
                learning_preferences: None,
                created_at: OffsetDateTime::now_utc(),
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["profile"]["neuralProfile"]["dopamina"], 50);
        assert_eq!(json["profile"]["isPremium"], true);
    }
}
