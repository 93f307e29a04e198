use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::token::Claims;
use crate::{error::ApiError, state::AppState};

/// Extracts and verifies the bearer token, yielding the token claims.
///
/// Deliberately does not touch the database: a handler that needs the user
/// to still exist (or still be active) loads the row itself.
pub struct AuthUser(pub Claims);

/// Accepts `Bearer <token>` with a case-insensitive scheme word.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, rest) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim_start();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(ApiError::AuthRequired)?;

        let token = bearer_token(header).ok_or(ApiError::AuthRequired)?;

        let claims = state.tokens.verify(token).map_err(|e| {
            tracing::warn!(error = %e, "token rejected");
            ApiError::InvalidToken
        })?;

        Ok(AuthUser(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_bearer_header() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
    }

    #[test]
    fn scheme_is_case_insensitive() {
        assert_eq!(bearer_token("bearer tok"), Some("tok"));
        assert_eq!(bearer_token("BEARER tok"), Some("tok"));
        assert_eq!(bearer_token("BeArEr tok"), Some("tok"));
    }

    #[test]
    fn rejects_other_schemes_and_empty_tokens() {
        assert_eq!(bearer_token("Basic dXNlcjpwdw=="), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearertok"), None);
    }

    fn parts_with_auth(header: Option<&str>) -> Parts {
        let mut builder = axum::http::Request::builder().uri("/api/auth/profile");
        if let Some(value) = header {
            builder = builder.header(axum::http::header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn missing_header_requires_authentication() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(None);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("no header must be rejected");
        assert!(matches!(err, ApiError::AuthRequired));
    }

    #[tokio::test]
    async fn garbage_token_is_an_invalid_credential() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(Some("Bearer not.a.token"));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("bad token must be rejected");
        assert!(matches!(err, ApiError::InvalidToken));
    }

    #[tokio::test]
    async fn fresh_token_yields_the_claims() {
        let state = AppState::fake();
        let token = state.tokens.issue(9, "jo@lumenis.app");
        let mut parts = parts_with_auth(Some(&format!("bearer {token}")));
        let AuthUser(claims) = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .expect("fresh token must authenticate");
        assert_eq!(claims.user_id, 9);
        assert_eq!(claims.email, "jo@lumenis.app");
    }
}
