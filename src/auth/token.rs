use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use time::{Duration, OffsetDateTime};

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"typ":"JWT","alg":"HS256"}"#;

/// Session token payload. The token is the only session state the server
/// keeps: validity is signature + expiry, nothing is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("token expired")]
    Expired,
}

/// Issues and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl,
        }
    }

    fn mac(&self, signing_input: &str) -> HmacSha256 {
        // HMAC accepts keys of any length, new_from_slice cannot fail.
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("hmac key");
        mac.update(signing_input.as_bytes());
        mac
    }

    pub fn issue(&self, user_id: i64, email: &str) -> String {
        self.issue_at(user_id, email, OffsetDateTime::now_utc())
    }

    fn issue_at(&self, user_id: i64, email: &str, now: OffsetDateTime) -> String {
        let claims = Claims {
            user_id,
            email: email.to_owned(),
            iat: now.unix_timestamp(),
            exp: (now + self.ttl).unix_timestamp(),
        };
        // Claims contain no unserializable values, to_string cannot fail.
        let payload = serde_json::to_string(&claims).expect("serialize claims");

        let header_b64 = URL_SAFE_NO_PAD.encode(HEADER);
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload);
        let signing_input = format!("{header_b64}.{payload_b64}");
        let tag = self.mac(&signing_input).finalize().into_bytes();
        let signature_b64 = URL_SAFE_NO_PAD.encode(tag);

        format!("{signing_input}.{signature_b64}")
    }

    /// Verification order matters: segment count, then signature, then
    /// payload decoding, then expiry. A token that fails the signature
    /// check is never inspected further.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (header_b64, payload_b64, signature_b64) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(h), Some(p), Some(s), None) => (h, p, s),
                _ => return Err(TokenError::Malformed),
            };

        // A signature segment that does not even decode counts as a
        // mismatch, so any mutated byte surfaces the same way.
        let presented = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::SignatureMismatch)?;
        self.mac(&format!("{header_b64}.{payload_b64}"))
            .verify_slice(&presented)
            .map_err(|_| TokenError::SignatureMismatch)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if claims.exp <= now.unix_timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
