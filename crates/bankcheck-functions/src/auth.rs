// Bearer-token verification for the serverless endpoints.
//
// Access tokens are HS256 JWTs issued by the hosted auth platform with
// `sub` (user id), `email`, and `exp` claims.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Identity decoded from a platform access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String,
    email: String,
    exp: u64,
}

/// Extract a bearer token from request headers.
pub fn extract_bearer(headers: &axum::http::HeaderMap) -> Option<String> {
    let auth = headers.get("authorization")?.to_str().ok()?;
    auth.strip_prefix("Bearer ").map(|t| t.to_string())
}

/// Verify and decode an access token. Returns `None` for invalid or
/// expired tokens.
pub fn decode_access_token(token: &str, secret: &str) -> Option<Identity> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = jsonwebtoken::decode::<AccessClaims>(token, &key, &validation).ok()?;
    Some(Identity {
        user_id: data.claims.sub,
        email: data.claims.email,
    })
}

/// Sign an access token. Used by tests and local tooling.
pub fn sign_access_token(
    user_id: &str,
    email: &str,
    secret: &str,
    expires_in_secs: u64,
) -> String {
    let claims = AccessClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: chrono::Utc::now().timestamp() as u64 + expires_in_secs,
    };
    let header = jsonwebtoken::Header::new(Algorithm::HS256);
    let key = jsonwebtoken::EncodingKey::from_secret(secret.as_bytes());
    jsonwebtoken::encode(&header, &claims, &key).expect("HS256 signing cannot fail")
}
