// Auth backends.
//
// The hosted backend talks to the platform's auth API over HTTP. The
// demo backend synthesizes sessions locally and is used whenever the
// platform is unconfigured — demo mode must work with zero network
// access.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Identity claims attached to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub user_metadata: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    /// Read a string field from the metadata map.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata.get(key).and_then(|v| v.as_str())
    }
}

/// Server-issued proof of authentication. Held transiently; the
/// application re-derives it through the backend on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user: UserProfile,
}

/// Sign-up form data.
#[derive(Debug, Clone, Default)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub plan_id: Option<String>,
}

/// Auth errors surfaced to the sign-in/sign-up forms.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Platform configuration is missing")]
    ConfigMissing,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Too many attempts. Please wait {retry_after_secs} seconds and try again")]
    RateLimited { retry_after_secs: u64 },

    #[error("Please confirm your email address, then sign in")]
    EmailNotConfirmed,

    #[error("Network error: {0}")]
    Network(String),

    #[error("{0}")]
    Unexpected(String),
}

/// Parse a retry countdown out of provider error text, e.g.
/// "For security purposes, you can only request this after 27 seconds".
pub(crate) fn retry_after_from_text(message: &str) -> Option<u64> {
    let mut digits = String::new();
    for ch in message.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else if !digits.is_empty() {
            break;
        }
    }
    digits.parse().ok()
}

/// The auth operations the session client needs.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;
    async fn sign_up(&self, request: SignUpRequest) -> Result<Session, AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
}

// ─── Hosted backend ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: UserProfile,
}

/// HTTP backend against the hosted auth platform.
pub struct HostedAuthBackend {
    http: reqwest::Client,
    base_url: String,
    stored: Arc<RwLock<Option<Session>>>,
}

impl HostedAuthBackend {
    /// Build from configuration. Fails with `ConfigMissing` when the
    /// platform URL or anon key is absent or invalid — callers fall
    /// back to the demo backend rather than crash.
    pub fn from_config(config: &bankcheck_core::config::PlatformConfig) -> Result<Self, AuthError> {
        if !config.is_configured() {
            return Err(AuthError::ConfigMissing);
        }
        Ok(Self::new(
            config.platform_url.as_deref().unwrap_or_default(),
            config.anon_key.as_deref().unwrap_or_default(),
        ))
    }

    /// Build from a platform URL and anon key.
    pub fn new(platform_url: &str, anon_key: &str) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        if let Ok(val) = reqwest::header::HeaderValue::from_str(anon_key) {
            headers.insert("apikey", val);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            base_url: format!("{}/auth/v1", platform_url.trim_end_matches('/')),
            stored: Arc::new(RwLock::new(None)),
        }
    }

    /// Map a non-2xx auth response to a typed error.
    async fn error_from_response(resp: reqwest::Response) -> AuthError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("error_description")
                    .or_else(|| v.get("msg"))
                    .or_else(|| v.get("message"))?
                    .as_str()
                    .map(|s| s.to_string())
            })
            .unwrap_or(body);

        if status == 429 {
            return AuthError::RateLimited {
                retry_after_secs: retry_after_from_text(&message).unwrap_or(60),
            };
        }
        if message.contains("Email not confirmed") {
            return AuthError::EmailNotConfirmed;
        }
        if status == 400 || status == 401 {
            return AuthError::InvalidCredentials;
        }
        AuthError::Unexpected(message)
    }

    async fn store_session(&self, session: &Session) {
        *self.stored.write().await = Some(session.clone());
    }
}

#[async_trait]
impl AuthBackend for HostedAuthBackend {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.stored.read().await.clone())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let resp = self
            .http
            .post(format!("{}/token?grant_type=password", self.base_url))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::Unexpected(e.to_string()))?;
        let session = Session {
            access_token: token.access_token,
            user: token.user,
        };
        self.store_session(&session).await;
        Ok(session)
    }

    async fn sign_up(&self, request: SignUpRequest) -> Result<Session, AuthError> {
        let mut metadata = serde_json::Map::new();
        metadata.insert("full_name".into(), serde_json::json!(request.name));
        if let Some(company) = &request.company {
            metadata.insert("company".into(), serde_json::json!(company));
        }
        if let Some(job_title) = &request.job_title {
            metadata.insert("job_title".into(), serde_json::json!(job_title));
        }
        if let Some(plan_id) = &request.plan_id {
            metadata.insert("plan_id".into(), serde_json::json!(plan_id));
        }

        let resp = self
            .http
            .post(format!("{}/signup", self.base_url))
            .json(&serde_json::json!({
                "email": request.email,
                "password": request.password,
                "data": metadata,
            }))
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::Unexpected(e.to_string()))?;
        let session = Session {
            access_token: token.access_token,
            user: token.user,
        };
        self.store_session(&session).await;
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        // Local state goes first: remote sign-out is best-effort and the
        // caller forces cleanup regardless of the outcome.
        let session = self.stored.write().await.take();

        let Some(session) = session else {
            return Ok(());
        };

        let resp = self
            .http
            .post(format!("{}/logout", self.base_url))
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AuthError::Network(format!(
                "sign-out returned status {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

// ─── Demo backend ───────────────────────────────────────────────────

/// Local backend used when the platform is unconfigured. Accepts any
/// credentials and synthesizes a session without touching the network.
#[derive(Debug, Default)]
pub struct DemoBackend {
    stored: RwLock<Option<Session>>,
}

impl DemoBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn demo_session(email: &str, name: &str) -> Session {
        let mut metadata = serde_json::Map::new();
        metadata.insert("full_name".into(), serde_json::json!(name));
        Session {
            access_token: format!("demo-token-{}", bankcheck_core::id::generate_id_with_length(8)),
            user: UserProfile {
                id: format!("demo-{}", bankcheck_core::id::generate_id_with_length(8)),
                email: email.to_string(),
                user_metadata: metadata,
            },
        }
    }
}

#[async_trait]
impl AuthBackend for DemoBackend {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.stored.read().await.clone())
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<Session, AuthError> {
        let session = Self::demo_session(email, "Demo User");
        *self.stored.write().await = Some(session.clone());
        Ok(session)
    }

    async fn sign_up(&self, request: SignUpRequest) -> Result<Session, AuthError> {
        let mut session = Self::demo_session(&request.email, &request.name);
        if let Some(company) = &request.company {
            session
                .user
                .user_metadata
                .insert("company".into(), serde_json::json!(company));
        }
        if let Some(job_title) = &request.job_title {
            session
                .user
                .user_metadata
                .insert("job_title".into(), serde_json::json!(job_title));
        }
        *self.stored.write().await = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        *self.stored.write().await = None;
        Ok(())
    }
}
