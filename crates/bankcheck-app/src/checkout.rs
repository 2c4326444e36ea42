// Checkout initiator.
//
// One-shot, user-initiated flow: resolve the plan's billing price,
// request a checkout-session id from the functions endpoint, then hand
// the id to the payment platform's client-side redirect. No retries —
// the user may re-trigger manually.

use std::sync::Arc;

use bankcheck_billing::catalog;
use bankcheck_billing::types::{CreateCheckoutSessionRequest, CreateCheckoutSessionResponse};
use bankcheck_core::config::PlatformConfig;

use crate::backend::Session;

/// Checkout failure shown to the user. Endpoint and redirect messages
/// travel through verbatim.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CheckoutError {
    #[error("Plan \"{0}\" has no billing price configured")]
    MissingPriceId(String),

    #[error("Checkout is not available without platform configuration")]
    Unconfigured,

    #[error("{0}")]
    Endpoint(String),

    #[error("{0}")]
    Redirect(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// The payment platform's client-side redirect API.
pub trait RedirectGateway: Send + Sync {
    /// Hand off a checkout-session id; the platform takes over the
    /// browser from here. Errors are the platform's own message.
    fn begin_checkout(&self, session_id: &str) -> Result<(), String>;
}

pub struct CheckoutInitiator {
    http: reqwest::Client,
    functions_base: Option<String>,
    redirect: Arc<dyn RedirectGateway>,
}

impl CheckoutInitiator {
    pub fn new(config: &PlatformConfig, redirect: Arc<dyn RedirectGateway>) -> Self {
        Self {
            http: reqwest::Client::new(),
            functions_base: config.functions_base(),
            redirect,
        }
    }

    /// Start checkout for a catalog plan.
    pub async fn start(
        &self,
        plan_id: &str,
        session: &Session,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<(), CheckoutError> {
        // Resolve the price before any network call.
        let entry = catalog::entry_for_plan(plan_id)
            .ok_or_else(|| CheckoutError::MissingPriceId(plan_id.to_string()))?;
        let price_id = entry
            .billing_price_id
            .ok_or_else(|| CheckoutError::MissingPriceId(plan_id.to_string()))?;

        let base = self
            .functions_base
            .as_ref()
            .ok_or(CheckoutError::Unconfigured)?;

        let resp = self
            .http
            .post(format!("{base}/billing/create-checkout-session"))
            .bearer_auth(&session.access_token)
            .json(&CreateCheckoutSessionRequest {
                price_id: price_id.to_string(),
                mode: entry.mode.as_str().to_string(),
                success_url: success_url.to_string(),
                cancel_url: cancel_url.to_string(),
            })
            .send()
            .await
            .map_err(|e| CheckoutError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error")?.as_str().map(|s| s.to_string()))
                .unwrap_or(body);
            return Err(CheckoutError::Endpoint(message));
        }

        let body: CreateCheckoutSessionResponse = resp
            .json()
            .await
            .map_err(|e| CheckoutError::Network(e.to_string()))?;

        self.redirect
            .begin_checkout(&body.session_id)
            .map_err(CheckoutError::Redirect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::UserProfile;
    use std::sync::Mutex;

    struct RecordingRedirect {
        sessions: Mutex<Vec<String>>,
    }

    impl RedirectGateway for RecordingRedirect {
        fn begin_checkout(&self, session_id: &str) -> Result<(), String> {
            self.sessions
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(session_id.to_string());
            Ok(())
        }
    }

    fn session() -> Session {
        Session {
            access_token: "tok".into(),
            user: UserProfile {
                id: "user_1".into(),
                email: "alice@example.com".into(),
                user_metadata: Default::default(),
            },
        }
    }

    #[tokio::test]
    async fn test_unknown_plan_fails_before_any_network_call() {
        let redirect = Arc::new(RecordingRedirect {
            sessions: Mutex::new(vec![]),
        });
        // No functions URL configured: a network attempt would fail with
        // Unconfigured, so MissingPriceId proves the early return.
        let initiator = CheckoutInitiator::new(&PlatformConfig::default(), redirect.clone());

        let err = initiator
            .start("enterprise", &session(), "https://x/", "https://x/")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::MissingPriceId(_)));
        assert!(redirect.sessions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_free_plan_has_no_price() {
        let redirect = Arc::new(RecordingRedirect {
            sessions: Mutex::new(vec![]),
        });
        let initiator = CheckoutInitiator::new(&PlatformConfig::default(), redirect);

        let err = initiator
            .start("free", &session(), "https://x/", "https://x/")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::MissingPriceId(_)));
    }

    #[test]
    fn test_missing_price_message_names_the_plan() {
        let err = CheckoutError::MissingPriceId("enterprise".into());
        assert!(err.to_string().contains("enterprise"));
    }
}
