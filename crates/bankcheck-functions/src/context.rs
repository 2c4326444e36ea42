// Functions context — the fully-initialized configuration shared across
// all request handlers as `Arc<FunctionsContext>`.

use std::sync::Arc;

use bankcheck_core::config::PlatformConfig;

use crate::gateway::BillingGateway;
use crate::store::TableStore;

pub struct FunctionsContext {
    /// The original configuration.
    pub config: PlatformConfig,

    /// Hosted-table storage.
    pub store: Arc<dyn TableStore>,

    /// Payment-platform access.
    pub gateway: Arc<dyn BillingGateway>,

    /// Webhook signing secret (empty disables the webhook endpoint).
    pub webhook_secret: String,

    /// Secret for decoding platform-issued access tokens.
    pub jwt_secret: String,
}

// Manual Debug impl because the trait objects are not Debug
impl std::fmt::Debug for FunctionsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionsContext")
            .field("config", &self.config)
            .field("webhook_secret", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .finish()
    }
}

impl FunctionsContext {
    /// Build a context from configuration, a store, and a gateway.
    pub fn new(
        config: PlatformConfig,
        store: Arc<dyn TableStore>,
        gateway: Arc<dyn BillingGateway>,
    ) -> Arc<Self> {
        let webhook_secret = config
            .billing
            .webhook_secret
            .clone()
            .unwrap_or_default();
        let jwt_secret = config.jwt_secret.clone().unwrap_or_default();

        Arc::new(Self {
            config,
            store,
            gateway,
            webhook_secret,
            jwt_secret,
        })
    }
}
