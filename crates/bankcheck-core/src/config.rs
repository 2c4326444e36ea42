// Platform configuration.
//
// Presence and validity of the platform URL + key pair decides whether
// the application runs in "configured" mode (talking to the hosted
// platforms) or "demo" mode (all data synthesized locally, no network).

use serde::{Deserialize, Serialize};

/// Billing-platform keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillingKeys {
    /// Publishable key used by the client-side redirect flow.
    pub publishable_key: Option<String>,
    /// Secret key used by the serverless functions.
    pub secret_key: Option<String>,
    /// Webhook signing secret.
    pub webhook_secret: Option<String>,
}

/// Top-level configuration for both the client app and the functions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Base URL of the hosted auth/database platform.
    pub platform_url: Option<String>,
    /// Public (anon) API key for the hosted platform.
    pub anon_key: Option<String>,
    /// Secret used to verify platform-issued access tokens (HS256).
    pub jwt_secret: Option<String>,
    /// Base URL of the serverless functions.
    pub functions_url: Option<String>,
    /// Billing-platform keys.
    pub billing: BillingKeys,
    /// Emails allowed to call the admin endpoints.
    pub admin_emails: Vec<String>,
}

impl PlatformConfig {
    /// Load configuration from `BANKCHECK_*` environment variables.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        Self {
            platform_url: var("BANKCHECK_PLATFORM_URL"),
            anon_key: var("BANKCHECK_ANON_KEY"),
            jwt_secret: var("BANKCHECK_JWT_SECRET"),
            functions_url: var("BANKCHECK_FUNCTIONS_URL"),
            billing: BillingKeys {
                publishable_key: var("BANKCHECK_BILLING_PUBLISHABLE_KEY"),
                secret_key: var("BANKCHECK_BILLING_SECRET_KEY"),
                webhook_secret: var("BANKCHECK_BILLING_WEBHOOK_SECRET"),
            },
            admin_emails: var("BANKCHECK_ADMIN_EMAILS")
                .map(|v| {
                    v.split(',')
                        .map(|e| e.trim().to_lowercase())
                        .filter(|e| !e.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Whether the hosted platform is reachable at all.
    ///
    /// Requires a platform URL that parses as an absolute URL and a
    /// non-empty anon key. Anything less puts the app into demo mode.
    pub fn is_configured(&self) -> bool {
        let url_ok = self
            .platform_url
            .as_deref()
            .map(|u| url::Url::parse(u).is_ok())
            .unwrap_or(false);
        url_ok && self.anon_key.as_deref().map(|k| !k.is_empty()).unwrap_or(false)
    }

    /// Whether the billing platform can be called server-side.
    pub fn billing_configured(&self) -> bool {
        self.billing.secret_key.is_some() && self.billing.webhook_secret.is_some()
    }

    /// The functions base URL, falling back to a path under the platform URL.
    pub fn functions_base(&self) -> Option<String> {
        self.functions_url.clone().or_else(|| {
            self.platform_url
                .as_deref()
                .map(|u| format!("{}/functions/v1", u.trim_end_matches('/')))
        })
    }

    /// Check an email against the admin allow-list (case-insensitive).
    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.to_lowercase();
        self.admin_emails.iter().any(|e| e == &email)
    }
}
