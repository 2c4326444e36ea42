// Account snapshot and loader.
//
// The snapshot is a derived, client-held projection of identity +
// subscription + usage. The loader maps the most recent subscription
// row onto a display plan and quota; it must not be able to fail the
// surrounding flow, so any error degrades to a synthesized snapshot.

use async_trait::async_trait;

use bankcheck_billing::catalog::{self, PlanEntry};
use bankcheck_billing::types::SubscriptionReadResponse;
use bankcheck_core::config::PlatformConfig;

use crate::backend::{Session, UserProfile};

/// Display plan attached to an account snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanInfo {
    pub id: String,
    pub name: String,
    pub price: String,
    pub period: String,
    pub quota: String,
}

impl From<&PlanEntry> for PlanInfo {
    fn from(entry: &PlanEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            name: entry.name.to_string(),
            price: entry.price.to_string(),
            period: entry.period.to_string(),
            quota: entry.quota.to_string(),
        }
    }
}

/// Client-held projection of identity + plan + usage. Not authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub name: String,
    pub email: String,
    pub company: String,
    pub job_title: String,
    pub plan: PlanInfo,
    pub checks_used: u32,
    /// -1 means unlimited.
    pub checks_limit: i64,
}

impl AccountSnapshot {
    /// Build a snapshot from identity fields and a catalog entry.
    pub fn from_parts(profile: &UserProfile, entry: &PlanEntry) -> Self {
        Self {
            name: profile
                .metadata_str("full_name")
                .unwrap_or(&profile.email)
                .to_string(),
            email: profile.email.clone(),
            company: profile.metadata_str("company").unwrap_or("").to_string(),
            job_title: profile.metadata_str("job_title").unwrap_or("").to_string(),
            plan: PlanInfo::from(entry),
            checks_used: 0,
            checks_limit: entry.checks_limit,
        }
    }

    /// Build a snapshot for a catalog plan id, defaulting to Free.
    pub fn for_plan(profile: &UserProfile, plan_id: &str) -> Self {
        let entry = catalog::entry_for_plan(plan_id).unwrap_or_else(catalog::free_plan);
        Self::from_parts(profile, entry)
    }

    /// Fully synthesized snapshot for demo mode.
    pub fn demo() -> Self {
        Self {
            name: "Demo User".into(),
            email: "demo@mybankcheck.com".into(),
            company: "Demo Company".into(),
            job_title: "Fraud Analyst".into(),
            plan: PlanInfo::from(catalog::free_plan()),
            checks_used: 0,
            checks_limit: catalog::free_plan().checks_limit,
        }
    }

    /// Record one performed check. Usage only ever increases; it resets
    /// by building a fresh snapshot.
    pub fn record_check(&mut self) {
        self.checks_used += 1;
    }

    /// Whether another check fits in the quota.
    pub fn has_quota(&self) -> bool {
        self.checks_limit == catalog::UNLIMITED_CHECKS
            || i64::from(self.checks_used) < self.checks_limit
    }
}

/// Source of account snapshots for the view state machine.
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn load_account(&self, session: &Session) -> AccountSnapshot;
}

#[derive(Debug, thiserror::Error)]
enum LoadError {
    #[error("functions endpoint is not configured")]
    Unconfigured,

    #[error("subscription request failed: {0}")]
    Http(String),

    #[error("subscription request returned status {0}")]
    Status(u16),
}

/// Loads the subscription row and resolves it against the plan catalog.
pub struct AccountLoader {
    http: reqwest::Client,
    functions_base: Option<String>,
}

impl AccountLoader {
    pub fn new(config: &PlatformConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            functions_base: config.functions_base(),
        }
    }

    /// Load the snapshot for an authenticated session. Infallible: any
    /// query error degrades to a synthesized snapshot on the Free plan.
    pub async fn load(&self, session: &Session) -> AccountSnapshot {
        match self.try_load(session).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(error = %err, "account load failed; synthesizing snapshot");
                AccountSnapshot::from_parts(&session.user, catalog::free_plan())
            }
        }
    }

    async fn try_load(&self, session: &Session) -> Result<AccountSnapshot, LoadError> {
        let base = self.functions_base.as_ref().ok_or(LoadError::Unconfigured)?;

        let resp = self
            .http
            .get(format!("{base}/billing/subscription"))
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(|e| LoadError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(LoadError::Status(resp.status().as_u16()));
        }

        let body: SubscriptionReadResponse = resp
            .json()
            .await
            .map_err(|e| LoadError::Http(e.to_string()))?;

        // Exact-match resolution; an unmatched price id lands on Free.
        let entry = match &body.subscription {
            Some(row) => catalog::plan_or_free(&row.price_id),
            None => catalog::free_plan(),
        };

        Ok(AccountSnapshot::from_parts(&session.user, entry))
    }
}

#[async_trait]
impl AccountSource for AccountLoader {
    async fn load_account(&self, session: &Session) -> AccountSnapshot {
        self.load(session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        let mut metadata = serde_json::Map::new();
        metadata.insert("full_name".into(), serde_json::json!("Alice"));
        metadata.insert("company".into(), serde_json::json!("Acme"));
        UserProfile {
            id: "user_1".into(),
            email: "alice@example.com".into(),
            user_metadata: metadata,
        }
    }

    #[test]
    fn test_snapshot_from_profile_and_plan() {
        let snapshot = AccountSnapshot::for_plan(&profile(), "growth");
        assert_eq!(snapshot.name, "Alice");
        assert_eq!(snapshot.company, "Acme");
        assert_eq!(snapshot.plan.id, "growth");
        assert_eq!(snapshot.checks_limit, 500);
        assert_eq!(snapshot.checks_used, 0);
    }

    #[test]
    fn test_unknown_plan_id_defaults_to_free() {
        let snapshot = AccountSnapshot::for_plan(&profile(), "enterprise");
        assert_eq!(snapshot.plan.id, "free");
        assert_eq!(snapshot.checks_limit, 10);
    }

    #[test]
    fn test_name_falls_back_to_email() {
        let profile = UserProfile {
            id: "user_2".into(),
            email: "bob@example.com".into(),
            user_metadata: Default::default(),
        };
        let snapshot = AccountSnapshot::for_plan(&profile, "free");
        assert_eq!(snapshot.name, "bob@example.com");
    }

    #[test]
    fn test_demo_snapshot_is_free_tier() {
        let snapshot = AccountSnapshot::demo();
        assert_eq!(snapshot.plan.id, "free");
        assert_eq!(snapshot.checks_limit, 10);
        assert!(snapshot.has_quota());
    }

    #[test]
    fn test_record_check_and_quota() {
        let mut snapshot = AccountSnapshot::demo();
        for _ in 0..10 {
            assert!(snapshot.has_quota());
            snapshot.record_check();
        }
        assert_eq!(snapshot.checks_used, 10);
        assert!(!snapshot.has_quota());
    }

    #[test]
    fn test_unlimited_quota_never_exhausts() {
        let mut snapshot = AccountSnapshot::for_plan(&profile(), "pro");
        assert_eq!(snapshot.checks_limit, -1);
        for _ in 0..1000 {
            snapshot.record_check();
        }
        assert!(snapshot.has_quota());
    }

    #[tokio::test]
    async fn test_loader_degrades_to_synthesized_snapshot() {
        // Unconfigured loader: no functions URL, must not error.
        let loader = AccountLoader::new(&PlatformConfig::default());
        let session = Session {
            access_token: "tok".into(),
            user: profile(),
        };
        let snapshot = loader.load(&session).await;
        assert_eq!(snapshot.plan.id, "free");
        assert_eq!(snapshot.checks_limit, 10);
        assert_eq!(snapshot.email, "alice@example.com");
    }
}
