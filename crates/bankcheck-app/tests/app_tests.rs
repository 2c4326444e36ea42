// Scenario tests for the client application core: startup routing,
// signup/login flows, the notification guards, and logout semantics.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use bankcheck_app::account::{AccountSnapshot, AccountSource};
use bankcheck_app::backend::{AuthBackend, AuthError, Session, SignUpRequest, UserProfile};
use bankcheck_app::cache::{LocalCache, MemoryCache, SESSION_KEYS};
use bankcheck_app::session::{SessionChange, SessionClient, SessionNotice};
use bankcheck_app::state::{spawn_session_bridge, AppController, AppEvent, View};
use bankcheck_core::config::PlatformConfig;

// ─── Test doubles ───────────────────────────────────────────────────

/// Resolves snapshots from the profile's `plan_id` metadata.
struct StubAccounts;

#[async_trait]
impl AccountSource for StubAccounts {
    async fn load_account(&self, session: &Session) -> AccountSnapshot {
        let plan_id = session.user.metadata_str("plan_id").unwrap_or("free");
        AccountSnapshot::for_plan(&session.user, plan_id)
    }
}

/// Cache that counts `remove` calls per key.
#[derive(Default)]
struct CountingCache {
    removes: Mutex<HashMap<String, usize>>,
}

impl CountingCache {
    fn removes_for(&self, key: &str) -> usize {
        *self
            .removes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .unwrap_or(&0)
    }
}

impl LocalCache for CountingCache {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }
    fn set(&self, _key: &str, _value: &str) {}
    fn remove(&self, key: &str) {
        *self
            .removes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key.to_string())
            .or_insert(0) += 1;
    }
}

/// Backend whose sign-out never completes.
struct HangingSignOutBackend {
    session: Session,
}

#[async_trait]
impl AuthBackend for HangingSignOutBackend {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(Some(self.session.clone()))
    }
    async fn sign_in(&self, _: &str, _: &str) -> Result<Session, AuthError> {
        Ok(self.session.clone())
    }
    async fn sign_up(&self, _: SignUpRequest) -> Result<Session, AuthError> {
        Ok(self.session.clone())
    }
    async fn sign_out(&self) -> Result<(), AuthError> {
        std::future::pending().await
    }
}

fn profile(plan_id: &str) -> UserProfile {
    let mut metadata = serde_json::Map::new();
    metadata.insert("full_name".into(), serde_json::json!("Alice"));
    metadata.insert("plan_id".into(), serde_json::json!(plan_id));
    UserProfile {
        id: "user_1".into(),
        email: "alice@example.com".into(),
        user_metadata: metadata,
    }
}

fn session(plan_id: &str) -> Session {
    Session {
        access_token: "tok".into(),
        user: profile(plan_id),
    }
}

fn signed_in(plan_id: &str) -> AppEvent {
    AppEvent::SessionChanged(SessionNotice {
        change: SessionChange::SignedIn,
        session: Some(session(plan_id)),
    })
}

fn signed_out() -> AppEvent {
    AppEvent::SessionChanged(SessionNotice {
        change: SessionChange::SignedOut,
        session: None,
    })
}

/// Demo-mode controller with a memory cache.
fn controller() -> (AppController, bankcheck_app::state::AppHandle, Arc<SessionClient>) {
    let client = Arc::new(SessionClient::new(&PlatformConfig::default()));
    let (controller, handle) = AppController::new(
        client.clone(),
        Arc::new(StubAccounts),
        Arc::new(MemoryCache::new()),
    );
    (controller, handle, client)
}

// ─── Startup routing ────────────────────────────────────────────────

#[tokio::test]
async fn startup_without_session_lands_on_landing() {
    let (mut app, _handle, _client) = controller();
    app.startup(None).await;
    assert_eq!(app.view(), View::Landing);
    assert!(app.account().is_none());
}

#[tokio::test]
async fn startup_with_session_and_checkout_marker_lands_on_success() {
    let (mut app, _handle, client) = controller();
    client.sign_in("alice@example.com", "pw").await.unwrap();

    app.startup(Some("session_id=cs_test_123")).await;
    assert_eq!(app.view(), View::Success);
}

#[tokio::test]
async fn startup_with_session_and_no_marker_lands_on_dashboard() {
    let (mut app, _handle, client) = controller();
    client.sign_in("alice@example.com", "pw").await.unwrap();

    app.startup(None).await;
    assert_eq!(app.view(), View::Dashboard);
    assert!(app.account().is_some());
}

// ─── Landing actions ────────────────────────────────────────────────

#[tokio::test]
async fn get_started_enters_forced_signup() {
    let (mut app, _handle, _client) = controller();
    app.startup(None).await;

    app.process(AppEvent::GetStarted).await;
    assert_eq!(app.view(), View::Signup);
    assert!(app.force_signup());
    assert!(app.account().is_none());
}

#[tokio::test]
async fn sign_in_click_clears_forced_signup() {
    let (mut app, _handle, _client) = controller();
    app.process(AppEvent::GetStarted).await;
    app.process(AppEvent::SignInClicked).await;
    assert_eq!(app.view(), View::Login);
    assert!(!app.force_signup());
}

// ─── Notification guards ────────────────────────────────────────────

#[tokio::test]
async fn signed_in_is_ignored_while_force_signup_is_set() {
    let (mut app, _handle, _client) = controller();
    app.process(AppEvent::GetStarted).await;

    // No sequence of notifications may reach the dashboard while the
    // forced-signup guard is set.
    app.process(signed_in("growth")).await;
    assert_eq!(app.view(), View::Signup);
    assert!(app.account().is_none());

    app.process(signed_in("pro")).await;
    app.process(signed_in("free")).await;
    assert_eq!(app.view(), View::Signup);
}

#[tokio::test]
async fn signed_in_after_login_drives_dashboard() {
    let (mut app, _handle, _client) = controller();
    app.process(AppEvent::SignInClicked).await;
    app.process(AppEvent::LoginSucceeded).await;
    assert_eq!(app.view(), View::Login);

    app.process(signed_in("growth")).await;
    assert_eq!(app.view(), View::Dashboard);
    let account = app.account().unwrap();
    assert_eq!(account.plan.id, "growth");
    assert_eq!(account.checks_limit, 500);
}

#[tokio::test]
async fn signed_out_notification_forces_landing_and_purges_cache() {
    let cache = Arc::new(MemoryCache::new());
    for key in SESSION_KEYS {
        cache.set(key, "data");
    }
    let client = Arc::new(SessionClient::new(&PlatformConfig::default()));
    let (mut app, _handle) =
        AppController::new(client, Arc::new(StubAccounts), cache.clone());

    app.process(signed_in("free")).await;
    assert_eq!(app.view(), View::Dashboard);

    app.process(signed_out()).await;
    assert_eq!(app.view(), View::Landing);
    assert!(app.account().is_none());
    assert!(!app.force_signup());
    assert!(!app.signing_out());
    for key in SESSION_KEYS {
        assert!(cache.get(key).is_none());
    }
}

// ─── Signup ─────────────────────────────────────────────────────────

#[tokio::test]
async fn signup_completion_lands_on_dashboard_with_plan() {
    let (mut app, _handle, _client) = controller();
    app.process(AppEvent::GetStarted).await;

    let snapshot = AccountSnapshot::for_plan(&profile("growth"), "growth");
    app.process(AppEvent::SignupCompleted(snapshot)).await;

    assert_eq!(app.view(), View::Dashboard);
    assert!(!app.force_signup());
    let account = app.account().unwrap();
    assert_eq!(account.plan.id, "growth");
    assert_eq!(account.checks_limit, 500);
    assert_eq!(account.checks_used, 0);
}

// ─── Logout ─────────────────────────────────────────────────────────

#[tokio::test]
async fn logout_forces_landing_and_clears_cache_keys_once() {
    let cache = Arc::new(CountingCache::default());
    let client = Arc::new(SessionClient::new(&PlatformConfig::default()));
    client.sign_in("alice@example.com", "pw").await.unwrap();
    let (mut app, handle) =
        AppController::new(client, Arc::new(StubAccounts), cache.clone());
    app.process(signed_in("free")).await;

    // Two logout requests queued back to back: the second must no-op.
    handle.dispatch(AppEvent::Logout);
    handle.dispatch(AppEvent::Logout);
    drop(handle);
    app.run().await;

    assert_eq!(app.view(), View::Landing);
    assert!(app.account().is_none());
    assert!(!app.signing_out());
    for key in SESSION_KEYS {
        assert_eq!(cache.removes_for(key), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn logout_times_out_and_forces_local_transition() {
    let cache = Arc::new(MemoryCache::new());
    for key in SESSION_KEYS {
        cache.set(key, "data");
    }
    let backend = HangingSignOutBackend {
        session: session("growth"),
    };
    let client = Arc::new(SessionClient::with_backend(Arc::new(backend)));
    let (mut app, _handle) =
        AppController::new(client, Arc::new(StubAccounts), cache.clone());
    app.process(signed_in("growth")).await;

    // The remote sign-out never resolves; the 2s timer wins the race.
    app.process(AppEvent::Logout).await;

    assert_eq!(app.view(), View::Landing);
    assert!(app.account().is_none());
    for key in SESSION_KEYS {
        assert!(cache.get(key).is_none());
    }
}

// ─── Dashboard actions ──────────────────────────────────────────────

#[tokio::test]
async fn back_to_website_clears_account() {
    let (mut app, _handle, _client) = controller();
    app.process(signed_in("free")).await;
    assert_eq!(app.view(), View::Dashboard);

    app.process(AppEvent::BackToWebsite).await;
    assert_eq!(app.view(), View::Landing);
    assert!(app.account().is_none());
}

#[tokio::test]
async fn back_to_website_is_inert_elsewhere() {
    let (mut app, _handle, _client) = controller();
    app.process(AppEvent::SignInClicked).await;
    app.process(AppEvent::BackToWebsite).await;
    assert_eq!(app.view(), View::Login);
}

#[tokio::test]
async fn check_performed_increments_usage() {
    let (mut app, _handle, _client) = controller();
    app.process(signed_in("free")).await;

    app.process(AppEvent::CheckPerformed).await;
    app.process(AppEvent::CheckPerformed).await;
    assert_eq!(app.account().unwrap().checks_used, 2);
}

#[tokio::test]
async fn account_update_replaces_snapshot() {
    let (mut app, _handle, _client) = controller();
    app.process(signed_in("free")).await;
    app.process(AppEvent::CheckPerformed).await;

    // A full replace resets usage counters.
    let fresh = AccountSnapshot::for_plan(&profile("pro"), "pro");
    app.process(AppEvent::AccountUpdated(fresh)).await;
    let account = app.account().unwrap();
    assert_eq!(account.plan.id, "pro");
    assert_eq!(account.checks_limit, -1);
    assert_eq!(account.checks_used, 0);
}

// ─── Session bridge ─────────────────────────────────────────────────

#[tokio::test]
async fn session_bridge_forwards_sign_in_to_controller() {
    let client = Arc::new(SessionClient::new(&PlatformConfig::default()));
    let (mut app, handle) = AppController::new(
        client.clone(),
        Arc::new(StubAccounts),
        Arc::new(MemoryCache::new()),
    );

    let bridge = spawn_session_bridge(&client, handle.clone());

    client.sign_in("alice@example.com", "pw").await.unwrap();

    // Drain exactly the forwarded notification.
    let run = async {
        app.run().await;
        app
    };
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    bridge.abort();
    drop(handle);
    let app = run.await;

    assert_eq!(app.view(), View::Dashboard);
    assert_eq!(app.account().unwrap().email, "alice@example.com");
}
