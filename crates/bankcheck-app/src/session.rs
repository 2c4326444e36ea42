// Session client — the single shared handle to the hosted auth
// platform. Created once per process; change notifications fan out
// through a watch channel and are torn down by dropping the
// subscription.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use bankcheck_core::config::PlatformConfig;

use crate::backend::{AuthBackend, AuthError, DemoBackend, HostedAuthBackend, Session, SignUpRequest};

/// Kind of session change delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    SignedIn,
    SignedOut,
}

/// A session-change notification.
#[derive(Debug, Clone)]
pub struct SessionNotice {
    pub change: SessionChange,
    pub session: Option<Session>,
}

#[derive(Debug, Clone)]
struct Signal {
    seq: u64,
    notice: Option<SessionNotice>,
}

/// Client over an [`AuthBackend`] with change notifications.
pub struct SessionClient {
    backend: Arc<dyn AuthBackend>,
    demo: bool,
    notify: watch::Sender<Signal>,
}

impl SessionClient {
    /// Build a client for the given configuration.
    ///
    /// A missing or invalid platform configuration is non-fatal: the
    /// client falls back to the local demo backend.
    pub fn new(config: &PlatformConfig) -> Self {
        match HostedAuthBackend::from_config(config) {
            Ok(backend) => Self::from_backend(Arc::new(backend), false),
            Err(err) => {
                tracing::warn!(error = %err, "falling back to demo mode");
                Self::from_backend(Arc::new(DemoBackend::new()), true)
            }
        }
    }

    /// Build a client over an explicit backend (tests, embedding).
    pub fn with_backend(backend: Arc<dyn AuthBackend>) -> Self {
        Self::from_backend(backend, false)
    }

    fn from_backend(backend: Arc<dyn AuthBackend>, demo: bool) -> Self {
        let (notify, _) = watch::channel(Signal {
            seq: 0,
            notice: None,
        });
        Self {
            backend,
            demo,
            notify,
        }
    }

    /// Whether this client runs against the local demo backend.
    pub fn is_demo(&self) -> bool {
        self.demo
    }

    /// The current session, if any. Lookup failures resolve to `None`.
    pub async fn current_session(&self) -> Option<Session> {
        match self.backend.current_session().await {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(error = %err, "session lookup failed");
                None
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.backend.sign_in(email, password).await?;
        self.broadcast(SessionChange::SignedIn, Some(session.clone()));
        Ok(session)
    }

    pub async fn sign_up(&self, request: SignUpRequest) -> Result<Session, AuthError> {
        let session = self.backend.sign_up(request).await?;
        self.broadcast(SessionChange::SignedIn, Some(session.clone()));
        Ok(session)
    }

    /// Sign out remotely. A `SignedOut` notification fires only when a
    /// session actually existed and the remote call succeeded; callers
    /// force local cleanup regardless of the result.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let had_session = self.current_session().await.is_some();
        self.backend.sign_out().await?;
        if had_session {
            self.broadcast(SessionChange::SignedOut, None);
        }
        Ok(())
    }

    /// Subscribe to session-change notifications. Dropping the returned
    /// stream tears the subscription down.
    pub fn subscribe(&self) -> SessionEvents {
        let rx = self.notify.subscribe();
        let last_seq = rx.borrow().seq;
        SessionEvents { rx, last_seq }
    }

    fn broadcast(&self, change: SessionChange, session: Option<Session>) {
        self.notify.send_modify(|signal| {
            signal.seq = signal.seq.wrapping_add(1);
            signal.notice = Some(SessionNotice { change, session });
        });
    }
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("demo", &self.demo)
            .finish()
    }
}

/// Stream of session-change notifications.
pub struct SessionEvents {
    rx: watch::Receiver<Signal>,
    last_seq: u64,
}

impl SessionEvents {
    /// Wait for the next notification. Returns `None` once the client
    /// has been dropped.
    pub async fn next(&mut self) -> Option<SessionNotice> {
        loop {
            self.rx.changed().await.ok()?;
            let signal = self.rx.borrow_and_update().clone();
            if signal.seq != self.last_seq {
                self.last_seq = signal.seq;
                if let Some(notice) = signal.notice {
                    return Some(notice);
                }
            }
        }
    }
}

// ─── Shared handle ──────────────────────────────────────────────────

static SHARED: Mutex<Option<Arc<SessionClient>>> = Mutex::new(None);

/// The process-wide shared session client. Created lazily on first use;
/// later calls return the same handle and ignore the configuration.
pub fn shared_client(config: &PlatformConfig) -> Arc<SessionClient> {
    let mut guard = SHARED.lock().unwrap_or_else(|e| e.into_inner());
    guard
        .get_or_insert_with(|| Arc::new(SessionClient::new(config)))
        .clone()
}

/// Drop the shared client so the next `shared_client` call rebuilds it.
/// Test isolation only.
pub fn reset_shared_client() {
    let mut guard = SHARED.lock().unwrap_or_else(|e| e.into_inner());
    *guard = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_client() -> SessionClient {
        SessionClient::new(&PlatformConfig::default())
    }

    #[tokio::test]
    async fn test_unconfigured_client_is_demo() {
        let client = demo_client();
        assert!(client.is_demo());
        assert!(client.current_session().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_in_broadcasts_signed_in() {
        let client = demo_client();
        let mut events = client.subscribe();

        client.sign_in("demo@example.com", "pw").await.unwrap();

        let notice = events.next().await.unwrap();
        assert_eq!(notice.change, SessionChange::SignedIn);
        assert_eq!(notice.session.unwrap().user.email, "demo@example.com");
    }

    #[tokio::test]
    async fn test_sign_out_broadcasts_only_with_session() {
        let client = demo_client();

        // No session: sign-out succeeds silently.
        client.sign_out().await.unwrap();
        let mut events = client.subscribe();

        client.sign_in("demo@example.com", "pw").await.unwrap();
        client.sign_out().await.unwrap();

        let first = events.next().await.unwrap();
        assert_eq!(first.change, SessionChange::SignedIn);
        let second = events.next().await.unwrap();
        assert_eq!(second.change, SessionChange::SignedOut);
        assert!(second.session.is_none());
    }

    #[tokio::test]
    async fn test_subscription_stops_after_client_dropped() {
        let client = demo_client();
        let mut events = client.subscribe();
        drop(client);
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_notices() {
        let client = demo_client();
        client.sign_in("demo@example.com", "pw").await.unwrap();

        // Subscribing after the fact must not replay the sign-in.
        let mut events = client.subscribe();
        client.sign_out().await.unwrap();
        let notice = events.next().await.unwrap();
        assert_eq!(notice.change, SessionChange::SignedOut);
    }

    #[tokio::test]
    async fn test_shared_client_is_singleton() {
        reset_shared_client();
        let a = shared_client(&PlatformConfig::default());
        let b = shared_client(&PlatformConfig::default());
        assert!(Arc::ptr_eq(&a, &b));
        reset_shared_client();
    }
}
