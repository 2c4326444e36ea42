// View state machine.
//
// The application's top-level controller. User actions and
// session-change notifications land in one queue and are processed in
// arrival order, so the `force_signup` / `signing_out` guards are
// checked in the same step that consumes a notification — never across
// an intervening suspension. Navigation is always an absolute
// transition; there is no view stack.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::account::{AccountSnapshot, AccountSource};
use crate::cache::{purge_session_keys, LocalCache};
use crate::session::{SessionChange, SessionClient, SessionNotice};

/// How long a logout waits for the remote sign-out before forcing the
/// local transition.
pub const LOGOUT_TIMEOUT: Duration = Duration::from_secs(2);

/// The application's views. A finite enum, not a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Landing,
    Login,
    Signup,
    Dashboard,
    Success,
}

/// Everything the controller reacts to, user-driven and remote alike.
#[derive(Debug)]
pub enum AppEvent {
    /// "Get started" clicked on the landing page.
    GetStarted,
    /// "Sign in" clicked on the landing page.
    SignInClicked,
    /// The login form submitted successfully; the actual transition is
    /// driven by the following `SignedIn` notification.
    LoginSucceeded,
    /// Sign-up finished with a ready account snapshot.
    SignupCompleted(AccountSnapshot),
    /// A session-change notification from the auth platform.
    SessionChanged(SessionNotice),
    /// Logout requested.
    Logout,
    /// "Back to website" from the dashboard or success view.
    BackToWebsite,
    /// One fraud check was performed.
    CheckPerformed,
    /// The account was edited in place.
    AccountUpdated(AccountSnapshot),
}

/// Cloneable sender half handed to UI code and the session bridge.
#[derive(Clone)]
pub struct AppHandle {
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl AppHandle {
    /// Enqueue an event. Events after controller shutdown are dropped.
    pub fn dispatch(&self, event: AppEvent) {
        let _ = self.tx.send(event);
    }
}

/// The top-level controller owning view, account snapshot, and guards.
pub struct AppController {
    view: View,
    account: Option<AccountSnapshot>,
    force_signup: bool,
    signing_out: bool,

    session: Arc<SessionClient>,
    accounts: Arc<dyn AccountSource>,
    cache: Arc<dyn LocalCache>,
    events: mpsc::UnboundedReceiver<AppEvent>,
}

impl AppController {
    pub fn new(
        session: Arc<SessionClient>,
        accounts: Arc<dyn AccountSource>,
        cache: Arc<dyn LocalCache>,
    ) -> (Self, AppHandle) {
        let (tx, events) = mpsc::unbounded_channel();
        let controller = Self {
            view: View::Landing,
            account: None,
            force_signup: false,
            signing_out: false,
            session,
            accounts,
            cache,
            events,
        };
        (controller, AppHandle { tx })
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn account(&self) -> Option<&AccountSnapshot> {
        self.account.as_ref()
    }

    pub fn force_signup(&self) -> bool {
        self.force_signup
    }

    pub fn signing_out(&self) -> bool {
        self.signing_out
    }

    /// Initial routing. A valid session lands on the dashboard, or on
    /// the success view when the launch URL carries a checkout-redirect
    /// marker; everything else starts on the landing page.
    pub async fn startup(&mut self, launch_query: Option<&str>) {
        match self.session.current_session().await {
            Some(session) => {
                if has_checkout_marker(launch_query) {
                    self.view = View::Success;
                } else {
                    self.account = Some(self.accounts.load_account(&session).await);
                    self.view = View::Dashboard;
                }
            }
            None => {
                self.view = View::Landing;
            }
        }
    }

    /// Consume events until every `AppHandle` has been dropped.
    pub async fn run(&mut self) {
        while let Some(event) = self.events.recv().await {
            self.process(event).await;
        }
    }

    /// Apply a single event. Exposed so tests can drive the machine
    /// without the queue.
    pub async fn process(&mut self, event: AppEvent) {
        match event {
            AppEvent::GetStarted => {
                self.force_signup = true;
                self.account = None;
                self.view = View::Signup;
                // Best-effort: a stale remote session must not leak into
                // the fresh signup.
                if let Err(err) = self.session.sign_out().await {
                    tracing::debug!(error = %err, "pre-signup sign-out failed");
                }
            }

            AppEvent::SignInClicked => {
                self.force_signup = false;
                self.view = View::Login;
            }

            AppEvent::LoginSucceeded => {
                // The SignedIn notification drives the transition.
                self.force_signup = false;
            }

            AppEvent::SignupCompleted(snapshot) => {
                self.account = Some(snapshot);
                self.force_signup = false;
                self.view = View::Dashboard;
            }

            AppEvent::SessionChanged(notice) => self.handle_session_change(notice).await,

            AppEvent::Logout => self.handle_logout().await,

            AppEvent::BackToWebsite => {
                if matches!(self.view, View::Dashboard | View::Success) {
                    self.account = None;
                    self.force_signup = false;
                    self.view = View::Landing;
                }
            }

            AppEvent::CheckPerformed => {
                if let Some(account) = self.account.as_mut() {
                    account.record_check();
                }
            }

            AppEvent::AccountUpdated(snapshot) => {
                self.account = Some(snapshot);
            }
        }
    }

    async fn handle_session_change(&mut self, notice: SessionNotice) {
        match notice.change {
            SessionChange::SignedIn => {
                // Guards are checked here, before any await: an in-flight
                // stale session must not override an explicit signup or
                // logout in progress.
                if self.force_signup || self.signing_out {
                    tracing::debug!(
                        force_signup = self.force_signup,
                        signing_out = self.signing_out,
                        "ignoring signed-in notification"
                    );
                    return;
                }
                let Some(session) = notice.session else {
                    tracing::warn!("signed-in notification without a session");
                    return;
                };
                self.account = Some(self.accounts.load_account(&session).await);
                self.view = View::Dashboard;
            }
            SessionChange::SignedOut => {
                self.force_signed_out();
            }
        }
    }

    async fn handle_logout(&mut self) {
        // Idempotent: a duplicate request while one is pending, or after
        // sign-out already completed, is a no-op.
        if self.signing_out || (self.view == View::Landing && self.account.is_none()) {
            tracing::debug!("logout already handled; ignoring");
            return;
        }
        self.signing_out = true;

        // Remote sign-out raced against a fixed timer. Either way the
        // local transition is forced; remote is best-effort only.
        match tokio::time::timeout(LOGOUT_TIMEOUT, self.session.sign_out()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "remote sign-out failed; forcing local sign-out");
            }
            Err(_) => {
                tracing::warn!("remote sign-out timed out; forcing local sign-out");
            }
        }

        self.force_signed_out();
    }

    /// Unconditional local cleanup shared by logout and the remote
    /// signed-out notification.
    fn force_signed_out(&mut self) {
        purge_session_keys(self.cache.as_ref());
        self.account = None;
        self.force_signup = false;
        self.signing_out = false;
        self.view = View::Landing;
    }
}

/// Whether a launch query string carries the checkout-redirect marker
/// (`?session_id={CHECKOUT_SESSION_ID}` appended by the payment
/// platform).
pub fn has_checkout_marker(query: Option<&str>) -> bool {
    let Some(query) = query else {
        return false;
    };
    let query = query.strip_prefix('?').unwrap_or(query);
    url::form_urlencoded::parse(query.as_bytes()).any(|(key, _)| key == "session_id")
}

/// Forward session-change notifications into the controller's queue.
/// The task ends when the session client is dropped or the controller
/// stops receiving.
pub fn spawn_session_bridge(
    client: &SessionClient,
    handle: AppHandle,
) -> tokio::task::JoinHandle<()> {
    let mut events = client.subscribe();
    tokio::spawn(async move {
        while let Some(notice) = events.next().await {
            handle.dispatch(AppEvent::SessionChanged(notice));
        }
    })
}
