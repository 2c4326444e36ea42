//! # bankcheck-app
//!
//! Client application core for MyBankCheck. Everything visual lives
//! elsewhere; this crate owns the behavior behind it:
//!
//! - [`session::SessionClient`] — the single shared handle to the hosted
//!   auth platform, with a change-notification subscription. Falls back
//!   to a local demo backend when the platform is unconfigured.
//! - [`state::AppController`] — the top-level view state machine. User
//!   actions and session notifications flow through one event queue and
//!   are processed in arrival order.
//! - [`account::AccountLoader`] — maps the subscription row onto a
//!   display plan and usage quota; never fails the surrounding flow.
//! - [`checkout::CheckoutInitiator`] — one-shot handoff to the payment
//!   platform's redirect flow.

pub mod account;
pub mod backend;
pub mod cache;
pub mod checkout;
pub mod session;
pub mod state;

pub use account::{AccountLoader, AccountSnapshot, AccountSource, PlanInfo};
pub use backend::{AuthBackend, AuthError, DemoBackend, HostedAuthBackend, Session, SignUpRequest, UserProfile};
pub use cache::{LocalCache, MemoryCache};
pub use checkout::{CheckoutError, CheckoutInitiator, RedirectGateway};
pub use session::{SessionChange, SessionClient, SessionEvents, SessionNotice};
pub use state::{AppController, AppEvent, AppHandle, View};
