//! Billing rows and wire types mirrored from the payment platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription statuses reported by the payment platform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Incomplete,
    IncompleteExpired,
    Canceled,
    Unpaid,
}

impl SubscriptionStatus {
    /// Whether the subscription currently grants access.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

/// Subscription row mirrored into the hosted database.
///
/// Read-only from the application's perspective; written only by the
/// webhook sync handler. `last_event_at` records the `created` clock of
/// the most recent event applied, so stale redeliveries can be skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRow {
    pub customer_id: String,
    pub subscription_id: String,
    pub price_id: String,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub status: SubscriptionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_last4: Option<String>,
    #[serde(default)]
    pub last_event_at: i64,
}

/// Order row recorded once per completed checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRow {
    pub checkout_session_id: String,
    pub payment_intent_id: Option<String>,
    pub customer_id: String,
    pub amount_subtotal: i64,
    pub amount_total: i64,
    pub currency: String,
    pub payment_status: String,
    pub status: String,
}

/// Inbound webhook event envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub created: i64,
    pub data: BillingEventData,
}

/// Event payload wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingEventData {
    pub object: serde_json::Value,
}

/// Checkout-session creation request, as posted by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCheckoutSessionRequest {
    pub price_id: String,
    pub mode: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Checkout-session creation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCheckoutSessionResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Subscription read response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionReadResponse {
    pub subscription: Option<SubscriptionRow>,
}
