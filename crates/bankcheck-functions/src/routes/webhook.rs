// Webhook sync endpoint.
//
// POST /billing/webhook
// Signature verification is the only authentication for this endpoint
// and fails closed with 400. After a valid signature the response is
// always `200 {"received": true}` — store write failures are logged but
// must not trigger platform redelivery storms.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use bankcheck_billing::types::{BillingEvent, OrderRow, SubscriptionRow};
use bankcheck_billing::webhook::{
    parse_subscription_status, verify_webhook_signature, SIGNATURE_HEADER,
};

use crate::context::FunctionsContext;
use crate::gateway::GatewayError;
use crate::store::StoreError;

/// Failure while applying a single event. Logged, never returned to the
/// platform.
#[derive(Debug, thiserror::Error)]
enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Malformed event payload: {0}")]
    Payload(String),
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

pub async fn handle_webhook(
    State(ctx): State<Arc<FunctionsContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        return bad_request("Missing signature header");
    };

    if verify_webhook_signature(&body, signature, &ctx.webhook_secret).is_err() {
        tracing::warn!("webhook signature verification failed");
        return bad_request("Invalid signature");
    }

    let event: BillingEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(err) => return bad_request(&format!("Invalid event payload: {err}")),
    };

    tracing::info!(event_id = %event.id, event_type = %event.event_type, "processing billing event");

    let result = match event.event_type.as_str() {
        "checkout.session.completed" => handle_checkout_completed(&ctx, &event).await,
        "customer.subscription.created" | "customer.subscription.updated" => {
            handle_subscription_upsert(&ctx, &event).await
        }
        "customer.subscription.deleted" => handle_subscription_deleted(&ctx, &event).await,
        other => {
            tracing::debug!(event_type = %other, "ignoring unrecognized event type");
            Ok(())
        }
    };

    if let Err(err) = result {
        tracing::error!(event_id = %event.id, error = %err, "failed to apply billing event");
    }

    Json(serde_json::json!({ "received": true })).into_response()
}

// ── Event handlers ──────────────────────────────────────────────────

/// Checkout-session object, as embedded in `checkout.session.completed`.
#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    id: String,
    customer: String,
    #[serde(default)]
    client_reference_id: Option<String>,
    mode: String,
    #[serde(default)]
    subscription: Option<String>,
    #[serde(default)]
    payment_intent: Option<String>,
    #[serde(default)]
    amount_subtotal: i64,
    #[serde(default)]
    amount_total: i64,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    payment_status: String,
    #[serde(default)]
    status: String,
}

async fn handle_checkout_completed(
    ctx: &FunctionsContext,
    event: &BillingEvent,
) -> Result<(), SyncError> {
    let session: CheckoutSessionObject =
        serde_json::from_value(event.data.object.clone())
            .map_err(|e| SyncError::Payload(e.to_string()))?;

    // Resolve the customer to an internal user: the stored mapping wins,
    // the session's client reference seeds it on first checkout.
    let user_id = match ctx.store.user_for_customer(&session.customer).await? {
        Some(user_id) => user_id,
        None => match &session.client_reference_id {
            Some(user_id) => {
                ctx.store.link_customer(user_id, &session.customer).await?;
                user_id.clone()
            }
            None => {
                return Err(SyncError::Payload(format!(
                    "no user mapping for customer {}",
                    session.customer
                )))
            }
        },
    };

    if session.mode == "subscription" {
        if let Some(subscription_id) = &session.subscription {
            sync_subscription_from_gateway(ctx, subscription_id, event.created).await?;
        }
    }

    tracing::info!(user_id = %user_id, session_id = %session.id, "recording order");

    ctx.store
        .insert_order(OrderRow {
            checkout_session_id: session.id,
            payment_intent_id: session.payment_intent,
            customer_id: session.customer,
            amount_subtotal: session.amount_subtotal,
            amount_total: session.amount_total,
            currency: session.currency,
            payment_status: session.payment_status,
            status: session.status,
        })
        .await?;

    Ok(())
}

async fn handle_subscription_upsert(
    ctx: &FunctionsContext,
    event: &BillingEvent,
) -> Result<(), SyncError> {
    let object = &event.data.object;

    let subscription_id = object
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| SyncError::Payload("subscription event has no id".into()))?;
    let customer_id = object
        .get("customer")
        .and_then(|v| v.as_str())
        .ok_or_else(|| SyncError::Payload("subscription event has no customer".into()))?;
    let status = object
        .get("status")
        .and_then(|v| v.as_str())
        .unwrap_or("incomplete");
    let price_id = object
        .pointer("/items/data/0/price/id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| SyncError::Payload("subscription event has no price".into()))?;

    // Best-effort card details — a lookup failure must not drop the event.
    let payment_method = match object
        .get("default_payment_method")
        .and_then(|v| v.as_str())
    {
        Some(pm_id) => match ctx.gateway.fetch_payment_method(pm_id).await {
            Ok(info) => Some(info),
            Err(err) => {
                tracing::warn!(payment_method = %pm_id, error = %err, "payment method lookup failed");
                None
            }
        },
        None => None,
    };

    let row = SubscriptionRow {
        customer_id: customer_id.to_string(),
        subscription_id: subscription_id.to_string(),
        price_id: price_id.to_string(),
        current_period_start: epoch_field(object, "current_period_start")?,
        current_period_end: epoch_field(object, "current_period_end")?,
        cancel_at_period_end: object
            .get("cancel_at_period_end")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        status: parse_subscription_status(status),
        payment_method_brand: payment_method.as_ref().map(|pm| pm.brand.clone()),
        payment_method_last4: payment_method.as_ref().map(|pm| pm.last4.clone()),
        last_event_at: event.created,
    };

    upsert_guarded(ctx, row).await
}

async fn handle_subscription_deleted(
    ctx: &FunctionsContext,
    event: &BillingEvent,
) -> Result<(), SyncError> {
    let subscription_id = event
        .data
        .object
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| SyncError::Payload("subscription event has no id".into()))?;

    let Some(mut row) = ctx.store.find_subscription(subscription_id).await? else {
        tracing::warn!(subscription_id = %subscription_id, "delete for unknown subscription");
        return Ok(());
    };

    if row.last_event_at > event.created {
        tracing::debug!(subscription_id = %subscription_id, "skipping stale subscription delete");
        return Ok(());
    }

    row.status = bankcheck_billing::types::SubscriptionStatus::Canceled;
    row.last_event_at = event.created;
    ctx.store.upsert_subscription(row).await?;
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Fetch full subscription details from the payment platform and upsert
/// the mirrored row. Used by `checkout.session.completed`, which only
/// carries the subscription id.
async fn sync_subscription_from_gateway(
    ctx: &FunctionsContext,
    subscription_id: &str,
    event_created: i64,
) -> Result<(), SyncError> {
    let sub = ctx.gateway.fetch_subscription(subscription_id).await?;

    let price_id = sub
        .price_id
        .clone()
        .ok_or_else(|| SyncError::Payload("subscription has no price".into()))?;

    let payment_method = match &sub.default_payment_method {
        Some(pm_id) => match ctx.gateway.fetch_payment_method(pm_id).await {
            Ok(info) => Some(info),
            Err(err) => {
                tracing::warn!(payment_method = %pm_id, error = %err, "payment method lookup failed");
                None
            }
        },
        None => None,
    };

    let row = SubscriptionRow {
        customer_id: sub.customer.clone(),
        subscription_id: sub.id.clone(),
        price_id,
        current_period_start: epoch(sub.current_period_start)?,
        current_period_end: epoch(sub.current_period_end)?,
        cancel_at_period_end: sub.cancel_at_period_end,
        status: parse_subscription_status(&sub.status),
        payment_method_brand: payment_method.as_ref().map(|pm| pm.brand.clone()),
        payment_method_last4: payment_method.as_ref().map(|pm| pm.last4.clone()),
        last_event_at: event_created,
    };

    upsert_guarded(ctx, row).await
}

/// Upsert a subscription row unless the stored row was written from a
/// newer event. Redelivered or out-of-order events must not overwrite
/// fresher data.
async fn upsert_guarded(ctx: &FunctionsContext, row: SubscriptionRow) -> Result<(), SyncError> {
    if let Some(existing) = ctx.store.find_subscription(&row.subscription_id).await? {
        if existing.last_event_at > row.last_event_at {
            tracing::debug!(
                subscription_id = %row.subscription_id,
                stored = existing.last_event_at,
                inbound = row.last_event_at,
                "skipping stale subscription event"
            );
            return Ok(());
        }
    }
    ctx.store.upsert_subscription(row).await?;
    Ok(())
}

fn epoch(secs: i64) -> Result<DateTime<Utc>, SyncError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| SyncError::Payload(format!("invalid timestamp: {secs}")))
}

fn epoch_field(object: &serde_json::Value, field: &str) -> Result<DateTime<Utc>, SyncError> {
    let secs = object
        .get(field)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| SyncError::Payload(format!("subscription event has no {field}")))?;
    epoch(secs)
}
