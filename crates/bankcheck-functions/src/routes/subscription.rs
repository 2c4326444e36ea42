// Subscription read endpoint.
//
// GET /billing/subscription
// Returns the caller's most recent active-or-trialing subscription row,
// or null when there is none (including when no customer is linked yet).

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use bankcheck_billing::types::SubscriptionReadResponse;

use crate::context::FunctionsContext;
use crate::{require_identity, EndpointError};

pub async fn handle_get_subscription(
    State(ctx): State<Arc<FunctionsContext>>,
    headers: HeaderMap,
) -> Result<Json<SubscriptionReadResponse>, EndpointError> {
    let identity = require_identity(&ctx, &headers)?;

    let subscription = match ctx.store.customer_for_user(&identity.user_id).await? {
        Some(customer_id) => ctx.store.latest_active_subscription(&customer_id).await?,
        None => None,
    };

    Ok(Json(SubscriptionReadResponse { subscription }))
}
