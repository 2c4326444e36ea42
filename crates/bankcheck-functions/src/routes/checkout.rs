// Checkout-session creation endpoint.
//
// POST /billing/create-checkout-session
// Authenticated with the session's bearer token. One-shot: the caller
// may re-trigger manually, no retries happen here.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use bankcheck_billing::catalog;
use bankcheck_billing::types::{CreateCheckoutSessionRequest, CreateCheckoutSessionResponse};
use bankcheck_core::error::ErrorCode;

use crate::context::FunctionsContext;
use crate::gateway::CheckoutSessionParams;
use crate::{require_identity, EndpointError};

pub async fn handle_create_checkout_session(
    State(ctx): State<Arc<FunctionsContext>>,
    headers: HeaderMap,
    Json(body): Json<CreateCheckoutSessionRequest>,
) -> Result<Json<CreateCheckoutSessionResponse>, EndpointError> {
    let identity = require_identity(&ctx, &headers)?;

    // The price id must belong to a catalog plan; everything else is a
    // misconfigured client.
    if catalog::entry_for_price(&body.price_id).is_none() {
        return Err(EndpointError::bad_request(
            ErrorCode::MissingPriceId,
            format!("Unknown billing price id: {}", body.price_id),
        ));
    }
    if body.mode != "subscription" && body.mode != "payment" {
        return Err(EndpointError::bad_request(
            ErrorCode::InvalidPlanConfiguration,
            format!("Unsupported checkout mode: {}", body.mode),
        ));
    }

    let customer_id = ctx.store.customer_for_user(&identity.user_id).await?;

    let session = ctx
        .gateway
        .create_checkout_session(CheckoutSessionParams {
            price_id: body.price_id,
            mode: body.mode,
            success_url: body.success_url,
            cancel_url: body.cancel_url,
            customer_id,
            client_reference_id: identity.user_id.clone(),
        })
        .await?;

    tracing::info!(user_id = %identity.user_id, session_id = %session.id, "created checkout session");

    Ok(Json(CreateCheckoutSessionResponse {
        session_id: session.id,
    }))
}
