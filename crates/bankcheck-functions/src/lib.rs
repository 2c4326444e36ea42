//! # bankcheck-functions
//!
//! The serverless endpoints for MyBankCheck as an axum router.
//!
//! ## Endpoints
//! - POST /billing/create-checkout-session — create a checkout session
//! - GET  /billing/subscription — read the caller's subscription row
//! - POST /billing/webhook — signed billing-event sync
//! - GET/POST/PUT/DELETE /admin/data, /admin/users — back office

pub mod auth;
pub mod context;
pub mod gateway;
pub mod routes;
pub mod store;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use bankcheck_core::config::PlatformConfig;
use bankcheck_core::error::{ApiError, ErrorCode, HttpStatus};

use crate::auth::{decode_access_token, extract_bearer, Identity};
use crate::context::FunctionsContext;
use crate::gateway::{BillingGateway, GatewayError};
use crate::store::{StoreError, TableStore};

// ─── Error Handling ─────────────────────────────────────────────────

/// [`ApiError`] carried into axum responses.
///
/// Serialized as `{"error": message, "code": code}` — clients read the
/// `error` field and surface it verbatim.
#[derive(Debug)]
pub struct EndpointError(pub ApiError);

impl EndpointError {
    pub fn bad_request(code: ErrorCode, message: impl Into<String>) -> Self {
        Self(ApiError::with_message(HttpStatus::BadRequest, code, message))
    }

    pub fn unauthorized() -> Self {
        Self(ApiError::unauthorized())
    }

    pub fn forbidden() -> Self {
        Self(ApiError::forbidden())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self(ApiError::with_message(
            HttpStatus::NotFound,
            ErrorCode::NotFound,
            message,
        ))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self(ApiError::internal(message))
    }

    pub fn status(&self) -> HttpStatus {
        self.0.status
    }
}

impl From<ApiError> for EndpointError {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.to_json())).into_response()
    }
}

impl From<StoreError> for EndpointError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => Self::not_found("Not found"),
            StoreError::Serialization(msg) => Self::bad_request(ErrorCode::CouldNotParseBody, msg),
            StoreError::Backend(msg) => Self::internal(msg),
        }
    }
}

impl From<GatewayError> for EndpointError {
    fn from(e: GatewayError) -> Self {
        match e {
            // The platform's own message travels through verbatim.
            GatewayError::Api { message, .. } => Self(ApiError::with_message(
                HttpStatus::BadGateway,
                ErrorCode::InternalServerError,
                message,
            )),
            GatewayError::Network(msg) => Self(ApiError::with_message(
                HttpStatus::BadGateway,
                ErrorCode::NetworkError,
                msg,
            )),
            GatewayError::Decode(msg) => Self::internal(msg),
        }
    }
}

// ─── Auth helpers ───────────────────────────────────────────────────

/// Decode the caller's bearer token. 401 when missing or invalid.
pub(crate) fn require_identity(
    ctx: &FunctionsContext,
    headers: &axum::http::HeaderMap,
) -> Result<Identity, EndpointError> {
    let token = extract_bearer(headers).ok_or_else(EndpointError::unauthorized)?;
    decode_access_token(&token, &ctx.jwt_secret).ok_or_else(EndpointError::unauthorized)
}

/// Decode the caller's bearer token and check the admin allow-list.
/// 401 for missing/invalid tokens, 403 for non-admin identities.
pub(crate) fn require_admin(
    ctx: &FunctionsContext,
    headers: &axum::http::HeaderMap,
) -> Result<Identity, EndpointError> {
    let identity = require_identity(ctx, headers)?;
    if !ctx.config.is_admin_email(&identity.email) {
        return Err(EndpointError::forbidden());
    }
    Ok(identity)
}

// ─── Router ─────────────────────────────────────────────────────────

/// Entry point for serving the MyBankCheck functions.
pub struct BankCheckFunctions {
    ctx: Arc<FunctionsContext>,
}

impl BankCheckFunctions {
    pub fn new(
        config: PlatformConfig,
        store: Arc<dyn TableStore>,
        gateway: Arc<dyn BillingGateway>,
    ) -> Self {
        let ctx = FunctionsContext::new(config, store, gateway);
        Self { ctx }
    }

    pub fn from_context(ctx: Arc<FunctionsContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<FunctionsContext> {
        &self.ctx
    }

    /// Build the axum router with all endpoints.
    pub fn router(&self) -> Router {
        Router::new()
            .route(
                "/billing/create-checkout-session",
                post(routes::checkout::handle_create_checkout_session),
            )
            .route(
                "/billing/subscription",
                get(routes::subscription::handle_get_subscription),
            )
            .route("/billing/webhook", post(routes::webhook::handle_webhook))
            .route(
                "/admin/data",
                get(routes::admin::handle_list_data)
                    .post(routes::admin::handle_insert_data)
                    .put(routes::admin::handle_update_data)
                    .delete(routes::admin::handle_delete_data),
            )
            .route(
                "/admin/users",
                get(routes::admin::handle_list_users)
                    .post(routes::admin::handle_create_user)
                    .put(routes::admin::handle_update_user)
                    .delete(routes::admin::handle_delete_user),
            )
            .with_state(self.ctx.clone())
    }

    /// Build the router with permissive CORS, for browser clients.
    pub fn router_with_cors(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        self.router().layer(cors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_error_shapes() {
        let err = EndpointError::unauthorized();
        assert_eq!(err.status(), HttpStatus::Unauthorized);

        let err = EndpointError::forbidden();
        assert_eq!(err.status(), HttpStatus::Forbidden);

        let err: EndpointError = StoreError::NotFound.into();
        assert_eq!(err.status(), HttpStatus::NotFound);
    }

    #[test]
    fn test_gateway_api_error_message_passes_through() {
        let err: EndpointError = GatewayError::Api {
            status: 402,
            message: "Your card was declined.".into(),
        }
        .into();
        assert_eq!(err.0.message, "Your card was declined.");
        assert_eq!(err.status(), HttpStatus::BadGateway);
    }
}
