//! Billing error codes.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingError {
    WebhookSignatureInvalid,
    WebhookPayloadInvalid,
    MissingPriceId,
    InvalidPlanConfiguration,
    CustomerNotMapped,
    GatewayFailed,
}

impl BillingError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::WebhookSignatureInvalid => "WEBHOOK_SIGNATURE_INVALID",
            Self::WebhookPayloadInvalid => "WEBHOOK_PAYLOAD_INVALID",
            Self::MissingPriceId => "MISSING_PRICE_ID",
            Self::InvalidPlanConfiguration => "INVALID_PLAN_CONFIGURATION",
            Self::CustomerNotMapped => "CUSTOMER_NOT_MAPPED",
            Self::GatewayFailed => "GATEWAY_FAILED",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::WebhookSignatureInvalid => "Webhook signature verification failed",
            Self::WebhookPayloadInvalid => "Webhook payload could not be parsed",
            Self::MissingPriceId => "Plan has no billing price configured",
            Self::InvalidPlanConfiguration => "Plan configuration is invalid",
            Self::CustomerNotMapped => "No user is linked to this billing customer",
            Self::GatewayFailed => "Payment platform request failed",
        }
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for BillingError {}
