// Payment-platform access behind a trait, with a reqwest-backed
// implementation speaking the platform's form-encoded REST API.

use async_trait::async_trait;
use serde::Deserialize;

/// Gateway error.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The platform returned a non-2xx response. The message is the
    /// platform's own error text and is surfaced verbatim.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// Parameters for creating a checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionParams {
    pub price_id: String,
    pub mode: String,
    pub success_url: String,
    pub cancel_url: String,
    /// Existing platform customer, if the user already has one.
    pub customer_id: Option<String>,
    /// Our user id, echoed back on `checkout.session.completed`.
    pub client_reference_id: String,
}

/// A created checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedCheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// Subscription details as returned by the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySubscription {
    pub id: String,
    pub customer: String,
    pub status: String,
    pub current_period_start: i64,
    pub current_period_end: i64,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    pub price_id: Option<String>,
    pub default_payment_method: Option<String>,
}

/// Card details attached to a payment method.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentMethodInfo {
    pub brand: String,
    pub last4: String,
}

/// Calls into the payment platform.
#[async_trait]
pub trait BillingGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        params: CheckoutSessionParams,
    ) -> Result<CreatedCheckoutSession, GatewayError>;

    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<GatewaySubscription, GatewayError>;

    async fn fetch_payment_method(
        &self,
        payment_method_id: &str,
    ) -> Result<PaymentMethodInfo, GatewayError>;
}

/// HTTP implementation against the payment platform's REST API.
pub struct HttpBillingGateway {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl HttpBillingGateway {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self::with_base_url("https://api.billing.example.com", secret_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !status.is_success() {
            // The platform wraps errors as {"error": {"message": ...}}
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.get("error")?
                        .get("message")?
                        .as_str()
                        .map(|s| s.to_string())
                })
                .unwrap_or(body);
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl BillingGateway for HttpBillingGateway {
    async fn create_checkout_session(
        &self,
        params: CheckoutSessionParams,
    ) -> Result<CreatedCheckoutSession, GatewayError> {
        let mut form: Vec<(&str, String)> = vec![
            ("mode", params.mode),
            ("line_items[0][price]", params.price_id),
            ("line_items[0][quantity]", "1".into()),
            ("success_url", params.success_url),
            ("cancel_url", params.cancel_url),
            ("client_reference_id", params.client_reference_id),
        ];
        if let Some(customer) = params.customer_id {
            form.push(("customer", customer));
        }

        let resp = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Self::decode(resp).await
    }

    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<GatewaySubscription, GatewayError> {
        let resp = self
            .http
            .get(format!(
                "{}/v1/subscriptions/{}",
                self.base_url, subscription_id
            ))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        // The raw subscription carries the price under items.data[0].price.id;
        // flatten it before decoding.
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let mut value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))?;
        let price_id = value
            .pointer("/items/data/0/price/id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        if let Some(obj) = value.as_object_mut() {
            obj.insert("price_id".into(), serde_json::json!(price_id));
        }

        serde_json::from_value(value).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn fetch_payment_method(
        &self,
        payment_method_id: &str,
    ) -> Result<PaymentMethodInfo, GatewayError> {
        let resp = self
            .http
            .get(format!(
                "{}/v1/payment_methods/{}",
                self.base_url, payment_method_id
            ))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let value: serde_json::Value = Self::decode(resp).await?;
        let card = value
            .get("card")
            .cloned()
            .ok_or_else(|| GatewayError::Decode("payment method has no card".into()))?;
        serde_json::from_value(card).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}
