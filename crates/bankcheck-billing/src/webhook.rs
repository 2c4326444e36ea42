//! Webhook signature verification and event classification.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::BillingError;
use crate::types::SubscriptionStatus;

type HmacSha256 = Hmac<Sha256>;

/// Signature header sent by the payment platform.
///
/// Format: `t=<timestamp>,v1=<hex hmac of "timestamp.payload">`.
pub const SIGNATURE_HEADER: &str = "billing-signature";

/// Verify an inbound webhook signature against the shared secret.
pub fn verify_webhook_signature(
    payload: &[u8],
    signature_header: &str,
    webhook_secret: &str,
) -> Result<(), BillingError> {
    let parts: std::collections::HashMap<&str, &str> = signature_header
        .split(',')
        .filter_map(|part| {
            let mut kv = part.splitn(2, '=');
            Some((kv.next()?, kv.next()?))
        })
        .collect();

    let timestamp = parts
        .get("t")
        .ok_or(BillingError::WebhookSignatureInvalid)?;
    let signature = parts
        .get("v1")
        .ok_or(BillingError::WebhookSignatureInvalid)?;

    let payload = std::str::from_utf8(payload).map_err(|_| BillingError::WebhookSignatureInvalid)?;
    let signed_payload = format!("{timestamp}.{payload}");

    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())
        .map_err(|_| BillingError::WebhookSignatureInvalid)?;
    mac.update(signed_payload.as_bytes());

    let expected = hex::encode(mac.finalize().into_bytes());

    // Constant-time comparison
    if expected.as_bytes().ct_eq(signature.as_bytes()).into() {
        Ok(())
    } else {
        Err(BillingError::WebhookSignatureInvalid)
    }
}

/// Build a signature header for a payload. Used by tests and tooling.
pub fn sign_payload(payload: &[u8], timestamp: i64, webhook_secret: &str) -> String {
    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac =
        HmacSha256::new_from_slice(webhook_secret.as_bytes()).expect("hmac accepts any key size");
    mac.update(signed_payload.as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

/// Event types the sync handler acts on. Everything else is accepted
/// and ignored.
pub const SYNCED_EVENTS: &[&str] = &[
    "checkout.session.completed",
    "customer.subscription.created",
    "customer.subscription.updated",
    "customer.subscription.deleted",
];

pub fn is_synced_event(event_type: &str) -> bool {
    SYNCED_EVENTS.contains(&event_type)
}

/// Parse a subscription status string from a platform payload.
/// Unknown strings map to `Incomplete`.
pub fn parse_subscription_status(status: &str) -> SubscriptionStatus {
    match status {
        "active" => SubscriptionStatus::Active,
        "trialing" => SubscriptionStatus::Trialing,
        "past_due" => SubscriptionStatus::PastDue,
        "incomplete" => SubscriptionStatus::Incomplete,
        "incomplete_expired" => SubscriptionStatus::IncompleteExpired,
        "canceled" => SubscriptionStatus::Canceled,
        "unpaid" => SubscriptionStatus::Unpaid,
        _ => SubscriptionStatus::Incomplete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_webhook_signature_valid() {
        let secret = "whsec_test_secret";
        let payload = b"{\"type\":\"test\"}";
        let header = sign_payload(payload, 1614556800, secret);
        assert!(verify_webhook_signature(payload, &header, secret).is_ok());
    }

    #[test]
    fn test_verify_webhook_signature_invalid() {
        let result = verify_webhook_signature(b"payload", "t=123,v1=invalidsig", "secret");
        assert_eq!(result, Err(BillingError::WebhookSignatureInvalid));
    }

    #[test]
    fn test_verify_rejects_missing_parts() {
        assert!(verify_webhook_signature(b"payload", "v1=abc", "secret").is_err());
        assert!(verify_webhook_signature(b"payload", "t=123", "secret").is_err());
        assert!(verify_webhook_signature(b"payload", "", "secret").is_err());
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let payload = b"{}";
        let header = sign_payload(payload, 1614556800, "whsec_a");
        assert!(verify_webhook_signature(payload, &header, "whsec_b").is_err());
    }

    #[test]
    fn test_synced_events() {
        assert!(is_synced_event("checkout.session.completed"));
        assert!(is_synced_event("customer.subscription.updated"));
        assert!(!is_synced_event("invoice.paid"));
        assert!(!is_synced_event(""));
    }

    #[test]
    fn test_parse_subscription_status() {
        assert_eq!(parse_subscription_status("active"), SubscriptionStatus::Active);
        assert_eq!(parse_subscription_status("trialing"), SubscriptionStatus::Trialing);
        assert_eq!(parse_subscription_status("canceled"), SubscriptionStatus::Canceled);
        assert_eq!(
            parse_subscription_status("something_new"),
            SubscriptionStatus::Incomplete
        );
    }
}
