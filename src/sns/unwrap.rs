//! Message Unwrapping
//!
//! SNS can deliver a per-protocol message structure where the real payload sits
//! one level down under a delivery-protocol key. This module finds the canonical
//! payload, or decides that the message is not a domain notification at all.

use serde_json::Value;
use tracing::debug;

use crate::sns::notification::NotificationType;

/// Delivery-protocol keys checked for a nested payload, in priority order
pub const TRANSPORT_KEYS: [&str; 4] = ["default", "email", "http", "https"];

const DEVICE_INFO: &str = "deviceInfo";
const NOTIFICATION_INFO: &str = "notificationInfo";
const NOTIFICATION_TYPE: &str = "notificationType";

/// Result of unwrapping a parsed payload
#[derive(Debug, Clone, PartialEq)]
pub enum Unwrapped {
    /// A payload that should be classified as a domain notification
    Candidate(Value),
    /// `notificationInfo.notificationType` is present but not a known type
    UnknownType(String),
    /// Not a domain notification
    NotDrs,
}

/// Parse an envelope `Message` string into JSON
pub fn parse_message(message: &str) -> serde_json::Result<Value> {
    serde_json::from_str(message)
}

/// Locate the canonical payload.
///
/// A nested object under one of [`TRANSPORT_KEYS`] wins if it has `deviceInfo`.
/// Otherwise the top-level object must carry a known
/// `notificationInfo.notificationType`; any other non-null value there is an
/// unknown type.
pub fn unwrap_payload(payload: Value) -> Unwrapped {
    if let Some((key, nested)) = find_nested(&payload) {
        debug!(transport_key = key, "Selected nested transport payload");
        return Unwrapped::Candidate(nested);
    }

    let unknown = match discriminator(&payload) {
        None | Some(Value::Null) => return Unwrapped::NotDrs,
        Some(Value::String(name)) if name.parse::<NotificationType>().is_ok() => None,
        Some(Value::String(name)) => Some(name.clone()),
        Some(other) => Some(other.to_string()),
    };

    match unknown {
        Some(name) => Unwrapped::UnknownType(name),
        None => Unwrapped::Candidate(payload),
    }
}

fn find_nested(payload: &Value) -> Option<(&'static str, Value)> {
    TRANSPORT_KEYS.iter().find_map(|&key| {
        let nested = match payload.get(key)? {
            Value::Object(_) => payload[key].clone(),
            // Per-protocol messages usually arrive as JSON-encoded strings
            Value::String(text) => serde_json::from_str::<Value>(text).ok()?,
            _ => return None,
        };
        nested.get(DEVICE_INFO).is_some().then_some((key, nested))
    })
}

fn discriminator(payload: &Value) -> Option<&Value> {
    payload.get(NOTIFICATION_INFO)?.get(NOTIFICATION_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn drs_payload(kind: &str) -> Value {
        json!({
            "notificationInfo": { "notificationType": kind },
            "deviceInfo": {
                "deviceIdentifier": { "serialNumber": "S1" },
                "productIdentifier": { "modelId": "M1" }
            },
            "customerInfo": { "directedCustomerId": "C1" }
        })
    }

    #[test]
    fn test_top_level_known_type() {
        let payload = drs_payload("DeviceRegisteredNotification");
        assert_eq!(
            unwrap_payload(payload.clone()),
            Unwrapped::Candidate(payload)
        );
    }

    #[test]
    fn test_default_key_is_unwrapped() {
        let inner = drs_payload("DeviceRegisteredNotification");
        let wrapped = json!({ "default": inner.clone() });
        assert_eq!(unwrap_payload(wrapped), Unwrapped::Candidate(inner));
    }

    #[test]
    fn test_string_encoded_nested_payload() {
        let inner = drs_payload("OrderPlacedNotification");
        let wrapped = json!({ "https": inner.to_string() });
        assert_eq!(unwrap_payload(wrapped), Unwrapped::Candidate(inner));
    }

    #[test]
    fn test_transport_key_priority() {
        let first = drs_payload("DeviceRegisteredNotification");
        let second = drs_payload("DeviceDeregisteredNotification");
        let wrapped = json!({ "https": second, "default": first.clone() });
        assert_eq!(unwrap_payload(wrapped), Unwrapped::Candidate(first));
    }

    #[test]
    fn test_nested_without_device_info_is_skipped() {
        let wrapped = json!({
            "default": { "notificationInfo": { "notificationType": "OrderPlacedNotification" } }
        });
        assert_eq!(unwrap_payload(wrapped), Unwrapped::NotDrs);
    }

    #[test]
    fn test_unknown_type() {
        assert_eq!(
            unwrap_payload(drs_payload("FooBar")),
            Unwrapped::UnknownType("FooBar".to_string())
        );
    }

    #[test]
    fn test_non_drs_payloads() {
        assert_eq!(unwrap_payload(json!({ "hello": "world" })), Unwrapped::NotDrs);
        assert_eq!(unwrap_payload(json!([1, 2, 3])), Unwrapped::NotDrs);
        assert_eq!(unwrap_payload(json!("text")), Unwrapped::NotDrs);
        assert_eq!(
            unwrap_payload(json!({ "notificationInfo": { "notificationType": null } })),
            Unwrapped::NotDrs
        );
    }

    #[test]
    fn test_non_string_type_is_unknown() {
        assert_eq!(
            unwrap_payload(json!({ "notificationInfo": { "notificationType": 7 } })),
            Unwrapped::UnknownType("7".to_string())
        );
        assert_eq!(
            unwrap_payload(json!({ "notificationInfo": { "notificationType": ["a"] } })),
            Unwrapped::UnknownType(r#"["a"]"#.to_string())
        );
    }

    #[test]
    fn test_parse_message() {
        assert!(parse_message(r#"{"a":1}"#).is_ok());
        assert!(parse_message("{not json").is_err());
    }
}
