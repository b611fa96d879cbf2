//! Dash Replenishment Notification Types
//!
//! Strongly-typed representation of the six DRS notification types and the
//! classifier that turns an unwrapped payload into a [`Notification`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::sns::error::DispatchError;

/// The DRS notification types we dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationType {
    #[serde(rename = "DeviceDeregisteredNotification")]
    DeviceDeregistered,
    #[serde(rename = "DeviceRegisteredNotification")]
    DeviceRegistered,
    #[serde(rename = "ItemShippedNotification")]
    ItemShipped,
    #[serde(rename = "OrderCancelledNotification")]
    OrderCancelled,
    #[serde(rename = "OrderPlacedNotification")]
    OrderPlaced,
    #[serde(rename = "SubscriptionChangedNotification")]
    SubscriptionChanged,
}

/// A `notificationType` outside the known set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown notification type: {0}")]
pub struct UnknownNotificationType(pub String);

impl FromStr for NotificationType {
    type Err = UnknownNotificationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DeviceDeregisteredNotification" => Ok(Self::DeviceDeregistered),
            "DeviceRegisteredNotification" => Ok(Self::DeviceRegistered),
            "ItemShippedNotification" => Ok(Self::ItemShipped),
            "OrderCancelledNotification" => Ok(Self::OrderCancelled),
            "OrderPlacedNotification" => Ok(Self::OrderPlaced),
            "SubscriptionChangedNotification" => Ok(Self::SubscriptionChanged),
            other => Err(UnknownNotificationType(other.to_string())),
        }
    }
}

impl NotificationType {
    /// Every known type
    pub const ALL: [NotificationType; 6] = [
        Self::DeviceDeregistered,
        Self::DeviceRegistered,
        Self::ItemShipped,
        Self::OrderCancelled,
        Self::OrderPlaced,
        Self::SubscriptionChanged,
    ];

    /// Wire name of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeviceDeregistered => "DeviceDeregisteredNotification",
            Self::DeviceRegistered => "DeviceRegisteredNotification",
            Self::ItemShipped => "ItemShippedNotification",
            Self::OrderCancelled => "OrderCancelledNotification",
            Self::OrderPlaced => "OrderPlacedNotification",
            Self::SubscriptionChanged => "SubscriptionChangedNotification",
        }
    }

    /// Name of the handler that receives this type, as reported in `missing_handler`
    pub fn handler_name(&self) -> &'static str {
        match self {
            Self::DeviceDeregistered => "onDeviceDeregistered",
            Self::DeviceRegistered => "onDeviceRegistered",
            Self::ItemShipped => "onItemShipped",
            Self::OrderCancelled => "onOrderCancelled",
            Self::OrderPlaced => "onOrderPlaced",
            Self::SubscriptionChanged => "onSubscriptionChanged",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order Types
// =============================================================================

/// Order details carried by shipped/cancelled/placed notifications
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderInfo {
    /// Order instance id ("" when absent)
    pub instance_id: String,
    /// Replenishment slot id ("" when absent)
    pub slot_id: String,
    /// Product lines exactly as received
    pub product_info: Vec<Value>,
}

impl OrderInfo {
    /// ASINs of the product lines that carry one
    pub fn asins(&self) -> impl Iterator<Item = &str> {
        self.product_info
            .iter()
            .filter_map(|product| product.get("asin").and_then(Value::as_str))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrderInfo {
    #[serde(default)]
    instance_id: Option<String>,
    #[serde(default)]
    slot_id: Option<String>,
    #[serde(default)]
    product_info: Option<Value>,
}

// =============================================================================
// Classified Notification
// =============================================================================

/// Type-specific part of a notification
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationDetail {
    DeviceDeregistered,
    DeviceRegistered,
    ItemShipped(OrderInfo),
    /// Product info is always empty for cancellations
    OrderCancelled(OrderInfo),
    OrderPlaced(OrderInfo),
    /// `subscriptionInfo.slotsSubscriptionStatus`, which may be absent
    SubscriptionChanged(Option<Value>),
}

impl NotificationDetail {
    /// The notification type this detail belongs to
    pub fn notification_type(&self) -> NotificationType {
        match self {
            Self::DeviceDeregistered => NotificationType::DeviceDeregistered,
            Self::DeviceRegistered => NotificationType::DeviceRegistered,
            Self::ItemShipped(_) => NotificationType::ItemShipped,
            Self::OrderCancelled(_) => NotificationType::OrderCancelled,
            Self::OrderPlaced(_) => NotificationType::OrderPlaced,
            Self::SubscriptionChanged(_) => NotificationType::SubscriptionChanged,
        }
    }
}

/// A classified DRS notification with its extracted fields
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub customer_id: String,
    pub model_id: String,
    pub serial_number: String,
    pub detail: NotificationDetail,
}

impl Notification {
    /// The notification's type
    pub fn notification_type(&self) -> NotificationType {
        self.detail.notification_type()
    }

    /// Classify an unwrapped payload and extract its fields.
    ///
    /// Fails with `unknown_message` for an unrecognized type and with
    /// `malformed_notification` when identity fields are missing or any
    /// sub-object has the wrong shape. No identity defaults are guessed.
    pub fn classify(payload: &Value) -> Result<Self, DispatchError> {
        let notification_type = match payload.pointer("/notificationInfo/notificationType") {
            None | Some(Value::Null) => {
                return Err(DispatchError::malformed(
                    "missing field /notificationInfo/notificationType",
                ))
            }
            Some(Value::String(name)) => name
                .parse::<NotificationType>()
                .map_err(|e| DispatchError::unknown_message(&e.0))?,
            Some(other) => return Err(DispatchError::unknown_message(&other.to_string())),
        };

        let serial_number = required_str(payload, "/deviceInfo/deviceIdentifier/serialNumber")?;
        let model_id = required_str(payload, "/deviceInfo/productIdentifier/modelId")?;
        let customer_id = required_str(payload, "/customerInfo/directedCustomerId")?;

        let detail = match notification_type {
            NotificationType::DeviceDeregistered => NotificationDetail::DeviceDeregistered,
            NotificationType::DeviceRegistered => NotificationDetail::DeviceRegistered,
            NotificationType::ItemShipped => {
                NotificationDetail::ItemShipped(order_info(payload, Products::Keep)?)
            }
            NotificationType::OrderCancelled => {
                NotificationDetail::OrderCancelled(order_info(payload, Products::Drop)?)
            }
            NotificationType::OrderPlaced => {
                NotificationDetail::OrderPlaced(order_info(payload, Products::Keep)?)
            }
            NotificationType::SubscriptionChanged => {
                let status = payload
                    .get("subscriptionInfo")
                    .and_then(|info| info.get("slotsSubscriptionStatus"))
                    .cloned();
                NotificationDetail::SubscriptionChanged(status)
            }
        };

        Ok(Self {
            customer_id: customer_id.to_string(),
            model_id: model_id.to_string(),
            serial_number: serial_number.to_string(),
            detail,
        })
    }
}

fn required_str<'a>(payload: &'a Value, pointer: &str) -> Result<&'a str, DispatchError> {
    payload
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| DispatchError::malformed(format!("missing string field {pointer}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Products {
    Keep,
    Drop,
}

fn order_info(payload: &Value, products: Products) -> Result<OrderInfo, DispatchError> {
    let raw = match payload.get("orderInfo") {
        None | Some(Value::Null) => RawOrderInfo::default(),
        Some(value) => RawOrderInfo::deserialize(value)
            .map_err(|e| DispatchError::malformed(format!("invalid orderInfo: {e}")))?,
    };

    // Cancellations never carry product lines, whatever arrived
    let product_info = match (products, raw.product_info) {
        (Products::Drop, _) | (Products::Keep, None | Some(Value::Null)) => Vec::new(),
        (Products::Keep, Some(Value::Array(items))) => items,
        (Products::Keep, Some(other)) => {
            return Err(DispatchError::malformed(format!(
                "invalid orderInfo: productInfo must be a list, got {other}"
            )))
        }
    };

    Ok(OrderInfo {
        instance_id: raw.instance_id.unwrap_or_default(),
        slot_id: raw.slot_id.unwrap_or_default(),
        product_info,
    })
}
