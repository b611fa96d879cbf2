//! Handler Set
//!
//! A [`Handlers`] value is the caller-supplied table of callbacks the dispatcher
//! picks from. Only the error callback is mandatory; every per-type handler and
//! both fallbacks are optional.
//!
//! # Example
//!
//! ```rust
//! use drs_notify::sns::Handlers;
//!
//! let handlers = Handlers::new(|err| eprintln!("dispatch failed: {err}"))
//!     .on_order_placed(|ctx, order| {
//!         println!("{} ordered {} items", ctx.customer_id, order.product_info.len());
//!     })
//!     .on_non_drs_message(|envelope| println!("ignoring {}", envelope.message_id));
//! ```

use serde_json::Value;
use tracing::{info, warn};

use crate::sns::envelope::Envelope;
use crate::sns::error::DispatchError;
use crate::sns::notification::OrderInfo;

/// Identity fields handed to every notification handler
#[derive(Debug, Clone, Copy)]
pub struct DeviceContext<'a> {
    /// Directed customer id
    pub customer_id: &'a str,
    /// Device model id
    pub model_id: &'a str,
    /// Device serial number
    pub serial_number: &'a str,
    /// The verified envelope the notification arrived in
    pub envelope: &'a Envelope,
}

pub type DeviceCallback = Box<dyn Fn(&DeviceContext<'_>) + Send + Sync>;
pub type OrderCallback = Box<dyn Fn(&DeviceContext<'_>, &OrderInfo) + Send + Sync>;
pub type SubscriptionCallback = Box<dyn Fn(&DeviceContext<'_>, Option<&Value>) + Send + Sync>;
pub type EnvelopeCallback = Box<dyn Fn(&Envelope) + Send + Sync>;
pub type ErrorCallback = Box<dyn Fn(&DispatchError) + Send + Sync>;

/// Callbacks for one or more dispatch calls
pub struct Handlers {
    pub(crate) on_error: ErrorCallback,
    pub(crate) on_device_deregistered: Option<DeviceCallback>,
    pub(crate) on_device_registered: Option<DeviceCallback>,
    pub(crate) on_item_shipped: Option<OrderCallback>,
    pub(crate) on_order_cancelled: Option<OrderCallback>,
    pub(crate) on_order_placed: Option<OrderCallback>,
    pub(crate) on_subscription_changed: Option<SubscriptionCallback>,
    pub(crate) on_non_drs_message: Option<EnvelopeCallback>,
    pub(crate) on_only_validate_message: Option<EnvelopeCallback>,
}

impl Handlers {
    /// Start a handler set with its mandatory error callback
    pub fn new<F>(on_error: F) -> Self
    where
        F: Fn(&DispatchError) + Send + Sync + 'static,
    {
        Self {
            on_error: Box::new(on_error),
            on_device_deregistered: None,
            on_device_registered: None,
            on_item_shipped: None,
            on_order_cancelled: None,
            on_order_placed: None,
            on_subscription_changed: None,
            on_non_drs_message: None,
            on_only_validate_message: None,
        }
    }

    pub fn on_device_deregistered<F>(mut self, f: F) -> Self
    where
        F: Fn(&DeviceContext<'_>) + Send + Sync + 'static,
    {
        self.on_device_deregistered = Some(Box::new(f));
        self
    }

    pub fn on_device_registered<F>(mut self, f: F) -> Self
    where
        F: Fn(&DeviceContext<'_>) + Send + Sync + 'static,
    {
        self.on_device_registered = Some(Box::new(f));
        self
    }

    pub fn on_item_shipped<F>(mut self, f: F) -> Self
    where
        F: Fn(&DeviceContext<'_>, &OrderInfo) + Send + Sync + 'static,
    {
        self.on_item_shipped = Some(Box::new(f));
        self
    }

    pub fn on_order_cancelled<F>(mut self, f: F) -> Self
    where
        F: Fn(&DeviceContext<'_>, &OrderInfo) + Send + Sync + 'static,
    {
        self.on_order_cancelled = Some(Box::new(f));
        self
    }

    pub fn on_order_placed<F>(mut self, f: F) -> Self
    where
        F: Fn(&DeviceContext<'_>, &OrderInfo) + Send + Sync + 'static,
    {
        self.on_order_placed = Some(Box::new(f));
        self
    }

    /// Receives `subscriptionInfo.slotsSubscriptionStatus`, if present
    pub fn on_subscription_changed<F>(mut self, f: F) -> Self
    where
        F: Fn(&DeviceContext<'_>, Option<&Value>) + Send + Sync + 'static,
    {
        self.on_subscription_changed = Some(Box::new(f));
        self
    }

    /// Receives verified envelopes that are not DRS notifications.
    ///
    /// Without it those envelopes are reported as `not_drs`.
    pub fn on_non_drs_message<F>(mut self, f: F) -> Self
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        self.on_non_drs_message = Some(Box::new(f));
        self
    }

    /// Receives the verified envelope from [`validate_with`](crate::sns::Dispatcher::validate_with)
    pub fn on_only_validate_message<F>(mut self, f: F) -> Self
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        self.on_only_validate_message = Some(Box::new(f));
        self
    }

    /// Report an error through the error callback
    pub fn report(&self, err: &DispatchError) {
        (self.on_error)(err)
    }

    /// A handler set that logs every notification.
    ///
    /// Every type has a handler, so `missing_handler` never fires.
    pub fn logging() -> Self {
        Self::new(|err| {
            warn!(code = err.code(), raw = %err.raw, "DRS notification rejected");
        })
        .on_device_deregistered(|ctx| {
            info!(
                customer_id = ctx.customer_id,
                serial_number = ctx.serial_number,
                model_id = ctx.model_id,
                "Device deregistered"
            );
        })
        .on_device_registered(|ctx| {
            info!(
                customer_id = ctx.customer_id,
                serial_number = ctx.serial_number,
                model_id = ctx.model_id,
                "Device registered"
            );
        })
        .on_item_shipped(|ctx, order| {
            info!(
                customer_id = ctx.customer_id,
                serial_number = ctx.serial_number,
                instance_id = %order.instance_id,
                products = order.product_info.len(),
                "Item shipped"
            );
        })
        .on_order_cancelled(|ctx, order| {
            info!(
                customer_id = ctx.customer_id,
                serial_number = ctx.serial_number,
                instance_id = %order.instance_id,
                "Order cancelled"
            );
        })
        .on_order_placed(|ctx, order| {
            info!(
                customer_id = ctx.customer_id,
                serial_number = ctx.serial_number,
                instance_id = %order.instance_id,
                slot_id = %order.slot_id,
                products = order.product_info.len(),
                "Order placed"
            );
        })
        .on_subscription_changed(|ctx, status| {
            info!(
                customer_id = ctx.customer_id,
                serial_number = ctx.serial_number,
                status = ?status,
                "Subscription changed"
            );
        })
        .on_non_drs_message(|envelope| {
            info!(
                message_id = %envelope.message_id,
                topic_arn = %envelope.topic_arn,
                "Ignoring non-DRS message"
            );
        })
    }
}

impl std::fmt::Debug for Handlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handlers")
            .field("on_device_deregistered", &self.on_device_deregistered.is_some())
            .field("on_device_registered", &self.on_device_registered.is_some())
            .field("on_item_shipped", &self.on_item_shipped.is_some())
            .field("on_order_cancelled", &self.on_order_cancelled.is_some())
            .field("on_order_placed", &self.on_order_placed.is_some())
            .field("on_subscription_changed", &self.on_subscription_changed.is_some())
            .field("on_non_drs_message", &self.on_non_drs_message.is_some())
            .field("on_only_validate_message", &self.on_only_validate_message.is_some())
            .finish()
    }
}
