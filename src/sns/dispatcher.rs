//! Dispatch Pipeline
//!
//! Turns one signed envelope into exactly one terminal action: a handler call,
//! an error report, or (for confirmation envelopes) one confirmation attempt.
//!
//! # Architecture
//!
//! ```text
//! Envelope
//!    |
//!    v
//! [Verify] --fail--> invalid_signature
//!    |
//!    +-- SubscriptionConfirmation --> [Confirm] --fail--> invalid_subscription_request(_response)
//!    |
//!    v
//! [Parse Message] --fail--> invalid_json
//!    |
//!    v
//! [Unwrap] --unknown type--> unknown_message
//!    |      --not DRS-------> on_non_drs_message | not_drs
//!    v
//! [Classify + Extract] --fail--> unknown_message | malformed_notification
//!    |
//!    v
//! [Handler] --absent--> missing_handler
//! ```

use tracing::{debug, info, instrument, warn};

use crate::sns::confirm::{confirm_subscription, ConfirmationClient};
use crate::sns::envelope::{Envelope, EnvelopeType};
use crate::sns::error::{DispatchError, ErrorKind};
use crate::sns::handler::{DeviceContext, Handlers};
use crate::sns::notification::{Notification, NotificationDetail, NotificationType};
use crate::sns::unwrap::{parse_message, unwrap_payload, Unwrapped};
use crate::sns::verifier::EnvelopeVerifier;

/// What a dispatch call ended with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler for this type was invoked
    Delivered(NotificationType),
    /// The non-DRS fallback handler was invoked
    NonDrs,
    /// A subscription was confirmed; no handler was invoked
    Confirmed,
    /// An error was reported through the error callback
    Failed(ErrorKind),
}

impl DispatchOutcome {
    /// Short label for logs and counters
    pub fn label(&self) -> &'static str {
        match self {
            Self::Delivered(kind) => kind.as_str(),
            Self::NonDrs => "non_drs",
            Self::Confirmed => "confirmed",
            Self::Failed(kind) => kind.code(),
        }
    }

    /// Whether an error was reported
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Routes verified envelopes to typed handlers
///
/// Holds no per-call state; one dispatcher serves any number of concurrent calls.
#[derive(Debug, Clone)]
pub struct Dispatcher<V, C = reqwest::Client> {
    verifier: V,
    client: C,
}

impl<V: EnvelopeVerifier, C: ConfirmationClient> Dispatcher<V, C> {
    /// Create a dispatcher from its two external collaborators
    pub fn new(verifier: V, client: C) -> Self {
        Self { verifier, client }
    }

    /// Verify, unwrap, classify and dispatch one envelope.
    ///
    /// Exactly one callback in `handlers` fires, unless this is a successful
    /// subscription confirmation, in which case none does.
    #[instrument(skip_all, fields(message_id = %envelope.message_id, envelope_type = envelope.kind.as_str()))]
    pub async fn dispatch(&self, envelope: &Envelope, handlers: &Handlers) -> DispatchOutcome {
        let verified = match self.validate(envelope).await {
            Ok(verified) => verified,
            Err(err) => return fail(handlers, err),
        };

        if verified.kind == EnvelopeType::SubscriptionConfirmation {
            return match confirm_subscription(&self.client, &verified).await {
                Ok(()) => DispatchOutcome::Confirmed,
                Err(err) => fail(handlers, err),
            };
        }

        match route(&verified, handlers) {
            Ok(outcome) => outcome,
            Err(err) => fail(handlers, err),
        }
    }

    /// Verify an envelope and nothing else.
    ///
    /// Any verifier failure becomes `invalid_signature`.
    #[instrument(skip_all, fields(message_id = %envelope.message_id))]
    pub async fn validate(&self, envelope: &Envelope) -> Result<Envelope, DispatchError> {
        self.verifier
            .verify(envelope)
            .await
            .map_err(DispatchError::invalid_signature)
    }

    /// Verify an envelope and report through callbacks.
    ///
    /// With `handlers`, failures go to its error callback and successes to
    /// `on_only_validate_message` when set. Anything not taken by `handlers` goes
    /// to `callback`, as `Ok(verified)` or `Err((error, original))`.
    pub async fn validate_with<F>(
        &self,
        envelope: &Envelope,
        handlers: Option<&Handlers>,
        callback: F,
    ) where
        F: FnOnce(Result<&Envelope, (&DispatchError, &Envelope)>),
    {
        match (self.validate(envelope).await, handlers) {
            (Err(err), Some(handlers)) => handlers.report(&err),
            (Err(err), None) => callback(Err((&err, envelope))),
            (Ok(verified), Some(Handlers { on_only_validate_message: Some(on_valid), .. })) => {
                on_valid(&verified)
            }
            (Ok(verified), _) => callback(Ok(&verified)),
        }
    }

    /// The verifier in use
    pub fn verifier(&self) -> &V {
        &self.verifier
    }
}

/// Parse, unwrap and classify a verified envelope, then invoke its handler
fn route(envelope: &Envelope, handlers: &Handlers) -> Result<DispatchOutcome, DispatchError> {
    let payload = parse_message(&envelope.message)
        .map_err(|e| DispatchError::invalid_json(&e, &envelope.message))?;

    let candidate = match unwrap_payload(payload) {
        Unwrapped::Candidate(candidate) => candidate,
        Unwrapped::UnknownType(name) => return Err(DispatchError::unknown_message(&name)),
        Unwrapped::NotDrs => {
            return match &handlers.on_non_drs_message {
                Some(on_non_drs) => {
                    debug!("Delivering non-DRS message to fallback handler");
                    on_non_drs(envelope);
                    Ok(DispatchOutcome::NonDrs)
                }
                None => Err(DispatchError::new(
                    ErrorKind::NotDrs,
                    serde_json::to_value(envelope).unwrap_or_default(),
                )),
            };
        }
    };

    let notification = Notification::classify(&candidate)?;
    deliver(&notification, envelope, handlers)
}

/// Invoke the handler matching `notification`, or build `missing_handler`
fn deliver(
    notification: &Notification,
    envelope: &Envelope,
    handlers: &Handlers,
) -> Result<DispatchOutcome, DispatchError> {
    let kind = notification.notification_type();
    let ctx = DeviceContext {
        customer_id: &notification.customer_id,
        model_id: &notification.model_id,
        serial_number: &notification.serial_number,
        envelope,
    };
    let missing = || DispatchError::missing_handler(kind.handler_name());

    match &notification.detail {
        NotificationDetail::DeviceDeregistered => {
            let handler = handlers.on_device_deregistered.as_ref().ok_or_else(missing)?;
            handler(&ctx);
        }
        NotificationDetail::DeviceRegistered => {
            let handler = handlers.on_device_registered.as_ref().ok_or_else(missing)?;
            handler(&ctx);
        }
        NotificationDetail::ItemShipped(order) => {
            let handler = handlers.on_item_shipped.as_ref().ok_or_else(missing)?;
            handler(&ctx, order);
        }
        NotificationDetail::OrderCancelled(order) => {
            let handler = handlers.on_order_cancelled.as_ref().ok_or_else(missing)?;
            handler(&ctx, order);
        }
        NotificationDetail::OrderPlaced(order) => {
            let handler = handlers.on_order_placed.as_ref().ok_or_else(missing)?;
            handler(&ctx, order);
        }
        NotificationDetail::SubscriptionChanged(status) => {
            let handler = handlers.on_subscription_changed.as_ref().ok_or_else(missing)?;
            handler(&ctx, status.as_ref());
        }
    }

    info!(
        notification_type = kind.as_str(),
        customer_id = %notification.customer_id,
        serial_number = %notification.serial_number,
        "DRS notification delivered"
    );
    Ok(DispatchOutcome::Delivered(kind))
}

fn fail(handlers: &Handlers, err: DispatchError) -> DispatchOutcome {
    warn!(
        code = err.code(),
        reason = err.reason(),
        raw = %err.raw,
        "DRS dispatch failed"
    );
    handlers.report(&err);
    DispatchOutcome::Failed(err.kind)
}
