//! Dispatch Error Taxonomy
//!
//! Every failure in the dispatch pipeline is reported as a [`DispatchError`] value
//! delivered to the caller's error callback (or the `Err` side of [`validate`]).
//! Nothing here is ever thrown across the pipeline as control flow.
//!
//! The code -> reason table in [`ErrorKind`] is a public contract: codes are never
//! renumbered or removed.
//!
//! [`validate`]: crate::sns::Dispatcher::validate

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Closed set of dispatch failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The envelope `Message` is not valid JSON
    InvalidJson,
    /// The envelope failed signature verification
    InvalidSignature,
    /// No handler is registered for the classified notification type
    MissingHandler,
    /// The payload is not a Dash Replenishment notification
    NotDrs,
    /// The notification type discriminator is not one we know
    UnknownMessage,
    /// A subscription confirmation envelope has no usable `SubscribeURL`
    InvalidSubscriptionRequest,
    /// The subscription confirmation call failed or did not return 200
    InvalidSubscriptionRequestResponse,
    /// A classified notification lacks its device or customer identity
    MalformedNotification,
}

impl ErrorKind {
    /// Every kind, in code-table order
    pub const ALL: [ErrorKind; 8] = [
        Self::InvalidJson,
        Self::InvalidSignature,
        Self::MissingHandler,
        Self::NotDrs,
        Self::UnknownMessage,
        Self::InvalidSubscriptionRequest,
        Self::InvalidSubscriptionRequestResponse,
        Self::MalformedNotification,
    ];

    /// Wire code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidJson => "invalid_json",
            Self::InvalidSignature => "invalid_signature",
            Self::MissingHandler => "missing_handler",
            Self::NotDrs => "not_drs",
            Self::UnknownMessage => "unknown_message",
            Self::InvalidSubscriptionRequest => "invalid_subscription_request",
            Self::InvalidSubscriptionRequestResponse => "invalid_subscription_request_response",
            Self::MalformedNotification => "malformed_notification",
        }
    }

    /// Human-readable reason for this kind
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidJson => "Message could not be parsed as JSON",
            Self::InvalidSignature => "Message signature could not be verified",
            Self::MissingHandler => "No handler was supplied for this notification type",
            Self::NotDrs => "Message is not a Dash Replenishment Service notification",
            Self::UnknownMessage => "Notification type is not recognized",
            Self::InvalidSubscriptionRequest => {
                "Subscription confirmation request does not contain a SubscribeURL"
            }
            Self::InvalidSubscriptionRequestResponse => {
                "Subscription confirmation request did not succeed"
            }
            Self::MalformedNotification => {
                "Notification is missing required device or customer information"
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A single reported dispatch failure.
///
/// Built fresh for each report; nothing is shared between dispatch calls.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {}", .kind.reason())]
pub struct DispatchError {
    /// Failure code
    pub kind: ErrorKind,
    /// Diagnostic context (parse error, offending type, handler name, envelope, ...)
    pub raw: Value,
}

impl DispatchError {
    /// Create an error with arbitrary raw context
    pub fn new(kind: ErrorKind, raw: Value) -> Self {
        Self { kind, raw }
    }

    /// `invalid_json` carrying the parser error and the offending text
    pub fn invalid_json(error: &serde_json::Error, message: &str) -> Self {
        Self::new(
            ErrorKind::InvalidJson,
            json!({ "error": error.to_string(), "message": message }),
        )
    }

    /// `invalid_signature` carrying the verifier's error
    pub fn invalid_signature(error: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::InvalidSignature,
            json!({ "error": error.to_string() }),
        )
    }

    /// `missing_handler` naming the absent handler
    pub fn missing_handler(handler: &str) -> Self {
        Self::new(ErrorKind::MissingHandler, json!({ "handler": handler }))
    }

    /// `unknown_message` carrying the unrecognized type string
    pub fn unknown_message(notification_type: &str) -> Self {
        Self::new(
            ErrorKind::UnknownMessage,
            json!({ "message": notification_type }),
        )
    }

    /// `malformed_notification` with a description of what was wrong
    pub fn malformed(detail: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::MalformedNotification,
            json!({ "error": detail.to_string() }),
        )
    }

    /// Wire code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Human-readable reason
    pub fn reason(&self) -> &'static str {
        self.kind.reason()
    }
}

/// Serialized as `{ "code", "reason", "raw" }`
impl Serialize for DispatchError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("DispatchError", 3)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("reason", self.reason())?;
        state.serialize_field("raw", &self.raw)?;
        state.end()
    }
}
