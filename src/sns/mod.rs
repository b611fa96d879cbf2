// Variant-per-wire-name enums and builder methods are self-describing
#![allow(missing_docs)]

//! SNS Dispatch Module
//!
//! Validates Amazon SNS envelopes carrying Dash Replenishment Service (DRS)
//! notifications and routes each one to a typed callback. It implements:
//!
//! - **Verification**: pluggable envelope signature verification
//! - **Subscription Confirmation**: one GET to the envelope's `SubscribeURL`
//! - **Unwrapping**: per-protocol message structures (`default`, `email`, `http`, `https`)
//! - **Classification**: six DRS notification types as a closed enum
//! - **Dispatch**: exactly one handler or error callback per envelope
//!
//! # Architecture
//!
//! ```text
//! Envelope -> Verify -> Confirm?  -> (done)
//!                |
//!                v
//!          Parse Message -> Unwrap -> Classify -> Handler
//!                |             |          |           |
//!                v             v          v           v
//!           invalid_json   not_drs /  unknown /   missing_handler
//!                          unknown    malformed
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use drs_notify::sns::{Dispatcher, Envelope, Handlers, HmacVerifier};
//!
//! # async fn run(body: &[u8]) -> anyhow::Result<()> {
//! let dispatcher = Dispatcher::new(HmacVerifier::new("secret"), reqwest::Client::new());
//! let handlers = Handlers::new(|err| eprintln!("{err}"))
//!     .on_order_placed(|ctx, order| println!("{} placed {}", ctx.customer_id, order.instance_id));
//!
//! let envelope = Envelope::from_bytes(body)?;
//! dispatcher.dispatch(&envelope, &handlers).await;
//! # Ok(())
//! # }
//! ```

pub mod confirm;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod notification;
pub mod unwrap;
pub mod verifier;

// Re-export commonly used items
pub use confirm::{
    confirm_subscription, ConfirmationClient, ConfirmationError, ConfirmationResponse,
};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use envelope::{Envelope, EnvelopeType};
pub use error::{DispatchError, ErrorKind};
pub use handler::{DeviceContext, Handlers};
pub use notification::{Notification, NotificationDetail, NotificationType, OrderInfo};
pub use unwrap::{unwrap_payload, Unwrapped, TRANSPORT_KEYS};
pub use verifier::{CertUrlGuard, EnvelopeVerifier, HmacVerifier, VerificationError};
