//! drs-notify - Dash Replenishment notification dispatch over Amazon SNS
//!
//! This crate validates signed SNS envelopes carrying Dash Replenishment
//! Service (DRS) device notifications, confirms subscriptions, and routes every
//! notification to exactly one typed callback.
//!
//! # Features
//!
//! - **Dispatch Pipeline**: verify, unwrap, classify, invoke (see [`sns`])
//! - **Typed Notifications**: six DRS notification types with order details
//! - **Pluggable Verification**: HMAC-SHA256 verifier and certificate URL guard
//! - **HTTP Endpoint**: axum router with health and status endpoints
//!
//! # Architecture
//!
//! ```text
//! SNS ──▶ POST /notifications ──▶ Dispatcher ──▶ Handlers
//!                                     │
//!                                     ▼
//!                           ┌──────────────────┐
//!                           │ EnvelopeVerifier │
//!                           │ ConfirmationClient│
//!                           └──────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use drs_notify::handlers::{app_router, NotifyState};
//! use drs_notify::sns::Handlers;
//! use drs_notify::NotifyConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = NotifyConfig::from_env()?;
//!     let handlers = Handlers::new(|err| eprintln!("{err}"))
//!         .on_order_placed(|ctx, order| println!("{} -> {}", ctx.customer_id, order.instance_id));
//!
//!     let state = Arc::new(NotifyState::from_config(&config, handlers)?);
//!     let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
//!     axum::serve(listener, app_router(state)).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod sns;

// Re-exports for convenience
pub use config::NotifyConfig;
pub use error::{Error, Result};
pub use sns::{DispatchError, DispatchOutcome, Dispatcher, Envelope, ErrorKind, Handlers};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
