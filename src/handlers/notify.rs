//! SNS notification endpoint.
//!
//! SNS delivers every envelope as a `POST` with a JSON body. The raw body is
//! parsed into an [`Envelope`] and handed to the [`Dispatcher`]; the outcome
//! decides the response status.
//!
//! ```text
//! POST /notifications -> Envelope::from_bytes -> Dispatcher::dispatch -> status code
//!                               |                        |
//!                               v                        v
//!                              400                 AppState counters
//! ```
//!
//! SNS retries deliveries that do not receive a 2xx. Failures a retry cannot
//! fix (`missing_handler`, `not_drs`, `unknown_message`) are acknowledged with
//! `202 Accepted` so they are not redelivered.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::config::NotifyConfig;
use crate::error::Result;
use crate::handlers::status::AppState;
use crate::sns::{
    CertUrlGuard, ConfirmationClient, DispatchOutcome, Dispatcher, Envelope, EnvelopeVerifier,
    ErrorKind, Handlers, HmacVerifier,
};

/// Header SNS sets to the envelope's `Type`
pub const MESSAGE_TYPE_HEADER: &str = "x-amz-sns-message-type";

/// Dispatcher with both collaborators behind trait objects
pub type SharedDispatcher = Dispatcher<Arc<dyn EnvelopeVerifier>, Arc<dyn ConfirmationClient>>;

/// Shared state for the notification endpoint
pub struct NotifyState {
    /// Pipeline used for every request
    pub dispatcher: SharedDispatcher,
    /// Callbacks invoked by the pipeline
    pub handlers: Handlers,
    /// Counters exposed on `/status`
    pub status: Arc<AppState>,
}

impl NotifyState {
    /// Assemble state from explicit collaborators
    pub fn new(
        verifier: Arc<dyn EnvelopeVerifier>,
        client: Arc<dyn ConfirmationClient>,
        handlers: Handlers,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::new(verifier, client),
            handlers,
            status: Arc::new(AppState::new()),
        }
    }

    /// Build the HMAC verifier (guarded when a trusted host suffix is configured)
    /// and a confirmation client honouring the configured timeout.
    pub fn from_config(config: &NotifyConfig, handlers: Handlers) -> Result<Self> {
        let hmac = HmacVerifier::new(config.signing_secret.as_bytes());
        let verifier: Arc<dyn EnvelopeVerifier> = match &config.trusted_cert_host_suffix {
            Some(suffix) => Arc::new(CertUrlGuard::new(hmac, suffix.clone())),
            None => Arc::new(hmac),
        };
        let client: Arc<dyn ConfirmationClient> = Arc::new(config.http_client()?);

        Ok(Self::new(verifier, client, handlers))
    }
}

impl std::fmt::Debug for NotifyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyState")
            .field("handlers", &self.handlers)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// HTTP status for a dispatch outcome
pub fn outcome_status(outcome: DispatchOutcome) -> StatusCode {
    match outcome {
        DispatchOutcome::Delivered(_) | DispatchOutcome::NonDrs | DispatchOutcome::Confirmed => {
            StatusCode::OK
        }
        DispatchOutcome::Failed(kind) => match kind {
            ErrorKind::InvalidSignature => StatusCode::UNAUTHORIZED,
            ErrorKind::InvalidJson
            | ErrorKind::MalformedNotification
            | ErrorKind::InvalidSubscriptionRequest => StatusCode::BAD_REQUEST,
            ErrorKind::InvalidSubscriptionRequestResponse => StatusCode::BAD_GATEWAY,
            ErrorKind::MissingHandler | ErrorKind::NotDrs | ErrorKind::UnknownMessage => {
                StatusCode::ACCEPTED
            }
        },
    }
}

/// Receive one SNS delivery.
///
/// # Route
/// `POST /notifications`
#[instrument(skip_all)]
pub async fn notification_handler(
    State(state): State<Arc<NotifyState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let envelope = match Envelope::from_bytes(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "Rejected body that is not an SNS envelope");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("invalid envelope: {e}") })),
            );
        }
    };

    if let Some(declared) = headers.get(MESSAGE_TYPE_HEADER) {
        let declared = declared.to_str().unwrap_or_default();
        if declared != envelope.kind.as_str() {
            warn!(declared, actual = envelope.kind.as_str(), "Message type header mismatch");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "message type header does not match envelope" })),
            );
        }
    }

    let start = Instant::now();
    let outcome = state.dispatcher.dispatch(&envelope, &state.handlers).await;
    state.status.record_dispatch(outcome, start.elapsed());

    debug!(outcome = outcome.label(), "Dispatch finished");
    (
        outcome_status(outcome),
        Json(json!({ "outcome": outcome.label() })),
    )
}

/// Create the notification router.
///
/// # Routes
/// - `POST /notifications` - SNS delivery endpoint
pub fn notify_router(state: Arc<NotifyState>) -> Router {
    Router::new()
        .route("/notifications", post(notification_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sns::NotificationType;

    #[test]
    fn test_outcome_status_success() {
        assert_eq!(
            outcome_status(DispatchOutcome::Delivered(NotificationType::ItemShipped)),
            StatusCode::OK
        );
        assert_eq!(outcome_status(DispatchOutcome::NonDrs), StatusCode::OK);
        assert_eq!(outcome_status(DispatchOutcome::Confirmed), StatusCode::OK);
    }

    #[test]
    fn test_outcome_status_failures() {
        let status = |kind| outcome_status(DispatchOutcome::Failed(kind));
        assert_eq!(status(ErrorKind::InvalidSignature), StatusCode::UNAUTHORIZED);
        assert_eq!(status(ErrorKind::InvalidJson), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(ErrorKind::InvalidSubscriptionRequestResponse),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status(ErrorKind::MissingHandler), StatusCode::ACCEPTED);
        assert_eq!(status(ErrorKind::UnknownMessage), StatusCode::ACCEPTED);
    }

    #[test]
    fn test_every_failure_is_mapped_to_an_error_or_accepted() {
        for kind in ErrorKind::ALL {
            let status = outcome_status(DispatchOutcome::Failed(kind));
            assert!(
                status.is_client_error()
                    || status.is_server_error()
                    || status == StatusCode::ACCEPTED
            );
        }
    }

    #[test]
    fn test_from_config_builds_state() {
        let state = NotifyState::from_config(&NotifyConfig::test_config(), Handlers::logging())
            .expect("state");
        assert_eq!(state.status.total_dispatches(), 0);
    }
}
