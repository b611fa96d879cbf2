//! Subscription Confirmation
//!
//! A `SubscriptionConfirmation` envelope is acknowledged by a single GET to its
//! `SubscribeURL`. Nothing is dispatched to domain handlers on this path.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::sns::envelope::Envelope;
use crate::sns::error::{DispatchError, ErrorKind};

/// Status and body of a confirmation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body, as text
    pub body: String,
}

/// Transport failure during a confirmation call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Confirmation request failed: {0}")]
pub struct ConfirmationError(pub String);

/// Outbound HTTP used to confirm subscriptions
#[async_trait]
pub trait ConfirmationClient: Send + Sync {
    /// Issue one GET to `url`
    async fn fetch(&self, url: &str) -> Result<ConfirmationResponse, ConfirmationError>;
}

#[async_trait]
impl ConfirmationClient for reqwest::Client {
    async fn fetch(&self, url: &str) -> Result<ConfirmationResponse, ConfirmationError> {
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|e| ConfirmationError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(status, error = %e, "Confirmation response body unreadable");
                String::new()
            }
        };

        Ok(ConfirmationResponse { status, body })
    }
}

#[async_trait]
impl<T: ConfirmationClient + ?Sized> ConfirmationClient for Arc<T> {
    async fn fetch(&self, url: &str) -> Result<ConfirmationResponse, ConfirmationError> {
        (**self).fetch(url).await
    }
}

/// Confirm the subscription announced by `envelope`.
///
/// A missing or blank `SubscribeURL` fails with `invalid_subscription_request`
/// before any network call. A transport error or any status other than 200 fails
/// with `invalid_subscription_request_response`. The caller logs the failure.
pub async fn confirm_subscription<C>(client: &C, envelope: &Envelope) -> Result<(), DispatchError>
where
    C: ConfirmationClient + ?Sized,
{
    let Some(url) = envelope.confirmation_url() else {
        return Err(DispatchError::new(
            ErrorKind::InvalidSubscriptionRequest,
            serde_json::to_value(envelope).unwrap_or_default(),
        ));
    };

    match client.fetch(url).await {
        Ok(response) if response.status == 200 => {
            info!(
                topic_arn = %envelope.topic_arn,
                "Subscription confirmed"
            );
            Ok(())
        }
        Ok(response) => {
            debug!(
                topic_arn = %envelope.topic_arn,
                status = response.status,
                "Subscription confirmation rejected"
            );
            Err(DispatchError::new(
                ErrorKind::InvalidSubscriptionRequestResponse,
                json!({
                    "error": null,
                    "status": response.status,
                    "body": response.body,
                }),
            ))
        }
        Err(e) => {
            debug!(
                topic_arn = %envelope.topic_arn,
                error = %e,
                "Subscription confirmation request failed"
            );
            Err(DispatchError::new(
                ErrorKind::InvalidSubscriptionRequestResponse,
                json!({
                    "error": e.to_string(),
                    "status": null,
                    "body": null,
                }),
            ))
        }
    }
}
