//! SNS Envelope Types
//!
//! The signed top-level record Amazon SNS POSTs to an HTTP(S) subscription.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope type tags delivered by SNS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvelopeType {
    /// A published message
    Notification,
    /// Sent once when an endpoint is subscribed to a topic
    SubscriptionConfirmation,
    /// Sent when the subscription is removed
    UnsubscribeConfirmation,

    // Catch-all for types SNS may add later
    #[serde(other)]
    Unknown,
}

impl FromStr for EnvelopeType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Notification" => Self::Notification,
            "SubscriptionConfirmation" => Self::SubscriptionConfirmation,
            "UnsubscribeConfirmation" => Self::UnsubscribeConfirmation,
            _ => Self::Unknown,
        })
    }
}

impl EnvelopeType {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notification => "Notification",
            Self::SubscriptionConfirmation => "SubscriptionConfirmation",
            Self::UnsubscribeConfirmation => "UnsubscribeConfirmation",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether this envelope carries a subscribe token and URL
    pub fn is_confirmation(&self) -> bool {
        matches!(
            self,
            Self::SubscriptionConfirmation | Self::UnsubscribeConfirmation
        )
    }
}

/// Signed SNS envelope
///
/// Field names follow the SNS HTTP/S wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Envelope {
    /// Envelope type tag
    #[serde(rename = "Type")]
    pub kind: EnvelopeType,

    /// Unique message identifier
    #[serde(default)]
    pub message_id: String,

    /// Topic the message was published to
    #[serde(default)]
    pub topic_arn: String,

    /// Optional subject line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Opaque JSON-encoded payload
    #[serde(default)]
    pub message: String,

    /// RFC 3339 publish time, kept verbatim for signing
    #[serde(default)]
    pub timestamp: String,

    /// Signature scheme version ("1" = SHA1, "2" = SHA256)
    #[serde(default)]
    pub signature_version: String,

    /// Base64 signature over [`Envelope::string_to_sign`]
    #[serde(default)]
    pub signature: String,

    /// Where the signing certificate can be fetched
    #[serde(rename = "SigningCertURL", default)]
    pub signing_cert_url: String,

    /// Confirmation URL (confirmation envelopes only)
    #[serde(
        rename = "SubscribeURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub subscribe_url: Option<String>,

    /// Subscription token (confirmation envelopes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Unsubscribe link (notification envelopes only)
    #[serde(
        rename = "UnsubscribeURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub unsubscribe_url: Option<String>,
}

impl Envelope {
    /// Parse from raw JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Parsed publish time, if the timestamp is well formed
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// The non-empty confirmation URL, if any
    pub fn confirmation_url(&self) -> Option<&str> {
        self.subscribe_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Canonical string SNS signs for this envelope.
    ///
    /// Keys appear in byte order, each followed by its value, one per line.
    /// `Subject` is included only when present on notifications.
    pub fn string_to_sign(&self) -> String {
        let mut fields: Vec<(&str, &str)> = vec![
            ("Message", self.message.as_str()),
            ("MessageId", self.message_id.as_str()),
        ];

        if self.kind.is_confirmation() {
            fields.push(("SubscribeURL", self.subscribe_url.as_deref().unwrap_or("")));
            fields.push(("Timestamp", self.timestamp.as_str()));
            fields.push(("Token", self.token.as_deref().unwrap_or("")));
        } else {
            if let Some(subject) = self.subject.as_deref() {
                fields.push(("Subject", subject));
            }
            fields.push(("Timestamp", self.timestamp.as_str()));
        }

        fields.push(("TopicArn", self.topic_arn.as_str()));
        fields.push(("Type", self.kind.as_str()));

        let mut out = String::new();
        for (key, value) in fields {
            out.push_str(key);
            out.push('\n');
            out.push_str(value);
            out.push('\n');
        }
        out
    }
}
