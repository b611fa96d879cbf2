//! Envelope Signature Verification
//!
//! The dispatch pipeline consumes verification through the [`EnvelopeVerifier`]
//! trait and treats every failure the same way (`invalid_signature`).
//!
//! Two building blocks are bundled:
//!
//! - [`HmacVerifier`]: checks `Signature` as base64 HMAC-SHA256 of the canonical
//!   string-to-sign under a shared secret. Used behind signing relays and in tests.
//! - [`CertUrlGuard`]: rejects envelopes whose `SigningCertURL` is not an https URL
//!   on a trusted host before handing them to an inner verifier.
//!
//! # Security
//!
//! - Comparison of signatures is constant-time
//! - The secret is never logged

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::sns::envelope::Envelope;

type HmacSha256 = Hmac<Sha256>;

/// Why an envelope could not be verified
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// The envelope carries no signature
    #[error("Envelope is not signed")]
    MissingSignature,

    /// The signature is not valid base64
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    /// The signature does not match the envelope contents
    #[error("Signature does not match envelope contents")]
    SignatureMismatch,

    /// The signing certificate location is not trusted
    #[error("Untrusted signing certificate URL: {0}")]
    UntrustedCertificate(String),

    /// Any other verifier failure
    #[error("Verification failed: {0}")]
    Other(String),
}

/// Verifies the authenticity of an envelope.
///
/// Resolves once, with no retries. On success the returned envelope is the one the
/// pipeline continues with.
#[async_trait]
pub trait EnvelopeVerifier: Send + Sync {
    /// Verify `envelope`, returning the verified copy
    async fn verify(&self, envelope: &Envelope) -> Result<Envelope, VerificationError>;
}

#[async_trait]
impl<T: EnvelopeVerifier + ?Sized> EnvelopeVerifier for Arc<T> {
    async fn verify(&self, envelope: &Envelope) -> Result<Envelope, VerificationError> {
        (**self).verify(envelope).await
    }
}

#[async_trait]
impl<T: EnvelopeVerifier + ?Sized> EnvelopeVerifier for Box<T> {
    async fn verify(&self, envelope: &Envelope) -> Result<Envelope, VerificationError> {
        (**self).verify(envelope).await
    }
}

// =============================================================================
// Shared-secret verifier
// =============================================================================

/// HMAC-SHA256 verifier over [`Envelope::string_to_sign`]
#[derive(Clone)]
pub struct HmacVerifier {
    secret: Vec<u8>,
}

impl std::fmt::Debug for HmacVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl HmacVerifier {
    /// Create a verifier for the given shared secret
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, envelope: &Envelope) -> Result<HmacSha256, VerificationError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| VerificationError::Other(e.to_string()))?;
        mac.update(envelope.string_to_sign().as_bytes());
        Ok(mac)
    }

    /// Compute the base64 signature for `envelope`.
    ///
    /// Relays use this to sign envelopes they forward.
    pub fn sign(&self, envelope: &Envelope) -> Result<String, VerificationError> {
        let mac = self.mac(envelope)?;
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    fn check(&self, envelope: &Envelope) -> Result<(), VerificationError> {
        if envelope.signature.trim().is_empty() {
            return Err(VerificationError::MissingSignature);
        }

        let expected = BASE64
            .decode(envelope.signature.trim())
            .map_err(|e| VerificationError::MalformedSignature(e.to_string()))?;

        let computed = self.mac(envelope)?.finalize().into_bytes();

        let is_valid: bool = computed.ct_eq(&expected[..]).into();
        if !is_valid {
            warn!(
                message_id = %envelope.message_id,
                "Envelope signature verification failed: signatures do not match"
            );
            return Err(VerificationError::SignatureMismatch);
        }

        Ok(())
    }
}

#[async_trait]
impl EnvelopeVerifier for HmacVerifier {
    async fn verify(&self, envelope: &Envelope) -> Result<Envelope, VerificationError> {
        self.check(envelope)?;
        debug!(message_id = %envelope.message_id, "Envelope signature verified");
        Ok(envelope.clone())
    }
}

// =============================================================================
// Signing certificate URL guard
// =============================================================================

/// Rejects envelopes whose signing certificate is not served from a trusted host
#[derive(Debug, Clone)]
pub struct CertUrlGuard<V> {
    inner: V,
    host_suffix: String,
}

impl<V> CertUrlGuard<V> {
    /// Wrap `inner`, trusting certificate hosts ending with `host_suffix`
    /// (for SNS: `.amazonaws.com`)
    pub fn new(inner: V, host_suffix: impl Into<String>) -> Self {
        Self {
            inner,
            host_suffix: host_suffix.into(),
        }
    }

    fn check(&self, cert_url: &str) -> Result<(), VerificationError> {
        let untrusted = || VerificationError::UntrustedCertificate(cert_url.to_string());

        let url = Url::parse(cert_url).map_err(|_| untrusted())?;
        if url.scheme() != "https" {
            return Err(untrusted());
        }

        let host = url.host_str().ok_or_else(untrusted)?;
        if !host.ends_with(&self.host_suffix) {
            return Err(untrusted());
        }

        if !url.path().ends_with(".pem") {
            return Err(untrusted());
        }

        Ok(())
    }
}

#[async_trait]
impl<V: EnvelopeVerifier> EnvelopeVerifier for CertUrlGuard<V> {
    async fn verify(&self, envelope: &Envelope) -> Result<Envelope, VerificationError> {
        self.check(&envelope.signing_cert_url)?;
        self.inner.verify(envelope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sns::envelope::EnvelopeType;

    fn envelope() -> Envelope {
        Envelope {
            kind: EnvelopeType::Notification,
            message_id: "msg-1".to_string(),
            topic_arn: "arn:aws:sns:us-east-1:123456789012:drs".to_string(),
            subject: None,
            message: r#"{"a":1}"#.to_string(),
            timestamp: "2024-05-01T12:00:00.000Z".to_string(),
            signature_version: "1".to_string(),
            signature: String::new(),
            signing_cert_url: "https://sns.us-east-1.amazonaws.com/SimpleNotificationService.pem"
                .to_string(),
            subscribe_url: None,
            token: None,
            unsubscribe_url: None,
        }
    }

    fn signed(verifier: &HmacVerifier) -> Envelope {
        let mut env = envelope();
        env.signature = verifier.sign(&env).unwrap();
        env
    }

    #[tokio::test]
    async fn test_verify_signature_valid() {
        let verifier = HmacVerifier::new("test_secret");
        let env = signed(&verifier);
        let verified = verifier.verify(&env).await.unwrap();
        assert_eq!(verified, env);
    }

    #[tokio::test]
    async fn test_verify_signature_missing() {
        let verifier = HmacVerifier::new("test_secret");
        let err = verifier.verify(&envelope()).await.unwrap_err();
        assert_eq!(err, VerificationError::MissingSignature);
    }

    #[tokio::test]
    async fn test_verify_signature_invalid_base64() {
        let verifier = HmacVerifier::new("test_secret");
        let mut env = envelope();
        env.signature = "not base64 !!".to_string();
        let err = verifier.verify(&env).await.unwrap_err();
        assert!(matches!(err, VerificationError::MalformedSignature(_)));
    }

    #[tokio::test]
    async fn test_verify_signature_wrong_secret() {
        let env = signed(&HmacVerifier::new("wrong_secret"));
        let err = HmacVerifier::new("test_secret")
            .verify(&env)
            .await
            .unwrap_err();
        assert_eq!(err, VerificationError::SignatureMismatch);
    }

    #[tokio::test]
    async fn test_verify_signature_tampered_message() {
        let verifier = HmacVerifier::new("test_secret");
        let mut env = signed(&verifier);
        env.message = r#"{"a":2}"#.to_string();
        let err = verifier.verify(&env).await.unwrap_err();
        assert_eq!(err, VerificationError::SignatureMismatch);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", HmacVerifier::new("super-secret"));
        assert!(!debug.contains("super-secret"));
    }

    #[tokio::test]
    async fn test_cert_guard_accepts_trusted_host() {
        let inner = HmacVerifier::new("k");
        let env = signed(&inner);
        let guard = CertUrlGuard::new(inner, ".amazonaws.com");
        assert!(guard.verify(&env).await.is_ok());
    }

    #[tokio::test]
    async fn test_cert_guard_rejects_untrusted_urls() {
        let inner = HmacVerifier::new("k");
        let guard = CertUrlGuard::new(inner.clone(), ".amazonaws.com");

        for cert_url in [
            "http://sns.us-east-1.amazonaws.com/cert.pem",
            "https://evil.example.com/cert.pem",
            "https://sns.us-east-1.amazonaws.com.evil.io/cert.pem",
            "https://sns.us-east-1.amazonaws.com/cert.txt",
            "not a url",
        ] {
            let mut env = envelope();
            env.signing_cert_url = cert_url.to_string();
            env.signature = inner.sign(&env).unwrap();
            let err = guard.verify(&env).await.unwrap_err();
            assert!(
                matches!(err, VerificationError::UntrustedCertificate(_)),
                "{cert_url} should be rejected"
            );
        }
    }
}
