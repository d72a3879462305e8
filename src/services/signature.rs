//! Authenticity check for inbound payment webhooks.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use thiserror::Error;

use crate::utils::error::AppError;

/// Header Paystack puts the hex HMAC-SHA512 of the raw body in.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

type HmacSha512 = Hmac<Sha512>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("No Paystack signature found")]
    MissingSignature,
    #[error("Webhook secret is not configured")]
    MissingSecret,
    #[error("Signature is not valid hex")]
    Malformed,
    #[error("Invalid signature")]
    Mismatch,
}

impl From<SignatureError> for AppError {
    fn from(err: SignatureError) -> Self {
        AppError::AuthError(err.to_string())
    }
}

#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Option<Vec<u8>>,
}

impl SignatureVerifier {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.map(String::into_bytes),
        }
    }

    /// Checks `signature` against the keyed digest of `body`. The comparison
    /// is constant-time.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<(), SignatureError> {
        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(SignatureError::MissingSignature)?;
        let secret = self.secret.as_deref().ok_or(SignatureError::MissingSecret)?;
        let claimed = hex::decode(signature).map_err(|_| SignatureError::Malformed)?;

        let mut mac = HmacSha512::new_from_slice(secret).map_err(|_| SignatureError::MissingSecret)?;
        mac.update(body);
        mac.verify_slice(&claimed)
            .map_err(|_| SignatureError::Mismatch)
    }

    /// Hex signature for `body`, as the payment provider would compute it.
    pub fn sign(&self, body: &[u8]) -> Option<String> {
        let secret = self.secret.as_deref()?;
        let mut mac = HmacSha512::new_from_slice(secret).ok()?;
        mac.update(body);
        Some(hex::encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
