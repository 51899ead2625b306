//! Traits that define behaviour of JWS signing and verification types.

use crate::compact::JwsCompact;
use crate::error::JwtError;

/// Data that will be signed
pub struct JwsCompactSignData<'a> {
    pub(crate) hdr_bytes: &'a [u8],
    pub(crate) payload_bytes: &'a [u8],
}

impl JwsCompactSignData<'_> {
    /// The `header.payload` bytes the signature covers.
    pub fn signing_input(&self) -> Vec<u8> {
        let mut input = Vec::with_capacity(self.hdr_bytes.len() + self.payload_bytes.len() + 1);
        input.extend_from_slice(self.hdr_bytes);
        input.push(b'.');
        input.extend_from_slice(self.payload_bytes);
        input
    }
}

/// A trait defining how a JwsSigner will operate.
pub trait JwsSigner {
    /// Get the key id from this signer
    fn get_kid(&self) -> &str;

    /// Produce the raw signature over the encoded header and payload
    fn sign(&self, data: JwsCompactSignData<'_>) -> Result<Vec<u8>, JwtError>;
}

/// A trait defining how a JwsVerifier will operate.
pub trait JwsVerifier {
    /// Check the signature segment of this token. A mismatch is `Ok(false)`, errors
    /// are reserved for failures of the primitive itself.
    fn verify_signature(&self, jwsc: &JwsCompact) -> Result<bool, JwtError>;
}
