//! Error types.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Clone, Deserialize, PartialEq, Eq)]
/// An error in the JWT workbench
pub enum JwtError {
    /// Invalid Token - Not three segments, or the header or payload segment is empty
    InvalidCompactFormat,
    /// Invalid Base64 encoding of a token segment
    InvalidBase64,
    /// A segment decoded to bytes that are not valid UTF-8
    InvalidUtf8,
    /// Invalid token header - not a JSON object
    InvalidHeaderFormat,
    /// Invalid token payload - not a JSON object
    InvalidPayloadFormat,
    /// The payload text supplied for generation is not a JSON object
    InvalidPayloadJson,
    /// The requested algorithm can not be used for signing
    UnsupportedAlgorithm(String),
    /// Unknown expiry selector
    InvalidExpiry(String),
    /// The MAC primitive rejected its input
    CryptoError,
}

/// The operation a [JwtError] surfaced from. Used to select the coarse message
/// shown to users, which does not distinguish between the underlying causes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Token generation
    Generate,
    /// Token decoding
    Decode,
    /// Signature and claim verification
    Verify,
    /// Claim analysis
    Analyze,
}

impl JwtError {
    /// The coarse, user facing message for this error when raised by `op`.
    pub fn summary(&self, op: Operation) -> &'static str {
        match (op, self) {
            (Operation::Generate, JwtError::InvalidPayloadJson) => "Invalid JSON payload",
            (Operation::Generate, _) => "Error generating JWT token",
            (Operation::Decode, _) => "Invalid JWT token format",
            (Operation::Verify, _) => "Invalid token format or verification failed",
            (Operation::Analyze, _) => "Invalid token format or analysis failed",
        }
    }

    /// True if this error is a structural problem with a supplied token.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            JwtError::InvalidCompactFormat
                | JwtError::InvalidBase64
                | JwtError::InvalidUtf8
                | JwtError::InvalidHeaderFormat
                | JwtError::InvalidPayloadFormat
        )
    }
}

impl fmt::Display for JwtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JwtError::InvalidCompactFormat => write!(
                f,
                "Invalid JWT format: expected three segments separated by '.'"
            ),
            JwtError::InvalidBase64 => write!(f, "Base64URL decoding of a segment failed"),
            JwtError::InvalidUtf8 => write!(f, "Segment is not valid UTF-8"),
            JwtError::InvalidHeaderFormat => write!(f, "Token header is not a JSON object"),
            JwtError::InvalidPayloadFormat => write!(f, "Token payload is not a JSON object"),
            JwtError::InvalidPayloadJson => write!(f, "Invalid JSON payload"),
            JwtError::UnsupportedAlgorithm(alg) => {
                write!(f, "Algorithm '{alg}' is not supported for signing")
            }
            JwtError::InvalidExpiry(sel) => write!(f, "Unknown expiry selector '{sel}'"),
            JwtError::CryptoError => write!(f, "Cryptographic operation failed"),
        }
    }
}

impl std::error::Error for JwtError {}

#[cfg(test)]
mod tests {
    use super::{JwtError, Operation};

    #[test]
    fn summaries_conflate_causes() {
        assert_eq!(
            JwtError::InvalidBase64.summary(Operation::Decode),
            JwtError::InvalidHeaderFormat.summary(Operation::Decode)
        );
        assert_eq!(
            JwtError::InvalidPayloadJson.summary(Operation::Generate),
            "Invalid JSON payload"
        );
        assert!(JwtError::InvalidUtf8.is_format_error());
        assert!(!JwtError::InvalidPayloadJson.is_format_error());
    }
}
