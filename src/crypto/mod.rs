//! JWS Signing and Verification Structures

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::compact::{JwaAlg, JwsCompact};
use crate::error::JwtError;
use crate::traits::JwsVerifier;

mod hmac_sha2;

pub use self::hmac_sha2::{HmacAlg, JwsHmacSigner};

/// How the MAC used for signing and verifying a token is chosen.
#[derive(Debug, Serialize, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SigningPolicy {
    /// Always use HS256, whatever the header declares.
    ///
    /// NOTE: this reproduces the behaviour the tool has always had. A token that
    /// declares HS384 or HS512 is signed with HS256, and a correctly signed HS384
    /// or HS512 token from elsewhere will never verify. Whether that was intended
    /// is unresolved, so it stays the default.
    #[default]
    FixedHs256,
    /// Use the HMAC the header declares. Headers declaring anything else can not
    /// be signed or verified.
    HeaderAlgorithm,
}

impl SigningPolicy {
    /// Select the MAC for a token declaring `alg`.
    pub fn select(self, alg: Option<&JwaAlg>) -> Option<HmacAlg> {
        match self {
            SigningPolicy::FixedHs256 => Some(HmacAlg::HS256),
            SigningPolicy::HeaderAlgorithm => alg.and_then(HmacAlg::from_jwa),
        }
    }
}

/// How a supplied signature segment is compared to the expected one.
#[derive(Debug, Serialize, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SignatureComparison {
    /// Plain string equality. Returns early on the first differing byte, so the
    /// time taken leaks the length of the matching prefix.
    #[default]
    Exact,
    /// Constant time comparison of the two segments.
    ConstantTime,
}

impl SignatureComparison {
    /// Compare two encoded signature segments.
    pub fn matches(self, supplied: &str, expected: &str) -> bool {
        match self {
            SignatureComparison::Exact => exact_eq(supplied, expected),
            SignatureComparison::ConstantTime => constant_time_eq(supplied, expected),
        }
    }
}

fn exact_eq(supplied: &str, expected: &str) -> bool {
    supplied == expected
}

fn constant_time_eq(supplied: &str, expected: &str) -> bool {
    supplied.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Verifies the signature of a token against a shared secret.
pub struct JwsHmacVerifier<'a> {
    secret: &'a [u8],
    policy: SigningPolicy,
    comparison: SignatureComparison,
}

impl<'a> JwsHmacVerifier<'a> {
    /// Create a verifier over `secret`.
    pub fn new(secret: &'a [u8], policy: SigningPolicy, comparison: SignatureComparison) -> Self {
        JwsHmacVerifier {
            secret,
            policy,
            comparison,
        }
    }
}

impl JwsVerifier for JwsHmacVerifier<'_> {
    fn verify_signature(&self, jwsc: &JwsCompact) -> Result<bool, JwtError> {
        let declared = jwsc.header().alg();

        let Some(alg) = self.policy.select(declared) else {
            debug!(?declared, "no hmac for declared algorithm");
            return Ok(false);
        };

        if declared.and_then(HmacAlg::from_jwa) != Some(alg) {
            debug!(?declared, ?alg, "verifying with an algorithm the header does not declare");
        }

        let expected = JwsHmacSigner::new(alg, self.secret).sign_message(&jwsc.signing_input())?;

        let valid = self.comparison.matches(jwsc.signature_b64(), &expected);
        if !valid {
            debug!("invalid signature");
        }
        Ok(valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compact::encode_segment;
    use std::str::FromStr;

    fn token(alg: &str, hmac: HmacAlg, secret: &[u8]) -> JwsCompact {
        let hdr = encode_segment(&format!(r#"{{"alg":"{alg}","typ":"JWT"}}"#));
        let pld = encode_segment(r#"{"sub":"u1"}"#);
        let input = format!("{hdr}.{pld}");
        let sig = JwsHmacSigner::new(hmac, secret)
            .sign_message(&input)
            .expect("sign");
        JwsCompact::from_str(&format!("{input}.{sig}")).expect("parse")
    }

    #[test]
    fn comparison_modes_agree() {
        for mode in [SignatureComparison::Exact, SignatureComparison::ConstantTime] {
            assert!(mode.matches("abc", "abc"));
            assert!(!mode.matches("abc", "abd"));
            assert!(!mode.matches("abc", "abcd"));
            assert!(!mode.matches("", "abc"));
        }
    }

    #[test]
    fn fixed_policy_ignores_declared_alg() {
        let _ = tracing_subscriber::fmt::try_init();
        let secret = b"secret";

        // Declares HS512 but carries an HS256 signature: fixed policy accepts it.
        let jwsc = token("HS512", HmacAlg::HS256, secret);
        let fixed = JwsHmacVerifier::new(secret, SigningPolicy::FixedHs256, Default::default());
        let strict =
            JwsHmacVerifier::new(secret, SigningPolicy::HeaderAlgorithm, Default::default());
        assert_eq!(fixed.verify_signature(&jwsc), Ok(true));
        assert_eq!(strict.verify_signature(&jwsc), Ok(false));

        // A genuine HS512 token only verifies when the header is honoured.
        let jwsc = token("HS512", HmacAlg::HS512, secret);
        assert_eq!(fixed.verify_signature(&jwsc), Ok(false));
        assert_eq!(strict.verify_signature(&jwsc), Ok(true));
    }

    #[test]
    fn header_policy_refuses_non_hmac() {
        let secret = b"secret";
        let jwsc = token("RS256", HmacAlg::HS256, secret);
        let strict = JwsHmacVerifier::new(
            secret,
            SigningPolicy::HeaderAlgorithm,
            SignatureComparison::ConstantTime,
        );
        assert_eq!(strict.verify_signature(&jwsc), Ok(false));
        assert_eq!(SigningPolicy::HeaderAlgorithm.select(None), None);
        assert_eq!(SigningPolicy::FixedHs256.select(None), Some(HmacAlg::HS256));
    }

    #[test]
    fn policy_serde_names() {
        assert_eq!(
            serde_json::to_string(&SigningPolicy::HeaderAlgorithm).expect("serialise"),
            "\"header_algorithm\""
        );
        let c: SignatureComparison = serde_json::from_str("\"constant_time\"").expect("parse");
        assert_eq!(c, SignatureComparison::ConstantTime);
    }
}
