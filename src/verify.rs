//! Signature and time claim verification of supplied tokens.

use crate::crypto::{JwsHmacVerifier, SignatureComparison, SigningPolicy};
use crate::epoch::{self, NOT_SPECIFIED};
use crate::error::{JwtError, Operation};
use crate::jwt::JwtUnverified;
use crate::traits::JwsVerifier;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The outcome of verifying a well formed token. A bad signature or an expired
/// token is a negative verdict here, not an error.
#[derive(Debug, Serialize, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    /// Signature matched and all time claims currently hold
    pub valid: bool,
    /// The signature segment matched the one recomputed from the secret
    pub signature_valid: bool,
    /// `exp` is in the past
    pub expired: bool,
    /// `nbf` is in the future
    pub not_yet_valid: bool,
    /// The algorithm the header declares
    pub algorithm: String,
    /// When the token was issued
    pub issued_at: String,
    /// When the token expires
    pub expires_at: String,
    /// `sub`
    pub subject: String,
    /// `iss`
    pub issuer: String,
}

/// A verification outcome as handed to a form: either the full report, or an
/// error with none of the report fields.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum VerifyResult {
    /// The token was well formed.
    Report(VerifyReport),
    /// The token could not be read.
    Failed {
        /// Always false
        valid: bool,
        /// Message for the user
        error: String,
        /// The precise cause
        detail: String,
    },
}

impl VerifyResult {
    /// True only for a report with a valid verdict.
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyResult::Report(VerifyReport { valid: true, .. }))
    }
}

impl From<Result<VerifyReport, JwtError>> for VerifyResult {
    fn from(r: Result<VerifyReport, JwtError>) -> Self {
        match r {
            Ok(report) => VerifyResult::Report(report),
            Err(e) => VerifyResult::Failed {
                valid: false,
                error: e.summary(Operation::Verify).to_string(),
                detail: e.to_string(),
            },
        }
    }
}

/// Checks tokens against a shared secret and the clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtVerifier {
    policy: SigningPolicy,
    comparison: SignatureComparison,
}

impl JwtVerifier {
    /// Set how the MAC is chosen from the declared algorithm.
    pub fn set_signing_policy(mut self, policy: SigningPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set how signature segments are compared.
    pub fn set_comparison(mut self, comparison: SignatureComparison) -> Self {
        self.comparison = comparison;
        self
    }

    /// Verify `token` with `secret`, judging time claims against `now`.
    pub fn verify_at(
        &self,
        token: &str,
        secret: &[u8],
        now: i64,
    ) -> Result<VerifyReport, JwtError> {
        let jwtu = JwtUnverified::from_str(token)?;
        self.verify_unverified_at(&jwtu, secret, now)
    }

    /// Verify `token` with `secret` at the current time.
    pub fn verify(&self, token: &str, secret: &[u8]) -> Result<VerifyReport, JwtError> {
        self.verify_at(token, secret, epoch::now())
    }

    /// Verify an already parsed token.
    pub fn verify_unverified_at(
        &self,
        jwtu: &JwtUnverified,
        secret: &[u8],
        now: i64,
    ) -> Result<VerifyReport, JwtError> {
        let signature_valid = JwsHmacVerifier::new(secret, self.policy, self.comparison)
            .verify_signature(jwtu.compact())?;

        let claims = jwtu.claims();
        let exp = claims.exp_secs();
        let nbf = claims.nbf_secs();

        let expired = exp.map(|exp| exp < now).unwrap_or(false);
        let not_yet_valid = nbf.map(|nbf| nbf > now).unwrap_or(false);

        if expired {
            debug!(?exp, now, "token expired");
        }
        if not_yet_valid {
            debug!(?nbf, now, "token not yet valid");
        }

        Ok(VerifyReport {
            valid: signature_valid && !expired && !not_yet_valid,
            signature_valid,
            expired,
            not_yet_valid,
            algorithm: jwtu
                .header()
                .alg()
                .map(|a| a.to_string())
                .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
            issued_at: claims.issued_at_text(),
            expires_at: claims.expires_at_text(),
            subject: claims.subject().unwrap_or_else(|| NOT_SPECIFIED.to_string()),
            issuer: claims.issuer().unwrap_or_else(|| NOT_SPECIFIED.to_string()),
        })
    }
}
