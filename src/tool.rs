//! The four operations of the JWT tool, as invoked from a form.
//!
//! Each call is independent. The tool holds only its configuration, so one
//! instance may serve any number of concurrent callers.

use crate::analysis::JwtAnalysis;
use crate::compact::JwaAlg;
use crate::crypto::{SignatureComparison, SigningPolicy};
use crate::epoch;
use crate::error::JwtError;
use crate::jwt::{DecodedJwt, ExpiryPreset, JwtBuilder, JwtUnverified};
use crate::verify::{JwtVerifier, VerifyReport};

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Settings shared by all operations. Every field has a default that reproduces
/// the long standing behaviour of the tool, so an empty JSON object is a valid
/// configuration.
#[derive(Debug, Serialize, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct JwtToolConfig {
    /// How the MAC is chosen for signing and verifying
    pub signing_policy: SigningPolicy,
    /// How signatures are compared
    pub comparison: SignatureComparison,
    /// Add a `kid` header to generated tokens
    pub embed_kid: bool,
}

impl JwtToolConfig {
    /// Set how the MAC is chosen for signing and verifying.
    pub fn set_signing_policy(mut self, policy: SigningPolicy) -> Self {
        self.signing_policy = policy;
        self
    }

    /// Set how signatures are compared.
    pub fn set_comparison(mut self, comparison: SignatureComparison) -> Self {
        self.comparison = comparison;
        self
    }

    /// Set whether generated tokens carry a `kid` header.
    pub fn set_embed_kid(mut self, embed_kid: bool) -> Self {
        self.embed_kid = embed_kid;
        self
    }
}

/// The inputs of the generate form.
#[derive(Debug, Serialize, Clone, Deserialize, PartialEq, Eq)]
pub struct GenerateRequest {
    /// The algorithm the header declares
    pub algorithm: JwaAlg,
    /// Shared secret. An empty secret is accepted.
    pub secret: String,
    /// Payload as JSON object text
    pub payload: String,
    /// Token lifetime
    pub expiry: ExpiryPreset,
}

impl Default for GenerateRequest {
    fn default() -> Self {
        GenerateRequest {
            algorithm: JwaAlg::HS256,
            secret: "your-256-bit-secret".to_string(),
            payload: "{\n  \"sub\": \"1234567890\",\n  \"name\": \"John Doe\",\n  \"iat\": 1516239022\n}"
                .to_string(),
            expiry: ExpiryPreset::OneHour,
        }
    }
}

/// Generate, decode, verify and analyse tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtTool {
    config: JwtToolConfig,
}

impl JwtTool {
    /// Create a tool with this configuration.
    pub fn new(config: JwtToolConfig) -> Self {
        JwtTool { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &JwtToolConfig {
        &self.config
    }

    /// Build and sign a token, stamping time claims relative to `now`.
    pub fn generate_at(&self, req: &GenerateRequest, now: i64) -> Result<String, JwtError> {
        JwtBuilder::new(req.algorithm.clone())
            .set_expiry(req.expiry)
            .set_signing_policy(self.config.signing_policy)
            .set_embed_kid(self.config.embed_kid)
            .sign_json_at(&req.payload, req.secret.as_bytes(), now)
            .map(|signed| signed.to_string())
    }

    /// Build and sign a token at the current time.
    pub fn generate(&self, req: &GenerateRequest) -> Result<String, JwtError> {
        self.generate_at(req, epoch::now())
    }

    /// Split a token into readable header, payload and signature.
    pub fn decode(&self, token: &str) -> Result<DecodedJwt, JwtError> {
        JwtUnverified::from_str(token).and_then(|jwtu| jwtu.decode())
    }

    /// Check a token's signature and time claims as of `now`.
    pub fn verify_at(&self, token: &str, secret: &str, now: i64) -> Result<VerifyReport, JwtError> {
        self.verifier().verify_at(token, secret.as_bytes(), now)
    }

    /// Check a token's signature and time claims at the current time.
    pub fn verify(&self, token: &str, secret: &str) -> Result<VerifyReport, JwtError> {
        self.verify_at(token, secret, epoch::now())
    }

    /// Inspect a token without checking its signature.
    pub fn analyze(&self, token: &str) -> Result<JwtAnalysis, JwtError> {
        crate::analysis::analyze(token)
    }

    fn verifier(&self) -> JwtVerifier {
        JwtVerifier::default()
            .set_signing_policy(self.config.signing_policy)
            .set_comparison(self.config.comparison)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SecurityIssue;
    use crate::verify::VerifyResult;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn default_form_round_trip() {
        let _ = tracing_subscriber::fmt::try_init();
        let tool = JwtTool::default();
        let req = GenerateRequest::default();

        let token = tool.generate_at(&req, NOW).expect("generate");

        let decoded = tool.decode(&token).expect("decode");
        assert_eq!(decoded.header, "{\n  \"alg\": \"HS256\",\n  \"typ\": \"JWT\"\n}");
        assert!(decoded.payload.contains(&format!("\"iat\": {NOW}")));
        assert!(decoded.payload.contains(&format!("\"exp\": {}", NOW + 3600)));

        let report = tool.verify_at(&token, &req.secret, NOW).expect("verify");
        assert!(report.valid);
        assert_eq!(report.subject, "1234567890");

        // An hour and a bit later it has expired.
        let report = tool.verify_at(&token, &req.secret, NOW + 3601).expect("verify");
        assert!(report.expired);
        assert!(!report.valid);

        let report = tool.verify_at(&token, "wrong", NOW).expect("verify");
        assert!(!report.signature_valid);

        let analysis = tool.analyze(&token).expect("analyze");
        assert_eq!(analysis.security_issues, vec![SecurityIssue::NoIssuer]);
        assert_eq!(
            analysis.custom_claims.get("name"),
            Some(&serde_json::Value::from("John Doe"))
        );
    }

    #[test]
    fn generate_errors() {
        let tool = JwtTool::default();
        let req = GenerateRequest {
            payload: "{ not json".to_string(),
            ..Default::default()
        };
        assert_eq!(tool.generate_at(&req, NOW), Err(JwtError::InvalidPayloadJson));

        let req = GenerateRequest {
            algorithm: JwaAlg::RS256,
            ..Default::default()
        };
        assert_eq!(
            tool.generate_at(&req, NOW),
            Err(JwtError::UnsupportedAlgorithm("RS256".to_string()))
        );
    }

    #[test]
    fn config_from_json() {
        let config: JwtToolConfig = serde_json::from_str("{}").expect("parse");
        assert_eq!(config, JwtToolConfig::default());

        let config: JwtToolConfig = serde_json::from_str(
            r#"{"signing_policy":"header_algorithm","comparison":"constant_time","embed_kid":true}"#,
        )
        .expect("parse");
        assert_eq!(
            config,
            JwtToolConfig::default()
                .set_signing_policy(SigningPolicy::HeaderAlgorithm)
                .set_comparison(SignatureComparison::ConstantTime)
                .set_embed_kid(true)
        );

        let req: GenerateRequest = serde_json::from_str(
            r#"{"algorithm":"HS384","secret":"s","payload":"{}","expiry":"never"}"#,
        )
        .expect("parse");
        assert_eq!(req.algorithm, JwaAlg::HS384);
        assert_eq!(req.expiry, ExpiryPreset::Never);
    }

    #[test]
    fn hardened_config_round_trip() {
        let tool = JwtTool::new(
            JwtToolConfig::default()
                .set_signing_policy(SigningPolicy::HeaderAlgorithm)
                .set_comparison(SignatureComparison::ConstantTime)
                .set_embed_kid(true),
        );
        let req = GenerateRequest {
            algorithm: JwaAlg::HS512,
            expiry: ExpiryPreset::Never,
            ..Default::default()
        };

        let token = tool.generate_at(&req, NOW).expect("generate");
        let report = tool.verify_at(&token, &req.secret, NOW).expect("verify");
        assert!(report.valid);
        assert_eq!(report.algorithm, "HS512");
        assert_eq!(report.expires_at, "Never");

        let analysis = tool.analyze(&token).expect("analyze");
        assert_ne!(analysis.key_id, crate::epoch::NOT_SPECIFIED);
        assert!(analysis.has_issue(SecurityIssue::NoExpiration));

        // The default tool can not verify an HS512 token.
        let report = JwtTool::default()
            .verify_at(&token, &req.secret, NOW)
            .expect("verify");
        assert!(!report.signature_valid);
    }

    #[test]
    fn malformed_input_through_every_operation() {
        let tool = JwtTool::default();
        for bad in ["only.two", "a.b.c.d", "no-dots"] {
            assert!(tool.decode(bad).is_err());
            assert!(tool.analyze(bad).is_err());
            let result = VerifyResult::from(tool.verify_at(bad, "s", NOW));
            assert!(!result.is_valid());
        }
    }
}
