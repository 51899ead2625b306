//! Inspection of a token's header and claims, releasing the content without
//! any cryptographic check, plus a set of heuristics for weak tokens.

use crate::compact::JwaAlg;
use crate::epoch::NOT_SPECIFIED;
use crate::error::{JwtError, Operation};
use crate::jwt::{is_set, JwtUnverified};

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Lifetimes longer than this are flagged.
pub const LONG_LIFETIME_SECS: i64 = 86400;

/// A weakness found in a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityIssue {
    /// There is no usable `exp` claim
    NoExpiration,
    /// `exp` is more than a day after `iat`
    LongExpiration,
    /// The header declares `alg: none`
    Unsecured,
    /// There is no `iss` claim
    NoIssuer,
    /// There is no `sub` claim
    NoSubject,
}

impl SecurityIssue {
    /// The message shown for this issue.
    pub fn message(self) -> &'static str {
        match self {
            SecurityIssue::NoExpiration => "Token has no expiration time",
            SecurityIssue::LongExpiration => "Token has a long expiration time (>24 hours)",
            SecurityIssue::Unsecured => "Unsecured token (algorithm: none)",
            SecurityIssue::NoIssuer => "Token has no issuer claim",
            SecurityIssue::NoSubject => "Token has no subject claim",
        }
    }
}

impl fmt::Display for SecurityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl Serialize for SecurityIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.message())
    }
}

/// Everything that can be read from a token without its key.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JwtAnalysis {
    /// The decoded header
    pub header: Map<String, Value>,
    /// The decoded payload
    pub payload: Map<String, Value>,
    /// `alg`
    pub algorithm: String,
    /// `typ`
    pub token_type: String,
    /// `kid`
    pub key_id: String,
    /// `iss`
    pub issuer: String,
    /// `sub`
    pub subject: String,
    /// `aud`
    pub audience: String,
    /// `iat`, rendered
    pub issued_at: String,
    /// `exp`, rendered
    pub expires_at: String,
    /// `nbf`, rendered
    pub not_before: String,
    /// `jti`
    pub jwt_id: String,
    /// Claims that are not registered claim names, values untouched
    pub custom_claims: Map<String, Value>,
    /// Weaknesses found, in a fixed order
    pub security_issues: Vec<SecurityIssue>,
}

impl JwtAnalysis {
    /// Analyse the content of a parsed token.
    pub fn from_unverified(jwtu: &JwtUnverified) -> Self {
        let header = jwtu.header();
        let claims = jwtu.claims();

        let mut security_issues = Vec::new();

        if !claims.has_expiry() {
            security_issues.push(SecurityIssue::NoExpiration);
        } else if let (Some(exp), Some(iat)) = (claims.exp_secs(), claims.iat_secs()) {
            if exp.saturating_sub(iat) > LONG_LIFETIME_SECS {
                security_issues.push(SecurityIssue::LongExpiration);
            }
        }

        if header.alg() == Some(&JwaAlg::None) {
            security_issues.push(SecurityIssue::Unsecured);
        }

        if !is_set(claims.iss.as_ref()) {
            security_issues.push(SecurityIssue::NoIssuer);
        }

        if !is_set(claims.sub.as_ref()) {
            security_issues.push(SecurityIssue::NoSubject);
        }

        trace!(?security_issues);

        let or_unset = |v: Option<String>| v.unwrap_or_else(|| NOT_SPECIFIED.to_string());

        JwtAnalysis {
            header: jwtu.compact().header_json().clone(),
            payload: jwtu.compact().payload().clone(),
            algorithm: or_unset(header.alg().map(|a| a.to_string())),
            token_type: or_unset(header.typ().map(str::to_string)),
            key_id: or_unset(header.kid().map(str::to_string)),
            issuer: or_unset(claims.issuer()),
            subject: or_unset(claims.subject()),
            audience: or_unset(claims.audience()),
            jwt_id: or_unset(claims.jwt_id()),
            issued_at: claims.issued_at_text(),
            expires_at: claims.expires_at_text(),
            not_before: claims.not_before_text(),
            custom_claims: claims.claims,
            security_issues,
        }
    }

    /// True if `issue` was found.
    pub fn has_issue(&self, issue: SecurityIssue) -> bool {
        self.security_issues.contains(&issue)
    }
}

/// Parse and analyse a token string.
pub fn analyze(token: &str) -> Result<JwtAnalysis, JwtError> {
    JwtUnverified::from_str(token).map(|jwtu| JwtAnalysis::from_unverified(&jwtu))
}

/// An analysis as handed to a form: the analysis, or only an error.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum AnalysisResult {
    /// The token was well formed.
    Analysis(Box<JwtAnalysis>),
    /// The token could not be read.
    Failed {
        /// Message for the user
        error: String,
        /// The precise cause
        detail: String,
    },
}

impl From<Result<JwtAnalysis, JwtError>> for AnalysisResult {
    fn from(r: Result<JwtAnalysis, JwtError>) -> Self {
        match r {
            Ok(analysis) => AnalysisResult::Analysis(Box::new(analysis)),
            Err(e) => AnalysisResult::Failed {
                error: e.summary(Operation::Analyze).to_string(),
                detail: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compact::encode_segment;
    use crate::epoch::NEVER;
    use serde_json::json;

    fn token(header: Value, payload: Value) -> String {
        format!(
            "{}.{}.c2ln",
            encode_segment(&header.to_string()),
            encode_segment(&payload.to_string())
        )
    }

    #[test]
    fn unsecured_token_issues() {
        let _ = tracing_subscriber::fmt::try_init();
        let analysis = analyze(&token(
            json!({"alg": "none", "typ": "JWT"}),
            json!({"sub": "u1"}),
        ))
        .expect("Unable to analyse");

        assert!(analysis.has_issue(SecurityIssue::NoExpiration));
        assert!(analysis.has_issue(SecurityIssue::Unsecured));
        assert!(analysis.has_issue(SecurityIssue::NoIssuer));
        assert!(!analysis.has_issue(SecurityIssue::NoSubject));
        assert!(!analysis.has_issue(SecurityIssue::LongExpiration));
        assert_eq!(analysis.algorithm, "none");
    }

    #[test]
    fn unsecured_token_without_signature() {
        let text = format!(
            "{}.{}.",
            encode_segment(r#"{"alg":"none"}"#),
            encode_segment(r#"{"sub":"u1"}"#)
        );
        let analysis = analyze(&text).expect("Unable to analyse");
        assert!(analysis.has_issue(SecurityIssue::Unsecured));
        assert_eq!(analysis.token_type, NOT_SPECIFIED);
    }

    #[test]
    fn custom_claims_extraction() {
        let analysis = analyze(&token(
            json!({"alg": "HS256", "typ": "JWT"}),
            json!({"sub": "u1", "iat": 1700000000, "role": "admin", "team": "infra"}),
        ))
        .expect("Unable to analyse");

        assert_eq!(
            Value::Object(analysis.custom_claims.clone()),
            json!({"role": "admin", "team": "infra"})
        );
        assert_eq!(analysis.subject, "u1");
        assert_eq!(analysis.issued_at, "2023-11-14 22:13:20 UTC");
        assert_eq!(analysis.expires_at, NEVER);
        assert_eq!(analysis.issuer, NOT_SPECIFIED);
        assert_eq!(analysis.audience, NOT_SPECIFIED);
        assert_eq!(analysis.jwt_id, NOT_SPECIFIED);
        assert_eq!(analysis.not_before, NOT_SPECIFIED);
        assert_eq!(analysis.key_id, NOT_SPECIFIED);
        assert_eq!(analysis.token_type, "JWT");
        assert_eq!(analysis.algorithm, "HS256");
    }

    #[test]
    fn lifetime_heuristic() {
        let hdr = json!({"alg": "HS256", "kid": "k1"});

        let long = analyze(&token(
            hdr.clone(),
            json!({"iss": "me", "sub": "u1", "iat": 1000, "exp": 1000 + LONG_LIFETIME_SECS + 1}),
        ))
        .expect("Unable to analyse");
        assert_eq!(long.security_issues, vec![SecurityIssue::LongExpiration]);
        assert_eq!(long.key_id, "k1");

        let exactly_a_day = analyze(&token(
            hdr.clone(),
            json!({"iss": "me", "sub": "u1", "iat": 1000, "exp": 1000 + LONG_LIFETIME_SECS}),
        ))
        .expect("Unable to analyse");
        assert!(exactly_a_day.security_issues.is_empty());

        // Without iat the lifetime is unknown, nothing is flagged.
        let no_iat = analyze(&token(
            hdr,
            json!({"iss": "me", "sub": "u1", "exp": i64::MAX}),
        ))
        .expect("Unable to analyse");
        assert!(no_iat.security_issues.is_empty());
    }

    #[test]
    fn non_numeric_expiry_is_still_an_expiry() {
        let analysis = analyze(&token(
            json!({"alg": "HS256"}),
            json!({"iss": "me", "sub": "u1", "exp": "1700003600", "iat": 1700000000}),
        ))
        .expect("Unable to analyse");
        assert!(analysis.security_issues.is_empty());
        assert_eq!(analysis.expires_at, crate::epoch::INVALID_DATE);

        // A falsy exp is no expiry at all.
        let analysis = analyze(&token(json!({"alg": "HS256"}), json!({"exp": 0})))
            .expect("Unable to analyse");
        assert!(analysis.has_issue(SecurityIssue::NoExpiration));
        assert_eq!(analysis.expires_at, NEVER);
    }

    #[test]
    fn loosely_typed_header_members() {
        let analysis = analyze(&token(
            json!({"alg": "HS256", "typ": "JWT", "kid": 123}),
            json!({"sub": "u1"}),
        ))
        .expect("Unable to analyse");
        assert_eq!(analysis.key_id, "123");
        assert_eq!(analysis.header["kid"], json!(123));

        let analysis = analyze(&token(json!({"alg": null, "typ": 1}), json!({"sub": "u1"})))
            .expect("Unable to analyse");
        assert_eq!(analysis.algorithm, NOT_SPECIFIED);
        assert_eq!(analysis.token_type, "1");
    }

    #[test]
    fn issues_are_cumulative() {
        let analysis = analyze(&token(json!({"alg": "none"}), json!({"iss": "", "sub": ""})))
            .expect("Unable to analyse");
        assert_eq!(
            analysis.security_issues,
            vec![
                SecurityIssue::NoExpiration,
                SecurityIssue::Unsecured,
                SecurityIssue::NoIssuer,
                SecurityIssue::NoSubject
            ]
        );
    }

    #[test]
    fn malformed_tokens_collapse() {
        for bad in ["", "a.b", "x.y.z.w", "e30.!!.sig"] {
            let r = analyze(bad);
            assert!(r.is_err(), "{bad}");
            let wire = serde_json::to_value(AnalysisResult::from(r)).expect("serialise");
            assert_eq!(wire["error"], json!("Invalid token format or analysis failed"));
            assert!(wire.get("securityIssues").is_none());
        }
    }

    #[test]
    fn analysis_wire_shape() {
        let r = analyze(&token(json!({"alg": "none"}), json!({"sub": "u1", "x": [1, 2]})));
        let wire = serde_json::to_value(AnalysisResult::from(r)).expect("serialise");
        assert_eq!(wire["customClaims"], json!({"x": [1, 2]}));
        assert_eq!(wire["securityIssues"][0], json!("Token has no expiration time"));
        assert_eq!(wire["header"], json!({"alg": "none"}));
        assert!(wire.get("error").is_none());
    }
}
