//! Jwt implementation

use crate::compact::{JwaAlg, JwsCompact, ProtectedHeader};
use crate::crypto::{HmacAlg, JwsHmacSigner, SigningPolicy};
use crate::epoch;
use crate::error::JwtError;
use crate::jws::JwsBuilder;
use crate::traits::JwsSigner;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// The claim names with a registered meaning. Everything else in a payload is a
/// custom claim.
pub const REGISTERED_CLAIMS: [&str; 7] = ["iss", "sub", "aud", "exp", "nbf", "iat", "jti"];

/// The claims of a token, split into the registered claims and everything else.
///
/// Registered claims are held as raw JSON since tokens we are asked to inspect
/// may carry them with any type.
#[derive(Debug, Serialize, Clone, Deserialize, PartialEq, Default)]
pub struct Jwt {
    /// The issuer of this token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<Value>,
    /// Unique id of the subject
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<Value>,
    /// Intended audience, a string or an array of strings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<Value>,
    /// Expiry in utc epoch seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<Value>,
    /// Not valid before.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<Value>,
    /// Issued at time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<Value>,
    /// Unique id of this token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<Value>,
    /// Custom claims, in the order they appeared in the payload.
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

impl From<Map<String, Value>> for Jwt {
    fn from(payload: Map<String, Value>) -> Self {
        let mut jwt = Jwt::default();
        for (k, v) in payload {
            let slot = match k.as_str() {
                "iss" => Some(&mut jwt.iss),
                "sub" => Some(&mut jwt.sub),
                "aud" => Some(&mut jwt.aud),
                "exp" => Some(&mut jwt.exp),
                "nbf" => Some(&mut jwt.nbf),
                "iat" => Some(&mut jwt.iat),
                "jti" => Some(&mut jwt.jti),
                _ => None,
            };
            match slot {
                Some(slot) => *slot = Some(v).filter(|v| !v.is_null()),
                None => {
                    jwt.claims.insert(k, v);
                }
            }
        }
        jwt
    }
}

impl Jwt {
    /// Expiry in epoch seconds, if present and numeric.
    pub fn exp_secs(&self) -> Option<i64> {
        epoch::claim_secs(self.exp.as_ref())
    }

    /// Not before in epoch seconds, if present and numeric.
    pub fn nbf_secs(&self) -> Option<i64> {
        epoch::claim_secs(self.nbf.as_ref())
    }

    /// Issued at in epoch seconds, if present and numeric.
    pub fn iat_secs(&self) -> Option<i64> {
        epoch::claim_secs(self.iat.as_ref())
    }

    /// The issuer as text, if set to a non-empty value.
    pub fn issuer(&self) -> Option<String> {
        claim_text(self.iss.as_ref())
    }

    /// The subject as text, if set to a non-empty value.
    pub fn subject(&self) -> Option<String> {
        claim_text(self.sub.as_ref())
    }

    /// The audience as text. Multiple audiences are comma separated.
    pub fn audience(&self) -> Option<String> {
        claim_text(self.aud.as_ref())
    }

    /// The token id as text, if set to a non-empty value.
    pub fn jwt_id(&self) -> Option<String> {
        claim_text(self.jti.as_ref())
    }

    /// True if an `exp` claim is set, whatever its type.
    pub fn has_expiry(&self) -> bool {
        is_set(self.exp.as_ref())
    }

    /// `iat` for display.
    pub fn issued_at_text(&self) -> String {
        time_text(self.iat.as_ref(), epoch::NOT_SPECIFIED)
    }

    /// `exp` for display.
    pub fn expires_at_text(&self) -> String {
        time_text(self.exp.as_ref(), epoch::NEVER)
    }

    /// `nbf` for display.
    pub fn not_before_text(&self) -> String {
        time_text(self.nbf.as_ref(), epoch::NOT_SPECIFIED)
    }
}

/// Render a time claim. An unset claim shows `absent`, one that is set but not a
/// number shows [epoch::INVALID_DATE].
fn time_text(value: Option<&Value>, absent: &str) -> String {
    if !is_set(value) {
        return absent.to_string();
    }
    epoch::claim_secs(value)
        .map(epoch::display)
        .unwrap_or_else(|| epoch::INVALID_DATE.to_string())
}

/// Whether a claim counts as set. Empty strings, zero, false and null do not.
pub(crate) fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// A claim as text, `None` unless it is set. Arrays are joined with `, `.
pub(crate) fn claim_text(value: Option<&Value>) -> Option<String> {
    if !is_set(value) {
        return None;
    }
    value.map(|v| match v {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|i| match i {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    })
}

/// How long a generated token is valid for.
#[derive(Debug, Serialize, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
pub enum ExpiryPreset {
    /// 5 minutes
    #[serde(rename = "5m")]
    FiveMinutes,
    /// 1 hour
    #[default]
    #[serde(rename = "1h")]
    OneHour,
    /// 1 day
    #[serde(rename = "1d")]
    OneDay,
    /// 7 days
    #[serde(rename = "7d")]
    SevenDays,
    /// 30 days
    #[serde(rename = "30d")]
    ThirtyDays,
    /// No `exp` claim is added
    #[serde(rename = "never")]
    Never,
}

impl ExpiryPreset {
    /// Every preset, in the order they are offered.
    pub const ALL: [ExpiryPreset; 6] = [
        ExpiryPreset::FiveMinutes,
        ExpiryPreset::OneHour,
        ExpiryPreset::OneDay,
        ExpiryPreset::SevenDays,
        ExpiryPreset::ThirtyDays,
        ExpiryPreset::Never,
    ];

    /// Lifetime in seconds, `None` for [ExpiryPreset::Never].
    pub fn seconds(self) -> Option<i64> {
        match self {
            ExpiryPreset::FiveMinutes => Some(300),
            ExpiryPreset::OneHour => Some(3600),
            ExpiryPreset::OneDay => Some(86400),
            ExpiryPreset::SevenDays => Some(604800),
            ExpiryPreset::ThirtyDays => Some(2592000),
            ExpiryPreset::Never => None,
        }
    }

    /// The selector string.
    pub fn as_str(self) -> &'static str {
        match self {
            ExpiryPreset::FiveMinutes => "5m",
            ExpiryPreset::OneHour => "1h",
            ExpiryPreset::OneDay => "1d",
            ExpiryPreset::SevenDays => "7d",
            ExpiryPreset::ThirtyDays => "30d",
            ExpiryPreset::Never => "never",
        }
    }

    /// A label for people.
    pub fn label(self) -> &'static str {
        match self {
            ExpiryPreset::FiveMinutes => "5 minutes",
            ExpiryPreset::OneHour => "1 hour",
            ExpiryPreset::OneDay => "1 day",
            ExpiryPreset::SevenDays => "7 days",
            ExpiryPreset::ThirtyDays => "30 days",
            ExpiryPreset::Never => "Never expires",
        }
    }
}

impl FromStr for ExpiryPreset {
    type Err = JwtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExpiryPreset::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                debug!(selector = %s, "unknown expiry selector");
                JwtError::InvalidExpiry(s.to_string())
            })
    }
}

impl fmt::Display for ExpiryPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assembles and signs new tokens.
#[derive(Debug, Clone)]
pub struct JwtBuilder {
    alg: JwaAlg,
    expiry: ExpiryPreset,
    policy: SigningPolicy,
    embed_kid: bool,
}

impl Default for JwtBuilder {
    fn default() -> Self {
        JwtBuilder::new(JwaAlg::HS256)
    }
}

impl JwtBuilder {
    /// A builder for tokens declaring `alg`, expiring after an hour.
    pub fn new(alg: JwaAlg) -> Self {
        JwtBuilder {
            alg,
            expiry: ExpiryPreset::default(),
            policy: SigningPolicy::default(),
            embed_kid: false,
        }
    }

    /// Set the lifetime of generated tokens.
    pub fn set_expiry(mut self, expiry: ExpiryPreset) -> Self {
        self.expiry = expiry;
        self
    }

    /// Set how the MAC is chosen from the declared algorithm.
    pub fn set_signing_policy(mut self, policy: SigningPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Add a `kid` header derived from the secret.
    pub fn set_embed_kid(mut self, embed_kid: bool) -> Self {
        self.embed_kid = embed_kid;
        self
    }

    /// Sign JSON payload text, as typed into a form.
    pub fn sign_json_at(
        &self,
        payload: &str,
        secret: &[u8],
        now: i64,
    ) -> Result<JwtSigned, JwtError> {
        let payload = match serde_json::from_str::<Value>(payload) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                debug!("payload json is not an object");
                return Err(JwtError::InvalidPayloadJson);
            }
            Err(e) => {
                debug!(?e, "invalid json payload");
                return Err(JwtError::InvalidPayloadJson);
            }
        };

        self.sign_at(payload, secret, now)
    }

    /// Sign a payload, stamping `iat` (and `exp` unless the expiry is never)
    /// relative to `now`. Existing values of those claims are overwritten.
    pub fn sign_at(
        &self,
        mut payload: Map<String, Value>,
        secret: &[u8],
        now: i64,
    ) -> Result<JwtSigned, JwtError> {
        // Only HMAC algorithms may be declared, whatever the policy.
        let declared = HmacAlg::from_jwa(&self.alg).ok_or_else(|| {
            debug!(alg = %self.alg, "refusing to sign with a non hmac algorithm");
            JwtError::UnsupportedAlgorithm(self.alg.to_string())
        })?;

        let hmac = self
            .policy
            .select(Some(&self.alg))
            .ok_or_else(|| JwtError::UnsupportedAlgorithm(self.alg.to_string()))?;

        if hmac != declared {
            warn!(
                declared = %self.alg,
                used = ?hmac,
                "header declares an algorithm the signing policy does not honour"
            );
        }

        if let Some(lifetime) = self.expiry.seconds() {
            payload.insert("exp".to_string(), Value::from(now.saturating_add(lifetime)));
        }
        payload.insert("iat".to_string(), Value::from(now));

        let signer = JwsHmacSigner::new(hmac, secret);
        let kid = self.embed_kid.then(|| signer.get_kid());

        JwsBuilder::from(payload)
            .set_alg(self.alg.clone())
            .set_typ(Some("JWT"))
            .set_kid(kid)
            .sign(&signer)
            .map(|jwsc| JwtSigned { jwsc })
    }

    /// Sign a payload at the current time.
    pub fn sign(&self, payload: Map<String, Value>, secret: &[u8]) -> Result<JwtSigned, JwtError> {
        self.sign_at(payload, secret, epoch::now())
    }
}

/// A signed jwt which can be converted to a string.
#[derive(Debug, Clone)]
pub struct JwtSigned {
    jwsc: JwsCompact,
}

impl JwtSigned {
    /// The payload as it was signed, including the stamped time claims.
    pub fn payload(&self) -> &Map<String, Value> {
        self.jwsc.payload()
    }

    /// Invalidate this signed jwt, causing it to require validation before you can use it
    /// again.
    pub fn invalidate(self) -> JwtUnverified {
        JwtUnverified { jwsc: self.jwsc }
    }
}

impl fmt::Display for JwtSigned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.jwsc, f)
    }
}

/// A token supplied from outside, parsed but not verified.
#[derive(Debug, Clone)]
pub struct JwtUnverified {
    pub(crate) jwsc: JwsCompact,
}

impl FromStr for JwtUnverified {
    type Err = JwtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JwsCompact::from_str(s).map(|jwsc| JwtUnverified { jwsc })
    }
}

impl JwtUnverified {
    /// The typed header.
    pub fn header(&self) -> &ProtectedHeader {
        self.jwsc.header()
    }

    /// The claims of this token. They have not been verified.
    pub fn claims(&self) -> Jwt {
        Jwt::from(self.jwsc.payload().clone())
    }

    /// The underlying compact token.
    pub fn compact(&self) -> &JwsCompact {
        &self.jwsc
    }

    /// Pretty print the header and payload for display.
    pub fn decode(&self) -> Result<DecodedJwt, JwtError> {
        let header = serde_json::to_string_pretty(self.jwsc.header_json()).map_err(|e| {
            debug!(?e);
            JwtError::InvalidHeaderFormat
        })?;
        let payload = serde_json::to_string_pretty(self.jwsc.payload()).map_err(|e| {
            debug!(?e);
            JwtError::InvalidPayloadFormat
        })?;

        Ok(DecodedJwt {
            header,
            payload,
            signature: self.jwsc.signature_b64().to_string(),
        })
    }
}

/// The readable form of a token.
#[derive(Debug, Serialize, Clone, Deserialize, PartialEq, Eq)]
pub struct DecodedJwt {
    /// Header JSON, indented by two spaces
    pub header: String,
    /// Payload JSON, indented by two spaces
    pub payload: String,
    /// The signature segment as supplied
    pub signature: String,
}
