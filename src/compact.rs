//! The compact `header.payload.signature` form of a token, and the base64url
//! codec used for each of its segments.
use base64::{
    alphabet,
    engine::{general_purpose, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::JwtError;
use crate::jwt::claim_text;

// https://datatracker.ietf.org/doc/html/rfc7515#section-2

/// Segments are translated back to the standard alphabet before decoding, so this
/// engine accepts both alphabets. Padding and non-canonical trailing bits are
/// tolerated.
const SEGMENT_DECODER: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Encode text as a token segment.
pub fn encode_segment(text: &str) -> String {
    encode_segment_bytes(text.as_bytes())
}

/// Encode raw bytes (such as a MAC) as a token segment.
pub fn encode_segment_bytes(bytes: &[u8]) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a token segment to raw bytes.
pub fn decode_segment_bytes(segment: &str) -> Result<Vec<u8>, JwtError> {
    let mut std_form: String = segment
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();

    let rem = std_form.len() % 4;
    if rem != 0 {
        std_form.extend(std::iter::repeat('=').take(4 - rem));
    }

    SEGMENT_DECODER.decode(std_form).map_err(|e| {
        debug!(?e, "invalid base64 in segment");
        JwtError::InvalidBase64
    })
}

/// Decode a token segment to text.
pub fn decode_segment(segment: &str) -> Result<String, JwtError> {
    decode_segment_bytes(segment).and_then(|bytes| {
        String::from_utf8(bytes).map_err(|e| {
            debug!(?e, "segment is not utf-8");
            JwtError::InvalidUtf8
        })
    })
}

/// Decode a segment that must hold a JSON object.
pub(crate) fn decode_json_object(
    segment: &str,
    not_object: JwtError,
) -> Result<Map<String, Value>, JwtError> {
    let text = decode_segment(segment)?;

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => {
            debug!(kind = ?json_kind(&other), "segment json is not an object");
            Err(not_object)
        }
        Err(e) => {
            debug!(?e, "segment is not valid json");
            Err(not_object)
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The signing algorithm a header declares. Any string is accepted so that
/// tokens declaring algorithms we can not sign with may still be inspected.
#[derive(Debug, Serialize, Clone, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(from = "String", into = "String")]
pub enum JwaAlg {
    /// HMAC SHA256
    #[default]
    HS256,
    /// HMAC SHA384
    HS384,
    /// HMAC SHA512
    HS512,
    /// RSASSA-PKCS1-v1_5 with SHA-256
    RS256,
    /// ECDSA with P-256 and SHA256
    ES256,
    /// Unsecured, no signature
    None,
    /// Anything else, kept verbatim
    Other(String),
}

impl JwaAlg {
    /// The registered name of this algorithm as it appears in a header.
    pub fn as_str(&self) -> &str {
        match self {
            JwaAlg::HS256 => "HS256",
            JwaAlg::HS384 => "HS384",
            JwaAlg::HS512 => "HS512",
            JwaAlg::RS256 => "RS256",
            JwaAlg::ES256 => "ES256",
            JwaAlg::None => "none",
            JwaAlg::Other(s) => s.as_str(),
        }
    }

    /// A one line reference description of the algorithm.
    pub fn description(&self) -> &'static str {
        match self {
            JwaAlg::HS256 => "HMAC using SHA-256 (symmetric)",
            JwaAlg::HS384 => "HMAC using SHA-384 (symmetric)",
            JwaAlg::HS512 => "HMAC using SHA-512 (symmetric)",
            JwaAlg::RS256 => "RSA using SHA-256 (asymmetric)",
            JwaAlg::ES256 => "ECDSA using SHA-256 (asymmetric)",
            JwaAlg::None => "Unsecured, no signature",
            JwaAlg::Other(_) => "Unknown algorithm",
        }
    }
}

impl From<&str> for JwaAlg {
    fn from(s: &str) -> Self {
        match s {
            "HS256" => JwaAlg::HS256,
            "HS384" => JwaAlg::HS384,
            "HS512" => JwaAlg::HS512,
            "RS256" => JwaAlg::RS256,
            "ES256" => JwaAlg::ES256,
            "none" => JwaAlg::None,
            other => JwaAlg::Other(other.to_string()),
        }
    }
}

impl From<String> for JwaAlg {
    fn from(s: String) -> Self {
        JwaAlg::from(s.as_str())
    }
}

impl From<JwaAlg> for String {
    fn from(alg: JwaAlg) -> Self {
        match alg {
            JwaAlg::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for JwaAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The typed view of a token header. Members we do not interpret are kept in
/// `extra` so that re-serialising does not lose them.
///
/// Reading a header never fails. `alg`, `typ` and `kid` of any JSON type are
/// taken as their text, and empty or falsy values count as absent.
#[derive(Debug, Serialize, Clone, Deserialize, Default, PartialEq)]
#[serde(from = "Map<String, Value>")]
pub struct ProtectedHeader {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) alg: Option<JwaAlg>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) typ: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) kid: Option<String>,
    #[serde(flatten)]
    pub(crate) extra: Map<String, Value>,
}

impl From<Map<String, Value>> for ProtectedHeader {
    fn from(members: Map<String, Value>) -> Self {
        let mut header = ProtectedHeader::default();
        for (k, v) in members.iter() {
            match k.as_str() {
                "alg" => header.alg = claim_text(Some(v)).map(JwaAlg::from),
                "typ" => header.typ = claim_text(Some(v)),
                "kid" => header.kid = claim_text(Some(v)),
                _ => {
                    header.extra.insert(k.clone(), v.clone());
                }
            }
        }
        header
    }
}

impl ProtectedHeader {
    /// The declared algorithm, if any.
    pub fn alg(&self) -> Option<&JwaAlg> {
        self.alg.as_ref()
    }

    /// The declared token type, if any.
    pub fn typ(&self) -> Option<&str> {
        self.typ.as_deref()
    }

    /// The key id, if any.
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }
}

/// A token split into its three segments with the header and payload decoded.
///
/// The signature segment is kept as supplied. It is not required to be valid
/// base64url, since signature checks compare segments and not bytes.
#[derive(Clone)]
pub struct JwsCompact {
    pub(crate) header: ProtectedHeader,
    pub(crate) header_json: Map<String, Value>,
    pub(crate) hdr_b64: String,
    pub(crate) payload: Map<String, Value>,
    pub(crate) payload_b64: String,
    pub(crate) sig_b64: String,
}

impl fmt::Debug for JwsCompact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwsCompact")
            .field("header", &self.header)
            .field("payload", &self.payload_b64)
            .finish()
    }
}

impl JwsCompact {
    /// The typed header.
    pub fn header(&self) -> &ProtectedHeader {
        &self.header
    }

    /// The header exactly as decoded, in its original member order.
    pub fn header_json(&self) -> &Map<String, Value> {
        &self.header_json
    }

    /// The payload claims exactly as decoded, in their original order.
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// The raw signature segment.
    pub fn signature_b64(&self) -> &str {
        &self.sig_b64
    }

    /// The signature segment decoded to bytes.
    pub fn signature_bytes(&self) -> Result<Vec<u8>, JwtError> {
        decode_segment_bytes(&self.sig_b64)
    }

    /// Get the KID used to sign this token if present
    pub fn get_jwk_kid(&self) -> Option<&str> {
        self.header.kid.as_deref()
    }

    /// The `header.payload` string a signature is computed over.
    pub fn signing_input(&self) -> String {
        format!("{}.{}", self.hdr_b64, self.payload_b64)
    }
}

impl FromStr for JwsCompact {
    type Err = JwtError;

    /// Parse `header.payload.signature`. The header and payload segments must be
    /// present and decode to JSON objects. The signature segment may be empty, as
    /// it is in unsecured (`alg: none`) tokens.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // split on the ".".
        let mut siter = s.split('.');

        let hdr_str = siter.next().filter(|s| !s.is_empty()).ok_or_else(|| {
            debug!("invalid compact format - protected header not present");
            JwtError::InvalidCompactFormat
        })?;

        let payload_str = siter.next().filter(|s| !s.is_empty()).ok_or_else(|| {
            debug!("invalid compact format - payload not present");
            JwtError::InvalidCompactFormat
        })?;

        // An empty signature is allowed, that is how unsecured tokens are written.
        let sig_str = siter.next().ok_or_else(|| {
            debug!("invalid compact format - signature not present");
            JwtError::InvalidCompactFormat
        })?;

        if siter.next().is_some() {
            // Too much data.
            debug!("invalid compact format - extra fields present");
            return Err(JwtError::InvalidCompactFormat);
        }

        let header_json = decode_json_object(hdr_str, JwtError::InvalidHeaderFormat)?;

        let header = ProtectedHeader::from(header_json.clone());

        let payload = decode_json_object(payload_str, JwtError::InvalidPayloadFormat)?;

        Ok(JwsCompact {
            header,
            header_json,
            hdr_b64: hdr_str.to_string(),
            payload,
            payload_b64: payload_str.to_string(),
            sig_b64: sig_str.to_string(),
        })
    }
}

impl fmt::Display for JwsCompact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.hdr_b64, self.payload_b64, self.sig_b64)
    }
}
