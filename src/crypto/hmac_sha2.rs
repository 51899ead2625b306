//! HMAC SHA-2 signing

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::compact::{encode_segment_bytes, JwaAlg};
use crate::error::JwtError;
use crate::traits::{JwsCompactSignData, JwsSigner};

/// The HMAC variants a token can be signed with.
#[derive(Debug, Serialize, Clone, Copy, Deserialize, PartialEq, Eq, Hash, Default)]
#[allow(non_camel_case_types)]
pub enum HmacAlg {
    /// HMAC SHA256
    #[default]
    HS256,
    /// HMAC SHA384
    HS384,
    /// HMAC SHA512
    HS512,
}

impl HmacAlg {
    /// Map a declared header algorithm to a MAC, if it is one.
    pub fn from_jwa(alg: &JwaAlg) -> Option<Self> {
        match alg {
            JwaAlg::HS256 => Some(HmacAlg::HS256),
            JwaAlg::HS384 => Some(HmacAlg::HS384),
            JwaAlg::HS512 => Some(HmacAlg::HS512),
            _ => None,
        }
    }

    /// The header algorithm for this MAC.
    pub fn jwa(self) -> JwaAlg {
        match self {
            HmacAlg::HS256 => JwaAlg::HS256,
            HmacAlg::HS384 => JwaAlg::HS384,
            HmacAlg::HS512 => JwaAlg::HS512,
        }
    }

    /// Compute the raw MAC of `message` under `key`.
    pub fn mac(self, key: &[u8], message: &[u8]) -> Result<Vec<u8>, JwtError> {
        match self {
            HmacAlg::HS256 => hmac_digest::<Hmac<Sha256>>(key, message),
            HmacAlg::HS384 => hmac_digest::<Hmac<Sha384>>(key, message),
            HmacAlg::HS512 => hmac_digest::<Hmac<Sha512>>(key, message),
        }
    }
}

fn hmac_digest<M: Mac + KeyInit>(key: &[u8], message: &[u8]) -> Result<Vec<u8>, JwtError> {
    // Hmac accepts keys of any length, including empty ones.
    let mut mac = <M as KeyInit>::new_from_slice(key).map_err(|e| {
        error!(?e, "hmac key rejected");
        JwtError::CryptoError
    })?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// A JWS signer that creates HMAC SHA-2 signatures from a shared secret.
#[derive(Clone)]
pub struct JwsHmacSigner {
    /// The KID of this signer. This is half of the sha256 digest of the key.
    kid: String,
    /// The MAC in use
    alg: HmacAlg,
    /// Private Key
    skey: Vec<u8>,
}

impl fmt::Debug for JwsHmacSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwsHmacSigner")
            .field("kid", &self.kid)
            .field("alg", &self.alg)
            .finish()
    }
}

impl PartialEq for JwsHmacSigner {
    fn eq(&self, other: &Self) -> bool {
        self.kid == other.kid && self.alg == other.alg
    }
}

impl Eq for JwsHmacSigner {}

impl Hash for JwsHmacSigner {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kid.hash(state);
        self.alg.hash(state);
    }
}

impl JwsHmacSigner {
    /// Create a signer for `alg` from a shared secret. No minimum length is
    /// enforced, an empty secret is accepted.
    pub fn new(alg: HmacAlg, secret: &[u8]) -> Self {
        let digest = Sha256::digest(secret);
        let half = digest.len() / 2;
        let kid = hex::encode(digest.split_at(half).0);

        JwsHmacSigner {
            kid,
            alg,
            skey: secret.to_vec(),
        }
    }

    /// Create an HS256 signer from a shared secret.
    pub fn hs256(secret: &[u8]) -> Self {
        Self::new(HmacAlg::HS256, secret)
    }

    /// The MAC this signer computes.
    pub fn alg(&self) -> HmacAlg {
        self.alg
    }

    /// Sign a `header.payload` message, returning the encoded signature segment.
    pub fn sign_message(&self, message: &str) -> Result<String, JwtError> {
        self.alg
            .mac(&self.skey, message.as_bytes())
            .map(|sig| encode_segment_bytes(&sig))
    }
}

impl JwsSigner for JwsHmacSigner {
    fn get_kid(&self) -> &str {
        self.kid.as_str()
    }

    fn sign(&self, data: JwsCompactSignData<'_>) -> Result<Vec<u8>, JwtError> {
        self.alg.mac(&self.skey, &data.signing_input())
    }
}
