#![deny(warnings)]
#![warn(unused_extern_crates)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Json Web Tokens (JWT) carry a set of claims in a signed, url safe envelope. This crate
//! is a small workbench for HMAC signed tokens: it can generate them, decode them for
//! reading, verify their signature and time claims against a shared secret, and analyse
//! their claims for common weaknesses.
//!
//! Every operation is a pure function of its inputs and the clock. Time dependent
//! operations have an `_at` variant that takes the current time in epoch seconds.
//!
//! ```
//! use jwt_workbench::{GenerateRequest, JwtTool};
//!
//! let tool = JwtTool::default();
//! let token = tool.generate(&GenerateRequest::default()).expect("generate");
//!
//! let report = tool.verify(&token, "your-256-bit-secret").expect("verify");
//! assert!(report.valid);
//! ```

#[macro_use]
extern crate tracing;

pub mod analysis;
pub mod compact;
pub mod crypto;
pub mod epoch;
pub mod error;
pub mod jws;
pub mod jwt;
pub mod tool;
pub mod traits;
pub mod verify;

pub use crate::analysis::{AnalysisResult, JwtAnalysis, SecurityIssue};
pub use crate::compact::{JwaAlg, JwsCompact};
pub use crate::crypto::{HmacAlg, JwsHmacSigner, SignatureComparison, SigningPolicy};
pub use crate::error::JwtError;
pub use crate::jwt::{DecodedJwt, ExpiryPreset, Jwt, JwtBuilder, JwtSigned, JwtUnverified};
pub use crate::tool::{GenerateRequest, JwtTool, JwtToolConfig};
pub use crate::verify::{JwtVerifier, VerifyReport, VerifyResult};
