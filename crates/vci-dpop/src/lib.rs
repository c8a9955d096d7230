//! # VCI DPoP
//!
//! **RFC 9449 Demonstration of Proof-of-Possession (DPoP) proofs for OpenID4VCI clients**
//!
//! A wallet that asks an authorization server for a sender-constrained access
//! token attaches a DPoP proof to the token request. The proof is a compact JWS
//! whose header carries the wallet's public key and whose claims bind it to one
//! HTTP request:
//!
//! | Part    | Member | Value                                          |
//! |---------|--------|------------------------------------------------|
//! | header  | `typ`  | `dpop+jwt`                                     |
//! | header  | `alg`  | JWS algorithm name (`ES256`, `RS256`, `PS256`) |
//! | header  | `jwk`  | public key, embedded verbatim                  |
//! | payload | `iat`  | issue time, whole seconds (rounded)            |
//! | payload | `htm`  | `POST`                                         |
//! | payload | `htu`  | target URL without fragment                    |
//! | payload | `jti`  | base64url of 20 random bytes                   |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use url::Url;
//! use vci_dpop::{DpopAlgorithm, DpopKeyPair, DpopProofBuilder, SigningAlgorithm};
//!
//! # fn example() -> vci_dpop::Result<()> {
//! let key_pair = DpopKeyPair::generate(DpopAlgorithm::ES256)?;
//! let token_endpoint = Url::parse("https://issuer.example/token").expect("static URL");
//!
//! let proof = DpopProofBuilder::new().build_proof(
//!     &SigningAlgorithm::ES256,
//!     key_pair.jwk(),
//!     &key_pair,
//!     &token_endpoint,
//! )?;
//!
//! println!("DPoP: {proof}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Key handles
//!
//! The builder never sees private key material. It asks a [`KeyHandle`] for a
//! [`ProofSigner`] bound to the resolved algorithm and hands it the JWS signing
//! input. [`DpopKeyPair`] is the in-process software implementation; platform
//! key stores implement the same trait.
//!
//! Replay detection is the verifier's job: the builder keeps no `jti` cache.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub use config::*;
pub use errors::*;
pub use keys::*;
pub use proof::*;
pub use types::*;

pub mod config;
pub mod errors;
pub mod keys;
pub mod proof;
pub mod types;

/// DPoP result type
pub type Result<T> = std::result::Result<T, DpopError>;

/// DPoP JWT header type as defined in RFC 9449
pub const DPOP_JWT_TYPE: &str = "dpop+jwt";

/// HTTP method bound into every proof (token endpoint requests only)
pub const DPOP_HTTP_METHOD: &str = "POST";

/// Random bytes behind each `jti`, always 27 base64url characters on the wire
pub const JTI_ENTROPY_BYTES: usize = 20;
