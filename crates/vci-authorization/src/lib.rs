//! # VCI Authorization
//!
//! **Typed state for the OpenID4VCI Pushed Authorization Request (PAR) flow**
//!
//! A wallet that needs user consent before a credential can be issued:
//!
//! 1. generates a [`PkceVerifier`] and pushes an authorization request,
//! 2. records the accepted request as [`ParRequested`] and sends the user
//!    agent to its [`AuthorizationCodeUrl`],
//! 3. turns the code from the redirect into [`AuthorizationCodeRetrieved`],
//!    ready for the token request.
//!
//! The transport for steps 1 and 3 lives elsewhere. This crate only holds the
//! data each step hands to the next and refuses transitions that make no
//! sense.
//!
//! ```
//! use vci_authorization::{
//!     AuthorizationCodeUrl, CredentialMetadata, IssuanceAuthorization, ParRequested,
//!     PkceVerifier, Scope, UnauthorizedRequest,
//! };
//!
//! # fn example() -> vci_authorization::Result<()> {
//! let requested = ParRequested::new(
//!     vec![CredentialMetadata::Scope(Scope::new("eu.europa.ec.eudi.pid_vc_sd_jwt"))],
//!     AuthorizationCodeUrl::parse(
//!         "https://as.example/authorize?client_id=wallet&request_uri=urn:x",
//!     )?,
//!     PkceVerifier::generate(),
//!     "af0ifjsldkj",
//! );
//!
//! // redirect: https://wallet.example/cb?code=SplxlOBeZQQYbYS6WxSbIA&state=af0ifjsldkj
//! assert!(requested.matches_state("af0ifjsldkj"));
//! let retrieved = requested.authorization_code_retrieved(
//!     IssuanceAuthorization::authorization_code("SplxlOBeZQQYbYS6WxSbIA")?,
//! )?;
//!
//! let request = UnauthorizedRequest::from(retrieved);
//! assert_eq!(request.credentials().len(), 1);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub use authorization::*;
pub use credential::*;
pub use errors::*;
pub use pkce::{PkceVerifier, MAX_VERIFIER_LENGTH, MIN_VERIFIER_LENGTH};
pub use state::*;

pub mod authorization;
pub mod credential;
pub mod errors;
pub mod pkce;
pub mod state;

/// Authorization flow result type
pub type Result<T> = std::result::Result<T, AuthorizationError>;
