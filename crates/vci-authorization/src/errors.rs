//! Authorization flow error types

use thiserror::Error;

/// Errors raised while constructing authorization flow values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// A state was given the wrong kind of issuance authorization
    #[error("Validation error: {reason}")]
    InvalidAuthorizationVariant {
        /// Detailed reason for the rejection
        reason: String,
    },

    /// The authorization code (or pre-authorized code) is unusable
    #[error("Invalid authorization code: {reason}")]
    InvalidAuthorizationCode {
        /// Detailed reason for the rejection
        reason: String,
    },

    /// The authorization endpoint URL the user agent would be sent to is unusable
    #[error("Invalid authorization code URL: {reason}")]
    InvalidAuthorizationCodeUrl {
        /// Detailed reason for the rejection
        reason: String,
    },

    /// The PKCE code verifier violates RFC 7636
    #[error("Invalid PKCE verifier: {reason}")]
    InvalidPkceVerifier {
        /// Detailed reason for the rejection
        reason: String,
    },

    /// The flow is not in a state that can take this step
    #[error("Invalid flow transition: {reason}")]
    InvalidTransition {
        /// Detailed reason for the rejection
        reason: String,
    },
}

impl AuthorizationError {
    /// The human readable reason carried by every variant
    pub fn reason(&self) -> &str {
        match self {
            Self::InvalidAuthorizationVariant { reason }
            | Self::InvalidAuthorizationCode { reason }
            | Self::InvalidAuthorizationCodeUrl { reason }
            | Self::InvalidPkceVerifier { reason }
            | Self::InvalidTransition { reason } => reason,
        }
    }
}
