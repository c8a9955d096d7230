//! DPoP error types and conversions
//!
//! Every failure is returned to the caller of the failing operation. Nothing in
//! this crate logs or swallows an error.

use std::fmt;

use thiserror::Error;

/// Errors raised while building, decoding or checking DPoP proofs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DpopError {
    /// The requested JWS algorithm has no local signer, or is disabled by configuration
    #[error("Signature algorithm not supported: {algorithm}")]
    AlgorithmNotSupported {
        /// Textual name of the rejected algorithm
        algorithm: String,
    },

    /// The key handle could not produce a signer for the algorithm
    #[error("Unable to create JWS signer: {reason}")]
    SignerConstructionFailed {
        /// Detailed reason for the failure
        reason: String,
    },

    /// The signer was created but the signing operation failed
    #[error("JWS signing failed: {reason}")]
    SigningFailed {
        /// Detailed reason for the failure
        reason: String,
    },

    /// The URL the proof should be bound to is not an absolute HTTP(S) URL
    #[error("Invalid DPoP target URL: {reason}")]
    InvalidTargetUrl {
        /// Detailed reason for the rejection
        reason: String,
    },

    /// Invalid DPoP proof structure or format
    #[error("Invalid DPoP proof structure: {reason}")]
    InvalidProofStructure {
        /// Detailed reason for the validation failure
        reason: String,
    },

    /// Signature check against the embedded JWK failed
    #[error("DPoP proof validation failed: {reason}")]
    ProofValidationFailed {
        /// Detailed reason for the validation failure
        reason: String,
    },

    /// Key generation, import or public key reconstruction failed
    #[error("Cryptographic error: {reason}")]
    CryptographicError {
        /// Detailed reason for the cryptographic failure
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {reason}")]
    ConfigurationError {
        /// Detailed reason for the configuration error
        reason: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError {
        /// Detailed reason for the serialization failure
        reason: String,
    },

    /// Internal error that should not occur in normal operation
    #[error("Internal DPoP error: {reason}")]
    InternalError {
        /// Detailed reason for the internal error
        reason: String,
    },
}

impl DpopError {
    /// Check if this error is a cryptographic failure
    pub fn is_cryptographic_error(&self) -> bool {
        matches!(
            self,
            Self::SignerConstructionFailed { .. }
                | Self::SigningFailed { .. }
                | Self::CryptographicError { .. }
        )
    }

    /// Check if retrying with the same inputs can succeed
    ///
    /// Only a transient platform signing failure qualifies; everything else
    /// needs a different algorithm, key, URL or configuration.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SigningFailed { .. })
    }

    /// Get error severity for logging and monitoring
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ProofValidationFailed { .. } => ErrorSeverity::Critical,
            Self::InternalError { .. } => ErrorSeverity::Critical,

            Self::SignerConstructionFailed { .. } => ErrorSeverity::High,
            Self::SigningFailed { .. } => ErrorSeverity::High,
            Self::CryptographicError { .. } => ErrorSeverity::High,

            Self::AlgorithmNotSupported { .. } => ErrorSeverity::Medium,
            Self::InvalidTargetUrl { .. } => ErrorSeverity::Medium,
            Self::InvalidProofStructure { .. } => ErrorSeverity::Medium,

            Self::ConfigurationError { .. } => ErrorSeverity::Low,
            Self::SerializationError { .. } => ErrorSeverity::Low,
        }
    }

    /// Get suggested remediation for this error
    pub fn remediation_hint(&self) -> &'static str {
        match self {
            Self::AlgorithmNotSupported { .. } => {
                "Use ES256, RS256 or PS256 and check the enabled algorithms"
            }
            Self::SignerConstructionFailed { .. } => {
                "Verify the key handle matches the requested algorithm"
            }
            Self::SigningFailed { .. } => "Retry, or check the platform key store",
            Self::InvalidTargetUrl { .. } => "Bind the proof to an absolute http(s) endpoint URL",
            Self::InvalidProofStructure { .. } => "Check DPoP proof format against RFC 9449",
            Self::ConfigurationError { .. } => "Review DPoP configuration parameters",
            _ => "Check logs for detailed error information",
        }
    }
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Low severity - operational issues that don't affect security
    Low,
    /// Medium severity - caller errors or misconfigurations
    Medium,
    /// High severity - key or signing failures
    High,
    /// Critical severity - forged proofs or broken invariants
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl From<serde_json::Error> for DpopError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity_classification() {
        let unsupported = DpopError::AlgorithmNotSupported {
            algorithm: "HS256".to_string(),
        };
        assert_eq!(unsupported.severity(), ErrorSeverity::Medium);
        assert!(!unsupported.is_cryptographic_error());
        assert!(!unsupported.is_retryable());

        let signer = DpopError::SignerConstructionFailed {
            reason: "EC key cannot sign with RS256".to_string(),
        };
        assert_eq!(signer.severity(), ErrorSeverity::High);
        assert!(signer.is_cryptographic_error());
        assert!(!signer.is_retryable());

        let signing = DpopError::SigningFailed {
            reason: "key store locked".to_string(),
        };
        assert!(signing.is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = DpopError::AlgorithmNotSupported {
            algorithm: "EdDSA".to_string(),
        };
        assert_eq!(err.to_string(), "Signature algorithm not supported: EdDSA");

        let err = DpopError::SignerConstructionFailed {
            reason: "bad key".to_string(),
        };
        assert_eq!(err.to_string(), "Unable to create JWS signer: bad key");
    }

    #[test]
    fn test_remediation_hints() {
        let err = DpopError::InvalidTargetUrl {
            reason: "scheme".to_string(),
        };
        assert_eq!(
            err.remediation_hint(),
            "Bind the proof to an absolute http(s) endpoint URL"
        );
    }

    #[test]
    fn test_serde_json_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: DpopError = json_err.into();
        assert!(matches!(err, DpopError::SerializationError { .. }));
    }
}
