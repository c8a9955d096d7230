//! PKCE (Proof Key for Code Exchange) code verifier
//!
//! RFC 7636. The verifier is created before the PAR request, its challenge is
//! sent with it, and the verifier itself travels with the flow state until the
//! token request.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::{errors::AuthorizationError, Result};

/// Minimum length for a code verifier
pub const MIN_VERIFIER_LENGTH: usize = 43;

/// Maximum length for a code verifier
pub const MAX_VERIFIER_LENGTH: usize = 128;

/// SHA-256 challenge method
pub const S256: &str = "S256";

/// Plain challenge method
pub const PLAIN: &str = "plain";

const VERIFIER_ENTROPY_BYTES: usize = 32;

/// A PKCE code verifier and the method used to derive its challenge
#[derive(Clone, PartialEq, Eq)]
pub struct PkceVerifier {
    code_verifier: String,
    code_verifier_method: String,
}

impl PkceVerifier {
    /// Accept an existing verifier after checking it against RFC 7636
    pub fn new(
        code_verifier: impl Into<String>,
        code_verifier_method: impl Into<String>,
    ) -> Result<Self> {
        let code_verifier = code_verifier.into();
        let code_verifier_method = code_verifier_method.into();

        check_verifier(&code_verifier)?;
        if code_verifier_method != S256 && code_verifier_method != PLAIN {
            return Err(AuthorizationError::InvalidPkceVerifier {
                reason: format!("unknown code challenge method: {code_verifier_method}"),
            });
        }

        Ok(Self {
            code_verifier,
            code_verifier_method,
        })
    }

    /// Generate a fresh `S256` verifier from 32 bytes of OS randomness
    pub fn generate() -> Self {
        let mut bytes = [0u8; VERIFIER_ENTROPY_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self {
            code_verifier: URL_SAFE_NO_PAD.encode(bytes),
            code_verifier_method: S256.to_string(),
        }
    }

    /// The code verifier sent with the token request
    pub fn code_verifier(&self) -> &str {
        &self.code_verifier
    }

    /// The challenge method (`S256` or `plain`)
    pub fn code_verifier_method(&self) -> &str {
        &self.code_verifier_method
    }

    /// The `code_challenge` value sent with the authorization request
    ///
    /// ```
    /// use vci_authorization::PkceVerifier;
    ///
    /// let verifier =
    ///     PkceVerifier::new("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk", "S256").unwrap();
    /// assert_eq!(verifier.code_challenge(), "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    /// ```
    pub fn code_challenge(&self) -> String {
        if self.code_verifier_method == PLAIN {
            return self.code_verifier.clone();
        }
        URL_SAFE_NO_PAD.encode(Sha256::digest(self.code_verifier.as_bytes()))
    }
}

impl fmt::Debug for PkceVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PkceVerifier({}, <redacted>)", self.code_verifier_method)
    }
}

fn check_verifier(code_verifier: &str) -> Result<()> {
    if code_verifier.len() < MIN_VERIFIER_LENGTH {
        return Err(AuthorizationError::InvalidPkceVerifier {
            reason: format!("code verifier too short (min {MIN_VERIFIER_LENGTH})"),
        });
    }

    if code_verifier.len() > MAX_VERIFIER_LENGTH {
        return Err(AuthorizationError::InvalidPkceVerifier {
            reason: format!("code verifier too long (max {MAX_VERIFIER_LENGTH})"),
        });
    }

    // unreserved characters only
    if !code_verifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '~')
    {
        return Err(AuthorizationError::InvalidPkceVerifier {
            reason: "code verifier contains invalid characters".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RFC_VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";

    #[test]
    fn test_rfc7636_challenge() {
        let verifier = PkceVerifier::new(RFC_VERIFIER, S256).unwrap();
        assert_eq!(
            verifier.code_challenge(),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_plain_challenge_is_verifier() {
        let verifier = PkceVerifier::new(RFC_VERIFIER, PLAIN).unwrap();
        assert_eq!(verifier.code_challenge(), RFC_VERIFIER);
    }

    #[test]
    fn test_verifier_too_short() {
        let result = PkceVerifier::new("tooshort", S256);
        assert!(matches!(
            result,
            Err(AuthorizationError::InvalidPkceVerifier { .. })
        ));
    }

    #[test]
    fn test_verifier_too_long() {
        let result = PkceVerifier::new("a".repeat(MAX_VERIFIER_LENGTH + 1), S256);
        assert!(result.is_err());
        assert!(PkceVerifier::new("a".repeat(MAX_VERIFIER_LENGTH), S256).is_ok());
    }

    #[test]
    fn test_verifier_invalid_chars() {
        let result = PkceVerifier::new(
            "valid_prefix_but_has_invalid_chars_@#$%^&*()_1234567890",
            S256,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_method() {
        let err = PkceVerifier::new(RFC_VERIFIER, "S512").unwrap_err();
        assert_eq!(err.reason(), "unknown code challenge method: S512");
    }

    #[test]
    fn test_generate_verifier() {
        let first = PkceVerifier::generate();
        let second = PkceVerifier::generate();

        assert_eq!(first.code_verifier().len(), 43);
        assert_eq!(first.code_verifier_method(), S256);
        assert_ne!(first, second);
        assert!(PkceVerifier::new(first.code_verifier(), S256).is_ok());
    }

    #[test]
    fn test_debug_redacts_verifier() {
        let verifier = PkceVerifier::new(RFC_VERIFIER, S256).unwrap();
        let debug = format!("{verifier:?}");

        assert_eq!(debug, "PkceVerifier(S256, <redacted>)");
        assert!(!debug.contains(RFC_VERIFIER));
    }
}
