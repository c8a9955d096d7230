//! Core DPoP types and data structures
//!
//! JWS algorithm identifiers, the JWK public key representation, and the
//! header, payload and compact form of a DPoP proof.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::{errors::DpopError, keys, Result, DPOP_JWT_TYPE};

/// A JWS algorithm identifier as named by the caller (RFC 7518)
///
/// Any registered name can be expressed, including ones this crate has no
/// signer for. Resolution to a [`DpopAlgorithm`] decides whether a proof can
/// actually be built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256
    HS256,
    /// HMAC with SHA-384
    HS384,
    /// HMAC with SHA-512
    HS512,
    /// RSASSA-PKCS1-v1_5 with SHA-256
    RS256,
    /// RSASSA-PKCS1-v1_5 with SHA-384
    RS384,
    /// RSASSA-PKCS1-v1_5 with SHA-512
    RS512,
    /// ECDSA with P-256 and SHA-256
    ES256,
    /// ECDSA with P-384 and SHA-384
    ES384,
    /// ECDSA with P-521 and SHA-512
    ES512,
    /// RSASSA-PSS with SHA-256
    PS256,
    /// RSASSA-PSS with SHA-384
    PS384,
    /// RSASSA-PSS with SHA-512
    PS512,
    /// Edwards-curve signatures
    EdDSA,
    /// Any other algorithm name
    Other(String),
}

impl SigningAlgorithm {
    /// Get the algorithm name as registered in RFC 7518
    pub fn as_str(&self) -> &str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::ES512 => "ES512",
            Self::PS256 => "PS256",
            Self::PS384 => "PS384",
            Self::PS512 => "PS512",
            Self::EdDSA => "EdDSA",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl From<String> for SigningAlgorithm {
    fn from(name: String) -> Self {
        match name.as_str() {
            "HS256" => Self::HS256,
            "HS384" => Self::HS384,
            "HS512" => Self::HS512,
            "RS256" => Self::RS256,
            "RS384" => Self::RS384,
            "RS512" => Self::RS512,
            "ES256" => Self::ES256,
            "ES384" => Self::ES384,
            "ES512" => Self::ES512,
            "PS256" => Self::PS256,
            "PS384" => Self::PS384,
            "PS512" => Self::PS512,
            "EdDSA" => Self::EdDSA,
            _ => Self::Other(name),
        }
    }
}

impl From<SigningAlgorithm> for String {
    fn from(algorithm: SigningAlgorithm) -> Self {
        match algorithm {
            SigningAlgorithm::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl From<DpopAlgorithm> for SigningAlgorithm {
    fn from(algorithm: DpopAlgorithm) -> Self {
        match algorithm {
            DpopAlgorithm::RS256 => Self::RS256,
            DpopAlgorithm::ES256 => Self::ES256,
            DpopAlgorithm::PS256 => Self::PS256,
        }
    }
}

/// Algorithms with a local DPoP signer implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DpopAlgorithm {
    /// RSA with PKCS#1 v1.5 padding and SHA-256 (RFC 7518)
    #[serde(rename = "RS256")]
    RS256,

    /// Elliptic Curve Digital Signature Algorithm with P-256 curve and SHA-256 (RFC 7518)
    #[serde(rename = "ES256")]
    ES256,

    /// RSA with PSS padding and SHA-256 (RFC 7518)
    #[serde(rename = "PS256")]
    PS256,
}

impl DpopAlgorithm {
    /// All algorithms with a local signer
    pub const ALL: [Self; 3] = [Self::ES256, Self::RS256, Self::PS256];

    /// Get the algorithm name as specified in RFC 7518
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::ES256 => "ES256",
            Self::PS256 => "PS256",
        }
    }

    /// Get the key size generated for the algorithm, in bits
    pub fn recommended_key_size(self) -> usize {
        match self {
            Self::RS256 | Self::PS256 => 2048,
            Self::ES256 => 256,
        }
    }

    /// Whether the algorithm signs with an RSA key
    pub fn is_rsa(self) -> bool {
        matches!(self, Self::RS256 | Self::PS256)
    }
}

impl fmt::Display for DpopAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&SigningAlgorithm> for DpopAlgorithm {
    type Error = DpopError;

    fn try_from(algorithm: &SigningAlgorithm) -> Result<Self> {
        // The name decides, so `Other("ES256")` resolves like `ES256`
        match algorithm.as_str() {
            "ES256" => Ok(Self::ES256),
            "RS256" => Ok(Self::RS256),
            "PS256" => Ok(Self::PS256),
            other => Err(DpopError::AlgorithmNotSupported {
                algorithm: other.to_string(),
            }),
        }
    }
}

/// Public key material, as raw big-endian integers / coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DpopPublicKey {
    /// RSA public key
    Rsa {
        /// RSA modulus (n parameter)
        n: Vec<u8>,
        /// RSA public exponent (e parameter)
        e: Vec<u8>,
    },
    /// ECDSA P-256 public key
    EcdsaP256 {
        /// X coordinate of the public key point
        x: [u8; 32],
        /// Y coordinate of the public key point
        y: [u8; 32],
    },
}

/// JSON Web Key representation of a DPoP public key
///
/// Serializes to the flat JWK object placed in the proof header's `jwk` member.
/// Members beyond the key material are carried through untouched, so a JWK
/// parsed from the caller's key store lands in the header exactly as it was.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kty")]
pub enum DpopJwk {
    /// RSA public key in JWK format
    #[serde(rename = "RSA")]
    Rsa {
        /// Key usage, `sig` when present
        #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
        use_: Option<String>,

        /// RSA modulus (base64url-encoded)
        n: String,

        /// RSA public exponent (base64url-encoded)
        e: String,

        /// Any other members (`kid`, `alg`, `key_ops`, `x5c`, ...), kept as given
        #[serde(flatten)]
        additional: Map<String, Value>,
    },

    /// Elliptic Curve public key in JWK format
    #[serde(rename = "EC")]
    Ec {
        /// Key usage, `sig` when present
        #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
        use_: Option<String>,

        /// Elliptic curve name
        crv: String,

        /// X coordinate (base64url-encoded)
        x: String,

        /// Y coordinate (base64url-encoded)
        y: String,

        /// Any other members (`kid`, `alg`, `key_ops`, `x5c`, ...), kept as given
        #[serde(flatten)]
        additional: Map<String, Value>,
    },
}

impl DpopJwk {
    /// Create a signing JWK from raw public key material
    pub fn from_public_key(public_key: &DpopPublicKey) -> Self {
        match public_key {
            DpopPublicKey::Rsa { n, e } => Self::Rsa {
                use_: Some("sig".to_string()),
                n: URL_SAFE_NO_PAD.encode(n),
                e: URL_SAFE_NO_PAD.encode(e),
                additional: Map::new(),
            },
            DpopPublicKey::EcdsaP256 { x, y } => Self::Ec {
                use_: Some("sig".to_string()),
                crv: "P-256".to_string(),
                x: URL_SAFE_NO_PAD.encode(x),
                y: URL_SAFE_NO_PAD.encode(y),
                additional: Map::new(),
            },
        }
    }

    /// JWK `kty` value
    pub fn key_type(&self) -> &'static str {
        match self {
            Self::Rsa { .. } => "RSA",
            Self::Ec { .. } => "EC",
        }
    }

    /// Compute the RFC 7638 SHA-256 thumbprint (`dpop_jkt`)
    pub fn thumbprint(&self) -> Result<String> {
        // Required members only, in lexicographic order
        let canonical_jwk = match self {
            Self::Rsa { n, e, .. } => {
                serde_json::json!({
                    "e": e,
                    "kty": "RSA",
                    "n": n
                })
            }
            Self::Ec { crv, x, y, .. } => {
                serde_json::json!({
                    "crv": crv,
                    "kty": "EC",
                    "x": x,
                    "y": y
                })
            }
        };

        let canonical_json = serde_json::to_string(&canonical_jwk)?;
        let hash = Sha256::digest(canonical_json.as_bytes());

        Ok(URL_SAFE_NO_PAD.encode(hash))
    }
}

/// DPoP JWT header as defined in RFC 9449
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DpopHeader {
    /// JWT type - always "dpop+jwt" for DPoP
    #[serde(rename = "typ")]
    pub typ: String,

    /// Cryptographic algorithm used for signing
    #[serde(rename = "alg")]
    pub algorithm: DpopAlgorithm,

    /// JSON Web Key (JWK) representing the public key
    #[serde(rename = "jwk")]
    pub jwk: DpopJwk,
}

/// DPoP JWT payload as defined in RFC 9449
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DpopPayload {
    /// Issued at timestamp (Unix seconds, rounded)
    pub iat: i64,

    /// HTTP method being bound to this proof
    pub htm: String,

    /// HTTP URI being bound to this proof (without fragment)
    pub htu: String,

    /// JWT ID - unique per proof
    pub jti: String,
}

/// A signed DPoP proof
///
/// Holds the decoded header and payload next to the compact serialization that
/// goes into the `DPoP` HTTP header. A proof is single-use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpopProof {
    header: DpopHeader,
    payload: DpopPayload,
    compact: String,
}

impl DpopProof {
    pub(crate) fn from_parts(header: DpopHeader, payload: DpopPayload, compact: String) -> Self {
        Self {
            header,
            payload,
            compact,
        }
    }

    /// JWT header
    pub fn header(&self) -> &DpopHeader {
        &self.header
    }

    /// JWT payload
    pub fn payload(&self) -> &DpopPayload {
        &self.payload
    }

    /// Parse a compact `header.payload.signature` DPoP proof
    pub fn decode(compact: &str) -> Result<Self> {
        let mut segments = compact.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(DpopError::InvalidProofStructure {
                reason: "Compact JWS must have exactly three segments".to_string(),
            });
        };

        let header: DpopHeader = decode_segment(header_b64, "header")?;
        if header.typ != DPOP_JWT_TYPE {
            return Err(DpopError::InvalidProofStructure {
                reason: format!("Invalid JWT type: {}", header.typ),
            });
        }
        let payload: DpopPayload = decode_segment(payload_b64, "payload")?;

        URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| DpopError::InvalidProofStructure {
                reason: format!("Invalid signature encoding: {e}"),
            })?;

        Ok(Self::from_parts(header, payload, compact.to_string()))
    }

    /// The compact serialization
    pub fn as_str(&self) -> &str {
        &self.compact
    }

    /// Consume the proof, returning the compact serialization
    pub fn into_string(self) -> String {
        self.compact
    }

    /// The JWS signing input (`header.payload`)
    pub fn signing_input(&self) -> &str {
        self.compact
            .rsplit_once('.')
            .map_or(self.compact.as_str(), |(input, _)| input)
    }

    /// The base64url-encoded signature segment
    pub fn signature(&self) -> &str {
        self.compact.rsplit_once('.').map_or("", |(_, signature)| signature)
    }

    /// Get the JWK thumbprint of the embedded public key
    pub fn thumbprint(&self) -> Result<String> {
        self.header.jwk.thumbprint()
    }

    /// Check the signature against the public key embedded in the header
    ///
    /// This proves the proof is internally consistent. Freshness, replay and
    /// request binding remain the verifier's responsibility.
    pub fn verify_signature(&self) -> Result<()> {
        let signature =
            URL_SAFE_NO_PAD
                .decode(self.signature())
                .map_err(|e| DpopError::InvalidProofStructure {
                    reason: format!("Invalid signature encoding: {e}"),
                })?;

        keys::verify_signature(
            &self.header.jwk,
            self.header.algorithm,
            self.signing_input().as_bytes(),
            &signature,
        )
    }
}

impl fmt::Display for DpopProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compact)
    }
}

impl From<DpopProof> for String {
    fn from(proof: DpopProof) -> Self {
        proof.into_string()
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str, name: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| DpopError::InvalidProofStructure {
            reason: format!("Invalid {name} encoding: {e}"),
        })?;

    serde_json::from_slice(&bytes).map_err(|e| DpopError::InvalidProofStructure {
        reason: format!("Invalid {name} JSON: {e}"),
    })
}
