//! DPoP key handles and signing primitives
//!
//! The proof builder only talks to the [`KeyHandle`] and [`ProofSigner`]
//! traits. [`DpopKeyPair`] is the in-process software key used by wallets
//! without a platform key store, and by tests.

use std::fmt;
use std::time::SystemTime;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::rngs::OsRng;
use sha2::Sha256;
use signature::{RandomizedSigner, SignatureEncoding, Signer, Verifier};
use zeroize::Zeroize;

use crate::{
    errors::DpopError,
    types::{DpopAlgorithm, DpopJwk, DpopPublicKey},
    Result,
};

/// A signing operation bound to one key and one algorithm
pub trait ProofSigner {
    /// Sign the JWS signing input, returning the raw JWS signature bytes
    fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>>;
}

/// Capability to sign with a private key the caller does not expose
///
/// Implementations wrap whatever holds the key: process memory, a platform
/// keychain, an HSM session. The builder borrows the handle for one call.
pub trait KeyHandle: Send + Sync + fmt::Debug {
    /// Create a signer for `algorithm`
    ///
    /// Fails with [`DpopError::SignerConstructionFailed`] when the key cannot
    /// be used with the algorithm.
    fn signer(&self, algorithm: DpopAlgorithm) -> Result<Box<dyn ProofSigner + '_>>;
}

/// Private key material for DPoP operations
#[derive(Clone)]
pub enum DpopPrivateKey {
    /// RSA private key
    Rsa {
        /// RSA private key in PKCS#8 DER format
        key_der: Vec<u8>,
    },
    /// ECDSA P-256 private key
    EcdsaP256 {
        /// P-256 private scalar
        key_bytes: [u8; 32],
    },
}

impl DpopPrivateKey {
    fn key_type(&self) -> &'static str {
        match self {
            Self::Rsa { .. } => "RSA",
            Self::EcdsaP256 { .. } => "EC P-256",
        }
    }
}

impl fmt::Debug for DpopPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DpopPrivateKey({}, <redacted>)", self.key_type())
    }
}

impl Zeroize for DpopPrivateKey {
    fn zeroize(&mut self) {
        match self {
            Self::Rsa { key_der } => key_der.zeroize(),
            Self::EcdsaP256 { key_bytes } => key_bytes.zeroize(),
        }
    }
}

impl Drop for DpopPrivateKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl KeyHandle for DpopPrivateKey {
    fn signer(&self, algorithm: DpopAlgorithm) -> Result<Box<dyn ProofSigner + '_>> {
        match (self, algorithm) {
            (Self::EcdsaP256 { key_bytes }, DpopAlgorithm::ES256) => {
                let signing_key = p256::ecdsa::SigningKey::from_bytes(key_bytes.into())
                    .map_err(|e| DpopError::SignerConstructionFailed {
                        reason: format!("Invalid ECDSA private key: {e}"),
                    })?;
                Ok(Box::new(Es256Signer { signing_key }))
            }
            (Self::Rsa { key_der }, DpopAlgorithm::RS256) => {
                let private_key = decode_rsa_private_key(key_der)?;
                Ok(Box::new(Rs256Signer {
                    signing_key: rsa::pkcs1v15::SigningKey::<Sha256>::new(private_key),
                }))
            }
            (Self::Rsa { key_der }, DpopAlgorithm::PS256) => {
                let private_key = decode_rsa_private_key(key_der)?;
                Ok(Box::new(Ps256Signer {
                    signing_key: rsa::pss::BlindedSigningKey::<Sha256>::new(private_key),
                }))
            }
            (key, algorithm) => Err(DpopError::SignerConstructionFailed {
                reason: format!("{} key cannot sign with {algorithm}", key.key_type()),
            }),
        }
    }
}

struct Es256Signer {
    signing_key: p256::ecdsa::SigningKey,
}

impl ProofSigner for Es256Signer {
    fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>> {
        // Fixed-width r || s, as JWS requires
        let signature: p256::ecdsa::Signature =
            self.signing_key
                .try_sign(signing_input)
                .map_err(|e| DpopError::SigningFailed {
                    reason: format!("ECDSA signing failed: {e}"),
                })?;
        Ok(signature.to_bytes().to_vec())
    }
}

struct Rs256Signer {
    signing_key: rsa::pkcs1v15::SigningKey<Sha256>,
}

impl ProofSigner for Rs256Signer {
    fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>> {
        let signature: rsa::pkcs1v15::Signature = self
            .signing_key
            .try_sign(signing_input)
            .map_err(|e| DpopError::SigningFailed {
                reason: format!("RSA signing failed: {e}"),
            })?;
        Ok(signature.to_bytes().to_vec())
    }
}

struct Ps256Signer {
    signing_key: rsa::pss::BlindedSigningKey<Sha256>,
}

impl ProofSigner for Ps256Signer {
    fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>> {
        let signature: rsa::pss::Signature = self
            .signing_key
            .try_sign_with_rng(&mut OsRng, signing_input)
            .map_err(|e| DpopError::SigningFailed {
                reason: format!("RSA-PSS signing failed: {e}"),
            })?;
        Ok(signature.to_bytes().to_vec())
    }
}

/// Software DPoP key pair
///
/// The private key is zeroized on drop. The JWK and its thumbprint are derived
/// once at creation.
#[derive(Debug, Clone)]
pub struct DpopKeyPair {
    /// Algorithm the key pair was created for
    pub algorithm: DpopAlgorithm,

    /// Private key material (will be zeroized on drop)
    private_key: DpopPrivateKey,

    /// Public key material
    pub public_key: DpopPublicKey,

    /// Public key as embedded into proofs
    jwk: DpopJwk,

    /// JWK thumbprint (RFC 7638)
    pub thumbprint: String,

    /// Key creation timestamp
    pub created_at: SystemTime,
}

impl DpopKeyPair {
    /// Generate a fresh key pair for the algorithm
    pub fn generate(algorithm: DpopAlgorithm) -> Result<Self> {
        let (private_key, public_key) = match algorithm {
            DpopAlgorithm::ES256 => generate_es256_key_pair()?,
            DpopAlgorithm::RS256 | DpopAlgorithm::PS256 => {
                generate_rsa_key_pair(algorithm.recommended_key_size())?
            }
        };

        let key_pair = Self::from_parts(algorithm, private_key, public_key)?;

        tracing::info!(
            algorithm = %algorithm,
            thumbprint = %key_pair.thumbprint,
            "Generated new DPoP key pair"
        );

        Ok(key_pair)
    }

    /// Import an ES256 key from its 32-byte private scalar
    pub fn from_es256_bytes(key_bytes: [u8; 32]) -> Result<Self> {
        let signing_key = p256::ecdsa::SigningKey::from_bytes(&key_bytes.into()).map_err(|e| {
            DpopError::CryptographicError {
                reason: format!("Invalid ECDSA private key: {e}"),
            }
        })?;
        let public_key = es256_public_key(signing_key.verifying_key())?;

        Self::from_parts(
            DpopAlgorithm::ES256,
            DpopPrivateKey::EcdsaP256 { key_bytes },
            public_key,
        )
    }

    /// Import an RSA key from PKCS#8 DER for RS256 or PS256
    pub fn from_rsa_pkcs8_der(algorithm: DpopAlgorithm, key_der: &[u8]) -> Result<Self> {
        use rsa::traits::PublicKeyParts;

        if !algorithm.is_rsa() {
            return Err(DpopError::CryptographicError {
                reason: format!("{algorithm} is not an RSA algorithm"),
            });
        }

        let private_key = decode_rsa_private_key(key_der).map_err(|e| {
            DpopError::CryptographicError {
                reason: e.to_string(),
            }
        })?;
        let public_key = DpopPublicKey::Rsa {
            n: private_key.n().to_bytes_be(),
            e: private_key.e().to_bytes_be(),
        };

        Self::from_parts(
            algorithm,
            DpopPrivateKey::Rsa {
                key_der: key_der.to_vec(),
            },
            public_key,
        )
    }

    fn from_parts(
        algorithm: DpopAlgorithm,
        private_key: DpopPrivateKey,
        public_key: DpopPublicKey,
    ) -> Result<Self> {
        let jwk = DpopJwk::from_public_key(&public_key);
        let thumbprint = jwk.thumbprint()?;

        Ok(Self {
            algorithm,
            private_key,
            public_key,
            jwk,
            thumbprint,
            created_at: SystemTime::now(),
        })
    }

    /// Public key in JWK form, ready to embed into a proof header
    pub fn jwk(&self) -> &DpopJwk {
        &self.jwk
    }
}

impl KeyHandle for DpopKeyPair {
    fn signer(&self, algorithm: DpopAlgorithm) -> Result<Box<dyn ProofSigner + '_>> {
        self.private_key.signer(algorithm)
    }
}

/// Generate ES256 (ECDSA P-256) key pair
fn generate_es256_key_pair() -> Result<(DpopPrivateKey, DpopPublicKey)> {
    let signing_key = p256::ecdsa::SigningKey::random(&mut OsRng);
    let public_key = es256_public_key(signing_key.verifying_key())?;

    let private_key = DpopPrivateKey::EcdsaP256 {
        key_bytes: signing_key.to_bytes().into(),
    };

    Ok((private_key, public_key))
}

fn es256_public_key(verifying_key: &p256::ecdsa::VerifyingKey) -> Result<DpopPublicKey> {
    let public_point = verifying_key.to_encoded_point(false);

    let x: [u8; 32] = public_point
        .x()
        .ok_or_else(|| DpopError::CryptographicError {
            reason: "Failed to extract X coordinate from P-256 key".to_string(),
        })?
        .as_slice()
        .try_into()
        .map_err(|_| DpopError::CryptographicError {
            reason: "Invalid X coordinate length".to_string(),
        })?;

    let y: [u8; 32] = public_point
        .y()
        .ok_or_else(|| DpopError::CryptographicError {
            reason: "Failed to extract Y coordinate from P-256 key".to_string(),
        })?
        .as_slice()
        .try_into()
        .map_err(|_| DpopError::CryptographicError {
            reason: "Invalid Y coordinate length".to_string(),
        })?;

    Ok(DpopPublicKey::EcdsaP256 { x, y })
}

/// Generate RSA key pair (for RS256/PS256)
fn generate_rsa_key_pair(key_size: usize) -> Result<(DpopPrivateKey, DpopPublicKey)> {
    use rsa::{pkcs8::EncodePrivateKey, traits::PublicKeyParts, RsaPrivateKey};

    let private_key =
        RsaPrivateKey::new(&mut OsRng, key_size).map_err(|e| DpopError::CryptographicError {
            reason: format!("Failed to generate RSA key: {e}"),
        })?;

    let key_der = private_key
        .to_pkcs8_der()
        .map_err(|e| DpopError::CryptographicError {
            reason: format!("Failed to encode RSA private key: {e}"),
        })?
        .as_bytes()
        .to_vec();

    let public_key = DpopPublicKey::Rsa {
        n: private_key.n().to_bytes_be(),
        e: private_key.e().to_bytes_be(),
    };

    Ok((DpopPrivateKey::Rsa { key_der }, public_key))
}

fn decode_rsa_private_key(key_der: &[u8]) -> Result<rsa::RsaPrivateKey> {
    use rsa::pkcs8::DecodePrivateKey;

    rsa::RsaPrivateKey::from_pkcs8_der(key_der).map_err(|e| DpopError::SignerConstructionFailed {
        reason: format!("Invalid RSA private key: {e}"),
    })
}

/// Verify a JWS signature with the public key from a JWK
pub(crate) fn verify_signature(
    jwk: &DpopJwk,
    algorithm: DpopAlgorithm,
    signing_input: &[u8],
    signature: &[u8],
) -> Result<()> {
    match (jwk, algorithm) {
        (DpopJwk::Ec { crv, x, y, .. }, DpopAlgorithm::ES256) => {
            if crv != "P-256" {
                return Err(DpopError::InvalidProofStructure {
                    reason: format!("Unsupported curve: {crv}"),
                });
            }
            verify_es256_signature(signing_input, signature, x, y)
        }
        (DpopJwk::Rsa { n, e, .. }, DpopAlgorithm::RS256 | DpopAlgorithm::PS256) => {
            verify_rsa_signature(signing_input, signature, n, e, algorithm)
        }
        (jwk, algorithm) => Err(DpopError::ProofValidationFailed {
            reason: format!("{} key does not match algorithm {algorithm}", jwk.key_type()),
        }),
    }
}

/// Verify ECDSA P-256 signature
fn verify_es256_signature(data: &[u8], signature: &[u8], x: &str, y: &str) -> Result<()> {
    use p256::{
        ecdsa::{Signature, VerifyingKey},
        EncodedPoint,
    };

    let x = decode_coordinate(x, "X")?;
    let y = decode_coordinate(y, "Y")?;

    let mut uncompressed = [0u8; 65];
    uncompressed[0] = 0x04;
    uncompressed[1..33].copy_from_slice(&x);
    uncompressed[33..65].copy_from_slice(&y);

    let point =
        EncodedPoint::from_bytes(uncompressed).map_err(|e| DpopError::CryptographicError {
            reason: format!("Invalid public key point: {e}"),
        })?;

    let verifying_key =
        VerifyingKey::from_encoded_point(&point).map_err(|e| DpopError::CryptographicError {
            reason: format!("Invalid ECDSA public key: {e}"),
        })?;

    let signature = Signature::try_from(signature).map_err(|e| DpopError::CryptographicError {
        reason: format!("Invalid ECDSA signature format: {e}"),
    })?;

    verifying_key
        .verify(data, &signature)
        .map_err(|e| DpopError::ProofValidationFailed {
            reason: format!("ECDSA signature verification failed: {e}"),
        })
}

fn decode_coordinate(value: &str, name: &str) -> Result<[u8; 32]> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| DpopError::InvalidProofStructure {
            reason: format!("Invalid EC {name} coordinate encoding: {e}"),
        })?
        .try_into()
        .map_err(|_| DpopError::InvalidProofStructure {
            reason: format!("EC {name} coordinate must be 32 bytes"),
        })
}

/// Verify RSA signature
fn verify_rsa_signature(
    data: &[u8],
    signature: &[u8],
    n: &str,
    e: &str,
    algorithm: DpopAlgorithm,
) -> Result<()> {
    use rsa::{BigUint, RsaPublicKey};

    let decode = |value: &str, name: &str| {
        URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|err| DpopError::InvalidProofStructure {
                reason: format!("Invalid RSA {name} encoding: {err}"),
            })
    };
    let n = BigUint::from_bytes_be(&decode(n, "modulus")?);
    let e = BigUint::from_bytes_be(&decode(e, "exponent")?);

    let public_key = RsaPublicKey::new(n, e).map_err(|e| DpopError::CryptographicError {
        reason: format!("Invalid RSA public key: {e}"),
    })?;

    match algorithm {
        DpopAlgorithm::RS256 => {
            let verifying_key = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(public_key);
            let signature = rsa::pkcs1v15::Signature::try_from(signature).map_err(|e| {
                DpopError::CryptographicError {
                    reason: format!("Invalid RSA signature format: {e}"),
                }
            })?;
            verifying_key
                .verify(data, &signature)
                .map_err(|e| DpopError::ProofValidationFailed {
                    reason: format!("RSA signature verification failed: {e}"),
                })
        }
        DpopAlgorithm::PS256 => {
            let verifying_key = rsa::pss::VerifyingKey::<Sha256>::new(public_key);
            let signature = rsa::pss::Signature::try_from(signature).map_err(|e| {
                DpopError::CryptographicError {
                    reason: format!("Invalid RSA-PSS signature format: {e}"),
                }
            })?;
            verifying_key
                .verify(data, &signature)
                .map_err(|e| DpopError::ProofValidationFailed {
                    reason: format!("RSA-PSS signature verification failed: {e}"),
                })
        }
        DpopAlgorithm::ES256 => Err(DpopError::CryptographicError {
            reason: format!("Unsupported RSA algorithm: {algorithm}"),
        }),
    }
}
