//! DPoP proof construction
//!
//! Builds the compact JWS a wallet sends in the `DPoP` header of a token
//! request. Each call draws a fresh `jti` and reads the clock, so two proofs
//! for the same request never coincide.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use url::Url;

use crate::{
    config::DpopConfig,
    errors::DpopError,
    keys::KeyHandle,
    types::{DpopAlgorithm, DpopHeader, DpopJwk, DpopPayload, DpopProof, SigningAlgorithm},
    Result, DPOP_HTTP_METHOD, DPOP_JWT_TYPE, JTI_ENTROPY_BYTES,
};

/// Builds DPoP proofs for token endpoint requests
///
/// The builder is stateless between calls and can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct DpopProofBuilder {
    config: DpopConfig,
}

impl DpopProofBuilder {
    /// Create a builder with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with a custom configuration
    pub fn with_config(config: DpopConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration
    pub fn config(&self) -> &DpopConfig {
        &self.config
    }

    /// Build a proof and return its compact serialization
    ///
    /// `jwk` is embedded verbatim as the header `jwk`; `key` must hold the
    /// matching private key.
    pub fn build_proof<K>(
        &self,
        algorithm: &SigningAlgorithm,
        jwk: &DpopJwk,
        key: &K,
        target: &Url,
    ) -> Result<String>
    where
        K: KeyHandle + ?Sized,
    {
        self.build(algorithm, jwk, key, target)
            .map(DpopProof::into_string)
    }

    /// Build a proof, keeping the decoded header and payload alongside the
    /// compact serialization
    pub fn build<K>(
        &self,
        algorithm: &SigningAlgorithm,
        jwk: &DpopJwk,
        key: &K,
        target: &Url,
    ) -> Result<DpopProof>
    where
        K: KeyHandle + ?Sized,
    {
        // Nothing is drawn or signed for an algorithm we cannot serve
        let algorithm = self.resolve_algorithm(algorithm)?;
        let htu = http_target_uri(target)?;

        let signer = key.signer(algorithm).map_err(|e| match e {
            DpopError::SignerConstructionFailed { .. } => e,
            other => DpopError::SignerConstructionFailed {
                reason: other.to_string(),
            },
        })?;

        let header = DpopHeader {
            typ: DPOP_JWT_TYPE.to_string(),
            algorithm,
            jwk: jwk.clone(),
        };

        let payload = DpopPayload {
            iat: issued_at(since_epoch()?),
            htm: DPOP_HTTP_METHOD.to_string(),
            htu,
            jti: generate_jti(),
        };

        let encoded_header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
        let encoded_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload)?);
        let signing_input = format!("{encoded_header}.{encoded_payload}");

        let signature_bytes = signer.sign(signing_input.as_bytes()).map_err(|e| match e {
            DpopError::SigningFailed { .. } => e,
            other => DpopError::SigningFailed {
                reason: other.to_string(),
            },
        })?;
        let signature = URL_SAFE_NO_PAD.encode(signature_bytes);
        let compact = format!("{signing_input}.{signature}");

        tracing::debug!(
            alg = %algorithm,
            htu = %payload.htu,
            jti = %payload.jti,
            "Built DPoP proof"
        );

        Ok(DpopProof::from_parts(header, payload, compact))
    }

    fn resolve_algorithm(&self, algorithm: &SigningAlgorithm) -> Result<DpopAlgorithm> {
        let resolved = DpopAlgorithm::try_from(algorithm)?;
        if !self.config.supports(resolved) {
            return Err(DpopError::AlgorithmNotSupported {
                algorithm: algorithm.to_string(),
            });
        }
        Ok(resolved)
    }
}

/// Convert time since the epoch into an `iat` value
///
/// Rounds to the nearest second, halves up: 12.5 s and 12.6 s give 13.
pub fn issued_at(since_epoch: Duration) -> i64 {
    let seconds = since_epoch.as_secs() as i64;
    if since_epoch.subsec_nanos() >= 500_000_000 {
        seconds + 1
    } else {
        seconds
    }
}

fn since_epoch() -> Result<Duration> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| DpopError::InternalError {
            reason: "System clock before Unix epoch".to_string(),
        })
}

/// Draw `entropy_bytes` from the OS CSPRNG and base64url-encode them
fn generate_jti() -> String {
    let mut bytes = [0u8; JTI_ENTROPY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Render the `htu` claim: the absolute URL without its fragment
fn http_target_uri(target: &Url) -> Result<String> {
    if !matches!(target.scheme(), "https" | "http") {
        return Err(DpopError::InvalidTargetUrl {
            reason: format!("Unsupported scheme: {}", target.scheme()),
        });
    }
    if target.host_str().is_none() {
        return Err(DpopError::InvalidTargetUrl {
            reason: "URL missing host".to_string(),
        });
    }

    let mut htu = target.clone();
    htu.set_fragment(None);
    Ok(htu.into())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        config::DpopConfigBuilder,
        keys::{DpopKeyPair, ProofSigner},
    };
    use pretty_assertions::assert_eq;

    fn token_endpoint() -> Url {
        Url::parse("https://issuer.example/token").unwrap()
    }

    #[derive(Debug, Default)]
    struct CountingKey {
        signer_requests: AtomicUsize,
    }

    impl KeyHandle for CountingKey {
        fn signer(&self, _algorithm: DpopAlgorithm) -> Result<Box<dyn ProofSigner + '_>> {
            self.signer_requests.fetch_add(1, Ordering::SeqCst);
            Err(DpopError::CryptographicError {
                reason: "key store unavailable".to_string(),
            })
        }
    }

    #[derive(Debug)]
    struct FailingSignerKey;

    struct FailingSigner;

    impl ProofSigner for FailingSigner {
        fn sign(&self, _signing_input: &[u8]) -> Result<Vec<u8>> {
            Err(DpopError::InternalError {
                reason: "secure enclave busy".to_string(),
            })
        }
    }

    impl KeyHandle for FailingSignerKey {
        fn signer(&self, _algorithm: DpopAlgorithm) -> Result<Box<dyn ProofSigner + '_>> {
            Ok(Box::new(FailingSigner))
        }
    }

    #[test]
    fn test_issued_at_rounds_to_nearest_second() {
        assert_eq!(issued_at(Duration::from_millis(12_600)), 13);
        assert_eq!(issued_at(Duration::from_millis(12_500)), 13);
        assert_eq!(issued_at(Duration::from_millis(12_499)), 12);
        assert_eq!(issued_at(Duration::from_millis(12_000)), 12);
        assert_eq!(issued_at(Duration::ZERO), 0);
    }

    #[test]
    fn test_jti_length_and_alphabet() {
        let jti = generate_jti();
        assert_eq!(jti.len(), 27);
        assert!(jti
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(generate_jti(), jti);
    }

    #[test]
    fn test_target_uri_rendering() {
        let render = |s: &str| http_target_uri(&Url::parse(s).unwrap());

        assert_eq!(
            render("https://issuer.example/token").unwrap(),
            "https://issuer.example/token"
        );
        assert_eq!(
            render("https://issuer.example:8443/as/token?tenant=a#frag").unwrap(),
            "https://issuer.example:8443/as/token?tenant=a"
        );
        assert!(matches!(
            render("urn:ietf:params:oauth:request_uri:abc"),
            Err(DpopError::InvalidTargetUrl { .. })
        ));
        assert!(matches!(
            render("ftp://issuer.example/token"),
            Err(DpopError::InvalidTargetUrl { .. })
        ));
    }

    #[test]
    fn test_build_es256_proof() {
        let key_pair = DpopKeyPair::generate(DpopAlgorithm::ES256).unwrap();
        let proof = DpopProofBuilder::new()
            .build(
                &SigningAlgorithm::ES256,
                key_pair.jwk(),
                &key_pair,
                &token_endpoint(),
            )
            .unwrap();

        assert_eq!(proof.header().typ, "dpop+jwt");
        assert_eq!(proof.header().algorithm, DpopAlgorithm::ES256);
        assert_eq!(&proof.header().jwk, key_pair.jwk());
        assert_eq!(proof.payload().htm, "POST");
        assert_eq!(proof.payload().htu, "https://issuer.example/token");
        proof.verify_signature().unwrap();
    }

    #[test]
    fn test_unsupported_algorithm_never_reaches_key() {
        let key = CountingKey::default();
        let jwk = DpopKeyPair::generate(DpopAlgorithm::ES256)
            .unwrap()
            .jwk()
            .clone();

        let err = DpopProofBuilder::new()
            .build_proof(&SigningAlgorithm::HS256, &jwk, &key, &token_endpoint())
            .unwrap_err();

        assert_eq!(
            err,
            DpopError::AlgorithmNotSupported {
                algorithm: "HS256".to_string()
            }
        );
        assert_eq!(key.signer_requests.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_algorithm_disabled_by_config() {
        let config = DpopConfigBuilder::new()
            .supported_algorithms([DpopAlgorithm::ES256])
            .unwrap()
            .build();
        let builder = DpopProofBuilder::with_config(config).unwrap();
        let key = CountingKey::default();
        let jwk = DpopKeyPair::generate(DpopAlgorithm::ES256)
            .unwrap()
            .jwk()
            .clone();

        let err = builder
            .build_proof(&SigningAlgorithm::PS256, &jwk, &key, &token_endpoint())
            .unwrap_err();

        assert!(matches!(err, DpopError::AlgorithmNotSupported { .. }));
        assert_eq!(key.signer_requests.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_key_handle_errors_become_signer_construction_failures() {
        let key = CountingKey::default();
        let jwk = DpopKeyPair::generate(DpopAlgorithm::ES256)
            .unwrap()
            .jwk()
            .clone();

        let err = DpopProofBuilder::new()
            .build_proof(&SigningAlgorithm::ES256, &jwk, &key, &token_endpoint())
            .unwrap_err();

        assert_eq!(
            err,
            DpopError::SignerConstructionFailed {
                reason: "Cryptographic error: key store unavailable".to_string()
            }
        );
        assert_eq!(key.signer_requests.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_signing_failure_is_reported() {
        let jwk = DpopKeyPair::generate(DpopAlgorithm::ES256)
            .unwrap()
            .jwk()
            .clone();

        let err = DpopProofBuilder::new()
            .build_proof(
                &SigningAlgorithm::ES256,
                &jwk,
                &FailingSignerKey,
                &token_endpoint(),
            )
            .unwrap_err();

        assert!(matches!(err, DpopError::SigningFailed { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_with_config_rejects_invalid_config() {
        let config = DpopConfig {
            supported_algorithms: vec![],
        };
        assert!(matches!(
            DpopProofBuilder::with_config(config),
            Err(DpopError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_jti_width_fixed_under_custom_config() {
        let config = DpopConfigBuilder::new()
            .supported_algorithms([DpopAlgorithm::ES256])
            .unwrap()
            .build();
        let key_pair = DpopKeyPair::generate(DpopAlgorithm::ES256).unwrap();

        let proof = DpopProofBuilder::with_config(config)
            .unwrap()
            .build(
                &SigningAlgorithm::ES256,
                key_pair.jwk(),
                &key_pair,
                &token_endpoint(),
            )
            .unwrap();

        assert_eq!(proof.payload().jti.len(), 27);
        assert_eq!(URL_SAFE_NO_PAD.decode(&proof.payload().jti).unwrap().len(), 20);
    }
}
