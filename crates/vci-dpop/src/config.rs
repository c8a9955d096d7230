//! DPoP proof builder configuration
//!
//! # Examples
//!
//! ```
//! use vci_dpop::{DpopAlgorithm, DpopConfig, DpopConfigBuilder};
//!
//! let config = DpopConfig::default();
//! assert!(config.supports(DpopAlgorithm::PS256));
//!
//! let config = DpopConfigBuilder::new()
//!     .supported_algorithms([DpopAlgorithm::ES256]).unwrap()
//!     .build();
//! assert!(!config.supports(DpopAlgorithm::RS256));
//! ```

use serde::{Deserialize, Serialize};

use crate::{errors::DpopError, types::DpopAlgorithm, Result};

/// Configuration for [`DpopProofBuilder`](crate::DpopProofBuilder)
///
/// The wire format itself is not configurable: every `jti` draws
/// [`JTI_ENTROPY_BYTES`](crate::JTI_ENTROPY_BYTES) random bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DpopConfig {
    /// Algorithms the builder will sign with
    pub supported_algorithms: Vec<DpopAlgorithm>,
}

impl Default for DpopConfig {
    fn default() -> Self {
        Self {
            supported_algorithms: DpopAlgorithm::ALL.to_vec(),
        }
    }
}

impl DpopConfig {
    /// Whether proofs may be signed with `algorithm`
    pub fn supports(&self, algorithm: DpopAlgorithm) -> bool {
        self.supported_algorithms.contains(&algorithm)
    }

    /// Check a configuration that did not come through the builder
    pub fn validate(&self) -> Result<()> {
        check_algorithms(&self.supported_algorithms)
            .map_err(|reason| DpopError::ConfigurationError { reason })
    }
}

/// Configuration builder for DPoP settings
#[derive(Debug)]
pub struct DpopConfigBuilder {
    config: DpopConfig,
}

impl DpopConfigBuilder {
    /// Create a new configuration builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: DpopConfig::default(),
        }
    }

    /// Restrict the algorithms the builder will sign with
    ///
    /// ```
    /// use vci_dpop::DpopConfigBuilder;
    ///
    /// assert!(DpopConfigBuilder::new().supported_algorithms([]).is_err());
    /// ```
    pub fn supported_algorithms(
        mut self,
        algorithms: impl IntoIterator<Item = DpopAlgorithm>,
    ) -> std::result::Result<Self, String> {
        let mut supported: Vec<DpopAlgorithm> = Vec::new();
        for algorithm in algorithms {
            if !supported.contains(&algorithm) {
                supported.push(algorithm);
            }
        }
        check_algorithms(&supported)?;
        self.config.supported_algorithms = supported;
        Ok(self)
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> DpopConfig {
        self.config
    }
}

impl Default for DpopConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn check_algorithms(algorithms: &[DpopAlgorithm]) -> std::result::Result<(), String> {
    if algorithms.is_empty() {
        return Err("At least one signature algorithm must be enabled".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = DpopConfig::default();
        assert_eq!(
            config.supported_algorithms,
            vec![DpopAlgorithm::ES256, DpopAlgorithm::RS256, DpopAlgorithm::PS256]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_validation() {
        assert!(DpopConfigBuilder::new()
            .supported_algorithms([DpopAlgorithm::RS256])
            .is_ok());
        assert!(DpopConfigBuilder::new().supported_algorithms([]).is_err());
    }

    #[test]
    fn test_builder_deduplicates_algorithms() {
        let config = DpopConfigBuilder::new()
            .supported_algorithms([DpopAlgorithm::PS256, DpopAlgorithm::PS256])
            .unwrap()
            .build();
        assert_eq!(config.supported_algorithms, vec![DpopAlgorithm::PS256]);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: DpopConfig =
            serde_json::from_str(r#"{"supported_algorithms":["ES256"]}"#).unwrap();
        assert!(config.supports(DpopAlgorithm::ES256));
        assert!(!config.supports(DpopAlgorithm::PS256));
    }

    #[test]
    fn test_validate_rejects_bad_deserialized_config() {
        let config: DpopConfig =
            serde_json::from_str(r#"{"supported_algorithms":[]}"#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(DpopError::ConfigurationError { .. })
        ));
    }
}
