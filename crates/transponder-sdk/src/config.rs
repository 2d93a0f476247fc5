use serde::{Deserialize, Serialize};
use transponder_dispatch::DispatchConfig;
use transponder_proxy::{CacheConfig, MaterializerConfig};

use crate::error::{SdkError, SdkResult};

/// Top-level configuration.
///
/// ```toml
/// strict_close = true
///
/// [cache]
/// capacity = 256
///
/// [dispatch]
/// max_live_rules = 20
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransponderConfig {
    /// Fail a describe batch that ends with relationships to undescribed types.
    pub strict_close: bool,
    pub cache: CacheConfig,
    pub dispatch: DispatchConfig,
}

impl Default for TransponderConfig {
    fn default() -> Self {
        Self {
            strict_close: true,
            cache: CacheConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl TransponderConfig {
    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn materializer(&self) -> MaterializerConfig {
        MaterializerConfig {
            cache: self.cache.clone(),
            dispatch: self.dispatch.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config = TransponderConfig::from_toml_str("").unwrap();
        assert_eq!(config, TransponderConfig::default());
        assert!(config.strict_close);
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config = TransponderConfig::from_toml_str(
            "strict_close = false\n[cache]\ncapacity = 8\n",
        )
        .unwrap();
        assert!(!config.strict_close);
        assert_eq!(config.cache.capacity, 8);
        assert_eq!(config.dispatch, DispatchConfig::default());
    }

    #[test]
    fn written_config_reads_back() {
        let mut config = TransponderConfig::default();
        config.dispatch.max_live_rules = 12;
        let text = config.to_toml_string().unwrap();
        assert_eq!(TransponderConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn malformed_config_is_rejected() {
        let err = TransponderConfig::from_toml_str("[cache]\ncapacity = \"big\"").unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
    }
}
