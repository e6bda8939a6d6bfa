//! Bridge configuration

use serde::{Deserialize, Serialize};

use crate::error::BridgeResult;

/// Default registry slot name
pub const DEFAULT_REGISTRY_KEY: &str = "js";

/// Default name of the id tag on proxy host functions
pub const DEFAULT_TAG_KEY: &str = "__lua__";

/// Default nesting limit for recursive guest-to-host conversion
pub const DEFAULT_MAX_DEPTH: usize = 200;

/// Settings fixed at bridge installation
///
/// # Examples
///
/// ```
/// use bridge::BridgeConfig;
///
/// let config = BridgeConfig::from_json(r#"{ "max_depth": 8 }"#).unwrap();
/// assert_eq!(config.max_depth, 8);
/// assert_eq!(config.registry_key, "js");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Name of the guest registry slot holding the bridge state
    pub registry_key: String,
    /// Property set on every proxy host function, holding its id
    pub tag_key: String,
    /// Aggregates nested deeper than this convert to `undefined`
    pub max_depth: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            registry_key: DEFAULT_REGISTRY_KEY.to_string(),
            tag_key: DEFAULT_TAG_KEY.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl BridgeConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> BridgeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Use a different registry slot name
    pub fn with_registry_key(mut self, key: impl Into<String>) -> Self {
        self.registry_key = key.into();
        self
    }

    /// Use a different nesting limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
