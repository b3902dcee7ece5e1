//! Factory defaults.
//!
//! [`CacheDefaults`] holds the constants the factory falls back to when a
//! builder does not override them. It is plain serde data, so an application
//! can load it from its own configuration file:
//!
//! ```
//! use carbonite::config::CacheDefaults;
//! use carbonite::serialization::SerializationFormat;
//!
//! let defaults = CacheDefaults::from_json_str(r#"{ "memory_capacity": 32, "format": "json" }"#)
//!     .unwrap();
//! assert_eq!(defaults.memory_capacity, 32);
//! assert_eq!(defaults.format, SerializationFormat::Json);
//! // Missing fields keep their defaults.
//! assert_eq!(defaults.storage_dir_name, "carbonite");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::policy::memory::DEFAULT_MEMORY_CAPACITY;
use crate::policy::storage::DEFAULT_CAPACITY;
use crate::serialization::SerializationFormat;

/// Subdirectory of the platform cache directory that holds storage caches.
pub const STORAGE_DIRECTORY_NAME: &str = "carbonite";

/// Defaults applied by [`CacheFactory`](crate::factory::CacheFactory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheDefaults {
    /// Capacity of memory caches built without an override.
    pub memory_capacity: usize,
    /// Capacity of storage caches built without an override.
    pub storage_capacity: usize,
    /// Fixed subdirectory between the base directory and the per-type directory.
    pub storage_dir_name: String,
    /// Rebuild the index from existing entry files when a storage cache opens.
    pub reconcile_on_open: bool,
    /// Encoding for persisted entries.
    pub format: SerializationFormat,
}

impl Default for CacheDefaults {
    fn default() -> Self {
        Self {
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            storage_capacity: DEFAULT_CAPACITY,
            storage_dir_name: STORAGE_DIRECTORY_NAME.to_string(),
            reconcile_on_open: true,
            format: SerializationFormat::default(),
        }
    }
}

impl CacheDefaults {
    /// Parses defaults from JSON; absent fields keep their default values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let defaults: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidDefaults(e.to_string()))?;
        defaults.validate()?;
        Ok(defaults)
    }

    /// Checks that the storage subdirectory is a single plain path component.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = self.storage_dir_name.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(ConfigError::InvalidDefaults(format!(
                "storage_dir_name must be a single directory name, got {name:?}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let defaults = CacheDefaults::default();
        assert_eq!(defaults.memory_capacity, DEFAULT_MEMORY_CAPACITY);
        assert_eq!(defaults.storage_capacity, DEFAULT_CAPACITY);
        assert_eq!(defaults.storage_dir_name, STORAGE_DIRECTORY_NAME);
        assert!(defaults.reconcile_on_open);
        assert_eq!(defaults.format, SerializationFormat::Bincode);
    }

    #[test]
    fn empty_object_is_all_defaults() {
        assert_eq!(
            CacheDefaults::from_json_str("{}").unwrap(),
            CacheDefaults::default()
        );
    }

    #[test]
    fn rejects_nested_dir_name() {
        let err = CacheDefaults::from_json_str(r#"{ "storage_dir_name": "a/b" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDefaults(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(CacheDefaults::from_json_str("{ memory_capacity: }").is_err());
    }

    #[test]
    fn serializes_back() {
        let json = serde_json::to_string(&CacheDefaults::default()).unwrap();
        assert!(json.contains("\"format\":\"bincode\""));
    }
}
