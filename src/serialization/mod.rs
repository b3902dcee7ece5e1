//! Value serialization for persisted caches.
//!
//! A [`Serializer<T>`] is bound to one element type and turns values into the
//! raw bytes stored in an entry file and back. Decode failures are reported as
//! [`SerializationError::Decode`] so storage caches can treat the entry as
//! corrupt instead of failing the caller.
//!
//! | Format    | Type                     | Notes                             |
//! |-----------|--------------------------|-----------------------------------|
//! | `bincode` | [`BincodeSerializer<T>`] | Compact, default for new caches   |
//! | `json`    | [`JsonSerializer<T>`]    | Human-readable, larger on disk    |

mod bincode_format;
mod json_format;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use bincode_format::BincodeSerializer;
pub use json_format::JsonSerializer;

use crate::error::{ConfigError, SerializationError};

/// Encodes and decodes values of one element type.
pub trait Serializer<T>: Send + Sync {
    fn encode(&self, value: &T) -> Result<Vec<u8>, SerializationError>;

    fn decode(&self, bytes: &[u8]) -> Result<T, SerializationError>;

    /// Short format name, used in logs.
    fn format_name(&self) -> &'static str;
}

/// On-disk encoding selected for caches built by the factory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializationFormat {
    #[default]
    Bincode,
    Json,
}

impl SerializationFormat {
    /// Builds a serializer for `T` in this format.
    pub fn serializer_for<T>(self) -> Arc<dyn Serializer<T>>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        match self {
            SerializationFormat::Bincode => Arc::new(BincodeSerializer::<T>::new()),
            SerializationFormat::Json => Arc::new(JsonSerializer::<T>::new()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SerializationFormat::Bincode => "bincode",
            SerializationFormat::Json => "json",
        }
    }
}

impl fmt::Display for SerializationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SerializationFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bincode" => Ok(SerializationFormat::Bincode),
            "json" => Ok(SerializationFormat::Json),
            other => Err(ConfigError::InvalidDefaults(format!(
                "unknown serialization format `{other}`"
            ))),
        }
    }
}
