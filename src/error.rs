//! Error types for the carbonite library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when a cache cannot be constructed (capacity
//!   below the floor, unusable directory, unknown or incompatible custom
//!   implementation). These abort construction; nothing is returned.
//! - [`CacheError`]: Returned by runtime operations on a built cache
//!   (filesystem failures during mutation, encode failures, invalid keys,
//!   use after close).
//! - [`SerializationError`]: Produced by a [`Serializer`](crate::serialization::Serializer).
//!
//! ## Example Usage
//!
//! ```
//! use carbonite::error::ConfigError;
//! use carbonite::policy::memory::MemoryLruCache;
//!
//! let cache: Result<MemoryLruCache<String, i32>, ConfigError> = MemoryLruCache::try_new(100);
//! assert!(cache.is_ok());
//!
//! let bad = MemoryLruCache::<String, i32>::try_new(0);
//! assert!(matches!(bad, Err(ConfigError::CapacityBelowFloor { .. })));
//! ```

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for runtime cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when a cache cannot be constructed.
///
/// Every variant names the precondition that was violated. The factory
/// never falls back to another construction path after one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Requested capacity is smaller than the backend's documented floor.
    #[error("cache capacity must be at least {minimum}, got {capacity}")]
    CapacityBelowFloor { capacity: usize, minimum: usize },

    /// The requested cache kind has no construction branch.
    #[error("not yet implemented cache type `{0}`")]
    UnsupportedCacheType(String),

    /// A storage cache was requested without a directory provider.
    #[error("storage cache requires a directory provider")]
    MissingDirectoryProvider,

    /// The directory provider returned nothing usable.
    #[error("cache directory unavailable: {0}")]
    DirectoryUnavailable(String),

    /// Another live storage cache already owns the directory.
    #[error("cache directory {} is already owned by another storage cache", .0.display())]
    DirectoryInUse(PathBuf),

    /// No constructor is registered under the requested identifier.
    #[error("no cache implementation registered as `{0}`")]
    UnknownImplementation(String),

    /// The registered implementation cannot be built for this element type
    /// or with the supplied options.
    #[error("cache implementation `{id}` is not instantiable with its options: {reason}")]
    IncompatibleImplementation { id: String, reason: String },

    /// Serialized defaults could not be parsed.
    #[error("invalid cache defaults: {0}")]
    InvalidDefaults(String),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::IncompatibleImplementation`].
    pub fn incompatible(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IncompatibleImplementation {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SerializationError
// ---------------------------------------------------------------------------

/// Error produced while encoding or decoding a cached value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializationError {
    #[error("failed to encode {type_name}: {reason}")]
    Encode {
        type_name: &'static str,
        reason: String,
    },

    /// Bytes are corrupt or were written for an incompatible type.
    #[error("failed to decode {type_name}: {reason}")]
    Decode {
        type_name: &'static str,
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// CacheError
// ---------------------------------------------------------------------------

/// Error returned by operations on a constructed cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem failure while mutating persisted state.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// Key cannot be mapped to a backing file.
    #[error("invalid cache key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    /// The cache was closed; no further operations are permitted.
    #[error("cache is closed")]
    Closed,
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_display_names_precondition() {
        let err = ConfigError::CapacityBelowFloor {
            capacity: 0,
            minimum: 1,
        };
        assert_eq!(err.to_string(), "cache capacity must be at least 1, got 0");
    }

    #[test]
    fn unsupported_type_reads_not_yet_implemented() {
        let err = ConfigError::UnsupportedCacheType("network".into());
        assert!(err.to_string().contains("not yet implemented"));
        assert!(err.to_string().contains("network"));
    }

    #[test]
    fn incompatible_shorthand() {
        let err = ConfigError::incompatible("redis", "wrong options type");
        assert_eq!(
            err,
            ConfigError::IncompatibleImplementation {
                id: "redis".into(),
                reason: "wrong options type".into(),
            }
        );
        assert!(err.to_string().contains("not instantiable"));
    }

    #[test]
    fn config_implements_std_error() {
        fn assert_error<T: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<ConfigError>();
    }

    // -- CacheError -------------------------------------------------------

    #[test]
    fn io_error_keeps_source() {
        use std::error::Error as _;

        let err = CacheError::io("/tmp/x.entry", io::Error::other("disk full"));
        assert!(err.to_string().contains("/tmp/x.entry"));
        assert!(err.source().is_some());
    }

    #[test]
    fn serialization_error_converts() {
        let err: CacheError = SerializationError::Decode {
            type_name: "u32",
            reason: "eof".into(),
        }
        .into();
        assert!(matches!(err, CacheError::Serialization(_)));
        assert_eq!(err.to_string(), "failed to decode u32: eof");
    }

    #[test]
    fn cache_error_implements_std_error() {
        fn assert_error<T: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<CacheError>();
        assert_error::<SerializationError>();
    }
}
