//! Cache requests.
//!
//! A [`CacheBuilder<T>`] declares what the caller wants: the kind of cache,
//! the element type `T`, where a storage cache may live and, optionally, a
//! [`CacheOptions`] naming a custom implementation. It is plain data; the
//! [`CacheFactory`](crate::factory::CacheFactory) turns it into a cache.
//!
//! ## Example
//!
//! ```rust
//! use carbonite::builder::{CacheBuilder, FixedDirectory};
//! use carbonite::factory::CacheFactory;
//!
//! let factory = CacheFactory::new();
//!
//! let memory = CacheBuilder::<String>::memory().with_capacity(2).build(&factory).unwrap();
//! memory.put("a".into(), "hello".into()).unwrap();
//! assert_eq!(memory.get(&"a".into()).unwrap(), Some("hello".to_string()));
//!
//! let dir = tempfile::tempdir().unwrap();
//! let storage = CacheBuilder::<u64>::storage(FixedDirectory::new(dir.path()))
//!     .build(&factory)
//!     .unwrap();
//! storage.put("answer".into(), 42).unwrap();
//! assert_eq!(storage.get(&"answer".into()).unwrap(), Some(42));
//! ```

use std::any::{type_name, Any};
use std::borrow::Cow;
use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::factory::CacheFactory;
use crate::serialization::SerializationFormat;
use crate::traits::{Cache, Cacheable};

/// Built-in cache kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    /// Bounded in-process LRU.
    Memory,
    /// Bounded LRU persisted one file per entry.
    Storage,
}

impl CacheType {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheType::Memory => "memory",
            CacheType::Storage => "storage",
        }
    }
}

impl fmt::Display for CacheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheType {
    type Err = ConfigError;

    /// Parses a kind name; anything without a construction branch is
    /// [`ConfigError::UnsupportedCacheType`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheType::Memory),
            "storage" => Ok(CacheType::Storage),
            _ => Err(ConfigError::UnsupportedCacheType(s.trim().to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Directory providers
// ---------------------------------------------------------------------------

/// Supplies the writable base directory under which storage caches live.
///
/// Any `Fn() -> io::Result<PathBuf>` closure is a provider.
pub trait DirectoryProvider: Send + Sync {
    fn base_cache_dir(&self) -> io::Result<PathBuf>;
}

impl<F> DirectoryProvider for F
where
    F: Fn() -> io::Result<PathBuf> + Send + Sync,
{
    fn base_cache_dir(&self) -> io::Result<PathBuf> {
        self()
    }
}

/// Always returns the same directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedDirectory(PathBuf);

impl FixedDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }
}

impl DirectoryProvider for FixedDirectory {
    fn base_cache_dir(&self) -> io::Result<PathBuf> {
        Ok(self.0.clone())
    }
}

/// The platform temporary directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct TempDirectory;

impl DirectoryProvider for TempDirectory {
    fn base_cache_dir(&self) -> io::Result<PathBuf> {
        Ok(std::env::temp_dir())
    }
}

// ---------------------------------------------------------------------------
// CacheOptions
// ---------------------------------------------------------------------------

/// Selects a custom implementation registered with the factory and carries
/// the value handed to its constructor.
#[derive(Clone)]
pub struct CacheOptions {
    implementation: String,
    params: Arc<dyn Any + Send + Sync>,
    params_type: &'static str,
}

impl CacheOptions {
    /// Options for the implementation registered as `implementation`.
    pub fn new<O>(implementation: impl Into<String>, params: O) -> Self
    where
        O: Any + Send + Sync,
    {
        Self {
            implementation: implementation.into(),
            params: Arc::new(params),
            params_type: type_name::<O>(),
        }
    }

    /// Identifier of the requested implementation.
    pub fn implementation(&self) -> &str {
        &self.implementation
    }

    /// Constructor argument, if it is an `O`.
    pub fn params<O: Any>(&self) -> Option<&O> {
        self.params.downcast_ref::<O>()
    }

    pub fn params_type_name(&self) -> &'static str {
        self.params_type
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("implementation", &self.implementation)
            .field("params", &self.params_type)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// CacheBuilder
// ---------------------------------------------------------------------------

/// Declarative request for a cache of `String` keys and `T` values.
pub struct CacheBuilder<T> {
    cache_type: CacheType,
    directory_provider: Option<Arc<dyn DirectoryProvider>>,
    options: Option<CacheOptions>,
    capacity: Option<usize>,
    format: Option<SerializationFormat>,
    _element: PhantomData<fn() -> T>,
}

impl<T: Cacheable> CacheBuilder<T> {
    pub fn new(cache_type: CacheType) -> Self {
        Self {
            cache_type,
            directory_provider: None,
            options: None,
            capacity: None,
            format: None,
            _element: PhantomData,
        }
    }

    pub fn memory() -> Self {
        Self::new(CacheType::Memory)
    }

    pub fn storage(provider: impl DirectoryProvider + 'static) -> Self {
        Self::new(CacheType::Storage).with_directory_provider(provider)
    }

    pub fn with_directory_provider(mut self, provider: impl DirectoryProvider + 'static) -> Self {
        let provider: Arc<dyn DirectoryProvider> = Arc::new(provider);
        self.directory_provider = Some(provider);
        self
    }

    /// Requests a custom implementation. Takes priority over `cache_type`.
    pub fn with_options(mut self, options: CacheOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Overrides the factory's default capacity for built-in kinds.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Overrides the factory's default on-disk encoding.
    pub fn with_format(mut self, format: SerializationFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn cache_type(&self) -> CacheType {
        self.cache_type
    }

    pub fn directory_provider(&self) -> Option<&dyn DirectoryProvider> {
        self.directory_provider.as_deref()
    }

    pub fn options(&self) -> Option<&CacheOptions> {
        self.options.as_ref()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn format(&self) -> Option<SerializationFormat> {
        self.format
    }

    /// Identity of the element type.
    pub fn element_type(&self) -> Cow<'static, str> {
        T::type_key()
    }

    /// Shorthand for [`CacheFactory::build`].
    pub fn build(&self, factory: &CacheFactory) -> Result<Box<dyn Cache<String, T>>, ConfigError> {
        factory.build(self)
    }
}

impl<T> Clone for CacheBuilder<T> {
    fn clone(&self) -> Self {
        Self {
            cache_type: self.cache_type,
            directory_provider: self.directory_provider.clone(),
            options: self.options.clone(),
            capacity: self.capacity,
            format: self.format,
            _element: PhantomData,
        }
    }
}

impl<T> fmt::Debug for CacheBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("cache_type", &self.cache_type)
            .field("element_type", &type_name::<T>())
            .field("has_directory_provider", &self.directory_provider.is_some())
            .field("options", &self.options)
            .field("capacity", &self.capacity)
            .field("format", &self.format)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_type_parses_known_kinds() {
        assert_eq!("memory".parse::<CacheType>().unwrap(), CacheType::Memory);
        assert_eq!("STORAGE".parse::<CacheType>().unwrap(), CacheType::Storage);
        assert_eq!(CacheType::Storage.to_string(), "storage");
    }

    #[test]
    fn unknown_kind_is_not_yet_implemented() {
        let err = "network".parse::<CacheType>().unwrap_err();
        assert_eq!(err, ConfigError::UnsupportedCacheType("network".into()));
    }

    #[test]
    fn cache_type_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&CacheType::Memory).unwrap(), "\"memory\"");
        let parsed: CacheType = serde_json::from_str("\"storage\"").unwrap();
        assert_eq!(parsed, CacheType::Storage);
    }

    #[test]
    fn options_downcast_to_declared_type_only() {
        let options = CacheOptions::new("custom", 42u32);
        assert_eq!(options.implementation(), "custom");
        assert_eq!(options.params::<u32>(), Some(&42));
        assert_eq!(options.params::<u64>(), None);
        assert_eq!(options.params_type_name(), "u32");
    }

    #[test]
    fn closures_and_fixed_dirs_are_providers() {
        let closure = || -> io::Result<PathBuf> { Ok(PathBuf::from("/var/cache/app")) };
        assert_eq!(closure.base_cache_dir().unwrap(), PathBuf::from("/var/cache/app"));

        let fixed = FixedDirectory::new("/srv/cache");
        assert_eq!(fixed.base_cache_dir().unwrap(), PathBuf::from("/srv/cache"));
        assert!(TempDirectory.base_cache_dir().is_ok());
    }

    #[test]
    fn builder_records_overrides() {
        let builder = CacheBuilder::<String>::storage(TempDirectory)
            .with_capacity(7)
            .with_format(SerializationFormat::Json)
            .with_options(CacheOptions::new("x", ()));

        assert_eq!(builder.cache_type(), CacheType::Storage);
        assert!(builder.directory_provider().is_some());
        assert_eq!(builder.capacity(), Some(7));
        assert_eq!(builder.format(), Some(SerializationFormat::Json));
        assert_eq!(builder.options().map(|o| o.implementation()), Some("x"));
        assert_eq!(builder.element_type(), String::type_key());

        let copy = builder.clone();
        assert_eq!(copy.capacity(), Some(7));
    }
}
