//! # Cache Factory
//!
//! [`CacheFactory`] turns a [`CacheBuilder<T>`] into a ready cache. It owns
//! the [`CacheDefaults`] and a registry of custom implementations.
//!
//! ## Resolution Order
//!
//! ```text
//!   build(builder)
//!     │
//!     ├─ builder.options() is Some ──► custom path (never falls through)
//!     │     ├─ id not registered             → UnknownImplementation
//!     │     ├─ registered for other T        → IncompatibleImplementation
//!     │     ├─ params are not the expected O → IncompatibleImplementation
//!     │     └─ constructor(params)           → Ok(cache) | IncompatibleImplementation
//!     │
//!     └─ default path, by builder.cache_type()
//!           ├─ Memory  → MemoryLruCache(capacity or defaults.memory_capacity)
//!           └─ Storage → StorageLruCache over
//!                        <base>/<storage_dir_name>/<type directory>
//! ```
//!
//! ## Custom Implementations
//!
//! Implementations are registered under a string id, once per element type.
//! Either implement [`CacheImplementation<T>`] and call
//! [`register`](CacheFactory::register), or hand a constructor closure to
//! [`register_fn`](CacheFactory::register_fn).
//!
//! ```
//! use carbonite::builder::{CacheBuilder, CacheOptions};
//! use carbonite::factory::CacheFactory;
//! use carbonite::policy::memory::{MemoryLruCache, MemoryOptions};
//!
//! let mut factory = CacheFactory::new();
//! factory.register::<String, MemoryLruCache<String, String>>("small-lru");
//!
//! let builder = CacheBuilder::<String>::memory()
//!     .with_options(CacheOptions::new("small-lru", MemoryOptions { capacity: 4 }));
//! let cache = factory.build(&builder).unwrap();
//! assert_eq!(cache.capacity(), 4);
//! ```

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::builder::{CacheBuilder, CacheOptions, CacheType, DirectoryProvider};
use crate::config::CacheDefaults;
use crate::error::ConfigError;
use crate::policy::memory::{MemoryLruCache, MemoryOptions};
use crate::policy::storage::{type_directory_name, StorageLruCache, StorageOptions};
use crate::traits::{Cache, Cacheable};

/// A cache type the factory can construct from an options value.
///
/// The factory only ever calls [`from_options`](Self::from_options) with a
/// value whose type is exactly [`Options`](Self::Options).
pub trait CacheImplementation<T>: Cache<String, T> + Sized + 'static {
    type Options: Any + Send + Sync;

    fn from_options(options: &Self::Options) -> Result<Self, ConfigError>;
}

impl<T> CacheImplementation<T> for MemoryLruCache<String, T>
where
    T: Clone + Send + 'static,
{
    type Options = MemoryOptions;

    fn from_options(options: &MemoryOptions) -> Result<Self, ConfigError> {
        MemoryLruCache::try_new(options.capacity)
    }
}

impl<T: 'static> CacheImplementation<T> for StorageLruCache<T> {
    type Options = StorageOptions<T>;

    fn from_options(options: &StorageOptions<T>) -> Result<Self, ConfigError> {
        StorageLruCache::open(options.clone())
    }
}

type Constructor<T> =
    Arc<dyn Fn(&CacheOptions) -> Result<Box<dyn Cache<String, T>>, ConfigError> + Send + Sync>;

struct Registration {
    element_type: &'static str,
    /// Always a `Constructor<T>` for the `TypeId` this is keyed by.
    constructor: Box<dyn Any + Send + Sync>,
}

/// Builds caches from [`CacheBuilder`] requests.
///
/// A factory is a plain value: create one per application (or per test) and
/// share it by reference. Registration needs `&mut self`; building only
/// needs `&self`.
#[derive(Default)]
pub struct CacheFactory {
    defaults: CacheDefaults,
    registry: FxHashMap<String, FxHashMap<TypeId, Registration>>,
}

impl CacheFactory {
    /// Factory with [`CacheDefaults::default`] and no custom implementations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory using `defaults`, which are validated first.
    pub fn with_defaults(defaults: CacheDefaults) -> Result<Self, ConfigError> {
        defaults.validate()?;
        Ok(Self {
            defaults,
            registry: FxHashMap::default(),
        })
    }

    pub fn defaults(&self) -> &CacheDefaults {
        &self.defaults
    }

    /// Registers `C` as the implementation named `id` for element type `T`.
    ///
    /// Registering the same `id` and `T` again replaces the earlier entry.
    pub fn register<T, C>(&mut self, id: impl Into<String>) -> &mut Self
    where
        T: 'static,
        C: CacheImplementation<T>,
    {
        self.register_fn::<T, C::Options, C, _>(id, C::from_options)
    }

    /// Registers a constructor closure as the implementation named `id` for
    /// element type `T`.
    ///
    /// The closure receives the builder's [`CacheOptions`] params downcast to
    /// `O`. Any error it returns is reported as
    /// [`ConfigError::IncompatibleImplementation`].
    pub fn register_fn<T, O, C, F>(&mut self, id: impl Into<String>, constructor: F) -> &mut Self
    where
        T: 'static,
        O: Any + Send + Sync,
        C: Cache<String, T> + 'static,
        F: Fn(&O) -> Result<C, ConfigError> + Send + Sync + 'static,
    {
        let id = id.into();
        let owned_id = id.clone();
        let erased: Constructor<T> = Arc::new(
            move |options: &CacheOptions| -> Result<Box<dyn Cache<String, T>>, ConfigError> {
                let params = options.params::<O>().ok_or_else(|| {
                    ConfigError::incompatible(
                        owned_id.as_str(),
                        format!(
                            "expected options of type {}, got {}",
                            type_name::<O>(),
                            options.params_type_name()
                        ),
                    )
                })?;
                let cache = constructor(params).map_err(|e| match e {
                    ConfigError::IncompatibleImplementation { .. } => e,
                    other => ConfigError::incompatible(owned_id.as_str(), other.to_string()),
                })?;
                Ok(Box::new(cache))
            },
        );

        debug!(
            id = %id,
            element_type = type_name::<T>(),
            implementation = type_name::<C>(),
            "registered cache implementation"
        );
        self.registry.entry(id).or_default().insert(
            TypeId::of::<T>(),
            Registration {
                element_type: type_name::<T>(),
                constructor: Box::new(erased),
            },
        );
        self
    }

    /// Whether an implementation named `id` exists for element type `T`.
    pub fn is_registered<T: 'static>(&self, id: &str) -> bool {
        self.registry
            .get(id)
            .is_some_and(|by_type| by_type.contains_key(&TypeId::of::<T>()))
    }

    /// Constructs the cache described by `builder`.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`]; see the module docs for which path yields which.
    pub fn build<T: Cacheable>(
        &self,
        builder: &CacheBuilder<T>,
    ) -> Result<Box<dyn Cache<String, T>>, ConfigError> {
        if let Some(options) = builder.options() {
            return self.build_custom(options);
        }

        match builder.cache_type() {
            CacheType::Memory => {
                let capacity = builder.capacity().unwrap_or(self.defaults.memory_capacity);
                let cache = MemoryLruCache::<String, T>::try_new(capacity)?;
                debug!(capacity, element_type = %T::type_key(), "built memory cache");
                Ok(Box::new(cache))
            },
            CacheType::Storage => {
                let provider = builder
                    .directory_provider()
                    .ok_or(ConfigError::MissingDirectoryProvider)?;
                let directory = self.storage_directory::<T>(provider)?;
                let format = builder.format().unwrap_or(self.defaults.format);
                let capacity = builder.capacity().unwrap_or(self.defaults.storage_capacity);

                let options = StorageOptions::new(directory, capacity, format.serializer_for::<T>())
                    .reconcile(self.defaults.reconcile_on_open);
                let cache = StorageLruCache::open(options)?;
                debug!(
                    directory = %cache.directory().display(),
                    capacity,
                    format = %format,
                    element_type = %T::type_key(),
                    "built storage cache"
                );
                Ok(Box::new(cache))
            },
        }
    }

    /// Directory a storage cache of `T` uses under `provider`.
    ///
    /// Equal for equal element types and distinct for distinct
    /// [`type_key`](Cacheable::type_key)s.
    pub fn storage_directory<T: Cacheable>(
        &self,
        provider: &dyn DirectoryProvider,
    ) -> Result<PathBuf, ConfigError> {
        let base = provider
            .base_cache_dir()
            .map_err(|e| ConfigError::DirectoryUnavailable(e.to_string()))?;
        if base.as_os_str().is_empty() {
            return Err(ConfigError::DirectoryUnavailable(
                "directory provider returned an empty path".to_string(),
            ));
        }
        Ok(base
            .join(&self.defaults.storage_dir_name)
            .join(type_directory_name(&T::type_key())))
    }

    fn build_custom<T: 'static>(
        &self,
        options: &CacheOptions,
    ) -> Result<Box<dyn Cache<String, T>>, ConfigError> {
        let id = options.implementation();
        let by_type = self
            .registry
            .get(id)
            .ok_or_else(|| ConfigError::UnknownImplementation(id.to_string()))?;

        let registration = by_type.get(&TypeId::of::<T>()).ok_or_else(|| {
            let mut registered: Vec<&str> = by_type.values().map(|r| r.element_type).collect();
            registered.sort_unstable();
            ConfigError::incompatible(
                id,
                format!(
                    "registered for element types [{}], not {}",
                    registered.join(", "),
                    type_name::<T>()
                ),
            )
        })?;

        let constructor = registration
            .constructor
            .downcast_ref::<Constructor<T>>()
            .ok_or_else(|| ConfigError::incompatible(id, "constructor has the wrong element type"))?;

        let cache = constructor(options)?;
        debug!(id, element_type = type_name::<T>(), "built custom cache");
        Ok(cache)
    }
}

impl fmt::Debug for CacheFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&str> = self.registry.keys().map(String::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("CacheFactory")
            .field("defaults", &self.defaults)
            .field("registered", &ids)
            .finish()
    }
}
