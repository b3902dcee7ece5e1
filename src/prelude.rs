pub use crate::builder::{
    CacheBuilder, CacheOptions, CacheType, DirectoryProvider, FixedDirectory, TempDirectory,
};
pub use crate::config::CacheDefaults;
pub use crate::error::{CacheError, CacheResult, ConfigError};
pub use crate::factory::{CacheFactory, CacheImplementation};
pub use crate::policy::memory::{MemoryLruCache, MemoryOptions};
pub use crate::policy::storage::{StorageLruCache, StorageOptions};
pub use crate::serialization::{SerializationFormat, Serializer};
pub use crate::traits::{Cache, Cacheable};
