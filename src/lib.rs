//! carbonite: pluggable key/value caches behind one factory.
//!
//! Two built-in backends share the [`Cache`](traits::Cache) contract:
//!
//! - [`MemoryLruCache`](policy::memory::MemoryLruCache): bounded in-process LRU.
//! - [`StorageLruCache`](policy::storage::StorageLruCache): bounded LRU that
//!   persists one serialized file per entry.
//!
//! A [`CacheFactory`](factory::CacheFactory) turns a
//! [`CacheBuilder`](builder::CacheBuilder) into either of them, or into a
//! caller-registered custom implementation.

pub mod builder;
pub mod config;
pub mod ds;
pub mod error;
pub mod factory;
pub mod policy;
pub mod prelude;
pub mod serialization;
pub mod traits;

pub use crate::builder::{CacheBuilder, CacheOptions, CacheType};
pub use crate::error::{CacheError, CacheResult, ConfigError};
pub use crate::factory::CacheFactory;
pub use crate::traits::{Cache, Cacheable};
