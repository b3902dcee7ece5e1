//! # Disk-Persisted LRU Cache
//!
//! [`StorageLruCache<T>`] keeps a [`RecencyIndex`] of keys in memory and one
//! file per entry on disk. The file holds the raw bytes produced by the bound
//! [`Serializer`]. Keys too long to spell out in a file name also get a
//! small key file so the index can be rebuilt on open.
//!
//! ## Layout
//!
//! ```text
//!   <directory>/
//!   ├── 757365723a31.entry        ← "user:1", serialized value
//!   ├── 757365723a32.entry.tmp    ← in-flight write, renamed on success
//!   ├── sha256-9f86….entry        ← key longer than MAX_INLINE_KEY_LEN
//!   └── sha256-9f86….key          ← that key, UTF-8
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//!   open(options) ──► Ready ──► get / put / remove / evict_all ... ──► close() ──► Closed
//!        │                                                                          │
//!        ├─ create_dir_all                                   every operation ◄──────┘
//!        ├─ claim directory (in-process exclusive)           returns CacheError::Closed
//!        ├─ delete stray *.tmp
//!        └─ reconcile index from *.entry (oldest mtime = LRU)
//! ```
//!
//! ## PUT of a new key into a full cache
//!
//! ```text
//!   1. write <new>.entry.tmp, fsync     fails → Err, nothing changed
//!   2. rename over <new>.entry          fails → Err, nothing changed
//!   3. delete <lru>.entry               fails → <new>.entry removed, Err
//!   4. index: remove lru, insert new    (same critical section)
//! ```
//!
//! ## Failure Handling
//!
//! | Situation                          | Outcome                                       |
//! |------------------------------------|-----------------------------------------------|
//! | entry file missing / undecodable   | index entry dropped, `get` returns `Ok(None)` |
//! | encode failure in `put`            | `Err(Serialization)`, nothing changed         |
//! | write / delete failure             | `Err(Io)`, index still matches disk           |
//! | operation after `close`            | `Err(Closed)`                                 |
//!
//! ## Concurrency
//!
//! One `parking_lot::Mutex` covers the index and the file I/O of each
//! operation, which makes operations linearizable at the cost of serializing
//! disk access. Encoding happens outside the lock. The index never holds
//! more than `capacity` keys.
//!
//! ## Limitations
//!
//! - Exclusivity of the directory is enforced within the process only.
//! - With `reconcile` off, entry files from a previous run are neither
//!   indexed nor deleted and accumulate across restarts.
//! - Recency across restarts is approximated by file modification times,
//!   which `get` refreshes best-effort.

mod claim;
pub(crate) mod naming;

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, info, trace, warn};

use self::claim::DirectoryClaim;
use self::naming::ParsedEntry;
pub use self::naming::{type_directory_name, MAX_INLINE_KEY_LEN};
use crate::ds::RecencyIndex;
use crate::error::{CacheError, CacheResult, ConfigError};
use crate::serialization::Serializer;
use crate::traits::Cache;

/// Smallest capacity a storage cache accepts.
pub const MINIMAL_CAPACITY: usize = 1;

/// Capacity used by the factory for storage caches.
pub const DEFAULT_CAPACITY: usize = 256;

/// Construction parameters for [`StorageLruCache`].
pub struct StorageOptions<T> {
    /// Directory owned by the cache; created if missing.
    pub directory: PathBuf,
    /// Maximum number of entries.
    pub capacity: usize,
    /// Encodes values into entry files and back.
    pub serializer: Arc<dyn Serializer<T>>,
    /// Rebuild the index from entry files already in `directory`.
    ///
    /// When `false` the cache starts empty and files left by a previous run
    /// are orphaned: they are never indexed, evicted or deleted.
    pub reconcile: bool,
}

impl<T> StorageOptions<T> {
    /// Options with reconciliation on.
    pub fn new(
        directory: impl Into<PathBuf>,
        capacity: usize,
        serializer: Arc<dyn Serializer<T>>,
    ) -> Self {
        Self {
            directory: directory.into(),
            capacity,
            serializer,
            reconcile: true,
        }
    }

    /// Sets [`reconcile`](Self::reconcile).
    pub fn reconcile(mut self, reconcile: bool) -> Self {
        self.reconcile = reconcile;
        self
    }
}

impl<T> Clone for StorageOptions<T> {
    fn clone(&self) -> Self {
        Self {
            directory: self.directory.clone(),
            capacity: self.capacity,
            serializer: Arc::clone(&self.serializer),
            reconcile: self.reconcile,
        }
    }
}

impl<T> fmt::Debug for StorageOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageOptions")
            .field("directory", &self.directory)
            .field("capacity", &self.capacity)
            .field("format", &self.serializer.format_name())
            .field("reconcile", &self.reconcile)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
struct EntryMeta {
    bytes: u64,
}

/// Files backing one key.
struct EntryPaths {
    entry: PathBuf,
    key_file: Option<PathBuf>,
}

struct State {
    index: RecencyIndex<String, EntryMeta>,
    /// `None` once closed.
    claim: Option<DirectoryClaim>,
}

impl State {
    fn ensure_open(&self) -> CacheResult<()> {
        match self.claim {
            Some(_) => Ok(()),
            None => Err(CacheError::Closed),
        }
    }
}

/// Bounded LRU cache persisting each entry as a file.
///
/// # Example
///
/// ```
/// use carbonite::policy::storage::{StorageLruCache, StorageOptions};
/// use carbonite::serialization::JsonSerializer;
/// use carbonite::traits::Cache;
/// use std::sync::Arc;
///
/// let dir = tempfile::tempdir().unwrap();
/// let options = StorageOptions::new(dir.path(), 1, Arc::new(JsonSerializer::<String>::new()));
/// let cache = StorageLruCache::open(options).unwrap();
///
/// cache.put("x".to_string(), "first".to_string()).unwrap();
/// assert!(cache.entry_path("x").unwrap().exists());
///
/// assert_eq!(cache.put("y".to_string(), "second".to_string()).unwrap(), Some("x".to_string()));
/// assert!(!cache.entry_path("x").unwrap().exists());
/// assert_eq!(cache.get(&"x".to_string()).unwrap(), None);
/// ```
pub struct StorageLruCache<T> {
    directory: PathBuf,
    capacity: usize,
    serializer: Arc<dyn Serializer<T>>,
    state: Mutex<State>,
}

impl<T> StorageLruCache<T> {
    /// Opens a cache over `options.directory`, creating it if needed.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::CapacityBelowFloor`] if `capacity < MINIMAL_CAPACITY`.
    /// - [`ConfigError::DirectoryUnavailable`] if the directory cannot be
    ///   created or listed.
    /// - [`ConfigError::DirectoryInUse`] if another live cache in this
    ///   process owns the directory.
    pub fn open(options: StorageOptions<T>) -> Result<Self, ConfigError> {
        let StorageOptions {
            directory,
            capacity,
            serializer,
            reconcile,
        } = options;

        if capacity < MINIMAL_CAPACITY {
            return Err(ConfigError::CapacityBelowFloor {
                capacity,
                minimum: MINIMAL_CAPACITY,
            });
        }

        fs::create_dir_all(&directory).map_err(|e| {
            ConfigError::DirectoryUnavailable(format!("{}: {}", directory.display(), e))
        })?;
        let claim = DirectoryClaim::acquire(&directory)?;
        let directory = claim.path().to_path_buf();

        let mut index = RecencyIndex::with_capacity(capacity);
        let scan = scan_directory(&directory)?;
        if reconcile {
            for orphan in &scan.orphan_key_files {
                discard(orphan, "orphaned key file");
            }
            // `entries` is oldest first; anything beyond capacity goes.
            let excess = scan.entries.len().saturating_sub(capacity);
            for stale in &scan.entries[..excess] {
                discard(&stale.path, "entry over capacity");
                if let Some(key_file) = &stale.key_file {
                    discard(key_file, "key file over capacity");
                }
            }
            for entry in &scan.entries[excess..] {
                index.insert(entry.key.clone(), EntryMeta { bytes: entry.bytes });
            }
        }

        info!(
            directory = %directory.display(),
            capacity,
            format = serializer.format_name(),
            indexed = index.len(),
            found = scan.entries.len(),
            reconcile,
            "storage cache opened"
        );

        Ok(Self {
            directory,
            capacity,
            serializer,
            state: Mutex::new(State {
                index,
                claim: Some(claim),
            }),
        })
    }

    /// Canonical directory owned by this cache.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file backing `key`, whether or not it is cached.
    pub fn entry_path(&self, key: &str) -> CacheResult<PathBuf> {
        Ok(self.paths(key)?.entry)
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.state.lock().index.keys()
    }

    /// Total size in bytes of the indexed entry files.
    pub fn disk_usage(&self) -> u64 {
        self.state.lock().index.iter().map(|(_, meta)| meta.bytes).sum()
    }

    /// Releases the directory and empties the in-memory index.
    ///
    /// Entry files stay on disk for the next `open`. Every later operation
    /// returns [`CacheError::Closed`]. Closing twice is a no-op.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.claim.take().is_some() {
            state.index.clear();
            debug!(directory = %self.directory.display(), "storage cache closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().claim.is_none()
    }

    fn paths(&self, key: &str) -> CacheResult<EntryPaths> {
        let names = naming::entry_names(key)?;
        Ok(EntryPaths {
            entry: self.directory.join(names.entry),
            key_file: names.key_file.map(|name| self.directory.join(name)),
        })
    }

    /// Deletes the entry file of `key`; a missing file is fine.
    ///
    /// A key file left behind is only logged: the entry is already gone and
    /// the next reconcile removes it.
    fn delete_entry(&self, key: &str) -> CacheResult<()> {
        let paths = self.paths(key)?;
        remove_if_exists(&paths.entry).map_err(|e| CacheError::io(&paths.entry, e))?;
        if let Some(key_file) = &paths.key_file {
            discard(key_file, "key file of deleted entry");
        }
        Ok(())
    }

    /// Best-effort: lets a later `open` order entries by last use.
    fn refresh_mtime(path: &Path) {
        let touched = File::options()
            .append(true)
            .open(path)
            .and_then(|file| file.set_modified(SystemTime::now()));
        if let Err(e) = touched {
            trace!(path = %path.display(), error = %e, "could not refresh entry mtime");
        }
    }
}

impl<T> Cache<String, T> for StorageLruCache<T> {
    fn get(&self, key: &String) -> CacheResult<Option<T>> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        if !state.index.contains(key.as_str()) {
            return Ok(None);
        }

        let paths = self.paths(key)?;
        let decoded = fs::read(&paths.entry)
            .map_err(|e| e.to_string())
            .and_then(|bytes| self.serializer.decode(&bytes).map_err(|e| e.to_string()));

        match decoded {
            Ok(value) => {
                state.index.touch(key.as_str());
                Self::refresh_mtime(&paths.entry);
                Ok(Some(value))
            },
            Err(reason) => {
                warn!(
                    key = %key,
                    path = %paths.entry.display(),
                    reason = %reason,
                    "dropping unreadable cache entry"
                );
                state.index.remove(key.as_str());
                discard(&paths.entry, "unreadable entry");
                if let Some(key_file) = &paths.key_file {
                    discard(key_file, "key file of unreadable entry");
                }
                Ok(None)
            },
        }
    }

    fn put(&self, key: String, value: T) -> CacheResult<Option<String>> {
        let paths = self.paths(&key)?;
        let bytes = self.serializer.encode(&value)?;

        let mut state = self.state.lock();
        state.ensure_open()?;

        let is_new = !state.index.contains(key.as_str());
        let lru = if is_new && state.index.len() >= self.capacity {
            state.index.peek_lru().map(|(k, _)| k.clone())
        } else {
            None
        };

        // The new entry lands before anything is evicted.
        if let Some(key_file) = &paths.key_file {
            write_atomic(key_file, key.as_bytes())?;
        }
        if let Err(e) = write_atomic(&paths.entry, &bytes) {
            if let (true, Some(key_file)) = (is_new, &paths.key_file) {
                discard(key_file, "key file of failed write");
            }
            return Err(e);
        }

        let mut evicted = None;
        if let Some(lru) = lru {
            if let Err(e) = self.delete_entry(&lru) {
                warn!(key = %key, evicting = %lru, error = %e, "eviction failed, rolling back put");
                discard(&paths.entry, "rolled back entry");
                if let Some(key_file) = &paths.key_file {
                    discard(key_file, "rolled back key file");
                }
                return Err(e);
            }
            state.index.remove(lru.as_str());
            debug!(key = %lru, directory = %self.directory.display(), "evicted lru entry");
            evicted = Some(lru);
        }

        state.index.insert(
            key,
            EntryMeta {
                bytes: bytes.len() as u64,
            },
        );

        #[cfg(debug_assertions)]
        state.index.debug_validate_invariants();

        Ok(evicted)
    }

    fn remove(&self, key: &String) -> CacheResult<bool> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        if !state.index.contains(key.as_str()) {
            return Ok(false);
        }

        self.delete_entry(key)?;
        state.index.remove(key.as_str());
        Ok(true)
    }

    fn contains(&self, key: &String) -> bool {
        let state = self.state.lock();
        state.claim.is_some() && state.index.contains(key.as_str())
    }

    fn evict_all(&self) -> CacheResult<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;

        while let Some(lru) = state.index.peek_lru().map(|(k, _)| k.clone()) {
            self.delete_entry(&lru)?;
            state.index.remove(lru.as_str());
        }
        debug!(directory = %self.directory.display(), "evicted all entries");
        Ok(())
    }

    fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> fmt::Debug for StorageLruCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("StorageLruCache")
            .field("directory", &self.directory)
            .field("len", &state.index.len())
            .field("capacity", &self.capacity)
            .field("closed", &state.claim.is_none())
            .finish()
    }
}

struct FoundEntry {
    key: String,
    path: PathBuf,
    key_file: Option<PathBuf>,
    bytes: u64,
    modified: SystemTime,
}

struct Scan {
    /// Oldest first.
    entries: Vec<FoundEntry>,
    orphan_key_files: Vec<PathBuf>,
}

/// Lists entry files and deletes leftover temp files.
fn scan_directory(directory: &Path) -> Result<Scan, ConfigError> {
    let unavailable =
        |e: io::Error| ConfigError::DirectoryUnavailable(format!("{}: {}", directory.display(), e));

    let mut entries = Vec::new();
    let mut hashed = Vec::new();
    let mut key_files: FxHashMap<String, PathBuf> = FxHashMap::default();

    for dir_entry in fs::read_dir(directory).map_err(unavailable)? {
        let dir_entry = dir_entry.map_err(unavailable)?;
        let file_name = dir_entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };

        if naming::is_temp_file(name) {
            discard(&dir_entry.path(), "stray temp file");
            continue;
        }
        if let Some(stem) = naming::key_file_stem(name) {
            key_files.insert(stem.to_string(), dir_entry.path());
            continue;
        }

        let Some(parsed) = naming::parse_entry_name(name) else {
            continue;
        };
        let (bytes, modified) = match dir_entry.metadata() {
            Ok(meta) if meta.is_file() => {
                (meta.len(), meta.modified().unwrap_or(SystemTime::UNIX_EPOCH))
            },
            Ok(_) => continue,
            Err(e) => {
                warn!(file = name, error = %e, "skipping unreadable entry file");
                continue;
            },
        };
        let path = dir_entry.path();
        match parsed {
            ParsedEntry::Inline(key) => entries.push(FoundEntry {
                key,
                path,
                key_file: None,
                bytes,
                modified,
            }),
            ParsedEntry::Hashed { stem } => hashed.push((stem, path, bytes, modified)),
        }
    }

    for (stem, path, bytes, modified) in hashed {
        let Some(key_file) = key_files.remove(&stem) else {
            warn!(path = %path.display(), "entry has no key file, leaving it unindexed");
            continue;
        };
        match fs::read_to_string(&key_file) {
            Ok(key) if naming::key_matches_stem(&key, &stem) => entries.push(FoundEntry {
                key,
                path,
                key_file: Some(key_file),
                bytes,
                modified,
            }),
            Ok(_) => warn!(path = %key_file.display(), "key file does not match its entry"),
            Err(e) => warn!(path = %key_file.display(), error = %e, "unreadable key file"),
        }
    }

    entries.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.key.cmp(&b.key)));
    Ok(Scan {
        entries,
        orphan_key_files: key_files.into_values().collect(),
    })
}

/// Writes `bytes` to `<path>.tmp`, syncs it, then renames it over `path`.
///
/// On failure `path` is untouched and the temp file is removed.
fn write_atomic(path: &Path, bytes: &[u8]) -> CacheResult<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(naming::TEMP_EXTENSION);
    let tmp = PathBuf::from(tmp_name);

    let written = File::create(&tmp)
        .and_then(|mut file| file.write_all(bytes).and_then(|_| file.sync_data()))
        .and_then(|_| fs::rename(&tmp, path));

    written.map_err(|e| {
        discard(&tmp, "temp file");
        CacheError::io(path, e)
    })
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Best-effort delete; failures are logged.
fn discard(path: &Path, what: &'static str) {
    if let Err(e) = remove_if_exists(path) {
        warn!(path = %path.display(), error = %e, "failed to remove {what}");
    }
}
