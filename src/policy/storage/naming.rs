//! File and directory naming for storage caches.
//!
//! Keys up to [`MAX_INLINE_KEY_LEN`] bytes are stored as
//! `<hex(utf8 key)>.entry`. Hex keeps the mapping reversible (needed to
//! rebuild the index on open), collision-free, and safe on case-insensitive
//! file systems. Longer keys would overflow the file name limit, so they are
//! stored as `sha256-<hex(sha256(key))>.entry` next to a
//! `sha256-<...>.key` file holding the key itself.
//!
//! Type directories are a sanitized form of the type key plus a SHA-256
//! prefix of the unsanitized key, so two distinct type keys never share a
//! directory even when they sanitize to the same text.

use sha2::{Digest, Sha256};

use crate::error::{CacheError, CacheResult};

pub(crate) const ENTRY_EXTENSION: &str = ".entry";
pub(crate) const KEY_EXTENSION: &str = ".key";
pub(crate) const TEMP_EXTENSION: &str = ".tmp";

/// Longest key, in UTF-8 bytes, whose file name is the key itself in hex.
///
/// Twice this plus the extensions stays under the 255-byte file name limit
/// of common file systems. Longer keys get hashed names.
pub const MAX_INLINE_KEY_LEN: usize = 120;

const HASHED_PREFIX: &str = "sha256-";
const MAX_TYPE_PREFIX: usize = 64;
const TYPE_HASH_BYTES: usize = 8;

/// File names backing one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EntryNames {
    pub(crate) entry: String,
    /// Present for hashed names only.
    pub(crate) key_file: Option<String>,
}

pub(crate) fn entry_names(key: &str) -> CacheResult<EntryNames> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey {
            key: String::new(),
            reason: "key must not be empty",
        });
    }
    if key.len() <= MAX_INLINE_KEY_LEN {
        return Ok(EntryNames {
            entry: format!("{}{}", hex::encode(key), ENTRY_EXTENSION),
            key_file: None,
        });
    }
    let stem = hashed_stem(key);
    Ok(EntryNames {
        entry: format!("{stem}{ENTRY_EXTENSION}"),
        key_file: Some(format!("{stem}{KEY_EXTENSION}")),
    })
}

fn hashed_stem(key: &str) -> String {
    format!("{}{}", HASHED_PREFIX, hex::encode(Sha256::digest(key.as_bytes())))
}

/// An entry file name as found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ParsedEntry {
    /// The key decoded from the name.
    Inline(String),
    /// The key lives in `<stem>.key`.
    Hashed { stem: String },
}

/// Inverse of [`entry_names`]. Returns `None` for anything the cache did not
/// write, including non-canonical (uppercase) hex.
pub(crate) fn parse_entry_name(file_name: &str) -> Option<ParsedEntry> {
    let stem = file_name.strip_suffix(ENTRY_EXTENSION)?;
    if let Some(digest) = stem.strip_prefix(HASHED_PREFIX) {
        return is_lower_hex(digest, 64).then(|| ParsedEntry::Hashed {
            stem: stem.to_string(),
        });
    }

    let bytes = hex::decode(stem).ok()?;
    if bytes.is_empty() || bytes.len() > MAX_INLINE_KEY_LEN || hex::encode(&bytes) != stem {
        return None;
    }
    String::from_utf8(bytes).ok().map(ParsedEntry::Inline)
}

/// Checks that `key`, read from the key file of `stem`, really hashes to it.
pub(crate) fn key_matches_stem(key: &str, stem: &str) -> bool {
    key.len() > MAX_INLINE_KEY_LEN && hashed_stem(key) == stem
}

/// Stem of a key file name, if `file_name` is one.
pub(crate) fn key_file_stem(file_name: &str) -> Option<&str> {
    let stem = file_name.strip_suffix(KEY_EXTENSION)?;
    stem.starts_with(HASHED_PREFIX).then_some(stem)
}

pub(crate) fn key_file_name(stem: &str) -> String {
    format!("{stem}{KEY_EXTENSION}")
}

pub(crate) fn is_temp_file(file_name: &str) -> bool {
    file_name.ends_with(TEMP_EXTENSION)
}

fn is_lower_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Directory name for an element type key.
pub fn type_directory_name(type_key: &str) -> String {
    let mut readable: String = type_key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_TYPE_PREFIX)
        .collect();
    if readable.starts_with('.') {
        readable.replace_range(..1, "_");
    }

    let digest = Sha256::digest(type_key.as_bytes());
    format!("{}-{}", readable, hex::encode(&digest[..TYPE_HASH_BYTES]))
}
