//! On-disk entry storage
//!
//! # Layout
//!
//! ```text
//! <root>/<namespace-segment-1>/.../<namespace-segment-n>/<key>.<ext>
//! ```
//!
//! Entries are JSON documents written whole-file: the payload goes to a
//! temporary file in the target directory which is then renamed over the
//! entry path, so readers never observe a partially written entry.
//!
//! A payload is only written if it decodes back into the value type. Nested
//! options are the one lossy case this cannot catch: `Some(None)` and `None`
//! both encode as `null` and read back as `None`.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Default entry file extension
pub const DEFAULT_EXTENSION: &str = "txt";

/// Separator between namespace segments
pub const NAMESPACE_SEPARATOR: char = '.';

/// A listed cache entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    /// Dot-separated namespace relative to the cache root (empty at the root)
    pub namespace: String,
    /// Entry key (the filename stem)
    pub key: String,
    /// Absolute path of the entry file
    pub path: PathBuf,
    /// Payload size in bytes
    pub size: u64,
    /// Last modification time, when the platform reports one
    pub modified: Option<DateTime<Utc>>,
}

/// Namespaced directory of cache entries under a cache root
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    namespace: Vec<String>,
    dir: PathBuf,
    extension: String,
}

impl CacheStore {
    /// Open a store for `namespace` under an existing cache root.
    ///
    /// The root must already exist; namespace directories are created lazily
    /// on the first write.
    pub fn open(root: impl Into<PathBuf>, namespace: Option<&str>, extension: &str) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::configuration(format!(
                "Cache directory {} does not exist",
                root.display()
            )));
        }
        let extension = validate_extension(extension)?;
        let namespace = parse_namespace(namespace)?;
        let dir = namespace.iter().fold(root.clone(), |dir, seg| dir.join(seg));

        debug!(
            root = %root.display(),
            dir = %dir.display(),
            "opened cache store"
        );

        Ok(Self {
            root,
            namespace,
            dir,
            extension,
        })
    }

    /// Cache root this store lives under
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding this namespace's entries
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Namespace in dotted form (empty for the root namespace)
    #[must_use]
    pub fn namespace(&self) -> String {
        self.namespace.join(".")
    }

    /// Entry file extension
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Path of the entry stored under `key`
    #[must_use]
    pub fn resolve(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{}", self.extension))
    }

    /// Decode the entry at `path`
    pub fn read<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let bytes = fs::read(path).map_err(|e| Error::io(e, path, "read"))?;
        serde_json::from_slice(&bytes).map_err(|e| Error::corrupt_entry(path, e.to_string()))
    }

    /// Encode `value` and persist it at `path`, replacing any previous entry
    pub fn write<T: Serialize + DeserializeOwned>(&self, path: &Path, value: &T) -> Result<()> {
        self.write_as::<T, T>(path, value)
    }

    /// Encode `value` and persist it at `path`, to be read back later as `D`.
    ///
    /// Nothing is written when the encoded payload does not decode as `D`.
    /// JSON has no representation for non-finite floats and encodes them as
    /// `null`, so such values fail here with [`Error::Serialization`] instead of
    /// leaving an entry that can never be read.
    pub fn write_as<D, T>(&self, path: &Path, value: &T) -> Result<()>
    where
        D: DeserializeOwned,
        T: Serialize + ?Sized,
    {
        let bytes = encode::<D, T>(value)?;
        let parent = path.parent().ok_or_else(|| {
            Error::configuration(format!("entry path {} has no parent", path.display()))
        })?;
        ensure_dir(parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| Error::io(e, parent, "create_temp"))?;
        tmp.write_all(&bytes)
            .map_err(|e| Error::io(e, tmp.path(), "write"))?;
        tmp.persist(path)
            .map_err(|e| Error::io(e.error, path, "persist"))?;
        Ok(())
    }

    /// List every entry in this namespace and the namespaces nested below it
    pub fn entries(&self) -> Result<Vec<EntryInfo>> {
        let mut result = Vec::new();
        if !self.dir.exists() {
            return Ok(result);
        }

        for entry in walkdir::WalkDir::new(&self.dir).follow_links(false) {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf);
                let source = std::io::Error::from(e);
                match path {
                    Some(p) => Error::io(source, p, "walk"),
                    None => Error::io_no_path(source, "walk"),
                }
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(key) = entry_key(path, &self.extension) else {
                continue;
            };
            let meta = entry
                .metadata()
                .map_err(|e| Error::io(std::io::Error::from(e), path, "stat"))?;
            let namespace = path
                .parent()
                .and_then(|p| p.strip_prefix(&self.root).ok())
                .map(|rel| {
                    rel.components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect::<Vec<_>>()
                        .join(".")
                })
                .unwrap_or_default();

            result.push(EntryInfo {
                namespace,
                key,
                path: path.to_path_buf(),
                size: meta.len(),
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        result.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(result)
    }
}

/// Split a dotted namespace into directory segments
///
/// Empty segments are skipped. Segments that would escape the cache root or
/// address something other than a plain child directory are rejected.
pub fn parse_namespace(namespace: Option<&str>) -> Result<Vec<String>> {
    let Some(namespace) = namespace else {
        return Ok(Vec::new());
    };
    namespace
        .split(NAMESPACE_SEPARATOR)
        .filter(|seg| !seg.is_empty())
        .map(|seg| {
            let plain = !seg.contains(['/', '\\', '\0'])
                && matches!(
                    Path::new(seg).components().collect::<Vec<_>>().as_slice(),
                    [Component::Normal(_)]
                );
            if plain {
                Ok(seg.to_string())
            } else {
                Err(Error::configuration(format!(
                    "invalid namespace segment {seg:?} in {namespace:?}"
                )))
            }
        })
        .collect()
}

fn validate_extension(extension: &str) -> Result<String> {
    let extension = extension.trim_start_matches('.');
    if extension.is_empty() || extension.contains(['/', '\\', '\0']) {
        return Err(Error::configuration(format!(
            "invalid entry extension {extension:?}"
        )));
    }
    Ok(extension.to_string())
}

fn entry_key(path: &Path, extension: &str) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with('.') {
        return None;
    }
    name.strip_suffix(extension)?
        .strip_suffix('.')
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

fn encode<D, T>(value: &T) -> Result<Vec<u8>>
where
    D: DeserializeOwned,
    T: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec(value)
        .map_err(|e| Error::serialization(format!("Failed to serialize entry: {e}")))?;
    serde_json::from_slice::<D>(&bytes).map_err(|e| {
        Error::serialization(format!("Serialized entry does not decode back: {e}"))
    })?;
    Ok(bytes)
}

// create_dir_all already tolerates existing directories, but a concurrent
// creator can still surface AlreadyExists on some platforms.
fn ensure_dir(dir: &Path) -> Result<()> {
    match fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(Error::io(e, dir, "create_dir_all")),
    }
}
