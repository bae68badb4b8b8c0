//! Process-wide default cache root
//!
//! Bindings normally name their cache directory explicitly. When they do not,
//! the builder falls back to [`default_cache_dir`], which resolves once per
//! process and creates the directory if needed.

use crate::{Error, Result};
use dirs::{cache_dir, home_dir};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Environment variable overriding the default cache root
pub const CACHE_DIR_ENV: &str = "DISKMEMO_CACHE_DIR";

static DEFAULT_CACHE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Inputs for determining the default cache root
#[derive(Debug, Clone)]
struct CacheInputs {
    override_dir: Option<PathBuf>,
    xdg_cache_home: Option<PathBuf>,
    os_cache_dir: Option<PathBuf>,
    home_dir: Option<PathBuf>,
    temp_dir: PathBuf,
}

fn cache_root_from_inputs(inputs: CacheInputs) -> Result<PathBuf> {
    // Resolution order (first writable wins):
    // 1) DISKMEMO_CACHE_DIR (explicit override)
    // 2) XDG_CACHE_HOME/diskmemo
    // 3) OS cache dir/diskmemo
    // 4) ~/.diskmemo/cache
    // 5) TMPDIR/diskmemo/cache
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Some(dir) = inputs.override_dir.filter(|p| !p.as_os_str().is_empty()) {
        candidates.push(dir);
    }
    if let Some(xdg) = inputs.xdg_cache_home {
        candidates.push(xdg.join("diskmemo"));
    }
    if let Some(os_cache) = inputs.os_cache_dir {
        candidates.push(os_cache.join("diskmemo"));
    }
    if let Some(home) = inputs.home_dir {
        candidates.push(home.join(".diskmemo/cache"));
    }
    candidates.push(inputs.temp_dir.join("diskmemo/cache"));

    for path in candidates {
        if path.exists() {
            if is_writable(&path) {
                return Ok(path);
            }
            continue;
        }
        if std::fs::create_dir_all(&path).is_ok() {
            return Ok(path);
        }
    }
    Err(Error::configuration(
        "Failed to determine a writable cache directory",
    ))
}

// Some CI environments mount read-only cache directories under $HOME.
fn is_writable(dir: &Path) -> bool {
    tempfile::NamedTempFile::new_in(dir).is_ok()
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}

/// Resolve the default cache root from the environment, creating it if absent
pub fn resolve_cache_dir() -> Result<PathBuf> {
    let inputs = CacheInputs {
        override_dir: env_path(CACHE_DIR_ENV),
        xdg_cache_home: env_path("XDG_CACHE_HOME"),
        os_cache_dir: cache_dir(),
        home_dir: home_dir(),
        temp_dir: std::env::temp_dir(),
    };
    cache_root_from_inputs(inputs)
}

/// Install the process-wide default cache root.
///
/// The directory (and its parents) is created if missing. Only the first
/// successful call takes effect; later calls fail with a configuration error
/// naming the root already in use.
pub fn set_default_cache_dir(dir: impl Into<PathBuf>) -> Result<()> {
    if let Some(current) = DEFAULT_CACHE_DIR.get() {
        return Err(already_set(current));
    }
    let dir = dir.into();
    std::fs::create_dir_all(&dir).map_err(|e| Error::io(e, &dir, "create_dir_all"))?;
    DEFAULT_CACHE_DIR
        .set(dir)
        .map_err(|rejected| already_set(DEFAULT_CACHE_DIR.get().unwrap_or(&rejected)))
}

fn already_set(current: &Path) -> Error {
    Error::configuration(format!(
        "default cache directory already set to {}",
        current.display()
    ))
}

/// Process-wide default cache root, resolved on first use
pub fn default_cache_dir() -> Result<PathBuf> {
    if let Some(dir) = DEFAULT_CACHE_DIR.get() {
        return Ok(dir.clone());
    }
    let resolved = resolve_cache_dir()?;
    debug!(dir = %resolved.display(), "resolved default cache directory");
    Ok(DEFAULT_CACHE_DIR.get_or_init(|| resolved).clone())
}
