//! Command implementations
//!
//! Every command renders its result to a `String`; `main` writes it to stdout.

use crate::cli::{Location, OutputFormat};
use diskmemo_cache::key::composite_key;
use diskmemo_cache::{CacheStore, EntryInfo, Error, KeyParts, digest};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Internal command representation, decoupled from clap
#[derive(Debug)]
pub enum Command {
    Key {
        name: String,
        args: Vec<String>,
        named: Vec<(String, String)>,
        method: bool,
        explicit: Option<String>,
    },
    Locate {
        key: String,
        location: Location,
    },
    List {
        location: Location,
    },
    Show {
        key: String,
        location: Location,
    },
}

impl From<crate::cli::Commands> for Command {
    fn from(cmd: crate::cli::Commands) -> Self {
        use crate::cli::Commands;
        match cmd {
            Commands::Key {
                name,
                args,
                named,
                method,
                explicit,
            } => Self::Key {
                name,
                args,
                named,
                method,
                explicit,
            },
            Commands::Locate { key, location } => Self::Locate { key, location },
            Commands::List { location } => Self::List { location },
            Commands::Show { key, location } => Self::Show { key, location },
        }
    }
}

impl Command {
    /// Short name used in spans
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Key { .. } => "key",
            Self::Locate { .. } => "locate",
            Self::List { .. } => "list",
            Self::Show { .. } => "show",
        }
    }
}

/// Run `command` against the cache rooted at `root` (ignored by `key`)
#[instrument(skip_all, fields(command = command.name()))]
pub fn execute(command: Command, root: &Path, format: OutputFormat) -> Result<String> {
    match command {
        Command::Key {
            name,
            args,
            named,
            method,
            explicit,
        } => {
            let report = match explicit {
                Some(explicit) => KeyReport::explicit(&name, &explicit),
                None => KeyReport::from_arguments(&name, &args, &named, method),
            };
            render(&report, format)
        }
        Command::Locate { key, location } => {
            let store = open(root, &location)?;
            let located = Located::new(&store, &key)?;
            render(&located, format)
        }
        Command::List { location } => {
            let store = open(root, &location)?;
            let entries = store.entries()?;
            debug!(count = entries.len(), dir = %store.dir().display(), "listed entries");
            render(&Listing(entries), format)
        }
        Command::Show { key, location } => {
            let store = open(root, &location)?;
            let path = entry_path(&store, &key)?;
            if !path.is_file() {
                return Err(miette::miette!("No cache entry at {}", path.display()));
            }
            let value: serde_json::Value = store.read(&path)?;
            serde_json::to_string_pretty(&value).into_diagnostic()
        }
    }
}

fn open(root: &Path, location: &Location) -> Result<CacheStore> {
    Ok(CacheStore::open(
        root,
        location.namespace.as_deref(),
        &location.extension,
    )?)
}

fn entry_path(store: &CacheStore, key: &str) -> Result<PathBuf> {
    if key.len() != 64 || !key.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::configuration(format!(
            "'{key}' is not an entry key; derive one with `diskmemo key`"
        ))
        .into());
    }
    Ok(store.resolve(&key.to_ascii_lowercase()))
}

trait Render: Serialize {
    fn text(&self) -> String;
}

fn render<T: Render>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(value.text()),
        OutputFormat::Json => serde_json::to_string_pretty(value).into_diagnostic(),
    }
}

#[derive(Debug, Serialize)]
struct KeyReport {
    name: String,
    composite: String,
    key: String,
}

impl KeyReport {
    fn from_arguments(
        name: &str,
        args: &[String],
        named: &[(String, String)],
        method: bool,
    ) -> Self {
        let parts = args
            .iter()
            .fold(KeyParts::new(), |parts, arg| parts.positional(arg));
        let parts = named
            .iter()
            .fold(parts, |parts, (key, value)| parts.named(key, value));
        let composite = composite_key(name, &parts, method);
        Self {
            name: name.to_string(),
            key: digest(&composite),
            composite,
        }
    }

    fn explicit(name: &str, explicit: &str) -> Self {
        Self {
            name: name.to_string(),
            composite: explicit.to_string(),
            key: digest(explicit),
        }
    }
}

impl Render for KeyReport {
    fn text(&self) -> String {
        self.key.clone()
    }
}

#[derive(Debug, Serialize)]
struct Located {
    namespace: String,
    key: String,
    path: PathBuf,
    exists: bool,
}

impl Located {
    fn new(store: &CacheStore, key: &str) -> Result<Self> {
        let path = entry_path(store, key)?;
        Ok(Self {
            namespace: store.namespace(),
            key: key.to_ascii_lowercase(),
            exists: path.is_file(),
            path,
        })
    }
}

impl Render for Located {
    fn text(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct Listing(Vec<EntryInfo>);

impl Render for Listing {
    fn text(&self) -> String {
        self.0
            .iter()
            .map(|entry| {
                let namespace = if entry.namespace.is_empty() {
                    "-"
                } else {
                    entry.namespace.as_str()
                };
                let modified = entry
                    .modified
                    .map_or_else(|| "-".to_string(), |m| m.to_rfc3339());
                format!("{namespace}\t{}\t{}\t{modified}", entry.key, entry.size)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diskmemo_cache::{derive_key, memoize};
    use std::fs;
    use tempfile::TempDir;

    fn location(namespace: Option<&str>) -> Location {
        Location {
            namespace: namespace.map(str::to_string),
            extension: "txt".to_string(),
        }
    }

    fn populate(root: &Path) -> String {
        let add = memoize("add")
            .cache_dir(root)
            .namespace("module")
            .plain(|(a, b): (i64, i64)| Ok::<_, Error>(a + b))
            .unwrap();
        add.call((2, 3)).unwrap();
        derive_key("add", &(2, 3), false)
    }

    #[test]
    fn key_matches_library_derivation() {
        let temp = TempDir::new().unwrap();
        let command = Command::Key {
            name: "add".to_string(),
            args: vec!["2".to_string(), "3".to_string()],
            named: Vec::new(),
            method: false,
            explicit: None,
        };
        let output = execute(command, temp.path(), OutputFormat::Text).unwrap();
        assert_eq!(output, derive_key("add", &(2, 3), false));
    }

    #[test]
    fn key_json_reports_composite() {
        let temp = TempDir::new().unwrap();
        let command = Command::Key {
            name: "sum".to_string(),
            args: vec!["self".to_string(), "1".to_string()],
            named: vec![("scale".to_string(), "2".to_string())],
            method: true,
            explicit: None,
        };
        let output = execute(command, temp.path(), OutputFormat::Json).unwrap();
        let report: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(report["composite"], "sum:1:scale=2");
        assert_eq!(report["key"], digest("sum:1:scale=2"));
    }

    #[test]
    fn explicit_key_is_digested() {
        let temp = TempDir::new().unwrap();
        let command = Command::Key {
            name: "feed".to_string(),
            args: Vec::new(),
            named: Vec::new(),
            method: false,
            explicit: Some("recommendations".to_string()),
        };
        let output = execute(command, temp.path(), OutputFormat::Text).unwrap();
        assert_eq!(output, digest("recommendations"));
    }

    #[test]
    fn locate_and_show_stored_entry() {
        let temp = TempDir::new().unwrap();
        let key = populate(temp.path());

        let located = execute(
            Command::Locate {
                key: key.clone(),
                location: location(Some("module")),
            },
            temp.path(),
            OutputFormat::Text,
        )
        .unwrap();
        assert_eq!(
            PathBuf::from(located),
            temp.path().join("module").join(format!("{key}.txt"))
        );

        let shown = execute(
            Command::Show {
                key,
                location: location(Some("module")),
            },
            temp.path(),
            OutputFormat::Text,
        )
        .unwrap();
        assert_eq!(shown, "5");
    }

    #[test]
    fn list_walks_nested_namespaces() {
        let temp = TempDir::new().unwrap();
        let key = populate(temp.path());

        let output = execute(
            Command::List {
                location: location(None),
            },
            temp.path(),
            OutputFormat::Json,
        )
        .unwrap();
        let entries: Vec<serde_json::Value> = serde_json::from_str(&output).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["namespace"], "module");
        assert_eq!(entries[0]["key"], key.as_str());

        let text = execute(
            Command::List {
                location: location(Some("module")),
            },
            temp.path(),
            OutputFormat::Text,
        )
        .unwrap();
        assert!(text.starts_with(&format!("module\t{key}\t1\t")));
    }

    #[test]
    fn show_reports_corrupt_entry() {
        let temp = TempDir::new().unwrap();
        let key = populate(temp.path());
        fs::write(temp.path().join("module").join(format!("{key}.txt")), "{{").unwrap();

        let err = execute(
            Command::Show {
                key,
                location: location(Some("module")),
            },
            temp.path(),
            OutputFormat::Text,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Corrupt cache entry"));
    }

    #[test]
    fn show_rejects_malformed_key() {
        let temp = TempDir::new().unwrap();
        let err = execute(
            Command::Show {
                key: "add".to_string(),
                location: location(None),
            },
            temp.path(),
            OutputFormat::Text,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not an entry key"));
    }
}
