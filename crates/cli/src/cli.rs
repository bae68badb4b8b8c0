use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, Subcommand, ValueEnum};
use diskmemo_cache::settings::CACHE_DIR_ENV;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "diskmemo")]
#[command(about = "Inspect disk-backed memoization caches")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        long,
        global = true,
        env = CACHE_DIR_ENV,
        help = "Cache root directory (defaults to the per-user cache location)"
    )]
    pub cache_dir: Option<PathBuf>,

    #[arg(
        short = 'l',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    #[arg(
        long,
        global = true,
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,

    #[arg(long, global = true, help = "Output logs in JSON format")]
    pub json: bool,

    #[arg(
        long,
        global = true,
        value_name = "DIRECTIVES",
        help = "Tracing filter directives, overriding RUST_LOG and --level"
    )]
    pub log_filter: Option<String>,

    #[arg(
        long,
        global = true,
        help = "Command output format",
        default_value = "text",
        value_enum
    )]
    pub format: OutputFormat,
}

/// How command results are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text, one record per line
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Derive the entry key for a computation call")]
    Key {
        #[arg(help = "Computation name")]
        name: String,
        #[arg(help = "Positional arguments in their key text form")]
        args: Vec<String>,
        #[arg(
            long = "named",
            value_name = "NAME=VALUE",
            value_parser = parse_named,
            help = "Named argument, in call order"
        )]
        named: Vec<(String, String)>,
        #[arg(long, help = "Treat the first positional argument as a receiver")]
        method: bool,
        #[arg(long, conflicts_with_all = ["args", "named", "method"], help = "Fixed key shared by every call")]
        explicit: Option<String>,
    },
    #[command(about = "Print the entry path for a key")]
    Locate {
        #[arg(help = "Entry key (64 hex characters)")]
        key: String,
        #[command(flatten)]
        location: Location,
    },
    #[command(about = "List entries under a namespace")]
    List {
        #[command(flatten)]
        location: Location,
    },
    #[command(about = "Print a stored entry")]
    Show {
        #[arg(help = "Entry key (64 hex characters)")]
        key: String,
        #[command(flatten)]
        location: Location,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct Location {
    #[arg(long, short = 'n', help = "Dot-separated namespace")]
    pub namespace: Option<String>,
    #[arg(long, default_value = diskmemo_cache::store::DEFAULT_EXTENSION, help = "Entry file extension")]
    pub extension: String,
}

fn parse_named(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::try_parse_from(["diskmemo", "list"]).unwrap();

        assert_eq!(cli.level, LogLevel::Warn);
        assert_eq!(cli.log_format, TracingFormat::Compact);
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(!cli.json);
        assert!(cli.log_filter.is_none());
        match cli.command {
            Commands::List { location } => {
                assert!(location.namespace.is_none());
                assert_eq!(location.extension, "txt");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_log_level_parsing() {
        let cli = Cli::try_parse_from(["diskmemo", "--level", "info", "list"]).unwrap();
        assert_eq!(cli.level, LogLevel::Info);

        let cli = Cli::try_parse_from(["diskmemo", "list", "-l", "debug"]).unwrap();
        assert_eq!(cli.level, LogLevel::Debug);
    }

    #[test]
    fn test_key_command_arguments() {
        let cli = Cli::try_parse_from([
            "diskmemo", "key", "search", "rust", "--named", "limit=10", "--named", "page=2",
        ])
        .unwrap();
        match cli.command {
            Commands::Key {
                name,
                args,
                named,
                method,
                explicit,
            } => {
                assert_eq!(name, "search");
                assert_eq!(args, ["rust"]);
                assert_eq!(
                    named,
                    [
                        ("limit".to_string(), "10".to_string()),
                        ("page".to_string(), "2".to_string())
                    ]
                );
                assert!(!method);
                assert!(explicit.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_named_argument_is_rejected() {
        assert!(Cli::try_parse_from(["diskmemo", "key", "f", "--named", "novalue"]).is_err());
        assert!(Cli::try_parse_from(["diskmemo", "key", "f", "--named", "=1"]).is_err());
    }

    #[test]
    fn test_explicit_key_conflicts_with_arguments() {
        assert!(
            Cli::try_parse_from(["diskmemo", "key", "f", "1", "--explicit", "fixed"]).is_err()
        );
        assert!(Cli::try_parse_from(["diskmemo", "key", "f", "--explicit", "fixed"]).is_ok());
    }

    #[test]
    fn test_location_options() {
        let cli = Cli::try_parse_from([
            "diskmemo",
            "--cache-dir",
            "/tmp/cache",
            "show",
            "abc",
            "-n",
            "api.users",
            "--extension",
            "json",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/cache")));
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Show { key, location } => {
                assert_eq!(key, "abc");
                assert_eq!(location.namespace.as_deref(), Some("api.users"));
                assert_eq!(location.extension, "json");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_log_filter_is_global() {
        let cli = Cli::try_parse_from([
            "diskmemo",
            "list",
            "--log-filter",
            "diskmemo_cache=debug",
        ])
        .unwrap();
        assert_eq!(cli.log_filter.as_deref(), Some("diskmemo_cache=debug"));
    }
}
