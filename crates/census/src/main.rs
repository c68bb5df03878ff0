//! census: command-line front end for a sidecar-indexed file root.
//!
//! Every command opens the root, builds its index and prints a JSON result
//! on stdout. Logs go to stderr (`RUST_LOG`, default `info`).

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fileset::{FileRecord, FileSet, FilesetConfig, FilterRequest, RecordChanges, TreeScope};
use serde::de::DeserializeOwned;
use serde::Serialize;

const ROOT_ENV: &str = "CENSUS_ROOT";

#[derive(Parser)]
#[command(name = "census")]
#[command(author, version, about = "Query and annotate files through their sidecar metadata")]
#[command(propagate_version = true)]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Managed root directory (overrides the config file and CENSUS_ROOT)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the root (or a subtree) and print the resulting index status
    Rebuild {
        /// Directory to index, as a `/`-separated path below the root
        #[arg(short, long, default_value = "")]
        base_path: String,

        /// Index only the base directory itself
        #[arg(long)]
        no_recursive: bool,
    },

    /// Print the records matching a filter request
    Query {
        /// Filter request JSON file (`-` for stdin)
        #[arg(short, long)]
        filter: PathBuf,
    },

    /// List the data files directly inside a directory
    List {
        /// Directory, as a `/`-separated path below the root
        #[arg(short, long, default_value = "")]
        base_path: String,
    },

    /// Create or replace the record for a file
    Create {
        /// Record JSON file (`-` for stdin)
        #[arg(long)]
        record: PathBuf,

        /// Origin tag added to the record
        #[arg(short, long, default_value = "")]
        origin: String,
    },

    /// Apply partial changes to every record matching a filter request
    Update {
        /// Filter request JSON file selecting the records
        #[arg(short, long)]
        filter: PathBuf,

        /// Partial record JSON file (`-` for stdin)
        #[arg(long)]
        changes: PathBuf,

        /// Acting user recorded as `changed_by`
        #[arg(short, long)]
        user: String,
    },

    /// Print index state and build counters
    Status,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(cli.config.as_deref(), cli.root)?;
    log::debug!(
        "census config root={} lock_timeout_ms={}",
        config.root.display(),
        config.lock_timeout_ms
    );

    match cli.command {
        Commands::Rebuild {
            base_path,
            no_recursive,
        } => {
            let scope = TreeScope::new(split_base_path(&base_path), !no_recursive);
            let fileset = open(&config.with_scope(scope))?;
            print_json(&fileset.status()?)
        }
        Commands::Query { filter } => {
            let request: FilterRequest = read_json(&filter)?;
            let fileset = open_for(&config, &request)?;
            let selection = fileset.query(&request).context("query failed")?;
            print_json(&selection)
        }
        Commands::List { base_path } => {
            let fileset = open(&config)?;
            let files = fileset
                .list_files(&split_base_path(&base_path))
                .context("listing failed")?;
            print_json(&files)
        }
        Commands::Create { record, origin } => {
            let record: FileRecord = read_json(&record)?;
            let fileset = open(&config)?;
            let created = fileset.create(record, &origin).context("create failed")?;
            print_json(&created)
        }
        Commands::Update {
            filter,
            changes,
            user,
        } => {
            let request: FilterRequest = read_json(&filter)?;
            let changes: RecordChanges = read_json(&changes)?;
            let fileset = open_for(&config, &request)?;
            let selection = fileset.query(&request).context("selection failed")?;
            let report = fileset
                .update(&changes, &user, &selection)
                .context("update failed")?;
            print_json(&report)?;
            if !report.is_complete() {
                bail!("{} of {} records not updated", report.failed.len(), selection.len());
            }
            Ok(())
        }
        Commands::Status => {
            let fileset = open(&config)?;
            print_json(&fileset.status()?)
        }
    }
}

/// Config file (or defaults), then `CENSUS_ROOT`, then `--root`.
fn resolve_config(config_path: Option<&Path>, root: Option<PathBuf>) -> Result<FilesetConfig> {
    let mut config = match config_path {
        Some(path) => FilesetConfig::load(path)?,
        None => FilesetConfig::default(),
    };
    if let Some(env_root) = std::env::var_os(ROOT_ENV) {
        config.root = PathBuf::from(env_root);
    }
    if let Some(root) = root {
        config.root = root;
    }
    if config.root.as_os_str().is_empty() {
        bail!("no root configured; pass --root, --config or set {ROOT_ENV}");
    }
    Ok(config)
}

fn open(config: &FilesetConfig) -> Result<FileSet> {
    FileSet::open(config)
        .with_context(|| format!("failed to open {}", config.root.display()))
}

/// Opens only the subtree the request's `base_path` and `recursive` cover.
fn open_for(config: &FilesetConfig, request: &FilterRequest) -> Result<FileSet> {
    FileSet::open_for(config, request)
        .with_context(|| format!("failed to open {}", config.root.display()))
}

fn split_base_path(raw: &str) -> Vec<String> {
    raw.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = if path == Path::new("-") {
        let mut data = String::new();
        std::io::stdin()
            .read_to_string(&mut data)
            .context("failed to read stdin")?;
        data
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    };
    serde_json::from_str(&data).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn base_path_splits_on_slashes() {
        assert_eq!(split_base_path(""), Vec::<String>::new());
        assert_eq!(split_base_path("a//b/"), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn root_flag_overrides_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("census.json");
        fs::write(&path, r#"{"root": "/from/file", "lock_timeout_ms": 10}"#).unwrap();

        let config = resolve_config(Some(&path), Some(PathBuf::from("/from/flag"))).unwrap();
        assert_eq!(config.root, PathBuf::from("/from/flag"));
        assert_eq!(config.lock_timeout_ms, 10);
    }

    #[test]
    fn rebuild_walks_requested_subtree() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("in/deep")).unwrap();
        let cli = Cli::try_parse_from([
            "census",
            "--root",
            temp.path().to_str().unwrap(),
            "rebuild",
            "--base-path",
            "in",
            "--no-recursive",
        ])
        .unwrap();
        run(cli).unwrap();

        let missing = Cli::try_parse_from([
            "census",
            "--root",
            temp.path().to_str().unwrap(),
            "rebuild",
            "--base-path",
            "nope",
        ])
        .unwrap();
        assert!(run(missing).is_err());
    }

    #[test]
    fn cli_parses_update() {
        let cli = Cli::try_parse_from([
            "census", "--root", "/data", "update", "--filter", "f.json", "--changes", "c.json",
            "--user", "ann",
        ])
        .unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/data")));
        assert!(matches!(cli.command, Commands::Update { ref user, .. } if user == "ann"));
    }
}
