//! nupkg CLI: inspect and maintain a local `.nupkg` package folder.

mod commands;
mod config;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::{LayoutKind, NupkgConfig, Overrides};
use nupkg_store::PackageCache;

#[derive(Parser)]
#[command(name = "nupkg", version, about = "Package folder layout and hashing for .nupkg archives")]
struct Cli {
    /// Packages root (overrides nupkg.toml)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    /// Keep the case of package ids and versions in paths
    #[arg(long, global = true)]
    no_lowercase: bool,
    /// Directory layout
    #[arg(long, global = true, value_enum)]
    layout: Option<LayoutKind>,
    /// Hash algorithm (SHA256 or SHA512)
    #[arg(long, global = true)]
    algorithm: Option<String>,
    /// Log at debug level unless RUST_LOG is set
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the digest of a package archive
    Hash {
        /// Archive to hash
        file: PathBuf,
        /// Print hex instead of base64
        #[arg(long)]
        hex: bool,
    },
    /// Show the cache paths of a package version
    Paths {
        /// Package id
        id: String,
        /// Package version
        version: String,
        /// Output format (text, json)
        #[arg(long)]
        format: Option<String>,
    },
    /// Install an archive into the cache and write its hash file
    Install {
        /// Package id
        id: String,
        /// Package version
        version: String,
        /// Path to the .nupkg archive
        nupkg: PathBuf,
        /// Manifest to store alongside the archive
        #[arg(long)]
        nuspec: Option<PathBuf>,
    },
    /// Check a cached archive against its hash file
    Verify {
        /// Package id
        id: String,
        /// Package version
        version: String,
    },
    /// Recompute the hash file of a cached archive
    Rehash {
        /// Package id
        id: String,
        /// Package version
        version: String,
    },
    /// List cached packages, or the versions of one package
    List {
        /// Package id
        id: Option<String>,
    },
    /// Remove a package version from the cache
    Remove {
        /// Package id
        id: String,
        /// Package version
        version: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => process::exit(2),
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(1);
        }
    }
}

/// Install the stderr log subscriber. `RUST_LOG` takes precedence.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Dispatch a command. `Ok(false)` signals an integrity mismatch.
fn run(cli: Cli) -> Result<bool> {
    let cwd = std::env::current_dir()?;
    let overrides = Overrides {
        root: cli.root,
        no_lowercase: cli.no_lowercase,
        layout: cli.layout,
        algorithm: cli.algorithm,
    };

    match cli.command {
        Commands::Hash { file, hex } => {
            let (config, _) = load_config(&cwd)?;
            commands::hash::run(&config.hash_provider(&overrides)?, &file, hex)?;
        }

        Commands::Paths {
            id,
            version,
            format,
        } => {
            let cache = open_cache(&cwd, &overrides)?;
            commands::paths::run(cache.resolver(), &id, &version, format.as_deref())?;
        }

        Commands::Install {
            id,
            version,
            nupkg,
            nuspec,
        } => {
            let cache = open_cache(&cwd, &overrides)?;
            commands::cache::install(&cache, &id, &version, &nupkg, nuspec.as_deref())?;
        }

        Commands::Verify { id, version } => {
            let cache = open_cache(&cwd, &overrides)?;
            return commands::cache::verify(&cache, &id, &version);
        }

        Commands::Rehash { id, version } => {
            let cache = open_cache(&cwd, &overrides)?;
            commands::cache::rehash(&cache, &id, &version)?;
        }

        Commands::List { id } => {
            let cache = open_cache(&cwd, &overrides)?;
            commands::cache::list(&cache, id.as_deref())?;
        }

        Commands::Remove { id, version } => {
            let cache = open_cache(&cwd, &overrides)?;
            commands::cache::remove(&cache, &id, &version)?;
        }
    }
    Ok(true)
}

/// Load `nupkg.toml` from the current directory upward, or defaults.
fn load_config(cwd: &Path) -> Result<(NupkgConfig, Option<PathBuf>)> {
    match NupkgConfig::find_and_load(cwd)? {
        Some((config, dir)) => Ok((config, Some(dir))),
        None => Ok((NupkgConfig::default(), None)),
    }
}

fn open_cache(cwd: &Path, overrides: &Overrides) -> Result<PackageCache> {
    let (config, config_dir) = load_config(cwd)?;
    config.build_cache(config_dir.as_deref(), overrides)
}
