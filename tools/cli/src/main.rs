//! invest-storage CLI - select a storage provider by name and operate on it.
//!
//! The provider is chosen at startup from `--provider`, `STORAGE_PROVIDER`
//! or the config file, in that order of precedence.

use anyhow::{Context as _, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use invest_common::StorageKey;
use invest_storage::{create_default_registry, install_global, Context, ProviderRegistry, StorageOps};

#[derive(Parser)]
#[command(name = "invest-storage")]
#[command(about = "Inspect and use the configured invest storage provider")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// JSON file with storage settings.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage provider name, overriding config and environment.
    #[arg(short, long)]
    provider: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered storage providers.
    Providers,

    /// Resolve the configured provider and report it.
    Check,

    /// Store a file under a key.
    Put {
        /// Destination key.
        key: String,

        /// Source file.
        file: PathBuf,
    },

    /// Read the object stored under a key.
    Get {
        /// Key to read.
        key: String,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List stored objects.
    Ls {
        /// Only list keys below this prefix.
        prefix: Option<String>,
    },

    /// Remove the object stored under a key.
    Rm {
        /// Key to remove.
        key: String,
    },

    /// Print shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(
            shell,
            &mut Cli::command(),
            "invest-storage",
            &mut std::io::stdout(),
        );
        return Ok(());
    }

    let registry = install_global(create_default_registry()?)?;
    debug!("{} storage providers registered", registry.len());
    let context = load_context(cli.config.as_ref(), cli.provider)?;

    match cli.command {
        Commands::Providers => cmd_providers(registry, &context),
        Commands::Check => {
            open(registry, &context)?;
            Ok(())
        }
        Commands::Put { key, file } => cmd_put(&open(registry, &context)?, &key, &file).await,
        Commands::Get { key, output } => {
            cmd_get(&open(registry, &context)?, &key, output.as_ref()).await
        }
        Commands::Ls { prefix } => cmd_ls(&open(registry, &context)?, prefix.as_deref()).await,
        Commands::Rm { key } => cmd_rm(&open(registry, &context)?, &key).await,
        Commands::Completions { .. } => Ok(()),
    }
}

/// Build the startup context from file, environment and flags.
fn load_context(config: Option<&PathBuf>, provider: Option<String>) -> Result<Context> {
    let context = match config {
        Some(path) => Context::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?
            .with_env_overrides(),
        None => Context::from_env(),
    };

    Ok(match provider {
        Some(provider) => context.with_provider(provider),
        None => context,
    })
}

/// Resolve the configured provider, failing startup with a clear message.
fn open(registry: &ProviderRegistry, context: &Context) -> Result<Arc<dyn StorageOps>> {
    let storage = context
        .open_storage(registry)
        .context("Failed to open storage")?;
    info!("Using storage provider: {}", storage.name());
    Ok(storage)
}

fn parse_key(key: &str) -> Result<StorageKey> {
    StorageKey::parse(key).with_context(|| format!("Invalid key: {}", key))
}

/// List registered providers.
fn cmd_providers(registry: &ProviderRegistry, context: &Context) -> Result<()> {
    println!("Registered storage providers:");
    for (name, description) in registry.describe() {
        let marker = if name == context.storage_provider() {
            "*"
        } else {
            " "
        };
        println!("  {} {:<10} {}", marker, name, description);
    }

    Ok(())
}

/// Store a file.
async fn cmd_put(storage: &Arc<dyn StorageOps>, key: &str, file: &PathBuf) -> Result<()> {
    let key = parse_key(key)?;
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let info = storage.put(&key, data).await.context("Failed to store object")?;
    println!("Stored {} ({} bytes)", info.key, info.size);

    Ok(())
}

/// Read an object.
async fn cmd_get(
    storage: &Arc<dyn StorageOps>,
    key: &str,
    output: Option<&PathBuf>,
) -> Result<()> {
    let key = parse_key(key)?;
    let data = storage.get(&key).await.context("Failed to read object")?;

    match output {
        Some(path) => {
            tokio::fs::write(path, &data)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {} bytes to {}", data.len(), path.display());
        }
        None => {
            use std::io::Write;
            std::io::stdout()
                .write_all(&data)
                .context("Failed to write to stdout")?;
        }
    }

    Ok(())
}

/// List objects.
async fn cmd_ls(storage: &Arc<dyn StorageOps>, prefix: Option<&str>) -> Result<()> {
    let prefix = prefix.map(parse_key).transpose()?;
    let objects = storage
        .list(prefix.as_ref())
        .await
        .context("Failed to list objects")?;

    if objects.is_empty() {
        println!("No objects.");
    } else {
        for object in objects {
            println!(
                "  {:>10}  {}  {}",
                object.size,
                object.modified.format("%Y-%m-%d %H:%M:%S"),
                object.key
            );
        }
    }

    Ok(())
}

/// Remove an object.
async fn cmd_rm(storage: &Arc<dyn StorageOps>, key: &str) -> Result<()> {
    let key = parse_key(key)?;
    storage.delete(&key).await.context("Failed to remove object")?;
    println!("Removed {}", key);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use invest_storage::MemoryStorage;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses_provider_flag() {
        let cli = Cli::try_parse_from(["invest-storage", "-p", "local", "ls", "/quotes"]).unwrap();
        assert_eq!(cli.provider.as_deref(), Some("local"));
        assert!(matches!(cli.command, Commands::Ls { prefix: Some(ref p) } if p == "/quotes"));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_provider_flag_overrides_config() {
        let context = load_context(None, Some("local".to_string())).unwrap();
        assert_eq!(context.storage_provider(), "local");
    }

    #[tokio::test]
    async fn test_object_commands_round_trip() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("aapl.csv");
        let output = temp.path().join("out.csv");
        std::fs::write(&source, b"date,close\n2021-01-04,129.41\n").unwrap();

        let storage: Arc<dyn StorageOps> = Arc::new(MemoryStorage::new());
        let key = StorageKey::parse("/quotes/AAPL").unwrap();

        cmd_put(&storage, "/quotes/AAPL", &source).await.unwrap();
        assert_eq!(
            storage.get(&key).await.unwrap(),
            std::fs::read(&source).unwrap()
        );

        cmd_get(&storage, "/quotes/AAPL", Some(&output)).await.unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), std::fs::read(&source).unwrap());

        cmd_ls(&storage, Some("/quotes")).await.unwrap();

        cmd_rm(&storage, "/quotes/AAPL").await.unwrap();
        assert!(!storage.exists(&key).await.unwrap());
        assert!(cmd_rm(&storage, "/quotes/AAPL").await.is_err());
        assert!(cmd_get(&storage, "/quotes/AAPL", None).await.is_err());
    }

    #[tokio::test]
    async fn test_object_commands_reject_invalid_key() {
        let storage: Arc<dyn StorageOps> = Arc::new(MemoryStorage::new());
        assert!(cmd_rm(&storage, "/a/../b").await.is_err());
        assert!(cmd_ls(&storage, Some("/")).await.is_err());
    }
}
