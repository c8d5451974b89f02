use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use remote_keys::config::{default_config_path, ResolvedConfig};
use remote_keys::keystore::{with_remote_cluster_api_keys, ApiKeyStore, HasKeystore};
use remote_keys::models::{Elasticsearch, SecretSource};
use remote_keys::storage::JsonFileSecretClient;
use secrecy::{ExposeSecret, SecretString};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "remote-keys")]
#[command(about = "Manage remote cluster API keys of Elasticsearch clusters")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Namespace of the Elasticsearch cluster (overrides the config file)
    #[arg(short, long)]
    namespace: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List remote cluster aliases and their API key IDs
    Show {
        /// Elasticsearch cluster name
        es_name: String,
    },
    /// Record the API key of a remote cluster
    Set {
        es_name: String,
        alias: String,
        key_id: String,
        /// Encoded API key. Read from stdin when omitted.
        #[arg(long)]
        encoded: Option<String>,
    },
    /// Forget the API key of a remote cluster
    Remove { es_name: String, alias: String },
    /// Print the keystore sources of a cluster
    Sources {
        es_name: String,
        /// User-declared secure settings secret (repeatable)
        #[arg(long = "secure-setting")]
        secure_settings: Vec<String>,
    },
}

fn init_tracing(filter: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
}

fn read_encoded_key(encoded: Option<String>) -> Result<SecretString> {
    if let Some(encoded) = encoded {
        return Ok(SecretString::from(encoded));
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read encoded API key from stdin")?;
    let trimmed = buf.trim();
    if trimmed.is_empty() {
        anyhow::bail!("Encoded API key is empty");
    }
    Ok(SecretString::from(trimmed.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = ResolvedConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;
    init_tracing(&config.log.filter, config.log.json);

    let namespace = cli.namespace.unwrap_or(config.namespace);
    let client = JsonFileSecretClient::new(&config.data_dir);

    match cli.command {
        Command::Show { es_name } => {
            let es = Elasticsearch::from_identity(namespace, es_name);
            let store = ApiKeyStore::load(&client, &es).await?;
            if store.is_empty() {
                println!("No remote cluster API keys for {}/{}", es.namespace, es.name);
            }
            for (alias, key_id) in store.aliases() {
                println!("{alias}\t{key_id}");
            }
            for orphan in store.orphaned_credentials() {
                println!("{orphan}\t(no alias)");
            }
        }
        Command::Set {
            es_name,
            alias,
            key_id,
            encoded,
        } => {
            let es = Elasticsearch::from_identity(namespace, es_name);
            let encoded = read_encoded_key(encoded)?;
            let mut store = ApiKeyStore::load(&client, &es).await?;
            store.update(alias, key_id, encoded.expose_secret());
            store.save(&client, &es).await?;
        }
        Command::Remove { es_name, alias } => {
            let es = Elasticsearch::from_identity(namespace, es_name);
            let mut store = ApiKeyStore::load(&client, &es).await?;
            if store.key_id_for(&alias).is_empty() {
                tracing::warn!(alias = %alias, "Unknown remote cluster alias");
            }
            store.delete(&alias);
            store.save(&client, &es).await?;
        }
        Command::Sources {
            es_name,
            secure_settings,
        } => {
            let es = Elasticsearch::from_identity(namespace, es_name).with_secure_settings(
                secure_settings.into_iter().map(SecretSource::new).collect(),
            );
            let keystore = with_remote_cluster_api_keys(&client, &es).await?;
            for source in keystore.secure_settings() {
                println!("{}", source.secret_name);
            }
        }
    }

    Ok(())
}
