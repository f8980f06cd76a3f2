//! Admin commands - run against the configured storage root

use anyhow::{Context, bail};
use serde_json::{Value, json};
use tracing::info;

use crate::config::{AppConfig, StorageSettings};
use crate::domain::cache::{KeyParts, PreprocessingDescriptor, compute_key_hash, is_key_hash};
use crate::infrastructure::cache::CacheLocation;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::services::AnalysisCache;
use crate::infrastructure::storage::StorageFactory;

use super::{Cli, Command, HashArgs};

/// Entry point of the binary
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_logging(&config.logging);

    let output = execute(&cli, &config).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

/// Runs one command and returns its JSON report
pub async fn execute(cli: &Cli, config: &AppConfig) -> anyhow::Result<Value> {
    match &cli.command {
        Command::Hash(args) => hash_report(args).await,
        command => {
            let cache = open_cache(cli, config).await?;
            cache_command(&cache, command, cli, config).await
        }
    }
}

async fn cache_command(
    cache: &AnalysisCache<Value>,
    command: &Command,
    cli: &Cli,
    config: &AppConfig,
) -> anyhow::Result<Value> {
    let output = match command {
        Command::Stats => json!({
            "root": cache_root(cli, config),
            "options": cache.options(),
            "stats": cache.stats().await,
        }),
        Command::Clear => {
            cache.clear_all().await?;
            info!("Cache cleared");
            json!({ "cleared": true })
        }
        Command::Delete { hash } => {
            ensure_key_hash(hash)?;
            let deleted = cache.del_by_key_hash(hash).await?;
            json!({ "key": hash, "deleted": deleted })
        }
        Command::Show { hash } => {
            ensure_key_hash(hash)?;
            match cache.entry_by_key_hash(hash).await {
                Some(entry) => serde_json::to_value(entry)?,
                None => bail!("No cache entry for key {}", hash),
            }
        }
        Command::Warmup { top_k } => {
            let top_k = top_k.unwrap_or(config.cache.warmup_top_k);
            let loaded = cache.warmup(top_k).await;
            json!({ "requested": top_k, "loaded": loaded })
        }
        Command::Hash(args) => hash_report(args).await?,
    };

    Ok(output)
}

async fn hash_report(args: &HashArgs) -> anyhow::Result<Value> {
    let parts = key_parts(args).await?;

    Ok(json!({
        "keyHash": compute_key_hash(&parts),
        "canonical": parts.canonical(),
    }))
}

async fn open_cache(cli: &Cli, config: &AppConfig) -> anyhow::Result<AnalysisCache<Value>> {
    let storage = storage_settings(cli, config);
    let kv = StorageFactory::create(&storage.kv_config()?).await?;

    let mut location = CacheLocation::new(storage.root, kv, storage.key_prefix);

    if let Some(kind) = &cli.kind {
        location = location.scoped(kind);
    }

    // Loading entries into memory is pointless for a one-shot command
    AnalysisCache::builder(location)
        .options(config.cache.clone())
        .warmup_on_init(false)
        .init()
        .await
        .context("Failed to open analysis cache")
}

/// Storage settings with `--root` applied
///
/// An overridden root gets the index store beside it, never the configured one.
fn storage_settings(cli: &Cli, config: &AppConfig) -> StorageSettings {
    let mut storage = config.storage.clone();

    if let Some(root) = &cli.root {
        storage.root = root.clone();
        storage.kv_path = None;
    }

    storage
}

fn cache_root(cli: &Cli, config: &AppConfig) -> String {
    let root = storage_settings(cli, config).root;

    match &cli.kind {
        Some(kind) => root.join(kind).display().to_string(),
        None => root.display().to_string(),
    }
}

fn ensure_key_hash(hash: &str) -> anyhow::Result<()> {
    if !is_key_hash(hash) {
        bail!("Not a key hash: {} (expected 64 lowercase hex characters)", hash);
    }

    Ok(())
}

async fn key_parts(args: &HashArgs) -> anyhow::Result<KeyParts> {
    let prompt = match (&args.prompt, &args.prompt_file) {
        (Some(prompt), _) => prompt.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {}", path.display()))?,
        (None, None) => bail!("Either --prompt or --prompt-file is required"),
    };

    let mut parts = KeyParts::new(
        args.namespace.clone(),
        args.model.clone(),
        args.system_prompt_version.clone(),
        prompt,
    );

    if let (Some(max_tokens), Some(safety_margin), Some(tail_count)) =
        (args.max_tokens, args.safety_margin, args.tail_count)
    {
        parts = parts.with_preprocessing(PreprocessingDescriptor::new(
            max_tokens,
            safety_margin,
            tail_count,
        ));
    }

    Ok(parts)
}
