use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use fanout_engine::{ExecutionContext, FieldCatalog, check_declared_shape, merge, validate};
use fanout_registry::{FanoutConfig, load_config, load_config_from_path};
use fanout_types::{DeclaredShape, MergePolicy};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Resolve multi-source GraphQL fields against their upstream targets.
#[derive(Parser, Debug)]
#[command(name = "fanout", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate the field configuration
    Check {
        /// Configuration file; defaults to $FANOUT_CONFIG_PATH or the user config dir
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Resolve one field over HTTP and print the merged JSON
    Resolve {
        /// Configured field name
        field: String,

        /// Target to call; repeat to fan out
        #[arg(long = "source", value_name = "NAME")]
        sources: Vec<String>,

        /// Field argument used in path templates, query or body
        #[arg(long = "arg", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        arguments: Vec<(String, Value)>,

        /// Deadline for the whole fan-out
        #[arg(long)]
        timeout_ms: Option<u64>,

        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate and merge local JSON payload files in argument order
    Merge {
        /// Declared output shape: collection, composite or scalar
        #[arg(long)]
        shape: DeclaredShape,

        /// Record field identifying the same item across payloads
        #[arg(long, default_value = "id")]
        dedupe_key: String,

        /// Keep the first occurrence instead of the latest
        #[arg(long)]
        keep_first: bool,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// CLI entry point
#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    match Args::parse().command {
        Command::Check { config } => run_check(config),
        Command::Resolve {
            field,
            sources,
            arguments,
            timeout_ms,
            config,
        } => run_resolve(field, sources, arguments, timeout_ms, config).await,
        Command::Merge {
            shape,
            dedupe_key,
            keep_first,
            files,
        } => run_merge(shape, dedupe_key, keep_first, files),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load(config: Option<PathBuf>) -> Result<FanoutConfig> {
    match config {
        Some(path) => load_config_from_path(&path),
        None => load_config(),
    }
}

fn run_check(config: Option<PathBuf>) -> Result<()> {
    let config = load(config)?;
    if config.fields.is_empty() {
        println!("No fields configured");
        return Ok(());
    }
    for (name, field) in &config.fields {
        println!("{name} ({}) {} {}", field.shape, field.method, field.path);
        for (index, target) in field.targets.iter().enumerate() {
            let marker = if index == 0 { " (default)" } else { "" };
            println!("  {target}{marker}");
        }
    }
    Ok(())
}

async fn run_resolve(
    field: String,
    sources: Vec<String>,
    arguments: Vec<(String, Value)>,
    timeout_ms: Option<u64>,
    config: Option<PathBuf>,
) -> Result<()> {
    let config = load(config)?;
    let catalog = FieldCatalog::from_config(&config)?;

    let selector = match sources.as_slice() {
        [] => None,
        [only] => Some(Value::String(only.clone())),
        _ => Some(Value::Array(sources.into_iter().map(Value::String).collect())),
    };

    let cancellation = CancellationToken::new();
    let mut context = ExecutionContext::new()
        .with_cancellation(cancellation.clone())
        .with_arguments(arguments.into_iter().collect::<Map<String, Value>>());
    if let Some(ms) = timeout_ms {
        context = context.with_timeout(Duration::from_millis(ms));
    }

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling dispatch");
            cancellation.cancel();
        }
    });

    let result = catalog.resolve(&field, selector.as_ref(), &context).await;
    interrupt.abort();

    let value = result?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn run_merge(shape: DeclaredShape, dedupe_key: String, keep_first: bool, files: Vec<PathBuf>) -> Result<()> {
    let policy = MergePolicy::default()
        .with_dedupe_key(dedupe_key)
        .with_prefer_latest(!keep_first);
    if policy.dedupe_key.trim().is_empty() {
        bail!("--dedupe-key must not be empty");
    }

    let mut values = Vec::with_capacity(files.len());
    for file in &files {
        let content = fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?;
        let value: Value = serde_json::from_str(&content).with_context(|| format!("parse {}", file.display()))?;
        values.push(value);
    }

    let payloads = validate(values)?;
    check_declared_shape(&payloads, shape)?;
    let merged = merge(&payloads, shape, &policy);
    info!(payload_count = payloads.len(), shape = %shape, "offline merge completed");
    println!("{}", serde_json::to_string_pretty(&merged)?);
    Ok(())
}

/// Parse `KEY=VALUE`; the value is read as JSON when it parses, else as a string.
fn parse_key_value(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
