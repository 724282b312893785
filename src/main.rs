use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

use anyhow::{Context, bail};
use clap::Parser;
use colored::Colorize;
use expose_formatter::{Expose, ExposeFormatter, GptConfig, telemetry};
use serde_json::Value;
use tracing::{Level, info};
use tracing_subscriber::{Layer, filter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Summarise a real-estate expose with a GPT-style chat-completion API.
#[derive(Debug, Parser)]
#[command(name = "expose-gpt", version)]
struct Cli {
    /// Path to a JSON file holding one expose object, or `-` for stdin.
    #[arg(default_value = "-")]
    expose: PathBuf,

    /// Text to print when GPT formatting is disabled or fails.
    /// Defaults to a plain rendering of the expose.
    #[arg(long)]
    fallback: Option<String>,

    /// Only report whether GPT formatting is enabled.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file, if there is one.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Library events go through the crate-scoped layer; everything else through the plain one.
    tracing_subscriber::registry()
        .with(telemetry::env_filter_with_level("info", Level::WARN))
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_filter(filter::filter_fn(|meta| {
                    !meta.target().starts_with(telemetry::TARGET_PREFIX)
                })),
        )
        .with(telemetry::layer())
        .init();

    let cfg = GptConfig::from_env().context("failed to load GPT config")?;
    let formatter = ExposeFormatter::new(cfg)?;

    if cli.check {
        let state = if formatter.enabled() {
            "enabled".green()
        } else {
            "disabled".yellow()
        };
        println!("GPT formatting {state}");
        return Ok(());
    }

    let expose = read_expose(&cli.expose)?;
    let fallback = cli.fallback.unwrap_or_else(|| default_fallback(&expose));

    info!(
        enabled = formatter.enabled(),
        model = %formatter.config().model,
        keys = expose.len(),
        "formatting expose"
    );

    let text = formatter.format(&expose, &fallback).await?;

    let tag = if formatter.enabled() && text != fallback {
        "[gpt]".green()
    } else {
        "[fallback]".yellow()
    };
    eprintln!("{tag}");
    println!("{text}");

    Ok(())
}

/// Reads one expose object from `path` (`-` = stdin).
fn read_expose(path: &Path) -> anyhow::Result<Expose> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read expose from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read expose from {}", path.display()))?
    };

    match serde_json::from_str::<Value>(&raw).context("expose is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("expose must be a JSON object, got {}", json_kind(&other)),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Plain-text rendering of the usual listing fields, in a fixed order.
fn default_fallback(expose: &Expose) -> String {
    const FIELDS: [(&str, &str); 6] = [
        ("title", ""),
        ("price", "Price: "),
        ("rooms", "Rooms: "),
        ("size", "Size: "),
        ("address", "Address: "),
        ("url", ""),
    ];

    FIELDS
        .iter()
        .filter_map(|(key, label)| {
            let value = match expose.get(*key)? {
                Value::Null => return None,
                Value::String(s) if s.trim().is_empty() => return None,
                Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            };
            Some(format!("{label}{value}"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
