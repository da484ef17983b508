//! CLI for inspecting and round-tripping WXR files
//!
//! Output is JSON on stdout; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use press_core::config::Config;
use press_core::domains::wxr::{export_wxr, import_wxr, parse_wxr};
use press_core::kernel::jobs::task_channel;
use press_core::kernel::{DisabledAI, HttpImageFetcher, MemoryStore, ServerDeps};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "wxr_tool")]
#[command(about = "Inspect and round-trip WordPress eXtended RSS files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print channel, item and comment counts
    Inspect { file: PathBuf },

    /// Import into an in-memory store and export it again
    Roundtrip { input: PathBuf, output: PathBuf },
}

#[derive(Serialize)]
struct InspectReport {
    title: String,
    origin: Option<String>,
    wxr_version: String,
    items: usize,
    attachments: usize,
    comments: usize,
    tagged_items: usize,
}

#[derive(Serialize)]
struct RoundtripReport<T: Serialize> {
    import: T,
    pending_tasks: usize,
    bytes_written: usize,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize report")?
    );
    Ok(())
}

fn read_file(path: &PathBuf) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn inspect(file: &PathBuf) -> Result<()> {
    let document = parse_wxr(&read_file(file)?)?;

    print_json(&InspectReport {
        title: document.channel.title.clone(),
        origin: document.origin_url().map(str::to_string),
        wxr_version: document.channel.wxr_version.clone(),
        items: document.items.len(),
        attachments: document.items.iter().filter(|i| i.is_attachment()).count(),
        comments: document.comment_count(),
        tagged_items: document
            .items
            .iter()
            .filter(|i| !i.tag_names().is_empty())
            .count(),
    })
}

async fn roundtrip(input: &PathBuf, output: &PathBuf) -> Result<()> {
    let config = Config::from_env()?;
    let store = Arc::new(MemoryStore::new());
    let (tasks, _wake) = task_channel(store.clone());
    let fetcher = Arc::new(HttpImageFetcher::from_config(&config)?);
    let deps = ServerDeps::new(store.clone(), Arc::new(DisabledAI), None, fetcher, tasks, config);

    let result = import_wxr(&read_file(input)?, &deps).await?;
    let bytes = export_wxr(&deps).await?;
    std::fs::write(output, &bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;

    print_json(&RoundtripReport {
        import: result,
        pending_tasks: deps.tasks.list_pending(usize::MAX).await?.len(),
        bytes_written: bytes.len(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,press_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { file } => inspect(&file),
        Commands::Roundtrip { input, output } => roundtrip(&input, &output).await,
    }
}
