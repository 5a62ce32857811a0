use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use regex_lite::Regex;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bangumi_core::{
    load_config, validate_config, AlistClient, Aria2Client, Config, DownloadQueue, FeedScanner,
    FeedSource, HistoryStore, HttpTransport, RssFeedSource, SanitizedConfig, StorageSink,
    StoreError, SubscriptionStore, SubscriptionUpdate, Transport, UploadReclaimer,
};

#[derive(Parser)]
#[command(
    name = "bangumi",
    version,
    about = "RSS driven torrent acquisition and upload pipeline"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "BANGUMI_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Subscribe to a feed
    Add {
        /// Feed URL
        url: String,
        /// Subscription name (derived from the feed URL when omitted)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List subscriptions
    List,
    /// Delete a subscription by id or name
    Remove { identifier: String },
    /// Update a subscription by id or name
    Update {
        identifier: String,
        /// New name
        #[arg(short, long)]
        name: Option<String>,
        /// New feed URL (re-derives the feed identifiers)
        #[arg(short, long)]
        url: Option<String>,
        /// Enable the subscription
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        /// Disable the subscription
        #[arg(long)]
        disable: bool,
    },
    /// Check feeds and enqueue new items (the default)
    Run,
    /// Show the download engine's status for a task
    Status {
        /// Engine-assigned task id
        gid: String,
    },
    /// Upload finished downloads and reclaim disk space
    Upload,
    /// Print the effective configuration (secrets redacted)
    Config,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Add { url, name } => cmd_add(&config, &url, name.as_deref()).await,
        Command::List => cmd_list(&config).await,
        Command::Remove { identifier } => cmd_remove(&config, &identifier).await,
        Command::Update {
            identifier,
            name,
            url,
            enable,
            disable,
        } => {
            let enabled = match (enable, disable) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let update = SubscriptionUpdate { name, url, enabled };
            cmd_update(&config, &identifier, update).await
        }
        Command::Run => cmd_run(&config).await,
        Command::Status { gid } => cmd_status(&config, &gid).await,
        Command::Upload => cmd_upload(&config).await,
        Command::Config => {
            let sanitized = SanitizedConfig::from(&config);
            println!("{}", serde_json::to_string_pretty(&sanitized)?);
            Ok(())
        }
    }
}

async fn subscriptions(config: &Config) -> Result<SubscriptionStore> {
    SubscriptionStore::load(&config.scan.subscriptions_file)
        .await
        .context("Failed to load subscription store")
}

async fn cmd_add(config: &Config, url: &str, name: Option<&str>) -> Result<()> {
    let mut store = subscriptions(config).await?;
    match store.add(url, name).await {
        Ok(sub) => {
            println!("Added subscription #{}: {}", sub.id, sub.name);
            Ok(())
        }
        Err(StoreError::DuplicateUrl(_)) => {
            println!("A subscription for this feed already exists");
            Ok(())
        }
        Err(e) => Err(e).context("Failed to add subscription"),
    }
}

async fn cmd_list(config: &Config) -> Result<()> {
    let store = subscriptions(config).await?;
    if store.is_empty() {
        println!("No subscriptions; use `bangumi add <url>` to create one");
        return Ok(());
    }

    println!(
        "{:<4} {:<24} {:<9} {:<10} {:<10} ADDED",
        "ID", "NAME", "STATE", "BANGUMI", "SUBGROUP"
    );
    for sub in store.iter() {
        println!(
            "{:<4} {:<24} {:<9} {:<10} {:<10} {}",
            sub.id,
            sub.name,
            if sub.enabled { "enabled" } else { "disabled" },
            sub.bangumi_id,
            sub.subgroup_id,
            sub.added_at.format("%Y-%m-%d"),
        );
    }
    Ok(())
}

async fn cmd_remove(config: &Config, identifier: &str) -> Result<()> {
    let mut store = subscriptions(config).await?;
    match store.remove(identifier).await? {
        Some(sub) => println!("Removed subscription #{}: {}", sub.id, sub.name),
        None => println!("No subscription matches {identifier:?}"),
    }
    Ok(())
}

async fn cmd_update(config: &Config, identifier: &str, update: SubscriptionUpdate) -> Result<()> {
    let mut store = subscriptions(config).await?;
    match store.update(identifier, update).await? {
        Some(sub) => println!(
            "Updated subscription #{}: {} [{}]",
            sub.id,
            sub.name,
            if sub.enabled { "enabled" } else { "disabled" },
        ),
        None => println!("No subscription matches {identifier:?}"),
    }
    Ok(())
}

async fn cmd_run(config: &Config) -> Result<()> {
    let store = subscriptions(config).await?;
    let mut history = HistoryStore::load(&config.scan.history_file)
        .await
        .context("Failed to load history store")?;

    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(Duration::from_secs(
        config.scan.fetch_timeout_secs as u64,
    )));
    let feed: Arc<dyn FeedSource> = Arc::new(RssFeedSource::new(Arc::clone(&transport)));
    let queue: Arc<dyn DownloadQueue> = Arc::new(Aria2Client::new(config.aria2.clone()));
    info!(engine = queue.name(), "download queue ready");

    let filter = config
        .scan
        .filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("Invalid scan filter")?;

    let scanner = FeedScanner::new(
        feed,
        transport,
        queue,
        filter,
        config.scan.download_dir.clone(),
    );
    let report = scanner.run(&store, &mut history).await?;

    println!(
        "Checked {} subscription(s), enqueued {} new item(s)",
        report.subscriptions_checked,
        report.newly_enqueued.len(),
    );
    Ok(())
}

async fn cmd_status(config: &Config, gid: &str) -> Result<()> {
    let queue: Arc<dyn DownloadQueue> = Arc::new(Aria2Client::new(config.aria2.clone()));
    match queue.status(gid).await {
        Ok(Some(status)) => {
            println!("{} [{}]", status.gid, status.status);
            println!(
                "  {} / {} bytes",
                status.completed_length, status.total_length
            );
            for file in &status.files {
                println!("  {}", file.path);
            }
        }
        Ok(None) => println!("The engine no longer knows task {gid}"),
        Err(e) => println!("Could not query task {gid}: {e}"),
    }
    Ok(())
}

async fn cmd_upload(config: &Config) -> Result<()> {
    let queue: Arc<dyn DownloadQueue> = Arc::new(Aria2Client::new(config.aria2.clone()));
    let sink: Arc<dyn StorageSink> = Arc::new(AlistClient::new(config.alist.clone()));
    info!(sink = sink.name(), "storage sink ready");

    let reclaimer = UploadReclaimer::new(
        queue,
        sink,
        config.scan.download_dir.clone(),
        config.alist.remote_root.clone(),
    );
    let report = reclaimer.run().await;

    println!(
        "Reclaimed {} item(s), {} still downloading, {} failed",
        report.reclaimed.len(),
        report.skipped_in_flight.len(),
        report.failed.len(),
    );
    for (path, reason) in &report.failed {
        println!("  failed: {} ({reason})", path.display());
    }
    Ok(())
}
