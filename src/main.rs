mod api;
mod config;
mod monitor;
mod tree;
mod view;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use colored::Colorize;
use tracing::{info, info_span};
use tracing_subscriber::EnvFilter;

use api::{HnClient, Item, ItemFetch};
use monitor::{CommentMonitor, MonitorConfig};
use tree::{CommentNode, SortOrder, TreeBuilder};

/// hn-threads — terminal viewer for Hacker News comment threads. Fetches
/// the full tree with bounded fan-out, paginates it for display, and can
/// keep it live-updated in the background with new-comment notifications.
#[derive(Parser, Debug)]
#[command(name = "hn-threads", version, about)]
struct Cli {
    /// Id of the story, Ask HN, job, or poll whose thread to view
    item_id: u64,

    /// Page of comments to display (1-indexed)
    #[arg(short, long, default_value_t = 1)]
    page: usize,

    /// Comments per page
    #[arg(short = 's', long, default_value_t = 10)]
    page_size: usize,

    /// Sibling ordering at every level of the tree
    #[arg(long, value_enum, default_value_t = SortArg::Default)]
    sort: SortArg,

    /// Keep watching the thread, re-rendering when new comments arrive
    #[arg(short, long)]
    watch: bool,

    /// Seconds between background refreshes in watch mode (min 10)
    #[arg(long)]
    interval: Option<u64>,

    /// Max in-flight item fetches during a tree build
    #[arg(long)]
    concurrency: Option<usize>,

    /// Write the flattened thread as JSON to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Display width for comment wrapping
    #[arg(long, default_value_t = 80)]
    width: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortArg {
    /// Newest comments first
    Newest,
    /// Oldest comments first
    Oldest,
    /// The API's declared order
    Default,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Newest => SortOrder::NewestFirst,
            SortArg::Oldest => SortOrder::OldestFirst,
            SortArg::Default => SortOrder::Original,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let _main_span = info_span!("thread_view", item_id = cli.item_id).entered();

    info!("loading configuration");
    let config = config::Config::load()?;
    let concurrency = cli.concurrency.unwrap_or_else(|| config.concurrency());
    let interval = cli
        .interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.refresh_interval());

    let client: Arc<dyn ItemFetch> = Arc::new(HnClient::new(config.api_base()));

    if cli.watch {
        watch_thread(client, &cli, concurrency, interval).await
    } else {
        view_once(client, &cli, concurrency).await
    }
}

/// Fetch, render, and optionally export the thread, then exit.
async fn view_once(
    client: Arc<dyn ItemFetch>,
    cli: &Cli,
    concurrency: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("fetching item");
    let Some(subject) = client.fetch_item(cli.item_id).await else {
        return Err(format!("could not fetch item {}", cli.item_id).into());
    };

    info!(roots = subject.kids.len(), "building comment tree");
    let builder = TreeBuilder::new(Arc::clone(&client), concurrency);
    let progress = |pct: u8| {
        eprint!("\rFetching comments... {pct:>3}%");
        let _ = std::io::stderr().flush();
    };
    let built = builder.build_with(&subject.kids, Some(&progress), None).await;
    eprintln!();

    render_thread(&subject, &built, cli, cli.output.as_deref())?;
    Ok(())
}

/// Start the background monitor, render the initial tree, then poll the
/// snapshot and re-render whenever new comments have been discovered.
async fn watch_thread(
    client: Arc<dyn ItemFetch>,
    cli: &Cli,
    concurrency: usize,
    interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(interval_secs = interval.as_secs(), "starting live monitor");
    let monitor_config = MonitorConfig {
        interval,
        concurrency,
        on_new_comments: Some(Arc::new(|count| info!(count, "new comments discovered"))),
    };
    let monitor = CommentMonitor::start(Arc::clone(&client), cli.item_id, monitor_config).await;

    let snapshot = monitor.snapshot();
    let Some(subject) = snapshot.subject.clone() else {
        monitor.stop().await;
        return Err(format!("could not fetch item {}", cli.item_id).into());
    };
    render_thread(&subject, &snapshot.tree, cli, cli.output.as_deref())?;
    println!(
        "\n{}",
        "Watching for new comments. Press Ctrl-C to quit.".dimmed()
    );

    let poll = Duration::from_secs(2);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(poll) => {}
        }
        let snapshot = monitor.snapshot();
        if snapshot.pending_new > 0 {
            let notice = format!("{} new comment(s) in thread", snapshot.pending_new);
            println!("\n{}", notice.green().bold());
            if let Some(subject) = snapshot.subject.clone() {
                render_thread(&subject, &snapshot.tree, cli, None)?;
            }
            monitor.acknowledge();
        }
    }

    info!("stopping monitor");
    monitor.stop().await;
    Ok(())
}

/// Sort, flatten, export, and print the requested page of a built thread.
fn render_thread(
    subject: &Item,
    built: &[CommentNode],
    cli: &Cli,
    export: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    view::print_subject(subject);

    let sorted = tree::sort(built, cli.sort.into());
    let entries = tree::flatten(&sorted);

    if let Some(path) = export {
        view::export::write_json(&entries, path)?;
        info!(path = %path.display(), comments = entries.len(), "exported thread");
    }

    if entries.is_empty() {
        println!("\nThis item has no comments.");
        return Ok(());
    }

    let total = view::total_pages(entries.len(), cli.page_size)?;
    let current = cli.page.clamp(1, total);
    view::print_page_banner(current, total, entries.len(), cli.width);
    view::print_page(view::page(&entries, cli.page_size, current)?, cli.width);
    Ok(())
}
