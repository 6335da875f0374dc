use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing::info;

use bookmark_auto_sort::browsers::{self, BrowserType};
use bookmark_auto_sort::indicator::{LogIndicator, SpinnerIndicator};
use bookmark_auto_sort::messages::{MessageBus, RuntimeMessage};
use bookmark_auto_sort::options::{CompareBy, FolderPlacement, JsonOptionsStore, OptionsStore, SortOrder};
use bookmark_auto_sort::orchestrator::{SortOrchestrator, SortOutcome, SortPlan};
use bookmark_auto_sort::scheduler::{self, SchedulerConfig};
use bookmark_auto_sort::store::{BookmarkStore, ChromiumBookmarkFile};
use bookmark_auto_sort::triggers::{Trigger, TriggerLayer};
use bookmark_auto_sort::watcher::{watch_file, FileFingerprint};

#[derive(Parser)]
#[command(name = "bookmark-auto-sort")]
#[command(about = "Keeps browser bookmarks sorted by title, URL or service", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreArgs {
    /// Path to a Chromium `Bookmarks` file (overrides --browser/--profile)
    #[arg(short = 'f', long)]
    file: Option<String>,

    /// Browser whose bookmarks to sort: chrome, chromium, brave, brave-nightly, edge, vivaldi
    #[arg(short = 'b', long, default_value = "chrome")]
    browser: String,

    /// Browser profile directory name
    #[arg(short = 'p', long, default_value = "Default")]
    profile: String,

    /// Options file (default: ~/.config/bookmark-auto-sort/options.json)
    #[arg(short = 'o', long)]
    options: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sort bookmarks once
    Sort {
        #[command(flatten)]
        store: StoreArgs,

        /// Dry run - show the moves without changing the file
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Keep bookmarks sorted while they change
    Watch {
        #[command(flatten)]
        store: StoreArgs,

        /// How long "Done" stays up before the resting status, in milliseconds
        #[arg(long, default_value_t = 1000)]
        indicator_delay_ms: u64,

        /// Cron expression for periodic sorting (e.g. "0 */30 * * * *")
        #[arg(short, long)]
        cron: Option<String>,
    },

    /// Show or change sorting options
    Options {
        /// Options file (default: ~/.config/bookmark-auto-sort/options.json)
        #[arg(short = 'o', long)]
        options: Option<String>,

        #[command(subcommand)]
        action: OptionsAction,
    },

    /// List detected browsers and their bookmark files
    List,
}

#[derive(Subcommand)]
enum OptionsAction {
    /// Print the effective options
    Show,

    /// Change options and save them
    Set {
        /// Sort automatically when bookmarks change
        #[arg(long)]
        auto: Option<bool>,

        /// asc or desc
        #[arg(long)]
        order: Option<String>,

        /// title, url or url_simple
        #[arg(long)]
        compare_by: Option<String>,

        /// top or bottom
        #[arg(long)]
        folder_placement: Option<String>,

        /// Folder ids whose direct children keep their order (comma-separated, "" for none)
        #[arg(long)]
        ignore: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sort { store, dry_run } => {
            let path = resolve_bookmarks(&store)?;
            info!("📖 Sorting bookmarks in {:?}", path);

            let bookmarks = Arc::new(ChromiumBookmarkFile::open(&path)?);
            let options = Arc::new(JsonOptionsStore::new(resolve_options(store.options.as_deref())?));

            if dry_run {
                let orchestrator = SortOrchestrator::new(bookmarks, options, Arc::new(LogIndicator));
                let plan = orchestrator.plan().await?;
                info!("🏃 Dry run mode - no changes will be made");
                print_plan(&plan);
                return Ok(());
            }

            let orchestrator = SortOrchestrator::new(bookmarks, options, Arc::new(SpinnerIndicator::new()));
            match orchestrator.sort_bookmarks().await? {
                SortOutcome::Completed(report) => {
                    info!("✅ Sorted {} bookmarks with {} moves", report.bookmarks, report.moves_applied);
                }
                SortOutcome::Skipped => info!("⏭️  Another sort is already running"),
            }
        }

        Commands::Watch { store, indicator_delay_ms, cron } => {
            let path = resolve_bookmarks(&store)?;
            let options_path = resolve_options(store.options.as_deref())?;
            let indicator_delay = Duration::from_millis(indicator_delay_ms);
            watch(path, options_path, indicator_delay, cron).await?;
        }

        Commands::Options { options, action } => {
            let store = JsonOptionsStore::new(resolve_options(options.as_deref())?).with_bus(MessageBus::new());
            let mut current = store.read_options().await;

            if let OptionsAction::Set { auto, order, compare_by, folder_placement, ignore } = action {
                if let Some(auto) = auto {
                    current.auto = auto;
                }
                if let Some(order) = order {
                    current.order = parse_order(&order);
                }
                if let Some(compare_by) = compare_by {
                    current.compare_by = parse_compare_by(&compare_by);
                }
                if let Some(placement) = folder_placement {
                    current.folder_placement = parse_placement(&placement);
                }
                if let Some(ignore) = ignore {
                    current.folder_ignore = ignore
                        .split(',')
                        .map(str::trim)
                        .filter(|id| !id.is_empty())
                        .map(str::to_string)
                        .collect();
                }

                store.write_options(&current).await?;
                info!("✅ Options saved to {:?}", store.path());
            }

            println!("{}", serde_json::to_string_pretty(&current)?);
        }

        Commands::List => {
            info!("📋 Listing detected browsers...");
            let detected = browsers::detect_all()?;

            println!("\n🌐 Detected Browsers:");
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            for browser in BrowserType::all() {
                let profiles: Vec<_> = detected.iter().filter(|p| p.browser == *browser).collect();
                if profiles.is_empty() {
                    println!("  ❌ {} (not detected)", browser.name());
                    continue;
                }
                println!("  ✅ {}", browser.name());
                for profile in profiles {
                    println!("     {}: {:?}", profile.profile, profile.bookmarks);
                }
            }
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        }
    }

    Ok(())
}

async fn watch(
    path: PathBuf,
    options_path: PathBuf,
    indicator_delay: Duration,
    cron: Option<String>,
) -> Result<()> {
    let bus = MessageBus::new();
    let bookmarks = Arc::new(ChromiumBookmarkFile::open(&path)?);
    let options = Arc::new(JsonOptionsStore::new(&options_path).with_bus(bus.clone()));
    let orchestrator = Arc::new(
        SortOrchestrator::new(bookmarks.clone(), options, Arc::new(LogIndicator)).with_indicator_delay(indicator_delay),
    );
    let layer = Arc::new(TriggerLayer::new(orchestrator));

    let (requests_tx, requests_rx) = mpsc::channel(16);

    // Saves made by another process show up as options-file changes.
    if let Some(dir) = options_path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("Cannot create {:?}", dir))?;
    }
    let options_watch = watch_file(Arc::new(FileFingerprint::new(&options_path)), {
        let bus = bus.clone();
        move || bus.publish(RuntimeMessage::Saved)
    })
    .context("Cannot watch options file")?;
    let bookmarks_watch = bookmarks.watch()?;

    let mut cron_scheduler = match cron {
        Some(expr) => Some(scheduler::start_scheduler(SchedulerConfig::new(expr), requests_tx.clone()).await?),
        None => None,
    };

    let stdin_requests = requests_tx.clone();
    let stdin_task = tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            if stdin_requests.send(Trigger::UserAction).await.is_err() {
                break;
            }
        }
    });

    let runner = tokio::spawn(layer.run(bookmarks.subscribe(), bus.subscribe(), requests_rx));
    info!("⏎  Press Enter to sort now, Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    info!("🛑 Shutting down...");

    if let Some(scheduler) = cron_scheduler.as_mut() {
        scheduler.shutdown().await?;
    }
    stdin_task.abort();
    options_watch.abort();
    bookmarks_watch.abort();
    runner.abort();
    Ok(())
}

fn resolve_bookmarks(args: &StoreArgs) -> Result<PathBuf> {
    if let Some(file) = &args.file {
        return Ok(PathBuf::from(file));
    }

    let Some(browser) = BrowserType::parse(&args.browser) else {
        eprintln!("❌ Unknown browser: {}. Use chrome, chromium, brave, brave-nightly, edge or vivaldi", args.browser);
        std::process::exit(1);
    };
    browsers::locate_bookmarks(browser, &args.profile)
}

fn resolve_options(path: Option<&str>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(PathBuf::from(path)),
        None => JsonOptionsStore::default_path().context("Cannot determine options file location"),
    }
}

fn parse_order(value: &str) -> SortOrder {
    match value.to_lowercase().as_str() {
        "asc" => SortOrder::Asc,
        "desc" => SortOrder::Desc,
        _ => {
            eprintln!("❌ Invalid order: {}. Use 'asc' or 'desc'", value);
            std::process::exit(1);
        }
    }
}

fn parse_compare_by(value: &str) -> CompareBy {
    match value.to_lowercase().as_str() {
        "title" => CompareBy::Title,
        "url" => CompareBy::Url,
        "url_simple" | "url-simple" | "service" => CompareBy::UrlSimple,
        _ => {
            eprintln!("❌ Invalid compare-by: {}. Use 'title', 'url' or 'url_simple'", value);
            std::process::exit(1);
        }
    }
}

fn parse_placement(value: &str) -> FolderPlacement {
    match value.to_lowercase().as_str() {
        "top" => FolderPlacement::Top,
        "bottom" => FolderPlacement::Bottom,
        _ => {
            eprintln!("❌ Invalid folder placement: {}. Use 'top' or 'bottom'", value);
            std::process::exit(1);
        }
    }
}

fn print_plan(plan: &SortPlan) {
    println!("\n📊 Sort Preview:");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  Options: {}", plan.options.description());
    println!("  Bookmarks: {}", plan.tree.count_bookmarks());
    println!("  ─────────────────────────────────────────");

    for op in &plan.moves {
        let title = plan.tree.find(&op.node_id).map(|n| n.title.as_str()).unwrap_or("?");
        let folder = plan.tree.find(&op.parent_id).map(|n| n.title.as_str()).unwrap_or("?");
        println!("  {} → {}[{}]", title, folder, op.index);
    }

    println!("  ─────────────────────────────────────────");
    println!("  Moves: {}", plan.moves.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
}
