//! `stocknote` command-line front end.
//!
//! # Responsibility
//! - Map subcommands onto knowledge store and insight operations.
//! - Print results as pretty JSON on stdout, errors on stderr.
//!
//! # Invariants
//! - No business rule lives here; validation errors come from core.
//! - A non-zero exit code accompanies every error message.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use stocknote_core::insight::prompt::MAX_CONTEXT_ITEMS;
use stocknote_core::{
    init_logging, select_generator, AppConfig, CachedMarketData, ItemKind, ItemPatch,
    KnowledgeStore, NewItem, SearchQuery, StaticMarketData, StoreConfig,
};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "stocknote")]
#[command(about = "Personal stock research knowledge base", version)]
struct Cli {
    /// Directory holding the knowledge base
    #[arg(long, global = true, env = "STOCKNOTE_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a note, article or research item
    Add(AddArgs),

    /// Show one item
    Get { id: Uuid },

    /// Change fields of an item; omitted fields are kept
    Update(UpdateArgs),

    /// Delete an item permanently
    Delete { id: Uuid },

    /// List every item, newest first
    List,

    /// Filter items, or rank them by relevance with --ranked
    Search(SearchArgs),

    /// List every tag in use
    Tags,

    /// Generate an investment insight for a ticker
    Analyze(AnalyzeArgs),
}

#[derive(Args)]
struct AddArgs {
    /// note, article or research
    #[arg(short, long, default_value = "note")]
    kind: ItemKind,

    #[arg(short, long)]
    title: String,

    #[arg(short, long, default_value = "")]
    content: String,

    /// Repeat for several tags
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Repeat for several tickers
    #[arg(long = "ticker")]
    tickers: Vec<String>,

    /// Source link (articles only)
    #[arg(long)]
    source_url: Option<String>,
}

#[derive(Args)]
struct UpdateArgs {
    id: Uuid,

    #[arg(short, long)]
    kind: Option<ItemKind>,

    #[arg(short, long)]
    title: Option<String>,

    #[arg(short, long)]
    content: Option<String>,

    /// Replaces the tag set; repeat for several tags
    #[arg(long = "tag", conflicts_with = "clear_tags")]
    tags: Vec<String>,

    #[arg(long)]
    clear_tags: bool,

    /// Replaces the ticker set; repeat for several tickers
    #[arg(long = "ticker", conflicts_with = "clear_tickers")]
    tickers: Vec<String>,

    #[arg(long)]
    clear_tickers: bool,

    #[arg(long, conflicts_with = "clear_source_url")]
    source_url: Option<String>,

    #[arg(long)]
    clear_source_url: bool,
}

impl UpdateArgs {
    fn into_patch(self) -> ItemPatch {
        ItemPatch {
            kind: self.kind,
            title: self.title,
            content: self.content,
            tags: list_change(self.tags, self.clear_tags),
            related_tickers: list_change(self.tickers, self.clear_tickers),
            source_url: match (self.source_url, self.clear_source_url) {
                (Some(url), _) => Some(Some(url)),
                (None, true) => Some(None),
                (None, false) => None,
            },
        }
    }
}

#[derive(Args)]
struct SearchArgs {
    /// Text matched against title and content
    #[arg(short, long)]
    text: Option<String>,

    /// Tag filter; repeat to match items carrying any of them
    #[arg(long = "tag")]
    tags: Vec<String>,

    #[arg(long)]
    ticker: Option<String>,

    #[arg(short, long)]
    kind: Option<ItemKind>,

    /// Rank by keyword relevance instead of recency (requires --text)
    #[arg(long, requires = "text")]
    ranked: bool,
}

#[derive(Args)]
struct AnalyzeArgs {
    ticker: String,

    /// JSON file containing an array of metric snapshots
    #[arg(long)]
    snapshots: PathBuf,

    /// Quote the ticker's research items in the prompt
    #[arg(long)]
    with_notes: bool,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if let Some(dir) = cli.storage_dir {
        config.store = StoreConfig::new(dir);
    }

    if let Some(log_dir) = config.log_dir.as_deref() {
        if let Err(err) = init_logging(config.log_level, log_dir) {
            eprintln!("warning: file logging disabled: {err}");
        }
    }

    match cli.command {
        Commands::Add(args) => {
            let mut store = open_store(&config.store)?;
            let mut input = NewItem::new(args.kind, args.title, args.content)
                .with_tags(args.tags)
                .with_tickers(args.tickers);
            input.source_url = args.source_url;
            let id = store.add(input)?;
            print_json(&store.get(id)?)
        }
        Commands::Get { id } => print_json(&open_store(&config.store)?.get(id)?),
        Commands::Update(args) => {
            let mut store = open_store(&config.store)?;
            let id = args.id;
            let updated = store.update(id, args.into_patch())?;
            print_json(&updated)
        }
        Commands::Delete { id } => {
            open_store(&config.store)?.delete(id)?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        Commands::List => print_json(&open_store(&config.store)?.list_all()),
        Commands::Search(args) => run_search(&config, args),
        Commands::Tags => print_json(&open_store(&config.store)?.list_tags()),
        Commands::Analyze(args) => run_analyze(&config, args),
    }
}

fn run_search(config: &AppConfig, args: SearchArgs) -> Result<()> {
    let store = open_store(&config.store)?;
    let mut query = SearchQuery::new().with_tags(args.tags);
    if let Some(ticker) = args.ticker {
        query = query.with_ticker(ticker);
    }
    if let Some(kind) = args.kind {
        query = query.with_kind(kind);
    }

    match args.text {
        Some(text) if args.ranked => print_json(&store.search_ranked(&text, &query)),
        Some(text) => print_json(&store.search(&query.with_text(text))),
        None => print_json(&store.search(&query)),
    }
}

fn run_analyze(config: &AppConfig, args: AnalyzeArgs) -> Result<()> {
    let fixture = StaticMarketData::from_json_file(&args.snapshots)?;
    let market = CachedMarketData::new(fixture);
    let snapshot = market.get(&args.ticker)?;

    let context = if args.with_notes {
        open_store(&config.store)?.items_for_ticker(&snapshot.ticker, MAX_CONTEXT_ITEMS)
    } else {
        Vec::new()
    };

    let generator = select_generator(config.api_key.as_deref(), config.insight.clone())?;
    let insight = generator.generate(&snapshot, &context)?;
    info!(
        "event=cli_analyze module=cli status=ok ticker={} generator={} context_items={}",
        insight.ticker,
        insight.generator,
        context.len()
    );
    print_json(&insight)
}

fn open_store(config: &StoreConfig) -> Result<KnowledgeStore> {
    let (store, report) = KnowledgeStore::open(config).with_context(|| {
        format!(
            "failed to open knowledge base at `{}`",
            config.storage_directory.display()
        )
    })?;
    if let Some(warning) = &report.warning {
        eprintln!("warning: started with an empty knowledge base: {warning}");
        if let Some(path) = &report.quarantined_to {
            eprintln!("warning: unreadable data moved to `{}`", path.display());
        }
        if report.read_only {
            eprintln!("warning: unreadable data could not be moved aside; changes are refused");
        }
    }
    Ok(store)
}

fn list_change(values: Vec<String>, clear: bool) -> Option<Vec<String>> {
    if clear {
        Some(Vec::new())
    } else if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
