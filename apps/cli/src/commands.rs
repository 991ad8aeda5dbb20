//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use copyforge_core::{PipelineRunner, ProgressReporter, Seeder};
use copyforge_shared::{AppConfig, ArticleId, init_config, load_config};
use copyforge_storage::Storage;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// copyforge: rewrite your oldest articles against what currently ranks.
#[derive(Parser)]
#[command(
    name = "copyforge",
    version,
    about = "Scrape the oldest blog articles and rewrite them using top-ranking competitor content.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scrape the oldest listing articles and replace the stored set.
    Seed {
        /// Number of oldest articles to scrape.
        #[arg(short, long, default_value_t = 5)]
        limit: usize,

        /// Database path (defaults to `storage.database_path`).
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Rewrite the oldest stored articles against competitor content.
    Enhance {
        /// Number of oldest articles to enhance.
        #[arg(short, long, default_value_t = 5)]
        limit: usize,

        /// Database path (defaults to `storage.database_path`).
        #[arg(long)]
        db: Option<PathBuf>,

        /// Print the run report as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// List stored articles, newest first.
    List {
        /// Database path (defaults to `storage.database_path`).
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Show one stored article with its rewrite and references.
    Show {
        /// Article ID.
        id: String,

        /// Database path (defaults to `storage.database_path`).
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "copyforge=info",
        1 => "copyforge=debug",
        _ => "copyforge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Seed { limit, db } => cmd_seed(limit, db.as_deref()).await,
        Command::Enhance { limit, db, json } => cmd_enhance(limit, db.as_deref(), json).await,
        Command::List { db } => cmd_list(db.as_deref()).await,
        Command::Show { id, db } => cmd_show(&id, db.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// `--db` if given, otherwise the configured database path.
fn database_path(config: &AppConfig, db: Option<&Path>) -> PathBuf {
    db.map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.storage.database_path))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_seed(limit: usize, db: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let db_path = database_path(&config, db);
    info!(limit, db = %db_path.display(), root = %config.listing.root_url, "seeding articles");

    let storage = Storage::open(&db_path).await?;
    let seeder = Seeder::from_config(&config)?;

    let reporter = CliProgress::new();
    let report = seeder.seed(&storage, limit, &reporter).await?;

    println!();
    println!("  Articles seeded!");
    println!("  Discovered: {}", report.discovered);
    println!("  Stored:     {}", report.articles.len());
    println!("  Skipped:    {}", report.skipped);
    for article in &report.articles {
        println!("    {}  {}", article.id, article.title);
    }
    println!();

    Ok(())
}

async fn cmd_enhance(limit: usize, db: Option<&Path>, json: bool) -> Result<()> {
    let config = load_config()?;
    let db_path = database_path(&config, db);
    info!(limit, db = %db_path.display(), "enhancing articles");

    let storage = Storage::open(&db_path).await?;
    let runner = PipelineRunner::from_config(&config, Arc::new(storage))?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing the current article");
            on_signal.cancel();
        }
    });

    let reporter = CliProgress::new();
    let report = runner.run(limit, &cancel, &reporter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!(
        "  Enhancement {}",
        if report.cancelled { "interrupted" } else { "complete!" }
    );
    println!("  Processed:   {}", report.processed);
    println!("  Updated:     {}", report.updated);
    println!("  Failed:      {}", report.persist_failures);
    println!("  Primary:     {}", report.provider_counts.primary);
    println!("  Secondary:   {}", report.provider_counts.secondary);
    println!("  Passthrough: {}", report.provider_counts.passthrough);
    println!("  Time:        {:.1}s", report.elapsed_ms as f64 / 1000.0);
    println!();

    Ok(())
}

async fn cmd_list(db: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let storage = Storage::open_readonly(&database_path(&config, db)).await?;
    let articles = storage.list_articles().await?;

    if articles.is_empty() {
        println!("No articles stored. Run `copyforge seed` first.");
        return Ok(());
    }

    println!("{:<36}  {:<8}  {:<20}  TITLE", "ID", "ENHANCED", "CREATED");
    for article in &articles {
        println!(
            "{:<36}  {:<8}  {:<20}  {}",
            article.id,
            if article.updated_content.is_some() { "yes" } else { "no" },
            article.created_at.format("%Y-%m-%d %H:%M:%S"),
            article.title
        );
    }

    Ok(())
}

async fn cmd_show(id: &str, db: Option<&Path>) -> Result<()> {
    let id: ArticleId = id
        .parse()
        .map_err(|e| eyre!("invalid article id '{id}': {e}"))?;
    let config = load_config()?;
    let storage = Storage::open_readonly(&database_path(&config, db)).await?;

    let article = storage
        .get_article(&id)
        .await?
        .ok_or_else(|| eyre!("no article with id {id}"))?;

    println!("# {}", article.title);
    println!();
    println!("ID:      {}", article.id);
    println!("Source:  {}", article.original_url);
    println!("Created: {}", article.created_at.to_rfc3339());
    println!();
    println!("## Original");
    println!();
    println!("{}", article.original_content);

    match &article.updated_content {
        Some(updated) => {
            println!();
            println!("## Updated");
            println!();
            println!("{updated}");
        }
        None => {
            println!();
            println!("(not enhanced yet)");
        }
    }

    if !article.references.is_empty() {
        println!();
        println!("## References");
        println!();
        for (i, url) in article.references.iter().enumerate() {
            println!("{}. {url}", i + 1);
        }
    }

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn article_started(&self, title: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("[{current}/{total}] {title}"));
    }

    fn done(&self, summary: &str) {
        self.spinner.finish_and_clear();
        info!(summary, "finished");
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
