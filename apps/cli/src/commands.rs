//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use azui_kb_core::{PipelineProgress, Stage, StageOutcome};
use azui_kb_crawler::ProgressReporter;
use azui_kb_shared::CrawlConfig;
use azui_kb_storage::KbStore;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// azui-kb: keep the UI benefits knowledge base in sync with the source site.
#[derive(Parser)]
#[command(
    name = "azui-kb",
    version,
    about = "Crawl the source site, diff snapshots, update the article catalog, and report changes.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Workspace root containing the `kb/` directory.
    #[arg(long, env = "AZUI_KB_ROOT", default_value = ".", global = true)]
    pub root: PathBuf,

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
    /// Crawl the configured site and save a new snapshot.
    Crawl,

    /// Compare the latest snapshot with the previous one.
    Diff,

    /// Rebuild the article catalog from the latest snapshot.
    Update,

    /// Write the markdown change report for the latest diff.
    Report,

    /// Run crawl, diff, update and report in order.
    RunAll,

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
    /// Write `kb/config.json` with defaults.
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
        0 => "azui_kb=info",
        1 => "azui_kb=debug",
        _ => "azui_kb=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

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
    let store = KbStore::new(&cli.root);
    info!(root = %store.root().display(), "using knowledge base root");

    match cli.command {
        Command::Crawl => {
            let progress = CliProgress::new();
            progress.phase(Stage::Crawl);
            let outcome = azui_kb_core::run_crawl(&store, &progress).await;
            progress.finish();
            println!("{}", outcome?);
        }
        Command::Diff => println!("{}", azui_kb_core::run_diff(&store)?),
        Command::Update => println!("{}", azui_kb_core::run_update(&store)?),
        Command::Report => println!("{}", azui_kb_core::run_report(&store)?),
        Command::RunAll => cmd_run_all(&store).await?,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(&store)?,
            ConfigAction::Show => cmd_config_show(&store)?,
        },
    }
    Ok(())
}

async fn cmd_run_all(store: &KbStore) -> Result<()> {
    let progress = CliProgress::new();
    let result = azui_kb_core::run_all(store, &progress).await;
    progress.finish();
    result?;
    println!("KB workflow complete.");
    Ok(())
}

fn cmd_config_init(store: &KbStore) -> Result<()> {
    let path = store.init_config(&CrawlConfig::default())?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(store: &KbStore) -> Result<()> {
    let config = store.load_config()?;
    println!("# {}", store.config_path().display());
    println!("{}", config.to_pretty_json()?);
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
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn page_fetched(&self, url: &str, status_code: u16, current: usize, max_pages: usize) {
        self.spinner
            .set_message(format!("Fetching [{current}/{max_pages}] {status_code} {url}"));
    }
}

impl PipelineProgress for CliProgress {
    fn phase(&self, stage: Stage) {
        self.spinner.set_message(stage.label());
    }

    fn stage_done(&self, outcome: &StageOutcome) {
        self.spinner.suspend(|| println!("{outcome}"));
    }
}
