use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use timeliner_core::classify::InteractionKind;
use timeliner_core::driver::{Browser, WebDriverConfig, WebDriverSession};
use timeliner_core::profile::ProfileCollector;
use timeliner_core::scroll::Scroller;
use timeliner_core::{
    dates, Collector, HarvestConfig, HarvestError, ReportPaths, RunParams, RunStats,
    SelectorTable,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "timeliner", about = "Scroll a social timeline and collect its posts")]
struct Cli {
    #[command(flatten)]
    shared: SharedArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SharedArgs {
    /// Directory holding one sub-directory per report
    #[arg(long, global = true, env = "TIMELINER_REPORTS_DIR", default_value = "reports")]
    reports_dir: PathBuf,

    /// TOML file overriding tuning constants
    #[arg(long, global = true, env = "TIMELINER_CONFIG")]
    config: Option<PathBuf>,

    /// TOML selector table merged over the built-in one
    #[arg(long, global = true, env = "TIMELINER_SELECTORS")]
    selectors: Option<PathBuf>,

    /// WebDriver server URL
    #[arg(long, global = true, env = "TIMELINER_WEBDRIVER", default_value = "http://localhost:4444")]
    webdriver: String,

    /// Browser to request from the WebDriver server (chrome or firefox)
    #[arg(long, global = true, default_value = "chrome")]
    browser: String,

    /// Extra browser command-line argument (repeatable)
    #[arg(long = "browser-arg", global = true)]
    browser_args: Vec<String>,

    #[arg(long, global = true)]
    headless: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect posts from a timeline into a report
    Collect {
        /// Timeline URL to open
        #[arg(long)]
        url: String,

        /// Total number of posts the report should hold
        #[arg(long, env = "TIMELINER_LIMIT")]
        limit: usize,

        /// Stop at the first post older than this date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_until)]
        until: Option<NaiveDate>,

        /// Report name
        #[arg(long, env = "TIMELINER_REPORT")]
        report: String,
    },
    /// Collect profile metadata for the authors in a report
    Profiles {
        /// Report name
        #[arg(long, env = "TIMELINER_REPORT")]
        report: String,
    },
    /// Extract records from a saved timeline page, offline
    Inspect {
        /// The HTML file to read
        file: PathBuf,

        /// Number of post slots to extract
        #[arg(long, default_value_t = 11)]
        slots: usize,

        /// Output as JSON instead of one line per post
        #[arg(long)]
        json: bool,
    },
}

fn parse_until(s: &str) -> std::result::Result<NaiveDate, String> {
    dates::parse_stop_date(s).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,timeliner=info,timeliner_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            exit_code(&e)
        }
    }
}

/// 3: rate limited past the backoff budget, 4: feed stopped loading, 1: anything else.
fn exit_code(error: &anyhow::Error) -> ExitCode {
    match error.downcast_ref::<HarvestError>() {
        Some(HarvestError::InterstitialExhausted { .. }) => ExitCode::from(3),
        Some(HarvestError::FeedStalled(_)) => ExitCode::from(4),
        _ => ExitCode::FAILURE,
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.shared.config.as_deref())?;
    let selectors = load_selectors(cli.shared.selectors.as_deref())?;

    match cli.command {
        Commands::Collect {
            url,
            limit,
            until,
            report,
        } => {
            let paths = ReportPaths::new(&cli.shared.reports_dir, &report);
            let mut params = RunParams::new(report, limit);
            params.until = until;

            let mut session = start_session(&cli.shared)?;
            session
                .navigate(&url)
                .with_context(|| format!("Failed to open {url}"))?;
            Scroller::new(&config.waits).wait_page_load(&mut session, config.waits.page_load_timeout())?;

            let mut stats = RunStats::default();
            let outcome =
                Collector::new(&mut session, &selectors, &config).run(&params, &paths, &mut stats);
            println!(
                "{}/{} posts in report ({} new, {} slots inspected)",
                stats.collected, stats.limit, stats.new_this_run, stats.inspected
            );
            let outcome = outcome?;
            println!("Finished: {outcome}");
            println!("  {}", paths.posts_json().display());
            println!("  {}", paths.posts_csv().display());
            session.quit()?;
        }
        Commands::Profiles { report } => {
            let paths = ReportPaths::new(&cli.shared.reports_dir, &report);
            if !paths.posts_json().exists() {
                anyhow::bail!("No posts collected for report '{report}' yet");
            }
            let mut session = start_session(&cli.shared)?;
            let stats = ProfileCollector::new(&mut session, &selectors, &config).run(&paths)?;
            println!(
                "{} profiles collected, {} skipped, {} already known ({} authors)",
                stats.collected, stats.skipped, stats.already_known, stats.authors
            );
            println!("  {}", paths.metadata_json().display());
            session.quit()?;
        }
        Commands::Inspect { file, slots, json } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let records = timeliner_core::inspect(&html, &selectors, &config, slots)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for r in &records {
                    println!(
                        "{} {:<14} {:<16} {:<12} {}",
                        r.id,
                        r.timestamp,
                        r.author,
                        kind_label(r.classification.kind()),
                        r.body.replace('\n', " ")
                    );
                }
                println!("{} posts", records.len());
            }
        }
    }
    Ok(())
}

fn kind_label(kind: InteractionKind) -> &'static str {
    match kind {
        InteractionKind::Regular => "post",
        InteractionKind::Mention => "mention",
        InteractionKind::Quote => "quote",
        InteractionKind::Reply => "reply",
        InteractionKind::MentionReply => "mention+reply",
        InteractionKind::MentionQuote => "mention+quote",
    }
}

fn load_config(path: Option<&Path>) -> Result<HarvestConfig> {
    match path {
        Some(path) => HarvestConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(HarvestConfig::default()),
    }
}

fn load_selectors(path: Option<&Path>) -> Result<SelectorTable> {
    let defaults = SelectorTable::x_timeline();
    match path {
        Some(path) => {
            let overrides = SelectorTable::from_file(path)
                .with_context(|| format!("Failed to load selectors {}", path.display()))?;
            Ok(defaults.merged(overrides))
        }
        None => Ok(defaults),
    }
}

fn start_session(shared: &SharedArgs) -> Result<WebDriverSession> {
    let config = WebDriverConfig {
        server_url: shared.webdriver.clone(),
        browser_name: shared.browser.clone(),
        headless: shared.headless,
        args: shared.browser_args.clone(),
        ..WebDriverConfig::default()
    };
    WebDriverSession::start(config)
        .with_context(|| format!("Failed to start a WebDriver session at {}", shared.webdriver))
}
