use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use tracing::{info, warn};

use showings_monitor::config::Config;
use showings_monitor::db::{self, SeenStore, SqliteSeenStore};
use showings_monitor::monitor::{run_forever, CycleOutcome, ShowingsMonitor};
use showings_monitor::notify::{ConsoleNotifier, Notifier, PushoverNotifier};
use showings_monitor::scrape::{BrowserLauncher, ScrapeSettings, ShowingsScraper};

/// Showings monitor: polls an embedded showings activity log and alerts on
/// showings it has not seen before.
#[derive(Parser)]
#[command(name = "showings-monitor", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the seen-showings database
    Init,

    /// Run a single poll cycle and exit
    Once,

    /// Poll on a fixed delay until interrupted
    Run {
        /// Port for the status endpoint
        #[arg(long, default_value = "8080")]
        port: u16,

        /// Address to bind the status endpoint to
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
    },

    /// Show system status (seen showings, DB size, configuration)
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("showings_monitor=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing showings database...");
            let config = Config::load()?;
            let conn = db::initialize(&config.db_path)?;
            let table_count = db::schema::table_count(&conn)?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nNext step: set SHOWINGS_URL in your .env file");
            println!("\nThen run: showings-monitor once");
        }

        Commands::Once => {
            let config = Config::load()?;
            config.require_url()?;
            let store = init_store(&config)?;
            let monitor = build_monitor(&config, store)?;

            let outcome = monitor.run_cycle().await;
            print_outcome(&outcome);
            if outcome.is_failure() {
                std::process::exit(1);
            }
        }

        Commands::Run { port, bind } => {
            let config = Config::load()?;
            config.require_url()?;
            let store = init_store(&config)?;
            let monitor = build_monitor(&config, store.clone())?;

            #[cfg(feature = "web")]
            {
                let state = showings_monitor::web::AppState {
                    store: store.clone(),
                    status: monitor.status(),
                };
                tokio::spawn(async move {
                    if let Err(e) = showings_monitor::web::run_server(state, port, &bind).await {
                        warn!(error = %e, "Status endpoint stopped");
                    }
                });
            }
            #[cfg(not(feature = "web"))]
            {
                let _ = (port, bind);
                info!("Built without the web feature; status endpoint disabled");
            }

            tokio::select! {
                _ = run_forever(&monitor, config.poll_delay) => {}
                _ = tokio::signal::ctrl_c() => {
                    println!("\n{}", "Interrupted, shutting down.".dimmed());
                }
            }
        }

        Commands::Status => {
            let config = Config::load()?;
            if !std::path::Path::new(&config.db_path).exists() {
                println!("Database: not initialized");
                println!("\nRun `showings-monitor init` to set up the database.");
                return Ok(());
            }
            let store: Arc<dyn SeenStore> =
                Arc::new(SqliteSeenStore::new(db::open(&config.db_path)?));
            showings_monitor::status::show(&store, &config).await?;
        }
    }

    Ok(())
}

/// Open the seen-set store, creating the database on first run.
fn init_store(config: &Config) -> Result<Arc<dyn SeenStore>> {
    let conn = db::initialize(&config.db_path)?;
    Ok(Arc::new(SqliteSeenStore::new(conn)))
}

/// Wire the scraper, store and notification channels together.
fn build_monitor(config: &Config, store: Arc<dyn SeenStore>) -> Result<ShowingsMonitor> {
    let scraper = ShowingsScraper::new(browser_launcher()?, ScrapeSettings::from_config(config));

    let mut notifiers: Vec<Arc<dyn Notifier>> = vec![Arc::new(ConsoleNotifier::new(&config.url))];
    if config.pushover.enabled {
        info!("Pushover notifications enabled");
        notifiers.push(Arc::new(PushoverNotifier::new(
            config.pushover.clone(),
            &config.url,
        )));
    }

    Ok(ShowingsMonitor::new(Arc::new(scraper), store, notifiers))
}

#[cfg(feature = "browser")]
fn browser_launcher() -> Result<Arc<dyn BrowserLauncher>> {
    Ok(Arc::new(showings_monitor::scrape::chromium::ChromiumLauncher::new()))
}

#[cfg(not(feature = "browser"))]
fn browser_launcher() -> Result<Arc<dyn BrowserLauncher>> {
    anyhow::bail!(
        "This build has no browser support.\n\
         Rebuild with: cargo build --features browser"
    )
}

fn print_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::ExtractionFailed { reason } => {
            println!("{} {}", "Extraction failed:".red().bold(), reason)
        }
        CycleOutcome::StoreFailed { reason } => {
            println!("{} {}", "Store failed:".red().bold(), reason)
        }
        CycleOutcome::NoRows => println!("{}", "No showings found on the page.".yellow()),
        CycleOutcome::NoNew { scraped } => {
            println!("{scraped} showing(s) scraped, none new.")
        }
        CycleOutcome::Notified {
            new,
            delivered,
            failed,
        } => {
            println!(
                "{} new showing(s); {} channel(s) delivered, {} failed.",
                new.to_string().green().bold(),
                delivered,
                failed
            );
        }
    }
}
