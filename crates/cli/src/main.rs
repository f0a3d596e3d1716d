use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cli::{detect, ingest, paths};
use ingest_core::config::{self, AppConfig};
use ingest_core::prober::Prober;
use ingest_core::report;
use ingest_core::scanner::ScanOptions;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;
    let base_dir = paths::base_dir(cli.config.as_deref()).context("Failed to get current directory")?;
    debug!("Base directory: {:?}", base_dir);

    match cli.command {
        Commands::Detect { dir, ext, json } => run_detect(&cfg, &base_dir, dir, ext, json),
        Commands::Ingest { only, json } => {
            let pool = open_store(&cfg, &base_dir).await?;
            run_ingest(&cfg, &pool, &base_dir, &only, json).await
        }
        Commands::Report {
            top,
            collections,
            json,
        } => {
            let pool = open_store(&cfg, &base_dir).await?;
            run_report(&cfg, &pool, top, collections, json).await
        }
        Commands::Collections { json } => {
            let pool = open_store(&cfg, &base_dir).await?;
            let stats = storage::list_collections(&pool).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else if stats.is_empty() {
                println!("No collections.");
            } else {
                for s in stats {
                    println!("{:<24} {}", s.name, s.documents);
                }
            }
            Ok(())
        }
    }
}

#[derive(Parser)]
#[command(name = "trend-ingest")]
#[command(about = "Charset detection, CSV upload and reporting for trending-video exports", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the character encoding of every CSV in a directory
    Detect {
        /// Directory to scan (defaults to the configured data dir)
        dir: Option<PathBuf>,
        /// File name suffix to match, e.g. .csv
        #[arg(long)]
        ext: Option<String>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload configured CSV sources to the document store
    Ingest {
        /// Only upload these collections (comma-separated)
        #[arg(long, value_delimiter = ',', num_args = 1.., default_values_t = Vec::<String>::new())]
        only: Vec<String>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Aggregate uploaded documents into the trending report
    Report {
        /// Number of rows in ranked tables
        #[arg(short, long)]
        top: Option<usize>,
        /// Collections to include (comma-separated); defaults to config, then all
        #[arg(long, value_delimiter = ',', num_args = 1.., default_values_t = Vec::<String>::new())]
        collections: Vec<String>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// List stored collections with document counts
    Collections {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

async fn open_store(cfg: &AppConfig, base_dir: &Path) -> Result<SqlitePool> {
    let db = if cfg.database.path.starts_with("sqlite:") {
        cfg.database.path.clone()
    } else {
        paths::resolve(base_dir, Path::new(&cfg.database.path))
            .to_string_lossy()
            .into_owned()
    };
    let pool = storage::connect(&db).await.context("db connect")?;
    storage::migrate(&pool).await.context("db migrate")?;
    Ok(pool)
}

fn run_detect(
    cfg: &AppConfig,
    base_dir: &Path,
    dir: Option<PathBuf>,
    ext: Option<String>,
    json: bool,
) -> Result<()> {
    let dir = dir.unwrap_or_else(|| PathBuf::from(&cfg.scan.data_dir));
    let dir = paths::resolve(base_dir, &dir);
    let mut opts = ScanOptions::from(&cfg.scan);
    if let Some(ext) = ext {
        opts.extension = ext;
    }
    let prober = Prober::from_config(&cfg.probe);
    let stdout = std::io::stdout();
    detect::detect_dir(&dir, &opts, &prober, json, &mut stdout.lock())?;
    Ok(())
}

async fn run_ingest(
    cfg: &AppConfig,
    pool: &SqlitePool,
    base_dir: &Path,
    only: &[String],
    json: bool,
) -> Result<()> {
    if cfg.sources.is_empty() {
        bail!("no [[sources]] configured");
    }
    let selected: Vec<_> = ingest::select_sources(&cfg.sources, only)?
        .into_iter()
        .cloned()
        .collect();
    let prober = Prober::from_config(&cfg.probe);
    let stdout = std::io::stdout();
    let outcomes =
        ingest::run_ingest(pool, &selected, base_dir, &prober, json, &mut stdout.lock()).await?;
    let failed = ingest::failed_count(&outcomes);
    if failed > 0 {
        bail!("{} of {} sources failed to upload", failed, outcomes.len());
    }
    Ok(())
}

async fn run_report(
    cfg: &AppConfig,
    pool: &SqlitePool,
    top: Option<usize>,
    collections: Vec<String>,
    json: bool,
) -> Result<()> {
    let collections = if !collections.is_empty() {
        collections
    } else if !cfg.report.collections.is_empty() {
        cfg.report.collections.clone()
    } else {
        storage::list_collections(pool)
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect()
    };
    let top_n = top.unwrap_or(cfg.report.top_n);
    let report = report::build_report(pool, &collections, top_n).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}
