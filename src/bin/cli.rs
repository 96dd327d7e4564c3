//! Catalog crawler CLI
//!
//! Local execution entry point.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use catalog_crawler::{
    error::{AppError, Result},
    models::Config,
    pipeline::{self, CrawlOptions},
    services::{GoogleTranslator, NoopTranslator, Translator, magnet},
    storage::{CacheStore, CatalogStorage, LocalStorage},
    utils::{format_size, http::HttpFetcher},
};
use clap::{Parser, Subcommand};

/// Game torrent catalog crawler
#[derive(Parser, Debug)]
#[command(
    name = "catalog-crawler",
    version,
    about = "Incremental game torrent catalog crawler"
)]
struct Cli {
    /// Path to storage directory holding config, caches and output
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Configuration file (default: {storage_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the site and rebuild the catalog
    Crawl {
        /// Crawl the configured problem URLs instead of the sitemap
        #[arg(long)]
        test_urls: bool,

        /// Crawl only the first N URLs
        #[arg(long)]
        limit: Option<usize>,

        /// Crawl these URLs only (repeatable)
        #[arg(long = "url")]
        urls: Vec<String>,
    },

    /// Validate the configuration file
    Validate,

    /// Show cache and catalog info
    Info,

    /// Print the magnet link of a local .torrent file
    Magnet {
        /// Path to the torrent file
        file: PathBuf,
    },
}

/// Initialize logging based on verbosity flag, optionally into a log file.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    builder.format_timestamp_secs();

    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.storage_dir.join("config.toml"));
    let loaded = Config::load(&config_path);
    let config = match &loaded {
        Ok(config) => config.clone(),
        Err(e) if cli.config.is_some() => {
            return Err(AppError::config(format!(
                "cannot load {}: {}",
                config_path.display(),
                e
            )));
        }
        Err(_) => Config::default(),
    };

    let log_file = match &cli.command {
        Command::Crawl { .. } if !config.paths.log_file.is_empty() => {
            Some(cli.storage_dir.join(&config.paths.log_file))
        }
        _ => None,
    };
    init_logging(cli.verbose, log_file.as_deref())?;

    match loaded {
        Ok(_) => log::info!("Loaded configuration from {}", config_path.display()),
        Err(e) => log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            config_path.display(),
            e
        ),
    }

    let storage = LocalStorage::with_paths(&cli.storage_dir, config.paths.clone());

    match cli.command {
        Command::Crawl {
            test_urls,
            limit,
            urls,
        } => {
            config.validate()?;

            let fetcher = HttpFetcher::new(&config.crawler)?;
            let translator: Arc<dyn Translator> = if config.translation.enabled {
                Arc::new(GoogleTranslator::new(
                    fetcher.client().clone(),
                    &config.translation.endpoint,
                ))
            } else {
                Arc::new(NoopTranslator)
            };
            let options = CrawlOptions {
                test_urls,
                limit,
                urls,
            };

            let summary =
                pipeline::run_crawler(&config, &storage, Arc::new(fetcher), translator, &options)
                    .await?;

            println!("{}", summary.stats.to_report().trim_end());
            println!(
                "{} entries written to {} (backup: {})",
                summary.entry_count, summary.catalog_location, summary.backup_location
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK (site, paths, crawler, translation, selectors)");
            log::info!(
                "Test mode: {} ({} problem URLs)",
                if config.test_mode.enabled { "on" } else { "off" },
                config.test_mode.problem_urls.len()
            );
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());
            log::info!("Sitemap: {}", config.site.sitemap_url);

            let cache = CacheStore::load(&storage).await?;
            log::info!(
                "Crawl cache ({}): {} pages, {} download entries",
                storage.path(&config.paths.cache_key()).display(),
                cache.len(),
                cache.entry_count()
            );
            let translations = storage.load_translations().await?;
            log::info!("Translation cache: {} titles", translations.len());

            match storage.read_catalog().await? {
                Some(catalog) => log::info!(
                    "Catalog '{}': {} downloads",
                    catalog.name,
                    catalog.downloads.len()
                ),
                None => log::info!("No catalog found yet."),
            }
        }

        Command::Magnet { file } => {
            let raw = std::fs::read(&file)?;
            let info = magnet::encode(&raw)?;

            println!("{}", info.magnet_uri);
            println!("info hash: {}", info.info_hash_hex());
            println!("size:      {}", format_size(info.total_length));
            println!(
                "created:   {}",
                info.creation_date.as_deref().unwrap_or("unknown")
            );
        }
    }

    Ok(())
}
