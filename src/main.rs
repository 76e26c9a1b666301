//! Sitegrove main entry point
//!
//! This is the command-line interface for the Sitegrove site crawler.

use anyhow::Context;
use clap::Parser;
use sitegrove::config::{
    hash_config_str, load_config_with_hash, validate, Config, RenderMode, SitemapFormat,
};
use sitegrove::crawler::crawl;
use sitegrove::output::{format_history, print_report, write_sitemap};
use sitegrove::storage::{open_storage, persist_report, Storage};
use sitegrove::url::safety;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Sitegrove: a polite same-origin site crawler
///
/// Sitegrove crawls a website from a seed URL, following same-origin links
/// depth-first, rendering client-side pages in a browser when needed, and
/// writes the discovered pages as a sitemap.
#[derive(Parser, Debug)]
#[command(name = "sitegrove")]
#[command(version)]
#[command(about = "A polite same-origin site crawler", long_about = None)]
struct Cli {
    /// URL to start crawling from
    #[arg(value_name = "SEED_URL", required_unless_present = "history")]
    seed: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Sitemap format (overrides the config file)
    #[arg(short, long, value_enum)]
    format: Option<SitemapFormat>,

    /// Sitemap output path (overrides the config file)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Maximum link depth from the seed
    #[arg(long)]
    max_depth: Option<u32>,

    /// Maximum number of pages to dispatch
    #[arg(long)]
    max_pages: Option<u32>,

    /// Minimum delay between requests in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Browser rendering mode
    #[arg(long, value_enum)]
    render: Option<RenderMode>,

    /// Do not store the crawl in the history database
    #[arg(long)]
    no_persist: bool,

    /// Validate the seed and configuration without crawling
    #[arg(long, conflicts_with = "history")]
    dry_run: bool,

    /// List stored crawls and exit
    #[arg(long)]
    history: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Applies command-line overrides, returning a description of each for the config hash
    fn apply_overrides(&self, config: &mut Config) -> Vec<String> {
        let mut applied = Vec::new();

        if let Some(depth) = self.max_depth {
            config.crawler.max_depth = depth;
            applied.push(format!("crawler.max-depth={}", depth));
        }
        if let Some(pages) = self.max_pages {
            config.crawler.max_pages = pages;
            applied.push(format!("crawler.max-pages={}", pages));
        }
        if let Some(delay) = self.delay_ms {
            config.crawler.politeness_delay_ms = delay;
            applied.push(format!("crawler.politeness-delay-ms={}", delay));
        }
        if let Some(mode) = self.render {
            config.fetch.render_mode = mode;
            applied.push(format!("fetch.render-mode={:?}", mode));
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(output) = &self.output {
            config.output.sitemap_path = output.display().to_string();
        }

        applied
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (mut config, file_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => (Config::default(), hash_config_str("")),
    };

    let overrides = cli.apply_overrides(&mut config);
    validate(&config).context("Invalid configuration")?;
    let config_hash = if overrides.is_empty() {
        file_hash
    } else {
        hash_config_str(&format!("{}\n{}", file_hash, overrides.join("\n")))
    };
    tracing::debug!("Configuration hash: {}", config_hash);

    if cli.history {
        return handle_history(&config);
    }

    let seed = cli.seed.as_deref().context("A seed URL is required")?;

    let report = safety::validate(seed);
    for warning in &report.warnings {
        tracing::warn!("{}", warning);
    }
    if !report.can_proceed {
        for issue in &report.issues {
            tracing::error!("{}", issue);
        }
        anyhow::bail!("Refusing to crawl {}: {}", seed, report.issues.join("; "));
    }

    if cli.dry_run {
        handle_dry_run(seed, &config, &config_hash);
        return Ok(());
    }

    handle_crawl(seed, &config, &config_hash, !cli.no_persist).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitegrove=info,warn"),
            1 => EnvFilter::new("sitegrove=debug,info"),
            2 => EnvFilter::new("sitegrove=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(seed: &str, config: &Config, config_hash: &str) {
    println!("=== Sitegrove Dry Run ===\n");
    println!("Seed: {}", seed);

    println!("\nCrawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Max children per page: {}", config.crawler.max_children_per_page);
    println!("  Politeness delay: {}ms", config.crawler.politeness_delay_ms);
    println!("  Page timeout: {}ms", config.crawler.page_timeout_ms);
    println!("  Max retries: {}", config.crawler.max_retries);

    println!("\nFetching:");
    println!("  Render mode: {:?}", config.fetch.render_mode);
    if config.fetch.render_mode != RenderMode::Never {
        println!("  WebDriver: {}", config.fetch.webdriver_url);
    }
    println!("  User agent: {}", config.fetch.user_agent);

    println!("\nOutput:");
    println!("  Sitemap: {} ({:?})", config.output.sitemap_path, config.output.format);
    println!("  Database: {}", config.output.database_path);
    println!("  Config hash: {}", config_hash);

    println!("\n✓ Seed URL and configuration are valid");
}

/// Handles the --history mode: lists stored crawls
fn handle_history(config: &Config) -> anyhow::Result<()> {
    let storage = open_storage(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open {}", config.output.database_path))?;
    let crawls = storage.list_crawls(50)?;
    print!("{}", format_history(&crawls));
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    seed: &str,
    config: &Config,
    config_hash: &str,
    persist: bool,
) -> anyhow::Result<()> {
    let report = match crawl(seed, config).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    print_report(&report);

    let sitemap_path = Path::new(&config.output.sitemap_path);
    let output_size = match write_sitemap(&report, config.output.format, sitemap_path) {
        Ok(size) => {
            println!("\n✓ Sitemap written to: {}", sitemap_path.display());
            size
        }
        Err(e) => {
            tracing::error!("Failed to write sitemap: {}", e);
            0
        }
    };

    if persist {
        match open_storage(Path::new(&config.output.database_path)) {
            Ok(mut storage) => {
                persist_report(&mut storage, &report, config_hash, output_size);
            }
            Err(e) => tracing::warn!("Crawl history unavailable: {}", e),
        }
    }

    Ok(())
}
