//! Output module for crawl results
//!
//! This module handles:
//! - Collecting page outcomes into the final crawl report
//! - Serializing the successful pages as sitemaps
//! - Printing console summaries

mod aggregator;
mod report;
pub mod sitemap;
mod summary;

pub use aggregator::ResultAggregator;
pub use report::{CrawlReport, PageOutcome};
pub use sitemap::{serializer_for, HtmlSitemap, SitemapSerializer, TreeJson, XmlSitemap};
pub use summary::{format_history, format_report, print_report};

use crate::config::SitemapFormat;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while writing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serializes the report's successful pages and writes them to `path`
///
/// # Returns
///
/// The number of bytes written
pub fn write_sitemap(
    report: &CrawlReport,
    format: SitemapFormat,
    path: &Path,
) -> Result<u64, OutputError> {
    let document = render_sitemap(report, format);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &document).map_err(|source| OutputError::Write {
        path: path.display().to_string(),
        source,
    })?;

    tracing::info!("Wrote {} sitemap to {}", format_name(format), path.display());
    Ok(document.len() as u64)
}

/// Serializes the report's successful pages in the given format
pub fn render_sitemap(report: &CrawlReport, format: SitemapFormat) -> String {
    let serializer: Box<dyn SitemapSerializer> = match format {
        SitemapFormat::Xml => Box::new(XmlSitemap::with_lastmod(
            report.started_at.format("%Y-%m-%d").to_string(),
        )),
        other => serializer_for(other),
    };
    serializer.serialize(&report.successful_urls(), &report.base_url)
}

fn format_name(format: SitemapFormat) -> &'static str {
    match format {
        SitemapFormat::Xml => "XML",
        SitemapFormat::Html => "HTML",
        SitemapFormat::Tree => "tree",
    }
}
