//! Configuration module for Sitegrove
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sitegrove::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sitegrove.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, FetchConfig, OutputConfig, RenderMode, SitemapFormat,
    DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, hash_config_str, load_config, load_config_with_hash};
pub use validation::{validate, MAX_REDIRECTS};
