//! Configuration for the image pipeline.
//!
//! Two layers:
//! - [`CacheConfig`]: plain value used to build an [`ImageCache`](crate::cache::ImageCache)
//! - [`Cli`]: command-line arguments for the `image-pipeline` binary, parsed
//!   with clap, with environment variable fallbacks
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use image_pipeline::config::{Cli, Command};
//!
//! let cli = Cli::parse();
//! match cli.command {
//!     Command::Fetch(config) => println!("{} sources", config.sources.len()),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `IMAGE_PIPELINE_CACHE_ENTRIES` - Max cached images (default: 1000)
//! - `IMAGE_PIPELINE_CACHE_BYTES` - Max cached decoded bytes (default: 100 MiB)
//! - `IMAGE_PIPELINE_SCALE` - Scale assigned to loaded images (default: 1.0)
//! - `IMAGE_PIPELINE_DEVICE_PIXEL_RATIO` - Device pixel ratio hint
//! - `IMAGE_PIPELINE_TIMEOUT` - Per-image wait in seconds (default: 30)

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::cache::{DEFAULT_MAXIMUM_SIZE, DEFAULT_MAXIMUM_SIZE_BYTES};

// =============================================================================
// Default Values
// =============================================================================

/// Default number of times each source is resolved.
pub const DEFAULT_REPEAT: usize = 1;

/// Default image scale.
pub const DEFAULT_SCALE: f32 = 1.0;

/// Default wait for a single image, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Cache Configuration
// =============================================================================

/// Limits for an image cache.
///
/// A limit of 0 disables caching entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of cached images
    pub maximum_size: usize,

    /// Maximum total decoded size of cached images, in bytes
    pub maximum_size_bytes: usize,
}

impl CacheConfig {
    pub fn new(maximum_size: usize, maximum_size_bytes: usize) -> Self {
        Self {
            maximum_size,
            maximum_size_bytes,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAXIMUM_SIZE, DEFAULT_MAXIMUM_SIZE_BYTES)
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// Image Pipeline - resolve, decode and cache images.
#[derive(Parser, Debug, Clone)]
#[command(name = "image-pipeline")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Resolve images through a shared cache and report the results.
    Fetch(FetchConfig),
}

/// Output format for the fetch report.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON document
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct FetchConfig {
    /// Files or http(s) URLs to resolve.
    #[arg(required = true)]
    pub sources: Vec<String>,

    /// Resolve every source this many times through the same cache.
    #[arg(short, long, default_value_t = DEFAULT_REPEAT)]
    pub repeat: usize,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Maximum number of cached images (0 disables caching).
    #[arg(long, default_value_t = DEFAULT_MAXIMUM_SIZE, env = "IMAGE_PIPELINE_CACHE_ENTRIES")]
    pub cache_entries: usize,

    /// Maximum decoded bytes held by the cache (0 disables caching).
    #[arg(long, default_value_t = DEFAULT_MAXIMUM_SIZE_BYTES, env = "IMAGE_PIPELINE_CACHE_BYTES")]
    pub cache_bytes: usize,

    // =========================================================================
    // Image Configuration
    // =========================================================================
    /// Scale assigned to loaded images.
    #[arg(long, default_value_t = DEFAULT_SCALE, env = "IMAGE_PIPELINE_SCALE")]
    pub scale: f32,

    /// Device pixel ratio passed to providers.
    #[arg(long, env = "IMAGE_PIPELINE_DEVICE_PIXEL_RATIO")]
    pub device_pixel_ratio: Option<f32>,

    /// Extra HTTP header for network sources, as `Name: value`. Repeatable.
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Seconds to wait for each image before giving up.
    #[arg(long = "timeout", default_value_t = DEFAULT_TIMEOUT_SECS, env = "IMAGE_PIPELINE_TIMEOUT")]
    pub timeout_secs: u64,

    // =========================================================================
    // Output Configuration
    // =========================================================================
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl FetchConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.sources.iter().any(|s| s.trim().is_empty()) {
            return Err("sources must not be empty".to_string());
        }

        if self.repeat == 0 {
            return Err("repeat must be greater than 0".to_string());
        }

        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err("scale must be a positive number".to_string());
        }

        if let Some(ratio) = self.device_pixel_ratio {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err("device_pixel_ratio must be a positive number".to_string());
            }
        }

        if self.timeout_secs == 0 {
            return Err("timeout must be at least 1 second".to_string());
        }

        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new(self.cache_entries, self.cache_bytes)
    }
}

/// Parse a `Name: value` header argument.
pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("invalid header '{}', expected 'Name: value'", raw))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid header '{}', name is empty", raw));
    }

    Ok((name.to_string(), value.trim().to_string()))
}

// =============================================================================
// Tests
// =============================================================================
