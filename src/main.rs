//! Image Pipeline - resolve images through a shared cache.
//!
//! This binary wires the CLI configuration to an [`ImageResolver`] and reports
//! what each resolution produced.

use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_pipeline::{
    config::{Cli, Command, FetchConfig, OutputFormat},
    CacheStats, FileImage, ImageCache, ImageConfiguration, ImageResolver, ImageStream,
    NetworkImage,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Fetch(config) => run_fetch(config).await,
    }
}

// =============================================================================
// Fetch Command
// =============================================================================

/// A CLI source mapped to its provider.
enum Source {
    Network(NetworkImage),
    File(FileImage),
}

impl Source {
    fn from_arg(arg: &str, config: &FetchConfig, client: &reqwest::Client) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            let image = config.headers.iter().fold(
                NetworkImage::new(arg)
                    .with_scale(config.scale)
                    .with_client(client.clone()),
                |image, (name, value)| image.with_header(name.clone(), value.clone()),
            );
            Source::Network(image)
        } else {
            Source::File(FileImage::new(arg).with_scale(config.scale))
        }
    }

    fn resolve(&self, resolver: &ImageResolver, configuration: &ImageConfiguration) -> ImageStream {
        match self {
            Source::Network(image) => resolver.resolve(image, configuration),
            Source::File(image) => resolver.resolve(image, configuration),
        }
    }
}

/// Outcome of resolving one source once.
#[derive(Debug, Serialize)]
struct FetchResult {
    source: String,
    round: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scale: Option<f32>,
    /// Delivered while the listener was being added (already cached)
    synchronous: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct FetchReport {
    results: Vec<FetchResult>,
    cache: CacheStats,
}

async fn run_fetch(config: FetchConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let cache_config = config.cache_config();
    info!(
        "Cache: {} images, {} bytes",
        cache_config.maximum_size, cache_config.maximum_size_bytes
    );

    let timeout = Duration::from_secs(config.timeout_secs);
    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let resolver = ImageResolver::new(Arc::new(ImageCache::from_config(&cache_config)));
    let mut configuration = ImageConfiguration::empty();
    if let Some(ratio) = config.device_pixel_ratio {
        configuration = configuration.with_device_pixel_ratio(ratio);
    }

    let sources: Vec<(String, Source)> = config
        .sources
        .iter()
        .map(|arg| (arg.clone(), Source::from_arg(arg, &config, &client)))
        .collect();

    let mut results = Vec::new();
    for round in 1..=config.repeat {
        let streams: Vec<(&str, ImageStream)> = sources
            .iter()
            .map(|(arg, source)| (arg.as_str(), source.resolve(&resolver, &configuration)))
            .collect();
        debug!(round, streams = streams.len(), "Resolved sources");

        for (arg, stream) in streams {
            results.push(wait_for(arg, round, stream, timeout).await);
        }
    }

    let failed = results.iter().filter(|r| r.error.is_some()).count();
    let report = FetchReport {
        results,
        cache: resolver.cache().stats(),
    };

    match config.format {
        OutputFormat::Text => print_text(&report),
        OutputFormat::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }

    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn wait_for(source: &str, round: usize, stream: ImageStream, timeout: Duration) -> FetchResult {
    let mut result = FetchResult {
        source: source.to_string(),
        round,
        width: None,
        height: None,
        size_bytes: None,
        scale: None,
        synchronous: false,
        error: None,
    };

    match tokio::time::timeout(timeout, stream.next_image()).await {
        Ok(Ok((info, synchronous))) => {
            result.width = Some(info.image().width());
            result.height = Some(info.image().height());
            result.size_bytes = Some(info.size_bytes());
            result.scale = Some(info.scale());
            result.synchronous = synchronous;
        }
        Ok(Err(e)) => result.error = Some(e.to_string()),
        Err(_) => result.error = Some(format!("timed out after {}s", timeout.as_secs())),
    }

    result
}

fn print_text(report: &FetchReport) {
    for r in &report.results {
        match (&r.error, r.width, r.height, r.size_bytes) {
            (None, Some(width), Some(height), Some(size)) => println!(
                "✓ [{}] {} {}x{} {} bytes{}",
                r.round,
                r.source,
                width,
                height,
                size,
                if r.synchronous { " (cached)" } else { "" }
            ),
            (Some(e), ..) => println!("✗ [{}] {} {}", r.round, r.source, e),
            _ => println!("? [{}] {}", r.round, r.source),
        }
    }
    println!();
    println!("{}", report.cache);
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "image_pipeline=debug"
    } else {
        "image_pipeline=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
