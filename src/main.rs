mod config;
mod error;
mod input;
mod pipeline;
mod processor;
mod provider;
mod providers;
mod query;
mod renamer;
mod walker;

use crate::config::AppConfig;
use crate::input::{Cli, RunInput};
use crate::providers::BingProvider;
use anyhow::{Context, Result};
use clap::Parser;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {:?}", cli.config))?;

    // Initialize env_logger based on config.log_level
    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting image_dataset");

    let delimiter = cli.delimiter.clone().unwrap_or_else(|| config.delimiter.clone());
    let input = {
        let stdin = std::io::stdin();
        RunInput::resolve(&cli, &delimiter, &mut stdin.lock(), &mut std::io::stdout())?
    };

    let crop = if cli.no_crop { None } else { config.crop_settings() };
    match crop {
        Some(c) => info!("Crop stage enabled: {}px at {}%", c.target_pixels, c.scale_percent),
        None => info!("Crop stage disabled"),
    }

    let provider = BingProvider::new(&config.provider)?;
    let summary = pipeline::run(&config.parent_directory, &input, &provider, crop).await?;

    for report in &summary.reports {
        match &report.acquisition_error {
            Some(e) => log::warn!("{}: acquisition failed ({})", report.query, e),
            None => info!(
                "{}: {} downloaded, {} renamed, {} cropped, {} not cropped",
                report.query, report.downloaded, report.renamed, report.cropped, report.crop_skipped
            ),
        }
    }
    let failed = summary.failed_queries();
    if !failed.is_empty() {
        log::warn!("Queries without downloads: {}", failed.join(", "));
    }

    info!("image_dataset finished: {} images in {:?}", summary.total_renamed(), config.parent_directory);

    Ok(())
}
