use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use ffws_common::observability::init_logging;
use ffws_config::{FfwsConfig, FfwsConfigLoader};
use ffws_web::{Dataset, Scraper};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

mod cli;
mod display;
mod export;
mod server;
mod tether;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Config (env wins), then logging from it
    let cfg = load_config(cli.config.as_deref())?;
    let log_path = init_logging(tether::log_config(&cfg.logging))?;
    info!(target: "ffws", log = %log_path.display(), "ffws.start");

    let launcher = Arc::new(tether::chrome_launcher(&cfg));
    let scraper = Arc::new(tether::build_scraper(&cfg, launcher)?);

    match cli.command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
            server::serve(scraper, &bind).await
        }
        Command::Fetch { dataset, csv, json } => fetch(&scraper, dataset, csv, json).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<FfwsConfig> {
    let loader = match path {
        Some(path) => FfwsConfigLoader::new().with_file(path),
        None => FfwsConfigLoader::new().with_default_locations(),
    };
    loader.load().context("failed to load configuration")
}

async fn fetch(
    scraper: &Scraper,
    dataset: Dataset,
    csv: Option<Option<PathBuf>>,
    json: bool,
) -> Result<()> {
    let extraction = scraper
        .fetch(dataset)
        .await
        .with_context(|| format!("failed to fetch {} data", dataset.label()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&extraction.records)?);
    } else {
        print!("{}", display::render_table(dataset, &extraction));
    }

    if let Some(destination) = csv {
        let path = destination
            .unwrap_or_else(|| export::default_file_name(dataset, chrono::Local::now()));
        if export::export_csv(&extraction, &path)
            .with_context(|| format!("failed to write {}", path.display()))?
        {
            println!("\nData saved to {}", path.display());
        } else {
            println!("No data to save");
        }
    }
    Ok(())
}
