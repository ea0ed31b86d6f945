use clap::{Parser, Subcommand};
use ffws_web::Dataset;
use std::path::PathBuf;

/// PAGASA FFWS water-level and rainfall scraper.
#[derive(Debug, Parser)]
#[command(name = "ffws", version, about)]
pub struct Cli {
    /// YAML config file; defaults to `ffws.yaml` in the user config dir and
    /// the working directory.
    #[arg(long, global = true, env = "FFWS_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve both datasets as JSON over HTTP.
    Serve {
        /// Listen address, overriding `server.bind`.
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
    /// Scrape one dataset and print it.
    Fetch {
        /// `water-level` or `rainfall`.
        dataset: Dataset,

        /// Also save the records as CSV, to PATH or a timestamped file name.
        #[arg(long, value_name = "PATH", num_args = 0..=1)]
        csv: Option<Option<PathBuf>>,

        /// Print records as JSON instead of a markdown table.
        #[arg(long)]
        json: bool,
    },
}
