mod cache;
mod catalog;
mod commands;
mod config;
mod query;
mod sync;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::query::SortKey;

#[derive(Parser, Debug)]
#[command(name = "flick")]
#[command(about = "A command-line movie catalog browser with an offline-first cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/flick/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Mirror the entire remote catalog into the local cache
  Sync,
  /// Search the cached catalog offline
  Search {
    /// Title substring to match, case-insensitive
    #[arg(default_value = "")]
    query: String,

    /// Restrict to release years (repeatable)
    #[arg(long = "year")]
    years: Vec<String>,

    /// Restrict to genres (repeatable)
    #[arg(long = "genre")]
    genres: Vec<String>,

    /// Sort order: latest, rating or title
    #[arg(long, default_value = "latest")]
    sort: SortKey,

    /// Result page to show
    #[arg(long, default_value_t = 0)]
    page: usize,

    /// Results per page
    #[arg(long, default_value_t = 20)]
    limit: usize,

    /// Refresh matches from the remote search endpoint first
    #[arg(long)]
    remote: bool,
  },
  /// Fetch one page straight from the remote catalog
  Page {
    /// Page index, starting at 0
    #[arg(long, default_value_t = 0)]
    page: u32,

    /// Records per page
    #[arg(long, default_value_t = 20)]
    limit: u32,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let config = config::Config::load(args.config.as_deref())?;

  match args.command {
    Command::Sync => commands::sync(&config).await,
    Command::Search {
      query,
      years,
      genres,
      sort,
      page,
      limit,
      remote,
    } => commands::search(&config, &query, &years, &genres, sort, page, limit, remote).await,
    Command::Page { page, limit } => commands::page(&config, page, limit).await,
  }
}
