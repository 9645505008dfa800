use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tvdb_episodes::{Config, Episode, open_catalog};

/// Look up and cache complete TV series episode lists from TheTVDB
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every episode of a series
    Episodes {
        /// TheTVDB series ID
        series_id: String,

        /// Ignore the cache and fetch from TheTVDB
        #[arg(short, long)]
        refresh: bool,

        /// Print the episodes as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove cached episodes for one series, or for all series
    Clear {
        /// TheTVDB series ID; clears everything when omitted
        series_id: Option<String>,
    },
}

fn print_episodes(episodes: &[Episode]) {
    if episodes.is_empty() {
        println!("No episodes found.");
        return;
    }

    for episode in episodes {
        let air_date = if episode.air_date.is_empty() {
            "unaired"
        } else {
            episode.air_date.as_str()
        };
        println!(
            "S{:02}E{:02}  {}  ({})",
            episode.season_number, episode.episode_number, episode.episode_name, air_date
        );
    }
    println!("\n{} episode(s)", episodes.len());
}

/// A blank series ID means "every series"
fn clear_target(series_id: Option<&str>) -> Option<&str> {
    series_id.map(str::trim).filter(|id| !id.is_empty())
}

fn cleared_message(series_id: Option<&str>) -> String {
    match series_id {
        Some(id) => format!("Cleared cached episodes for series {}", id),
        None => "Cleared all cached episodes".to_string(),
    }
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays usable for --json
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let mut catalog = match open_catalog(&config) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    match cli.command {
        Command::Episodes {
            series_id,
            refresh,
            json,
        } => {
            let Some(episodes) = catalog.get_series_episodes(&series_id, refresh) else {
                eprintln!("Error: series ID must not be empty");
                process::exit(2);
            };

            if json {
                match serde_json::to_string_pretty(&episodes) {
                    Ok(output) => println!("{}", output),
                    Err(e) => {
                        eprintln!("Error: failed to serialize episodes: {}", e);
                        process::exit(1);
                    }
                }
            } else {
                print_episodes(&episodes);
            }
        }
        Command::Clear { series_id } => {
            let series_id = clear_target(series_id.as_deref());
            if !catalog.clear_cache(series_id) {
                eprintln!("Error: failed to clear the episode cache");
                process::exit(1);
            }
            println!("{}", cleared_message(series_id));
        }
    }
}
