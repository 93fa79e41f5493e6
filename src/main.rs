pub mod types;
pub mod config;
pub mod states;
pub mod topology;
pub mod antimeridian;
pub mod data;
pub mod hit;
pub mod tiles;
pub mod urban;
pub mod info;
pub mod error;
pub mod server;

#[cfg(test)]
mod fixtures;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the map viewer and the /eval endpoint
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Resolve one coordinate to a state and print its popup
    Inspect {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Base URL of the /eval service (defaults to the configured server)
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Write the prepared state boundaries as GeoJSON
    Export {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            let app_config = config::AppConfig::load_from_file(&config)?;
            server::start_server(app_config).await?;
        }
        Commands::Inspect { config, lat, lng, endpoint } => {
            let app_config = config::AppConfig::load_from_file(&config)?;
            inspect(&app_config, types::ClickPoint::new(lng, lat), endpoint).await?;
        }
        Commands::Export { config, output } => {
            let app_config = config::AppConfig::load_from_file(&config)?;
            let boundaries = data::load_boundaries(&app_config.boundaries).await?;
            let collection = data::to_feature_collection(&boundaries.states);
            let json = serde_json::to_string(&collection)?;
            std::fs::write(&output, json)
                .with_context(|| format!("Failed to write {:?}", output))?;
            println!("Wrote {} states to {:?}", boundaries.states.len(), output);
        }
    }

    Ok(())
}

async fn inspect(app_config: &config::AppConfig, click: types::ClickPoint, endpoint: Option<String>) -> Result<()> {
    let boundaries = data::load_boundaries(&app_config.boundaries).await?;
    let hits = hit::HitTester::new(boundaries);

    let Some(state) = hits.locate(click) else {
        println!("No state at {}, {}", click.lat, click.lng);
        return Ok(());
    };

    let zoom = app_config.tiles.max_zoom.min(tiles::MAX_ZOOM);
    let (x, y) = tiles::lat_lng_to_tile(click.lat, click.lng, zoom);
    println!("{} (FIPS {})", state.name, states::padded(state.fips));
    println!("Tile: {}", tiles::TileUrls::new(&app_config.tiles).url(zoom, x, y));

    let endpoint = endpoint
        .or_else(|| app_config.info.endpoint.clone())
        .unwrap_or_else(|| format!("http://{}:{}", app_config.server.host, app_config.server.port));
    let client = info::EvalClient::new(&endpoint, app_config.info.timeout_secs)?;

    match info::open_popup(&client, state, click).await {
        Some(popup) => println!("{}", popup.to_text()),
        None => println!("No info available from {}", endpoint),
    }
    Ok(())
}
