use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub boundaries: BoundaryConfig,
    pub tiles: TileConfig,
    pub urban: UrbanConfig,
    pub info: InfoConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BoundaryConfig {
    pub states: String, // URL or local path
    pub nation: String,
    pub states_object: String,
    pub nation_object: String,
    pub antimeridian_ids: Vec<u32>,
    pub bounds_padding: f64,
    pub timeout_secs: u64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            states: "https://unpkg.com/us-atlas@3/states-10m.json".to_string(),
            nation: "https://unpkg.com/us-atlas@3/nation-10m.json".to_string(),
            states_object: "states".to_string(),
            nation_object: "nation".to_string(),
            antimeridian_ids: vec![2],
            bounds_padding: 0.10,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TileConfig {
    pub url_template: String,
    pub subdomains: Vec<String>,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            subdomains: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            min_zoom: 3,
            max_zoom: 18,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UrbanConfig {
    pub query_url: String,
    pub timeout_secs: u64,
}

impl Default for UrbanConfig {
    fn default() -> Self {
        Self {
            query_url: "https://tigerweb.geo.census.gov/arcgis/rest/services/TIGERweb/Urban/MapServer/7/query"
                .to_string(),
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InfoConfig {
    /// Base URL of a remote `/eval` service. Unset means `serve` answers clicks in-process.
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

impl Default for InfoConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
