use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_PATH: &str = "config.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub map: MapConfig,
    pub locate: LocateConfig,
    pub timings: TimingsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub csv_dir: PathBuf,
    pub out_dir: PathBuf,
    pub html_name: String,
    pub png_name: String,
    pub geojson_name: String,
    pub width: u32,
    pub height: u32,
    /// Leaflet tile URL template
    pub tiles: String,
    pub tiles_attribution: String,
    pub snapshot: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            csv_dir: PathBuf::from("assets/csv"),
            out_dir: PathBuf::from("assets/img"),
            html_name: "trajectories.html".to_owned(),
            png_name: "trajectories.png".to_owned(),
            geojson_name: "trajectories.geojson".to_owned(),
            width: 1600,
            height: 900,
            tiles: "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png".to_owned(),
            tiles_attribution: "&copy; OpenStreetMap contributors &copy; CARTO".to_owned(),
            snapshot: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LocateConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub output: PathBuf,
}

impl Default for LocateConfig {
    fn default() -> Self {
        Self {
            api_url: "https://ipinfo.io".to_owned(),
            token: None,
            output: PathBuf::from("assets/csv/loc_ipv4.csv"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TimingsConfig {
    pub json_dir: PathBuf,
    pub key: String,
    pub utc_offset_hours: i32,
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self {
            json_dir: PathBuf::from("data"),
            key: "total_time".to_owned(),
            utc_offset_hours: 1,
        }
    }
}

pub fn load(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path).context("Failed to read config")?;
    let config = toml::from_str(&data).context("Failed to parse config")?;
    Ok(config)
}

/// Loads `path` when given, otherwise `config.toml` if it exists, otherwise the defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load(path),
        None if Path::new(DEFAULT_PATH).is_file() => load(Path::new(DEFAULT_PATH)),
        None => Ok(Config::default()),
    }
}
