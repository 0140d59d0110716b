//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the tide-config.toml file.
//! It holds the WorldTides connection parameters: API key, reference point, vertical
//! datum, station search radius, prediction length and plot styling.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// API version, used directly in the request path
pub const SERVER_API_VERSION: &str = "v3";

/// Default WorldTides endpoint root
pub const DEFAULT_BASE_URL: &str = "https://www.worldtides.info/api";

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "tide-config.toml";

/// Unit the API uses for heights and for the plot axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotUnit {
    Feet,
    Meters,
}

impl fmt::Display for PlotUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlotUnit::Feet => f.write_str("feet"),
            PlotUnit::Meters => f.write_str("meters"),
        }
    }
}

/// Parameters sent with every request.
///
/// Everything is fixed at construction except the reference point, which can be
/// moved with [`ServerParameters::change_ref_point`]. Two parameter sets compare
/// equal when a new fetch would produce the same request.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerParameters {
    version: String,
    key: String,
    lat: f64,
    lon: f64,
    vertical_ref: String,
    station_distance: u32,
    prediction_duration: u32,
    plot_color: String,
    plot_background: String,
    units: PlotUnit,
}

impl ServerParameters {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        key: impl Into<String>,
        lat: f64,
        lon: f64,
        vertical_ref: impl Into<String>,
        station_distance: u32,
        prediction_duration: u32,
        plot_color: impl Into<String>,
        plot_background: impl Into<String>,
        units: PlotUnit,
    ) -> Self {
        ServerParameters {
            version: SERVER_API_VERSION.to_string(),
            key: key.into(),
            lat,
            lon,
            vertical_ref: vertical_ref.into(),
            station_distance,
            prediction_duration,
            plot_color: plot_color.into(),
            plot_background: plot_background.into(),
            units,
        }
    }

    /// Compare against another parameter set, logging the reference point
    /// of both when they differ.
    pub fn same_as(&self, other: &ServerParameters) -> bool {
        if self == other {
            return true;
        }
        debug!(
            recorded = other.lat,
            expected = self.lat,
            "parameter differ: latitude"
        );
        debug!(
            recorded = other.lon,
            expected = self.lon,
            "parameter differ: longitude"
        );
        false
    }

    /// Move the reference point; the next fetch uses the new coordinates.
    pub fn change_ref_point(&mut self, lat: f64, lon: f64) {
        self.lat = lat;
        self.lon = lon;
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn latitude(&self) -> f64 {
        self.lat
    }

    pub fn longitude(&self) -> f64 {
        self.lon
    }

    pub fn vertical_ref(&self) -> &str {
        &self.vertical_ref
    }

    /// Station search radius in kilometres
    pub fn station_distance(&self) -> u32 {
        self.station_distance
    }

    /// Prediction length in days
    pub fn prediction_duration(&self) -> u32 {
        self.prediction_duration
    }

    pub fn plot_color(&self) -> &str {
        &self.plot_color
    }

    pub fn plot_background(&self) -> &str {
        &self.plot_background
    }

    pub fn units(&self) -> PlotUnit {
        self.units
    }
}

/// Application configuration loaded from tide-config.toml
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// WorldTides server configuration
    pub server: ServerConfig,
}

/// WorldTides server configuration
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// API key from worldtides.info
    pub key: String,
    /// Reference latitude in decimal degrees
    pub lat: f64,
    /// Reference longitude in decimal degrees
    pub lon: f64,
    /// Vertical datum for the heights (e.g. "LAT", "MSL", "CD")
    pub vertical_ref: String,
    /// Radius in km to search for tide stations
    pub station_distance: u32,
    /// Number of days of prediction to request (one extra day is always added)
    pub prediction_duration: u32,
    /// Plot curve color as "r,g,b"
    pub plot_color: String,
    /// Plot background color as "r,g,b"
    pub plot_background: String,
    /// Unit for heights and plot
    pub units: PlotUnit,
    /// Endpoint root, without the version segment
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            key: String::new(),
            lat: 0.0,
            lon: 0.0,
            vertical_ref: "LAT".to_string(), // Lowest Astronomic Tide
            station_distance: 20,
            prediction_duration: 1,
            plot_color: "2,102,255".to_string(),
            plot_background: "255,255,255".to_string(),
            units: PlotUnit::Feet,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from tide-config.toml file
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        lat = config.server.lat,
                        lon = config.server.lon,
                        "loaded configuration"
                    );
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "invalid config file format, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "no config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Save current configuration to the given path
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }

    /// Build the request parameters described by this configuration.
    pub fn server_parameters(&self) -> ServerParameters {
        let s = &self.server;
        ServerParameters::new(
            s.key.clone(),
            s.lat,
            s.lon,
            s.vertical_ref.clone(),
            s.station_distance,
            s.prediction_duration,
            s.plot_color.clone(),
            s.plot_background.clone(),
            s.units,
        )
    }
}
