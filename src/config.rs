//! Optional TOML configuration shared by both binaries.
//!
//! ```toml
//! [data]
//! dir = "./data"
//!
//! [server]
//! listen = "0.0.0.0:3000"
//!
//! [report]
//! precision_threshold_m = 200.0
//! map_zoom = 15
//!
//! [defaults]
//! lat = 25.0480
//! lon = 121.5170
//! dms_lat = "25°2'53\"N"
//! dms_lon = "121°35'4\"E"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::dms::{Axis, Dms};
use crate::models::GeoPoint;
use crate::report::{ReportOptions, DEFAULT_MAP_ZOOM, DEFAULT_PRECISION_THRESHOLD_M};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub server: ServerConfig,
    pub report: ReportConfig,
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataConfig {
    pub dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./data"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReportConfig {
    /// Distances above this are reported as too far
    pub precision_threshold_m: f64,
    pub map_zoom: u8,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            precision_threshold_m: DEFAULT_PRECISION_THRESHOLD_M,
            map_zoom: DEFAULT_MAP_ZOOM,
        }
    }
}

/// Values pre-filled in the query form.
///
/// The decimal and DMS forms have independent defaults; the DMS pair is not
/// derived from `lat`/`lon`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DefaultsConfig {
    pub lat: f64,
    pub lon: f64,
    /// North latitude in any form `Dms::parse` accepts
    pub dms_lat: String,
    /// East longitude in any form `Dms::parse` accepts
    pub dms_lon: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            lat: 25.0480,
            lon: 121.5170,
            dms_lat: "25°2'53\"N".to_string(),
            dms_lon: "121°35'4\"E".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.report.precision_threshold_m.is_finite() || self.report.precision_threshold_m < 0.0
        {
            anyhow::bail!(
                "report.precision_threshold_m must be a non-negative number, got {}",
                self.report.precision_threshold_m
            );
        }
        GeoPoint::checked(self.defaults.lat, self.defaults.lon)
            .context("Invalid [defaults] coordinate")?;
        self.default_dms()?;
        Ok(())
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            precision_threshold_m: self.report.precision_threshold_m,
            map_zoom: self.report.map_zoom,
        }
    }

    pub fn default_point(&self) -> GeoPoint {
        GeoPoint::new(self.defaults.lat, self.defaults.lon)
    }

    /// `[latitude, longitude]` pre-filled in the DMS form
    pub fn default_dms(&self) -> Result<[Dms; 2]> {
        let lat = Dms::parse(Axis::Latitude, &self.defaults.dms_lat)
            .context("Invalid [defaults] dms_lat")?;
        let lon = Dms::parse(Axis::Longitude, &self.defaults.dms_lon)
            .context("Invalid [defaults] dms_lon")?;
        if lat.negative || lon.negative {
            anyhow::bail!("[defaults] DMS values must be north latitude and east longitude");
        }
        Ok([lat, lon])
    }
}
