//! Error types shared by the loader, the lookup and coordinate parsing.

use std::path::PathBuf;

use thiserror::Error;

/// KML document could not be read as XML
#[derive(Debug, Error)]
pub enum KmlError {
    #[error("malformed XML at byte {position}: {message}")]
    Xml { position: u64, message: String },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read data directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("no KML files found in {0}")]
    NoFiles(PathBuf),

    #[error("no mileage markers could be loaded from {0}")]
    EmptyDataset(PathBuf),
}

#[derive(Debug, Error, PartialEq)]
pub enum LookupError {
    #[error("marker table is empty")]
    EmptyTable,
}

#[derive(Debug, Error, PartialEq)]
pub enum CoordError {
    #[error("latitude {0} is outside -90..=90")]
    Latitude(f64),

    #[error("longitude {0} is outside -180..=180")]
    Longitude(f64),

    #[error("{field} {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("seconds {0} must be at least 0 and below 60")]
    Seconds(f64),

    #[error("cannot parse DMS value {0:?}")]
    Malformed(String),
}
