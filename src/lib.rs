//! Milepost - nearest highway mileage marker lookup over KML placemarks
//!
//! This library provides shared types and modules for the query server and
//! the one-shot lookup binary.

pub mod config;
pub mod dms;
pub mod error;
pub mod kml;
pub mod lookup;
pub mod models;
pub mod report;

pub use error::{CoordError, KmlError, LoadError, LookupError};
pub use lookup::{find_nearest, geodesic_distance, Nearest};
pub use models::{GeoPoint, Marker, MarkerTable};
