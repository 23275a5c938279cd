//! Core data models for the marker lookup.

pub mod marker;
pub mod point;

pub use marker::{Marker, MarkerTable};
pub use point::GeoPoint;
