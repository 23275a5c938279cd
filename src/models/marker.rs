//! Mileage markers and the immutable table they are searched in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::GeoPoint;

/// Label used for placemarks without a `<name>`
pub const UNNAMED: &str = "Unnamed";

/// A single mileage marker extracted from a KML placemark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Placemark name, e.g. "12K+300"
    pub label: String,
    pub lat: f64,
    pub lon: f64,
    /// File name the marker was read from, e.g. "National_Highway_1.kml"
    pub source: String,
}

impl Marker {
    pub fn new(label: impl Into<String>, lat: f64, lon: f64, source: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            lat,
            lon,
            source: source.into(),
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }

    /// Source file name without the `.kml` extension
    pub fn highway(&self) -> &str {
        strip_kml_suffix(&self.source)
    }
}

fn strip_kml_suffix(name: &str) -> &str {
    let len = name.len();
    if len > 4 && name.is_char_boundary(len - 4) && name[len - 4..].eq_ignore_ascii_case(".kml") {
        &name[..len - 4]
    } else {
        name
    }
}

/// Snapshot of every marker loaded from the data directory.
///
/// Never empty; never mutated after construction.
#[derive(Debug, Clone)]
pub struct MarkerTable {
    markers: Vec<Marker>,
    sources: Vec<String>,
    loaded_at: DateTime<Utc>,
}

impl MarkerTable {
    /// Returns `None` when there is nothing to search
    pub fn new(markers: Vec<Marker>) -> Option<Self> {
        if markers.is_empty() {
            return None;
        }

        let mut sources: Vec<String> = Vec::new();
        for marker in &markers {
            if !sources.contains(&marker.source) {
                sources.push(marker.source.clone());
            }
        }

        Some(Self {
            markers,
            sources,
            loaded_at: Utc::now(),
        })
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Files that contributed at least one marker, in table order
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highway_strips_extension() {
        let m = Marker::new("12K+300", 25.0, 121.0, "National_Highway_1.kml");
        assert_eq!(m.highway(), "National_Highway_1");

        let upper = Marker::new("1K", 25.0, 121.0, "HW3.KML");
        assert_eq!(upper.highway(), "HW3");

        let other = Marker::new("1K", 25.0, 121.0, "notes.txt");
        assert_eq!(other.highway(), "notes.txt");
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(MarkerTable::new(vec![]).is_none());
    }

    #[test]
    fn test_sources_deduplicated_in_order() {
        let table = MarkerTable::new(vec![
            Marker::new("a", 25.0, 121.0, "b.kml"),
            Marker::new("b", 25.1, 121.0, "b.kml"),
            Marker::new("c", 25.2, 121.0, "a.kml"),
        ])
        .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.sources(), &["b.kml".to_string(), "a.kml".to_string()]);
    }
}
