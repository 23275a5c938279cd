//! Nearest mileage marker lookup.
//!
//! Candidates are ranked by squared distance in degree space, which is cheap
//! and monotonic with surface distance at highway scales. The geodesic
//! distance is computed once, for the winner only.

use geo::{Distance, Geodesic};
use serde::Serialize;
use tracing::debug;

use crate::error::LookupError;
use crate::models::{GeoPoint, Marker, MarkerTable};

/// The selected marker and its surface distance from the query
#[derive(Debug, Clone, Serialize)]
pub struct Nearest<'a> {
    pub marker: &'a Marker,
    /// Position of the marker in table order
    pub index: usize,
    pub distance_m: f64,
}

/// Geodesic distance in meters on the WGS-84 ellipsoid
pub fn geodesic_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    Geodesic.distance(a.to_geo(), b.to_geo())
}

/// Index of the marker closest to `query` in degree space.
///
/// Ties keep the earliest marker.
pub fn nearest_index(markers: &[Marker], query: GeoPoint) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (i, marker) in markers.iter().enumerate() {
        let d = query.degree_distance_sq(&marker.point());
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((i, d)),
        }
    }

    best.map(|(i, _)| i)
}

/// Find the nearest marker and its geodesic distance
pub fn find_nearest(markers: &[Marker], query: GeoPoint) -> Result<Nearest<'_>, LookupError> {
    let index = nearest_index(markers, query).ok_or(LookupError::EmptyTable)?;
    let marker = &markers[index];
    let distance_m = geodesic_distance(query, marker.point());

    debug!(
        "Nearest to ({}) is '{}' from {} at {:.1} m",
        query, marker.label, marker.source, distance_m
    );

    Ok(Nearest {
        marker,
        index,
        distance_m,
    })
}

impl MarkerTable {
    /// Nearest marker in this table. Tables are never empty, so this only
    /// fails if that invariant is broken.
    pub fn nearest(&self, query: GeoPoint) -> Result<Nearest<'_>, LookupError> {
        find_nearest(self.markers(), query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> Vec<Marker> {
        vec![
            Marker::new("0K+000", 25.0480, 121.5170, "HW1.kml"),
            Marker::new("10K+000", 25.1000, 121.6000, "HW1.kml"),
            Marker::new("20K+000", 24.9000, 121.3000, "HW3.kml"),
        ]
    }

    #[test]
    fn test_selects_closest_of_three() {
        let table = markers();
        let result = find_nearest(&table, GeoPoint::new(25.0950, 121.5900)).unwrap();
        assert_eq!(result.marker.label, "10K+000");
        assert_eq!(result.index, 1);

        let result = find_nearest(&table, GeoPoint::new(24.9100, 121.3200)).unwrap();
        assert_eq!(result.marker.label, "20K+000");
    }

    #[test]
    fn test_result_is_member_of_table() {
        let table = markers();
        let queries = [
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(-45.0, -170.0),
            GeoPoint::new(25.05, 121.52),
            GeoPoint::new(89.0, 179.0),
        ];
        for q in queries {
            let result = find_nearest(&table, q).unwrap();
            assert!(table.iter().any(|m| m == result.marker));
            assert_eq!(&table[result.index], result.marker);
        }
    }

    #[test]
    fn test_coincident_query_has_zero_distance() {
        let table = markers();
        let result = find_nearest(&table, GeoPoint::new(25.0480, 121.5170)).unwrap();
        assert_eq!(result.marker.label, "0K+000");
        assert!(result.distance_m.abs() < 1e-6);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = GeoPoint::new(25.0480, 121.5170);
        let b = GeoPoint::new(24.9000, 121.3000);
        let ab = geodesic_distance(a, b);
        let ba = geodesic_distance(b, a);
        assert!((ab - ba).abs() < 1e-6);
        assert!(ab > 0.0);
    }

    #[test]
    fn test_known_distance() {
        // One degree of latitude at the equator is about 110.57 km on WGS-84
        let d = geodesic_distance(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        assert!((d - 110_574.0).abs() < 5.0, "got {}", d);
    }

    #[test]
    fn test_ties_keep_first_marker() {
        let table = vec![
            Marker::new("first", 24.0, 121.0, "a.kml"),
            Marker::new("second", 24.0, 121.0, "b.kml"),
            Marker::new("mirror", 24.5, 121.0, "b.kml"),
        ];
        let result = find_nearest(&table, GeoPoint::new(24.25, 121.0)).unwrap();
        assert_eq!(result.marker.label, "first");
    }

    #[test]
    fn test_empty_table_errors() {
        assert_eq!(
            find_nearest(&[], GeoPoint::new(25.0, 121.0)).unwrap_err(),
            LookupError::EmptyTable
        );
    }

    #[test]
    fn test_table_nearest() {
        let table = MarkerTable::new(markers()).unwrap();
        let result = table.nearest(GeoPoint::new(25.0481, 121.5171)).unwrap();
        assert_eq!(result.marker.label, "0K+000");
        assert!(result.distance_m < 20.0);
    }
}
