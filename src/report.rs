//! Result panel for a lookup: highway, marker, distance, verdict and map.

use serde::Serialize;
use url::Url;

use crate::dms::{Axis, Dms};
use crate::lookup::Nearest;
use crate::models::GeoPoint;

pub const DEFAULT_PRECISION_THRESHOLD_M: f64 = 200.0;
pub const DEFAULT_MAP_ZOOM: u8 = 15;

const QUERY_COLOR: &str = "#ff0000";
const MARKER_COLOR: &str = "#0000ff";
const POINT_SIZE: u32 = 20;

/// Whether the marker is close enough to trust as the query's mileage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Precise,
    TooFar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MapRole {
    Query,
    Marker,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapPoint {
    pub role: MapRole,
    pub lat: f64,
    pub lon: f64,
    pub color: &'static str,
    pub size: u32,
}

/// Query point and selected marker, rendered together
#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub points: [MapPoint; 2],
    pub zoom: u8,
}

impl MapView {
    pub fn new(query: GeoPoint, marker: GeoPoint, zoom: u8) -> Self {
        Self {
            points: [
                MapPoint {
                    role: MapRole::Query,
                    lat: query.lat,
                    lon: query.lon,
                    color: QUERY_COLOR,
                    size: POINT_SIZE,
                },
                MapPoint {
                    role: MapRole::Marker,
                    lat: marker.lat,
                    lon: marker.lon,
                    color: MARKER_COLOR,
                    size: POINT_SIZE,
                },
            ],
            zoom,
        }
    }

    pub fn query(&self) -> &MapPoint {
        &self.points[0]
    }

    pub fn marker(&self) -> &MapPoint {
        &self.points[1]
    }
}

/// Knobs for building a report
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub precision_threshold_m: f64,
    pub map_zoom: u8,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            precision_threshold_m: DEFAULT_PRECISION_THRESHOLD_M,
            map_zoom: DEFAULT_MAP_ZOOM,
        }
    }
}

/// Everything shown to the user after a lookup
#[derive(Debug, Clone, Serialize)]
pub struct LookupReport {
    pub query: GeoPoint,
    pub query_dms: [String; 2],
    /// Source file name with `.kml` removed
    pub highway: String,
    pub marker: String,
    pub marker_point: GeoPoint,
    pub distance_m: f64,
    pub distance_text: String,
    pub verdict: Verdict,
    pub message: String,
    pub maps_url: String,
    pub map: MapView,
}

impl LookupReport {
    pub fn build(query: GeoPoint, nearest: &Nearest<'_>, options: &ReportOptions) -> Self {
        let marker = nearest.marker;
        let distance_m = nearest.distance_m;

        let (verdict, message) = if distance_m > options.precision_threshold_m {
            (
                Verdict::TooFar,
                format!(
                    "Too far: your coordinate is more than {:.0} m from \"{}\".",
                    distance_m, marker.label
                ),
            )
        } else {
            (
                Verdict::Precise,
                format!("Precise match: the nearest marker is {}.", marker.label),
            )
        };

        Self {
            query,
            query_dms: [
                Dms::from_decimal(query.lat).display(Axis::Latitude),
                Dms::from_decimal(query.lon).display(Axis::Longitude),
            ],
            highway: marker.highway().to_string(),
            marker: marker.label.clone(),
            marker_point: marker.point(),
            distance_m,
            distance_text: format_distance(distance_m),
            verdict,
            message,
            maps_url: google_maps_url(query),
            map: MapView::new(query, marker.point(), options.map_zoom),
        }
    }
}

/// `123.4 m`
pub fn format_distance(meters: f64) -> String {
    format!("{:.1} m", meters)
}

const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/";

/// Google Maps search link centered on a coordinate, `query=<lat>,<lon>`
/// with the comma left literal
pub fn google_maps_url(point: GeoPoint) -> String {
    let query = format!("api=1&query={},{}", point.lat, point.lon);
    match Url::parse(MAPS_SEARCH_URL) {
        Ok(mut url) => {
            url.set_query(Some(&query));
            url.into()
        }
        Err(_) => format!("{}?{}", MAPS_SEARCH_URL, query),
    }
}
