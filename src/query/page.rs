//! HTML rendering for the lookup form and the result panel.

use std::fmt::Write;

use askama::Template;
use serde::Deserialize;

use milepost::dms::{Axis, Dms};
use milepost::report::{google_maps_url, LookupReport, MapView, Verdict};
use milepost::{GeoPoint, MarkerTable};

/// Coordinate input format selected in the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Decimal,
    Dms,
}

impl InputMode {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("dms") => InputMode::Dms,
            _ => InputMode::Decimal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputMode::Decimal => "dd",
            InputMode::Dms => "dms",
        }
    }
}

/// Raw form fields; everything is text so bad input can be shown back
#[derive(Debug, Default, Deserialize)]
pub struct FormParams {
    pub mode: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub lat_deg: Option<String>,
    pub lat_min: Option<String>,
    pub lat_sec: Option<String>,
    pub lon_deg: Option<String>,
    pub lon_min: Option<String>,
    pub lon_sec: Option<String>,
}

/// Form values after defaults are applied, ready to render
#[derive(Debug, Clone)]
pub struct FormState {
    pub mode: InputMode,
    pub lat: String,
    pub lon: String,
    pub lat_dms: [String; 3],
    pub lon_dms: [String; 3],
}

/// Values shown in an untouched form
#[derive(Debug, Clone, Copy)]
pub struct FormDefaults {
    pub point: GeoPoint,
    pub lat_dms: Dms,
    pub lon_dms: Dms,
}

impl FormState {
    pub fn from_params(params: &FormParams, defaults: &FormDefaults) -> Self {
        let pick = |value: &Option<String>, fallback: String| -> String {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or(fallback)
        };
        let dms_fields = |fields: [&Option<String>; 3], dms: &Dms| -> [String; 3] {
            [
                pick(fields[0], dms.degrees.to_string()),
                pick(fields[1], dms.minutes.to_string()),
                pick(fields[2], format!("{:.2}", dms.seconds)),
            ]
        };

        Self {
            mode: InputMode::parse(params.mode.as_deref()),
            lat: pick(&params.lat, format!("{:.6}", defaults.point.lat)),
            lon: pick(&params.lon, format!("{:.6}", defaults.point.lon)),
            lat_dms: dms_fields(
                [&params.lat_deg, &params.lat_min, &params.lat_sec],
                &defaults.lat_dms,
            ),
            lon_dms: dms_fields(
                [&params.lon_deg, &params.lon_min, &params.lon_sec],
                &defaults.lon_dms,
            ),
        }
    }

    pub fn is_dms(&self) -> bool {
        self.mode == InputMode::Dms
    }

    /// Turn the current fields into a validated query point
    pub fn resolve(&self) -> Result<GeoPoint, String> {
        match self.mode {
            InputMode::Decimal => {
                let lat = parse_number("Latitude", &self.lat)?;
                let lon = parse_number("Longitude", &self.lon)?;
                GeoPoint::checked(lat, lon).map_err(|e| e.to_string())
            }
            InputMode::Dms => {
                let lat = dms_from_fields(Axis::Latitude, &self.lat_dms)?;
                let lon = dms_from_fields(Axis::Longitude, &self.lon_dms)?;
                GeoPoint::checked(lat.to_decimal(), lon.to_decimal()).map_err(|e| e.to_string())
            }
        }
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("{} must be a number, got \"{}\"", field, value))
}

fn dms_from_fields(axis: Axis, fields: &[String; 3]) -> Result<Dms, String> {
    let name = match axis {
        Axis::Latitude => "Latitude",
        Axis::Longitude => "Longitude",
    };
    let degrees: u16 = parse_number(&format!("{} degrees", name), &fields[0])?;
    let minutes: u8 = parse_number(&format!("{} minutes", name), &fields[1])?;
    let seconds: f64 = parse_number(&format!("{} seconds", name), &fields[2])?;
    Dms::new(axis, degrees, minutes, seconds).map_err(|e| format!("{}: {}", name, e))
}

/// What the page shows below the form
pub enum Outcome<'a> {
    Empty,
    Error(&'a str),
    Result(&'a LookupReport),
}

/// Result panel of a successful lookup
pub struct ResultPanel<'a> {
    pub report: &'a LookupReport,
    /// `success` or `warning`
    pub notice: &'static str,
    pub map_svg: String,
}

#[derive(Template)]
#[template(path = "lookup.html")]
pub struct LookupPage<'a> {
    pub form: &'a FormState,
    pub marker_count: usize,
    pub source_count: usize,
    /// Decimal echo of a DMS query
    pub converted: Option<String>,
    pub maps_url: Option<String>,
    pub error: Option<&'a str>,
    pub result: Option<ResultPanel<'a>>,
}

impl<'a> LookupPage<'a> {
    /// `query` is set when the form was submitted and the input resolved
    pub fn new(
        form: &'a FormState,
        table: &MarkerTable,
        query: Option<GeoPoint>,
        outcome: Outcome<'a>,
    ) -> Self {
        let converted = query
            .filter(|_| form.is_dms())
            .map(|q| format!("{:.6}, {:.6}", q.lat, q.lon));

        let (error, result) = match outcome {
            Outcome::Empty => (None, None),
            Outcome::Error(message) => (Some(message), None),
            Outcome::Result(report) => (
                None,
                Some(ResultPanel {
                    report,
                    notice: match report.verdict {
                        Verdict::Precise => "success",
                        Verdict::TooFar => "warning",
                    },
                    map_svg: render_map_svg(&report.map),
                }),
            ),
        };

        Self {
            form,
            marker_count: table.len(),
            source_count: table.sources().len(),
            converted,
            maps_url: query.map(google_maps_url),
            error,
            result,
        }
    }
}

const MAP_WIDTH: f64 = 480.0;
const MAP_HEIGHT: f64 = 320.0;
const MAP_PADDING: f64 = 40.0;
/// Smallest span drawn, roughly 100 m, so coincident points stay visible
const MIN_SPAN_DEG: f64 = 0.001;

/// Two-point map as inline SVG, equirectangular around the midpoint
pub fn render_map_svg(map: &MapView) -> String {
    let q = map.query();
    let m = map.marker();

    let mid_lat = (q.lat + m.lat) / 2.0;
    let lon_scale = mid_lat.to_radians().cos().max(0.01);

    let min_x = q.lon.min(m.lon) * lon_scale;
    let max_x = q.lon.max(m.lon) * lon_scale;
    let min_y = q.lat.min(m.lat);
    let max_y = q.lat.max(m.lat);

    let span = (max_x - min_x).max(max_y - min_y).max(MIN_SPAN_DEG);
    let center_x = (min_x + max_x) / 2.0;
    let center_y = (min_y + max_y) / 2.0;
    let scale = (MAP_WIDTH.min(MAP_HEIGHT) - 2.0 * MAP_PADDING) / span;

    let project = |lat: f64, lon: f64| -> (f64, f64) {
        let x = MAP_WIDTH / 2.0 + (lon * lon_scale - center_x) * scale;
        let y = MAP_HEIGHT / 2.0 - (lat - center_y) * scale;
        (x, y)
    };

    let (qx, qy) = project(q.lat, q.lon);
    let (mx, my) = project(m.lat, m.lon);

    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" role=\"img\">",
        w = MAP_WIDTH,
        h = MAP_HEIGHT
    );
    let _ = write!(
        svg,
        "<rect width=\"{}\" height=\"{}\" fill=\"#f3f3f0\" stroke=\"#ccc\"/>",
        MAP_WIDTH, MAP_HEIGHT
    );
    let _ = write!(
        svg,
        "<line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"#888\" stroke-dasharray=\"4 4\"/>",
        qx, qy, mx, my
    );
    for (point, (x, y), title) in [(q, (qx, qy), "Your coordinate"), (m, (mx, my), "Marker")] {
        let _ = write!(
            svg,
            "<circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"{}\" fill=\"{}\" fill-opacity=\"0.7\"><title>{} ({:.6}, {:.6})</title></circle>",
            x,
            y,
            point.size as f64 / 2.0,
            point.color,
            title,
            point.lat,
            point.lon
        );
    }
    svg.push_str("</svg>");
    svg
}
