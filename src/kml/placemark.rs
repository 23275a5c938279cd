//! Placemark extraction from KML documents.

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::error::KmlError;
use crate::models::marker::UNNAMED;
use crate::models::{GeoPoint, Marker};

/// Which text we are currently collecting inside a placemark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    None,
    Name,
    Coordinates,
}

/// Partially read `<Placemark>`
#[derive(Debug, Default)]
struct PendingPlacemark {
    name: Option<String>,
    coordinates: Option<String>,
}

impl PendingPlacemark {
    fn finish(self, source: &str) -> Option<Marker> {
        let label = match self.name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => UNNAMED.to_string(),
        };

        let Some(text) = self.coordinates else {
            debug!("Placemark '{}' has no coordinates, skipping", label);
            return None;
        };

        match parse_coordinate_pair(&text) {
            Some((lat, lon)) => Some(Marker::new(label, lat, lon, source)),
            None => {
                debug!(
                    "Placemark '{}' has unusable coordinates {:?}, skipping",
                    label,
                    text.trim()
                );
                None
            }
        }
    }
}

/// Parse the first `lon,lat[,alt]` tuple of a `<coordinates>` body.
///
/// Returns `(lat, lon)`, or `None` unless both are finite and on the globe.
pub fn parse_coordinate_pair(text: &str) -> Option<(f64, f64)> {
    let first = text.split_whitespace().next()?;
    let mut parts = first.split(',');

    let lon: f64 = parts.next()?.trim().parse().ok()?;
    let lat: f64 = parts.next()?.trim().parse().ok()?;

    let point = GeoPoint::checked(lat, lon).ok()?;
    Some((point.lat, point.lon))
}

/// Extract every usable placemark from a KML document.
///
/// Placemarks with missing or broken coordinates are skipped one by one;
/// only a document that is not well-formed XML fails as a whole.
pub fn parse_placemarks(content: &str, source: &str) -> Result<Vec<Marker>, KmlError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut markers = Vec::new();
    let mut current: Option<PendingPlacemark> = None;
    let mut capture = Capture::None;
    let mut buffer = String::new();

    loop {
        let event = reader.read_event().map_err(|e| KmlError::Xml {
            position: reader.buffer_position() as u64,
            message: e.to_string(),
        })?;

        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"Placemark" => {
                    current = Some(PendingPlacemark::default());
                    capture = Capture::None;
                }
                b"name" => {
                    if let Some(pm) = &current {
                        if pm.name.is_none() && capture == Capture::None {
                            capture = Capture::Name;
                            buffer.clear();
                        }
                    }
                }
                b"coordinates" => {
                    if let Some(pm) = &current {
                        if pm.coordinates.is_none() && capture == Capture::None {
                            capture = Capture::Coordinates;
                            buffer.clear();
                        }
                    }
                }
                _ => {}
            },
            Event::Empty(e) => {
                // <name/> counts as a present but empty name
                if e.local_name().as_ref() == b"name" {
                    if let Some(pm) = current.as_mut() {
                        pm.name.get_or_insert_with(String::new);
                    }
                }
            }
            Event::Text(e) => {
                if capture != Capture::None {
                    let text = e.unescape().map_err(|err| KmlError::Xml {
                        position: reader.buffer_position() as u64,
                        message: err.to_string(),
                    })?;
                    buffer.push_str(&text);
                }
            }
            Event::CData(e) => {
                if capture != Capture::None {
                    buffer.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"name" if capture == Capture::Name => {
                    if let Some(pm) = current.as_mut() {
                        pm.name = Some(std::mem::take(&mut buffer));
                    }
                    capture = Capture::None;
                }
                b"coordinates" if capture == Capture::Coordinates => {
                    if let Some(pm) = current.as_mut() {
                        pm.coordinates = Some(std::mem::take(&mut buffer));
                    }
                    capture = Capture::None;
                }
                b"Placemark" => {
                    if let Some(pm) = current.take() {
                        if let Some(marker) = pm.finish(source) {
                            markers.push(marker);
                        }
                    }
                    capture = Capture::None;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(markers)
}
