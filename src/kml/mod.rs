//! KML marker files: placemark parsing and directory loading.

mod loader;
mod placemark;

pub use loader::{find_kml_files, load_markers, FileWarning, LoadReport, MarkerCache};
pub use placemark::{parse_coordinate_pair, parse_placemarks};
