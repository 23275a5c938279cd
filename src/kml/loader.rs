//! Data directory scanning with a per-file parse cache.

use std::fs;
use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use xxhash_rust::xxh64::xxh64;

use super::parse_placemarks;
use crate::error::LoadError;
use crate::models::{Marker, MarkerTable};

/// A file that was skipped during loading
#[derive(Debug, Clone, Serialize)]
pub struct FileWarning {
    pub file: String,
    pub reason: String,
}

/// Outcome of a successful directory load
#[derive(Debug)]
pub struct LoadReport {
    pub table: MarkerTable,
    pub warnings: Vec<FileWarning>,
    /// Files served from the cache without re-parsing
    pub cache_hits: usize,
}

struct CachedFile {
    hash: u64,
    markers: Vec<Marker>,
}

/// Memoized parse results keyed by file path.
///
/// An entry is reused only while the file bytes hash to the same xxh64.
#[derive(Default)]
pub struct MarkerCache {
    entries: HashMap<PathBuf, CachedFile>,
}

impl MarkerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse `bytes`, or return the cached markers if the content is unchanged.
    /// The boolean is true on a cache hit.
    fn get_or_parse(
        &mut self,
        path: &Path,
        source: &str,
        bytes: &[u8],
    ) -> Result<(Vec<Marker>, bool), String> {
        let hash = xxh64(bytes, 0);

        if let Some(cached) = self.entries.get(path) {
            if cached.hash == hash {
                return Ok((cached.markers.clone(), true));
            }
        }

        let content = std::str::from_utf8(bytes).map_err(|e| format!("not UTF-8: {}", e))?;
        let markers = parse_placemarks(content, source).map_err(|e| e.to_string())?;

        self.entries.insert(
            path.to_path_buf(),
            CachedFile {
                hash,
                markers: markers.clone(),
            },
        );

        Ok((markers, false))
    }

    fn retain_paths(&mut self, paths: &[PathBuf]) {
        self.entries.retain(|path, _| paths.contains(path));
    }
}

/// List `*.kml` files directly inside `dir`, sorted by file name
pub fn find_kml_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| LoadError::Directory {
            path: dir.to_path_buf(),
            source,
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let is_kml = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("kml"))
            .unwrap_or(false);

        if is_kml {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Load every KML file in `dir` into a marker table.
///
/// Unreadable or unparsable files are logged and excluded. Fails when there
/// are no KML files at all, or when together they hold no markers.
pub fn load_markers(dir: &Path, cache: &mut MarkerCache) -> Result<LoadReport, LoadError> {
    let files = find_kml_files(dir)?;
    if files.is_empty() {
        return Err(LoadError::NoFiles(dir.to_path_buf()));
    }

    info!("Loading {} KML files from {}", files.len(), dir.display());

    let mut markers = Vec::new();
    let mut warnings = Vec::new();
    let mut cache_hits = 0;

    for path in &files {
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let result = fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| cache.get_or_parse(path, &source, &bytes));

        match result {
            Ok((file_markers, hit)) => {
                if hit {
                    cache_hits += 1;
                }
                debug!(
                    "{}: {} markers{}",
                    source,
                    file_markers.len(),
                    if hit { " (cached)" } else { "" }
                );
                markers.extend(file_markers);
            }
            Err(reason) => {
                warn!("Cannot read {}: {}", source, reason);
                warnings.push(FileWarning {
                    file: source,
                    reason,
                });
            }
        }
    }

    cache.retain_paths(&files);

    let table =
        MarkerTable::new(markers).ok_or_else(|| LoadError::EmptyDataset(dir.to_path_buf()))?;

    info!(
        "Loaded {} markers from {} files ({} skipped, {} cached)",
        table.len(),
        table.sources().len(),
        warnings.len(),
        cache_hits
    );

    Ok(LoadReport {
        table,
        warnings,
        cache_hits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn placemark(name: &str, lon: f64, lat: f64) -> String {
        format!(
            "<Placemark><name>{}</name><Point><coordinates>{},{},0</coordinates></Point></Placemark>",
            name, lon, lat
        )
    }

    fn kml(placemarks: &[String]) -> String {
        format!(
            "<?xml version=\"1.0\"?><kml><Document>{}</Document></kml>",
            placemarks.concat()
        )
    }

    fn write(dir: &TempDir, name: &str, content: impl AsRef<[u8]>) {
        fs::write(dir.path().join(name), content).unwrap();
    }

    #[test]
    fn test_load_multiple_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "HW1.kml", kml(&[placemark("0K", 121.0, 25.0), placemark("1K", 121.01, 25.0)]));
        write(&dir, "HW3.kml", kml(&[placemark("5K", 120.5, 24.5)]));
        write(&dir, "readme.txt", "not a kml file");

        let mut cache = MarkerCache::new();
        let report = load_markers(dir.path(), &mut cache).unwrap();

        assert_eq!(report.table.len(), 3);
        assert!(report.warnings.is_empty());
        assert_eq!(report.table.sources(), &["HW1.kml".to_string(), "HW3.kml".to_string()]);
        assert_eq!(report.table.markers()[2].source, "HW3.kml");
    }

    #[test]
    fn test_unreadable_file_warns_and_is_excluded() {
        let dir = TempDir::new().unwrap();
        write(&dir, "broken.kml", "<kml><Placemark><name>x</Placemark>");
        write(&dir, "binary.kml", [0xffu8, 0xfe, 0x00, 0x41]);
        write(&dir, "good.kml", kml(&[placemark("0K", 121.0, 25.0)]));

        let mut cache = MarkerCache::new();
        let report = load_markers(dir.path(), &mut cache).unwrap();

        assert_eq!(report.table.len(), 1);
        assert_eq!(report.warnings.len(), 2);
        let files: Vec<&str> = report.warnings.iter().map(|w| w.file.as_str()).collect();
        assert!(files.contains(&"broken.kml"));
        assert!(files.contains(&"binary.kml"));
    }

    #[test]
    fn test_no_kml_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "notes.txt", "hello");

        let mut cache = MarkerCache::new();
        assert!(matches!(
            load_markers(dir.path(), &mut cache),
            Err(LoadError::NoFiles(_))
        ));
    }

    #[test]
    fn test_empty_dataset() {
        let dir = TempDir::new().unwrap();
        write(&dir, "empty.kml", kml(&[]));
        write(&dir, "broken.kml", "<kml>");

        let mut cache = MarkerCache::new();
        assert!(matches!(
            load_markers(dir.path(), &mut cache),
            Err(LoadError::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_missing_directory() {
        let mut cache = MarkerCache::new();
        let result = load_markers(Path::new("/nonexistent/milepost-data"), &mut cache);
        assert!(matches!(result, Err(LoadError::Directory { .. })));
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        write(&dir, "UPPER.KML", kml(&[placemark("0K", 121.0, 25.0)]));

        let files = find_kml_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_cache_reuses_unchanged_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "HW1.kml", kml(&[placemark("0K", 121.0, 25.0)]));
        write(&dir, "HW3.kml", kml(&[placemark("5K", 120.5, 24.5)]));

        let mut cache = MarkerCache::new();
        let first = load_markers(dir.path(), &mut cache).unwrap();
        assert_eq!(first.cache_hits, 0);
        assert_eq!(cache.len(), 2);

        write(&dir, "HW3.kml", kml(&[placemark("5K", 120.5, 24.5), placemark("6K", 120.5, 24.51)]));
        let second = load_markers(dir.path(), &mut cache).unwrap();
        assert_eq!(second.cache_hits, 1);
        assert_eq!(second.table.len(), 3);
    }

    #[test]
    fn test_cache_evicts_removed_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "HW1.kml", kml(&[placemark("0K", 121.0, 25.0)]));
        write(&dir, "HW3.kml", kml(&[placemark("5K", 120.5, 24.5)]));

        let mut cache = MarkerCache::new();
        load_markers(dir.path(), &mut cache).unwrap();
        fs::remove_file(dir.path().join("HW3.kml")).unwrap();

        let report = load_markers(dir.path(), &mut cache).unwrap();
        assert_eq!(report.table.len(), 1);
        assert_eq!(cache.len(), 1);
    }
}
