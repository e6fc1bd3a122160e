//! Retrieval of calibration histograms.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use jetcore::histogram::hist::{Histogram, HistogramError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("could not open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid calibration data in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no object {name} in {path}")]
    MissingObject { path: String, name: String },
    #[error("unsupported calibration url {0}: only local directories and file:// are available")]
    UnsupportedScheme(String),
    #[error("object {name} has {got} dimensions, expected {expected}")]
    WrongDimension { name: String, expected: usize, got: usize },
    #[error(transparent)]
    Invalid(#[from] HistogramError),
}

/// Key-value store of named histogram objects.
pub trait CalibrationStore {
    /// Fetches the object `name` from the collection stored at `path`.
    fn fetch(&self, path: &str, name: &str) -> Result<Histogram, CalibrationError>;
}

/// Calibration collections stored as `<base>/<path>.json`, each a JSON object mapping
/// object names to histograms.
#[derive(Clone, Debug)]
pub struct FileCalibrationStore {
    base: PathBuf,
}

impl FileCalibrationStore {
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        FileCalibrationStore { base: base.as_ref().to_path_buf() }
    }

    /// Accepts a plain directory or a `file://` url.
    pub fn from_url(url: &str) -> Result<Self, CalibrationError> {
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(FileCalibrationStore::new(path));
        }
        if url.contains("://") {
            return Err(CalibrationError::UnsupportedScheme(url.to_string()));
        }
        Ok(FileCalibrationStore::new(url))
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn collection_path(&self, path: &str) -> PathBuf {
        self.base.join(format!("{}.json", path.trim_matches('/')))
    }

    /// Reads a whole collection.
    pub fn read_collection(&self, path: &str) -> Result<BTreeMap<String, Histogram>, CalibrationError> {
        let file = self.collection_path(path);
        let text = fs::read_to_string(&file).map_err(|source| CalibrationError::Io { path: file.clone(), source })?;
        serde_json::from_str(&text).map_err(|source| CalibrationError::Parse { path: file, source })
    }

    /// Writes a collection, creating intermediate directories.
    pub fn write_collection(&self, path: &str, objects: &BTreeMap<String, Histogram>) -> Result<(), CalibrationError> {
        let file = self.collection_path(path);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).map_err(|source| CalibrationError::Io { path: parent.to_path_buf(), source })?;
        }
        let text = serde_json::to_string(objects).map_err(|source| CalibrationError::Parse { path: file.clone(), source })?;
        fs::write(&file, text).map_err(|source| CalibrationError::Io { path: file, source })
    }
}

impl CalibrationStore for FileCalibrationStore {
    fn fetch(&self, path: &str, name: &str) -> Result<Histogram, CalibrationError> {
        let mut objects = self.read_collection(path)?;
        let histogram = objects.remove(name).ok_or_else(|| CalibrationError::MissingObject {
            path: path.to_string(),
            name: name.to_string(),
        })?;
        histogram.validate()?;
        Ok(histogram)
    }
}

/// Store held in memory, keyed by (path, name).
#[derive(Clone, Debug, Default)]
pub struct InMemoryCalibrationStore {
    objects: HashMap<(String, String), Histogram>,
}

impl InMemoryCalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, histogram: Histogram) {
        self.objects.insert((path.to_string(), histogram.name.clone()), histogram);
    }
}

impl CalibrationStore for InMemoryCalibrationStore {
    fn fetch(&self, path: &str, name: &str) -> Result<Histogram, CalibrationError> {
        self.objects
            .get(&(path.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| CalibrationError::MissingObject {
                path: path.to_string(),
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jetcore::histogram::axis::Axis;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("nucleijet-store-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_url_schemes() {
        assert_eq!(FileCalibrationStore::from_url("file:///tmp/ccdb").unwrap().base(), Path::new("/tmp/ccdb"));
        assert_eq!(FileCalibrationStore::from_url("calib").unwrap().base(), Path::new("calib"));
        assert!(matches!(
            FileCalibrationStore::from_url("http://alice-ccdb.cern.ch"),
            Err(CalibrationError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_file_round_trip_and_missing_object() {
        let dir = scratch_dir("roundtrip");
        let store = FileCalibrationStore::new(&dir);
        let mut objects = BTreeMap::new();
        let response = Histogram::new_2d("response", "", Axis::new(4, 0.0, 40.0, "x"), Axis::new(4, -2.0, 2.0, "y"));
        objects.insert(response.name.clone(), response.clone());
        store.write_collection("Users/test/Response", &objects).unwrap();

        assert_eq!(store.fetch("Users/test/Response", "response").unwrap(), response);
        assert!(matches!(
            store.fetch("Users/test/Response", "other"),
            Err(CalibrationError::MissingObject { .. })
        ));
        assert!(matches!(store.fetch("Users/test/Nothing", "response"), Err(CalibrationError::Io { .. })));

        let _ = fs::remove_dir_all(&dir);
    }
}
