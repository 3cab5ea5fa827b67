//! Building a catalog from sensor list files

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};

use lineguard_core::{InMemoryCatalog, SensorProfile, SensorType};

use crate::format::SensorList;
use crate::CatalogError;

/// Default file name of the generic sensor list
pub const GENERIC_SENSORS_FILE: &str = "analytics_generic_sensors.json";

/// Default file name of the vibration sensor list
pub const VIBRATION_SENSORS_FILE: &str = "analytics_vibration_sensors.json";

/// Loads the generic and vibration sensor lists into one catalog
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    generic_path: PathBuf,
    vibration_path: PathBuf,
}

impl CatalogLoader {
    /// Loader for explicit file paths
    pub fn new(generic_path: impl Into<PathBuf>, vibration_path: impl Into<PathBuf>) -> Self {
        Self {
            generic_path: generic_path.into(),
            vibration_path: vibration_path.into(),
        }
    }

    /// Loader for the default file names inside `dir`
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(GENERIC_SENSORS_FILE), dir.join(VIBRATION_SENSORS_FILE))
    }

    /// Build a new catalog from both files
    pub fn load(&self) -> Result<InMemoryCatalog, CatalogError> {
        let catalog = InMemoryCatalog::new();
        self.load_into(&catalog)?;
        Ok(catalog)
    }

    /// Add both files' sensors to an existing catalog
    ///
    /// Nothing is registered unless both files load cleanly.
    /// Returns the number of sensors registered.
    pub fn load_into(&self, catalog: &InMemoryCatalog) -> Result<usize, CatalogError> {
        let lists = [
            (SensorType::Generic, read_list(&self.generic_path)?),
            (SensorType::Vibration, read_list(&self.vibration_path)?),
        ];

        let mut seen = HashSet::new();
        for (_, list) in &lists {
            for entry in &list.sensors {
                entry.validate()?;
                if !seen.insert(entry.name()) {
                    return Err(CatalogError::DuplicateSensor(entry.name().to_string()));
                }
            }
        }

        for (sensor_type, list) in &lists {
            for entry in &list.sensors {
                let profile = SensorProfile::new(*sensor_type).with_overrides(entry.overrides());
                catalog.register(entry.name(), profile);
            }
            info!("Loaded {} {} sensors", list.sensors.len(), sensor_type.name());
        }

        Ok(seen.len())
    }
}

fn read_list(path: &Path) -> Result<SensorList, CatalogError> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("Sensor list {} not found, no sensors loaded from it", path.display());
            return Ok(SensorList::default());
        }
        Err(source) => {
            return Err(CatalogError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    SensorList::from_json_str(&json, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineguard_core::SensorCatalog;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) {
        let mut file = fs::File::create(dir.path().join(name)).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn loads_both_lists() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            GENERIC_SENSORS_FILE,
            r#"{ "sensors": ["press_01", { "name": "temp_07", "threshold": 3.0 }] }"#,
        );
        write(&dir, VIBRATION_SENSORS_FILE, r#"{ "sensors": ["vib_01"] }"#);

        let catalog = CatalogLoader::from_dir(dir.path()).load().unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.lookup("vib_01").unwrap().sensor_type, SensorType::Vibration);

        let temp = catalog.lookup("temp_07").unwrap();
        assert_eq!(temp.sensor_type, SensorType::Generic);
        assert_eq!(temp.overrides.threshold, Some(3.0));
    }

    #[test]
    fn missing_files_are_empty() {
        let dir = TempDir::new().unwrap();
        write(&dir, VIBRATION_SENSORS_FILE, r#"{ "sensors": ["vib_01"] }"#);

        let catalog = CatalogLoader::from_dir(dir.path()).load().unwrap();
        assert_eq!(catalog.sensor_ids(), vec!["vib_01".to_string()]);

        let empty = TempDir::new().unwrap();
        assert!(CatalogLoader::from_dir(empty.path()).load().unwrap().is_empty());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, GENERIC_SENSORS_FILE, "{ sensors: ");

        let err = CatalogLoader::from_dir(dir.path()).load().unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
    }

    #[test]
    fn duplicate_across_files_registers_nothing() {
        let dir = TempDir::new().unwrap();
        write(&dir, GENERIC_SENSORS_FILE, r#"{ "sensors": ["a", "shared"] }"#);
        write(&dir, VIBRATION_SENSORS_FILE, r#"{ "sensors": ["shared"] }"#);

        let catalog = InMemoryCatalog::new();
        let err = CatalogLoader::from_dir(dir.path()).load_into(&catalog).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateSensor(ref id) if id == "shared"));
        assert!(catalog.is_empty());
    }

    #[test]
    fn directory_in_place_of_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(GENERIC_SENSORS_FILE)).unwrap();

        let err = CatalogLoader::from_dir(dir.path()).load().unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
