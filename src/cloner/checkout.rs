use crate::error::{GeoManifestError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Recursively deletes `path` if it exists. Returns whether anything was removed.
pub fn remove_dir_if_exists(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }

    log::info!("Removing folder: {}", path.display());
    fs::remove_dir_all(path).map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => GeoManifestError::Permission {
            path: path.display().to_string(),
        },
        _ => GeoManifestError::Io(e),
    })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_removes_existing_tree() {
        let temp_dir = TempDir::new().unwrap();
        let checkout = temp_dir.path().join("geoip");
        fs::create_dir_all(checkout.join("text/nested")).unwrap();
        fs::write(checkout.join("text/cn.txt"), "1.0.1.0/24").unwrap();

        assert!(remove_dir_if_exists(&checkout).unwrap());
        assert!(!checkout.exists());
    }

    #[test]
    fn test_missing_directory_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let checkout = temp_dir.path().join("never-cloned");

        assert!(!remove_dir_if_exists(&checkout).unwrap());
        assert!(!checkout.exists());
    }

    #[test]
    fn test_plain_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("geoip");
        fs::write(&file, "not a directory").unwrap();

        assert!(remove_dir_if_exists(&file).is_err());
        assert!(file.exists());
    }
}
