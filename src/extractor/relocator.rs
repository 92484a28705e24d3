use crate::error::{GeoManifestError, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize)]
pub struct RelocationReport {
    pub moved: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Moves generated manifests into the final output directory.
pub struct ManifestRelocator {
    destination: PathBuf,
}

impl ManifestRelocator {
    pub fn new<P: Into<PathBuf>>(destination: P) -> Self {
        Self {
            destination: destination.into(),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Moves every existing file in `files` into the destination, replacing
    /// same-named files there. Missing sources are skipped.
    pub fn relocate<P: AsRef<Path>>(&self, files: &[P]) -> Result<RelocationReport> {
        fs::create_dir_all(&self.destination)?;

        let mut report = RelocationReport::default();

        for file in files {
            let source = file.as_ref();

            if !source.exists() {
                log::warn!("Skip moving, file not found: {}", source.display());
                report.skipped.push(source.to_path_buf());
                continue;
            }

            let file_name = source.file_name().ok_or_else(|| GeoManifestError::InvalidPath {
                path: source.display().to_string(),
            })?;
            let dest = self.destination.join(file_name);

            if dest.exists() {
                if fs::canonicalize(source)? == fs::canonicalize(&dest)? {
                    log::debug!("{} is already in place", dest.display());
                    report.moved.push(dest);
                    continue;
                }
                fs::remove_file(&dest)?;
            }

            move_file(source, &dest)?;
            log::info!("Moved {} -> {}", source.display(), dest.display());
            report.moved.push(dest);
        }

        Ok(report)
    }
}

fn move_file(source: &Path, dest: &Path) -> Result<()> {
    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(rename_error) => {
            // rename cannot cross filesystems
            log::debug!(
                "rename {} failed ({}), copying instead",
                source.display(),
                rename_error
            );
            fs::copy(source, dest)?;
            fs::remove_file(source)?;
            Ok(())
        }
    }
}
