use crate::config::SourceConfig;
use crate::error::{GeoManifestError, Result};
use crate::extractor::write_manifest;
use crate::scanner::name_filter::NameFilter;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    pub files_seen: usize,
    pub dirs_seen: usize,
    pub entries_skipped: usize,
    pub names_written: usize,
}

/// Lists the direct children of a folder as a sorted, deduplicated name set.
pub struct NameExtractor {
    filter: NameFilter,
}

impl NameExtractor {
    pub fn new(filter: NameFilter) -> Self {
        Self { filter }
    }

    pub fn from_source(source: &SourceConfig) -> Result<Self> {
        Ok(Self::new(NameFilter::from_source(source)?))
    }

    pub fn collect_names<P: AsRef<Path>>(
        &self,
        folder: P,
    ) -> Result<(BTreeSet<String>, ExtractionStats)> {
        let folder = folder.as_ref();

        if !folder.exists() {
            return Err(GeoManifestError::SourceFolderNotFound {
                path: folder.display().to_string(),
            });
        }

        if !folder.is_dir() {
            return Err(GeoManifestError::InvalidPath {
                path: format!("{} is not a directory", folder.display()),
            });
        }

        let mut names = BTreeSet::new();
        let mut stats = ExtractionStats::default();

        let walker = WalkDir::new(folder)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;

            let Some(name) = entry.file_name().to_str() else {
                log::warn!("Skipping non UTF-8 entry: {}", entry.path().display());
                stats.entries_skipped += 1;
                continue;
            };

            let (is_dir, is_file) = if entry.path_is_symlink() {
                match fs::metadata(entry.path()) {
                    Ok(meta) => (meta.is_dir(), meta.is_file()),
                    Err(_) => {
                        log::debug!("Skipping dangling symlink: {}", entry.path().display());
                        stats.entries_skipped += 1;
                        continue;
                    }
                }
            } else {
                (entry.file_type().is_dir(), entry.file_type().is_file())
            };

            let candidate = if is_dir {
                stats.dirs_seen += 1;
                self.filter.dir_candidate(name)
            } else if is_file {
                stats.files_seen += 1;
                self.filter.file_candidate(name)
            } else {
                None
            };

            match candidate {
                Some(candidate) => {
                    log::debug!("{} -> {}", name, candidate);
                    names.insert(candidate);
                }
                None => {
                    log::debug!("Skipping {}", name);
                    stats.entries_skipped += 1;
                }
            }
        }

        stats.names_written = names.len();
        Ok((names, stats))
    }

    /// Collects the names of `folder` and overwrites `out_file` with them.
    pub fn extract_to_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        folder: P,
        out_file: Q,
    ) -> Result<ExtractionStats> {
        let (names, stats) = self.collect_names(folder)?;
        write_manifest(&names, out_file.as_ref())?;
        log::info!(
            "Wrote {} names to {}",
            stats.names_written,
            out_file.as_ref().display()
        );
        Ok(stats)
    }
}
