use crate::extractor::RelocationReport;
use crate::scanner::ExtractionStats;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub name: String,
    pub url: String,
    pub branch: Option<String>,
    pub checkout: PathBuf,
    pub manifest: PathBuf,
    pub stats: ExtractionStats,
}

/// What a run did, step by step.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub removed_checkouts: Vec<PathBuf>,
    pub sources: Vec<SourceReport>,
    pub output_directory: PathBuf,
    pub relocation: RelocationReport,
    pub cleaned_up: Vec<PathBuf>,
}

impl RunReport {
    pub fn new(output_directory: PathBuf) -> Self {
        Self {
            started_at: Utc::now(),
            duration: Duration::default(),
            removed_checkouts: Vec::new(),
            sources: Vec::new(),
            output_directory,
            relocation: RelocationReport::default(),
            cleaned_up: Vec::new(),
        }
    }

    pub fn total_names(&self) -> usize {
        self.sources.iter().map(|s| s.stats.names_written).sum()
    }

    pub fn display_summary(&self) -> String {
        let mut summary = String::new();

        for source in &self.sources {
            summary.push_str(&format!(
                "  {}: {} names ({} files, {} dirs, {} skipped)\n",
                source.name,
                source.stats.names_written,
                source.stats.files_seen,
                source.stats.dirs_seen,
                source.stats.entries_skipped
            ));
        }

        summary.push_str(&format!(
            "  Output directory: {}\n",
            self.output_directory.display()
        ));

        for moved in &self.relocation.moved {
            summary.push_str(&format!("  Moved: {}\n", moved.display()));
        }
        for skipped in &self.relocation.skipped {
            summary.push_str(&format!("  Skipped (missing): {}\n", skipped.display()));
        }
        if !self.cleaned_up.is_empty() {
            summary.push_str(&format!(
                "  Removed {} checkout(s) after extraction\n",
                self.cleaned_up.len()
            ));
        }

        summary
    }
}
