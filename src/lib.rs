pub mod cli;
pub mod cloner;
pub mod config;
pub mod error;
pub mod extractor;
pub mod scanner;
pub mod ui;

#[cfg(test)]
#[path = "../tests/common/mod.rs"]
mod test_support;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, CloneBackend, Config, GitConfig, SourceConfig, SuffixMode, WorkspaceConfig};
pub use error::{GeoManifestError, Result, UserFriendlyError};

// Core functionality re-exports
pub use cloner::{remove_dir_if_exists, CloneProgress, SafeCloner};
pub use extractor::{write_manifest, ManifestRelocator, RelocationReport, RunReport, SourceReport};
pub use scanner::{ExtractionStats, NameExtractor, NameFilter};
pub use ui::{OutputFormatter, OutputMode, ProgressManager};

use std::path::{Path, PathBuf};
use std::time::Instant;

/// Runs the manifest refresh: prepare -> fetch -> extract -> relocate -> cleanup.
pub struct GeoManifest {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
}

impl GeoManifest {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);

        Self {
            config,
            output_formatter,
            progress_manager,
        }
    }

    /// Create a GeoManifest instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        Ok(Self::new(config, output_mode, cli_args.verbose, cli_args.quiet))
    }

    /// Refresh every configured manifest. Any failure aborts the run and
    /// leaves the filesystem as it was at that point.
    pub fn run(&self) -> Result<RunReport> {
        let start_time = Instant::now();
        self.config.validate()?;

        let mut report = RunReport::new(self.config.output_directory());

        // Step 1: Remove stale checkouts
        self.output_formatter.start_operation("Preparing workspace");
        for source in &self.config.sources {
            let checkout = self.config.checkout_path(source);
            if remove_dir_if_exists(&checkout)? {
                self.output_formatter
                    .debug(&format!("Removed stale checkout {}", checkout.display()));
                report.removed_checkouts.push(checkout);
            }
        }

        // Step 2: Clone sources
        for source in &self.config.sources {
            self.fetch_source(source)?;
        }

        // Step 3: Write manifests
        let mut staged = Vec::with_capacity(self.config.sources.len());
        for source in &self.config.sources {
            let source_report = self.extract_source(source)?;
            staged.push(source_report.manifest.clone());
            report.sources.push(source_report);
        }

        // Step 4: Move manifests into the output directory
        report.relocation = self.relocate_manifests(&staged)?;

        // Step 5: Optional cleanup
        if self.config.workspace.cleanup_checkouts {
            report.cleaned_up = self.cleanup_checkouts()?;
        }

        report.duration = start_time.elapsed();
        Ok(report)
    }

    fn fetch_source(&self, source: &SourceConfig) -> Result<()> {
        let checkout = self.config.checkout_path(source);
        self.output_formatter.start_operation(&format!(
            "Cloning {} from {}{}",
            source.name,
            source.url,
            source
                .branch
                .as_deref()
                .map(|b| format!(" (branch {})", b))
                .unwrap_or_default()
        ));

        let clone_started = Instant::now();
        let cloner = SafeCloner::from_config(&self.config.git);
        let (cloner, pb) = match cloner.backend() {
            CloneBackend::Libgit2 => {
                let pb = self.progress_manager.create_clone_progress(&source.name);
                let bar = pb.clone();
                let cloner = cloner.with_progress(move |progress: CloneProgress| {
                    ui::progress::update_clone_progress(&bar, &progress);
                });
                (cloner, pb)
            }
            CloneBackend::Command => {
                let pb = self
                    .progress_manager
                    .create_spinner(&format!("Cloning {}", source.name));
                (cloner, pb)
            }
        };

        match cloner.clone_into(&source.url, &checkout, source.branch.as_deref()) {
            Ok(()) => {
                ui::progress::finish_progress_with_summary(
                    &pb,
                    &format!("Cloned {}", source.name),
                    clone_started.elapsed(),
                );
                Ok(())
            }
            Err(e) => {
                pb.abandon_with_message(format!("Clone of {} failed", source.name));
                Err(e)
            }
        }
    }

    fn extract_source(&self, source: &SourceConfig) -> Result<SourceReport> {
        let folder = self.config.source_folder(source);
        let manifest = self.config.staging_manifest_path(source);

        self.output_formatter.start_operation(&format!(
            "Listing {} into {}",
            folder.display(),
            manifest.display()
        ));

        let extractor = NameExtractor::from_source(source)?;
        let stats = extractor.extract_to_file(&folder, &manifest)?;

        self.output_formatter.info(&format!(
            "Wrote {} names to {}",
            stats.names_written,
            manifest.display()
        ));

        Ok(SourceReport {
            name: source.name.clone(),
            url: source.url.clone(),
            branch: source.branch.clone(),
            checkout: self.config.checkout_path(source),
            manifest,
            stats,
        })
    }

    fn relocate_manifests(&self, staged: &[PathBuf]) -> Result<RelocationReport> {
        let relocator = ManifestRelocator::new(self.config.output_directory());
        self.output_formatter.start_operation(&format!(
            "Moving manifests to {}",
            relocator.destination().display()
        ));

        let relocation = relocator.relocate(staged)?;
        for skipped in &relocation.skipped {
            self.output_formatter
                .warning(&format!("Skip moving, file not found: {}", skipped.display()));
        }
        Ok(relocation)
    }

    fn cleanup_checkouts(&self) -> Result<Vec<PathBuf>> {
        self.output_formatter.start_operation("Removing checkouts");

        let mut removed = Vec::new();
        for source in &self.config.sources {
            let checkout = self.config.checkout_path(source);
            if remove_dir_if_exists(&checkout)? {
                removed.push(checkout);
            }
        }
        Ok(removed)
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        Config::default().save_to_file(output_path)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &GeoManifestError) {
        self.progress_manager.clear();
        self.output_formatter.print_user_friendly_error(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::init_source_repo;
    use std::fs;
    use tempfile::TempDir;

    struct Upstreams {
        _dir: TempDir,
        geoip: String,
        geosite: String,
    }

    fn upstreams() -> Upstreams {
        let dir = TempDir::new().unwrap();
        let geoip = dir.path().join("geoip");
        let geosite = dir.path().join("domain-list-community");

        init_source_repo(
            &geoip,
            &["text/cn.txt", "text/us.txt", "text/private.txt", "README.md"],
            Some("release"),
        );
        init_source_repo(
            &geosite,
            &["data/google", "data/apple", "data/category-ads-all", "LICENSE"],
            None,
        );

        Upstreams {
            geoip: geoip.to_string_lossy().into_owned(),
            geosite: geosite.to_string_lossy().into_owned(),
            _dir: dir,
        }
    }

    fn test_config(base: &Path, upstreams: &Upstreams) -> Config {
        let mut config = Config::default();
        config.workspace.base_directory = base.to_path_buf();
        config.git.backend = CloneBackend::Libgit2;
        config.sources[0].url = upstreams.geoip.clone();
        config.sources[1].url = upstreams.geosite.clone();
        config
    }

    fn quiet(config: Config) -> GeoManifest {
        GeoManifest::new(config, OutputMode::Plain, 0, true)
    }

    #[test]
    fn test_full_run_produces_manifests() {
        let upstreams = upstreams();
        let work = TempDir::new().unwrap();
        let config = test_config(work.path(), &upstreams);

        let report = quiet(config).run().unwrap();

        let geo = work.path().join("geo");
        assert_eq!(
            fs::read_to_string(geo.join("geoip.txt")).unwrap(),
            "cn\nprivate\nus\n"
        );
        assert_eq!(
            fs::read_to_string(geo.join("geosite.txt")).unwrap(),
            "apple\ncategory-ads-all\ngoogle\n"
        );

        // intermediate manifests were moved, checkouts kept
        assert!(!work.path().join("geoip.txt").exists());
        assert!(!work.path().join("geosite.txt").exists());
        assert!(work.path().join("geoip").join("text").is_dir());

        assert_eq!(report.sources.len(), 2);
        assert_eq!(report.total_names(), 6);
        assert_eq!(report.relocation.moved.len(), 2);
        assert!(report.cleaned_up.is_empty());
    }

    #[test]
    fn test_full_run_with_git_command() {
        let upstreams = upstreams();
        let work = TempDir::new().unwrap();
        let mut config = test_config(work.path(), &upstreams);
        config.git.backend = CloneBackend::Command;

        let report = quiet(config).run().unwrap();

        let geo = work.path().join("geo");
        assert_eq!(
            fs::read_to_string(geo.join("geoip.txt")).unwrap(),
            "cn\nprivate\nus\n"
        );
        assert_eq!(
            fs::read_to_string(geo.join("geosite.txt")).unwrap(),
            "apple\ncategory-ads-all\ngoogle\n"
        );
        assert_eq!(report.relocation.moved.len(), 2);
    }

    #[test]
    fn test_output_in_base_directory_is_rejected() {
        let upstreams = upstreams();
        let work = TempDir::new().unwrap();
        fs::write(work.path().join("geoip.txt"), "previous\n").unwrap();

        let mut config = test_config(work.path(), &upstreams);
        config.workspace.output_directory = PathBuf::from(".");

        let result = quiet(config).run();

        assert!(matches!(result, Err(GeoManifestError::Config { .. })));
        assert_eq!(
            fs::read_to_string(work.path().join("geoip.txt")).unwrap(),
            "previous\n"
        );
        assert!(!work.path().join("geoip").exists());
    }

    #[test]
    fn test_output_inside_checkout_is_rejected() {
        let upstreams = upstreams();
        let work = TempDir::new().unwrap();
        let mut config = test_config(work.path(), &upstreams);
        config.workspace.output_directory = PathBuf::from("geoip");
        config.workspace.cleanup_checkouts = true;

        let result = quiet(config).run();

        assert!(matches!(result, Err(GeoManifestError::Config { .. })));
        assert!(!work.path().join("geoip").exists());
    }

    #[test]
    fn test_manifest_named_like_checkout_is_rejected() {
        let upstreams = upstreams();
        let work = TempDir::new().unwrap();
        let mut config = test_config(work.path(), &upstreams);
        config.sources[0].manifest = "domain-list-community".to_string();

        assert!(matches!(
            quiet(config).run(),
            Err(GeoManifestError::Config { .. })
        ));
        assert!(fs::read_dir(work.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_stale_checkout_is_replaced() {
        let upstreams = upstreams();
        let work = TempDir::new().unwrap();
        let stale = work.path().join("geoip").join("text");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("stale.txt"), "old").unwrap();

        let report = quiet(test_config(work.path(), &upstreams)).run().unwrap();

        assert_eq!(report.removed_checkouts, vec![work.path().join("geoip")]);
        let geoip = fs::read_to_string(work.path().join("geo/geoip.txt")).unwrap();
        assert!(!geoip.contains("stale"));
    }

    #[test]
    fn test_cleanup_removes_checkouts() {
        let upstreams = upstreams();
        let work = TempDir::new().unwrap();
        let mut config = test_config(work.path(), &upstreams);
        config.workspace.cleanup_checkouts = true;

        let report = quiet(config).run().unwrap();

        assert_eq!(report.cleaned_up.len(), 2);
        assert!(!work.path().join("geoip").exists());
        assert!(!work.path().join("domain-list-community").exists());
        assert!(work.path().join("geo/geosite.txt").exists());
    }

    #[test]
    fn test_unreachable_source_leaves_manifests_untouched() {
        let upstreams = upstreams();
        let work = TempDir::new().unwrap();
        let geo = work.path().join("geo");
        fs::create_dir_all(&geo).unwrap();
        fs::write(geo.join("geoip.txt"), "previous\n").unwrap();
        fs::write(geo.join("geosite.txt"), "previous\n").unwrap();

        let mut config = test_config(work.path(), &upstreams);
        config.sources[1].url = format!("file://{}/missing", work.path().display());

        let result = quiet(config).run();

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(geo.join("geoip.txt")).unwrap(), "previous\n");
        assert_eq!(fs::read_to_string(geo.join("geosite.txt")).unwrap(), "previous\n");
        assert!(!work.path().join("geoip.txt").exists());
    }

    #[test]
    fn test_missing_folder_aborts_run() {
        let upstreams = upstreams();
        let work = TempDir::new().unwrap();
        let mut config = test_config(work.path(), &upstreams);
        config.sources[1].folder = PathBuf::from("renamed-data");

        let result = quiet(config).run();

        assert!(matches!(
            result,
            Err(GeoManifestError::SourceFolderNotFound { .. })
        ));
        assert!(!work.path().join("geo").exists());
    }

    #[test]
    fn test_invalid_config_touches_nothing() {
        let work = TempDir::new().unwrap();
        let checkout = work.path().join("geoip");
        fs::create_dir_all(&checkout).unwrap();

        let mut config = Config::default();
        config.workspace.base_directory = work.path().to_path_buf();
        config.sources[1].url = "not-a-url".to_string();

        let result = quiet(config).run();

        assert!(matches!(result, Err(GeoManifestError::InvalidUrl { .. })));
        assert!(checkout.exists());
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sample.toml");

        GeoManifest::generate_sample_config(&config_path).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[workspace]"));
        assert!(content.contains("[[sources]]"));
        assert!(Config::load_from_file(&config_path).is_ok());
    }
}
