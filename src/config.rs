use crate::cloner::validate_source_url;
use crate::error::{GeoManifestError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

pub const DEFAULT_CONFIG_FILES: &[&str] = &["geo-manifest.toml", ".geo-manifest.toml"];

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub workspace: WorkspaceConfig,
    pub git: GitConfig,
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Holds the checkouts and the intermediate manifests.
    pub base_directory: PathBuf,
    /// Final manifest directory; relative paths resolve against `base_directory`.
    pub output_directory: PathBuf,
    pub cleanup_checkouts: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitConfig {
    pub backend: CloneBackend,
    pub program: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CloneBackend {
    /// Spawn the external git client.
    Command,
    /// Clone in-process through libgit2.
    Libgit2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuffixMode {
    /// Strip the first matching suffix once, falling back to the file stem.
    #[default]
    Single,
    /// Strip suffixes until none match, then trim trailing separators.
    Repeated,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Checkout directory, relative to the base directory.
    pub checkout_dir: PathBuf,
    /// Folder inside the checkout whose entries are listed.
    pub folder: PathBuf,
    /// Manifest file name.
    pub manifest: String,
    #[serde(default)]
    pub suffixes: Vec<String>,
    #[serde(default)]
    pub suffix_mode: SuffixMode,
    #[serde(default)]
    pub include_dirs: bool,
    #[serde(default)]
    pub dir_exclude: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: WorkspaceConfig::default(),
            git: GitConfig::default(),
            sources: SourceConfig::defaults(),
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            base_directory: PathBuf::from("."),
            output_directory: PathBuf::from("geo"),
            cleanup_checkouts: false,
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            backend: CloneBackend::Command,
            program: "git".to_string(),
            depth: None,
        }
    }
}

impl SourceConfig {
    /// The two upstream repositories the manifests are built from.
    pub fn defaults() -> Vec<SourceConfig> {
        vec![
            SourceConfig {
                name: "geoip".to_string(),
                url: "https://github.com/v2fly/geoip/".to_string(),
                branch: Some("release".to_string()),
                checkout_dir: PathBuf::from("geoip"),
                folder: PathBuf::from("text"),
                manifest: "geoip.txt".to_string(),
                suffixes: vec![".txt".to_string()],
                suffix_mode: SuffixMode::Single,
                include_dirs: false,
                dir_exclude: Vec::new(),
                exclude_patterns: Vec::new(),
            },
            SourceConfig {
                name: "geosite".to_string(),
                url: "https://github.com/v2fly/domain-list-community".to_string(),
                branch: None,
                checkout_dir: PathBuf::from("domain-list-community"),
                folder: PathBuf::from("data"),
                manifest: "geosite.txt".to_string(),
                suffixes: Vec::new(),
                suffix_mode: SuffixMode::Single,
                include_dirs: false,
                dir_exclude: Vec::new(),
                exclude_patterns: Vec::new(),
            },
        ]
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(GeoManifestError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| GeoManifestError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| GeoManifestError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                for default_path in DEFAULT_CONFIG_FILES {
                    if Path::new(default_path).exists() {
                        log::debug!("Using configuration file {}", default_path);
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref base_dir) = cli_args.base_dir {
            self.workspace.base_directory = base_dir.clone();
        }

        if let Some(ref output_dir) = cli_args.output_dir {
            self.workspace.output_directory = output_dir.clone();
        }

        if let Some(backend) = cli_args.backend {
            self.git.backend = backend;
        }

        if let Some(cleanup) = cli_args.cleanup {
            self.workspace.cleanup_checkouts = cleanup;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| GeoManifestError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| GeoManifestError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(GeoManifestError::Config {
                message: "At least one source must be configured".to_string(),
            });
        }

        if self.git.program.trim().is_empty() {
            return Err(GeoManifestError::Config {
                message: "Git program must not be empty".to_string(),
            });
        }

        if self.git.depth == Some(0) {
            return Err(GeoManifestError::Config {
                message: "Clone depth must be greater than 0".to_string(),
            });
        }

        let mut names = HashSet::new();
        let mut manifests = HashSet::new();
        let mut checkouts = HashSet::new();

        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(GeoManifestError::Config {
                    message: "Source name must not be empty".to_string(),
                });
            }

            if !names.insert(source.name.as_str()) {
                return Err(GeoManifestError::Config {
                    message: format!("Duplicate source name: {}", source.name),
                });
            }

            if !manifests.insert(source.manifest.as_str()) {
                return Err(GeoManifestError::Config {
                    message: format!("Duplicate manifest name: {}", source.manifest),
                });
            }

            if !checkouts.insert(source.checkout_dir.as_path()) {
                return Err(GeoManifestError::Config {
                    message: format!(
                        "Duplicate checkout directory: {}",
                        source.checkout_dir.display()
                    ),
                });
            }

            validate_source_url(&source.url)?;
            validate_relative_path(&source.name, "checkout_dir", &source.checkout_dir)?;
            validate_relative_path(&source.name, "folder", &source.folder)?;
            validate_manifest_name(source)?;

            if source.suffixes.iter().any(|s| s.is_empty()) {
                return Err(GeoManifestError::Config {
                    message: format!("Source '{}' has an empty suffix", source.name),
                });
            }

            for pattern in &source.exclude_patterns {
                Regex::new(pattern)?;
            }
        }

        self.validate_layout()
    }

    /// Relocated manifests must survive the prepare and cleanup steps, so the
    /// output directory cannot be the base directory or live in a checkout.
    fn validate_layout(&self) -> Result<()> {
        let base = normalize_path(self.base_directory());
        let output = normalize_path(&self.output_directory());
        let checkouts: Vec<PathBuf> = self
            .sources
            .iter()
            .map(|source| normalize_path(&self.checkout_path(source)))
            .collect();

        if output == base {
            return Err(GeoManifestError::Config {
                message: format!(
                    "Output directory {} must differ from the base directory",
                    self.workspace.output_directory.display()
                ),
            });
        }

        for (source, checkout) in self.sources.iter().zip(&checkouts) {
            if output.starts_with(checkout) {
                return Err(GeoManifestError::Config {
                    message: format!(
                        "Output directory {} is inside the checkout of source '{}'",
                        self.workspace.output_directory.display(),
                        source.name
                    ),
                });
            }
        }

        for source in &self.sources {
            let staged = normalize_path(&self.staging_manifest_path(source));
            if staged == output || checkouts.contains(&staged) {
                return Err(GeoManifestError::Config {
                    message: format!(
                        "Manifest name '{}' of source '{}' collides with the output or a checkout directory",
                        source.manifest, source.name
                    ),
                });
            }
        }

        Ok(())
    }

    pub fn base_directory(&self) -> &Path {
        &self.workspace.base_directory
    }

    pub fn output_directory(&self) -> PathBuf {
        self.workspace
            .base_directory
            .join(&self.workspace.output_directory)
    }

    pub fn checkout_path(&self, source: &SourceConfig) -> PathBuf {
        self.workspace.base_directory.join(&source.checkout_dir)
    }

    pub fn source_folder(&self, source: &SourceConfig) -> PathBuf {
        self.checkout_path(source).join(&source.folder)
    }

    /// Where the manifest is written before it is relocated.
    pub fn staging_manifest_path(&self, source: &SourceConfig) -> PathBuf {
        self.workspace.base_directory.join(&source.manifest)
    }

}

/// Absolute form of `path` with `.` and `..` resolved lexically.
fn normalize_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn validate_relative_path(source: &str, field: &str, path: &Path) -> Result<()> {
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });

    if path.as_os_str().is_empty() || path.is_absolute() || escapes {
        return Err(GeoManifestError::Config {
            message: format!(
                "Source '{}' has an invalid {}: {} (must be a relative path inside the workspace)",
                source,
                field,
                path.display()
            ),
        });
    }

    Ok(())
}

fn validate_manifest_name(source: &SourceConfig) -> Result<()> {
    let name = source.manifest.as_str();
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(GeoManifestError::Config {
            message: format!(
                "Source '{}' has an invalid manifest name: {:?}",
                source.name, name
            ),
        });
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub base_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub backend: Option<CloneBackend>,
    pub cleanup: Option<bool>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(mut self, base_dir: Option<PathBuf>) -> Self {
        self.base_dir = base_dir;
        self
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_backend(mut self, backend: Option<CloneBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_cleanup(mut self, cleanup: Option<bool>) -> Self {
        self.cleanup = cleanup;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.git.backend, CloneBackend::Command);
        assert_eq!(config.git.program, "git");

        let geoip = &config.sources[0];
        assert_eq!(geoip.branch.as_deref(), Some("release"));
        assert_eq!(geoip.suffixes, vec![".txt"]);

        let geosite = &config.sources[1];
        assert!(geosite.branch.is_none());
        assert!(geosite.suffixes.is_empty());
    }

    #[test]
    fn test_default_paths() {
        let config = Config::default();
        let geoip = &config.sources[0];

        assert_eq!(config.output_directory(), Path::new("./geo"));
        assert_eq!(config.source_folder(geoip), Path::new("./geoip/text"));
        assert_eq!(config.staging_manifest_path(geoip), Path::new("./geoip.txt"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.sources.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_escaping_paths() {
        let mut config = Config::default();
        config.sources[0].checkout_dir = PathBuf::from("../outside");
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sources[1].folder = PathBuf::from("/etc");
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sources[1].manifest = "nested/geosite.txt".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_duplicates() {
        let mut config = Config::default();
        config.sources[1].manifest = config.sources[0].manifest.clone();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sources[1].checkout_dir = config.sources[0].checkout_dir.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_patterns_and_suffixes() {
        let mut config = Config::default();
        config.sources[0].exclude_patterns = vec!["(".to_string()];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sources[0].suffixes.push(String::new());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.git.depth = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_output_in_base_directory() {
        for output in [".", "./", "geo/.."] {
            let mut config = Config::default();
            config.workspace.output_directory = PathBuf::from(output);
            assert!(
                matches!(config.validate(), Err(GeoManifestError::Config { .. })),
                "{} should be rejected",
                output
            );
        }

        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.workspace.base_directory = temp_dir.path().to_path_buf();
        config.workspace.output_directory = temp_dir.path().to_path_buf();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_output_inside_checkout() {
        for output in ["geoip", "geoip/", "domain-list-community/data/geo"] {
            let mut config = Config::default();
            config.workspace.output_directory = PathBuf::from(output);
            assert!(config.validate().is_err(), "{} should be rejected", output);
        }

        let mut config = Config::default();
        config.workspace.output_directory = PathBuf::from("public/geo");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_manifest_colliding_with_directories() {
        let mut config = Config::default();
        config.sources[1].manifest = "geoip".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sources[0].manifest = "geo".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = Config::default();
        config.git.depth = Some(1);
        let temp_file = NamedTempFile::new().unwrap();

        config.save_to_file(temp_file.path()).unwrap();

        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded_config.git.depth, Some(1));
        assert_eq!(loaded_config.sources, config.sources);
    }

    #[test]
    fn test_partial_config_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[workspace]
cleanup_checkouts = true

[[sources]]
name = "rules"
url = "https://example.com/rules.git"
checkout_dir = "rules"
folder = "lists"
manifest = "rules.txt"
suffixes = [".mrs", ".txt"]
suffix_mode = "repeated"
include_dirs = true
dir_exclude = ["tmp"]
"#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).unwrap();
        assert!(config.workspace.cleanup_checkouts);
        assert_eq!(config.workspace.output_directory, PathBuf::from("geo"));
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].suffix_mode, SuffixMode::Repeated);
        assert!(config.sources[0].include_dirs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_config_file() {
        let result = Config::load_from_file("/nonexistent/geo-manifest.toml");
        assert!(matches!(result, Err(GeoManifestError::Config { .. })));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();

        let overrides = CliOverrides::new()
            .with_base_dir(Some(PathBuf::from("/srv/work")))
            .with_backend(Some(CloneBackend::Libgit2))
            .with_cleanup(Some(true));

        config.merge_with_cli_args(&overrides);

        assert_eq!(config.base_directory(), Path::new("/srv/work"));
        assert_eq!(config.output_directory(), Path::new("/srv/work/geo"));
        assert_eq!(config.git.backend, CloneBackend::Libgit2);
        assert!(config.workspace.cleanup_checkouts);
    }

    #[test]
    fn test_default_config_is_written_as_sample() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("geo-manifest.toml");
        Config::default().save_to_file(&path).unwrap();

        let sample = std::fs::read_to_string(&path).unwrap();
        assert!(sample.contains("[workspace]"));
        assert!(sample.contains("[git]"));
        assert!(sample.contains("[[sources]]"));
    }
}
