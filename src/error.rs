use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoManifestError {
    #[error("Git operation failed: {message}")]
    Git {
        message: String,
        #[source]
        source: git2::Error,
    },

    #[error("Clone of {url} failed: {message}")]
    CloneFailed { url: String, message: String },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid repository URL: {url}")]
    InvalidUrl { url: String },

    #[error("Folder not found: {path}")]
    SourceFolderNotFound { path: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Permission denied: {path}")]
    Permission { path: String },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for GeoManifestError {
    fn user_message(&self) -> String {
        match self {
            GeoManifestError::Git { message, .. } => {
                format!("Git operation failed: {}", message)
            }
            GeoManifestError::CloneFailed { url, message } => {
                format!("Could not clone {}: {}", url, message.trim())
            }
            GeoManifestError::InvalidUrl { url } => {
                format!("Invalid repository URL: {}", url)
            }
            GeoManifestError::SourceFolderNotFound { path } => {
                format!("Source folder not found in checkout: {}", path)
            }
            GeoManifestError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            GeoManifestError::Permission { path } => {
                format!("Permission denied accessing: {}", path)
            }
            GeoManifestError::InvalidPath { path } => {
                format!("Invalid file path: {}", path)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            GeoManifestError::CloneFailed { .. } => Some(
                "Check that git is installed, the repository URL is reachable and the branch exists.".to_string()
            ),
            GeoManifestError::InvalidUrl { .. } => Some(
                "Use an https://, ssh://, git:// or file:// URL, an scp-style user@host:path, or an existing local path.".to_string()
            ),
            GeoManifestError::SourceFolderNotFound { .. } => Some(
                "The upstream repository layout may have changed; update the source's `folder` setting.".to_string()
            ),
            GeoManifestError::Config { .. } => Some(
                "Check your configuration file syntax or regenerate one with --generate-config.".to_string()
            ),
            GeoManifestError::Permission { .. } => Some(
                "Ensure you have the necessary read/write permissions for the working directory.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<git2::Error> for GeoManifestError {
    fn from(error: git2::Error) -> Self {
        GeoManifestError::Git {
            message: error.message().to_string(),
            source: error,
        }
    }
}

impl From<toml::de::Error> for GeoManifestError {
    fn from(error: toml::de::Error) -> Self {
        GeoManifestError::Config {
            message: error.to_string(),
        }
    }
}

impl From<regex::Error> for GeoManifestError {
    fn from(error: regex::Error) -> Self {
        GeoManifestError::Config {
            message: format!("Invalid exclude pattern: {}", error),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeoManifestError>;
