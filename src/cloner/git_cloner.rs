use crate::config::{CloneBackend, GitConfig};
use crate::error::{GeoManifestError, Result};
use git2::{build::RepoBuilder, ErrorClass, FetchOptions, Progress, RemoteCallbacks};
use regex::Regex;
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::process::Command;
use url::Url;

const ALLOWED_SCHEMES: &[&str] = &["https", "http", "ssh", "git", "file"];

#[derive(Debug, Clone)]
pub struct CloneProgress {
    pub total_objects: u32,
    pub received_objects: u32,
    pub local_objects: u32,
    pub total_deltas: u32,
    pub indexed_deltas: u32,
    pub received_bytes: u64,
}

impl From<Progress<'_>> for CloneProgress {
    fn from(progress: Progress) -> Self {
        Self {
            total_objects: progress.total_objects() as u32,
            received_objects: progress.received_objects() as u32,
            local_objects: progress.local_objects() as u32,
            total_deltas: progress.total_deltas() as u32,
            indexed_deltas: progress.indexed_deltas() as u32,
            received_bytes: progress.received_bytes() as u64,
        }
    }
}

/// Produces a fresh single-branch checkout of a remote repository.
pub struct SafeCloner {
    backend: CloneBackend,
    program: String,
    depth: Option<u32>,
    progress_callback: Option<Box<dyn Fn(CloneProgress) + Send + Sync>>,
}

impl SafeCloner {
    pub fn new() -> Self {
        Self {
            backend: CloneBackend::Command,
            program: "git".to_string(),
            depth: None,
            progress_callback: None,
        }
    }

    pub fn from_config(config: &GitConfig) -> Self {
        Self::new()
            .with_backend(config.backend)
            .with_program(config.program.clone())
            .with_depth(config.depth)
    }

    pub fn with_backend(mut self, backend: CloneBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_program<S: Into<String>>(mut self, program: S) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_depth(mut self, depth: Option<u32>) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(CloneProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    pub fn backend(&self) -> CloneBackend {
        self.backend
    }

    /// Clones `url` into `target`, which must not exist yet.
    pub fn clone_into(&self, url: &str, target: &Path, branch: Option<&str>) -> Result<()> {
        validate_source_url(url)?;

        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        match self.backend {
            CloneBackend::Command => self.clone_with_command(url, target, branch),
            CloneBackend::Libgit2 => self.clone_with_libgit2(url, target, branch),
        }
    }

    /// Arguments passed to the git program, without the program itself.
    pub fn command_args(&self, url: &str, target: &Path, branch: Option<&str>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["clone".into()];

        if let Some(branch) = branch {
            args.push("--branch".into());
            args.push(branch.into());
            args.push("--single-branch".into());
        }

        if let Some(depth) = self.depth {
            args.push(format!("--depth={}", depth).into());
        }

        args.push(url.into());
        args.push(target.as_os_str().to_os_string());
        args
    }

    fn clone_with_command(&self, url: &str, target: &Path, branch: Option<&str>) -> Result<()> {
        let args = self.command_args(url, target, branch);
        log::info!(
            "> {} {}",
            self.program,
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| GeoManifestError::CloneFailed {
                url: url.to_string(),
                message: format!("failed to run {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = if stderr.trim().is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr.trim().to_string()
            };

            return Err(GeoManifestError::CloneFailed {
                url: url.to_string(),
                message,
            });
        }

        Ok(())
    }

    fn clone_with_libgit2(&self, url: &str, target: &Path, branch: Option<&str>) -> Result<()> {
        if let Some(depth) = self.depth {
            log::warn!("Clone depth {} is not applied by the libgit2 backend", depth);
        }
        log::info!(
            "> libgit2 clone {}{} -> {}",
            url,
            branch.map(|b| format!(" (branch {})", b)).unwrap_or_default(),
            target.display()
        );

        let mut callbacks = RemoteCallbacks::new();

        let progress_callback = self.progress_callback.as_ref().map(|cb| cb.as_ref());
        callbacks.transfer_progress(move |stats: Progress| {
            if let Some(callback) = progress_callback {
                callback(CloneProgress::from(stats));
            }
            true
        });

        // libgit2 keeps asking while credentials are rejected
        let mut attempts = 0u8;
        callbacks.credentials(move |_url, username_from_url, allowed_types| {
            attempts += 1;
            if attempts > 3 {
                return Err(git2::Error::from_str("authentication attempts exhausted"));
            }

            if allowed_types.contains(git2::CredentialType::SSH_KEY) {
                if let Some(username) = username_from_url {
                    return git2::Cred::ssh_key_from_agent(username);
                }
            }

            if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                return git2::Cred::userpass_plaintext(username_from_url.unwrap_or("git"), &token);
            }

            git2::Cred::default()
        });

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(callbacks);

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_options);

        if let Some(branch) = branch {
            builder.branch(branch);
        }

        builder
            .clone(url, target)
            .map(|_| ())
            .map_err(|e| handle_git_error(e, url))
    }
}

impl Default for SafeCloner {
    fn default() -> Self {
        Self::new()
    }
}

fn handle_git_error(error: git2::Error, url: &str) -> GeoManifestError {
    match error.class() {
        ErrorClass::Net | ErrorClass::Http | ErrorClass::Ssh | ErrorClass::Reference
        | ErrorClass::Os => GeoManifestError::CloneFailed {
            url: url.to_string(),
            message: error.message().to_string(),
        },
        _ => GeoManifestError::Git {
            message: format!("{} ({})", error.message(), url),
            source: error,
        },
    }
}

/// Accepts URLs with a known transport scheme, scp-style `user@host:path`
/// remotes, and paths to existing local repositories.
pub fn validate_source_url(url: &str) -> Result<()> {
    let trimmed = url.trim();
    let invalid = || GeoManifestError::InvalidUrl {
        url: url.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid());
    }

    if Path::new(trimmed).exists() {
        return Ok(());
    }

    if let Ok(parsed) = Url::parse(trimmed) {
        let scheme_ok = ALLOWED_SCHEMES.contains(&parsed.scheme());
        let host_ok = parsed.scheme() == "file" || parsed.host_str().is_some_and(|h| !h.is_empty());
        return if scheme_ok && host_ok {
            Ok(())
        } else {
            Err(invalid())
        };
    }

    let scp_like = Regex::new(r"^[\w.~-]+@[\w.-]+:[^\s]+$")
        .map(|re| re.is_match(trimmed))
        .unwrap_or(false);

    if scp_like {
        Ok(())
    } else {
        Err(invalid())
    }
}
