use crate::config::{SourceConfig, SuffixMode};
use crate::error::Result;
use regex::Regex;

/// Characters trimmed from the end of a name after repeated suffix stripping.
pub const SEPARATORS: &[char] = &['.', '-', '_'];

/// Decides which folder entries become manifest names and how they are normalized.
pub struct NameFilter {
    suffixes: Vec<String>,
    suffix_mode: SuffixMode,
    include_dirs: bool,
    dir_exclude: Vec<String>,
    exclude_patterns: Vec<Regex>,
}

impl NameFilter {
    pub fn new(suffixes: Vec<String>, suffix_mode: SuffixMode) -> Self {
        Self {
            suffixes: suffixes.into_iter().filter(|s| !s.is_empty()).collect(),
            suffix_mode,
            include_dirs: false,
            dir_exclude: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }

    pub fn from_source(source: &SourceConfig) -> Result<Self> {
        let exclude_patterns = source
            .exclude_patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self::new(source.suffixes.clone(), source.suffix_mode)
            .with_include_dirs(source.include_dirs)
            .with_dir_exclude(source.dir_exclude.clone())
            .with_exclude_patterns(exclude_patterns))
    }

    pub fn with_include_dirs(mut self, include: bool) -> Self {
        self.include_dirs = include;
        self
    }

    pub fn with_dir_exclude(mut self, dirs: Vec<String>) -> Self {
        self.dir_exclude = dirs;
        self
    }

    pub fn with_exclude_patterns(mut self, patterns: Vec<Regex>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    /// Manifest name for a regular file, or `None` when it normalizes to nothing.
    pub fn file_candidate(&self, file_name: &str) -> Option<String> {
        if self.matches_any_pattern(file_name) {
            return None;
        }

        let name = match self.suffix_mode {
            SuffixMode::Single => strip_single(file_name, &self.suffixes),
            SuffixMode::Repeated => strip_repeated(file_name, &self.suffixes),
        };

        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }

    /// Manifest name for a directory; names are used verbatim.
    pub fn dir_candidate(&self, dir_name: &str) -> Option<String> {
        if !self.include_dirs
            || dir_name.is_empty()
            || self.is_dir_excluded(dir_name)
            || self.matches_any_pattern(dir_name)
        {
            return None;
        }
        Some(dir_name.to_string())
    }

    pub fn is_dir_excluded(&self, dir_name: &str) -> bool {
        self.dir_exclude.iter().any(|d| d == dir_name)
    }

    pub fn matches_any_pattern(&self, name: &str) -> bool {
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.is_match(name))
    }
}

/// Strips the first configured suffix the name ends with. Without a match the
/// last extension is dropped instead (`a.b` -> `a`, `.hidden` and `a.` kept).
pub fn strip_single<'a>(name: &'a str, suffixes: &[String]) -> &'a str {
    for suffix in suffixes.iter().filter(|s| !s.is_empty()) {
        if let Some(stripped) = name.strip_suffix(suffix.as_str()) {
            return stripped;
        }
    }
    file_stem(name)
}

/// Strips configured suffixes until none match, then trims trailing separators.
pub fn strip_repeated<'a>(name: &'a str, suffixes: &[String]) -> &'a str {
    let mut current = name;
    loop {
        let next = suffixes
            .iter()
            .filter(|s| !s.is_empty())
            .find_map(|suffix| current.strip_suffix(suffix.as_str()));

        match next {
            Some(stripped) => current = stripped,
            None => break,
        }
    }
    current.trim_end_matches(SEPARATORS)
}

fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx < name.len() - 1 => &name[..idx],
        _ => name,
    }
}
