use crate::error::Result;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// One name per line with a trailing newline. An empty set renders as `"\n"`.
pub fn render_manifest<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut content = names
        .into_iter()
        .map(|name| name.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("\n");
    content.push('\n');
    content
}

/// Replaces `out_file` with the rendered manifest. The content is staged in a
/// temporary file next to the target and renamed over it, so readers see
/// either the old manifest or the complete new one.
pub fn write_manifest<I, S>(names: I, out_file: &Path) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parent = match out_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let content = render_manifest(names);
    let mut staged = NamedTempFile::new_in(parent)?;
    staged.write_all(content.as_bytes())?;
    staged.as_file().sync_all()?;
    staged.persist(out_file).map_err(|e| e.error)?;

    Ok(())
}
