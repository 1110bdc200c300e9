use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::OutputFormat;
use crate::youtube::TranscriptResult;

pub mod formatters;

pub use formatters::*;

/// What happened to the target document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The marker line was replaced by the content
    ReplacedMarker,
    /// No marker was found, so the content went to the end
    Appended,
    /// The document did not exist yet
    Created,
}

/// Render a transcript in one of the standalone formats
pub fn render_transcript(
    result: &TranscriptResult,
    format: &OutputFormat,
    include_timestamps: bool,
) -> Result<String> {
    let content = match format {
        OutputFormat::Text => format_as_text(result, include_timestamps),
        OutputFormat::Markdown => format_as_markdown(result, include_timestamps),
        OutputFormat::Json => format_as_json(result)?,
        OutputFormat::Srt => format_as_srt(result),
        OutputFormat::Vtt => format_as_vtt(result),
    };

    Ok(content)
}

/// Save transcript to file
pub fn save_to_file(
    result: &TranscriptResult,
    path: &Path,
    format: &OutputFormat,
    include_timestamps: bool,
) -> Result<()> {
    let content = render_transcript(result, format, include_timestamps)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print transcript to console
pub fn print_to_console(
    result: &TranscriptResult,
    format: &OutputFormat,
    include_timestamps: bool,
) -> Result<()> {
    let content = render_transcript(result, format, include_timestamps)?;
    println!("{}", content);
    Ok(())
}

/// Insert content into a text document.
///
/// The first line that equals `marker` (ignoring surrounding whitespace) is
/// replaced. Without a marker line the content is appended after a blank line.
/// A missing document is created.
pub fn insert_into_document(path: &Path, content: &str, marker: &str) -> Result<Insertion> {
    if !path.exists() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs_err::create_dir_all(parent)?;
        }
        fs_err::write(path, content).context("Failed to create document")?;
        return Ok(Insertion::Created);
    }

    let existing = fs_err::read_to_string(path).context("Failed to read document")?;
    let (updated, insertion) = insert_into_text(&existing, content, marker);

    fs_err::write(path, updated).context("Failed to write document")?;
    Ok(insertion)
}

/// Pure part of [`insert_into_document`]
pub fn insert_into_text(existing: &str, content: &str, marker: &str) -> (String, Insertion) {
    let marker = marker.trim();

    if !marker.is_empty() {
        let mut offset = 0;
        for line in existing.split_inclusive('\n') {
            if line.trim() == marker {
                let after = &existing[offset + line.len()..];
                let mut updated = String::with_capacity(existing.len() + content.len());
                updated.push_str(&existing[..offset]);
                updated.push_str(content.trim_end_matches('\n'));
                updated.push('\n');
                updated.push_str(after);
                return (updated, Insertion::ReplacedMarker);
            }
            offset += line.len();
        }
    }

    let mut updated = existing.trim_end_matches('\n').to_string();
    if !updated.is_empty() {
        updated.push_str("\n\n");
    }
    updated.push_str(content);
    (updated, Insertion::Appended)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = "<!-- ytsum -->";

    #[test]
    fn test_insert_replaces_marker() {
        let existing = "# Notes\n\n<!-- ytsum -->\n\nfooter\n";
        let (updated, insertion) = insert_into_text(existing, "## Summary\nbody\n", MARKER);
        assert_eq!(insertion, Insertion::ReplacedMarker);
        assert_eq!(updated, "# Notes\n\n## Summary\nbody\n\nfooter\n");
    }

    #[test]
    fn test_insert_replaces_only_first_marker() {
        let existing = "  <!-- ytsum -->  \n<!-- ytsum -->";
        let (updated, _) = insert_into_text(existing, "X", MARKER);
        assert_eq!(updated, "X\n<!-- ytsum -->");
    }

    #[test]
    fn test_insert_appends_without_marker() {
        let (updated, insertion) = insert_into_text("# Notes\n\n", "content", MARKER);
        assert_eq!(insertion, Insertion::Appended);
        assert_eq!(updated, "# Notes\n\ncontent");

        let (updated, _) = insert_into_text("", "content", MARKER);
        assert_eq!(updated, "content");
    }

    #[test]
    fn test_insert_with_empty_marker_appends() {
        let (updated, insertion) = insert_into_text("a\n\nb\n", "c", "");
        assert_eq!(insertion, Insertion::Appended);
        assert_eq!(updated, "a\n\nb\n\nc");
    }

    #[test]
    fn test_insert_into_document_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes").join("video.md");

        assert_eq!(insert_into_document(&path, "first\n", MARKER).unwrap(), Insertion::Created);
        assert_eq!(fs_err::read_to_string(&path).unwrap(), "first\n");

        fs_err::write(&path, "top\n<!-- ytsum -->\nbottom\n").unwrap();
        assert_eq!(
            insert_into_document(&path, "middle", MARKER).unwrap(),
            Insertion::ReplacedMarker
        );
        assert_eq!(fs_err::read_to_string(&path).unwrap(), "top\nmiddle\nbottom\n");

        assert_eq!(insert_into_document(&path, "end", MARKER).unwrap(), Insertion::Appended);
        assert_eq!(fs_err::read_to_string(&path).unwrap(), "top\nmiddle\nbottom\n\nend");
    }
}
