//! Index document listing the most recent artifacts.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use walkdir::WalkDir;

use super::PUBLISH_DIR;
use crate::error::{PublishError, PublishResult};

/// Index file name at the working copy root.
pub const INDEX_FILE: &str = "README.md";

/// Number of artifacts listed in the index.
pub const INDEX_LIMIT: usize = 20;

const ARTIFACT_EXTENSION: &str = "md";

/// One line of the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub title: String,
    /// Link target relative to the working copy root.
    pub link: String,
}

/// Scan `publish_dir` for artifacts, newest-looking file name first.
pub(super) fn collect_entries(publish_dir: &Path) -> PublishResult<Vec<IndexEntry>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(publish_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(publish_dir).to_path_buf();
            PublishError::io(path, e.into())
        })?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(ARTIFACT_EXTENSION)
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    // File names embed a sortable date token, so descending name order is newest first.
    names.sort_unstable_by(|a, b| b.cmp(a));

    Ok(names
        .into_iter()
        .take(INDEX_LIMIT)
        .map(|name| IndexEntry {
            title: artifact_title(&publish_dir.join(&name)),
            link: format!("{PUBLISH_DIR}/{}", escape_link(&name)),
        })
        .collect())
}

/// Percent-encode the characters that end or split a Markdown link target.
fn escape_link(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            ' ' => out.push_str("%20"),
            '(' => out.push_str("%28"),
            ')' => out.push_str("%29"),
            '<' => out.push_str("%3C"),
            '>' => out.push_str("%3E"),
            _ => out.push(c),
        }
    }
    out
}

/// Backslash-escape brackets so a title cannot close the link text early.
fn escape_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        if matches!(c, '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// First line of the artifact without its heading marker, or the file stem.
fn artifact_title(path: &Path) -> String {
    let stem = || {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    };

    let mut first_line = String::new();
    let read = File::open(path).and_then(|f| BufReader::new(f).read_line(&mut first_line));
    if read.is_err() {
        return stem();
    }

    let title = first_line.trim().trim_start_matches('#').trim();
    if title.is_empty() {
        stem()
    } else {
        title.to_string()
    }
}

/// Render the full index document.
///
/// Output depends only on `entries`, so regenerating with the same artifacts
/// is byte-identical.
pub fn render_index(entries: &[IndexEntry]) -> String {
    let mut lines = vec![
        "# Report Archive".to_string(),
        String::new(),
        "## Recent Reports".to_string(),
        String::new(),
    ];

    lines.extend(
        entries
            .iter()
            .map(|entry| format!("- [{}]({})", escape_title(&entry.title), entry.link)),
    );

    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(String::new());
    lines.push("*Generated and updated automatically by report-publisher*".to_string());
    lines.push(String::new());

    lines.join("\n")
}
