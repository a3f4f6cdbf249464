use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use regex::Regex;
use tracing::{debug, warn};

use crate::errors::{EditError, EditResult};
use crate::results::{FileSearchResult, SearchHit};
use crate::tree::ResultTree;
use crate::workspace::{is_within_workspace, read_file_content};

/// Directory names skipped during discovery. Build artifacts, tool caches,
/// and dependency trees never hold content worth listing.
const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".gradle",
    ".idea",
    ".next",
    ".nuxt",
    ".pytest_cache",
    ".sass-cache",
    ".terraform",
    ".vs",
    ".vscode",
    "__pycache__",
    "bin",
    "build",
    "bundle",
    "coverage",
    "deps",
    "dist",
    "env",
    "node_modules",
    "obj",
    "out",
    "pkg",
    "target",
    "temp",
    "vendor",
    "venv",
];

/// File-name suffixes skipped during discovery: media, caches, archives,
/// logs, and other binary or generated content.
const EXCLUDED_SUFFIXES: &[&str] = &[
    ".7z", ".avi", ".bak", ".bin", ".bmp", ".cache", ".db", ".dll", ".dmp", ".dylib", ".exe",
    ".flac", ".gif", ".gz", ".ico", ".iso", ".jpeg", ".jpg", ".lock", ".log", ".mkv", ".mov",
    ".mp3", ".mp4", ".ogg", ".old", ".otf", ".parquet", ".pdb", ".png", ".pyc", ".pyo", ".rar",
    ".so", ".sqlite", ".swp", ".tar", ".tiff", ".tmp", ".ttf", ".wav", ".webm", ".webp", ".woff",
    ".woff2", ".zip",
];

/// A read-only content listing over one file or a directory subtree.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// File or directory to scan
    pub path: PathBuf,
    /// Regex applied to each line
    pub content_pattern: String,
    /// Glob applied to candidate file names, `*` to take everything
    pub file_pattern: String,
    /// Workspace root for the boundary check
    pub workspace_root: PathBuf,
    /// Permit targets outside the workspace root
    pub allow_outside_workspace: bool,
}

impl SearchQuery {
    pub fn new(
        path: impl Into<PathBuf>,
        content_pattern: impl Into<String>,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            path: path.into(),
            content_pattern: content_pattern.into(),
            file_pattern: "*".to_string(),
            workspace_root: workspace_root.into(),
            allow_outside_workspace: false,
        }
    }

    pub fn with_file_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.file_pattern = pattern.into();
        self
    }

    pub fn allow_outside(mut self, allow: bool) -> Self {
        self.allow_outside_workspace = allow;
        self
    }
}

/// Scans the query target line by line and returns every file that has at
/// least one matching line. Unreadable files are logged and skipped.
pub fn search(query: &SearchQuery) -> EditResult<Vec<FileSearchResult>> {
    if !query.path.exists() {
        return Err(EditError::file_not_found(&query.path));
    }
    if !query.allow_outside_workspace
        && !is_within_workspace(&query.path, &query.workspace_root)
    {
        return Err(EditError::blocked(format!(
            "Path '{}' is outside workspace '{}' and external search is disabled",
            query.path.display(),
            query.workspace_root.display()
        )));
    }

    let pattern = Regex::new(&query.content_pattern).map_err(|e| {
        EditError::validation(format!(
            "Invalid content pattern '{}': {}",
            query.content_pattern, e
        ))
    })?;

    let files = discover_files(&query.path, &query.file_pattern)?;
    debug!("Scanning {} file(s) under {}", files.len(), query.path.display());

    let mut results = Vec::new();
    for file in files {
        let content = match read_file_content(&file) {
            Ok(content) => content,
            Err(e) => {
                warn!("Error reading file {}: {}", file.display(), e);
                continue;
            }
        };

        let mut matches = Vec::new();
        let mut total_lines = 0;
        for (i, line) in content.lines().enumerate() {
            total_lines = i + 1;
            if pattern.is_match(line) {
                matches.push(SearchHit {
                    line: i + 1,
                    text: line.trim().to_string(),
                });
            }
        }

        if !matches.is_empty() {
            results.push(FileSearchResult {
                path: file,
                matches,
                total_lines,
            });
        }
    }
    Ok(results)
}

/// Expands a target into the files to scan. A single file is taken as-is;
/// a directory is walked recursively with artifact directories and binary
/// file types filtered out, keeping only names that match `file_pattern`.
fn discover_files(path: &Path, file_pattern: &str) -> EditResult<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let name_glob = glob::Pattern::new(file_pattern)
        .map_err(|e| EditError::validation(format!("Invalid file pattern '{}': {}", file_pattern, e)))?;

    let mut files = Vec::new();
    let walker = WalkBuilder::new(path)
        .standard_filters(false)
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !(entry.path().is_dir() && EXCLUDED_DIRS.contains(&name.as_ref()))
        })
        .build();

    for entry in walker.flatten() {
        let entry_path = entry.path();
        if !entry_path.is_file() {
            continue;
        }
        let name = entry_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if EXCLUDED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
            continue;
        }
        if !name_glob.matches(&name) {
            continue;
        }
        files.push(entry_path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

/// Serializes results for machine-readable output.
pub fn format_results_json(results: &[FileSearchResult]) -> EditResult<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// Formats results as a flat per-file listing with match rows.
pub fn format_results_flat(
    results: &[FileSearchResult],
    max_matches_per_file: usize,
    only_filenames: bool,
) -> String {
    if results.is_empty() {
        return "No matching results found".to_string();
    }

    let mut out = format!("Found {} files with matches\n\n", results.len());
    for result in results {
        if result.matches.len() == result.total_lines {
            let _ = writeln!(
                out,
                "# {} (entire file content returned)",
                result.path.display()
            );
        } else {
            let _ = writeln!(
                out,
                "# {} ({} matches)",
                result.path.display(),
                result.matches.len()
            );
        }
        if !only_filenames {
            out.push_str(&result.format_matches("", max_matches_per_file));
        }
        out.push('\n');
    }
    out
}

/// Formats results as a compressed directory tree with match rows under
/// each leaf.
pub fn format_results_tree(
    results: &[FileSearchResult],
    max_matches_per_file: usize,
    only_filenames: bool,
) -> String {
    if results.is_empty() {
        return "No matching results found".to_string();
    }

    let display_results: Vec<FileSearchResult> = results
        .iter()
        .map(|r| {
            let mut r = r.clone();
            if only_filenames {
                r.matches.clear();
            }
            r
        })
        .collect();

    let tree = ResultTree::build(display_results, true);
    format!(
        "Found {} files with matches\n\n{}",
        results.len(),
        tree.format(max_matches_per_file)
    )
}
