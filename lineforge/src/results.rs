use std::fmt::Write as _;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::matcher::LineMatch;

/// All line matches found in a single file by the replace engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMutationResult {
    /// The path to the file
    pub path: PathBuf,
    /// All matches found in the file
    pub matches: Vec<LineMatch>,
}

impl FileMutationResult {
    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }

    pub fn total_matches(&self) -> usize {
        self.matches.len()
    }
}

/// How a replace run terminated. Cancellation is a terminal outcome in its
/// own right, distinguishable from both success and failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplaceStatus {
    /// The operation ran to completion (preview or apply)
    Completed,
    /// Search and replacement were identical; nothing was scanned
    NoChangesNeeded,
    /// The user declined or interrupted at the confirmation gate
    Cancelled,
}

/// Aggregated results of one replace operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceSummary {
    pub status: ReplaceStatus,
    /// Per-file results, in discovery order
    pub file_results: Vec<FileMutationResult>,
    /// Number of files read and scanned (unreadable files are not counted)
    pub files_scanned: usize,
}

impl ReplaceSummary {
    pub fn new(status: ReplaceStatus) -> Self {
        Self {
            status,
            file_results: Vec::new(),
            files_scanned: 0,
        }
    }

    pub fn add_file_result(&mut self, file_result: FileMutationResult) {
        self.files_scanned += 1;
        self.file_results.push(file_result);
    }

    pub fn total_matches(&self) -> usize {
        self.file_results.iter().map(|fr| fr.total_matches()).sum()
    }

    pub fn files_with_matches(&self) -> usize {
        self.file_results.iter().filter(|fr| fr.has_matches()).count()
    }

    /// Serializes the summary for machine-readable output
    pub fn to_json(&self) -> crate::errors::EditResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A single line hit from the read-only search scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// 1-based line number
    pub line: usize,
    /// The stripped text of the matching line
    pub text: String,
}

/// All search hits found in a single file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSearchResult {
    pub path: PathBuf,
    pub matches: Vec<SearchHit>,
    /// Total lines in the file, used to flag "entire file matched"
    pub total_lines: usize,
}

impl FileSearchResult {
    /// Formats the hits as `line | text` rows, truncated after
    /// `max_matches_per_file` with a note about how many were hidden.
    pub fn format_matches(&self, prefix: &str, max_matches_per_file: usize) -> String {
        let mut out = String::new();
        for hit in self.matches.iter().take(max_matches_per_file) {
            let _ = writeln!(out, "{}  {:<3} | {}", prefix, hit.line, hit.text);
        }
        if self.matches.len() > max_matches_per_file {
            let remaining = self.matches.len() - max_matches_per_file;
            let _ = writeln!(
                out,
                "{}  ... [Content truncated - {} more matches hidden]",
                prefix, remaining
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(line: usize, text: &str) -> SearchHit {
        SearchHit {
            line,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_summary_counters() {
        let mut summary = ReplaceSummary::new(ReplaceStatus::Completed);
        summary.add_file_result(FileMutationResult {
            path: PathBuf::from("a.txt"),
            matches: vec![
                LineMatch {
                    start_line: 1,
                    matched_lines: vec!["x".to_string()],
                    replacement_lines: vec!["y".to_string()],
                },
                LineMatch {
                    start_line: 3,
                    matched_lines: vec!["x".to_string()],
                    replacement_lines: vec!["y".to_string()],
                },
            ],
        });
        summary.add_file_result(FileMutationResult {
            path: PathBuf::from("b.txt"),
            matches: vec![],
        });

        assert_eq!(summary.files_scanned, 2);
        assert_eq!(summary.files_with_matches(), 1);
        assert_eq!(summary.total_matches(), 2);
    }

    #[test]
    fn test_format_matches_truncation() {
        let result = FileSearchResult {
            path: PathBuf::from("x.txt"),
            matches: (1..=5).map(|i| hit(i, "line")).collect(),
            total_lines: 5,
        };

        let rendered = result.format_matches("", 3);
        assert_eq!(rendered.lines().count(), 4);
        assert!(rendered.contains("2 more matches hidden"));

        let rendered = result.format_matches("", 10);
        assert_eq!(rendered.lines().count(), 5);
        assert!(!rendered.contains("hidden"));
    }

    #[test]
    fn test_summary_to_json() {
        let mut summary = ReplaceSummary::new(ReplaceStatus::Completed);
        summary.add_file_result(FileMutationResult {
            path: PathBuf::from("a.txt"),
            matches: vec![],
        });
        let json = summary.to_json().unwrap();
        assert!(json.contains("\"files_scanned\": 1"));
        assert!(json.contains("Completed"));
    }
}
