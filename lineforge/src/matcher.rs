use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{EditError, EditResult};

/// What to look for and what to put in its place.
///
/// The search text is matched as exact lines, never as a regex. A search
/// containing embedded line breaks requests a multi-line block match. The
/// replacement is always held as an ordered sequence of lines; a bare string
/// is split on line breaks at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSpec {
    /// Exact line(s) to find; `\n` separates the lines of a block pattern
    pub search: String,
    /// Replacement lines spliced in where the search matches
    pub replacement: Vec<String>,
    /// Compare lines case-sensitively (default) or case-folded
    pub case_sensitive: bool,
    /// Optional 1-based first line of the search window
    pub start_line: Option<usize>,
    /// Optional 1-based last line of the search window
    pub end_line: Option<usize>,
}

impl MatchSpec {
    /// Creates a spec with the replacement split into lines
    pub fn new(search: impl Into<String>, replacement: &str) -> Self {
        Self {
            search: search.into(),
            replacement: replacement.split('\n').map(str::to_string).collect(),
            case_sensitive: true,
            start_line: None,
            end_line: None,
        }
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    pub fn with_line_range(mut self, start: Option<usize>, end: Option<usize>) -> Self {
        self.start_line = start;
        self.end_line = end;
        self
    }

    /// Checks the range invariant before any file is touched
    pub fn validate(&self) -> EditResult<()> {
        if let (Some(start), Some(end)) = (self.start_line, self.end_line) {
            if start > end {
                return Err(EditError::validation(format!(
                    "start_line {} is greater than end_line {}",
                    start, end
                )));
            }
            if start == 0 {
                return Err(EditError::validation(
                    "line numbers are 1-based; start_line 0 is invalid",
                ));
            }
        }
        Ok(())
    }

    /// The replacement joined back into a single string
    pub fn replacement_text(&self) -> String {
        self.replacement.join("\n")
    }
}

/// A single match: the consumed block and its replacement.
/// Produced read-only; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineMatch {
    /// 1-based line number where the matched block starts
    pub start_line: usize,
    /// The original text lines the match consumed
    pub matched_lines: Vec<String>,
    /// The lines that replace the matched block
    pub replacement_lines: Vec<String>,
}

/// Finds every non-overlapping match of `spec` within `content`.
///
/// Single-line searches compare the stripped search text against each
/// stripped candidate line. Multi-line searches slide a window the size of
/// the search block; a match requires every corresponding pair of lines to
/// pass the same stripped-equality test, and the window then advances past
/// the whole block so matches never overlap.
///
/// A malformed window (clamped start past clamped end) yields no matches
/// rather than an error, as does an empty search text.
pub fn find_matches(content: &str, spec: &MatchSpec) -> Vec<LineMatch> {
    let lines: Vec<&str> = content.split('\n').collect();
    if spec.search.is_empty() || lines.is_empty() {
        return Vec::new();
    }

    // Clamp the optional 1-based bounds into [0, len - 1]
    let start_idx = spec.start_line.map_or(0, |n| n.saturating_sub(1));
    let end_idx = spec
        .end_line
        .map_or(lines.len() - 1, |n| n.saturating_sub(1))
        .min(lines.len() - 1);
    if start_idx > end_idx {
        debug!(
            "Search window [{:?}, {:?}] is empty after clamping",
            spec.start_line, spec.end_line
        );
        return Vec::new();
    }

    let search_lines: Vec<&str> = spec.search.split('\n').collect();
    let matches = if search_lines.len() > 1 {
        find_multiline_matches(&lines, &search_lines, spec, start_idx, end_idx)
    } else {
        find_single_line_matches(&lines, spec, start_idx, end_idx)
    };

    debug!("Found {} match(es)", matches.len());
    matches
}

fn find_single_line_matches(
    lines: &[&str],
    spec: &MatchSpec,
    start_idx: usize,
    end_idx: usize,
) -> Vec<LineMatch> {
    let mut matches = Vec::new();
    for (i, line) in lines.iter().enumerate().take(end_idx + 1).skip(start_idx) {
        if line_matches(line, &spec.search, spec.case_sensitive) {
            matches.push(LineMatch {
                start_line: i + 1,
                matched_lines: vec![line.to_string()],
                replacement_lines: spec.replacement.clone(),
            });
        }
    }
    matches
}

fn find_multiline_matches(
    lines: &[&str],
    search_lines: &[&str],
    spec: &MatchSpec,
    start_idx: usize,
    end_idx: usize,
) -> Vec<LineMatch> {
    let mut matches = Vec::new();
    let n = search_lines.len();

    let mut i = start_idx;
    while i + n <= end_idx + 1 {
        let candidate = &lines[i..i + n];
        let is_match = candidate
            .iter()
            .zip(search_lines)
            .all(|(line, search)| line_matches(line, search, spec.case_sensitive));

        if is_match {
            matches.push(LineMatch {
                start_line: i + 1,
                matched_lines: candidate.iter().map(|l| l.to_string()).collect(),
                replacement_lines: spec.replacement.clone(),
            });
            // Skip past the matched block so matches never overlap
            i += n;
        } else {
            i += 1;
        }
    }
    matches
}

fn line_matches(line: &str, search: &str, case_sensitive: bool) -> bool {
    let line = line.trim();
    let search = search.trim();
    if case_sensitive {
        line == search
    } else {
        line.to_lowercase() == search.to_lowercase()
    }
}
