use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use similar::TextDiff;

use crate::errors::EditError;
use crate::results::FileMutationResult;

/// How a change is rendered. Purely a presentation choice, orthogonal to the
/// operation that produced the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputStyle {
    /// The complete modified file content
    PlainContent,
    /// A unified-diff-like patch
    UnifiedDiff,
    /// Inline `<<<<<<<`/`=======`/`>>>>>>>` conflict markers
    ConflictMarkers,
}

impl FromStr for OutputStyle {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(Self::PlainContent),
            "git_diff" => Ok(Self::UnifiedDiff),
            "git_conflict" => Ok(Self::ConflictMarkers),
            other => Err(EditError::validation(format!(
                "Invalid style '{}'. Must be one of: default, git_diff, git_conflict",
                other
            ))),
        }
    }
}

/// Renders the result of a replace operation over `original` in the
/// requested style.
///
/// A file with zero matches renders as the unchanged original under every
/// style except `UnifiedDiff`, which renders empty output for "no change".
pub fn render_replace(original: &str, result: &FileMutationResult, style: OutputStyle) -> String {
    match style {
        OutputStyle::PlainContent => render_plain(original, result),
        OutputStyle::UnifiedDiff => render_match_diff(original, result),
        OutputStyle::ConflictMarkers => render_match_conflict(original, result),
    }
}

/// Splices each match's replacement lines into the original, working from
/// the last match back to the first so earlier line numbers stay valid as
/// later splices shift indices.
fn render_plain(original: &str, result: &FileMutationResult) -> String {
    if !result.has_matches() {
        return original.to_string();
    }

    let mut lines: Vec<String> = original.split('\n').map(str::to_string).collect();
    for m in result.matches.iter().rev() {
        let idx = m.start_line - 1;
        let width = m.matched_lines.len();
        if idx < lines.len() {
            let end = (idx + width).min(lines.len());
            lines.splice(idx..end, m.replacement_lines.iter().cloned());
        }
    }
    lines.join("\n")
}

fn render_match_diff(_original: &str, result: &FileMutationResult) -> String {
    if !result.has_matches() {
        return String::new();
    }

    let path = result.path.display();
    let mut out = String::new();
    let _ = writeln!(out, "diff --git a/{} b/{}", path, path);
    let _ = writeln!(out, "index 0000000..0000000 100644");
    let _ = writeln!(out, "--- a/{}", path);
    let _ = writeln!(out, "+++ b/{}", path);

    // Each hunk is independent and expressed in original-file coordinates,
    // so no splice index correction is needed here.
    for m in &result.matches {
        let _ = writeln!(
            out,
            "@@ -{},1 +{},{} @@",
            m.start_line,
            m.start_line,
            m.replacement_lines.len()
        );
        for line in &m.matched_lines {
            let _ = writeln!(out, "-{}", line);
        }
        for line in &m.replacement_lines {
            let _ = writeln!(out, "+{}", line);
        }
    }

    // Match-order hunks, no trailing blank line
    out.truncate(out.trim_end_matches('\n').len());
    out
}

fn render_match_conflict(original: &str, result: &FileMutationResult) -> String {
    if !result.has_matches() {
        return original.to_string();
    }

    let mut lines: Vec<String> = original.split('\n').map(str::to_string).collect();
    for m in result.matches.iter().rev() {
        let idx = m.start_line - 1;
        let width = m.matched_lines.len();
        if idx < lines.len() {
            let end = (idx + width).min(lines.len());
            let mut block = Vec::with_capacity(width + m.replacement_lines.len() + 3);
            block.push("<<<<<<< HEAD".to_string());
            block.extend(m.matched_lines.iter().cloned());
            block.push("=======".to_string());
            block.extend(m.replacement_lines.iter().cloned());
            block.push(">>>>>>> incoming".to_string());
            lines.splice(idx..end, block);
        }
    }
    lines.join("\n")
}

/// Renders a whole-file write change in the requested style.
///
/// Unlike per-match rendering, the diff style here runs an actual line
/// diff (LCS-based, via `similar`) with 3 lines of context, matching
/// conventional unified-diff output.
pub fn render_write_change(
    path: &Path,
    original: &str,
    new: &str,
    is_new_file: bool,
    style: OutputStyle,
) -> String {
    match style {
        OutputStyle::PlainContent => new.to_string(),
        OutputStyle::UnifiedDiff => render_whole_file_diff(path, original, new, is_new_file),
        OutputStyle::ConflictMarkers => {
            if is_new_file {
                new.to_string()
            } else {
                format!(
                    "<<<<<<< HEAD\n{}\n=======\n{}\n>>>>>>> incoming",
                    original, new
                )
            }
        }
    }
}

fn render_whole_file_diff(path: &Path, original: &str, new: &str, is_new_file: bool) -> String {
    if original == new {
        return String::new();
    }

    let path = path.display();
    let mut out = String::new();

    if is_new_file {
        let _ = writeln!(out, "diff --git a/{} b/{}", path, path);
        let _ = writeln!(out, "new file mode 100644");
        let _ = writeln!(out, "index 0000000..1111111");
        let _ = writeln!(out, "--- /dev/null");
        let _ = writeln!(out, "+++ b/{}", path);

        let new_lines: Vec<&str> = new.split('\n').collect();
        let _ = writeln!(out, "@@ -0,0 +1,{} @@", new_lines.len());
        for line in new_lines {
            let _ = writeln!(out, "+{}", line);
        }
    } else {
        let _ = writeln!(out, "diff --git a/{} b/{}", path, path);
        let _ = writeln!(out, "index 0000000..1111111 100644");
        let _ = writeln!(out, "--- a/{}", path);
        let _ = writeln!(out, "+++ b/{}", path);

        let diff = TextDiff::from_lines(original, new);
        for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
            let _ = write!(out, "{}", hunk);
        }
    }

    out.truncate(out.trim_end_matches('\n').len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{find_matches, MatchSpec};
    use std::path::PathBuf;

    fn result_for(content: &str, spec: &MatchSpec) -> FileMutationResult {
        FileMutationResult {
            path: PathBuf::from("test.txt"),
            matches: find_matches(content, spec),
        }
    }

    #[test]
    fn test_style_parsing() {
        assert_eq!(
            "default".parse::<OutputStyle>().unwrap(),
            OutputStyle::PlainContent
        );
        assert_eq!(
            "git_diff".parse::<OutputStyle>().unwrap(),
            OutputStyle::UnifiedDiff
        );
        assert_eq!(
            "git_conflict".parse::<OutputStyle>().unwrap(),
            OutputStyle::ConflictMarkers
        );
        assert!("fancy".parse::<OutputStyle>().is_err());
    }

    #[test]
    fn test_plain_single_line() {
        let content = "a\nb\na";
        let spec = MatchSpec::new("a", "x");
        let result = result_for(content, &spec);
        assert_eq!(
            render_replace(content, &result, OutputStyle::PlainContent),
            "x\nb\nx"
        );
    }

    #[test]
    fn test_plain_one_to_many() {
        let content = "TODO\nrest";
        let spec = MatchSpec::new("TODO", "step 1\nstep 2");
        let result = result_for(content, &spec);
        assert_eq!(
            render_replace(content, &result, OutputStyle::PlainContent),
            "step 1\nstep 2\nrest"
        );
    }

    #[test]
    fn test_plain_many_to_one_keeps_earlier_line_numbers_valid() {
        // Two multi-line matches shrinking to one line each; the second
        // splice must not disturb the first match's position.
        let content = "A\nB\nkeep\nA\nB";
        let spec = MatchSpec::new("A\nB", "C");
        let result = result_for(content, &spec);
        assert_eq!(
            render_replace(content, &result, OutputStyle::PlainContent),
            "C\nkeep\nC"
        );
    }

    #[test]
    fn test_plain_no_matches_is_unchanged() {
        let content = "a\nb";
        let spec = MatchSpec::new("zzz", "x");
        let result = result_for(content, &spec);
        assert_eq!(
            render_replace(content, &result, OutputStyle::PlainContent),
            content
        );
    }

    #[test]
    fn test_rendered_output_has_no_remaining_matches() {
        let content = "old\nkeep\nold";
        let spec = MatchSpec::new("old", "new");
        let result = result_for(content, &spec);
        let rendered = render_replace(content, &result, OutputStyle::PlainContent);
        assert!(find_matches(&rendered, &spec).is_empty());
    }

    #[test]
    fn test_match_diff_layout() {
        let content = "a\nb";
        let spec = MatchSpec::new("a", "x\ny");
        let result = result_for(content, &spec);
        let diff = render_replace(content, &result, OutputStyle::UnifiedDiff);

        assert!(diff.starts_with("diff --git a/test.txt b/test.txt"));
        assert!(diff.contains("--- a/test.txt"));
        assert!(diff.contains("+++ b/test.txt"));
        assert!(diff.contains("@@ -1,1 +1,2 @@"));
        assert!(diff.contains("-a"));
        assert!(diff.contains("+x"));
        assert!(diff.contains("+y"));
    }

    #[test]
    fn test_match_diff_empty_when_no_matches() {
        let content = "a\nb";
        let spec = MatchSpec::new("zzz", "x");
        let result = result_for(content, &spec);
        assert_eq!(
            render_replace(content, &result, OutputStyle::UnifiedDiff),
            ""
        );
    }

    #[test]
    fn test_conflict_markers() {
        let content = "a\nb";
        let spec = MatchSpec::new("a", "x");
        let result = result_for(content, &spec);
        let rendered = render_replace(content, &result, OutputStyle::ConflictMarkers);
        assert_eq!(
            rendered,
            "<<<<<<< HEAD\na\n=======\nx\n>>>>>>> incoming\nb"
        );
    }

    #[test]
    fn test_whole_file_diff_new_file() {
        let path = PathBuf::from("new.txt");
        let diff = render_write_change(&path, "", "one\ntwo", true, OutputStyle::UnifiedDiff);
        assert!(diff.contains("new file mode 100644"));
        assert!(diff.contains("--- /dev/null"));
        assert!(diff.contains("@@ -0,0 +1,2 @@"));
        assert!(diff.contains("+one"));
        assert!(diff.contains("+two"));
    }

    #[test]
    fn test_whole_file_diff_modified() {
        let path = PathBuf::from("f.txt");
        let original = "line 1\nline 2\nline 3\n";
        let new = "line 1\nchanged\nline 3\n";
        let diff = render_write_change(&path, original, new, false, OutputStyle::UnifiedDiff);
        assert!(diff.contains("--- a/f.txt"));
        assert!(diff.contains("-line 2"));
        assert!(diff.contains("+changed"));
        // Unchanged neighbors appear as context
        assert!(diff.contains(" line 1"));
        assert!(diff.contains(" line 3"));
    }

    #[test]
    fn test_whole_file_conflict() {
        let path = PathBuf::from("f.txt");
        let rendered =
            render_write_change(&path, "old", "new", false, OutputStyle::ConflictMarkers);
        assert_eq!(
            rendered,
            "<<<<<<< HEAD\nold\n=======\nnew\n>>>>>>> incoming"
        );
    }
}
