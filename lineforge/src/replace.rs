use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::{debug, info, warn};

use crate::errors::{EditError, EditResult};
use crate::guard::{PathGuard, ShellKind};
use crate::matcher::{find_matches, MatchSpec};
use crate::modes::{ConfirmGate, Decision, ExecutionMode};
use crate::render::{render_replace, OutputStyle};
use crate::results::{FileMutationResult, ReplaceStatus, ReplaceSummary};
use crate::workspace::read_file_content;

/// One replace request: where to look, what to match, how to run.
#[derive(Debug, Clone)]
pub struct ReplaceRequest {
    /// File or directory to process
    pub target: PathBuf,
    pub spec: MatchSpec,
    /// Glob applied to file names when the target is a directory
    pub file_pattern: String,
    pub mode: ExecutionMode,
    pub style: OutputStyle,
    /// Redirects applied output away from the matched file
    pub output_path: Option<PathBuf>,
}

impl ReplaceRequest {
    pub fn new(target: impl Into<PathBuf>, spec: MatchSpec) -> Self {
        Self {
            target: target.into(),
            spec,
            file_pattern: "*".to_string(),
            mode: ExecutionMode::Preview,
            style: OutputStyle::PlainContent,
            output_path: None,
        }
    }

    pub fn with_file_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.file_pattern = pattern.into();
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_style(mut self, style: OutputStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_output_path(mut self, path: Option<PathBuf>) -> Self {
        self.output_path = path;
        self
    }
}

/// A file's change rendered in the requested style, ready for display.
#[derive(Debug, Clone)]
pub struct RenderedChange {
    pub path: PathBuf,
    pub match_count: usize,
    pub text: String,
}

/// Outcome of one replace run: the aggregate summary plus per-file
/// rendered output for files that had matches.
#[derive(Debug)]
pub struct ReplaceOutcome {
    pub summary: ReplaceSummary,
    pub rendered: Vec<RenderedChange>,
    /// Paths written in apply mode, in write order
    pub written: Vec<PathBuf>,
}

impl ReplaceOutcome {
    fn bare(status: ReplaceStatus) -> Self {
        Self {
            summary: ReplaceSummary::new(status),
            rendered: Vec::new(),
            written: Vec::new(),
        }
    }
}

/// Orchestrates discovery, matching, rendering, and writing for the
/// replace-in-place operation family.
pub struct ReplaceEngine {
    guard: PathGuard,
}

impl ReplaceEngine {
    pub fn new(workspace_root: impl Into<PathBuf>, shell: ShellKind) -> Self {
        Self {
            guard: PathGuard::new(workspace_root, shell),
        }
    }

    /// Runs one replace request. The confirmation gate is consulted only in
    /// `PreviewThenConfirm` mode, and only when there is something to apply.
    pub fn run(
        &self,
        request: &ReplaceRequest,
        gate: &mut dyn ConfirmGate,
    ) -> EditResult<ReplaceOutcome> {
        request.spec.validate()?;

        // Replacing text with itself would scan everything to change nothing
        if request.spec.search.trim() == request.spec.replacement_text().trim() {
            info!("Search and replacement are identical; no changes needed");
            return Ok(ReplaceOutcome::bare(ReplaceStatus::NoChangesNeeded));
        }

        let files = self.resolve_files(&request.target, &request.file_pattern)?;
        debug!("Processing {} file(s)", files.len());

        let mut summary = ReplaceSummary::new(ReplaceStatus::Completed);
        let mut rendered = Vec::new();

        for file in files {
            let content = match read_file_content(&file) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Error processing {}: {}", file.display(), e);
                    continue;
                }
            };

            let matches = find_matches(&content, &request.spec);
            let file_result = FileMutationResult {
                path: file.clone(),
                matches,
            };

            if file_result.has_matches() {
                rendered.push(RenderedChange {
                    path: file.clone(),
                    match_count: file_result.total_matches(),
                    text: render_replace(&content, &file_result, request.style),
                });
            }
            summary.add_file_result(file_result);
        }

        let apply = match request.mode {
            ExecutionMode::Preview => false,
            ExecutionMode::Apply => true,
            ExecutionMode::PreviewThenConfirm => {
                if summary.total_matches() == 0 {
                    false
                } else {
                    for change in &rendered {
                        gate.show(&format!(
                            "\n{}\nFile: {}\nMatches: {}\n{}\n{}",
                            "=".repeat(60),
                            change.path.display(),
                            change.match_count,
                            "=".repeat(60),
                            change.text
                        ));
                    }
                    let prompt = format!(
                        "Apply {} change(s) across {} file(s)?",
                        summary.total_matches(),
                        summary.files_with_matches()
                    );
                    match gate.confirm(&prompt) {
                        Decision::Yes => true,
                        Decision::No | Decision::Interrupted => {
                            info!("Replace cancelled at confirmation gate");
                            summary.status = ReplaceStatus::Cancelled;
                            return Ok(ReplaceOutcome {
                                summary,
                                rendered,
                                written: Vec::new(),
                            });
                        }
                    }
                }
            }
        };

        let mut written = Vec::new();
        if apply {
            for change in &rendered {
                let target = resolve_apply_path(
                    &change.path,
                    request.output_path.as_deref(),
                    request.style,
                );
                match fs::write(&target, &change.text) {
                    Ok(()) => {
                        info!("Applied changes to: {}", target.display());
                        written.push(target);
                    }
                    Err(e) => {
                        warn!("Error writing to {}: {}", target.display(), e);
                    }
                }
            }
        }

        Ok(ReplaceOutcome {
            summary,
            rendered,
            written,
        })
    }

    /// A file target is used directly. A directory target is walked
    /// recursively, keeping files whose names match the pattern and that the
    /// ignore rules allow. A missing target is fatal.
    fn resolve_files(&self, target: &Path, file_pattern: &str) -> EditResult<Vec<PathBuf>> {
        if target.is_file() {
            return Ok(vec![target.to_path_buf()]);
        }
        if !target.is_dir() {
            return Err(EditError::file_not_found(target));
        }

        let name_glob = glob::Pattern::new(file_pattern).map_err(|e| {
            EditError::validation(format!("Invalid file pattern '{}': {}", file_pattern, e))
        })?;

        let mut files = Vec::new();
        for entry in WalkBuilder::new(target)
            .standard_filters(false)
            .build()
            .flatten()
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !name_glob.matches(&name) {
                continue;
            }
            if !self.guard.is_allowed(path) {
                debug!("Skipping {}: excluded by ignore rules", path.display());
                continue;
            }
            files.push(path.to_path_buf());
        }
        files.sort();
        Ok(files)
    }
}

/// Default style goes back to the matched file (or the explicit output
/// path); diff style goes to a sibling `.diff` file; conflict style is
/// written as literal conflict-marked text in place.
fn resolve_apply_path(path: &Path, output_path: Option<&Path>, style: OutputStyle) -> PathBuf {
    let base = output_path.unwrap_or(path).to_path_buf();
    match style {
        OutputStyle::UnifiedDiff => {
            let mut name = base.into_os_string();
            name.push(".diff");
            PathBuf::from(name)
        }
        _ => base,
    }
}
