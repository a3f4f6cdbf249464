use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{EditError, EditResult};
use crate::modes::{ConfirmGate, Decision, ExecutionMode};
use crate::render::{render_write_change, OutputStyle};
use crate::workspace::{is_within_workspace, read_file_content};

/// How new content combines with what is already on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteOperation {
    /// Create a new file; an existing target is an error
    Create,
    /// Replace the entire file content
    Overwrite,
    /// Join new content after the original
    Append,
    /// Join new content before the original
    Prepend,
}

impl FromStr for WriteOperation {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "overwrite" => Ok(Self::Overwrite),
            "append" => Ok(Self::Append),
            "prepend" => Ok(Self::Prepend),
            other => Err(EditError::validation(format!(
                "Invalid operation '{}'. Must be one of: create, overwrite, append, prepend",
                other
            ))),
        }
    }
}

/// Collapses `\r\n` and bare `\r` line endings to `\n`
pub fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

/// A single whole-file write request. Content line endings are normalized
/// at construction.
#[derive(Debug, Clone)]
pub struct WriteSpec {
    pub path: PathBuf,
    pub content: String,
    pub operation: WriteOperation,
}

impl WriteSpec {
    pub fn new(
        path: impl Into<PathBuf>,
        content: impl Into<String>,
        operation: WriteOperation,
    ) -> Self {
        Self {
            path: path.into(),
            content: normalize_line_endings(&content.into()),
            operation,
        }
    }
}

/// The computed before/after pair for one write request.
#[derive(Debug, Clone)]
pub struct FileChange {
    pub path: PathBuf,
    pub original_content: String,
    pub new_content: String,
    pub operation: WriteOperation,
    /// The target did not exist when the change was prepared
    pub is_new_file: bool,
}

impl FileChange {
    pub fn has_changes(&self) -> bool {
        self.original_content != self.new_content
    }

    pub fn content_size(&self) -> usize {
        self.new_content.len()
    }

    pub fn line_count(&self) -> usize {
        self.new_content.split('\n').count()
    }
}

/// How a write run terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteStatus {
    /// Rendered only; storage untouched
    Previewed,
    /// Written to storage
    Applied,
    /// New content matched the existing content; nothing written
    NoChangesNeeded,
    /// The user declined or interrupted at the confirmation gate
    Cancelled,
}

/// Outcome of one write operation.
#[derive(Debug)]
pub struct WriteReport {
    pub path: PathBuf,
    pub status: WriteStatus,
    pub change: Option<FileChange>,
    /// Path the content was written to, when applied
    pub written_path: Option<PathBuf>,
    pub backup_path: Option<PathBuf>,
    /// The change rendered in the requested style
    pub rendered: String,
    /// Advisory safety warnings; never block the operation
    pub warnings: Vec<String>,
}

impl WriteReport {
    fn bare(path: PathBuf, status: WriteStatus) -> Self {
        Self {
            path,
            status,
            change: None,
            written_path: None,
            backup_path: None,
            rendered: String::new(),
            warnings: Vec::new(),
        }
    }
}

/// Executes whole-file write operations with preview/apply/confirm modes,
/// backups, and advisory safety checks.
pub struct WriteEngine {
    workspace_root: PathBuf,
    backup_enabled: bool,
}

impl WriteEngine {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            backup_enabled: true,
        }
    }

    pub fn with_backup(mut self, enabled: bool) -> Self {
        self.backup_enabled = enabled;
        self
    }

    /// Runs one write request.
    ///
    /// `output_path` redirects the applied content away from the target;
    /// the original file is then left untouched. The confirmation gate is
    /// consulted only in `PreviewThenConfirm` mode.
    pub fn run(
        &self,
        spec: &WriteSpec,
        mode: ExecutionMode,
        style: OutputStyle,
        output_path: Option<&Path>,
        gate: &mut dyn ConfirmGate,
    ) -> EditResult<WriteReport> {
        if self.is_content_identical(spec) {
            info!(
                "Content identical to {}; no changes needed",
                spec.path.display()
            );
            return Ok(WriteReport::bare(
                spec.path.clone(),
                WriteStatus::NoChangesNeeded,
            ));
        }

        let change = self.prepare_change(spec)?;
        let warnings = self.safety_warnings(spec, &change);
        for warning in &warnings {
            warn!("{}", warning);
        }

        // A new file is always worth creating, even with empty content
        if !change.is_new_file && !change.has_changes() {
            return Ok(WriteReport::bare(
                spec.path.clone(),
                WriteStatus::NoChangesNeeded,
            ));
        }

        let rendered = render_write_change(
            &change.path,
            &change.original_content,
            &change.new_content,
            change.is_new_file,
            style,
        );

        let confirmed = match mode {
            ExecutionMode::Preview => {
                return Ok(WriteReport {
                    path: spec.path.clone(),
                    status: WriteStatus::Previewed,
                    change: Some(change),
                    written_path: None,
                    backup_path: None,
                    rendered,
                    warnings,
                });
            }
            ExecutionMode::Apply => true,
            ExecutionMode::PreviewThenConfirm => {
                gate.show(&rendered);
                let prompt = format!("Apply these changes to {}?", spec.path.display());
                matches!(gate.confirm(&prompt), Decision::Yes)
            }
        };

        if !confirmed {
            info!("Write to {} cancelled", spec.path.display());
            return Ok(WriteReport {
                path: spec.path.clone(),
                status: WriteStatus::Cancelled,
                change: Some(change),
                written_path: None,
                backup_path: None,
                rendered,
                warnings,
            });
        }

        let target = self.resolve_target(&spec.path, output_path, style);
        let backup_path = if self.backup_enabled
            && target.exists()
            && target == spec.path
            && style == OutputStyle::PlainContent
        {
            let backup = create_backup(&target)?;
            if let Some(backup) = &backup {
                info!("Backup created: {}", backup.display());
            }
            backup
        } else {
            None
        };

        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&target, &rendered)?;
        debug!("Wrote {} bytes to {}", rendered.len(), target.display());

        Ok(WriteReport {
            path: spec.path.clone(),
            status: WriteStatus::Applied,
            change: Some(change),
            written_path: Some(target),
            backup_path,
            rendered,
            warnings,
        })
    }

    /// Diff-style output never clobbers the target; it goes to a sibling
    /// `.diff` file unless an explicit output path was given.
    fn resolve_target(
        &self,
        path: &Path,
        output_path: Option<&Path>,
        style: OutputStyle,
    ) -> PathBuf {
        if let Some(output) = output_path {
            return output.to_path_buf();
        }
        match style {
            OutputStyle::UnifiedDiff => {
                let mut name = path.as_os_str().to_os_string();
                name.push(".diff");
                PathBuf::from(name)
            }
            _ => path.to_path_buf(),
        }
    }

    fn prepare_change(&self, spec: &WriteSpec) -> EditResult<FileChange> {
        let exists = spec.path.exists();
        if spec.operation == WriteOperation::Create && exists {
            return Err(EditError::already_exists(&spec.path));
        }

        let original_content = if exists {
            normalize_line_endings(&read_file_content(&spec.path)?)
        } else {
            String::new()
        };

        let new_content = match spec.operation {
            WriteOperation::Create | WriteOperation::Overwrite => spec.content.clone(),
            WriteOperation::Append => {
                if !original_content.is_empty() && !original_content.ends_with('\n') {
                    format!("{}\n{}", original_content, spec.content)
                } else {
                    format!("{}{}", original_content, spec.content)
                }
            }
            WriteOperation::Prepend => {
                if !spec.content.is_empty() && !spec.content.ends_with('\n') {
                    format!("{}\n{}", spec.content, original_content)
                } else {
                    format!("{}{}", spec.content, original_content)
                }
            }
        };

        Ok(FileChange {
            path: spec.path.clone(),
            original_content,
            new_content,
            operation: spec.operation,
            is_new_file: !exists,
        })
    }

    fn is_content_identical(&self, spec: &WriteSpec) -> bool {
        if spec.operation != WriteOperation::Overwrite || !spec.path.exists() {
            return false;
        }
        match read_file_content(&spec.path) {
            Ok(existing) => {
                normalize_line_endings(&existing).trim() == spec.content.trim()
            }
            Err(_) => false,
        }
    }

    /// Advisory checks: large content, binary markers, boundary crossings,
    /// and access problems. Warnings are reported, never enforced.
    fn safety_warnings(&self, spec: &WriteSpec, change: &FileChange) -> Vec<String> {
        let mut warnings = Vec::new();

        if !is_within_workspace(&spec.path, &self.workspace_root) {
            warnings.push(format!(
                "Writing outside workspace: {}",
                spec.path.display()
            ));
        }

        if spec.content.len() > 1024 * 1024 {
            warnings.push(format!(
                "Large content size: {:.1}MB",
                spec.content.len() as f64 / 1024.0 / 1024.0
            ));
        }

        let line_count = change.line_count();
        if line_count > 10_000 {
            warnings.push(format!("Large line count: {} lines", line_count));
        }

        if spec.content.contains('\0') {
            warnings.push("Content contains null bytes (potential binary data)".to_string());
        }

        if spec.path.exists() {
            if let Ok(metadata) = fs::metadata(&spec.path) {
                if metadata.permissions().readonly() {
                    warnings.push(format!("File not writable: {}", spec.path.display()));
                }
            }
        } else if let Some(parent) = spec.path.parent() {
            if !parent.as_os_str().is_empty() {
                if !parent.exists() {
                    warnings.push(format!(
                        "Parent directory does not exist: {}",
                        parent.display()
                    ));
                } else if fs::metadata(parent)
                    .map(|m| m.permissions().readonly())
                    .unwrap_or(false)
                {
                    warnings.push(format!(
                        "Parent directory not writable: {}",
                        parent.display()
                    ));
                }
            }
        }

        warnings
    }
}

/// Copies an existing file to the first unused `<name>.backup[.N]` sibling.
fn create_backup(path: &Path) -> EditResult<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }

    let base = format!("{}.backup", path.display());
    let mut backup_path = PathBuf::from(&base);
    let mut counter = 1;
    while backup_path.exists() {
        backup_path = PathBuf::from(format!("{}.{}", base, counter));
        counter += 1;
    }

    fs::copy(path, &backup_path)?;
    Ok(Some(backup_path))
}
