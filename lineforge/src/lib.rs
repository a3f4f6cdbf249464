//! Line-oriented file mutation tools for automated editing workflows.
//!
//! `lineforge` finds exact line matches in files and rewrites them under a
//! choice of output styles, with preview/apply/confirm execution modes,
//! advisory safety checks, and workspace-scoped ignore rules.
//!
//! # Example
//!
//! ```no_run
//! use lineforge::{
//!     Decision, ExecutionMode, FixedDecision, MatchSpec, OutputStyle, ReplaceEngine,
//!     ReplaceRequest, ShellKind,
//! };
//!
//! # fn main() -> Result<(), lineforge::EditError> {
//! let engine = ReplaceEngine::new(".", ShellKind::Auto);
//! let request = ReplaceRequest::new("notes.txt", MatchSpec::new("TODO", "DONE"))
//!     .with_mode(ExecutionMode::Apply)
//!     .with_style(OutputStyle::PlainContent);
//! let mut gate = FixedDecision(Decision::Yes);
//! let outcome = engine.run(&request, &mut gate)?;
//! println!("{} match(es)", outcome.summary.total_matches());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod guard;
pub mod matcher;
pub mod modes;
pub mod render;
pub mod replace;
pub mod results;
pub mod search;
pub mod tree;
pub mod workspace;
pub mod write;

pub use config::{CliOverrides, EditConfig};
pub use errors::{EditError, EditResult};
pub use guard::{PathGuard, ShellKind, IGNORE_FILENAME};
pub use matcher::{find_matches, LineMatch, MatchSpec};
pub use modes::{ConfirmGate, Decision, ExecutionMode, FixedDecision};
pub use render::{render_replace, render_write_change, OutputStyle};
pub use replace::{RenderedChange, ReplaceEngine, ReplaceOutcome, ReplaceRequest};
pub use results::{
    FileMutationResult, FileSearchResult, ReplaceStatus, ReplaceSummary, SearchHit,
};
pub use search::{
    format_results_flat, format_results_json, format_results_tree, search, SearchQuery,
};
pub use tree::{ResultTree, ResultTreeNode};
pub use workspace::{
    detect_workspace_root, is_within_workspace, read_file_content, WORKSPACE_DIR,
};
pub use write::{
    normalize_line_endings, FileChange, WriteEngine, WriteOperation, WriteReport, WriteSpec,
    WriteStatus,
};
