use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::EditError;

/// Controls whether rendered output is only displayed or also persisted,
/// and whether a confirmation gate is interposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Render and display every result without touching storage
    Preview,
    /// Render and write results to storage
    Apply,
    /// Preview, display every result, then block for a yes/no decision
    PreviewThenConfirm,
}

impl FromStr for ExecutionMode {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "preview" => Ok(Self::Preview),
            "apply" => Ok(Self::Apply),
            "preview_and_ask" => Ok(Self::PreviewThenConfirm),
            other => Err(EditError::validation(format!(
                "Invalid mode '{}'. Must be one of: preview, apply, preview_and_ask",
                other
            ))),
        }
    }
}

/// Answer from a confirmation gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Yes,
    No,
    /// Ctrl+C or EOF while waiting for input
    Interrupted,
}

/// Seam for the yes/no gate in `PreviewThenConfirm` mode.
///
/// The interactive stdin prompt lives in the CLI; tests and embedding
/// callers supply their own implementation. Engines pass every rendered
/// preview through `show` before prompting, so the user decides with the
/// pending change in front of them. `No` and `Interrupted` both terminate
/// the operation without writing anything.
pub trait ConfirmGate {
    /// Receives one rendered preview block before the prompt. The default
    /// discards it; interactive gates display it.
    fn show(&mut self, _rendered: &str) {}

    fn confirm(&mut self, prompt: &str) -> Decision;
}

/// Gate that always answers the same way; used in tests and non-interactive
/// callers.
pub struct FixedDecision(pub Decision);

impl ConfirmGate for FixedDecision {
    fn confirm(&mut self, _prompt: &str) -> Decision {
        self.0
    }
}
