use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::EditError;

/// Per-workspace ignore-rule file, one pattern per line. Blank lines and
/// lines starting with `#` are skipped; a trailing `/` marks a
/// directory-anchor pattern, anything else is a glob tested against the
/// path relative to the workspace root.
pub const IGNORE_FILENAME: &str = ".lineforgeignore";

/// Which shell's tokenization and flag conventions the guard assumes when
/// validating command lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellKind {
    /// Pick based on the target platform
    #[default]
    Auto,
    Unix,
    PowerShell,
}

impl std::str::FromStr for ShellKind {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "unix" => Ok(Self::Unix),
            "powershell" => Ok(Self::PowerShell),
            other => Err(EditError::validation(format!(
                "Invalid shell '{}'. Must be one of: auto, unix, powershell",
                other
            ))),
        }
    }
}

impl ShellKind {
    fn policy(self) -> Box<dyn ShellPolicy + Send + Sync> {
        match self {
            ShellKind::Unix => Box::new(UnixPolicy),
            ShellKind::PowerShell => Box::new(PowerShellPolicy),
            ShellKind::Auto => {
                if cfg!(windows) {
                    Box::new(PowerShellPolicy)
                } else {
                    Box::new(UnixPolicy)
                }
            }
        }
    }
}

/// Tokenization and flag-filtering behavior for one shell family.
///
/// A closed seam with exactly two implementations, selected by `ShellKind`;
/// the guard never branches on shell names at its call sites.
trait ShellPolicy {
    /// Command names whose arguments are treated as file reads
    fn file_reading_commands(&self) -> &'static [&'static str];

    fn tokenize(&self, command: &str) -> Vec<String>;

    /// Whether a token is a flag/parameter rather than a path candidate
    fn skips(&self, arg: &str) -> bool;
}

struct UnixPolicy;

impl ShellPolicy for UnixPolicy {
    fn file_reading_commands(&self) -> &'static [&'static str] {
        &["cat", "less", "more", "head", "tail", "grep", "awk", "sed"]
    }

    fn tokenize(&self, command: &str) -> Vec<String> {
        split_tokens(command, true)
    }

    fn skips(&self, arg: &str) -> bool {
        arg.starts_with('-')
    }
}

struct PowerShellPolicy;

impl ShellPolicy for PowerShellPolicy {
    fn file_reading_commands(&self) -> &'static [&'static str] {
        &["get-content", "gc", "type", "select-string", "sls"]
    }

    fn tokenize(&self, command: &str) -> Vec<String> {
        // Non-posix splitting keeps PowerShell-like quoting behavior
        split_tokens(command, false)
    }

    fn skips(&self, arg: &str) -> bool {
        // `/`-style flags, parameter names, and drive-qualified items
        arg.starts_with('/') || arg.contains(':')
    }
}

/// Splits a command line on whitespace, honoring single and double quotes.
/// With `posix`, quotes are stripped and backslash escapes apply (shlex
/// posix mode); without it, quote characters stay in the token.
fn split_tokens(command: &str, posix: bool) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                    if !posix {
                        current.push(c);
                    }
                } else {
                    current.push(c);
                }
            }
            None => {
                if c == '\'' || c == '"' {
                    in_token = true;
                    quote = Some(c);
                    if !posix {
                        current.push(c);
                    }
                } else if posix && c == '\\' {
                    in_token = true;
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                } else if c.is_whitespace() {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                } else {
                    in_token = true;
                    current.push(c);
                }
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Enforces workspace ignore rules on paths and on file-reading commands.
///
/// Rules are loaded lazily from the workspace's ignore file on first use and
/// are immutable afterwards; reloading requires a new instance. An absent
/// rule file yields an empty, always-permissive rule set. Paths outside the
/// workspace root are always allowed by this guard; boundary-crossing is a
/// concern of the caller.
pub struct PathGuard {
    root: PathBuf,
    policy: Box<dyn ShellPolicy + Send + Sync>,
    rules: OnceCell<Vec<String>>,
}

impl PathGuard {
    pub fn new(root: impl Into<PathBuf>, shell: ShellKind) -> Self {
        Self {
            root: root.into(),
            policy: shell.policy(),
            rules: OnceCell::new(),
        }
    }

    fn rules(&self) -> &[String] {
        self.rules.get_or_init(|| {
            let path = self.root.join(IGNORE_FILENAME);
            let Ok(content) = fs::read_to_string(&path) else {
                debug!("No ignore file at {}; guard is permissive", path.display());
                return Vec::new();
            };
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string)
                .collect()
        })
    }

    /// True if the path may be read. Paths that do not resolve inside the
    /// workspace root are always allowed.
    pub fn is_allowed(&self, path: &Path) -> bool {
        if self.rules().is_empty() {
            return true;
        }

        let rel = if path.is_absolute() {
            match path.strip_prefix(&self.root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => return true,
            }
        } else {
            path.to_path_buf()
        };

        let rel = rel.to_string_lossy().replace('\\', "/");
        !self.matches(&rel)
    }

    fn matches(&self, rel: &str) -> bool {
        for pattern in self.rules() {
            if let Some(dir) = pattern.strip_suffix('/') {
                // Directory anchor: excluded when the anchor appears as a
                // directory segment anywhere in the relative path, so
                // `build/` blocks both `build/out.txt` and `src/build/x`.
                let anchor = dir.trim_start_matches('/');
                if rel == anchor
                    || rel.starts_with(&format!("{}/", anchor))
                    || rel.contains(&format!("/{}/", anchor))
                {
                    return true;
                }
                continue;
            }

            let anchor = pattern.trim_start_matches('/');
            match glob::Pattern::new(anchor) {
                Ok(p) => {
                    if p.matches(rel) {
                        return true;
                    }
                }
                Err(e) => warn!("Skipping invalid ignore pattern '{}': {}", pattern, e),
            }
        }
        false
    }

    /// Checks whether a command line would read an excluded path.
    ///
    /// Returns the first disallowed argument, or `None` when the command is
    /// not a file-reading command or every argument passes.
    pub fn validate_command(&self, command: &str) -> Option<String> {
        if self.rules().is_empty() {
            return None;
        }

        let parts = self.policy.tokenize(command);
        let (first, rest) = parts.split_first()?;
        let base = first.to_lowercase();
        if !self.policy.file_reading_commands().contains(&base.as_str()) {
            return None;
        }

        for arg in rest {
            if self.policy.skips(arg) {
                continue;
            }
            if !self.is_allowed(Path::new(arg)) {
                debug!("Command argument '{}' blocked by ignore rules", arg);
                return Some(arg.clone());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn guard_with_rules(rules: &str, shell: ShellKind) -> (TempDir, PathGuard) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(IGNORE_FILENAME), rules).unwrap();
        let guard = PathGuard::new(dir.path(), shell);
        (dir, guard)
    }

    #[test]
    fn test_missing_rule_file_is_permissive() {
        let dir = TempDir::new().unwrap();
        let guard = PathGuard::new(dir.path(), ShellKind::Unix);
        assert!(guard.is_allowed(Path::new("anything/at/all.txt")));
        assert!(guard.validate_command("cat anything.txt").is_none());
    }

    #[test]
    fn test_directory_anchor_matches_any_segment() {
        let (_dir, guard) = guard_with_rules("build/\n", ShellKind::Unix);
        assert!(!guard.is_allowed(Path::new("build/output.txt")));
        assert!(!guard.is_allowed(Path::new("src/build/x")));
        assert!(guard.is_allowed(Path::new("other/output.txt")));
        // A file merely named like the anchor is not a directory hit
        assert!(guard.is_allowed(Path::new("src/build.rs")));
    }

    #[test]
    fn test_glob_rules() {
        let (_dir, guard) = guard_with_rules("*.key\nsecrets.txt\n", ShellKind::Unix);
        assert!(!guard.is_allowed(Path::new("api.key")));
        assert!(!guard.is_allowed(Path::new("conf/api.key")));
        assert!(!guard.is_allowed(Path::new("secrets.txt")));
        assert!(guard.is_allowed(Path::new("notes.txt")));
    }

    #[test]
    fn test_comments_and_blanks_skipped() {
        let (_dir, guard) = guard_with_rules("# comment\n\nbuild/\n", ShellKind::Unix);
        assert!(!guard.is_allowed(Path::new("build/a")));
        assert!(guard.is_allowed(Path::new("# comment")));
    }

    #[test]
    fn test_outside_workspace_always_allowed() {
        let (_dir, guard) = guard_with_rules("build/\n", ShellKind::Unix);
        assert!(guard.is_allowed(Path::new("/somewhere/else/build/x")));
    }

    #[test]
    fn test_validate_command_unix() {
        let (_dir, guard) = guard_with_rules("secrets/\n", ShellKind::Unix);

        assert_eq!(
            guard.validate_command("cat secrets/key.txt"),
            Some("secrets/key.txt".to_string())
        );
        // Flags are skipped, later path still caught
        assert_eq!(
            guard.validate_command("grep -r token secrets/key.txt"),
            Some("secrets/key.txt".to_string())
        );
        // Command name is matched case-insensitively
        assert_eq!(
            guard.validate_command("CAT secrets/key.txt"),
            Some("secrets/key.txt".to_string())
        );
        // Non-reading commands pass untouched
        assert!(guard.validate_command("rm secrets/key.txt").is_none());
        assert!(guard.validate_command("cat src/main.rs").is_none());
        assert!(guard.validate_command("").is_none());
    }

    #[test]
    fn test_validate_command_quoted_args() {
        let (_dir, guard) = guard_with_rules("secrets/\n", ShellKind::Unix);
        assert_eq!(
            guard.validate_command("cat 'secrets/my key.txt'"),
            Some("secrets/my key.txt".to_string())
        );
    }

    #[test]
    fn test_validate_command_powershell() {
        let (_dir, guard) = guard_with_rules("secrets/\n", ShellKind::PowerShell);

        assert_eq!(
            guard.validate_command("Get-Content secrets/key.txt"),
            Some("secrets/key.txt".to_string())
        );
        // `/`-flags and tokens containing `:` are skipped
        assert!(guard.validate_command("type /Q C:secrets").is_none());
        assert_eq!(
            guard.validate_command("sls -Pattern:x secrets/key.txt"),
            Some("secrets/key.txt".to_string())
        );
    }

    #[test]
    fn test_split_tokens() {
        assert_eq!(
            split_tokens("cat a.txt b.txt", true),
            vec!["cat", "a.txt", "b.txt"]
        );
        assert_eq!(
            split_tokens("cat 'a b.txt'", true),
            vec!["cat", "a b.txt"]
        );
        assert_eq!(
            split_tokens("cat \"a b.txt\"", false),
            vec!["cat", "\"a b.txt\""]
        );
        assert_eq!(split_tokens("  ", true), Vec::<String>::new());
    }
}
