use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::errors::{unify_path, EditError, EditResult};

/// Marker directory that identifies a workspace root
pub const WORKSPACE_DIR: &str = ".lineforge";
const MAX_UPWARD_STEPS: usize = 20;

/// Detect a workspace root by walking upward from the starting directory,
/// looking for a `.lineforge` marker directory.
/// If no workspace is found, returns the starting directory without creating one.
pub fn detect_workspace_root(starting_dir: &Path) -> EditResult<PathBuf> {
    let mut current = unify_path(starting_dir);

    for _ in 0..MAX_UPWARD_STEPS {
        let workspace_marker = current.join(WORKSPACE_DIR);
        if workspace_marker.exists() {
            return Ok(current);
        }
        if !current.pop() {
            break;
        }
    }

    Ok(unify_path(starting_dir))
}

/// Whether `path` resolves to a location inside `workspace_root`.
pub fn is_within_workspace(path: &Path, workspace_root: &Path) -> bool {
    let path = unify_path(path);
    let root = unify_path(workspace_root);
    path.strip_prefix(&root).is_ok()
}

/// Reads a file as UTF-8 text, classifying failures for the error taxonomy:
/// a missing file, a permission problem, and invalid UTF-8 are distinct.
pub fn read_file_content(path: &Path) -> EditResult<String> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => EditError::file_not_found(path),
        ErrorKind::PermissionDenied => EditError::permission_denied(path),
        _ => EditError::IoError(e),
    })?;
    String::from_utf8(bytes).map_err(|e| EditError::encoding_error(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_workspace_detection() -> EditResult<()> {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        let nested = root.join("a").join("b").join("c");
        fs::create_dir_all(&nested).unwrap();

        // No workspace exists yet, should use nested as root
        let detected = detect_workspace_root(&nested)?;
        assert_eq!(unify_path(&nested), detected);

        // Create a marker at root/a
        let workspace_root = root.join("a");
        fs::create_dir_all(workspace_root.join(WORKSPACE_DIR)).unwrap();

        let detected = detect_workspace_root(&nested)?;
        assert_eq!(unify_path(&workspace_root), detected);

        Ok(())
    }

    #[test]
    fn test_is_within_workspace() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let inside = root.join("src").join("main.rs");
        fs::create_dir_all(inside.parent().unwrap()).unwrap();
        fs::write(&inside, "fn main() {}").unwrap();

        assert!(is_within_workspace(&inside, root));
        assert!(!is_within_workspace(Path::new("/"), root));
    }

    #[test]
    fn test_read_file_content_classifies_errors() {
        let temp = TempDir::new().unwrap();

        let missing = temp.path().join("missing.txt");
        assert!(matches!(
            read_file_content(&missing),
            Err(EditError::FileNotFound(_))
        ));

        let binary = temp.path().join("binary.dat");
        fs::write(&binary, [0xff, 0xfe, 0x00, 0x80]).unwrap();
        assert!(matches!(
            read_file_content(&binary),
            Err(EditError::EncodingError { .. })
        ));

        let text = temp.path().join("text.txt");
        fs::write(&text, "hello\n").unwrap();
        assert_eq!(read_file_content(&text).unwrap(), "hello\n");
    }
}
