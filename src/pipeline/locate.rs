//! Output locator: where the extraction engine leaves its Markdown.
//!
//! The layout is the engine's own convention, not ours:
//!
//! ```text
//! <workspace>/<doc-name>/auto/<doc-name>.md
//! ```
//!
//! [`locate`] only computes the path; [`read_artifact`] does the I/O and is
//! where a missing file becomes [`DocParseError::ArtifactMissing`].

use crate::error::DocParseError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Fixed sub-directory the engine writes its parse results into.
pub const ARTIFACT_SUBDIR: &str = "auto";

/// Extension of the extracted Markdown artifact.
pub const ARTIFACT_EXTENSION: &str = "md";

/// Compute `<workspace>/<doc_name>/auto/<doc_name>.md`. No filesystem access.
pub fn locate(workspace: &Path, doc_name: &str) -> PathBuf {
    workspace
        .join(doc_name)
        .join(ARTIFACT_SUBDIR)
        .join(format!("{doc_name}.{ARTIFACT_EXTENSION}"))
}

/// Read the artifact as UTF-8 text.
pub async fn read_artifact(path: &Path) -> Result<String, DocParseError> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            DocParseError::ArtifactMissing {
                path: path.to_path_buf(),
            }
        } else {
            DocParseError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn locate_follows_engine_layout() {
        assert_eq!(
            locate(Path::new("W"), "N"),
            PathBuf::from("W").join("N").join("auto").join("N.md")
        );
        assert_eq!(
            locate(Path::new("/tmp/ws/1f2e"), "report"),
            PathBuf::from("/tmp/ws/1f2e/report/auto/report.md")
        );
    }

    #[test]
    fn locate_keeps_dotted_names_intact() {
        assert_eq!(
            locate(Path::new("/w"), "q3.summary"),
            PathBuf::from("/w/q3.summary/auto/q3.summary.md")
        );
    }

    #[tokio::test]
    async fn read_missing_artifact() {
        let tmp = TempDir::new().unwrap();
        let path = locate(tmp.path(), "ghost");
        let err = read_artifact(&path).await.unwrap_err();
        assert!(matches!(err, DocParseError::ArtifactMissing { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn read_existing_artifact() {
        let tmp = TempDir::new().unwrap();
        let path = locate(tmp.path(), "report");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "# Report").unwrap();
        assert_eq!(read_artifact(&path).await.unwrap(), "# Report");
    }

    #[tokio::test]
    async fn non_utf8_artifact_is_io_fault() {
        let tmp = TempDir::new().unwrap();
        let path = locate(tmp.path(), "bin");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let err = read_artifact(&path).await.unwrap_err();
        assert!(matches!(err, DocParseError::Io { .. }), "got {err:?}");
    }
}
