//! Workspace store: one directory per job under a fixed root.
//!
//! The filesystem is the only registry. There is no in-memory job table, so
//! the orchestrator and the retention sweeper share a [`WorkspaceStore`]
//! without any locking: jobs only ever create fresh, uniquely named
//! directories and the sweeper only deletes by independently read mtimes.

use crate::error::DocParseError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How many fresh ids `allocate` tries before giving up on collisions.
const MAX_ALLOCATE_ATTEMPTS: usize = 4;

/// Filesystem-backed allocator of per-job directories.
#[derive(Debug, Clone)]
pub struct WorkspaceStore {
    root: PathBuf,
}

/// A workspace exclusively owned by one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceHandle {
    id: String,
    path: PathBuf,
}

impl WorkspaceHandle {
    /// The job identifier (also the directory name).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Absolute or root-relative path of the workspace directory.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One immediate child directory of the root, as seen by a sweep pass.
#[derive(Debug, Clone)]
pub struct WorkspaceEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl WorkspaceStore {
    /// Open the store, creating `root` if it does not exist yet.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, DocParseError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| DocParseError::Storage {
                path: root.clone(),
                source,
            })?;
        debug!("Workspace root ready: {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh workspace named by a new random identifier.
    ///
    /// `create_dir` (not `create_dir_all`) makes creation exclusive: an id
    /// that already exists on disk is rejected by the filesystem and retried
    /// with another one, so two jobs can never end up sharing a directory.
    pub async fn allocate(&self) -> Result<WorkspaceHandle, DocParseError> {
        let mut last_err = None;
        for _ in 0..MAX_ALLOCATE_ATTEMPTS {
            let id = Uuid::new_v4().simple().to_string();
            let path = self.root.join(&id);
            match tokio::fs::create_dir(&path).await {
                Ok(()) => {
                    debug!("Allocated workspace {}", path.display());
                    return Ok(WorkspaceHandle { id, path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    warn!("Workspace id collision on {}, retrying", id);
                    last_err = Some((path, e));
                }
                Err(source) => return Err(DocParseError::Storage { path, source }),
            }
        }
        let (path, source) = last_err.unwrap_or_else(|| {
            (
                self.root.clone(),
                std::io::Error::new(ErrorKind::Other, "no allocation attempted"),
            )
        });
        Err(DocParseError::Storage { path, source })
    }

    /// Look up an existing workspace by id.
    ///
    /// Ids containing path separators or `..` are rejected outright.
    pub async fn locate(&self, id: &str) -> Option<WorkspaceHandle> {
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            return None;
        }
        let path = self.root.join(id);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => Some(WorkspaceHandle {
                id: id.to_string(),
                path,
            }),
            _ => None,
        }
    }

    /// Enumerate the root's immediate child directories with their mtimes.
    ///
    /// Plain files are ignored. Entries whose metadata cannot be read are
    /// skipped with a warning rather than failing the listing.
    pub async fn list_all(&self) -> Result<Vec<WorkspaceEntry>, DocParseError> {
        let mut dir = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|source| DocParseError::Io {
                path: self.root.clone(),
                source,
            })?;

        let mut entries = Vec::new();
        loop {
            let entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => {
                    return Err(DocParseError::Io {
                        path: self.root.clone(),
                        source,
                    })
                }
            };
            let path = entry.path();
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(e) => {
                    warn!("Skipping {}: cannot read metadata: {}", path.display(), e);
                    continue;
                }
            };
            if !meta.is_dir() {
                continue;
            }
            match meta.modified() {
                Ok(modified) => entries.push(WorkspaceEntry { path, modified }),
                Err(e) => warn!("Skipping {}: no modification time: {}", path.display(), e),
            }
        }
        Ok(entries)
    }

    /// Recursively delete a workspace, best effort.
    ///
    /// Failures are logged and reported as `false`; they never propagate.
    pub async fn remove(&self, path: &Path) -> bool {
        match tokio::fs::remove_dir_all(path).await {
            Ok(()) => {
                info!("Removed workspace {}", path.display());
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Workspace {} already gone", path.display());
                true
            }
            Err(e) => {
                warn!("Failed to remove workspace {}: {}", path.display(), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[tokio::test]
    async fn open_creates_missing_root() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("nested/temp_output");
        let store = WorkspaceStore::open(&root).await.unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), root.as_path());
    }

    #[tokio::test]
    async fn allocate_creates_direct_child_named_by_id() {
        let tmp = TempDir::new().unwrap();
        let store = WorkspaceStore::open(tmp.path()).await.unwrap();
        let ws = store.allocate().await.unwrap();

        assert!(ws.path().is_dir());
        assert_eq!(ws.path().parent(), Some(tmp.path()));
        assert_eq!(ws.path().file_name().unwrap().to_str(), Some(ws.id()));
        assert_eq!(ws.id().len(), 32);
    }

    #[tokio::test]
    async fn concurrent_allocations_are_distinct() {
        let tmp = TempDir::new().unwrap();
        let store = WorkspaceStore::open(tmp.path()).await.unwrap();

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.allocate().await.unwrap() })
            })
            .collect();

        let mut ids = HashSet::new();
        for h in handles {
            ids.insert(h.await.unwrap().id().to_string());
        }
        assert_eq!(ids.len(), 32);
    }

    #[tokio::test]
    async fn allocate_fails_with_storage_fault_when_root_vanished() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        let store = WorkspaceStore::open(&root).await.unwrap();
        std::fs::remove_dir(&root).unwrap();

        let err = store.allocate().await.unwrap_err();
        assert!(matches!(err, DocParseError::Storage { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn list_all_ignores_plain_files() {
        let tmp = TempDir::new().unwrap();
        let store = WorkspaceStore::open(tmp.path()).await.unwrap();
        let ws = store.allocate().await.unwrap();
        std::fs::write(tmp.path().join("stray.txt"), b"x").unwrap();

        let entries = store.list_all().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, ws.path());
    }

    #[tokio::test]
    async fn locate_finds_existing_and_rejects_traversal() {
        let tmp = TempDir::new().unwrap();
        let store = WorkspaceStore::open(tmp.path()).await.unwrap();
        let ws = store.allocate().await.unwrap();

        assert_eq!(store.locate(ws.id()).await, Some(ws.clone()));
        assert_eq!(store.locate("deadbeef").await, None);
        assert_eq!(store.locate("..").await, None);
        assert_eq!(store.locate("../etc").await, None);
    }

    #[tokio::test]
    async fn remove_is_recursive_and_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = WorkspaceStore::open(tmp.path()).await.unwrap();
        let ws = store.allocate().await.unwrap();
        std::fs::create_dir_all(ws.path().join("doc/auto")).unwrap();
        std::fs::write(ws.path().join("doc/auto/doc.md"), b"# Doc").unwrap();

        assert!(store.remove(ws.path()).await);
        assert!(!ws.path().exists());
        assert!(store.remove(ws.path()).await);
    }
}
