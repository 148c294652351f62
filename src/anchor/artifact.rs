//! On-disk proof artifact storage.
//!
//! Artifacts live flat in one configured directory and are addressed by
//! filename only. Names are system-generated on the anchoring path; on the
//! verify/download paths a caller-supplied name must resolve strictly inside
//! the directory.

use std::path::{Component, Path, PathBuf};

use crate::infra::{LedgerError, Result};

/// Flat file store for anchor payloads and proofs.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the artifact directory if it does not exist yet.
    pub async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Resolve a filename inside the store, rejecting anything that could
    /// escape it: separators, parent references, absolute paths.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() {
            return Err(LedgerError::InvalidArgument("artifact name is empty".into()));
        }

        let path = Path::new(name);
        let mut components = path.components();
        let valid = matches!(components.next(), Some(Component::Normal(_)))
            && components.next().is_none();
        if !valid || name.contains('\\') {
            return Err(LedgerError::InvalidArgument(format!(
                "artifact name must be a plain filename: {name}"
            )));
        }

        Ok(self.root.join(name))
    }

    /// Resolve a filename and require the artifact to exist on disk.
    pub async fn resolve_existing(&self, name: &str) -> Result<PathBuf> {
        let path = self.resolve(name)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            _ => Err(LedgerError::ProofNotFound(name.to_string())),
        }
    }

    /// Write an artifact, creating the directory on first use.
    pub async fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.resolve(name)?;
        self.ensure_root().await?;
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_write_and_resolve_existing() {
        let (_dir, store) = store();

        let written = store.write("abc123.bin", b"hash-bytes").await.unwrap();
        let resolved = store.resolve_existing("abc123.bin").await.unwrap();

        assert_eq!(written, resolved);
        assert_eq!(tokio::fs::read(&resolved).await.unwrap(), b"hash-bytes");
    }

    #[tokio::test]
    async fn test_missing_artifact_is_not_found() {
        let (_dir, store) = store();

        let err = store.resolve_existing("nope.ots").await.unwrap_err();
        assert!(matches!(err, LedgerError::ProofNotFound(_)));
    }

    #[test]
    fn test_rejects_traversal() {
        let (_dir, store) = store();

        for name in [
            "../escape.ots",
            "a/b.ots",
            "/etc/passwd",
            "..",
            "",
            "..\\windows",
        ] {
            let err = store.resolve(name).unwrap_err();
            assert!(
                matches!(err, LedgerError::InvalidArgument(_)),
                "expected rejection for {name:?}"
            );
        }
    }

    #[test]
    fn test_accepts_plain_filenames() {
        let (_dir, store) = store();

        assert!(store.resolve("abc.bin.ots").is_ok());
        assert!(store.resolve("deadbeef.bin").is_ok());
    }
}
