use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Where uploaded media bytes live. Blobs are addressed by the media name
/// the database assigned.
pub trait BlobStore: Send + Sync {
    fn put(&self, name: &str, bytes: &[u8]) -> io::Result<()>;
    fn remove(&self, name: &str) -> io::Result<()>;
}

/// Blob store backed by a plain directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Opens the store, creating `root` if needed.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<FsBlobStore> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(FsBlobStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> io::Result<PathBuf> {
        // Names come from the database (`{id}.{ext}`), never from clients,
        // but a separator would still escape the root.
        if name.is_empty() || name.contains(|c| c == '/' || c == '\\') || name.starts_with('.') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid blob name {:?}", name),
            ));
        }
        Ok(self.root.join(name))
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        fs::write(self.path(name)?, bytes)
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        match fs::remove_file(self.path(name)?) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
