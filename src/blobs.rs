//! Uploaded files on disk, referenced from the database by filename.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::StorageConfig;
use crate::error::{AppError, AppResult};
use crate::forms::Upload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    Image,
    Video,
}

#[derive(Debug)]
struct Inner {
    root: PathBuf,
    image_extensions: Vec<String>,
    video_extensions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    inner: Arc<Inner>,
}

impl BlobStore {
    pub fn new(root: PathBuf, storage: &StorageConfig) -> Self {
        let lower = |exts: &[String]| exts.iter().map(|e| e.to_ascii_lowercase()).collect();
        Self {
            inner: Arc::new(Inner {
                root,
                image_extensions: lower(&storage.image_extensions),
                video_extensions: lower(&storage.video_extensions),
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Allowed lowercase extension of `filename` for `kind`.
    pub fn accepted_extension(&self, kind: BlobKind, filename: &str) -> AppResult<String> {
        let allowed = match kind {
            BlobKind::Image => &self.inner.image_extensions,
            BlobKind::Video => &self.inner.video_extensions,
        };
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .filter(|ext| allowed.contains(ext))
            .ok_or_else(|| AppError::UploadRejected(filename.to_string()))
    }

    /// Store a batch. Every file is checked before any is written, and a
    /// failed write removes what the batch already stored.
    pub fn save_all(&self, kind: BlobKind, uploads: &[Upload]) -> AppResult<Vec<String>> {
        let extensions = uploads
            .iter()
            .map(|upload| self.accepted_extension(kind, &upload.filename))
            .collect::<AppResult<Vec<_>>>()?;

        std::fs::create_dir_all(self.root())?;

        let mut saved = Vec::with_capacity(uploads.len());
        for (upload, ext) in uploads.iter().zip(extensions) {
            let name = format!("{}.{}", uuid::Uuid::now_v7(), ext);
            if let Err(e) = std::fs::write(self.root().join(&name), &upload.data) {
                self.remove_all(&saved);
                return Err(e.into());
            }
            saved.push(name);
        }

        tracing::info!("Stored {} upload(s)", saved.len());
        Ok(saved)
    }

    /// Best-effort removal; a missing file is not an error.
    pub fn remove_all(&self, names: &[String]) {
        for name in names {
            let Some(path) = self.path_of(name) else {
                continue;
            };
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove blob {}: {}", name, e);
                }
            }
        }
    }

    /// Resolve a stored name, refusing anything that is not a bare filename.
    pub fn path_of(&self, name: &str) -> Option<PathBuf> {
        let bare = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
        bare.then(|| self.root().join(name))
    }

    pub fn read(&self, name: &str) -> AppResult<Vec<u8>> {
        let path = self.path_of(name).ok_or(AppError::NotFound)?;
        std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AppError::NotFound,
            _ => e.into(),
        })
    }
}
