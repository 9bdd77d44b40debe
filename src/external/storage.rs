use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;

use crate::error::AppError;

/// Caps enforced before handing a promotional file to the storage backend.
pub const MAX_IMAGE_BYTES: usize = 200 * 1024;
pub const MAX_PDF_BYTES: usize = 600 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Pdf,
}

impl FileKind {
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())?;
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "webp" => Some(FileKind::Image),
            "pdf" => Some(FileKind::Pdf),
            _ => None,
        }
    }

    pub fn max_bytes(&self) -> usize {
        match self {
            FileKind::Image => MAX_IMAGE_BYTES,
            FileKind::Pdf => MAX_PDF_BYTES,
        }
    }
}

pub fn validate_upload(kind: FileKind, len: usize) -> Result<(), AppError> {
    let limit = kind.max_bytes();
    if len > limit {
        return Err(AppError::UploadTooLarge { limit });
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub path: String,
    pub name: String,
    pub public_url: String,
    pub size: usize,
}

/// Object storage used for promotional/menu attachments. The hosted backend
/// returns a public URL per uploaded path and supports delete-by-path.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, path: &str, name: &str, bytes: &[u8]) -> Result<StoredFile, AppError>;
    async fn delete(&self, path: &str) -> Result<(), AppError>;
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<StoredFile>, AppError>;
}

/// In-memory stand-in for the hosted bucket. Keeps metadata only; contents
/// are dropped after size validation.
#[derive(Default)]
pub struct InMemoryStore {
    files: DashMap<String, StoredFile>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn upload(&self, path: &str, name: &str, bytes: &[u8]) -> Result<StoredFile, AppError> {
        if self.files.contains_key(path) {
            return Err(AppError::UploadFailed(format!(
                "path {path} already exists"
            )));
        }

        let stored = StoredFile {
            path: path.to_string(),
            name: name.to_string(),
            public_url: format!("/storage/promotions/{path}"),
            size: bytes.len(),
        };
        self.files.insert(path.to_string(), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        self.files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("file {path} not found")))
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<StoredFile>, AppError> {
        let mut files: Vec<StoredFile> = self
            .files
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.value().clone())
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_upload, FileKind, InMemoryStore, ObjectStore, MAX_IMAGE_BYTES};
    use crate::error::AppError;

    #[test]
    fn classifies_by_extension() {
        assert_eq!(FileKind::from_file_name("menu.PDF"), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_file_name("promo.jpeg"), Some(FileKind::Image));
        assert_eq!(FileKind::from_file_name("promo.gif"), None);
        assert_eq!(FileKind::from_file_name("no-extension"), None);
    }

    #[test]
    fn image_over_cap_is_rejected() {
        let err = validate_upload(FileKind::Image, MAX_IMAGE_BYTES + 1).unwrap_err();
        assert!(matches!(err, AppError::UploadTooLarge { .. }));
        assert!(validate_upload(FileKind::Image, MAX_IMAGE_BYTES).is_ok());
    }

    #[test]
    fn pdf_cap_is_larger_than_image_cap() {
        assert!(validate_upload(FileKind::Pdf, 500 * 1024).is_ok());
        assert!(validate_upload(FileKind::Image, 500 * 1024).is_err());
    }

    #[tokio::test]
    async fn upload_list_delete_roundtrip() {
        let store = InMemoryStore::new();
        let stored = store
            .upload("biz-1/promo.png", "promo.png", &[0u8; 128])
            .await
            .unwrap();
        assert_eq!(stored.size, 128);
        assert_eq!(stored.public_url, "/storage/promotions/biz-1/promo.png");

        let listed = store.list_prefix("biz-1/").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(store.list_prefix("biz-2/").await.unwrap().is_empty());

        store.delete("biz-1/promo.png").await.unwrap();
        assert!(store.delete("biz-1/promo.png").await.is_err());
    }
}
