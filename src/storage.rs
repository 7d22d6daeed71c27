use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Image types the upload side-channel accepts. Anything else is rejected as
/// UnsupportedMediaType before touching the disk.
pub const ALLOWED_IMAGE_TYPES: [&str; 4] =
    ["image/jpeg", "image/png", "image/gif", "image/webp"];

pub fn is_allowed_image_type(content_type: &str) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&content_type)
}

/// StoredUpload
///
/// Handle to a persisted upload: the server-chosen filename under the upload
/// directory, which is also the public path segment (`/uploads/<filename>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub filename: String,
}

/// StorageService
///
/// Abstract contract for the upload storage layer. The concrete disk
/// implementation is swapped for an in-memory mock in tests without touching
/// the calling handlers.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Provisions the storage location (creates the upload directory). Called
    /// once at startup.
    async fn ensure_ready(&self) -> Result<(), String>;

    /// Persists an upload under a unique server-chosen filename. The original
    /// filename only contributes its extension.
    async fn store(&self, original_filename: &str, bytes: &[u8]) -> Result<StoredUpload, String>;

    /// Removes a previously stored upload. Callers treat failures as
    /// best-effort: they log and move on, never surface to the client.
    async fn delete(&self, filename: &str) -> Result<(), String>;
}

/// StorageState
///
/// The concrete type used to share the storage layer across the application
/// state.
pub type StorageState = Arc<dyn StorageService>;

/// LocalDiskStorage
///
/// The production implementation: files live in a server-managed directory
/// and are exposed by the static `/uploads` route.
#[derive(Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
}

impl LocalDiskStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { root: dir.into() }
    }

    fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }
}

#[async_trait]
impl StorageService for LocalDiskStorage {
    async fn ensure_ready(&self) -> Result<(), String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| format!("failed to create upload dir {:?}: {}", self.root, e))
    }

    async fn store(&self, original_filename: &str, bytes: &[u8]) -> Result<StoredUpload, String> {
        let extension = Path::new(original_filename)
            .extension()
            .and_then(std::ffi::OsStr::to_str)
            .unwrap_or("bin");
        let filename = format!("{}.{}", Uuid::new_v4(), extension);

        tokio::fs::write(self.path_for(&filename), bytes)
            .await
            .map_err(|e| format!("failed to write upload {}: {}", filename, e))?;

        Ok(StoredUpload { filename })
    }

    async fn delete(&self, filename: &str) -> Result<(), String> {
        tokio::fs::remove_file(self.path_for(filename))
            .await
            .map_err(|e| format!("failed to delete upload {}: {}", filename, e))
    }
}

/// MockStorageService
///
/// In-memory stand-in for tests. Records every store and delete so tests can
/// assert the validation-failure cleanup actually ran.
#[derive(Default)]
pub struct MockStorageService {
    pub stored: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_ready(&self) -> Result<(), String> {
        Ok(())
    }

    async fn store(&self, original_filename: &str, _bytes: &[u8]) -> Result<StoredUpload, String> {
        let extension = Path::new(original_filename)
            .extension()
            .and_then(std::ffi::OsStr::to_str)
            .unwrap_or("bin");
        let filename = format!("{}.{}", Uuid::new_v4(), extension);
        self.stored.lock().unwrap().push(filename.clone());
        Ok(StoredUpload { filename })
    }

    async fn delete(&self, filename: &str) -> Result<(), String> {
        self.deleted.lock().unwrap().push(filename.to_string());
        Ok(())
    }
}
