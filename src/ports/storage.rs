use async_trait::async_trait;
use std::error::Error;
use std::path::Path;

/// Blob storage for uploaded sources and derived artifacts.
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Download an object from storage to a local path
    async fn download(
        &self,
        key: &str,
        local_path: &Path,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Upload a local file to storage under `key`
    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Storage key of an uploaded source file.
pub fn source_key(upload_id: &str) -> String {
    format!("uploads/{}", upload_id)
}

/// Storage key of an artifact derived from an upload.
pub fn derived_key(upload_id: &str, file_name: &str) -> String {
    format!("derived/{}/{}", upload_id, file_name)
}
