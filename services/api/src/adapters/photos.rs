//! services/api/src/adapters/photos.rs
//!
//! Local-filesystem implementation of the `PhotoStore` port. Photos land
//! under `<upload_dir>/<kind>/<uuid>.<ext>` and are served back by the
//! static file route.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use goodhands_core::ports::{PhotoStore, PortError, PortResult};

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Writes photos under a configured root directory.
pub struct LocalPhotoStore {
    root: PathBuf,
}

impl LocalPhotoStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

/// Extracts and validates the lowercase extension from the uploaded filename.
pub fn validated_extension(original_name: &str) -> Option<String> {
    let ext = Path::new(original_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

#[async_trait]
impl PhotoStore for LocalPhotoStore {
    async fn save(&self, kind: &str, original_name: &str, data: &[u8]) -> PortResult<String> {
        let ext = validated_extension(original_name).ok_or_else(|| {
            PortError::Unexpected(format!("unsupported photo extension in {original_name}"))
        })?;

        let dir = self.root.join(kind);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Server-generated name; the client filename only contributes its extension.
        let filename = format!("{}.{ext}", Uuid::new_v4());
        let path = dir.join(&filename);
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(format!("{kind}/{filename}"))
    }

    async fn remove(&self, relative_path: &str) -> PortResult<()> {
        let path = self.root.join(relative_path);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            // Cleanup is best-effort; the orphaned file is harmless.
            warn!("failed to remove photo {}: {}", path.display(), e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_allowlist_is_case_insensitive() {
        assert_eq!(validated_extension("selfie.JPG").as_deref(), Some("jpg"));
        assert_eq!(validated_extension("a.b.webp").as_deref(), Some("webp"));
        assert!(validated_extension("malware.exe").is_none());
        assert!(validated_extension("no_extension").is_none());
    }

    #[tokio::test]
    async fn save_round_trips_and_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalPhotoStore::new(dir.path().to_path_buf());

        let rel = store.save("checkin", "photo.png", b"fakepng").await.unwrap();
        assert!(rel.starts_with("checkin/"));
        assert!(rel.ends_with(".png"));
        assert_eq!(
            tokio::fs::read(dir.path().join(&rel)).await.unwrap(),
            b"fakepng"
        );

        store.remove(&rel).await.unwrap();
        assert!(!dir.path().join(&rel).exists());
        // Removing again must not fail.
        store.remove(&rel).await.unwrap();
    }
}
