//! Avatar loading from the local filesystem.

use std::path::Path;

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use tracing::debug;

use crate::auth::AvatarFile;
use crate::events::{AuthUiEvent, UiEvent};

/// Avatars larger than this are rejected before upload.
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

pub async fn load_avatar(path: String) -> UiEvent {
    let result = read_avatar(Path::new(&path))
        .await
        .map_err(|err| format!("{err:#}"));
    UiEvent::Auth(AuthUiEvent::AvatarLoaded { path, result })
}

/// Reads an image file and sniffs its content type.
///
/// # Errors
/// Returns an error if the file cannot be read, is too large, or is not an
/// image.
pub async fn read_avatar(path: &Path) -> Result<AvatarFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Could not read {}", path.display()))?;
    if bytes.len() > MAX_AVATAR_BYTES {
        bail!(
            "{} is too large ({} bytes, limit {MAX_AVATAR_BYTES})",
            path.display(),
            bytes.len()
        );
    }
    if !infer::is_image(&bytes) {
        bail!("{} is not an image", path.display());
    }

    let content_type = infer::get(&bytes).map(|kind| kind.mime_type().to_string());
    let file_name = path
        .file_name()
        .map_or_else(|| "avatar".to_string(), |name| name.to_string_lossy().into_owned());
    debug!(file_name = %file_name, ?content_type, len = bytes.len(), "avatar loaded");

    Ok(AvatarFile {
        file_name,
        bytes: Bytes::from(bytes),
        content_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    #[tokio::test]
    async fn test_reads_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("me.png");
        std::fs::write(&path, PNG_HEADER).unwrap();

        let avatar = read_avatar(&path).await.unwrap();
        assert_eq!(avatar.file_name, "me.png");
        assert_eq!(avatar.content_type.as_deref(), Some("image/png"));
        assert_eq!(avatar.bytes.len(), PNG_HEADER.len());
    }

    #[tokio::test]
    async fn test_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "just text").unwrap();

        let err = read_avatar(&path).await.unwrap_err();
        assert!(err.to_string().contains("is not an image"));
    }

    #[tokio::test]
    async fn test_missing_file_event() {
        let event = load_avatar("/definitely/not/here.png".into()).await;
        let UiEvent::Auth(AuthUiEvent::AvatarLoaded { path, result }) = event else {
            panic!("expected avatar event");
        };
        assert_eq!(path, "/definitely/not/here.png");
        assert!(result.unwrap_err().contains("Could not read"));
    }
}
