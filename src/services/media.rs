//! src/services/media.rs
//!
//! MediaService: pet photos on local disk under `base_path/pet_images/`.
//! Uploads are streamed to a temporary file, fsynced and renamed into place,
//! so a reader never sees a partially written image.

use crate::errors::{ServiceError, ServiceResult};
use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use std::{
    io::{self, ErrorKind},
    path::PathBuf,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

pub const PET_IMAGE_DIR: &str = "pet_images";
const MAX_MEDIA_PATH_LEN: usize = 255;

#[derive(Clone)]
pub struct MediaService {
    /// Media root; stored paths are relative to it.
    pub base_path: PathBuf,

    max_image_bytes: u64,
}

impl MediaService {
    pub fn new(base_path: impl Into<PathBuf>, max_image_bytes: u64) -> Self {
        Self {
            base_path: base_path.into(),
            max_image_bytes,
        }
    }

    /// Reject relative paths that could escape the media root, and hidden
    /// entries (in-flight `.tmp-*` uploads, `.readyz-*` probes).
    fn ensure_path_safe(&self, path: &str) -> ServiceResult<()> {
        let invalid = path.is_empty()
            || path.len() > MAX_MEDIA_PATH_LEN
            || path.starts_with('/')
            || path.contains("..")
            || path.split('/').any(|segment| segment.starts_with('.'))
            || path
                .bytes()
                .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0');
        if invalid {
            return Err(ServiceError::NotFound(format!("media `{path}`")));
        }
        Ok(())
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }

    /// Stream an uploaded image to disk and return its path relative to the
    /// media root. Only `image/*` types with a known extension are accepted.
    pub async fn store_image_stream<S>(
        &self,
        content_type: Option<&str>,
        stream: S,
    ) -> ServiceResult<String>
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        let extension = content_type.and_then(image_extension).ok_or_else(|| {
            ServiceError::BadRequest(
                "Upload a JPEG, PNG, GIF or WebP image (set Content-Type accordingly).".into(),
            )
        })?;

        let dir = self.base_path.join(PET_IMAGE_DIR);
        fs::create_dir_all(&dir).await?;
        let file_name = format!("{}.{}", Uuid::new_v4().simple(), extension);
        let final_path = dir.join(&file_name);
        let tmp_path = dir.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: u64 = 0;
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(ServiceError::Io(err));
                }
            };
            size_bytes += chunk.len() as u64;
            if size_bytes > self.max_image_bytes {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(ServiceError::BadRequest(format!(
                    "Image exceeds the {} byte limit.",
                    self.max_image_bytes
                )));
            }
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(ServiceError::Io(err));
            }
        }
        if size_bytes == 0 {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(ServiceError::BadRequest("Image upload was empty.".into()));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(ServiceError::Io(err));
        }
        drop(file);

        if let Err(err) = fs::rename(&tmp_path, &final_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(ServiceError::Io(err));
        }

        let relative = format!("{PET_IMAGE_DIR}/{file_name}");
        debug!(path = %relative, size_bytes, "stored pet image");
        Ok(relative)
    }

    /// Open a stored file for streaming. Returns the handle, its length and
    /// a content type derived from the extension.
    pub async fn open(&self, path: &str) -> ServiceResult<(File, u64, &'static str)> {
        self.ensure_path_safe(path)?;
        let full = self.full_path(path);
        let file = File::open(&full).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                ServiceError::NotFound(format!("media `{path}`"))
            } else {
                ServiceError::Io(err)
            }
        })?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(ServiceError::NotFound(format!("media `{path}`")));
        }
        Ok((file, metadata.len(), content_type_for(path)))
    }

    /// Best-effort removal; a file that is already gone is not an error.
    pub async fn remove(&self, path: &str) -> ServiceResult<()> {
        self.ensure_path_safe(path)?;
        let full = self.full_path(path);
        match fs::remove_file(&full).await {
            Ok(_) => debug!("removed media file {}", full.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("media file {} already missing", full.display());
            }
            Err(err) => return Err(ServiceError::Io(err)),
        }
        Ok(())
    }

    /// Number of regular files in the pet image directory (temp files excluded).
    pub async fn count_pet_images(&self) -> ServiceResult<u64> {
        let dir = self.base_path.join(PET_IMAGE_DIR);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(ServiceError::Io(err)),
        };

        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            let is_temp = entry.file_name().to_string_lossy().starts_with(".tmp-");
            if !is_temp && entry.file_type().await?.is_file() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Write, read back and delete a probe file under the media root.
    pub async fn check_writable(&self) -> Result<(), String> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| format!("could not create media dir: {}", e))?;
        let tmp_path = self.base_path.join(format!(".readyz-{}", Uuid::new_v4()));
        fs::write(&tmp_path, b"readyz")
            .await
            .map_err(|e| format!("could not write tmp file: {}", e))?;
        let result = match fs::read(&tmp_path).await {
            Ok(bytes) if bytes == b"readyz" => Ok(()),
            Ok(_) => Err("file content mismatch".to_string()),
            Err(e) => Err(format!("could not read tmp file: {}", e)),
        };
        // best-effort cleanup
        let _ = fs::remove_file(&tmp_path).await;
        result
    }
}

fn image_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

pub fn content_type_for(path: &str) -> &'static str {
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tokio::io::AsyncReadExt;

    fn temp_media(max: u64) -> MediaService {
        let dir = std::env::temp_dir().join(format!("petconnect-media-{}", Uuid::new_v4()));
        MediaService::new(dir, max)
    }

    fn body(chunks: &[&'static [u8]]) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        let chunks: Vec<io::Result<Bytes>> =
            chunks.iter().map(|c| Ok(Bytes::from_static(c))).collect();
        stream::iter(chunks)
    }

    #[tokio::test]
    async fn stores_opens_counts_and_removes() {
        let media = temp_media(1024);
        let path = media
            .store_image_stream(Some("image/png"), body(&[b"\x89PNG", b"rest"]))
            .await
            .unwrap();
        assert!(path.starts_with("pet_images/"));
        assert!(path.ends_with(".png"));
        assert_eq!(media.count_pet_images().await.unwrap(), 1);

        let (mut file, len, content_type) = media.open(&path).await.unwrap();
        assert_eq!(len, 8);
        assert_eq!(content_type, "image/png");
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await.unwrap();
        assert_eq!(contents, b"\x89PNGrest");

        media.remove(&path).await.unwrap();
        media.remove(&path).await.unwrap();
        assert_eq!(media.count_pet_images().await.unwrap(), 0);
        let _ = fs::remove_dir_all(&media.base_path).await;
    }

    #[tokio::test]
    async fn rejects_non_images_oversized_and_empty_uploads() {
        let media = temp_media(4);
        assert!(matches!(
            media.store_image_stream(Some("text/plain"), body(&[b"hi"])).await,
            Err(ServiceError::BadRequest(_))
        ));
        assert!(matches!(
            media.store_image_stream(None, body(&[b"hi"])).await,
            Err(ServiceError::BadRequest(_))
        ));
        assert!(matches!(
            media
                .store_image_stream(Some("image/jpeg"), body(&[b"abc", b"def"]))
                .await,
            Err(ServiceError::BadRequest(_))
        ));
        assert!(matches!(
            media.store_image_stream(Some("image/jpeg"), body(&[])).await,
            Err(ServiceError::BadRequest(_))
        ));
        assert_eq!(media.count_pet_images().await.unwrap(), 0);
        let _ = fs::remove_dir_all(&media.base_path).await;
    }

    #[tokio::test]
    async fn traversal_paths_are_not_found() {
        let media = temp_media(1024);
        for path in ["../etc/passwd", "/etc/passwd", "", "pet_images\\x.png"] {
            assert!(matches!(
                media.open(path).await,
                Err(ServiceError::NotFound(_))
            ));
        }
    }

    #[tokio::test]
    async fn hidden_files_are_not_served() {
        let media = temp_media(1024);
        let dir = media.base_path.join(PET_IMAGE_DIR);
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join(".tmp-upload"), b"partial").await.unwrap();
        fs::write(media.base_path.join(".readyz-probe"), b"readyz")
            .await
            .unwrap();

        for path in ["pet_images/.tmp-upload", ".readyz-probe", "./pet_images/x.png"] {
            assert!(matches!(
                media.open(path).await,
                Err(ServiceError::NotFound(_))
            ));
        }
        let _ = fs::remove_dir_all(&media.base_path).await;
    }

    #[tokio::test]
    async fn readiness_probe_writes_to_media_root() {
        let media = temp_media(1024);
        assert!(media.check_writable().await.is_ok());
        assert_eq!(media.count_pet_images().await.unwrap(), 0);
        let _ = fs::remove_dir_all(&media.base_path).await;
    }

    #[test]
    fn content_types() {
        assert_eq!(image_extension("image/JPEG; charset=binary"), Some("jpg"));
        assert_eq!(image_extension("application/pdf"), None);
        assert_eq!(content_type_for("pet_images/a.webp"), "image/webp");
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }
}
