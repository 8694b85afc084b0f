use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tokio::{fs::File, io::AsyncWriteExt};
use uuid::Uuid;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];
const DEFAULT_EXTENSION: &str = "jpg";

/// Directory-backed store for device photos. Files are renamed to a UUID
/// and referenced by URL path from the device record.
#[derive(Clone)]
pub struct ImageStore {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredImage {
    pub filename: String,
    pub url: String,
    pub size: usize,
}

impl ImageStore {
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create image dir at {}", root.display()))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn save(&self, bytes: &[u8], original_name: Option<&str>) -> Result<StoredImage> {
        if bytes.is_empty() {
            bail!("empty image payload");
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            bail!("image exceeds the {MAX_IMAGE_BYTES} byte limit");
        }

        let ext = match original_name
            .and_then(|name| Path::new(name).extension().and_then(|e| e.to_str()))
        {
            Some(raw) => {
                let cleaned: String = raw
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .collect::<String>()
                    .to_lowercase();
                if !ALLOWED_EXTENSIONS.contains(&cleaned.as_str()) {
                    bail!("unsupported image type: {raw}");
                }
                cleaned
            }
            None => DEFAULT_EXTENSION.to_string(),
        };

        let filename = format!("{}.{ext}", Uuid::new_v4());
        let path = self.root.join(&filename);

        let mut file = File::create(&path)
            .await
            .with_context(|| format!("Failed to create file {}", path.display()))?;
        file.write_all(bytes)
            .await
            .with_context(|| format!("Failed to write file {}", path.display()))?;

        Ok(StoredImage {
            url: format!("/api/images/{filename}"),
            filename,
            size: bytes.len(),
        })
    }
}

pub fn content_type_for(filename: &str) -> &'static str {
    match Path::new(filename).extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
