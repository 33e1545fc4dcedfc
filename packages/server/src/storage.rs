use std::path::{Path, PathBuf};

use rand::Rng;

use crate::config::StorageConfig;
use crate::error::AppError;
use crate::utils::filename;

/// Model files are restricted to these container formats.
const MODEL_EXTENSIONS: &[&str] = &["glb", "gltf"];

/// The two kinds of binary assets an item owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    Model,
}

impl AssetKind {
    /// Subdirectory under the uploads root.
    pub fn dir(self) -> &'static str {
        match self {
            AssetKind::Image => "images",
            AssetKind::Model => "models",
        }
    }

    /// Filename prefix for generated names.
    fn prefix(self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Model => "model",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Model => "model",
        }
    }
}

/// Filesystem-backed store for uploaded images and 3D model files.
///
/// Files are addressed by generated reference paths of the form
/// `/uploads/<kind>/<prefix>-<millis>-<random><.ext>`, which the router also
/// serves statically. The store itself never deletes metadata; cleanup of
/// references is the caller's job.
#[derive(Clone, Debug)]
pub struct AssetStore {
    root: PathBuf,
    max_image_bytes: u64,
    max_model_bytes: u64,
}

impl AssetStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: PathBuf::from(&config.uploads_dir),
            max_image_bytes: config.max_image_bytes,
            max_model_bytes: config.max_model_bytes,
        }
    }

    /// Create the per-kind subdirectories if they do not exist yet.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        for kind in [AssetKind::Image, AssetKind::Model] {
            tokio::fs::create_dir_all(self.root.join(kind.dir())).await?;
        }
        Ok(())
    }

    /// Size ceiling for a kind. The model ceiling is substantially larger.
    pub fn max_bytes(&self, kind: AssetKind) -> u64 {
        match kind {
            AssetKind::Image => self.max_image_bytes,
            AssetKind::Model => self.max_model_bytes,
        }
    }

    /// Check an upload's declared filename and content type against the
    /// kind's allow-list and return the extension to store it under.
    ///
    /// Images must carry an `image/*` content type; model files must end in
    /// one of the allowed container extensions.
    pub fn validate_upload(
        &self,
        kind: AssetKind,
        file_name: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<String, AppError> {
        let name = file_name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| {
                AppError::Validation(format!("The {} file must have a filename", kind.label()))
            })?;

        let ext = filename::extension_of(name).ok_or_else(|| {
            AppError::Validation(format!(
                "The {} file must have a file extension",
                kind.label()
            ))
        })?;

        match kind {
            AssetKind::Image => {
                let ok = content_type
                    .map(|ct| ct.starts_with("image/"))
                    .unwrap_or(false);
                if !ok {
                    return Err(AppError::Validation(
                        "Only image files are allowed for the preview image".into(),
                    ));
                }
            }
            AssetKind::Model => {
                if !MODEL_EXTENSIONS.contains(&ext.as_str()) {
                    return Err(AppError::Validation(
                        "Only .glb and .gltf model files are allowed".into(),
                    ));
                }
            }
        }

        Ok(ext)
    }

    /// Generate a collision-resistant reference path for a new asset:
    /// timestamp in milliseconds plus a random suffix, preserving the
    /// original extension. Concurrent uploads never collide.
    pub fn new_reference(&self, kind: AssetKind, ext: &str) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
        format!(
            "/uploads/{}/{}-{}-{}.{}",
            kind.dir(),
            kind.prefix(),
            millis,
            suffix,
            ext
        )
    }

    /// Map a stored reference to an absolute filesystem path.
    ///
    /// References may or may not carry the `/uploads/<kind>/` prefix
    /// (legacy records stored bare filenames); only the base name is
    /// trusted, which also rules out traversal.
    pub fn resolve(&self, kind: AssetKind, reference: &str) -> PathBuf {
        self.root
            .join(kind.dir())
            .join(filename::base_name(reference))
    }

    /// Best-effort deletion of a stored asset. Already-absent files are a
    /// no-op; other failures are logged and swallowed, which can leave an
    /// orphaned file on disk (accepted inconsistency, not a transaction).
    pub async fn remove(&self, kind: AssetKind, reference: &str) {
        let path = self.resolve(kind, reference);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!("Deleted asset {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to delete asset {}: {}", path.display(), e),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
