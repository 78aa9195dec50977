use image::{DynamicImage, GenericImageView, ImageFormat, imageops::FilterType};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use crate::config::UploadConfig;

pub const PROFILE_FOLDER: &str = "profile";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Uploaded file is empty")]
    Empty,

    #[error("Uploaded file exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Unsupported image: {0}")]
    Unsupported(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for ImageError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Content-addressed WebP storage under `images_path`, served at `/images`.
pub struct ImageStorageService {
    root: PathBuf,
    max_bytes: usize,
    max_width: u32,
    max_height: u32,
}

impl ImageStorageService {
    #[must_use]
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            root: PathBuf::from(&config.images_path),
            max_bytes: config.max_upload_bytes,
            max_width: config.max_width,
            max_height: config.max_height,
        }
    }

    /// Stores `data` as `{folder}/{h[0..2]}/{h[2..4]}/{h}.webp` where `h` is
    /// the SHA-256 of the upload, and returns the public path.
    ///
    /// Identical uploads map to the same file, which is only written once.
    pub async fn save_image(&self, data: Vec<u8>, folder: &str) -> Result<String, ImageError> {
        if data.is_empty() {
            return Err(ImageError::Empty);
        }
        if data.len() > self.max_bytes {
            return Err(ImageError::TooLarge {
                limit: self.max_bytes,
            });
        }
        if folder.is_empty()
            || !folder
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ImageError::Internal(format!("Invalid image folder: {folder}")));
        }

        let hash = hex_digest(&data);
        let relative = format!("{folder}/{}/{}", &hash[0..2], &hash[2..4]);
        let dir = self.root.join(&relative);
        let target = dir.join(format!("{hash}.webp"));
        let public_path = format!("/images/{relative}/{hash}.webp");

        if fs::try_exists(&target).await? {
            debug!(path = %target.display(), "Image already stored");
            return Ok(public_path);
        }

        let (max_width, max_height) = (self.max_width, self.max_height);
        let encoded = tokio::task::spawn_blocking(move || to_webp(&data, max_width, max_height))
            .await
            .map_err(|e| ImageError::Internal(format!("Image task panicked: {e}")))??;

        fs::create_dir_all(&dir).await?;
        fs::write(&target, encoded).await?;

        info!(path = %target.display(), "Stored image");
        Ok(public_path)
    }
}

fn hex_digest(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .fold(String::with_capacity(64), |mut acc, b| {
            use std::fmt::Write;
            let _ = write!(acc, "{b:02x}");
            acc
        })
}

/// Scales `(width, height)` down to fit the bounds, keeping the aspect ratio.
/// Never scales up.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let (w, h) = (u64::from(width), u64::from(height));
    let (max_w, max_h) = (u64::from(max_width), u64::from(max_height));

    // Compare w/max_w against h/max_h without floats
    if w * max_h >= h * max_w {
        (max_width, ((h * max_w / w) as u32).max(1))
    } else {
        (((w * max_h / h) as u32).max(1), max_height)
    }
}

fn to_webp(data: &[u8], max_width: u32, max_height: u32) -> Result<Vec<u8>, ImageError> {
    let img = image::load_from_memory(data).map_err(|e| ImageError::Unsupported(e.to_string()))?;

    let (width, height) = img.dimensions();
    let (new_width, new_height) = fit_within(width, height, max_width, max_height);
    let img = if (new_width, new_height) == (width, height) {
        img
    } else {
        img.resize_exact(new_width, new_height, FilterType::Lanczos3)
    };

    // The WebP encoder only takes 8-bit RGB(A)
    let img = DynamicImage::ImageRgba8(img.to_rgba8());

    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::WebP)
        .map_err(|e| ImageError::Internal(format!("Failed to encode WebP: {e}")))?;

    Ok(out)
}
