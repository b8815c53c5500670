//! Datafile thumbnail generation
//!
//! Every image datafile gets two grayscale JPEG artifacts in a flat
//! directory: `<id>.jpg` at full resolution and `<id>_small.jpg` bounded by
//! 400x400. Regenerating overwrites both.

use crate::{Error, Result};
use image::{imageops, imageops::FilterType, DynamicImage, GrayImage, ImageFormat, Luma};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bounding box of the small thumbnail
pub const SMALL_THUMBNAIL_SIZE: u32 = 400;

/// Thumbnail variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailSize {
    Full,
    Small,
}

impl ThumbnailSize {
    /// File name suffix appended to the datafile id
    pub fn suffix(self) -> &'static str {
        match self {
            ThumbnailSize::Full => ".jpg",
            ThumbnailSize::Small => "_small.jpg",
        }
    }

    /// Map a URL path segment to a variant; anything but `small` is full size
    pub fn from_segment(segment: &str) -> Self {
        if segment == "small" {
            ThumbnailSize::Small
        } else {
            ThumbnailSize::Full
        }
    }
}

/// Paths of a freshly written thumbnail pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailPaths {
    pub full: PathBuf,
    pub small: PathBuf,
}

/// Writes and reads thumbnails under a single directory
#[derive(Debug, Clone)]
pub struct ThumbnailGenerator {
    dir: PathBuf,
}

impl ThumbnailGenerator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Expected location of a thumbnail (does not generate)
    pub fn path_for(&self, datafile_id: i64, size: ThumbnailSize) -> PathBuf {
        self.dir.join(format!("{}{}", datafile_id, size.suffix()))
    }

    /// Decode the image at `source` and write both thumbnails for it
    pub fn generate_from_file(&self, datafile_id: i64, source: &Path) -> Result<ThumbnailPaths> {
        let img = image::open(source)?;
        debug!(
            "Decoded {} ({}x{}, {:?})",
            source.display(),
            img.width(),
            img.height(),
            img.color()
        );
        self.write_thumbnails(datafile_id, &img)
    }

    /// Write the full-size and small grayscale JPEGs for `img`
    pub fn write_thumbnails(&self, datafile_id: i64, img: &DynamicImage) -> Result<ThumbnailPaths> {
        fs::create_dir_all(&self.dir)?;

        let gray = to_grayscale8(img);

        let full = self.path_for(datafile_id, ThumbnailSize::Full);
        gray.save_with_format(&full, ImageFormat::Jpeg)?;

        let (width, height) = fit_within(gray.width(), gray.height(), SMALL_THUMBNAIL_SIZE);
        let small_img = if (width, height) == gray.dimensions() {
            gray
        } else {
            imageops::resize(&gray, width, height, FilterType::Lanczos3)
        };
        let small = self.path_for(datafile_id, ThumbnailSize::Small);
        small_img.save_with_format(&small, ImageFormat::Jpeg)?;

        info!("Wrote thumbnails for datafile {} ({}x{} small)", datafile_id, width, height);
        Ok(ThumbnailPaths { full, small })
    }

    /// Load stored thumbnail bytes
    pub fn read(&self, datafile_id: i64, size: ThumbnailSize) -> Result<Vec<u8>> {
        let path = self.path_for(datafile_id, size);
        fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                Error::NotFound(format!("Thumbnail {}", path.display()))
            }
            _ => Error::Io(e),
        })
    }
}

/// Reduce any image to 8-bit grayscale
///
/// 8-bit grayscale passes through. 16-bit images go through the linear
/// table `v / 256`; everything else uses the standard luma conversion.
pub fn to_grayscale8(img: &DynamicImage) -> GrayImage {
    match img {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_) => {
            let wide = img.to_luma16();
            GrayImage::from_fn(wide.width(), wide.height(), |x, y| {
                Luma([(wide.get_pixel(x, y)[0] / 256) as u8])
            })
        }
        _ => img.to_luma8(),
    }
}

/// Largest size within `max`x`max` keeping the aspect ratio; never enlarges
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }

    let scale = f64::min(max as f64 / width as f64, max as f64 / height as f64);
    let scaled = |v: u32| ((v as f64 * scale).round() as u32).clamp(1, max);
    (scaled(width), scaled(height))
}
