// Decoded logos: decoding, color normalization and the quality filter

use crate::error::SourceFailure;
use image::{DynamicImage, GrayImage, ImageFormat, ImageReader, Limits, Luma};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;

/// Smallest width and height an image may have to count as meaningful
pub const MIN_MEANINGFUL_SIDE: u32 = 32;

/// A meaningful image must use strictly more gray levels than this
pub const MIN_DISTINCT_SHADES: usize = 10;

/// Decoder limits, passed explicitly on every decode call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeSettings {
    pub max_width: u32,
    pub max_height: u32,
    pub max_alloc_bytes: u64,
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            max_width: 4096,
            max_height: 4096,
            max_alloc_bytes: 64 * 1024 * 1024,
        }
    }
}

impl DecodeSettings {
    fn limits(&self) -> Limits {
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_width);
        limits.max_image_height = Some(self.max_height);
        limits.max_alloc = Some(self.max_alloc_bytes);
        limits
    }
}

/// Whether an image passed the quality filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    Meaningful,
    /// Decodable, but too small or too plain. Only used as a fallback.
    Weak,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Meaningful => "meaningful",
            Quality::Weak => "weak",
        }
    }
}

/// A decoded logo, normalized to RGB8 or RGBA8.
#[derive(Debug, Clone)]
pub struct LogoImage {
    image: DynamicImage,
}

impl LogoImage {
    /// Decode raw bytes, sniffing the format from the magic bytes.
    pub fn decode(bytes: &[u8], settings: &DecodeSettings) -> Result<Self, SourceFailure> {
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| SourceFailure::Decode(e.to_string()))?;
        reader.limits(settings.limits());
        let decoded = reader.decode()?;
        Ok(Self::from_dynamic(decoded))
    }

    /// Wrap an already decoded image. Images with an alpha channel (palette
    /// images with transparency are expanded to RGBA by the decoder) keep it,
    /// everything else becomes opaque RGB.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let normalized = if image.color().has_alpha() {
            DynamicImage::ImageRgba8(image.into_rgba8())
        } else {
            DynamicImage::ImageRgb8(image.into_rgb8())
        };
        Self { image: normalized }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn has_alpha(&self) -> bool {
        self.image.color().has_alpha()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Grayscale conversion with ITU-R 601 weights. Alpha is ignored.
    pub fn to_grayscale(&self) -> GrayImage {
        match &self.image {
            DynamicImage::ImageRgba8(buf) => GrayImage::from_fn(buf.width(), buf.height(), |x, y| {
                let p = buf.get_pixel(x, y);
                Luma([luma(p[0], p[1], p[2])])
            }),
            DynamicImage::ImageRgb8(buf) => GrayImage::from_fn(buf.width(), buf.height(), |x, y| {
                let p = buf.get_pixel(x, y);
                Luma([luma(p[0], p[1], p[2])])
            }),
            other => {
                let buf = other.to_rgb8();
                GrayImage::from_fn(buf.width(), buf.height(), |x, y| {
                    let p = buf.get_pixel(x, y);
                    Luma([luma(p[0], p[1], p[2])])
                })
            }
        }
    }

    /// 256-bucket histogram of the grayscale image
    pub fn histogram(&self) -> [u32; 256] {
        let mut buckets = [0u32; 256];
        for pixel in self.to_grayscale().pixels() {
            buckets[pixel[0] as usize] += 1;
        }
        buckets
    }

    /// Number of gray levels that occur at least once
    pub fn distinct_shades(&self) -> usize {
        self.histogram().iter().filter(|&&count| count > 0).count()
    }

    /// Large enough and not a blank placeholder
    pub fn is_meaningful(&self) -> bool {
        if self.width() < MIN_MEANINGFUL_SIDE || self.height() < MIN_MEANINGFUL_SIDE {
            return false;
        }
        self.distinct_shades() > MIN_DISTINCT_SHADES
    }

    pub fn quality(&self) -> Quality {
        if self.is_meaningful() {
            Quality::Meaningful
        } else {
            Quality::Weak
        }
    }

    /// Write the normalized image as PNG
    pub fn write_png(&self, path: &Path) -> image::ImageResult<()> {
        self.image.save_with_format(path, ImageFormat::Png)
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((19595 * r as u32 + 38470 * g as u32 + 7471 * b as u32 + 0x8000) >> 16) as u8
}
