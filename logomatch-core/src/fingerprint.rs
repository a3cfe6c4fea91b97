//! Perceptual fingerprints.
//!
//! A fingerprint is a 64-bit pHash: the image is reduced to a 32×32
//! grayscale grid, transformed with a DCT-II, and the 8×8 lowest-frequency
//! coefficients are compared against their median. Visually similar images
//! end up a small Hamming distance apart.

use crate::domain::Domain;
use crate::error::HashError;
use image::imageops::{self, FilterType};
use logomatch_scanner::LogoImage;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Side of the grid the image is resampled to before the transform
pub const SAMPLE_SIDE: usize = 32;

/// Side of the low-frequency block kept from the transform
pub const HASH_SIDE: usize = 8;

/// Fingerprints of every domain that was fetched and hashed successfully
pub type FingerprintMap = BTreeMap<Domain, Fingerprint>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub const BITS: u32 = u64::BITS;

    pub fn from_bits(bits: u64) -> Self {
        Fingerprint(bits)
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    /// Number of differing bit positions
    pub fn distance(&self, other: &Fingerprint) -> u32 {
        hamming_distance(*self, *other)
    }
}

pub fn hamming_distance(a: Fingerprint, b: Fingerprint) -> u32 {
    (a.0 ^ b.0).count_ones()
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFingerprintError(String);

impl fmt::Display for ParseFingerprintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid fingerprint {:?}: expected 16 hex digits", self.0)
    }
}

impl std::error::Error for ParseFingerprintError {}

impl FromStr for Fingerprint {
    type Err = ParseFingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 16 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseFingerprintError(s.to_string()));
        }
        u64::from_str_radix(s, 16)
            .map(Fingerprint)
            .map_err(|_| ParseFingerprintError(s.to_string()))
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Turns a decoded logo into a fingerprint
pub trait LogoHasher: Send + Sync {
    fn hash(&self, image: &LogoImage) -> Result<Fingerprint, HashError>;
}

/// Computes pHash fingerprints. Holds the precomputed cosine table, so build
/// one and share it.
#[derive(Debug, Clone)]
pub struct PerceptualHasher {
    // cosines[k * SAMPLE_SIDE + n] = cos(pi * k * (2n + 1) / (2 * SAMPLE_SIDE))
    cosines: Vec<f64>,
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PerceptualHasher {
    pub fn new() -> Self {
        let n = SAMPLE_SIDE as f64;
        let mut cosines = Vec::with_capacity(HASH_SIDE * SAMPLE_SIDE);
        for k in 0..HASH_SIDE {
            for i in 0..SAMPLE_SIDE {
                cosines.push((PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos());
            }
        }
        Self { cosines }
    }

    pub fn hash(&self, image: &LogoImage) -> Result<Fingerprint, HashError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(HashError::EmptyImage {
                width: image.width(),
                height: image.height(),
            });
        }

        let gray = image.to_grayscale();
        let side = SAMPLE_SIDE as u32;
        let sampled = imageops::resize(&gray, side, side, FilterType::Lanczos3);

        let mut pixels = [[0f64; SAMPLE_SIDE]; SAMPLE_SIDE];
        for (x, y, pixel) in sampled.enumerate_pixels() {
            pixels[y as usize][x as usize] = pixel[0] as f64;
        }

        let coefficients = self.low_frequencies(&pixels);
        Ok(Fingerprint(binarize(&coefficients)))
    }

    /// Top-left HASH_SIDE×HASH_SIDE block of the 2-D DCT-II, row-major.
    /// Unnormalized; the scale does not matter for a median comparison.
    fn low_frequencies(&self, pixels: &[[f64; SAMPLE_SIDE]; SAMPLE_SIDE]) -> [f64; HASH_SIDE * HASH_SIDE] {
        // Transform each row, keeping only the low horizontal frequencies
        let mut rows = [[0f64; HASH_SIDE]; SAMPLE_SIDE];
        for (y, row) in pixels.iter().enumerate() {
            for k in 0..HASH_SIDE {
                let basis = &self.cosines[k * SAMPLE_SIDE..(k + 1) * SAMPLE_SIDE];
                rows[y][k] = row.iter().zip(basis).map(|(p, c)| p * c).sum();
            }
        }

        // Then each column of that, keeping the low vertical frequencies
        let mut out = [0f64; HASH_SIDE * HASH_SIDE];
        for j in 0..HASH_SIDE {
            let basis = &self.cosines[j * SAMPLE_SIDE..(j + 1) * SAMPLE_SIDE];
            for k in 0..HASH_SIDE {
                out[j * HASH_SIDE + k] = rows.iter().zip(basis).map(|(r, c)| r[k] * c).sum();
            }
        }
        out
    }
}

impl LogoHasher for PerceptualHasher {
    fn hash(&self, image: &LogoImage) -> Result<Fingerprint, HashError> {
        PerceptualHasher::hash(self, image)
    }
}

/// Rounds away floating point noise so that coefficients which are zero in
/// exact arithmetic compare equal.
fn snap(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// One bit per coefficient, set when above the median. First coefficient is
/// the most significant bit.
fn binarize(coefficients: &[f64; HASH_SIDE * HASH_SIDE]) -> u64 {
    let coefficients = coefficients.map(snap);
    let mut sorted = coefficients;
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    let median = (sorted[mid - 1] + sorted[mid]) / 2.0;

    coefficients
        .iter()
        .enumerate()
        .filter(|(_, value)| **value > median)
        .fold(0u64, |bits, (i, _)| bits | (1u64 << (63 - i)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};

    fn noise(width: u32, height: u32, seed: u32) -> RgbImage {
        let mut state = seed;
        ImageBuffer::from_fn(width, height, |_, _| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let v = (state >> 16) as u8;
            Rgb([v, v, v])
        })
    }

    fn logo(image: RgbImage) -> LogoImage {
        LogoImage::from_dynamic(DynamicImage::ImageRgb8(image))
    }

    #[test]
    fn test_hamming_distance_basics() {
        let a = Fingerprint::from_bits(0b1011);
        let b = Fingerprint::from_bits(0b0110);
        assert_eq!(hamming_distance(a, b), 3);
        assert_eq!(hamming_distance(b, a), 3);
        assert_eq!(a.distance(&a), 0);
        assert_eq!(
            Fingerprint::from_bits(0).distance(&Fingerprint::from_bits(u64::MAX)),
            Fingerprint::BITS
        );
    }

    #[test]
    fn test_display_and_parse() {
        let fp = Fingerprint::from_bits(0x00ff_1234_abcd_0001);
        assert_eq!(fp.to_string(), "00ff1234abcd0001");
        assert_eq!("00ff1234abcd0001".parse::<Fingerprint>().unwrap(), fp);
        assert!("00ff".parse::<Fingerprint>().is_err());
        assert!("zzzzzzzzzzzzzzzz".parse::<Fingerprint>().is_err());
    }

    #[test]
    fn test_parse_rejects_sign_prefix() {
        assert!("+fffffffffffffff".parse::<Fingerprint>().is_err());
        assert!("-000000000000001".parse::<Fingerprint>().is_err());
        assert_eq!(
            "FFFFFFFFFFFFFFFF".parse::<Fingerprint>().unwrap(),
            Fingerprint::from_bits(u64::MAX)
        );
    }

    #[test]
    fn test_serde_as_hex_string() {
        let fp = Fingerprint::from_bits(0x8000_0000_0000_0000);
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, "\"8000000000000000\"");
        let back: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fp);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let hasher = PerceptualHasher::new();
        let image = logo(noise(64, 64, 7));
        assert_eq!(hasher.hash(&image).unwrap(), hasher.hash(&image).unwrap());
        assert_eq!(PerceptualHasher::new().hash(&image).unwrap(), hasher.hash(&image).unwrap());
    }

    #[test]
    fn test_solid_image_sets_only_dc_bit() {
        let hasher = PerceptualHasher::new();
        let solid = logo(ImageBuffer::from_pixel(64, 64, Rgb([120, 120, 120])));
        assert_eq!(hasher.hash(&solid).unwrap().bits(), 1u64 << 63);
    }

    #[test]
    fn test_small_edit_keeps_fingerprint_close() {
        let hasher = PerceptualHasher::new();
        let original = noise(64, 64, 42);
        let mut edited = original.clone();
        let p = edited.get_pixel_mut(10, 10);
        p[0] = p[0].saturating_add(1);

        let a = hasher.hash(&logo(original)).unwrap();
        let b = hasher.hash(&logo(edited)).unwrap();
        assert!(a.distance(&b) <= 4, "distance was {}", a.distance(&b));
    }

    #[test]
    fn test_inverted_image_is_far_away() {
        let hasher = PerceptualHasher::new();
        let original = noise(64, 64, 3);
        let mut inverted = original.clone();
        for pixel in inverted.pixels_mut() {
            for channel in pixel.0.iter_mut() {
                *channel = 255 - *channel;
            }
        }

        let a = hasher.hash(&logo(original)).unwrap();
        let b = hasher.hash(&logo(inverted)).unwrap();
        assert!(a.distance(&b) > 32, "distance was {}", a.distance(&b));
    }

    fn smooth(side: u32) -> RgbImage {
        ImageBuffer::from_fn(side, side, |x, y| {
            let u = x as f64 / side as f64;
            let v = y as f64 / side as f64;
            let value = 128.0
                + 50.0 * (2.0 * PI * 1.3 * u + 0.4).sin()
                + 40.0 * (2.0 * PI * 0.8 * v).cos()
                + 25.0 * (2.0 * PI * (2.1 * u + 1.7 * v)).sin();
            let g = value.clamp(0.0, 255.0) as u8;
            Rgb([g, g, g])
        })
    }

    #[test]
    fn test_scaled_copy_hashes_close() {
        let hasher = PerceptualHasher::new();
        let a = hasher.hash(&logo(smooth(128))).unwrap();
        let b = hasher.hash(&logo(smooth(64))).unwrap();
        assert!(a.distance(&b) <= 6, "distance was {}", a.distance(&b));
    }

    #[test]
    fn test_empty_image_is_hash_error() {
        let hasher = PerceptualHasher::new();
        let empty = LogoImage::from_dynamic(DynamicImage::new_rgb8(0, 0));
        assert_eq!(
            hasher.hash(&empty),
            Err(HashError::EmptyImage { width: 0, height: 0 })
        );
    }
}
