// THEORY:
// A `Fingerprint` is a 256-bit perceptual hash (pHash) of a photo. It keeps
// only the coarse, low-frequency structure of the image, so the same scene
// re-encoded or resized hashes to the same (or a very close) value, while a
// different scene lands far away in Hamming distance.
//
// Algorithm:
// 1.  Convert to Rec. 601 grayscale and resample to 64x64 (Lanczos3).
// 2.  Take the unnormalised 2-D DCT-II of the resampled frame, columns first.
// 3.  Keep the top-left 16x16 block of coefficients (lowest frequencies).
// 4.  Set bit `i` (row-major over the block) when coefficient `i` is greater
//     than the median of the block.

use crate::core_modules::gray_frame::GrayFrame;
use image::RgbImage;
use image::imageops::{self, FilterType};
use std::f64::consts::PI;
use std::fmt;
use std::sync::OnceLock;

const HASH_SIZE: usize = 16;
const HIGHFREQ_FACTOR: usize = 4;
const SAMPLE_SIZE: usize = HASH_SIZE * HIGHFREQ_FACTOR;
const WORDS: usize = HASH_SIZE * HASH_SIZE / 64;

/// Number of bits in a fingerprint.
pub const FINGERPRINT_BITS: u32 = (HASH_SIZE * HASH_SIZE) as u32;

// cos(pi * k * (2n + 1) / 2N) for the first HASH_SIZE frequencies.
static DCT_BASIS: OnceLock<[[f64; SAMPLE_SIZE]; HASH_SIZE]> = OnceLock::new();

fn dct_basis() -> &'static [[f64; SAMPLE_SIZE]; HASH_SIZE] {
    DCT_BASIS.get_or_init(|| {
        let mut table = [[0.0; SAMPLE_SIZE]; HASH_SIZE];
        for (k, row) in table.iter_mut().enumerate() {
            for (n, cell) in row.iter_mut().enumerate() {
                *cell = (PI * k as f64 * (2 * n + 1) as f64 / (2 * SAMPLE_SIZE) as f64).cos();
            }
        }
        table
    })
}

/// A fixed-length perceptual summary of a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u64; WORDS]);

impl Fingerprint {
    pub fn from_words(words: [u64; WORDS]) -> Self {
        Self(words)
    }

    pub fn words(&self) -> [u64; WORDS] {
        self.0
    }

    /// Number of differing bits between two fingerprints.
    pub fn hamming_distance(&self, other: &Fingerprint) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    fn from_bits(bits: impl Iterator<Item = bool>) -> Self {
        let mut words = [0u64; WORDS];
        for (i, bit) in bits.enumerate().take(FINGERPRINT_BITS as usize) {
            if bit {
                words[i / 64] |= 1 << (63 - i % 64);
            }
        }
        Self(words)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for word in &self.0 {
            write!(f, "{word:016x}")?;
        }
        Ok(())
    }
}

/// Computes the perceptual fingerprint of a decoded photo.
pub fn compute(image: &RgbImage) -> Fingerprint {
    let gray = GrayFrame::from_rgb(image);
    let Some(gray_image) = gray.to_image().filter(|g| g.width() > 0 && g.height() > 0) else {
        return Fingerprint::default();
    };
    let sample = imageops::resize(&gray_image, SAMPLE_SIZE as u32, SAMPLE_SIZE as u32, FilterType::Lanczos3);

    let basis = dct_basis();

    // --- 1. DCT along columns (vertical frequencies) ---
    let mut vertical = [[0.0f64; SAMPLE_SIZE]; HASH_SIZE];
    for x in 0..SAMPLE_SIZE {
        for (k, basis_row) in basis.iter().enumerate() {
            let mut acc = 0.0;
            for (y, weight) in basis_row.iter().enumerate() {
                acc += sample.get_pixel(x as u32, y as u32).0[0] as f64 * weight;
            }
            vertical[k][x] = 2.0 * acc;
        }
    }

    // --- 2. DCT along rows, low frequencies only ---
    let mut coefficients = Vec::with_capacity(HASH_SIZE * HASH_SIZE);
    for row in &vertical {
        for basis_row in basis.iter() {
            let acc: f64 = row.iter().zip(basis_row.iter()).map(|(v, w)| v * w).sum();
            coefficients.push(2.0 * acc);
        }
    }

    // --- 3. Threshold at the median ---
    let median = median(&coefficients);
    Fingerprint::from_bits(coefficients.iter().map(|&c| c > median))
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.is_empty() {
        0.0
    } else if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self([0; WORDS])
    }
}
