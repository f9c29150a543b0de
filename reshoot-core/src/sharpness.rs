//! # Sharpness Module
//!
//! Decides whether a captured frame is too blurry to keep.
//!
//! The score is the population variance of the Laplacian of the luma
//! channel. Sharp frames carry strong high-frequency edges, which give a
//! wide spread of Laplacian responses; blur flattens them towards zero.
//!
//! ## Pipeline
//! 1. Decode the compressed bytes
//! 2. Convert to 8-bit luma (Rec. 709 weights, via `image`)
//! 3. Apply the 4-neighbour Laplacian with an `f64` accumulator
//! 4. Take `mean(v²) - mean(v)²` over every response
//!
//! The threshold is tied to this exact kernel and a 0-255 intensity
//! scale. Changing either means retuning [`BLUR_THRESHOLD`].

use crate::error::DecodeError;
use image::GrayImage;

/// Frames scoring below this variance are rejected as blurry.
pub const BLUR_THRESHOLD: f64 = 100.0;

/// Laplacian variance of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharpnessScore {
    /// Always `>= 0`.
    pub variance: f64,
}

impl SharpnessScore {
    /// Strictly below [`BLUR_THRESHOLD`]; a score of exactly the
    /// threshold passes.
    pub fn is_blurry(&self) -> bool {
        self.variance < BLUR_THRESHOLD
    }
}

/// Decodes `bytes` and scores the result.
///
/// # Returns
/// * `Ok(score)` - Laplacian variance of the decoded frame
/// * `Err(DecodeError)` - the bytes are not an image, or decode to nothing
pub fn analyze(bytes: &[u8]) -> Result<SharpnessScore, DecodeError> {
    let decoded = image::load_from_memory(bytes)?;
    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        return Err(DecodeError::Empty { width, height });
    }

    let gray = decoded.to_luma8();
    Ok(SharpnessScore {
        variance: laplacian_variance(&gray),
    })
}

/// Variance of the 4-neighbour Laplacian response over the whole image.
///
/// The response grid has the same dimensions as the input; neighbours
/// outside the image are clamped to the nearest edge pixel, so a flat
/// image scores exactly zero.
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return 0.0;
    }

    let px = |x: u32, y: u32| f64::from(gray.get_pixel(x, y).0[0]);

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;

    for y in 0..height {
        let up = y.saturating_sub(1);
        let down = (y + 1).min(height - 1);
        for x in 0..width {
            let left = x.saturating_sub(1);
            let right = (x + 1).min(width - 1);

            // Kernel: [[0, 1, 0], [1, -4, 1], [0, 1, 0]]
            let response = px(x, up) + px(x, down) + px(left, y) + px(right, y) - 4.0 * px(x, y);

            sum += response;
            sum_sq += response * response;
        }
    }

    let count = f64::from(width) * f64::from(height);
    let mean = sum / count;
    // Rounding can push a near-zero variance slightly negative.
    (sum_sq / count - mean * mean).max(0.0)
}
