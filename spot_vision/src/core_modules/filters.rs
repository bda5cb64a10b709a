// THEORY:
// Preprocessing and edge-response filters used by the per-region test.
//
// Intensity conversion happens once per frame. Smoothing and the Laplacian run
// on each region's crop, with borders reflected inside the crop (reflect-101:
// `dcb|abcd|cba`), so no pixel outside a region's bound can influence its score.
//
// The numeric behaviour mirrors the classic OpenCV defaults: a sampled Gaussian
// kernel for a fixed odd aperture, 8-bit rounding after the blur, and the 3x3
// Laplacian aperture `[0 1 0; 1 -4 1; 0 1 0]` evaluated in `f64`.

use crate::error::VisionError;
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use std::borrow::Cow;

/// Floating-point second-derivative response over a crop.
pub type EdgeResponse = ImageBuffer<Luma<f64>, Vec<f64>>;

/// Reduces a frame to single-channel intensity using Rec. 601 weights.
/// Single-channel 8-bit frames are borrowed untouched.
pub fn to_intensity(frame: &DynamicImage) -> Cow<'_, GrayImage> {
    match frame {
        DynamicImage::ImageLuma8(gray) => Cow::Borrowed(gray),
        other => {
            let rgb = other.to_rgb8();
            Cow::Owned(GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                let [r, g, b] = rgb.get_pixel(x, y).0;
                Luma([luminance_601(r, g, b)])
            }))
        }
    }
}

fn luminance_601(r: u8, g: u8, b: u8) -> u8 {
    let value = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
    value.round().clamp(0.0, 255.0) as u8
}

/// A normalized, symmetric 1D Gaussian kernel applied separably in both axes.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel {
    weights: Vec<f64>,
}

impl GaussianKernel {
    /// Samples `exp(-(i - (size-1)/2)^2 / (2 sigma^2))` for an odd `size` and normalizes.
    pub fn new(size: usize, sigma: f64) -> Result<Self, VisionError> {
        if size == 0 || size % 2 == 0 {
            return Err(VisionError::InvalidConfig(format!(
                "blur kernel size must be odd and positive, got {size}"
            )));
        }
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(VisionError::InvalidConfig(format!(
                "blur sigma must be finite and positive, got {sigma}"
            )));
        }

        let centre = (size as f64 - 1.0) / 2.0;
        let scale = -0.5 / (sigma * sigma);
        let mut weights: Vec<f64> = (0..size)
            .map(|i| {
                let offset = i as f64 - centre;
                (scale * offset * offset).exp()
            })
            .collect();
        let sum: f64 = weights.iter().sum();
        weights.iter_mut().for_each(|w| *w /= sum);
        Ok(Self { weights })
    }

    pub fn size(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    fn radius(&self) -> i64 {
        (self.weights.len() / 2) as i64
    }
}

/// Maps an out-of-range index back into `0..len` by reflecting about the edge pixels.
pub fn reflect_101(mut index: i64, len: u32) -> u32 {
    let len = len as i64;
    if len <= 1 {
        return 0;
    }
    while index < 0 || index >= len {
        if index < 0 {
            index = -index;
        }
        if index >= len {
            index = 2 * (len - 1) - index;
        }
    }
    index as u32
}

/// Separable Gaussian blur with reflect-101 borders; the result is rounded back to 8 bits.
pub fn gaussian_blur(src: &GrayImage, kernel: &GaussianKernel) -> GrayImage {
    let (width, height) = src.dimensions();
    if width == 0 || height == 0 {
        return src.clone();
    }
    let radius = kernel.radius();
    let weights = kernel.weights();

    let mut horizontal = vec![0.0f64; (width * height) as usize];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, w) in weights.iter().enumerate() {
                let sx = reflect_101(x as i64 + k as i64 - radius, width);
                acc += w * src.get_pixel(sx, y).0[0] as f64;
            }
            horizontal[(y * width + x) as usize] = acc;
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let mut acc = 0.0;
        for (k, w) in weights.iter().enumerate() {
            let sy = reflect_101(y as i64 + k as i64 - radius, height);
            acc += w * horizontal[(sy * width + x) as usize];
        }
        Luma([acc.round().clamp(0.0, 255.0) as u8])
    })
}

/// Discrete Laplacian with the 4-neighbour aperture and reflect-101 borders.
pub fn laplacian(src: &GrayImage) -> EdgeResponse {
    let (width, height) = src.dimensions();
    let at = |x: i64, y: i64| -> f64 {
        src.get_pixel(reflect_101(x, width), reflect_101(y, height)).0[0] as f64
    };

    EdgeResponse::from_fn(width, height, |x, y| {
        let (x, y) = (x as i64, y as i64);
        let response = at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4.0 * at(x, y);
        Luma([response])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn reflect_101_mirrors_without_repeating_edge() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(3, 5), 3);
        assert_eq!(reflect_101(-3, 1), 0);
    }

    #[test]
    fn gaussian_kernel_is_normalized_and_symmetric() {
        let kernel = GaussianKernel::new(5, 3.0).unwrap();
        let w = kernel.weights();
        assert_eq!(kernel.size(), 5);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((w[0] - w[4]).abs() < 1e-12);
        assert!((w[1] - w[3]).abs() < 1e-12);
        assert!(w[2] > w[1] && w[1] > w[0]);
        // exp(-4/18) / sum for the outer tap.
        assert!((w[0] - 0.17820).abs() < 1e-4);
    }

    #[test]
    fn gaussian_kernel_rejects_even_or_zero_size() {
        assert!(GaussianKernel::new(4, 3.0).is_err());
        assert!(GaussianKernel::new(0, 3.0).is_err());
        assert!(GaussianKernel::new(5, 0.0).is_err());
        assert!(GaussianKernel::new(5, f64::NAN).is_err());
    }

    #[test]
    fn blur_keeps_uniform_image_uniform() {
        let src = GrayImage::from_pixel(9, 7, Luma([128]));
        let blurred = gaussian_blur(&src, &GaussianKernel::new(5, 3.0).unwrap());
        assert!(blurred.pixels().all(|p| p.0[0] == 128));
    }

    #[test]
    fn blur_attenuates_checkerboard() {
        let src = GrayImage::from_fn(12, 12, |x, y| Luma([if (x + y) % 2 == 0 { 255 } else { 0 }]));
        let blurred = gaussian_blur(&src, &GaussianKernel::new(5, 3.0).unwrap());
        for p in blurred.pixels() {
            let v = p.0[0] as i32;
            assert!((120..=135).contains(&v), "value {v} outside attenuated band");
        }
        // Parity survives reflect-101, so the pattern is still there.
        assert_ne!(blurred.get_pixel(0, 0), blurred.get_pixel(1, 0));
    }

    #[test]
    fn laplacian_of_flat_image_is_zero() {
        let src = GrayImage::from_pixel(6, 6, Luma([77]));
        let response = laplacian(&src);
        assert!(response.pixels().all(|p| p.0[0] == 0.0));
    }

    #[test]
    fn laplacian_of_single_spike() {
        let mut src = GrayImage::from_pixel(5, 5, Luma([0]));
        src.put_pixel(2, 2, Luma([10]));
        let response = laplacian(&src);
        assert_eq!(response.get_pixel(2, 2).0[0], -40.0);
        assert_eq!(response.get_pixel(1, 2).0[0], 10.0);
        assert_eq!(response.get_pixel(2, 3).0[0], 10.0);
        assert_eq!(response.get_pixel(1, 1).0[0], 0.0);
    }

    #[test]
    fn laplacian_of_linear_ramp_is_zero_inside() {
        let src = GrayImage::from_fn(8, 4, |x, _| Luma([(x * 10) as u8]));
        let response = laplacian(&src);
        for x in 1..7 {
            assert_eq!(response.get_pixel(x, 1).0[0], 0.0);
        }
    }

    #[test]
    fn intensity_uses_rec_601_weights() {
        let mut rgb = RgbImage::new(3, 1);
        rgb.put_pixel(0, 0, Rgb([255, 0, 0]));
        rgb.put_pixel(1, 0, Rgb([0, 255, 0]));
        rgb.put_pixel(2, 0, Rgb([0, 0, 255]));
        let frame = DynamicImage::ImageRgb8(rgb);
        let gray = to_intensity(&frame);
        assert_eq!(gray.get_pixel(0, 0).0[0], 76);
        assert_eq!(gray.get_pixel(1, 0).0[0], 150);
        assert_eq!(gray.get_pixel(2, 0).0[0], 29);
    }

    #[test]
    fn intensity_borrows_gray_frames() {
        let gray = GrayImage::from_pixel(4, 4, Luma([9]));
        let frame = DynamicImage::ImageLuma8(gray);
        assert!(matches!(to_intensity(&frame), Cow::Borrowed(_)));
    }
}
