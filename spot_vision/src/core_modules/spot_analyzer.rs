// THEORY:
// The `SpotAnalyzer` is the per-region texture test. It is stateless: given the
// shared intensity frame and one region's cached geometry it answers a single
// question, "is there enough edge energy inside this polygon to call it occupied?"
//
// 1.  Crop the intensity frame to the region's bound.
// 2.  Smooth the crop to suppress sensor and compression noise.
// 3.  Take the discrete Laplacian of the smoothed crop.
// 4.  Zero the response outside the mask and average its magnitude over the
//     whole bound.
// 5.  Compare against a fixed threshold. An empty spot is a flat patch of asphalt
//     and stays below it; a vehicle's edges and texture push it above.

use crate::core_modules::filters::{self, GaussianKernel};
use crate::core_modules::geometry::RegionGeometry;
use crate::core_modules::status::{SpotReading, SpotStatus};
use image::GrayImage;
use image::imageops;

pub struct SpotAnalyzer {
    kernel: GaussianKernel,
    /// Mean edge energy strictly below this value classifies a spot as available.
    threshold: f64,
}

impl SpotAnalyzer {
    pub fn new(kernel: GaussianKernel, threshold: f64) -> Self {
        Self { kernel, threshold }
    }

    /// Mean absolute masked Laplacian response of `geometry`'s bound within `intensity`.
    ///
    /// The bound must lie inside the frame; the detector checks this once when the
    /// geometry is built.
    pub fn edge_energy(&self, intensity: &GrayImage, geometry: &RegionGeometry) -> f64 {
        let bound = geometry.bound;
        let crop = imageops::crop_imm(
            intensity,
            bound.left() as u32,
            bound.top() as u32,
            bound.width(),
            bound.height(),
        )
        .to_image();

        let smoothed = filters::gaussian_blur(&crop, &self.kernel);
        let response = filters::laplacian(&smoothed);

        let masked_sum: f64 = response
            .as_raw()
            .iter()
            .zip(geometry.mask.as_slice())
            .filter(|&(_, &inside)| inside)
            .map(|(value, _)| value.abs())
            .sum();

        masked_sum / (bound.width() as f64 * bound.height() as f64)
    }

    pub fn classify(&self, edge_energy: f64) -> SpotStatus {
        if edge_energy < self.threshold {
            SpotStatus::Available
        } else {
            SpotStatus::Occupied
        }
    }

    pub fn evaluate(&self, intensity: &GrayImage, geometry: &RegionGeometry) -> SpotReading {
        let edge_energy = self.edge_energy(intensity, geometry);
        SpotReading {
            id: geometry.id,
            status: self.classify(edge_energy),
            edge_energy,
        }
    }
}
