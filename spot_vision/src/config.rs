//! Region file loading and detector tunables.

use crate::core_modules::region::{Region, SpotId};
use crate::error::VisionError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_EDGE_ENERGY_THRESHOLD: f64 = 1.4;
pub const DEFAULT_BLUR_KERNEL_SIZE: usize = 5;
pub const DEFAULT_BLUR_SIGMA: f64 = 3.0;

/// One entry of the region file: `{id, coordinates: [[x, y], ...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub id: SpotId,
    pub coordinates: Vec<[i32; 2]>,
}

impl From<RegionRecord> for Region {
    fn from(record: RegionRecord) -> Self {
        Region::from_pairs(record.id, &record.coordinates)
    }
}

impl From<&Region> for RegionRecord {
    fn from(region: &Region) -> Self {
        Self {
            id: region.id,
            coordinates: region.pairs(),
        }
    }
}

/// Parses a YAML list of region records, preserving order.
pub fn parse_regions(text: &str) -> Result<Vec<Region>, VisionError> {
    let records: Vec<RegionRecord> = serde_yaml::from_str(text)?;
    Ok(records.into_iter().map(Region::from).collect())
}

pub fn load_regions(path: impl AsRef<Path>) -> Result<Vec<Region>, VisionError> {
    let text = fs::read_to_string(path)?;
    parse_regions(&text)
}

pub fn save_regions(path: impl AsRef<Path>, regions: &[Region]) -> Result<(), VisionError> {
    let records: Vec<RegionRecord> = regions.iter().map(RegionRecord::from).collect();
    fs::write(path, serde_yaml::to_string(&records)?)?;
    Ok(())
}

/// Tunables of the masked-edge test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Mean edge energy strictly below this is `available`.
    pub edge_energy_threshold: f64,
    /// Odd aperture of the smoothing kernel.
    pub blur_kernel_size: usize,
    pub blur_sigma: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            edge_energy_threshold: DEFAULT_EDGE_ENERGY_THRESHOLD,
            blur_kernel_size: DEFAULT_BLUR_KERNEL_SIZE,
            blur_sigma: DEFAULT_BLUR_SIGMA,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), VisionError> {
        if !self.edge_energy_threshold.is_finite() || self.edge_energy_threshold <= 0.0 {
            return Err(VisionError::InvalidConfig(format!(
                "edge energy threshold must be finite and positive, got {}",
                self.edge_energy_threshold
            )));
        }
        if self.blur_kernel_size == 0 || self.blur_kernel_size % 2 == 0 {
            return Err(VisionError::InvalidConfig(format!(
                "blur kernel size must be odd and positive, got {}",
                self.blur_kernel_size
            )));
        }
        if !self.blur_sigma.is_finite() || self.blur_sigma <= 0.0 {
            return Err(VisionError::InvalidConfig(format!(
                "blur sigma must be finite and positive, got {}",
                self.blur_sigma
            )));
        }
        Ok(())
    }
}
