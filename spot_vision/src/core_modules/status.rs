// THEORY:
// The status store is the last layer of the engine: one classification slot per
// configured region, index-aligned with the regions and their cached geometry.
// It carries no history. Every slot starts `Available` and is overwritten on each
// cycle, so a slot only ever reflects the latest frame.
//
// The detector owns the board. Callers receive copies (`SpotReading`s) or a
// read-only slice, never a handle they could mutate between cycles.

use crate::core_modules::region::SpotId;
use std::fmt;

/// Per-region occupancy classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpotStatus {
    /// Low edge energy: the surface inside the polygon is visually uniform.
    #[default]
    Available,
    /// Edge energy at or above the threshold.
    Occupied,
}

impl SpotStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, SpotStatus::Available)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpotStatus::Available => "available",
            SpotStatus::Occupied => "occupied",
        }
    }
}

impl fmt::Display for SpotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of the masked-edge test for one region on one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotReading {
    pub id: SpotId,
    pub status: SpotStatus,
    /// Mean absolute Laplacian response over the region's bound, zero outside the mask.
    pub edge_energy: f64,
}

/// Index-aligned classification slots, one per configured region.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    statuses: Vec<SpotStatus>,
}

impl StatusBoard {
    pub fn new(len: usize) -> Self {
        Self {
            statuses: vec![SpotStatus::Available; len],
        }
    }

    pub(crate) fn set(&mut self, index: usize, status: SpotStatus) {
        self.statuses[index] = status;
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn as_slice(&self) -> &[SpotStatus] {
        &self.statuses
    }

    pub fn summary(&self) -> OccupancySummary {
        OccupancySummary::from_statuses(&self.statuses)
    }
}

/// Aggregate counts over a status sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OccupancySummary {
    pub total: usize,
    pub available: usize,
    pub occupied: usize,
}

impl OccupancySummary {
    pub fn from_statuses(statuses: &[SpotStatus]) -> Self {
        let available = statuses.iter().filter(|s| s.is_available()).count();
        Self {
            total: statuses.len(),
            available,
            occupied: statuses.len() - available,
        }
    }
}

impl fmt::Display for OccupancySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} spots, {} available, {} occupied",
            self.total, self.available, self.occupied
        )
    }
}
