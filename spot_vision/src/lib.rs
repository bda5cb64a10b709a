// THEORY:
// This file is the main entry point for the `spot_vision` library crate. It
// exposes the `SpotDetector` and its associated data structures (`Detection`,
// `SpotReading`, `SpotStatus`, `DetectorConfig`) as the high-level interface
// of the engine, plus the `FrameSource` seam a driver implements to feed it.
//
// The internal layers (`core_modules`) stay public for callers that need the
// cached geometry, for example to outline each spot on an overlay, but the
// detector is the only thing that mutates engine state.

pub mod config;
pub mod core_modules;
pub mod detector;
pub mod error;

pub use config::{DetectorConfig, RegionRecord, load_regions, parse_regions, save_regions};
pub use core_modules::frame_source::{FrameSource, MemoryFrameSource};
pub use core_modules::geometry::{RegionGeometry, RegionMask};
pub use core_modules::region::{Region, SpotId, Vertex};
pub use core_modules::status::{OccupancySummary, SpotReading, SpotStatus};
pub use detector::{Detection, SpotDetector};
pub use error::VisionError;
