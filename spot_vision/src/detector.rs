// THEORY:
// The `detector` module is the top-level API of the engine. A `SpotDetector`
// owns everything with a lifetime longer than one frame: the configured regions,
// the frame source, the cached geometry and the status board. Each call to
// `detect_next` runs one complete cycle and returns before the next begins.
//
// The lifecycle has exactly two states. The detector starts `Uninitialized`
// and moves to `Ready` on the first frame, once the geometry for every region
// has been derived and checked against that frame's dimensions. `Ready` is
// terminal: regions are static, so the cache is never rebuilt.
//
// Per cycle:
//   frame fetch -> intensity (shared) -> per region: crop, smooth, Laplacian,
//   mask, mean |response|, threshold -> status slot overwrite -> snapshot out.
//
// End of stream is `Ok(None)`, not an error. Configuration problems surface as
// errors from the first cycle and abort the run.

use crate::config::DetectorConfig;
use crate::core_modules::filters::{self, GaussianKernel};
use crate::core_modules::frame_source::FrameSource;
use crate::core_modules::geometry::{self, RegionGeometry};
use crate::core_modules::region::Region;
use crate::core_modules::spot_analyzer::SpotAnalyzer;
use crate::core_modules::status::{OccupancySummary, SpotReading, SpotStatus, StatusBoard};
use crate::error::VisionError;
use image::{DynamicImage, GenericImageView};
use tracing::{debug, info, trace};

enum GeometryState {
    Uninitialized,
    Ready {
        frame_width: u32,
        frame_height: u32,
        records: Vec<RegionGeometry>,
    },
}

/// The result of one detection cycle.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Position of the frame in the source, counting from the start offset.
    pub frame_index: u64,
    /// The unmodified frame, for callers that render overlays.
    pub frame: DynamicImage,
    /// One reading per configured region, in configuration order.
    pub readings: Vec<SpotReading>,
}

impl Detection {
    pub fn statuses(&self) -> Vec<SpotStatus> {
        self.readings.iter().map(|r| r.status).collect()
    }

    pub fn summary(&self) -> OccupancySummary {
        OccupancySummary::from_statuses(&self.statuses())
    }
}

/// Per-frame occupancy engine over a fixed set of regions.
pub struct SpotDetector<S: FrameSource> {
    regions: Vec<Region>,
    source: S,
    analyzer: SpotAnalyzer,
    state: GeometryState,
    board: StatusBoard,
    /// Index the next frame read from the source will carry.
    next_frame_index: u64,
    frames_read: u64,
    /// Set by the first successful `start_at`.
    seeked: bool,
}

impl<S: FrameSource> SpotDetector<S> {
    pub fn new(regions: Vec<Region>, source: S, config: &DetectorConfig) -> Result<Self, VisionError> {
        config.validate()?;
        let kernel = GaussianKernel::new(config.blur_kernel_size, config.blur_sigma)?;
        let board = StatusBoard::new(regions.len());
        Ok(Self {
            regions,
            source,
            analyzer: SpotAnalyzer::new(kernel, config.edge_energy_threshold),
            state: GeometryState::Uninitialized,
            board,
            next_frame_index: 0,
            frames_read: 0,
            seeked: false,
        })
    }

    /// Seeks the source so the first cycle reads frame `frame_index`.
    /// Allowed once, and only before any frame has been processed.
    pub fn start_at(&mut self, frame_index: u64) -> Result<(), VisionError> {
        if self.seeked || self.frames_read > 0 || self.is_ready() {
            return Err(VisionError::AlreadyStarted(frame_index));
        }
        self.source.seek(frame_index)?;
        self.seeked = true;
        self.next_frame_index = frame_index;
        info!(frame_index, "Frame source positioned");
        Ok(())
    }

    /// Derives and caches geometry for every region. Later calls are no-ops.
    pub fn initialize(&mut self, frame_width: u32, frame_height: u32) -> Result<(), VisionError> {
        if self.is_ready() {
            return Ok(());
        }
        let records = geometry::build_all(&self.regions, frame_width, frame_height)?;
        self.state = GeometryState::Ready {
            frame_width,
            frame_height,
            records,
        };
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, GeometryState::Ready { .. })
    }

    /// Cached geometry records, aligned with `regions()`. Empty until initialized.
    pub fn geometry(&self) -> &[RegionGeometry] {
        match &self.state {
            GeometryState::Ready { records, .. } => records.as_slice(),
            GeometryState::Uninitialized => &[],
        }
    }

    /// The configured regions, in configuration order.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// The latest classification of every region.
    pub fn statuses(&self) -> &[SpotStatus] {
        self.board.as_slice()
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Runs one cycle. Returns `Ok(None)` once the source has no more frames.
    ///
    /// Calling again after `Ok(None)` simply asks the source again; what it
    /// returns is up to the source.
    pub fn detect_next(&mut self) -> Result<Option<Detection>, VisionError> {
        let Some(frame) = self.source.read() else {
            debug!(frames_read = self.frames_read, "Frame source exhausted");
            return Ok(None);
        };
        let frame_index = self.next_frame_index;
        self.next_frame_index += 1;
        self.frames_read += 1;

        let (width, height) = frame.dimensions();
        self.initialize(width, height)?;

        let GeometryState::Ready {
            frame_width,
            frame_height,
            records,
        } = &self.state
        else {
            return Err(VisionError::InvalidConfig("region geometry is not initialized".to_string()));
        };
        if (width, height) != (*frame_width, *frame_height) {
            return Err(VisionError::FrameSizeMismatch {
                expected_width: *frame_width,
                expected_height: *frame_height,
                actual_width: width,
                actual_height: height,
            });
        }

        let mut readings = Vec::with_capacity(records.len());
        {
            let intensity = filters::to_intensity(&frame);
            for (index, record) in records.iter().enumerate() {
                let reading = self.analyzer.evaluate(&intensity, record);
                trace!(
                    frame_index,
                    spot = reading.id,
                    edge_energy = reading.edge_energy,
                    status = %reading.status,
                    "Spot evaluated"
                );
                self.board.set(index, reading.status);
                readings.push(reading);
            }
        }

        let summary = self.board.summary();
        debug!(
            frame_index,
            available = summary.available,
            occupied = summary.occupied,
            "Cycle complete"
        );

        Ok(Some(Detection {
            frame_index,
            frame,
            readings,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::frame_source::MemoryFrameSource;
    use image::{GrayImage, Luma};

    fn flat(width: u32, height: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([value])))
    }

    fn lot() -> Vec<Region> {
        vec![
            Region::from_pairs(0, &[[0, 0], [10, 0], [10, 10], [0, 10]]),
            Region::from_pairs(1, &[[20, 0], [30, 0], [30, 10], [20, 10]]),
        ]
    }

    fn detector(frames: Vec<DynamicImage>) -> SpotDetector<MemoryFrameSource> {
        SpotDetector::new(lot(), MemoryFrameSource::new(frames), &DetectorConfig::default()).unwrap()
    }

    #[test]
    fn starts_uninitialized_with_available_slots() {
        let detector = detector(vec![]);
        assert!(!detector.is_ready());
        assert!(detector.geometry().is_empty());
        assert_eq!(detector.statuses(), &[SpotStatus::Available, SpotStatus::Available]);
    }

    #[test]
    fn first_cycle_initializes_geometry() {
        let mut detector = detector(vec![flat(40, 20, 50)]);
        let detection = detector.detect_next().unwrap().unwrap();
        assert!(detector.is_ready());
        assert_eq!(detector.geometry().len(), 2);
        assert_eq!(detection.frame_index, 0);
        assert_eq!(detection.readings.len(), 2);
        assert_eq!(detection.readings[1].id, 1);
    }

    #[test]
    fn initialize_is_idempotent() {
        let mut detector = detector(vec![]);
        detector.initialize(40, 20).unwrap();
        let first = detector.geometry().to_vec();
        detector.initialize(40, 20).unwrap();
        assert_eq!(detector.geometry(), first.as_slice());
        // Different dimensions do not rebuild an initialized cache.
        detector.initialize(80, 80).unwrap();
        assert_eq!(detector.geometry(), first.as_slice());
    }

    #[test]
    fn end_of_stream_is_none() {
        let mut detector = detector(vec![flat(40, 20, 50)]);
        assert!(detector.detect_next().unwrap().is_some());
        assert!(detector.detect_next().unwrap().is_none());
        assert_eq!(detector.frames_read(), 1);
    }

    #[test]
    fn empty_source_never_initializes() {
        let mut detector = detector(vec![]);
        assert!(detector.detect_next().unwrap().is_none());
        assert!(!detector.is_ready());
    }

    #[test]
    fn start_at_offsets_frame_index() {
        let frames = (0..4).map(|v| flat(40, 20, v)).collect();
        let mut detector = detector(frames);
        detector.start_at(2).unwrap();
        let detection = detector.detect_next().unwrap().unwrap();
        assert_eq!(detection.frame_index, 2);
        assert_eq!(detection.frame.to_luma8().get_pixel(0, 0).0[0], 2);
    }

    #[test]
    fn start_at_rejected_after_first_cycle() {
        let mut detector = detector(vec![flat(40, 20, 0), flat(40, 20, 0)]);
        detector.detect_next().unwrap();
        assert!(matches!(detector.start_at(1), Err(VisionError::AlreadyStarted(1))));
    }

    #[test]
    fn start_at_twice_is_rejected() {
        let frames = (0..5).map(|v| flat(40, 20, v)).collect();
        let mut detector = detector(frames);
        detector.start_at(2).unwrap();
        assert!(matches!(detector.start_at(2), Err(VisionError::AlreadyStarted(2))));
        let detection = detector.detect_next().unwrap().unwrap();
        assert_eq!(detection.frame_index, 2);
        assert_eq!(detection.frame.to_luma8().get_pixel(0, 0).0[0], 2);
    }

    #[test]
    fn failed_start_at_can_be_retried() {
        let frames = (0..3).map(|v| flat(40, 20, v)).collect();
        let mut detector = detector(frames);
        assert!(matches!(detector.start_at(9), Err(VisionError::Source(_))));
        detector.start_at(1).unwrap();
        let detection = detector.detect_next().unwrap().unwrap();
        assert_eq!(detection.frame_index, 1);
        assert_eq!(detection.frame.to_luma8().get_pixel(0, 0).0[0], 1);
    }

    #[test]
    fn oversized_region_fails_first_cycle() {
        let regions = vec![Region::from_pairs(3, &[[0, 0], [70000, 0], [70000, 70000], [0, 70000]])];
        let source = MemoryFrameSource::new([flat(40, 20, 0)]);
        let mut detector = SpotDetector::new(regions, source, &DetectorConfig::default()).unwrap();
        assert!(matches!(
            detector.detect_next(),
            Err(VisionError::RegionOutOfFrame { id: 3, .. })
        ));
        assert!(!detector.is_ready());
    }

    #[test]
    fn frame_size_change_is_an_error() {
        let mut detector = detector(vec![flat(40, 20, 0), flat(48, 20, 0)]);
        detector.detect_next().unwrap();
        assert!(matches!(
            detector.detect_next(),
            Err(VisionError::FrameSizeMismatch { actual_width: 48, .. })
        ));
    }

    #[test]
    fn degenerate_region_fails_first_cycle() {
        let regions = vec![Region::from_pairs(5, &[[0, 0], [4, 4]])];
        let source = MemoryFrameSource::new([flat(40, 20, 0)]);
        let mut detector = SpotDetector::new(regions, source, &DetectorConfig::default()).unwrap();
        assert!(matches!(
            detector.detect_next(),
            Err(VisionError::DegenerateRegion { id: 5, .. })
        ));
        assert!(!detector.is_ready());
    }

    #[test]
    fn invalid_config_rejected_at_construction() {
        let config = DetectorConfig {
            blur_kernel_size: 2,
            ..Default::default()
        };
        let result = SpotDetector::new(lot(), MemoryFrameSource::default(), &config);
        assert!(matches!(result, Err(VisionError::InvalidConfig(_))));
    }
}
