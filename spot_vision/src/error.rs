//! Error types for spot_vision

use crate::core_modules::region::SpotId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    /// A region polygon that cannot produce a usable bound and mask.
    #[error("Region {id} is degenerate: {reason}")]
    DegenerateRegion { id: SpotId, reason: String },

    #[error(
        "Region {id} bound ({x}, {y}, {width}x{height}) does not fit inside the {frame_width}x{frame_height} frame"
    )]
    RegionOutOfFrame {
        id: SpotId,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    },

    #[error("Frame is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    FrameSizeMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// Seeking is a one-time operation performed before the first cycle.
    #[error("Detector already processed frame data; cannot seek to frame {0}")]
    AlreadyStarted(u64),

    #[error("Frame source error: {0}")]
    Source(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Region file error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_region_display() {
        let err = VisionError::DegenerateRegion {
            id: 7,
            reason: "only 2 distinct vertices".to_string(),
        };
        assert!(err.to_string().contains("Region 7"));
        assert!(err.to_string().contains("only 2 distinct vertices"));
    }

    #[test]
    fn test_out_of_frame_display() {
        let err = VisionError::RegionOutOfFrame {
            id: 1,
            x: 600,
            y: 10,
            width: 80,
            height: 40,
            frame_width: 640,
            frame_height: 480,
        };
        let text = err.to_string();
        assert!(text.contains("(600, 10, 80x40)"));
        assert!(text.contains("640x480"));
    }
}
