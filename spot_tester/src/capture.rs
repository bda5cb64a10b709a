//! OpenCV-backed frame source for video files.

use anyhow::{Context, bail};
use image::{DynamicImage, RgbImage};
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use spot_vision::{FrameSource, VisionError};
use tracing::{info, warn};

/// Basic stream properties reported by the container.
#[derive(Debug, Clone, Copy)]
pub struct VideoProperties {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

pub struct VideoFrameSource {
    capture: VideoCapture,
    /// The last decoded frame in its native BGR layout, kept for overlay rendering.
    last_frame: Mat,
}

impl VideoFrameSource {
    pub fn open(path: &str) -> anyhow::Result<Self> {
        let capture = VideoCapture::from_file(path, videoio::CAP_ANY)
            .with_context(|| format!("Failed to open video {path}"))?;
        if !capture.is_opened()? {
            bail!("Video {path} could not be opened");
        }
        Ok(Self {
            capture,
            last_frame: Mat::default(),
        })
    }

    pub fn properties(&self) -> anyhow::Result<VideoProperties> {
        Ok(VideoProperties {
            width: self.capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32,
            height: self.capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32,
            fps: self.capture.get(videoio::CAP_PROP_FPS)?,
        })
    }

    pub fn last_frame(&self) -> &Mat {
        &self.last_frame
    }
}

impl FrameSource for VideoFrameSource {
    fn seek(&mut self, frame_index: u64) -> Result<(), VisionError> {
        let accepted = self
            .capture
            .set(videoio::CAP_PROP_POS_FRAMES, frame_index as f64)
            .map_err(|e| VisionError::Source(e.message))?;
        if !accepted {
            return Err(VisionError::Source(format!("backend refused seek to frame {frame_index}")));
        }
        Ok(())
    }

    fn read(&mut self) -> Option<DynamicImage> {
        let mut frame = Mat::default();
        match self.capture.read(&mut frame) {
            Ok(true) if !frame.empty() => match to_rgb_image(&frame) {
                Ok(image) => {
                    self.last_frame = frame;
                    Some(image)
                }
                Err(e) => {
                    warn!(error = %e, "Frame conversion failed, ending stream");
                    None
                }
            },
            Ok(_) => {
                info!("End of video");
                None
            }
            Err(e) => {
                warn!(error = %e, "Frame read failed, ending stream");
                None
            }
        }
    }
}

/// Converts a BGR (or single-channel) `Mat` into an owned RGB image.
fn to_rgb_image(frame: &Mat) -> anyhow::Result<DynamicImage> {
    let code = if frame.channels() == 1 {
        imgproc::COLOR_GRAY2RGB
    } else {
        imgproc::COLOR_BGR2RGB
    };
    let mut rgb = Mat::default();
    imgproc::cvt_color(frame, &mut rgb, code, 0)?;

    let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
    let bytes = rgb.data_bytes()?.to_vec();
    let image = RgbImage::from_raw(width, height, bytes)
        .context("Decoded frame buffer does not match its dimensions")?;
    Ok(DynamicImage::ImageRgb8(image))
}
