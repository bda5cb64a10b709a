// THEORY:
// A `FrameSource` is the engine's only window onto the video. It is sequential
// and pull-based: the detector asks for the next frame once per cycle and the
// source either hands one over or reports that there are no more.
//
// "No more" covers both a genuinely exhausted stream and a frame that failed to
// decode. The engine treats them identically and stops; sources are free to log
// the difference, but they do not surface it.

use crate::error::VisionError;
use image::DynamicImage;

/// Sequential, seekable supplier of frames.
pub trait FrameSource {
    /// Positions the source so the next `read` yields frame `frame_index`.
    fn seek(&mut self, frame_index: u64) -> Result<(), VisionError>;

    /// The next frame, or `None` at end of stream or on an unrecoverable decode failure.
    fn read(&mut self) -> Option<DynamicImage>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn seek(&mut self, frame_index: u64) -> Result<(), VisionError> {
        (**self).seek(frame_index)
    }

    fn read(&mut self) -> Option<DynamicImage> {
        (**self).read()
    }
}

/// A frame source over decoded frames held in memory. Seeking is absolute.
#[derive(Debug, Default)]
pub struct MemoryFrameSource {
    frames: Vec<DynamicImage>,
    /// Index of the frame the next `read` returns.
    position: usize,
}

impl MemoryFrameSource {
    pub fn new(frames: impl IntoIterator<Item = DynamicImage>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            position: 0,
        }
    }

    /// Frames not yet read.
    pub fn remaining(&self) -> usize {
        self.frames.len().saturating_sub(self.position)
    }
}

impl FrameSource for MemoryFrameSource {
    fn seek(&mut self, frame_index: u64) -> Result<(), VisionError> {
        let total = self.frames.len() as u64;
        if frame_index > total {
            return Err(VisionError::Source(format!(
                "cannot seek to frame {frame_index}, source holds {total} frames"
            )));
        }
        self.position = frame_index as usize;
        Ok(())
    }

    fn read(&mut self) -> Option<DynamicImage> {
        let frame = self.frames.get(self.position).cloned()?;
        self.position += 1;
        Some(frame)
    }
}
