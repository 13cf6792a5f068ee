//! Built-in capture and classification stand-ins.
//!
//! Procedurally generated frames and a statistics-driven classifier keep
//! the whole sensing pipeline exercisable on machines without a camera or
//! a vendor model. A real device or model plugs in by implementing the
//! [`Camera`] and [`EmotionClassifier`] traits.

use crate::emotion::EmotionScores;
use crate::error::VisionError;
use crate::vision::{Camera, EmotionClassifier, Frame};

/// Frame source that synthesizes a slowly drifting gradient.
#[derive(Debug)]
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    iterations: u64,
}

impl SyntheticCamera {
    /// Capture size mirrors the low-res capture the game would ask a real
    /// device for.
    pub fn open() -> Result<Self, VisionError> {
        Ok(Self {
            width: 320,
            height: 240,
            iterations: 0,
        })
    }
}

impl Camera for SyntheticCamera {
    fn capture(&mut self) -> Result<Frame, VisionError> {
        self.iterations = self.iterations.wrapping_add(1);
        let phase = (self.iterations % 600) as f32 / 600.0;
        let mut pixels = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            let fy = y as f32 / self.height as f32;
            for x in 0..self.width {
                let fx = x as f32 / self.width as f32;
                let level = 255.0 * (0.25 + 0.5 * ((fx + phase) * std::f32::consts::TAU).sin().abs());
                pixels.push((level * (1.0 - fy * 0.3)) as u8);
                pixels.push((level * 0.8) as u8);
                pixels.push((level * (0.6 + fy * 0.4)).min(255.0) as u8);
            }
        }
        Ok(Frame::new(self.width, self.height, pixels))
    }
}

/// Classifier stand-in mapping frame statistics to scores: bright frames
/// read happy, dark frames sad, high-contrast frames angry, everything
/// else neutral. A frame with no luma spread at all is rejected the way a
/// face-less frame would be.
#[derive(Debug, Default)]
pub struct LumaClassifier;

impl EmotionClassifier for LumaClassifier {
    fn classify(&mut self, frame: &Frame) -> Result<EmotionScores, VisionError> {
        if frame.pixels.is_empty() {
            return Err(VisionError::Backend("empty frame".into()));
        }
        let (mean, spread) = luma_stats(frame);
        if spread < 1.0 {
            return Err(VisionError::NoFace);
        }
        // Smooth ramps; the argmax plus the sampler-side acceptance
        // threshold decide what actually lands.
        Ok(EmotionScores {
            happy: ramp(mean, 170.0, 255.0),
            angry: ramp(spread, 170.0, 255.0),
            sad: ramp(255.0 - mean, 170.0, 255.0),
            neutral: 40.0,
            unknown: 0.0,
        })
    }
}

/// Mean luma (Rec. 601) and min-to-max luma spread.
fn luma_stats(frame: &Frame) -> (f32, f32) {
    let mut sum = 0.0f64;
    let mut lo = f32::MAX;
    let mut hi = f32::MIN;
    let mut count = 0u32;
    for px in frame.pixels.chunks_exact(3) {
        let luma = 0.299 * f32::from(px[0]) + 0.587 * f32::from(px[1]) + 0.114 * f32::from(px[2]);
        sum += f64::from(luma);
        lo = lo.min(luma);
        hi = hi.max(luma);
        count += 1;
    }
    ((sum / f64::from(count.max(1))) as f32, hi - lo)
}

/// Linear ramp from 0 at `lo` to 100 at `hi`.
fn ramp(value: f32, lo: f32, hi: f32) -> f32 {
    ((value - lo) / (hi - lo) * 100.0).clamp(0.0, 100.0)
}
