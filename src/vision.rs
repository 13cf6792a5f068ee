//! Camera sampling and emotion classification off the simulation thread.
//!
//! The sensing loop runs on its own thread at an uncoordinated cadence and
//! publishes into a latest-value register; the simulation side takes one
//! non-blocking snapshot per tick. This is a register, not a stream:
//! intermediate samples may be dropped, and a stale-by-one read is fine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::emotion::{EmotionSample, EmotionScores};
use crate::error::VisionError;

/// A captured image frame, tightly packed RGB8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), (width * height * 3) as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Horizontal flip for the mirror-effect preview.
    pub fn mirrored(&self) -> Frame {
        let stride = self.width as usize * 3;
        let mut pixels = Vec::with_capacity(self.pixels.len());
        for row in self.pixels.chunks_exact(stride) {
            for px in row.chunks_exact(3).rev() {
                pixels.extend_from_slice(px);
            }
        }
        Frame {
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}

/// Yields frames on demand. Opening the device is backend-specific and
/// fallible; dropping the camera releases it.
pub trait Camera: Send {
    fn capture(&mut self) -> Result<Frame, VisionError>;
}

/// Maps a single frame to per-label confidence scores, or fails (no
/// detectable face, backend error).
pub trait EmotionClassifier: Send {
    fn classify(&mut self, frame: &Frame) -> Result<EmotionScores, VisionError>;
}

#[derive(Debug, Default)]
struct Register {
    sample: EmotionSample,
    preview: Option<Frame>,
}

/// Shared latest-value slot between the sensing thread and the simulation
/// loop. Locks are held only for the instant of copying a value in or out;
/// classification never happens under the lock.
#[derive(Debug, Clone, Default)]
pub struct EmotionState {
    register: Arc<Mutex<Register>>,
}

impl EmotionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the most recently committed sample.
    pub fn sample(&self) -> EmotionSample {
        self.lock().sample
    }

    /// Latest mirrored preview frame, if any has been captured yet.
    pub fn preview(&self) -> Option<Frame> {
        self.lock().preview.clone()
    }

    fn commit_sample(&self, sample: EmotionSample) {
        self.lock().sample = sample;
    }

    fn commit_preview(&self, frame: Frame) {
        self.lock().preview = Some(frame);
    }

    fn lock(&self) -> MutexGuard<'_, Register> {
        // A poisoned register still holds a whole committed value: fields
        // are only ever replaced under the lock, never written piecemeal.
        match self.register.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Cadence knobs for the sensing loop. The defaults are the production
/// tuning; tests shrink them.
#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    /// Minimum wall-clock gap between successful classifications.
    pub classify_interval: Duration,
    /// Sleep between sensing iterations, bounding CPU use independent of
    /// classification cost.
    pub idle_delay: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            classify_interval: Duration::from_secs(2),
            idle_delay: Duration::from_millis(100),
        }
    }
}

/// Owns the sensing thread. Stopping is cooperative: a flag checked once
/// per iteration; the camera is released when the loop exits.
pub struct VisionSampler {
    state: EmotionState,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl VisionSampler {
    /// Spawns the sensing thread over an already-opened camera.
    pub fn spawn(
        camera: Box<dyn Camera>,
        classifier: Box<dyn EmotionClassifier>,
        config: SamplerConfig,
    ) -> Result<Self, VisionError> {
        let state = EmotionState::new();
        let stop = Arc::new(AtomicBool::new(false));
        let thread_state = state.clone();
        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("vision-sampler".into())
            .spawn(move || sample_loop(camera, classifier, config, thread_state, thread_stop))?;
        Ok(Self {
            state,
            stop,
            handle: Some(handle),
        })
    }

    /// Cloneable read handle for the simulation side.
    pub fn state(&self) -> EmotionState {
        self.state.clone()
    }

    /// Signals the loop to stop and waits until the camera is released.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("vision sampler thread panicked");
            }
        }
    }
}

impl Drop for VisionSampler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn sample_loop(
    mut camera: Box<dyn Camera>,
    mut classifier: Box<dyn EmotionClassifier>,
    config: SamplerConfig,
    state: EmotionState,
    stop: Arc<AtomicBool>,
) {
    let mut last_classified: Option<Instant> = None;

    while !stop.load(Ordering::Relaxed) {
        match camera.capture() {
            Ok(frame) => {
                let frame = frame.mirrored();

                let due = last_classified
                    .is_none_or(|at| at.elapsed() >= config.classify_interval);
                if due {
                    // Classify the frame we just captured; the register is
                    // locked only to commit the verdict afterwards.
                    match classifier.classify(&frame) {
                        Ok(scores) => {
                            let (label, confidence) = scores.dominant();
                            let candidate = EmotionSample { label, confidence };
                            let current = state.sample();
                            state.commit_sample(current.accept(candidate));
                            last_classified = Some(Instant::now());
                        }
                        Err(err) => {
                            // Fail-soft: keep the previous sample. The
                            // throttle is not advanced, so the next frame
                            // gets another attempt.
                            log::warn!("emotion classification failed: {err}");
                        }
                    }
                }

                state.commit_preview(frame);
            }
            Err(err) => {
                // The next iteration retries capture unconditionally.
                log::debug!("frame capture failed: {err}");
            }
        }

        thread::sleep(config.idle_delay);
    }
    // Dropping the camera here releases the device.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::EmotionLabel;
    use std::sync::atomic::AtomicUsize;

    fn test_config() -> SamplerConfig {
        SamplerConfig {
            classify_interval: Duration::from_millis(1),
            idle_delay: Duration::from_millis(1),
        }
    }

    fn tiny_frame() -> Frame {
        Frame::new(2, 1, vec![10, 20, 30, 40, 50, 60])
    }

    /// Polls `check` until it holds or the deadline passes.
    fn wait_until(check: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if check() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    /// Camera double that reports its release through a shared flag.
    struct ScriptedCamera {
        released: Arc<AtomicBool>,
    }

    impl Camera for ScriptedCamera {
        fn capture(&mut self) -> Result<Frame, VisionError> {
            Ok(tiny_frame())
        }
    }

    impl Drop for ScriptedCamera {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    /// Classifier double driven by a closure.
    struct FnClassifier<F>(F);

    impl<F> EmotionClassifier for FnClassifier<F>
    where
        F: FnMut(&Frame) -> Result<EmotionScores, VisionError> + Send,
    {
        fn classify(&mut self, frame: &Frame) -> Result<EmotionScores, VisionError> {
            (self.0)(frame)
        }
    }

    #[test]
    fn mirroring_flips_rows_horizontally() {
        let mirrored = tiny_frame().mirrored();
        assert_eq!(mirrored.pixels, vec![40, 50, 60, 10, 20, 30]);
        assert_eq!(mirrored.width, 2);
        assert_eq!(mirrored.height, 1);
    }

    #[test]
    fn register_defaults_to_neutral() {
        let state = EmotionState::new();
        assert_eq!(state.sample(), EmotionSample::default());
        assert!(state.preview().is_none());
    }

    #[test]
    fn accepted_classification_reaches_the_register() {
        let camera = ScriptedCamera {
            released: Arc::new(AtomicBool::new(false)),
        };
        let classifier = FnClassifier(|_: &Frame| -> Result<EmotionScores, VisionError> {
            Ok(EmotionScores {
                happy: 90.0,
                ..Default::default()
            })
        });
        let sampler = VisionSampler::spawn(
            Box::new(camera),
            Box::new(classifier),
            test_config(),
        )
        .expect("sampler thread");
        let state = sampler.state();

        assert!(wait_until(|| state.sample().label == EmotionLabel::Happy));
        assert_eq!(state.sample().confidence, 90.0);
        assert!(wait_until(|| state.preview().is_some()));
        sampler.stop();
    }

    #[test]
    fn sub_threshold_and_failing_classifications_leave_state_untouched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_seen = Arc::clone(&calls);
        let classifier = FnClassifier(move |_: &Frame| {
            if calls_seen.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                Ok(EmotionScores {
                    sad: 20.0,
                    ..Default::default()
                })
            } else {
                Err(VisionError::NoFace)
            }
        });
        let camera = ScriptedCamera {
            released: Arc::new(AtomicBool::new(false)),
        };
        let sampler = VisionSampler::spawn(
            Box::new(camera),
            Box::new(classifier),
            test_config(),
        )
        .expect("sampler thread");
        let state = sampler.state();

        assert!(wait_until(|| calls.load(Ordering::SeqCst) >= 6));
        assert_eq!(state.sample(), EmotionSample::default());
        sampler.stop();
    }

    #[test]
    fn stop_releases_the_camera() {
        let released = Arc::new(AtomicBool::new(false));
        let camera = ScriptedCamera {
            released: Arc::clone(&released),
        };
        let classifier =
            FnClassifier(|_: &Frame| -> Result<EmotionScores, VisionError> {
                Ok(EmotionScores::default())
            });
        let sampler = VisionSampler::spawn(
            Box::new(camera),
            Box::new(classifier),
            test_config(),
        )
        .expect("sampler thread");

        assert!(wait_until(|| sampler.state().preview().is_some()));
        assert!(!released.load(Ordering::SeqCst));
        sampler.stop();
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn dropping_the_sampler_also_stops_the_thread() {
        let released = Arc::new(AtomicBool::new(false));
        let camera = ScriptedCamera {
            released: Arc::clone(&released),
        };
        let classifier =
            FnClassifier(|_: &Frame| -> Result<EmotionScores, VisionError> {
                Err(VisionError::NoFace)
            });
        let sampler = VisionSampler::spawn(
            Box::new(camera),
            Box::new(classifier),
            test_config(),
        )
        .expect("sampler thread");

        drop(sampler);
        assert!(released.load(Ordering::SeqCst));
    }
}
