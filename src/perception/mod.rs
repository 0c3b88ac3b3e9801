//! Perception side of the control loop
//!
//! Everything here is a collaborator of the steering core: it turns frames into
//! a [`SteeringSample`] or reports that no hands are visible. The core only sees
//! the sample and cannot tell a fresh result from a cached one.
//!
//! ```text
//! FrameSource ──► StaleCache ──► Detector ──► HandDetections ──► SteeringSample
//!                 (every n-th)                  (2 hands)
//! ```

pub mod geometry;
pub mod replay;
pub mod stale_cache;

pub use geometry::{is_fist, wrist_angle, HandLandmarks, Landmark};
pub use replay::ReplaySource;
pub use stale_cache::StaleCache;

use tracing::{debug, trace};

/// One resolved perception result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringSample {
    /// Wrist-to-wrist angle in degrees
    pub raw_angle: f64,
    pub left_closed: bool,
    pub right_closed: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source has no more frames or samples
    #[error("Sample source exhausted")]
    Exhausted,

    #[error("Frame acquisition failed: {0}")]
    Acquisition(String),

    #[error("Invalid replay script: {0}")]
    InvalidScript(String),
}

/// Pull interface used by the control loop, one call per cycle
///
/// `Ok(None)` means no hands were found this cycle.
pub trait SampleSource {
    fn next_sample(&mut self) -> Result<Option<SteeringSample>, SourceError>;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn next_sample(&mut self) -> Result<Option<SteeringSample>, SourceError> {
        (**self).next_sample()
    }
}

/// All hands found in one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandDetections {
    pub hands: Vec<HandLandmarks>,
}

impl HandDetections {
    pub fn new(hands: Vec<HandLandmarks>) -> Self {
        Self { hands }
    }

    /// Resolves exactly two hands into a sample; any other count yields `None`
    ///
    /// The hand whose wrist is further left in the frame is the left hand. The
    /// angle is measured between the wrists in pixel space.
    pub fn to_sample(&self, frame_width: u32, frame_height: u32) -> Option<SteeringSample> {
        let [first, second] = self.hands.as_slice() else {
            trace!("Need two hands, found {}", self.hands.len());
            return None;
        };

        let (left, right) = if first.wrist().x < second.wrist().x {
            (first, second)
        } else {
            (second, first)
        };

        let (lx, ly) = left.wrist_px(frame_width, frame_height);
        let (rx, ry) = right.wrist_px(frame_width, frame_height);
        let raw_angle = wrist_angle((lx as f64, ly as f64), (rx as f64, ry as f64));

        Some(SteeringSample {
            raw_angle,
            left_closed: is_fist(left),
            right_closed: is_fist(right),
        })
    }
}

/// Supplies frames to a detector
pub trait FrameSource {
    type Frame;

    /// `Ok(None)` when the stream has ended
    fn next_frame(&mut self) -> Result<Option<Self::Frame>, SourceError>;
}

/// Hand landmark detection on a single frame
pub trait Detector {
    type Frame;

    fn detect(&mut self, frame: &Self::Frame) -> Option<HandDetections>;
}

/// Sample source built from a frame supplier, a detector and a staleness cache
pub struct DetectorSource<F, D> {
    frames: F,
    detector: D,
    cache: StaleCache<HandDetections>,
    frame_width: u32,
    frame_height: u32,
}

impl<F, D> DetectorSource<F, D>
where
    F: FrameSource,
    D: Detector<Frame = F::Frame>,
{
    pub fn new(
        frames: F,
        detector: D,
        process_every_n_frames: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        debug!(
            "Detector source at {}x{}, detecting every {} frames",
            frame_width, frame_height, process_every_n_frames
        );
        Self {
            frames,
            detector,
            cache: StaleCache::new(process_every_n_frames),
            frame_width,
            frame_height,
        }
    }
}

impl<F, D> SampleSource for DetectorSource<F, D>
where
    F: FrameSource,
    D: Detector<Frame = F::Frame>,
{
    fn next_sample(&mut self) -> Result<Option<SteeringSample>, SourceError> {
        let frame = self.frames.next_frame()?.ok_or(SourceError::Exhausted)?;

        let detector = &mut self.detector;
        let detections = self
            .cache
            .get_latest_or_stale(|| detector.detect(&frame));

        Ok(detections.and_then(|d| d.to_sample(self.frame_width, self.frame_height)))
    }
}

#[cfg(test)]
mod tests {
    use super::geometry::fixtures::hand;
    use super::*;

    struct CountingFrames {
        remaining: u32,
    }

    impl FrameSource for CountingFrames {
        type Frame = u32;

        fn next_frame(&mut self) -> Result<Option<u32>, SourceError> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(self.remaining))
        }
    }

    /// Always sees two hands; counts how often it ran
    struct FixedDetector {
        runs: u32,
    }

    impl Detector for FixedDetector {
        type Frame = u32;

        fn detect(&mut self, _frame: &u32) -> Option<HandDetections> {
            self.runs += 1;
            Some(HandDetections::new(vec![
                hand(0.7, 0.4, 4),
                hand(0.3, 0.6, 4),
            ]))
        }
    }

    #[test]
    fn two_hands_resolve_left_to_right() {
        let detections = HandDetections::new(vec![hand(0.75, 0.25, 0), hand(0.25, 0.75, 4)]);
        let sample = detections.to_sample(640, 480).unwrap();

        // left wrist (160, 360) -> right wrist (480, 120): rising to the right
        assert!(sample.raw_angle < 0.0);
        assert!((sample.raw_angle - (-240.0f64).atan2(320.0).to_degrees()).abs() < 1e-9);
        assert!(sample.left_closed);
        assert!(!sample.right_closed);
    }

    #[test]
    fn other_hand_counts_are_absent() {
        assert!(HandDetections::default().to_sample(640, 480).is_none());
        let one = HandDetections::new(vec![hand(0.5, 0.5, 0)]);
        assert!(one.to_sample(640, 480).is_none());
        let three = HandDetections::new(vec![
            hand(0.2, 0.5, 0),
            hand(0.5, 0.5, 0),
            hand(0.8, 0.5, 0),
        ]);
        assert!(three.to_sample(640, 480).is_none());
    }

    #[test]
    fn detector_source_skips_frames_and_reuses_results() {
        let mut source = DetectorSource::new(
            CountingFrames { remaining: 4 },
            FixedDetector { runs: 0 },
            2,
            640,
            480,
        );

        // frame 1: nothing cached yet
        assert!(source.next_sample().unwrap().is_none());
        // frame 2: detection runs
        let fresh = source.next_sample().unwrap().unwrap();
        // frame 3: stale copy of frame 2
        let stale = source.next_sample().unwrap().unwrap();
        assert_eq!(fresh, stale);
        assert!(fresh.left_closed && fresh.right_closed);
        source.next_sample().unwrap();

        assert_eq!(source.detector.runs, 2);
        assert!(matches!(source.next_sample(), Err(SourceError::Exhausted)));
    }
}
