//! Frame-skipping cache for expensive detection results

use tracing::trace;

/// Runs detection only on every n-th frame and serves the last result in between
///
/// The frame counter is incremented before the check, so with `n = 2` detection
/// runs on frames 2, 4, 6 and frame 1 sees an empty cache.
#[derive(Debug, Clone)]
pub struct StaleCache<T> {
    every_n: u32,
    frame_count: u64,
    last: Option<T>,
}

impl<T: Clone> StaleCache<T> {
    pub fn new(every_n: u32) -> Self {
        Self {
            every_n: every_n.max(1),
            frame_count: 0,
            last: None,
        }
    }

    /// Advances one frame and returns a fresh or cached result
    pub fn get_latest_or_stale<F>(&mut self, detect: F) -> Option<T>
    where
        F: FnOnce() -> Option<T>,
    {
        self.frame_count += 1;
        if self.frame_count % u64::from(self.every_n) == 0 {
            self.last = detect();
        } else {
            trace!("Reusing cached detection for frame {}", self.frame_count);
        }
        self.last.clone()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
