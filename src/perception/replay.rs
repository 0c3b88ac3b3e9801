//! Scripted sample source
//!
//! Drives the controller from a TOML script instead of a camera, which is handy
//! for checking key timing against a game without standing in front of a webcam.
//!
//! ```toml
//! looped = false
//!
//! [[step]]
//! angle = 20.0
//! left_closed = true
//! right_closed = true
//! repeat = 60
//!
//! [[step]]
//! absent = true
//! repeat = 15
//! ```

use super::{SampleSource, SourceError, SteeringSample};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReplayStep {
    #[serde(default)]
    pub angle: Option<f64>,
    #[serde(default)]
    pub left_closed: bool,
    #[serde(default)]
    pub right_closed: bool,
    /// Frames with no hands
    #[serde(default)]
    pub absent: bool,
    /// Number of consecutive cycles this step is served
    #[serde(default = "one")]
    pub repeat: u32,
}

impl ReplayStep {
    fn sample(&self) -> Option<SteeringSample> {
        if self.absent {
            return None;
        }
        self.angle.map(|raw_angle| SteeringSample {
            raw_angle,
            left_closed: self.left_closed,
            right_closed: self.right_closed,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ReplayScript {
    #[serde(default)]
    pub looped: bool,
    #[serde(default)]
    pub step: Vec<ReplayStep>,
}

#[derive(Debug, Clone)]
pub struct ReplaySource {
    script: ReplayScript,
    index: usize,
    served: u32,
}

impl ReplaySource {
    pub fn new(script: ReplayScript) -> Result<Self, SourceError> {
        if script.step.is_empty() {
            return Err(SourceError::InvalidScript("script has no steps".to_string()));
        }
        for (n, step) in script.step.iter().enumerate() {
            if step.repeat == 0 {
                return Err(SourceError::InvalidScript(format!(
                    "step {} has repeat = 0",
                    n + 1
                )));
            }
            if !step.absent && step.angle.is_none() {
                return Err(SourceError::InvalidScript(format!(
                    "step {} needs an angle or absent = true",
                    n + 1
                )));
            }
            if let Some(angle) = step.angle.filter(|a| !a.is_finite()) {
                return Err(SourceError::InvalidScript(format!(
                    "step {} has non-finite angle {}",
                    n + 1,
                    angle
                )));
            }
        }

        debug!(
            "Replay script with {} steps (looped: {})",
            script.step.len(),
            script.looped
        );
        Ok(Self {
            script,
            index: 0,
            served: 0,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, SourceError> {
        let script: ReplayScript =
            toml::from_str(content).map_err(|e| SourceError::InvalidScript(e.to_string()))?;
        Self::new(script)
    }

    pub async fn load(path: &Path) -> Result<Self, SourceError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            SourceError::Acquisition(format!("failed to read {}: {}", path.display(), e))
        })?;
        let source = Self::from_toml(&content)?;
        info!("Loaded replay script from {}", path.display());
        Ok(source)
    }
}

impl SampleSource for ReplaySource {
    fn next_sample(&mut self) -> Result<Option<SteeringSample>, SourceError> {
        if self.index >= self.script.step.len() {
            if !self.script.looped {
                return Err(SourceError::Exhausted);
            }
            self.index = 0;
        }

        let step = &self.script.step[self.index];
        let sample = step.sample();

        self.served += 1;
        if self.served >= step.repeat {
            self.served = 0;
            self.index += 1;
        }
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
        [[step]]
        angle = 20.0
        left_closed = true
        right_closed = true
        repeat = 2

        [[step]]
        absent = true

        [[step]]
        angle = -5.5
    "#;

    #[test]
    fn serves_steps_in_order() {
        let mut source = ReplaySource::from_toml(SCRIPT).unwrap();

        let first = source.next_sample().unwrap().unwrap();
        assert_eq!(first.raw_angle, 20.0);
        assert!(first.left_closed && first.right_closed);
        assert_eq!(source.next_sample().unwrap(), Some(first));
        assert_eq!(source.next_sample().unwrap(), None);

        let last = source.next_sample().unwrap().unwrap();
        assert_eq!(last.raw_angle, -5.5);
        assert!(!last.left_closed && !last.right_closed);

        assert!(matches!(source.next_sample(), Err(SourceError::Exhausted)));
    }

    #[test]
    fn looped_script_wraps() {
        let mut source = ReplaySource::from_toml(&format!("looped = true\n{}", SCRIPT)).unwrap();
        for _ in 0..4 {
            source.next_sample().unwrap();
        }
        assert_eq!(source.next_sample().unwrap().unwrap().raw_angle, 20.0);
    }

    #[test]
    fn rejects_malformed_scripts() {
        assert!(matches!(
            ReplaySource::from_toml(""),
            Err(SourceError::InvalidScript(_))
        ));
        assert!(ReplaySource::from_toml("[[step]]\nleft_closed = true\n").is_err());
        assert!(ReplaySource::from_toml("[[step]]\nangle = 1.0\nrepeat = 0\n").is_err());
        assert!(ReplaySource::from_toml("[[step]]\nangle = \"left\"\n").is_err());
    }

    #[test]
    fn rejects_non_finite_angles() {
        for angle in ["nan", "inf", "-inf"] {
            let script = format!("[[step]]\nangle = {}\n", angle);
            assert!(
                matches!(
                    ReplaySource::from_toml(&script),
                    Err(SourceError::InvalidScript(_))
                ),
                "angle {}",
                angle
            );
        }
        // checked on absent steps too
        assert!(ReplaySource::from_toml("[[step]]\nabsent = true\nangle = nan\n").is_err());
    }
}
