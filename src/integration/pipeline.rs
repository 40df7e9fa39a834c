//! TrackerPipeline for combining detection with tracking.

use thiserror::Error;

use crate::error::TrackerError;
use crate::tracker::{SortTracker, TrackOutput, TrackerConfig};

use super::DetectionSource;

#[derive(Debug, Error)]
pub enum PipelineError<E: std::error::Error + 'static> {
    #[error("detection failed")]
    Detection(#[source] E),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// Runs a `DetectionSource` and the `SortTracker` frame by frame.
///
/// Frames are numbered from 1 in the order they are processed.
pub struct TrackerPipeline<D: DetectionSource> {
    detector: D,
    tracker: SortTracker,
    frame: u32,
}

impl<D: DetectionSource> TrackerPipeline<D> {
    /// Create a new tracking pipeline with the given detector and tracker config.
    pub fn new(detector: D, config: TrackerConfig) -> Result<Self, TrackerError> {
        Ok(Self {
            detector,
            tracker: SortTracker::new(config)?,
            frame: 0,
        })
    }

    /// Create a new tracking pipeline with default tracker configuration.
    pub fn with_default_config(detector: D) -> Result<Self, TrackerError> {
        Self::new(detector, TrackerConfig::default())
    }

    /// Detect objects in the next frame and return the reportable tracks.
    pub fn process_frame(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<TrackOutput>, PipelineError<D::Error>> {
        let detections = self
            .detector
            .detect(input, width, height)
            .map_err(PipelineError::Detection)?;
        let tracks = self.tracker.step(self.frame + 1, &detections)?;
        self.frame += 1;
        Ok(tracks)
    }

    /// Number of the last processed frame, 0 before the first.
    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    pub fn tracker(&self) -> &SortTracker {
        &self.tracker
    }
}
