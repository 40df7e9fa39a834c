//! Simple Online Realtime Tracking (SORT) with optional matching cascade.
//!
//! Detections are associated to Kalman-predicted tracks purely by box
//! overlap, solved as a linear assignment problem each frame.

pub mod error;
pub mod integration;
pub mod tracker;

pub use error::TrackerError;
pub use integration::{
    DetectionSource, IntoDetections, MotRecord, PipelineError, TrackerPipeline, format_mot_challenge,
};
pub use tracker::{
    Detection, MatchingMode, Rect, SortTracker, TrackOutput, TrackState, TrackerConfig, Tracklet,
};
