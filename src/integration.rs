//! Integration module for connecting detectors and output formats with the tracker.
//!
//! This module provides traits and utilities for feeding per-frame
//! detections into [`SortTracker`](crate::SortTracker) and for writing its
//! output in the MOTChallenge text format.

mod detector;
mod mot;
mod pipeline;

pub use detector::{DetectionSource, IntoDetections};
pub use mot::{MotRecord, format_mot_challenge};
pub use pipeline::{PipelineError, TrackerPipeline};
