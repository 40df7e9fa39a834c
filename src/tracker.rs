mod config;
mod kalman_filter;
pub mod matching;
mod rect;
mod sort_tracker;
mod track_state;
mod tracklet;

pub use config::{MatchingMode, TrackerConfig};
pub use kalman_filter::KalmanFilter;
pub use rect::{Detection, MIN_DIMENSION, Rect};
pub use sort_tracker::{SortTracker, TrackOutput};
pub use track_state::TrackState;
pub use tracklet::Tracklet;
