//! Single tracked object: identity, motion state and lifecycle counters.

use ndarray::{Array1, Array2};

use crate::error::TrackerError;
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::rect::{Detection, Rect};
use crate::tracker::track_state::TrackState;

#[derive(Debug, Clone)]
pub struct Tracklet {
    id: u64,
    confirmed: bool,
    lost: bool,
    min_hits: u32,
    /// Frames since creation
    age: u32,
    /// Frames since the last correction
    time_since_update: u32,
    /// Consecutive frames with a correction
    hit_streak: u32,
    /// Kalman filter state mean (7-dim, XYSR + velocities)
    mean: Array1<f64>,
    /// Kalman filter state covariance (7x7)
    covariance: Array2<f64>,
    history: Vec<Rect>,
}

impl Tracklet {
    /// Start a tracklet in probation from an unmatched detection.
    pub fn new(id: u64, detection: &Detection, min_hits: u32, kalman_filter: &KalmanFilter) -> Self {
        let (mean, covariance) = kalman_filter.initiate(xysr_f64(detection));
        Self {
            id,
            confirmed: false,
            lost: false,
            min_hits,
            age: 1,
            time_since_update: 0,
            hit_streak: 1,
            mean,
            covariance,
            history: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> TrackState {
        if self.lost {
            TrackState::Lost
        } else if self.confirmed {
            TrackState::Confirmed
        } else {
            TrackState::Probation
        }
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn time_since_update(&self) -> u32 {
        self.time_since_update
    }

    pub fn hit_streak(&self) -> u32 {
        self.hit_streak
    }

    /// Whether the tracklet left probation. Stays true after it is lost.
    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn is_lost(&self) -> bool {
        self.lost
    }

    /// Raw filter state `[cx, cy, s, r, vx, vy, vs]`.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Advance the motion state by one frame.
    pub fn predict(&mut self, kalman_filter: &KalmanFilter) {
        if self.time_since_update > 0 {
            self.hit_streak = 0;
        }
        self.time_since_update += 1;
        self.age += 1;

        // Area must not be driven negative.
        if self.mean[6] + self.mean[2] <= 0.0 {
            self.mean[6] = 0.0;
        }

        let (mean, covariance) = kalman_filter.predict(&self.mean, &self.covariance);
        self.mean = mean;
        self.covariance = covariance;
    }

    /// Correct the motion state with an associated detection.
    pub fn correct(
        &mut self,
        detection: &Detection,
        kalman_filter: &KalmanFilter,
    ) -> Result<(), TrackerError> {
        let (mean, covariance) =
            kalman_filter.update(&self.mean, &self.covariance, xysr_f64(detection))?;
        self.mean = mean;
        self.covariance = covariance;

        self.hit_streak += 1;
        self.time_since_update = 0;
        if self.hit_streak >= self.min_hits {
            self.confirmed = true;
        }
        Ok(())
    }

    /// Current bounding box recovered from the filter state.
    pub fn rect(&self) -> Rect {
        Rect::from_xysr(
            self.mean[0] as f32,
            self.mean[1] as f32,
            self.mean[2] as f32,
            self.mean[3] as f32,
        )
    }

    /// Current state as a unit-confidence detection.
    pub fn detection(&self) -> Detection {
        Detection::from_rect(self.rect(), 1.0)
    }

    /// Append the current box to the history.
    pub fn record_state(&mut self) {
        let rect = self.rect();
        self.history.push(rect);
    }

    pub fn history(&self) -> &[Rect] {
        &self.history
    }

    pub(crate) fn mark_lost(&mut self) {
        self.lost = true;
    }
}

fn xysr_f64(detection: &Detection) -> [f64; 4] {
    detection.to_xysr().map(f64::from)
}
