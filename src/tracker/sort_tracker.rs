//! SORT tracker: per-frame predict, associate, correct and lifecycle update.

use tracing::{debug, trace};

use crate::error::TrackerError;
use crate::tracker::config::{MatchingMode, TrackerConfig};
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::{self, AssignmentResult};
use crate::tracker::rect::{Detection, Rect};
use crate::tracker::tracklet::Tracklet;

/// One reportable tracklet for a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackOutput {
    pub rect: Rect,
    pub track_id: u64,
}

#[derive(Debug)]
pub struct SortTracker {
    tracklets: Vec<Tracklet>,
    lost_tracklets: Vec<Tracklet>,
    next_id: u64,
    frame_count: u32,
    last_frame: Option<u32>,
    config: TrackerConfig,
    kalman_filter: KalmanFilter,
}

impl SortTracker {
    /// Validate `config` and build an empty tracker.
    pub fn new(config: TrackerConfig) -> Result<Self, TrackerError> {
        config.validate()?;
        debug!(
            max_age = config.max_age,
            min_hits = config.min_hits,
            matching = %config.matching,
            "created tracker"
        );
        Ok(Self {
            tracklets: Vec::new(),
            lost_tracklets: Vec::new(),
            next_id: 1,
            frame_count: 0,
            last_frame: None,
            config,
            kalman_filter: KalmanFilter::default(),
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Active tracklets, in probation or confirmed.
    pub fn tracks(&self) -> &[Tracklet] {
        &self.tracklets
    }

    /// Tracklets that aged out, in the order they were lost.
    pub fn lost_tracks(&self) -> &[Tracklet] {
        &self.lost_tracklets
    }

    /// Number of `predict` calls so far.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Predict every active tracklet one frame ahead.
    pub fn predict(&mut self) {
        self.frame_count += 1;
        for tracklet in self.tracklets.iter_mut() {
            tracklet.predict(&self.kalman_filter);
        }
    }

    /// Associate `detections` with the predicted tracklets, correct and age
    /// them, and return the reportable tracklets.
    pub fn update(&mut self, detections: &[Detection]) -> Result<Vec<TrackOutput>, TrackerError> {
        let AssignmentResult {
            matches,
            unmatched_detections,
            unmatched_tracks,
        } = self.match_detections(detections)?;

        debug_assert_eq!(
            matches.len() + unmatched_tracks.len(),
            self.tracklets.len(),
            "every tracklet must be matched or unmatched exactly once"
        );

        for &(idet, itrack) in &matches {
            self.tracklets[itrack].correct(&detections[idet], &self.kalman_filter)?;
        }

        let mut expired = vec![false; self.tracklets.len()];
        for &itrack in &unmatched_tracks {
            if self.tracklets[itrack].time_since_update() > self.config.max_age {
                expired[itrack] = true;
            }
        }

        let mut num_lost = 0;
        let tracklets = std::mem::take(&mut self.tracklets);
        for (mut tracklet, is_expired) in tracklets.into_iter().zip(expired) {
            if is_expired {
                trace!(track_id = tracklet.id(), age = tracklet.age(), "tracklet lost");
                tracklet.mark_lost();
                self.lost_tracklets.push(tracklet);
                num_lost += 1;
            } else {
                self.tracklets.push(tracklet);
            }
        }

        for &idet in &unmatched_detections {
            self.init_tracklet(&detections[idet]);
        }

        debug!(
            frame = self.frame_count,
            detections = detections.len(),
            matched = matches.len(),
            created = unmatched_detections.len(),
            lost = num_lost,
            active = self.tracklets.len(),
            "frame updated"
        );

        Ok(self.report())
    }

    /// Run `predict` then `update` for frame number `frame`.
    ///
    /// Frames are numbered from 1 and must be strictly increasing.
    pub fn step(
        &mut self,
        frame: u32,
        detections: &[Detection],
    ) -> Result<Vec<TrackOutput>, TrackerError> {
        let last = self.last_frame.unwrap_or(0);
        if frame <= last {
            return Err(TrackerError::FrameOutOfOrder { last, got: frame });
        }
        self.last_frame = Some(frame);
        self.predict();
        self.update(detections)
    }

    fn init_tracklet(&mut self, detection: &Detection) {
        let id = self.next_id;
        self.next_id += 1;
        trace!(track_id = id, "tracklet created");
        self.tracklets.push(Tracklet::new(
            id,
            detection,
            self.config.min_hits,
            &self.kalman_filter,
        ));
    }

    /// Confirmed tracklets, plus everything while the first `min_hits`
    /// frames have not yet passed.
    fn report(&self) -> Vec<TrackOutput> {
        let warming_up = self.frame_count < self.config.min_hits;
        self.tracklets
            .iter()
            .filter(|t| warming_up || t.is_confirmed())
            .map(|t| TrackOutput {
                rect: t.rect(),
                track_id: t.id(),
            })
            .collect()
    }

    fn match_detections(&self, detections: &[Detection]) -> Result<AssignmentResult, TrackerError> {
        let det_rects: Vec<Rect> = detections.iter().map(|d| d.bbox).collect();
        let track_rects: Vec<Rect> = self.tracklets.iter().map(Tracklet::rect).collect();

        match self.config.matching {
            MatchingMode::Basic => {
                matching::associate(&det_rects, &track_rects, self.config.round1_iou)
            }
            MatchingMode::Cascade => self.matching_cascade(&det_rects, &track_rects),
        }
    }

    /// Confirmed tracklets are matched in rounds of increasing
    /// `time_since_update`, each against the detections still left over.
    /// A final round matches the remaining detections against tracklets in
    /// probation, confirmed tracklets left unmatched, and confirmed
    /// tracklets older than `max_age`.
    fn matching_cascade(
        &self,
        det_rects: &[Rect],
        track_rects: &[Rect],
    ) -> Result<AssignmentResult, TrackerError> {
        let mut remaining_dets: Vec<usize> = (0..det_rects.len()).collect();
        let mut matches = Vec::new();
        let mut leftover_tracks = Vec::new();

        let mut levels: Vec<u32> = self
            .tracklets
            .iter()
            .filter(|t| t.is_confirmed())
            .map(Tracklet::time_since_update)
            .filter(|tsu| (1..=self.config.max_age).contains(tsu))
            .collect();
        levels.sort_unstable();
        levels.dedup();

        for level in levels {
            if remaining_dets.is_empty() {
                break;
            }
            let candidates: Vec<usize> = self
                .tracklets
                .iter()
                .enumerate()
                .filter(|(_, t)| t.is_confirmed() && t.time_since_update() == level)
                .map(|(i, _)| i)
                .collect();

            let round = associate_subset(
                det_rects,
                &remaining_dets,
                track_rects,
                &candidates,
                self.config.round1_iou,
            )?;
            trace!(
                time_since_update = level,
                candidates = candidates.len(),
                matched = round.matches.len(),
                "cascade round"
            );
            matches.extend(round.matches);
            leftover_tracks.extend(round.unmatched_tracks);
            remaining_dets = round.unmatched_detections;
        }

        let mut in_cascade = vec![false; self.tracklets.len()];
        for &(_, itrack) in &matches {
            in_cascade[itrack] = true;
        }
        for &itrack in &leftover_tracks {
            in_cascade[itrack] = true;
        }
        let final_tracks: Vec<usize> = (0..self.tracklets.len())
            .filter(|&i| !in_cascade[i])
            .chain(leftover_tracks)
            .collect();

        let last_round = associate_subset(
            det_rects,
            &remaining_dets,
            track_rects,
            &final_tracks,
            self.config.round2_iou,
        )?;
        matches.extend(last_round.matches);

        Ok(AssignmentResult {
            matches,
            unmatched_detections: last_round.unmatched_detections,
            unmatched_tracks: last_round.unmatched_tracks,
        })
    }
}

/// Associate a subset of detections with a subset of tracks. Indices in the
/// result refer to the full `det_rects` / `track_rects` slices.
fn associate_subset(
    det_rects: &[Rect],
    dets: &[usize],
    track_rects: &[Rect],
    tracks: &[usize],
    threshold: f32,
) -> Result<AssignmentResult, TrackerError> {
    let sub_dets: Vec<Rect> = dets.iter().map(|&i| det_rects[i]).collect();
    let sub_tracks: Vec<Rect> = tracks.iter().map(|&i| track_rects[i]).collect();
    let result = matching::associate(&sub_dets, &sub_tracks, threshold)?;

    Ok(AssignmentResult {
        matches: result
            .matches
            .into_iter()
            .map(|(d, t)| (dets[d], tracks[t]))
            .collect(),
        unmatched_detections: result
            .unmatched_detections
            .into_iter()
            .map(|d| dets[d])
            .collect(),
        unmatched_tracks: result
            .unmatched_tracks
            .into_iter()
            .map(|t| tracks[t])
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cascade_config(max_age: u32) -> TrackerConfig {
        TrackerConfig {
            max_age,
            matching: MatchingMode::Cascade,
            ..Default::default()
        }
    }

    fn id_of_fresh_track(tracker: &SortTracker) -> Vec<u64> {
        tracker
            .tracks()
            .iter()
            .filter(|t| t.time_since_update() == 0)
            .map(Tracklet::id)
            .collect()
    }

    /// Two confirmed, overlapping tracks; B coasts one frame, then a single
    /// detection overlaps B more than A.
    fn run_priority_scene(matching: MatchingMode) -> SortTracker {
        let config = TrackerConfig {
            max_age: 3,
            matching,
            ..Default::default()
        };
        let mut tracker = SortTracker::new(config).unwrap();
        let a = Detection::new(0.0, 0.0, 20.0, 20.0, 1.0);
        let b = Detection::new(8.0, 0.0, 20.0, 20.0, 1.0);

        for frame in 1..=3 {
            tracker.step(frame, &[a, b]).unwrap();
        }
        assert!(tracker.tracks().iter().all(Tracklet::is_confirmed));

        tracker.step(4, &[a]).unwrap();
        tracker
            .step(5, &[Detection::new(6.0, 0.0, 20.0, 20.0, 1.0)])
            .unwrap();
        tracker
    }

    #[test]
    fn test_cascade_prefers_recent_tracks() {
        let tracker = run_priority_scene(MatchingMode::Cascade);
        assert_eq!(id_of_fresh_track(&tracker), vec![1]);
        assert_eq!(tracker.tracks().len(), 2);
    }

    #[test]
    fn test_basic_prefers_overlap() {
        let tracker = run_priority_scene(MatchingMode::Basic);
        assert_eq!(id_of_fresh_track(&tracker), vec![2]);
    }

    #[test]
    fn test_cascade_matches_probation_tracks_last() {
        let mut tracker = SortTracker::new(cascade_config(2)).unwrap();
        let det = Detection::new(10.0, 10.0, 20.0, 20.0, 1.0);
        tracker.step(1, &[det]).unwrap();
        tracker.step(2, &[det]).unwrap();
        assert!(!tracker.tracks()[0].is_confirmed());
        tracker.step(3, &[det]).unwrap();
        assert_eq!(tracker.tracks().len(), 1);
        assert!(tracker.tracks()[0].is_confirmed());
    }

    #[test]
    fn test_cascade_with_zero_max_age_still_matches() {
        let mut tracker = SortTracker::new(cascade_config(0)).unwrap();
        let det = Detection::new(10.0, 10.0, 20.0, 20.0, 1.0);
        for frame in 1..=5 {
            let report = tracker.step(frame, &[det]).unwrap();
            assert_eq!(report.len(), 1);
            assert_eq!(report[0].track_id, 1);
        }
        assert!(tracker.lost_tracks().is_empty());
    }

    #[test]
    fn test_cascade_partition_is_complete() {
        let mut tracker = SortTracker::new(cascade_config(3)).unwrap();
        let dets = [
            Detection::new(0.0, 0.0, 10.0, 10.0, 1.0),
            Detection::new(50.0, 0.0, 10.0, 10.0, 1.0),
            Detection::new(100.0, 0.0, 10.0, 10.0, 1.0),
        ];
        for frame in 1..=3 {
            tracker.step(frame, &dets).unwrap();
        }
        tracker.step(4, &dets[..1]).unwrap();
        tracker.predict();

        let dets = [
            Detection::new(1.0, 0.0, 10.0, 10.0, 1.0),
            Detection::new(101.0, 0.0, 10.0, 10.0, 1.0),
            Detection::new(300.0, 0.0, 10.0, 10.0, 1.0),
        ];
        let result = tracker.match_detections(&dets).unwrap();

        let mut seen_dets: Vec<usize> = result.matches.iter().map(|&(d, _)| d).collect();
        seen_dets.extend(&result.unmatched_detections);
        seen_dets.sort_unstable();
        assert_eq!(seen_dets, vec![0, 1, 2]);

        let mut seen_tracks: Vec<usize> = result.matches.iter().map(|&(_, t)| t).collect();
        seen_tracks.extend(&result.unmatched_tracks);
        seen_tracks.sort_unstable();
        assert_eq!(seen_tracks, vec![0, 1, 2]);

        assert_eq!(result.matches.len(), 2);
        assert_eq!(result.unmatched_detections, vec![2]);
    }

    #[test]
    fn test_step_rejects_out_of_order_frames() {
        let mut tracker = SortTracker::new(TrackerConfig::default()).unwrap();
        assert_eq!(
            tracker.step(0, &[]),
            Err(TrackerError::FrameOutOfOrder { last: 0, got: 0 })
        );
        tracker.step(1, &[]).unwrap();
        tracker.step(3, &[]).unwrap();
        assert_eq!(
            tracker.step(3, &[]),
            Err(TrackerError::FrameOutOfOrder { last: 3, got: 3 })
        );
        assert_eq!(tracker.frame_count(), 2);
    }

    /// Confirmed track A and probation track B, both shifted by `shift`
    /// pixels in the last frame. Boxes are 10x10, so the IoU of the shifted
    /// pair is `(10 - shift) / (10 + shift)`.
    fn run_threshold_scene(round1_iou: f32, round2_iou: f32, shift: f32) -> SortTracker {
        let config = TrackerConfig {
            max_age: 2,
            matching: MatchingMode::Cascade,
            round1_iou,
            round2_iou,
            ..Default::default()
        };
        let mut tracker = SortTracker::new(config).unwrap();
        let a = Detection::new(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = Detection::new(100.0, 0.0, 10.0, 10.0, 1.0);

        for frame in 1..=3 {
            tracker.step(frame, &[a]).unwrap();
        }
        tracker.step(4, &[a, b]).unwrap();
        assert!(tracker.tracks()[0].is_confirmed());
        assert!(!tracker.tracks()[1].is_confirmed());

        let a_moved = Detection::new(shift, 0.0, 10.0, 10.0, 1.0);
        let b_moved = Detection::new(100.0 + shift, 0.0, 10.0, 10.0, 1.0);
        tracker.step(5, &[a_moved, b_moved]).unwrap();
        tracker
    }

    #[test]
    fn test_final_round_uses_round2_threshold() {
        // IoU 0.25: below round1, above round2
        let tracker = run_threshold_scene(0.3, 0.1, 6.0);
        assert_eq!(id_of_fresh_track(&tracker), vec![1, 2]);
        assert_eq!(tracker.tracks().len(), 2);
    }

    #[test]
    fn test_age_rounds_use_round1_threshold() {
        // IoU ~0.43: above round1, below round2
        let tracker = run_threshold_scene(0.3, 0.5, 4.0);
        let ids: Vec<u64> = tracker.tracks().iter().map(Tracklet::id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(tracker.tracks()[0].time_since_update(), 0);
        assert_eq!(tracker.tracks()[1].time_since_update(), 1);
    }

    #[test]
    fn test_confirmed_track_below_round1_waits_for_final_round() {
        let config = TrackerConfig {
            max_age: 2,
            matching: MatchingMode::Cascade,
            round1_iou: 0.3,
            round2_iou: 0.1,
            ..Default::default()
        };
        let mut tracker = SortTracker::new(config).unwrap();
        let a = Detection::new(0.0, 0.0, 10.0, 10.0, 1.0);
        for frame in 1..=3 {
            tracker.step(frame, &[a]).unwrap();
        }
        tracker.predict();

        let det_rects = [Rect::new(6.0, 0.0, 10.0, 10.0)];
        let track_rects = [tracker.tracks()[0].rect()];
        let result = tracker.matching_cascade(&det_rects, &track_rects).unwrap();
        assert_eq!(result.matches, vec![(0, 0)]);

        let age_round = associate_subset(&det_rects, &[0], &track_rects, &[0], 0.3).unwrap();
        assert!(age_round.matches.is_empty());
    }

    #[test]
    fn test_cascade_with_large_max_age() {
        let mut tracker = SortTracker::new(cascade_config(1_000_000)).unwrap();
        let det = Detection::new(10.0, 10.0, 20.0, 20.0, 1.0);
        for frame in 1..=4 {
            tracker.step(frame, &[det]).unwrap();
        }
        for frame in 5..=20 {
            tracker.step(frame, &[]).unwrap();
        }
        let report = tracker.step(21, &[det]).unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].track_id, 1);
        assert_eq!(tracker.tracks().len(), 1);
    }
}
