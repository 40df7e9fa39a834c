//! MOTChallenge text output.

use std::fmt;

use crate::tracker::TrackOutput;

/// One MOTChallenge result line: `frame,id,x,y,w,h,1,-1,-1,-1`.
///
/// Geometry is truncated toward zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotRecord {
    pub frame: u32,
    pub track_id: u64,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl MotRecord {
    pub fn new(frame: u32, output: &TrackOutput) -> Self {
        let [x, y, width, height] = output.rect.to_tlwh();
        Self {
            frame,
            track_id: output.track_id,
            x: x as i64,
            y: y as i64,
            width: width as i64,
            height: height as i64,
        }
    }

    /// All ten columns, including the constant confidence and world coordinates.
    pub fn to_row(&self) -> [i64; 10] {
        [
            self.frame as i64,
            self.track_id as i64,
            self.x,
            self.y,
            self.width,
            self.height,
            1,
            -1,
            -1,
            -1,
        ]
    }
}

impl fmt::Display for MotRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},1,-1,-1,-1",
            self.frame, self.track_id, self.x, self.y, self.width, self.height
        )
    }
}

/// Format one frame's tracker output.
pub fn format_mot_challenge(frame: u32, tracks: &[TrackOutput]) -> Vec<MotRecord> {
    tracks.iter().map(|t| MotRecord::new(frame, t)).collect()
}
