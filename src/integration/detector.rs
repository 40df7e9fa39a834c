//! Trait for upstream object detectors.

use crate::tracker::Detection;

/// Trait for object detection backends.
///
/// Implement this trait to connect any detection model to the tracker.
///
/// # Example
///
/// ```ignore
/// use sort_tracker::{DetectionSource, Detection};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl DetectionSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, input: &[u8], width: u32, height: u32) -> Result<Vec<Detection>, Self::Error> {
///         // Run inference and return detections
///         Ok(vec![])
///     }
/// }
/// ```
pub trait DetectionSource {
    /// Error type for detection failures.
    type Error: std::error::Error + 'static;

    /// Run inference on raw image data and return detections.
    fn detect(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Detection>, Self::Error>;
}

/// Helper trait for converting model-specific outputs to `Detection`.
pub trait IntoDetections {
    fn into_detections(self) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self) -> Vec<Detection> {
        self
    }
}

/// Rows of `[x, y, w, h, score]`, as read from a detection file.
impl IntoDetections for Vec<[f32; 5]> {
    fn into_detections(self) -> Vec<Detection> {
        self.into_iter()
            .map(|[x, y, w, h, score]| Detection::new(x, y, w, h, score))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_into_detections() {
        let dets = vec![[1.0, 2.0, 3.0, 4.0, 0.5]].into_detections();
        assert_eq!(dets, vec![Detection::new(1.0, 2.0, 3.0, 4.0, 0.5)]);
    }
}
