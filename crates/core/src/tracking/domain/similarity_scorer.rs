use crate::detection::domain::detection::Detection;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Scores how likely a detection continues an existing track.
///
/// Higher is more similar. The frame is passed so appearance-based
/// scorers can sample pixels; motion-only scorers ignore it.
pub trait SimilarityScorer: Send {
    fn score(
        &mut self,
        track_box: &BoundingBox,
        detection: &Detection,
        frame: &Frame,
    ) -> Result<f64, Box<dyn std::error::Error>>;
}
