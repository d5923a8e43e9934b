use crate::detection::domain::detection::Detection;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::tracking::domain::similarity_scorer::SimilarityScorer;

/// Motion-only similarity: box overlap between the track and detection.
#[derive(Default)]
pub struct IouScorer;

impl IouScorer {
    pub fn new() -> Self {
        Self
    }
}

impl SimilarityScorer for IouScorer {
    fn score(
        &mut self,
        track_box: &BoundingBox,
        detection: &Detection,
        _frame: &Frame,
    ) -> Result<f64, Box<dyn std::error::Error>> {
        Ok(track_box.iou(&detection.bbox))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_score_is_box_overlap() {
        let mut scorer = IouScorer::new();
        let frame = Frame::empty(3, 0);
        let det = Detection::new("PET", 0.9, BoundingBox::new(5, 5, 15, 15));
        let score = scorer
            .score(&BoundingBox::new(0, 0, 10, 10), &det, &frame)
            .unwrap();
        assert_abs_diff_eq!(score, 25.0 / 175.0, epsilon = 1e-9);
    }
}
