use crate::shared::bounding_box::BoundingBox;

/// One object reported by a material detector for a single frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub class_label: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class_label: impl Into<String>, confidence: f64, bbox: BoundingBox) -> Self {
        Self {
            class_label: class_label.into(),
            confidence,
            bbox,
        }
    }

    /// Checks the shape a detector must return; the message names the
    /// offending field.
    pub fn validate(&self) -> Result<(), String> {
        if self.class_label.trim().is_empty() {
            return Err("empty class label".to_string());
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "confidence {} outside [0, 1] for {}",
                self.confidence, self.class_label
            ));
        }
        if !self.bbox.is_valid() {
            let b = self.bbox;
            return Err(format!(
                "degenerate box ({}, {}, {}, {}) for {}",
                b.x1, b.y1, b.x2, b.y2, self.class_label
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_well_formed_detection_passes() {
        let det = Detection::new("PET", 0.9, BoundingBox::new(10, 10, 60, 60));
        assert!(det.validate().is_ok());
    }

    #[rstest]
    #[case("", 0.9, BoundingBox::new(0, 0, 5, 5))]
    #[case("PET", 1.2, BoundingBox::new(0, 0, 5, 5))]
    #[case("PET", f64::NAN, BoundingBox::new(0, 0, 5, 5))]
    #[case("PET", 0.9, BoundingBox::new(5, 0, 5, 5))]
    #[case("PET", 0.9, BoundingBox::new(0, 9, 5, 5))]
    fn test_malformed_detection_rejected(
        #[case] label: &str,
        #[case] confidence: f64,
        #[case] bbox: BoundingBox,
    ) {
        assert!(Detection::new(label, confidence, bbox).validate().is_err());
    }
}
