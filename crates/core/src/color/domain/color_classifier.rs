use crate::shared::frame::Frame;

use super::color_label::ColorLabel;

/// Names the dominant color of a cropped object region.
///
/// Infallible by contract: empty or malformed regions yield
/// `ColorLabel::Unknown`. `&mut self` lets implementations keep a cache.
pub trait ColorClassifier: Send {
    fn classify(&mut self, region: &Frame) -> ColorLabel;
}
