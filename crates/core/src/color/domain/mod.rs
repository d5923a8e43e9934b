pub mod color_classifier;
pub mod color_label;
