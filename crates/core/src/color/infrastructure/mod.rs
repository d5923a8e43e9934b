pub mod classifier_factory;
pub mod clustering_color_classifier;
pub mod histogram_color_classifier;
pub mod hsv;
pub mod kmeans;
