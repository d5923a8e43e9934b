pub mod detection;
pub mod material_detector;
