pub mod label_dataset;
pub mod math;
pub mod model_resolver;
pub mod onnx_material_detector;
