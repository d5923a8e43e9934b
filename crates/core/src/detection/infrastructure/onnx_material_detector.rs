/// YOLO material detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference and per-class NMS. Boxes are
/// mapped back to frame pixels and clamped to the frame.
use std::path::Path;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::material_detector::MaterialDetector;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::label_dataset::LabelDataset;
use super::math::nms;

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// NMS IoU threshold, applied within each class.
const NMS_IOU_THRESH: f64 = 0.45;

/// Box coordinates preceding the class scores in each output row.
const BOX_VALUES: usize = 4;

pub struct OnnxMaterialDetector {
    session: ort::session::Session,
    class_names: Vec<String>,
    candidate_threshold: f64,
    input_size: u32,
    dataset: Option<LabelDataset>,
}

impl OnnxMaterialDetector {
    /// Load a YOLO detection model and prepare for inference.
    ///
    /// `candidate_threshold` is the lowest class score reported; the
    /// pipeline applies its own confidence cut on top.
    pub fn new(
        model_path: &Path,
        class_names: Vec<String>,
        candidate_threshold: f64,
        input_size: Option<u32>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_execution_providers(execution_providers())?
            .commit_from_file(model_path)?;

        // NCHW: [1, 3, H, W]
        let model_size = session.inputs().first().and_then(|input| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                (shape.len() >= 4 && shape[2] > 0).then(|| shape[2] as u32)
            } else {
                None
            }
        });
        let input_size = input_size.or(model_size).unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!(
            "Loaded material model {} ({} classes, input {}px)",
            model_path.display(),
            class_names.len(),
            input_size
        );
        Ok(Self {
            session,
            class_names,
            candidate_threshold,
            input_size,
            dataset: None,
        })
    }

    /// Enables the label-capture hook, storing samples in `dataset`.
    pub fn with_dataset(mut self, dataset: LabelDataset) -> Self {
        self.dataset = Some(dataset);
        self
    }
}

impl MaterialDetector for OnnxMaterialDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        if frame.is_empty() || frame.channels() < 3 {
            return Err("frame has no RGB pixels".into());
        }

        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        // [1, features, candidates] is the usual export; accept the transpose.
        let transposed = shape[1] < shape[2];
        let (num_cands, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        if num_feats <= BOX_VALUES {
            return Err(format!("YOLO output has no class scores: {shape:?}").into());
        }
        let data = tensor
            .as_standard_layout()
            .as_slice()
            .map(|s| s.to_vec())
            .ok_or("Cannot get tensor slice")?;

        let rows = (0..num_cands).map(|i| {
            if transposed {
                (0..num_feats)
                    .map(|f| data[f * num_cands + i])
                    .collect::<Vec<f32>>()
            } else {
                data[i * num_feats..(i + 1) * num_feats].to_vec()
            }
        });
        let candidates = decode_rows(rows, self.candidate_threshold, scale, pad_x, pad_y);

        Ok(self.finalize(candidates, frame.width(), frame.height()))
    }

    fn capture_label(
        &mut self,
        region: &Frame,
        label: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dataset = self
            .dataset
            .as_mut()
            .ok_or("no label dataset configured")?;
        dataset.save(region, label)?;
        Ok(())
    }

    fn supports_label_capture(&self) -> bool {
        self.dataset.is_some()
    }
}

impl OnnxMaterialDetector {
    fn finalize(&self, candidates: Vec<Candidate>, fw: u32, fh: u32) -> Vec<Detection> {
        let mut detections = Vec::new();
        for (class_id, kept) in per_class_nms(&candidates, NMS_IOU_THRESH) {
            let Some(name) = self.class_names.get(class_id) else {
                log::warn!(
                    "Model emitted class index {} but only {} names are configured",
                    class_id,
                    self.class_names.len()
                );
                continue;
            };
            for c in kept {
                let bbox = BoundingBox::new(
                    c.bbox[0].round() as i32,
                    c.bbox[1].round() as i32,
                    c.bbox[2].round() as i32,
                    c.bbox[3].round() as i32,
                )
                .clamp_to(fw, fh);
                if bbox.is_valid() {
                    detections.push(Detection::new(name.clone(), c.score.clamp(0.0, 1.0), bbox));
                }
            }
        }
        detections
    }
}

fn execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
struct Candidate {
    bbox: [f64; 4],
    score: f64,
    class_id: usize,
}

/// Turns raw rows `[cx, cy, w, h, score_0, .., score_n]` into candidates in
/// frame coordinates, keeping the best class per row.
fn decode_rows<I>(rows: I, threshold: f64, scale: f64, pad_x: u32, pad_y: u32) -> Vec<Candidate>
where
    I: IntoIterator<Item = Vec<f32>>,
{
    let mut out = Vec::new();
    for row in rows {
        if row.len() <= BOX_VALUES {
            continue;
        }
        let Some((class_id, score)) = row[BOX_VALUES..]
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        else {
            continue;
        };
        let score = *score as f64;
        if !(score >= threshold) {
            continue;
        }

        let cx = row[0] as f64;
        let cy = row[1] as f64;
        let w = row[2] as f64;
        let h = row[3] as f64;
        out.push(Candidate {
            bbox: [
                ((cx - w / 2.0) - pad_x as f64) / scale,
                ((cy - h / 2.0) - pad_y as f64) / scale,
                ((cx + w / 2.0) - pad_x as f64) / scale,
                ((cy + h / 2.0) - pad_y as f64) / scale,
            ],
            score,
            class_id,
        });
    }
    out
}

/// Groups candidates by class and runs NMS within each group.
/// Classes come back in ascending index order.
fn per_class_nms(candidates: &[Candidate], iou_thresh: f64) -> Vec<(usize, Vec<Candidate>)> {
    let mut classes: Vec<usize> = candidates.iter().map(|c| c.class_id).collect();
    classes.sort_unstable();
    classes.dedup();

    classes
        .into_iter()
        .map(|class_id| {
            let group: Vec<&Candidate> =
                candidates.iter().filter(|c| c.class_id == class_id).collect();
            let entries: Vec<([f64; 4], f64)> = group.iter().map(|c| (c.bbox, c.score)).collect();
            let kept = nms(&entries, iou_thresh)
                .into_iter()
                .map(|i| group[i].clone())
                .collect();
            (class_id, kept)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding is 114/255 gray
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        let (tensor, scale, pad_x, pad_y) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_abs_diff_eq!(scale, 3.2, epsilon = 0.01);
        assert_eq!(pad_x, 0);
        assert_eq!(pad_y, 160);
    }

    #[test]
    fn test_letterbox_pads_with_gray() {
        let frame = Frame::new(vec![255u8; 100 * 50 * 3], 100, 50, 3, 0);
        let (tensor, _, pad_x, pad_y) = letterbox(&frame, 640);

        let y = pad_y as usize + 1;
        let x = pad_x as usize + 1;
        assert_abs_diff_eq!(tensor[[0, 0, y, x]], 1.0, epsilon = 0.01);
        assert_abs_diff_eq!(tensor[[0, 0, 0, 0]], 114.0 / 255.0, epsilon = 0.01);
    }

    #[test]
    fn test_decode_rows_picks_best_class_and_unpads() {
        // Scale 2, pad_y 10: a 20x20 box centered at (50, 60) in model space.
        let rows = vec![vec![50.0, 60.0, 20.0, 20.0, 0.1, 0.8, 0.3]];
        let out = decode_rows(rows, 0.25, 2.0, 0, 10);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].class_id, 1);
        assert_abs_diff_eq!(out[0].score, 0.8, epsilon = 1e-6);
        assert_abs_diff_eq!(out[0].bbox[0], 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(out[0].bbox[1], 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(out[0].bbox[2], 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(out[0].bbox[3], 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_decode_rows_drops_weak_and_short_rows() {
        let rows = vec![
            vec![50.0, 50.0, 10.0, 10.0, 0.1, 0.2],
            vec![50.0, 50.0, 10.0],
            vec![50.0, 50.0, 10.0, 10.0, f32::NAN],
        ];
        assert!(decode_rows(rows, 0.25, 1.0, 0, 0).is_empty());
    }

    #[test]
    fn test_per_class_nms_keeps_overlaps_of_different_classes() {
        let candidates = vec![
            Candidate { bbox: [0.0, 0.0, 100.0, 100.0], score: 0.9, class_id: 0 },
            Candidate { bbox: [5.0, 5.0, 105.0, 105.0], score: 0.8, class_id: 0 },
            Candidate { bbox: [5.0, 5.0, 105.0, 105.0], score: 0.7, class_id: 1 },
        ];
        let groups = per_class_nms(&candidates, NMS_IOU_THRESH);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, 0);
        assert_eq!(groups[0].1.len(), 1);
        assert_abs_diff_eq!(groups[0].1[0].score, 0.9, epsilon = 1e-9);
        assert_eq!(groups[1].0, 1);
        assert_eq!(groups[1].1.len(), 1);
    }
}
