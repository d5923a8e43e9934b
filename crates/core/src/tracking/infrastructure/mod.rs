pub mod iou_scorer;
