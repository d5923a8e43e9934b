use crate::shared::bounding_box::BoundingBox;

/// A persistent identity for one physical object across frames.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub track_id: u32,
    pub class_label: String,
    pub bbox: BoundingBox,
    /// Consecutive ticks this track has been matched.
    pub hit_count: usize,
    /// Consecutive ticks this track has gone unmatched.
    pub miss_count: usize,
}

impl Track {
    /// True when the track was matched on the latest update.
    pub fn is_fresh(&self) -> bool {
        self.miss_count == 0
    }
}
