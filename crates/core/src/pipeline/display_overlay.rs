use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::tracking::domain::track::Track;

const BORDER: i32 = 2;

/// Outline color per material class.
pub fn class_color(class_label: &str) -> [u8; 3] {
    match class_label {
        "PET" => [0, 255, 0],
        "HDPE" => [0, 128, 255],
        "PP" => [255, 255, 0],
        "PVC" => [255, 0, 255],
        "LDPE" => [255, 128, 0],
        "LDPE plastic bag" => [0, 255, 255],
        _ => [255, 255, 255],
    }
}

/// Draws each track's box onto `frame`.
pub fn annotate(frame: &mut Frame, tracks: &[Track]) {
    for track in tracks {
        draw_rect(frame, &track.bbox, class_color(&track.class_label));
    }
}

/// Draws a rectangle outline, clipped to the frame.
pub fn draw_rect(frame: &mut Frame, bbox: &BoundingBox, rgb: [u8; 3]) {
    if frame.channels() < 3 || !frame.is_well_formed() {
        return;
    }
    let b = bbox.clamp_to(frame.width(), frame.height());
    if !b.is_valid() {
        return;
    }
    let ch = frame.channels() as usize;
    let stride = frame.width() as usize * ch;
    let data = frame.data_mut();

    for y in b.y1..b.y2 {
        for x in b.x1..b.x2 {
            let on_edge = x - b.x1 < BORDER
                || b.x2 - 1 - x < BORDER
                || y - b.y1 < BORDER
                || b.y2 - 1 - y < BORDER;
            if on_edge {
                let idx = y as usize * stride + x as usize * ch;
                data[idx..idx + 3].copy_from_slice(&rgb);
            }
        }
    }
}
