//! Hue-histogram color classifier.
//!
//! Near-white and near-black regions are caught by area ratio before the
//! histogram is built; the remaining chromatic pixels vote on a hue bin
//! which is mapped onto named hue ranges.
use crate::color::domain::color_classifier::ColorClassifier;
use crate::color::domain::color_label::ColorLabel;
use crate::shared::frame::Frame;

use super::hsv::rgb_to_hsv;

const HUE_BINS: usize = 180;

/// Saturation below this counts as unsaturated.
const LOW_SATURATION: u8 = 40;
/// Value above this (with low saturation) counts as white.
const HIGH_VALUE: u8 = 200;
/// Value below this counts as black.
const LOW_VALUE: u8 = 50;

/// Fraction of the region a special-case mask must exceed.
const DOMINANT_RATIO: f64 = 0.5;

/// Inclusive hue ranges; red appears twice to cover the wrap-around.
const HUE_RANGES: &[(u8, u8, ColorLabel)] = &[
    (0, 10, ColorLabel::Red),
    (11, 25, ColorLabel::Orange),
    (26, 34, ColorLabel::Yellow),
    (35, 85, ColorLabel::Green),
    (86, 125, ColorLabel::Blue),
    (126, 169, ColorLabel::Purple),
    (170, 179, ColorLabel::Red),
];

#[derive(Default)]
pub struct HistogramColorClassifier;

impl HistogramColorClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl ColorClassifier for HistogramColorClassifier {
    fn classify(&mut self, region: &Frame) -> ColorLabel {
        if region.is_empty() || !region.is_well_formed() || region.channels() < 3 {
            return ColorLabel::Unknown;
        }

        let ch = region.channels() as usize;
        let mut total = 0usize;
        let mut white = 0usize;
        let mut black = 0usize;
        let mut histogram = [0usize; HUE_BINS];

        for px in region.data().chunks_exact(ch) {
            let (h, s, v) = rgb_to_hsv(px[0], px[1], px[2]);
            total += 1;
            if s < LOW_SATURATION && v > HIGH_VALUE {
                white += 1;
            }
            if v < LOW_VALUE {
                black += 1;
            }
            if s >= LOW_SATURATION && v >= LOW_VALUE {
                histogram[h as usize] += 1;
            }
        }

        if total == 0 {
            return ColorLabel::Unknown;
        }
        if white as f64 / total as f64 > DOMINANT_RATIO {
            return ColorLabel::White;
        }
        if black as f64 / total as f64 > DOMINANT_RATIO {
            return ColorLabel::Black;
        }

        match dominant_hue(&histogram) {
            Some(hue) => hue_to_label(hue),
            None => ColorLabel::Unknown,
        }
    }
}

/// Bin with the highest count; the lowest hue wins ties. `None` when empty.
fn dominant_hue(histogram: &[usize; HUE_BINS]) -> Option<u8> {
    let mut best: Option<(usize, usize)> = None;
    for (bin, &count) in histogram.iter().enumerate() {
        let better = match best {
            Some((_, c)) => count > c,
            None => count > 0,
        };
        if better {
            best = Some((bin, count));
        }
    }
    best.map(|(bin, _)| bin as u8)
}

fn hue_to_label(hue: u8) -> ColorLabel {
    HUE_RANGES
        .iter()
        .find(|(lo, hi, _)| (*lo..=*hi).contains(&hue))
        .map(|(_, _, label)| *label)
        .unwrap_or(ColorLabel::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let data = rgb.repeat((width * height) as usize);
        Frame::new(data, width, height, 3, 0)
    }

    #[rstest]
    #[case([0, 0, 255], ColorLabel::Blue)]
    #[case([30, 60, 200], ColorLabel::Blue)]
    #[case([255, 0, 0], ColorLabel::Red)]
    #[case([255, 0, 40], ColorLabel::Red)]
    #[case([255, 128, 0], ColorLabel::Orange)]
    #[case([255, 255, 0], ColorLabel::Yellow)]
    #[case([0, 200, 0], ColorLabel::Green)]
    #[case([128, 0, 255], ColorLabel::Purple)]
    #[case([250, 250, 250], ColorLabel::White)]
    #[case([10, 10, 10], ColorLabel::Black)]
    fn test_solid_regions(#[case] rgb: [u8; 3], #[case] expected: ColorLabel) {
        let mut classifier = HistogramColorClassifier::new();
        assert_eq!(classifier.classify(&solid(8, 8, rgb)), expected);
    }

    #[test]
    fn test_empty_region_is_unknown() {
        let mut classifier = HistogramColorClassifier::new();
        assert_eq!(classifier.classify(&Frame::empty(3, 0)), ColorLabel::Unknown);
    }

    #[test]
    fn test_mid_gray_is_unknown() {
        // Neither bright enough for white, dark enough for black, nor saturated.
        let mut classifier = HistogramColorClassifier::new();
        assert_eq!(
            classifier.classify(&solid(4, 4, [128, 128, 128])),
            ColorLabel::Unknown
        );
    }

    #[test]
    fn test_single_channel_region_is_unknown() {
        let mut classifier = HistogramColorClassifier::new();
        let gray = Frame::new(vec![200; 16], 4, 4, 1, 0);
        assert_eq!(classifier.classify(&gray), ColorLabel::Unknown);
    }

    #[test]
    fn test_majority_hue_wins_mixed_region() {
        // 6 blue rows and 2 red rows.
        let mut data = [0u8, 0, 255].repeat(8 * 6);
        data.extend([255u8, 0, 0].repeat(8 * 2));
        let frame = Frame::new(data, 8, 8, 3, 0);
        let mut classifier = HistogramColorClassifier::new();
        assert_eq!(classifier.classify(&frame), ColorLabel::Blue);
    }

    #[test]
    fn test_white_needs_more_than_half() {
        // Exactly half white, half blue: white test fails, blue dominates.
        let mut data = [255u8, 255, 255].repeat(8);
        data.extend([0u8, 0, 255].repeat(8));
        let frame = Frame::new(data, 4, 4, 3, 0);
        let mut classifier = HistogramColorClassifier::new();
        assert_eq!(classifier.classify(&frame), ColorLabel::Blue);
    }

    #[rstest]
    #[case(0, ColorLabel::Red)]
    #[case(10, ColorLabel::Red)]
    #[case(11, ColorLabel::Orange)]
    #[case(34, ColorLabel::Yellow)]
    #[case(85, ColorLabel::Green)]
    #[case(125, ColorLabel::Blue)]
    #[case(169, ColorLabel::Purple)]
    #[case(170, ColorLabel::Red)]
    #[case(179, ColorLabel::Red)]
    fn test_hue_range_boundaries(#[case] hue: u8, #[case] expected: ColorLabel) {
        assert_eq!(hue_to_label(hue), expected);
    }
}
