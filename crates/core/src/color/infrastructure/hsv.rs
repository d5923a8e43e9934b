/// RGB → HSV on the 8-bit scales used by common vision libraries:
/// hue in `0..180` (degrees halved), saturation and value in `0..=255`.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let r = r as f64;
    let g = g as f64;
    let b = b as f64;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { delta / max * 255.0 } else { 0.0 };

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    let hue = ((h / 2.0).round() as u32 % 180) as u8;
    (hue, s.round() as u8, v as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case((255, 0, 0), (0, 255, 255))]
    #[case((0, 255, 0), (60, 255, 255))]
    #[case((0, 0, 255), (120, 255, 255))]
    #[case((255, 255, 0), (30, 255, 255))]
    #[case((255, 255, 255), (0, 0, 255))]
    #[case((0, 0, 0), (0, 0, 0))]
    fn test_primary_colors(#[case] rgb: (u8, u8, u8), #[case] expected: (u8, u8, u8)) {
        assert_eq!(rgb_to_hsv(rgb.0, rgb.1, rgb.2), expected);
    }

    #[test]
    fn test_negative_hue_wraps_to_top_of_scale() {
        let (h, _, _) = rgb_to_hsv(255, 0, 40);
        assert!(h >= 170, "hue {h} should sit near the top of the scale");
    }
}
