//! Dominant-color classifier based on single-centroid clustering.
//!
//! The region is downsampled, dark pixels are discarded, the remainder is
//! reduced to one centroid and the nearest reference color wins. The last
//! centroid is cached against a fingerprint of the downsampled bytes.
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::color::domain::color_classifier::ColorClassifier;
use crate::color::domain::color_label::ColorLabel;
use crate::shared::frame::Frame;

use super::hsv::rgb_to_hsv;
use super::kmeans::{distance_sq, kmeans};

const SAMPLE_SIZE: usize = 50;
const DARK_VALUE: u8 = 50;
const MIN_VALID_PIXELS: usize = 50;
const MAX_ITERATIONS: usize = 10;
const CONVERGENCE_EPSILON: f64 = 1.0;

const REFERENCE_COLORS: &[([f64; 3], ColorLabel)] = &[
    ([255.0, 255.0, 255.0], ColorLabel::White),
    ([255.0, 0.0, 0.0], ColorLabel::Red),
    ([0.0, 128.0, 0.0], ColorLabel::Green),
    ([0.0, 0.0, 255.0], ColorLabel::Blue),
    ([56.0, 28.0, 8.0], ColorLabel::Brown),
    ([255.0, 255.0, 0.0], ColorLabel::Yellow),
];

/// Transient result of one clustering pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorSample {
    pub dominant: [u8; 3],
    pub fingerprint: u64,
}

#[derive(Default)]
pub struct ClusteringColorClassifier {
    last: Option<ColorSample>,
    cluster_runs: usize,
}

impl ClusteringColorClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the clustering step actually ran.
    pub fn cluster_runs(&self) -> usize {
        self.cluster_runs
    }

    fn dominant_color(&mut self, sample: &[u8], fingerprint: u64) -> Option<[u8; 3]> {
        match self.last {
            Some(cached) if cached.fingerprint == fingerprint => return Some(cached.dominant),
            // A new region always evicts the previous sample.
            _ => self.last = None,
        }

        let points: Vec<[f64; 3]> = sample
            .chunks_exact(3)
            .filter(|px| rgb_to_hsv(px[0], px[1], px[2]).2 >= DARK_VALUE)
            .map(|px| [px[0] as f64, px[1] as f64, px[2] as f64])
            .collect();
        if points.len() < MIN_VALID_PIXELS {
            return None;
        }

        self.cluster_runs += 1;
        let centroid = kmeans(&points, 1, MAX_ITERATIONS, CONVERGENCE_EPSILON)
            .into_iter()
            .next()?;
        let dominant = centroid.map(|c| c.round().clamp(0.0, 255.0) as u8);
        self.last = Some(ColorSample {
            dominant,
            fingerprint,
        });
        Some(dominant)
    }
}

impl ColorClassifier for ClusteringColorClassifier {
    fn classify(&mut self, region: &Frame) -> ColorLabel {
        if region.is_empty() || !region.is_well_formed() || region.channels() < 3 {
            return ColorLabel::Unknown;
        }
        let sample = downsample(region, SAMPLE_SIZE);
        let fingerprint = fingerprint(&sample);
        match self.dominant_color(&sample, fingerprint) {
            Some(rgb) => nearest_reference(rgb),
            None => ColorLabel::Unknown,
        }
    }
}

/// Nearest-neighbor resize to `size` × `size`, dropping any alpha channel.
fn downsample(region: &Frame, size: usize) -> Vec<u8> {
    let src = region.as_ndarray();
    let src_h = region.height() as usize;
    let src_w = region.width() as usize;
    let mut out = Vec::with_capacity(size * size * 3);
    for y in 0..size {
        let sy = (y * src_h / size).min(src_h - 1);
        for x in 0..size {
            let sx = (x * src_w / size).min(src_w - 1);
            for c in 0..3 {
                out.push(src[[sy, sx, c]]);
            }
        }
    }
    out
}

fn fingerprint(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

fn nearest_reference(rgb: [u8; 3]) -> ColorLabel {
    let p = rgb.map(f64::from);
    REFERENCE_COLORS
        .iter()
        .min_by(|a, b| {
            distance_sq(&a.0, &p)
                .partial_cmp(&distance_sq(&b.0, &p))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(_, label)| *label)
        .unwrap_or(ColorLabel::Unknown)
}
