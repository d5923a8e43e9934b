//! Maps a (material, color) pair to a physical drop location.
//!
//! The registry is built once from configuration and never mutated; every
//! lookup resolves, falling back to the `"unknown"` bin.
use std::collections::BTreeMap;
use std::fmt;

use crate::color::domain::color_label::ColorLabel;
use crate::shared::config::default_bins;
use crate::shared::constants::UNKNOWN_BIN_KEY;
use crate::shared::error::SortingError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BinCoordinate {
    pub x: i32,
    pub y: i32,
}

impl BinCoordinate {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for BinCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BinRegistry {
    bins: BTreeMap<String, BinCoordinate>,
    fallback: BinCoordinate,
}

impl BinRegistry {
    /// Rejects a table without an `"unknown"` entry.
    pub fn new(bins: BTreeMap<String, BinCoordinate>) -> Result<Self, SortingError> {
        let fallback = *bins.get(UNKNOWN_BIN_KEY).ok_or_else(|| {
            SortingError::Config(format!("bin table has no \"{UNKNOWN_BIN_KEY}\" entry"))
        })?;
        Ok(Self { bins, fallback })
    }

    pub fn from_config(bins: &BTreeMap<String, [i32; 2]>) -> Result<Self, SortingError> {
        Self::new(
            bins.iter()
                .map(|(key, [x, y])| (key.clone(), BinCoordinate::new(*x, *y)))
                .collect(),
        )
    }

    pub fn fallback(&self) -> BinCoordinate {
        self.fallback
    }

    pub fn get(&self, key: &str) -> Option<BinCoordinate> {
        self.bins.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

impl Default for BinRegistry {
    fn default() -> Self {
        let bins = default_bins()
            .into_iter()
            .map(|(key, [x, y])| (key, BinCoordinate::new(x, y)))
            .collect::<BTreeMap<_, _>>();
        let fallback = bins
            .get(UNKNOWN_BIN_KEY)
            .copied()
            .unwrap_or(BinCoordinate::new(900, 200));
        Self { bins, fallback }
    }
}

pub fn bin_key(class_label: &str, color: ColorLabel) -> String {
    format!("{class_label}_{color}")
}

/// Resolves the drop bin for an object. Never fails.
pub fn route(registry: &BinRegistry, class_label: &str, color: ColorLabel) -> BinCoordinate {
    if color == ColorLabel::Unknown {
        return registry.fallback();
    }
    registry
        .get(&bin_key(class_label, color))
        .unwrap_or_else(|| registry.fallback())
}

/// Outcome of classifying and routing one object; lives for a single tick.
#[derive(Clone, Debug, PartialEq)]
pub struct SortDecision {
    pub class_label: String,
    pub color: ColorLabel,
    pub bin: BinCoordinate,
}

impl SortDecision {
    pub fn resolve(registry: &BinRegistry, class_label: &str, color: ColorLabel) -> Self {
        Self {
            class_label: class_label.to_string(),
            color,
            bin: route(registry, class_label, color),
        }
    }
}
