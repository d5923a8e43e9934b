use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::domain::color_classifier::ColorClassifier;

use super::clustering_color_classifier::ClusteringColorClassifier;
use super::histogram_color_classifier::HistogramColorClassifier;

/// Which color classification strategy the pipeline runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorStrategy {
    #[default]
    Histogram,
    Clustering,
}

impl fmt::Display for ColorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorStrategy::Histogram => write!(f, "histogram"),
            ColorStrategy::Clustering => write!(f, "clustering"),
        }
    }
}

impl FromStr for ColorStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "histogram" => Ok(ColorStrategy::Histogram),
            "clustering" | "kmeans" => Ok(ColorStrategy::Clustering),
            other => Err(format!(
                "unknown color strategy '{other}' (expected histogram or clustering)"
            )),
        }
    }
}

pub fn create_classifier(strategy: ColorStrategy) -> Box<dyn ColorClassifier> {
    log::info!("Using {strategy} color classifier");
    match strategy {
        ColorStrategy::Histogram => Box::new(HistogramColorClassifier::new()),
        ColorStrategy::Clustering => Box::new(ClusteringColorClassifier::new()),
    }
}
