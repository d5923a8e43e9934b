use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::shared::constants::LABELS_FILE_NAME;
use crate::shared::frame::Frame;

/// Append-only store of user-labeled crops.
///
/// Each sample is a PNG in `dir` plus one `"{image_path} {label}"` line in
/// `labels.txt`, the layout the retraining tooling reads.
pub struct LabelDataset {
    dir: PathBuf,
    next_index: usize,
}

impl LabelDataset {
    pub fn open(dir: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        fs::create_dir_all(dir)?;
        let labels = dir.join(LABELS_FILE_NAME);
        let next_index = if labels.exists() {
            fs::read_to_string(&labels)?.lines().count()
        } else {
            0
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            next_index,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn labels_path(&self) -> PathBuf {
        self.dir.join(LABELS_FILE_NAME)
    }

    /// Writes `region` and records its label. Returns the image path.
    pub fn save(
        &mut self,
        region: &Frame,
        label: &str,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let label = label.trim();
        if label.is_empty() {
            return Err("label must not be empty".into());
        }
        if region.is_empty() || region.channels() != 3 {
            return Err("cannot store an empty or non-RGB region".into());
        }

        let image_path = self
            .dir
            .join(format!("{}_{:05}.png", file_stem(label), self.next_index));
        let img = image::RgbImage::from_raw(region.width(), region.height(), region.data().to_vec())
            .ok_or("Failed to create image from region data")?;
        img.save(&image_path)?;

        let mut labels = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.labels_path())?;
        writeln!(labels, "{} {}", image_path.display(), label)?;

        self.next_index += 1;
        log::info!("Stored labeled sample '{}' at {}", label, image_path.display());
        Ok(image_path)
    }
}

fn file_stem(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
