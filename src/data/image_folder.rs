//! Loads an image classification dataset laid out as
//!
//! ```text
//! <root>/train/<class>/<image>
//! <root>/test/<class>/<image>
//! ```
//!
//! Class indices follow the sorted class folder names. Every image is decoded,
//! resized to a square, converted to RGB, normalized per channel and flattened
//! channel-major.

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use tracing::info;

use crate::data::dataset::{Dataset, ImageShape};
use crate::error::{ExperimentError, Result};

/// Per-channel normalization mean (R, G, B).
pub const CHANNEL_MEAN: [f64; 3] = [0.4914, 0.4822, 0.4465];
/// Per-channel normalization standard deviation (R, G, B).
pub const CHANNEL_STD: [f64; 3] = [0.2023, 0.1994, 0.2010];

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

/// Normalized value of a black pixel in each channel.
pub fn normalized_black() -> Vec<f64> {
    CHANNEL_MEAN.iter().zip(CHANNEL_STD.iter()).map(|(m, s)| -m / s).collect()
}

pub struct ImageFolder {
    pub root: PathBuf,
    pub image_size: u32,
}

impl ImageFolder {
    pub fn new(root: impl Into<PathBuf>, image_size: u32) -> Self {
        ImageFolder { root: root.into(), image_size }
    }

    /// Loads both splits. The class folders of `train` and `test` must match.
    pub fn load(&self) -> Result<(Dataset, Dataset)> {
        if !self.root.is_dir() {
            return Err(ExperimentError::configuration(format!(
                "dataset path '{}' is not a directory",
                self.root.display()
            )));
        }

        let train = self.load_split("train")?;
        let test = self.load_split("test")?;
        if train.class_names != test.class_names {
            return Err(ExperimentError::configuration(format!(
                "train classes {:?} differ from test classes {:?}",
                train.class_names, test.class_names
            )));
        }

        info!(
            root = %self.root.display(),
            classes = train.class_names.len(),
            train = train.len(),
            test = test.len(),
            "loaded image folder dataset"
        );
        Ok((train, test))
    }

    fn load_split(&self, split: &str) -> Result<Dataset> {
        let dir = self.root.join(split);
        if !dir.is_dir() {
            return Err(ExperimentError::configuration(format!(
                "missing '{}' folder in '{}'",
                split,
                self.root.display()
            )));
        }

        let class_dirs = sorted_entries(&dir, |p| p.is_dir())?;
        if class_dirs.is_empty() {
            return Err(ExperimentError::configuration(format!(
                "'{}' has no class subfolders",
                dir.display()
            )));
        }

        let size = self.image_size as usize;
        let shape = ImageShape::rgb(size, size);
        let mut class_names = Vec::with_capacity(class_dirs.len());
        let mut samples = Vec::new();
        let mut labels = Vec::new();

        for (class_idx, class_dir) in class_dirs.iter().enumerate() {
            class_names.push(
                class_dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
            );
            for file in sorted_entries(class_dir, is_image_file)? {
                samples.push(self.load_image(&file)?);
                labels.push(class_idx);
            }
        }

        if samples.is_empty() {
            return Err(ExperimentError::configuration(format!(
                "'{}' contains no images",
                dir.display()
            )));
        }

        Dataset::new(samples, labels, class_names, shape)
    }

    fn load_image(&self, path: &Path) -> Result<Vec<f64>> {
        let img = image::open(path)?;
        let resized = img.resize_exact(self.image_size, self.image_size, FilterType::Triangle);
        let rgb = resized.to_rgb8();

        let plane = (self.image_size * self.image_size) as usize;
        let mut out = vec![0.0; 3 * plane];
        for (i, pixel) in rgb.pixels().enumerate() {
            for c in 0..3 {
                let value = pixel.0[c] as f64 / 255.0;
                out[c * plane + i] = (value - CHANNEL_MEAN[c]) / CHANNEL_STD[c];
            }
        }
        Ok(out)
    }
}

fn sorted_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if keep(&path) {
            entries.push(path);
        }
    }
    entries.sort();
    Ok(entries)
}

fn is_image_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}
