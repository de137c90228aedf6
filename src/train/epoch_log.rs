use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::error::Result;

/// One row of the per-epoch training log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    /// 0-based absolute epoch number.
    pub epoch: usize,
    /// Mean mixed-label loss over the training batches.
    #[serde(rename = "train loss")]
    pub train_loss: f64,
    /// Mean extra regularization loss; `0` when no extra term is used.
    #[serde(rename = "reg loss")]
    pub reg_loss: f64,
    /// Mixup-weighted training accuracy in percent.
    #[serde(rename = "train acc")]
    pub train_accuracy: f64,
    #[serde(rename = "test loss")]
    pub test_loss: f64,
    /// Test accuracy in percent.
    #[serde(rename = "test acc")]
    pub test_accuracy: f64,
}

pub const EPOCH_LOG_HEADER: [&str; 6] =
    ["epoch", "train loss", "reg loss", "train acc", "test loss", "test acc"];

/// Append-only CSV of `EpochRecord`s. The header is written once, when the
/// file is first created; reopening an existing log keeps its rows.
#[derive(Debug, Clone)]
pub struct EpochLog {
    path: PathBuf,
}

impl EpochLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<EpochLog> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        if !path.exists() {
            let mut writer = csv::Writer::from_path(&path)?;
            writer.write_record(EPOCH_LOG_HEADER)?;
            writer.flush()?;
        }
        Ok(EpochLog { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &EpochRecord) -> Result<()> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads every logged row back.
    pub fn records(&self) -> Result<Vec<EpochRecord>> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut rows = Vec::new();
        for row in reader.deserialize() {
            rows.push(row?);
        }
        Ok(rows)
    }
}
