use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::metrics::report::ClassificationReport;

pub const RESULTS_HEADER: [&str; 8] = [
    "Test_Acc", "Test_Pre", "Test_Re", "Test_F1",
    "Train_Acc", "Train_Pre", "Train_Re", "Train_F1",
];

/// Metrics of one completed iteration: test set first, train set second.
/// Accuracies are percentages, the rest are macro averages in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultsRow {
    #[serde(rename = "Test_Acc")]
    pub test_accuracy: f64,
    #[serde(rename = "Test_Pre")]
    pub test_precision: f64,
    #[serde(rename = "Test_Re")]
    pub test_recall: f64,
    #[serde(rename = "Test_F1")]
    pub test_f1: f64,
    #[serde(rename = "Train_Acc")]
    pub train_accuracy: f64,
    #[serde(rename = "Train_Pre")]
    pub train_precision: f64,
    #[serde(rename = "Train_Re")]
    pub train_recall: f64,
    #[serde(rename = "Train_F1")]
    pub train_f1: f64,
}

impl ResultsRow {
    pub fn from_reports(test: &ClassificationReport, train: &ClassificationReport) -> Self {
        ResultsRow {
            test_accuracy: 100.0 * test.accuracy,
            test_precision: test.macro_avg.precision,
            test_recall: test.macro_avg.recall,
            test_f1: test.macro_avg.f1,
            train_accuracy: 100.0 * train.accuracy,
            train_precision: train.macro_avg.precision,
            train_recall: train.macro_avg.recall,
            train_f1: train.macro_avg.f1,
        }
    }
}

/// Rows accumulated across iterations of one process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsTable {
    rows: Vec<ResultsRow>,
}

impl ResultsTable {
    pub fn new() -> Self {
        ResultsTable::default()
    }

    pub fn push(&mut self, row: ResultsRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[ResultsRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rewrites `path` with the header and every row so far.
    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
        writer.write_record(RESULTS_HEADER)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn load_csv(path: impl AsRef<Path>) -> Result<ResultsTable> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut rows = Vec::new();
        for row in reader.deserialize() {
            rows.push(row?);
        }
        Ok(ResultsTable { rows })
    }
}
