pub mod report;
pub mod results;

pub use report::{predict, ClassMetrics, ClassificationReport, MetricSummary};
pub use results::{ResultsRow, ResultsTable, RESULTS_HEADER};
