pub mod checkpoint;
pub mod epoch;
pub mod epoch_log;
pub mod experiment;
pub mod mixup;
pub mod scheduler;

pub use checkpoint::{
    Checkpoint, CheckpointKey, CheckpointManager, CheckpointStore, FileCheckpointStore,
    MemoryCheckpointStore, RunState,
};
pub use epoch::{evaluate_epoch, train_epoch, EvalStats, TrainStats};
pub use epoch_log::{EpochLog, EpochRecord};
pub use experiment::Experiment;
pub use mixup::{mixup_batch, sample_lambda, MixedBatch};
pub use scheduler::StepDecay;
