//! Best-model checkpointing and resume.
//!
//! A checkpoint is one serialized snapshot per `(run name, seed)` key. Saving
//! always overwrites the key's single slot.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rand_chacha::ChaCha8Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ExperimentError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CheckpointKey {
    pub name: String,
    pub seed: u64,
}

impl CheckpointKey {
    pub fn new(name: impl Into<String>, seed: u64) -> Self {
        CheckpointKey { name: name.into(), seed }
    }
}

impl fmt::Display for CheckpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ckpt_{}_{}", self.name, self.seed)
    }
}

/// Key-value storage with exactly one slot per key.
pub trait CheckpointStore {
    /// Replaces whatever the slot held.
    fn put(&mut self, key: &CheckpointKey, payload: &str) -> Result<()>;

    fn get(&self, key: &CheckpointKey) -> Result<Option<String>>;
}

/// One JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileCheckpointStore { dir: dir.into() }
    }

    pub fn path_for(&self, key: &CheckpointKey) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn put(&mut self, key: &CheckpointKey, payload: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        // Write then rename so a crash never leaves a half-written slot.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn get(&self, key: &CheckpointKey) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }
}

/// In-process store, mostly for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointStore {
    slots: HashMap<CheckpointKey, String>,
    pub writes: usize,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn put(&mut self, key: &CheckpointKey, payload: &str) -> Result<()> {
        self.slots.insert(key.clone(), payload.to_string());
        self.writes += 1;
        Ok(())
    }

    fn get(&self, key: &CheckpointKey) -> Result<Option<String>> {
        Ok(self.slots.get(key).cloned())
    }
}

impl<S: CheckpointStore + ?Sized> CheckpointStore for &mut S {
    fn put(&mut self, key: &CheckpointKey, payload: &str) -> Result<()> {
        (**self).put(key, payload)
    }

    fn get(&self, key: &CheckpointKey) -> Result<Option<String>> {
        (**self).get(key)
    }
}

#[derive(Serialize)]
struct CheckpointRecord<'a, M> {
    model: &'a M,
    accuracy: f64,
    epoch: usize,
    rng_state: &'a ChaCha8Rng,
}

/// A restored snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct Checkpoint<M> {
    pub model: M,
    pub accuracy: f64,
    pub epoch: usize,
    pub rng_state: ChaCha8Rng,
}

/// Mutable state of one iteration, either fresh or rebuilt from a checkpoint.
#[derive(Debug, Clone)]
pub struct RunState<M> {
    pub model: M,
    pub best_accuracy: f64,
    pub start_epoch: usize,
    pub rng: ChaCha8Rng,
}

/// Decides when the stored checkpoint is superseded and tracks the best
/// accuracy seen in the current iteration.
pub struct CheckpointManager<S> {
    store: S,
    key: CheckpointKey,
    best_accuracy: f64,
}

impl<S: CheckpointStore> CheckpointManager<S> {
    pub fn new(store: S, key: CheckpointKey) -> Self {
        CheckpointManager { store, key, best_accuracy: 0.0 }
    }

    pub fn key(&self) -> &CheckpointKey {
        &self.key
    }

    pub fn best_accuracy(&self) -> f64 {
        self.best_accuracy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Unconditionally overwrites the slot for this key.
    pub fn save<M: Serialize>(
        &mut self,
        model: &M,
        accuracy: f64,
        epoch: usize,
        rng: &ChaCha8Rng,
    ) -> Result<()> {
        let record = CheckpointRecord { model, accuracy, epoch, rng_state: rng };
        let payload = serde_json::to_string(&record)?;
        self.store.put(&self.key, &payload)?;
        info!(key = %self.key, accuracy, epoch, "saved checkpoint");
        Ok(())
    }

    /// Saves when this is the final epoch or `accuracy` strictly beats the
    /// best so far, then raises the best. Ties keep the earlier checkpoint.
    /// Returns whether a save happened.
    pub fn maybe_save<M: Serialize>(
        &mut self,
        model: &M,
        rng: &ChaCha8Rng,
        accuracy: f64,
        epoch: usize,
        is_final_epoch: bool,
    ) -> Result<bool> {
        let improved = accuracy > self.best_accuracy;
        let fire = is_final_epoch || improved;
        if fire {
            self.save(model, accuracy, epoch, rng)?;
        }
        if improved {
            self.best_accuracy = accuracy;
        }
        Ok(fire)
    }

    /// Restores the stored snapshot: the model, the best accuracy, the next
    /// epoch to run, and the generator exactly as it was at save time.
    pub fn load<M: DeserializeOwned>(&mut self) -> Result<RunState<M>> {
        let payload = self.store.get(&self.key)?.ok_or_else(|| ExperimentError::MissingCheckpoint {
            name: self.key.name.clone(),
            seed: self.key.seed,
        })?;
        let checkpoint: Checkpoint<M> = serde_json::from_str(&payload)?;
        self.best_accuracy = checkpoint.accuracy;
        info!(key = %self.key, accuracy = checkpoint.accuracy, epoch = checkpoint.epoch, "resumed from checkpoint");
        Ok(RunState {
            model: checkpoint.model,
            best_accuracy: checkpoint.accuracy,
            start_epoch: checkpoint.epoch + 1,
            rng: checkpoint.rng_state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn manager(store: &mut MemoryCheckpointStore) -> CheckpointManager<&mut MemoryCheckpointStore> {
        CheckpointManager::new(store, CheckpointKey::new("run", 7))
    }

    #[test]
    fn test_final_epoch_saves_even_without_improvement() {
        let mut store = MemoryCheckpointStore::new();
        let rng = ChaCha8Rng::seed_from_u64(0);
        let mut m = manager(&mut store);
        let epochs = 4;
        let mut saves = 0;
        for epoch in 0..epochs {
            if m.maybe_save(&vec![1.0], &rng, 0.0, epoch, epoch == epochs - 1).unwrap() {
                saves += 1;
            }
        }
        assert_eq!(saves, 1);
        assert_eq!(store.writes, 1);
    }

    #[test]
    fn test_new_best_saves_and_ties_do_not() {
        let mut store = MemoryCheckpointStore::new();
        let rng = ChaCha8Rng::seed_from_u64(0);
        let mut m = manager(&mut store);
        let accuracies = [40.0, 55.0, 55.0, 50.0, 60.0, 60.0];
        let fired: Vec<bool> = accuracies.iter().enumerate()
            .map(|(epoch, &acc)| m.maybe_save(&epoch, &rng, acc, epoch, false).unwrap())
            .collect();
        assert_eq!(fired, vec![true, true, false, false, true, false]);
        assert_eq!(m.best_accuracy(), 60.0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_load_without_checkpoint_is_missing_checkpoint_error() {
        let mut store = MemoryCheckpointStore::new();
        let err = manager(&mut store).load::<Vec<f64>>().unwrap_err();
        assert!(matches!(err, ExperimentError::MissingCheckpoint { ref name, seed: 7 } if name == "run"));
    }

    #[test]
    fn test_load_restores_best_next_epoch_and_generator() {
        let mut store = MemoryCheckpointStore::new();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let _: u64 = rng.gen();
        {
            let mut m = manager(&mut store);
            m.save(&vec![0.5, -0.5], 72.5, 3, &rng).unwrap();
        }

        let mut m = manager(&mut store);
        let state: RunState<Vec<f64>> = m.load().unwrap();
        assert_eq!(state.model, vec![0.5, -0.5]);
        assert_eq!(state.best_accuracy, 72.5);
        assert_eq!(state.start_epoch, 4);
        assert_eq!(m.best_accuracy(), 72.5);

        let mut restored = state.rng;
        let expected: Vec<u64> = (0..8).map(|_| rng.gen()).collect();
        let actual: Vec<u64> = (0..8).map(|_| restored.gen()).collect();
        assert_eq!(expected, actual);
    }

    #[test]
    fn test_file_store_keeps_one_slot_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileCheckpointStore::new(dir.path().join("checkpoint"));
        let key = CheckpointKey::new("0", 42);
        store.put(&key, "first").unwrap();
        store.put(&key, "second").unwrap();
        assert_eq!(store.get(&key).unwrap().as_deref(), Some("second"));
        assert_eq!(fs::read_dir(store.dir()).unwrap().count(), 1);
        assert!(store.path_for(&key).ends_with("ckpt_0_42.json"));
        assert_eq!(store.get(&CheckpointKey::new("0", 1)).unwrap(), None);
    }
}
