use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};

use mixup_lab::metrics::ResultsTable;
use mixup_lab::train::{CheckpointKey, CheckpointManager, EpochLog, FileCheckpointStore, RunState};
use mixup_lab::{Experiment, ExperimentConfig, ExperimentError, Network};

const CLASSES: [(&str, [u8; 3]); 4] = [
    ("blue", [20, 40, 220]),
    ("green", [30, 200, 50]),
    ("red", [210, 30, 40]),
    ("white", [240, 240, 235]),
];

/// Four classes of solid-ish images, two per class in `train` and one in `test`.
fn write_dataset(root: &Path) {
    for (split, per_class) in [("train", 2u8), ("test", 1)] {
        for (class, color) in CLASSES {
            let dir = root.join(split).join(class);
            fs::create_dir_all(&dir).unwrap();
            for i in 0..per_class {
                let img = RgbImage::from_fn(8, 8, |x, y| {
                    let jitter = ((x + y) as u8 + 3 * i) % 16;
                    Rgb([color[0].saturating_sub(jitter), color[1].saturating_sub(jitter), color[2].saturating_add(jitter / 2)])
                });
                img.save(dir.join(format!("{}.png", i))).unwrap();
            }
        }
    }
}

fn config(workdir: &Path) -> ExperimentConfig {
    ExperimentConfig {
        dataset: workdir.join("data"),
        image_size: 8,
        epoch: 2,
        batch_size: 2,
        iterations: 1,
        alpha: 1.0,
        seed: 42,
        checkpoint_dir: workdir.join("checkpoint"),
        results_dir: workdir.join("results"),
        results_file: workdir.join("experimental_results_for_mixup.csv"),
        ..Default::default()
    }
}

fn setup() -> (tempfile::TempDir, ExperimentConfig) {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(&dir.path().join("data"));
    let config = config(dir.path());
    (dir, config)
}

fn log_path(config: &ExperimentConfig) -> PathBuf {
    config.results_dir.join(format!("log_{}_{}_{}.csv", config.model, config.name, config.seed))
}

fn assert_in_range(table: &ResultsTable) {
    for row in table.rows() {
        for acc in [row.test_accuracy, row.train_accuracy] {
            assert!((0.0..=100.0).contains(&acc), "accuracy {} out of range", acc);
        }
        for v in [
            row.test_precision, row.test_recall, row.test_f1,
            row.train_precision, row.train_recall, row.train_f1,
        ] {
            assert!((0.0..=1.0).contains(&v), "metric {} out of range", v);
        }
    }
}

#[test]
fn single_iteration_writes_log_results_and_checkpoint() {
    let (_dir, config) = setup();
    let mut experiment = Experiment::from_config(config.clone()).unwrap();
    experiment.run().unwrap();

    let log = EpochLog::open(log_path(&config)).unwrap();
    let records = log.records().unwrap();
    assert_eq!(records.iter().map(|r| r.epoch).collect::<Vec<_>>(), vec![0, 1]);
    for r in &records {
        assert_eq!(r.reg_loss, 0.0);
        assert!((0.0..=100.0).contains(&r.train_accuracy));
        assert!((0.0..=100.0).contains(&r.test_accuracy));
        assert!(r.train_loss.is_finite() && r.test_loss.is_finite());
    }

    let text = fs::read_to_string(&config.results_file).unwrap();
    assert_eq!(
        text.lines().next(),
        Some("Test_Acc,Test_Pre,Test_Re,Test_F1,Train_Acc,Train_Pre,Train_Re,Train_F1")
    );
    let table = ResultsTable::load_csv(&config.results_file).unwrap();
    assert_eq!(table.len(), 1);
    assert_in_range(&table);

    // The final epoch always leaves a checkpoint behind.
    let store = FileCheckpointStore::new(&config.checkpoint_dir);
    let mut manager = CheckpointManager::new(store, CheckpointKey::new("0", 42));
    let state: RunState<Network> = manager.load().unwrap();
    assert_eq!(state.start_epoch, 2);
    assert!(config.checkpoint_dir.join("ckpt_0_42.json").is_file());
    assert_eq!(
        state.model.metadata.output_labels,
        Some(CLASSES.iter().map(|(c, _)| c.to_string()).collect::<Vec<String>>())
    );
}

#[test]
fn unseeded_iterations_each_add_a_row() {
    let (_dir, config) = setup();
    let config = ExperimentConfig { seed: 0, iterations: 3, ..config };
    let mut experiment = Experiment::from_config(config.clone()).unwrap();
    let table = experiment.run().unwrap().clone();

    assert_eq!(table.len(), 3);
    assert_in_range(&table);
    assert_eq!(ResultsTable::load_csv(&config.results_file).unwrap(), table);
    assert_eq!(EpochLog::open(log_path(&config)).unwrap().records().unwrap().len(), 6);
}

#[test]
fn resumed_run_matches_uninterrupted_run() {
    // Without momentum the checkpoint holds the whole optimizer state, so a
    // resumed run has to reproduce the uninterrupted one exactly.
    let (_a, straight) = setup();
    let straight = ExperimentConfig { momentum: 0.0, ..straight };
    let straight_rows = Experiment::from_config(straight.clone()).unwrap().run().unwrap().clone();

    let (_b, split) = setup();
    let split = ExperimentConfig { momentum: 0.0, ..split };
    Experiment::from_config(ExperimentConfig { epoch: 1, ..split.clone() }).unwrap().run().unwrap();
    let resumed_rows = Experiment::from_config(ExperimentConfig { resume: true, ..split.clone() })
        .unwrap()
        .run()
        .unwrap()
        .clone();

    assert_eq!(resumed_rows, straight_rows);
    let straight_log = EpochLog::open(log_path(&straight)).unwrap().records().unwrap();
    let split_log = EpochLog::open(log_path(&split)).unwrap().records().unwrap();
    assert_eq!(split_log, straight_log);
}

#[test]
fn resume_without_checkpoint_aborts() {
    let (_dir, config) = setup();
    let config = ExperimentConfig { resume: true, ..config };
    let err = Experiment::from_config(config.clone()).unwrap().run().unwrap_err();
    assert!(matches!(err, ExperimentError::MissingCheckpoint { seed: 42, .. }));
    assert!(!config.results_file.exists());
}

#[test]
fn bad_dataset_is_rejected_before_any_iteration() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());

    let missing = Experiment::from_config(config.clone());
    assert!(matches!(missing, Err(ExperimentError::Configuration(_))));

    fs::create_dir_all(config.dataset.join("train")).unwrap();
    fs::create_dir_all(config.dataset.join("test")).unwrap();
    let empty = Experiment::from_config(config.clone());
    assert!(matches!(empty, Err(ExperimentError::Configuration(_))));
    assert!(!config.results_file.exists());
}

#[test]
fn pretrained_backbone_gets_a_new_head() {
    let (dir, config) = setup();
    let backbone_path = dir.path().join("backbone.json");

    // A 10-class network over the same input width stands in for a backbone.
    let mut rng = <rand_chacha::ChaCha8Rng as rand::SeedableRng>::seed_from_u64(1);
    let backbone = mixup_lab::network::NetworkSpec::preset("mlp")
        .unwrap()
        .build(3 * 8 * 8, 10, &mut rng);
    backbone.save_json(&backbone_path).unwrap();

    let config = ExperimentConfig { pretrained: Some(backbone_path), ..config };
    let table = Experiment::from_config(config).unwrap().run().unwrap().clone();
    assert_eq!(table.len(), 1);
    assert_in_range(&table);
}
