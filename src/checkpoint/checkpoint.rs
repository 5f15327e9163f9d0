use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize, Deserialize};

use crate::error::Result;

/// File name used when the caller has no preference.
pub const DEFAULT_CHECKPOINT_PATH: &str = "checkpoint.json";

/// Training state for the paired encoders: both model states are saved
/// together so a run can resume with matching vision and tactile weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint<V, T> {
    pub epoch: usize,
    pub vision: V,
    pub tactile: T,
    /// Best validation metric seen so far, if tracked.
    #[serde(default, with = "crate::math::float_serde::option")]
    pub best_metric: Option<f64>,
}

impl<V, T> Checkpoint<V, T> {
    pub fn new(epoch: usize, vision: V, tactile: T) -> Self {
        Checkpoint { epoch, vision, tactile, best_metric: None }
    }

    pub fn with_best_metric(mut self, metric: f64) -> Self {
        self.best_metric = Some(metric);
        self
    }
}

/// Serializes `state` to a pretty-printed JSON file, creating missing parent
/// directories. An existing file at `path` is overwritten.
pub fn save_checkpoint<S, P>(state: &S, path: P) -> Result<()>
where
    S: Serialize + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, state)?;
    writer.flush()?;
    tracing::info!(path = %path.display(), "checkpoint saved");
    Ok(())
}

/// Deserializes a checkpoint previously written by `save_checkpoint`.
pub fn load_checkpoint<S, P>(path: P) -> Result<S>
where
    S: DeserializeOwned,
    P: AsRef<Path>,
{
    let file = fs::File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}
