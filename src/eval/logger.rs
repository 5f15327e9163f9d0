use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};

/// Sink for evaluation artifacts: image panels and scalar series keyed by
/// name and global step.
pub trait ExperimentLogger {
    fn log_images(&mut self, key: &str, images: &[RgbImage], step: usize) -> Result<()>;
    fn log_scalar(&mut self, key: &str, value: f64, step: usize) -> Result<()>;
}

/// One line of `metrics.jsonl`. Non-finite values are written as
/// `"NaN"`, `"inf"` or `"-inf"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarRecord {
    pub key: String,
    #[serde(with = "crate::math::float_serde")]
    pub value: f64,
    pub step: usize,
}

/// Writes everything under a local run directory:
///
/// - images as `<dir>/<key>/step_<step>_<i>.png`
/// - scalars appended as JSON lines to `<dir>/metrics.jsonl`
pub struct RunDirLogger {
    dir: PathBuf,
}

impl RunDirLogger {
    /// Creates `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<RunDirLogger> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(RunDirLogger { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.dir.join("metrics.jsonl")
    }

    /// Reads back every scalar logged so far, in logging order.
    pub fn read_scalars(&self) -> Result<Vec<ScalarRecord>> {
        let path = self.metrics_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        fs::read_to_string(path)?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str::<ScalarRecord>(line).map_err(Error::from))
            .collect()
    }
}

impl ExperimentLogger for RunDirLogger {
    fn log_images(&mut self, key: &str, images: &[RgbImage], step: usize) -> Result<()> {
        let key_dir = self.dir.join(sanitize_key(key));
        fs::create_dir_all(&key_dir)?;
        for (i, img) in images.iter().enumerate() {
            img.save(key_dir.join(format!("step_{}_{}.png", step, i)))?;
        }
        tracing::debug!(key, step, count = images.len(), "logged images");
        Ok(())
    }

    fn log_scalar(&mut self, key: &str, value: f64, step: usize) -> Result<()> {
        let record = ScalarRecord { key: key.to_string(), value, step };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.metrics_path())?;
        serde_json::to_writer(&mut file, &record)?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

/// Keys become directory names; anything outside `[A-Za-z0-9_-]` maps to `_`.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
