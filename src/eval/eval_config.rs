use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};

/// Settings for `evaluate_and_plot`.
///
/// # Fields
/// - `denorm_mean` — per-channel mean the dataset was normalized with
/// - `denorm_std`  — per-channel standard deviation, same length as `denorm_mean`
/// - `num_samples` — images drawn from the chosen test batch for plotting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    pub denorm_mean: Vec<f64>,
    pub denorm_std: Vec<f64>,
    #[serde(default = "default_num_samples")]
    pub num_samples: usize,
}

fn default_num_samples() -> usize {
    4
}

impl Default for EvalConfig {
    /// ImageNet channel statistics, four plotted samples.
    fn default() -> Self {
        EvalConfig {
            denorm_mean: vec![0.485, 0.456, 0.406],
            denorm_std: vec![0.229, 0.224, 0.225],
            num_samples: default_num_samples(),
        }
    }
}

impl EvalConfig {
    pub fn new(denorm_mean: Vec<f64>, denorm_std: Vec<f64>, num_samples: usize) -> Self {
        EvalConfig { denorm_mean, denorm_std, num_samples }
    }

    /// Rejects configs `evaluate_and_plot` cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.denorm_mean.len() != self.denorm_std.len() {
            return Err(Error::invalid(format!(
                "denorm_mean has {} channels, denorm_std has {}",
                self.denorm_mean.len(),
                self.denorm_std.len()
            )));
        }
        if self.num_samples == 0 {
            return Err(Error::invalid("num_samples must be at least 1"));
        }
        Ok(())
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Loads and validates a config from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<EvalConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config: EvalConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}
