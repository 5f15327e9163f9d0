pub mod eval_config;
pub mod logger;
pub mod evaluate;

pub use eval_config::EvalConfig;
pub use logger::{ExperimentLogger, RunDirLogger, ScalarRecord};
pub use evaluate::{evaluate_and_plot, EvalBatch, PairedModel};
