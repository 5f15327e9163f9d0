pub mod error;
pub mod math;
pub mod metrics;
pub mod vision;
pub mod checkpoint;
pub mod eval;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::matrix::Matrix;
pub use metrics::average_meter::AverageMeter;
pub use metrics::accuracy::accuracy;
pub use metrics::knn::find_knn;
pub use vision::image_tensor::ImageTensor;
pub use vision::gaussian_blur::GaussianBlur;
pub use checkpoint::checkpoint::{Checkpoint, save_checkpoint, load_checkpoint};
pub use eval::eval_config::EvalConfig;
pub use eval::logger::{ExperimentLogger, RunDirLogger};
pub use eval::evaluate::{evaluate_and_plot, EvalBatch, PairedModel};
