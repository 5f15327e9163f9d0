pub mod average_meter;
pub mod accuracy;
pub mod knn;

pub use average_meter::AverageMeter;
pub use accuracy::{accuracy, ranked_classes};
pub use knn::find_knn;
