pub mod checkpoint;

pub use checkpoint::{Checkpoint, save_checkpoint, load_checkpoint, DEFAULT_CHECKPOINT_PATH};
