use image::RgbImage;
use rand::seq::{index, SliceRandom};
use rand::Rng;

use crate::error::{Error, Result};
use crate::eval::eval_config::EvalConfig;
use crate::eval::logger::ExperimentLogger;
use crate::vision::image_tensor::ImageTensor;

/// Key under which denormalized vision samples are logged.
pub const VISION_IMAGES_KEY: &str = "Vision_Images";
/// Key under which denormalized tactile samples are logged.
pub const TACTILE_IMAGES_KEY: &str = "Tactile_Images";
/// Key of the scalar test loss.
pub const TEST_LOSS_KEY: &str = "testing loss";

/// A test batch of paired, normalized vision and tactile images.
/// `vision[i]` and `tactile[i]` were captured together, so both vectors
/// must have the same length. `new` checks this; batches assembled through
/// the public fields are checked again by `evaluate_and_plot`.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalBatch {
    pub vision: Vec<ImageTensor>,
    pub tactile: Vec<ImageTensor>,
}

impl EvalBatch {
    pub fn new(vision: Vec<ImageTensor>, tactile: Vec<ImageTensor>) -> Result<EvalBatch> {
        let batch = EvalBatch { vision, tactile };
        batch.check_paired()?;
        Ok(batch)
    }

    pub fn len(&self) -> usize {
        self.vision.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vision.is_empty()
    }

    /// Sub-batch made of the given example indices, in that order.
    pub fn select(&self, indices: &[usize]) -> EvalBatch {
        EvalBatch {
            vision: indices.iter().map(|&i| self.vision[i].clone()).collect(),
            tactile: indices.iter().map(|&i| self.tactile[i].clone()).collect(),
        }
    }

    fn check_paired(&self) -> Result<()> {
        if self.vision.len() != self.tactile.len() {
            return Err(Error::invalid(format!(
                "{} vision images but {} tactile images",
                self.vision.len(),
                self.tactile.len()
            )));
        }
        Ok(())
    }
}

/// A model that scores paired vision/tactile inputs without updating itself.
pub trait PairedModel {
    /// Loss of the model on the given pairs. Implementations must not train.
    fn eval_loss(
        &mut self,
        vision: &[ImageTensor],
        tactile: &[ImageTensor],
        epoch: usize,
    ) -> Result<f64>;
}

/// Samples a test batch, scores it and logs a visual snapshot.
///
/// One batch is drawn uniformly from `batches`, then `config.num_samples`
/// distinct examples from it. The model's loss on those examples is logged
/// under `"testing loss"` and the denormalized images under
/// `"Vision_Images"` / `"Tactile_Images"`, all at step
/// `epoch * batches.len()`.
///
/// Returns the test loss.
///
/// The scalar is logged last, only once both image groups were accepted.
/// Logging is not transactional: if the tactile group fails, the vision
/// images already handed to `logger` stay where it put them.
///
/// # Errors
/// `InvalidArgument` for an invalid config, an empty batch list, unpaired
/// batches or a chosen batch smaller than `num_samples`. Model and logger
/// errors are passed through.
pub fn evaluate_and_plot<M, L, R>(
    model: &mut M,
    batches: &[EvalBatch],
    epoch: usize,
    config: &EvalConfig,
    logger: &mut L,
    rng: &mut R,
) -> Result<f64>
where
    M: PairedModel + ?Sized,
    L: ExperimentLogger + ?Sized,
    R: Rng + ?Sized,
{
    config.validate()?;

    let batch = batches
        .choose(rng)
        .ok_or_else(|| Error::invalid("no test batches to evaluate"))?;
    batch.check_paired()?;
    if batch.len() < config.num_samples {
        return Err(Error::invalid(format!(
            "batch holds {} examples, {} requested",
            batch.len(),
            config.num_samples
        )));
    }

    let indices = index::sample(rng, batch.len(), config.num_samples).into_vec();
    let selected = batch.select(&indices);

    let test_loss = model.eval_loss(&selected.vision, &selected.tactile, epoch)?;

    let vision_images = to_display_images(&selected.vision, config)?;
    let tactile_images = to_display_images(&selected.tactile, config)?;

    let step = epoch * batches.len();
    logger.log_images(VISION_IMAGES_KEY, &vision_images, step)?;
    logger.log_images(TACTILE_IMAGES_KEY, &tactile_images, step)?;
    logger.log_scalar(TEST_LOSS_KEY, test_loss, step)?;

    tracing::info!("Test Loss: {:.4}", test_loss);
    Ok(test_loss)
}

/// Denormalizes copies of `tensors` and turns them into displayable images.
fn to_display_images(tensors: &[ImageTensor], config: &EvalConfig) -> Result<Vec<RgbImage>> {
    tensors
        .iter()
        .map(|tensor| {
            let mut display = tensor.clone();
            display
                .denormalize(&config.denorm_mean, &config.denorm_std)
                .clip(0.0, 1.0);
            display.to_rgb_image()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    /// Mean of the red channel of every input, so tests can see what was fed.
    struct MeanModel {
        calls: Vec<(Vec<f64>, usize)>,
    }

    impl PairedModel for MeanModel {
        fn eval_loss(
            &mut self,
            vision: &[ImageTensor],
            tactile: &[ImageTensor],
            epoch: usize,
        ) -> Result<f64> {
            assert_eq!(vision.len(), tactile.len());
            let seen: Vec<f64> = vision.iter().map(|t| t.channels[0].get(0, 0)).collect();
            let loss = seen.iter().sum::<f64>() / seen.len() as f64;
            self.calls.push((seen, epoch));
            Ok(loss)
        }
    }

    struct FailingModel;

    impl PairedModel for FailingModel {
        fn eval_loss(&mut self, _: &[ImageTensor], _: &[ImageTensor], _: usize) -> Result<f64> {
            Err(Error::invalid("model exploded"))
        }
    }

    #[derive(Default)]
    struct RecordingLogger {
        images: Vec<(String, Vec<RgbImage>, usize)>,
        scalars: Vec<(String, f64, usize)>,
        /// Image key whose upload fails.
        fail_on: Option<&'static str>,
    }

    impl ExperimentLogger for RecordingLogger {
        fn log_images(&mut self, key: &str, images: &[RgbImage], step: usize) -> Result<()> {
            if self.fail_on == Some(key) {
                return Err(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")));
            }
            self.images.push((key.to_string(), images.to_vec(), step));
            Ok(())
        }

        fn log_scalar(&mut self, key: &str, value: f64, step: usize) -> Result<()> {
            self.scalars.push((key.to_string(), value, step));
            Ok(())
        }
    }

    /// Example `i` of batch `b` is filled with `b * 100 + i` (normalized space).
    fn batches(count: usize, size: usize) -> Vec<EvalBatch> {
        (0..count)
            .map(|b| {
                let tensors: Vec<ImageTensor> = (0..size)
                    .map(|i| ImageTensor::filled(3, 2, 2, (b * 100 + i) as f64))
                    .collect();
                EvalBatch::new(tensors.clone(), tensors).unwrap()
            })
            .collect()
    }

    fn identity_config(num_samples: usize) -> EvalConfig {
        EvalConfig::new(vec![0.0; 3], vec![1.0; 3], num_samples)
    }

    #[test]
    fn logs_images_and_loss_at_epoch_step() {
        let mut model = MeanModel { calls: Vec::new() };
        let mut logger = RecordingLogger::default();
        let mut rng = StdRng::seed_from_u64(11);
        let data = batches(3, 8);

        let loss = evaluate_and_plot(
            &mut model, &data, 5, &EvalConfig::default(), &mut logger, &mut rng,
        )
        .unwrap();

        assert_eq!(logger.images.len(), 2);
        assert_eq!(logger.images[0].0, VISION_IMAGES_KEY);
        assert_eq!(logger.images[1].0, TACTILE_IMAGES_KEY);
        for (_, images, step) in &logger.images {
            assert_eq!(images.len(), 4);
            assert_eq!(*step, 15);
        }
        assert_eq!(logger.scalars, vec![(TEST_LOSS_KEY.to_string(), loss, 15)]);
        assert_eq!(model.calls.len(), 1);
        assert_eq!(model.calls[0].1, 5);
    }

    #[test]
    fn samples_distinct_examples_from_one_batch() {
        let mut model = MeanModel { calls: Vec::new() };
        let mut logger = RecordingLogger::default();
        let mut rng = StdRng::seed_from_u64(2);
        let data = batches(4, 6);

        evaluate_and_plot(&mut model, &data, 0, &identity_config(6), &mut logger, &mut rng)
            .unwrap();

        let mut seen = model.calls[0].0.clone();
        let batch_id = (seen[0] / 100.0).floor();
        assert!(seen.iter().all(|v| (v / 100.0).floor() == batch_id));
        seen.sort_by(f64::total_cmp);
        seen.dedup();
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn images_are_denormalized_and_clipped() {
        let mut model = MeanModel { calls: Vec::new() };
        let mut logger = RecordingLogger::default();
        let mut rng = StdRng::seed_from_u64(0);
        let zeros = ImageTensor::filled(3, 1, 1, 0.0);
        let data = vec![EvalBatch::new(vec![zeros.clone()], vec![zeros]).unwrap()];
        let config = EvalConfig::new(vec![0.2, 0.6, 1.8], vec![1.0, 1.0, 1.0], 1);

        evaluate_and_plot(&mut model, &data, 1, &config, &mut logger, &mut rng).unwrap();

        let pixel = logger.images[0].1[0].get_pixel(0, 0).0;
        assert_eq!(pixel, [51, 153, 255]);
    }

    #[test]
    fn same_seed_same_selection() {
        let data = batches(5, 10);
        let run = |seed| {
            let mut model = MeanModel { calls: Vec::new() };
            let mut logger = RecordingLogger::default();
            let mut rng = StdRng::seed_from_u64(seed);
            evaluate_and_plot(&mut model, &data, 2, &identity_config(3), &mut logger, &mut rng)
                .unwrap();
            model.calls[0].0.clone()
        };
        assert_eq!(run(99), run(99));
    }

    #[test]
    fn empty_batch_list_fails() {
        let mut model = MeanModel { calls: Vec::new() };
        let mut logger = RecordingLogger::default();
        let mut rng = StdRng::seed_from_u64(0);
        let res = evaluate_and_plot(
            &mut model, &[], 0, &EvalConfig::default(), &mut logger, &mut rng,
        );
        assert!(matches!(res, Err(Error::InvalidArgument(_))));
        assert!(model.calls.is_empty());
    }

    #[test]
    fn batch_smaller_than_sample_count_fails() {
        let mut model = MeanModel { calls: Vec::new() };
        let mut logger = RecordingLogger::default();
        let mut rng = StdRng::seed_from_u64(0);
        let res = evaluate_and_plot(
            &mut model, &batches(2, 3), 0, &EvalConfig::default(), &mut logger, &mut rng,
        );
        assert!(matches!(res, Err(Error::InvalidArgument(_))));
        assert!(logger.images.is_empty());
    }

    #[test]
    fn unpaired_batch_is_rejected() {
        let one = ImageTensor::filled(3, 1, 1, 0.0);
        let res = EvalBatch::new(vec![one.clone(), one.clone()], vec![one]);
        assert!(matches!(res, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn model_errors_propagate_before_logging() {
        let mut logger = RecordingLogger::default();
        let mut rng = StdRng::seed_from_u64(0);
        let res = evaluate_and_plot(
            &mut FailingModel, &batches(1, 4), 0, &EvalConfig::default(), &mut logger, &mut rng,
        );
        assert!(matches!(res, Err(Error::InvalidArgument(_))));
        assert!(logger.images.is_empty());
        assert!(logger.scalars.is_empty());
    }

    #[test]
    fn tactile_logging_failure_skips_loss_and_keeps_vision() {
        let mut model = MeanModel { calls: Vec::new() };
        let mut logger = RecordingLogger { fail_on: Some(TACTILE_IMAGES_KEY), ..Default::default() };
        let mut rng = StdRng::seed_from_u64(4);

        let res = evaluate_and_plot(
            &mut model, &batches(2, 4), 1, &EvalConfig::default(), &mut logger, &mut rng,
        );

        assert!(matches!(res, Err(Error::Io(_))));
        assert_eq!(logger.images.len(), 1);
        assert_eq!(logger.images[0].0, VISION_IMAGES_KEY);
        assert!(logger.scalars.is_empty());
    }

    #[test]
    fn hand_built_unpaired_batch_is_rejected() {
        let mut model = MeanModel { calls: Vec::new() };
        let mut logger = RecordingLogger::default();
        let mut rng = StdRng::seed_from_u64(0);
        let one = ImageTensor::filled(3, 1, 1, 0.0);
        let data = vec![EvalBatch { vision: vec![one.clone(); 4], tactile: vec![one; 3] }];

        let res = evaluate_and_plot(&mut model, &data, 0, &identity_config(2), &mut logger, &mut rng);

        assert!(matches!(res, Err(Error::InvalidArgument(_))));
        assert!(model.calls.is_empty());
    }
}
