//! Evaluation walkthrough on synthetic vision/tactile pairs.
//!
//! Each tactile image is a blurred, normalized copy of its vision partner.
//! The "model" embeds every image as its per-channel mean and scores a pair
//! by embedding distance, which is enough to exercise:
//!   - AverageMeter bookkeeping across batches
//!   - top-1 / top-3 cross-modal retrieval accuracy
//!   - k-nearest-neighbour lookup in embedding space
//!   - evaluate_and_plot writing PNGs + metrics.jsonl
//!   - checkpoint save / load
//!
//! Run with:
//!   cargo run --example eval_demo
use image::{Rgb, RgbImage};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

use vitac_kit::{
    accuracy, evaluate_and_plot, find_knn, load_checkpoint, save_checkpoint, AverageMeter,
    Checkpoint, EvalBatch, EvalConfig, GaussianBlur, ImageTensor, Matrix, PairedModel,
    RunDirLogger,
};

const BATCHES: usize = 3;
const BATCH_SIZE: usize = 8;
const SIDE: u32 = 16;

// ---------------------------------------------------------------------------
// Synthetic data
// ---------------------------------------------------------------------------

fn random_scene(rng: &mut StdRng) -> RgbImage {
    let base: [f64; 3] = [rng.gen(), rng.gen(), rng.gen()];
    RgbImage::from_fn(SIDE, SIDE, |x, y| {
        let shade = (x + y) as f64 / (2 * SIDE) as f64;
        let px = |c: usize| ((base[c] * 0.8 + shade * 0.2) * 255.0) as u8;
        Rgb([px(0), px(1), px(2)])
    })
}

fn make_batches(config: &EvalConfig, rng: &mut StdRng) -> vitac_kit::Result<Vec<EvalBatch>> {
    let blur = GaussianBlur::new(5);
    let mut batches = Vec::with_capacity(BATCHES);
    for _ in 0..BATCHES {
        let mut vision = Vec::with_capacity(BATCH_SIZE);
        let mut tactile = Vec::with_capacity(BATCH_SIZE);
        for _ in 0..BATCH_SIZE {
            let scene = random_scene(rng);
            let touch = blur.apply(&scene, rng)?;

            let mut v = ImageTensor::from_rgb_image(&scene);
            v.normalize(&config.denorm_mean, &config.denorm_std);
            let mut t = ImageTensor::from_rgb_image(&touch);
            t.normalize(&config.denorm_mean, &config.denorm_std);

            vision.push(v);
            tactile.push(t);
        }
        batches.push(EvalBatch::new(vision, tactile)?);
    }
    Ok(batches)
}

// ---------------------------------------------------------------------------
// Toy model
// ---------------------------------------------------------------------------

fn embed(tensor: &ImageTensor) -> Vec<f64> {
    tensor.channels
        .iter()
        .map(|plane| {
            let n = (plane.rows * plane.cols) as f64;
            plane.data.iter().flatten().sum::<f64>() / n
        })
        .collect()
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}

struct MeanEmbeddingModel;

impl PairedModel for MeanEmbeddingModel {
    fn eval_loss(
        &mut self,
        vision: &[ImageTensor],
        tactile: &[ImageTensor],
        _epoch: usize,
    ) -> vitac_kit::Result<f64> {
        let total: f64 = vision.iter().zip(tactile)
            .map(|(v, t)| distance(&embed(v), &embed(t)))
            .sum();
        Ok(total / vision.len() as f64)
    }
}

/// Row i scores vision i against every tactile image; the true match is i.
fn similarity_scores(batch: &EvalBatch) -> vitac_kit::Result<Matrix> {
    let tactile: Vec<Vec<f64>> = batch.tactile.iter().map(embed).collect();
    Matrix::from_data(
        batch.vision
            .iter()
            .map(|v| {
                let ev = embed(v);
                tactile.iter().map(|et| -distance(&ev, et)).collect()
            })
            .collect(),
    )
}

fn main() -> vitac_kit::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut rng = StdRng::seed_from_u64(2024);
    let config = EvalConfig::default();
    let batches = make_batches(&config, &mut rng)?;

    // --- Retrieval accuracy with running meters ---
    let mut model = MeanEmbeddingModel;
    let mut loss_meter = AverageMeter::new();
    let mut top1 = AverageMeter::new();
    let mut top3 = AverageMeter::new();

    for (i, batch) in batches.iter().enumerate() {
        let loss = model.eval_loss(&batch.vision, &batch.tactile, 0)?;
        let targets: Vec<usize> = (0..batch.len()).collect();
        let acc = accuracy(&similarity_scores(batch)?, &targets, &[1, 3])?;

        loss_meter.update(loss, batch.len());
        top1.update(acc[0], batch.len());
        top3.update(acc[1], batch.len());
        println!(
            "batch {}  loss {}  acc@1 {}  acc@3 {}",
            i, loss_meter, top1, top3
        );
    }
    println!(
        "\nepoch summary: loss {:.4}  acc@1 {:.2}%  acc@3 {:.2}%",
        loss_meter.avg(), top1.avg(), top3.avg()
    );

    // --- Nearest neighbours of the first vision image among tactile images ---
    let first = &batches[0];
    let tactile_embeddings = Matrix::from_data(first.tactile.iter().map(embed).collect())?;
    let neighbours = find_knn(&embed(&first.vision[0]), &tactile_embeddings, 3)?;
    println!("nearest tactile images to vision #0: {:?}", neighbours);

    // --- Visual snapshot ---
    let run_dir = std::env::temp_dir().join("vitac-eval-demo");
    let mut logger = RunDirLogger::new(&run_dir)?;
    let test_loss = evaluate_and_plot(&mut model, &batches, 1, &config, &mut logger, &mut rng)?;
    println!("snapshot written to {} (test loss {:.4})", run_dir.display(), test_loss);

    // --- Checkpoint ---
    let ckpt_path = run_dir.join("checkpoint.json");
    let ckpt = Checkpoint::new(1, loss_meter.clone(), top1.clone()).with_best_metric(top1.avg());
    save_checkpoint(&ckpt, &ckpt_path)?;
    let restored: Checkpoint<AverageMeter, AverageMeter> = load_checkpoint(&ckpt_path)?;
    println!("checkpoint restored: epoch {}, best acc@1 {:?}", restored.epoch, restored.best_metric);

    Ok(())
}
