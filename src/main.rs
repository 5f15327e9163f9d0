// The library holds all of the training utilities; this binary only exposes
// the blur augmentation for eyeballing its effect on real images.
//
//   cargo run -- blur <input> <output> [kernel_size]
//   cargo run --example eval_demo
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use vitac_kit::GaussianBlur;

const DEFAULT_KERNEL_SIZE: usize = 9;

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [cmd, input, output, rest @ ..] if cmd == "blur" && rest.len() <= 1 => {
            let kernel_size = match rest.first().map(|k| k.parse::<usize>()) {
                None => DEFAULT_KERNEL_SIZE,
                Some(Ok(k)) => k,
                Some(Err(e)) => {
                    tracing::error!("invalid kernel size: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            match blur_file(input, output, kernel_size) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    tracing::error!("{}", e);
                    ExitCode::FAILURE
                }
            }
        }
        _ => {
            println!("vitac-kit: training utilities for vision + tactile representation learning.");
            println!("Usage: vitac-kit blur <input> <output> [kernel_size]");
            println!("Run `cargo run --example eval_demo` for the evaluation walkthrough.");
            ExitCode::SUCCESS
        }
    }
}

fn blur_file(input: &str, output: &str, kernel_size: usize) -> vitac_kit::Result<()> {
    let img = image::open(input)?.to_rgb8();
    let blur = GaussianBlur::new(kernel_size);
    let blurred = blur.apply(&img, &mut rand::thread_rng())?;
    blurred.save(output)?;
    tracing::info!(input, output, kernel_size = blur.kernel_size(), "blurred image written");
    Ok(())
}
