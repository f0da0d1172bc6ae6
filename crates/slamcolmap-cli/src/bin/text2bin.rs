use argh::FromArgs;
use std::path::PathBuf;

use slamcolmap_3d::{io::colmap, projector::FallbackConfig};

/// Convert a text COLMAP sparse model into the binary format
#[derive(FromArgs)]
struct Args {
    /// sparse model directory, e.g. gaussian_input/sparse/0; falls back to its text_backup folder
    #[argh(option)]
    sparse_path: PathBuf,

    /// directory for the binary files, defaults to the sparse directory
    #[argh(option)]
    output_path: Option<PathBuf>,

    /// number of random points written when the model has none
    #[argh(option, default = "500")]
    fallback_points: usize,

    /// seed of the random fallback cloud
    #[argh(option)]
    seed: Option<u64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let args: Args = argh::from_env();

    let fallback = FallbackConfig {
        num_points: args.fallback_points,
        seed: args.seed,
        ..Default::default()
    };
    let output_dir = args.output_path.as_ref().unwrap_or(&args.sparse_path);
    let reconstruction = colmap::convert_text_to_binary(&args.sparse_path, output_dir, &fallback)?;

    println!(
        "Done! Wrote {} cameras, {} images and {} points to {}",
        reconstruction.num_cameras(),
        reconstruction.num_images(),
        reconstruction.num_points(),
        output_dir.display()
    );
    Ok(())
}
