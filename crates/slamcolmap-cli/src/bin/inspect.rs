use argh::FromArgs;
use std::path::PathBuf;

use slamcolmap_3d::io::colmap::{self, SparseFormat};

/// Print a summary of a COLMAP sparse model
#[derive(FromArgs)]
struct Args {
    /// sparse model directory, e.g. gaussian_input/sparse/0
    #[argh(positional)]
    sparse_path: PathBuf,

    /// directory with the frame images, defaults to ../../images relative to the model
    #[argh(option)]
    images_path: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let args: Args = argh::from_env();

    if !args.sparse_path.is_dir() {
        return Err(format!("sparse folder {} does not exist", args.sparse_path.display()).into());
    }
    let format = SparseFormat::detect(&args.sparse_path);
    let reconstruction = colmap::read_sparse_model(&args.sparse_path, format)?;

    println!("Format: {:?}", format.unwrap_or_default());
    println!("Cameras: {}", reconstruction.num_cameras());
    println!("Images: {}", reconstruction.num_images());
    println!("Points: {}", reconstruction.num_points());

    if reconstruction.num_images() == 0 {
        log::warn!("the image list is empty");
        let images_path = args
            .images_path
            .unwrap_or_else(|| args.sparse_path.join("..").join("..").join("images"));
        println!("Images folder: {}", images_path.display());
        println!("Exists: {}", images_path.is_dir());
        if images_path.is_dir() {
            let mut names = std::fs::read_dir(&images_path)?
                .map(|entry| entry.map(|entry| entry.file_name()))
                .collect::<Result<Vec<_>, _>>()?;
            names.sort();
            println!("File count: {}", names.len());
            if let Some(first) = names.first() {
                println!("First file: {}", first.to_string_lossy());
            }
        }
    }
    Ok(())
}
