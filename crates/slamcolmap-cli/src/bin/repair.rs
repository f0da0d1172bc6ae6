use argh::FromArgs;
use std::path::PathBuf;

use slamcolmap_3d::io::colmap;

/// Normalize a text COLMAP sparse model: one camera with id 1 and two lines per image
#[derive(FromArgs)]
struct Args {
    /// sparse model directory holding cameras.txt and images.txt
    #[argh(option)]
    sparse_path: PathBuf,

    /// directory for the repaired files, defaults to repairing in place
    #[argh(option)]
    output_path: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let args: Args = argh::from_env();

    let output_dir = args.output_path.as_ref().unwrap_or(&args.sparse_path);
    let report = colmap::repair_sparse_text(&args.sparse_path, output_dir)?;

    if report.cameras_dropped > 0 || report.lines_dropped > 0 {
        log::warn!(
            "dropped {} extra camera lines and {} unrecognized image lines",
            report.cameras_dropped,
            report.lines_dropped
        );
    }
    log::debug!("{}", serde_json::to_string(&report)?);

    println!(
        "Done! Repaired {} images in {}",
        report.images,
        output_dir.display()
    );
    Ok(())
}
