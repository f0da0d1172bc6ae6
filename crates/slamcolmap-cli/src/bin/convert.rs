use argh::FromArgs;
use std::{fs::File, io::BufReader, path::PathBuf};

use slamcolmap_3d::{
    io::colmap::{self, SparseFormat},
    pipeline::{self, ConversionConfig},
};
use slamcolmap_io::{archive, layout::OutputLayout};

/// Convert a SLAM output archive into COLMAP images and a sparse model
#[derive(FromArgs)]
struct Args {
    /// path to the .npz archive with images, poses, intrinsics and depths
    #[argh(option)]
    npz_path: PathBuf,

    /// output directory, receives images/ and sparse/0/
    #[argh(option)]
    output_path: PathBuf,

    /// sparse model format: text or binary
    #[argh(option)]
    format: Option<SparseFormat>,

    /// JSON file with the conversion configuration
    #[argh(option)]
    config: Option<PathBuf>,

    /// use every n-th frame for back-projection
    #[argh(option)]
    frame_step: Option<usize>,

    /// sample every n-th pixel for back-projection
    #[argh(option)]
    pixel_step: Option<usize>,

    /// smallest accepted depth
    #[argh(option)]
    depth_min: Option<f64>,

    /// largest accepted depth
    #[argh(option)]
    depth_max: Option<f64>,

    /// number of random points when no depth is usable
    #[argh(option)]
    fallback_points: Option<usize>,

    /// seed of the random fallback cloud
    #[argh(option)]
    seed: Option<u64>,

    /// extension of the written frames: jpg, jpeg or png
    #[argh(option)]
    image_extension: Option<String>,
}

impl Args {
    fn conversion_config(&self) -> Result<ConversionConfig, Box<dyn std::error::Error>> {
        let mut config: ConversionConfig = match &self.config {
            Some(path) => serde_json::from_reader(BufReader::new(File::open(path)?))?,
            None => ConversionConfig::default(),
        };
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(frame_step) = self.frame_step {
            config.projector.frame_step = frame_step;
        }
        if let Some(pixel_step) = self.pixel_step {
            config.projector.pixel_step = pixel_step;
        }
        if let Some(depth_min) = self.depth_min {
            config.projector.depth_min = depth_min;
        }
        if let Some(depth_max) = self.depth_max {
            config.projector.depth_max = depth_max;
        }
        if let Some(num_points) = self.fallback_points {
            config.fallback.num_points = num_points;
        }
        if self.seed.is_some() {
            config.fallback.seed = self.seed;
        }
        if let Some(extension) = &self.image_extension {
            config.image_extension = extension.clone();
        }
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let args: Args = argh::from_env();
    let config = args.conversion_config()?;

    log::info!("loading {}", args.npz_path.display());
    let sequence = archive::read_slam_archive(&args.npz_path)?;

    let (reconstruction, report) = pipeline::convert(&sequence, &config)?;

    let layout = OutputLayout::new(&args.output_path);
    layout.create()?;
    layout.write_frames(&sequence, &config.image_extension)?;
    colmap::write_sparse_model(layout.sparse_dir(), &reconstruction, config.format)?;
    layout.write_report(&report)?;

    if report.used_fallback {
        log::warn!("the point cloud is synthetic, no depth was usable");
    }
    println!(
        "Done! Wrote {} images and {} points to {}",
        report.images,
        report.num_points,
        args.output_path.display()
    );
    Ok(())
}
