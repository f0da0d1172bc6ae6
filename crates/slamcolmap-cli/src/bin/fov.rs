use argh::FromArgs;
use std::path::PathBuf;

use slamcolmap_3d::camera::CameraIntrinsics;
use slamcolmap_io::metadata;

/// Estimate the horizontal field of view of the camera that recorded a video
#[derive(FromArgs)]
struct Args {
    /// path to the video file
    #[argh(positional)]
    video_path: PathBuf,

    /// also print pinhole intrinsics for frames of this width
    #[argh(option)]
    width: Option<u64>,

    /// frame height used with --width
    #[argh(option)]
    height: Option<u64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let args: Args = argh::from_env();

    let probe = metadata::probe_video(&args.video_path)?;
    let fov = metadata::estimate_fov(&probe);

    // only the number goes to stdout so scripts can capture it
    println!("{fov}");

    if let (Some(width), Some(height)) = (args.width, args.height) {
        let intrinsics = CameraIntrinsics::from_horizontal_fov(fov, width, height)?;
        let [fx, fy, cx, cy] = intrinsics.params();
        log::info!("PINHOLE {} {} {} {} {} {}", width, height, fx, fy, cx, cy);
    }
    Ok(())
}
