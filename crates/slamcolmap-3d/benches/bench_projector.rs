use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use slamcolmap_3d::{
    camera::CameraIntrinsics,
    projector::{self, ProjectionInput, ProjectorConfig},
    rgbd::{ColorImage, DepthMap, RgbdImage},
};

const CAM_TO_WORLD: [[f64; 4]; 3] = [
    [1.0, 0.0, 0.0, 0.5],
    [0.0, 1.0, 0.0, -0.25],
    [0.0, 0.0, 1.0, 2.0],
];

fn bench_backproject_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("backproject_frame");

    for (width, height) in [(640, 480), (1280, 720), (1920, 1080)].iter() {
        let intrinsics = CameraIntrinsics::new(
            *width as u64,
            *height as u64,
            500.0,
            500.0,
            *width as f64 / 2.0,
            *height as f64 / 2.0,
        )
        .unwrap();
        let color = ColorImage::new(*width, *height, vec![[128, 64, 32]; width * height]).unwrap();
        let depth = DepthMap::from_constant(*width, *height, 3.0);
        let rgbd = RgbdImage::new(&color, &depth).unwrap();
        let parameter_string = format!("{}x{}", width, height);

        for pixel_step in [1, 8] {
            let config = ProjectorConfig {
                pixel_step,
                ..Default::default()
            };
            group.bench_with_input(
                BenchmarkId::new(format!("pixel_step_{pixel_step}"), &parameter_string),
                &rgbd,
                |b, rgbd| {
                    b.iter(|| {
                        black_box(projector::backproject_frame(
                            rgbd,
                            &intrinsics,
                            &CAM_TO_WORLD,
                            &config,
                        ));
                    });
                },
            );
        }
    }
}

fn bench_project_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("project_frames");

    let (width, height) = (640, 480);
    let intrinsics =
        CameraIntrinsics::new(width as u64, height as u64, 500.0, 500.0, 320.0, 240.0).unwrap();
    let color = ColorImage::new(width, height, vec![[10, 20, 30]; width * height]).unwrap();
    let depth = DepthMap::from_constant(width, height, 2.0);

    for num_frames in [10, 100] {
        let inputs = (0..num_frames)
            .map(|frame_index| ProjectionInput {
                frame_index,
                color: &color,
                depth: Some(&depth),
                cam_to_world: &CAM_TO_WORLD,
            })
            .collect::<Vec<_>>();

        group.bench_with_input(BenchmarkId::new("frames", num_frames), &inputs, |b, inputs| {
            b.iter(|| {
                black_box(
                    projector::project_frames(inputs, &intrinsics, &ProjectorConfig::default())
                        .unwrap(),
                );
            });
        });
    }
}

criterion_group!(benches, bench_backproject_frame, bench_project_frames);
criterion_main!(benches);
