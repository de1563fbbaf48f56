use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use multires_inpaint as mi;
use std::time::{Duration, Instant};

static DIM: u32 = 32;

fn scene(dim: u32) -> (mi::image::RgbImage, mi::image::GrayImage) {
    let color = mi::image::RgbImage::from_fn(dim, dim, |x, y| {
        let v = ((x / 4 + y / 6) % 5) as u8 * 50;
        mi::image::Rgb([v, (x * 255 / dim) as u8, 255 - v])
    });

    // a centered square hole covering a ninth of the image
    let (lo, hi) = (dim / 3, 2 * dim / 3);
    let mask = mi::image::GrayImage::from_fn(dim, dim, |x, y| {
        let hole = (lo..hi).contains(&x) && (lo..hi).contains(&y);
        mi::image::Luma([if hole { mi::HOLE } else { mi::VALID }])
    });

    (color, mask)
}

fn still_image(c: &mut Criterion) {
    let mut group = c.benchmark_group("still_image");
    group.sample_size(10);

    for dim in [DIM, 2 * DIM, 4 * DIM, 8 * DIM].iter() {
        let (color, mask) = scene(*dim);

        group.bench_with_input(BenchmarkId::from_parameter(dim), dim, |b, _| {
            b.iter_custom(|iters| {
                let mut total_elapsed = Duration::new(0, 0);
                for _i in 0..iters {
                    let mut inpainter = mi::Inpainter::builder().seed(120).build().unwrap();

                    let start = Instant::now();
                    black_box(inpainter.inpaint(&color, &mask).unwrap());
                    total_elapsed += start.elapsed();
                }

                total_elapsed
            });
        });
    }
    group.finish();
}

fn threaded(c: &mut Criterion) {
    let (color, mask) = scene(8 * DIM);

    let mut group = c.benchmark_group("threaded");
    group.sample_size(10);

    for threads in [1, 2, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(threads),
            threads,
            |b, &threads| {
                let mut inpainter = mi::Inpainter::builder()
                    .seed(120)
                    .max_thread_count(threads)
                    .build()
                    .unwrap();

                b.iter(|| black_box(inpainter.inpaint(&color, &mask).unwrap()));
            },
        );
    }
    group.finish();
}

fn video_frame(c: &mut Criterion) {
    let (color, mask) = scene(4 * DIM);

    let mut group = c.benchmark_group("video_frame");
    group.sample_size(10);

    // warm frames only, the first frame of the sequence is solved up front
    let mut inpainter = mi::Inpainter::builder()
        .temporal_mode(mi::TemporalMode::Video)
        .seed(120)
        .build()
        .unwrap();
    inpainter.inpaint(&color, &mask).unwrap();

    group.bench_function("warm", |b| {
        b.iter(|| black_box(inpainter.inpaint(&color, &mask).unwrap()));
    });
    group.finish();
}

criterion_group!(benches, still_image, threaded, video_frame);
criterion_main!(benches);
