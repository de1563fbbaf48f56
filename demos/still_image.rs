use multires_inpaint as mi;
use std::error::Error;

/// Scratches a synthetic checkerboard and inpaints the scratches.
fn main() -> Result<(), Box<dyn Error>> {
    let _logger = flexi_logger::Logger::try_with_env_or_str("info")?.start()?;

    let (width, height) = (320, 240);
    let mut color = mi::image::RgbImage::from_fn(width, height, |x, y| {
        if (x / 20 + y / 20) % 2 == 0 {
            mi::image::Rgb([200, 180, 40])
        } else {
            mi::image::Rgb([30, 60, 140])
        }
    });

    // a thick diagonal scratch, painted red so it is obvious if it survives
    let mut mask = mi::image::GrayImage::from_pixel(width, height, mi::image::Luma([mi::VALID]));
    for x in 0..width {
        let center = x * height / width;
        for y in center.saturating_sub(6)..(center + 6).min(height) {
            mask.put_pixel(x, y, mi::image::Luma([mi::HOLE]));
            color.put_pixel(x, y, mi::image::Rgb([255, 0, 0]));
        }
    }

    let mut inpainter = mi::Inpainter::builder()
        .iterations(3)
        .random_search(2)
        .seed(7)
        .use_all_cores()
        .build()?;

    let mut progress = |update: mi::ProgressUpdate<'_>| {
        log::info!(
            "solved level {} of {} ({}x{})",
            update.total_levels - update.level,
            update.total_levels,
            update.image.width(),
            update.image.height()
        );
    };

    let filled = inpainter.inpaint_with_progress(&color, &mask, Some(&mut progress))?;

    std::fs::create_dir_all("out")?;
    color.save("out/still_input.png")?;
    mask.save("out/still_mask.png")?;
    filled.save("out/still_filled.png")?;

    Ok(())
}
