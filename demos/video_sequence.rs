use multires_inpaint as mi;
use std::error::Error;

const FRAMES: u32 = 12;

fn frame(t: u32, width: u32, height: u32) -> mi::image::RgbImage {
    // horizontal stripes drifting to the right
    mi::image::RgbImage::from_fn(width, height, |x, y| {
        let band = ((x + 3 * t) / 12) % 3;
        let shade = (y * 200 / height) as u8;
        match band {
            0 => mi::image::Rgb([shade, 40, 90]),
            1 => mi::image::Rgb([20, shade, 160]),
            _ => mi::image::Rgb([230, 220, shade]),
        }
    })
}

/// A square "object" moving across the frame
fn mask(t: u32, width: u32, height: u32) -> mi::image::GrayImage {
    let left = 20 + 6 * t;
    let top = height / 3;
    mi::image::GrayImage::from_fn(width, height, |x, y| {
        if (left..left + 40).contains(&x) && (top..top + 40).contains(&y) {
            mi::image::Luma([mi::HOLE])
        } else {
            mi::image::Luma([mi::VALID])
        }
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    let _logger = flexi_logger::Logger::try_with_env_or_str("debug")?.start()?;

    let (width, height) = (200, 120);

    let mut inpainter = mi::Inpainter::builder()
        .temporal_mode(mi::TemporalMode::Video)
        .iterations(2)
        .seed(3)
        .build()?;

    std::fs::create_dir_all("out/video")?;

    for t in 0..FRAMES {
        let filled = inpainter.inpaint(&frame(t, width, height), &mask(t, width, height))?;
        filled.save(format!("out/video/{:02}.png", t))?;
    }

    log::info!(
        "inpainted {} frames over a {} level pyramid",
        FRAMES,
        inpainter.level_count()
    );

    Ok(())
}
