use log::debug;

use crate::img_pyramid::Pyramid;
use crate::level::Level;
use crate::utils::{box_blur_alpha, composite};
use crate::*;

/// Inpainting engine.
///
/// Owns the resolution pyramid and, in [`TemporalMode::Video`], the per level
/// state of the previous frame. Every call to `inpaint` takes `&mut self`,
/// so frames of one sequence are always processed one after another.
///
/// # Example
/// ```no_run
/// let mut inpainter = multires_inpaint::Inpainter::builder()
///     .seed(10)
///     .iterations(2)
///     .build().expect("failed to build inpainter");
///
/// let color = image::open("imgs/street.png").unwrap().to_rgb();
/// let mask = image::open("imgs/street_mask.png").unwrap().to_luma();
///
/// let filled = inpainter.inpaint(&color, &mask).expect("failed to inpaint");
/// filled.save("filled.png").expect("failed to save image");
/// ```
pub struct Inpainter {
    params: Parameters,
    pyramid: Option<Pyramid>,
}

impl Inpainter {
    /// Creates a new builder with default parameters.
    pub fn builder() -> InpainterBuilder {
        InpainterBuilder::default()
    }

    /// Fills the holes of `color`, the pixels whose `mask` value is below
    /// 255, and returns the completed image.
    pub fn inpaint(
        &mut self,
        color: &image::RgbImage,
        mask: &image::GrayImage,
    ) -> Result<image::RgbImage, Error> {
        self.inpaint_with_progress(color, mask, None)
    }

    /// Same as `inpaint`, for images that still need their layout checked.
    /// The color image must be 8-bit RGB and the mask 8-bit luma.
    pub fn inpaint_dynamic(
        &mut self,
        color: &image::DynamicImage,
        mask: &image::DynamicImage,
    ) -> Result<image::RgbImage, Error> {
        let color = match color {
            image::DynamicImage::ImageRgb8(img) => img,
            other => {
                return Err(Error::UnsupportedColorType {
                    input: "color",
                    color_type: other.color(),
                })
            }
        };

        let mask = match mask {
            image::DynamicImage::ImageLuma8(img) => img,
            other => {
                return Err(Error::UnsupportedColorType {
                    input: "mask",
                    color_type: other.color(),
                })
            }
        };

        self.inpaint(color, mask)
    }

    /// Same as `inpaint`, calling `progress` every time a pyramid level has
    /// been solved.
    pub fn inpaint_with_progress(
        &mut self,
        color: &image::RgbImage,
        mask: &image::GrayImage,
        mut progress: Option<&mut dyn InpaintProgress>,
    ) -> Result<image::RgbImage, Error> {
        let dims = check_inputs(color, mask)?;

        let rebuild = match (&self.pyramid, self.params.temporal_mode) {
            (Some(pyramid), TemporalMode::Video) => {
                let changed = pyramid.dims() != dims;
                if changed {
                    debug!(
                        "input resolution changed from {}x{} to {}x{}, rebuilding pyramid",
                        pyramid.dims().width,
                        pyramid.dims().height,
                        dims.width,
                        dims.height
                    );
                }
                changed
            }
            _ => true,
        };

        if rebuild {
            self.pyramid = None;
        }

        let params = &self.params;
        let pyramid = self.pyramid.get_or_insert_with(|| {
            Pyramid::new(
                dims,
                params.max_levels,
                &params.to_level_params(),
                params.seed,
            )
        });

        let total_levels = pyramid.load_frame(color, mask)?;

        pyramid.solve(|level, solved: &Level| {
            if let Some(progress) = progress.as_mut() {
                let image = solved.color_image();
                progress.update(ProgressUpdate {
                    level,
                    total_levels,
                    image: &image,
                });
            }
        })?;

        let alpha = box_blur_alpha(mask, self.params.blur_size);
        Ok(composite(color, &pyramid.finest().color_image(), &alpha))
    }

    /// Forgets the previous frame, the next call starts a new sequence.
    pub fn reset(&mut self) {
        self.pyramid = None;
    }

    /// Number of levels in the current pyramid, 0 before the first frame.
    pub fn level_count(&self) -> usize {
        self.pyramid.as_ref().map_or(0, Pyramid::len)
    }

    /// Resolution the current pyramid was built for.
    pub fn dims(&self) -> Option<Dims> {
        self.pyramid.as_ref().map(Pyramid::dims)
    }

    /// The pyramid levels of the last processed frame, finest first.
    pub fn levels(&self) -> &[Level] {
        match &self.pyramid {
            Some(pyramid) => pyramid.levels(),
            None => &[],
        }
    }
}

fn check_inputs(color: &image::RgbImage, mask: &image::GrayImage) -> Result<Dims, Error> {
    if color.dimensions() != mask.dimensions() {
        return Err(Error::SizeMismatch(errors::SizeMismatch {
            input: "mask",
            expected: color.dimensions(),
            actual: mask.dimensions(),
        }));
    }

    let (width, height) = color.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::NoValidPixels { level: 0 });
    }

    Ok(Dims::new(width, height))
}

/// Builds an inpainter by setting parameters, calling `build` checks that
/// all of them are within their valid ranges.
#[derive(Default)]
pub struct InpainterBuilder {
    params: Parameters,
}

impl InpainterBuilder {
    /// Creates a new `InpainterBuilder`, can also be created via
    /// `Inpainter::builder()`
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the pyramid and the previous frame are kept between calls.
    ///
    /// Default: `TemporalMode::Image`
    pub fn temporal_mode(mut self, mode: TemporalMode) -> Self {
        self.params.temporal_mode = mode;
        self
    }

    /// Upper bound on the number of pyramid levels, including the full
    /// resolution one.
    ///
    /// Default: 6
    pub fn max_levels(mut self, count: u32) -> Self {
        self.params.max_levels = count;
        self
    }

    /// How many forward/backward sweep pairs are run on every level.
    ///
    /// Default: 1
    pub fn iterations(mut self, count: u32) -> Self {
        self.params.iterations = count;
        self
    }

    /// The number of random donors tried for every hole pixel in every sweep,
    /// apart from the ones propagated from its neighbors.
    ///
    /// Default: 1
    pub fn random_search(mut self, count: u32) -> Self {
        self.params.random_search = count;
        self
    }

    /// Controls the trade-off between spatial coherence of the position map
    /// and color similarity. Range [0, 1], larger values favor copying
    /// contiguous chunks over matching colors.
    ///
    /// Default: 0.05
    pub fn spatial_weight(mut self, value: f32) -> Self {
        self.params.spatial_weight = value;
        self
    }

    /// Controls the trade-off between the current frame and similarity with
    /// the previous frame, only used in `TemporalMode::Video`. Range [0, 1].
    ///
    /// Default: 0.999
    pub fn temporal_weight(mut self, value: f32) -> Self {
        self.params.temporal_weight = value;
        self
    }

    /// Fraction of the larger image side beyond which spatial distances in
    /// the position map stop adding cost. Range (0, 1].
    ///
    /// Default: 0.5
    pub fn distance_threshold(mut self, value: f32) -> Self {
        self.params.distance_threshold = value;
        self
    }

    /// Size of the box filter applied to the mask to feather the boundary
    /// between original and reconstructed pixels.
    ///
    /// Default: 5
    pub fn blur_size(mut self, size: u32) -> Self {
        self.params.blur_size = size;
        self
    }

    /// Changes the seed of the random donor search.
    pub fn seed(mut self, value: u64) -> Self {
        self.params.seed = value;
        self
    }

    /// Controls the maximum number of threads used by the sweeps.
    ///
    /// With more than one thread, rows are optimized concurrently and read
    /// the in-flight results of neighboring rows, which makes the output
    /// depend on thread scheduling. Keeping this at `1` gives completely
    /// deterministic results for a given seed.
    ///
    /// Default: 1
    pub fn max_thread_count(mut self, count: usize) -> Self {
        self.params.max_thread_count = count;
        self
    }

    /// Uses as many threads as there are logical cores on this system.
    pub fn use_all_cores(mut self) -> Self {
        self.params.max_thread_count = num_cpus::get();
        self
    }

    /// Creates an `Inpainter`, or returns an error if invalid parameters were
    /// specified.
    pub fn build(self) -> Result<Inpainter, Error> {
        self.check_parameters_validity()?;

        Ok(Inpainter {
            params: self.params,
            pyramid: None,
        })
    }

    fn check_parameters_validity(&self) -> Result<(), Error> {
        let counts = [
            (self.params.max_levels as usize, "max-levels"),
            (self.params.iterations as usize, "iterations"),
            (self.params.random_search as usize, "random-search"),
            (self.params.blur_size as usize, "blur-size"),
            (self.params.max_thread_count, "max-thread-count"),
        ];

        for &(value, name) in &counts {
            if value == 0 {
                return Err(Error::InvalidRange(errors::InvalidRange {
                    min: 1.0,
                    max: 1024.0,
                    value: value as f32,
                    name,
                }));
            }
        }

        let weights = [
            (self.params.spatial_weight, "spatial-weight"),
            (self.params.temporal_weight, "temporal-weight"),
        ];

        for &(value, name) in &weights {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidRange(errors::InvalidRange {
                    min: 0.0,
                    max: 1.0,
                    value,
                    name,
                }));
            }
        }

        let threshold = self.params.distance_threshold;
        if threshold <= 0.0 || threshold > 1.0 || threshold.is_nan() {
            return Err(Error::InvalidRange(errors::InvalidRange {
                min: 0.0,
                max: 1.0,
                value: threshold,
                name: "distance-threshold",
            }));
        }

        Ok(())
    }
}

/// The state of the inpainter after a pyramid level has been solved
pub struct ProgressUpdate<'a> {
    /// Index of the level that was just solved, 0 is the full resolution
    pub level: usize,
    /// The number of levels solved for this frame
    pub total_levels: usize,
    /// The reconstructed color of the solved level
    pub image: &'a image::RgbImage,
}

/// Allows the inpainter to update external callers with the current
/// progress of the frame
pub trait InpaintProgress {
    fn update(&mut self, info: ProgressUpdate<'_>);
}

impl<G> InpaintProgress for G
where
    G: FnMut(ProgressUpdate<'_>) + Send,
{
    fn update(&mut self, info: ProgressUpdate<'_>) {
        self(info)
    }
}
