use image::imageops::{self, FilterType};
use log::{debug, trace};

use crate::buffer::{Pos, PositionMap};
use crate::level::{Level, LevelParams};
use crate::utils::{has_valid_pixel, HOLE, VALID};
use crate::{Dims, Error};

/// Levels keep being halved while their shorter side is at least this long
const MIN_HALVED_SIDE: u32 = 5;

pub(crate) fn level_count(dims: Dims, max_levels: u32) -> usize {
    let mut count = 1;
    let mut side = dims.width.min(dims.height);
    while side >= MIN_HALVED_SIDE && count < max_levels {
        side /= 2;
        count += 1;
    }
    count as usize
}

/// Coarse-to-fine stack of inpainting levels, index 0 being the full
/// resolution.
pub(crate) struct Pyramid {
    dims: Dims,
    levels: Vec<Level>,
    // levels that took part in the last loaded frame
    active: usize,
}

impl Pyramid {
    pub fn new(dims: Dims, max_levels: u32, params: &LevelParams, seed: u64) -> Self {
        let count = level_count(dims, max_levels);

        let mut levels = Vec::with_capacity(count);
        let mut level_dims = dims;
        for i in 0..count {
            levels.push(Level::new(
                i,
                level_dims,
                params.clone(),
                seed.wrapping_add(i as u64),
            ));
            level_dims = Dims::new(level_dims.width / 2, level_dims.height / 2);
        }

        debug!(
            "built a {} level pyramid for {}x{}",
            count, dims.width, dims.height
        );

        Self {
            dims,
            levels,
            active: 0,
        }
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Loads the frame into level 0 and derives every coarser level from the
    /// current content of the level above it.
    ///
    /// Coarser levels left without a single valid pixel, and everything below
    /// them, sit this frame out. Returns how many levels will be solved.
    pub fn load_frame(
        &mut self,
        color: &image::RgbImage,
        mask: &image::GrayImage,
    ) -> Result<usize, Error> {
        self.levels[0].load_frame(color, mask)?;
        self.active = 1;

        for i in 1..self.levels.len() {
            let (finer, coarser) = self.levels.split_at_mut(i);
            let finer = &finer[i - 1];
            let level = &mut coarser[0];
            let dims = level.dims();

            let color = imageops::resize(
                &finer.color_image(),
                dims.width,
                dims.height,
                FilterType::Triangle,
            );
            let mask = downsample_mask(&finer.mask_image(), dims);

            if !has_valid_pixel(&mask) {
                debug!(
                    "level {} ({}x{}) has no valid pixels, solving {} of {} levels",
                    i,
                    dims.width,
                    dims.height,
                    i,
                    self.levels.len()
                );
                break;
            }

            level.load_frame(&color, &mask)?;
            self.active = i + 1;
        }

        // levels sitting out would otherwise rejoin against a stale frame
        for level in &mut self.levels[self.active..] {
            level.forget_previous();
        }

        Ok(self.active)
    }

    /// Solves the loaded levels coarsest first, seeding each finer level with
    /// the solution of the one below it. `on_solved` is called with every
    /// level once it is done.
    pub fn solve<F>(&mut self, mut on_solved: F) -> Result<(), Error>
    where
        F: FnMut(usize, &Level),
    {
        for i in (0..self.active).rev() {
            let dims = self.levels[i].dims();
            trace!("solving level {} ({}x{})", i, dims.width, dims.height);

            self.levels[i].run()?;

            if i > 0 {
                let (finer, coarser) = self.levels.split_at_mut(i);
                fill_in(&coarser[0], &mut finer[i - 1]);
            }

            on_solved(i, &self.levels[i]);
        }

        Ok(())
    }

    pub fn finest(&self) -> &Level {
        &self.levels[0]
    }
}

/// Linear downsampling of a binary mask, only pixels whose whole footprint
/// was valid stay valid. Filtering happens in `f32` so fully valid areas
/// never lose a level to rounding.
fn downsample_mask(mask: &image::GrayImage, dims: Dims) -> image::GrayImage {
    let (width, height) = mask.dimensions();
    let weights: image::ImageBuffer<image::Luma<f32>, Vec<f32>> =
        image::ImageBuffer::from_fn(width, height, |x, y| {
            image::Luma([f32::from(mask.get_pixel(x, y)[0])])
        });
    let resized = imageops::resize(&weights, dims.width, dims.height, FilterType::Triangle);

    let threshold = f32::from(VALID) - 0.5;
    image::GrayImage::from_fn(dims.width, dims.height, |x, y| {
        if resized.get_pixel(x, y)[0] >= threshold {
            image::Luma([VALID])
        } else {
            image::Luma([HOLE])
        }
    })
}

/// Seeds the holes of `fine` with the solved content of the next coarser
/// level, so the finer optimization starts from a coarse-consistent guess.
pub(crate) fn fill_in(coarse: &Level, fine: &mut Level) {
    let dims = fine.dims();
    let color = imageops::resize(
        &coarse.color_image(),
        dims.width,
        dims.height,
        FilterType::Triangle,
    );
    let pos_map = upsample_positions(&coarse.position_map(), dims);

    fine.seed_holes(&color, &pos_map);
}

/// Nearest neighbor upsampling of a position map, with every coordinate
/// scaled up by 2 and offset by the parity of the destination pixel.
fn upsample_positions(coarse: &PositionMap, dims: Dims) -> PositionMap {
    let src = coarse.dims();
    let mut entries = Vec::with_capacity(dims.width as usize * dims.height as usize);

    for row in 0..dims.height {
        let src_row = (u64::from(row) * u64::from(src.height) / u64::from(dims.height)) as u32;
        let src_row = src_row.min(src.height - 1);

        for col in 0..dims.width {
            let src_col = (u64::from(col) * u64::from(src.width) / u64::from(dims.width)) as u32;
            let src_col = src_col.min(src.width - 1);

            let p = coarse.get(src_row, src_col);
            entries.push(Pos::new(
                p.row * 2 + (row % 2) as i32,
                p.col * 2 + (col % 2) as i32,
            ));
        }
    }

    PositionMap { dims, entries }
}

#[cfg(test)]
mod test {
    use super::*;

    fn params() -> LevelParams {
        crate::Parameters::default().to_level_params()
    }

    fn gradient(width: u32, height: u32) -> image::RgbImage {
        image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 7) as u8, (y * 5) as u8, ((x + y) * 3) as u8])
        })
    }

    #[test]
    fn level_counts() {
        assert_eq!(level_count(Dims::square(20), 6), 4);
        assert_eq!(level_count(Dims::new(640, 480), 6), 6);
        assert_eq!(level_count(Dims::new(640, 480), 1), 1);
        assert_eq!(level_count(Dims::new(100, 4), 6), 1);
        assert_eq!(level_count(Dims::square(5), 6), 2);
    }

    #[test]
    fn levels_halve() {
        let pyramid = Pyramid::new(Dims::new(41, 30), 6, &params(), 0);
        let dims: Vec<_> = pyramid.levels().iter().map(|l| l.dims()).collect();
        assert_eq!(
            dims,
            vec![
                Dims::new(41, 30),
                Dims::new(20, 15),
                Dims::new(10, 7),
                Dims::new(5, 3)
            ]
        );
    }

    #[test]
    fn downsampled_masks_stay_binary() {
        let mask = image::GrayImage::from_fn(16, 12, |x, _| {
            if x == 5 {
                image::Luma([HOLE])
            } else {
                image::Luma([VALID])
            }
        });

        let coarse = downsample_mask(&mask, Dims::new(8, 6));
        for (x, _, px) in coarse.enumerate_pixels() {
            assert!(px[0] == VALID || px[0] == HOLE);
            if x >= 5 || x == 0 {
                assert_eq!(px[0], VALID, "column {}", x);
            }
        }
        assert_eq!(coarse.get_pixel(2, 3)[0], HOLE);
    }

    #[test]
    fn identity_survives_upsampling() {
        let coarse = PositionMap {
            dims: Dims::new(3, 2),
            entries: (0..2)
                .flat_map(|r| (0..3).map(move |c| Pos::new(r, c)))
                .collect(),
        };

        let fine = upsample_positions(&coarse, Dims::new(6, 4));
        for row in 0..4 {
            for col in 0..6 {
                assert_eq!(fine.get(row, col), Pos::new(row as i32, col as i32));
            }
        }
    }

    #[test]
    fn fill_in_only_references_valid_pixels() {
        let color = gradient(40, 32);
        let mask = image::GrayImage::from_fn(40, 32, |x, y| {
            if (12..30).contains(&x) && (6..20).contains(&y) {
                image::Luma([HOLE])
            } else {
                image::Luma([VALID])
            }
        });

        let mut pyramid = Pyramid::new(Dims::new(40, 32), 2, &params(), 3);
        assert_eq!(pyramid.load_frame(&color, &mask).unwrap(), 2);

        let (finer, coarser) = pyramid.levels.split_at_mut(1);
        coarser[0].run().unwrap();
        fill_in(&coarser[0], &mut finer[0]);

        let fine = &finer[0];
        let fine_mask = fine.mask_image();
        for donor in fine.position_map().entries() {
            assert_eq!(
                fine_mask.get_pixel(donor.col as u32, donor.row as u32)[0],
                VALID
            );
        }
    }

    #[test]
    fn coarse_levels_without_valid_pixels_sit_out() {
        let color = gradient(32, 32);
        let mut mask = image::GrayImage::new(32, 32);
        mask.put_pixel(3, 3, image::Luma([VALID]));

        let mut pyramid = Pyramid::new(Dims::square(32), 6, &params(), 1);
        assert_eq!(pyramid.len(), 4);
        assert_eq!(pyramid.load_frame(&color, &mask).unwrap(), 1);

        let mut solved = Vec::new();
        pyramid.solve(|i, _| solved.push(i)).unwrap();
        assert_eq!(solved, vec![0]);
    }

    #[test]
    fn skipped_levels_forget_their_previous_frame() {
        let color = gradient(32, 32);
        let full = image::GrayImage::from_pixel(32, 32, image::Luma([VALID]));
        let mut sparse = image::GrayImage::new(32, 32);
        sparse.put_pixel(20, 11, image::Luma([VALID]));

        let mut pyramid = Pyramid::new(Dims::square(32), 6, &params(), 2);
        assert_eq!(pyramid.load_frame(&color, &full).unwrap(), 4);
        pyramid.solve(|_, _| {}).unwrap();
        assert!(pyramid.levels().iter().all(|l| !l.is_first_frame()));

        assert_eq!(pyramid.load_frame(&color, &sparse).unwrap(), 1);
        pyramid.solve(|_, _| {}).unwrap();
        assert!(!pyramid.levels()[0].is_first_frame());
        assert!(pyramid.levels()[1..].iter().all(Level::is_first_frame));

        // rejoining levels start over instead of warm starting
        assert_eq!(pyramid.load_frame(&color, &full).unwrap(), 4);
        assert!(pyramid.levels()[1..].iter().all(Level::is_first_frame));
    }

    #[test]
    fn solves_coarsest_first() {
        let color = gradient(32, 24);
        let mask = image::GrayImage::from_fn(32, 24, |x, y| {
            if (10..14).contains(&x) && (10..14).contains(&y) {
                image::Luma([HOLE])
            } else {
                image::Luma([VALID])
            }
        });

        let mut pyramid = Pyramid::new(Dims::new(32, 24), 6, &params(), 1);
        let active = pyramid.load_frame(&color, &mask).unwrap();

        let mut solved = Vec::new();
        pyramid.solve(|i, _| solved.push(i)).unwrap();
        assert_eq!(solved, (0..active).rev().collect::<Vec<_>>());
    }
}
