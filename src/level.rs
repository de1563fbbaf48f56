use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::buffer::{Padded, Pos, PositionMap};
use crate::errors::{self, Error};
use crate::utils::{binarize, HOLE, VALID};
use crate::Dims;

/// Half of the appearance window, the color and mask borders are this wide
const WINDOW_RADIUS: i32 = 2;
const WINDOW_AREA: f32 = 25.0;
const POS_MAP_BORDER: usize = 1;
/// Largest possible squared difference of one RGB pixel
const APPEARANCE_NORM: f32 = 255.0 * 255.0 * 3.0;
/// Added instead of a color difference for every hole pixel in a donor
/// window, large enough to dominate any real difference
const HOLE_PENALTY: f32 = 1.0e9;

const NEIGHBORHOOD: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

#[derive(Debug, Clone)]
pub struct LevelParams {
    /// Forward + backward sweep pairs per `run`
    pub(crate) iterations: u32,
    /// Random donor draws per hole pixel and sweep
    pub(crate) random_search: u32,
    /// Trade-off between spatial coherence and appearance
    pub(crate) alpha: f32,
    /// Trade-off between the spatial/appearance cost and the temporal cost
    pub(crate) beta: f32,
    /// Fraction of the larger dimension beyond which spatial distances stop
    /// growing
    pub(crate) distance_threshold: f32,
    pub(crate) max_thread_count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LevelState {
    Initialized,
    Loaded,
    Solved,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// What the level looked like after the previous `run`
struct TemporalCache {
    mask: Padded<u8>,
    color: Padded<[u8; 3]>,
}

/// Draws uniformly random valid pixels of a mask.
#[derive(Clone, Copy)]
struct Sampler<'a> {
    valid: &'a [Pos],
}

impl<'a> Sampler<'a> {
    #[inline]
    fn draw(&self, rng: &mut Pcg32) -> Pos {
        debug_assert!(!self.valid.is_empty());
        self.valid[rng.gen_range(0..self.valid.len())]
    }
}

/// One resolution of the inpainting pyramid.
///
/// Holds the bordered color and mask of the current frame, the position map
/// pointing every hole pixel at the valid pixel it is reconstructed from, and
/// the previous frame's content for the temporal term.
pub struct Level {
    index: usize,
    dims: Dims,
    params: LevelParams,
    rng: Pcg32,
    color: Padded<[u8; 3]>,
    mask: Padded<u8>,
    pos_map: Padded<Pos>,
    // row-major list of the current frame's valid pixels
    valid: Vec<Pos>,
    previous: Option<TemporalCache>,
    state: LevelState,
}

impl Level {
    pub(crate) fn new(index: usize, dims: Dims, params: LevelParams, seed: u64) -> Self {
        Self {
            index,
            dims,
            params,
            rng: Pcg32::seed_from_u64(seed),
            color: Padded::filled(dims, WINDOW_RADIUS as usize, [0; 3]),
            mask: Padded::filled(dims, WINDOW_RADIUS as usize, HOLE),
            pos_map: Padded::filled(dims, POS_MAP_BORDER, Pos::default()),
            valid: Vec::new(),
            previous: None,
            state: LevelState::Initialized,
        }
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    /// True until the first `run` finishes, there is nothing to be temporally
    /// coherent with before that.
    pub fn is_first_frame(&self) -> bool {
        self.previous.is_none()
    }

    pub fn valid_count(&self) -> usize {
        self.valid.len()
    }

    /// Drops the previous frame, the next `load_frame` starts from scratch.
    pub(crate) fn forget_previous(&mut self) {
        self.previous = None;
    }

    fn check_size(&self, input: &'static str, actual: (u32, u32)) -> Result<(), Error> {
        if actual != (self.dims.width, self.dims.height) {
            return Err(Error::SizeMismatch(errors::SizeMismatch {
                input,
                expected: (self.dims.width, self.dims.height),
                actual,
            }));
        }
        Ok(())
    }

    /// Ingests a new frame and refreshes the position map, either from
    /// scratch on the first frame or warm started from the previous one.
    pub(crate) fn load_frame(
        &mut self,
        color: &image::RgbImage,
        mask: &image::GrayImage,
    ) -> Result<(), Error> {
        self.check_size("color", color.dimensions())?;
        self.check_size("mask", mask.dimensions())?;

        let binary: Vec<u8> = mask.pixels().map(|p| binarize(p[0])).collect();
        let valid: Vec<Pos> = mask
            .enumerate_pixels()
            .filter(|(_, _, p)| binarize(p[0]) == VALID)
            .map(|(x, y, _)| Pos::new(y as i32, x as i32))
            .collect();
        if valid.is_empty() {
            return Err(Error::NoValidPixels { level: self.index });
        }

        let colors: Vec<[u8; 3]> = color.pixels().map(|p| p.0).collect();
        self.color = Padded::from_interior(self.dims, WINDOW_RADIUS as usize, &colors);
        self.mask = Padded::from_interior(self.dims, WINDOW_RADIUS as usize, &binary);
        self.valid = valid;

        let sampler = Sampler { valid: &self.valid };
        let mask = &self.mask;
        let rng = &mut self.rng;
        let pos_map = &self.pos_map;

        for row in 0..self.dims.height as i32 {
            for col in 0..self.dims.width as i32 {
                let pos = Pos::new(row, col);
                let is_valid = mask.get(pos) == VALID;

                let entry = match &self.previous {
                    None => {
                        if is_valid {
                            pos
                        } else {
                            sampler.draw(rng)
                        }
                    }
                    Some(previous) => {
                        let was_valid = previous.mask.get(pos) == VALID;
                        match (was_valid, is_valid) {
                            (_, true) => pos,
                            (true, false) => sampler.draw(rng),
                            (false, false) => {
                                // keep the old donor unless it was covered up
                                let kept = pos_map.get(pos);
                                if mask.contains(kept) && mask.get(kept) == VALID {
                                    kept
                                } else {
                                    sampler.draw(rng)
                                }
                            }
                        }
                    }
                };

                pos_map.set(pos, entry);
            }
        }

        self.pos_map.refresh_border();
        self.state = LevelState::Loaded;
        Ok(())
    }

    /// Optimizes the position map, reconstructs the holes from it and keeps
    /// the result around for the next frame.
    pub(crate) fn run(&mut self) -> Result<(), Error> {
        if self.state == LevelState::Initialized {
            return Err(Error::LevelNotLoaded { level: self.index });
        }

        for _ in 0..self.params.iterations {
            for &direction in &[Direction::Forward, Direction::Backward] {
                let seed: u64 = self.rng.gen();
                let sweep = self.sweep();

                for_each_row(
                    self.dims.height as usize,
                    direction,
                    self.params.max_thread_count,
                    |row| {
                        let mut rng = Pcg32::seed_from_u64(seed.wrapping_add(row as u64));
                        sweep.row(row as i32, direction, &mut rng);
                    },
                )?;

                self.pos_map.refresh_border();
            }
        }

        self.reconstruct()?;

        self.previous = Some(TemporalCache {
            mask: self.mask.clone(),
            color: self.color.clone(),
        });
        self.state = LevelState::Solved;
        Ok(())
    }

    fn sweep(&self) -> Sweep<'_> {
        let max_dim = self.dims.width.max(self.dims.height) as f32;

        Sweep {
            color: &self.color,
            mask: &self.mask,
            pos_map: &self.pos_map,
            previous: self.previous.as_ref().map(|p| &p.color),
            sampler: Sampler { valid: &self.valid },
            params: &self.params,
            tau: (max_dim * self.params.distance_threshold).powi(2),
        }
    }

    // Donors are read from the same buffer that is being written. Donors are
    // always valid pixels and only holes are written, so a read never sees a
    // reconstructed value regardless of which worker gets to a row first.
    fn reconstruct(&self) -> Result<(), Error> {
        let color = &self.color;
        let mask = &self.mask;
        let pos_map = &self.pos_map;
        let width = self.dims.width as i32;

        for_each_row(
            self.dims.height as usize,
            Direction::Forward,
            self.params.max_thread_count,
            |row| {
                for col in 0..width {
                    let pos = Pos::new(row as i32, col);
                    if mask.get(pos) == HOLE {
                        color.set(pos, color.get(pos_map.get(pos)));
                    }
                }
            },
        )?;

        self.color.refresh_border();
        Ok(())
    }

    /// Overwrites the hole pixels with content seeded from a coarser level.
    ///
    /// Map entries that would point outside the level or at a hole are not
    /// applied, the pixel keeps its current (valid) donor instead.
    pub(crate) fn seed_holes(&mut self, color: &image::RgbImage, pos_map: &PositionMap) {
        debug_assert_eq!(color.dimensions(), (self.dims.width, self.dims.height));
        debug_assert_eq!(pos_map.dims(), self.dims);

        for row in 0..self.dims.height {
            for col in 0..self.dims.width {
                let pos = Pos::new(row as i32, col as i32);
                if self.mask.get(pos) != HOLE {
                    continue;
                }

                self.color.set(pos, color.get_pixel(col, row).0);

                let donor = pos_map.get(row, col);
                if self.mask.contains(donor) && self.mask.get(donor) == VALID {
                    self.pos_map.set(pos, donor);
                }
            }
        }

        self.color.refresh_border();
        self.pos_map.refresh_border();
    }

    pub fn color_image(&self) -> image::RgbImage {
        image::RgbImage::from_fn(self.dims.width, self.dims.height, |x, y| {
            image::Rgb(self.color.get(Pos::new(y as i32, x as i32)))
        })
    }

    pub fn mask_image(&self) -> image::GrayImage {
        image::GrayImage::from_fn(self.dims.width, self.dims.height, |x, y| {
            image::Luma([self.mask.get(Pos::new(y as i32, x as i32))])
        })
    }

    pub fn position_map(&self) -> PositionMap {
        PositionMap {
            dims: self.dims,
            entries: self.pos_map.interior(),
        }
    }
}

/// Shared, read-mostly state of one propagation sweep.
struct Sweep<'a> {
    color: &'a Padded<[u8; 3]>,
    mask: &'a Padded<u8>,
    pos_map: &'a Padded<Pos>,
    previous: Option<&'a Padded<[u8; 3]>>,
    sampler: Sampler<'a>,
    params: &'a LevelParams,
    tau: f32,
}

impl<'a> Sweep<'a> {
    fn row(&self, row: i32, direction: Direction, rng: &mut Pcg32) {
        let width = self.mask.dims().width as i32;
        match direction {
            Direction::Forward => {
                for col in 0..width {
                    self.update(Pos::new(row, col), direction, rng);
                }
            }
            Direction::Backward => {
                for col in (0..width).rev() {
                    self.update(Pos::new(row, col), direction, rng);
                }
            }
        }
    }

    fn update(&self, target: Pos, direction: Direction, rng: &mut Pcg32) {
        if self.mask.get(target) != HOLE {
            return;
        }

        let dims = self.mask.dims();
        let (last_row, last_col) = (dims.height as i32 - 1, dims.width as i32 - 1);

        let propagated = match direction {
            Direction::Forward => [
                self.advance(Pos::new((target.row - 1).max(0), target.col), 1, 0),
                self.advance(Pos::new(target.row, (target.col - 1).max(0)), 0, 1),
            ],
            Direction::Backward => [
                self.advance(Pos::new((target.row + 1).min(last_row), target.col), -1, 0),
                self.advance(Pos::new(target.row, (target.col + 1).min(last_col)), 0, -1),
            ],
        };

        let current = self.pos_map.get(target);
        let mut best = current;
        let mut best_cost = self.cost(target, current);

        for &candidate in &propagated {
            if !self.is_valid_donor(candidate) {
                continue;
            }
            let cost = self.cost(target, candidate);
            if cost < best_cost {
                best = candidate;
                best_cost = cost;
            }
        }

        for _ in 0..self.params.random_search {
            let candidate = self.sampler.draw(rng);
            let cost = self.cost(target, candidate);
            if cost < best_cost {
                best = candidate;
                best_cost = cost;
            }
        }

        if best != current {
            self.pos_map.set(target, best);
        }
    }

    /// The neighbor's donor shifted by the step from the neighbor to the
    /// target, or the neighbor's own coordinate on an axis that would leave
    /// the image.
    #[inline]
    fn advance(&self, neighbor: Pos, d_row: i32, d_col: i32) -> Pos {
        let dims = self.mask.dims();
        let source = self.pos_map.get(neighbor);
        let mut candidate = source.offset(d_row, d_col);

        if candidate.row < 0 || candidate.row >= dims.height as i32 {
            candidate.row = source.row;
        }
        if candidate.col < 0 || candidate.col >= dims.width as i32 {
            candidate.col = source.col;
        }
        candidate
    }

    #[inline]
    fn is_valid_donor(&self, pos: Pos) -> bool {
        self.mask.contains(pos) && self.mask.get(pos) == VALID
    }

    fn cost(&self, target: Pos, donor: Pos) -> f32 {
        let alpha = self.params.alpha;
        let cost = alpha * self.spatial_cost(target, donor)
            + (1.0 - alpha) * self.window_cost(target, donor, self.color);

        match self.previous {
            Some(previous) => {
                let beta = self.params.beta;
                (1.0 - beta) * cost + beta * self.window_cost(target, donor, previous)
            }
            None => cost,
        }
    }

    /// How far the donor's neighborhood strays from where the target's
    /// neighbors currently source from.
    fn spatial_cost(&self, target: Pos, donor: Pos) -> f32 {
        let mut cost = 0.0;
        for &(d_row, d_col) in &NEIGHBORHOOD {
            let expected = donor.offset(d_row, d_col);
            let actual = self.pos_map.get(target.offset(d_row, d_col));
            cost += (expected.squared_distance(actual) as f32).min(self.tau);
        }

        cost / NEIGHBORHOOD.len() as f32 / (2.0 * self.tau)
    }

    /// Windowed color difference between the target in the current frame and
    /// the donor in `source`.
    fn window_cost(&self, target: Pos, donor: Pos, source: &Padded<[u8; 3]>) -> f32 {
        let mut cost = 0.0;
        for d_row in -WINDOW_RADIUS..=WINDOW_RADIUS {
            for d_col in -WINDOW_RADIUS..=WINDOW_RADIUS {
                let donor_px = donor.offset(d_row, d_col);
                if self.mask.get(donor_px) == HOLE {
                    cost += HOLE_PENALTY;
                    continue;
                }

                let a = self.color.get(target.offset(d_row, d_col));
                let b = source.get(donor_px);
                for c in 0..3 {
                    let diff = f32::from(a[c]) - f32::from(b[c]);
                    cost += diff * diff;
                }
            }
        }

        cost / WINDOW_AREA / APPEARANCE_NORM
    }
}

/// Calls `f` once per row, in sweep order, from up to `max_workers` threads.
///
/// Rows are handed out through a shared counter, so with more than one
/// worker a row may observe updates from rows that are still in flight.
fn for_each_row<F>(
    height: usize,
    direction: Direction,
    max_workers: usize,
    f: F,
) -> Result<(), Error>
where
    F: Fn(usize) + Sync,
{
    let next_row = AtomicUsize::new(0);

    let worker_fn = || loop {
        let i = next_row.fetch_add(1, Ordering::Relaxed);
        if i >= height {
            break;
        }

        match direction {
            Direction::Forward => f(i),
            Direction::Backward => f(height - 1 - i),
        }
    };

    // for WASM we do not have threads, so just run the worker directly
    #[cfg(target_arch = "wasm32")]
    {
        let _ = max_workers;
        (worker_fn)();
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let n_workers = max_workers.min(height).max(1);
        if n_workers == 1 {
            (worker_fn)();
            return Ok(());
        }

        crossbeam_utils::thread::scope(|scope| {
            for _ in 0..n_workers {
                scope.spawn(|_| (worker_fn)());
            }
        })
        .map_err(|_panic| Error::WorkerPanicked)
    }
}
