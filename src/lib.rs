// BEGIN - Embark standard lints v0.4
// do not change or add/remove here, but one can add exceptions after this section
// for more info see: <https://github.com/EmbarkStudios/rust-ecosystem/issues/59>
#![deny(unsafe_code)]
#![warn(
    clippy::all,
    clippy::await_holding_lock,
    clippy::char_lit_as_u8,
    clippy::checked_conversions,
    clippy::dbg_macro,
    clippy::debug_assert_with_mut_call,
    clippy::doc_markdown,
    clippy::empty_enum,
    clippy::enum_glob_use,
    clippy::exit,
    clippy::expl_impl_clone_on_copy,
    clippy::explicit_deref_methods,
    clippy::explicit_into_iter_loop,
    clippy::fallible_impl_from,
    clippy::filter_map_next,
    clippy::float_cmp_const,
    clippy::fn_params_excessive_bools,
    clippy::if_let_mutex,
    clippy::implicit_clone,
    clippy::imprecise_flops,
    clippy::inefficient_to_string,
    clippy::invalid_upcast_comparisons,
    clippy::large_types_passed_by_value,
    clippy::let_unit_value,
    clippy::linkedlist,
    clippy::lossy_float_literal,
    clippy::macro_use_imports,
    clippy::manual_ok_or,
    clippy::map_err_ignore,
    clippy::map_flatten,
    clippy::map_unwrap_or,
    clippy::match_on_vec_items,
    clippy::match_same_arms,
    clippy::match_wildcard_for_single_variants,
    clippy::mem_forget,
    clippy::mismatched_target_os,
    clippy::mut_mut,
    clippy::mutex_integer,
    clippy::needless_borrow,
    clippy::needless_continue,
    clippy::option_option,
    clippy::path_buf_push_overwrite,
    clippy::ptr_as_ptr,
    clippy::ref_option_ref,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::same_functions_in_if_condition,
    clippy::semicolon_if_nothing_returned,
    clippy::string_add_assign,
    clippy::string_add,
    clippy::string_lit_as_bytes,
    clippy::string_to_string,
    clippy::todo,
    clippy::trait_duplication_in_bounds,
    clippy::unimplemented,
    clippy::unnested_or_patterns,
    clippy::unused_self,
    clippy::useless_transmute,
    clippy::verbose_file_reads,
    clippy::zero_sized_map_values,
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms
)]
// END - Embark standard lints v0.4

//! `multires-inpaint` fills the holes of an image, or of every frame of a
//! video, with content borrowed from the rest of the same image.
//!
//! Every hole pixel is assigned a donor, a valid pixel it copies its color
//! from. Donors are found with a PatchMatch style search that balances how
//! well the 5x5 neighborhoods of the two pixels match against how coherent
//! the donors of neighboring pixels are. The search runs coarse to fine over
//! a resolution pyramid, each level seeding the holes of the next finer one.
//! In video mode every level also remembers the previous frame, which both
//! warm starts the search and adds a temporal term to the cost, so that
//! consecutive frames are filled consistently.
//!
//! ## Usage
//! `Inpainter` follows a "builder pattern" for defining parameters, meaning
//! you chain functions together.
//!
//! ```no_run
//! use multires_inpaint::{Inpainter, TemporalMode};
//!
//! let mut inpainter = Inpainter::builder()
//!     .temporal_mode(TemporalMode::Video)
//!     .iterations(2)
//!     .seed(10)
//!     .build().expect("failed to build inpainter");
//!
//! for i in 0..10 {
//!     let color = image::open(format!("frames/{}.png", i)).unwrap().to_rgb();
//!     let mask = image::open(format!("masks/{}.png", i)).unwrap().to_luma();
//!
//!     let filled = inpainter.inpaint(&color, &mask).expect("failed to inpaint");
//!     filled.save(format!("out/{}.png", i)).expect("failed to save frame");
//! }
//! ```
mod buffer;
mod errors;
mod img_pyramid;
mod level;
pub mod session;
mod unsync;
mod utils;

pub use image;

pub use buffer::{Pos, PositionMap};
pub use errors::Error;
pub use level::Level;
pub use session::{InpaintProgress, Inpainter, InpainterBuilder, ProgressUpdate};
pub use utils::{HOLE, VALID};

use level::LevelParams;

/// Simple dimensions struct
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Dims {
    pub width: u32,
    pub height: u32,
}

impl Dims {
    pub fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// How consecutive calls to `Inpainter::inpaint` relate to each other.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TemporalMode {
    /// Every call is independent, the pyramid is rebuilt each time.
    Image,
    /// Calls are consecutive frames of one sequence. The pyramid and the
    /// previous frame are kept for as long as the resolution stays the same.
    Video,
}

impl Default for TemporalMode {
    fn default() -> Self {
        Self::Image
    }
}

struct Parameters {
    temporal_mode: TemporalMode,
    max_levels: u32,
    iterations: u32,
    random_search: u32,
    spatial_weight: f32,
    temporal_weight: f32,
    distance_threshold: f32,
    blur_size: u32,
    seed: u64,
    max_thread_count: usize,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            temporal_mode: TemporalMode::Image,
            max_levels: 6,
            iterations: 1,
            random_search: 1,
            spatial_weight: 0.05,
            temporal_weight: 0.999,
            distance_threshold: 0.5,
            blur_size: 5,
            seed: 0,
            max_thread_count: 1,
        }
    }
}

impl Parameters {
    fn to_level_params(&self) -> LevelParams {
        LevelParams {
            iterations: self.iterations,
            random_search: self.random_search,
            alpha: self.spatial_weight,
            beta: self.temporal_weight,
            distance_threshold: self.distance_threshold,
            max_thread_count: self.max_thread_count,
        }
    }
}
