use std::fmt;

#[derive(Debug)]
pub struct InvalidRange {
    pub(crate) min: f32,
    pub(crate) max: f32,
    pub(crate) value: f32,
    pub(crate) name: &'static str,
}

impl fmt::Display for InvalidRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parameter '{}' - value '{}' is outside the range of {}-{}",
            self.name, self.value, self.min, self.max
        )
    }
}

#[derive(Debug)]
pub struct SizeMismatch {
    pub(crate) input: &'static str,
    pub(crate) expected: (u32, u32),
    pub(crate) actual: (u32, u32),
}

impl fmt::Display for SizeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "the {} size ({}x{}) must match the expected size ({}x{})",
            self.input, self.actual.0, self.actual.1, self.expected.0, self.expected.1
        )
    }
}

#[derive(Debug)]
pub enum Error {
    /// An input parameter had an invalid range specified
    InvalidRange(InvalidRange),
    /// The color image, the mask and the pyramid level must all have
    /// identical dimensions
    SizeMismatch(SizeMismatch),
    /// The color image must be 8-bit RGB and the mask 8-bit single channel
    UnsupportedColorType {
        input: &'static str,
        color_type: image::ColorType,
    },
    /// A pyramid level has no valid pixel to borrow content from, so there
    /// is nothing the holes could be filled with
    NoValidPixels { level: usize },
    /// `run` was called on a level before any frame was loaded into it
    LevelNotLoaded { level: usize },
    /// One of the sweep workers panicked
    WorkerPanicked,
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRange(ir) => write!(f, "{}", ir),
            Self::SizeMismatch(sm) => write!(f, "{}", sm),
            Self::UnsupportedColorType { input, color_type } => write!(
                f,
                "the {} image has an unsupported color type {:?}",
                input, color_type
            ),
            Self::NoValidPixels { level } => write!(
                f,
                "pyramid level {} has no valid pixels to source from",
                level
            ),
            Self::LevelNotLoaded { level } => {
                write!(f, "pyramid level {} was run before a frame was loaded", level)
            }
            Self::WorkerPanicked => write!(f, "an inpainting worker thread panicked"),
        }
    }
}
