use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    EmptyName,
    InvalidName(String),
    InvalidThumbnailSize(u32),
    InvalidPageIndex { index: usize, page_count: usize },
    InvalidPageRange { first: usize, last: usize, page_count: usize },
    InvalidScale(String),
    InvalidDimensions { width: u32, height: u32 },
    InvalidMargin(u32),
    InvalidResolution(u32),
    InvalidPaletteSize(u16),
    InvalidQuality(u8),
    InvalidSmoothing(f32),
    InvalidCompressionLevel(u8),
    InvalidRestartFrequency(u16),
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "name must not be empty"),
            Self::InvalidName(name) => write!(f, "invalid name: {name:?}"),
            Self::InvalidThumbnailSize(size) => {
                write!(f, "thumbnail size must be 128, 256 or 512, got {size}")
            }
            Self::InvalidPageIndex { index, page_count } => {
                write!(f, "page index {index} out of range for {page_count} pages")
            }
            Self::InvalidPageRange {
                first,
                last,
                page_count,
            } => write!(
                f,
                "page range {first}..={last} is not valid for {page_count} pages"
            ),
            Self::InvalidScale(msg) => write!(f, "invalid scale: {msg}"),
            Self::InvalidDimensions { width, height } => {
                write!(f, "invalid image dimensions for {width}x{height}")
            }
            Self::InvalidMargin(value) => {
                write!(f, "margins must be at most {} pixels, got {value}", crate::MAX_MARGIN)
            }
            Self::InvalidResolution(value) => {
                write!(f, "resolution must be positive, got {value}")
            }
            Self::InvalidPaletteSize(value) => {
                write!(f, "palette size must be between 2 and 256, got {value}")
            }
            Self::InvalidQuality(value) => write!(f, "quality must be at most 100, got {value}"),
            Self::InvalidSmoothing(value) => {
                write!(f, "smoothing must be between 0.0 and 1.0, got {value}")
            }
            Self::InvalidCompressionLevel(value) => {
                write!(f, "compression level must be between 0 and 9, got {value}")
            }
            Self::InvalidRestartFrequency(value) => {
                write!(f, "restart marker frequency must be between 1 and 64, got {value}")
            }
        }
    }
}

impl std::error::Error for DomainError {}
