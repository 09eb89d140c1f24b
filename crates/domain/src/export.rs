use std::path::PathBuf;

use crate::page::{page_base_name, PageName};
use crate::{DomainError, RgbColor, TagFilter};

/// How exported files are named after their zero-padded page number.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamingScheme {
    #[default]
    BookName,
    PageName,
    PageNumber,
    Custom(String),
}

/// Inclusive range of page indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub first: usize,
    pub last: usize,
}

impl PageRange {
    pub fn new(first: usize, last: usize) -> Self {
        Self { first, last }
    }

    pub fn all(page_count: usize) -> Self {
        Self {
            first: 0,
            last: page_count.saturating_sub(1),
        }
    }

    pub fn validate(&self, page_count: usize) -> Result<(), DomainError> {
        if page_count == 0 || self.first > self.last || self.last >= page_count {
            return Err(DomainError::InvalidPageRange {
                first: self.first,
                last: self.last,
                page_count,
            });
        }
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.last.saturating_sub(self.first) + 1
    }

    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.first..=self.last
    }
}

/// Colour used for area added around a page by margins and bleed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarginFill {
    /// Sampled from the page itself.
    #[default]
    PageBackground,
    Black,
    White,
    Custom(RgbColor),
}

/// Largest margin or bleed, in pixels.
pub const MAX_MARGIN: u32 = 65_536;

/// Margins in pixels. `inner` is the bound edge, `outer` the free edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Margins {
    pub top: u32,
    pub bottom: u32,
    pub inner: u32,
    pub outer: u32,
    pub bleed: u32,
}

/// New canvas size and where the original content lands on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasGrowth {
    pub width: u32,
    pub height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl Margins {
    pub fn is_zero(&self) -> bool {
        self.top == 0 && self.bottom == 0 && self.inner == 0 && self.outer == 0 && self.bleed == 0
    }

    /// Canvas growth for the page at `page_index`, `None` when every margin
    /// is zero.
    ///
    /// Even indices are left-hand pages, so the outer margin is on the left;
    /// odd indices are right-hand pages with the inner margin on the left.
    /// Bleed is added on every side.
    pub fn grow(
        &self,
        page_index: usize,
        width: u32,
        height: u32,
    ) -> Result<Option<CanvasGrowth>, DomainError> {
        if self.is_zero() {
            return Ok(None);
        }
        let left = if page_index % 2 == 0 {
            self.outer
        } else {
            self.inner
        };
        let too_large = || DomainError::InvalidDimensions { width, height };
        let sum = |values: &[u32]| {
            values
                .iter()
                .try_fold(0_u32, |total, value| total.checked_add(*value))
        };
        let bleed = self.bleed.checked_mul(2).ok_or_else(too_large)?;
        Ok(Some(CanvasGrowth {
            width: sum(&[width, self.inner, self.outer, bleed]).ok_or_else(too_large)?,
            height: sum(&[height, self.top, self.bottom, bleed]).ok_or_else(too_large)?,
            offset_x: sum(&[left, self.bleed]).ok_or_else(too_large)?,
            offset_y: sum(&[self.top, self.bleed]).ok_or_else(too_large)?,
        }))
    }

    fn validate(&self) -> Result<(), DomainError> {
        let largest = [self.top, self.bottom, self.inner, self.outer, self.bleed]
            .into_iter()
            .max()
            .unwrap_or(0);
        if largest > MAX_MARGIN {
            return Err(DomainError::InvalidMargin(largest));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    None,
    Linear,
    Cubic,
    #[default]
    Lanczos,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scale {
    Percent { width: f64, height: f64 },
    Pixels { width: u32, height: u32 },
}

impl Default for Scale {
    fn default() -> Self {
        Self::Percent {
            width: 100.0,
            height: 100.0,
        }
    }
}

impl Scale {
    /// Target pixel size for an image currently `width` x `height`.
    pub fn target(&self, width: u32, height: u32) -> Result<(u32, u32), DomainError> {
        let (target_width, target_height) = match *self {
            Self::Percent {
                width: percent_w,
                height: percent_h,
            } => {
                if !percent_w.is_finite() || !percent_h.is_finite() {
                    return Err(DomainError::InvalidScale(
                        "percentages must be finite".to_string(),
                    ));
                }
                (
                    (percent_w / 100.0 * f64::from(width)).floor(),
                    (percent_h / 100.0 * f64::from(height)).floor(),
                )
            }
            Self::Pixels {
                width: pixels_w,
                height: pixels_h,
            } => (f64::from(pixels_w), f64::from(pixels_h)),
        };
        if target_width < 1.0 || target_height < 1.0 || target_width > f64::from(u32::MAX)
            || target_height > f64::from(u32::MAX)
        {
            return Err(DomainError::InvalidScale(format!(
                "{width}x{height} scales to {target_width}x{target_height}"
            )));
        }
        Ok((target_width as u32, target_height as u32))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GifDither {
    #[default]
    None,
    FloydSteinberg,
    /// Floyd-Steinberg with part of the error discarded.
    FloydSteinbergReduced,
    Positioned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GifOptions {
    pub grayscale: bool,
    pub palette_size: u16,
    pub dither: GifDither,
    pub interlace: bool,
}

impl Default for GifOptions {
    fn default() -> Self {
        Self {
            grayscale: false,
            palette_size: 255,
            dither: GifDither::None,
            interlace: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayeredOptions {
    pub flatten: bool,
}

/// Chroma subsampling, named by horizontal x vertical luma sampling factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JpegSubsampling {
    /// 1x1, best quality.
    Chroma444,
    /// 2x1.
    Chroma422,
    /// 1x2.
    Chroma440,
    /// 2x2, smallest file.
    #[default]
    Chroma420,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DctMethod {
    Fast,
    #[default]
    Integer,
    Float,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JpegOptions {
    pub quality: u8,
    pub smoothing: f32,
    pub optimize: bool,
    pub progressive: bool,
    /// Restart interval in MCU rows, when enabled.
    pub restart_rows: Option<u16>,
    pub subsampling: JpegSubsampling,
    pub dct: DctMethod,
    pub comment: String,
}

impl Default for JpegOptions {
    fn default() -> Self {
        Self {
            quality: 85,
            smoothing: 0.0,
            optimize: true,
            progressive: false,
            restart_rows: None,
            subsampling: JpegSubsampling::Chroma420,
            dct: DctMethod::Integer,
            comment: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PsdCompression {
    #[default]
    None,
    Lzw,
    Rle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PsdOptions {
    pub flatten: bool,
    pub compression: PsdCompression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngOptions {
    pub interlace: bool,
    pub compression_level: u8,
    pub save_background: bool,
    pub save_gamma: bool,
    pub save_layer_offset: bool,
    pub save_resolution: bool,
    pub save_creation_time: bool,
    pub save_transparent_color: bool,
}

impl Default for PngOptions {
    fn default() -> Self {
        Self {
            interlace: false,
            compression_level: 9,
            save_background: false,
            save_gamma: false,
            save_layer_offset: false,
            save_resolution: true,
            save_creation_time: true,
            save_transparent_color: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TiffCompression {
    #[default]
    None,
    Lzw,
    Rle,
    Deflate,
    Jpeg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TiffOptions {
    pub compression: TiffCompression,
    pub save_transparent_color: bool,
}

/// Target format of an export, with its encoder options.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportFormat {
    Gif(GifOptions),
    /// The layered working format pages are stored in.
    Native(LayeredOptions),
    Jpeg(JpegOptions),
    OpenRaster(LayeredOptions),
    Psd(PsdOptions),
    Png(PngOptions),
    Tiff(TiffOptions),
}

impl Default for ExportFormat {
    fn default() -> Self {
        Self::Jpeg(JpegOptions::default())
    }
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gif(_) => "gif",
            Self::Native(_) => crate::PAGE_EXTENSION,
            Self::Jpeg(_) => "jpg",
            Self::OpenRaster(_) => "ora",
            Self::Psd(_) => "psd",
            Self::Png(_) => "png",
            Self::Tiff(_) => "tif",
        }
    }

    /// Only layered formats may skip flattening, and only when asked to.
    pub fn should_flatten(&self) -> bool {
        match self {
            Self::Native(options) | Self::OpenRaster(options) => options.flatten,
            Self::Psd(options) => options.flatten,
            _ => true,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            Self::Gif(options) => {
                if !(2..=256).contains(&options.palette_size) {
                    return Err(DomainError::InvalidPaletteSize(options.palette_size));
                }
            }
            Self::Jpeg(options) => {
                if options.quality > 100 {
                    return Err(DomainError::InvalidQuality(options.quality));
                }
                if !(0.0..=1.0).contains(&options.smoothing) {
                    return Err(DomainError::InvalidSmoothing(options.smoothing));
                }
                if let Some(rows) = options.restart_rows {
                    if !(1..=64).contains(&rows) {
                        return Err(DomainError::InvalidRestartFrequency(rows));
                    }
                }
            }
            Self::Png(options) => {
                if options.compression_level > 9 {
                    return Err(DomainError::InvalidCompressionLevel(
                        options.compression_level,
                    ));
                }
            }
            Self::Native(_) | Self::OpenRaster(_) | Self::Psd(_) | Self::Tiff(_) => {}
        }
        Ok(())
    }
}

/// Digits needed to number every page of a book.
pub fn page_number_padding(page_count: usize) -> usize {
    match page_count {
        0..=9 => 1,
        10..=99 => 2,
        100..=999 => 3,
        _ => 4,
    }
}

/// Output file name for one page, e.g. `007_MyBook.jpg` or `12.png`.
pub fn output_file_name(
    scheme: &NamingScheme,
    page_index: usize,
    padding: usize,
    book_name: &str,
    page_file_name: &str,
    extension: &str,
) -> String {
    let number = format!("{page_index:0padding$}");
    match scheme {
        NamingScheme::BookName => format!("{number}_{book_name}.{extension}"),
        NamingScheme::PageName => {
            format!("{number}_{}.{extension}", page_base_name(page_file_name))
        }
        NamingScheme::PageNumber => format!("{number}.{extension}"),
        NamingScheme::Custom(name) => format!("{number}_{name}.{extension}"),
    }
}

/// What to do with the rest of the range after a page fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    #[default]
    Continue,
    Abort,
}

/// One batch export request. Output goes to `destination/<book name>/`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportJob {
    pub destination: PathBuf,
    /// `None` exports every page.
    pub range: Option<PageRange>,
    pub naming: NamingScheme,
    pub tags: TagFilter,
    pub margins: Margins,
    pub margin_fill: MarginFill,
    pub scale: Scale,
    pub interpolation: Interpolation,
    pub format: ExportFormat,
    pub on_error: ErrorPolicy,
}

impl ExportJob {
    pub fn new(destination: PathBuf) -> Self {
        Self {
            destination,
            range: None,
            naming: NamingScheme::default(),
            tags: TagFilter::default(),
            margins: Margins::default(),
            margin_fill: MarginFill::default(),
            scale: Scale::default(),
            interpolation: Interpolation::default(),
            format: ExportFormat::default(),
            on_error: ErrorPolicy::default(),
        }
    }

    /// Checks the job against a book of `page_count` pages and returns the
    /// range to export.
    pub fn resolve_range(&self, page_count: usize) -> Result<PageRange, DomainError> {
        let range = self.range.unwrap_or_else(|| PageRange::all(page_count));
        range.validate(page_count)?;
        if let NamingScheme::Custom(name) = &self.naming {
            // Must already be a valid file name; nothing is rewritten here.
            let parsed = PageName::parse(name)?;
            if parsed.was_truncated() || parsed.base() != name {
                return Err(DomainError::InvalidName(name.clone()));
            }
        }
        self.margins.validate()?;
        self.format.validate()?;
        Ok(range)
    }
}
