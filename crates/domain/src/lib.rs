mod book;
mod color;
mod error;
mod export;
mod layer;
mod new_book;
mod page;

pub use book::{
    book_file_name, thumbnail_dimensions, Book, BookMetadata, DisplayMode, ThumbnailSize,
    BOOK_EXTENSION, GRID_COLUMNS, PAGES_DIR, THUMBS_DIR, TRASH_DIR,
};
pub use color::RgbColor;
pub use error::DomainError;
pub use export::{
    output_file_name, page_number_padding, CanvasGrowth, DctMethod, ErrorPolicy, ExportFormat,
    ExportJob, GifDither, GifOptions, Interpolation, JpegOptions, JpegSubsampling,
    LayeredOptions, MarginFill, Margins, NamingScheme, PageRange, PngOptions, PsdCompression,
    PsdOptions, Scale, TiffCompression, TiffOptions, MAX_MARGIN,
};
pub use layer::{extract_tags, TagFilter, UntaggedPolicy};
pub use new_book::{ColorMode, FillMode, GuideBox, NewBookSpec};
pub use page::{
    page_base_name, page_file_name, same_page_name, PageName, MAX_PAGE_NAME_CHARS,
    PAGE_EXTENSION, TEMPLATE_PAGE,
};
