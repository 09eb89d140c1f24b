pub mod encoders;
pub mod fs;
pub mod presenters;
pub mod raster;

pub use fs::{FsBookStorage, FsThumbnailGenerator, SystemClock, WalkdirImageScanner};
pub use presenters::{
    present_book, present_export_report, present_import_report, present_page_row,
    present_progress,
};
pub use raster::RasterHost;
