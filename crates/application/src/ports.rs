use std::path::{Path, PathBuf};

use pagebook_domain::{
    BookMetadata, CanvasGrowth, ExportFormat, Interpolation, MarginFill, NewBookSpec,
    ThumbnailSize,
};

use crate::ApplicationError;

/// Filesystem operations a book needs. Paths are absolute.
pub trait BookStorage {
    fn is_dir(&self, path: &Path) -> bool;

    fn exists(&self, path: &Path) -> bool;

    fn create_dir_all(&self, path: &Path) -> Result<(), ApplicationError>;

    /// Fails with `NotFound` or `CorruptMetadata`.
    fn read_metadata(&self, book_file: &Path) -> Result<BookMetadata, ApplicationError>;

    /// Replaces the metadata file atomically.
    fn write_metadata(&self, book_file: &Path, metadata: &BookMetadata)
        -> Result<(), ApplicationError>;

    /// Copies a file to a path that must not exist yet; a collision is
    /// reported as `DuplicateName`.
    fn copy_new(&self, from: &Path, to: &Path) -> Result<(), ApplicationError>;

    /// Moves a file to a path that must not exist yet; a collision is
    /// reported as `DuplicateName`.
    fn move_new(&self, from: &Path, to: &Path) -> Result<(), ApplicationError>;

    fn is_empty_dir(&self, path: &Path) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    pub name: String,
    pub visible: bool,
}

/// An image loaded into the host. Dropping it releases its resources.
pub trait PageDocument {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Layers from top to bottom.
    fn layers(&self) -> Vec<LayerInfo>;

    fn set_layer_visible(&mut self, index: usize, visible: bool) -> Result<(), ApplicationError>;

    /// Merges visible layers into one opaque layer.
    fn flatten(&mut self);

    /// Grows the canvas, moves the content by the growth offset and fills the
    /// new area of the bottom layer.
    fn resize_canvas(
        &mut self,
        growth: CanvasGrowth,
        fill: MarginFill,
    ) -> Result<(), ApplicationError>;

    fn scale(
        &mut self,
        width: u32,
        height: u32,
        interpolation: Interpolation,
    ) -> Result<(), ApplicationError>;

    /// Writes the document in the working page format.
    fn save_page(&self, path: &Path) -> Result<(), ApplicationError>;

    fn export(&self, path: &Path, format: &ExportFormat) -> Result<(), ApplicationError>;
}

/// The image-editing backend that creates, loads and encodes documents.
pub trait ImageHost {
    fn create_document(&self, spec: &NewBookSpec)
        -> Result<Box<dyn PageDocument>, ApplicationError>;

    /// Opens a working-format page or any raster image the host can decode.
    fn open_document(&self, path: &Path) -> Result<Box<dyn PageDocument>, ApplicationError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailArtifact {
    pub file_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub rebuilt: bool,
}

pub trait ThumbnailGenerator {
    /// Returns the cached thumbnail, rebuilding it when missing or older than
    /// the page file.
    fn ensure_thumbnail(
        &self,
        page_path: &Path,
        thumbs_dir: &Path,
        size: ThumbnailSize,
    ) -> Result<ThumbnailArtifact, ApplicationError>;

    /// Moves every cached size of a page's thumbnail to its new name.
    fn rename_thumbnails(
        &self,
        thumbs_dir: &Path,
        old_page: &str,
        new_page: &str,
    ) -> Result<(), ApplicationError>;

    /// Deletes every cached size of a page's thumbnail.
    fn remove_thumbnails(&self, thumbs_dir: &Path, page: &str) -> Result<(), ApplicationError>;
}

pub trait ImageScanner {
    /// Files under `folder` the host can import, sorted by path.
    fn scan_importable(&self, folder: &Path) -> Result<Vec<PathBuf>, ApplicationError>;
}

pub trait Clock {
    /// Local time as `YYYYMMDD_HHMMSS`, used to prefix trashed pages.
    fn now_timestamp_string(&self) -> String;
}
