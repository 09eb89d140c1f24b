mod error;
mod export;
#[cfg(test)]
mod fakes;
mod ports;
mod service;
mod use_cases;

pub use error::ApplicationError;
pub use export::{export_output_dir, ExportReport, ExportState, PageFailure};
pub use ports::{
    BookStorage, Clock, ImageHost, ImageScanner, LayerInfo, PageDocument, ThumbnailArtifact,
    ThumbnailGenerator,
};
pub use service::BookService;
pub use use_cases::{
    AddPageCommand, CreateBookCommand, DuplicatePageCommand, ExportBookCommand,
    ImportFolderCommand, ImportPagesCommand, ImportReport, MovePageCommand, OpenBookCommand,
    Progress, RenamePageCommand, SetDisplayModeCommand,
};
