use std::path::PathBuf;

use pagebook_domain::{DisplayMode, ExportJob, NewBookSpec};

#[derive(Debug, Clone)]
pub struct CreateBookCommand {
    pub destination: PathBuf,
    pub name: String,
    pub spec: NewBookSpec,
}

#[derive(Debug, Clone)]
pub struct OpenBookCommand {
    pub book_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AddPageCommand {
    pub name: String,
    pub insert_at: usize,
}

#[derive(Debug, Clone)]
pub struct DuplicatePageCommand {
    pub source_index: usize,
    pub name: String,
    pub insert_at: usize,
}

#[derive(Debug, Clone)]
pub struct ImportPagesCommand {
    /// Files in the order they should appear in the book.
    pub files: Vec<PathBuf>,
    pub insert_at: usize,
}

#[derive(Debug, Clone)]
pub struct ImportFolderCommand {
    pub folder: PathBuf,
    pub insert_at: usize,
}

#[derive(Debug, Clone)]
pub struct RenamePageCommand {
    pub name: String,
}

#[derive(Debug, Clone, Copy)]
pub struct MovePageCommand {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SetDisplayModeCommand {
    pub mode: DisplayMode,
}

#[derive(Debug, Clone)]
pub struct ExportBookCommand {
    pub job: ExportJob,
}

/// Progress of a long operation, for UI feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub current: String,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.completed as f64 / self.total as f64).min(1.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: Vec<String>,
    pub skipped: Vec<(PathBuf, String)>,
}
