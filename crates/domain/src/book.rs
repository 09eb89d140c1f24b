use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::page::same_page_name;
use crate::DomainError;

pub const BOOK_EXTENSION: &str = "book";
pub const PAGES_DIR: &str = "pages";
pub const TRASH_DIR: &str = "trash";
pub const THUMBS_DIR: &str = "thumbs";

/// Number of thumbnail columns in grid mode.
pub const GRID_COLUMNS: usize = 2;

/// On-disk shape of `<name>.book`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    #[serde(
        rename = "storyboardmode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub storyboard_mode: Option<u8>,
    #[serde(rename = "thumbsize", default, skip_serializing_if = "Option::is_none")]
    pub thumb_size: Option<u32>,
    pub pages: Vec<String>,
}

impl BookMetadata {
    pub fn with_pages(pages: Vec<String>) -> Self {
        Self {
            storyboard_mode: None,
            thumb_size: None,
            pages,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Grid,
    /// Single free-flowing column, used for storyboards.
    Flow,
}

impl DisplayMode {
    pub fn from_flag(flag: u8) -> Self {
        if flag == 0 {
            Self::Grid
        } else {
            Self::Flow
        }
    }

    pub fn as_flag(self) -> u8 {
        match self {
            Self::Grid => 0,
            Self::Flow => 1,
        }
    }

    /// Column count for a thumbnail view; `None` lets items flow.
    pub fn columns(self) -> Option<usize> {
        match self {
            Self::Grid => Some(GRID_COLUMNS),
            Self::Flow => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThumbnailSize(u32);

impl ThumbnailSize {
    pub const MIN: Self = Self(128);
    pub const DEFAULT: Self = Self(256);
    pub const MAX: Self = Self(512);
    pub const ALL: [Self; 3] = [Self::MIN, Self::DEFAULT, Self::MAX];

    pub fn new(value: u32) -> Result<Self, DomainError> {
        Self::ALL
            .into_iter()
            .find(|size| size.0 == value)
            .ok_or(DomainError::InvalidThumbnailSize(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn zoom_in(self) -> Self {
        Self((self.0 * 2).min(Self::MAX.0))
    }

    pub fn zoom_out(self) -> Self {
        Self((self.0 / 2).max(Self::MIN.0))
    }
}

impl Default for ThumbnailSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Dimensions of a thumbnail whose longer edge equals `size`.
pub fn thumbnail_dimensions(width: u32, height: u32, size: ThumbnailSize) -> (u32, u32) {
    let size = size.get();
    let long = width.max(height).max(1);
    let short = width.min(height);
    let scaled = ((f64::from(size) * f64::from(short) / f64::from(long)).round() as u32).max(1);
    if width >= height {
        (size, scaled)
    } else {
        (scaled, size)
    }
}

/// An open book: ordered page list plus the paths derived from its metadata file.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    name: String,
    book_file: PathBuf,
    pages: Vec<String>,
    thumbnail_size: ThumbnailSize,
    display_mode: DisplayMode,
    selected: Option<usize>,
}

impl Book {
    pub fn new(
        book_file: PathBuf,
        pages: Vec<String>,
        thumbnail_size: ThumbnailSize,
        display_mode: DisplayMode,
    ) -> Self {
        let name = book_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            name,
            book_file,
            pages,
            thumbnail_size,
            display_mode,
            selected: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn book_file(&self) -> &Path {
        &self.book_file
    }

    pub fn root(&self) -> &Path {
        self.book_file.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.root().join(PAGES_DIR)
    }

    pub fn trash_dir(&self) -> PathBuf {
        self.root().join(TRASH_DIR)
    }

    pub fn thumbs_dir(&self) -> PathBuf {
        self.root().join(THUMBS_DIR)
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Result<&str, DomainError> {
        self.pages
            .get(index)
            .map(String::as_str)
            .ok_or(DomainError::InvalidPageIndex {
                index,
                page_count: self.pages.len(),
            })
    }

    pub fn page_path(&self, index: usize) -> Result<PathBuf, DomainError> {
        Ok(self.pages_dir().join(self.page(index)?))
    }

    /// Index of a page whose name matches `file_name`, ignoring case.
    pub fn find_page(&self, file_name: &str) -> Option<usize> {
        self.pages
            .iter()
            .position(|page| same_page_name(page, file_name))
    }

    pub fn thumbnail_size(&self) -> ThumbnailSize {
        self.thumbnail_size
    }

    pub fn set_thumbnail_size(&mut self, size: ThumbnailSize) {
        self.thumbnail_size = size;
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.display_mode = mode;
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn select(&mut self, index: Option<usize>) -> Result<(), DomainError> {
        if let Some(index) = index {
            self.page(index)?;
        }
        self.selected = index;
        Ok(())
    }

    /// Inserts a page; an index past the end appends.
    pub fn insert_page(&mut self, index: usize, file_name: String) -> usize {
        let index = index.min(self.pages.len());
        self.pages.insert(index, file_name);
        if let Some(selected) = self.selected {
            if selected >= index {
                self.selected = Some(selected + 1);
            }
        }
        index
    }

    pub fn replace_page(&mut self, index: usize, file_name: String) -> Result<String, DomainError> {
        self.page(index)?;
        Ok(std::mem::replace(&mut self.pages[index], file_name))
    }

    pub fn remove_page(&mut self, index: usize) -> Result<String, DomainError> {
        self.page(index)?;
        let removed = self.pages.remove(index);
        self.selected = match self.selected {
            Some(selected) if selected == index => None,
            Some(selected) if selected > index => Some(selected - 1),
            other => other,
        };
        Ok(removed)
    }

    /// Moves one page; the selection follows the page it pointed at.
    pub fn move_page(&mut self, from: usize, to: usize) -> Result<(), DomainError> {
        self.page(from)?;
        self.page(to)?;
        let page = self.pages.remove(from);
        self.pages.insert(to, page);
        self.selected = self.selected.map(|selected| {
            if selected == from {
                to
            } else if from < selected && selected <= to {
                selected - 1
            } else if to <= selected && selected < from {
                selected + 1
            } else {
                selected
            }
        });
        Ok(())
    }

    pub fn to_metadata(&self) -> BookMetadata {
        BookMetadata {
            storyboard_mode: Some(self.display_mode.as_flag()),
            thumb_size: Some(self.thumbnail_size.get()),
            pages: self.pages.clone(),
        }
    }
}

pub fn book_file_name(name: &str) -> String {
    format!("{name}.{BOOK_EXTENSION}")
}
