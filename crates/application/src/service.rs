use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use pagebook_domain::{
    book_file_name, page_file_name, same_page_name, Book, BookMetadata, DisplayMode, ExportJob,
    PageName, ThumbnailSize, MAX_PAGE_NAME_CHARS, PAGES_DIR, TEMPLATE_PAGE, THUMBS_DIR, TRASH_DIR,
};

use crate::export::{export_output_dir, ExportPipeline};
use crate::{
    AddPageCommand, ApplicationError, BookStorage, Clock, CreateBookCommand,
    DuplicatePageCommand, ExportBookCommand, ExportReport, ImageHost, ImageScanner,
    ImportFolderCommand, ImportPagesCommand, ImportReport, MovePageCommand, OpenBookCommand,
    Progress, RenamePageCommand, SetDisplayModeCommand, ThumbnailArtifact, ThumbnailGenerator,
};

/// Book lifecycle and page edits. Every structural change is written through
/// to the metadata file before the call returns.
pub struct BookService {
    storage: Box<dyn BookStorage>,
    host: Box<dyn ImageHost>,
    thumbnails: Box<dyn ThumbnailGenerator>,
    scanner: Box<dyn ImageScanner>,
    clock: Box<dyn Clock>,
}

impl BookService {
    pub fn new(
        storage: Box<dyn BookStorage>,
        host: Box<dyn ImageHost>,
        thumbnails: Box<dyn ThumbnailGenerator>,
        scanner: Box<dyn ImageScanner>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            host,
            thumbnails,
            scanner,
            clock,
        }
    }

    pub fn create_book(
        &self,
        command: CreateBookCommand,
        progress: &mut dyn FnMut(&Progress),
    ) -> Result<Book, ApplicationError> {
        if !self.storage.is_dir(&command.destination) {
            return Err(ApplicationError::InvalidDestination(
                command.destination.display().to_string(),
            ));
        }
        let name = command.name.trim();
        if name.is_empty() {
            return Err(ApplicationError::EmptyName);
        }
        if name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(ApplicationError::InvalidName(name.to_string()));
        }
        command.spec.validate()?;

        let root = command.destination.join(name);
        let book_file = root.join(book_file_name(name));
        if self.storage.exists(&book_file) {
            return Err(ApplicationError::DuplicateName(book_file_name(name)));
        }

        for dir in [PAGES_DIR, TRASH_DIR, THUMBS_DIR] {
            self.storage.create_dir_all(&root.join(dir))?;
        }

        let template = page_file_name(TEMPLATE_PAGE);
        let document = self.host.create_document(&command.spec)?;
        document.save_page(&root.join(PAGES_DIR).join(&template))?;
        drop(document);

        self.storage
            .write_metadata(&book_file, &BookMetadata::with_pages(vec![template]))?;
        info!("created book {name:?} in {}", root.display());

        self.open_book(OpenBookCommand { book_file }, progress)
    }

    pub fn open_book(
        &self,
        command: OpenBookCommand,
        progress: &mut dyn FnMut(&Progress),
    ) -> Result<Book, ApplicationError> {
        let metadata = self.storage.read_metadata(&command.book_file)?;
        if metadata.pages.is_empty() {
            return Err(ApplicationError::CorruptMetadata(
                "book lists no pages".to_string(),
            ));
        }
        for (index, page) in metadata.pages.iter().enumerate() {
            if metadata.pages[..index]
                .iter()
                .any(|earlier| same_page_name(earlier, page))
            {
                return Err(ApplicationError::CorruptMetadata(format!(
                    "page {page:?} is listed twice"
                )));
            }
        }

        let thumbnail_size = match metadata.thumb_size.map(ThumbnailSize::new).transpose() {
            Ok(size) => size.unwrap_or_default(),
            Err(error) => {
                warn!("{error}; using the default thumbnail size");
                ThumbnailSize::default()
            }
        };
        let display_mode = metadata
            .storyboard_mode
            .map(DisplayMode::from_flag)
            .unwrap_or_default();
        let book = Book::new(
            command.book_file,
            metadata.pages,
            thumbnail_size,
            display_mode,
        );

        for page in book.pages() {
            if !self.storage.exists(&book.pages_dir().join(page)) {
                return Err(ApplicationError::MissingPage(page.clone()));
            }
        }

        self.refresh_thumbnails(&book, progress)?;
        info!(
            "opened book {:?} with {} pages",
            book.name(),
            book.page_count()
        );
        Ok(book)
    }

    pub fn save_book(&self, book: &Book) -> Result<(), ApplicationError> {
        self.storage
            .write_metadata(book.book_file(), &book.to_metadata())
    }

    pub fn add_page(
        &self,
        book: &mut Book,
        command: AddPageCommand,
    ) -> Result<usize, ApplicationError> {
        let name = self.validate_new_page(book, &command.name, None)?;
        let template = book.page_path(0)?;
        self.insert_copy(book, &template, name.file_name(), command.insert_at)
    }

    pub fn duplicate_page(
        &self,
        book: &mut Book,
        command: DuplicatePageCommand,
    ) -> Result<usize, ApplicationError> {
        let source = book.page_path(command.source_index)?;
        let name = self.validate_new_page(book, &command.name, None)?;
        self.insert_copy(book, &source, name.file_name(), command.insert_at)
    }

    /// Imports external images as new pages, in the order given. Files that
    /// cannot be imported are skipped and listed in the report.
    pub fn import_pages(
        &self,
        book: &mut Book,
        command: ImportPagesCommand,
        progress: &mut dyn FnMut(&Progress),
    ) -> Result<ImportReport, ApplicationError> {
        let total = command.files.len();
        let mut insert_at = command.insert_at.min(book.page_count());
        let mut report = ImportReport::default();

        for (done, file) in command.files.into_iter().enumerate() {
            progress(&Progress {
                completed: done,
                total,
                current: file.display().to_string(),
            });

            let file_name = match self.import_file(book, &file) {
                Ok(file_name) => file_name,
                Err(error) => {
                    warn!("skipping import of {}: {error}", file.display());
                    report.skipped.push((file, error.to_string()));
                    continue;
                }
            };

            let snapshot = book.clone();
            book.insert_page(insert_at, file_name.clone());
            self.commit(book, snapshot)?;
            self.warm_thumbnail(book, &file_name);
            insert_at += 1;
            report.imported.push(file_name);
        }

        progress(&Progress {
            completed: total,
            total,
            current: String::new(),
        });
        Ok(report)
    }

    pub fn import_folder(
        &self,
        book: &mut Book,
        command: ImportFolderCommand,
        progress: &mut dyn FnMut(&Progress),
    ) -> Result<ImportReport, ApplicationError> {
        let files = self.scanner.scan_importable(&command.folder)?;
        debug!(
            "found {} importable files in {}",
            files.len(),
            command.folder.display()
        );
        self.import_pages(
            book,
            ImportPagesCommand {
                files,
                insert_at: command.insert_at,
            },
            progress,
        )
    }

    /// Renames the selected page, keeping its position.
    pub fn rename_page(
        &self,
        book: &mut Book,
        command: RenamePageCommand,
    ) -> Result<String, ApplicationError> {
        let index = book.selected().ok_or(ApplicationError::NoSelection)?;
        let name = self.validate_new_page(book, &command.name, Some(index))?;
        let old = book.page(index)?.to_string();
        let new = name.file_name();
        if old == new {
            return Ok(new);
        }

        let pages_dir = book.pages_dir();
        self.storage
            .move_new(&pages_dir.join(&old), &pages_dir.join(&new))?;

        let snapshot = book.clone();
        book.replace_page(index, new.clone())?;
        self.commit(book, snapshot)?;

        if let Err(error) = self
            .thumbnails
            .rename_thumbnails(&book.thumbs_dir(), &old, &new)
        {
            warn!("could not rename thumbnails of {old:?}: {error}");
        }
        info!("renamed page {old:?} to {new:?}");
        Ok(new)
    }

    /// Moves the selected page into the trash folder under a timestamped name.
    pub fn delete_page(&self, book: &mut Book) -> Result<PathBuf, ApplicationError> {
        let index = book.selected().ok_or(ApplicationError::NoSelection)?;
        if book.page_count() <= 1 {
            return Err(ApplicationError::LastPage);
        }
        let page = book.page(index)?.to_string();
        let trash_dir = book.trash_dir();
        let trashed = trash_dir.join(format!("{}_{page}", self.clock.now_timestamp_string()));

        self.storage.create_dir_all(&trash_dir)?;
        self.storage
            .move_new(&book.pages_dir().join(&page), &trashed)?;

        let snapshot = book.clone();
        book.remove_page(index)?;
        self.commit(book, snapshot)?;

        if let Err(error) = self
            .thumbnails
            .remove_thumbnails(&book.thumbs_dir(), &page)
        {
            warn!("could not remove thumbnails of {page:?}: {error}");
        }
        info!("moved page {page:?} to {}", trashed.display());
        Ok(trashed)
    }

    pub fn move_page(
        &self,
        book: &mut Book,
        command: MovePageCommand,
    ) -> Result<(), ApplicationError> {
        let snapshot = book.clone();
        book.move_page(command.from, command.to)?;
        self.commit(book, snapshot)
    }

    pub fn select_page(
        &self,
        book: &mut Book,
        index: Option<usize>,
    ) -> Result<(), ApplicationError> {
        book.select(index)?;
        Ok(())
    }

    pub fn set_display_mode(
        &self,
        book: &mut Book,
        command: SetDisplayModeCommand,
    ) -> Result<(), ApplicationError> {
        let snapshot = book.clone();
        book.set_display_mode(command.mode);
        self.commit(book, snapshot)
    }

    pub fn zoom_in(
        &self,
        book: &mut Book,
        progress: &mut dyn FnMut(&Progress),
    ) -> Result<ThumbnailSize, ApplicationError> {
        let size = book.thumbnail_size().zoom_in();
        self.set_thumbnail_size(book, size, progress)
    }

    pub fn zoom_out(
        &self,
        book: &mut Book,
        progress: &mut dyn FnMut(&Progress),
    ) -> Result<ThumbnailSize, ApplicationError> {
        let size = book.thumbnail_size().zoom_out();
        self.set_thumbnail_size(book, size, progress)
    }

    /// Brings every page's thumbnail up to date at the book's current size.
    pub fn refresh_thumbnails(
        &self,
        book: &Book,
        progress: &mut dyn FnMut(&Progress),
    ) -> Result<Vec<ThumbnailArtifact>, ApplicationError> {
        let total = book.page_count();
        let mut artifacts = Vec::with_capacity(total);
        for (index, page) in book.pages().iter().enumerate() {
            progress(&Progress {
                completed: index,
                total,
                current: page.clone(),
            });
            artifacts.push(self.thumbnail(book, index)?);
        }
        progress(&Progress {
            completed: total,
            total,
            current: String::new(),
        });
        Ok(artifacts)
    }

    pub fn thumbnail(
        &self,
        book: &Book,
        index: usize,
    ) -> Result<ThumbnailArtifact, ApplicationError> {
        self.thumbnails.ensure_thumbnail(
            &book.page_path(index)?,
            &book.thumbs_dir(),
            book.thumbnail_size(),
        )
    }

    /// Absolute path of a page file, for opening it in an editor.
    pub fn page_path(&self, book: &Book, index: usize) -> Result<PathBuf, ApplicationError> {
        Ok(book.page_path(index)?)
    }

    /// Pixel size of the first page.
    pub fn template_size(&self, book: &Book) -> Result<(u32, u32), ApplicationError> {
        let document = self.host.open_document(&book.page_path(0)?)?;
        Ok((document.width(), document.height()))
    }

    /// True when an export would write into a folder that already holds
    /// files. Callers confirm the overwrite before calling `export_book`.
    pub fn export_would_overwrite(&self, book: &Book, job: &ExportJob) -> bool {
        let output_dir = export_output_dir(book, job);
        self.storage.is_dir(&output_dir) && !self.storage.is_empty_dir(&output_dir)
    }

    pub fn export_book(
        &self,
        book: &Book,
        command: ExportBookCommand,
        progress: &mut dyn FnMut(&Progress),
    ) -> Result<ExportReport, ApplicationError> {
        ExportPipeline::new(self.storage.as_ref(), self.host.as_ref()).run(
            book,
            &command.job,
            progress,
        )
    }

    fn set_thumbnail_size(
        &self,
        book: &mut Book,
        size: ThumbnailSize,
        progress: &mut dyn FnMut(&Progress),
    ) -> Result<ThumbnailSize, ApplicationError> {
        if size == book.thumbnail_size() {
            return Ok(size);
        }
        let snapshot = book.clone();
        book.set_thumbnail_size(size);
        self.commit(book, snapshot)?;
        self.refresh_thumbnails(book, progress)?;
        Ok(size)
    }

    /// Validates a page name and checks it against the book and the pages
    /// folder. `renaming` is the index of the page being renamed, if any.
    fn validate_new_page(
        &self,
        book: &Book,
        input: &str,
        renaming: Option<usize>,
    ) -> Result<PageName, ApplicationError> {
        let name = PageName::parse(input)?;
        if name.was_truncated() {
            warn!("page name truncated to {MAX_PAGE_NAME_CHARS} characters");
        }

        let file_name = name.file_name();
        let renaming_itself = renaming
            .and_then(|index| book.page(index).ok())
            .is_some_and(|current| same_page_name(current, &file_name));
        if renaming_itself {
            return Ok(name);
        }

        let listed = book.find_page(&file_name).is_some();
        if listed || self.storage.exists(&book.pages_dir().join(&file_name)) {
            return Err(ApplicationError::DuplicateName(file_name));
        }
        Ok(name)
    }

    fn insert_copy(
        &self,
        book: &mut Book,
        source: &Path,
        file_name: String,
        insert_at: usize,
    ) -> Result<usize, ApplicationError> {
        self.storage
            .copy_new(source, &book.pages_dir().join(&file_name))?;

        let snapshot = book.clone();
        let index = book.insert_page(insert_at, file_name.clone());
        self.commit(book, snapshot)?;
        self.warm_thumbnail(book, &file_name);
        info!("added page {file_name:?} at position {index}");
        Ok(index)
    }

    fn import_file(&self, book: &Book, file: &Path) -> Result<String, ApplicationError> {
        let stem = file
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .ok_or_else(|| ApplicationError::InvalidInput(file.display().to_string()))?;
        let name = self.validate_new_page(book, &stem, None)?;
        let file_name = name.file_name();

        let document = self.host.open_document(file)?;
        document.save_page(&book.pages_dir().join(&file_name))?;
        Ok(file_name)
    }

    fn warm_thumbnail(&self, book: &Book, file_name: &str) {
        let page_path = book.pages_dir().join(file_name);
        if let Err(error) =
            self.thumbnails
                .ensure_thumbnail(&page_path, &book.thumbs_dir(), book.thumbnail_size())
        {
            warn!("could not build thumbnail for {file_name:?}: {error}");
        }
    }

    /// Persists `book`; on failure the in-memory book is rolled back so it
    /// never diverges from the metadata file.
    fn commit(&self, book: &mut Book, snapshot: Book) -> Result<(), ApplicationError> {
        if let Err(error) = self.save_book(book) {
            *book = snapshot;
            return Err(error);
        }
        Ok(())
    }
}
