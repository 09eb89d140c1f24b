//! In-memory ports shared by the service and export tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use pagebook_domain::{
    BookMetadata, CanvasGrowth, ExportFormat, Interpolation, MarginFill, NewBookSpec,
    ThumbnailSize,
};

use crate::{
    ApplicationError, BookService, BookStorage, Clock, ImageHost, ImageScanner, LayerInfo,
    PageDocument, ThumbnailArtifact, ThumbnailGenerator,
};

pub const TIMESTAMP: &str = "20260102_030405";

#[derive(Debug, Clone, PartialEq)]
pub struct FakePage {
    pub width: u32,
    pub height: u32,
    pub layers: Vec<LayerInfo>,
}

impl FakePage {
    pub fn new(width: u32, height: u32, layers: &[(&str, bool)]) -> Self {
        Self {
            width,
            height,
            layers: layers
                .iter()
                .map(|(name, visible)| LayerInfo {
                    name: name.to_string(),
                    visible: *visible,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportRecord {
    pub path: PathBuf,
    pub extension: &'static str,
    pub width: u32,
    pub height: u32,
    pub layers: Vec<LayerInfo>,
    pub flattened: bool,
    pub growth: Option<(CanvasGrowth, MarginFill)>,
    pub interpolation: Option<Interpolation>,
}

#[derive(Default)]
pub struct World {
    pub files: BTreeMap<PathBuf, FakePage>,
    pub dirs: BTreeSet<PathBuf>,
    pub metadata: BTreeMap<PathBuf, BookMetadata>,
    pub corrupt: BTreeSet<PathBuf>,
    pub fail_metadata_writes: bool,
    pub undecodable: BTreeSet<PathBuf>,
    pub failing_exports: BTreeSet<String>,
    pub exports: Vec<ExportRecord>,
    pub thumbs: BTreeSet<(String, u32)>,
    pub importable: Vec<PathBuf>,
}

pub type SharedWorld = Rc<RefCell<World>>;

pub fn service(world: &SharedWorld) -> BookService {
    BookService::new(
        Box::new(FakeStorage(world.clone())),
        Box::new(FakeHost(world.clone())),
        Box::new(FakeThumbnails(world.clone())),
        Box::new(FakeScanner(world.clone())),
        Box::new(FixedClock),
    )
}

pub struct FakeStorage(pub SharedWorld);

impl BookStorage for FakeStorage {
    fn is_dir(&self, path: &Path) -> bool {
        self.0.borrow().dirs.contains(path)
    }

    fn exists(&self, path: &Path) -> bool {
        let world = self.0.borrow();
        world.files.contains_key(path)
            || world.metadata.contains_key(path)
            || world.dirs.contains(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), ApplicationError> {
        let mut world = self.0.borrow_mut();
        for ancestor in path.ancestors() {
            world.dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    fn read_metadata(&self, book_file: &Path) -> Result<BookMetadata, ApplicationError> {
        let world = self.0.borrow();
        if world.corrupt.contains(book_file) {
            return Err(ApplicationError::CorruptMetadata("not json".to_string()));
        }
        world
            .metadata
            .get(book_file)
            .cloned()
            .ok_or_else(|| ApplicationError::NotFound(book_file.display().to_string()))
    }

    fn write_metadata(
        &self,
        book_file: &Path,
        metadata: &BookMetadata,
    ) -> Result<(), ApplicationError> {
        let mut world = self.0.borrow_mut();
        if world.fail_metadata_writes {
            return Err(ApplicationError::Io("disk full".to_string()));
        }
        world
            .metadata
            .insert(book_file.to_path_buf(), metadata.clone());
        Ok(())
    }

    fn copy_new(&self, from: &Path, to: &Path) -> Result<(), ApplicationError> {
        let mut world = self.0.borrow_mut();
        if world.files.contains_key(to) {
            return Err(ApplicationError::DuplicateName(to.display().to_string()));
        }
        let page = world
            .files
            .get(from)
            .cloned()
            .ok_or_else(|| ApplicationError::NotFound(from.display().to_string()))?;
        world.files.insert(to.to_path_buf(), page);
        Ok(())
    }

    fn move_new(&self, from: &Path, to: &Path) -> Result<(), ApplicationError> {
        let mut world = self.0.borrow_mut();
        if world.files.contains_key(to) {
            return Err(ApplicationError::DuplicateName(to.display().to_string()));
        }
        let page = world
            .files
            .remove(from)
            .ok_or_else(|| ApplicationError::NotFound(from.display().to_string()))?;
        world.files.insert(to.to_path_buf(), page);
        Ok(())
    }

    fn is_empty_dir(&self, path: &Path) -> bool {
        !self
            .0
            .borrow()
            .files
            .keys()
            .any(|file| file.starts_with(path))
    }
}

pub struct FakeHost(pub SharedWorld);

impl ImageHost for FakeHost {
    fn create_document(
        &self,
        spec: &NewBookSpec,
    ) -> Result<Box<dyn PageDocument>, ApplicationError> {
        Ok(Box::new(FakeDocument::new(
            self.0.clone(),
            FakePage::new(spec.width, spec.height, &[("Background", true)]),
        )))
    }

    fn open_document(&self, path: &Path) -> Result<Box<dyn PageDocument>, ApplicationError> {
        let world = self.0.borrow();
        if world.undecodable.contains(path) {
            return Err(ApplicationError::Decode(path.display().to_string()));
        }
        let page = world
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| ApplicationError::NotFound(path.display().to_string()))?;
        Ok(Box::new(FakeDocument::new(self.0.clone(), page)))
    }
}

pub struct FakeDocument {
    world: SharedWorld,
    page: FakePage,
    flattened: bool,
    growth: Option<(CanvasGrowth, MarginFill)>,
    interpolation: Option<Interpolation>,
}

impl FakeDocument {
    fn new(world: SharedWorld, page: FakePage) -> Self {
        Self {
            world,
            page,
            flattened: false,
            growth: None,
            interpolation: None,
        }
    }
}

impl PageDocument for FakeDocument {
    fn width(&self) -> u32 {
        self.page.width
    }

    fn height(&self) -> u32 {
        self.page.height
    }

    fn layers(&self) -> Vec<LayerInfo> {
        self.page.layers.clone()
    }

    fn set_layer_visible(&mut self, index: usize, visible: bool) -> Result<(), ApplicationError> {
        let layer = self
            .page
            .layers
            .get_mut(index)
            .ok_or_else(|| ApplicationError::InvalidInput(format!("no layer {index}")))?;
        layer.visible = visible;
        Ok(())
    }

    fn flatten(&mut self) {
        self.flattened = true;
    }

    fn resize_canvas(
        &mut self,
        growth: CanvasGrowth,
        fill: MarginFill,
    ) -> Result<(), ApplicationError> {
        self.page.width = growth.width;
        self.page.height = growth.height;
        self.growth = Some((growth, fill));
        Ok(())
    }

    fn scale(
        &mut self,
        width: u32,
        height: u32,
        interpolation: Interpolation,
    ) -> Result<(), ApplicationError> {
        self.page.width = width;
        self.page.height = height;
        self.interpolation = Some(interpolation);
        Ok(())
    }

    fn save_page(&self, path: &Path) -> Result<(), ApplicationError> {
        let mut world = self.world.borrow_mut();
        if world.files.contains_key(path) {
            return Err(ApplicationError::DuplicateName(path.display().to_string()));
        }
        world.files.insert(path.to_path_buf(), self.page.clone());
        Ok(())
    }

    fn export(&self, path: &Path, format: &ExportFormat) -> Result<(), ApplicationError> {
        let mut world = self.world.borrow_mut();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        if world.failing_exports.contains(&file_name) {
            return Err(ApplicationError::Encode(file_name));
        }
        world.exports.push(ExportRecord {
            path: path.to_path_buf(),
            extension: format.extension(),
            width: self.page.width,
            height: self.page.height,
            layers: self.page.layers.clone(),
            flattened: self.flattened,
            growth: self.growth,
            interpolation: self.interpolation,
        });
        Ok(())
    }
}

pub struct FakeThumbnails(pub SharedWorld);

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

impl ThumbnailGenerator for FakeThumbnails {
    fn ensure_thumbnail(
        &self,
        page_path: &Path,
        thumbs_dir: &Path,
        size: ThumbnailSize,
    ) -> Result<ThumbnailArtifact, ApplicationError> {
        let page = file_name(page_path);
        let rebuilt = self.0.borrow_mut().thumbs.insert((page.clone(), size.get()));
        Ok(ThumbnailArtifact {
            file_path: thumbs_dir
                .join(size.get().to_string())
                .join(format!("{page}.png")),
            width: size.get(),
            height: size.get(),
            rebuilt,
        })
    }

    fn rename_thumbnails(
        &self,
        _thumbs_dir: &Path,
        old_page: &str,
        new_page: &str,
    ) -> Result<(), ApplicationError> {
        let mut world = self.0.borrow_mut();
        let sizes: Vec<u32> = world
            .thumbs
            .iter()
            .filter(|(page, _)| page == old_page)
            .map(|(_, size)| *size)
            .collect();
        for size in sizes {
            world.thumbs.remove(&(old_page.to_string(), size));
            world.thumbs.insert((new_page.to_string(), size));
        }
        Ok(())
    }

    fn remove_thumbnails(&self, _thumbs_dir: &Path, page: &str) -> Result<(), ApplicationError> {
        self.0
            .borrow_mut()
            .thumbs
            .retain(|(thumb_page, _)| thumb_page != page);
        Ok(())
    }
}

pub struct FakeScanner(pub SharedWorld);

impl ImageScanner for FakeScanner {
    fn scan_importable(&self, folder: &Path) -> Result<Vec<PathBuf>, ApplicationError> {
        Ok(self
            .0
            .borrow()
            .importable
            .iter()
            .filter(|file| file.starts_with(folder))
            .cloned()
            .collect())
    }
}

pub struct FixedClock;

impl Clock for FixedClock {
    fn now_timestamp_string(&self) -> String {
        TIMESTAMP.to_string()
    }
}
