use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use image::{imageops, ImageFormat, ImageReader};
use log::debug;
use pagebook_application::{ApplicationError, ThumbnailArtifact, ThumbnailGenerator};
use pagebook_domain::{thumbnail_dimensions, ThumbnailSize};

use crate::raster::load_composite;

/// Cached PNG thumbnails under `thumbs/<size>/<page>.png`.
#[derive(Debug, Default)]
pub struct FsThumbnailGenerator;

pub fn thumbnail_path(thumbs_dir: &Path, page: &str, size: ThumbnailSize) -> PathBuf {
    thumbs_dir
        .join(size.get().to_string())
        .join(format!("{page}.png"))
}

impl ThumbnailGenerator for FsThumbnailGenerator {
    fn ensure_thumbnail(
        &self,
        page_path: &Path,
        thumbs_dir: &Path,
        size: ThumbnailSize,
    ) -> Result<ThumbnailArtifact, ApplicationError> {
        let page = page_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| ApplicationError::InvalidInput(page_path.display().to_string()))?;
        let thumb_path = thumbnail_path(thumbs_dir, &page, size);

        if is_fresh(page_path, &thumb_path) {
            let (width, height) = ImageReader::open(&thumb_path)
                .map_err(|error| ApplicationError::Io(error.to_string()))?
                .into_dimensions()
                .map_err(|error| ApplicationError::Decode(error.to_string()))?;
            return Ok(ThumbnailArtifact {
                file_path: thumb_path,
                width,
                height,
                rebuilt: false,
            });
        }

        let composite = load_composite(page_path)?;
        let (width, height) = thumbnail_dimensions(composite.width(), composite.height(), size);
        let thumb = if width > composite.width() || height > composite.height() {
            imageops::resize(&composite, width, height, imageops::FilterType::Triangle)
        } else {
            imageops::thumbnail(&composite, width, height)
        };

        if let Some(parent) = thumb_path.parent() {
            fs::create_dir_all(parent).map_err(|error| ApplicationError::Io(error.to_string()))?;
        }
        thumb
            .save_with_format(&thumb_path, ImageFormat::Png)
            .map_err(|error| ApplicationError::Io(error.to_string()))?;
        debug!("rebuilt thumbnail {}", thumb_path.display());

        Ok(ThumbnailArtifact {
            file_path: thumb_path,
            width,
            height,
            rebuilt: true,
        })
    }

    fn rename_thumbnails(
        &self,
        thumbs_dir: &Path,
        old_page: &str,
        new_page: &str,
    ) -> Result<(), ApplicationError> {
        for size in ThumbnailSize::ALL {
            let from = thumbnail_path(thumbs_dir, old_page, size);
            let to = thumbnail_path(thumbs_dir, new_page, size);
            match fs::rename(&from, &to) {
                Ok(()) => debug!("moved thumbnail {} -> {}", from.display(), to.display()),
                Err(error) if error.kind() == ErrorKind::NotFound => {}
                Err(error) => return Err(ApplicationError::Io(error.to_string())),
            }
        }
        Ok(())
    }

    fn remove_thumbnails(&self, thumbs_dir: &Path, page: &str) -> Result<(), ApplicationError> {
        for size in ThumbnailSize::ALL {
            let path = thumbnail_path(thumbs_dir, page, size);
            match fs::remove_file(&path) {
                Ok(()) => debug!("removed thumbnail {}", path.display()),
                Err(error) if error.kind() == ErrorKind::NotFound => {}
                Err(error) => return Err(ApplicationError::Io(error.to_string())),
            }
        }
        Ok(())
    }
}

fn is_fresh(page_path: &Path, thumb_path: &Path) -> bool {
    let modified = |path: &Path| fs::metadata(path).and_then(|meta| meta.modified()).ok();
    match (modified(page_path), modified(thumb_path)) {
        (Some(page), Some(thumb)) => thumb >= page,
        _ => false,
    }
}
