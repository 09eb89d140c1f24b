use std::path::{Path, PathBuf};

use pagebook_application::{ApplicationError, ImageScanner};
use walkdir::WalkDir;

use crate::raster::IMPORTABLE_EXTENSIONS;

#[derive(Debug, Default)]
pub struct WalkdirImageScanner;

impl ImageScanner for WalkdirImageScanner {
    fn scan_importable(&self, folder: &Path) -> Result<Vec<PathBuf>, ApplicationError> {
        if !folder.is_dir() {
            return Err(ApplicationError::InvalidInput(format!(
                "folder does not exist or is not a directory: {}",
                folder.display()
            )));
        }

        let mut files: Vec<PathBuf> = WalkDir::new(folder)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| is_importable(path))
            .collect();
        files.sort();
        Ok(files)
    }
}

fn is_importable(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_ascii_lowercase())
        .is_some_and(|extension| IMPORTABLE_EXTENSIONS.contains(&extension.as_str()))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn finds_supported_images_in_sorted_order() {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir(dir.path().join("nested")).expect("mkdir");
        for name in ["b.PNG", "a.jpg", "notes.txt", "nested/c.ora", "nested/d.tif"] {
            fs::write(dir.path().join(name), b"x").expect("write");
        }

        let files = WalkdirImageScanner
            .scan_importable(dir.path())
            .expect("scan");

        let names: Vec<_> = files
            .iter()
            .map(|path| {
                path.strip_prefix(dir.path())
                    .expect("inside folder")
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "nested/c.ora", "nested/d.tif"]);
    }

    #[test]
    fn rejects_missing_folder() {
        let dir = TempDir::new().expect("tempdir");

        let result = WalkdirImageScanner.scan_importable(&dir.path().join("missing"));

        assert!(matches!(result, Err(ApplicationError::InvalidInput(_))));
    }
}
