use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

use log::debug;
use pagebook_application::{ApplicationError, BookStorage};
use pagebook_domain::BookMetadata;
use tempfile::NamedTempFile;

#[derive(Debug, Default)]
pub struct FsBookStorage;

impl BookStorage for FsBookStorage {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), ApplicationError> {
        fs::create_dir_all(path).map_err(|error| io_error(path, error))
    }

    fn read_metadata(&self, book_file: &Path) -> Result<BookMetadata, ApplicationError> {
        let file = File::open(book_file).map_err(|error| match error.kind() {
            ErrorKind::NotFound => ApplicationError::NotFound(book_file.display().to_string()),
            _ => io_error(book_file, error),
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|error| {
            if error.is_io() {
                ApplicationError::Io(format!("{}: {error}", book_file.display()))
            } else {
                ApplicationError::CorruptMetadata(format!("{}: {error}", book_file.display()))
            }
        })
    }

    fn write_metadata(
        &self,
        book_file: &Path,
        metadata: &BookMetadata,
    ) -> Result<(), ApplicationError> {
        let dir = book_file
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir).map_err(|error| io_error(dir, error))?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, metadata)
                .map_err(|error| ApplicationError::Io(error.to_string()))?;
            writer.flush().map_err(|error| io_error(book_file, error))?;
        }
        temp.persist(book_file)
            .map_err(|error| io_error(book_file, error.error))?;
        debug!(
            "wrote {} with {} pages",
            book_file.display(),
            metadata.pages.len()
        );
        Ok(())
    }

    fn copy_new(&self, from: &Path, to: &Path) -> Result<(), ApplicationError> {
        let mut source = File::open(from).map_err(|error| io_error(from, error))?;
        let mut target = create_new(to)?;
        if let Err(error) = io::copy(&mut source, &mut target) {
            drop(target);
            let _ = fs::remove_file(to);
            return Err(io_error(to, error));
        }
        Ok(())
    }

    fn move_new(&self, from: &Path, to: &Path) -> Result<(), ApplicationError> {
        match fs::hard_link(from, to) {
            Ok(()) => {}
            Err(error) if error.kind() == ErrorKind::AlreadyExists => {
                return Err(duplicate(to));
            }
            // Cross-device moves and filesystems without links.
            Err(error) => {
                debug!("hard link {} failed ({error}), copying", to.display());
                self.copy_new(from, to)?;
            }
        }
        fs::remove_file(from).map_err(|error| io_error(from, error))
    }

    fn is_empty_dir(&self, path: &Path) -> bool {
        fs::read_dir(path)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false)
    }
}

fn create_new(path: &Path) -> Result<File, ApplicationError> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|error| match error.kind() {
            ErrorKind::AlreadyExists => duplicate(path),
            _ => io_error(path, error),
        })
}

fn duplicate(path: &Path) -> ApplicationError {
    ApplicationError::DuplicateName(
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
    )
}

fn io_error(path: &Path, error: io::Error) -> ApplicationError {
    ApplicationError::Io(format!("{}: {error}", path.display()))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn metadata_survives_a_write_and_read() {
        let dir = TempDir::new().expect("tempdir");
        let book_file = dir.path().join("Comic.book");
        let metadata = BookMetadata {
            storyboard_mode: Some(1),
            thumb_size: Some(512),
            pages: vec!["Cover.ora".to_string(), "One.ora".to_string()],
        };

        FsBookStorage
            .write_metadata(&book_file, &metadata)
            .expect("write");
        let loaded = FsBookStorage.read_metadata(&book_file).expect("read");

        assert_eq!(loaded, metadata);
        assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 1);
    }

    #[test]
    fn metadata_errors_are_classified() {
        let dir = TempDir::new().expect("tempdir");
        let book_file = dir.path().join("Comic.book");

        let missing = FsBookStorage.read_metadata(&book_file);
        fs::write(&book_file, b"{ not json").expect("write");
        let corrupt = FsBookStorage.read_metadata(&book_file);

        assert!(matches!(missing, Err(ApplicationError::NotFound(_))));
        assert!(matches!(corrupt, Err(ApplicationError::CorruptMetadata(_))));
    }

    #[test]
    fn copy_and_move_refuse_to_overwrite() {
        let dir = TempDir::new().expect("tempdir");
        let a = dir.path().join("a.ora");
        let b = dir.path().join("b.ora");
        fs::write(&a, b"page a").expect("write");
        fs::write(&b, b"page b").expect("write");

        let copied = FsBookStorage.copy_new(&a, &b);
        let moved = FsBookStorage.move_new(&a, &b);

        assert!(matches!(copied, Err(ApplicationError::DuplicateName(name)) if name == "b.ora"));
        assert!(matches!(moved, Err(ApplicationError::DuplicateName(_))));
        assert_eq!(fs::read(&b).expect("read"), b"page b");
        assert!(a.exists());
    }

    #[test]
    fn move_new_removes_the_source() {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir(dir.path().join("trash")).expect("mkdir");
        let from = dir.path().join("a.ora");
        let to = dir.path().join("trash").join("20260102_030405_a.ora");
        fs::write(&from, b"page a").expect("write");

        FsBookStorage.move_new(&from, &to).expect("move");

        assert!(!from.exists());
        assert_eq!(fs::read(&to).expect("read"), b"page a");
    }

    #[test]
    fn empty_dir_checks() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("missing");

        assert!(FsBookStorage.is_empty_dir(dir.path()));
        assert!(!FsBookStorage.is_empty_dir(&missing));
        fs::write(dir.path().join("x"), b"x").expect("write");
        assert!(!FsBookStorage.is_empty_dir(dir.path()));
    }
}
