use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use image::{ImageReader, RgbaImage};
use log::{debug, warn};
use pagebook_application::{ApplicationError, ImageHost, LayerInfo, PageDocument};
use pagebook_domain::{
    CanvasGrowth, ExportFormat, Interpolation, MarginFill, NewBookSpec, PAGE_EXTENSION,
};
use tempfile::NamedTempFile;

use super::document::LayeredImage;
use super::error::CodecError;
use super::ora::{read_merged, read_ora, write_ora, OraFlavor};
use crate::encoders;

/// Extensions the host can open, lower case.
pub const IMPORTABLE_EXTENSIONS: &[&str] = &[
    PAGE_EXTENSION,
    "png",
    "jpg",
    "jpeg",
    "gif",
    "tif",
    "tiff",
    "bmp",
    "webp",
];

/// Image host backed by the `image` crate, with OpenRaster as the working
/// format.
#[derive(Debug, Default)]
pub struct RasterHost;

impl ImageHost for RasterHost {
    fn create_document(
        &self,
        spec: &NewBookSpec,
    ) -> Result<Box<dyn PageDocument>, ApplicationError> {
        spec.validate()?;
        Ok(Box::new(LayeredImage::from_spec(spec)))
    }

    fn open_document(&self, path: &Path) -> Result<Box<dyn PageDocument>, ApplicationError> {
        let document = load_document(path)?;
        debug!(
            "opened {} ({}x{}, {} layers)",
            path.display(),
            document.width,
            document.height,
            document.layers.len()
        );
        Ok(Box::new(document))
    }
}

pub fn load_document(path: &Path) -> Result<LayeredImage, CodecError> {
    if is_working_format(path) {
        return read_ora(BufReader::new(File::open(path)?));
    }
    let decoded = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    let layer_name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "Background".to_string());
    Ok(LayeredImage::from_raster(&layer_name, decoded))
}

/// Flattened pixels of a page or image file.
pub fn load_composite(path: &Path) -> Result<RgbaImage, CodecError> {
    if is_working_format(path) {
        return match read_merged(BufReader::new(File::open(path)?)) {
            Ok(merged) => Ok(merged),
            Err(error) => {
                warn!("{}: {error}; compositing layers instead", path.display());
                Ok(load_document(path)?.composite())
            }
        };
    }
    Ok(ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?
        .to_rgba8())
}

fn is_working_format(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case(PAGE_EXTENSION))
}

impl PageDocument for LayeredImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn layers(&self) -> Vec<LayerInfo> {
        self.layers
            .iter()
            .map(|layer| LayerInfo {
                name: layer.name.clone(),
                visible: layer.visible,
            })
            .collect()
    }

    fn set_layer_visible(&mut self, index: usize, visible: bool) -> Result<(), ApplicationError> {
        let layer = self.layers.get_mut(index).ok_or_else(|| {
            ApplicationError::InvalidInput(format!("layer index {index} out of range"))
        })?;
        layer.visible = visible;
        Ok(())
    }

    fn flatten(&mut self) {
        LayeredImage::flatten(self);
    }

    fn resize_canvas(
        &mut self,
        growth: CanvasGrowth,
        fill: MarginFill,
    ) -> Result<(), ApplicationError> {
        if growth.width < self.width || growth.height < self.height {
            return Err(ApplicationError::InvalidInput(format!(
                "canvas cannot shrink from {}x{} to {}x{}",
                self.width, self.height, growth.width, growth.height
            )));
        }
        LayeredImage::resize_canvas(self, growth, fill);
        Ok(())
    }

    fn scale(
        &mut self,
        width: u32,
        height: u32,
        interpolation: Interpolation,
    ) -> Result<(), ApplicationError> {
        if width == 0 || height == 0 {
            return Err(ApplicationError::InvalidInput(format!(
                "cannot scale to {width}x{height}"
            )));
        }
        LayeredImage::scale(self, width, height, interpolation);
        Ok(())
    }

    fn save_page(&self, path: &Path) -> Result<(), ApplicationError> {
        write_file(path, false, |writer| {
            write_ora(self, OraFlavor::Working, writer)
        })
    }

    fn export(&self, path: &Path, format: &ExportFormat) -> Result<(), ApplicationError> {
        write_file(path, true, |writer| encoders::encode(self, format, writer))
    }
}

/// Encodes into a temporary file next to `path` and moves it into place,
/// so readers never see a partial file. Without `overwrite`, an existing
/// file at `path` is reported as `DuplicateName`.
fn write_file<F>(path: &Path, overwrite: bool, encode: F) -> Result<(), ApplicationError>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<(), CodecError>,
{
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir).map_err(io_error)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        encode(&mut writer)?;
        writer.flush().map_err(io_error)?;
    }

    let persisted = if overwrite {
        temp.persist(path)
    } else {
        temp.persist_noclobber(path)
    };
    persisted.map_err(|error| {
        if error.error.kind() == io::ErrorKind::AlreadyExists {
            ApplicationError::DuplicateName(
                path.file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string()),
            )
        } else {
            io_error(error.error)
        }
    })?;
    Ok(())
}

fn io_error(error: io::Error) -> ApplicationError {
    ApplicationError::Io(error.to_string())
}
