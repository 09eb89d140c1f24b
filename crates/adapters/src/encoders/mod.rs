//! Export encoders, one per target format.

mod gif_writer;
mod jpeg_writer;
mod png_writer;
mod psd_writer;
mod tiff_writer;

use std::io::{Seek, Write};

use image::RgbaImage;
use pagebook_domain::ExportFormat;

use crate::raster::{write_ora, CodecError, LayeredImage, OraFlavor};

pub use gif_writer::write_gif;
pub use jpeg_writer::write_jpeg;
pub use png_writer::write_png;
pub use psd_writer::write_psd;
pub use tiff_writer::write_tiff;

pub fn encode<W: Write + Seek>(
    image: &LayeredImage,
    format: &ExportFormat,
    writer: W,
) -> Result<(), CodecError> {
    match format {
        ExportFormat::Gif(options) => write_gif(image, options, writer),
        ExportFormat::Native(_) => write_ora(image, OraFlavor::Working, writer),
        ExportFormat::Jpeg(options) => write_jpeg(image, options, writer),
        ExportFormat::OpenRaster(_) => write_ora(image, OraFlavor::Interchange, writer),
        ExportFormat::Psd(options) => write_psd(image, options, writer),
        ExportFormat::Png(options) => write_png(image, options, writer),
        ExportFormat::Tiff(options) => write_tiff(image, options, writer),
    }
}

/// Clears the colour of fully transparent pixels, so encoders do not store
/// hidden colour data.
fn clear_transparent_color(pixels: &mut RgbaImage) {
    for pixel in pixels.pixels_mut() {
        if pixel[3] == 0 {
            pixel.0 = [0, 0, 0, 0];
        }
    }
}

fn check_dimensions(
    format: &'static str,
    width: u32,
    height: u32,
    limit: u32,
) -> Result<(), CodecError> {
    if width > limit || height > limit {
        return Err(CodecError::TooLarge {
            format,
            width,
            height,
        });
    }
    Ok(())
}
