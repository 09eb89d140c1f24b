use std::io::{Seek, Write};

use image::RgbaImage;
use jpeg_encoder::{ColorType, Encoder, SamplingFactor};
use log::debug;
use pagebook_domain::{TiffCompression, TiffOptions};
use tiff::encoder::compression::{Compression, Deflate, Lzw, Packbits, Uncompressed};
use tiff::encoder::{colortype, Rational, TiffEncoder};
use tiff::tags::{CompressionMethod, PhotometricInterpretation, ResolutionUnit, Tag};

use super::jpeg_writer::rgb_over_white;
use super::{check_dimensions, clear_transparent_color};
use crate::raster::{CodecError, LayeredImage};

const JPEG_QUALITY: u8 = 90;
const YCBCR_SUBSAMPLING: Tag = Tag::Unknown(530);

pub fn write_tiff<W: Write + Seek>(
    image: &LayeredImage,
    options: &TiffOptions,
    writer: W,
) -> Result<(), CodecError> {
    let mut rgba = image.composite();
    if !options.save_transparent_color {
        clear_transparent_color(&mut rgba);
    }

    let mut encoder = TiffEncoder::new(writer)?;
    let resolution = image.resolution;
    match options.compression {
        TiffCompression::None => write_with(&mut encoder, &rgba, resolution, Uncompressed),
        TiffCompression::Lzw => write_with(&mut encoder, &rgba, resolution, Lzw),
        TiffCompression::Rle => write_with(&mut encoder, &rgba, resolution, Packbits),
        TiffCompression::Deflate => {
            write_with(&mut encoder, &rgba, resolution, Deflate::default())
        }
        TiffCompression::Jpeg => write_jpeg_strip(&mut encoder, &rgba, resolution),
    }
}

fn resolution_rational(resolution: f64) -> Rational {
    let per_hundred_inches = (resolution * 100.0).round().max(1.0) as u32;
    Rational {
        n: per_hundred_inches,
        d: 100,
    }
}

/// Stores the page as one YCbCr strip holding a complete 4:2:0 JPEG stream.
/// Alpha is flattened onto white.
fn write_jpeg_strip<W: Write + Seek>(
    encoder: &mut TiffEncoder<W>,
    rgba: &RgbaImage,
    resolution: f64,
) -> Result<(), CodecError> {
    let (width, height) = rgba.dimensions();
    check_dimensions("JPEG-compressed TIFF", width, height, u32::from(u16::MAX))?;

    let mut strip = Vec::new();
    let mut jpeg = Encoder::new(&mut strip, JPEG_QUALITY);
    jpeg.set_sampling_factor(SamplingFactor::F_2_2);
    jpeg.encode(&rgb_over_white(rgba), width as u16, height as u16, ColorType::Rgb)?;
    debug!("JPEG strip for TIFF is {} bytes", strip.len());

    let mut directory = encoder.new_directory()?;
    let offset = directory.write_data(&strip[..])?;
    directory.write_tag(Tag::ImageWidth, width)?;
    directory.write_tag(Tag::ImageLength, height)?;
    directory.write_tag(Tag::BitsPerSample, &[8_u16, 8, 8][..])?;
    directory.write_tag(Tag::Compression, CompressionMethod::ModernJPEG.to_u16())?;
    directory.write_tag(
        Tag::PhotometricInterpretation,
        PhotometricInterpretation::YCbCr.to_u16(),
    )?;
    directory.write_tag(Tag::StripOffsets, offset as u32)?;
    directory.write_tag(Tag::SamplesPerPixel, 3_u16)?;
    directory.write_tag(Tag::RowsPerStrip, height)?;
    directory.write_tag(Tag::StripByteCounts, strip.len() as u32)?;
    directory.write_tag(Tag::XResolution, resolution_rational(resolution))?;
    directory.write_tag(Tag::YResolution, resolution_rational(resolution))?;
    directory.write_tag(Tag::ResolutionUnit, ResolutionUnit::Inch.to_u16())?;
    directory.write_tag(Tag::PlanarConfiguration, 1_u16)?;
    directory.write_tag(YCBCR_SUBSAMPLING, &[2_u16, 2][..])?;
    directory.finish()?;
    Ok(())
}

fn write_with<W: Write + Seek, C: Compression>(
    encoder: &mut TiffEncoder<W>,
    rgba: &RgbaImage,
    resolution: f64,
    compression: C,
) -> Result<(), CodecError> {
    let mut image = encoder.new_image_with_compression::<colortype::RGBA8, C>(
        rgba.width(),
        rgba.height(),
        compression,
    )?;
    image.resolution(ResolutionUnit::Inch, resolution_rational(resolution));
    image.write_data(rgba.as_raw())?;
    Ok(())
}
