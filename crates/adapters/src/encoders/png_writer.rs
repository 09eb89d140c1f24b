use std::io::Write;

use chrono::{Datelike, Timelike, Utc};
use flate2::write::ZlibEncoder;
use flate2::Crc;
use log::debug;
use pagebook_domain::PngOptions;
use png::chunk::ChunkType;
use png::{BitDepth, ColorType, Compression, PixelDimensions, ScaledFloat, Unit};

use super::clear_transparent_color;
use crate::raster::{CodecError, LayeredImage};

const INCHES_PER_METER: f64 = 39.370_078_740_157_48;
const DISPLAY_GAMMA: f32 = 1.0 / 2.2;
const SIGNATURE_LENGTH: usize = 8;
/// Offset of the interlace method inside the IHDR payload.
const IHDR_INTERLACE: usize = 12;

/// Adam7 passes as (x start, y start, x step, y step).
const ADAM7: [(u32, u32, u32, u32); 7] = [
    (0, 0, 8, 8),
    (4, 0, 8, 8),
    (0, 4, 4, 8),
    (2, 0, 4, 4),
    (0, 2, 2, 4),
    (1, 0, 2, 2),
    (0, 1, 1, 2),
];

pub fn write_png<W: Write>(
    image: &LayeredImage,
    options: &PngOptions,
    mut writer: W,
) -> Result<(), CodecError> {
    if !options.interlace {
        return write_progressive(image, options, writer);
    }
    let mut bytes = Vec::new();
    write_progressive(image, options, &mut bytes)?;
    let data = pixel_data(image, options);
    let channels = if image.grayscale { 2 } else { 4 };
    let idat = adam7_idat(
        &data,
        image.width,
        image.height,
        channels,
        options.compression_level,
    )?;
    writer.write_all(&interlace_chunks(&bytes, &idat)?)?;
    Ok(())
}

fn pixel_data(image: &LayeredImage, options: &PngOptions) -> Vec<u8> {
    let mut rgba = image.composite();
    if !options.save_transparent_color {
        clear_transparent_color(&mut rgba);
    }
    if image.grayscale {
        rgba.pixels().flat_map(|pixel| [pixel[0], pixel[3]]).collect()
    } else {
        rgba.into_raw()
    }
}

/// Writes a non-interlaced PNG with every requested ancillary chunk.
fn write_progressive<W: Write>(
    image: &LayeredImage,
    options: &PngOptions,
    writer: W,
) -> Result<(), CodecError> {
    let mut encoder = png::Encoder::new(writer, image.width, image.height);
    encoder.set_depth(BitDepth::Eight);
    encoder.set_color(if image.grayscale {
        ColorType::GrayscaleAlpha
    } else {
        ColorType::Rgba
    });
    encoder.set_compression(compression(options.compression_level));
    if options.save_gamma {
        encoder.set_source_gamma(ScaledFloat::new(DISPLAY_GAMMA));
    }
    if options.save_resolution {
        let pixels_per_meter = (image.resolution * INCHES_PER_METER).round() as u32;
        encoder.set_pixel_dims(Some(PixelDimensions {
            xppu: pixels_per_meter,
            yppu: pixels_per_meter,
            unit: Unit::Meter,
        }));
    }

    let mut writer = encoder.write_header()?;
    if options.save_background {
        writer.write_chunk(ChunkType(*b"bKGD"), &background_chunk(image.grayscale))?;
    }
    if options.save_layer_offset {
        let (x, y) = image
            .layers
            .last()
            .map(|layer| (layer.x, layer.y))
            .unwrap_or_default();
        writer.write_chunk(ChunkType(*b"oFFs"), &offset_chunk(x, y))?;
    }
    if options.save_creation_time {
        writer.write_chunk(ChunkType(*b"tIME"), &time_chunk())?;
    }

    writer.write_image_data(&pixel_data(image, options))?;
    writer.finish()?;
    Ok(())
}

/// Zlib stream of the seven Adam7 pass images, every scanline unfiltered.
fn adam7_idat(
    data: &[u8],
    width: u32,
    height: u32,
    channels: usize,
    level: u8,
) -> Result<Vec<u8>, CodecError> {
    let stride = width as usize * channels;
    let mut zlib = ZlibEncoder::new(Vec::new(), zlib_level(level));
    let mut scanline = Vec::with_capacity(stride + 1);
    for (x0, y0, dx, dy) in ADAM7 {
        if x0 >= width || y0 >= height {
            continue;
        }
        for y in (y0..height).step_by(dy as usize) {
            scanline.clear();
            // filter type: none
            scanline.push(0);
            let row = &data[y as usize * stride..][..stride];
            for x in (x0..width).step_by(dx as usize) {
                let start = x as usize * channels;
                scanline.extend_from_slice(&row[start..start + channels]);
            }
            zlib.write_all(&scanline)?;
        }
    }
    Ok(zlib.finish()?)
}

fn zlib_level(level: u8) -> flate2::Compression {
    match level {
        0..=2 => flate2::Compression::fast(),
        3..=6 => flate2::Compression::default(),
        _ => flate2::Compression::best(),
    }
}

/// Rewrites a PNG stream as interlaced: IHDR gets the Adam7 flag and the
/// image data chunks are replaced by a single `idat` chunk.
fn interlace_chunks(png: &[u8], idat: &[u8]) -> Result<Vec<u8>, CodecError> {
    let malformed = || std::io::Error::new(std::io::ErrorKind::InvalidData, "truncated PNG chunk");
    let signature = png.get(..SIGNATURE_LENGTH).ok_or_else(malformed)?;
    let mut out = Vec::with_capacity(png.len());
    out.extend_from_slice(signature);

    let mut rest = &png[SIGNATURE_LENGTH..];
    let mut idat_written = false;
    while !rest.is_empty() {
        let length = rest
            .get(..4)
            .map(|bytes| u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize)
            .ok_or_else(malformed)?;
        let chunk = rest.get(..length + 12).ok_or_else(malformed)?;
        let kind: [u8; 4] = [chunk[4], chunk[5], chunk[6], chunk[7]];
        let payload = &chunk[8..8 + length];
        match &kind {
            b"IHDR" => {
                let mut header = payload.to_vec();
                *header.get_mut(IHDR_INTERLACE).ok_or_else(malformed)? = 1;
                push_chunk(&mut out, kind, &header);
            }
            b"IDAT" => {
                if !idat_written {
                    push_chunk(&mut out, kind, idat);
                    idat_written = true;
                }
            }
            _ => out.extend_from_slice(chunk),
        }
        rest = &rest[length + 12..];
    }
    debug!("rewrote PNG as Adam7, {} image data bytes", idat.len());
    Ok(out)
}

fn push_chunk(out: &mut Vec<u8>, kind: [u8; 4], payload: &[u8]) {
    let mut crc = Crc::new();
    crc.update(&kind);
    crc.update(payload);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(&kind);
    out.extend_from_slice(payload);
    out.extend_from_slice(&crc.sum().to_be_bytes());
}

fn compression(level: u8) -> Compression {
    match level {
        0..=2 => Compression::Fast,
        3..=6 => Compression::Default,
        _ => Compression::Best,
    }
}

/// White, as 16-bit samples.
fn background_chunk(grayscale: bool) -> Vec<u8> {
    if grayscale {
        vec![0, 255]
    } else {
        vec![0, 255, 0, 255, 0, 255]
    }
}

fn offset_chunk(x: i64, y: i64) -> Vec<u8> {
    let clamp = |value: i64| value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
    let mut data = Vec::with_capacity(9);
    data.extend_from_slice(&clamp(x).to_be_bytes());
    data.extend_from_slice(&clamp(y).to_be_bytes());
    // unit: pixels
    data.push(0);
    data
}

fn time_chunk() -> Vec<u8> {
    let now = Utc::now();
    let year = u16::try_from(now.year()).unwrap_or_default();
    let mut data = year.to_be_bytes().to_vec();
    data.extend_from_slice(&[
        now.month() as u8,
        now.day() as u8,
        now.hour() as u8,
        now.minute() as u8,
        now.second() as u8,
    ]);
    data
}
