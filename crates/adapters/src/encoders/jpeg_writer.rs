use std::io::Write;

use image::{imageops, RgbaImage};
use jpeg_encoder::{ColorType, Density, Encoder, SamplingFactor};
use log::debug;
use pagebook_domain::{JpegOptions, JpegSubsampling};

use super::check_dimensions;
use crate::raster::{CodecError, LayeredImage};

const SOI_LENGTH: usize = 2;
const MAX_COMMENT_BYTES: usize = u16::MAX as usize - 2;

pub fn write_jpeg<W: Write>(
    image: &LayeredImage,
    options: &JpegOptions,
    mut writer: W,
) -> Result<(), CodecError> {
    let (width, height) = (image.width, image.height);
    check_dimensions("JPEG", width, height, u32::from(u16::MAX))?;
    let mut rgba = image.composite();

    if options.smoothing > 0.0 {
        rgba = imageops::blur(&rgba, options.smoothing * 2.0);
    }
    debug!("JPEG DCT method {:?} is left to the encoder", options.dct);

    let mut bytes = Vec::new();
    let mut encoder = Encoder::new(&mut bytes, options.quality.clamp(1, 100));
    encoder.set_progressive(options.progressive);
    encoder.set_optimized_huffman_tables(options.optimize);
    encoder.set_sampling_factor(sampling_factor(options.subsampling));
    let dpi = image.resolution.round().clamp(1.0, f64::from(u16::MAX)) as u16;
    encoder.set_density(Density::Inch { x: dpi, y: dpi });
    if let Some(rows) = options.restart_rows {
        encoder.set_restart_interval(restart_interval(rows, width, options.subsampling));
    }

    if image.grayscale {
        let luma: Vec<u8> = rgba.pixels().map(|pixel| over_white(pixel.0)[0]).collect();
        encoder.encode(&luma, width as u16, height as u16, ColorType::Luma)?;
    } else {
        let rgb = rgb_over_white(&rgba);
        encoder.encode(&rgb, width as u16, height as u16, ColorType::Rgb)?;
    }

    if !options.comment.is_empty() {
        bytes = insert_comment(bytes, &options.comment);
    }
    writer.write_all(&bytes)?;
    Ok(())
}

fn sampling_factor(subsampling: JpegSubsampling) -> SamplingFactor {
    match subsampling {
        JpegSubsampling::Chroma444 => SamplingFactor::F_1_1,
        JpegSubsampling::Chroma422 => SamplingFactor::F_2_1,
        JpegSubsampling::Chroma440 => SamplingFactor::F_1_2,
        JpegSubsampling::Chroma420 => SamplingFactor::F_2_2,
    }
}

/// Restart interval in MCUs for a restart marker every `rows` MCU rows.
fn restart_interval(rows: u16, width: u32, subsampling: JpegSubsampling) -> u16 {
    let mcu_width = match subsampling {
        JpegSubsampling::Chroma422 | JpegSubsampling::Chroma420 => 16,
        JpegSubsampling::Chroma444 | JpegSubsampling::Chroma440 => 8,
    };
    let mcus_per_row = width.div_ceil(mcu_width).max(1);
    (u32::from(rows) * mcus_per_row).min(u32::from(u16::MAX)) as u16
}

fn over_white(pixel: [u8; 4]) -> [u8; 3] {
    let alpha = u32::from(pixel[3]);
    std::array::from_fn(|channel| {
        ((u32::from(pixel[channel]) * alpha + 255 * (255 - alpha) + 127) / 255) as u8
    })
}

pub(super) fn rgb_over_white(rgba: &RgbaImage) -> Vec<u8> {
    rgba.pixels()
        .flat_map(|pixel| over_white(pixel.0))
        .collect()
}

/// Adds a COM segment after the JFIF header.
fn insert_comment(jpeg: Vec<u8>, comment: &str) -> Vec<u8> {
    let text = &comment.as_bytes()[..comment.len().min(MAX_COMMENT_BYTES)];
    let mut position = SOI_LENGTH;
    if jpeg.get(2..4) == Some(&[0xFF, 0xE0][..]) {
        if let Some(length) = jpeg.get(4..6) {
            position = 4 + usize::from(u16::from_be_bytes([length[0], length[1]]));
        }
    }
    let position = position.min(jpeg.len());

    let mut out = Vec::with_capacity(jpeg.len() + text.len() + 4);
    out.extend_from_slice(&jpeg[..position]);
    out.extend_from_slice(&[0xFF, 0xFE]);
    out.extend_from_slice(&((text.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(text);
    out.extend_from_slice(&jpeg[position..]);
    out
}
