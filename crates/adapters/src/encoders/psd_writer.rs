//! Photoshop document writer: 8-bit RGB with one record per layer.

use std::io::Write;

use image::RgbaImage;
use log::warn;
use pagebook_domain::{PsdCompression, PsdOptions};

use super::check_dimensions;
use crate::raster::{CodecError, Layer, LayeredImage};

const MAX_DIMENSION: u32 = 30_000;
const RESOLUTION_INFO_ID: u16 = 0x03ED;
const FLAG_HIDDEN: u8 = 0x02;
const COLOR_MODE_RGB: u16 = 3;

/// Channel ids in record order: alpha, red, green, blue.
const LAYER_CHANNELS: [(i16, usize); 4] = [(-1, 3), (0, 0), (1, 1), (2, 2)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelCompression {
    Raw,
    PackBits,
}

pub fn write_psd<W: Write>(
    image: &LayeredImage,
    options: &PsdOptions,
    mut writer: W,
) -> Result<(), CodecError> {
    check_dimensions("PSD", image.width, image.height, MAX_DIMENSION)?;
    let compression = match options.compression {
        PsdCompression::None => ChannelCompression::Raw,
        PsdCompression::Rle => ChannelCompression::PackBits,
        PsdCompression::Lzw => {
            warn!("PSD has no LZW image compression; writing PackBits instead");
            ChannelCompression::PackBits
        }
    };

    let mut out = Vec::new();
    write_header(&mut out, image);
    // no colour mode data
    out.extend_from_slice(&0_u32.to_be_bytes());
    write_resources(&mut out, image.resolution);
    write_layers(&mut out, &image.layers, compression);
    write_merged(&mut out, &image.composite(), compression);

    writer.write_all(&out)?;
    Ok(())
}

fn write_header(out: &mut Vec<u8>, image: &LayeredImage) {
    out.extend_from_slice(b"8BPS");
    out.extend_from_slice(&1_u16.to_be_bytes());
    out.extend_from_slice(&[0; 6]);
    out.extend_from_slice(&4_u16.to_be_bytes());
    out.extend_from_slice(&image.height.to_be_bytes());
    out.extend_from_slice(&image.width.to_be_bytes());
    out.extend_from_slice(&8_u16.to_be_bytes());
    out.extend_from_slice(&COLOR_MODE_RGB.to_be_bytes());
}

fn write_resources(out: &mut Vec<u8>, resolution: f64) {
    let fixed = ((resolution * 65_536.0).round() as u32).max(1);
    let mut block = Vec::with_capacity(28);
    block.extend_from_slice(b"8BIM");
    block.extend_from_slice(&RESOLUTION_INFO_ID.to_be_bytes());
    // empty Pascal name, padded to even length
    block.extend_from_slice(&[0, 0]);
    block.extend_from_slice(&16_u32.to_be_bytes());
    for _ in 0..2 {
        block.extend_from_slice(&fixed.to_be_bytes());
        // pixels per inch, display unit inches
        block.extend_from_slice(&1_u16.to_be_bytes());
        block.extend_from_slice(&1_u16.to_be_bytes());
    }
    out.extend_from_slice(&(block.len() as u32).to_be_bytes());
    out.extend_from_slice(&block);
}

fn write_layers(out: &mut Vec<u8>, layers: &[Layer], compression: ChannelCompression) {
    let mut records = Vec::new();
    let mut channel_data = Vec::new();

    // negative count: the merged alpha channel holds transparency
    records.extend_from_slice(&(-(layers.len() as i16)).to_be_bytes());
    for layer in layers.iter().rev() {
        let channels: Vec<Vec<u8>> = LAYER_CHANNELS
            .iter()
            .map(|(_, sample)| encode_channel(&layer.pixels, *sample, compression))
            .collect();
        write_layer_record(&mut records, layer, &channels);
        for channel in channels {
            channel_data.extend_from_slice(&channel);
        }
    }

    let mut layer_info = records;
    layer_info.extend_from_slice(&channel_data);
    if layer_info.len() % 2 == 1 {
        layer_info.push(0);
    }

    let section_length = 4 + layer_info.len() + 4;
    out.extend_from_slice(&(section_length as u32).to_be_bytes());
    out.extend_from_slice(&(layer_info.len() as u32).to_be_bytes());
    out.extend_from_slice(&layer_info);
    // no global layer mask
    out.extend_from_slice(&0_u32.to_be_bytes());
}

fn write_layer_record(out: &mut Vec<u8>, layer: &Layer, channels: &[Vec<u8>]) {
    let top = layer.y as i32;
    let left = layer.x as i32;
    out.extend_from_slice(&top.to_be_bytes());
    out.extend_from_slice(&left.to_be_bytes());
    out.extend_from_slice(&(top + layer.pixels.height() as i32).to_be_bytes());
    out.extend_from_slice(&(left + layer.pixels.width() as i32).to_be_bytes());

    out.extend_from_slice(&(LAYER_CHANNELS.len() as u16).to_be_bytes());
    for ((id, _), data) in LAYER_CHANNELS.iter().zip(channels) {
        out.extend_from_slice(&id.to_be_bytes());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    }

    out.extend_from_slice(b"8BIMnorm");
    out.push((layer.opacity.clamp(0.0, 1.0) * 255.0).round() as u8);
    // clipping: base
    out.push(0);
    out.push(if layer.visible { 0 } else { FLAG_HIDDEN });
    out.push(0);

    let name = pascal_name(&layer.name);
    let extra_length = 4 + 4 + name.len();
    out.extend_from_slice(&(extra_length as u32).to_be_bytes());
    // no layer mask, no blending ranges
    out.extend_from_slice(&0_u32.to_be_bytes());
    out.extend_from_slice(&0_u32.to_be_bytes());
    out.extend_from_slice(&name);
}

/// Length-prefixed name padded to a multiple of four bytes.
fn pascal_name(name: &str) -> Vec<u8> {
    let bytes: Vec<u8> = name
        .chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'_' })
        .take(255)
        .collect();
    let mut out = Vec::with_capacity(bytes.len() + 4);
    out.push(bytes.len() as u8);
    out.extend_from_slice(&bytes);
    while out.len() % 4 != 0 {
        out.push(0);
    }
    out
}

/// One channel of a layer: compression tag followed by the data.
fn encode_channel(pixels: &RgbaImage, sample: usize, compression: ChannelCompression) -> Vec<u8> {
    let rows = channel_rows(pixels, sample);
    let mut out = Vec::new();
    match compression {
        ChannelCompression::Raw => {
            out.extend_from_slice(&0_u16.to_be_bytes());
            for row in rows {
                out.extend_from_slice(&row);
            }
        }
        ChannelCompression::PackBits => {
            out.extend_from_slice(&1_u16.to_be_bytes());
            let packed: Vec<Vec<u8>> = rows.iter().map(|row| packbits(row)).collect();
            for row in &packed {
                out.extend_from_slice(&(row.len() as u16).to_be_bytes());
            }
            for row in packed {
                out.extend_from_slice(&row);
            }
        }
    }
    out
}

/// Merged image data: planar R, G, B, A sharing one compression tag.
fn write_merged(out: &mut Vec<u8>, composite: &RgbaImage, compression: ChannelCompression) {
    let planes: Vec<Vec<Vec<u8>>> = (0..4)
        .map(|sample| channel_rows(composite, sample))
        .collect();
    match compression {
        ChannelCompression::Raw => {
            out.extend_from_slice(&0_u16.to_be_bytes());
            for row in planes.iter().flatten() {
                out.extend_from_slice(row);
            }
        }
        ChannelCompression::PackBits => {
            out.extend_from_slice(&1_u16.to_be_bytes());
            let packed: Vec<Vec<u8>> = planes.iter().flatten().map(|row| packbits(row)).collect();
            for row in &packed {
                out.extend_from_slice(&(row.len() as u16).to_be_bytes());
            }
            for row in packed {
                out.extend_from_slice(&row);
            }
        }
    }
}

fn channel_rows(pixels: &RgbaImage, sample: usize) -> Vec<Vec<u8>> {
    pixels
        .rows()
        .map(|row| row.map(|pixel| pixel[sample]).collect())
        .collect()
}

/// Apple PackBits run-length encoding of one row.
fn packbits(row: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut index = 0;
    while index < row.len() {
        let mut run = 1;
        while index + run < row.len() && run < 128 && row[index + run] == row[index] {
            run += 1;
        }
        if run >= 2 {
            out.push((257 - run) as u8);
            out.push(row[index]);
            index += run;
            continue;
        }

        let start = index;
        while index < row.len() && index - start < 128 {
            if index + 1 < row.len() && row[index] == row[index + 1] {
                break;
            }
            index += 1;
        }
        out.push((index - start - 1) as u8);
        out.extend_from_slice(&row[start..index]);
    }
    out
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    fn unpack(mut data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some((&header, rest)) = data.split_first() {
            if header < 128 {
                let count = usize::from(header) + 1;
                out.extend_from_slice(&rest[..count]);
                data = &rest[count..];
            } else if header > 128 {
                let count = 257 - usize::from(header);
                out.extend(std::iter::repeat(rest[0]).take(count));
                data = &rest[1..];
            } else {
                data = rest;
            }
        }
        out
    }

    fn page() -> LayeredImage {
        let mut image = LayeredImage::new(4, 2);
        let mut hidden = Layer::new("Notes", RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255])));
        hidden.visible = false;
        hidden.x = 1;
        image.layers.push(hidden);
        image.layers.push(Layer::new(
            "Background",
            RgbaImage::from_pixel(4, 2, Rgba([9, 9, 9, 255])),
        ));
        image
    }

    fn read_u32(bytes: &[u8], at: usize) -> u32 {
        u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    #[test]
    fn packbits_round_trips_runs_and_literals() {
        let mut row = vec![5; 200];
        row.extend_from_slice(&[1, 2, 3, 4]);
        row.extend((0..300).map(|value| (value % 251) as u8));
        row.extend_from_slice(&[7, 7]);

        assert_eq!(unpack(&packbits(&row)), row);
        assert_eq!(packbits(&[0, 0, 0]), vec![254, 0]);
    }

    #[test]
    fn pascal_names_pad_to_four_bytes() {
        assert_eq!(pascal_name("Ink"), vec![3, b'I', b'n', b'k']);
        assert_eq!(pascal_name("Inks").len(), 8);
    }

    #[test]
    fn header_and_sections_are_consistent() {
        for compression in [PsdCompression::None, PsdCompression::Rle] {
            let mut bytes = Vec::new();
            let options = PsdOptions {
                flatten: false,
                compression,
            };
            write_psd(&page(), &options, &mut bytes).expect("psd");

            assert_eq!(&bytes[..4], b"8BPS");
            assert_eq!(read_u32(&bytes, 14), 2);
            assert_eq!(read_u32(&bytes, 18), 4);

            let color_mode_end = 26 + 4;
            let resources_end = color_mode_end + 4 + read_u32(&bytes, color_mode_end) as usize;
            let layers_start = resources_end + 4;
            let layers_end = layers_start + read_u32(&bytes, resources_end) as usize;
            let count = i16::from_be_bytes([bytes[layers_start + 4], bytes[layers_start + 5]]);
            assert_eq!(count, -2);

            let merged_tag = u16::from_be_bytes([bytes[layers_end], bytes[layers_end + 1]]);
            assert_eq!(
                merged_tag,
                if compression == PsdCompression::Rle { 1 } else { 0 }
            );
            if compression == PsdCompression::None {
                assert_eq!(bytes.len(), layers_end + 2 + 4 * 4 * 2);
            }
        }
    }

    #[test]
    fn hidden_layers_are_flagged() {
        let mut bytes = Vec::new();
        write_psd(&page(), &PsdOptions::default(), &mut bytes).expect("psd");

        let notes = bytes
            .windows(6)
            .position(|window| window == b"\x05Notes")
            .expect("layer name");
        let flags_at = notes - 12 - 2;
        assert_eq!(bytes[flags_at], FLAG_HIDDEN);
    }
}
