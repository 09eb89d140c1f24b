use std::borrow::Cow;
use std::collections::HashSet;
use std::io::Write;

use color_quant::NeuQuant;
use image::RgbaImage;
use pagebook_domain::{GifDither, GifOptions};

use super::check_dimensions;
use crate::raster::{CodecError, LayeredImage};

/// Pixels below this alpha become the transparent palette entry.
const ALPHA_THRESHOLD: u8 = 128;
const NEUQUANT_SAMPLE_FACTOR: i32 = 10;
const MIN_SAMPLE_BYTES: usize = 4 * 100 * NEUQUANT_SAMPLE_FACTOR as usize;
const POSITIONED_SPREAD: f32 = 32.0;

const BAYER_4X4: [[u8; 4]; 4] = [[0, 8, 2, 10], [12, 4, 14, 6], [3, 11, 1, 9], [15, 7, 13, 5]];

/// Writes the composite as a single-frame indexed GIF.
pub fn write_gif<W: Write>(
    image: &LayeredImage,
    options: &GifOptions,
    writer: W,
) -> Result<(), CodecError> {
    let (width, height) = (image.width, image.height);
    check_dimensions("GIF", width, height, u32::from(u16::MAX))?;
    let rgba = image.composite();

    let has_transparency = rgba.pixels().any(|pixel| pixel[3] < ALPHA_THRESHOLD);
    let mut colors = usize::from(options.palette_size).clamp(2, 256);
    if has_transparency {
        colors = colors.min(255);
    }

    let palette = if options.grayscale {
        Palette::grayscale(colors)
    } else {
        Palette::quantized(&rgba, colors)
    };
    let transparent_index = has_transparency.then(|| palette.colors.len());
    let indices = map_pixels(&rgba, &palette, options.dither, transparent_index);

    let mut flat_palette: Vec<u8> = palette.colors.iter().flatten().copied().collect();
    if transparent_index.is_some() {
        flat_palette.extend_from_slice(&[0, 0, 0]);
    }

    let mut frame = gif::Frame::default();
    frame.width = width as u16;
    frame.height = height as u16;
    frame.interlaced = options.interlace;
    frame.palette = Some(flat_palette);
    frame.transparent = transparent_index.map(|index| index as u8);
    frame.buffer = Cow::Owned(indices);

    let mut encoder = gif::Encoder::new(writer, width as u16, height as u16, &[])?;
    encoder.write_frame(&frame)?;
    encoder.into_inner()?;
    Ok(())
}

enum Lookup {
    Gray,
    Exact,
    Neural(NeuQuant),
}

struct Palette {
    colors: Vec<[u8; 3]>,
    lookup: Lookup,
}

impl Palette {
    fn grayscale(colors: usize) -> Self {
        let steps = (colors - 1) as f32;
        Self {
            colors: (0..colors)
                .map(|index| {
                    let level = (index as f32 * 255.0 / steps).round() as u8;
                    [level, level, level]
                })
                .collect(),
            lookup: Lookup::Gray,
        }
    }

    fn quantized(rgba: &RgbaImage, colors: usize) -> Self {
        let mut distinct: Vec<[u8; 3]> = Vec::new();
        let mut seen = HashSet::new();
        for pixel in rgba.pixels().filter(|pixel| pixel[3] >= ALPHA_THRESHOLD) {
            let rgb = [pixel[0], pixel[1], pixel[2]];
            if seen.insert(rgb) {
                distinct.push(rgb);
                if distinct.len() > colors {
                    break;
                }
            }
        }
        if distinct.is_empty() {
            return Self {
                colors: vec![[0, 0, 0]],
                lookup: Lookup::Exact,
            };
        }
        if distinct.len() <= colors {
            return Self {
                colors: distinct,
                lookup: Lookup::Exact,
            };
        }

        let mut sample: Vec<u8> = rgba
            .pixels()
            .filter(|pixel| pixel[3] >= ALPHA_THRESHOLD)
            .flat_map(|pixel| [pixel[0], pixel[1], pixel[2], 255])
            .collect();
        // the network needs enough samples for its learning cycles
        while sample.len() < MIN_SAMPLE_BYTES {
            sample.extend_from_within(..);
        }

        let quantizer = NeuQuant::new(NEUQUANT_SAMPLE_FACTOR, colors, &sample);
        let colors = quantizer
            .color_map_rgb()
            .chunks_exact(3)
            .map(|rgb| [rgb[0], rgb[1], rgb[2]])
            .collect();
        Self {
            colors,
            lookup: Lookup::Neural(quantizer),
        }
    }

    fn nearest(&self, rgb: [u8; 3]) -> usize {
        match &self.lookup {
            Lookup::Gray => {
                let luma = 0.299 * f32::from(rgb[0])
                    + 0.587 * f32::from(rgb[1])
                    + 0.114 * f32::from(rgb[2]);
                let steps = self.colors.len().saturating_sub(1) as f32;
                (luma * steps / 255.0).round() as usize
            }
            Lookup::Exact => self
                .colors
                .iter()
                .enumerate()
                .min_by_key(|(_, color)| distance(**color, rgb))
                .map_or(0, |(index, _)| index),
            Lookup::Neural(quantizer) => quantizer.index_of(&[rgb[0], rgb[1], rgb[2], 255]),
        }
    }
}

fn distance(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| u32::from(x.abs_diff(y)).pow(2))
        .sum()
}

fn map_pixels(
    rgba: &RgbaImage,
    palette: &Palette,
    dither: GifDither,
    transparent_index: Option<usize>,
) -> Vec<u8> {
    let (width, height) = (rgba.width() as usize, rgba.height() as usize);
    let diffusion = match dither {
        GifDither::FloydSteinberg => 1.0,
        GifDither::FloydSteinbergReduced => 0.75,
        GifDither::None | GifDither::Positioned => 0.0,
    };
    let mut error = vec![[0.0_f32; 3]; width * height];
    let mut indices = Vec::with_capacity(width * height);

    for y in 0..height {
        for x in 0..width {
            let pixel = rgba.get_pixel(x as u32, y as u32);
            if let Some(transparent) = transparent_index {
                if pixel[3] < ALPHA_THRESHOLD {
                    indices.push(transparent as u8);
                    continue;
                }
            }

            let offset = if dither == GifDither::Positioned {
                (f32::from(BAYER_4X4[y % 4][x % 4]) + 0.5) / 16.0 - 0.5
            } else {
                0.0
            };
            let wanted: [f32; 3] = std::array::from_fn(|channel| {
                f32::from(pixel[channel])
                    + error[y * width + x][channel]
                    + offset * POSITIONED_SPREAD
            });
            let rgb = wanted.map(|value| value.round().clamp(0.0, 255.0) as u8);
            let index = palette.nearest(rgb).min(palette.colors.len() - 1);
            indices.push(index as u8);

            if diffusion > 0.0 {
                let chosen = palette.colors[index];
                let residual: [f32; 3] = std::array::from_fn(|channel| {
                    (wanted[channel] - f32::from(chosen[channel])) * diffusion
                });
                let mut spread = |dx: isize, dy: usize, weight: f32| {
                    let nx = x as isize + dx;
                    let ny = y + dy;
                    if nx < 0 || nx as usize >= width || ny >= height {
                        return;
                    }
                    let cell = &mut error[ny * width + nx as usize];
                    for channel in 0..3 {
                        cell[channel] += residual[channel] * weight;
                    }
                };
                spread(1, 0, 7.0 / 16.0);
                spread(-1, 1, 3.0 / 16.0);
                spread(0, 1, 5.0 / 16.0);
                spread(1, 1, 1.0 / 16.0);
            }
        }
    }
    indices
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgba};

    use super::*;
    use crate::raster::Layer;

    fn gradient(transparent_corner: bool) -> LayeredImage {
        let pixels = RgbaImage::from_fn(32, 16, |x, y| {
            if transparent_corner && x < 4 && y < 4 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([(x * 8) as u8, (y * 16) as u8, 128, 255])
            }
        });
        let mut image = LayeredImage::new(32, 16);
        image.layers.push(Layer::new("Background", pixels));
        image
    }

    fn encode(image: &LayeredImage, options: &GifOptions) -> Vec<u8> {
        let mut bytes = Vec::new();
        write_gif(image, options, &mut bytes).expect("gif");
        bytes
    }

    #[test]
    fn writes_a_decodable_gif() {
        let bytes = encode(&gradient(false), &GifOptions::default());

        assert!(bytes.starts_with(b"GIF89a"));
        let decoded = image::load(Cursor::new(&bytes), ImageFormat::Gif).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
    }

    #[test]
    fn transparent_pixels_use_reserved_index() {
        let options = GifOptions {
            dither: GifDither::FloydSteinberg,
            ..GifOptions::default()
        };
        let bytes = encode(&gradient(true), &options);

        let decoded = image::load(Cursor::new(&bytes), ImageFormat::Gif)
            .expect("decode")
            .to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0)[3], 0);
        assert_eq!(decoded.get_pixel(20, 10)[3], 255);
    }

    #[test]
    fn few_colours_keep_an_exact_palette() {
        let two = RgbaImage::from_fn(4, 4, |x, _| {
            if x < 2 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });

        let palette = Palette::quantized(&two, 255);

        assert_eq!(palette.colors, vec![[255, 0, 0], [0, 0, 255]]);
        assert_eq!(palette.nearest([250, 10, 10]), 0);
    }

    #[test]
    fn many_colours_are_reduced_to_the_palette_size() {
        let image = gradient(false);

        let palette = Palette::quantized(&image.composite(), 16);

        assert_eq!(palette.colors.len(), 16);
    }

    #[test]
    fn grayscale_palette_maps_by_luma() {
        let palette = Palette::grayscale(2);

        assert_eq!(palette.colors, vec![[0, 0, 0], [255, 255, 255]]);
        assert_eq!(palette.nearest([250, 250, 250]), 1);
        assert_eq!(palette.nearest([10, 10, 10]), 0);
    }

    #[test]
    fn dithering_mixes_two_levels_for_mid_gray() {
        let mid = RgbaImage::from_pixel(8, 8, Rgba([128, 128, 128, 255]));
        let palette = Palette::grayscale(2);

        let plain = map_pixels(&mid, &palette, GifDither::None, None);
        let diffused = map_pixels(&mid, &palette, GifDither::FloydSteinberg, None);
        let positioned = map_pixels(&mid, &palette, GifDither::Positioned, None);

        assert!(plain.iter().all(|index| *index == plain[0]));
        assert!(diffused.contains(&0) && diffused.contains(&1));
        assert!(positioned.contains(&0) && positioned.contains(&1));
    }
}
