//! OpenRaster reading and writing.
//!
//! Pages are stored as OpenRaster archives. The working-format flavour adds
//! `<guide>` elements after the layer stack and a colour-mode attribute;
//! readers that do not know them skip them.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::{Cursor, Read, Seek, Write};

use image::{imageops, ImageFormat, RgbaImage};
use pagebook_domain::{thumbnail_dimensions, GuideBox, ThumbnailSize};
use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::document::{Layer, LayeredImage, DEFAULT_RESOLUTION};
use super::error::CodecError;

pub const MIMETYPE: &[u8] = b"image/openraster";
const STACK_XML: &str = "stack.xml";
const MERGED_IMAGE: &str = "mergedimage.png";
const THUMBNAIL: &str = "Thumbnails/thumbnail.png";
const COLOR_MODE_ATTRIBUTE: &str = "pagebook-colormode";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OraFlavor {
    /// Keeps guides and colour mode.
    Working,
    /// Plain OpenRaster for other applications.
    Interchange,
}

pub fn write_ora<W: Write + Seek>(
    image: &LayeredImage,
    flavor: OraFlavor,
    writer: W,
) -> Result<(), CodecError> {
    let mut zip = ZipWriter::new(writer);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    // mimetype must be the first entry, uncompressed
    zip.start_file("mimetype", stored)?;
    zip.write_all(MIMETYPE)?;

    zip.start_file(STACK_XML, deflated)?;
    zip.write_all(stack_xml(image, flavor).as_bytes())?;

    for (index, layer) in image.layers.iter().enumerate() {
        zip.start_file(layer_source(index), stored)?;
        zip.write_all(&png_bytes(&layer.pixels)?)?;
    }

    let merged = image.composite();
    zip.start_file(MERGED_IMAGE, stored)?;
    zip.write_all(&png_bytes(&merged)?)?;

    let (thumb_width, thumb_height) =
        thumbnail_dimensions(merged.width(), merged.height(), ThumbnailSize::DEFAULT);
    let thumbnail = imageops::thumbnail(&merged, thumb_width, thumb_height);
    zip.start_file(THUMBNAIL, stored)?;
    zip.write_all(&png_bytes(&thumbnail)?)?;

    zip.finish()?;
    Ok(())
}

pub fn read_ora<R: Read + Seek>(reader: R) -> Result<LayeredImage, CodecError> {
    let mut archive = ZipArchive::new(reader)?;
    let stack = read_entry(&mut archive, STACK_XML)?;
    let stack = String::from_utf8(stack)
        .map_err(|error| CodecError::InvalidOra(format!("stack.xml is not UTF-8: {error}")))?;
    let parsed = parse_stack(&stack)?;

    let mut image = LayeredImage::new(parsed.width, parsed.height);
    image.resolution = parsed.resolution;
    image.grayscale = parsed.grayscale;
    image.guides = parsed.guides;
    for entry in parsed.layers {
        let bytes = read_entry(&mut archive, &entry.source)?;
        let pixels = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?.to_rgba8();
        image.layers.push(Layer {
            name: entry.name,
            visible: entry.visible,
            opacity: entry.opacity,
            x: entry.x,
            y: entry.y,
            pixels,
        });
    }
    Ok(image)
}

/// The pre-rendered composite, without decoding every layer.
pub fn read_merged<R: Read + Seek>(reader: R) -> Result<RgbaImage, CodecError> {
    let mut archive = ZipArchive::new(reader)?;
    let bytes = read_entry(&mut archive, MERGED_IMAGE)?;
    Ok(image::load_from_memory_with_format(&bytes, ImageFormat::Png)?.to_rgba8())
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>, CodecError> {
    let mut entry = archive
        .by_name(name)
        .map_err(|_| CodecError::InvalidOra(format!("{name} is missing")))?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn png_bytes(pixels: &RgbaImage) -> Result<Vec<u8>, CodecError> {
    let mut bytes = Vec::new();
    pixels.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

fn layer_source(index: usize) -> String {
    format!("data/layer{index}.png")
}

fn stack_xml(image: &LayeredImage, flavor: OraFlavor) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = write!(
        xml,
        "<image version=\"0.0.5\" w=\"{}\" h=\"{}\" xres=\"{}\" yres=\"{}\"",
        image.width, image.height, image.resolution, image.resolution
    );
    if flavor == OraFlavor::Working && image.grayscale {
        let _ = write!(xml, " {COLOR_MODE_ATTRIBUTE}=\"gray\"");
    }
    xml.push_str(">\n  <stack>\n");
    for (index, layer) in image.layers.iter().enumerate() {
        let _ = writeln!(
            xml,
            "    <layer name=\"{}\" src=\"{}\" x=\"{}\" y=\"{}\" opacity=\"{:.3}\" visibility=\"{}\"/>",
            escape(layer.name.as_str()),
            layer_source(index),
            layer.x,
            layer.y,
            layer.opacity,
            if layer.visible { "visible" } else { "hidden" }
        );
    }
    xml.push_str("  </stack>\n");
    if flavor == OraFlavor::Working {
        for guide in &image.guides {
            let _ = writeln!(
                xml,
                "  <guide name=\"{}\" top=\"{}\" left=\"{}\" right=\"{}\" bottom=\"{}\"/>",
                escape(guide.name.as_str()),
                guide.top,
                guide.left,
                guide.right,
                guide.bottom
            );
        }
    }
    xml.push_str("</image>\n");
    xml
}

struct LayerEntry {
    name: String,
    source: String,
    visible: bool,
    opacity: f32,
    x: i64,
    y: i64,
}

struct ParsedStack {
    width: u32,
    height: u32,
    resolution: f64,
    grayscale: bool,
    layers: Vec<LayerEntry>,
    guides: Vec<GuideBox>,
}

fn parse_stack(content: &str) -> Result<ParsedStack, CodecError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut parsed: Option<ParsedStack> = None;
    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element) => {
                let attributes = attributes(&element)?;
                match element.name().as_ref() {
                    b"image" => {
                        let resolution = attributes
                            .get("xres")
                            .and_then(|value| value.parse::<f64>().ok())
                            .filter(|value| *value > 0.0)
                            .unwrap_or(DEFAULT_RESOLUTION);
                        parsed = Some(ParsedStack {
                            width: required(&attributes, "w")?,
                            height: required(&attributes, "h")?,
                            resolution,
                            grayscale: attributes
                                .get(COLOR_MODE_ATTRIBUTE)
                                .is_some_and(|mode| mode == "gray"),
                            layers: Vec::new(),
                            guides: Vec::new(),
                        });
                    }
                    b"layer" => {
                        let stack = parsed
                            .as_mut()
                            .ok_or_else(|| CodecError::InvalidOra("layer outside image".into()))?;
                        stack.layers.push(LayerEntry {
                            name: attributes.get("name").cloned().unwrap_or_default(),
                            source: attributes
                                .get("src")
                                .cloned()
                                .ok_or_else(|| CodecError::InvalidOra("layer without src".into()))?,
                            visible: attributes
                                .get("visibility")
                                .map_or(true, |value| value != "hidden"),
                            opacity: optional(&attributes, "opacity").unwrap_or(1.0),
                            x: optional(&attributes, "x").unwrap_or(0),
                            y: optional(&attributes, "y").unwrap_or(0),
                        });
                    }
                    b"guide" => {
                        if let Some(stack) = parsed.as_mut() {
                            stack.guides.push(GuideBox {
                                name: attributes.get("name").cloned().unwrap_or_default(),
                                top: optional(&attributes, "top").unwrap_or(0),
                                left: optional(&attributes, "left").unwrap_or(0),
                                right: optional(&attributes, "right").unwrap_or(0),
                                bottom: optional(&attributes, "bottom").unwrap_or(0),
                            });
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    parsed.ok_or_else(|| CodecError::InvalidOra("stack.xml has no image element".into()))
}

fn attributes(element: &BytesStart<'_>) -> Result<HashMap<String, String>, CodecError> {
    let mut values = HashMap::new();
    for attribute in element.attributes().flatten() {
        let key = String::from_utf8_lossy(attribute.key.as_ref()).to_string();
        let raw = String::from_utf8_lossy(&attribute.value).to_string();
        values.insert(key, unescape(&raw)?.into_owned());
    }
    Ok(values)
}

fn required<T: std::str::FromStr>(
    attributes: &HashMap<String, String>,
    key: &str,
) -> Result<T, CodecError> {
    optional(attributes, key)
        .ok_or_else(|| CodecError::InvalidOra(format!("missing or invalid attribute {key}")))
}

fn optional<T: std::str::FromStr>(attributes: &HashMap<String, String>, key: &str) -> Option<T> {
    attributes.get(key).and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    fn sample() -> LayeredImage {
        let mut image = LayeredImage::new(6, 4);
        image.resolution = 300.0;
        let mut sketch = Layer::new(
            "Sketch <rough> [wip]",
            RgbaImage::from_pixel(2, 2, Rgba([200, 10, 10, 255])),
        );
        sketch.visible = false;
        sketch.opacity = 0.5;
        sketch.x = 3;
        sketch.y = 1;
        image.layers.push(sketch);
        image.layers.push(Layer::new(
            "Background",
            RgbaImage::from_pixel(6, 4, Rgba([255, 255, 255, 255])),
        ));
        image.guides.push(GuideBox {
            name: "Bleed".to_string(),
            top: 1,
            left: 1,
            right: 5,
            bottom: 3,
        });
        image
    }

    fn written(image: &LayeredImage, flavor: OraFlavor) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        write_ora(image, flavor, &mut bytes).expect("write ora");
        bytes.into_inner()
    }

    #[test]
    fn working_flavor_keeps_layers_and_guides() {
        let image = sample();

        let loaded = read_ora(Cursor::new(written(&image, OraFlavor::Working))).expect("read ora");

        assert_eq!(loaded, image);
    }

    #[test]
    fn interchange_flavor_drops_guides() {
        let loaded = read_ora(Cursor::new(written(&sample(), OraFlavor::Interchange)))
            .expect("read ora");

        assert!(loaded.guides.is_empty());
        assert_eq!(loaded.layers.len(), 2);
    }

    #[test]
    fn mimetype_is_first_and_stored() {
        let bytes = written(&sample(), OraFlavor::Working);
        let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("zip");

        let entry = archive.by_index(0).expect("first entry");
        assert_eq!(entry.name(), "mimetype");
        assert_eq!(entry.compression(), CompressionMethod::Stored);
    }

    #[test]
    fn merged_image_matches_composite() {
        let image = sample();

        let merged = read_merged(Cursor::new(written(&image, OraFlavor::Working))).expect("merged");

        assert_eq!(merged, image.composite());
    }

    #[test]
    fn rejects_archives_without_stack() {
        let mut bytes = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut bytes);
        zip.start_file("mimetype", SimpleFileOptions::default())
            .expect("start");
        zip.write_all(MIMETYPE).expect("write");
        zip.finish().expect("finish");

        let result = read_ora(Cursor::new(bytes.into_inner()));

        assert!(matches!(result, Err(CodecError::InvalidOra(_))));
    }
}
