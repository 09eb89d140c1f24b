use image::{imageops, DynamicImage, Rgba, RgbaImage};
use pagebook_domain::{
    CanvasGrowth, ColorMode, GuideBox, Interpolation, MarginFill, NewBookSpec, RgbColor,
};

/// Resolution assumed for images that do not carry one.
pub const DEFAULT_RESOLUTION: f64 = 72.0;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub visible: bool,
    pub opacity: f32,
    pub x: i64,
    pub y: i64,
    pub pixels: RgbaImage,
}

impl Layer {
    pub fn new(name: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            name: name.into(),
            visible: true,
            opacity: 1.0,
            x: 0,
            y: 0,
            pixels,
        }
    }
}

/// An in-memory page: a stack of positioned RGBA layers plus the guide
/// boxes and resolution that travel with the working format.
#[derive(Debug, Clone, PartialEq)]
pub struct LayeredImage {
    pub width: u32,
    pub height: u32,
    /// Pixels per inch.
    pub resolution: f64,
    pub grayscale: bool,
    /// Top to bottom.
    pub layers: Vec<Layer>,
    pub guides: Vec<GuideBox>,
}

impl LayeredImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            resolution: DEFAULT_RESOLUTION,
            grayscale: false,
            layers: Vec::new(),
            guides: Vec::new(),
        }
    }

    /// The template page of a new book: one filled background layer.
    pub fn from_spec(spec: &NewBookSpec) -> Self {
        let fill = spec
            .fill_color()
            .map(opaque)
            .unwrap_or(TRANSPARENT);
        Self {
            width: spec.width,
            height: spec.height,
            resolution: f64::from(spec.resolution),
            grayscale: spec.color_mode == ColorMode::Grayscale,
            layers: vec![Layer::new(
                "Background",
                RgbaImage::from_pixel(spec.width, spec.height, fill),
            )],
            guides: spec.guide_boxes(),
        }
    }

    /// Wraps a decoded single-layer raster.
    pub fn from_raster(layer_name: &str, image: DynamicImage) -> Self {
        let grayscale = !image.color().has_color();
        let pixels = image.to_rgba8();
        let mut document = Self::new(pixels.width(), pixels.height());
        document.grayscale = grayscale;
        document.layers.push(Layer::new(layer_name, pixels));
        document
    }

    /// Visible layers blended over a transparent canvas.
    pub fn composite(&self) -> RgbaImage {
        let mut canvas = RgbaImage::from_pixel(self.width, self.height, TRANSPARENT);
        for layer in self.layers.iter().rev().filter(|layer| layer.visible) {
            blend_layer(&mut canvas, layer);
        }
        canvas
    }

    /// Replaces the stack with one opaque layer; hidden layers are dropped.
    pub fn flatten(&mut self) {
        let mut flat = RgbaImage::from_pixel(self.width, self.height, WHITE);
        for layer in self.layers.iter().rev().filter(|layer| layer.visible) {
            blend_layer(&mut flat, layer);
        }
        self.layers = vec![Layer::new("Background", flat)];
    }

    pub fn margin_color(&self, fill: MarginFill) -> Rgba<u8> {
        match fill {
            MarginFill::PageBackground => self
                .layers
                .last()
                .and_then(|layer| layer.pixels.get_pixel_checked(0, 0))
                .copied()
                .unwrap_or(WHITE),
            MarginFill::Black => opaque(RgbColor::BLACK),
            MarginFill::White => WHITE,
            MarginFill::Custom(color) => opaque(color),
        }
    }

    /// Enlarges the canvas and moves all content by the growth offset. The
    /// bottom layer is stretched to the new canvas with the margin colour in
    /// the added area.
    pub fn resize_canvas(&mut self, growth: CanvasGrowth, fill: MarginFill) {
        let color = self.margin_color(fill);
        let dx = i64::from(growth.offset_x);
        let dy = i64::from(growth.offset_y);

        for layer in &mut self.layers {
            layer.x += dx;
            layer.y += dy;
        }
        if let Some(bottom) = self.layers.last_mut() {
            let mut grown = RgbaImage::from_pixel(growth.width, growth.height, color);
            imageops::replace(&mut grown, &bottom.pixels, bottom.x, bottom.y);
            bottom.pixels = grown;
            bottom.x = 0;
            bottom.y = 0;
        }
        for guide in &mut self.guides {
            guide.top += growth.offset_y;
            guide.bottom += growth.offset_y;
            guide.left += growth.offset_x;
            guide.right += growth.offset_x;
        }

        self.width = growth.width;
        self.height = growth.height;
    }

    pub fn scale(&mut self, width: u32, height: u32, interpolation: Interpolation) {
        let sx = f64::from(width) / f64::from(self.width.max(1));
        let sy = f64::from(height) / f64::from(self.height.max(1));
        let filter = filter_type(interpolation);

        for layer in &mut self.layers {
            let layer_width = scaled(layer.pixels.width(), sx);
            let layer_height = scaled(layer.pixels.height(), sy);
            layer.pixels = imageops::resize(&layer.pixels, layer_width, layer_height, filter);
            layer.x = (layer.x as f64 * sx).round() as i64;
            layer.y = (layer.y as f64 * sy).round() as i64;
        }
        for guide in &mut self.guides {
            guide.top = (f64::from(guide.top) * sy).round() as u32;
            guide.bottom = (f64::from(guide.bottom) * sy).round() as u32;
            guide.left = (f64::from(guide.left) * sx).round() as u32;
            guide.right = (f64::from(guide.right) * sx).round() as u32;
        }

        self.width = width;
        self.height = height;
    }
}

pub fn filter_type(interpolation: Interpolation) -> imageops::FilterType {
    match interpolation {
        Interpolation::None => imageops::FilterType::Nearest,
        Interpolation::Linear => imageops::FilterType::Triangle,
        Interpolation::Cubic => imageops::FilterType::CatmullRom,
        Interpolation::Lanczos => imageops::FilterType::Lanczos3,
    }
}

fn scaled(length: u32, factor: f64) -> u32 {
    ((f64::from(length) * factor).round() as u32).max(1)
}

fn opaque(color: RgbColor) -> Rgba<u8> {
    Rgba([color.red, color.green, color.blue, 255])
}

fn blend_layer(canvas: &mut RgbaImage, layer: &Layer) {
    let opacity = layer.opacity.clamp(0.0, 1.0);
    let (canvas_width, canvas_height) = (i64::from(canvas.width()), i64::from(canvas.height()));
    for (lx, ly, source) in layer.pixels.enumerate_pixels() {
        let x = layer.x + i64::from(lx);
        let y = layer.y + i64::from(ly);
        if x < 0 || y < 0 || x >= canvas_width || y >= canvas_height {
            continue;
        }
        let target = canvas.get_pixel_mut(x as u32, y as u32);
        *target = over(*target, *source, opacity);
    }
}

/// Porter-Duff source-over on straight alpha.
fn over(dst: Rgba<u8>, src: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let src_alpha = f32::from(src[3]) / 255.0 * opacity;
    if src_alpha <= 0.0 {
        return dst;
    }
    let dst_alpha = f32::from(dst[3]) / 255.0;
    let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);

    let mut out = [0_u8; 4];
    for channel in 0..3 {
        let value = (f32::from(src[channel]) * src_alpha
            + f32::from(dst[channel]) * dst_alpha * (1.0 - src_alpha))
            / out_alpha;
        out[channel] = value.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}
