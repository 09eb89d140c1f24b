use crate::{DomainError, RgbColor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Rgb,
    Grayscale,
}

/// How the background layer of a new template page is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    Foreground,
    Background,
    #[default]
    White,
    Transparent,
}

/// A named guide rectangle, in pixels from the top-left corner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideBox {
    pub name: String,
    pub top: u32,
    pub left: u32,
    pub right: u32,
    pub bottom: u32,
}

/// Everything needed to synthesize the template page of a new book.
///
/// Fill colours are explicit here rather than read from editor state.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBookSpec {
    pub width: u32,
    pub height: u32,
    pub resolution: u32,
    pub color_mode: ColorMode,
    pub fill: FillMode,
    pub foreground: RgbColor,
    pub background: RgbColor,
    pub margin_top: u32,
    pub margin_bottom: u32,
    pub margin_sides: u32,
    pub bleed: u32,
}

impl Default for NewBookSpec {
    fn default() -> Self {
        Self {
            width: 800,
            height: 1200,
            resolution: 300,
            color_mode: ColorMode::Rgb,
            fill: FillMode::White,
            foreground: RgbColor::BLACK,
            background: RgbColor::WHITE,
            margin_top: 0,
            margin_bottom: 0,
            margin_sides: 0,
            bleed: 0,
        }
    }
}

impl NewBookSpec {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.width == 0 || self.height == 0 {
            return Err(DomainError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.resolution == 0 {
            return Err(DomainError::InvalidResolution(self.resolution));
        }
        Ok(())
    }

    /// Guide boxes for the margin area and the bleed area.
    ///
    /// The margin box sits inside the bleed. Boxes that would collapse to
    /// nothing are omitted.
    pub fn guide_boxes(&self) -> Vec<GuideBox> {
        let mut boxes = Vec::new();
        if self.margin_top > 0 || self.margin_bottom > 0 || self.margin_sides > 0 {
            boxes.push(GuideBox {
                name: "Margins".to_string(),
                top: self.margin_top + self.bleed,
                left: self.margin_sides + self.bleed,
                right: self
                    .width
                    .saturating_sub(self.margin_sides + self.bleed),
                bottom: self
                    .height
                    .saturating_sub(self.margin_bottom + self.bleed),
            });
        }
        if self.bleed > 0 {
            boxes.push(GuideBox {
                name: "Bleed".to_string(),
                top: self.bleed,
                left: self.bleed,
                right: self.width.saturating_sub(self.bleed),
                bottom: self.height.saturating_sub(self.bleed),
            });
        }
        boxes
    }

    /// Colour the background layer starts with; `None` means transparent.
    pub fn fill_color(&self) -> Option<RgbColor> {
        let color = match self.fill {
            FillMode::Foreground => self.foreground,
            FillMode::Background => self.background,
            FillMode::White => RgbColor::WHITE,
            FillMode::Transparent => return None,
        };
        Some(match self.color_mode {
            ColorMode::Rgb => color,
            ColorMode::Grayscale => {
                let luma = color.luma();
                RgbColor::new(luma, luma, luma)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_guides_without_margins_or_bleed() {
        assert!(NewBookSpec::default().guide_boxes().is_empty());
    }

    #[test]
    fn margin_box_sits_inside_bleed() {
        let spec = NewBookSpec {
            width: 1000,
            height: 1500,
            margin_top: 40,
            margin_bottom: 60,
            margin_sides: 30,
            bleed: 10,
            ..NewBookSpec::default()
        };
        let boxes = spec.guide_boxes();
        assert_eq!(
            boxes,
            vec![
                GuideBox {
                    name: "Margins".to_string(),
                    top: 50,
                    left: 40,
                    right: 960,
                    bottom: 1440,
                },
                GuideBox {
                    name: "Bleed".to_string(),
                    top: 10,
                    left: 10,
                    right: 990,
                    bottom: 1490,
                },
            ]
        );
    }

    #[test]
    fn grayscale_fill_uses_luma() {
        let spec = NewBookSpec {
            color_mode: ColorMode::Grayscale,
            fill: FillMode::Foreground,
            foreground: RgbColor::new(255, 0, 0),
            ..NewBookSpec::default()
        };
        assert_eq!(spec.fill_color(), Some(RgbColor::new(76, 76, 76)));
    }

    #[test]
    fn transparent_fill_has_no_color() {
        let spec = NewBookSpec {
            fill: FillMode::Transparent,
            ..NewBookSpec::default()
        };
        assert_eq!(spec.fill_color(), None);
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let spec = NewBookSpec {
            width: 0,
            ..NewBookSpec::default()
        };
        assert!(matches!(
            spec.validate(),
            Err(DomainError::InvalidDimensions { .. })
        ));
    }
}
