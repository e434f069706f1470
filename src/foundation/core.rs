use serde::{Deserialize, Serialize};

use crate::foundation::error::{ReportError, ReportResult};

const MM_PER_INCH: f32 = 25.4;

/// Page dimensions in millimetres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSize {
    /// Width in millimetres.
    pub width_mm: f32,
    /// Height in millimetres.
    pub height_mm: f32,
}

impl PageSize {
    /// ISO 216 A4, portrait.
    pub const A4: PageSize = PageSize {
        width_mm: 210.0,
        height_mm: 297.0,
    };

    /// Pixel size of the page at `dpi`, rounded to the nearest pixel (A4 at 96 DPI is 794x1123).
    pub fn pixels_at(self, dpi: f32) -> (u32, u32) {
        let to_px = |mm: f32| ((mm / MM_PER_INCH) * dpi).round().max(1.0) as u32;
        (to_px(self.width_mm), to_px(self.height_mm))
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4
    }
}

/// Straight (non-premultiplied) RGB8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb8 {
    pub const BLACK: Rgb8 = Rgb8::new(0, 0, 0);
    pub const WHITE: Rgb8 = Rgb8::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels mapped to `0.0..=1.0`.
    pub fn to_unit(self) -> (f32, f32, f32) {
        (
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        )
    }
}

/// Layout and rendering knobs for one generation run.
///
/// Every field has a default; a settings file only needs to name what it overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportSettings {
    /// Output page size.
    pub page: PageSize,
    /// Symmetric left/right margin; content width is `page.width_mm - 2 * margin_mm`.
    pub margin_mm: f32,
    /// Vertical advance per wrapped line, in millimetres per point of font size.
    pub line_height_factor: f32,
    /// DPI the cover markup is laid out at.
    pub cover_dpi: f32,
    /// Oversampling applied on top of `cover_dpi`.
    pub cover_scale: f32,
    /// JPEG quality (1..=100) for the rasterized cover.
    pub cover_jpeg_quality: u8,
    /// Width of the item image inset.
    pub item_image_width_mm: f32,
    /// Height of the item image inset.
    pub item_image_height_mm: f32,
    /// Pixel density the item image is re-encoded at.
    pub item_image_px_per_mm: f32,
    /// JPEG quality (1..=100) for item images.
    pub item_image_jpeg_quality: u8,
    /// Per-request timeout for remote images.
    pub http_timeout_secs: u64,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            page: PageSize::A4,
            margin_mm: 20.0,
            line_height_factor: 0.5,
            cover_dpi: 96.0,
            cover_scale: 2.0,
            cover_jpeg_quality: 95,
            item_image_width_mm: 80.0,
            item_image_height_mm: 60.0,
            item_image_px_per_mm: 2.0,
            item_image_jpeg_quality: 80,
            http_timeout_secs: 15,
        }
    }
}

impl ReportSettings {
    /// Width available to wrapped text.
    pub fn content_width_mm(&self) -> f32 {
        self.page.width_mm - 2.0 * self.margin_mm
    }

    /// Cover raster size in layout pixels (before oversampling).
    pub fn cover_pixels(&self) -> (u32, u32) {
        self.page.pixels_at(self.cover_dpi)
    }

    /// Pixel size item images are resampled to.
    pub fn item_image_pixels(&self) -> (u32, u32) {
        let w = (self.item_image_width_mm * self.item_image_px_per_mm).round().max(1.0);
        let h = (self.item_image_height_mm * self.item_image_px_per_mm).round().max(1.0);
        (w as u32, h as u32)
    }

    pub fn validate(&self) -> ReportResult<()> {
        fn positive(name: &str, v: f32) -> ReportResult<()> {
            if !v.is_finite() || v <= 0.0 {
                return Err(ReportError::validation(format!(
                    "{name} must be finite and > 0"
                )));
            }
            Ok(())
        }

        positive("page.widthMm", self.page.width_mm)?;
        positive("page.heightMm", self.page.height_mm)?;
        positive("lineHeightFactor", self.line_height_factor)?;
        positive("coverDpi", self.cover_dpi)?;
        positive("coverScale", self.cover_scale)?;
        positive("itemImageWidthMm", self.item_image_width_mm)?;
        positive("itemImageHeightMm", self.item_image_height_mm)?;
        positive("itemImagePxPerMm", self.item_image_px_per_mm)?;

        if !self.margin_mm.is_finite() || self.margin_mm < 0.0 {
            return Err(ReportError::validation("marginMm must be finite and >= 0"));
        }
        if self.content_width_mm() <= 0.0 {
            return Err(ReportError::validation(
                "marginMm leaves no room for content",
            ));
        }
        for (name, q) in [
            ("coverJpegQuality", self.cover_jpeg_quality),
            ("itemImageJpegQuality", self.item_image_jpeg_quality),
        ] {
            if !(1..=100).contains(&q) {
                return Err(ReportError::validation(format!("{name} must be in 1..=100")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_at_96_dpi_matches_css_pixels() {
        assert_eq!(PageSize::A4.pixels_at(96.0), (794, 1123));
    }

    #[test]
    fn defaults_are_valid() {
        let s = ReportSettings::default();
        s.validate().unwrap();
        assert_eq!(s.content_width_mm(), 170.0);
        assert_eq!(s.item_image_pixels(), (160, 120));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let s: ReportSettings = serde_json::from_str(r#"{"marginMm": 25}"#).unwrap();
        assert_eq!(s.margin_mm, 25.0);
        assert_eq!(s.cover_scale, 2.0);
    }

    #[test]
    fn oversized_margin_is_rejected() {
        let s = ReportSettings {
            margin_mm: 120.0,
            ..ReportSettings::default()
        };
        assert!(s.validate().is_err());

        let s = ReportSettings {
            cover_jpeg_quality: 0,
            ..ReportSettings::default()
        };
        assert!(s.validate().is_err());
    }
}
