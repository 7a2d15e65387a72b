use image::imageops::{self, FilterType};
use serde::Serialize;

use crate::adjustments::{Adjustments, NamedFilter};
use crate::filters;
use crate::raster::RasterBuffer;

/// Side of the square gallery thumbnails.
pub const THUMBNAIL_SIZE: u32 = 80;

/// One-click look from the filter gallery.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FilterPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub filter: NamedFilter,
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
}

impl FilterPreset {
    const fn new(
        id: &'static str,
        name: &'static str,
        filter: NamedFilter,
        brightness: f32,
        contrast: f32,
        saturation: f32,
    ) -> Self {
        Self {
            id,
            name,
            filter,
            brightness,
            contrast,
            saturation,
        }
    }

    /// Overwrite the preset-controlled knobs, keeping everything else.
    pub fn apply_to(&self, adj: &Adjustments) -> Adjustments {
        Adjustments {
            named_filter: self.filter,
            brightness: self.brightness,
            contrast: self.contrast,
            saturation: self.saturation,
            ..adj.clone()
        }
    }

    /// Whether `adj` currently matches this preset's knobs.
    pub fn matches(&self, adj: &Adjustments) -> bool {
        adj.named_filter == self.filter
            && adj.brightness == self.brightness
            && adj.contrast == self.contrast
            && adj.saturation == self.saturation
    }
}

pub const PRESETS: &[FilterPreset] = &[
    FilterPreset::new("original", "Original", NamedFilter::None, 0.0, 0.0, 0.0),
    FilterPreset::new("grayscale", "Grayscale", NamedFilter::Grayscale, 0.0, 0.0, 0.0),
    FilterPreset::new("sepia", "Sepia", NamedFilter::Sepia, 0.0, 0.0, 0.0),
    FilterPreset::new("vintage", "Vintage", NamedFilter::Vintage, 5.0, -10.0, 0.0),
    FilterPreset::new("vivid", "Vivid", NamedFilter::None, 5.0, 15.0, 40.0),
    FilterPreset::new("dramatic", "Dramatic", NamedFilter::None, -10.0, 40.0, -20.0),
    FilterPreset::new("fade", "Fade", NamedFilter::None, 10.0, -25.0, -30.0),
    FilterPreset::new("warm-glow", "Warm Glow", NamedFilter::Sepia, 10.0, -10.0, 0.0),
];

pub fn find_preset(id: &str) -> Option<&'static FilterPreset> {
    PRESETS.iter().find(|p| p.id == id)
}

/// Square gallery preview of `preset` applied to `original`.
///
/// The image is scaled to fit `size` x `size` (up or down), centered on a
/// transparent square, then run through the named filter and the basic
/// knobs only.
pub fn preset_thumbnail(original: &RasterBuffer, preset: &FilterPreset, size: u32) -> RasterBuffer {
    let size = size.max(1);
    let mut canvas = RasterBuffer::new(size, size);
    if original.is_empty() {
        return canvas;
    }

    let scale = (size as f64 / original.width as f64).min(size as f64 / original.height as f64);
    let w = ((original.width as f64 * scale).round() as u32).clamp(1, size);
    let h = ((original.height as f64 * scale).round() as u32).clamp(1, size);
    let x0 = (size - w) / 2;
    let y0 = (size - h) / 2;

    let Ok(source) = original.clone().into_rgba_image() else {
        return canvas;
    };
    let scaled = imageops::resize(&source, w, h, FilterType::Triangle);
    for (x, y, px) in scaled.enumerate_pixels() {
        canvas.set_pixel(x0 + x, y0 + y, px.0);
    }

    filters::named_filter(&mut canvas, preset.filter);
    filters::basic_adjust(
        &mut canvas,
        preset.brightness,
        preset.contrast,
        preset.saturation,
        preset.filter,
    );
    canvas
}
