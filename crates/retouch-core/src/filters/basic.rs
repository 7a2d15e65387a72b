use crate::adjustments::NamedFilter;
use crate::color::luma;
use crate::raster::{RasterBuffer, to_channel};

const SEPIA: [[f64; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

/// Per-output-channel scale that turns sepia into the vintage preset.
const VINTAGE_SCALE: [f64; 3] = [0.8, 0.8, 0.6];

/// Apply a fixed color-matrix preset.
pub fn named_filter(buf: &mut RasterBuffer, filter: NamedFilter) {
    match filter {
        NamedFilter::None => {}
        NamedFilter::Grayscale => {
            for pixel in buf.data.chunks_exact_mut(4) {
                let gray = to_channel(luma(pixel[0] as f64, pixel[1] as f64, pixel[2] as f64));
                pixel[0] = gray;
                pixel[1] = gray;
                pixel[2] = gray;
            }
        }
        NamedFilter::Sepia => apply_matrix(buf, [1.0; 3]),
        NamedFilter::Vintage => apply_matrix(buf, VINTAGE_SCALE),
    }
}

fn apply_matrix(buf: &mut RasterBuffer, scale: [f64; 3]) {
    for pixel in buf.data.chunks_exact_mut(4) {
        let rgb = [pixel[0] as f64, pixel[1] as f64, pixel[2] as f64];
        for (c, row) in SEPIA.iter().enumerate() {
            let v = row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2];
            pixel[c] = to_channel(v * scale[c]);
        }
    }
}

/// Contrast factor for a slider value in [-100, 100].
///
/// The classic `259 * (C + 255) / (255 * (259 - C))` curve with the slider
/// mapped onto C in [-255, 255].
pub fn contrast_factor(contrast: f32) -> f64 {
    let c = contrast as f64 / 100.0 * 255.0;
    (259.0 * (c + 255.0)) / (255.0 * (259.0 - c))
}

/// Saturation, brightness and contrast in one pass, in that order.
///
/// Intermediate values stay in floating point and are stored once, so the
/// three knobs compose without intermediate 8-bit rounding. Saturation is
/// skipped when a named filter is active to avoid double color shifts.
pub fn basic_adjust(
    buf: &mut RasterBuffer,
    brightness: f32,
    contrast: f32,
    saturation: f32,
    filter: NamedFilter,
) {
    let apply_saturation = saturation != 0.0 && filter == NamedFilter::None;
    if !apply_saturation && brightness == 0.0 && contrast == 0.0 {
        return;
    }

    let sat_factor = 1.0 + saturation as f64 / 100.0;
    let bright_factor = 1.0 + brightness as f64 / 100.0;
    let contrast_factor = contrast_factor(contrast);

    for pixel in buf.data.chunks_exact_mut(4) {
        let mut r = pixel[0] as f64;
        let mut g = pixel[1] as f64;
        let mut b = pixel[2] as f64;

        if apply_saturation {
            let gray = luma(r, g, b);
            r = gray + (r - gray) * sat_factor;
            g = gray + (g - gray) * sat_factor;
            b = gray + (b - gray) * sat_factor;
        }

        if brightness != 0.0 {
            r *= bright_factor;
            g *= bright_factor;
            b *= bright_factor;
        }

        if contrast != 0.0 {
            r = contrast_factor * (r - 128.0) + 128.0;
            g = contrast_factor * (g - 128.0) + 128.0;
            b = contrast_factor * (b - 128.0) + 128.0;
        }

        pixel[0] = to_channel(r);
        pixel[1] = to_channel(g);
        pixel[2] = to_channel(b);
    }
}
