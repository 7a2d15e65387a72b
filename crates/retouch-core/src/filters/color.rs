use crate::color::{hsl_to_rgb, rgb_to_hsl};
use crate::raster::{RasterBuffer, to_channel};

/// Maximum red/blue shift at temperature ±100.
const TEMPERATURE_SHIFT: f64 = 30.0;

/// Warm (positive) or cool (negative) white-balance shift.
///
/// Positive values add to red and take from blue; negative values mirror.
pub fn temperature(buf: &mut RasterBuffer, value: f32) {
    if value == 0.0 {
        return;
    }

    let shift = value as f64 / 100.0 * TEMPERATURE_SHIFT;
    for pixel in buf.data.chunks_exact_mut(4) {
        pixel[0] = to_channel(pixel[0] as f64 + shift);
        pixel[2] = to_channel(pixel[2] as f64 - shift);
    }
}

/// Rotate hue by `value` degrees through an HSL round-trip.
///
/// A full turn (360) maps every hue back onto itself.
pub fn hue(buf: &mut RasterBuffer, value: f32) {
    if value == 0.0 {
        return;
    }

    let shift = value as f64 / 360.0;
    for pixel in buf.data.chunks_exact_mut(4) {
        let (h, s, l) = rgb_to_hsl(pixel[0] as f64, pixel[1] as f64, pixel[2] as f64);
        let h = (h + shift).rem_euclid(1.0);
        let (r, g, b) = hsl_to_rgb(h, s, l);
        pixel[0] = to_channel(r);
        pixel[1] = to_channel(g);
        pixel[2] = to_channel(b);
    }
}

/// Saturation boost weighted toward muted colors.
///
/// Each pixel gains `(1 - S) * value / 100` saturation, so already vivid
/// colors move the least. Negative values pull muted colors toward gray.
pub fn vibrance(buf: &mut RasterBuffer, value: f32) {
    if value == 0.0 {
        return;
    }

    let strength = value as f64 / 100.0;
    for pixel in buf.data.chunks_exact_mut(4) {
        let (h, s, l) = rgb_to_hsl(pixel[0] as f64, pixel[1] as f64, pixel[2] as f64);
        let boosted = (s + (1.0 - s) * strength).clamp(0.0, 1.0);
        let (r, g, b) = hsl_to_rgb(h, boosted, l);
        pixel[0] = to_channel(r);
        pixel[1] = to_channel(g);
        pixel[2] = to_channel(b);
    }
}
