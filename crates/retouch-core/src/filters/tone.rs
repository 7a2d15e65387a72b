use crate::color::luma;
use crate::raster::{RasterBuffer, to_channel};

/// Largest per-channel lift applied by shadows/highlights at ±100.
const TONE_RANGE: f64 = 50.0;

/// Luma midpoint separating the shadow and highlight ranges.
const MIDPOINT: f64 = 128.0;

/// Scale every color channel by `1 + value / 100`.
pub fn exposure(buf: &mut RasterBuffer, value: f32) {
    if value == 0.0 {
        return;
    }

    let multiplier = 1.0 + value as f64 / 100.0;
    for pixel in buf.data.chunks_exact_mut(4) {
        pixel[0] = to_channel(pixel[0] as f64 * multiplier);
        pixel[1] = to_channel(pixel[1] as f64 * multiplier);
        pixel[2] = to_channel(pixel[2] as f64 * multiplier);
    }
}

/// Lift (positive) or crush (negative) pixels with luma below 128.
///
/// The effect scales linearly with darkness: black gets the full
/// `value / 100 * 50`, mid-gray gets nothing.
pub fn shadows(buf: &mut RasterBuffer, value: f32) {
    if value == 0.0 {
        return;
    }

    let strength = value as f64 / 100.0;
    for pixel in buf.data.chunks_exact_mut(4) {
        let l = luma(pixel[0] as f64, pixel[1] as f64, pixel[2] as f64);
        if l < MIDPOINT {
            let weight = (MIDPOINT - l) / MIDPOINT;
            offset_rgb(pixel, strength * weight * TONE_RANGE);
        }
    }
}

/// Brighten (positive) or recover (negative) pixels with luma above 128.
pub fn highlights(buf: &mut RasterBuffer, value: f32) {
    if value == 0.0 {
        return;
    }

    let strength = value as f64 / 100.0;
    for pixel in buf.data.chunks_exact_mut(4) {
        let l = luma(pixel[0] as f64, pixel[1] as f64, pixel[2] as f64);
        if l > MIDPOINT {
            let weight = (l - MIDPOINT) / 127.0;
            offset_rgb(pixel, strength * weight * TONE_RANGE);
        }
    }
}

fn offset_rgb(pixel: &mut [u8], delta: f64) {
    pixel[0] = to_channel(pixel[0] as f64 + delta);
    pixel[1] = to_channel(pixel[1] as f64 + delta);
    pixel[2] = to_channel(pixel[2] as f64 + delta);
}
