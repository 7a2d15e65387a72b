use rayon::prelude::*;

use crate::raster::{RasterBuffer, to_channel};

/// Darken toward the corners.
///
/// Each pixel is scaled by `1 - (d / d_max)^2 * value / 100`, where `d` is
/// the distance from the image center and `d_max` the center-to-corner
/// distance.
pub fn vignette(buf: &mut RasterBuffer, value: f32) {
    if value == 0.0 || buf.is_empty() {
        return;
    }

    let strength = value as f64 / 100.0;
    let width = buf.width as usize;
    let cx = buf.width as f64 / 2.0;
    let cy = buf.height as f64 / 2.0;
    let max_distance = (cx * cx + cy * cy).sqrt();

    buf.data
        .par_chunks_mut(width * 4)
        .enumerate()
        .for_each(|(y, row)| {
            let dy = y as f64 - cy;
            for (x, pixel) in row.chunks_exact_mut(4).enumerate() {
                let dx = x as f64 - cx;
                let ratio = (dx * dx + dy * dy).sqrt() / max_distance;
                let darkening = 1.0 - ratio * ratio * strength;
                pixel[0] = to_channel(pixel[0] as f64 * darkening);
                pixel[1] = to_channel(pixel[1] as f64 * darkening);
                pixel[2] = to_channel(pixel[2] as f64 * darkening);
            }
        });
}
