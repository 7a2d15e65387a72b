use rayon::prelude::*;

use crate::raster::{RasterBuffer, to_channel};

const SHARPEN_KERNEL: [[f64; 3]; 3] = [[0.0, -1.0, 0.0], [-1.0, 5.0, -1.0], [0.0, -1.0, 0.0]];

/// Local contrast: push each pixel away from its 3x3 neighborhood mean.
///
/// `out = center + (center - mean) * value / 100 * 2`. The one-pixel border
/// is left untouched.
pub fn clarity(buf: &mut RasterBuffer, value: f32) {
    if value == 0.0 || buf.width < 3 || buf.height < 3 {
        return;
    }

    let amount = value as f64 / 100.0 * 2.0;
    let snapshot = buf.data.clone();
    let width = buf.width as usize;
    let height = buf.height as usize;
    let stride = width * 4;

    buf.data
        .par_chunks_mut(stride)
        .enumerate()
        .filter(|(y, _)| *y > 0 && *y < height - 1)
        .for_each(|(y, row)| {
            for x in 1..width - 1 {
                for c in 0..3 {
                    let mut sum = 0.0;
                    for ny in y - 1..=y + 1 {
                        for nx in x - 1..=x + 1 {
                            sum += snapshot[ny * stride + nx * 4 + c] as f64;
                        }
                    }
                    let mean = sum / 9.0;
                    let center = snapshot[y * stride + x * 4 + c] as f64;
                    row[x * 4 + c] = to_channel(center + (center - mean) * amount);
                }
            }
        });
}

/// Blend the image with a 3x3 sharpen convolution by `value / 100`.
///
/// The one-pixel border is left untouched.
pub fn sharpness(buf: &mut RasterBuffer, value: f32) {
    if value == 0.0 || buf.width < 3 || buf.height < 3 {
        return;
    }

    let amount = value as f64 / 100.0;
    let snapshot = buf.data.clone();
    let width = buf.width as usize;
    let height = buf.height as usize;
    let stride = width * 4;

    buf.data
        .par_chunks_mut(stride)
        .enumerate()
        .filter(|(y, _)| *y > 0 && *y < height - 1)
        .for_each(|(y, row)| {
            for x in 1..width - 1 {
                for c in 0..3 {
                    let mut sharpened = 0.0;
                    for (ky, kernel_row) in SHARPEN_KERNEL.iter().enumerate() {
                        for (kx, weight) in kernel_row.iter().enumerate() {
                            let idx = (y + ky - 1) * stride + (x + kx - 1) * 4 + c;
                            sharpened += snapshot[idx] as f64 * weight;
                        }
                    }
                    let original = snapshot[y * stride + x * 4 + c] as f64;
                    row[x * 4 + c] = to_channel(original * (1.0 - amount) + sharpened * amount);
                }
            }
        });
}

/// Box radius used by [`blur`] for a given knob value.
pub fn blur_radius(value: f32) -> usize {
    ((value.max(0.0) / 10.0).floor() as usize).saturating_add(1)
}

/// Box blur with radius `floor(value / 10) + 1`.
///
/// The averaging window is clipped to the image, so edge pixels average
/// fewer neighbors instead of sampling outside the buffer.
pub fn blur(buf: &mut RasterBuffer, value: f32) {
    if value.is_nan() || value <= 0.0 || buf.is_empty() {
        return;
    }

    let snapshot = buf.data.clone();
    let width = buf.width as usize;
    let height = buf.height as usize;
    // Any window at least as large as the image already spans all of it
    let radius = blur_radius(value).min(width.max(height));
    let stride = width * 4;

    buf.data
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            let y0 = y.saturating_sub(radius);
            let y1 = (y + radius).min(height - 1);
            for x in 0..width {
                let x0 = x.saturating_sub(radius);
                let x1 = (x + radius).min(width - 1);

                let mut sum = [0u32; 3];
                for ny in y0..=y1 {
                    let line = &snapshot[ny * stride..(ny + 1) * stride];
                    for nx in x0..=x1 {
                        let px = &line[nx * 4..nx * 4 + 3];
                        sum[0] += px[0] as u32;
                        sum[1] += px[1] as u32;
                        sum[2] += px[2] as u32;
                    }
                }

                let count = ((y1 - y0 + 1) * (x1 - x0 + 1)) as f64;
                for c in 0..3 {
                    row[x * 4 + c] = to_channel(sum[c] as f64 / count);
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_util::{alpha_channel, gradient};

    fn checkerboard(size: u32) -> RasterBuffer {
        let mut buf = RasterBuffer::new(size, size);
        for y in 0..size {
            for x in 0..size {
                let v = if (x + y) % 2 == 0 { 200 } else { 50 };
                buf.set_pixel(x, y, [v, v, v, 255]);
            }
        }
        buf
    }

    #[test]
    fn neutral_values_are_identity() {
        let mut buf = gradient(11, 9);
        let expected = buf.clone();
        clarity(&mut buf, 0.0);
        sharpness(&mut buf, 0.0);
        blur(&mut buf, 0.0);
        assert_eq!(buf, expected);
    }

    #[test]
    fn flat_image_unchanged_by_local_filters() {
        let mut buf = RasterBuffer::filled(8, 8, [90, 140, 30, 255]);
        let expected = buf.clone();
        clarity(&mut buf, 100.0);
        sharpness(&mut buf, 100.0);
        blur(&mut buf, 50.0);
        assert_eq!(buf, expected);
    }

    #[test]
    fn clarity_reads_from_snapshot() {
        // Center pixel of a 3x3 with a bright middle: mean = (8*100 + 190) / 9 = 110
        let mut buf = RasterBuffer::filled(3, 3, [100, 100, 100, 255]);
        buf.set_pixel(1, 1, [190, 190, 190, 255]);
        clarity(&mut buf, 50.0);
        // 190 + (190 - 110) * 1.0 = 270 -> 255
        assert_eq!(buf.pixel(1, 1), Some([255, 255, 255, 255]));
        // Border untouched
        assert_eq!(buf.pixel(0, 0), Some([100, 100, 100, 255]));
    }

    #[test]
    fn clarity_negative_softens() {
        let mut buf = checkerboard(5);
        clarity(&mut buf, -50.0);
        let px = buf.pixel(2, 2).unwrap();
        // center 200, mean = (5*200 + 4*50) / 9 = 133.3; 200 - 66.7 = 133.3
        assert_eq!(px[0], 133);
    }

    #[test]
    fn sharpness_full_strength_is_kernel() {
        let mut buf = RasterBuffer::filled(3, 3, [100, 100, 100, 255]);
        buf.set_pixel(1, 1, [120, 120, 120, 255]);
        sharpness(&mut buf, 100.0);
        // 5*120 - 4*100 = 200
        assert_eq!(buf.pixel(1, 1), Some([200, 200, 200, 255]));
    }

    #[test]
    fn sharpness_half_strength_blends() {
        let mut buf = RasterBuffer::filled(3, 3, [100, 100, 100, 255]);
        buf.set_pixel(1, 1, [120, 120, 120, 255]);
        sharpness(&mut buf, 50.0);
        // 120 * 0.5 + 200 * 0.5 = 160
        assert_eq!(buf.pixel(1, 1), Some([160, 160, 160, 255]));
    }

    #[test]
    fn blur_radius_steps_every_ten() {
        assert_eq!(blur_radius(1.0), 1);
        assert_eq!(blur_radius(9.9), 1);
        assert_eq!(blur_radius(10.0), 2);
        assert_eq!(blur_radius(50.0), 6);
        assert_eq!(blur_radius(f32::NAN), 1);
        assert_eq!(blur_radius(f32::INFINITY), usize::MAX);
        assert_eq!(blur_radius(f32::MAX), usize::MAX);
    }

    #[test]
    fn blur_averages_clipped_window() {
        let mut buf = RasterBuffer::filled(3, 1, [0, 0, 0, 255]);
        buf.set_pixel(0, 0, [90, 90, 90, 255]);
        blur(&mut buf, 5.0);
        // radius 1: corner sees 2 pixels, middle sees 3
        assert_eq!(buf.pixel(0, 0), Some([45, 45, 45, 255]));
        assert_eq!(buf.pixel(1, 0), Some([30, 30, 30, 255]));
        assert_eq!(buf.pixel(2, 0), Some([0, 0, 0, 255]));
    }

    #[test]
    fn unbounded_blur_averages_whole_image() {
        let mut buf = RasterBuffer::filled(4, 2, [0, 0, 0, 255]);
        buf.set_pixel(0, 0, [80, 80, 80, 255]);
        for value in [f32::INFINITY, f32::MAX, 1e30] {
            let mut out = buf.clone();
            blur(&mut out, value);
            for (x, y) in [(0, 0), (3, 1)] {
                assert_eq!(out.pixel(x, y), Some([10, 10, 10, 255]), "blur({value}) at ({x}, {y})");
            }
        }

        let mut out = buf.clone();
        blur(&mut out, f32::NAN);
        assert_eq!(out, buf);
    }

    #[test]
    fn blur_smooths_checkerboard() {
        let mut buf = checkerboard(9);
        blur(&mut buf, 20.0);
        let px = buf.pixel(4, 4).unwrap();
        assert!((px[0] as i32 - 125).abs() <= 5, "{px:?}");
    }

    #[test]
    fn tiny_images_do_not_panic() {
        for (w, h) in [(1, 1), (2, 1), (1, 5), (2, 2)] {
            let mut buf = RasterBuffer::filled(w, h, [10, 20, 30, 255]);
            clarity(&mut buf, 100.0);
            sharpness(&mut buf, 100.0);
            blur(&mut buf, 50.0);
            assert_eq!(buf.data.len(), (w * h * 4) as usize);
        }
    }

    #[test]
    fn spatial_filters_preserve_alpha() {
        let mut buf = gradient(12, 12);
        let alpha = alpha_channel(&buf);
        clarity(&mut buf, 80.0);
        sharpness(&mut buf, 80.0);
        blur(&mut buf, 30.0);
        assert_eq!(alpha_channel(&buf), alpha);
    }
}
