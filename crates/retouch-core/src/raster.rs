use anyhow::{Context, Result};
use image::RgbaImage;

/// 8-bit RGBA pixel grid.
///
/// Pixel data is stored as interleaved RGBARGBA... with straight (not
/// premultiplied) alpha. Filter passes mutate it in place; whichever
/// pipeline stage holds the buffer owns it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterBuffer {
    pub width: u32,
    pub height: u32,
    /// Flat pixel data: [R, G, B, A, R, G, B, A, ...].
    pub data: Vec<u8>,
}

impl RasterBuffer {
    /// Bytes needed for a `width`x`height` RGBA buffer, computed in `usize`
    /// so large dimensions cannot wrap.
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }

    /// Fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; Self::byte_len(width, height)],
        }
    }

    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(Self::byte_len(width, height))
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn from_data(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = Self::byte_len(width, height);
        anyhow::ensure!(
            data.len() == expected,
            "expected {expected} bytes for {width}x{height} RGBA, got {}",
            data.len()
        );
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Decode an encoded image (JPEG, PNG, GIF, WebP) into RGBA.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes).context("decode image from memory")?;
        Ok(Self::from_rgba_image(img.to_rgba8()))
    }

    pub fn from_rgba_image(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }

    pub fn into_rgba_image(self) -> Result<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data)
            .context("raster dimensions do not match pixel data")
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = self.index(x, y);
        Some([
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = self.index(x, y);
        self.data[idx..idx + 4].copy_from_slice(&rgba);
    }

    /// Byte offset of pixel (x, y).
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Row stride in bytes.
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    /// Dimensions that fit within `max_w` x `max_h` with the aspect ratio kept.
    pub fn fitted_size(&self, max_w: u32, max_h: u32) -> (u32, u32) {
        if self.width <= max_w && self.height <= max_h || self.is_empty() {
            return (self.width, self.height);
        }
        let scale = (max_w as f64 / self.width as f64).min(max_h as f64 / self.height as f64);
        let new_w = (self.width as f64 * scale).round().max(1.0) as u32;
        let new_h = (self.height as f64 * scale).round().max(1.0) as u32;
        (new_w, new_h)
    }

    /// Downsample so the buffer fits within `max_w` x `max_h`.
    /// Uses box averaging for clean downscaling. Returns a clone if already small enough.
    pub fn fit_within(&self, max_w: u32, max_h: u32) -> Self {
        let (new_w, new_h) = self.fitted_size(max_w, max_h);
        if (new_w, new_h) == (self.width, self.height) {
            return self.clone();
        }

        let scale_x = new_w as f64 / self.width as f64;
        let scale_y = new_h as f64 / self.height as f64;
        let mut data = Vec::with_capacity(Self::byte_len(new_w, new_h));

        for dst_y in 0..new_h {
            let src_y0 = (dst_y as f64 / scale_y) as u32;
            let src_y1 = (((dst_y + 1) as f64 / scale_y).ceil() as u32).min(self.height);
            for dst_x in 0..new_w {
                let src_x0 = (dst_x as f64 / scale_x) as u32;
                let src_x1 = (((dst_x + 1) as f64 / scale_x).ceil() as u32).min(self.width);

                let mut sum = [0u32; 4];
                let mut count = 0u32;
                for sy in src_y0..src_y1 {
                    for sx in src_x0..src_x1 {
                        let idx = self.index(sx, sy);
                        for (acc, &v) in sum.iter_mut().zip(&self.data[idx..idx + 4]) {
                            *acc += v as u32;
                        }
                        count += 1;
                    }
                }

                if count > 0 {
                    for acc in sum {
                        data.push(((acc + count / 2) / count) as u8);
                    }
                } else {
                    data.extend_from_slice(&[0, 0, 0, 0]);
                }
            }
        }

        Self {
            width: new_w,
            height: new_h,
            data,
        }
    }
}

/// Store a computed channel value the way a clamped 8-bit canvas buffer
/// does: clamp to [0, 255], then round half to even.
pub fn to_channel(v: f64) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.clamp(0.0, 255.0).round_ties_even() as u8
}
