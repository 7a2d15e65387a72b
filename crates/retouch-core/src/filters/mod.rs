//! Pixel filter library.
//!
//! Every filter mutates a [`RasterBuffer`](crate::raster::RasterBuffer) in
//! place, is parameterized by a single knob, and is a byte-for-byte no-op at
//! its neutral value. Alpha is never touched: opacity is a compositing
//! concern. Spatial filters read from a snapshot of the buffer taken at the
//! start of their own pass so results never compound within a pass.

pub mod basic;
pub mod color;
pub mod noise;
pub mod spatial;
pub mod tone;
pub mod vignette;

pub use basic::{basic_adjust, named_filter};
pub use color::{hue, temperature, vibrance};
pub use noise::{NoiseSource, SeededNoise, noise};
pub use spatial::{blur, clarity, sharpness};
pub use tone::{exposure, highlights, shadows};
pub use vignette::vignette;

#[cfg(test)]
pub(crate) mod test_util {
    use crate::raster::RasterBuffer;

    /// Deterministic gradient image with varied channels and alpha.
    pub fn gradient(width: u32, height: u32) -> RasterBuffer {
        let mut buf = RasterBuffer::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let r = (x * 255 / width.max(1)) as u8;
                let g = (y * 255 / height.max(1)) as u8;
                let b = ((x + y) * 7 % 256) as u8;
                let a = 200 + ((x * 3 + y) % 56) as u8;
                buf.set_pixel(x, y, [r, g, b, a]);
            }
        }
        buf
    }

    pub fn alpha_channel(buf: &RasterBuffer) -> Vec<u8> {
        buf.data.chunks_exact(4).map(|p| p[3]).collect()
    }
}
