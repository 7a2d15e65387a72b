use serde::{Deserialize, Serialize};

use crate::adjustments::{Adjustments, normalize_rotation};
use crate::raster::{RasterBuffer, to_channel};

/// Rotation and flips applied after every pixel filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Orientation {
    /// Degrees, clockwise.
    pub rotation: f32,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl Orientation {
    pub fn from_adjustments(adj: &Adjustments) -> Self {
        Self {
            rotation: adj.rotation,
            flip_horizontal: adj.flip_horizontal,
            flip_vertical: adj.flip_vertical,
        }
    }

    pub fn is_identity(&self) -> bool {
        normalize_rotation(self.rotation) == 0.0 && !self.flip_horizontal && !self.flip_vertical
    }

    /// Canvas size after the transform.
    ///
    /// Width and height swap for odd quarter turns. Any other angle keeps the
    /// source size; the rotated corners fall outside and are clipped.
    pub fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        match quarter_turns(normalize_rotation(self.rotation)) {
            Some(turns) if turns % 2 == 1 => (height, width),
            _ => (width, height),
        }
    }
}

/// Number of clockwise quarter turns in `[0, 4)` when `degrees` is an exact
/// multiple of 90.
fn quarter_turns(degrees: f32) -> Option<u32> {
    let turns = degrees / 90.0;
    if turns.fract() != 0.0 {
        return None;
    }
    Some((turns as i64).rem_euclid(4) as u32)
}

/// `(sin, cos)` with exact values at right angles so quarter turns are
/// pure pixel permutations.
fn sin_cos(degrees: f32) -> (f64, f64) {
    match quarter_turns(degrees) {
        Some(0) => (0.0, 1.0),
        Some(1) => (1.0, 0.0),
        Some(2) => (0.0, -1.0),
        Some(3) => (-1.0, 0.0),
        _ => (degrees as f64).to_radians().sin_cos(),
    }
}

/// Rotate and flip a raster.
///
/// The forward mapping is: move the source center to the origin, rotate,
/// scale by the flip signs, then move to the output center. Every output
/// pixel is inverse-mapped through that chain and sampled bilinearly, so
/// flipping before or after rotating gives the composed result a 2D canvas
/// would draw with `translate; scale; rotate; drawImage(-w/2, -h/2)`.
pub fn transform(src: &RasterBuffer, orientation: Orientation) -> RasterBuffer {
    if orientation.is_identity() || src.is_empty() {
        return src.clone();
    }

    let rotation = normalize_rotation(orientation.rotation);
    let (out_w, out_h) = orientation.output_size(src.width, src.height);
    let (sin, cos) = sin_cos(rotation);
    let fx = if orientation.flip_horizontal { -1.0 } else { 1.0 };
    let fy = if orientation.flip_vertical { -1.0 } else { 1.0 };

    let src_cx = src.width as f64 / 2.0;
    let src_cy = src.height as f64 / 2.0;
    let out_cx = out_w as f64 / 2.0;
    let out_cy = out_h as f64 / 2.0;

    let mut out = RasterBuffer::new(out_w, out_h);
    for y in 0..out_h {
        for x in 0..out_w {
            // Undo offset, then flip, then rotation
            let vx = (x as f64 + 0.5 - out_cx) * fx;
            let vy = (y as f64 + 0.5 - out_cy) * fy;
            let sx = vx * cos + vy * sin + src_cx - 0.5;
            let sy = -vx * sin + vy * cos + src_cy - 0.5;
            if let Some(rgba) = sample_bilinear(src, sx, sy) {
                out.set_pixel(x, y, rgba);
            }
        }
    }
    out
}

/// Bilinear sample at pixel-center coordinates. Taps outside the image are
/// transparent; color is interpolated premultiplied.
fn sample_bilinear(src: &RasterBuffer, sx: f64, sy: f64) -> Option<[u8; 4]> {
    let x0 = sx.floor();
    let y0 = sy.floor();
    let tx = sx - x0;
    let ty = sy - y0;

    let mut acc = [0.0f64; 4];
    let taps = [
        (x0, y0, (1.0 - tx) * (1.0 - ty)),
        (x0 + 1.0, y0, tx * (1.0 - ty)),
        (x0, y0 + 1.0, (1.0 - tx) * ty),
        (x0 + 1.0, y0 + 1.0, tx * ty),
    ];

    let mut hit = false;
    for (px, py, weight) in taps {
        if weight == 0.0 || px < 0.0 || py < 0.0 {
            continue;
        }
        let Some(p) = src.pixel(px as u32, py as u32) else {
            continue;
        };
        hit = true;
        let alpha = p[3] as f64 * weight;
        acc[0] += p[0] as f64 * alpha;
        acc[1] += p[1] as f64 * alpha;
        acc[2] += p[2] as f64 * alpha;
        acc[3] += alpha;
    }

    if !hit || acc[3] <= 0.0 {
        return None;
    }
    Some([
        to_channel(acc[0] / acc[3]),
        to_channel(acc[1] / acc[3]),
        to_channel(acc[2] / acc[3]),
        to_channel(acc[3]),
    ])
}

/// Crop rectangle in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Aspect ratio locks offered by the crop tool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "free")]
    Free,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    FourThree,
    #[serde(rename = "16:9")]
    SixteenNine,
    #[serde(rename = "9:16")]
    NineSixteen,
}

impl AspectRatio {
    /// Width over height, `None` when unconstrained.
    pub fn ratio(&self) -> Option<f64> {
        match self {
            Self::Free => None,
            Self::Square => Some(1.0),
            Self::FourThree => Some(4.0 / 3.0),
            Self::SixteenNine => Some(16.0 / 9.0),
            Self::NineSixteen => Some(9.0 / 16.0),
        }
    }
}

impl CropRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Starting rectangle for a fresh crop: 80% of the image, centered.
    pub fn initial(image_width: u32, image_height: u32) -> Self {
        let w = image_width as f64;
        let h = image_height as f64;
        Self::new(w * 0.1, h * 0.1, w * 0.8, h * 0.8)
    }

    /// Reshape around the current center to match `aspect`, shrinking to 80%
    /// of the limiting image side when the locked shape does not fit.
    pub fn with_aspect(&self, aspect: AspectRatio, image_width: u32, image_height: u32) -> Self {
        let Some(ratio) = aspect.ratio() else {
            return *self;
        };
        let image_w = image_width as f64;
        let image_h = image_height as f64;
        let cx = self.x + self.width / 2.0;
        let cy = self.y + self.height / 2.0;

        let mut width = self.width;
        let mut height = self.width / ratio;
        if height > image_h {
            height = image_h * 0.8;
            width = height * ratio;
        }
        if width > image_w {
            width = image_w * 0.8;
            height = width / ratio;
        }

        let x = (cx - width / 2.0).min(image_w - width).max(0.0);
        let y = (cy - height / 2.0).min(image_h - height).max(0.0);
        Self::new(x, y, width, height)
    }

    /// Integer pixel bounds `(x, y, w, h)` inside a `width`x`height` image.
    ///
    /// Out-of-bounds parts are cut away and the result is always at least
    /// 1x1 so a degenerate request still yields a usable image.
    pub fn clamp_to(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
        let max_x = width.saturating_sub(1) as f64;
        let max_y = height.saturating_sub(1) as f64;

        let (x, y) = (finite(self.x), finite(self.y));

        let x0 = x.round().clamp(0.0, max_x);
        let y0 = y.round().clamp(0.0, max_y);
        let x1 = (x + finite(self.width)).round().clamp(0.0, width as f64);
        let y1 = (y + finite(self.height)).round().clamp(0.0, height as f64);

        let w = (x1 - x0).max(1.0) as u32;
        let h = (y1 - y0).max(1.0) as u32;
        (x0 as u32, y0 as u32, w, h)
    }
}

/// Extract the clamped crop region as a new raster.
pub fn crop(src: &RasterBuffer, rect: CropRect) -> RasterBuffer {
    if src.is_empty() {
        return src.clone();
    }

    let (x, y, w, h) = rect.clamp_to(src.width, src.height);
    let row_len = w as usize * 4;
    let mut data = Vec::with_capacity(RasterBuffer::byte_len(w, h));
    for row in y..y + h {
        let start = src.index(x, row);
        data.extend_from_slice(&src.data[start..start + row_len]);
    }
    RasterBuffer {
        width: w,
        height: h,
        data,
    }
}
