use ab_glyph::{Font, OutlineCurve, Point};
use retouch_core::RasterBuffer;
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap,
    PixmapPaint, PremultipliedColorU8, Rect, Stroke, Transform,
};
use tracing::{trace, warn};

use crate::canvas::{Canvas, FontSpec, MAX_SHADOW_BLUR, Shadow};
use crate::color::Rgba;
use crate::fonts::{FontBook, ResolvedFont};
use crate::layer::TextAlign;

/// Horizontal shear used for synthetic italics.
const OBLIQUE_SKEW: f32 = 0.2;
/// Extra stroke width for synthetic bold, as a fraction of the font size.
const EMBOLDEN: f32 = 1.0 / 24.0;
const DEFAULT_UNITS_PER_EM: f32 = 1000.0;

#[derive(Debug, thiserror::Error)]
#[error("cannot allocate a {width}x{height} drawing surface")]
pub struct SurfaceSizeError {
    pub width: u32,
    pub height: u32,
}

/// Pixel area of the surface, possibly reaching past its edges.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Region {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

#[derive(Clone, Debug)]
struct ActiveFont {
    resolved: ResolvedFont,
    size: f32,
}

#[derive(Clone, Debug)]
struct DrawState {
    transform: Transform,
    alpha: f32,
    shadow: Option<Shadow>,
    font: Option<ActiveFont>,
    requested_font: Option<String>,
    align: TextAlign,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Transform::identity(),
            alpha: 1.0,
            shadow: None,
            font: None,
            requested_font: None,
            align: TextAlign::Left,
        }
    }
}

/// Software [`Canvas`] backed by a `tiny-skia` pixmap.
pub struct RasterCanvas {
    pixmap: Pixmap,
    state: DrawState,
    saved: Vec<DrawState>,
    fonts: FontBook,
}

impl RasterCanvas {
    /// Transparent surface of the given size.
    pub fn new(width: u32, height: u32, fonts: FontBook) -> Result<Self, SurfaceSizeError> {
        let pixmap = Pixmap::new(width, height).ok_or(SurfaceSizeError { width, height })?;
        Ok(Self {
            pixmap,
            state: DrawState::default(),
            saved: Vec::new(),
            fonts,
        })
    }

    /// Surface initialized with `image`.
    pub fn from_raster(image: &RasterBuffer, fonts: FontBook) -> Result<Self, SurfaceSizeError> {
        let mut canvas = Self::new(image.width, image.height, fonts)?;
        canvas.put_pixels(image);
        Ok(canvas)
    }

    pub fn into_raster(self) -> RasterBuffer {
        self.get_pixels()
    }

    fn paint(&self, color: Rgba) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color(color.with_alpha_scaled(self.state.alpha).to_skia());
        paint.anti_alias = true;
        paint
    }

    /// Run `op` against the surface with the current transform. When a
    /// shadow is set, `op` first draws into a scratch surface covering only
    /// `extent` plus the blur reach, and that coverage becomes the shadow.
    fn draw_with_shadow(
        &mut self,
        extent: impl FnOnce(Transform) -> Option<Rect>,
        op: impl Fn(&mut Pixmap, Transform),
    ) {
        let transform = self.state.transform;
        if let Some(shadow) = self.state.shadow.filter(Shadow::is_visible)
            && let Some(region) = extent(transform).and_then(|e| self.shadow_region(e, &shadow))
            && let Some(mut scratch) = Pixmap::new(region.width, region.height)
        {
            op(&mut scratch, transform.post_translate(-(region.x as f32), -(region.y as f32)));
            self.composite_shadow(&scratch, region, &shadow);
        }
        op(&mut self.pixmap, transform);
    }

    /// Scratch area whose coverage can still reach the surface: the op's
    /// device extent grown by the blur reach, clipped to the surface shifted
    /// back by the shadow offset.
    fn shadow_region(&self, extent: Rect, shadow: &Shadow) -> Option<Region> {
        // One extra pixel for anti-aliased edges
        let reach = blur_reach(shadow_sigma(shadow)) as f32 + 1.0;
        let (width, height) = (self.pixmap.width() as f32, self.pixmap.height() as f32);
        let left = (extent.left() - reach).max(-shadow.offset_x - reach).floor();
        let top = (extent.top() - reach).max(-shadow.offset_y - reach).floor();
        let right = (extent.right() + reach).min(width - shadow.offset_x + reach).ceil();
        let bottom = (extent.bottom() + reach).min(height - shadow.offset_y + reach).ceil();
        if !(right > left && bottom > top) {
            return None;
        }
        Some(Region {
            x: left as i32,
            y: top as i32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }

    fn composite_shadow(&mut self, coverage: &Pixmap, region: Region, shadow: &Shadow) {
        let (w, h) = (coverage.width() as usize, coverage.height() as usize);
        let mut alpha: Vec<f32> = coverage.pixels().iter().map(|p| p.alpha() as f32).collect();
        gaussian_blur(&mut alpha, w, h, shadow_sigma(shadow));

        let Some(mut tinted) = Pixmap::new(w as u32, h as u32) else {
            return;
        };
        let c = shadow.color;
        for (dst, a) in tinted.pixels_mut().iter_mut().zip(&alpha) {
            let a = (c.a as f32 * a / 255.0).round().clamp(0.0, 255.0) as u8;
            if a == 0 {
                continue;
            }
            let premul = |v: u8| ((v as u32 * a as u32 + 127) / 255) as u8;
            if let Some(px) = PremultipliedColorU8::from_rgba(premul(c.r), premul(c.g), premul(c.b), a)
            {
                *dst = px;
            }
        }

        self.pixmap.draw_pixmap(
            0,
            0,
            tinted.as_ref(),
            &PixmapPaint {
                quality: FilterQuality::Bilinear,
                ..Default::default()
            },
            Transform::from_translate(
                region.x as f32 + shadow.offset_x,
                region.y as f32 + shadow.offset_y,
            ),
            None,
        );
    }

    fn active_font(&self, op: &str) -> Option<&ActiveFont> {
        if self.state.font.is_none() {
            warn!(
                op,
                font = self.state.requested_font.as_deref().unwrap_or("<unset>"),
                "no font available, skipping text"
            );
        }
        self.state.font.as_ref()
    }

    /// Text path in user space, anchored per the current alignment with a
    /// `top` baseline at `y`.
    fn text_path(&self, font: &ActiveFont, text: &str, x: f32, y: f32) -> Option<Path> {
        let face = &font.resolved.face;
        let scale = font.size / face.units_per_em().unwrap_or(DEFAULT_UNITS_PER_EM);
        let width = advance_width(face, text) * scale;
        let start = match self.state.align {
            TextAlign::Left => x,
            TextAlign::Center => x - width / 2.0,
            TextAlign::Right => x - width,
        };

        // Top of the em box, with ascent and descent normalized to the size.
        let ascent = face.ascent_unscaled();
        let extent = ascent - face.descent_unscaled();
        let baseline = if extent > 0.0 {
            y + font.size * ascent / extent
        } else {
            y + ascent * scale
        };
        let skew = if font.resolved.synthetic_italic {
            OBLIQUE_SKEW
        } else {
            0.0
        };

        let mut pb = PathBuilder::new();
        let mut pen = start;
        let mut previous = None;
        for c in text.chars() {
            let id = face.glyph_id(c);
            if let Some(prev) = previous {
                pen += face.kern_unscaled(prev, id) * scale;
            }
            if let Some(outline) = face.outline(id) {
                let map = |p: Point| {
                    let py = baseline - p.y * scale;
                    (pen + p.x * scale + (baseline - py) * skew, py)
                };
                append_outline(&mut pb, &outline.curves, map);
            }
            pen += face.h_advance_unscaled(id) * scale;
            previous = Some(id);
        }
        pb.finish()
    }
}

/// Gaussian standard deviation for a shadow blur, capped so the blur window
/// stays bounded whatever the layer asks for.
fn shadow_sigma(shadow: &Shadow) -> f32 {
    shadow.blur.clamp(0.0, MAX_SHADOW_BLUR) / 2.0
}

/// Pixels a blur of `sigma` spreads coverage by; zero when it does not blur.
fn blur_reach(sigma: f32) -> usize {
    if sigma >= 0.5 { (sigma * 3.0).ceil() as usize } else { 0 }
}

/// Device-space bounds of `path` under `transform`, widened to the outline
/// of `stroke` when one is given.
fn device_bounds(path: &Path, stroke: Option<&Stroke>, transform: Transform) -> Option<Rect> {
    let outline = stroke.and_then(|s| path.stroke(s, 1.0));
    let shape = outline.unwrap_or_else(|| path.clone());
    Some(shape.transform(transform)?.bounds())
}

fn advance_width(face: &impl Font, text: &str) -> f32 {
    let mut width = 0.0;
    let mut previous = None;
    for c in text.chars() {
        let id = face.glyph_id(c);
        if let Some(prev) = previous {
            width += face.kern_unscaled(prev, id);
        }
        width += face.h_advance_unscaled(id);
        previous = Some(id);
    }
    width
}

/// Append glyph curves, opening a new contour whenever a curve does not
/// continue from the previous end point.
fn append_outline(pb: &mut PathBuilder, curves: &[OutlineCurve], map: impl Fn(Point) -> (f32, f32)) {
    let mut last: Option<Point> = None;
    for curve in curves {
        let start = match curve {
            OutlineCurve::Line(a, _) | OutlineCurve::Quad(a, _, _) | OutlineCurve::Cubic(a, _, _, _) => *a,
        };
        if last.is_none_or(|p| p.x != start.x || p.y != start.y) {
            if last.is_some() {
                pb.close();
            }
            let (x, y) = map(start);
            pb.move_to(x, y);
        }
        let end = match *curve {
            OutlineCurve::Line(_, b) => {
                let (x, y) = map(b);
                pb.line_to(x, y);
                b
            }
            OutlineCurve::Quad(_, c, b) => {
                let ((cx, cy), (x, y)) = (map(c), map(b));
                pb.quad_to(cx, cy, x, y);
                b
            }
            OutlineCurve::Cubic(_, c1, c2, b) => {
                let ((x1, y1), (x2, y2), (x, y)) = (map(c1), map(c2), map(b));
                pb.cubic_to(x1, y1, x2, y2, x, y);
                b
            }
        };
        last = Some(end);
    }
    if last.is_some() {
        pb.close();
    }
}

/// In-place separable Gaussian blur of a single channel. Samples beyond the
/// edges count as zero so coverage fades out at the borders.
fn gaussian_blur(values: &mut [f32], width: usize, height: usize, sigma: f32) {
    let radius = blur_reach(sigma) as isize;
    if radius == 0 || width == 0 || height == 0 {
        return;
    }
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= sum);

    let mut temp = vec![0.0; values.len()];
    for y in 0..height {
        let row = &values[y * width..(y + 1) * width];
        for x in 0..width {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = x as isize + k as isize - radius;
                if sx >= 0 && (sx as usize) < width {
                    acc += row[sx as usize] * weight;
                }
            }
            temp[y * width + x] = acc;
        }
    }
    for x in 0..width {
        for y in 0..height {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = y as isize + k as isize - radius;
                if sy >= 0 && (sy as usize) < height {
                    acc += temp[sy as usize * width + x] * weight;
                }
            }
            values[y * width + x] = acc;
        }
    }
}

impl Canvas for RasterCanvas {
    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
    }

    fn save(&mut self) {
        self.saved.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.state = state;
        }
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.state.transform = self.state.transform.pre_translate(dx, dy);
    }

    fn rotate(&mut self, degrees: f32) {
        self.state.transform = self.state.transform.pre_rotate(degrees);
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.state.transform = self.state.transform.pre_scale(sx, sy);
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        // Canvas ignores out-of-range values
        if (0.0..=1.0).contains(&alpha) {
            self.state.alpha = alpha;
        }
    }

    fn set_shadow(&mut self, shadow: Option<Shadow>) {
        self.state.shadow = shadow;
    }

    fn set_font(&mut self, font: &FontSpec) -> bool {
        self.state.requested_font = Some(font.css());
        self.state.font = self
            .fonts
            .resolve(&font.family, font.bold, font.italic)
            .map(|resolved| ActiveFont {
                resolved,
                size: font.size,
            });
        self.state.font.is_some()
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.state.align = align;
    }

    fn measure_text(&self, text: &str) -> f32 {
        let Some(font) = &self.state.font else {
            return 0.0;
        };
        let face = &font.resolved.face;
        advance_width(face, text) * font.size / face.units_per_em().unwrap_or(DEFAULT_UNITS_PER_EM)
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: Rgba) {
        let Some(font) = self.active_font("fill_text").cloned() else {
            return;
        };
        let Some(path) = self.text_path(&font, text, x, y) else {
            return;
        };
        trace!(text, x, y, "fill_text");
        let paint = self.paint(color);
        let embolden = font.resolved.synthetic_bold.then(|| Stroke {
            width: font.size * EMBOLDEN,
            line_join: LineJoin::Round,
            ..Default::default()
        });
        // The embolden outline already encloses the filled glyphs
        self.draw_with_shadow(
            |ts| device_bounds(&path, embolden.as_ref(), ts),
            |pixmap, ts| {
                pixmap.fill_path(&path, &paint, FillRule::Winding, ts, None);
                if let Some(stroke) = &embolden {
                    pixmap.stroke_path(&path, &paint, stroke, ts, None);
                }
            },
        );
    }

    fn stroke_text(&mut self, text: &str, x: f32, y: f32, color: Rgba, line_width: f32) {
        if line_width <= 0.0 {
            return;
        }
        let Some(font) = self.active_font("stroke_text").cloned() else {
            return;
        };
        let Some(path) = self.text_path(&font, text, x, y) else {
            return;
        };
        let paint = self.paint(color);
        let stroke = Stroke {
            width: line_width,
            miter_limit: 2.0,
            line_join: LineJoin::Round,
            ..Default::default()
        };
        self.draw_with_shadow(
            |ts| device_bounds(&path, Some(&stroke), ts),
            |pixmap, ts| pixmap.stroke_path(&path, &paint, &stroke, ts, None),
        );
    }

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgba, line_width: f32) {
        let mut pb = PathBuilder::new();
        pb.move_to(from.0, from.1);
        pb.line_to(to.0, to.1);
        let Some(path) = pb.finish() else {
            return;
        };
        let paint = self.paint(color);
        let stroke = Stroke {
            width: line_width,
            line_cap: LineCap::Butt,
            ..Default::default()
        };
        self.draw_with_shadow(
            |ts| device_bounds(&path, Some(&stroke), ts),
            |pixmap, ts| pixmap.stroke_path(&path, &paint, &stroke, ts, None),
        );
    }

    fn draw_image(&mut self, image: &RasterBuffer, x: f32, y: f32, width: f32, height: f32) {
        if image.is_empty() || width <= 0.0 || height <= 0.0 {
            return;
        }
        let Some(source) = to_pixmap(image) else {
            return;
        };
        let (sx, sy) = (width / image.width as f32, height / image.height as f32);
        let place = |ts: Transform| ts.pre_translate(x, y).pre_scale(sx, sy);
        let paint = PixmapPaint {
            opacity: self.state.alpha,
            quality: FilterQuality::Bilinear,
            ..Default::default()
        };
        self.draw_with_shadow(
            |ts| {
                let frame = Rect::from_xywh(0.0, 0.0, image.width as f32, image.height as f32)?;
                device_bounds(&PathBuilder::from_rect(frame), None, place(ts))
            },
            |pixmap, ts| pixmap.draw_pixmap(0, 0, source.as_ref(), &paint, place(ts), None),
        );
    }

    fn get_pixels(&self) -> RasterBuffer {
        let mut out = RasterBuffer::new(self.pixmap.width(), self.pixmap.height());
        for (dst, px) in out.data.chunks_exact_mut(4).zip(self.pixmap.pixels()) {
            let c = px.demultiply();
            dst.copy_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        out
    }

    fn put_pixels(&mut self, image: &RasterBuffer) {
        let width = self.pixmap.width() as usize;
        let rows = image.height.min(self.pixmap.height()) as usize;
        let cols = image.width.min(self.pixmap.width()) as usize;
        let pixels = self.pixmap.pixels_mut();
        for y in 0..rows {
            for x in 0..cols {
                let i = (y * image.width as usize + x) * 4;
                let [r, g, b, a] = [image.data[i], image.data[i + 1], image.data[i + 2], image.data[i + 3]];
                pixels[y * width + x] = ColorU8::from_rgba(r, g, b, a).premultiply();
            }
        }
    }
}

fn to_pixmap(image: &RasterBuffer) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width, image.height)?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.data.chunks_exact(4)) {
        *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
    }
    Some(pixmap)
}
