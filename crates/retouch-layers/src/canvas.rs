use retouch_core::RasterBuffer;

use crate::color::Rgba;
use crate::layer::TextAlign;

/// Font request in CSS terms: `italic bold 24px "Arial"`.
#[derive(Clone, Debug, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
}

impl FontSpec {
    /// CSS shorthand, for logs.
    pub fn css(&self) -> String {
        let mut css = String::new();
        if self.italic {
            css.push_str("italic ");
        }
        if self.bold {
            css.push_str("bold ");
        }
        css.push_str(&format!("{}px \"{}\", sans-serif", self.size, self.family));
        css
    }
}

/// Largest shadow blur, in pixels, a surface will spread coverage over.
pub const MAX_SHADOW_BLUR: f32 = 100.0;

/// Drop shadow applied to every drawing operation while set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shadow {
    pub offset_x: f32,
    pub offset_y: f32,
    pub blur: f32,
    pub color: Rgba,
}

impl Shadow {
    /// A shadow draws only with a visible color and some offset or blur.
    pub fn is_visible(&self) -> bool {
        self.color.a > 0 && (self.blur > 0.0 || self.offset_x != 0.0 || self.offset_y != 0.0)
    }
}

/// 2D drawing surface with immediate-mode state, shaped after the HTML
/// canvas context.
///
/// Transforms compose like the canvas API: each call multiplies onto the
/// current matrix, so the last call applies first to drawn coordinates.
/// Text is always laid out with a `top` baseline. Shadow offsets are in
/// surface pixels and ignore the current transform.
pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    fn save(&mut self);
    fn restore(&mut self);

    fn translate(&mut self, dx: f32, dy: f32);
    /// Clockwise, in degrees.
    fn rotate(&mut self, degrees: f32);
    fn scale(&mut self, sx: f32, sy: f32);

    fn set_global_alpha(&mut self, alpha: f32);
    fn set_shadow(&mut self, shadow: Option<Shadow>);

    /// Select the font for later text calls. Returns false when no face
    /// could be resolved; text calls are then skipped.
    fn set_font(&mut self, font: &FontSpec) -> bool;
    fn set_text_align(&mut self, align: TextAlign);

    /// Advance width of `text` in the current font.
    fn measure_text(&self, text: &str) -> f32;
    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: Rgba);
    fn stroke_text(&mut self, text: &str, x: f32, y: f32, color: Rgba, line_width: f32);
    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgba, line_width: f32);

    /// Draw `image` scaled into the `width` x `height` box at `(x, y)`.
    fn draw_image(&mut self, image: &RasterBuffer, x: f32, y: f32, width: f32, height: f32);

    /// Straight-alpha copy of the surface.
    fn get_pixels(&self) -> RasterBuffer;
    /// Replace surface pixels from the top-left corner, ignoring transform,
    /// alpha and shadow.
    fn put_pixels(&mut self, image: &RasterBuffer);
}
