use tracing::warn;

use crate::canvas::{Canvas, FontSpec, MAX_SHADOW_BLUR, Shadow};
use crate::layer::{TextAlign, TextLayer};

pub const PADDING_X: f32 = 8.0;
pub const PADDING_Y: f32 = 4.0;
pub const LINE_HEIGHT: f32 = 1.2;
/// Gap between the bottom of the em box and the underline.
const UNDERLINE_GAP: f32 = 2.0;

/// Anchor x for a line inside the padded content box.
pub fn anchor_x(layer: &TextLayer) -> f32 {
    match layer.align {
        TextAlign::Left => layer.x + PADDING_X,
        TextAlign::Center => layer.x + layer.width / 2.0,
        TextAlign::Right => layer.x + layer.width - PADDING_X,
    }
}

/// Draw a text layer: each `\n`-separated line is stroked (when a stroke
/// width is set), filled, and optionally underlined, all rotated about the
/// box center.
pub fn draw_text_layer(canvas: &mut impl Canvas, layer: &TextLayer) {
    canvas.save();
    canvas.set_global_alpha(layer.opacity);

    let (cx, cy) = (layer.x + layer.width / 2.0, layer.y + layer.height / 2.0);
    canvas.translate(cx, cy);
    canvas.rotate(layer.rotation);
    canvas.translate(-cx, -cy);

    let font = FontSpec {
        family: layer.font_family.clone(),
        size: layer.font_size,
        bold: layer.bold,
        italic: layer.italic,
    };
    if !canvas.set_font(&font) {
        warn!(layer = %layer.id, font = %font.css(), "font unavailable, text skipped");
        canvas.restore();
        return;
    }
    canvas.set_text_align(layer.align);
    canvas.set_shadow(layer.has_shadow().then_some(Shadow {
        offset_x: layer.shadow_x,
        offset_y: layer.shadow_y,
        blur: layer.shadow_blur.min(MAX_SHADOW_BLUR),
        color: layer.shadow_color,
    }));

    let x = anchor_x(layer);
    let line_height = layer.font_size * LINE_HEIGHT;
    for (i, line) in layer.content.split('\n').enumerate() {
        let y = layer.y + PADDING_Y + i as f32 * line_height;

        if layer.stroke_width > 0.0 {
            canvas.stroke_text(line, x, y, layer.stroke_color, layer.stroke_width * 2.0);
        }
        canvas.fill_text(line, x, y, layer.color);

        if layer.underline {
            let width = canvas.measure_text(line);
            let start = match layer.align {
                TextAlign::Left => x,
                TextAlign::Center => x - width / 2.0,
                TextAlign::Right => x - width,
            };
            let underline_y = y + layer.font_size + UNDERLINE_GAP;
            let thickness = (layer.font_size / 16.0).max(1.0);
            canvas.stroke_line((start, underline_y), (start + width, underline_y), layer.color, thickness);
        }
    }

    canvas.restore();
}

#[cfg(test)]
pub(crate) mod recording {
    use retouch_core::RasterBuffer;

    use crate::canvas::{Canvas, FontSpec, Shadow};
    use crate::color::Rgba;
    use crate::layer::TextAlign;

    /// Canvas that logs calls instead of drawing. Every glyph is half the
    /// font size wide.
    #[derive(Default)]
    pub struct Recorder {
        pub calls: Vec<String>,
        pub depth: i32,
        pub font_ok: bool,
        size: f32,
    }

    impl Recorder {
        pub fn new() -> Self {
            Self {
                font_ok: true,
                ..Default::default()
            }
        }

        pub fn find(&self, prefix: &str) -> Vec<&str> {
            self.calls
                .iter()
                .filter(|c| c.starts_with(prefix))
                .map(String::as_str)
                .collect()
        }
    }

    impl Canvas for Recorder {
        fn width(&self) -> u32 {
            100
        }
        fn height(&self) -> u32 {
            100
        }
        fn save(&mut self) {
            self.depth += 1;
            self.calls.push("save".into());
        }
        fn restore(&mut self) {
            self.depth -= 1;
            self.calls.push("restore".into());
        }
        fn translate(&mut self, dx: f32, dy: f32) {
            self.calls.push(format!("translate {dx} {dy}"));
        }
        fn rotate(&mut self, degrees: f32) {
            self.calls.push(format!("rotate {degrees}"));
        }
        fn scale(&mut self, sx: f32, sy: f32) {
            self.calls.push(format!("scale {sx} {sy}"));
        }
        fn set_global_alpha(&mut self, alpha: f32) {
            self.calls.push(format!("alpha {alpha}"));
        }
        fn set_shadow(&mut self, shadow: Option<Shadow>) {
            self.calls.push(format!("shadow {:?}", shadow.map(|s| (s.offset_x, s.offset_y, s.blur))));
        }
        fn set_font(&mut self, font: &FontSpec) -> bool {
            self.size = font.size;
            self.calls.push(format!("font {}", font.css()));
            self.font_ok
        }
        fn set_text_align(&mut self, align: TextAlign) {
            self.calls.push(format!("align {align:?}"));
        }
        fn measure_text(&self, text: &str) -> f32 {
            text.chars().count() as f32 * self.size / 2.0
        }
        fn fill_text(&mut self, text: &str, x: f32, y: f32, color: Rgba) {
            self.calls.push(format!("fill {text:?} {x} {y} {color}"));
        }
        fn stroke_text(&mut self, text: &str, x: f32, y: f32, color: Rgba, line_width: f32) {
            self.calls.push(format!("stroke {text:?} {x} {y} {color} {line_width}"));
        }
        fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), _color: Rgba, line_width: f32) {
            self.calls.push(format!("line {} {} {} {} {line_width}", from.0, from.1, to.0, to.1));
        }
        fn draw_image(&mut self, image: &RasterBuffer, x: f32, y: f32, width: f32, height: f32) {
            self.calls.push(format!("image {}x{} {x} {y} {width} {height}", image.width, image.height));
        }
        fn get_pixels(&self) -> RasterBuffer {
            RasterBuffer::new(100, 100)
        }
        fn put_pixels(&mut self, _image: &RasterBuffer) {}
    }
}
