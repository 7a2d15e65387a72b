use std::fmt;

use serde::{Deserialize, Serialize};

use crate::canvas::MAX_SHADOW_BLUR;
use crate::color::Rgba;

/// Stable identifier of a layer within its stack (`text-3`, `sticker-7`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    #[serde(alias = "justify")]
    Left,
    Center,
    Right,
}

/// Axis-aligned box in canvas pixels, before rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextLayer {
    pub id: LayerId,
    /// May contain `\n` line breaks.
    pub content: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Degrees, clockwise, around the box center.
    pub rotation: f32,
    pub opacity: f32,
    pub font_size: f32,
    pub font_family: String,
    pub color: Rgba,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub align: TextAlign,
    pub stroke_color: Rgba,
    pub stroke_width: f32,
    pub shadow_x: f32,
    pub shadow_y: f32,
    pub shadow_blur: f32,
    pub shadow_color: Rgba,
}

impl Default for TextLayer {
    fn default() -> Self {
        Self {
            id: LayerId::default_text(),
            content: "New text".to_string(),
            x: 100.0,
            y: 100.0,
            width: 200.0,
            height: 50.0,
            rotation: 0.0,
            opacity: 1.0,
            font_size: 24.0,
            font_family: "Arial".to_string(),
            color: Rgba::BLACK,
            bold: false,
            italic: false,
            underline: false,
            align: TextAlign::Left,
            stroke_color: Rgba::BLACK,
            stroke_width: 0.0,
            shadow_x: 0.0,
            shadow_y: 0.0,
            shadow_blur: 0.0,
            shadow_color: Rgba::BLACK,
        }
    }
}

impl TextLayer {
    pub fn has_shadow(&self) -> bool {
        self.shadow_blur > 0.0 || self.shadow_x != 0.0 || self.shadow_y != 0.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StickerLayer {
    pub id: LayerId,
    /// `data:` URL, `file://` URL or filesystem path.
    pub src: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    pub opacity: f32,
}

impl Default for StickerLayer {
    fn default() -> Self {
        Self {
            id: LayerId::default_sticker(),
            src: String::new(),
            x: 150.0,
            y: 150.0,
            width: 100.0,
            height: 100.0,
            rotation: 0.0,
            opacity: 1.0,
        }
    }
}

impl LayerId {
    fn default_text() -> Self {
        Self("text-0".to_string())
    }

    fn default_sticker() -> Self {
        Self("sticker-0".to_string())
    }
}

/// Overlay composited above the adjusted image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Layer {
    Text(TextLayer),
    Sticker(StickerLayer),
}

impl Layer {
    pub fn id(&self) -> &LayerId {
        match self {
            Layer::Text(t) => &t.id,
            Layer::Sticker(s) => &s.id,
        }
    }

    pub(crate) fn set_id(&mut self, id: LayerId) {
        match self {
            Layer::Text(t) => t.id = id,
            Layer::Sticker(s) => s.id = id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Layer::Text(_) => "text",
            Layer::Sticker(_) => "sticker",
        }
    }

    pub fn bounds(&self) -> Bounds {
        let (x, y, width, height) = match self {
            Layer::Text(t) => (t.x, t.y, t.width, t.height),
            Layer::Sticker(s) => (s.x, s.y, s.width, s.height),
        };
        Bounds {
            x,
            y,
            width,
            height,
        }
    }

    pub fn rotation(&self) -> f32 {
        match self {
            Layer::Text(t) => t.rotation,
            Layer::Sticker(s) => s.rotation,
        }
    }

    pub fn opacity(&self) -> f32 {
        match self {
            Layer::Text(t) => t.opacity,
            Layer::Sticker(s) => s.opacity,
        }
    }

    pub(crate) fn offset(&mut self, dx: f32, dy: f32) {
        match self {
            Layer::Text(t) => {
                t.x += dx;
                t.y += dy;
            }
            Layer::Sticker(s) => {
                s.x += dx;
                s.y += dy;
            }
        }
    }

    /// Name shown in a layers panel.
    pub fn label(&self) -> String {
        const MAX_CHARS: usize = 20;
        match self {
            Layer::Sticker(_) => "Sticker".to_string(),
            Layer::Text(t) => {
                let content = t.content.trim();
                if content.is_empty() {
                    return "Text".to_string();
                }
                let mut label: String = content.chars().take(MAX_CHARS).collect();
                if content.chars().count() > MAX_CHARS {
                    label.push_str("...");
                }
                label
            }
        }
    }
}

/// Kind of layer to create; stickers need their image reference up front.
#[derive(Clone, Debug, PartialEq)]
pub enum NewLayer {
    Text,
    Sticker { src: String },
}

/// Partial update. Fields that do not exist on the target variant are
/// ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub rotation: Option<f32>,
    pub opacity: Option<f32>,
    pub content: Option<String>,
    pub font_size: Option<f32>,
    pub font_family: Option<String>,
    pub color: Option<Rgba>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub align: Option<TextAlign>,
    pub stroke_color: Option<Rgba>,
    pub stroke_width: Option<f32>,
    pub shadow_x: Option<f32>,
    pub shadow_y: Option<f32>,
    pub shadow_blur: Option<f32>,
    pub shadow_color: Option<Rgba>,
    pub src: Option<String>,
}

fn non_negative(v: f32) -> f32 {
    if v.is_finite() { v.max(0.0) } else { 0.0 }
}

fn unit(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 1.0 }
}

impl LayerPatch {
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn apply_to(&self, layer: &mut Layer) {
        match layer {
            Layer::Text(t) => self.apply_to_text(t),
            Layer::Sticker(s) => self.apply_to_sticker(s),
        }
    }

    fn apply_to_text(&self, t: &mut TextLayer) {
        set(&mut t.x, self.x);
        set(&mut t.y, self.y);
        set(&mut t.width, self.width.map(non_negative));
        set(&mut t.height, self.height.map(non_negative));
        set(&mut t.rotation, self.rotation);
        set(&mut t.opacity, self.opacity.map(unit));
        set(&mut t.content, self.content.clone());
        set(&mut t.font_size, self.font_size.map(non_negative));
        set(&mut t.font_family, self.font_family.clone());
        set(&mut t.color, self.color);
        set(&mut t.bold, self.bold);
        set(&mut t.italic, self.italic);
        set(&mut t.underline, self.underline);
        set(&mut t.align, self.align);
        set(&mut t.stroke_color, self.stroke_color);
        set(&mut t.stroke_width, self.stroke_width.map(non_negative));
        set(&mut t.shadow_x, self.shadow_x);
        set(&mut t.shadow_y, self.shadow_y);
        set(&mut t.shadow_blur, self.shadow_blur.map(|b| non_negative(b).min(MAX_SHADOW_BLUR)));
        set(&mut t.shadow_color, self.shadow_color);
    }

    fn apply_to_sticker(&self, s: &mut StickerLayer) {
        set(&mut s.x, self.x);
        set(&mut s.y, self.y);
        set(&mut s.width, self.width.map(non_negative));
        set(&mut s.height, self.height.map(non_negative));
        set(&mut s.rotation, self.rotation);
        set(&mut s.opacity, self.opacity.map(unit));
        set(&mut s.src, self.src.clone());
    }
}

fn set<T>(field: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *field = v;
    }
}
