pub mod canvas;
pub mod color;
pub mod fonts;
pub mod layer;
pub mod raster_canvas;
pub mod render;
pub mod resources;
pub mod stack;
pub mod sticker;
pub mod text;

pub use canvas::{Canvas, FontSpec, MAX_SHADOW_BLUR, Shadow};
pub use color::Rgba;
pub use fonts::FontBook;
pub use layer::{Bounds, Layer, LayerId, LayerPatch, NewLayer, StickerLayer, TextAlign, TextLayer};
pub use raster_canvas::{RasterCanvas, SurfaceSizeError};
pub use render::render_layers;
pub use resources::{ResourceError, ResourceLoader, Resources};
pub use stack::LayerStack;
