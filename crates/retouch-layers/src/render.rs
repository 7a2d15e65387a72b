use tracing::{debug, warn};

use crate::canvas::Canvas;
use crate::layer::Layer;
use crate::resources::Resources;
use crate::sticker::draw_sticker_layer;
use crate::text::draw_text_layer;

/// Draw `layers` bottom to top. A sticker whose image is not in
/// `resources` is skipped; the remaining layers still draw.
pub fn render_layers<'a>(
    canvas: &mut impl Canvas,
    layers: impl IntoIterator<Item = &'a Layer>,
    resources: &Resources,
) {
    for layer in layers {
        debug!(layer = %layer.id(), kind = layer.kind(), "drawing layer");
        match layer {
            Layer::Text(text) => draw_text_layer(canvas, text),
            Layer::Sticker(sticker) => match resources.sticker(&sticker.src) {
                Some(image) => draw_sticker_layer(canvas, sticker, image),
                None => warn!(layer = %sticker.id, "sticker image unavailable, layer skipped"),
            },
        }
    }
}
