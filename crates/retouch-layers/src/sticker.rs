use retouch_core::RasterBuffer;

use crate::canvas::Canvas;
use crate::layer::StickerLayer;

/// Draw `image` filling the sticker's box, rotated about its center.
pub fn draw_sticker_layer(canvas: &mut impl Canvas, layer: &StickerLayer, image: &RasterBuffer) {
    canvas.save();
    canvas.set_global_alpha(layer.opacity);
    canvas.translate(layer.x + layer.width / 2.0, layer.y + layer.height / 2.0);
    canvas.rotate(layer.rotation);
    canvas.draw_image(
        image,
        -layer.width / 2.0,
        -layer.height / 2.0,
        layer.width,
        layer.height,
    );
    canvas.restore();
}
