use std::io::Cursor;
use std::time::Instant;

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage, RgbaImage};
use retouch_core::RasterBuffer;
use retouch_layers::{Layer, RasterCanvas, Resources, render_layers};
use tracing::info;

use crate::config::{ExportFormat, ExportSettings};
use crate::error::ExportError;

/// Composite `layers` over the adjusted raster.
pub fn flatten(
    adjusted: &RasterBuffer,
    layers: &[Layer],
    resources: &Resources,
) -> Result<RasterBuffer, ExportError> {
    let empty = ExportError::EmptyCanvas {
        width: adjusted.width,
        height: adjusted.height,
    };
    if adjusted.is_empty() {
        return Err(empty);
    }
    let mut canvas = RasterCanvas::from_raster(adjusted, resources.fonts.clone()).map_err(|_| empty)?;
    render_layers(&mut canvas, layers, resources);
    Ok(canvas.into_raster())
}

/// Flatten and encode for upload.
pub fn export(
    adjusted: &RasterBuffer,
    layers: &[Layer],
    resources: &Resources,
    settings: &ExportSettings,
) -> Result<Vec<u8>, ExportError> {
    let t0 = Instant::now();
    let flat = flatten(adjusted, layers, resources)?;
    let bytes = encode(&flat, settings)?;
    info!(
        elapsed_ms = t0.elapsed().as_millis(),
        w = flat.width,
        h = flat.height,
        layers = layers.len(),
        format = settings.format.extension(),
        bytes = bytes.len(),
        "exported"
    );
    Ok(bytes)
}

/// Encode a raster. JPEG has no alpha, so pixels are composited over black
/// first.
pub fn encode(image: &RasterBuffer, settings: &ExportSettings) -> Result<Vec<u8>, ExportError> {
    if image.is_empty() {
        return Err(ExportError::EmptyCanvas {
            width: image.width,
            height: image.height,
        });
    }
    let mut out = Cursor::new(Vec::new());
    match settings.format {
        ExportFormat::Jpeg => {
            let rgb = over_black(image)?;
            JpegEncoder::new_with_quality(&mut out, settings.jpeg_quality())
                .encode_image(&rgb)
                .map_err(|err| ExportError::Encode { format: "jpeg", err })?;
        }
        ExportFormat::Png => {
            let rgba = RgbaImage::from_raw(image.width, image.height, image.data.clone())
                .ok_or_else(|| ExportError::UnsupportedFormat("malformed RGBA buffer".into()))?;
            rgba.write_to(&mut out, ImageFormat::Png)
                .map_err(|err| ExportError::Encode { format: "png", err })?;
        }
    }
    Ok(out.into_inner())
}

fn over_black(image: &RasterBuffer) -> Result<RgbImage, ExportError> {
    let data: Vec<u8> = image
        .data
        .chunks_exact(4)
        .flat_map(|p| {
            let a = p[3] as u32;
            [0, 1, 2].map(|c| ((p[c] as u32 * a + 127) / 255) as u8)
        })
        .collect();
    RgbImage::from_raw(image.width, image.height, data)
        .ok_or_else(|| ExportError::UnsupportedFormat("malformed RGBA buffer".into()))
}
