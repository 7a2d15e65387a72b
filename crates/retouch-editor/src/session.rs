use std::sync::Arc;
use std::time::Instant;

use retouch_catalog::{NewPhoto, Photo, PhotoId, PhotoStore};
use retouch_core::adjustments::{clamp_knob, normalize_rotation, ranges};
use retouch_core::geometry::{self, AspectRatio, CropRect, Orientation};
use retouch_core::presets::find_preset;
use retouch_core::{Adjustments, NamedFilter, Pipeline, RasterBuffer};
use retouch_layers::{Layer, LayerStack, ResourceLoader};
use tracing::{debug, info, warn};

use crate::config::EditorConfig;
use crate::error::EditorError;
use crate::export::export;

/// Adjusted raster produced by one render pass.
#[derive(Clone, Debug)]
pub struct RenderedPreview {
    pub generation: u64,
    pub adjustments: Adjustments,
    pub image: RasterBuffer,
}

/// Snapshot of everything a render needs, detached from the session so it
/// can run on another thread.
pub struct RenderTicket {
    generation: u64,
    original: Arc<RasterBuffer>,
    adjustments: Adjustments,
    pipeline: Arc<Pipeline>,
}

impl RenderTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn run(self) -> Result<RenderedPreview, EditorError> {
        let t0 = Instant::now();
        let image = self.pipeline.render(&self.original, &self.adjustments)?;
        debug!(
            generation = self.generation,
            elapsed_ms = t0.elapsed().as_millis(),
            w = image.width,
            h = image.height,
            "preview rendered"
        );
        Ok(RenderedPreview {
            generation: self.generation,
            adjustments: self.adjustments,
            image,
        })
    }
}

/// One photo being edited: its original (and pre-crop original), the
/// adjustment set, the overlay layers and the latest accepted preview.
///
/// Every change to the image or adjustments advances the generation, so a
/// render started before the change is dropped when it completes.
pub struct EditorSession {
    pre_crop: Arc<RasterBuffer>,
    original: Arc<RasterBuffer>,
    adjustments: Adjustments,
    layers: LayerStack,
    config: EditorConfig,
    preview_pipeline: Arc<Pipeline>,
    full_pipeline: Arc<Pipeline>,
    generation: u64,
    preview: Option<RenderedPreview>,
    source: Option<Photo>,
}

macro_rules! knob_setters {
    ($($setter:ident => $field:ident, $range:ident;)*) => {
        $(
            pub fn $setter(&mut self, value: f32) {
                self.adjustments.$field = clamp_knob(value, ranges::$range);
                self.touch();
            }
        )*
    };
}

impl EditorSession {
    pub fn new(image: RasterBuffer, config: EditorConfig) -> Self {
        let image = Arc::new(image);
        Self {
            pre_crop: Arc::clone(&image),
            original: image,
            adjustments: Adjustments::default(),
            layers: LayerStack::new(),
            preview_pipeline: Arc::new(config.preview_pipeline()),
            full_pipeline: Arc::new(config.full_pipeline()),
            config,
            generation: 0,
            preview: None,
            source: None,
        }
    }

    pub fn from_bytes(bytes: &[u8], config: EditorConfig) -> Result<Self, EditorError> {
        let image = RasterBuffer::decode(bytes).map_err(EditorError::Decode)?;
        if image.is_empty() {
            return Err(EditorError::NoImage);
        }
        Ok(Self::new(image, config))
    }

    /// Fetch a photo from the store and start editing it.
    pub async fn open(
        store: &impl PhotoStore,
        id: PhotoId,
        config: EditorConfig,
    ) -> Result<Self, EditorError> {
        let stored = store.fetch(id).map_err(EditorError::Store)?;
        let bytes = stored.bytes;
        let t0 = Instant::now();
        let image = tokio::task::spawn_blocking(move || RasterBuffer::decode(&bytes))
            .await
            .map_err(|e| EditorError::Other(e.into()))?
            .map_err(EditorError::Decode)?;
        if image.is_empty() {
            return Err(EditorError::NoImage);
        }
        info!(
            id,
            elapsed_ms = t0.elapsed().as_millis(),
            w = image.width,
            h = image.height,
            "photo opened"
        );
        let mut session = Self::new(image, config);
        session.source = Some(stored.photo);
        Ok(session)
    }

    fn touch(&mut self) {
        self.generation += 1;
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn source(&self) -> Option<&Photo> {
        self.source.as_ref()
    }

    pub fn original(&self) -> &RasterBuffer {
        &self.original
    }

    pub fn adjustments(&self) -> &Adjustments {
        &self.adjustments
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    knob_setters! {
        set_brightness => brightness, BRIGHTNESS;
        set_contrast => contrast, CONTRAST;
        set_saturation => saturation, SATURATION;
        set_temperature => temperature, TEMPERATURE;
        set_hue => hue, HUE;
        set_exposure => exposure, EXPOSURE;
        set_shadows => shadows, SHADOWS;
        set_highlights => highlights, HIGHLIGHTS;
        set_clarity => clarity, CLARITY;
        set_vibrance => vibrance, VIBRANCE;
        set_sharpness => sharpness, SHARPNESS;
        set_blur => blur, BLUR;
        set_noise => noise, NOISE;
        set_vignette => vignette, VIGNETTE;
    }

    pub fn set_named_filter(&mut self, filter: NamedFilter) {
        self.adjustments.named_filter = filter;
        self.touch();
    }

    /// Replace the whole adjustment set, clamped.
    pub fn set_adjustments(&mut self, adjustments: Adjustments) {
        self.adjustments = adjustments.clamped();
        self.touch();
    }

    /// Apply a gallery preset by id. Unknown ids change nothing.
    pub fn apply_preset(&mut self, id: &str) -> bool {
        let Some(preset) = find_preset(id) else {
            warn!(preset = id, "unknown preset");
            return false;
        };
        self.adjustments = preset.apply_to(&self.adjustments);
        self.touch();
        true
    }

    pub fn reset_adjustments(&mut self) {
        self.adjustments = Adjustments::default();
        self.touch();
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        self.adjustments.rotation = normalize_rotation(degrees);
        self.touch();
    }

    pub fn rotate_left(&mut self) {
        self.set_rotation(self.adjustments.rotation - 90.0);
    }

    pub fn rotate_right(&mut self) {
        self.set_rotation(self.adjustments.rotation + 90.0);
    }

    pub fn toggle_flip_horizontal(&mut self) {
        self.adjustments.flip_horizontal = !self.adjustments.flip_horizontal;
        self.touch();
    }

    pub fn toggle_flip_vertical(&mut self) {
        self.adjustments.flip_vertical = !self.adjustments.flip_vertical;
        self.touch();
    }

    /// Full-resolution canvas size after rotation.
    pub fn canvas_size(&self) -> (u32, u32) {
        Orientation::from_adjustments(&self.adjustments)
            .output_size(self.original.width, self.original.height)
    }

    /// Starting crop rectangle for the crop tool, locked to `aspect`.
    pub fn initial_crop(&self, aspect: AspectRatio) -> CropRect {
        let (w, h) = self.canvas_size();
        CropRect::initial(w, h).with_aspect(aspect, w, h)
    }

    /// Cut `rect` (canvas coordinates) out of the rotated and flipped
    /// original. The result becomes the new original with the orientation
    /// baked in; pixel adjustments and layers are kept.
    pub fn crop(&mut self, rect: CropRect) {
        let orientation = Orientation::from_adjustments(&self.adjustments);
        let canvas = if orientation.is_identity() {
            Arc::clone(&self.original)
        } else {
            Arc::new(geometry::transform(&self.original, orientation))
        };

        let clamped = rect.clamp_to(canvas.width, canvas.height);
        let requested = (rect.x, rect.y, rect.width, rect.height);
        let (x, y, w, h) = clamped;
        if requested != (x as f64, y as f64, w as f64, h as f64) {
            warn!(?requested, ?clamped, "crop rectangle clamped to image bounds");
        }

        self.original = Arc::new(geometry::crop(&canvas, rect));
        self.adjustments.rotation = 0.0;
        self.adjustments.flip_horizontal = false;
        self.adjustments.flip_vertical = false;
        info!(w = self.original.width, h = self.original.height, "cropped");
        self.touch();
    }

    /// Restore the pre-crop original with neutral adjustments. Layers stay.
    pub fn reset(&mut self) {
        self.original = Arc::clone(&self.pre_crop);
        self.adjustments = Adjustments::default();
        self.preview = None;
        self.touch();
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut LayerStack {
        &mut self.layers
    }

    pub fn set_layers(&mut self, layers: LayerStack) {
        self.layers = layers;
    }

    /// Snapshot the current state for a preview render, superseding any
    /// render begun earlier.
    pub fn begin_render(&mut self) -> RenderTicket {
        self.touch();
        RenderTicket {
            generation: self.generation,
            original: Arc::clone(&self.original),
            adjustments: self.adjustments.clone(),
            pipeline: Arc::clone(&self.preview_pipeline),
        }
    }

    /// Install `preview` if nothing changed since its render began.
    pub fn accept(&mut self, preview: RenderedPreview) -> bool {
        if preview.generation != self.generation {
            debug!(
                stale = preview.generation,
                current = self.generation,
                "dropping superseded preview"
            );
            return false;
        }
        self.preview = Some(preview);
        true
    }

    pub fn preview(&self) -> Option<&RenderedPreview> {
        self.preview.as_ref()
    }

    /// Render at the working size and install the result.
    pub fn render_preview(&mut self) -> Result<&RasterBuffer, EditorError> {
        let preview = self.begin_render().run()?;
        self.preview = Some(preview);
        self.preview
            .as_ref()
            .map(|p| &p.image)
            .ok_or(EditorError::NoImage)
    }

    /// Render on the blocking pool. Returns whether the result was still
    /// current when it finished.
    pub async fn render_preview_async(&mut self) -> Result<bool, EditorError> {
        let ticket = self.begin_render();
        let preview = tokio::task::spawn_blocking(move || ticket.run())
            .await
            .map_err(|e| EditorError::Other(e.into()))??;
        Ok(self.accept(preview))
    }

    /// Adjusted image at full resolution, without layers.
    pub fn render_full(&self) -> Result<RasterBuffer, EditorError> {
        let t0 = Instant::now();
        let image = self.full_pipeline.render(&self.original, &self.adjustments)?;
        info!(
            elapsed_ms = t0.elapsed().as_millis(),
            w = image.width,
            h = image.height,
            "full render"
        );
        Ok(image)
    }

    /// Resolve layer resources, composite at full resolution and encode.
    pub async fn export_final(&self, loader: &ResourceLoader) -> Result<Vec<u8>, EditorError> {
        let layers: Vec<Layer> = self.layers.iter().cloned().collect();
        let resources = loader.resolve(&layers).await;

        let original = Arc::clone(&self.original);
        let adjustments = self.adjustments.clone();
        let pipeline = Arc::clone(&self.full_pipeline);
        let settings = self.config.export;
        tokio::task::spawn_blocking(move || -> Result<Vec<u8>, EditorError> {
            let adjusted = pipeline.render(&original, &adjustments)?;
            Ok(export(&adjusted, &layers, &resources, &settings)?)
        })
        .await
        .map_err(|e| EditorError::Other(e.into()))?
    }

    /// Export and upload as a new photo. The source photo is never
    /// overwritten.
    pub async fn save_as(
        &self,
        store: &impl PhotoStore,
        loader: &ResourceLoader,
        title: &str,
    ) -> Result<Photo, EditorError> {
        let bytes = self.export_final(loader).await?;
        let format = self.config.export.format;
        let filename = format!("{}.{}", file_stem(title), format.extension());
        let mut upload = NewPhoto::new(filename, format.mime_type(), bytes).with_title(title);
        if let Some(source) = &self.source {
            upload = upload.derived_from(source.id);
        }
        let photo = store.upload(upload).map_err(EditorError::Store)?;
        info!(id = photo.id, title = %photo.title, "saved edited copy");
        Ok(photo)
    }
}

/// Filesystem-safe stem derived from a title.
fn file_stem(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    let stem = stem.trim_matches('-');
    if stem.is_empty() { "edited".to_string() } else { stem.to_string() }
}

#[cfg(test)]
mod tests {
    use retouch_catalog::Catalog;
    use retouch_layers::{LayerPatch, NewLayer};

    use super::*;
    use crate::config::{ExportFormat, ExportSettings};

    fn config() -> EditorConfig {
        EditorConfig {
            export: ExportSettings::png(),
            noise_seed: Some(1),
            ..Default::default()
        }
    }

    fn session(w: u32, h: u32) -> EditorSession {
        let mut image = RasterBuffer::new(w, h);
        for y in 0..h {
            for x in 0..w {
                image.set_pixel(x, y, [(x % 256) as u8, (y % 256) as u8, 128, 255]);
            }
        }
        EditorSession::new(image, config())
    }

    fn png(image: &RasterBuffer) -> Vec<u8> {
        crate::export::encode(image, &ExportSettings::png()).unwrap()
    }

    #[test]
    fn setters_clamp() {
        let mut s = session(4, 4);
        for (value, expected) in [(250.0, 100.0), (-250.0, -100.0), (f32::NAN, 0.0), (42.0, 42.0)] {
            s.set_brightness(value);
            assert_eq!(s.adjustments().brightness, expected, "brightness({value})");
        }
        s.set_blur(80.0);
        assert_eq!(s.adjustments().blur, 50.0);
        s.set_hue(-10.0);
        assert_eq!(s.adjustments().hue, 0.0);
    }

    #[test]
    fn quarter_turns_wrap() {
        let mut s = session(4, 4);
        s.rotate_left();
        assert_eq!(s.adjustments().rotation, -90.0);
        s.rotate_right();
        s.rotate_right();
        s.rotate_right();
        assert_eq!(s.adjustments().rotation, 180.0);
        s.rotate_right();
        assert_eq!(s.adjustments().rotation, -90.0);
    }

    #[test]
    fn presets_apply_by_id() {
        let mut s = session(4, 4);
        s.set_vignette(30.0);
        assert!(s.apply_preset("dramatic"));
        assert_eq!(s.adjustments().contrast, 40.0);
        assert_eq!(s.adjustments().vignette, 30.0);
        assert!(!s.apply_preset("nope"));
    }

    #[test]
    fn crop_then_reset() {
        let mut s = session(200, 200);
        s.layers_mut().create(NewLayer::Text, LayerPatch::default());
        s.set_contrast(20.0);
        s.crop(CropRect::new(50.0, 50.0, 100.0, 100.0));
        assert_eq!((s.original().width, s.original().height), (100, 100));
        assert_eq!(s.original().pixel(0, 0), Some([50, 50, 128, 255]));
        assert_eq!(s.adjustments().contrast, 20.0);

        s.reset();
        assert_eq!((s.original().width, s.original().height), (200, 200));
        assert!(s.adjustments().is_neutral());
        assert_eq!(s.layers().len(), 1);
    }

    #[test]
    fn crop_uses_rotated_canvas() {
        let mut s = session(200, 100);
        s.rotate_right();
        assert_eq!(s.canvas_size(), (100, 200));
        s.crop(CropRect::new(0.0, 0.0, 100.0, 150.0));
        assert_eq!((s.original().width, s.original().height), (100, 150));
        assert_eq!(s.adjustments().rotation, 0.0);
        // Rotated clockwise, the source's bottom-left corner lands top-left
        assert_eq!(s.original().pixel(0, 0), Some([0, 99, 128, 255]));
    }

    #[test]
    fn out_of_bounds_crop_is_clamped() {
        let mut s = session(50, 40);
        s.crop(CropRect::new(30.0, -10.0, 100.0, 100.0));
        assert_eq!((s.original().width, s.original().height), (20, 40));
    }

    #[test]
    fn initial_crop_respects_aspect() {
        let s = session(400, 300);
        let free = s.initial_crop(AspectRatio::Free);
        assert_eq!(free, CropRect::new(40.0, 30.0, 320.0, 240.0));
        let square = s.initial_crop(AspectRatio::Square);
        assert!((square.width - square.height).abs() < 1e-9, "{square:?}");
    }

    #[test]
    fn superseded_renders_are_dropped() {
        let mut s = session(40, 30);
        s.set_brightness(10.0);
        let first = s.begin_render();
        s.set_brightness(60.0);
        let second = s.begin_render();
        assert!(second.generation() > first.generation());

        let second = second.run().unwrap();
        let first = first.run().unwrap();
        assert!(s.accept(second));
        assert!(!s.accept(first));
        assert_eq!(s.preview().unwrap().adjustments.brightness, 60.0);
    }

    #[test]
    fn preview_respects_working_size() {
        let mut s = EditorSession::new(
            RasterBuffer::filled(1600, 1200, [1, 2, 3, 255]),
            config(),
        );
        let preview = s.render_preview().unwrap();
        assert_eq!((preview.width, preview.height), (800, 600));
        let full = s.render_full().unwrap();
        assert_eq!((full.width, full.height), (1600, 1200));
    }

    #[test]
    fn decode_failure_is_typed() {
        let err = EditorSession::from_bytes(b"garbage", config()).err().unwrap();
        assert!(matches!(err, EditorError::Decode(_)), "{err}");
    }

    #[test]
    fn stems() {
        for (title, expected) in [("Sunset at sea", "Sunset-at-sea"), ("***", "edited"), ("a/b", "a-b")] {
            assert_eq!(file_stem(title), expected, "{title}");
        }
    }

    #[tokio::test]
    async fn async_preview_installs_result() {
        let mut s = session(20, 20);
        s.set_exposure(30.0);
        assert!(s.render_preview_async().await.unwrap());
        assert_eq!(s.preview().unwrap().generation, s.generation());
    }

    #[tokio::test]
    async fn open_edit_and_save_as_new_photo() {
        let catalog = Catalog::open_in_memory().unwrap();
        let source = catalog
            .upload(NewPhoto::new("red.png", "image/png", png(&RasterBuffer::filled(10, 10, [255, 0, 0, 255]))))
            .unwrap();

        let mut s = EditorSession::open(&catalog, source.id, config()).await.unwrap();
        s.set_temperature(-100.0);
        let loader = ResourceLoader::new().with_font_dirs(Vec::new());
        let saved = s.save_as(&catalog, &loader, "Cool red").await.unwrap();

        assert_ne!(saved.id, source.id);
        assert_eq!(saved.derived_from, Some(source.id));
        assert_eq!(saved.mime_type, ExportFormat::Png.mime_type());
        assert_eq!(saved.filename, "Cool-red.png");

        let stored = catalog.fetch(saved.id).unwrap();
        let image = RasterBuffer::decode(&stored.bytes).unwrap();
        assert_eq!(image.pixel(5, 5), Some([225, 0, 30, 255]));
        // The source photo is untouched
        let original = RasterBuffer::decode(&catalog.fetch(source.id).unwrap().bytes).unwrap();
        assert_eq!(original.pixel(5, 5), Some([255, 0, 0, 255]));
    }

    #[tokio::test]
    async fn open_missing_photo_is_store_error() {
        let catalog = Catalog::open_in_memory().unwrap();
        let err = EditorSession::open(&catalog, 7, config()).await.err().unwrap();
        assert!(matches!(err, EditorError::Store(_)), "{err}");
    }
}
