pub mod module;
pub mod modules;

use anyhow::Result;
use tracing::debug;

use crate::adjustments::Adjustments;
use crate::filters::NoiseSource;
use crate::raster::RasterBuffer;
use module::ProcessingModule;

/// Working size previews are rendered at unless configured otherwise.
pub const DEFAULT_WORKING_SIZE: (u32, u32) = (800, 600);

/// Processing pipeline that chains modules together.
///
/// ```text
/// Fit -> Named filter -> Basic -> Color -> Tone -> Spatial -> Noise -> Vignette -> Geometry
/// ```
///
/// Every render starts from the untouched original, so adjustment sets
/// never stack on a previous result. Out-of-range knobs are clamped.
pub struct Pipeline {
    modules: Vec<Box<dyn ProcessingModule>>,
    working_size: Option<(u32, u32)>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            modules: vec![
                Box::new(modules::NamedFilterStep),
                Box::new(modules::Basic),
                Box::new(modules::Temperature),
                Box::new(modules::Hue),
                Box::new(modules::Vibrance),
                Box::new(modules::Exposure),
                Box::new(modules::Shadows),
                Box::new(modules::Highlights),
                Box::new(modules::Clarity),
                Box::new(modules::Sharpness),
                Box::new(modules::Blur),
                Box::new(modules::Noise::default()),
                Box::new(modules::Vignette),
                Box::new(modules::Geometry),
            ],
            working_size: Some(DEFAULT_WORKING_SIZE),
        }
    }

    /// Bound the render to `width` x `height`, aspect ratio kept.
    pub fn with_working_size(mut self, width: u32, height: u32) -> Self {
        self.working_size = Some((width.max(1), height.max(1)));
        self
    }

    /// Render at the original's full resolution.
    pub fn full_resolution(mut self) -> Self {
        self.working_size = None;
        self
    }

    pub fn with_noise_source(mut self, source: impl NoiseSource + 'static) -> Self {
        if let Some(slot) = self.modules.iter_mut().find(|m| m.name() == "noise") {
            *slot = Box::new(modules::Noise::new(source));
        }
        self
    }

    pub fn working_size(&self) -> Option<(u32, u32)> {
        self.working_size
    }

    /// Produce the adjusted raster for `adjustments`, re-derived from
    /// `original`.
    pub fn render(&self, original: &RasterBuffer, adjustments: &Adjustments) -> Result<RasterBuffer> {
        let adj = adjustments.clamped();
        let input = match self.working_size {
            Some((w, h)) => original.fit_within(w, h),
            None => original.clone(),
        };
        debug!(
            width = input.width,
            height = input.height,
            neutral = adj.is_neutral(),
            "render"
        );
        self.process_cpu(input, &adj)
    }

    /// Run every module in order on an already-fitted buffer.
    pub fn process_cpu(&self, input: RasterBuffer, adj: &Adjustments) -> Result<RasterBuffer> {
        let mut current = input;
        for module in &self.modules {
            debug!(module = module.name(), "processing");
            current = module.process_cpu(current, adj)?;
        }
        Ok(current)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
