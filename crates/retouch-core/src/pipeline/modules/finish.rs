use std::sync::Mutex;

use anyhow::{Result, anyhow};

use crate::adjustments::Adjustments;
use crate::filters::{self, NoiseSource, SeededNoise};
use crate::pipeline::module::ProcessingModule;
use crate::raster::RasterBuffer;

/// Film grain. Owns its random source so tests can inject a fixed seed.
pub struct Noise {
    source: Mutex<Box<dyn NoiseSource>>,
}

impl Noise {
    pub fn new(source: impl NoiseSource + 'static) -> Self {
        Self {
            source: Mutex::new(Box::new(source)),
        }
    }
}

impl Default for Noise {
    fn default() -> Self {
        Self::new(SeededNoise::from_clock())
    }
}

impl ProcessingModule for Noise {
    fn name(&self) -> &str {
        "noise"
    }

    fn process_cpu(&self, mut input: RasterBuffer, adj: &Adjustments) -> Result<RasterBuffer> {
        if adj.noise == 0.0 {
            return Ok(input);
        }
        let mut source = self
            .source
            .lock()
            .map_err(|_| anyhow!("noise source lock poisoned"))?;
        filters::noise(&mut input, adj.noise, source.as_mut());
        Ok(input)
    }
}

pub struct Vignette;

impl ProcessingModule for Vignette {
    fn name(&self) -> &str {
        "vignette"
    }

    fn process_cpu(&self, mut input: RasterBuffer, adj: &Adjustments) -> Result<RasterBuffer> {
        filters::vignette(&mut input, adj.vignette);
        Ok(input)
    }
}
