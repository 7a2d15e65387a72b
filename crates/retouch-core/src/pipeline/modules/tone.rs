use anyhow::Result;

use crate::adjustments::Adjustments;
use crate::filters;
use crate::pipeline::module::ProcessingModule;
use crate::raster::RasterBuffer;

pub struct Exposure;

impl ProcessingModule for Exposure {
    fn name(&self) -> &str {
        "exposure"
    }

    fn process_cpu(&self, mut input: RasterBuffer, adj: &Adjustments) -> Result<RasterBuffer> {
        filters::exposure(&mut input, adj.exposure);
        Ok(input)
    }
}

pub struct Shadows;

impl ProcessingModule for Shadows {
    fn name(&self) -> &str {
        "shadows"
    }

    fn process_cpu(&self, mut input: RasterBuffer, adj: &Adjustments) -> Result<RasterBuffer> {
        filters::shadows(&mut input, adj.shadows);
        Ok(input)
    }
}

pub struct Highlights;

impl ProcessingModule for Highlights {
    fn name(&self) -> &str {
        "highlights"
    }

    fn process_cpu(&self, mut input: RasterBuffer, adj: &Adjustments) -> Result<RasterBuffer> {
        filters::highlights(&mut input, adj.highlights);
        Ok(input)
    }
}
