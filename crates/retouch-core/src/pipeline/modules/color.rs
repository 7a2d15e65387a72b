use anyhow::Result;

use crate::adjustments::Adjustments;
use crate::filters;
use crate::pipeline::module::ProcessingModule;
use crate::raster::RasterBuffer;

pub struct Temperature;

impl ProcessingModule for Temperature {
    fn name(&self) -> &str {
        "temperature"
    }

    fn process_cpu(&self, mut input: RasterBuffer, adj: &Adjustments) -> Result<RasterBuffer> {
        filters::temperature(&mut input, adj.temperature);
        Ok(input)
    }
}

pub struct Hue;

impl ProcessingModule for Hue {
    fn name(&self) -> &str {
        "hue"
    }

    fn process_cpu(&self, mut input: RasterBuffer, adj: &Adjustments) -> Result<RasterBuffer> {
        filters::hue(&mut input, adj.hue);
        Ok(input)
    }
}

pub struct Vibrance;

impl ProcessingModule for Vibrance {
    fn name(&self) -> &str {
        "vibrance"
    }

    fn process_cpu(&self, mut input: RasterBuffer, adj: &Adjustments) -> Result<RasterBuffer> {
        filters::vibrance(&mut input, adj.vibrance);
        Ok(input)
    }
}
