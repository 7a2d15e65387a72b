use anyhow::Result;

use crate::adjustments::{Adjustments, NamedFilter};
use crate::filters;
use crate::pipeline::module::ProcessingModule;
use crate::raster::RasterBuffer;

pub struct NamedFilterStep;

impl ProcessingModule for NamedFilterStep {
    fn name(&self) -> &str {
        "named_filter"
    }

    fn process_cpu(&self, mut input: RasterBuffer, adj: &Adjustments) -> Result<RasterBuffer> {
        if adj.named_filter == NamedFilter::None {
            return Ok(input);
        }
        filters::named_filter(&mut input, adj.named_filter);
        Ok(input)
    }
}

/// Brightness, contrast and saturation.
pub struct Basic;

impl ProcessingModule for Basic {
    fn name(&self) -> &str {
        "basic"
    }

    fn process_cpu(&self, mut input: RasterBuffer, adj: &Adjustments) -> Result<RasterBuffer> {
        filters::basic_adjust(
            &mut input,
            adj.brightness,
            adj.contrast,
            adj.saturation,
            adj.named_filter,
        );
        Ok(input)
    }
}
