use anyhow::Result;

use crate::adjustments::Adjustments;
use crate::raster::RasterBuffer;

/// A single step in the processing pipeline.
pub trait ProcessingModule: Send + Sync {
    fn name(&self) -> &str;
    fn process_cpu(&self, input: RasterBuffer, adj: &Adjustments) -> Result<RasterBuffer>;
}
