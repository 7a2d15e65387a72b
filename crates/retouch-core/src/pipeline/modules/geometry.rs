use anyhow::Result;

use crate::adjustments::Adjustments;
use crate::geometry::{self, Orientation};
use crate::pipeline::module::ProcessingModule;
use crate::raster::RasterBuffer;

/// Rotation and flips, always last.
pub struct Geometry;

impl ProcessingModule for Geometry {
    fn name(&self) -> &str {
        "geometry"
    }

    fn process_cpu(&self, input: RasterBuffer, adj: &Adjustments) -> Result<RasterBuffer> {
        let orientation = Orientation::from_adjustments(adj);
        if orientation.is_identity() {
            return Ok(input);
        }
        Ok(geometry::transform(&input, orientation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_turn_swaps_dimensions() {
        let buf = RasterBuffer::filled(6, 2, [1, 2, 3, 255]);
        let adj = Adjustments {
            rotation: -90.0,
            ..Default::default()
        };
        let result = Geometry.process_cpu(buf, &adj).unwrap();
        assert_eq!((result.width, result.height), (2, 6));
    }
}
