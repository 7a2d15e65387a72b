use anyhow::Result;
use tracing::trace;

use crate::adjustments::Adjustments;
use crate::filters;
use crate::pipeline::module::ProcessingModule;
use crate::raster::RasterBuffer;

pub struct Clarity;

impl ProcessingModule for Clarity {
    fn name(&self) -> &str {
        "clarity"
    }

    fn process_cpu(&self, mut input: RasterBuffer, adj: &Adjustments) -> Result<RasterBuffer> {
        filters::clarity(&mut input, adj.clarity);
        Ok(input)
    }
}

pub struct Sharpness;

impl ProcessingModule for Sharpness {
    fn name(&self) -> &str {
        "sharpness"
    }

    fn process_cpu(&self, mut input: RasterBuffer, adj: &Adjustments) -> Result<RasterBuffer> {
        filters::sharpness(&mut input, adj.sharpness);
        Ok(input)
    }
}

pub struct Blur;

impl ProcessingModule for Blur {
    fn name(&self) -> &str {
        "blur"
    }

    fn process_cpu(&self, mut input: RasterBuffer, adj: &Adjustments) -> Result<RasterBuffer> {
        if adj.blur > 0.0 {
            trace!(radius = filters::spatial::blur_radius(adj.blur), "box blur");
        }
        filters::blur(&mut input, adj.blur);
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_pass_sees_previous_output() {
        let mut buf = RasterBuffer::filled(5, 5, [100, 100, 100, 255]);
        buf.set_pixel(2, 2, [200, 200, 200, 255]);
        let adj = Adjustments {
            sharpness: 100.0,
            blur: 5.0,
            ..Default::default()
        };

        let sharpened = Sharpness.process_cpu(buf.clone(), &adj).unwrap();
        let chained = Blur.process_cpu(sharpened.clone(), &adj).unwrap();

        let mut expected = sharpened;
        filters::blur(&mut expected, 5.0);
        assert_eq!(chained, expected);
    }
}
