pub mod adjustments;
pub mod color;
pub mod filters;
pub mod geometry;
pub mod pipeline;
pub mod presets;
pub mod raster;

pub use adjustments::{Adjustments, NamedFilter};
pub use geometry::{AspectRatio, CropRect, Orientation};
pub use pipeline::Pipeline;
pub use presets::{FilterPreset, PRESETS};
pub use raster::RasterBuffer;
