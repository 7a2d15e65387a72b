mod basic;
mod color;
mod finish;
mod geometry;
mod spatial;
mod tone;

pub use basic::{Basic, NamedFilterStep};
pub use color::{Hue, Temperature, Vibrance};
pub use finish::{Noise, Vignette};
pub use geometry::Geometry;
pub use spatial::{Blur, Clarity, Sharpness};
pub use tone::{Exposure, Highlights, Shadows};
