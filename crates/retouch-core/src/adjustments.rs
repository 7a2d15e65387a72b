use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Fixed color-matrix preset applied before the continuous knobs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamedFilter {
    #[default]
    None,
    Grayscale,
    Sepia,
    Vintage,
}

/// Documented range of every numeric knob.
pub mod ranges {
    use std::ops::RangeInclusive;

    pub const BRIGHTNESS: RangeInclusive<f32> = -100.0..=100.0;
    pub const CONTRAST: RangeInclusive<f32> = -100.0..=100.0;
    pub const SATURATION: RangeInclusive<f32> = -100.0..=100.0;
    pub const ROTATION: RangeInclusive<f32> = -180.0..=180.0;
    pub const TEMPERATURE: RangeInclusive<f32> = -100.0..=100.0;
    pub const HUE: RangeInclusive<f32> = 0.0..=360.0;
    pub const EXPOSURE: RangeInclusive<f32> = -100.0..=100.0;
    pub const SHADOWS: RangeInclusive<f32> = -100.0..=100.0;
    pub const HIGHLIGHTS: RangeInclusive<f32> = -100.0..=100.0;
    pub const CLARITY: RangeInclusive<f32> = -100.0..=100.0;
    pub const VIBRANCE: RangeInclusive<f32> = -100.0..=100.0;
    pub const SHARPNESS: RangeInclusive<f32> = 0.0..=100.0;
    pub const BLUR: RangeInclusive<f32> = 0.0..=50.0;
    pub const NOISE: RangeInclusive<f32> = 0.0..=100.0;
    pub const VIGNETTE: RangeInclusive<f32> = 0.0..=100.0;
}

/// Non-destructive adjustment set for one render pass.
///
/// Every knob is neutral at 0 (or `NamedFilter::None` / `false`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Adjustments {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    #[serde(rename = "filter", alias = "namedFilter")]
    pub named_filter: NamedFilter,
    /// Degrees, clockwise.
    pub rotation: f32,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub temperature: f32,
    /// Degrees of hue rotation.
    pub hue: f32,
    pub exposure: f32,
    pub shadows: f32,
    pub highlights: f32,
    pub clarity: f32,
    pub vibrance: f32,
    pub sharpness: f32,
    pub blur: f32,
    pub noise: f32,
    pub vignette: f32,
}

impl Adjustments {
    /// Copy with every knob forced into its documented range.
    ///
    /// Out-of-range values saturate, NaN becomes neutral, and rotation wraps
    /// around the circle so repeated quarter turns keep working.
    pub fn clamped(&self) -> Self {
        Self {
            brightness: clamp_knob(self.brightness, ranges::BRIGHTNESS),
            contrast: clamp_knob(self.contrast, ranges::CONTRAST),
            saturation: clamp_knob(self.saturation, ranges::SATURATION),
            named_filter: self.named_filter,
            rotation: normalize_rotation(self.rotation),
            flip_horizontal: self.flip_horizontal,
            flip_vertical: self.flip_vertical,
            temperature: clamp_knob(self.temperature, ranges::TEMPERATURE),
            hue: clamp_knob(self.hue, ranges::HUE),
            exposure: clamp_knob(self.exposure, ranges::EXPOSURE),
            shadows: clamp_knob(self.shadows, ranges::SHADOWS),
            highlights: clamp_knob(self.highlights, ranges::HIGHLIGHTS),
            clarity: clamp_knob(self.clarity, ranges::CLARITY),
            vibrance: clamp_knob(self.vibrance, ranges::VIBRANCE),
            sharpness: clamp_knob(self.sharpness, ranges::SHARPNESS),
            blur: clamp_knob(self.blur, ranges::BLUR),
            noise: clamp_knob(self.noise, ranges::NOISE),
            vignette: clamp_knob(self.vignette, ranges::VIGNETTE),
        }
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }

    /// True when only the orientation knobs differ from neutral.
    pub fn has_pixel_adjustments(&self) -> bool {
        let orientation_only = Self {
            rotation: self.rotation,
            flip_horizontal: self.flip_horizontal,
            flip_vertical: self.flip_vertical,
            ..Self::default()
        };
        *self != orientation_only
    }
}

pub fn clamp_knob(value: f32, range: RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        return 0.0_f32.clamp(*range.start(), *range.end());
    }
    value.clamp(*range.start(), *range.end())
}

/// Wrap any angle into [-180, 180]; 270 becomes -90, -270 becomes 90.
pub fn normalize_rotation(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return 0.0;
    }
    if ranges::ROTATION.contains(&degrees) {
        return degrees;
    }
    let wrapped = (degrees + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && degrees > 0.0 {
        180.0
    } else {
        wrapped
    }
}
