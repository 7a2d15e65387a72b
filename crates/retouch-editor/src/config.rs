use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use retouch_core::Pipeline;
use retouch_core::filters::SeededNoise;
use retouch_core::pipeline::DEFAULT_WORKING_SIZE;
use retouch_layers::ResourceLoader;
use retouch_layers::resources::{DEFAULT_TIMEOUT, SYSTEM_FONT_DIRS};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// Editor settings, read from JSON. Every field may be omitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Bounds for interactive previews; `null` previews at full resolution.
    pub working_size: Option<Size>,
    pub export: ExportSettings,
    pub resources: ResourceSettings,
    /// Fixed seed for the noise knob, for reproducible renders.
    pub noise_seed: Option<u64>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        let (width, height) = DEFAULT_WORKING_SIZE;
        Self {
            working_size: Some(Size { width, height }),
            export: ExportSettings::default(),
            resources: ResourceSettings::default(),
            noise_seed: None,
        }
    }
}

impl EditorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn preview_pipeline(&self) -> Pipeline {
        let pipeline = self.seeded(Pipeline::new());
        match self.working_size {
            Some(size) => pipeline.with_working_size(size.width, size.height),
            None => pipeline.full_resolution(),
        }
    }

    pub fn full_pipeline(&self) -> Pipeline {
        self.seeded(Pipeline::new().full_resolution())
    }

    fn seeded(&self, pipeline: Pipeline) -> Pipeline {
        match self.noise_seed {
            Some(seed) => pipeline.with_noise_source(SeededNoise::new(seed)),
            None => pipeline,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Jpeg,
    Png,
}

impl ExportFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Png => "png",
        }
    }

    /// Guess from a file name's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            "png" => Some(ExportFormat::Png),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub format: ExportFormat,
    /// Lossy quality in [0, 1].
    pub quality: f32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Jpeg,
            quality: 0.95,
        }
    }
}

impl ExportSettings {
    pub fn png() -> Self {
        Self {
            format: ExportFormat::Png,
            ..Default::default()
        }
    }

    /// Encoder quality on the 1-100 scale.
    pub fn jpeg_quality(&self) -> u8 {
        let q = if self.quality.is_finite() { self.quality } else { 0.95 };
        (q.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourceSettings {
    pub timeout_ms: u64,
    pub font_dirs: Vec<PathBuf>,
    pub fallback_font: Option<PathBuf>,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            font_dirs: SYSTEM_FONT_DIRS.iter().map(PathBuf::from).collect(),
            fallback_font: None,
        }
    }
}

impl ResourceSettings {
    pub fn loader(&self) -> ResourceLoader {
        let loader = ResourceLoader::new()
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_font_dirs(self.font_dirs.iter().cloned());
        match &self.fallback_font {
            Some(path) => loader.with_fallback_font(path),
            None => loader,
        }
    }
}
