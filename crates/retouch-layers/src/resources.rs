use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ab_glyph::FontArc;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use retouch_core::RasterBuffer;
use tracing::{debug, info, warn};

use crate::fonts::{FontBook, normalize_family};
use crate::layer::Layer;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Directories searched for font files when none are configured.
pub const SYSTEM_FONT_DIRS: &[&str] = &[
    "/usr/share/fonts",
    "/usr/local/share/fonts",
    "/Library/Fonts",
    "/System/Library/Fonts",
    "C:\\Windows\\Fonts",
];

/// Families tried, in order, when no fallback font file is configured.
const FALLBACK_FAMILIES: &[&str] = &["DejaVu Sans", "Liberation Sans", "Arial", "Helvetica", "Noto Sans"];

/// CSS generic families; they never map to a file of their own.
const GENERIC_FAMILIES: &[&str] = &["serif", "sans-serif", "monospace", "cursive", "fantasy", "system-ui"];

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf"];
const MAX_FONT_DIR_DEPTH: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("unsupported image source {0:?}")]
    UnsupportedSource(String),

    #[error("{resource} did not load within {after:?}")]
    Timeout { resource: String, after: Duration },

    #[error("cannot decode resource: {0}")]
    Decode(String),

    #[error("cannot read {path}")]
    Io {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    #[error("no font file found for family {0:?}")]
    NoFont(String),

    #[error("loader task failed: {0}")]
    Task(String),
}

/// Everything a layer list needs to draw: fonts and decoded sticker images.
#[derive(Debug, Default)]
pub struct Resources {
    pub fonts: FontBook,
    stickers: HashMap<String, Arc<RasterBuffer>>,
    failures: Vec<(String, ResourceError)>,
}

impl Resources {
    pub fn new(fonts: FontBook) -> Self {
        Self {
            fonts,
            ..Default::default()
        }
    }

    pub fn sticker(&self, src: &str) -> Option<&RasterBuffer> {
        self.stickers.get(src).map(Arc::as_ref)
    }

    pub fn insert_sticker(&mut self, src: impl Into<String>, image: RasterBuffer) {
        self.stickers.insert(src.into(), Arc::new(image));
    }

    /// Resources that could not be loaded, keyed by family or source.
    pub fn failures(&self) -> &[(String, ResourceError)] {
        &self.failures
    }

    fn record_failure(&mut self, resource: String, err: ResourceError) {
        warn!(resource = %short(&resource), %err, "resource unavailable");
        self.failures.push((resource, err));
    }
}

/// Resolves the fonts and sticker images a layer list refers to.
#[derive(Clone, Debug)]
pub struct ResourceLoader {
    timeout: Duration,
    font_dirs: Vec<PathBuf>,
    fallback_font: Option<PathBuf>,
}

impl Default for ResourceLoader {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            font_dirs: SYSTEM_FONT_DIRS.iter().map(PathBuf::from).collect(),
            fallback_font: None,
        }
    }
}

impl ResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the font search path.
    pub fn with_font_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.font_dirs = dirs.into_iter().collect();
        self
    }

    pub fn with_fallback_font(mut self, path: impl Into<PathBuf>) -> Self {
        self.fallback_font = Some(path.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Load every distinct font family and sticker source used by `layers`.
    /// Failures are recorded in the result rather than returned.
    pub async fn resolve(&self, layers: &[Layer]) -> Resources {
        let mut families = BTreeSet::new();
        let mut sources = BTreeSet::new();
        for layer in layers {
            match layer {
                Layer::Text(t) => {
                    for family in t.font_family.split(',') {
                        let family = normalize_family(family);
                        if !family.is_empty() && !GENERIC_FAMILIES.contains(&family.as_str()) {
                            families.insert(family);
                        }
                    }
                }
                Layer::Sticker(s) => {
                    sources.insert(s.src.clone());
                }
            }
        }

        let mut resources = Resources::default();
        if !families.is_empty() {
            self.load_fonts(&families, &mut resources).await;
        }
        for src in sources {
            match self.bounded(&src, load_sticker(src.clone())).await {
                Ok(image) => {
                    debug!(src = %short(&src), width = image.width, height = image.height, "sticker loaded");
                    resources.insert_sticker(src, image);
                }
                Err(err) => resources.record_failure(src, err),
            }
        }
        info!(
            fonts = resources.fonts.len(),
            stickers = resources.stickers.len(),
            failures = resources.failures.len(),
            "resources resolved"
        );
        resources
    }

    async fn load_fonts(&self, families: &BTreeSet<String>, resources: &mut Resources) {
        let dirs = self.font_dirs.clone();
        let wanted: Vec<String> = families
            .iter()
            .cloned()
            .chain(FALLBACK_FAMILIES.iter().map(|f| normalize_family(f)))
            .collect();
        let scan = spawn_blocking(move || Ok(scan_font_dirs(&dirs, &wanted)));
        let found = match self.bounded("font directories", scan).await {
            Ok(found) => found,
            Err(err) => {
                resources.record_failure("font directories".to_string(), err);
                FontFiles::default()
            }
        };

        for family in families {
            let faces = found.for_family(family);
            if faces.is_empty() {
                resources.record_failure(family.clone(), ResourceError::NoFont(family.clone()));
                continue;
            }
            for (bold, italic, path) in faces {
                match self.bounded(family, load_font(path.clone())).await {
                    Ok(face) => {
                        debug!(family, bold, italic, path = %path.display(), "font loaded");
                        resources.fonts.insert(family, bold, italic, face);
                    }
                    Err(err) => resources.record_failure(family.clone(), err),
                }
            }
        }

        let fallback = match &self.fallback_font {
            Some(path) => Some(path.clone()),
            None => FALLBACK_FAMILIES
                .iter()
                .find_map(|f| found.regular(&normalize_family(f))),
        };
        if let Some(path) = fallback {
            match self.bounded("fallback font", load_font(path.clone())).await {
                Ok(face) => resources.fonts.set_fallback(face),
                Err(err) => resources.record_failure(path.display().to_string(), err),
            }
        }
    }

    async fn bounded<T>(
        &self,
        resource: &str,
        fut: impl Future<Output = Result<T, ResourceError>>,
    ) -> Result<T, ResourceError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ResourceError::Timeout {
                resource: short(resource),
                after: self.timeout,
            }),
        }
    }
}

async fn spawn_blocking<T: Send + 'static>(
    f: impl FnOnce() -> Result<T, ResourceError> + Send + 'static,
) -> Result<T, ResourceError> {
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ResourceError::Task(e.to_string()))?
}

async fn load_font(path: PathBuf) -> Result<FontArc, ResourceError> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|err| ResourceError::Io { path, err })?;
    FontBook::parse(bytes)
}

/// Fetch and decode a sticker image from a `data:` URL, `file://` URL or
/// filesystem path.
pub async fn load_sticker(src: String) -> Result<RasterBuffer, ResourceError> {
    let bytes = match StickerSource::parse(&src)? {
        StickerSource::Inline(bytes) => bytes,
        StickerSource::File(path) => tokio::fs::read(&path)
            .await
            .map_err(|err| ResourceError::Io { path, err })?,
    };
    spawn_blocking(move || {
        RasterBuffer::decode(&bytes).map_err(|e| ResourceError::Decode(format!("{e:#}")))
    })
    .await
}

#[derive(Debug, PartialEq)]
enum StickerSource {
    Inline(Vec<u8>),
    File(PathBuf),
}

impl StickerSource {
    fn parse(src: &str) -> Result<Self, ResourceError> {
        let unsupported = || ResourceError::UnsupportedSource(short(src));
        if let Some(rest) = src.strip_prefix("data:") {
            let (meta, payload) = rest.split_once(',').ok_or_else(unsupported)?;
            if meta.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
                let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
                let bytes = STANDARD
                    .decode(compact)
                    .map_err(|e| ResourceError::Decode(e.to_string()))?;
                return Ok(Self::Inline(bytes));
            }
            return Ok(Self::Inline(payload.as_bytes().to_vec()));
        }
        if let Some(path) = src.strip_prefix("file://") {
            return Ok(Self::File(PathBuf::from(path)));
        }
        match src.split_once("://") {
            Some(_) => Err(unsupported()),
            None if src.is_empty() => Err(unsupported()),
            None => Ok(Self::File(PathBuf::from(src))),
        }
    }
}

/// Font files found on disk, keyed by normalized family and style.
#[derive(Debug, Default)]
struct FontFiles {
    files: HashMap<(String, bool, bool), PathBuf>,
}

impl FontFiles {
    fn for_family(&self, family: &str) -> Vec<(bool, bool, PathBuf)> {
        let mut faces: Vec<_> = self
            .files
            .iter()
            .filter(|((f, _, _), _)| f == family)
            .map(|((_, b, i), path)| (*b, *i, path.clone()))
            .collect();
        faces.sort();
        faces
    }

    fn regular(&self, family: &str) -> Option<PathBuf> {
        self.files.get(&(family.to_string(), false, false)).cloned()
    }
}

/// Split a font file stem like `OpenSans-BoldItalic` into a compact family
/// key (`opensans`) and its style flags.
fn parse_font_stem(stem: &str) -> (String, bool, bool) {
    let lower = stem.to_lowercase();
    let (base, style) = match lower.rsplit_once('-') {
        Some((base, style)) => (base.to_string(), style.to_string()),
        None => (lower.clone(), String::new()),
    };
    let (bold, italic) = match style.as_str() {
        "" | "regular" | "book" | "roman" => (false, false),
        "bold" => (true, false),
        "italic" | "oblique" => (false, true),
        "bolditalic" | "boldoblique" => (true, true),
        _ => return (compact(&lower), false, false),
    };
    (compact(&base), bold, italic)
}

fn compact(family: &str) -> String {
    family.chars().filter(|c| !c.is_whitespace() && *c != '_').collect()
}

fn scan_font_dirs(dirs: &[PathBuf], families: &[String]) -> FontFiles {
    let wanted: HashMap<String, &String> = families.iter().map(|f| (compact(f), f)).collect();
    let mut found = FontFiles::default();
    for dir in dirs {
        scan_dir(dir, 0, &wanted, &mut found);
    }
    found
}

fn scan_dir(dir: &Path, depth: usize, wanted: &HashMap<String, &String>, found: &mut FontFiles) {
    if depth > MAX_FONT_DIR_DEPTH {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            scan_dir(&path, depth + 1, wanted, found);
            continue;
        }
        let is_font = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| FONT_EXTENSIONS.contains(&e.to_lowercase().as_str()));
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if !is_font {
            continue;
        }
        let (key, bold, italic) = parse_font_stem(stem);
        if let Some(family) = wanted.get(&key) {
            found
                .files
                .entry(((*family).clone(), bold, italic))
                .or_insert(path);
        }
    }
}

/// Long data URLs are cut down for logs and errors.
fn short(resource: &str) -> String {
    const MAX: usize = 64;
    if resource.chars().count() <= MAX {
        resource.to_string()
    } else {
        let head: String = resource.chars().take(MAX).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{StickerLayer, TextLayer};

    const FIXTURE_FONT: &[u8] = include_bytes!("../tests/fixtures/DejaVuSans.ttf");

    fn png_bytes(rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba));
        let mut out = io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn text_layer(family: &str) -> Layer {
        Layer::Text(TextLayer {
            font_family: family.to_string(),
            ..Default::default()
        })
    }

    fn sticker_layer(src: &str) -> Layer {
        Layer::Sticker(StickerLayer {
            src: src.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn font_stems() {
        for (stem, expected) in [
            ("DejaVuSans", ("dejavusans", false, false)),
            ("DejaVuSans-Bold", ("dejavusans", true, false)),
            ("OpenSans-BoldItalic", ("opensans", true, true)),
            ("Roboto-Oblique", ("roboto", false, true)),
            ("Open_Sans-Regular", ("opensans", false, false)),
            ("Foo-Condensed", ("foo-condensed", false, false)),
        ] {
            let (family, bold, italic) = parse_font_stem(stem);
            assert_eq!((family.as_str(), bold, italic), expected, "stem {stem}");
        }
    }

    #[test]
    fn sticker_sources() {
        assert_eq!(
            StickerSource::parse("data:image/png;base64,aGk=").unwrap(),
            StickerSource::Inline(b"hi".to_vec())
        );
        assert_eq!(
            StickerSource::parse("data:text/plain,hi").unwrap(),
            StickerSource::Inline(b"hi".to_vec())
        );
        assert_eq!(
            StickerSource::parse("file:///tmp/a.png").unwrap(),
            StickerSource::File(PathBuf::from("/tmp/a.png"))
        );
        assert_eq!(
            StickerSource::parse("stickers/star.png").unwrap(),
            StickerSource::File(PathBuf::from("stickers/star.png"))
        );
        for bad in ["https://example.com/a.png", "", "data:nocomma"] {
            assert!(
                matches!(StickerSource::parse(bad), Err(ResourceError::UnsupportedSource(_))),
                "{bad:?} should be unsupported"
            );
        }
    }

    #[tokio::test]
    async fn resolves_fonts_and_stickers() {
        let dir = tempfile::tempdir().unwrap();
        let fonts = dir.path().join("fonts");
        fs::create_dir_all(fonts.join("nested")).unwrap();
        fs::write(fonts.join("nested/DejaVuSans.ttf"), FIXTURE_FONT).unwrap();
        fs::write(fonts.join("DejaVuSans-Bold.ttf"), FIXTURE_FONT).unwrap();

        let sticker_path = dir.path().join("star.png");
        fs::write(&sticker_path, png_bytes([255, 0, 0, 255])).unwrap();
        let inline = format!("data:image/png;base64,{}", STANDARD.encode(png_bytes([0, 0, 255, 128])));

        let layers = vec![
            text_layer("'DejaVu Sans', sans-serif"),
            sticker_layer(sticker_path.to_str().unwrap()),
            sticker_layer(&inline),
            sticker_layer("https://example.com/x.png"),
        ];
        let loader = ResourceLoader::new().with_font_dirs([fonts]);
        let resources = loader.resolve(&layers).await;

        assert!(resources.fonts.has_family("DejaVu Sans"));
        let bold = resources.fonts.resolve("DejaVu Sans", true, false).unwrap();
        assert!(!bold.synthetic_bold);
        assert_eq!(resources.sticker(sticker_path.to_str().unwrap()).unwrap().pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(resources.sticker(&inline).unwrap().pixel(1, 1), Some([0, 0, 255, 128]));

        let failed: Vec<&str> = resources.failures().iter().map(|(r, _)| r.as_str()).collect();
        assert_eq!(failed, vec!["https://example.com/x.png"]);
    }

    #[tokio::test]
    async fn missing_things_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ResourceLoader::new().with_font_dirs([dir.path().to_path_buf()]);
        let layers = vec![
            text_layer("Nonexistent"),
            sticker_layer(dir.path().join("absent.png").to_str().unwrap()),
            sticker_layer("data:image/png;base64,bm90IGFuIGltYWdl"),
        ];
        let resources = loader.resolve(&layers).await;

        let errors: Vec<&ResourceError> = resources.failures().iter().map(|(_, e)| e).collect();
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(errors.iter().any(|e| matches!(e, ResourceError::NoFont(_))));
        assert!(errors.iter().any(|e| matches!(e, ResourceError::Io { .. })));
        assert!(errors.iter().any(|e| matches!(e, ResourceError::Decode(_))));
        assert!(resources.fonts.is_empty());
    }

    #[tokio::test]
    async fn configured_fallback_font() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fallback.ttf");
        fs::write(&path, FIXTURE_FONT).unwrap();
        let loader = ResourceLoader::new()
            .with_font_dirs([dir.path().join("none")])
            .with_fallback_font(&path);
        let resources = loader.resolve(&[text_layer("Arial")]).await;
        assert!(resources.fonts.resolve("Arial", false, false).is_some());
    }

    #[tokio::test]
    async fn slow_loads_time_out() {
        let loader = ResourceLoader::new().with_timeout(Duration::from_millis(10));
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        };
        let err = loader.bounded("slow.png", slow).await.unwrap_err();
        assert!(matches!(err, ResourceError::Timeout { .. }), "{err}");
    }
}
