use std::path::PathBuf;

use retouch_core::RasterBuffer;
use retouch_core::geometry::CropRect;
use retouch_editor::{EditorConfig, EditorSession, ExportSettings};
use retouch_layers::{LayerPatch, NewLayer, ResourceLoader, Rgba};

fn config() -> EditorConfig {
    EditorConfig {
        export: ExportSettings::png(),
        noise_seed: Some(3),
        ..Default::default()
    }
}

fn fixture_font() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../retouch-layers/tests/fixtures/DejaVuSans.ttf")
}

fn offline_loader() -> ResourceLoader {
    ResourceLoader::new()
        .with_font_dirs(Vec::new())
        .with_fallback_font(fixture_font())
}

#[tokio::test]
async fn cooled_red_exports_shifted_color() {
    let mut session = EditorSession::new(RasterBuffer::filled(32, 32, [255, 0, 0, 255]), config());
    session.set_temperature(-100.0);

    let bytes = session.export_final(&offline_loader()).await.unwrap();
    let exported = RasterBuffer::decode(&bytes).unwrap();
    assert_eq!((exported.width, exported.height), (32, 32));
    for (x, y) in [(0, 0), (16, 16), (31, 31)] {
        assert_eq!(exported.pixel(x, y), Some([225, 0, 30, 255]), "pixel ({x}, {y})");
    }
}

#[tokio::test]
async fn crop_then_reset_restores_original() {
    let mut session = EditorSession::new(RasterBuffer::filled(200, 200, [90, 90, 90, 255]), config());
    session.crop(CropRect::new(50.0, 50.0, 100.0, 100.0));

    let cropped = RasterBuffer::decode(&session.export_final(&offline_loader()).await.unwrap()).unwrap();
    assert_eq!((cropped.width, cropped.height), (100, 100));

    session.reset();
    let restored = RasterBuffer::decode(&session.export_final(&offline_loader()).await.unwrap()).unwrap();
    assert_eq!((restored.width, restored.height), (200, 200));
}

#[tokio::test]
async fn text_stays_inside_its_box() {
    let mut session = EditorSession::new(RasterBuffer::filled(120, 120, [0, 0, 0, 255]), config());
    session.layers_mut().create(
        NewLayer::Text,
        LayerPatch {
            x: Some(10.0),
            y: Some(10.0),
            width: Some(50.0),
            height: Some(50.0),
            content: Some("A".into()),
            color: Some(Rgba::WHITE),
            ..Default::default()
        },
    );

    let bytes = session.export_final(&offline_loader()).await.unwrap();
    let flat = RasterBuffer::decode(&bytes).unwrap();

    let mut lit = 0;
    for y in 0..flat.height {
        for x in 0..flat.width {
            let p = flat.pixel(x, y).unwrap();
            if p[0] > 0 {
                lit += 1;
                assert!(
                    (10..60).contains(&x) && (10..60).contains(&y),
                    "glyph pixel ({x}, {y}) outside the layer box"
                );
            }
        }
    }
    assert!(lit > 20, "expected a rendered glyph, found {lit} lit pixels");
}

#[tokio::test]
async fn sticker_from_file_is_composited() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("star.png");
    image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 255, 0, 255]))
        .save(&path)
        .unwrap();

    let mut session = EditorSession::new(RasterBuffer::filled(40, 40, [0, 0, 255, 255]), config());
    let id = session.layers_mut().create(
        NewLayer::Sticker {
            src: path.display().to_string(),
        },
        LayerPatch {
            x: Some(0.0),
            y: Some(0.0),
            width: Some(20.0),
            height: Some(20.0),
            ..Default::default()
        },
    );
    // A second sticker that cannot be loaded is skipped, not fatal
    session.layers_mut().create(
        NewLayer::Sticker {
            src: dir.path().join("missing.png").display().to_string(),
        },
        LayerPatch::default(),
    );
    assert_eq!(session.layers().active(), session.layers().iter().last().map(|l| l.id()));
    assert!(session.layers().get(&id).is_some());

    let flat = RasterBuffer::decode(&session.export_final(&offline_loader()).await.unwrap()).unwrap();
    assert_eq!(flat.pixel(10, 10), Some([0, 255, 0, 255]));
    assert_eq!(flat.pixel(30, 30), Some([0, 0, 255, 255]));
}

#[tokio::test]
async fn layers_survive_preview_renders() {
    let mut session = EditorSession::new(RasterBuffer::filled(1000, 500, [10, 10, 10, 255]), config());
    session.layers_mut().create(NewLayer::Text, LayerPatch::default());
    session.set_brightness(20.0);
    assert!(session.render_preview_async().await.unwrap());

    let preview = &session.preview().unwrap().image;
    assert_eq!((preview.width, preview.height), (800, 400));
    assert_eq!(session.layers().len(), 1);
}
