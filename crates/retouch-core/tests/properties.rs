use retouch_core::filters::{self, SeededNoise};
use retouch_core::geometry::{self, CropRect, Orientation};
use retouch_core::{Adjustments, NamedFilter, Pipeline, RasterBuffer};

fn photo(width: u32, height: u32) -> RasterBuffer {
    let mut buf = RasterBuffer::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let r = ((x * 37 + y * 11) % 256) as u8;
            let g = ((x * 5 + y * 29) % 256) as u8;
            let b = ((x * y) % 256) as u8;
            buf.set_pixel(x, y, [r, g, b, 255 - (x % 16) as u8]);
        }
    }
    buf
}

type Filter = fn(&mut RasterBuffer, f32);

fn knob_filters() -> Vec<(&'static str, Filter)> {
    vec![
        ("temperature", filters::temperature as Filter),
        ("hue", filters::hue as Filter),
        ("exposure", filters::exposure as Filter),
        ("shadows", filters::shadows as Filter),
        ("highlights", filters::highlights as Filter),
        ("vibrance", filters::vibrance as Filter),
        ("clarity", filters::clarity as Filter),
        ("sharpness", filters::sharpness as Filter),
        ("blur", filters::blur as Filter),
        ("vignette", filters::vignette as Filter),
    ]
}

#[test]
fn every_filter_is_identity_at_neutral() {
    let original = photo(24, 18);
    for (name, filter) in knob_filters() {
        let mut buf = original.clone();
        filter(&mut buf, 0.0);
        assert_eq!(buf, original, "{name}(0) changed pixels");
    }

    let mut buf = original.clone();
    filters::noise(&mut buf, 0.0, &mut SeededNoise::new(5));
    assert_eq!(buf, original, "noise(0) changed pixels");

    let mut buf = original.clone();
    filters::named_filter(&mut buf, NamedFilter::None);
    filters::basic_adjust(&mut buf, 0.0, 0.0, 0.0, NamedFilter::None);
    assert_eq!(buf, original, "basic adjustments at neutral changed pixels");
}

#[test]
fn extreme_knobs_keep_buffer_intact() {
    let original = photo(16, 16);
    for (name, filter) in knob_filters() {
        for value in [
            -1e6,
            -100.0,
            100.0,
            1e6,
            f32::MAX,
            f32::MIN,
            f32::INFINITY,
            f32::NEG_INFINITY,
            f32::NAN,
        ] {
            let mut buf = original.clone();
            filter(&mut buf, value);
            assert_eq!(buf.data.len(), original.data.len(), "{name}({value})");
            let alpha_kept = buf
                .data
                .chunks_exact(4)
                .zip(original.data.chunks_exact(4))
                .all(|(a, b)| a[3] == b[3]);
            assert!(alpha_kept, "{name}({value}) modified alpha");
        }
    }

    for value in [f32::INFINITY, f32::NEG_INFINITY, f32::NAN] {
        let mut buf = original.clone();
        filters::noise(&mut buf, value, &mut SeededNoise::new(9));
        assert_eq!(buf.data.len(), original.data.len(), "noise({value})");
    }
}

#[test]
fn renders_do_not_accumulate() {
    let pipeline = Pipeline::new();
    let original = photo(40, 30);
    let a = Adjustments {
        brightness: 60.0,
        clarity: 50.0,
        ..Default::default()
    };
    let b = Adjustments {
        contrast: -30.0,
        temperature: 40.0,
        ..Default::default()
    };

    let _ = pipeline.render(&original, &a).unwrap();
    let after_a = pipeline.render(&original, &b).unwrap();
    let b_alone = Pipeline::new().render(&original, &b).unwrap();
    assert_eq!(after_a, b_alone);
}

#[test]
fn hue_full_turn_matches_zero() {
    let original = photo(20, 20);
    let mut turned = original.clone();
    filters::hue(&mut turned, 360.0);
    for (a, b) in turned.data.iter().zip(&original.data) {
        assert!((*a as i32 - *b as i32).abs() <= 1, "{a} vs {b}");
    }
}

#[test]
fn two_quarter_turns_restore_dimensions() {
    let original = photo(30, 20);
    let quarter = Orientation {
        rotation: 90.0,
        ..Default::default()
    };
    let once = geometry::transform(&original, quarter);
    assert_eq!((once.width, once.height), (20, 30));
    let twice = geometry::transform(&once, quarter);
    assert_eq!((twice.width, twice.height), (30, 20));
}

#[test]
fn crop_yields_requested_region() {
    let original = photo(200, 200);
    let cropped = geometry::crop(&original, CropRect::new(50.0, 50.0, 100.0, 100.0));
    assert_eq!((cropped.width, cropped.height), (100, 100));
    assert_eq!(cropped.pixel(0, 0), original.pixel(50, 50));
}

#[test]
fn solid_red_cools_by_thirty() {
    let original = RasterBuffer::filled(100, 100, [255, 0, 0, 255]);
    let adj = Adjustments {
        temperature: -100.0,
        ..Default::default()
    };
    let out = Pipeline::new().render(&original, &adj).unwrap();
    for pixel in out.data.chunks_exact(4) {
        assert_eq!(pixel, [225, 0, 30, 255]);
    }
}
