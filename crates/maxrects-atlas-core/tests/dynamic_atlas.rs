use image::{Rgba, RgbaImage};
use maxrects_atlas_core::prelude::*;

fn expand_cfg(initial: u32, max: u32, padding: u32) -> DynamicAtlasConfig {
    DynamicAtlasConfig::builder()
        .initial_size(initial)
        .max_size(max)
        .padding(padding)
        .build()
}

#[test]
fn insert_strips_padding_and_reports_uv() {
    let mut atlas: DynamicAtlas<&str> = DynamicAtlas::new(expand_cfg(64, 256, 2)).unwrap();
    let ins = atlas.insert("a", 28, 28).unwrap();
    assert_eq!(ins.rect, Rect::new(2, 2, 28, 28));
    assert!(ins.growth.is_empty());
    assert!(!ins.cached);
    assert_eq!(ins.uv.u0, 2.0 / 64.0);
    assert_eq!(ins.uv.v1, 30.0 / 64.0);
    assert_eq!(atlas.len(), 1);
    assert!(atlas.contains(&"a"));
    assert!(atlas.texture().is_none());
}

#[test]
fn known_key_returns_cached_entry() {
    let mut atlas: DynamicAtlas<&str> = DynamicAtlas::new(expand_cfg(64, 256, 2)).unwrap();
    let first = atlas.insert("a", 10, 10).unwrap();
    let again = atlas.insert("a", 30, 30).unwrap();
    assert!(again.cached);
    assert_eq!(again.rect, first.rect);
    assert_eq!(atlas.len(), 1);
}

#[test]
fn growth_doubles_and_keeps_earlier_rects() {
    let mut atlas: DynamicAtlas<String> = DynamicAtlas::new(expand_cfg(64, 256, 2)).unwrap();
    let mut rects = Vec::new();
    for i in 0..4 {
        let ins = atlas.insert(format!("k{}", i), 28, 28).unwrap();
        assert!(ins.growth.is_empty());
        rects.push(ins.rect);
    }
    assert_eq!(atlas.occupancy(), 1.0);

    let ins = atlas.insert("k4".to_string(), 28, 28).unwrap();
    assert_eq!(
        ins.growth,
        vec![AtlasGrowth {
            old_size: 64,
            new_size: 128
        }]
    );
    assert_eq!(ins.growth[0].uv_scale(), 0.5);
    assert_eq!(atlas.size(), 128);
    for (i, r) in rects.iter().enumerate() {
        assert_eq!(atlas.get(&format!("k{}", i)), Some(*r));
    }
    let uv = atlas.uv(&"k0".to_string()).unwrap();
    assert_eq!(uv.u0, 2.0 / 128.0);
}

#[test]
fn growth_past_max_size_is_out_of_space() {
    let mut atlas: DynamicAtlas<u32> = DynamicAtlas::new(expand_cfg(64, 128, 2)).unwrap();
    for key in 0..16 {
        atlas.insert(key, 28, 28).unwrap();
    }
    assert_eq!(atlas.size(), 128);
    assert!(matches!(atlas.insert(16, 28, 28), Err(AtlasError::OutOfSpace)));
    assert!(matches!(atlas.insert(99, 200, 4), Err(AtlasError::OutOfSpace)));
    assert!(matches!(
        atlas.insert(100, 0, 4),
        Err(AtlasError::InvalidDimensions { .. })
    ));
    assert_eq!(atlas.len(), 16);
}

#[test]
fn cell_growth_uses_prepared_cells_before_doubling() {
    let cfg = DynamicAtlasConfig::builder()
        .initial_size(64)
        .max_size(128)
        .padding(0)
        .growth(GrowthPolicy::Cells { cell_size: 32 })
        .build();
    let mut atlas: DynamicAtlas<u32> = DynamicAtlas::new(cfg).unwrap();
    let mut rects = Vec::new();
    for key in 0..4 {
        let ins = atlas.insert(key, 32, 32).unwrap();
        assert!(ins.growth.is_empty());
        rects.push(ins.rect);
    }
    assert_eq!(
        rects,
        vec![
            Rect::new(0, 0, 32, 32),
            Rect::new(0, 32, 32, 32),
            Rect::new(32, 0, 32, 32),
            Rect::new(32, 32, 32, 32),
        ]
    );
    let ins = atlas.insert(4, 32, 32).unwrap();
    assert_eq!(ins.growth.len(), 1);
    assert_eq!(atlas.size(), 128);
    assert_eq!(ins.rect, Rect::new(0, 64, 32, 32));

    // a glyph larger than a cell can never fit
    assert!(matches!(atlas.insert(5, 40, 8), Err(AtlasError::OutOfSpace)));
}

#[test]
fn insert_image_writes_pixels_and_region() {
    let mut atlas: DynamicAtlas<&str> = DynamicAtlas::new(expand_cfg(64, 256, 2))
        .unwrap()
        .with_pixels();
    let red = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
    let (ins, region) = atlas.insert_image("red", &red).unwrap();
    assert_eq!(ins.rect, Rect::new(2, 2, 4, 4));
    assert_eq!(
        region,
        UpdateRegion {
            x: 0,
            y: 0,
            width: 8,
            height: 8
        }
    );
    let tex = atlas.texture().unwrap();
    assert_eq!(tex.dimensions(), (64, 64));
    assert_eq!(*tex.get_pixel(2, 2), Rgba([255, 0, 0, 255]));
    assert_eq!(*tex.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
    assert_eq!(*tex.get_pixel(8, 8), Rgba([0, 0, 0, 0]));

    let (again, region) = atlas.insert_image("red", &red).unwrap();
    assert!(again.cached);
    assert!(region.is_empty());
}

#[test]
fn texture_growth_preserves_pixels() {
    let mut atlas: DynamicAtlas<&str> = DynamicAtlas::new(expand_cfg(64, 256, 2)).unwrap();
    let red = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
    atlas.insert_image("red", &red).unwrap();
    let blue = RgbaImage::from_pixel(60, 60, Rgba([0, 0, 255, 255]));
    let (ins, region) = atlas.insert_image("blue", &blue).unwrap();
    assert_eq!(ins.growth.len(), 1);
    assert_eq!(region.area(), 64 * 64);
    let tex = atlas.texture().unwrap();
    assert_eq!(tex.dimensions(), (128, 128));
    assert_eq!(*tex.get_pixel(2, 2), Rgba([255, 0, 0, 255]));
    let r = ins.rect;
    assert_eq!(*tex.get_pixel(r.x, r.y), Rgba([0, 0, 255, 255]));
}

#[test]
fn glyph_coverage_becomes_white_alpha() {
    let mut atlas: DynamicAtlas<char> = DynamicAtlas::new(expand_cfg(64, 256, 0)).unwrap();
    let coverage = [0u8, 50, 100, 150, 200, 255];
    let (ins, region) = atlas.insert_glyph('g', 3, 2, &coverage).unwrap();
    assert_eq!(UpdateRegion::from(ins.rect), region);
    let tex = atlas.texture().unwrap();
    let r = ins.rect;
    assert_eq!(*tex.get_pixel(r.x + 1, r.y), Rgba([255, 255, 255, 50]));
    assert_eq!(*tex.get_pixel(r.x + 2, r.y + 1), Rgba([255, 255, 255, 255]));

    assert!(matches!(
        atlas.insert_glyph('h', 3, 3, &coverage),
        Err(AtlasError::InvalidInput(_))
    ));
    assert!(!atlas.contains(&'h'));
    let (cached, region) = atlas.insert_glyph('g', 3, 2, &coverage).unwrap();
    assert!(cached.cached);
    assert!(region.is_empty());
}

#[test]
fn invalid_config_is_rejected() {
    let cfg = DynamicAtlasConfig::builder()
        .initial_size(256)
        .growth(GrowthPolicy::Cells { cell_size: 48 })
        .build();
    assert!(matches!(
        DynamicAtlas::<u32>::new(cfg),
        Err(AtlasError::InvalidConfig(_))
    ));
    let cfg = DynamicAtlasConfig::builder()
        .initial_size(512)
        .max_size(256)
        .build();
    assert!(DynamicAtlas::<u32>::new(cfg).is_err());
}

#[test]
fn registry_creates_atlas_once_per_tag() {
    let mut reg: AtlasRegistry<&str, &str> =
        AtlasRegistry::new("main", expand_cfg(64, 256, 2)).unwrap();
    assert!(reg.is_empty());
    let first = reg.find_or_add("main").unwrap().insert("a", 10, 10).unwrap();
    let again = reg.find_or_add("main").unwrap().insert("a", 10, 10).unwrap();
    assert!(again.cached);
    assert_eq!(again.rect, first.rect);
    assert_eq!(reg.len(), 1);
    assert_eq!(reg.get(&"main").map(|a| a.len()), Some(1));
    assert!(reg.get(&"ui").is_none());
}

#[test]
fn registry_tags_are_independent() {
    let mut reg: AtlasRegistry = AtlasRegistry::with_default_tag(expand_cfg(64, 256, 2)).unwrap();
    assert_eq!(reg.default_tag(), DEFAULT_PACKING_TAG);
    let a = reg
        .find_or_add("main".to_string())
        .unwrap()
        .insert("icon".to_string(), 28, 28)
        .unwrap();
    let b = reg
        .find_or_add("ui".to_string())
        .unwrap()
        .insert("icon".to_string(), 28, 28)
        .unwrap();
    assert!(!b.cached);
    assert_eq!(a.rect, b.rect);
    for _ in 0..4 {
        let n = reg.get(&"ui".to_string()).unwrap().len();
        reg.get_mut(&"ui".to_string())
            .unwrap()
            .insert(format!("k{}", n), 28, 28)
            .unwrap();
    }
    assert_eq!(reg.get(&"ui".to_string()).unwrap().size(), 128);
    assert_eq!(reg.get(&"main".to_string()).unwrap().size(), 64);
    let mut tags: Vec<&String> = reg.tags().collect();
    tags.sort();
    assert_eq!(tags, ["main", "ui"]);
}

#[test]
fn registry_protects_default_tag_on_dispose() {
    let mut reg: AtlasRegistry<&str, u32> = AtlasRegistry::new("main", expand_cfg(64, 256, 2))
        .unwrap()
        .with_pixels();
    reg.find_or_add("main").unwrap();
    reg.find_or_add("fx").unwrap().insert(1, 8, 8).unwrap();
    assert!(reg.get(&"fx").unwrap().texture().is_some());

    assert!(!reg.dispose(&"main"));
    assert!(reg.get(&"main").is_some());
    assert!(reg.dispose(&"fx"));
    assert!(!reg.dispose(&"fx"));
    assert!(reg.get(&"fx").is_none());
    assert_eq!(reg.len(), 1);

    // a disposed tag starts over with an empty atlas
    assert!(reg.find_or_add("fx").unwrap().is_empty());

    reg.reset();
    assert!(reg.is_empty());
}

#[test]
fn registry_rejects_invalid_config() {
    let cfg = DynamicAtlasConfig::builder()
        .initial_size(512)
        .max_size(256)
        .build();
    assert!(AtlasRegistry::<&str, u32>::new("main", cfg).is_err());
}
