use crate::compositing::{blit_rgba, build_mip_chain};
use crate::config::StaticAtlasConfig;
use crate::error::{AtlasError, Result};
use crate::model::{Placement, Rect, RectSize, StaticLayout};
use crate::packer::MaxRectsBinPack;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Sprite size request for offline packing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpriteInput<K = String> {
    pub key: K,
    pub w: u32,
    pub h: u32,
    /// Reserve and fill an edge-pixel ring around this sprite.
    #[serde(default = "default_edge_padding")]
    pub edge_padding: bool,
}

fn default_edge_padding() -> bool {
    true
}

impl<K> SpriteInput<K> {
    pub fn new(key: K, w: u32, h: u32) -> Self {
        Self {
            key,
            w,
            h,
            edge_padding: true,
        }
    }

    pub fn with_edge_padding(mut self, v: bool) -> Self {
        self.edge_padding = v;
        self
    }
}

/// Sprite with decoded pixels.
pub struct SpriteImage<K = String> {
    pub key: K,
    pub image: RgbaImage,
    pub edge_padding: bool,
}

/// Composed static atlas: layout, texture and optional mip levels (level 1 onward).
pub struct StaticAtlas<K = String> {
    pub layout: StaticLayout<K>,
    pub texture: RgbaImage,
    pub mips: Vec<RgbaImage>,
}

/// Pack `sprites` into the smallest square of side `min_size * 2^n` that holds all of
/// them, up to `max_size`.
///
/// Every sprite reserves `space_between_sprites` plus, when it opts into edge padding,
/// `edge_pixel_padding` on each side. Returned rects are content rects with that
/// reservation stripped.
#[instrument(skip_all, fields(sprites = sprites.len()))]
pub fn pack_static_layout<K: Clone>(
    sprites: &[SpriteInput<K>],
    cfg: &StaticAtlasConfig,
) -> Result<StaticLayout<K>> {
    cfg.validate()?;
    if sprites.is_empty() {
        return Err(AtlasError::Empty);
    }
    if let Some(i) = sprites.iter().position(|s| s.w == 0 || s.h == 0) {
        return Err(AtlasError::InvalidInput(format!(
            "sprite at index {} has zero size",
            i
        )));
    }

    let slots = sprites
        .iter()
        .map(|s| reserve(s, cfg))
        .collect::<Result<Vec<Reserved>>>()?;

    let mut size = cfg.min_size;
    while size <= cfg.max_size {
        if let Some(layout) = try_pack(sprites, &slots, cfg, size) {
            info!(
                size,
                occupancy = format!("{:.2}%", layout.occupancy * 100.0),
                "static atlas packed"
            );
            return Ok(layout);
        }
        debug!(size, "sprites do not fit, doubling");
        size = match size.checked_mul(2) {
            Some(s) => s,
            None => break,
        };
    }
    Err(AtlasError::AtlasTooLarge {
        required: size,
        max: cfg.max_size,
    })
}

/// Space one sprite takes in the bin: content offset (`edge`), total extra per axis
/// (`space`) and the padded request.
#[derive(Clone, Copy)]
struct Reserved {
    edge: u32,
    space: u32,
    request: RectSize,
}

fn reserve<K>(sprite: &SpriteInput<K>, cfg: &StaticAtlasConfig) -> Result<Reserved> {
    let edge = if sprite.edge_padding {
        cfg.edge_pixel_padding
    } else {
        0
    };
    let space = edge
        .checked_mul(2)
        .and_then(|e| e.checked_add(cfg.space_between_sprites));
    let padded = space.and_then(|space| {
        Some((space, sprite.w.checked_add(space)?, sprite.h.checked_add(space)?))
    });
    match padded {
        Some((space, w, h)) if w <= cfg.max_size && h <= cfg.max_size => Ok(Reserved {
            edge,
            space,
            request: RectSize::new(w, h),
        }),
        Some((_, w, h)) => Err(AtlasError::AtlasTooLarge {
            required: first_size_holding(cfg.min_size, w.max(h)),
            max: cfg.max_size,
        }),
        None => Err(AtlasError::AtlasTooLarge {
            required: u32::MAX,
            max: cfg.max_size,
        }),
    }
}

/// First `min_size * 2^n` that is at least `side`, saturating at `u32::MAX`.
fn first_size_holding(min_size: u32, side: u32) -> u32 {
    let mut size = min_size;
    while size < side {
        size = match size.checked_mul(2) {
            Some(s) => s,
            None => return u32::MAX,
        };
    }
    size
}

fn try_pack<K: Clone>(
    sprites: &[SpriteInput<K>],
    reserved: &[Reserved],
    cfg: &StaticAtlasConfig,
    size: u32,
) -> Option<StaticLayout<K>> {
    let mut bin = MaxRectsBinPack::new(size, size, cfg.allow_flip);
    let mut slots: Vec<Option<Rect>> = vec![None; sprites.len()];

    if cfg.greedy_batch {
        let requests: Vec<RectSize> = reserved.iter().map(|r| r.request).collect();
        for (i, slot) in bin.insert_batch(&requests, cfg.heuristic) {
            slots[i] = Some(slot);
        }
    } else {
        for (r, out) in reserved.iter().zip(slots.iter_mut()) {
            *out = Some(bin.try_insert(r.request.w, r.request.h, cfg.heuristic)?);
        }
    }

    let mut placements = Vec::with_capacity(sprites.len());
    for ((s, r), slot) in sprites.iter().zip(reserved).zip(slots) {
        let slot = slot?;
        placements.push(Placement {
            key: s.key.clone(),
            rect: slot.inset(r.edge, r.space),
            flipped: slot.w != r.request.w,
        });
    }
    Some(StaticLayout {
        size,
        placements,
        occupancy: bin.occupancy(),
        heuristic: cfg.heuristic,
    })
}

/// Render `images` (same order as the layout's placements) into a transparent
/// `size x size` texture, extruding edge pixels around sprites that opted in.
pub fn compose_static_atlas<K>(
    layout: &StaticLayout<K>,
    images: &[&RgbaImage],
    edge_padding: &[bool],
    cfg: &StaticAtlasConfig,
) -> Result<RgbaImage> {
    if images.len() != layout.placements.len() || edge_padding.len() != images.len() {
        return Err(AtlasError::InvalidInput(format!(
            "layout has {} placements but {} images / {} padding flags were given",
            layout.placements.len(),
            images.len(),
            edge_padding.len()
        )));
    }
    let mut canvas = RgbaImage::new(layout.size, layout.size);
    for (i, (p, img)) in layout.placements.iter().zip(images).enumerate() {
        let (iw, ih) = img.dimensions();
        let (pw, ph) = if p.flipped { (ih, iw) } else { (iw, ih) };
        if (pw, ph) != (p.rect.w, p.rect.h) {
            return Err(AtlasError::InvalidInput(format!(
                "image {} is {}x{} but its placement is {}x{}",
                i, iw, ih, p.rect.w, p.rect.h
            )));
        }
        let pad = if edge_padding[i] {
            cfg.edge_pixel_padding
        } else {
            0
        };
        blit_rgba(img, &mut canvas, p.rect.x, p.rect.y, p.flipped, pad);
    }
    Ok(canvas)
}

/// Pack, compose and (if configured) build mips in one go.
#[instrument(skip_all, fields(sprites = sprites.len()))]
pub fn build_static_atlas<K: Clone>(
    sprites: &[SpriteImage<K>],
    cfg: &StaticAtlasConfig,
) -> Result<StaticAtlas<K>> {
    let inputs: Vec<SpriteInput<K>> = sprites
        .iter()
        .map(|s| {
            let (w, h) = s.image.dimensions();
            SpriteInput::new(s.key.clone(), w, h).with_edge_padding(s.edge_padding)
        })
        .collect();
    let layout = pack_static_layout(&inputs, cfg)?;
    let images: Vec<&RgbaImage> = sprites.iter().map(|s| &s.image).collect();
    let flags: Vec<bool> = sprites.iter().map(|s| s.edge_padding).collect();
    let texture = compose_static_atlas(&layout, &images, &flags, cfg)?;
    let mips = if cfg.generate_mips {
        build_mip_chain(&texture)
    } else {
        Vec::new()
    };
    Ok(StaticAtlas {
        layout,
        texture,
        mips,
    })
}
