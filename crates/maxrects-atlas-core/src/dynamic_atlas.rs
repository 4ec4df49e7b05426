use crate::compositing::{blit_rgba, coverage_to_rgba, grow_texture};
use crate::config::{DynamicAtlasConfig, GrowthPolicy};
use crate::error::{AtlasError, Result};
use crate::model::{AtlasGrowth, Rect, UpdateRegion, UvRect};
use crate::packer::MaxRectsBinPack;
use image::{Rgba, RgbaImage};
use std::collections::HashMap;
use std::hash::Hash;
use tracing::{info, warn};

/// Outcome of inserting into a [`DynamicAtlas`].
#[derive(Debug, Clone, PartialEq)]
pub struct Insertion {
    /// Content rect (padding stripped) in texture pixels.
    pub rect: Rect,
    /// `rect` normalized against the texture size after any growth.
    pub uv: UvRect,
    /// Texture growths performed to make room, oldest first. UVs issued before this
    /// insert must be scaled by each growth's [`AtlasGrowth::uv_scale`].
    pub growth: Vec<AtlasGrowth>,
    /// True if `key` was already present and nothing was placed.
    pub cached: bool,
}

/// Keyed, growable square atlas for content that arrives at runtime (sprites, glyphs).
///
/// Entries are never evicted; the texture only grows. Pixel storage is optional, see
/// [`with_pixels`](Self::with_pixels).
pub struct DynamicAtlas<K = String> {
    cfg: DynamicAtlasConfig,
    bin: MaxRectsBinPack,
    size: u32,
    // cells still to be packed, consumed from the back
    pending_cells: Vec<Rect>,
    entries: HashMap<K, Rect>,
    reserved_area: u64,
    texture: Option<RgbaImage>,
    background_color: Rgba<u8>,
}

impl<K: Eq + Hash + Clone> DynamicAtlas<K> {
    pub fn new(cfg: DynamicAtlasConfig) -> Result<Self> {
        cfg.validate()?;
        let size = cfg.initial_size;
        let (bin, pending_cells) = match cfg.growth {
            GrowthPolicy::Expand => (MaxRectsBinPack::new(size, size, false), Vec::new()),
            GrowthPolicy::Cells { cell_size } => {
                let mut bin = MaxRectsBinPack::new(cell_size, cell_size, false);
                let cells = bin.prepare_cell_expansion(size, size, cell_size, false)?;
                (bin, cells)
            }
        };
        Ok(Self {
            cfg,
            bin,
            size,
            pending_cells,
            entries: HashMap::new(),
            reserved_area: 0,
            texture: None,
            background_color: Rgba([0, 0, 0, 0]),
        })
    }

    /// Keep an RGBA texture in sync with placements.
    pub fn with_pixels(mut self) -> Self {
        self.ensure_texture();
        self
    }

    /// Set the color of unused texels (transparent by default).
    pub fn with_background_color(mut self, color: Rgba<u8>) -> Self {
        self.background_color = color;
        if self.texture.is_some() {
            self.texture = Some(RgbaImage::from_pixel(self.size, self.size, color));
        }
        self
    }

    /// Reserve space for `key` (`w x h` content). Returns the cached entry if the key is
    /// already present; grows the texture as needed.
    pub fn insert(&mut self, key: K, w: u32, h: u32) -> Result<Insertion> {
        if let Some(rect) = self.entries.get(&key) {
            return Ok(self.cached(*rect));
        }
        let (rect, growth) = self.reserve(w, h)?;
        self.entries.insert(key, rect);
        Ok(Insertion {
            rect,
            uv: UvRect::from_rect(&rect, self.size),
            growth,
            cached: false,
        })
    }

    /// Insert and copy `image` into the texture, filling the padding ring with edge
    /// pixels. Returns the texture region that changed (empty when cached).
    pub fn insert_image(&mut self, key: K, image: &RgbaImage) -> Result<(Insertion, UpdateRegion)> {
        let (w, h) = image.dimensions();
        let insertion = self.insert(key, w, h)?;
        if insertion.cached {
            return Ok((insertion, UpdateRegion::default()));
        }
        self.ensure_texture();
        let pad = self.cfg.padding;
        let size = self.size;
        if let Some(texture) = self.texture.as_mut() {
            blit_rgba(image, texture, insertion.rect.x, insertion.rect.y, false, pad);
        }
        let r = insertion.rect;
        let x0 = r.x.saturating_sub(pad);
        let y0 = r.y.saturating_sub(pad);
        let region = UpdateRegion {
            x: x0,
            y: y0,
            width: (r.right() + pad).min(size) - x0,
            height: (r.bottom() + pad).min(size) - y0,
        };
        Ok((insertion, region))
    }

    /// Insert an 8-bit coverage bitmap (e.g. a rasterized glyph) as white + alpha.
    pub fn insert_glyph(
        &mut self,
        key: K,
        w: u32,
        h: u32,
        coverage: &[u8],
    ) -> Result<(Insertion, UpdateRegion)> {
        if let Some(rect) = self.entries.get(&key) {
            return Ok((self.cached(*rect), UpdateRegion::default()));
        }
        let rgba = coverage_to_rgba(w, h, coverage)?;
        self.insert_image(key, &rgba)
    }

    pub fn get(&self, key: &K) -> Option<Rect> {
        self.entries.get(key).copied()
    }

    /// Current UVs of `key` (always relative to the current texture size).
    pub fn uv(&self, key: &K) -> Option<UvRect> {
        self.entries
            .get(key)
            .map(|r| UvRect::from_rect(r, self.size))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Current texture side length.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn config(&self) -> &DynamicAtlasConfig {
        &self.cfg
    }

    pub fn texture(&self) -> Option<&RgbaImage> {
        self.texture.as_ref()
    }

    /// Reserved area (content + padding) over texture area.
    pub fn occupancy(&self) -> f32 {
        let total = (self.size as u64) * (self.size as u64);
        if total == 0 {
            return 0.0;
        }
        (self.reserved_area as f64 / total as f64) as f32
    }

    fn cached(&self, rect: Rect) -> Insertion {
        Insertion {
            rect,
            uv: UvRect::from_rect(&rect, self.size),
            growth: Vec::new(),
            cached: true,
        }
    }

    fn reserve(&mut self, w: u32, h: u32) -> Result<(Rect, Vec<AtlasGrowth>)> {
        if w == 0 || h == 0 {
            return Err(AtlasError::InvalidDimensions {
                width: w,
                height: h,
            });
        }
        let pad = self.cfg.padding;
        let rw = w.saturating_add(pad.saturating_mul(2));
        let rh = h.saturating_add(pad.saturating_mul(2));
        let limit = match self.cfg.growth {
            GrowthPolicy::Expand => self.cfg.max_size,
            GrowthPolicy::Cells { cell_size } => cell_size,
        };
        if rw > limit || rh > limit {
            return Err(AtlasError::OutOfSpace);
        }

        let mut growth = Vec::new();
        loop {
            if let Some(slot) = self.bin.try_insert(rw, rh, self.cfg.heuristic) {
                self.reserved_area += slot.area();
                return Ok((slot.inset(pad, pad * 2), growth));
            }
            if let Some(g) = self.grow()? {
                growth.push(g);
            }
        }
    }

    /// Make room once the bin is full. Returns the texture growth, if any (moving on to
    /// an already prepared cell does not grow the texture).
    fn grow(&mut self) -> Result<Option<AtlasGrowth>> {
        if let GrowthPolicy::Cells { .. } = self.cfg.growth {
            if let Some(cell) = self.pending_cells.pop() {
                self.bin.restart_in(cell);
                return Ok(None);
            }
        }

        let old_size = self.size;
        let new_size = old_size
            .checked_mul(2)
            .filter(|s| *s <= self.cfg.max_size)
            .ok_or(AtlasError::OutOfSpace)?;
        if new_size > self.cfg.warning_size {
            warn!(
                new_size,
                warning_size = self.cfg.warning_size,
                "atlas texture grows beyond the preferred maximum size"
            );
        }

        match self.cfg.growth {
            GrowthPolicy::Expand => {
                self.bin.expand_size(new_size, new_size);
            }
            GrowthPolicy::Cells { cell_size } => {
                self.pending_cells = self
                    .bin
                    .prepare_cell_expansion(new_size, new_size, cell_size, false)?;
                let cell = self.pending_cells.pop().ok_or(AtlasError::OutOfSpace)?;
                self.bin.restart_in(cell);
            }
        }

        if let Some(texture) = self.texture.as_ref() {
            self.texture = Some(grow_texture(texture, new_size, self.background_color));
        }
        self.size = new_size;
        info!(old_size, new_size, "atlas texture expanded");
        Ok(Some(AtlasGrowth { old_size, new_size }))
    }

    fn ensure_texture(&mut self) {
        if self.texture.is_none() {
            self.texture = Some(RgbaImage::from_pixel(
                self.size,
                self.size,
                self.background_color,
            ));
        }
    }
}
