use serde::{Deserialize, Serialize};

use crate::config::Heuristic;

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
///
/// A rectangle with `h == 0` is what [`MaxRectsBinPack::insert`](crate::MaxRectsBinPack::insert)
/// returns when a request does not fit.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Exclusive right edge (`x + w`).
    pub fn right(&self) -> u32 {
        self.x + self.w
    }
    /// Exclusive bottom edge (`y + h`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }
    pub fn area(&self) -> u64 {
        (self.w as u64) * (self.h as u64)
    }
    /// False for the "does not fit" sentinel.
    pub fn is_placed(&self) -> bool {
        self.h != 0
    }
    /// Returns true if `r` is fully inside `self`.
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
    /// Separating axis test; touching edges do not intersect.
    pub fn intersects(&self, r: &Rect) -> bool {
        !(r.x >= self.right() || r.right() <= self.x || r.y >= self.bottom() || r.bottom() <= self.y)
    }
    /// Shrink by `left_top` on the top/left side and `total` in size; used to strip
    /// spacing/padding reserved around a placed slot.
    pub fn inset(&self, left_top: u32, total: u32) -> Rect {
        Rect::new(
            self.x + left_top,
            self.y + left_top,
            self.w.saturating_sub(total),
            self.h.saturating_sub(total),
        )
    }
    pub fn size(&self) -> RectSize {
        RectSize::new(self.w, self.h)
    }
}

/// A rectangle to be placed (not yet positioned).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RectSize {
    pub w: u32,
    pub h: u32,
}

impl RectSize {
    pub fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }
    pub fn flipped(&self) -> Self {
        Self::new(self.h, self.w)
    }
}

impl From<(u32, u32)> for RectSize {
    fn from((w, h): (u32, u32)) -> Self {
        Self::new(w, h)
    }
}

/// Normalized texture coordinates of a rect within a square texture.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct UvRect {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl UvRect {
    pub fn from_rect(rect: &Rect, texture_size: u32) -> Self {
        if texture_size == 0 {
            return Self::default();
        }
        let inv = 1.0 / texture_size as f32;
        Self {
            u0: rect.x as f32 * inv,
            v0: rect.y as f32 * inv,
            u1: rect.right() as f32 * inv,
            v1: rect.bottom() as f32 * inv,
        }
    }
    /// Scale all coordinates, e.g. `0.5` after the texture doubled.
    pub fn scale(&self, factor: f32) -> Self {
        Self {
            u0: self.u0 * factor,
            v0: self.v0 * factor,
            u1: self.u1 * factor,
            v1: self.v1 * factor,
        }
    }
}

/// A keyed content rectangle inside an atlas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement<K = String> {
    pub key: K,
    /// Content rect, padding removed; `w,h` are post-flip sizes.
    pub rect: Rect,
    /// True if placed rotated 90° (width/height swapped).
    pub flipped: bool,
}

/// Result of packing a fixed sprite list into one square atlas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticLayout<K = String> {
    /// Side length of the square atlas texture.
    pub size: u32,
    /// Placements in input order.
    pub placements: Vec<Placement<K>>,
    /// Used area (including reserved spacing) over atlas area.
    pub occupancy: f32,
    pub heuristic: Heuristic,
}

impl<K> StaticLayout<K> {
    pub fn uv(&self, index: usize) -> Option<UvRect> {
        self.placements
            .get(index)
            .map(|p| UvRect::from_rect(&p.rect, self.size))
    }

    /// Sum of content areas over atlas area (spacing excluded).
    pub fn content_occupancy(&self) -> f64 {
        let total = (self.size as u64) * (self.size as u64);
        if total == 0 {
            return 0.0;
        }
        let used: u64 = self.placements.iter().map(|p| p.rect.area()).sum();
        used as f64 / total as f64
    }
}

/// Growth of a dynamic atlas texture from `old_size` to `new_size` (square sides).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AtlasGrowth {
    pub old_size: u32,
    pub new_size: u32,
}

impl AtlasGrowth {
    /// Factor to apply to previously issued UVs.
    pub fn uv_scale(&self) -> f32 {
        if self.new_size == 0 {
            return 1.0;
        }
        self.old_size as f32 / self.new_size as f32
    }
}

/// Region that needs to be updated on GPU texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl UpdateRegion {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Get the area of this region in pixels.
    pub fn area(&self) -> u64 {
        (self.width as u64) * (self.height as u64)
    }
}

impl From<Rect> for UpdateRegion {
    fn from(r: Rect) -> Self {
        Self {
            x: r.x,
            y: r.y,
            width: r.w,
            height: r.h,
        }
    }
}
