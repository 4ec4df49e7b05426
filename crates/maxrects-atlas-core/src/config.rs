use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{AtlasError, Result};

/// MaxRects free-rectangle choice heuristics.
///
/// Every heuristic scores each free rectangle against the request (and its flipped
/// orientation when flipping is allowed) and keeps the lowest score; ties fall to a
/// secondary score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Heuristic {
    /// Minimize the smaller leftover side; tie-break on the larger.
    #[serde(alias = "bssf")]
    BestShortSideFit,
    /// Minimize the larger leftover side; tie-break on the smaller.
    #[serde(alias = "blsf")]
    BestLongSideFit,
    /// Minimize wasted area; tie-break on the smaller leftover side.
    #[serde(alias = "baf")]
    BestAreaFit,
    /// Minimize the resulting top edge (`y + h`); tie-break on `x`.
    #[serde(alias = "bl")]
    BottomLeft,
    /// Maximize edge length shared with the bin border and placed rects.
    #[serde(alias = "cp")]
    ContactPoint,
}

impl Heuristic {
    pub const ALL: [Heuristic; 5] = [
        Heuristic::BestShortSideFit,
        Heuristic::BestLongSideFit,
        Heuristic::BestAreaFit,
        Heuristic::BottomLeft,
        Heuristic::ContactPoint,
    ];

    pub fn short_name(&self) -> &'static str {
        match self {
            Heuristic::BestShortSideFit => "bssf",
            Heuristic::BestLongSideFit => "blsf",
            Heuristic::BestAreaFit => "baf",
            Heuristic::BottomLeft => "bl",
            Heuristic::ContactPoint => "cp",
        }
    }
}

impl FromStr for Heuristic {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "baf" | "bestareafit" => Ok(Self::BestAreaFit),
            "bssf" | "bestshortsidefit" => Ok(Self::BestShortSideFit),
            "blsf" | "bestlongsidefit" => Ok(Self::BestLongSideFit),
            "bl" | "bottomleft" => Ok(Self::BottomLeft),
            "cp" | "contactpoint" => Ok(Self::ContactPoint),
            _ => Err(()),
        }
    }
}

/// Preset square texture sizes, `256 << n`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AtlasSizeType {
    Size256,
    Size512,
    Size1024,
    Size2048,
    Size4096,
    Size8192,
}

impl AtlasSizeType {
    pub fn to_size(self) -> u32 {
        256u32 << (self as u32)
    }
}

impl FromStr for AtlasSizeType {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let side = s.split('x').next().unwrap_or(s);
        match side.trim().parse::<u32>() {
            Ok(256) => Ok(Self::Size256),
            Ok(512) => Ok(Self::Size512),
            Ok(1024) => Ok(Self::Size1024),
            Ok(2048) => Ok(Self::Size2048),
            Ok(4096) => Ok(Self::Size4096),
            Ok(8192) => Ok(Self::Size8192),
            _ => Err(()),
        }
    }
}

/// How a dynamic atlas makes room once its bin is full.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum GrowthPolicy {
    /// Double the texture and extend the existing free rectangles into the new area.
    Expand,
    /// Split the added area into `cell_size` squares and pack them one at a time.
    /// Suited to glyph caches where fragmentation across a huge bin is costly.
    Cells { cell_size: u32 },
}

/// Offline atlas packing: the whole sprite list is known up front.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticAtlasConfig {
    /// First square size tried; doubled until everything fits.
    #[serde(default = "default_min_size")]
    pub min_size: u32,
    /// Largest acceptable square size.
    #[serde(default = "default_static_max_size")]
    pub max_size: u32,
    /// Pixels reserved to the right of and below every sprite.
    #[serde(default = "default_spacing")]
    pub space_between_sprites: u32,
    /// Edge pixels duplicated around sprites that opt in (sampling safety).
    #[serde(default = "default_spacing")]
    pub edge_pixel_padding: u32,
    /// Allow 90° rotation of sprites.
    #[serde(default)]
    pub allow_flip: bool,
    #[serde(default = "default_heuristic")]
    pub heuristic: Heuristic,
    /// Produce a box-filtered mip chain alongside the atlas.
    #[serde(default)]
    pub generate_mips: bool,
    /// Place sprites by global best score each round instead of input order.
    #[serde(default)]
    pub greedy_batch: bool,
}

impl Default for StaticAtlasConfig {
    fn default() -> Self {
        Self {
            min_size: default_min_size(),
            max_size: default_static_max_size(),
            space_between_sprites: default_spacing(),
            edge_pixel_padding: default_spacing(),
            allow_flip: false,
            heuristic: default_heuristic(),
            generate_mips: false,
            greedy_batch: false,
        }
    }
}

impl StaticAtlasConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if self.min_size == 0 || self.max_size == 0 {
            return Err(AtlasError::InvalidDimensions {
                width: self.min_size,
                height: self.max_size,
            });
        }
        if self.max_size < self.min_size {
            return Err(AtlasError::InvalidConfig(format!(
                "max_size ({}) is smaller than min_size ({})",
                self.max_size, self.min_size
            )));
        }
        let reserved = self
            .space_between_sprites
            .saturating_add(self.edge_pixel_padding.saturating_mul(2));
        if reserved >= self.max_size {
            return Err(AtlasError::InvalidConfig(format!(
                "space_between_sprites + 2 * edge_pixel_padding ({}) leaves no room in {}x{}",
                reserved, self.max_size, self.max_size
            )));
        }
        Ok(())
    }

    /// Create a fluent builder for `StaticAtlasConfig`.
    pub fn builder() -> StaticAtlasConfigBuilder {
        StaticAtlasConfigBuilder::new()
    }
}

/// Runtime atlas packing: sprites or glyphs arrive one at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicAtlasConfig {
    /// Starting square size.
    #[serde(default = "default_initial_size")]
    pub initial_size: u32,
    /// Growth beyond this fails with `OutOfSpace`.
    #[serde(default = "default_dynamic_max_size")]
    pub max_size: u32,
    /// Growth beyond this logs a warning.
    #[serde(default = "default_warning_size")]
    pub warning_size: u32,
    /// Pixels reserved on every side of each entry; filled with edge pixels when
    /// pixel data is stored.
    #[serde(default = "default_spacing")]
    pub padding: u32,
    #[serde(default = "default_heuristic")]
    pub heuristic: Heuristic,
    #[serde(default = "default_growth")]
    pub growth: GrowthPolicy,
}

impl Default for DynamicAtlasConfig {
    fn default() -> Self {
        Self {
            initial_size: default_initial_size(),
            max_size: default_dynamic_max_size(),
            warning_size: default_warning_size(),
            padding: default_spacing(),
            heuristic: default_heuristic(),
            growth: default_growth(),
        }
    }
}

impl DynamicAtlasConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - sizes are zero or `max_size < initial_size`
    /// - a cell growth policy uses a zero cell or one that does not tile `initial_size`
    pub fn validate(&self) -> Result<()> {
        if self.initial_size == 0 || self.max_size == 0 {
            return Err(AtlasError::InvalidDimensions {
                width: self.initial_size,
                height: self.max_size,
            });
        }
        if self.max_size < self.initial_size {
            return Err(AtlasError::InvalidConfig(format!(
                "max_size ({}) is smaller than initial_size ({})",
                self.max_size, self.initial_size
            )));
        }
        if self.padding.saturating_mul(2) >= self.initial_size {
            return Err(AtlasError::InvalidConfig(format!(
                "padding ({}) * 2 exceeds initial_size ({})",
                self.padding, self.initial_size
            )));
        }
        if let GrowthPolicy::Cells { cell_size } = self.growth {
            if cell_size == 0 || cell_size > self.initial_size || self.initial_size % cell_size != 0
            {
                return Err(AtlasError::InvalidConfig(format!(
                    "cell_size ({}) must be non-zero and tile initial_size ({})",
                    cell_size, self.initial_size
                )));
            }
        }
        Ok(())
    }

    /// Create a fluent builder for `DynamicAtlasConfig`.
    pub fn builder() -> DynamicAtlasConfigBuilder {
        DynamicAtlasConfigBuilder::new()
    }
}

fn default_min_size() -> u32 {
    16
}
fn default_static_max_size() -> u32 {
    4096
}
fn default_spacing() -> u32 {
    2
}
fn default_heuristic() -> Heuristic {
    Heuristic::BestAreaFit
}
fn default_initial_size() -> u32 {
    AtlasSizeType::Size256.to_size()
}
fn default_dynamic_max_size() -> u32 {
    AtlasSizeType::Size8192.to_size()
}
fn default_warning_size() -> u32 {
    AtlasSizeType::Size4096.to_size()
}
fn default_growth() -> GrowthPolicy {
    GrowthPolicy::Expand
}

/// Builder for `StaticAtlasConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct StaticAtlasConfigBuilder {
    cfg: StaticAtlasConfig,
}

impl StaticAtlasConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: StaticAtlasConfig::default(),
        }
    }
    pub fn size_range(mut self, min: u32, max: u32) -> Self {
        self.cfg.min_size = min;
        self.cfg.max_size = max;
        self
    }
    pub fn space_between_sprites(mut self, v: u32) -> Self {
        self.cfg.space_between_sprites = v;
        self
    }
    pub fn edge_pixel_padding(mut self, v: u32) -> Self {
        self.cfg.edge_pixel_padding = v;
        self
    }
    pub fn allow_flip(mut self, v: bool) -> Self {
        self.cfg.allow_flip = v;
        self
    }
    pub fn heuristic(mut self, v: Heuristic) -> Self {
        self.cfg.heuristic = v;
        self
    }
    pub fn generate_mips(mut self, v: bool) -> Self {
        self.cfg.generate_mips = v;
        self
    }
    pub fn greedy_batch(mut self, v: bool) -> Self {
        self.cfg.greedy_batch = v;
        self
    }
    pub fn build(self) -> StaticAtlasConfig {
        self.cfg
    }
}

/// Builder for `DynamicAtlasConfig`.
#[derive(Debug, Default, Clone)]
pub struct DynamicAtlasConfigBuilder {
    cfg: DynamicAtlasConfig,
}

impl DynamicAtlasConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: DynamicAtlasConfig::default(),
        }
    }
    pub fn initial_size(mut self, v: u32) -> Self {
        self.cfg.initial_size = v;
        self
    }
    pub fn max_size(mut self, v: u32) -> Self {
        self.cfg.max_size = v;
        self
    }
    pub fn warning_size(mut self, v: u32) -> Self {
        self.cfg.warning_size = v;
        self
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.cfg.padding = v;
        self
    }
    pub fn heuristic(mut self, v: Heuristic) -> Self {
        self.cfg.heuristic = v;
        self
    }
    pub fn growth(mut self, v: GrowthPolicy) -> Self {
        self.cfg.growth = v;
        self
    }
    pub fn build(self) -> DynamicAtlasConfig {
        self.cfg
    }
}
