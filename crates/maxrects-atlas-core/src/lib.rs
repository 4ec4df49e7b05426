//! MaxRects rectangle bin packing and texture atlas building.
//!
//! - Packer: `MaxRectsBinPack` (BSSF/BLSF/BAF/BL/CP heuristics, optional 90° flips,
//!   greedy batch insert, in-place growth and glyph-cell growth)
//! - Static atlas: pack a known sprite list into the smallest power-of-two square
//! - Dynamic atlas: keyed runtime insertion that grows the texture on demand, plus a
//!   registry of such atlases keyed by packing tag
//! - Compositing helpers (edge-pixel padding, mip chain) and JSON export
//!
//! Quick example:
//! ```ignore
//! use maxrects_atlas_core::prelude::*;
//! # fn main() -> maxrects_atlas_core::Result<()> {
//! let mut bin = MaxRectsBinPack::new(256, 256, false);
//! let r = bin.insert(64, 32, Heuristic::BestAreaFit);
//! assert!(r.is_placed());
//!
//! let mut atlas: DynamicAtlas<&str> = DynamicAtlas::new(DynamicAtlasConfig::default())?;
//! let ins = atlas.insert("icon", 24, 24)?;
//! println!("{:?} {:?}", ins.rect, ins.uv);
//! # Ok(()) }
//! ```

pub mod atlas_registry;
pub mod compositing;
pub mod config;
pub mod dynamic_atlas;
pub mod error;
pub mod export;
pub mod model;
pub mod packer;
pub mod static_atlas;

pub use atlas_registry::*;
pub use config::*;
pub use dynamic_atlas::*;
pub use error::*;
pub use export::*;
pub use model::*;
pub use packer::*;
pub use static_atlas::*;

/// Convenience prelude for common types and functions.
/// Importing `maxrects_atlas_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::atlas_registry::{AtlasRegistry, DEFAULT_PACKING_TAG};
    pub use crate::config::{
        AtlasSizeType, DynamicAtlasConfig, GrowthPolicy, Heuristic, StaticAtlasConfig,
    };
    pub use crate::dynamic_atlas::{DynamicAtlas, Insertion};
    pub use crate::error::{AtlasError, Result};
    pub use crate::model::{
        AtlasGrowth, Placement, Rect, RectSize, StaticLayout, UpdateRegion, UvRect,
    };
    pub use crate::packer::MaxRectsBinPack;
    pub use crate::static_atlas::{
        SpriteImage, SpriteInput, StaticAtlas, build_static_atlas, compose_static_atlas,
        pack_static_layout,
    };
}
