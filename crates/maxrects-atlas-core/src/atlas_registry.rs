use crate::config::DynamicAtlasConfig;
use crate::dynamic_atlas::DynamicAtlas;
use crate::error::Result;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::{info, warn};

/// Packing tag used by [`AtlasRegistry::with_default_tag`].
pub const DEFAULT_PACKING_TAG: &str = "main";

/// Dynamic atlases keyed by packing tag, created lazily with a shared config.
///
/// The default tag is never disposed; [`reset`](Self::reset) is the only way to drop it.
pub struct AtlasRegistry<Tag = String, K = String> {
    default_tag: Tag,
    cfg: DynamicAtlasConfig,
    pixels: bool,
    atlases: HashMap<Tag, DynamicAtlas<K>>,
}

impl<K: Eq + Hash + Clone> AtlasRegistry<String, K> {
    /// Registry whose protected tag is [`DEFAULT_PACKING_TAG`].
    pub fn with_default_tag(cfg: DynamicAtlasConfig) -> Result<Self> {
        Self::new(DEFAULT_PACKING_TAG.to_string(), cfg)
    }
}

impl<Tag, K> AtlasRegistry<Tag, K>
where
    Tag: Eq + Hash + Clone + Debug,
    K: Eq + Hash + Clone,
{
    pub fn new(default_tag: Tag, cfg: DynamicAtlasConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            default_tag,
            cfg,
            pixels: false,
            atlases: HashMap::new(),
        })
    }

    /// Atlases created from now on keep an RGBA texture.
    pub fn with_pixels(mut self) -> Self {
        self.pixels = true;
        self
    }

    /// Atlas for `tag`, created on first use.
    pub fn find_or_add(&mut self, tag: Tag) -> Result<&mut DynamicAtlas<K>> {
        use std::collections::hash_map::Entry;
        match self.atlases.entry(tag) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let mut atlas = DynamicAtlas::new(self.cfg.clone())?;
                if self.pixels {
                    atlas = atlas.with_pixels();
                }
                info!(tag = ?e.key(), size = atlas.size(), "atlas created");
                Ok(e.insert(atlas))
            }
        }
    }

    pub fn get(&self, tag: &Tag) -> Option<&DynamicAtlas<K>> {
        self.atlases.get(tag)
    }

    pub fn get_mut(&mut self, tag: &Tag) -> Option<&mut DynamicAtlas<K>> {
        self.atlases.get_mut(tag)
    }

    /// Drop the atlas for `tag`. Returns false if it does not exist or is the default.
    pub fn dispose(&mut self, tag: &Tag) -> bool {
        if *tag == self.default_tag {
            warn!(tag = ?tag, "default atlas cannot be disposed");
            return false;
        }
        let removed = self.atlases.remove(tag).is_some();
        if removed {
            info!(tag = ?tag, "atlas disposed");
        }
        removed
    }

    /// Drop every atlas, the default one included.
    pub fn reset(&mut self) {
        self.atlases.clear();
    }

    pub fn default_tag(&self) -> &Tag {
        &self.default_tag
    }

    pub fn config(&self) -> &DynamicAtlasConfig {
        &self.cfg
    }

    pub fn len(&self) -> usize {
        self.atlases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atlases.is_empty()
    }

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.atlases.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Tag, &DynamicAtlas<K>)> {
        self.atlases.iter()
    }
}
