use crate::model::StaticLayout;
use serde_json::{Value, json};

/// Serialize a static layout as `{ frames: [...], meta }` (array-of-frames style).
///
/// Each frame carries its key, pixel rect, flip flag and normalized UVs.
pub fn layout_to_json<K: ToString>(layout: &StaticLayout<K>) -> Value {
    let frames: Vec<Value> = layout
        .placements
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let r = &p.rect;
            json!({
                "key": p.key.to_string(),
                "frame": {"x": r.x, "y": r.y, "w": r.w, "h": r.h},
                "flipped": p.flipped,
                "uv": layout.uv(i),
            })
        })
        .collect();
    json!({ "frames": frames, "meta": meta_json(layout) })
}

/// Same frames keyed by name: `{ frames: { key: {...} }, meta }`. Later duplicates win.
pub fn layout_to_json_hash<K: ToString>(layout: &StaticLayout<K>) -> Value {
    let mut frames = serde_json::Map::new();
    for (i, p) in layout.placements.iter().enumerate() {
        let r = &p.rect;
        frames.insert(
            p.key.to_string(),
            json!({
                "frame": {"x": r.x, "y": r.y, "w": r.w, "h": r.h},
                "flipped": p.flipped,
                "uv": layout.uv(i),
            }),
        );
    }
    json!({ "frames": frames, "meta": meta_json(layout) })
}

fn meta_json<K>(layout: &StaticLayout<K>) -> Value {
    json!({
        "app": "maxrects-atlas",
        "version": env!("CARGO_PKG_VERSION"),
        "size": {"w": layout.size, "h": layout.size},
        "occupancy": layout.occupancy,
        "heuristic": layout.heuristic,
    })
}
