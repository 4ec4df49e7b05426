use crate::config::Heuristic;
use crate::error::{AtlasError, Result};
use crate::model::{Rect, RectSize};
use tracing::{debug, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Lexicographic (primary, secondary) placement score; lower is better.
type Score = (i64, i64);

/// MAXRECTS bin: a list of possibly overlapping maximal free rectangles and a list
/// of placed (used) rectangles that never overlap.
///
/// All operations are synchronous and bounded by O(n²) in the size of the free list.
#[derive(Debug, Clone, Default)]
pub struct MaxRectsBinPack {
    bin_width: u32,
    bin_height: u32,
    allow_flip: bool,
    free: Vec<Rect>,
    used: Vec<Rect>,
}

impl MaxRectsBinPack {
    pub fn new(width: u32, height: u32, allow_flip: bool) -> Self {
        let mut bin = Self::default();
        bin.init(width, height, allow_flip);
        bin
    }

    /// Reset to an empty `width x height` bin.
    pub fn init(&mut self, width: u32, height: u32, allow_flip: bool) {
        self.bin_width = width;
        self.bin_height = height;
        self.allow_flip = allow_flip;
        self.used.clear();
        self.free.clear();
        if width > 0 && height > 0 {
            self.free.push(Rect::new(0, 0, width, height));
        }
    }

    pub fn bin_width(&self) -> u32 {
        self.bin_width
    }
    pub fn bin_height(&self) -> u32 {
        self.bin_height
    }
    pub fn allow_flip(&self) -> bool {
        self.allow_flip
    }
    pub fn free_rects(&self) -> &[Rect] {
        &self.free
    }
    pub fn used_rects(&self) -> &[Rect] {
        &self.used
    }

    /// Place a single `w x h` rectangle.
    ///
    /// Returns the placed rectangle (its `w,h` are swapped if it was flipped), or a
    /// rectangle with `h == 0` if the request fits nowhere. Zero-sized requests never
    /// place.
    pub fn insert(&mut self, w: u32, h: u32, heuristic: Heuristic) -> Rect {
        match self.find_position(w, h, heuristic) {
            Some((node, _)) => {
                self.place_rect(&node);
                trace!(?node, ?heuristic, "placed");
                node
            }
            None => Rect::default(),
        }
    }

    /// [`insert`](Self::insert) with the sentinel mapped to `None`.
    pub fn try_insert(&mut self, w: u32, h: u32, heuristic: Heuristic) -> Option<Rect> {
        let r = self.insert(w, h, heuristic);
        r.is_placed().then_some(r)
    }

    /// Place a batch greedily: every round re-scores all remaining requests and places
    /// the globally best one (lowest request index on ties), until everything is
    /// placed or nothing remaining fits.
    ///
    /// Returns `(request index, placed rect)` pairs in placement order; indices absent
    /// from the result did not fit.
    pub fn insert_batch(&mut self, requests: &[RectSize], heuristic: Heuristic) -> Vec<(usize, Rect)> {
        let mut remaining: Vec<usize> = (0..requests.len()).collect();
        let mut placed = Vec::with_capacity(requests.len());
        while !remaining.is_empty() {
            let Some((slot, node)) = self.best_of(requests, &remaining, heuristic) else {
                break;
            };
            self.place_rect(&node);
            placed.push((remaining[slot], node));
            remaining.remove(slot);
        }
        if !remaining.is_empty() {
            debug!(
                placed = placed.len(),
                unplaced = remaining.len(),
                "batch insert left requests unplaced"
            );
        }
        placed
    }

    #[cfg(not(feature = "parallel"))]
    fn best_of(&self, requests: &[RectSize], remaining: &[usize], heuristic: Heuristic) -> Option<(usize, Rect)> {
        remaining
            .iter()
            .enumerate()
            .filter_map(|(slot, &i)| {
                let req = requests[i];
                self.find_position(req.w, req.h, heuristic)
                    .map(|(node, score)| (score, slot, node))
            })
            .min_by_key(|(score, slot, _)| (*score, *slot))
            .map(|(_, slot, node)| (slot, node))
    }

    #[cfg(feature = "parallel")]
    fn best_of(&self, requests: &[RectSize], remaining: &[usize], heuristic: Heuristic) -> Option<(usize, Rect)> {
        remaining
            .par_iter()
            .enumerate()
            .filter_map(|(slot, &i)| {
                let req = requests[i];
                self.find_position(req.w, req.h, heuristic)
                    .map(|(node, score)| (score, slot, node))
            })
            .min_by_key(|(score, slot, _)| (*score, *slot))
            .map(|(_, slot, node)| (slot, node))
    }

    /// Grow the bin to `new_width x new_height` without moving placed rectangles.
    ///
    /// Free rectangles touching the old right/bottom edges are stretched into the new
    /// area; placed rectangles touching those edges seed new free strips. Returns
    /// `false` (and changes nothing) if either dimension would shrink.
    pub fn expand_size(&mut self, new_width: u32, new_height: u32) -> bool {
        if self.bin_width > new_width || self.bin_height > new_height {
            debug!(
                from = ?(self.bin_width, self.bin_height),
                to = ?(new_width, new_height),
                "expand_size ignored: new size is smaller"
            );
            return false;
        }
        let (old_w, old_h) = (self.bin_width, self.bin_height);
        if old_w == 0 || old_h == 0 {
            // nothing could have been placed in an empty-area bin
            self.init(new_width, new_height, self.allow_flip);
            return true;
        }
        let extra_w = new_width - old_w;
        let extra_h = new_height - old_h;

        for fr in self.free.iter_mut() {
            if fr.right() == old_w {
                fr.w += extra_w;
            }
            if fr.bottom() == old_h {
                fr.h += extra_h;
            }
        }

        for u in &self.used {
            let touch_right = u.right() == old_w;
            let touch_bottom = u.bottom() == old_h;
            match (touch_right, touch_bottom) {
                // corner: the longer side's strip also spans the new corner block
                (true, true) if u.w > u.h => {
                    self.free.push(Rect::new(old_w, u.y, extra_w, u.h));
                    self.free.push(Rect::new(u.x, old_h, u.w + extra_w, extra_h));
                }
                (true, true) => {
                    self.free.push(Rect::new(u.x, old_h, u.w, extra_h));
                    self.free.push(Rect::new(old_w, u.y, extra_w, u.h + extra_h));
                }
                (true, false) => self.free.push(Rect::new(old_w, u.y, extra_w, u.h)),
                (false, true) => self.free.push(Rect::new(u.x, old_h, u.w, extra_h)),
                (false, false) => {}
            }
        }
        self.free.retain(|r| r.w > 0 && r.h > 0);

        self.bin_width = new_width;
        self.bin_height = new_height;
        self.prune_free_list();
        debug!(
            from = ?(old_w, old_h),
            to = ?(new_width, new_height),
            free = self.free.len(),
            "bin expanded"
        );
        true
    }

    /// Prepare growth to `new_width x new_height` as a stack of `cell_size` squares
    /// covering the added area (right of the old width at full new height, then below
    /// the old height). Pop cells from the back: the last one is nearest the origin.
    ///
    /// The bin dimensions are updated but no free rectangle is added; feed cells back
    /// through [`restart_in`](Self::restart_in). With `reset`, free and used lists are
    /// cleared first. Returns an empty stack if either dimension would shrink.
    pub fn prepare_cell_expansion(
        &mut self,
        new_width: u32,
        new_height: u32,
        cell_size: u32,
        reset: bool,
    ) -> Result<Vec<Rect>> {
        if cell_size == 0 {
            return Err(AtlasError::InvalidInput("cell_size must be non-zero".into()));
        }
        if self.bin_width > new_width || self.bin_height > new_height {
            return Ok(Vec::new());
        }
        if reset {
            self.free.clear();
            self.used.clear();
        }
        let (old_w, old_h) = (self.bin_width, self.bin_height);
        let mut cells = Vec::new();
        for x in cell_origins(old_w, new_width, cell_size) {
            for y in cell_origins(0, new_height, cell_size) {
                cells.push(Rect::new(x, y, cell_size, cell_size));
            }
        }
        for x in cell_origins(0, old_w, cell_size) {
            for y in cell_origins(old_h, new_height, cell_size) {
                cells.push(Rect::new(x, y, cell_size, cell_size));
            }
        }
        self.bin_width = new_width;
        self.bin_height = new_height;
        debug!(cells = cells.len(), cell_size, "prepared cell expansion");
        Ok(cells)
    }

    /// Forget placed rectangles and continue packing inside `rect` only.
    pub fn restart_in(&mut self, rect: Rect) {
        self.used.clear();
        self.free.clear();
        if rect.w > 0 && rect.h > 0 {
            self.free.push(rect);
        }
    }

    pub fn used_area(&self) -> u64 {
        self.used.iter().map(Rect::area).sum()
    }

    /// Ratio of used area to bin area, in `[0, 1]`.
    pub fn occupancy(&self) -> f32 {
        let total = (self.bin_width as u64) * (self.bin_height as u64);
        if total == 0 {
            return 0.0;
        }
        (self.used_area() as f64 / total as f64) as f32
    }

    fn find_position(&self, w: u32, h: u32, heuristic: Heuristic) -> Option<(Rect, Score)> {
        if w == 0 || h == 0 {
            return None;
        }
        let mut best: Option<(Rect, Score)> = None;
        for fr in &self.free {
            // upright
            if fr.w >= w && fr.h >= h {
                let s = self.score(fr, w, h, heuristic);
                if best.is_none_or(|(_, b)| s < b) {
                    best = Some((Rect::new(fr.x, fr.y, w, h), s));
                }
            }
            // flipped
            if self.allow_flip && fr.w >= h && fr.h >= w {
                let s = self.score(fr, h, w, heuristic);
                if best.is_none_or(|(_, b)| s < b) {
                    best = Some((Rect::new(fr.x, fr.y, h, w), s));
                }
            }
        }
        best
    }

    fn score(&self, fr: &Rect, w: u32, h: u32, heuristic: Heuristic) -> Score {
        let leftover_h = (fr.w - w) as i64;
        let leftover_v = (fr.h - h) as i64;
        let short_fit = leftover_h.min(leftover_v);
        let long_fit = leftover_h.max(leftover_v);
        match heuristic {
            Heuristic::BestShortSideFit => (short_fit, long_fit),
            Heuristic::BestLongSideFit => (long_fit, short_fit),
            Heuristic::BestAreaFit => (fr.area() as i64 - (w as i64) * (h as i64), short_fit),
            Heuristic::BottomLeft => ((fr.y + h) as i64, fr.x as i64),
            // bigger contact is better; negate for minimization
            Heuristic::ContactPoint => (-(self.contact_point_score(fr.x, fr.y, w, h) as i64), 0),
        }
    }

    fn contact_point_score(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        let node = Rect::new(x, y, w, h);
        let mut score = 0u64;
        if node.x == 0 || node.right() == self.bin_width {
            score += node.h as u64;
        }
        if node.y == 0 || node.bottom() == self.bin_height {
            score += node.w as u64;
        }
        for u in &self.used {
            if u.x == node.right() || u.right() == node.x {
                score += overlap_1d(u.y, u.bottom(), node.y, node.bottom()) as u64;
            }
            if u.y == node.bottom() || u.bottom() == node.y {
                score += overlap_1d(u.x, u.right(), node.x, node.right()) as u64;
            }
        }
        score
    }

    fn place_rect(&mut self, node: &Rect) {
        let mut next: Vec<Rect> = Vec::with_capacity(self.free.len() + 4);
        for fr in &self.free {
            if fr.intersects(node) {
                split_free_node(fr, node, &mut next);
            } else {
                next.push(*fr);
            }
        }
        self.free = next;
        self.prune_free_list();
        self.used.push(*node);
    }

    /// Drop every free rectangle contained in another one.
    fn prune_free_list(&mut self) {
        let mut i = 0;
        while i < self.free.len() {
            let a = self.free[i];
            let mut remove_i = false;
            let mut j = i + 1;
            while j < self.free.len() {
                let b = self.free[j];
                if b.contains(&a) {
                    remove_i = true;
                    break;
                }
                if a.contains(&b) {
                    self.free.remove(j);
                    continue;
                }
                j += 1;
            }
            if remove_i {
                self.free.remove(i);
            } else {
                i += 1;
            }
        }
    }
}

/// Split `fr` (known to intersect `node`) into the up-to-four maximal pieces left
/// uncovered along `node`'s edges.
fn split_free_node(fr: &Rect, node: &Rect, out: &mut Vec<Rect>) {
    // top
    if node.y > fr.y && node.y < fr.bottom() {
        out.push(Rect::new(fr.x, fr.y, fr.w, node.y - fr.y));
    }
    // bottom
    if node.bottom() < fr.bottom() {
        out.push(Rect::new(fr.x, node.bottom(), fr.w, fr.bottom() - node.bottom()));
    }
    // left
    if node.x > fr.x && node.x < fr.right() {
        out.push(Rect::new(fr.x, fr.y, node.x - fr.x, fr.h));
    }
    // right
    if node.right() < fr.right() {
        out.push(Rect::new(node.right(), fr.y, fr.right() - node.right(), fr.h));
    }
}

fn overlap_1d(a1: u32, a2: u32, b1: u32, b2: u32) -> u32 {
    let start = a1.max(b1);
    let end = a2.min(b2);
    end.saturating_sub(start)
}

/// Cell origins in `[lo, end)`, descending from `end - cell` while `>= lo`.
fn cell_origins(lo: u32, end: u32, cell: u32) -> impl Iterator<Item = u32> {
    let start = end.checked_sub(cell).filter(|s| *s >= lo);
    std::iter::successors(start, move |v| v.checked_sub(cell).filter(|n| *n >= lo))
}
