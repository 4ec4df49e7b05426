use maxrects_atlas_core::config::Heuristic;
use maxrects_atlas_core::model::Rect;
use maxrects_atlas_core::packer::MaxRectsBinPack;
use rand::{Rng, SeedableRng};

fn disjoint(rects: &[Rect]) -> bool {
    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            if rects[i].intersects(&rects[j]) {
                return false;
            }
        }
    }
    true
}

fn random_sizes(seed: u64, count: usize) -> Vec<(u32, u32)> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (rng.gen_range(4..=64), rng.gen_range(4..=64)))
        .collect()
}

#[test]
fn used_rects_disjoint_and_in_bounds_for_all_heuristics() {
    let sizes = random_sizes(42, 150);
    for heuristic in Heuristic::ALL {
        for allow_flip in [false, true] {
            let mut bin = MaxRectsBinPack::new(512, 384, allow_flip);
            for &(w, h) in &sizes {
                let r = bin.insert(w, h, heuristic);
                if !r.is_placed() {
                    continue;
                }
                assert!(r.right() <= 512 && r.bottom() <= 384, "{:?} out of bounds", r);
                if allow_flip {
                    assert!((r.w, r.h) == (w, h) || (r.w, r.h) == (h, w));
                } else {
                    assert_eq!((r.w, r.h), (w, h));
                }
            }
            let used = bin.used_rects();
            assert!(!used.is_empty());
            assert!(disjoint(used), "{:?} flip={} overlapped", heuristic, allow_flip);
        }
    }
}

#[test]
fn free_rects_never_cover_used_space() {
    let sizes = random_sizes(7, 80);
    for heuristic in Heuristic::ALL {
        let mut bin = MaxRectsBinPack::new(256, 256, true);
        for &(w, h) in &sizes {
            bin.insert(w, h, heuristic);
        }
        let bounds = Rect::new(0, 0, 256, 256);
        for fr in bin.free_rects() {
            assert!(bounds.contains(fr));
            for u in bin.used_rects() {
                assert!(!fr.intersects(u), "free {:?} overlaps used {:?}", fr, u);
            }
        }
        // no free rect is contained in another after pruning
        let free = bin.free_rects();
        for i in 0..free.len() {
            for j in 0..free.len() {
                if i != j {
                    assert!(!free[j].contains(&free[i]) || free[i] == free[j]);
                }
            }
        }
    }
}

#[test]
fn occupancy_matches_used_area() {
    let sizes = random_sizes(99, 60);
    let mut bin = MaxRectsBinPack::new(300, 200, false);
    for &(w, h) in &sizes {
        bin.insert(w, h, Heuristic::BestShortSideFit);
    }
    let used: u64 = bin.used_rects().iter().map(|r| r.area()).sum();
    let expected = used as f64 / (300.0 * 200.0);
    let occ = bin.occupancy();
    assert!((0.0..=1.0).contains(&occ));
    assert!((occ as f64 - expected).abs() < 1e-6);
    assert_eq!(bin.used_area(), used);
}

#[test]
fn placement_is_repeatable() {
    let sizes = random_sizes(1234, 120);
    let run = |heuristic| {
        let mut bin = MaxRectsBinPack::new(512, 512, true);
        sizes
            .iter()
            .map(|&(w, h)| bin.insert(w, h, heuristic))
            .collect::<Vec<_>>()
    };
    for heuristic in Heuristic::ALL {
        assert_eq!(run(heuristic), run(heuristic));
    }
}

#[test]
fn empty_bin_has_zero_occupancy() {
    let bin = MaxRectsBinPack::new(0, 0, false);
    assert_eq!(bin.occupancy(), 0.0);
    assert!(bin.free_rects().is_empty());

    let mut bin = MaxRectsBinPack::new(64, 64, false);
    assert_eq!(bin.occupancy(), 0.0);
    assert_eq!(bin.free_rects(), &[Rect::new(0, 0, 64, 64)]);
    bin.insert(8, 8, Heuristic::BestAreaFit);
    bin.init(32, 32, true);
    assert!(bin.used_rects().is_empty());
    assert_eq!(bin.bin_width(), 32);
    assert!(bin.allow_flip());
}
