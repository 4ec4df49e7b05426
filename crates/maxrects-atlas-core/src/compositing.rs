use crate::error::{AtlasError, Result};
use image::{Rgba, RgbaImage, imageops};

/// Blit the whole of `src` into `canvas` with its top-left at (dx, dy), optionally
/// rotated 90° clockwise, then duplicate the content's border pixels outward into a
/// ring `edge_padding` pixels wide (corners take the corner pixel).
///
/// Pixels falling outside `canvas` are skipped.
pub fn blit_rgba(
    src: &RgbaImage,
    canvas: &mut RgbaImage,
    dx: u32,
    dy: u32,
    flipped: bool,
    edge_padding: u32,
) {
    let (cw, ch) = canvas.dimensions();
    let (sw, sh) = src.dimensions();
    if sw == 0 || sh == 0 {
        return;
    }
    // rendered size differs when flipped
    let (rw, rh) = if flipped { (sh, sw) } else { (sw, sh) };

    for yy in 0..rh {
        for xx in 0..rw {
            let (ix, iy) = if flipped {
                (yy, sh - 1 - xx)
            } else {
                (xx, yy)
            };
            if dx + xx < cw && dy + yy < ch {
                canvas.put_pixel(dx + xx, dy + yy, *src.get_pixel(ix, iy));
            }
        }
    }

    if edge_padding > 0 {
        extrude_edges(canvas, dx, dy, rw, rh, edge_padding);
    }
}

/// Fill the ring around content rect (x, y, w, h) by clamping each ring pixel onto the
/// nearest content pixel.
fn extrude_edges(canvas: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, pad: u32) {
    let (cw, ch) = canvas.dimensions();
    let x0 = x.saturating_sub(pad);
    let y0 = y.saturating_sub(pad);
    let x1 = (x + w + pad).min(cw);
    let y1 = (y + h + pad).min(ch);
    let last_x = x + w - 1;
    let last_y = y + h - 1;
    for py in y0..y1 {
        for px in x0..x1 {
            let inside = px >= x && px <= last_x && py >= y && py <= last_y;
            if inside {
                continue;
            }
            let sx = px.clamp(x, last_x);
            let sy = py.clamp(y, last_y);
            if sx < cw && sy < ch {
                let p = *canvas.get_pixel(sx, sy);
                canvas.put_pixel(px, py, p);
            }
        }
    }
}

/// Expand an 8-bit coverage bitmap (e.g. a rendered glyph) into white RGBA with the
/// coverage as alpha.
pub fn coverage_to_rgba(w: u32, h: u32, coverage: &[u8]) -> Result<RgbaImage> {
    let expected = (w as usize) * (h as usize);
    if coverage.len() != expected {
        return Err(AtlasError::InvalidInput(format!(
            "coverage has {} bytes, expected {} for {}x{}",
            coverage.len(),
            expected,
            w,
            h
        )));
    }
    Ok(RgbaImage::from_fn(w, h, |x, y| {
        let a = coverage[(y as usize) * (w as usize) + x as usize];
        Rgba([255, 255, 255, a])
    }))
}

/// New `new_size x new_size` texture holding `old` in its top-left corner.
pub fn grow_texture(old: &RgbaImage, new_size: u32, background: Rgba<u8>) -> RgbaImage {
    let mut grown = RgbaImage::from_pixel(new_size, new_size, background);
    imageops::replace(&mut grown, old, 0, 0);
    grown
}

/// Successive 2x2 box-filter reductions of `base` (level 1 onward), stopping once a
/// side would reach zero.
pub fn build_mip_chain(base: &RgbaImage) -> Vec<RgbaImage> {
    let mut chain = Vec::new();
    let mut next = halve(base);
    while let Some(level) = next {
        next = halve(&level);
        chain.push(level);
    }
    chain
}

fn halve(prior: &RgbaImage) -> Option<RgbaImage> {
    let (pw, ph) = prior.dimensions();
    let (mw, mh) = (pw >> 1, ph >> 1);
    if mw == 0 || mh == 0 {
        return None;
    }
    Some(RgbaImage::from_fn(mw, mh, |x, y| {
        let mut total = [0u32; 4];
        for (ox, oy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            let p = prior.get_pixel(x * 2 + ox, y * 2 + oy);
            for (t, c) in total.iter_mut().zip(p.0) {
                *t += c as u32;
            }
        }
        Rgba(total.map(|t| (t >> 2) as u8))
    }))
}
