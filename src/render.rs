use rayon::prelude::*;

use crate::cell::BACKGROUND;
use crate::engine::CellView;
use crate::error::{CpmError, CpmResult};
use crate::grid::{Lattice, LatticeRead};
use crate::rng::splitmix32;

const BACKGROUND_COLOR: [u8; 4] = [245, 245, 240, 255];
const CELL_EDGE: [u8; 4] = [30, 30, 30, 255];

// Field color stops
const FIELD_LOW: [u8; 4] = [12, 14, 40, 255];
const FIELD_MID: [u8; 4] = [180, 60, 90, 255];
const FIELD_HIGH: [u8; 4] = [250, 230, 120, 255];

#[inline]
fn lerp_color(a: [u8; 4], b: [u8; 4], t: f64) -> [u8; 4] {
    let t = t.clamp(0.0, 1.0);
    [
        (a[0] as f64 + (b[0] as f64 - a[0] as f64) * t).round() as u8,
        (a[1] as f64 + (b[1] as f64 - a[1] as f64) * t).round() as u8,
        (a[2] as f64 + (b[2] as f64 - a[2] as f64) * t).round() as u8,
        255,
    ]
}

fn plane_extents(lattice: &Lattice) -> CpmResult<(usize, usize)> {
    if lattice.ndim() != 2 {
        return Err(CpmError::Capability {
            constraint: "render",
            capability: "a 2D lattice",
        });
    }
    Ok((lattice.extents()[0], lattice.extents()[1]))
}

/// Base color for a cell kind.
fn kind_color(kind: usize) -> [u8; 4] {
    let h = splitmix32(kind as u32 * 7 + 123);
    [
        (h & 0xFF) as u8 | 60,
        ((h >> 8) & 0xFF) as u8 | 60,
        ((h >> 16) & 0xFF) as u8 | 60,
        255,
    ]
}

/// Render cells colored by kind, with a small shade shift per id so
/// neighbouring cells of one kind stay distinguishable. Pixels touching
/// another identity are drawn as edges.
pub fn render_cells(view: &CellView<'_>) -> CpmResult<Vec<u8>> {
    let lattice = view.lattice();
    let (w, h) = plane_extents(lattice)?;
    let n_kinds = view.cells.n_kinds();
    let colors: Vec<[u8; 4]> = (0..n_kinds).map(kind_color).collect();

    let mut rgba = vec![0u8; w * h * 4];
    rgba.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let i = y * w + x;
            let id = view.id_at(i);
            let color = if id == BACKGROUND {
                BACKGROUND_COLOR
            } else if lattice.neighbors(i).iter().any(|&n| view.id_at(n) != id) {
                CELL_EDGE
            } else {
                let base = colors[view.kind_of(id).min(n_kinds - 1)];
                let shade = splitmix32(id.wrapping_mul(13).wrapping_add(7));
                let offset = (shade & 0x1F) as i32 - 16;
                [
                    (base[0] as i32 + offset).clamp(0, 255) as u8,
                    (base[1] as i32 + offset).clamp(0, 255) as u8,
                    (base[2] as i32 + offset).clamp(0, 255) as u8,
                    255,
                ]
            };
            row[x * 4..x * 4 + 4].copy_from_slice(&color);
        }
    });
    Ok(rgba)
}

/// Render a real-valued 2D field, normalised to its own range.
pub fn render_field<F>(field: &F) -> CpmResult<Vec<u8>>
where
    F: LatticeRead<Value = f64> + Sync,
{
    let (w, h) = plane_extents(field.lattice())?;
    let n = w * h;
    let min_v = (0..n).map(|i| field.value(i)).fold(f64::INFINITY, f64::min);
    let max_v = (0..n).map(|i| field.value(i)).fold(f64::NEG_INFINITY, f64::max);
    let range = (max_v - min_v).max(1e-12);

    let mut rgba = vec![0u8; n * 4];
    rgba.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let t = (field.value(y * w + x) - min_v) / range;
            let color = if t < 0.5 {
                lerp_color(FIELD_LOW, FIELD_MID, t / 0.5)
            } else {
                lerp_color(FIELD_MID, FIELD_HIGH, (t - 0.5) / 0.5)
            };
            row[x * 4..x * 4 + 4].copy_from_slice(&color);
        }
    });
    Ok(rgba)
}
