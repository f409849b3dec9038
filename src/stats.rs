//! Read-only summaries of the current cell layout.

use std::collections::BTreeMap;

use crate::cell::{BACKGROUND, CellId};
use crate::engine::CellView;
use crate::grid::{Grid, MAX_DIMS, Point};

/// Site indices of every live cell, keyed by id in ascending order.
pub fn pixels_by_cell(view: &CellView<'_>) -> BTreeMap<CellId, Vec<usize>> {
    let mut out: BTreeMap<CellId, Vec<usize>> = BTreeMap::new();
    for (i, id) in view.grid.pixels() {
        out.entry(id).or_default().push(i);
    }
    out
}

/// Lazy iterator over the sites owned by one cell.
/// A clone resumes from the same position.
#[derive(Clone, Debug)]
pub struct CellPixels<'a> {
    grid: &'a Grid<CellId>,
    id: CellId,
    next: usize,
}

impl Iterator for CellPixels<'_> {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        while self.next < self.grid.data.len() {
            let i = self.next;
            self.next += 1;
            if self.grid.data[i] == self.id {
                return Some(self.grid.lattice().point(i));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.grid.data.len() - self.next.min(self.grid.data.len())))
    }
}

/// Sites of `id` in index order. Background yields every empty site.
pub fn cell_pixels(grid: &Grid<CellId>, id: CellId) -> CellPixels<'_> {
    CellPixels { grid, id, next: 0 }
}

/// Centroid of every live cell.
///
/// Along toroidal axes each pixel is first moved to the periodic image
/// closest to the cell's first pixel, so cells straddling an edge get a
/// centroid inside their body. The result is wrapped back into range.
pub fn centroids(view: &CellView<'_>) -> BTreeMap<CellId, [f64; MAX_DIMS]> {
    let lattice = view.lattice();
    let ndim = lattice.ndim();
    let extents = lattice.extents();
    let torus = lattice.torus();

    struct Acc {
        reference: [f64; MAX_DIMS],
        sum: [f64; MAX_DIMS],
        count: usize,
    }

    let mut acc: BTreeMap<CellId, Acc> = BTreeMap::new();
    for (i, id) in view.grid.pixels() {
        if id == BACKGROUND {
            continue;
        }
        let p = lattice.point(i);
        let mut c = [0f64; MAX_DIMS];
        for d in 0..ndim {
            c[d] = p[d] as f64;
        }
        let a = acc.entry(id).or_insert(Acc {
            reference: c,
            sum: [0.0; MAX_DIMS],
            count: 0,
        });
        for d in 0..ndim {
            let mut v = c[d];
            if torus[d] {
                let ext = extents[d] as f64;
                let off = v - a.reference[d];
                if off > ext / 2.0 {
                    v -= ext;
                } else if off < -ext / 2.0 {
                    v += ext;
                }
            }
            a.sum[d] += v;
        }
        a.count += 1;
    }

    acc.into_iter()
        .map(|(id, a)| {
            let mut c = [0f64; MAX_DIMS];
            for d in 0..ndim {
                let mut v = a.sum[d] / a.count as f64;
                if torus[d] {
                    v = v.rem_euclid(extents[d] as f64);
                }
                c[d] = v;
            }
            (id, c)
        })
        .collect()
}
