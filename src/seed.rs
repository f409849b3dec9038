//! Helpers that place, remove and split cells between Monte Carlo steps.

use tracing::debug;

use crate::cell::{BACKGROUND, CellId, CellKind};
use crate::engine::Cpm;
use crate::error::{CpmError, CpmResult};
use crate::grid::{MAX_DIMS, Neighborhood, Point};

/// New cell of `kind` occupying the single site `p`, overwriting whatever
/// was there.
pub fn seed_cell_at(cpm: &mut Cpm, kind: CellKind, p: &Point) -> CpmResult<CellId> {
    cpm.lattice().try_index(p)?;
    let id = cpm.make_new_cell_id(kind)?;
    cpm.set_pixel(p, id)?;
    Ok(id)
}

/// New cell of `kind` on a random background site.
pub fn seed_cell(cpm: &mut Cpm, kind: CellKind, max_attempts: usize) -> CpmResult<CellId> {
    let size = cpm.lattice().size();
    for _ in 0..max_attempts {
        let i = cpm.rng_mut().range_usize(size);
        if cpm.grid().data[i] == BACKGROUND {
            let id = cpm.make_new_cell_id(kind)?;
            cpm.set_pixel_index(i, id)?;
            return Ok(id);
        }
    }
    Err(CpmError::SeedingExhausted {
        attempts: max_attempts,
    })
}

/// `n` single-pixel cells of `kind` on distinct background sites within
/// `radius` of `center`.
///
/// `max_attempts` bounds the total number of draws. On failure the cells
/// placed so far stay on the grid.
pub fn seed_cells_in_disk(
    cpm: &mut Cpm,
    kind: CellKind,
    n: usize,
    center: &Point,
    radius: f64,
    max_attempts: usize,
) -> CpmResult<Vec<CellId>> {
    cpm.lattice().try_index(center)?;
    if !radius.is_finite() || radius < 0.0 {
        return Err(CpmError::config(format!("seeding radius must be non-negative, got {}", radius)));
    }
    let ndim = cpm.lattice().ndim();
    let mut placed = Vec::with_capacity(n);
    let mut attempts = 0;
    while placed.len() < n {
        if attempts == max_attempts {
            debug!("Disk seeding placed {} of {} cells before giving up", placed.len(), n);
            return Err(CpmError::SeedingExhausted { attempts });
        }
        attempts += 1;

        let mut offset = [0f64; MAX_DIMS];
        let mut coords = [0isize; MAX_DIMS];
        for d in 0..ndim {
            offset[d] = cpm.rng_mut().range_f64(-radius, radius).round();
            coords[d] = center[d] as isize + offset[d] as isize;
        }
        let dist_sq: f64 = offset.iter().map(|o| o * o).sum();
        if dist_sq > radius * radius {
            continue;
        }
        let Some(p) = cpm.lattice().wrap(&coords[..ndim]) else {
            continue;
        };
        if cpm.cell_id_at(&p)? != BACKGROUND {
            continue;
        }
        placed.push(seed_cell_at(cpm, kind, &p)?);
    }
    debug!("Seeded {} cells of kind {} in {} draws", n, kind, attempts);
    Ok(placed)
}

/// One new cell of `kind` covering every site whose coordinate along `dim`
/// equals `coord`.
pub fn fill_plane(cpm: &mut Cpm, kind: CellKind, dim: usize, coord: usize) -> CpmResult<CellId> {
    let lattice = cpm.lattice();
    if dim >= lattice.ndim() {
        return Err(CpmError::config(format!(
            "axis {} does not exist on a {}D lattice",
            dim,
            lattice.ndim()
        )));
    }
    if coord >= lattice.extents()[dim] {
        let mut point = vec![0; lattice.ndim()];
        point[dim] = coord;
        return Err(CpmError::OutOfBounds {
            point,
            extents: lattice.extents().to_vec(),
        });
    }
    let sites: Vec<usize> = (0..lattice.size())
        .filter(|&i| lattice.point(i)[dim] == coord)
        .collect();
    let id = cpm.make_new_cell_id(kind)?;
    for &i in &sites {
        cpm.set_pixel_index(i, id)?;
    }
    debug!("Filled plane {} = {} with cell {} ({} sites)", dim, coord, id, sites.len());
    Ok(id)
}

/// Hand every pixel of `id` back to the background.
pub fn kill_cell(cpm: &mut Cpm, id: CellId) -> CpmResult<()> {
    if id == BACKGROUND || !cpm.cells().is_live(id) {
        return Err(CpmError::UnknownCell(id));
    }
    let sites: Vec<usize> = cpm
        .grid()
        .data
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v == id)
        .map(|(i, _)| i)
        .collect();
    for i in sites {
        cpm.set_pixel_index(i, BACKGROUND)?;
    }
    Ok(())
}

/// Split a 2D cell in two along the line through its centroid that is
/// perpendicular to the major axis of its pixel distribution. The half on
/// the positive side of the axis becomes a new cell of the same kind, whose
/// id is returned.
pub fn divide_cell(cpm: &mut Cpm, id: CellId) -> CpmResult<CellId> {
    let lattice = cpm.lattice();
    if lattice.ndim() != 2 || lattice.neighborhood() == Neighborhood::Hex {
        return Err(CpmError::Capability {
            constraint: "divide_cell",
            capability: "a 2D Cartesian lattice",
        });
    }
    if !cpm.cells().is_live(id) {
        return Err(CpmError::UnknownCell(id));
    }
    if cpm.volume_of(id) < 2 {
        return Err(CpmError::config(format!("cell {} is too small to divide", id)));
    }

    let extents = [lattice.extents()[0] as f64, lattice.extents()[1] as f64];
    let torus = [lattice.torus()[0], lattice.torus()[1]];
    let sites: Vec<usize> = cpm.cell_pixels(id).map(|p| lattice.index(&p)).collect();

    // unwrap toroidal coordinates around the first pixel
    let first = lattice.point(sites[0]);
    let reference = [first[0] as f64, first[1] as f64];
    let coords: Vec<[f64; 2]> = sites
        .iter()
        .map(|&i| {
            let p = lattice.point(i);
            let mut c = [p[0] as f64, p[1] as f64];
            for d in 0..2 {
                if torus[d] {
                    let off = c[d] - reference[d];
                    if off > extents[d] / 2.0 {
                        c[d] -= extents[d];
                    } else if off < -extents[d] / 2.0 {
                        c[d] += extents[d];
                    }
                }
            }
            c
        })
        .collect();

    let count = coords.len() as f64;
    let cx = coords.iter().map(|c| c[0]).sum::<f64>() / count;
    let cy = coords.iter().map(|c| c[1]).sum::<f64>() / count;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for c in &coords {
        let dx = c[0] - cx;
        let dy = c[1] - cy;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    let (ax, ay) = (theta.cos(), theta.sin());

    let moved: Vec<usize> = sites
        .iter()
        .zip(&coords)
        .filter(|(_, c)| (c[0] - cx) * ax + (c[1] - cy) * ay > 0.0)
        .map(|(&i, _)| i)
        .collect();
    if moved.is_empty() || moved.len() == sites.len() {
        return Err(CpmError::config(format!("cell {} has no axis to divide along", id)));
    }

    let kind = cpm.kind_of(id);
    let daughter = cpm.make_new_cell_id(kind)?;
    for i in moved {
        cpm.set_pixel_index(i, daughter)?;
    }
    debug!(
        "Divided cell {} into {} ({} px) and {} ({} px)",
        id,
        id,
        cpm.volume_of(id),
        daughter,
        cpm.volume_of(daughter)
    );
    Ok(daughter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConstraintParams, Params};

    fn engine(w: usize, h: usize, torus: bool) -> Cpm {
        let params = Params {
            extents: vec![w, h],
            torus: vec![torus, torus],
            constraints: ConstraintParams::default(),
            ..Params::default()
        };
        Cpm::new(&params).unwrap()
    }

    #[test]
    fn seed_at_point() {
        let mut cpm = engine(5, 5, false);
        let id = seed_cell_at(&mut cpm, 1, &Point::xy(1, 3)).unwrap();
        assert_eq!(cpm.cell_id_at(&Point::xy(1, 3)).unwrap(), id);
        assert_eq!(cpm.volume_of(id), 1);
        assert!(seed_cell_at(&mut cpm, 1, &Point::xy(5, 0)).is_err());
        assert!(seed_cell_at(&mut cpm, 0, &Point::xy(0, 0)).is_err());
    }

    #[test]
    fn random_seed_needs_free_site() {
        let mut cpm = engine(2, 1, false);
        fill_plane(&mut cpm, 1, 1, 0).unwrap();
        assert_eq!(
            seed_cell(&mut cpm, 1, 50),
            Err(CpmError::SeedingExhausted { attempts: 50 })
        );
    }

    #[test]
    fn disk_seeding_stays_inside_and_is_disjoint() {
        let mut cpm = engine(30, 30, false);
        let center = Point::xy(15, 15);
        let ids = seed_cells_in_disk(&mut cpm, 1, 20, &center, 5.0, 10_000).unwrap();
        assert_eq!(ids.len(), 20);
        for &id in &ids {
            assert_eq!(cpm.volume_of(id), 1);
            let p = cpm.cell_pixels(id).next().unwrap();
            let dx = p[0] as f64 - 15.0;
            let dy = p[1] as f64 - 15.0;
            assert!(dx * dx + dy * dy <= 25.0);
        }
        cpm.verify().unwrap();
    }

    #[test]
    fn disk_seeding_exhaustion_keeps_partial_work() {
        let mut cpm = engine(10, 10, false);
        // a radius-0 disk has room for exactly one cell
        let err = seed_cells_in_disk(&mut cpm, 1, 2, &Point::xy(4, 4), 0.0, 25).unwrap_err();
        assert_eq!(err, CpmError::SeedingExhausted { attempts: 25 });
        assert_eq!(cpm.cells().live_count(), 1);
    }

    #[test]
    fn plane_fill_and_kill() {
        let mut cpm = engine(4, 3, false);
        let id = fill_plane(&mut cpm, 1, 0, 2).unwrap();
        assert_eq!(cpm.volume_of(id), 3);
        assert!(cpm.cell_pixels(id).all(|p| p[0] == 2));
        assert!(fill_plane(&mut cpm, 1, 2, 0).is_err());
        assert!(matches!(
            fill_plane(&mut cpm, 1, 1, 3),
            Err(CpmError::OutOfBounds { .. })
        ));

        kill_cell(&mut cpm, id).unwrap();
        assert!(!cpm.cells().is_live(id));
        assert_eq!(cpm.grid().pixels().count(), 0);
        assert_eq!(kill_cell(&mut cpm, id), Err(CpmError::UnknownCell(id)));
    }

    #[test]
    fn division_splits_along_long_axis() {
        let mut cpm = engine(10, 5, false);
        let id = cpm.make_new_cell_id(1).unwrap();
        for x in 2..8 {
            for y in 1..3 {
                cpm.set_pixel(&Point::xy(x, y), id).unwrap();
            }
        }
        let daughter = divide_cell(&mut cpm, id).unwrap();
        assert_eq!(cpm.volume_of(id), 6);
        assert_eq!(cpm.volume_of(daughter), 6);
        assert_eq!(cpm.kind_of(daughter), 1);
        // the cut runs across the long (x) axis
        let left: Vec<_> = cpm.cell_pixels(id).map(|p| p[0]).collect();
        let right: Vec<_> = cpm.cell_pixels(daughter).map(|p| p[0]).collect();
        assert!(left.iter().max() < right.iter().min() || right.iter().max() < left.iter().min());
        cpm.verify().unwrap();
    }

    #[test]
    fn division_of_single_pixel_fails() {
        let mut cpm = engine(5, 5, false);
        let id = seed_cell_at(&mut cpm, 1, &Point::xy(2, 2)).unwrap();
        assert!(matches!(divide_cell(&mut cpm, id), Err(CpmError::Configuration(_))));
    }
}
