use std::ops::{Deref, Index};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{CpmError, CpmResult};

/// Highest lattice dimensionality supported.
pub const MAX_DIMS: usize = 3;

/// Largest neighbourhood size (3D Moore).
pub(crate) const MAX_NEIGHBORS: usize = 26;

type Offset = [isize; MAX_DIMS];

/// Hex rows: even rows lean left, odd rows lean right.
const HEX_EVEN: [(isize, isize); 6] = [(-1, 0), (1, 0), (-1, -1), (0, -1), (-1, 1), (0, 1)];
const HEX_ODD: [(isize, isize); 6] = [(-1, 0), (1, 0), (0, -1), (1, -1), (0, 1), (1, 1)];

/// Lattice coordinate with up to [`MAX_DIMS`] components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    ndim: u8,
    c: [usize; MAX_DIMS],
}

impl Point {
    pub fn xy(x: usize, y: usize) -> Self {
        Self { ndim: 2, c: [x, y, 0] }
    }

    pub fn xyz(x: usize, y: usize, z: usize) -> Self {
        Self { ndim: 3, c: [x, y, z] }
    }

    pub fn from_slice(coords: &[usize]) -> CpmResult<Self> {
        if coords.is_empty() || coords.len() > MAX_DIMS {
            return Err(CpmError::config(format!(
                "points need 1..={} coordinates, got {}",
                MAX_DIMS,
                coords.len()
            )));
        }
        let mut c = [0usize; MAX_DIMS];
        c[..coords.len()].copy_from_slice(coords);
        Ok(Self {
            ndim: coords.len() as u8,
            c,
        })
    }

    #[inline]
    pub(crate) fn from_parts(ndim: usize, c: [usize; MAX_DIMS]) -> Self {
        Self { ndim: ndim as u8, c }
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.ndim as usize
    }

    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.c[..self.ndim as usize]
    }
}

impl Index<usize> for Point {
    type Output = usize;

    fn index(&self, d: usize) -> &usize {
        &self.as_slice()[d]
    }
}

impl From<[usize; 2]> for Point {
    fn from(c: [usize; 2]) -> Self {
        Point::xy(c[0], c[1])
    }
}

impl From<[usize; 3]> for Point {
    fn from(c: [usize; 3]) -> Self {
        Point::xyz(c[0], c[1], c[2])
    }
}

/// Which sites count as adjacent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Neighborhood {
    /// All sites differing by at most one step per axis (8 in 2D, 26 in 3D).
    #[default]
    Moore,
    /// Axis-aligned sites only (4 in 2D, 6 in 3D).
    VonNeumann,
    /// Six-neighbour hexagonal lattice in offset coordinates (2D only).
    Hex,
}

/// Fixed-capacity neighbour list. Avoids allocation in the copy-attempt loop.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeighborBuf {
    idx: [usize; MAX_NEIGHBORS],
    len: usize,
}

impl NeighborBuf {
    #[inline]
    fn push(&mut self, i: usize) {
        self.idx[self.len] = i;
        self.len += 1;
    }
}

impl Deref for NeighborBuf {
    type Target = [usize];

    #[inline]
    fn deref(&self) -> &[usize] {
        &self.idx[..self.len]
    }
}

/// Shape of a D-dimensional lattice: extents, per-axis torus flags, strides
/// and the neighbour stencil. Index `x + w*(y + h*z)`, x fastest.
#[derive(Clone, Debug, PartialEq)]
pub struct Lattice {
    ndim: usize,
    extents: [usize; MAX_DIMS],
    torus: [bool; MAX_DIMS],
    strides: [usize; MAX_DIMS],
    size: usize,
    neighborhood: Neighborhood,
    offsets: Vec<Offset>,
    odd_offsets: Vec<Offset>,
    axis_offsets: Vec<Offset>,
    box_offsets: Vec<Offset>,
}

impl Lattice {
    pub fn new(extents: &[usize], torus: &[bool], neighborhood: Neighborhood) -> CpmResult<Self> {
        let ndim = extents.len();
        if ndim == 0 || ndim > MAX_DIMS {
            return Err(CpmError::config(format!(
                "lattice needs 1..={} dimensions, got {}",
                MAX_DIMS, ndim
            )));
        }
        if torus.len() != ndim {
            return Err(CpmError::config(format!(
                "{} torus flags given for a {}-dimensional lattice",
                torus.len(),
                ndim
            )));
        }
        if let Some(d) = extents.iter().position(|&e| e == 0) {
            return Err(CpmError::config(format!("extent of axis {} is zero", d)));
        }
        if neighborhood == Neighborhood::Hex {
            if ndim != 2 {
                return Err(CpmError::config("hex neighborhood is only defined in 2D"));
            }
            if torus[1] && extents[1] % 2 == 1 {
                return Err(CpmError::config(
                    "hex lattice wrapping in y needs an even number of rows",
                ));
            }
        }

        let mut ext = [1usize; MAX_DIMS];
        let mut tor = [false; MAX_DIMS];
        let mut strides = [0usize; MAX_DIMS];
        let mut size = 1usize;
        for d in 0..ndim {
            ext[d] = extents[d];
            tor[d] = torus[d];
            strides[d] = size;
            size = size
                .checked_mul(extents[d])
                .ok_or_else(|| CpmError::config("lattice size overflows usize"))?;
        }

        let axis_offsets = axis_offsets(ndim);
        let box_offsets = moore_offsets(ndim);
        let (offsets, odd_offsets) = match neighborhood {
            Neighborhood::Moore => (moore_offsets(ndim), Vec::new()),
            Neighborhood::VonNeumann => (axis_offsets.clone(), Vec::new()),
            Neighborhood::Hex => (
                HEX_EVEN.iter().map(|&(dx, dy)| [dx, dy, 0]).collect(),
                HEX_ODD.iter().map(|&(dx, dy)| [dx, dy, 0]).collect(),
            ),
        };

        Ok(Self {
            ndim,
            extents: ext,
            torus: tor,
            strides,
            size,
            neighborhood,
            offsets,
            odd_offsets,
            axis_offsets,
            box_offsets,
        })
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    #[inline]
    pub fn extents(&self) -> &[usize] {
        &self.extents[..self.ndim]
    }

    #[inline]
    pub fn torus(&self) -> &[bool] {
        &self.torus[..self.ndim]
    }

    /// Total number of sites.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn neighborhood(&self) -> Neighborhood {
        self.neighborhood
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.ndim() == self.ndim && p.as_slice().iter().zip(self.extents()).all(|(&c, &e)| c < e)
    }

    #[inline]
    pub fn index(&self, p: &Point) -> usize {
        debug_assert!(self.contains(p));
        let mut i = 0;
        for d in 0..self.ndim {
            i += p.c[d] * self.strides[d];
        }
        i
    }

    pub fn try_index(&self, p: &Point) -> CpmResult<usize> {
        if !self.contains(p) {
            return Err(CpmError::OutOfBounds {
                point: p.as_slice().to_vec(),
                extents: self.extents().to_vec(),
            });
        }
        Ok(self.index(p))
    }

    #[inline]
    pub fn point(&self, i: usize) -> Point {
        debug_assert!(i < self.size);
        let mut c = [0usize; MAX_DIMS];
        for d in 0..self.ndim {
            c[d] = (i / self.strides[d]) % self.extents[d];
        }
        Point {
            ndim: self.ndim as u8,
            c,
        }
    }

    /// Map signed coordinates onto the lattice: toroidal axes wrap, bounded
    /// axes reject. Returns None when any bounded axis is out of range.
    pub fn wrap(&self, coords: &[isize]) -> Option<Point> {
        if coords.len() != self.ndim {
            return None;
        }
        let mut c = [0usize; MAX_DIMS];
        for d in 0..self.ndim {
            let ext = self.extents[d] as isize;
            let mut v = coords[d];
            if v < 0 || v >= ext {
                if !self.torus[d] {
                    return None;
                }
                v = v.rem_euclid(ext);
            }
            c[d] = v as usize;
        }
        Some(Point {
            ndim: self.ndim as u8,
            c,
        })
    }

    /// Neighbours of site `i` under this lattice's neighbourhood and torus flags.
    #[inline]
    pub fn neighbors(&self, i: usize) -> NeighborBuf {
        self.neighbors_with_torus(i, self.torus())
    }

    /// Neighbours of site `i`, with `torus` overriding the lattice's flags.
    /// Missing entries in `torus` count as bounded.
    pub fn neighbors_with_torus(&self, i: usize, torus: &[bool]) -> NeighborBuf {
        let p = self.point(i);
        let offsets = if self.neighborhood == Neighborhood::Hex && p.c[1] % 2 == 1 {
            &self.odd_offsets
        } else {
            &self.offsets
        };
        self.collect_offsets(&p, offsets, torus)
    }

    /// Axis-aligned neighbours regardless of the configured neighbourhood.
    pub fn axis_neighbors(&self, i: usize) -> NeighborBuf {
        let p = self.point(i);
        self.collect_offsets(&p, &self.axis_offsets, self.torus())
    }

    /// Every site of the 3^D box around `i` except `i`, regardless of the
    /// configured neighbourhood. Contains all neighbours of `i`.
    pub fn box_neighbors(&self, i: usize) -> NeighborBuf {
        let p = self.point(i);
        self.collect_offsets(&p, &self.box_offsets, self.torus())
    }

    /// On periodic axes shorter than 3 several offsets land on the same
    /// site, or on `p` itself; each neighbour is listed once and never `p`.
    fn collect_offsets(&self, p: &Point, offsets: &[Offset], torus: &[bool]) -> NeighborBuf {
        let mut out = NeighborBuf::default();
        let short_axis = self.extents[..self.ndim].iter().any(|&e| e < 3);
        let own = self.index(p);
        'offsets: for off in offsets {
            let mut idx = 0usize;
            for d in 0..self.ndim {
                let ext = self.extents[d] as isize;
                let mut c = p.c[d] as isize + off[d];
                if c < 0 || c >= ext {
                    if !torus.get(d).copied().unwrap_or(false) {
                        continue 'offsets;
                    }
                    c = c.rem_euclid(ext);
                }
                idx += c as usize * self.strides[d];
            }
            if short_axis && (idx == own || out.contains(&idx)) {
                continue;
            }
            out.push(idx);
        }
        out
    }
}

fn moore_offsets(ndim: usize) -> Vec<Offset> {
    let count = 3usize.pow(ndim as u32);
    let mut out = Vec::with_capacity(count - 1);
    for k in 0..count {
        let mut off = [0isize; MAX_DIMS];
        let mut rem = k;
        for o in off.iter_mut().take(ndim) {
            *o = (rem % 3) as isize - 1;
            rem /= 3;
        }
        if off.iter().any(|&o| o != 0) {
            out.push(off);
        }
    }
    out
}

fn axis_offsets(ndim: usize) -> Vec<Offset> {
    let mut out = Vec::with_capacity(2 * ndim);
    for d in 0..ndim {
        for s in [-1isize, 1] {
            let mut off = [0isize; MAX_DIMS];
            off[d] = s;
            out.push(off);
        }
    }
    out
}

/// Read access shared by the dense grid and the coarse field wrapper.
pub trait LatticeRead {
    type Value: Copy;

    fn lattice(&self) -> &Lattice;

    fn value(&self, index: usize) -> Self::Value;

    fn value_at(&self, p: &Point) -> CpmResult<Self::Value> {
        Ok(self.value(self.lattice().try_index(p)?))
    }

    fn neighbors(&self, index: usize) -> NeighborBuf {
        self.lattice().neighbors(index)
    }

    fn extents(&self) -> &[usize] {
        self.lattice().extents()
    }
}

/// Dense flat grid holding one value per lattice site.
#[derive(Clone, Debug)]
pub struct Grid<T> {
    lattice: Lattice,
    pub data: Vec<T>,
}

impl<T: Copy + Default> Grid<T> {
    pub fn new(lattice: Lattice) -> Self {
        Self {
            data: vec![T::default(); lattice.size()],
            lattice,
        }
    }

    #[inline]
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    #[inline]
    pub fn get_index(&self, i: usize) -> T {
        self.data[i]
    }

    #[inline]
    pub fn set_index(&mut self, i: usize, v: T) {
        self.data[i] = v;
    }

    pub fn get(&self, p: &Point) -> CpmResult<T> {
        Ok(self.data[self.lattice.try_index(p)?])
    }

    pub fn set(&mut self, p: &Point, v: T) -> CpmResult<()> {
        let i = self.lattice.try_index(p)?;
        self.data[i] = v;
        Ok(())
    }
}

impl<T: Copy + Default + PartialEq> Grid<T> {
    /// Sites holding a non-default value, in index order.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, T)> + '_ {
        let empty = T::default();
        self.data
            .iter()
            .enumerate()
            .filter(move |&(_, &v)| v != empty)
            .map(|(i, &v)| (i, v))
    }
}

impl<T: Copy + Default> LatticeRead for Grid<T> {
    type Value = T;

    fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    fn value(&self, index: usize) -> T {
        self.data[index]
    }
}

impl Grid<f64> {
    /// Discrete Laplacian over axis neighbours. Bounded edges are zero-flux.
    #[inline]
    pub fn laplacian(&self, i: usize) -> f64 {
        let nb = self.lattice.axis_neighbors(i);
        let sum: f64 = nb.iter().map(|&j| self.data[j]).sum();
        sum - nb.len() as f64 * self.data[i]
    }

    /// One explicit finite-difference diffusion pass with coefficient `d`.
    pub fn diffusion(&mut self, d: f64) -> CpmResult<()> {
        if self.lattice.neighborhood() == Neighborhood::Hex {
            return Err(CpmError::Capability {
                constraint: "diffusion",
                capability: "a Cartesian axis stencil",
            });
        }
        let next: Vec<f64> = (0..self.data.len())
            .into_par_iter()
            .map(|i| self.data[i] + d * self.laplacian(i))
            .collect();
        self.data = next;
        Ok(())
    }
}
