use crate::error::{CpmError, CpmResult};
use crate::grid::{Grid, Lattice, LatticeRead, MAX_DIMS, Neighborhood, Point};

/// Real-valued field stored at reduced resolution over a fine lattice.
///
/// Coarse site `k` along an axis sits at fine coordinate `k * upscale`.
/// Reads at fine coordinates interpolate multilinearly between the
/// surrounding coarse sites, wrapping along toroidal axes and clamping at
/// bounded edges.
#[derive(Clone, Debug)]
pub struct CoarseGrid {
    upscale: usize,
    field: Grid<f64>,
}

impl CoarseGrid {
    /// Wrap `fine` with a downsample factor that must divide every extent.
    pub fn new(fine: &Lattice, upscale: usize) -> CpmResult<Self> {
        if upscale == 0 {
            return Err(CpmError::config("coarse grid upscale factor must be positive"));
        }
        if fine.neighborhood() == Neighborhood::Hex {
            return Err(CpmError::Capability {
                constraint: "coarse grid",
                capability: "a Cartesian lattice",
            });
        }
        let mut extents = [0usize; MAX_DIMS];
        for (d, &e) in fine.extents().iter().enumerate() {
            if e % upscale != 0 {
                return Err(CpmError::config(format!(
                    "upscale factor {} does not divide extent {} of axis {}",
                    upscale, e, d
                )));
            }
            extents[d] = e / upscale;
        }
        let lattice = Lattice::new(
            &extents[..fine.ndim()],
            fine.torus(),
            fine.neighborhood(),
        )?;
        Ok(Self {
            upscale,
            field: Grid::new(lattice),
        })
    }

    pub fn upscale(&self) -> usize {
        self.upscale
    }

    pub fn field(&self) -> &Grid<f64> {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut Grid<f64> {
        &mut self.field
    }

    /// Coarse site containing a fine point.
    pub fn coarse_point(&self, fine: &Point) -> Point {
        let mut c = [0usize; MAX_DIMS];
        let ndim = fine.ndim();
        for (d, v) in c.iter_mut().enumerate().take(ndim) {
            *v = fine[d] / self.upscale;
        }
        Point::from_parts(ndim, c)
    }

    /// Deposit `amount` into the coarse site containing `fine`.
    pub fn add_at_fine(&mut self, fine: &Point, amount: f64) {
        let cp = self.coarse_point(fine);
        let i = self.field.lattice().index(&cp);
        self.field.data[i] += amount;
    }

    /// Interpolated field value at a fine-lattice coordinate.
    pub fn value_at_fine(&self, fine: &Point) -> f64 {
        let lattice = self.field.lattice();
        let ndim = lattice.ndim();
        let mut lo = [0usize; MAX_DIMS];
        let mut hi = [0usize; MAX_DIMS];
        let mut frac = [0f64; MAX_DIMS];
        for d in 0..ndim {
            let ext = lattice.extents()[d];
            let pos = fine[d] as f64 / self.upscale as f64;
            let l = pos.floor() as usize;
            frac[d] = pos - l as f64;
            lo[d] = l.min(ext - 1);
            hi[d] = if l + 1 < ext {
                l + 1
            } else if lattice.torus()[d] {
                (l + 1) % ext
            } else {
                ext - 1
            };
        }

        let mut value = 0.0;
        for corner in 0..(1usize << ndim) {
            let mut weight = 1.0;
            let mut c = [0usize; MAX_DIMS];
            for d in 0..ndim {
                if corner & (1 << d) != 0 {
                    c[d] = hi[d];
                    weight *= frac[d];
                } else {
                    c[d] = lo[d];
                    weight *= 1.0 - frac[d];
                }
            }
            if weight == 0.0 {
                continue;
            }
            let i = self.field.lattice().index(&Point::from_parts(ndim, c));
            value += weight * self.field.get_index(i);
        }
        value
    }

    /// One diffusion relaxation pass over the coarse sites.
    pub fn diffusion(&mut self, d: f64) -> CpmResult<()> {
        self.field.diffusion(d)
    }

    /// Multiply every coarse value by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.field.data {
            *v *= factor;
        }
    }
}

impl LatticeRead for CoarseGrid {
    type Value = f64;

    fn lattice(&self) -> &Lattice {
        self.field.lattice()
    }

    fn value(&self, index: usize) -> f64 {
        self.field.data[index]
    }
}
