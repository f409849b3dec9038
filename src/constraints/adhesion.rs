use serde::{Deserialize, Serialize};

use crate::cell::CellId;
use crate::engine::CellView;
use crate::error::{CpmError, CpmResult};

use super::{AnyConstraint, Constraint, Setup, SoftConstraint, require_kinds};

/// Interaction energies between kinds: `j[a][b]` per unit of contact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdhesionParams {
    pub j: Vec<Vec<f64>>,
}

/// Differential adhesion: every neighbour pair with differing identities
/// costs `J[kind_a][kind_b]`.
#[derive(Clone, Debug)]
pub struct Adhesion {
    j: Vec<Vec<f64>>,
}

impl Adhesion {
    pub fn new(params: AdhesionParams) -> Self {
        Self { j: params.j }
    }

    /// Contact energy site `i` would have if it carried `id`.
    fn local_energy(&self, view: &CellView<'_>, i: usize, id: CellId) -> f64 {
        let kind = view.kind_of(id);
        let mut r = 0.0;
        for &n in view.lattice().neighbors(i).iter() {
            let nid = view.id_at(n);
            if nid != id {
                r += self.j[kind][view.kind_of(nid)];
            }
        }
        r
    }
}

impl Constraint for Adhesion {
    fn name(&self) -> &'static str {
        "adhesion"
    }

    fn validate(&self, setup: &Setup<'_>) -> CpmResult<()> {
        require_kinds(self.name(), "J", &self.j, setup.n_kinds)?;
        for row in &self.j {
            require_kinds(self.name(), "J row", row, setup.n_kinds)?;
        }
        for a in 0..setup.n_kinds {
            for b in 0..a {
                if self.j[a][b] != self.j[b][a] {
                    return Err(CpmError::config(format!(
                        "adhesion matrix is not symmetric at ({}, {})",
                        a, b
                    )));
                }
            }
        }
        Ok(())
    }
}

impl SoftConstraint for Adhesion {
    fn delta_energy(&self, view: &CellView<'_>, _src: usize, tgt: usize, src_id: CellId, tgt_id: CellId) -> f64 {
        self.local_energy(view, tgt, src_id) - self.local_energy(view, tgt, tgt_id)
    }
}

impl From<Adhesion> for AnyConstraint {
    fn from(c: Adhesion) -> Self {
        AnyConstraint::Soft(Box::new(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::test_support::Fixture;
    use crate::grid::Lattice;
    use crate::grid::Neighborhood;

    fn adhesion() -> Adhesion {
        Adhesion::new(AdhesionParams {
            j: vec![vec![0.0, 20.0], vec![20.0, 5.0]],
        })
    }

    #[test]
    fn single_pixel_absorbed_by_background() {
        let fx = Fixture::new(&[&[0, 0, 0], &[0, 1, 0], &[0, 0, 0]], &[1], 2);
        let view = fx.view();
        // center pixel turns background: 8 contacts at J=20 vanish
        let dh = adhesion().delta_energy(&view, fx.idx(0, 0), fx.idx(1, 1), 0, 1);
        assert_eq!(dh, -160.0);
    }

    #[test]
    fn extension_costs_contacts() {
        let fx = Fixture::new(&[&[0, 0, 0], &[0, 1, 0], &[0, 0, 0]], &[1], 2);
        let view = fx.view();
        // corner becomes cell 1: 2 background neighbours at 20, none otherwise
        // before: corner was background with one contact to cell 1 (20)
        let dh = adhesion().delta_energy(&view, fx.idx(1, 1), fx.idx(0, 0), 1, 0);
        assert_eq!(dh, 2.0 * 20.0 - 20.0);
    }

    #[test]
    fn same_kind_contacts_use_diagonal() {
        let fx = Fixture::new(&[&[1, 2]], &[1, 1], 2);
        let view = fx.view();
        // site 1 switches from cell 2 to cell 1: the 1|2 contact disappears
        let dh = adhesion().delta_energy(&view, fx.idx(0, 0), fx.idx(1, 0), 1, 2);
        assert_eq!(dh, -5.0);
    }

    #[test]
    fn validation() {
        let lattice = Lattice::new(&[3, 3], &[false, false], Neighborhood::Moore).unwrap();
        let setup = Setup { lattice: &lattice, n_kinds: 2 };
        assert!(adhesion().validate(&setup).is_ok());
        let short = Adhesion::new(AdhesionParams { j: vec![vec![0.0, 1.0]] });
        assert!(matches!(
            short.validate(&setup),
            Err(CpmError::MissingKindParameter { kind: 1, .. })
        ));
        let skew = Adhesion::new(AdhesionParams {
            j: vec![vec![0.0, 1.0], vec![2.0, 0.0]],
        });
        assert!(matches!(skew.validate(&setup), Err(CpmError::Configuration(_))));
    }
}
