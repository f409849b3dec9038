/*!
Cell identity bookkeeping.

A [`CellId`] names one cell instance; a [`CellKind`] names the parameter
group it belongs to. Id 0 and kind 0 are the background, which has no
registry entry and no tracked volume.
*/

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::{CpmError, CpmResult};

/// Identity of one cell instance. 0 is background.
pub type CellId = u32;

/// Parameter class of a cell. 0 is background.
pub type CellKind = usize;

pub const BACKGROUND: CellId = 0;
pub const BACKGROUND_KIND: CellKind = 0;

/// Default id ceiling, matching a 16-bit identity lattice.
pub const DEFAULT_MAX_CELL_ID: CellId = u16::MAX as CellId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CellEntry {
    kind: CellKind,
    volume: u32,
}

/// Live cells, their kind and pixel count, plus the id free list.
///
/// Fresh ids are handed out sequentially until `max_id`; after that the
/// smallest freed id is reused first.
#[derive(Clone, Debug)]
pub struct CellRegistry {
    entries: Vec<Option<CellEntry>>,
    free: BinaryHeap<Reverse<CellId>>,
    last_id: CellId,
    max_id: CellId,
    n_kinds: usize,
    live: usize,
}

impl CellRegistry {
    pub fn new(n_kinds: usize, max_id: CellId) -> Self {
        Self {
            entries: vec![None],
            free: BinaryHeap::new(),
            last_id: BACKGROUND,
            max_id,
            n_kinds,
            live: 0,
        }
    }

    pub fn n_kinds(&self) -> usize {
        self.n_kinds
    }

    pub fn max_id(&self) -> CellId {
        self.max_id
    }

    /// Register a new cell of `kind` with volume 0 and return its id.
    pub fn make_new_cell_id(&mut self, kind: CellKind) -> CpmResult<CellId> {
        if kind == BACKGROUND_KIND || kind >= self.n_kinds {
            return Err(CpmError::config(format!(
                "cell kind {} outside 1..{}",
                kind, self.n_kinds
            )));
        }
        let id = if self.last_id < self.max_id {
            self.last_id += 1;
            self.last_id
        } else {
            match self.free.pop() {
                Some(Reverse(id)) => id,
                None => return Err(CpmError::IdSpaceExhausted { max: self.max_id }),
            }
        };
        let slot = id as usize;
        if slot >= self.entries.len() {
            self.entries.resize(slot + 1, None);
        }
        self.entries[slot] = Some(CellEntry { kind, volume: 0 });
        self.live += 1;
        Ok(id)
    }

    #[inline]
    pub fn is_live(&self, id: CellId) -> bool {
        self.entry(id).is_some()
    }

    #[inline]
    fn entry(&self, id: CellId) -> Option<&CellEntry> {
        self.entries.get(id as usize).and_then(|e| e.as_ref())
    }

    /// Kind of a live cell; background and unknown ids report kind 0.
    #[inline]
    pub fn kind_of(&self, id: CellId) -> CellKind {
        self.entry(id).map_or(BACKGROUND_KIND, |e| e.kind)
    }

    /// Pixel count of a live cell; background and unknown ids report 0.
    #[inline]
    pub fn volume_of(&self, id: CellId) -> u32 {
        self.entry(id).map_or(0, |e| e.volume)
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Live ids in ascending order.
    pub fn live_ids(&self) -> impl Iterator<Item = CellId> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_some())
            .map(|(i, _)| i as CellId)
    }

    pub(crate) fn gain_pixel(&mut self, id: CellId) -> CpmResult<()> {
        if id == BACKGROUND {
            return Ok(());
        }
        match self.entries.get_mut(id as usize).and_then(|e| e.as_mut()) {
            Some(e) => {
                e.volume += 1;
                Ok(())
            }
            None => Err(CpmError::UnknownCell(id)),
        }
    }

    /// Decrement a cell's volume. Returns true when the cell died and its id
    /// went back to the free list.
    pub(crate) fn lose_pixel(&mut self, id: CellId) -> CpmResult<bool> {
        if id == BACKGROUND {
            return Ok(false);
        }
        let slot = id as usize;
        let entry = self
            .entries
            .get_mut(slot)
            .and_then(|e| e.as_mut())
            .ok_or_else(|| CpmError::invariant(format!("pixel removed from dead cell {}", id)))?;
        if entry.volume == 0 {
            return Err(CpmError::invariant(format!(
                "volume of cell {} would go negative",
                id
            )));
        }
        entry.volume -= 1;
        if entry.volume > 0 {
            return Ok(false);
        }
        self.entries[slot] = None;
        self.free.push(Reverse(id));
        self.live -= 1;
        Ok(true)
    }
}
