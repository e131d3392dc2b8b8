//! Atoms, bonds and fragments, and the per-name [`FragmentManager`] that owns
//! them.
//!
//! A [`Fragment`] is the structure contributed by one name component (a chain,
//! a ring, a substituent group). Fragments start disconnected and are joined
//! by bonds and merged by the ring assembler and the bond resolution engine
//! until a single closed fragment remains.

mod atom;
mod bond;
mod manager;

use std::fmt;

use serde::Deserialize;

pub use atom::{prime_count, strip_primes, Atom, AtomId};
pub use bond::{Bond, BondOrder};
pub use manager::FragmentManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentId(pub(crate) u32);

impl FragmentId {
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Broad classification of a fragment, used to pick bonding behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FragmentKind {
    #[default]
    Chain,
    Ring,
    FusedRing,
    RingAssembly,
    Substituent,
    Suffix,
}

/// A pending outgoing open valence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutAtom {
    pub atom: AtomId,
    pub order: BondOrder,
    /// Whether the position was fixed by the name rather than defaulted.
    pub set_explicitly: bool,
    /// Locant on the target this valence must bond to, when known in advance.
    pub target_locant: Option<String>,
}

impl OutAtom {
    pub fn new(atom: AtomId, order: BondOrder) -> Self {
        Self {
            atom,
            order,
            set_explicitly: false,
            target_locant: None,
        }
    }
}

/// A pending incoming open valence of a multiplicative root component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InAtom {
    pub atom: AtomId,
    pub order: BondOrder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub(crate) id: FragmentId,
    pub(crate) kind: FragmentKind,
    pub(crate) subtype: Option<String>,
    /// Insertion order seeds the canonical numbering.
    pub(crate) atoms: Vec<AtomId>,
    pub(crate) out_atoms: Vec<OutAtom>,
    pub(crate) in_atoms: Vec<InAtom>,
    pub(crate) functional_atoms: Vec<AtomId>,
    pub(crate) default_in_atom: Option<AtomId>,
}

impl Fragment {
    pub(crate) fn new(id: FragmentId, kind: FragmentKind, subtype: Option<String>) -> Self {
        Self {
            id,
            kind,
            subtype,
            atoms: Vec::new(),
            out_atoms: Vec::new(),
            in_atoms: Vec::new(),
            functional_atoms: Vec::new(),
            default_in_atom: None,
        }
    }

    pub fn id(&self) -> FragmentId {
        self.id
    }

    pub fn kind(&self) -> FragmentKind {
        self.kind
    }

    pub fn subtype(&self) -> Option<&str> {
        self.subtype.as_deref()
    }

    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn first_atom(&self) -> Option<AtomId> {
        self.atoms.first().copied()
    }

    pub fn contains(&self, atom: AtomId) -> bool {
        self.atoms.contains(&atom)
    }

    pub fn out_atoms(&self) -> &[OutAtom] {
        &self.out_atoms
    }

    pub fn in_atoms(&self) -> &[InAtom] {
        &self.in_atoms
    }

    pub fn functional_atoms(&self) -> &[AtomId] {
        &self.functional_atoms
    }

    pub fn default_in_atom(&self) -> Option<AtomId> {
        self.default_in_atom
    }

    pub fn add_out_atom(&mut self, out: OutAtom) {
        self.out_atoms.push(out);
    }

    /// Removes the last pending out atom on `atom` with bond order `order`.
    pub fn take_out_atom(&mut self, atom: AtomId, order: BondOrder) -> Option<OutAtom> {
        let index = self
            .out_atoms
            .iter()
            .rposition(|o| o.atom == atom && o.order == order)?;
        Some(self.out_atoms.remove(index))
    }

    pub fn add_in_atom(&mut self, atom: AtomId, order: BondOrder) {
        self.in_atoms.push(InAtom { atom, order });
    }

    /// Removes and returns the oldest pending in atom.
    pub fn take_in_atom(&mut self) -> Option<InAtom> {
        if self.in_atoms.is_empty() {
            None
        } else {
            Some(self.in_atoms.remove(0))
        }
    }

    pub fn add_functional_atom(&mut self, atom: AtomId) {
        self.functional_atoms.push(atom);
    }

    pub fn remove_functional_atom(&mut self, atom: AtomId) -> bool {
        let before = self.functional_atoms.len();
        self.functional_atoms.retain(|&a| a != atom);
        self.functional_atoms.len() != before
    }

    pub fn set_default_in_atom(&mut self, atom: Option<AtomId>) {
        self.default_in_atom = atom;
    }

    /// Sum of the bond orders of every pending outgoing valence on `atom`.
    pub fn pending_out_valence(&self, atom: AtomId) -> u8 {
        self.out_atoms
            .iter()
            .filter(|o| o.atom == atom)
            .map(|o| o.order.value())
            .sum()
    }

    /// Replaces the atom sequence with `order`, which must be a permutation of it.
    pub(crate) fn reorder_atoms(&mut self, order: Vec<AtomId>) {
        debug_assert_eq!(order.len(), self.atoms.len());
        self.atoms = order;
    }
}
