use std::collections::{BTreeMap, HashMap};

use petgraph::graphmap::UnGraphMap;

use crate::element::Element;
use crate::error::StructureBuildingError;
use crate::fragment::{Atom, AtomId, Bond, BondOrder, Fragment, FragmentId, FragmentKind, InAtom, OutAtom};

/// Owner of every atom, bond and fragment built for one name.
///
/// Connectivity lives in a single graph keyed by [`AtomId`], so bonds between
/// atoms of different fragments need no special handling before the fragments
/// are merged. A manager is created per name and dropped afterwards; ids are
/// never reused within it.
#[derive(Debug, Clone, Default)]
pub struct FragmentManager {
    atoms: BTreeMap<AtomId, Atom>,
    graph: UnGraphMap<AtomId, Bond>,
    fragments: BTreeMap<FragmentId, Fragment>,
    next_atom: u32,
    next_fragment: u32,
    ambiguity_sets: Vec<Vec<AtomId>>,
}

impl FragmentManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_fragment(&mut self, kind: FragmentKind, subtype: Option<String>) -> FragmentId {
        let id = FragmentId(self.next_fragment);
        self.next_fragment += 1;
        self.fragments.insert(id, Fragment::new(id, kind, subtype));
        id
    }

    pub fn add_atom(&mut self, fragment: FragmentId, element: Element) -> AtomId {
        let id = AtomId(self.next_atom);
        self.next_atom += 1;
        self.atoms.insert(id, Atom::new(id, fragment, element));
        self.graph.add_node(id);
        self.fragment_mut(fragment).atoms.push(id);
        id
    }

    pub fn atom(&self, id: AtomId) -> &Atom {
        &self.atoms[&id]
    }

    pub fn atom_mut(&mut self, id: AtomId) -> &mut Atom {
        self.atoms
            .get_mut(&id)
            .unwrap_or_else(|| panic!("atom {id} is not owned by this manager"))
    }

    pub fn contains_atom(&self, id: AtomId) -> bool {
        self.atoms.contains_key(&id)
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn fragment(&self, id: FragmentId) -> &Fragment {
        &self.fragments[&id]
    }

    pub fn fragment_mut(&mut self, id: FragmentId) -> &mut Fragment {
        self.fragments
            .get_mut(&id)
            .unwrap_or_else(|| panic!("fragment {id} is not owned by this manager"))
    }

    pub fn contains_fragment(&self, id: FragmentId) -> bool {
        self.fragments.contains_key(&id)
    }

    pub fn fragment_ids(&self) -> Vec<FragmentId> {
        self.fragments.keys().copied().collect()
    }

    /// The fragment owning `atom`.
    pub fn fragment_of(&self, atom: AtomId) -> FragmentId {
        self.atom(atom).fragment
    }

    pub fn create_bond(
        &mut self,
        a: AtomId,
        b: AtomId,
        order: BondOrder,
    ) -> Result<(), StructureBuildingError> {
        if a == b || self.graph.contains_edge(a, b) {
            return Err(StructureBuildingError::InvalidBond(a, b));
        }
        self.graph.add_edge(a, b, Bond::new(order));
        Ok(())
    }

    pub fn bond(&self, a: AtomId, b: AtomId) -> Option<Bond> {
        self.graph.edge_weight(a, b).copied()
    }

    pub fn set_bond_order(&mut self, a: AtomId, b: AtomId, order: BondOrder) -> bool {
        match self.graph.edge_weight_mut(a, b) {
            Some(bond) => {
                bond.order = order;
                true
            }
            None => false,
        }
    }

    pub fn neighbors(&self, atom: AtomId) -> impl Iterator<Item = AtomId> + '_ {
        self.graph.neighbors(atom)
    }

    /// Neighbours paired with the order of the connecting bond.
    pub fn bonded(&self, atom: AtomId) -> Vec<(AtomId, BondOrder)> {
        self.graph
            .edges(atom)
            .map(|(_, other, bond)| (other, bond.order))
            .collect()
    }

    pub fn degree(&self, atom: AtomId) -> usize {
        self.graph.neighbors(atom).count()
    }

    pub fn bond_order_sum(&self, atom: AtomId) -> u8 {
        self.graph
            .edges(atom)
            .map(|(_, _, bond)| bond.order.value())
            .sum()
    }

    /// Every bond whose two atoms belong to `fragment`, each reported once.
    pub fn fragment_bonds(&self, fragment: FragmentId) -> Vec<(AtomId, AtomId, BondOrder)> {
        let frag = self.fragment(fragment);
        let mut bonds = Vec::new();
        for &a in &frag.atoms {
            for (_, b, bond) in self.graph.edges(a) {
                if a < b && self.atom(b).fragment == fragment {
                    bonds.push((a, b, bond.order));
                }
            }
        }
        bonds
    }

    /// Valence units already committed on `atom`: bonds, pending open
    /// valences, a spare valency, radicals and fixed hydrogens.
    pub fn used_valence(&self, atom: AtomId) -> u8 {
        let a = self.atom(atom);
        let pending = self.fragment(a.fragment).pending_out_valence(atom);
        self.bond_order_sum(atom)
            + pending
            + u8::from(a.spare_valency)
            + a.radical_electrons
            + a.explicit_hydrogens.unwrap_or(0)
    }

    /// Remaining substitutable valence of `atom` at its lowest accommodating
    /// valence; negative when the atom is already over-bonded.
    pub fn free_valence(&self, atom: AtomId) -> i16 {
        let used = self.used_valence(atom) as i16;
        let allowed = self.atom(atom).allowed_valences();
        match allowed.iter().map(|&v| v as i16).find(|&v| v >= used) {
            Some(v) => v - used,
            None => allowed.last().map_or(-used, |&v| v as i16 - used),
        }
    }

    pub fn atom_by_locant(&self, fragment: FragmentId, locant: &str) -> Option<AtomId> {
        self.fragment(fragment)
            .atoms
            .iter()
            .copied()
            .find(|&a| self.atom(a).has_locant(locant))
    }

    /// Number of neighbours of `atom` that are ring atoms of the same fragment.
    pub fn ring_neighbor_count(&self, atom: AtomId) -> usize {
        let frag = self.atom(atom).fragment;
        self.neighbors(atom)
            .filter(|&n| {
                let other = self.atom(n);
                other.in_ring && other.fragment == frag
            })
            .count()
    }

    /// Deletes `atom` together with its bonds and every reference the owning
    /// fragment holds to it.
    pub fn remove_atom(&mut self, atom: AtomId) {
        let Some(removed) = self.atoms.remove(&atom) else {
            return;
        };
        self.graph.remove_node(atom);
        if let Some(frag) = self.fragments.get_mut(&removed.fragment) {
            frag.atoms.retain(|&a| a != atom);
            frag.out_atoms.retain(|o| o.atom != atom);
            frag.in_atoms.retain(|i| i.atom != atom);
            frag.functional_atoms.retain(|&a| a != atom);
            if frag.default_in_atom == Some(atom) {
                frag.default_in_atom = None;
            }
        }
        for set in &mut self.ambiguity_sets {
            set.retain(|&a| a != atom);
        }
    }

    /// Moves every atom and pending valence of `from` into `into` and discards
    /// `from`. Bonds are untouched: they already live in the shared graph.
    pub fn incorporate(&mut self, into: FragmentId, from: FragmentId) {
        if into == from {
            return;
        }
        let Some(source) = self.fragments.remove(&from) else {
            return;
        };
        for &a in &source.atoms {
            if let Some(atom) = self.atoms.get_mut(&a) {
                atom.fragment = into;
            }
        }
        let target = self.fragment_mut(into);
        target.atoms.extend(source.atoms);
        target.out_atoms.extend(source.out_atoms);
        target.in_atoms.extend(source.in_atoms);
        target.functional_atoms.extend(source.functional_atoms);
        if target.default_in_atom.is_none() {
            target.default_in_atom = source.default_in_atom;
        }
    }

    /// Deep copy of `fragment` whose locants carry `primes` extra prime marks.
    ///
    /// Only bonds internal to the fragment are copied.
    pub fn clone_fragment(&mut self, fragment: FragmentId, primes: usize) -> FragmentId {
        let source = self.fragment(fragment).clone();
        let copy = self.create_fragment(source.kind, source.subtype.clone());
        let mut map: HashMap<AtomId, AtomId> = HashMap::with_capacity(source.atoms.len());

        for &old in &source.atoms {
            let template = self.atom(old).clone();
            let new = self.add_atom(copy, template.element);
            let atom = self.atom_mut(new);
            atom.locants = template.locants;
            atom.charge = template.charge;
            atom.lambda = template.lambda;
            atom.spare_valency = template.spare_valency;
            atom.in_ring = template.in_ring;
            atom.explicit_hydrogens = template.explicit_hydrogens;
            atom.radical_electrons = template.radical_electrons;
            atom.add_primes(primes);
            map.insert(old, new);
        }

        for (a, b, order) in self.fragment_bonds(fragment) {
            self.graph.add_edge(map[&a], map[&b], Bond::new(order));
        }

        let frag = self.fragment_mut(copy);
        frag.out_atoms = source
            .out_atoms
            .iter()
            .map(|o| OutAtom {
                atom: map[&o.atom],
                ..o.clone()
            })
            .collect();
        frag.in_atoms = source
            .in_atoms
            .iter()
            .map(|i| InAtom {
                atom: map[&i.atom],
                order: i.order,
            })
            .collect();
        frag.functional_atoms = source.functional_atoms.iter().map(|a| map[a]).collect();
        frag.default_in_atom = source.default_in_atom.map(|a| map[&a]);

        let copied_sets: Vec<Vec<AtomId>> = self
            .ambiguity_sets
            .iter()
            .filter(|set| set.iter().all(|a| map.contains_key(a)))
            .map(|set| set.iter().map(|a| map[a]).collect())
            .collect();
        self.ambiguity_sets.extend(copied_sets);

        copy
    }

    /// Removes `fragment` and all of its atoms and bonds.
    pub fn discard_fragment(&mut self, fragment: FragmentId) {
        let Some(frag) = self.fragments.remove(&fragment) else {
            return;
        };
        for a in frag.atoms {
            self.atoms.remove(&a);
            self.graph.remove_node(a);
            for set in &mut self.ambiguity_sets {
                set.retain(|&x| x != a);
            }
        }
    }

    /// Registers atoms any one of which may turn out to be the real site of a
    /// later operation. Returns the set's index.
    pub fn add_ambiguity_set(&mut self, atoms: Vec<AtomId>) -> usize {
        self.ambiguity_sets.push(atoms);
        self.ambiguity_sets.len() - 1
    }

    /// The oldest unresolved ambiguity set containing `atom`, if any.
    pub fn ambiguity_set_of(&self, atom: AtomId) -> Option<usize> {
        self.ambiguity_sets.iter().position(|set| set.contains(&atom))
    }

    /// Resolves the ambiguity set `index` by picking its first atom, in set
    /// order, that satisfies `accept`. The chosen atom is withdrawn from every
    /// later set and the set is emptied.
    pub fn resolve_ambiguity(
        &mut self,
        index: usize,
        accept: impl Fn(&Self, AtomId) -> bool,
    ) -> Option<AtomId> {
        let chosen = self
            .ambiguity_sets
            .get(index)?
            .iter()
            .copied()
            .find(|&a| accept(self, a))?;
        self.ambiguity_sets[index].clear();
        for set in self.ambiguity_sets.iter_mut().skip(index + 1) {
            set.retain(|&a| a != chosen);
        }
        Some(chosen)
    }
}
