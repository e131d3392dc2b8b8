//! The finished structure handed back to the caller.
//!
//! A [`Molecule`] is a snapshot of the single closed fragment left after
//! bond resolution, with hydrogens folded into per-atom counts. Nodes are
//! ordered as the fragment's atoms were, so locant order survives.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

use petgraph::algo::connected_components;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};

use crate::element::Element;
use crate::fragment::{AtomId, BondOrder, FragmentId, FragmentManager};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MolAtom {
    pub element: Element,
    pub locants: Vec<String>,
    pub charge: i8,
    pub hydrogens: u8,
    pub radical_electrons: u8,
}

#[derive(Debug, Clone, Default)]
pub struct Molecule {
    graph: UnGraph<MolAtom, BondOrder>,
}

impl Molecule {
    pub(crate) fn from_fragment(
        fm: &FragmentManager,
        frag: FragmentId,
        hydrogens: &BTreeMap<AtomId, u8>,
    ) -> Self {
        let mut graph = UnGraph::default();
        let mut index: HashMap<AtomId, NodeIndex> = HashMap::new();
        for &a in fm.fragment(frag).atoms() {
            let atom = fm.atom(a);
            let node = graph.add_node(MolAtom {
                element: atom.element,
                locants: atom.locants.clone(),
                charge: atom.charge,
                hydrogens: hydrogens.get(&a).copied().unwrap_or(0),
                radical_electrons: atom.radical_electrons,
            });
            index.insert(a, node);
        }
        for (a, b, order) in fm.fragment_bonds(frag) {
            graph.add_edge(index[&a], index[&b], order);
        }
        Self { graph }
    }

    pub fn graph(&self) -> &UnGraph<MolAtom, BondOrder> {
        &self.graph
    }

    pub fn atom(&self, idx: NodeIndex) -> &MolAtom {
        &self.graph[idx]
    }

    pub fn bond(&self, idx: EdgeIndex) -> BondOrder {
        self.graph[idx]
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn atoms(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn bonds(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edge_indices()
    }

    pub fn neighbors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(idx)
    }

    pub fn bond_between(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(a, b)
    }

    /// Sum of incident bond orders of `idx`.
    pub fn bond_order_sum(&self, idx: NodeIndex) -> u8 {
        self.graph.edges(idx).map(|e| e.weight().value()).sum()
    }

    /// The first atom carrying `locant`.
    pub fn atom_by_locant(&self, locant: &str) -> Option<NodeIndex> {
        self.atoms()
            .find(|&n| self.graph[n].locants.iter().any(|l| l == locant))
    }

    /// Disconnected pieces, e.g. the ions of a salt.
    pub fn component_count(&self) -> usize {
        connected_components(&self.graph)
    }

    /// Independent rings: bonds minus atoms plus components.
    pub fn ring_count(&self) -> usize {
        (self.bond_count() + self.component_count()).saturating_sub(self.atom_count())
    }

    pub fn count_element(&self, element: Element) -> usize {
        self.atoms().filter(|&n| self.graph[n].element == element).count()
    }

    pub fn net_charge(&self) -> i32 {
        self.atoms().map(|n| self.graph[n].charge as i32).sum()
    }

    /// Molecular formula in Hill order: C, then H, then the rest
    /// alphabetically; without carbon, everything alphabetically. Net charge
    /// is appended as `+`, `2+`, `-`, `2-`.
    pub fn formula(&self) -> String {
        let mut counts: BTreeMap<&'static str, u32> = BTreeMap::new();
        for idx in self.atoms() {
            let a = &self.graph[idx];
            *counts.entry(a.element.symbol()).or_default() += 1;
            if a.hydrogens > 0 {
                *counts.entry("H").or_default() += a.hydrogens as u32;
            }
        }

        let mut result = String::new();
        if let Some(c) = counts.remove("C") {
            append_element(&mut result, "C", c);
            if let Some(h) = counts.remove("H") {
                append_element(&mut result, "H", h);
            }
        }
        for (sym, count) in &counts {
            append_element(&mut result, sym, *count);
        }

        let net_charge = self.net_charge();
        match net_charge {
            1 => result.push('+'),
            -1 => result.push('-'),
            c if c > 1 => {
                let _ = write!(result, "{c}+");
            }
            c if c < -1 => {
                let _ = write!(result, "{}-", c.unsigned_abs());
            }
            _ => {}
        }
        result
    }
}

fn append_element(buf: &mut String, symbol: &str, count: u32) {
    buf.push_str(symbol);
    if count > 1 {
        let _ = write!(buf, "{count}");
    }
}
