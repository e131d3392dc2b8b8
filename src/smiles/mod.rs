//! Seed structures: the primitive fragments name components start from.
//!
//! A seed is written in a SMILES-like syntax (organic and bracket atoms,
//! `- = #` bonds, branches, ring closures, lowercase atoms carrying a spare
//! valency) plus a locant labelling scheme and a few per-atom annotations.
//! A bond symbol at either end of the string leaves an open valence.

mod builder;
pub mod error;
mod parse_tree;
mod tokenizer;
mod writer;

use serde::Deserialize;
use tracing::trace;

use crate::fragment::{AtomId, BondOrder, FragmentId, FragmentKind, FragmentManager, OutAtom};
pub use error::SmilesError;
pub use writer::write_skeleton;

/// How the atoms of a seed are labelled with locants.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Labels {
    /// No locants at all (e.g. a carboxy group).
    None,
    /// `1..=n` in atom order.
    #[default]
    Numeric,
    /// Numbered by the fused ring numberer once the fragment is built.
    FusedRing,
    /// `/` separates atoms and `,` separates several locants of one atom, so
    /// `"1/2/3,3a"` gives atom 2 the locants `3` and `3a`. An empty entry
    /// leaves that atom unlabelled.
    Explicit(String),
}

/// A primitive fragment definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seed {
    pub smiles: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub kind: FragmentKind,
    #[serde(default)]
    pub subtype: Option<String>,
    /// Open valences beyond those written as terminal bond symbols.
    #[serde(default)]
    pub out_atoms: Vec<(usize, BondOrder)>,
    /// Atoms that form esters, anhydrides and the like in functional-class
    /// names (the hydroxy oxygens of an acid).
    #[serde(default)]
    pub functional_atoms: Vec<usize>,
    /// Groups of equivalent atoms only one of which is the real site; the
    /// choice is deferred until something needs it.
    #[serde(default)]
    pub ambiguous_atoms: Vec<Vec<usize>>,
    /// Atom that receives incoming bonds when nothing says otherwise.
    #[serde(default)]
    pub default_in_atom: Option<usize>,
}

impl Seed {
    pub fn new(smiles: impl Into<String>) -> Self {
        Self {
            smiles: smiles.into(),
            labels: Labels::Numeric,
            kind: FragmentKind::Chain,
            subtype: None,
            out_atoms: Vec::new(),
            functional_atoms: Vec::new(),
            ambiguous_atoms: Vec::new(),
            default_in_atom: None,
        }
    }

    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_kind(mut self, kind: FragmentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    pub fn with_out_atom(mut self, index: usize, order: BondOrder) -> Self {
        self.out_atoms.push((index, order));
        self
    }

    pub fn with_functional_atoms(mut self, atoms: Vec<usize>) -> Self {
        self.functional_atoms = atoms;
        self
    }

    pub fn with_ambiguous_atoms(mut self, atoms: Vec<usize>) -> Self {
        self.ambiguous_atoms.push(atoms);
        self
    }

    pub fn with_default_in_atom(mut self, index: usize) -> Self {
        self.default_in_atom = Some(index);
        self
    }
}

/// Builds `seed` as a new fragment of `fm` and returns its id.
pub fn build_seed(fm: &mut FragmentManager, seed: &Seed) -> Result<FragmentId, SmilesError> {
    let trimmed = seed.smiles.trim();
    if trimmed.is_empty() {
        return Err(SmilesError::EmptyInput);
    }
    let tokens = tokenizer::tokenize(trimmed)?;
    let tree = parse_tree::build_parse_tree(&tokens)?;
    let (frag, ids) = builder::build_fragment(fm, &tree, seed.kind, seed.subtype.clone());

    let check = |index: usize| -> Result<AtomId, SmilesError> {
        ids.get(index).copied().ok_or(SmilesError::InvalidAtomIndex {
            index,
            atoms: ids.len(),
        })
    };

    for &(index, order) in &seed.out_atoms {
        let atom = check(index)?;
        fm.fragment_mut(frag).add_out_atom(OutAtom::new(atom, order));
    }
    for &index in &seed.functional_atoms {
        let atom = check(index)?;
        fm.fragment_mut(frag).add_functional_atom(atom);
    }
    for group in &seed.ambiguous_atoms {
        let atoms = group.iter().map(|&i| check(i)).collect::<Result<Vec<_>, _>>()?;
        fm.add_ambiguity_set(atoms);
    }
    if let Some(index) = seed.default_in_atom {
        let atom = check(index)?;
        fm.fragment_mut(frag).set_default_in_atom(Some(atom));
    }

    crate::rings::mark_ring_atoms(fm, frag);

    match &seed.labels {
        Labels::None => {}
        Labels::Numeric => {
            for (i, &atom) in ids.iter().enumerate() {
                fm.atom_mut(atom).locants.push((i + 1).to_string());
            }
        }
        Labels::Explicit(text) => {
            let entries: Vec<&str> = text.split('/').collect();
            if entries.len() != ids.len() {
                return Err(SmilesError::LabelCountMismatch {
                    labels: entries.len(),
                    atoms: ids.len(),
                });
            }
            for (entry, &atom) in entries.iter().zip(&ids) {
                fm.atom_mut(atom).locants.extend(
                    entry
                        .split(',')
                        .filter(|l| !l.is_empty())
                        .map(str::to_string),
                );
            }
        }
        Labels::FusedRing => crate::fusion::number_fused_system(fm, frag),
    }

    trace!(smiles = %seed.smiles, atoms = ids.len(), %frag, "built seed");
    Ok(frag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;

    #[test]
    fn numeric_labels() {
        let mut fm = FragmentManager::new();
        let frag = build_seed(&mut fm, &Seed::new("CCO")).unwrap();
        let o = fm.atom_by_locant(frag, "3").unwrap();
        assert_eq!(fm.atom(o).element, Element::O);
    }

    #[test]
    fn explicit_labels_with_several_per_atom() {
        let mut fm = FragmentManager::new();
        let seed = Seed::new("C(=O)N").with_labels(Labels::Explicit("1,C/O/N".into()));
        let frag = build_seed(&mut fm, &seed).unwrap();
        let c = fm.atom_by_locant(frag, "C").unwrap();
        assert_eq!(fm.atom_by_locant(frag, "1"), Some(c));
        assert!(fm.atom(fm.atom_by_locant(frag, "N").unwrap()).element == Element::N);
    }

    #[test]
    fn explicit_label_count_must_match() {
        let mut fm = FragmentManager::new();
        let seed = Seed::new("CC").with_labels(Labels::Explicit("1".into()));
        assert_eq!(
            build_seed(&mut fm, &seed).unwrap_err(),
            SmilesError::LabelCountMismatch { labels: 1, atoms: 2 }
        );
    }

    #[test]
    fn ring_atoms_are_marked() {
        let mut fm = FragmentManager::new();
        let frag = build_seed(&mut fm, &Seed::new("C1CC1C")).unwrap();
        let atoms = fm.fragment(frag).atoms().to_vec();
        assert!(fm.atom(atoms[0]).in_ring);
        assert!(fm.atom(atoms[2]).in_ring);
        assert!(!fm.atom(atoms[3]).in_ring);
    }

    #[test]
    fn annotations_are_attached() {
        let mut fm = FragmentManager::new();
        let seed = Seed::new("C(=O)O")
            .with_functional_atoms(vec![2])
            .with_out_atom(0, BondOrder::Single)
            .with_default_in_atom(0);
        let frag = build_seed(&mut fm, &seed).unwrap();
        let f = fm.fragment(frag);
        assert_eq!(f.functional_atoms().len(), 1);
        assert_eq!(f.out_atoms().len(), 1);
        assert_eq!(f.default_in_atom(), f.first_atom());
    }

    #[test]
    fn bad_annotation_index() {
        let mut fm = FragmentManager::new();
        let seed = Seed::new("C").with_functional_atoms(vec![3]);
        assert!(matches!(
            build_seed(&mut fm, &seed),
            Err(SmilesError::InvalidAtomIndex { index: 3, atoms: 1 })
        ));
    }

    #[test]
    fn empty_seed() {
        let mut fm = FragmentManager::new();
        assert_eq!(
            build_seed(&mut fm, &Seed::new("  ")).unwrap_err(),
            SmilesError::EmptyInput
        );
    }

    #[test]
    fn seed_from_json() {
        let seed: Seed = serde_json::from_str(
            r#"{"smiles": "c1ccccc1", "kind": "ring", "labels": "numeric", "outAtoms": [[0, "single"]]}"#,
        )
        .unwrap();
        assert_eq!(seed.kind, FragmentKind::Ring);
        assert_eq!(seed.out_atoms, vec![(0, BondOrder::Single)]);
    }
}
