//! Functional-class names: substituent words bonded to the functional atoms
//! of the full word after them (`ethyl acetate`, `dimethyl oxalate`).

use tracing::debug;

use crate::error::{BuildError, StructureBuildingError};
use crate::fragment::{AtomId, FragmentId, FragmentManager};
use crate::tree::WordKind;

use super::resolve::outs_of_fragment;
use super::Session;

#[derive(Debug, Clone)]
pub(super) struct Word {
    pub kind: WordKind,
    pub fragments: Vec<FragmentId>,
}

/// Whether `atom` can take `order` more bonds, counting an anionic atom as
/// the neutral atom it becomes once bonded.
fn joinable(fm: &FragmentManager, atom: AtomId, order: u8) -> bool {
    let a = fm.atom(atom);
    if a.charge >= 0 {
        return fm.free_valence(atom) >= order as i16;
    }
    let used = fm.used_valence(atom);
    a.element
        .valences_for_charge(a.charge + 1)
        .iter()
        .any(|&v| v >= used + order)
}

impl Session<'_> {
    pub(super) fn join_words(&mut self, words: &[Word]) -> Result<(), BuildError> {
        for (i, word) in words.iter().enumerate() {
            if word.kind != WordKind::Substituent {
                continue;
            }
            let target = words[i + 1..]
                .iter()
                .find(|w| w.kind == WordKind::Full)
                .ok_or(StructureBuildingError::NoFunctionalAtom)?;
            let outs: Vec<_> = word
                .fragments
                .iter()
                .flat_map(|&f| outs_of_fragment(&self.fm, f))
                .collect();
            for out in outs {
                let atom = self.take_functional_atom(target, out.order.value())?;
                self.fm.create_bond(out.atom, atom, out.order)?;
                self.fm.fragment_mut(out.frag).take_out_atom(out.atom, out.order);
                let joined = self.fm.atom_mut(atom);
                if joined.charge < 0 {
                    joined.charge += 1;
                }
                debug!(from = %out.atom, to = %atom, "functional-class bond");
            }
        }
        Ok(())
    }

    /// The first functional atom of `word` able to take the bond. An atom
    /// in an ambiguity set stands for the whole set.
    fn take_functional_atom(&mut self, word: &Word, order: u8) -> Result<AtomId, StructureBuildingError> {
        for &frag in &word.fragments {
            for atom in self.fm.fragment(frag).functional_atoms().to_vec() {
                let chosen = match self.fm.ambiguity_set_of(atom) {
                    Some(set) => self.fm.resolve_ambiguity(set, |fm, a| joinable(fm, a, order)),
                    None => joinable(&self.fm, atom, order).then_some(atom),
                };
                if let Some(chosen) = chosen {
                    self.fm.fragment_mut(frag).remove_functional_atom(atom);
                    return Ok(chosen);
                }
            }
        }
        Err(StructureBuildingError::NoFunctionalAtom)
    }
}
