use std::collections::BTreeMap;

use crate::error::StructureBuildingError;
use crate::fragment::{AtomId, FragmentId, FragmentManager};

/// Bond orders plus radical electrons: everything but hydrogen.
pub fn bonded_valence(fm: &FragmentManager, atom: AtomId) -> u8 {
    fm.bond_order_sum(atom) + fm.atom(atom).radical_electrons
}

/// Hydrogens `atom` carries once every bond is in place: the fixed count of a
/// bracket atom, otherwise whatever fills the lowest allowed valence that
/// accommodates its bonds.
pub fn implicit_hydrogens(fm: &FragmentManager, atom: AtomId) -> Result<u8, StructureBuildingError> {
    let a = fm.atom(atom);
    if let Some(h) = a.explicit_hydrogens {
        return Ok(h);
    }
    let used = bonded_valence(fm, atom);
    let allowed = a.allowed_valences();
    if allowed.is_empty() {
        return Ok(0);
    }
    allowed
        .iter()
        .find(|&&v| v >= used)
        .map(|&v| v - used)
        .ok_or_else(|| StructureBuildingError::Valence {
            atom,
            element: a.element,
            bonds: used,
            allowed,
        })
}

/// Hydrogen counts for every atom of `frag`, in atom order.
pub fn complete_hydrogens(
    fm: &FragmentManager,
    frag: FragmentId,
) -> Result<BTreeMap<AtomId, u8>, StructureBuildingError> {
    fm.fragment(frag)
        .atoms()
        .iter()
        .map(|&a| implicit_hydrogens(fm, a).map(|h| (a, h)))
        .collect()
}

/// Checks bonds + hydrogens + radicals against the allowed valences of every
/// atom. Atoms with no valence table (metals carrying a charge) are skipped.
pub fn check_valence(
    fm: &FragmentManager,
    frag: FragmentId,
    hydrogens: &BTreeMap<AtomId, u8>,
) -> Result<(), Vec<StructureBuildingError>> {
    let errors: Vec<StructureBuildingError> = fm
        .fragment(frag)
        .atoms()
        .iter()
        .filter_map(|&idx| {
            let atom = fm.atom(idx);
            let allowed = atom.allowed_valences();
            if allowed.is_empty() {
                return None;
            }
            let v = bonded_valence(fm, idx) + hydrogens.get(&idx).copied().unwrap_or(0);
            if allowed.contains(&v) {
                return None;
            }
            Some(StructureBuildingError::Valence {
                atom: idx,
                element: atom.element,
                bonds: v,
                allowed,
            })
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
