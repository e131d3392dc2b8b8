//! Kekulization turns spare valencies into double bonds.
//!
//! Every atom flagged with a spare valency must receive exactly one double
//! bond to another flagged atom over an existing single bond. The assignment
//! is a maximum matching on the subgraph of flagged atoms, found with
//! augmenting paths. If any flagged atom stays unmatched (an odd ring, or an
//! unsaturation whose partner was consumed by substitution), [`kekulize`]
//! fails with the unmatched atoms.

use std::collections::{BTreeMap, HashMap, VecDeque};

use tracing::debug;

use crate::error::StructureBuildingError;
use crate::fragment::{AtomId, BondOrder, FragmentId, FragmentManager};

/// Replaces the spare valencies of `frag` with double bonds and clears the
/// flags.
pub fn kekulize(fm: &mut FragmentManager, frag: FragmentId) -> Result<(), StructureBuildingError> {
    let flagged: Vec<AtomId> = fm
        .fragment(frag)
        .atoms()
        .iter()
        .copied()
        .filter(|&a| fm.atom(a).spare_valency)
        .collect();
    if flagged.is_empty() {
        return Ok(());
    }

    // BTreeMap keeps the search order, and so the chosen structure,
    // independent of hashing.
    let mut adj: BTreeMap<AtomId, Vec<AtomId>> = flagged.iter().map(|&a| (a, Vec::new())).collect();
    for &a in &flagged {
        for (b, order) in fm.bonded(a) {
            if order == BondOrder::Single && fm.atom(b).spare_valency {
                if let Some(list) = adj.get_mut(&a) {
                    list.push(b);
                }
            }
        }
    }
    for list in adj.values_mut() {
        list.sort_unstable();
    }

    let mut mate: HashMap<AtomId, AtomId> = HashMap::with_capacity(flagged.len());
    for &start in &flagged {
        if !mate.contains_key(&start) {
            augment(&adj, &mut mate, start);
        }
    }

    let unmatched: Vec<AtomId> = flagged.iter().copied().filter(|a| !mate.contains_key(a)).collect();
    if !unmatched.is_empty() {
        return Err(StructureBuildingError::UnresolvedSpareValency(unmatched));
    }

    let mut doubles = 0;
    for (&a, &b) in &mate {
        if a < b {
            fm.set_bond_order(a, b, BondOrder::Double);
            doubles += 1;
        }
    }
    for a in flagged {
        fm.atom_mut(a).spare_valency = false;
    }
    debug!(%frag, doubles, "placed double bonds");
    Ok(())
}

fn augment(adj: &BTreeMap<AtomId, Vec<AtomId>>, mate: &mut HashMap<AtomId, AtomId>, start: AtomId) -> bool {
    let mut prev: HashMap<AtomId, AtomId> = HashMap::new();
    let mut visited: Vec<AtomId> = vec![start];
    let mut queue = VecDeque::from([start]);

    while let Some(u) = queue.pop_front() {
        let Some(neighbors) = adj.get(&u) else {
            continue;
        };
        for &v in neighbors {
            if visited.contains(&v) || mate.get(&u) == Some(&v) {
                continue;
            }
            visited.push(v);
            prev.insert(v, u);

            let Some(&w) = mate.get(&v) else {
                flip_path(mate, &prev, start, v);
                return true;
            };
            if !visited.contains(&w) {
                visited.push(w);
                prev.insert(w, v);
                queue.push_back(w);
            }
        }
    }
    false
}

/// Walks the alternating path back from `end`, matching every other pair.
fn flip_path(mate: &mut HashMap<AtomId, AtomId>, prev: &HashMap<AtomId, AtomId>, start: AtomId, end: AtomId) {
    let mut cur = end;
    let mut is_new_match = true;
    while cur != start {
        let Some(&p) = prev.get(&cur) else {
            return;
        };
        if is_new_match {
            mate.insert(cur, p);
            mate.insert(p, cur);
        }
        is_new_match = !is_new_match;
        cur = p;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::{build_seed, Seed};

    fn kekulized(smiles: &str) -> Result<(FragmentManager, FragmentId), StructureBuildingError> {
        let mut fm = FragmentManager::new();
        let frag = build_seed(&mut fm, &Seed::new(smiles)).unwrap();
        kekulize(&mut fm, frag)?;
        Ok((fm, frag))
    }

    fn count_double_bonds(fm: &FragmentManager, frag: FragmentId) -> usize {
        fm.fragment_bonds(frag)
            .iter()
            .filter(|(_, _, o)| *o == BondOrder::Double)
            .count()
    }

    fn is_valid_kekulization(fm: &FragmentManager, frag: FragmentId) -> bool {
        fm.fragment(frag).atoms().iter().all(|&a| {
            fm.bonded(a).iter().filter(|(_, o)| *o == BondOrder::Double).count() <= 1
                && !fm.atom(a).spare_valency
        })
    }

    #[test]
    fn benzene() {
        let (fm, frag) = kekulized("c1ccccc1").unwrap();
        assert_eq!(count_double_bonds(&fm, frag), 3);
        assert!(is_valid_kekulization(&fm, frag));
    }

    #[test]
    fn naphthalene() {
        let (fm, frag) = kekulized("c1ccc2ccccc2c1").unwrap();
        assert_eq!(count_double_bonds(&fm, frag), 5);
        assert!(is_valid_kekulization(&fm, frag));
    }

    #[test]
    fn pyrrole_nitrogen_keeps_single_bonds() {
        let (fm, frag) = kekulized("[nH]1cccc1").unwrap();
        assert_eq!(count_double_bonds(&fm, frag), 2);
        let n = fm.fragment(frag).atoms()[0];
        assert!(fm.bonded(n).iter().all(|(_, o)| *o == BondOrder::Single));
    }

    #[test]
    fn furan() {
        let (fm, frag) = kekulized("o1cccc1").unwrap();
        assert_eq!(count_double_bonds(&fm, frag), 2);
        assert!(is_valid_kekulization(&fm, frag));
    }

    #[test]
    fn anthracene() {
        let (fm, frag) = kekulized("c1ccc2cc3ccccc3cc2c1").unwrap();
        assert_eq!(count_double_bonds(&fm, frag), 7);
        assert!(is_valid_kekulization(&fm, frag));
    }

    #[test]
    fn substituent_does_not_disturb_ring() {
        let (fm, frag) = kekulized("Cc1ccccc1").unwrap();
        let atoms = fm.fragment(frag).atoms();
        assert_eq!(fm.bond(atoms[0], atoms[1]).unwrap().order, BondOrder::Single);
        assert_eq!(count_double_bonds(&fm, frag), 3);
    }

    #[test]
    fn odd_ring_fails_with_unmatched_atom() {
        let err = kekulized("c1cccc1").unwrap_err();
        match err {
            StructureBuildingError::UnresolvedSpareValency(atoms) => assert_eq!(atoms.len(), 1),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn no_flags_is_a_no_op() {
        let (fm, frag) = kekulized("C=CC").unwrap();
        assert_eq!(count_double_bonds(&fm, frag), 1);
    }
}
