use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::fragment::{AtomId, FragmentId, FragmentManager};
use crate::fusion::edge::is_bridgehead;
use crate::rings::RingInfo;

/// A fused-ring locant: `4` is `(4, 0)`, `4a` is `(4, 1)`.
type Locant = (u32, u8);

fn format_locant((number, letter): Locant) -> String {
    if letter == 0 {
        number.to_string()
    } else {
        format!("{number}{}", char::from(b'a' + letter - 1))
    }
}

/// Numbers a fused ring system and rewrites its atom sequence in locant
/// order. Atom ids are untouched.
///
/// The periphery is walked from a non-fusion atom that follows a fusion
/// atom, in either direction; fusion carbons take the preceding number plus
/// a letter and every other atom, fusion heteroatoms included, takes the
/// next number. Interior atoms take
/// a letter after the highest-numbered neighbour. Of all walks the one
/// giving heteroatoms the lowest locants wins, then the one giving fusion
/// atoms the lowest locants, then the first.
pub fn number_fused_system(fm: &mut FragmentManager, frag: FragmentId) {
    let Some(cycle) = peripheral_cycle(fm, frag) else {
        debug!(%frag, "periphery is not a simple cycle, numbering in atom order");
        number_in_order(fm, frag);
        return;
    };

    let atoms = fm.fragment(frag).atoms().to_vec();
    let fusion: HashSet<AtomId> = cycle.iter().copied().filter(|&a| is_bridgehead(fm, a)).collect();
    let on_cycle: HashSet<AtomId> = cycle.iter().copied().collect();
    let interior: Vec<AtomId> = atoms
        .iter()
        .copied()
        .filter(|a| !on_cycle.contains(a) && fm.atom(*a).in_ring)
        .collect();
    let heteroatoms: Vec<AtomId> = atoms
        .iter()
        .copied()
        .filter(|&a| !fm.atom(a).element.is_carbon())
        .collect();

    let n = cycle.len();
    let reversed: Vec<AtomId> = cycle.iter().rev().copied().collect();
    let mut best: Option<(Vec<Locant>, Vec<Locant>, HashMap<AtomId, Locant>)> = None;

    for walk in [&cycle, &reversed] {
        for start in 0..n {
            let here = walk[start];
            let prev = walk[(start + n - 1) % n];
            if fusion.contains(&here) || (!fusion.is_empty() && !fusion.contains(&prev)) {
                continue;
            }
            let order: Vec<AtomId> = (0..n).map(|k| walk[(start + k) % n]).collect();
            let labels = label_walk(fm, &order, &fusion, &interior);

            let mut hetero_key: Vec<Locant> = heteroatoms.iter().filter_map(|a| labels.get(a).copied()).collect();
            hetero_key.sort_unstable();
            let mut fusion_key: Vec<Locant> = fusion.iter().map(|a| labels[a]).collect();
            fusion_key.sort_unstable();

            let better = match &best {
                None => true,
                Some((h, f, _)) => (&hetero_key, &fusion_key) < (h, f),
            };
            if better {
                best = Some((hetero_key, fusion_key, labels));
            }
        }
    }

    let Some((_, _, labels)) = best else {
        number_in_order(fm, frag);
        return;
    };

    for (&atom, &locant) in &labels {
        fm.atom_mut(atom).locants = vec![format_locant(locant)];
    }
    let mut ordered = atoms;
    ordered.sort_by_key(|a| labels.get(a).copied().unwrap_or((u32::MAX, 0)));
    fm.fragment_mut(frag).reorder_atoms(ordered);
}

fn label_walk(
    fm: &FragmentManager,
    order: &[AtomId],
    fusion: &HashSet<AtomId>,
    interior: &[AtomId],
) -> HashMap<AtomId, Locant> {
    let mut labels: HashMap<AtomId, Locant> = HashMap::with_capacity(order.len() + interior.len());
    let mut last_letter: HashMap<u32, u8> = HashMap::new();
    let mut number = 0u32;

    for &atom in order {
        if fusion.contains(&atom) && fm.atom(atom).element.is_carbon() {
            let letter = last_letter.entry(number).or_insert(0);
            *letter += 1;
            labels.insert(atom, (number, *letter));
        } else {
            number += 1;
            labels.insert(atom, (number, 0));
        }
    }

    let mut pending: Vec<AtomId> = interior.to_vec();
    while !pending.is_empty() {
        let before = pending.len();
        pending.retain(|&atom| {
            let highest = fm
                .neighbors(atom)
                .filter_map(|nb| labels.get(&nb).copied())
                .max();
            match highest {
                Some((num, _)) => {
                    let letter = last_letter.entry(num).or_insert(0);
                    *letter += 1;
                    labels.insert(atom, (num, *letter));
                    false
                }
                None => true,
            }
        });
        if pending.len() == before {
            for atom in pending.drain(..) {
                let letter = last_letter.entry(number).or_insert(0);
                *letter += 1;
                labels.insert(atom, (number, *letter));
            }
        }
    }
    labels
}

/// The periphery as a cycle, or `None` when peripheral bonds do not form a
/// single simple cycle (spiro junctions, ring assemblies).
fn peripheral_cycle(fm: &FragmentManager, frag: FragmentId) -> Option<Vec<AtomId>> {
    let ri = RingInfo::sssr(fm, frag);
    if ri.num_rings() == 0 {
        return None;
    }
    let mut adj: HashMap<AtomId, Vec<AtomId>> = HashMap::new();
    for (a, b, _) in fm.fragment_bonds(frag) {
        if ri.bond_ring_count(a, b) == 1 {
            adj.entry(a).or_default().push(b);
            adj.entry(b).or_default().push(a);
        }
    }
    if adj.values().any(|v| v.len() != 2) {
        return None;
    }

    let start = fm
        .fragment(frag)
        .atoms()
        .iter()
        .copied()
        .find(|a| adj.contains_key(a))?;
    let mut cycle = vec![start];
    let mut prev = start;
    let mut cur = *adj[&start].iter().min()?;
    while cur != start {
        cycle.push(cur);
        let next = adj[&cur].iter().copied().find(|&x| x != prev)?;
        prev = cur;
        cur = next;
        if cycle.len() > adj.len() {
            return None;
        }
    }
    (cycle.len() == adj.len()).then_some(cycle)
}

fn number_in_order(fm: &mut FragmentManager, frag: FragmentId) {
    let atoms = fm.fragment(frag).atoms().to_vec();
    for (i, atom) in atoms.into_iter().enumerate() {
        fm.atom_mut(atom).locants = vec![(i + 1).to_string()];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::smiles::{build_seed, Labels, Seed};

    fn numbered(smiles: &str) -> (FragmentManager, FragmentId) {
        let mut fm = FragmentManager::new();
        let frag = build_seed(&mut fm, &Seed::new(smiles).with_labels(Labels::FusedRing)).unwrap();
        (fm, frag)
    }

    fn locants(fm: &FragmentManager, frag: FragmentId) -> Vec<String> {
        fm.fragment(frag)
            .atoms()
            .iter()
            .map(|&a| fm.atom(a).locants.join(","))
            .collect()
    }

    #[test]
    fn naphthalene() {
        let (fm, frag) = numbered("c1ccc2ccccc2c1");
        assert_eq!(
            locants(&fm, frag),
            vec!["1", "2", "3", "4", "4a", "5", "6", "7", "8", "8a"]
        );
    }

    #[test]
    fn benzofuran_puts_oxygen_first() {
        let (fm, frag) = numbered("c1ccc2occc2c1");
        let o = fm.atom_by_locant(frag, "1").unwrap();
        assert_eq!(fm.atom(o).element, Element::O);
        assert!(fm.atom_by_locant(frag, "3a").is_some());
        assert!(fm.atom_by_locant(frag, "7a").is_some());
    }

    #[test]
    fn monocycle_gets_plain_numbers() {
        let (fm, frag) = numbered("c1ccncc1");
        let n = fm.atom_by_locant(frag, "1").unwrap();
        assert_eq!(fm.atom(n).element, Element::N);
        assert_eq!(fm.fragment(frag).atom_count(), 6);
    }

    #[test]
    fn interior_atom_gets_letter() {
        // phenalene skeleton: one atom shared by all three rings
        let (fm, frag) = numbered("C1CC2CCCC3CCCC(C1)C23");
        let all = locants(&fm, frag);
        assert_eq!(all.len(), 13);
        assert_eq!(all.iter().filter(|l| l.ends_with(char::is_alphabetic)).count(), 4);
    }

    #[test]
    fn numbering_is_deterministic() {
        let (fm1, f1) = numbered("c1ccc2cc3ccccc3cc2c1");
        let (fm2, f2) = numbered("c1ccc2cc3ccccc3cc2c1");
        assert_eq!(locants(&fm1, f1), locants(&fm2, f2));
    }
}
