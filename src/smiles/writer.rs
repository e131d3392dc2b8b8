use std::collections::BTreeSet;

use crate::fragment::BondOrder;

/// Writes an all-carbon skeleton of `atom_count` atoms as a seed string that
/// preserves atom order: atom `i` of the plan is atom `i` of the parsed seed.
///
/// Bonds between consecutive atoms are written inline; every other bond
/// becomes a ring closure. An atom not bonded to its predecessor starts a new
/// dot-separated component that the closures join back. Closure labels are
/// recycled lowest-first and written as `%nn` above 9.
pub fn write_skeleton(atom_count: usize, bonds: &[(usize, usize, BondOrder)]) -> String {
    let mut inline = vec![None; atom_count];
    let mut opens: Vec<Vec<(usize, BondOrder)>> = vec![Vec::new(); atom_count];

    for &(a, b, order) in bonds {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        if hi == lo + 1 && inline[hi].is_none() {
            inline[hi] = Some(order);
        } else {
            opens[lo].push((hi, order));
        }
    }

    let mut out = String::with_capacity(atom_count * 3);
    let mut free: BTreeSet<u16> = BTreeSet::new();
    let mut next_label: u16 = 1;
    // label, closing atom, order
    let mut pending: Vec<(u16, usize, BondOrder)> = Vec::new();

    for i in 0..atom_count {
        if i > 0 {
            match inline[i] {
                Some(order) => out.push_str(bond_symbol(order)),
                None => out.push('.'),
            }
        }
        out.push('C');

        let mut closing: Vec<u16> = Vec::new();
        pending.retain(|&(label, target, _)| {
            if target == i {
                closing.push(label);
                false
            } else {
                true
            }
        });
        for label in closing {
            write_label(&mut out, label);
            free.insert(label);
        }

        for &(target, order) in &opens[i] {
            let label = match free.pop_first() {
                Some(l) => l,
                None => {
                    let l = next_label;
                    next_label += 1;
                    l
                }
            };
            out.push_str(bond_symbol(order));
            write_label(&mut out, label);
            pending.push((label, target, order));
        }
    }

    out
}

fn bond_symbol(order: BondOrder) -> &'static str {
    match order {
        BondOrder::Single => "",
        BondOrder::Double => "=",
        BondOrder::Triple => "#",
    }
}

fn write_label(out: &mut String, label: u16) {
    if label > 9 {
        out.push('%');
        out.push_str(&format!("{label:02}"));
    } else {
        out.push(char::from(b'0' + label as u8));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(pairs: &[(usize, usize)]) -> Vec<(usize, usize, BondOrder)> {
        pairs.iter().map(|&(a, b)| (a, b, BondOrder::Single)).collect()
    }

    #[test]
    fn chain_is_inline() {
        assert_eq!(write_skeleton(3, &single(&[(0, 1), (1, 2)])), "CCC");
    }

    #[test]
    fn ring_uses_closure() {
        let s = write_skeleton(4, &single(&[(0, 1), (1, 2), (2, 3), (3, 0)]));
        assert_eq!(s, "C1CCC1");
    }

    #[test]
    fn labels_are_recycled() {
        let s = write_skeleton(
            6,
            &single(&[(0, 1), (1, 2), (2, 0), (2, 3), (3, 4), (4, 5), (5, 3)]),
        );
        assert_eq!(s, "C1CC1C1CC1");
    }

    #[test]
    fn unbonded_neighbour_starts_component() {
        let s = write_skeleton(3, &single(&[(0, 1), (0, 2)]));
        assert_eq!(s, "C1C.C1");
    }

    #[test]
    fn high_labels_use_percent() {
        let bonds: Vec<(usize, usize, BondOrder)> =
            (1..=10).map(|i| (0, 11 + i, BondOrder::Single)).collect();
        let s = write_skeleton(22, &bonds);
        assert!(s.contains("%10"));
    }

    #[test]
    fn closure_order_is_written() {
        let bonds = vec![
            (0, 1, BondOrder::Single),
            (1, 2, BondOrder::Single),
            (2, 0, BondOrder::Double),
        ];
        assert_eq!(write_skeleton(3, &bonds), "C=1CC1");
    }
}
