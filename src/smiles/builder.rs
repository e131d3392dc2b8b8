use crate::fragment::{AtomId, BondOrder, FragmentId, FragmentKind, FragmentManager, OutAtom};
use crate::smiles::parse_tree::ParseTree;
use crate::smiles::tokenizer::BondToken;

/// Materialises a parse tree as a new fragment. Returns the fragment and its
/// atoms in string order.
pub fn build_fragment(
    fm: &mut FragmentManager,
    tree: &ParseTree,
    kind: FragmentKind,
    subtype: Option<String>,
) -> (FragmentId, Vec<AtomId>) {
    let frag = fm.create_fragment(kind, subtype);
    let mut ids: Vec<AtomId> = Vec::with_capacity(tree.atoms.len());

    for parse_atom in &tree.atoms {
        let id = fm.add_atom(frag, parse_atom.element);
        let atom = fm.atom_mut(id);
        atom.charge = parse_atom.charge;
        atom.explicit_hydrogens = parse_atom.hcount;
        ids.push(id);
    }

    for (i, parse_atom) in tree.atoms.iter().enumerate() {
        for neighbor in &parse_atom.neighbors {
            let j = neighbor.atom_idx;
            if i < j && fm.bond(ids[i], ids[j]).is_none() {
                // Both endpoints exist and the pair is new, so this can not fail.
                let _ = fm.create_bond(ids[i], ids[j], resolve_bond_order(neighbor.bond));
            }
        }
    }

    if let Some(bond) = tree.leading_bond {
        fm.fragment_mut(frag)
            .add_out_atom(OutAtom::new(ids[0], resolve_bond_order(Some(bond))));
    }
    if let Some((idx, bond)) = tree.trailing_bond {
        fm.fragment_mut(frag)
            .add_out_atom(OutAtom::new(ids[idx], resolve_bond_order(Some(bond))));
    }

    assign_spare_valencies(fm, tree, &ids);

    (frag, ids)
}

fn resolve_bond_order(bond_tok: Option<BondToken>) -> BondOrder {
    match bond_tok {
        Some(BondToken::Double) => BondOrder::Double,
        Some(BondToken::Triple) => BondOrder::Triple,
        Some(BondToken::Single) | None => BondOrder::Single,
    }
}

/// Lowercase atoms get a spare valency unless their bonds, hydrogens and open
/// valences already reach their lowest valence (`o` in furan, `[nH]`).
fn assign_spare_valencies(fm: &mut FragmentManager, tree: &ParseTree, ids: &[AtomId]) {
    for (parse_atom, &id) in tree.atoms.iter().zip(ids) {
        if !parse_atom.is_aromatic {
            continue;
        }
        let used = fm.used_valence(id);
        let lowest = fm.atom(id).allowed_valences().first().copied().unwrap_or(0);
        if used < lowest {
            fm.atom_mut(id).spare_valency = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::smiles::parse_tree::build_parse_tree;
    use crate::smiles::tokenizer::tokenize;

    fn build(s: &str) -> (FragmentManager, FragmentId, Vec<AtomId>) {
        let mut fm = FragmentManager::new();
        let tree = build_parse_tree(&tokenize(s).unwrap()).unwrap();
        let (frag, ids) = build_fragment(&mut fm, &tree, FragmentKind::Chain, None);
        (fm, frag, ids)
    }

    #[test]
    fn acetic_acid_bonds() {
        let (fm, frag, ids) = build("CC(=O)O");
        assert_eq!(fm.fragment_bonds(frag).len(), 3);
        assert_eq!(fm.bond(ids[1], ids[2]).unwrap().order, BondOrder::Double);
        assert_eq!(fm.bond_order_sum(ids[1]), 4);
    }

    #[test]
    fn benzene_spare_valencies() {
        let (fm, frag, ids) = build("c1ccccc1");
        assert_eq!(fm.fragment_bonds(frag).len(), 6);
        assert!(ids.iter().all(|&a| fm.atom(a).spare_valency));
    }

    #[test]
    fn furan_oxygen_has_no_spare_valency() {
        let (fm, _, ids) = build("o1cccc1");
        assert_eq!(fm.atom(ids[0]).element, Element::O);
        assert!(!fm.atom(ids[0]).spare_valency);
        assert!(fm.atom(ids[1]).spare_valency);
    }

    #[test]
    fn bracket_nh_is_saturated() {
        let (fm, _, ids) = build("[nH]1cccc1");
        assert_eq!(fm.atom(ids[0]).explicit_hydrogens, Some(1));
        assert!(!fm.atom(ids[0]).spare_valency);
    }

    #[test]
    fn carbonyl_open_valences() {
        let (fm, frag, ids) = build("-C(=O)-");
        let outs = fm.fragment(frag).out_atoms();
        assert_eq!(outs.len(), 2);
        assert!(outs.iter().all(|o| o.atom == ids[0]));
        assert_eq!(fm.free_valence(ids[0]), 0);
    }

    #[test]
    fn double_open_valence() {
        let (fm, frag, _) = build("=C");
        assert_eq!(fm.fragment(frag).out_atoms()[0].order, BondOrder::Double);
    }
}
