use crate::*;

fn seed(smiles: &str) -> Seed {
    Seed::new(smiles)
}

fn ring(smiles: &str) -> Seed {
    Seed::new(smiles).with_kind(FragmentKind::Ring)
}

fn suffix(smiles: &str) -> Seed {
    Seed::new(smiles)
        .with_labels(Labels::None)
        .with_kind(FragmentKind::Suffix)
}

fn one_word(f: impl FnOnce(NameTreeBuilder) -> NameTreeBuilder) -> NameTree {
    f(NameTreeBuilder::new().open_word(WordKind::Full))
        .close()
        .build()
        .unwrap()
}

fn build_default(tree: &NameTree) -> Result<Molecule, BuildError> {
    build(tree, &BuildConfig::default())
}

fn formula_of(tree: &NameTree) -> String {
    build_default(tree).unwrap().formula()
}

#[test]
fn methylpropane() {
    let tree = one_word(|b| {
        b.open_substituent()
            .locants(&["2"])
            .group(seed("-C"))
            .close()
            .open_root()
            .group(seed("CCC"))
            .close()
    });
    let mol = build_default(&tree).unwrap();
    assert_eq!(mol.formula(), "C4H10");
    let centre = mol.atom_by_locant("2").unwrap();
    assert_eq!(mol.neighbors(centre).count(), 3);
}

#[test]
fn norbornane() {
    let tree = one_word(|b| {
        b.open_root()
            .von_baeyer("bicyclo[2.2.1]")
            .group(seed("CCCCCCC"))
            .close()
    });
    let mol = build_default(&tree).unwrap();
    assert_eq!(mol.formula(), "C7H12");
    assert_eq!(mol.ring_count(), 2);
}

#[test]
fn spirodecane() {
    let tree = one_word(|b| b.open_root().spiro("spiro[4.5]").group(seed("CCCCCCCCCC")).close());
    let mol = build_default(&tree).unwrap();
    assert_eq!(mol.formula(), "C10H18");
    assert_eq!(mol.ring_count(), 2);
}

#[test]
fn dioxaspirodecane_places_oxygens_in_spiro_numbering() {
    let tree = one_word(|b| {
        b.open_root()
            .locants(&["1", "4"])
            .multiplier(2)
            .heteroatom(Element::O)
            .spiro("spiro[4.5]")
            .group(seed("CCCCCCCCCC"))
            .close()
    });
    let mol = build_default(&tree).unwrap();
    assert_eq!(mol.formula(), "C8H14O2");
    assert_eq!(mol.count_element(Element::O), 2);
    for locant in ["1", "4"] {
        let o = mol.atom_by_locant(locant).unwrap();
        assert_eq!(mol.atom(o).element, Element::O);
        assert_eq!(mol.atom(o).hydrogens, 0);
    }
}

#[test]
fn methylenedibenzoic_acid() {
    let tree = one_word(|b| {
        b.open_substituent()
            .locants(&["4", "4'"])
            .group(seed("-C-"))
            .close()
            .open_root()
            .multiplier(2)
            .group(ring("c1ccccc1"))
            .suffix(suffix("-C(=O)O"))
            .close()
    });
    let mol = build_default(&tree).unwrap();
    assert_eq!(mol.formula(), "C15H12O4");
    assert_eq!(mol.ring_count(), 2);
    assert_eq!(mol.component_count(), 1);

    let four = mol.atom_by_locant("4").unwrap();
    let four_prime = mol.atom_by_locant("4'").unwrap();
    let bridge: Vec<_> = mol.neighbors(four).filter(|&n| mol.atom(n).hydrogens == 2).collect();
    assert_eq!(bridge.len(), 1);
    assert!(mol.bond_between(bridge[0], four_prime).is_some());
    assert_eq!(mol.neighbors(bridge[0]).count(), 2);
}

#[test]
fn too_few_valences_for_copies() {
    let tree = one_word(|b| {
        b.open_substituent()
            .group(seed("-C"))
            .close()
            .open_root()
            .multiplier(3)
            .group(ring("c1ccccc1"))
            .close()
    });
    assert!(matches!(
        build_default(&tree),
        Err(BuildError::Structure(StructureBuildingError::AmbiguousBonding(_)))
    ));
}

#[test]
fn dichloroethane() {
    let tree = one_word(|b| {
        b.open_substituent()
            .locants(&["1", "2"])
            .multiplier(2)
            .group(seed("-Cl"))
            .close()
            .open_root()
            .group(seed("CC"))
            .close()
    });
    let mol = build_default(&tree).unwrap();
    assert_eq!(mol.formula(), "C2H4Cl2");
    let mut carbons: Vec<_> = mol
        .atoms()
        .filter(|&a| mol.atom(a).element == Element::Cl)
        .map(|cl| mol.neighbors(cl).next().unwrap())
        .collect();
    carbons.dedup();
    assert_eq!(carbons.len(), 2);
    assert!(carbons.iter().all(|&c| mol.atom(c).hydrogens == 2));
}

#[test]
fn locant_count_must_match_multiplier() {
    let tree = one_word(|b| {
        b.open_substituent()
            .locants(&["1"])
            .multiplier(2)
            .group(seed("-Cl"))
            .close()
            .open_root()
            .group(seed("CC"))
            .close()
    });
    assert!(matches!(
        build_default(&tree),
        Err(BuildError::TreeShape(TreeShapeError::LocantCountMismatch {
            locants: 1,
            multiplier: 2
        }))
    ));
}

#[test]
fn multiplier_limit() {
    let tree = one_word(|b| {
        b.open_substituent()
            .multiplier(3)
            .group(seed("-Cl"))
            .close()
            .open_root()
            .group(seed("CC"))
            .close()
    });
    let config = BuildConfig {
        max_multiplier: 2,
        ..BuildConfig::default()
    };
    assert!(matches!(
        build(&tree, &config),
        Err(BuildError::TreeShape(TreeShapeError::MultiplierTooLarge { value: 3, max: 2 }))
    ));
}

#[test]
fn bracketed_substituent() {
    // (2-chloroethyl)benzene
    let tree = one_word(|b| {
        b.open_bracket()
            .open_substituent()
            .locants(&["2"])
            .group(seed("-Cl"))
            .close()
            .open_substituent()
            .group(seed("-CC"))
            .close()
            .close()
            .open_root()
            .group(ring("c1ccccc1"))
            .close()
    });
    let mol = build_default(&tree).unwrap();
    assert_eq!(mol.formula(), "C8H9Cl");
    let cl = mol.atoms().find(|&a| mol.atom(a).element == Element::Cl).unwrap();
    let carbon = mol.neighbors(cl).next().unwrap();
    assert_eq!(mol.atom(carbon).hydrogens, 2);
    assert!(mol.neighbors(carbon).all(|n| mol.atom(n).element != Element::C || mol.atom(n).hydrogens == 2));
}

#[test]
fn bis_bracket() {
    // bis(2-chloroethyl) ether, as a substituent bracket on oxidane
    let tree = one_word(|b| {
        b.open_bracket()
            .multiplier(2)
            .open_substituent()
            .locants(&["2"])
            .group(seed("-Cl"))
            .close()
            .open_substituent()
            .group(seed("-CC"))
            .close()
            .close()
            .open_root()
            .group(seed("O"))
            .close()
    });
    assert_eq!(formula_of(&tree), "C4H8Cl2O");
}

#[test]
fn ethylenedioxy_bonds_additively() {
    let tree = one_word(|b| {
        b.open_substituent()
            .group(seed("-CC-"))
            .close()
            .open_substituent()
            .multiplier(2)
            .group(seed("-O-"))
            .close()
            .open_root()
            .group(ring("c1ccccc1"))
            .close()
    });
    let mol = build_default(&tree).unwrap();
    assert_eq!(mol.formula(), "C8H8O2");
    assert_eq!(mol.ring_count(), 2);
    let oxygens: Vec<_> = mol.atoms().filter(|&a| mol.atom(a).element == Element::O).collect();
    for o in oxygens {
        let mut kinds: Vec<u8> = mol.neighbors(o).map(|n| mol.atom(n).hydrogens).collect();
        kinds.sort();
        assert_eq!(kinds, vec![0, 2]);
    }
}

#[test]
fn multiplied_monovalent_substituent_is_not_additive() {
    // 2,2-diphenylpropane as (dimethylmethylene)dibenzene
    let tree = one_word(|b| {
        b.open_bracket()
            .open_substituent()
            .multiplier(2)
            .group(seed("-C"))
            .close()
            .open_substituent()
            .group(seed("-C-"))
            .close()
            .close()
            .open_root()
            .multiplier(2)
            .group(ring("c1ccccc1"))
            .close()
    });
    let mol = build_default(&tree).unwrap();
    assert_eq!(mol.formula(), "C15H16");
    assert_eq!(mol.ring_count(), 2);
    let quaternary: Vec<_> = mol
        .atoms()
        .filter(|&a| mol.atom(a).element == Element::C && mol.neighbors(a).count() == 4)
        .collect();
    assert_eq!(quaternary.len(), 1);
}

#[test]
fn pyridinyl_substituent() {
    // 2-methylpyridine, built as (pyridin-2-yl)methane
    let tree = one_word(|b| {
        b.open_substituent()
            .group(ring("n1ccccc1"))
            .locants(&["2"])
            .open_valence(BondOrder::Single)
            .close()
            .open_root()
            .group(seed("C"))
            .close()
    });
    let mol = build_default(&tree).unwrap();
    assert_eq!(mol.formula(), "C6H7N");
    let two = mol.atom_by_locant("2").unwrap();
    assert_eq!(mol.atom(two).hydrogens, 0);
}

#[test]
fn bipyridine() {
    let tree = one_word(|b| {
        b.open_root()
            .locants(&["2", "2'"])
            .ring_assembly(2)
            .group(ring("n1ccccc1"))
            .close()
    });
    let mol = build_default(&tree).unwrap();
    assert_eq!(mol.formula(), "C10H8N2");
    let two = mol.atom_by_locant("2").unwrap();
    let two_prime = mol.atom_by_locant("2'").unwrap();
    assert!(mol.bond_between(two, two_prime).is_some());
}

#[test]
fn dibenzofuran() {
    let tree = one_word(|b| {
        b.open_root()
            .multiplier(2)
            .benzo(ring("c1ccccc1"))
            .fusion("[b,d]")
            .group(ring("o1cccc1"))
            .close()
    });
    let mol = build_default(&tree).unwrap();
    assert_eq!(mol.formula(), "C12H8O");
    assert_eq!(mol.ring_count(), 3);
}

#[test]
fn naphthofuran() {
    let tree = one_word(|b| {
        b.open_root()
            .group(ring("c1ccc2ccccc2c1").with_labels(Labels::FusedRing))
            .fusion("[2,1-b]")
            .group(ring("o1cccc1"))
            .close()
    });
    let mol = build_default(&tree).unwrap();
    assert_eq!(mol.formula(), "C12H8O");
    assert_eq!(mol.ring_count(), 3);
    assert!(mol.bonds().any(|e| mol.bond(e) == BondOrder::Double));
}

#[test]
fn benzodioxane_without_brackets() {
    let tree = one_word(|b| {
        b.open_root()
            .locants(&["1", "4"])
            .benzo(ring("c1ccccc1"))
            .group(ring("O1CCOCC1"))
            .close()
    });
    let mol = build_default(&tree).unwrap();
    assert_eq!(mol.formula(), "C8H8O2");
    for locant in ["1", "4"] {
        let o = mol.atom_by_locant(locant).unwrap();
        assert_eq!(mol.atom(o).element, Element::O);
    }
}

#[test]
fn ester_from_functional_class_name() {
    // ethyl acetate
    let tree = NameTreeBuilder::new()
        .open_word(WordKind::Substituent)
        .open_substituent()
        .group(seed("-CC"))
        .close()
        .close()
        .open_word(WordKind::Full)
        .open_root()
        .group(
            seed("CC(=O)[O-]")
                .with_functional_atoms(vec![3])
                .with_ambiguous_atoms(vec![2, 3]),
        )
        .close()
        .close()
        .build()
        .unwrap();
    let mol = build_default(&tree).unwrap();
    assert_eq!(mol.formula(), "C4H8O2");
    assert_eq!(mol.net_charge(), 0);
    assert_eq!(mol.component_count(), 1);
}

#[test]
fn substituent_word_needs_a_full_word() {
    let tree = NameTreeBuilder::new()
        .open_word(WordKind::Substituent)
        .open_substituent()
        .group(seed("-CC"))
        .close()
        .close()
        .build()
        .unwrap();
    assert!(matches!(
        build_default(&tree),
        Err(BuildError::Structure(StructureBuildingError::NoFunctionalAtom))
    ));
}

#[test]
fn salt_stays_disconnected() {
    let tree = NameTreeBuilder::new()
        .open_word(WordKind::Full)
        .open_root()
        .group(seed("[Na+]"))
        .close()
        .close()
        .open_word(WordKind::Full)
        .open_root()
        .group(seed("[Cl-]"))
        .close()
        .close()
        .build()
        .unwrap();
    let mol = build_default(&tree).unwrap();
    assert_eq!(mol.formula(), "ClNa");
    assert_eq!(mol.component_count(), 2);
    assert_eq!(mol.net_charge(), 0);
}

#[test]
fn open_valence_is_an_error_unless_radicals_allowed() {
    let tree = one_word(|b| b.open_root().group(seed("-C")).close());
    assert!(matches!(
        build_default(&tree),
        Err(BuildError::Structure(StructureBuildingError::UnresolvedRadicals(1)))
    ));

    let config = BuildConfig::default().with_allow_radicals(true);
    let mol = build(&tree, &config).unwrap();
    assert_eq!(mol.formula(), "CH3");
    let c = mol.atoms().next().unwrap();
    assert_eq!(mol.atom(c).radical_electrons, 1);
}

#[test]
fn overcrowded_atom_has_no_room() {
    let tree = one_word(|b| {
        b.open_substituent()
            .multiplier(5)
            .group(seed("-C"))
            .close()
            .open_root()
            .group(seed("C"))
            .close()
    });
    assert!(matches!(
        build_default(&tree),
        Err(BuildError::Structure(StructureBuildingError::NoSubstitutableAtom { order: 1 }))
    ));
}

#[test]
fn missing_locant_is_reported() {
    let tree = one_word(|b| {
        b.open_substituent()
            .locants(&["7"])
            .group(seed("-C"))
            .close()
            .open_root()
            .group(seed("CCC"))
            .close()
    });
    assert!(matches!(
        build_default(&tree),
        Err(BuildError::Structure(StructureBuildingError::LocantNotFound(l))) if l == "7"
    ));
}

#[test]
fn builds_are_deterministic() {
    let tree = one_word(|b| {
        b.open_substituent()
            .locants(&["2"])
            .group(seed("-C"))
            .close()
            .open_root()
            .group(ring("c1ccc2ccccc2c1").with_labels(Labels::FusedRing))
            .fusion("[2,1-b]")
            .group(ring("o1cccc1"))
            .close()
    });
    let config = BuildConfig::default();
    let builder = StructureBuilder::new(&config);
    let first = builder.build(&tree).unwrap();
    let second = builder.build(&tree).unwrap();
    assert_eq!(first.formula(), second.formula());
    let labels = |m: &Molecule| -> Vec<Vec<String>> { m.atoms().map(|a| m.atom(a).locants.clone()).collect() };
    assert_eq!(labels(&first), labels(&second));
}

#[test]
fn every_atom_obeys_its_valence() {
    let tree = one_word(|b| {
        b.open_substituent()
            .locants(&["4", "4'"])
            .group(seed("-C-"))
            .close()
            .open_root()
            .multiplier(2)
            .group(ring("c1ccccc1"))
            .suffix(suffix("-C(=O)O"))
            .close()
    });
    let mol = build_default(&tree).unwrap();
    for idx in mol.atoms() {
        let atom = mol.atom(idx);
        let total = mol.bond_order_sum(idx) + atom.hydrogens + atom.radical_electrons;
        assert!(
            atom.element.valences_for_charge(atom.charge).contains(&total),
            "{} with valence {total}",
            atom.element
        );
    }
}
