use tracing::debug;

use crate::error::{BuildError, StructureBuildingError, TreeShapeError};
use crate::fragment::{prime_count, AtomId, BondOrder, FragmentId, FragmentKind, FragmentManager};

/// Junction locant pairs of a ring assembly, one pair per inter-ring bond,
/// as in `2,2'` or `2,2':6',2''`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JunctionLocants(pub Vec<(String, String)>);

impl JunctionLocants {
    /// Pairs consecutive locants of a flat list: `["2", "2'", "6'", "2''"]`.
    pub fn from_locants(locants: &[String]) -> Result<Self, TreeShapeError> {
        if locants.len() % 2 != 0 {
            return Err(TreeShapeError::LocantCountMismatch {
                locants: locants.len(),
                multiplier: locants.len() + 1,
            });
        }
        Ok(JunctionLocants(
            locants
                .chunks(2)
                .map(|pair| (pair[0].clone(), pair[1].clone()))
                .collect(),
        ))
    }
}

/// Joins `count` copies of `ring` by single bonds. Copy `i` carries `i`
/// prime marks on its locants. Without `junctions`, each bond uses the first
/// atoms of the two copies that still have free valence.
pub fn build_ring_assembly(
    fm: &mut FragmentManager,
    ring: FragmentId,
    count: usize,
    junctions: Option<&JunctionLocants>,
) -> Result<FragmentId, BuildError> {
    if count < 2 {
        return Err(StructureBuildingError::MalformedDescriptor(format!("ring assembly of {count}")).into());
    }
    if let Some(j) = junctions {
        if j.0.len() != count - 1 {
            return Err(TreeShapeError::LocantCountMismatch {
                locants: j.0.len() * 2,
                multiplier: (count - 1) * 2,
            }
            .into());
        }
    }

    let mut copies = vec![ring];
    for primes in 1..count {
        copies.push(fm.clone_fragment(ring, primes));
    }

    for k in 0..count - 1 {
        let (a, b) = match junctions {
            Some(j) => {
                let (la, lb) = &j.0[k];
                (locate(fm, &copies, la)?, locate(fm, &copies, lb)?)
            }
            None => (first_free(fm, copies[k])?, first_free(fm, copies[k + 1])?),
        };
        fm.create_bond(a, b, BondOrder::Single)?;
        debug!(%a, %b, junction = k, "ring assembly bond");
    }

    for &copy in &copies[1..] {
        fm.incorporate(ring, copy);
    }
    fm.fragment_mut(ring).kind = FragmentKind::RingAssembly;
    Ok(ring)
}

/// Finds `locant` in the copy its prime marks select.
fn locate(fm: &FragmentManager, copies: &[FragmentId], locant: &str) -> Result<AtomId, StructureBuildingError> {
    let copy = copies
        .get(prime_count(locant))
        .ok_or_else(|| StructureBuildingError::LocantNotFound(locant.to_string()))?;
    let atom = fm
        .atom_by_locant(*copy, locant)
        .ok_or_else(|| StructureBuildingError::LocantNotFound(locant.to_string()))?;
    if fm.free_valence(atom) < 1 {
        return Err(StructureBuildingError::NoSubstitutableAtom { order: 1 });
    }
    Ok(atom)
}

fn first_free(fm: &FragmentManager, frag: FragmentId) -> Result<AtomId, StructureBuildingError> {
    fm.fragment(frag)
        .atoms()
        .iter()
        .copied()
        .find(|&a| fm.free_valence(a) >= 1)
        .ok_or(StructureBuildingError::NoSubstitutableAtom { order: 1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::rings::cyclomatic_number;
    use crate::smiles::{build_seed, Seed};

    fn junctions(locants: &[&str]) -> JunctionLocants {
        let flat: Vec<String> = locants.iter().map(|s| s.to_string()).collect();
        JunctionLocants::from_locants(&flat).unwrap()
    }

    fn ring(fm: &mut FragmentManager, smiles: &str) -> FragmentId {
        build_seed(fm, &Seed::new(smiles).with_kind(FragmentKind::Ring)).unwrap()
    }

    #[test]
    fn biphenyl() {
        let mut fm = FragmentManager::new();
        let benzene = ring(&mut fm, "c1ccccc1");
        let asm = build_ring_assembly(&mut fm, benzene, 2, None).unwrap();
        assert_eq!(fm.fragment(asm).atom_count(), 12);
        assert_eq!(fm.fragment(asm).kind(), FragmentKind::RingAssembly);
        assert_eq!(cyclomatic_number(&fm, asm), 2);
        let one = fm.atom_by_locant(asm, "1").unwrap();
        let one_prime = fm.atom_by_locant(asm, "1'").unwrap();
        assert!(fm.bond(one, one_prime).is_some());
    }

    #[test]
    fn bipyridine_with_locants() {
        let mut fm = FragmentManager::new();
        let pyridine = ring(&mut fm, "n1ccccc1");
        let junctions = junctions(&["2", "2'"]);
        let asm = build_ring_assembly(&mut fm, pyridine, 2, Some(&junctions)).unwrap();
        let two = fm.atom_by_locant(asm, "2").unwrap();
        let two_prime = fm.atom_by_locant(asm, "2'").unwrap();
        assert!(fm.bond(two, two_prime).is_some());
        let n_count = fm
            .fragment(asm)
            .atoms()
            .iter()
            .filter(|&&a| fm.atom(a).element == Element::N)
            .count();
        assert_eq!(n_count, 2);
    }

    #[test]
    fn terphenyl_three_copies() {
        let mut fm = FragmentManager::new();
        let benzene = ring(&mut fm, "c1ccccc1");
        let junctions = junctions(&["1", "1'", "4'", "1''"]);
        let asm = build_ring_assembly(&mut fm, benzene, 3, Some(&junctions)).unwrap();
        assert_eq!(fm.fragment(asm).atom_count(), 18);
        let middle = fm.atom_by_locant(asm, "4'").unwrap();
        let last = fm.atom_by_locant(asm, "1''").unwrap();
        assert!(fm.bond(middle, last).is_some());
    }

    #[test]
    fn junction_count_must_match() {
        let mut fm = FragmentManager::new();
        let benzene = ring(&mut fm, "c1ccccc1");
        let junctions = junctions(&["1", "1'"]);
        assert!(matches!(
            build_ring_assembly(&mut fm, benzene, 3, Some(&junctions)),
            Err(BuildError::TreeShape(_))
        ));
    }

    #[test]
    fn flat_locants_pair_up() {
        let flat: Vec<String> = ["1", "1'", "4'", "1''"].iter().map(|s| s.to_string()).collect();
        let j = JunctionLocants::from_locants(&flat).unwrap();
        assert_eq!(
            j.0,
            vec![("1".to_string(), "1'".to_string()), ("4'".to_string(), "1''".to_string())]
        );
        assert!(JunctionLocants::from_locants(&flat[..3]).is_err());
    }
}
