use std::collections::HashMap;

use crate::error::StructureBuildingError;
use crate::fragment::{strip_primes, AtomId, FragmentId, FragmentManager};
use crate::rings::RingInfo;

/// What the assembler remembers about a component once it has been placed:
/// its own locants (primes stripped) and its periphery in locant order,
/// both following the atoms that survive fusion.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    pub fragment: FragmentId,
    pub level: usize,
    pub locants: HashMap<String, AtomId>,
    pub periphery: Vec<AtomId>,
}

impl ComponentInfo {
    /// Snapshot of `frag` before it takes part in any fusion.
    pub fn capture(fm: &FragmentManager, frag: FragmentId) -> Result<Self, StructureBuildingError> {
        let atoms = fm.fragment(frag).atoms().to_vec();
        if let Some(&acyclic) = atoms.iter().find(|&&a| !fm.atom(a).in_ring) {
            return Err(StructureBuildingError::NonCyclicComponent(acyclic));
        }

        let mut locants = HashMap::new();
        for &a in &atoms {
            for l in &fm.atom(a).locants {
                locants.insert(strip_primes(l).to_string(), a);
            }
        }

        Ok(Self {
            fragment: frag,
            level: 0,
            locants,
            periphery: peripheral_atoms(fm, frag),
        })
    }

    pub fn atom(&self, locant: &str) -> Result<AtomId, StructureBuildingError> {
        self.locants
            .get(strip_primes(locant))
            .copied()
            .ok_or_else(|| StructureBuildingError::LocantNotFound(locant.to_string()))
    }

    /// Follows atoms deleted by fusion to the atoms that replaced them.
    pub fn remap(&mut self, replaced: &HashMap<AtomId, AtomId>) {
        for atom in self.locants.values_mut() {
            if let Some(&to) = replaced.get(atom) {
                *atom = to;
            }
        }
        for atom in &mut self.periphery {
            if let Some(&to) = replaced.get(atom) {
                *atom = to;
            }
        }
    }

    /// Atoms of the edge lettered `first` onwards, `count` bonds long.
    pub fn lettered_edge(&self, first: usize, count: usize) -> Result<Vec<AtomId>, StructureBuildingError> {
        let n = self.periphery.len();
        if n == 0 || first + count > n {
            return Err(StructureBuildingError::AmbiguousFusionEdge(format!(
                "edge {} is beyond a periphery of {n} bonds",
                edge_letters(first, count)
            )));
        }
        Ok((first..=first + count).map(|i| self.periphery[i % n]).collect())
    }

    /// The peripheral path from `from` to `to` with exactly `len` atoms,
    /// trying ascending then descending locant order. `via` lists atoms the
    /// path must pass through.
    pub fn path(
        &self,
        from: AtomId,
        to: AtomId,
        len: usize,
        via: &[AtomId],
    ) -> Result<Vec<AtomId>, StructureBuildingError> {
        let n = self.periphery.len();
        let start = self.periphery.iter().position(|&a| a == from);
        let candidates: Vec<Vec<AtomId>> = match start {
            Some(s) if n > 0 => [true, false]
                .into_iter()
                .map(|ascending| {
                    (0..len)
                        .map(|k| {
                            let i = if ascending { s + k } else { s + n * len - k };
                            self.periphery[i % n]
                        })
                        .collect::<Vec<_>>()
                })
                .filter(|p| p.last() == Some(&to) && via.iter().all(|v| p.contains(v)))
                .collect(),
            _ => Vec::new(),
        };
        match candidates.as_slice() {
            [] => Err(StructureBuildingError::FusionEdgeLengthMismatch {
                child: len,
                parent: self.distance(from, to).map_or(0, |d| d + 1),
            }),
            [only] => Ok(only.clone()),
            [first, rest @ ..] => {
                let same = |p: &Vec<AtomId>| {
                    let mut a = p.clone();
                    let mut b = first.clone();
                    a.sort_unstable();
                    b.sort_unstable();
                    a == b
                };
                if rest.iter().all(same) {
                    Ok(first.clone())
                } else {
                    Err(StructureBuildingError::AmbiguousFusionEdge(format!(
                        "{len} atoms from {from} to {to}"
                    )))
                }
            }
        }
    }

    /// The first `len` peripheral atoms, used when a descriptor gives no
    /// locants for this side.
    pub fn default_edge(&self, len: usize) -> Vec<AtomId> {
        self.periphery.iter().copied().cycle().take(len).collect()
    }

    fn distance(&self, from: AtomId, to: AtomId) -> Option<usize> {
        let n = self.periphery.len();
        let a = self.periphery.iter().position(|&x| x == from)?;
        let b = self.periphery.iter().position(|&x| x == to)?;
        let d = a.abs_diff(b);
        Some(d.min(n - d))
    }
}

/// Atoms of `frag` on its outer cycle, in fragment order. In a monocycle
/// that is every atom; in a fused system an atom is peripheral when one of
/// its bonds lies in a single smallest ring.
pub fn peripheral_atoms(fm: &FragmentManager, frag: FragmentId) -> Vec<AtomId> {
    let ri = RingInfo::sssr(fm, frag);
    fm.fragment(frag)
        .atoms()
        .iter()
        .copied()
        .filter(|&a| {
            fm.neighbors(a)
                .any(|n| fm.fragment_of(n) == frag && ri.bond_ring_count(a, n) == 1)
        })
        .collect()
}

/// Whether `atom` joins three or more ring atoms of its own fragment.
pub fn is_bridgehead(fm: &FragmentManager, atom: AtomId) -> bool {
    fm.ring_neighbor_count(atom) >= 3
}

fn edge_letters(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| char::from(b'a' + (i % 26) as u8))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::{build_seed, Labels, Seed};

    fn ring(fm: &mut FragmentManager, smiles: &str) -> ComponentInfo {
        let frag = build_seed(fm, &Seed::new(smiles)).unwrap();
        ComponentInfo::capture(fm, frag).unwrap()
    }

    #[test]
    fn letters_follow_locants() {
        let mut fm = FragmentManager::new();
        let furan = ring(&mut fm, "o1cccc1");
        let b = furan.lettered_edge(1, 1).unwrap();
        assert_eq!(b, vec![furan.atom("2").unwrap(), furan.atom("3").unwrap()]);
        let e = furan.lettered_edge(4, 1).unwrap();
        assert_eq!(e, vec![furan.atom("5").unwrap(), furan.atom("1").unwrap()]);
        assert!(furan.lettered_edge(5, 1).is_err());
    }

    #[test]
    fn path_runs_either_way() {
        let mut fm = FragmentManager::new();
        let benzene = ring(&mut fm, "c1ccccc1");
        let one = benzene.atom("1").unwrap();
        let two = benzene.atom("2").unwrap();
        assert_eq!(benzene.path(two, one, 2, &[]).unwrap(), vec![two, one]);
        assert_eq!(benzene.path(one, two, 2, &[]).unwrap(), vec![one, two]);
        let four = benzene.atom("4").unwrap();
        let three = benzene.atom("3").unwrap();
        let path = benzene.path(one, four, 4, &[three]).unwrap();
        assert_eq!(path.len(), 4);
        assert!(benzene.path(one, four, 2, &[]).is_err());
    }

    #[test]
    fn both_directions_fitting_is_ambiguous() {
        let mut fm = FragmentManager::new();
        let cyclobutane = ring(&mut fm, "C1CCC1");
        let one = cyclobutane.atom("1").unwrap();
        let three = cyclobutane.atom("3").unwrap();
        assert!(matches!(
            cyclobutane.path(one, three, 3, &[]),
            Err(StructureBuildingError::AmbiguousFusionEdge(_))
        ));
        let two = cyclobutane.atom("2").unwrap();
        assert_eq!(cyclobutane.path(one, three, 3, &[two]).unwrap(), vec![one, two, three]);
    }

    #[test]
    fn acyclic_component_rejected() {
        let mut fm = FragmentManager::new();
        let frag = build_seed(&mut fm, &Seed::new("C1CC1C")).unwrap();
        assert!(matches!(
            ComponentInfo::capture(&fm, frag),
            Err(StructureBuildingError::NonCyclicComponent(_))
        ));
    }

    #[test]
    fn fused_periphery_excludes_nothing_for_naphthalene() {
        let mut fm = FragmentManager::new();
        let seed = Seed::new("c1cccc2ccccc12")
            .with_labels(Labels::Explicit("1/2/3/4/4a/5/6/7/8/8a".into()));
        let frag = build_seed(&mut fm, &seed).unwrap();
        assert_eq!(peripheral_atoms(&fm, frag).len(), 10);
        let four_a = fm.atom_by_locant(frag, "4a").unwrap();
        assert!(is_bridgehead(&fm, four_a));
    }
}
