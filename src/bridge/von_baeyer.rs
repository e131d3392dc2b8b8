use tracing::debug;

use crate::bridge::{rebuild_chain, split_count_prefix, split_descriptor, split_superscript};
use crate::error::{BuildError, StructureBuildingError};
use crate::fragment::{FragmentId, FragmentManager};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bridge {
    pub length: usize,
    /// Attachment locants for a secondary bridge; empty for main bridges.
    pub ends: Option<(usize, usize)>,
}

/// A parsed `bicyclo[2.2.1]`-style descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VonBaeyerDescriptor {
    pub rings: usize,
    pub bridges: Vec<Bridge>,
}

impl VonBaeyerDescriptor {
    pub fn parse(descriptor: &str) -> Result<Self, StructureBuildingError> {
        let malformed = || StructureBuildingError::MalformedDescriptor(descriptor.to_string());
        let (prefix, body) = split_descriptor(descriptor)?;
        let (rings, rest) = split_count_prefix(prefix);
        if rest != "cyclo" || rings < 2 {
            return Err(malformed());
        }

        let mut bridges = Vec::new();
        for (i, token) in body.split('.').enumerate() {
            let (len, locants) = split_superscript(token.trim())?;
            let length = len.parse::<usize>().map_err(|_| malformed())?;
            let ends = match (i < 3, locants.as_slice()) {
                (true, []) => None,
                (false, &[u, v]) if u != v && u > 0 && v > 0 => Some((u, v)),
                _ => return Err(malformed()),
            };
            bridges.push(Bridge { length, ends });
        }
        if bridges.len() < 3 {
            return Err(malformed());
        }
        if bridges.len() != rings + 1 {
            return Err(StructureBuildingError::BridgeCountMismatch {
                bridges: bridges.len(),
                rings,
            });
        }
        Ok(Self { rings, bridges })
    }

    /// Atoms the system has: every bridge atom plus the two main bridgeheads.
    pub fn atom_count(&self) -> usize {
        self.bridges.iter().map(|b| b.length).sum::<usize>() + 2
    }

    /// Bonds of the system in von Baeyer numbering, 0-based.
    ///
    /// The main ring runs from bridgehead 1 through the first bridge to the
    /// second bridgehead and back through the second bridge; the third bridge
    /// is numbered from the end nearer atom 1. Secondary bridges are numbered
    /// in declaration order once both their ends exist, each from the end
    /// nearer the higher-numbered attachment.
    pub fn ring_plan(&self, descriptor: &str) -> Result<Vec<(usize, usize)>, StructureBuildingError> {
        let (a, b, c) = (
            self.bridges[0].length,
            self.bridges[1].length,
            self.bridges[2].length,
        );
        let mut bonds = Vec::with_capacity(self.atom_count() + self.rings);
        let head1 = 0;
        let head2 = a + 1;

        for i in 0..=a {
            bonds.push((i, i + 1));
        }
        let mut prev = head2;
        for i in 0..b {
            let atom = head2 + 1 + i;
            bonds.push((prev, atom));
            prev = atom;
        }
        bonds.push((prev, head1));

        let mut next = a + b + 2;
        chain_bridge(&mut bonds, &mut next, head1, head2, c);

        let mut pending: Vec<&Bridge> = self.bridges[3..].iter().collect();
        while !pending.is_empty() {
            let before = pending.len();
            let mut remaining = Vec::with_capacity(pending.len());
            for bridge in pending {
                let Some((u, v)) = bridge.ends else { continue };
                if u.max(v) <= next {
                    let (hi, lo) = (u.max(v) - 1, u.min(v) - 1);
                    chain_bridge(&mut bonds, &mut next, hi, lo, bridge.length);
                } else {
                    remaining.push(bridge);
                }
            }
            if remaining.len() == before {
                return Err(StructureBuildingError::UnresolvableBridge(descriptor.to_string()));
            }
            pending = remaining;
        }

        if bonds.iter().any(|&(x, y)| x == y) {
            return Err(StructureBuildingError::MalformedDescriptor(descriptor.to_string()));
        }
        Ok(bonds)
    }
}

/// Adds a bridge of `length` new atoms numbered from `next`, running from
/// `from` to `to`; a zero-length bridge is a direct bond.
fn chain_bridge(
    bonds: &mut Vec<(usize, usize)>,
    next: &mut usize,
    from: usize,
    to: usize,
    length: usize,
) {
    let mut prev = from;
    for _ in 0..length {
        bonds.push((prev, *next));
        prev = *next;
        *next += 1;
    }
    bonds.push((prev, to));
}

/// Turns the chain fragment `chain` into the bridged system `descriptor`
/// describes and returns the new ring fragment; `chain` is discarded.
pub fn build_von_baeyer(
    fm: &mut FragmentManager,
    chain: FragmentId,
    descriptor: &str,
) -> Result<FragmentId, BuildError> {
    let parsed = VonBaeyerDescriptor::parse(descriptor)?;
    let chain_len = fm.fragment(chain).atom_count();
    if parsed.atom_count() != chain_len {
        return Err(StructureBuildingError::BridgeLengthMismatch {
            expected: parsed.atom_count(),
            actual: chain_len,
        }
        .into());
    }
    let bonds = parsed.ring_plan(descriptor)?;
    let ring = rebuild_chain(fm, chain, &bonds)?;
    debug!(descriptor, atoms = chain_len, %ring, "built von Baeyer system");
    Ok(ring)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::rings::{cyclomatic_number, RingInfo};
    use crate::smiles::{build_seed, Seed};

    fn chain(fm: &mut FragmentManager, smiles: &str) -> FragmentId {
        build_seed(fm, &Seed::new(smiles)).unwrap()
    }

    fn neighbours(fm: &FragmentManager, frag: FragmentId, locant: &str) -> Vec<String> {
        let atom = fm.atom_by_locant(frag, locant).unwrap();
        let mut out: Vec<String> = fm
            .neighbors(atom)
            .map(|n| fm.atom(n).first_locant().unwrap().to_string())
            .collect();
        out.sort_by_key(|l| l.parse::<usize>().unwrap());
        out
    }

    #[test]
    fn norbornane() {
        let mut fm = FragmentManager::new();
        let c = chain(&mut fm, "CCCCCCC");
        let ring = build_von_baeyer(&mut fm, c, "bicyclo[2.2.1]").unwrap();
        assert_eq!(fm.fragment(ring).atom_count(), 7);
        assert_eq!(cyclomatic_number(&fm, ring), 2);
        assert_eq!(neighbours(&fm, ring, "1"), vec!["2", "6", "7"]);
        assert_eq!(neighbours(&fm, ring, "4"), vec!["3", "5", "7"]);
        assert!(fm.fragment(ring).atoms().iter().all(|&a| fm.atom(a).in_ring));
        assert!(!fm.contains_fragment(c));
    }

    #[test]
    fn zero_bridge_is_direct_bond() {
        let mut fm = FragmentManager::new();
        let c = chain(&mut fm, "CCCCCC");
        let ring = build_von_baeyer(&mut fm, c, "bicyclo[2.2.0]").unwrap();
        assert_eq!(neighbours(&fm, ring, "1"), vec!["2", "4", "6"]);
        let ri = RingInfo::sssr(&fm, ring);
        assert!(ri.rings().iter().all(|r| r.len() == 4));
    }

    #[test]
    fn secondary_bridge() {
        let mut fm = FragmentManager::new();
        let c = chain(&mut fm, "CCCCCCC");
        let ring = build_von_baeyer(&mut fm, c, "tricyclo[2.2.1.0^{2,6}]").unwrap();
        assert_eq!(cyclomatic_number(&fm, ring), 3);
        assert_eq!(neighbours(&fm, ring, "2"), vec!["1", "3", "6"]);
    }

    #[test]
    fn secondary_bridge_with_atoms_numbered_from_higher_end() {
        let mut fm = FragmentManager::new();
        let c = chain(&mut fm, "CCCCCCCCCC");
        let ring = build_von_baeyer(&mut fm, c, "tricyclo[3.3.1.1^{3,7}]").unwrap();
        assert_eq!(fm.fragment(ring).atom_count(), 10);
        assert_eq!(neighbours(&fm, ring, "10"), vec!["3", "7"]);
        assert_eq!(cyclomatic_number(&fm, ring), 3);
    }

    #[test]
    fn forward_reference_resolves_in_later_pass() {
        // 0^{2,8} ends on the atom the 1^{3,5} bridge creates.
        let d = VonBaeyerDescriptor::parse("tetracyclo[2.2.1.0^{2,8}.1^{3,5}]").unwrap();
        let bonds = d.ring_plan("x").unwrap();
        assert!(bonds.contains(&(7, 1)));

        let d = VonBaeyerDescriptor::parse("tetracyclo[2.2.1.0^{2,9}.1^{3,5}]").unwrap();
        assert_eq!(
            d.ring_plan("x").unwrap_err(),
            StructureBuildingError::UnresolvableBridge("x".into())
        );
    }

    #[test]
    fn heteroatoms_kept_positionally() {
        let mut fm = FragmentManager::new();
        let c = chain(&mut fm, "CCCCCCO");
        let ring = build_von_baeyer(&mut fm, c, "bicyclo[2.2.1]").unwrap();
        let seven = fm.atom_by_locant(ring, "7").unwrap();
        assert_eq!(fm.atom(seven).element, Element::O);
    }

    #[test]
    fn length_mismatch() {
        let mut fm = FragmentManager::new();
        let c = chain(&mut fm, "CCCCCC");
        let err = build_von_baeyer(&mut fm, c, "bicyclo[2.2.1]").unwrap_err();
        assert!(matches!(
            err,
            BuildError::Structure(StructureBuildingError::BridgeLengthMismatch {
                expected: 7,
                actual: 6
            })
        ));
    }

    #[test]
    fn bridge_count_mismatch() {
        assert_eq!(
            VonBaeyerDescriptor::parse("tricyclo[2.2.1]").unwrap_err(),
            StructureBuildingError::BridgeCountMismatch { bridges: 3, rings: 3 }
        );
    }

    #[test]
    fn malformed_descriptors() {
        for d in ["bicyclo[2.x.1]", "cyclo[2.2.1]", "bicyclo[2.2.1^{1,2}]", "tricyclo[2.2.1.0]"] {
            assert!(VonBaeyerDescriptor::parse(d).is_err(), "{d}");
        }
    }
}
