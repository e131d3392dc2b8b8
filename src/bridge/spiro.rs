use tracing::debug;

use crate::bridge::{rebuild_chain, split_count_prefix, split_descriptor, split_superscript};
use crate::error::{BuildError, StructureBuildingError};
use crate::fragment::{FragmentId, FragmentManager};

/// One ring segment of a spiro descriptor: its own atoms and, optionally,
/// the spiro atom (by locant) the segment closes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub length: usize,
    pub closes_at: Option<usize>,
}

/// A parsed `spiro[4.5]` / `dispiro[4.2.4^{8}.2^{5}]` descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiroDescriptor {
    pub spiro_atoms: usize,
    pub segments: Vec<Segment>,
}

impl SpiroDescriptor {
    pub fn parse(descriptor: &str) -> Result<Self, StructureBuildingError> {
        let malformed = || StructureBuildingError::MalformedDescriptor(descriptor.to_string());
        let (prefix, body) = split_descriptor(descriptor)?;
        let (spiro_atoms, rest) = split_count_prefix(prefix);
        if rest != "spiro" {
            return Err(malformed());
        }
        let segments = body
            .split(['.', ','])
            .map(|token| {
                let (len, locants) = split_superscript(token.trim())?;
                let length = len.parse::<usize>().map_err(|_| malformed())?;
                let closes_at = match locants.as_slice() {
                    [] => None,
                    &[x] => Some(x),
                    _ => return Err(malformed()),
                };
                Ok(Segment { length, closes_at })
            })
            .collect::<Result<Vec<_>, StructureBuildingError>>()?;
        if segments.len() < 2 || segments.iter().any(|s| s.length == 0) {
            return Err(malformed());
        }
        Ok(Self {
            spiro_atoms,
            segments,
        })
    }

    pub fn atom_count(&self) -> usize {
        self.segments.iter().map(|s| s.length).sum::<usize>() + self.spiro_atoms
    }

    /// Bonds of the spiro system in spiro numbering, 0-based.
    ///
    /// Numbering runs around the first terminal ring, through each spiro atom
    /// into the next ring. A segment either opens a new spiro atom (while
    /// fewer than the declared number exist), closes on the spiro atom its
    /// superscript names, or closes on the most recently opened one.
    pub fn ring_plan(&self, descriptor: &str) -> Result<Vec<(usize, usize)>, StructureBuildingError> {
        let invalid = |detail: String| StructureBuildingError::InvalidSpiro {
            descriptor: descriptor.to_string(),
            detail,
        };

        let mut bonds = Vec::with_capacity(self.atom_count() + self.segments.len());
        let mut open: Vec<usize> = Vec::new();
        let mut created: Vec<usize> = Vec::new();
        let mut next = 0usize;
        let mut current: Option<usize> = None;

        for (i, segment) in self.segments.iter().enumerate() {
            let start = current;
            let mut prev = start;
            for _ in 0..segment.length {
                if let Some(p) = prev {
                    bonds.push((p, next));
                }
                prev = Some(next);
                next += 1;
            }
            let last = prev.ok_or_else(|| invalid("empty segment".into()))?;

            if i == 0 {
                let spiro = next;
                next += 1;
                bonds.push((last, spiro));
                bonds.push((spiro, 0));
                open.push(spiro);
                created.push(spiro);
                current = Some(spiro);
                continue;
            }

            let target = if let Some(locant) = segment.closes_at {
                let atom = locant
                    .checked_sub(1)
                    .filter(|a| created.contains(a))
                    .ok_or_else(|| invalid(format!("{locant} is not a spiro atom")))?;
                open.retain(|&a| a != atom);
                atom
            } else if created.len() < self.spiro_atoms {
                let spiro = next;
                next += 1;
                bonds.push((last, spiro));
                open.push(spiro);
                created.push(spiro);
                current = Some(spiro);
                continue;
            } else {
                open.pop()
                    .ok_or_else(|| invalid("no open ring to close".into()))?
            };
            bonds.push((last, target));
            current = Some(target);
        }

        if !open.is_empty() {
            return Err(invalid(format!("{} ring(s) left open", open.len())));
        }
        if created.len() != self.spiro_atoms {
            return Err(invalid(format!(
                "{} spiro atoms declared, {} built",
                self.spiro_atoms,
                created.len()
            )));
        }
        Ok(bonds)
    }
}

/// Turns the chain fragment `chain` into the spiro system `descriptor`
/// describes and returns the new ring fragment; `chain` is discarded.
pub fn build_spiro(
    fm: &mut FragmentManager,
    chain: FragmentId,
    descriptor: &str,
) -> Result<FragmentId, BuildError> {
    let parsed = SpiroDescriptor::parse(descriptor)?;
    let chain_len = fm.fragment(chain).atom_count();
    if parsed.atom_count() != chain_len {
        return Err(StructureBuildingError::InvalidSpiro {
            descriptor: descriptor.to_string(),
            detail: format!(
                "descriptor accounts for {} atoms but the chain has {chain_len}",
                parsed.atom_count()
            ),
        }
        .into());
    }
    let bonds = parsed.ring_plan(descriptor)?;
    let ring = rebuild_chain(fm, chain, &bonds)?;
    debug!(descriptor, atoms = chain_len, %ring, "built spiro system");
    Ok(ring)
}
