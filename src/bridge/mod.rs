//! Bridged and spiro ring systems built from a flat chain.
//!
//! Both builders compute a ring plan (the bonds of the final system in its
//! own numbering), write it as a seed string and rebuild the chain through
//! the seed builder. Chain atoms keep their element and charge positionally,
//! so replacement prefixes applied afterwards see the ring numbering.

mod spiro;
mod von_baeyer;

use tracing::trace;

use crate::error::{BuildError, StructureBuildingError};
use crate::fragment::{BondOrder, FragmentId, FragmentKind, FragmentManager};
use crate::smiles::{build_seed, write_skeleton, Labels, Seed};

pub use spiro::{build_spiro, SpiroDescriptor};
pub use von_baeyer::{build_von_baeyer, VonBaeyerDescriptor};

/// Greek-derived count prefixes used by ring descriptors.
const COUNT_PREFIXES: [(&str, usize); 10] = [
    ("deca", 10),
    ("nona", 9),
    ("octa", 8),
    ("hepta", 7),
    ("hexa", 6),
    ("penta", 5),
    ("tetra", 4),
    ("tri", 3),
    ("di", 2),
    ("bi", 2),
];

/// Splits a leading count prefix off `word` (`"tricyclo"` → `(3, "cyclo")`).
/// A word without a prefix counts one.
pub(crate) fn split_count_prefix(word: &str) -> (usize, &str) {
    for (prefix, count) in COUNT_PREFIXES {
        if let Some(rest) = word.strip_prefix(prefix) {
            if !rest.is_empty() {
                return (count, rest);
            }
        }
    }
    (1, word)
}

/// Splits `"bicyclo[2.2.1]"` into the prefix word and the bracket body.
pub(crate) fn split_descriptor(descriptor: &str) -> Result<(&str, &str), StructureBuildingError> {
    let malformed = || StructureBuildingError::MalformedDescriptor(descriptor.to_string());
    let open = descriptor.find('[').ok_or_else(malformed)?;
    let body = descriptor[open + 1..].strip_suffix(']').ok_or_else(malformed)?;
    Ok((descriptor[..open].trim(), body))
}

/// Parses a superscript locant list in any of the forms `^{2,6}`, `^2,6` or
/// `(2,6)`, returning the part before it and the locants.
pub(crate) fn split_superscript(token: &str) -> Result<(&str, Vec<usize>), StructureBuildingError> {
    let malformed = || StructureBuildingError::MalformedDescriptor(token.to_string());
    let (head, sup) = if let Some(i) = token.find('^') {
        let sup = &token[i + 1..];
        let sup = sup
            .strip_prefix('{')
            .map(|s| s.strip_suffix('}').ok_or_else(malformed))
            .transpose()?
            .unwrap_or(sup);
        (&token[..i], Some(sup))
    } else if let Some(i) = token.find('(') {
        let sup = token[i + 1..].strip_suffix(')').ok_or_else(malformed)?;
        (&token[..i], Some(sup))
    } else {
        (token, None)
    };

    let locants = match sup {
        Some(s) => s
            .split(',')
            .map(|l| l.trim().parse::<usize>().map_err(|_| malformed()))
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    Ok((head, locants))
}

/// Replaces `chain` with a ring fragment whose atom `i` is bonded according
/// to `bonds` (0-based) and inherits the element of chain atom `i`.
pub(crate) fn rebuild_chain(
    fm: &mut FragmentManager,
    chain: FragmentId,
    bonds: &[(usize, usize)],
) -> Result<FragmentId, BuildError> {
    let chain_atoms = fm.fragment(chain).atoms().to_vec();
    let plan: Vec<(usize, usize, BondOrder)> =
        bonds.iter().map(|&(a, b)| (a, b, BondOrder::Single)).collect();
    let skeleton = write_skeleton(chain_atoms.len(), &plan);
    trace!(%skeleton, "ring plan");

    let subtype = fm.fragment(chain).subtype().map(str::to_string);
    let mut seed = Seed::new(skeleton)
        .with_labels(Labels::Numeric)
        .with_kind(FragmentKind::Ring);
    seed.subtype = subtype;
    let ring = build_seed(fm, &seed)?;

    let ring_atoms = fm.fragment(ring).atoms().to_vec();
    for (&old, &new) in chain_atoms.iter().zip(&ring_atoms) {
        let template = fm.atom(old).clone();
        let atom = fm.atom_mut(new);
        atom.element = template.element;
        atom.charge = template.charge;
        atom.lambda = template.lambda;
    }
    fm.discard_fragment(chain);
    Ok(ring)
}
