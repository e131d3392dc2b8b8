//! Error types for structure construction.
//!
//! Failures fall into three families, all fatal for the name being built:
//! seed construction errors (an impossible primitive token sequence), tree
//! shape errors (locant/multiplier mismatches, missing siblings) and structure
//! building errors (fusion, bridges, ambiguity, valence). [`BuildError`]
//! wraps all of them.

use thiserror::Error;

use crate::element::Element;
use crate::fragment::AtomId;
use crate::smiles::SmilesError;

/// The annotated name tree does not have the shape the builder expects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeShapeError {
    /// A multiplier was given with a different number of locants.
    #[error("{locants} locants given for a multiplier of {multiplier}")]
    LocantCountMismatch { locants: usize, multiplier: usize },

    /// A node requires a following sibling that is absent.
    #[error("expected {expected} after {after}")]
    MissingSibling {
        expected: &'static str,
        after: &'static str,
    },

    /// A node kind appeared somewhere it has no meaning.
    #[error("{0} node is not allowed here")]
    UnexpectedNode(&'static str),

    /// A word, bracket, substituent or root has nothing to build from.
    #[error("{0} contains no group")]
    Empty(&'static str),

    /// A multiplier exceeds [`BuildConfig::max_multiplier`](crate::BuildConfig::max_multiplier).
    #[error("multiplier {value} exceeds the configured maximum of {max}")]
    MultiplierTooLarge { value: u32, max: u32 },

    /// A heteroatom node names no known element.
    #[error("unknown element '{0}'")]
    UnknownElement(String),

    /// Nodes were opened but never closed, or closed without being opened.
    #[error("unbalanced tree: {0}")]
    Unbalanced(&'static str),
}

/// The structure implied by the name can not be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureBuildingError {
    /// A ring descriptor could not be parsed.
    #[error("malformed ring descriptor '{0}'")]
    MalformedDescriptor(String),

    /// Von Baeyer bridge lengths do not account for every chain atom.
    #[error("bridges account for {expected} atoms but the chain has {actual}")]
    BridgeLengthMismatch { expected: usize, actual: usize },

    /// Von Baeyer bridge count does not match the ring count.
    #[error("{bridges} bridges given for a {rings}-ring system")]
    BridgeCountMismatch { bridges: usize, rings: usize },

    /// Secondary bridges reference each other in a way no ordering satisfies.
    #[error("unresolvable bridge dependency in '{0}'")]
    UnresolvableBridge(String),

    /// Spiro segments do not fit the chain or the spiro multiplicity.
    #[error("spiro descriptor '{descriptor}': {detail}")]
    InvalidSpiro { descriptor: String, detail: String },

    /// A fusion component has an atom outside any ring.
    #[error("fusion component atom {0} is not in a ring")]
    NonCyclicComponent(AtomId),

    /// The two sides of a fusion descriptor select edges of different lengths.
    #[error("fusion edges differ in length: {child} vs {parent}")]
    FusionEdgeLengthMismatch { child: usize, parent: usize },

    /// Atoms identified by fusion are of different elements.
    #[error("fused atoms differ: {child} on the attached component, {parent} on the parent")]
    FusionElementMismatch { child: Element, parent: Element },

    /// No unique edge satisfies a fusion descriptor.
    #[error("no unique fusion edge for '{0}'")]
    AmbiguousFusionEdge(String),

    /// A locant does not name any atom where it was looked up.
    #[error("locant '{0}' not found")]
    LocantNotFound(String),

    /// Unlocanted substitution found no atom with enough free valence.
    #[error("no atom with free valence {order} to substitute")]
    NoSubstitutableAtom { order: u8 },

    /// The bonding heuristics could not decide which open valences pair up.
    #[error("ambiguous bonding: {0}")]
    AmbiguousBonding(String),

    /// A substituent has no structure to substitute onto.
    #[error("nothing to substitute onto")]
    NoSubstitutionTarget,

    /// A bond would join an atom to itself or duplicate an existing bond.
    #[error("invalid bond between {0} and {1}")]
    InvalidBond(AtomId, AtomId),

    /// A bond order outside 1..=3 was requested.
    #[error("bond order {0} is not supported")]
    UnsupportedBondOrder(u8),

    /// An atom's bonds exceed every valence it may adopt.
    #[error("atom {atom} ({element}) has {bonds} bond orders, allowed valences {allowed:?}")]
    Valence {
        atom: AtomId,
        element: Element,
        bonds: u8,
        allowed: Vec<u8>,
    },

    /// Spare valencies left over after double-bond placement.
    #[error("spare valencies on {0:?} can not be turned into double bonds")]
    UnresolvedSpareValency(Vec<AtomId>),

    /// Open valences remain after every bond has been resolved.
    #[error("{0} open valence(s) left unresolved")]
    UnresolvedRadicals(usize),

    /// A functional-class word has no functional atom left to join.
    #[error("no functional atom available to join a substituent word")]
    NoFunctionalAtom,
}

/// Any failure while building one name.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid seed structure: {0}")]
    Seed(#[from] SmilesError),

    #[error("malformed name tree: {0}")]
    TreeShape(#[from] TreeShapeError),

    #[error("structure building failed: {0}")]
    Structure(#[from] StructureBuildingError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_detail() {
        let e = StructureBuildingError::BridgeCountMismatch {
            bridges: 4,
            rings: 2,
        };
        assert_eq!(e.to_string(), "4 bridges given for a 2-ring system");

        let e = BuildError::from(TreeShapeError::LocantCountMismatch {
            locants: 1,
            multiplier: 2,
        });
        assert_eq!(
            e.to_string(),
            "malformed name tree: 1 locants given for a multiplier of 2"
        );
    }

    #[test]
    fn seed_errors_convert() {
        let e: BuildError = SmilesError::EmptyInput.into();
        assert!(matches!(e, BuildError::Seed(SmilesError::EmptyInput)));
    }
}
