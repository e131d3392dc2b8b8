use std::fmt;

use crate::element::Element;
use crate::fragment::FragmentId;

/// Identity of an atom within one [`FragmentManager`](super::FragmentManager).
///
/// Ids are handed out in increasing order and are never recycled, so an id
/// that outlives its atom can not silently alias a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomId(pub(crate) u32);

impl AtomId {
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

/// An atom of a name-derived fragment.
///
/// Hydrogens are never graph nodes; they are derived from the expected valence
/// once the whole molecule is assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub(crate) id: AtomId,
    pub(crate) fragment: FragmentId,
    pub element: Element,
    /// Positional labels in citation order, e.g. `["1"]`, `["3a"]`, `["N", "1"]`.
    pub locants: Vec<String>,
    pub charge: i8,
    /// Explicit valence from the lambda convention (`λ⁶-sulfane`).
    pub lambda: Option<u8>,
    /// Placeholder for an unsaturation that is turned into a double bond after
    /// the molecule is complete.
    pub spare_valency: bool,
    pub in_ring: bool,
    /// Hydrogen count fixed by a bracket atom in the seed; overrides the
    /// valence-derived count.
    pub explicit_hydrogens: Option<u8>,
    pub radical_electrons: u8,
}

impl Atom {
    pub(crate) fn new(id: AtomId, fragment: FragmentId, element: Element) -> Self {
        Self {
            id,
            fragment,
            element,
            locants: Vec::new(),
            charge: 0,
            lambda: None,
            spare_valency: false,
            in_ring: false,
            explicit_hydrogens: None,
            radical_electrons: 0,
        }
    }

    pub fn id(&self) -> AtomId {
        self.id
    }

    pub fn fragment(&self) -> FragmentId {
        self.fragment
    }

    pub fn has_locant(&self, locant: &str) -> bool {
        self.locants.iter().any(|l| l == locant)
    }

    pub fn first_locant(&self) -> Option<&str> {
        self.locants.first().map(String::as_str)
    }

    /// Appends `primes` prime marks to every locant.
    pub fn add_primes(&mut self, primes: usize) {
        if primes == 0 {
            return;
        }
        let marks = "'".repeat(primes);
        for locant in &mut self.locants {
            locant.push_str(&marks);
        }
    }

    /// Valences this atom may adopt, most preferred first.
    pub fn allowed_valences(&self) -> Vec<u8> {
        match self.lambda {
            Some(v) => vec![v],
            None => self.element.valences_for_charge(self.charge),
        }
    }
}

/// Number of trailing prime marks on a locant (`4''` → 2).
pub fn prime_count(locant: &str) -> usize {
    locant.chars().rev().take_while(|&c| c == '\'').count()
}

/// A locant without its prime marks.
pub fn strip_primes(locant: &str) -> &str {
    locant.trim_end_matches('\'')
}
