use thiserror::Error;

/// Errors produced when reading a seed structure string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmilesError {
    /// The input string was empty or contained only whitespace.
    #[error("empty seed structure")]
    EmptyInput,

    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { pos: usize, ch: char },

    #[error("invalid element '{text}' at position {pos}")]
    InvalidElement { pos: usize, text: String },

    #[error("unclosed bracket atom starting at position {pos}")]
    UnclosedBracket { pos: usize },

    /// A ring-opening label was never matched by a ring-closing label.
    #[error("unclosed ring {label}")]
    UnclosedRing { label: u16 },

    #[error("unmatched parenthesis at position {pos}")]
    UnmatchedParen { pos: usize },

    #[error("invalid charge at position {pos}")]
    InvalidCharge { pos: usize },

    /// A ring-closure label appeared before any atom.
    #[error("ring closure {label} at position {pos} has no atom to attach to")]
    DanglingRingClosure { label: u16, pos: usize },

    /// The two ends of a ring closure specify different bond orders.
    #[error("conflicting bond types on ring closure {label}")]
    RingBondConflict { label: u16 },

    /// An explicit locant list does not have one entry per atom.
    #[error("{labels} locant labels given for {atoms} atoms")]
    LabelCountMismatch { labels: usize, atoms: usize },

    /// A functional, ambiguous or default-in atom index is out of range.
    #[error("atom index {index} out of range for {atoms} atoms")]
    InvalidAtomIndex { index: usize, atoms: usize },
}
