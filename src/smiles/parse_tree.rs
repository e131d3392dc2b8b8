use std::collections::HashMap;

use crate::element::Element;
use crate::smiles::error::SmilesError;
use crate::smiles::tokenizer::{AtomToken, BondToken, Token};

#[derive(Debug, Clone)]
pub struct ParseAtom {
    pub element: Element,
    pub is_aromatic: bool,
    pub hcount: Option<u8>,
    pub charge: i8,
    pub neighbors: Vec<Neighbor>,
}

#[derive(Debug, Clone)]
pub struct Neighbor {
    pub bond: Option<BondToken>,
    pub atom_idx: usize,
}

/// Atoms with their adjacency plus the open valences implied by a bond
/// symbol at either end of the string (`-C(=O)-` is a divalent carbonyl).
#[derive(Debug, Clone)]
pub struct ParseTree {
    pub atoms: Vec<ParseAtom>,
    /// Applies to atom 0.
    pub leading_bond: Option<BondToken>,
    /// The atom the dangling bond hangs off (the main-chain atom, not a
    /// branch atom) and the bond itself.
    pub trailing_bond: Option<(usize, BondToken)>,
}

pub fn build_parse_tree(tokens: &[Token]) -> Result<ParseTree, SmilesError> {
    let mut atoms: Vec<ParseAtom> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    let mut current: Option<usize> = None;
    let mut pending_bond: Option<BondToken> = None;
    let mut leading_bond = None;
    let mut ring_opens: HashMap<u16, (usize, Option<BondToken>)> = HashMap::new();

    for token in tokens {
        match token {
            Token::Atom(atom_tok) => {
                let idx = atoms.len();
                atoms.push(parse_atom_from_token(atom_tok));

                if let Some(cur) = current {
                    let bond = pending_bond.take();
                    link(&mut atoms, cur, idx, bond);
                } else if idx == 0 {
                    leading_bond = pending_bond.take();
                } else {
                    pending_bond = None;
                }

                current = Some(idx);
            }
            Token::Bond(b) => {
                pending_bond = Some(*b);
            }
            Token::RingClosure { bond, label, pos } => {
                let cur = current.ok_or(SmilesError::DanglingRingClosure {
                    label: *label,
                    pos: *pos,
                })?;

                if let Some((open_idx, open_bond)) = ring_opens.remove(label) {
                    let ring_bond = match (*bond, open_bond) {
                        (None, None) => None,
                        (Some(b), None) | (None, Some(b)) => Some(b),
                        (Some(b1), Some(b2)) if b1 == b2 => Some(b1),
                        (Some(_), Some(_)) => {
                            return Err(SmilesError::RingBondConflict { label: *label })
                        }
                    };
                    link(&mut atoms, open_idx, cur, ring_bond);
                } else {
                    ring_opens.insert(*label, (cur, *bond));
                }
            }
            Token::OpenParen(pos) => {
                let cur = current.ok_or(SmilesError::UnmatchedParen { pos: *pos })?;
                stack.push(cur);
            }
            Token::CloseParen(pos) => {
                current = Some(stack.pop().ok_or(SmilesError::UnmatchedParen { pos: *pos })?);
                pending_bond = None;
            }
            Token::Dot(_) => {
                current = None;
                pending_bond = None;
            }
        }
    }

    if !stack.is_empty() {
        return Err(SmilesError::UnmatchedParen { pos: 0 });
    }

    if let Some(&label) = ring_opens.keys().min() {
        return Err(SmilesError::UnclosedRing { label });
    }

    if atoms.is_empty() {
        return Err(SmilesError::EmptyInput);
    }

    let trailing_bond = match (current, pending_bond) {
        (Some(cur), Some(bond)) => Some((cur, bond)),
        _ => None,
    };

    Ok(ParseTree {
        atoms,
        leading_bond,
        trailing_bond,
    })
}

fn link(atoms: &mut [ParseAtom], a: usize, b: usize, bond: Option<BondToken>) {
    atoms[a].neighbors.push(Neighbor { bond, atom_idx: b });
    atoms[b].neighbors.push(Neighbor { bond, atom_idx: a });
}

fn parse_atom_from_token(tok: &AtomToken) -> ParseAtom {
    ParseAtom {
        element: tok.element,
        is_aromatic: tok.is_aromatic,
        hcount: tok.hcount,
        charge: tok.charge,
        neighbors: Vec::new(),
    }
}
