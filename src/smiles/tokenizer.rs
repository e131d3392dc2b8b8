use crate::element::Element;
use crate::smiles::error::SmilesError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Atom(AtomToken),
    Bond(BondToken),
    RingClosure {
        bond: Option<BondToken>,
        label: u16,
        pos: usize,
    },
    OpenParen(usize),
    CloseParen(usize),
    Dot(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomToken {
    pub element: Element,
    /// Lowercase atoms carry a spare valency.
    pub is_aromatic: bool,
    pub hcount: Option<u8>,
    pub charge: i8,
    pub is_bracket: bool,
    pub pos: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondToken {
    Single,
    Double,
    Triple,
}

impl BondToken {
    pub fn from_char(ch: char) -> Option<BondToken> {
        match ch {
            '-' => Some(BondToken::Single),
            '=' => Some(BondToken::Double),
            '#' => Some(BondToken::Triple),
            _ => None,
        }
    }
}

/// Unbracketed atoms, two-letter symbols first so `Cl` wins over `C`.
const ORGANIC: [(&str, Element, bool); 16] = [
    ("Cl", Element::Cl, false),
    ("Br", Element::Br, false),
    ("B", Element::B, false),
    ("C", Element::C, false),
    ("N", Element::N, false),
    ("O", Element::O, false),
    ("P", Element::P, false),
    ("S", Element::S, false),
    ("F", Element::F, false),
    ("I", Element::I, false),
    ("b", Element::B, true),
    ("c", Element::C, true),
    ("n", Element::N, true),
    ("o", Element::O, true),
    ("p", Element::P, true),
    ("s", Element::S, true),
];

pub fn tokenize(input: &str) -> Result<Vec<Token>, SmilesError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '[' => {
                let (tok, next) = parse_bracket_atom(&chars, i)?;
                tokens.push(Token::Atom(tok));
                i = next;
            }
            ch @ ('-' | '=' | '#') => {
                if matches!(tokens.last(), Some(Token::Bond(_))) {
                    return Err(SmilesError::UnexpectedChar { pos: i, ch });
                }
                if let Some(bond) = BondToken::from_char(ch) {
                    tokens.push(Token::Bond(bond));
                }
                i += 1;
            }
            '(' => {
                tokens.push(Token::OpenParen(i));
                i += 1;
            }
            ')' => {
                tokens.push(Token::CloseParen(i));
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot(i));
                i += 1;
            }
            '%' => {
                let label = parse_percent_label(&chars, i)?;
                let bond = take_pending_bond(&mut tokens);
                tokens.push(Token::RingClosure { bond, label, pos: i });
                i += 3;
            }
            d @ '0'..='9' => {
                let bond = take_pending_bond(&mut tokens);
                tokens.push(Token::RingClosure {
                    bond,
                    label: (d as u16) - b'0' as u16,
                    pos: i,
                });
                i += 1;
            }
            ch => {
                let matched = ORGANIC.iter().find(|(sym, _, _)| {
                    let len = sym.len();
                    i + len <= chars.len() && chars[i..i + len].iter().copied().eq(sym.chars())
                });
                match matched {
                    Some(&(sym, element, is_aromatic)) => {
                        tokens.push(Token::Atom(AtomToken {
                            element,
                            is_aromatic,
                            hcount: None,
                            charge: 0,
                            is_bracket: false,
                            pos: i,
                        }));
                        i += sym.len();
                    }
                    None => return Err(SmilesError::UnexpectedChar { pos: i, ch }),
                }
            }
        }
    }

    Ok(tokens)
}

fn take_pending_bond(tokens: &mut Vec<Token>) -> Option<BondToken> {
    if let Some(Token::Bond(b)) = tokens.last() {
        let b = *b;
        tokens.pop();
        return Some(b);
    }
    None
}

fn parse_percent_label(chars: &[char], start: usize) -> Result<u16, SmilesError> {
    let i = start + 1;
    if i + 1 >= chars.len() || !chars[i].is_ascii_digit() || !chars[i + 1].is_ascii_digit() {
        return Err(SmilesError::UnexpectedChar {
            pos: start,
            ch: '%',
        });
    }
    let d1 = (chars[i] as u16) - b'0' as u16;
    let d2 = (chars[i + 1] as u16) - b'0' as u16;
    Ok(d1 * 10 + d2)
}

fn parse_bracket_atom(chars: &[char], start: usize) -> Result<(AtomToken, usize), SmilesError> {
    let mut i = start + 1;
    let (element, is_aromatic) = parse_bracket_element(chars, &mut i, start)?;
    let hcount = parse_hcount(chars, &mut i);
    let charge = parse_charge(chars, &mut i, start)?;

    if i >= chars.len() || chars[i] != ']' {
        return Err(SmilesError::UnclosedBracket { pos: start });
    }

    Ok((
        AtomToken {
            element,
            is_aromatic,
            hcount: Some(hcount.unwrap_or(0)),
            charge,
            is_bracket: true,
            pos: start,
        },
        i + 1,
    ))
}

fn parse_bracket_element(
    chars: &[char],
    i: &mut usize,
    bracket_start: usize,
) -> Result<(Element, bool), SmilesError> {
    if *i >= chars.len() {
        return Err(SmilesError::UnclosedBracket { pos: bracket_start });
    }

    for (pat, elem) in [("se", Element::Se), ("te", Element::Te), ("as", Element::As)] {
        if chars[*i..].iter().take(2).copied().eq(pat.chars()) {
            *i += 2;
            return Ok((elem, true));
        }
    }

    if *i + 1 < chars.len() && chars[*i].is_ascii_uppercase() && chars[*i + 1].is_ascii_lowercase() {
        let sym: String = chars[*i..=*i + 1].iter().collect();
        if let Some(e) = Element::from_symbol(&sym) {
            *i += 2;
            return Ok((e, false));
        }
    }

    let sym = chars[*i].to_ascii_uppercase().to_string();
    if let Some(e) = Element::from_symbol(&sym) {
        let aromatic = chars[*i].is_ascii_lowercase();
        *i += 1;
        return Ok((e, aromatic));
    }

    Err(SmilesError::InvalidElement {
        pos: *i,
        text: chars[*i].to_string(),
    })
}

fn parse_hcount(chars: &[char], i: &mut usize) -> Option<u8> {
    if *i < chars.len() && chars[*i] == 'H' {
        *i += 1;
        let mut count: u8 = 1;
        if *i < chars.len() && chars[*i].is_ascii_digit() {
            count = chars[*i] as u8 - b'0';
            *i += 1;
        }
        Some(count)
    } else {
        None
    }
}

fn parse_charge(chars: &[char], i: &mut usize, bracket_start: usize) -> Result<i8, SmilesError> {
    let sign: i8 = match chars.get(*i) {
        Some('+') => 1,
        Some('-') => -1,
        _ => return Ok(0),
    };
    let symbol = chars[*i];
    *i += 1;

    let mut magnitude: i8 = 1;
    if *i < chars.len() && chars[*i].is_ascii_digit() {
        magnitude = 0;
        while *i < chars.len() && chars[*i].is_ascii_digit() {
            magnitude = magnitude
                .checked_mul(10)
                .and_then(|v| v.checked_add(chars[*i] as i8 - b'0' as i8))
                .ok_or(SmilesError::InvalidCharge { pos: bracket_start })?;
            *i += 1;
        }
    } else {
        while *i < chars.len() && chars[*i] == symbol {
            magnitude = magnitude
                .checked_add(1)
                .ok_or(SmilesError::InvalidCharge { pos: bracket_start })?;
            *i += 1;
        }
    }
    Ok(sign * magnitude)
}
