use crate::error::StructureBuildingError;
use crate::fragment::prime_count;

/// The contents of one fusion bracket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FusionDescriptor {
    /// `[2,1-b]` or `[b]`: optional locants on the attached component and
    /// consecutive edge letters on the component it attaches to.
    Letters { child: Vec<String>, letters: Vec<char> },
    /// `[4,5]` as in `benzo[4,5]imidazo...`: locants on the component
    /// attached to; the attached component uses its default edge.
    ParentLocants(Vec<String>),
    /// `[1'',2'':1',2']`: locants on both components, attached first.
    HigherOrder { child: Vec<String>, parent: Vec<String> },
}

impl FusionDescriptor {
    pub fn parse(text: &str) -> Result<Self, StructureBuildingError> {
        let malformed = || StructureBuildingError::MalformedDescriptor(text.to_string());
        let body = strip_brackets(text);
        if body.is_empty() {
            return Err(malformed());
        }

        if let Some((left, right)) = body.split_once(':') {
            let child = split_locants(left);
            let parent = split_locants(right);
            if child.is_empty() || parent.is_empty() || right.contains(':') {
                return Err(malformed());
            }
            return Ok(FusionDescriptor::HigherOrder { child, parent });
        }

        if let Some((left, right)) = body.split_once('-') {
            let child = split_locants(left);
            let letters = parse_letters(right).ok_or_else(malformed)?;
            if child.is_empty() {
                return Err(malformed());
            }
            return Ok(FusionDescriptor::Letters { child, letters });
        }

        if body.chars().all(|c| c.is_ascii_lowercase() || c == ',' || c == '\'') {
            let letters = parse_letters(body).ok_or_else(malformed)?;
            return Ok(FusionDescriptor::Letters {
                child: Vec::new(),
                letters,
            });
        }

        let parent = split_locants(body);
        if parent.iter().all(|l| l.starts_with(|c: char| c.is_ascii_digit())) {
            Ok(FusionDescriptor::ParentLocants(parent))
        } else {
            Err(malformed())
        }
    }

    /// Prime marks on the attached component's locants: its depth below the
    /// first-order components.
    pub fn child_primes(&self) -> usize {
        match self {
            FusionDescriptor::HigherOrder { child, .. } => {
                child.first().map_or(0, |l| prime_count(l))
            }
            _ => 0,
        }
    }

    /// Prime marks on the locants of the component attached to.
    pub fn parent_primes(&self) -> usize {
        match self {
            FusionDescriptor::HigherOrder { parent, .. } => {
                parent.first().map_or(0, |l| prime_count(l))
            }
            _ => 0,
        }
    }
}

/// Splits the bracket of a multiplied prefix (`dibenzo[b,d]`,
/// `dinaphtho[2,1-b:1',2'-d]`) into one descriptor per copy.
pub fn split_multiplied(text: &str, copies: usize) -> Result<Vec<String>, StructureBuildingError> {
    let body = strip_brackets(text);
    let parts: Vec<String> = if body.contains(':') || body.contains(';') {
        body.split([':', ';']).map(|p| p.trim().to_string()).collect()
    } else if body.contains('-') {
        vec![body.to_string()]
    } else {
        body.split(',').map(|p| p.trim().to_string()).collect()
    };
    if parts.len() != copies {
        return Err(StructureBuildingError::MalformedDescriptor(format!(
            "{text}: {} parts for {copies} copies",
            parts.len()
        )));
    }
    Ok(parts)
}

fn strip_brackets(text: &str) -> &str {
    let t = text.trim();
    let t = t.strip_prefix('[').unwrap_or(t);
    t.strip_suffix(']').unwrap_or(t).trim()
}

fn split_locants(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Letters must be consecutive (`b`, `bc`, `b,c`).
fn parse_letters(text: &str) -> Option<Vec<char>> {
    let letters: Vec<char> = text
        .chars()
        .filter(|c| *c != ',' && *c != '\'' && !c.is_whitespace())
        .collect();
    if letters.is_empty() || !letters.iter().all(char::is_ascii_lowercase) {
        return None;
    }
    let consecutive = letters
        .windows(2)
        .all(|w| w[1] as u32 == w[0] as u32 + 1);
    consecutive.then_some(letters)
}

/// Position of an edge letter in the lettering (`a` → 0).
pub fn letter_index(letter: char) -> usize {
    (letter as u8 - b'a') as usize
}
