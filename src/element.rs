//! The elements that appear in systematic organic nomenclature.
//!
//! Only elements that can be introduced by a name component (parent hydrides,
//! replacement prefixes such as `oxa`/`stanna`, substituent prefixes and
//! counter-ions) are represented. Each carries its atomic number as the enum
//! discriminant, as in a periodic table.

/// A chemical element usable in a name-derived structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Element {
    H = 1,
    Li = 3,
    B = 5,
    C = 6,
    N = 7,
    O = 8,
    F = 9,
    Na = 11,
    Mg = 12,
    Al = 13,
    Si = 14,
    P = 15,
    S = 16,
    Cl = 17,
    K = 19,
    Ga = 31,
    Ge = 32,
    As = 33,
    Se = 34,
    Br = 35,
    In = 49,
    Sn = 50,
    Sb = 51,
    Te = 52,
    I = 53,
    Hg = 80,
    Tl = 81,
    Pb = 82,
    Bi = 83,
    Po = 84,
    At = 85,
}

const SYMBOL_TABLE: [(&str, Element); 31] = [
    ("H", Element::H),
    ("Li", Element::Li),
    ("B", Element::B),
    ("C", Element::C),
    ("N", Element::N),
    ("O", Element::O),
    ("F", Element::F),
    ("Na", Element::Na),
    ("Mg", Element::Mg),
    ("Al", Element::Al),
    ("Si", Element::Si),
    ("P", Element::P),
    ("S", Element::S),
    ("Cl", Element::Cl),
    ("K", Element::K),
    ("Ga", Element::Ga),
    ("Ge", Element::Ge),
    ("As", Element::As),
    ("Se", Element::Se),
    ("Br", Element::Br),
    ("In", Element::In),
    ("Sn", Element::Sn),
    ("Sb", Element::Sb),
    ("Te", Element::Te),
    ("I", Element::I),
    ("Hg", Element::Hg),
    ("Tl", Element::Tl),
    ("Pb", Element::Pb),
    ("Bi", Element::Bi),
    ("Po", Element::Po),
    ("At", Element::At),
];

impl Element {
    pub fn from_symbol(s: &str) -> Option<Element> {
        SYMBOL_TABLE.iter().find(|(sym, _)| *sym == s).map(|(_, e)| *e)
    }

    pub fn atomic_num(self) -> u8 {
        self as u8
    }

    pub fn symbol(self) -> &'static str {
        SYMBOL_TABLE
            .iter()
            .find(|(_, e)| *e == self)
            .map(|(sym, _)| *sym)
            .unwrap_or("?")
    }

    /// Neutral valences in increasing order; the first one that accommodates
    /// an atom's bonds is its expected valence.
    pub fn default_valences(self) -> &'static [u8] {
        match self {
            Element::H | Element::Li | Element::Na | Element::K => &[1],
            Element::Mg | Element::Hg => &[2],
            Element::B | Element::Al | Element::Ga | Element::In | Element::Tl => &[3],
            Element::C | Element::Si | Element::Ge | Element::Sn | Element::Pb => &[4],
            Element::N => &[3, 5],
            Element::P | Element::As | Element::Sb | Element::Bi => &[3, 5],
            Element::O => &[2],
            Element::S | Element::Se | Element::Te | Element::Po => &[2, 4, 6],
            Element::F => &[1],
            Element::Cl | Element::Br | Element::I | Element::At => &[1, 3, 5, 7],
        }
    }

    /// Main-group column (1, 2, 13..=17); `None` for mercury.
    fn group(self) -> Option<u8> {
        match self {
            Element::H | Element::Li | Element::Na | Element::K => Some(1),
            Element::Mg => Some(2),
            Element::B | Element::Al | Element::Ga | Element::In | Element::Tl => Some(13),
            Element::C | Element::Si | Element::Ge | Element::Sn | Element::Pb => Some(14),
            Element::N | Element::P | Element::As | Element::Sb | Element::Bi => Some(15),
            Element::O | Element::S | Element::Se | Element::Te | Element::Po => Some(16),
            Element::F | Element::Cl | Element::Br | Element::I | Element::At => Some(17),
            Element::Hg => None,
        }
    }

    /// Valences allowed for this element carrying `charge`, following the
    /// isoelectronic convention (N+ behaves like C, O- like F, B- like C).
    pub fn valences_for_charge(self, charge: i8) -> Vec<u8> {
        if charge == 0 {
            return self.default_valences().to_vec();
        }
        let Some(group) = self.group() else {
            return Vec::new();
        };
        // Electrons available for bonding after the charge is applied.
        let valence_electrons = if group <= 2 {
            group as i16
        } else {
            group as i16 - 10
        };
        let electrons = valence_electrons - charge as i16;
        let base = match electrons {
            e if e <= 0 => 0,
            e if e <= 4 => e,
            e => 8 - e,
        };
        if base < 0 {
            return Vec::new();
        }
        let base = base as u8;
        match self {
            Element::N | Element::O | Element::F | Element::C | Element::B => vec![base],
            _ if base > 0 && electrons > 4 => vec![base, base + 2, base + 4]
                .into_iter()
                .filter(|v| *v <= 6)
                .collect(),
            _ => vec![base],
        }
    }

    pub fn is_carbon(self) -> bool {
        self == Element::C
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}
