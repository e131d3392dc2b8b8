//! Bonding the units of one scope to each other.
//!
//! Units are bonded right to left, the locanted ones first. The rightmost
//! unit of a scope is its head: it keeps its open valences for the
//! enclosing scope. Every other unit spends its open valences in one of
//! three ways:
//!
//! - multiplicatively, when the unit to its right is a multiplied root: one
//!   open valence per copy of the root;
//! - additively, when every copy of it and every copy of the unit to its
//!   right has at least two open valences: each copy on the right gives up
//!   its last open valence to it;
//! - substitutively, for whatever is left: onto the atom named by the
//!   locant, or onto the first atom with room, searching the head first and
//!   then the remaining units to the right, nearest first.

use tracing::debug;

use crate::error::{BuildError, StructureBuildingError};
use crate::fragment::{AtomId, BondOrder, FragmentId, FragmentManager};

use super::unit::Unit;
use super::Session;

/// A pending out atom, identified by value so that removing others does
/// not invalidate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct OutRef {
    pub frag: FragmentId,
    pub atom: AtomId,
    pub order: BondOrder,
    pub locant: Option<String>,
}

pub(super) fn outs_of_fragment(fm: &FragmentManager, frag: FragmentId) -> Vec<OutRef> {
    fm.fragment(frag)
        .out_atoms()
        .iter()
        .map(|o| OutRef {
            frag,
            atom: o.atom,
            order: o.order,
            locant: o.target_locant.clone(),
        })
        .collect()
}

fn outs_of(fm: &FragmentManager, unit: &Unit) -> Vec<OutRef> {
    unit.instances
        .iter()
        .flat_map(|&f| outs_of_fragment(fm, f))
        .collect()
}

/// `outs` without one occurrence of each of `reserved`.
fn without(mut outs: Vec<OutRef>, reserved: &[OutRef]) -> Vec<OutRef> {
    for r in reserved {
        if let Some(i) = outs.iter().rposition(|o| o.frag == r.frag && o.atom == r.atom && o.order == r.order) {
            outs.remove(i);
        }
    }
    outs
}

/// Picks which of several open valences to use when their bond orders
/// differ. Same orders: the first. Otherwise the one matching the order
/// wanted on the other side, then one that leaves the order the unit to
/// the left needs.
pub(super) fn choose_out(
    candidates: &[&OutRef],
    target_order: Option<BondOrder>,
    left_order: Option<BondOrder>,
) -> Result<usize, StructureBuildingError> {
    let first = candidates
        .first()
        .ok_or_else(|| StructureBuildingError::AmbiguousBonding("no open valence to choose from".into()))?;
    if candidates.iter().all(|o| o.order == first.order) {
        return Ok(0);
    }
    if let Some(t) = target_order {
        if let Some(i) = candidates.iter().position(|o| o.order == t) {
            return Ok(i);
        }
    }
    if let Some(l) = left_order {
        if candidates.iter().any(|o| o.order == l) {
            if let Some(i) = candidates.iter().position(|o| o.order != l) {
                return Ok(i);
            }
        }
    }
    let orders: Vec<u8> = candidates.iter().map(|o| o.order.value()).collect();
    Err(StructureBuildingError::AmbiguousBonding(format!(
        "open valences of orders {orders:?} with no order to match"
    )))
}

impl Session<'_> {
    /// Bonds every unit of a scope but the head.
    pub(super) fn resolve_scope(&mut self, units: &[Unit]) -> Result<(), BuildError> {
        let n = units.len();
        let mut additive = vec![false; n];
        let mut reserved: Vec<Vec<OutRef>> = vec![Vec::new(); n];
        let multivalent = |unit: &Unit| {
            unit.instances
                .iter()
                .all(|&f| self.fm.fragment(f).out_atoms().len() >= 2)
        };
        for idx in 0..n.saturating_sub(1) {
            let right = &units[idx + 1];
            if right.multiplicative {
                continue;
            }
            if multivalent(&units[idx]) && multivalent(right) {
                additive[idx] = true;
                reserved[idx + 1] = right
                    .instances
                    .iter()
                    .filter_map(|&f| outs_of_fragment(&self.fm, f).pop())
                    .collect();
            }
        }

        for locanted in [true, false] {
            for idx in (0..n.saturating_sub(1)).rev() {
                if units[idx].locanted != locanted {
                    continue;
                }
                let mut outs = without(outs_of(&self.fm, &units[idx]), &reserved[idx]);
                let left_order = idx
                    .checked_sub(1)
                    .and_then(|l| outs_of(&self.fm, &units[l]).first().map(|o| o.order));

                if units[idx + 1].multiplicative {
                    outs = self.bond_to_copies(outs, &units[idx + 1], left_order)?;
                } else if additive[idx] {
                    let targets = std::mem::take(&mut reserved[idx + 1]);
                    outs = self.bond_additive(outs, &targets, left_order)?;
                }
                for out in &outs {
                    self.substitute(out, &units[idx + 1..])?;
                }
            }
        }
        Ok(())
    }

    fn bond(&mut self, out: &OutRef, target: AtomId) -> Result<(), StructureBuildingError> {
        self.fm.create_bond(out.atom, target, out.order)?;
        self.fm.fragment_mut(out.frag).take_out_atom(out.atom, out.order);
        Ok(())
    }

    /// One open valence of the bridging unit per copy of a multiplied root.
    fn bond_to_copies(
        &mut self,
        mut outs: Vec<OutRef>,
        root: &Unit,
        left_order: Option<BondOrder>,
    ) -> Result<Vec<OutRef>, BuildError> {
        let waiting: Vec<FragmentId> = root
            .instances
            .iter()
            .copied()
            .filter(|&c| !self.fm.fragment(c).in_atoms().is_empty())
            .collect();
        if outs.len() < waiting.len() {
            return Err(StructureBuildingError::AmbiguousBonding(format!(
                "{} open valences for {} copies",
                outs.len(),
                waiting.len()
            ))
            .into());
        }

        for copy in waiting {
            let located = outs.iter().position(|o| {
                o.locant
                    .as_deref()
                    .is_some_and(|l| self.fm.atom_by_locant(copy, l).is_some())
            });
            let index = match located {
                Some(i) => i,
                None => {
                    let free: Vec<usize> = (0..outs.len()).filter(|&i| outs[i].locant.is_none()).collect();
                    let candidates: Vec<&OutRef> = free.iter().map(|&i| &outs[i]).collect();
                    let in_order = self.fm.fragment(copy).in_atoms()[0].order;
                    free[choose_out(&candidates, Some(in_order), left_order)?]
                }
            };
            let out = outs.remove(index);
            let Some(in_atom) = self.fm.fragment_mut(copy).take_in_atom() else {
                continue;
            };
            let target = match &out.locant {
                Some(l) => self
                    .fm
                    .atom_by_locant(copy, l)
                    .ok_or_else(|| StructureBuildingError::LocantNotFound(l.clone()))?,
                None => in_atom.atom,
            };
            let order = out.order.value();
            if self.fm.free_valence(target) < order as i16 {
                return Err(StructureBuildingError::NoSubstitutableAtom { order }.into());
            }
            self.bond(&out, target)?;
            debug!(from = %out.atom, to = %target, %copy, "multiplicative bond");
        }
        Ok(outs)
    }

    /// Pairs open valences of a unit with those reserved for it on its right.
    fn bond_additive(
        &mut self,
        mut outs: Vec<OutRef>,
        targets: &[OutRef],
        left_order: Option<BondOrder>,
    ) -> Result<Vec<OutRef>, BuildError> {
        for target in targets {
            if outs.is_empty() {
                break;
            }
            let candidates: Vec<&OutRef> = outs.iter().collect();
            let index = choose_out(&candidates, Some(target.order), left_order)?;
            let out = outs.remove(index);
            if out.order != target.order {
                return Err(StructureBuildingError::AmbiguousBonding(format!(
                    "order {} can not pair with order {}",
                    out.order.value(),
                    target.order.value()
                ))
                .into());
            }
            self.bond(&out, target.atom)?;
            self.fm
                .fragment_mut(target.frag)
                .take_out_atom(target.atom, target.order);
            debug!(from = %out.atom, to = %target.atom, "additive bond");
        }
        Ok(outs)
    }

    /// Bonds one open valence onto the units to its right, head first.
    fn substitute(&mut self, out: &OutRef, targets: &[Unit]) -> Result<(), BuildError> {
        let Some((head, others)) = targets.split_last() else {
            return Err(StructureBuildingError::NoSubstitutionTarget.into());
        };
        let order = out.order.value();
        let search: Vec<FragmentId> = std::iter::once(head)
            .chain(others.iter())
            .flat_map(|u| u.instances.iter().copied())
            .collect();

        let target = match &out.locant {
            Some(locant) => {
                let found: Vec<AtomId> = search
                    .iter()
                    .filter_map(|&f| self.fm.atom_by_locant(f, locant))
                    .collect();
                if found.is_empty() {
                    return Err(StructureBuildingError::LocantNotFound(locant.clone()).into());
                }
                found
                    .into_iter()
                    .find(|&a| self.fm.free_valence(a) >= order as i16)
                    .ok_or(StructureBuildingError::NoSubstitutableAtom { order })?
            }
            None => search
                .iter()
                .flat_map(|&f| self.fm.fragment(f).atoms().iter().copied())
                .find(|&a| self.fm.free_valence(a) >= order as i16)
                .ok_or(StructureBuildingError::NoSubstitutableAtom { order })?,
        };
        self.bond(out, target)?;
        debug!(from = %out.atom, to = %target, locant = ?out.locant, "substitution");
        Ok(())
    }
}
