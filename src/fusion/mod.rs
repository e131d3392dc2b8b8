//! Fused ring construction.
//!
//! Components are listed left to right as they appear in the name; the
//! rightmost is the base component. Working right to left, each component is
//! attached to the one its fusion descriptor names: the shared edge atoms of
//! the attached component are deleted, their outside bonds moved onto the
//! matching atoms of the other component, and the rest merged into the base
//! fragment. The finished system is renumbered.

mod assembly;
mod descriptor;
mod edge;
mod numbering;

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::element::Element;
use crate::error::{BuildError, StructureBuildingError};
use crate::fragment::{AtomId, FragmentId, FragmentKind, FragmentManager};

pub use assembly::{build_ring_assembly, JunctionLocants};
pub use descriptor::{split_multiplied, FusionDescriptor};
pub use edge::ComponentInfo;
pub use numbering::number_fused_system;

use descriptor::letter_index;
use edge::is_bridgehead;

/// One ring component of a fused name, e.g. `naphtho[2,1-b]` or `furan`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusionComponent {
    pub fragment: FragmentId,
    /// The bracket following the component; the base component has none.
    pub descriptor: Option<String>,
    /// Copies of the component (`dibenzo` is 2); each copy takes one part
    /// of the descriptor.
    pub multiplier: usize,
    pub is_benzo: bool,
    /// Heteroatom locants cited before a bracketless benzo name
    /// (`1,4-benzodioxine`).
    pub benzo_locants: Vec<String>,
}

impl FusionComponent {
    pub fn new(fragment: FragmentId) -> Self {
        Self {
            fragment,
            descriptor: None,
            multiplier: 1,
            is_benzo: false,
            benzo_locants: Vec::new(),
        }
    }

    pub fn with_descriptor(mut self, descriptor: impl Into<String>) -> Self {
        self.descriptor = Some(descriptor.into());
        self
    }

    pub fn with_multiplier(mut self, multiplier: usize) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn benzo(mut self) -> Self {
        self.is_benzo = true;
        self
    }
}

/// A component after multiplier expansion.
struct Expanded {
    fragment: FragmentId,
    descriptor: Option<String>,
    is_benzo: bool,
    benzo_locants: Vec<String>,
    /// Index of the component this one sits immediately to the left of;
    /// copies of a multiplied component all share it.
    right: usize,
}

/// Fuses `components` into a single fused ring fragment and returns it.
#[instrument(skip_all, fields(components = components.len()))]
pub fn assemble_fused(
    fm: &mut FragmentManager,
    components: &[FusionComponent],
) -> Result<FragmentId, BuildError> {
    let Some(base) = components.last() else {
        return Err(StructureBuildingError::AmbiguousFusionEdge("no components".into()).into());
    };
    if base.descriptor.is_some() || base.multiplier != 1 {
        return Err(
            StructureBuildingError::MalformedDescriptor("base component with fusion bracket".into()).into(),
        );
    }

    let expanded = expand(fm, components)?;
    let mut infos: Vec<Option<ComponentInfo>> = Vec::with_capacity(expanded.len());
    for comp in &expanded {
        infos.push(Some(ComponentInfo::capture(fm, comp.fragment)?));
    }
    let expected_atoms: usize = expanded.iter().map(|c| fm.fragment(c.fragment).atom_count()).sum();

    let base_index = expanded.len() - 1;
    let base_frag = expanded[base_index].fragment;
    let mut placed: Vec<Option<ComponentInfo>> = vec![None; expanded.len()];
    placed[base_index] = infos[base_index].take();
    let mut shared_atoms = 0;
    let mut benzo_hetero: Option<(Vec<Element>, Vec<String>)> = None;

    for i in (0..base_index).rev() {
        let comp = &expanded[i];
        let mut child = infos[i].take().ok_or_else(|| {
            StructureBuildingError::AmbiguousFusionEdge(format!("component {i} used twice"))
        })?;

        let (parent_index, child_path, parent_path) = match &comp.descriptor {
            None if comp.is_benzo => {
                let parent = placed_at(&placed, comp.right)?;
                let parent_path = last_carbon_edge(fm, parent)?;
                let child_path = child.default_edge(parent_path.len());
                let ring_hetero: Vec<AtomId> = parent
                    .periphery
                    .iter()
                    .copied()
                    .filter(|&a| !fm.atom(a).element.is_carbon())
                    .collect();
                if !comp.benzo_locants.is_empty() {
                    benzo_hetero = Some((
                        ring_hetero.iter().map(|&a| fm.atom(a).element).collect(),
                        comp.benzo_locants.clone(),
                    ));
                }
                (comp.right, child_path, parent_path)
            }
            None => {
                return Err(StructureBuildingError::AmbiguousFusionEdge(format!(
                    "component {i} has no fusion descriptor"
                ))
                .into())
            }
            Some(text) => {
                let descriptor = FusionDescriptor::parse(text)?;
                let parent_index = match &descriptor {
                    FusionDescriptor::HigherOrder { .. } => {
                        let level = descriptor.parent_primes() + 1;
                        ((i + 1)..expanded.len())
                            .find(|&j| placed[j].as_ref().is_some_and(|p| p.level == level))
                            .unwrap_or(comp.right)
                    }
                    _ => comp.right,
                };
                let parent = placed_at(&placed, parent_index)?;
                let (child_path, parent_path) = edges_for(&descriptor, &child, parent, text)?;
                if let FusionDescriptor::HigherOrder { .. } = descriptor {
                    child.level = descriptor.child_primes() + 1;
                }
                (parent_index, child_path, parent_path)
            }
        };

        if child.level == 0 {
            child.level = placed_at(&placed, parent_index)?.level + 1;
        }
        if let Some(&bridgehead) = parent_path.iter().find(|&&a| is_bridgehead(fm, a)) {
            return Err(StructureBuildingError::AmbiguousFusionEdge(format!(
                "fusion edge passes through bridgehead {bridgehead}"
            ))
            .into());
        }

        let replaced = fuse(fm, comp.fragment, base_frag, &child_path, &parent_path)?;
        shared_atoms += child_path.len();
        child.remap(&replaced);
        for info in placed.iter_mut().flatten() {
            info.remap(&replaced);
        }
        debug!(
            component = i,
            descriptor = comp.descriptor.as_deref().unwrap_or("benzo"),
            level = child.level,
            shared = child_path.len(),
            "fused component"
        );
        placed[i] = Some(child);
    }

    debug_assert_eq!(fm.fragment(base_frag).atom_count(), expected_atoms - shared_atoms);
    fm.fragment_mut(base_frag).kind = FragmentKind::FusedRing;
    crate::rings::mark_ring_atoms(fm, base_frag);
    number_fused_system(fm, base_frag);

    if let Some((elements, locants)) = benzo_hetero {
        place_benzo_heteroatoms(fm, base_frag, &elements, &locants)?;
    }
    Ok(base_frag)
}

fn placed_at(
    placed: &[Option<ComponentInfo>],
    index: usize,
) -> Result<&ComponentInfo, StructureBuildingError> {
    placed
        .get(index)
        .and_then(Option::as_ref)
        .ok_or_else(|| StructureBuildingError::AmbiguousFusionEdge(format!("component {index} is not placed")))
}

/// Clones multiplied components and splits their descriptors.
fn expand(fm: &mut FragmentManager, components: &[FusionComponent]) -> Result<Vec<Expanded>, BuildError> {
    let mut out: Vec<Expanded> = Vec::with_capacity(components.len());
    // Indices are assigned left to right; `right` is patched once the
    // position of the next component is known.
    let mut groups: Vec<Vec<usize>> = Vec::with_capacity(components.len());
    for comp in components {
        let mut group = Vec::with_capacity(comp.multiplier);
        if comp.multiplier > 1 {
            let text = comp.descriptor.as_deref().ok_or_else(|| {
                StructureBuildingError::MalformedDescriptor("multiplied component without descriptor".into())
            })?;
            let parts = split_multiplied(text, comp.multiplier)?;
            for (copy, part) in parts.into_iter().enumerate() {
                let fragment = if copy == 0 {
                    comp.fragment
                } else {
                    fm.clone_fragment(comp.fragment, 0)
                };
                group.push(out.len());
                out.push(Expanded {
                    fragment,
                    descriptor: Some(part),
                    is_benzo: comp.is_benzo,
                    benzo_locants: Vec::new(),
                    right: 0,
                });
            }
        } else {
            group.push(out.len());
            out.push(Expanded {
                fragment: comp.fragment,
                descriptor: comp.descriptor.clone(),
                is_benzo: comp.is_benzo,
                benzo_locants: comp.benzo_locants.clone(),
                right: 0,
            });
        }
        groups.push(group);
    }
    for g in 0..groups.len().saturating_sub(1) {
        let right = groups[g + 1][0];
        for &i in &groups[g] {
            out[i].right = right;
        }
    }
    Ok(out)
}

/// Resolves a descriptor to the matching atom paths on both components.
fn edges_for(
    descriptor: &FusionDescriptor,
    child: &ComponentInfo,
    parent: &ComponentInfo,
    text: &str,
) -> Result<(Vec<AtomId>, Vec<AtomId>), StructureBuildingError> {
    match descriptor {
        FusionDescriptor::Letters { child: locants, letters } => {
            let first = letter_index(letters[0]);
            let parent_path = parent.lettered_edge(first, letters.len())?;
            let child_path = if locants.is_empty() {
                child.default_edge(parent_path.len())
            } else {
                locant_path(child, locants, parent_path.len())?
            };
            Ok((child_path, parent_path))
        }
        FusionDescriptor::ParentLocants(locants) => {
            let parent_path = locant_path(parent, locants, locants.len())?;
            Ok((child.default_edge(parent_path.len()), parent_path))
        }
        FusionDescriptor::HigherOrder {
            child: child_locants,
            parent: parent_locants,
        } => {
            if child_locants.len() != parent_locants.len() {
                return Err(StructureBuildingError::FusionEdgeLengthMismatch {
                    child: child_locants.len(),
                    parent: parent_locants.len(),
                });
            }
            let child_path = locant_path(child, child_locants, child_locants.len())?;
            let parent_path = locant_path(parent, parent_locants, parent_locants.len())?;
            if child_path.len() != parent_path.len() {
                return Err(StructureBuildingError::AmbiguousFusionEdge(text.to_string()));
            }
            Ok((child_path, parent_path))
        }
    }
}

/// The peripheral path through `locants` (first to last, any cited in
/// between must lie on it) with `len` atoms.
fn locant_path(
    info: &ComponentInfo,
    locants: &[String],
    len: usize,
) -> Result<Vec<AtomId>, StructureBuildingError> {
    let atoms = locants
        .iter()
        .map(|l| info.atom(l))
        .collect::<Result<Vec<_>, _>>()?;
    let (Some(&from), Some(&to)) = (atoms.first(), atoms.last()) else {
        return Err(StructureBuildingError::MalformedDescriptor(locants.join(",")));
    };
    let via = if atoms.len() > 2 { &atoms[1..atoms.len() - 1] } else { &[][..] };
    if len == 1 {
        return Ok(vec![from]);
    }
    info.path(from, to, len, via)
}

/// The last bond of the periphery, in locant order, joining two carbons
/// that are not bridgeheads: where a bracketless benzo prefix attaches.
fn last_carbon_edge(fm: &FragmentManager, info: &ComponentInfo) -> Result<Vec<AtomId>, StructureBuildingError> {
    let n = info.periphery.len();
    (0..n)
        .rev()
        .map(|k| (info.periphery[k], info.periphery[(k + 1) % n]))
        .find(|&(a, b)| {
            fm.bond(a, b).is_some()
                && [a, b]
                    .iter()
                    .all(|&x| fm.atom(x).element.is_carbon() && !is_bridgehead(fm, x))
        })
        .map(|(a, b)| vec![a, b])
        .ok_or_else(|| StructureBuildingError::AmbiguousFusionEdge("no carbon edge for benzo".into()))
}

/// Identifies `child_path[i]` with `parent_path[i]`: outside bonds of each
/// child edge atom move to its parent counterpart, the child edge atoms are
/// deleted and `child` is merged into `into`. Returns the deleted → kept
/// atom map.
fn fuse(
    fm: &mut FragmentManager,
    child: FragmentId,
    into: FragmentId,
    child_path: &[AtomId],
    parent_path: &[AtomId],
) -> Result<HashMap<AtomId, AtomId>, BuildError> {
    if child_path.len() != parent_path.len() {
        return Err(StructureBuildingError::FusionEdgeLengthMismatch {
            child: child_path.len(),
            parent: parent_path.len(),
        }
        .into());
    }
    for (&c, &p) in child_path.iter().zip(parent_path) {
        let (ce, pe) = (fm.atom(c).element, fm.atom(p).element);
        if ce != pe {
            return Err(StructureBuildingError::FusionElementMismatch { child: ce, parent: pe }.into());
        }
    }

    let mut replaced = HashMap::with_capacity(child_path.len());
    for (&c, &p) in child_path.iter().zip(parent_path) {
        let mut gained = false;
        for (neighbor, order) in fm.bonded(c) {
            if child_path.contains(&neighbor) || neighbor == p || fm.bond(neighbor, p).is_some() {
                continue;
            }
            fm.create_bond(neighbor, p, order)?;
            gained = true;
        }
        if fm.atom(c).spare_valency {
            fm.atom_mut(p).spare_valency = true;
        }
        fm.remove_atom(c);
        replaced.insert(c, p);

        // indicated hydrogen belongs to the unfused ring; unsaturation is
        // dropped when the junction has no room for it
        if gained {
            fm.atom_mut(p).explicit_hydrogens = None;
        }
        let lowest = fm.atom(p).allowed_valences().first().copied().unwrap_or(0);
        if fm.used_valence(p) > lowest {
            fm.atom_mut(p).spare_valency = false;
        }
    }
    fm.incorporate(into, child);
    Ok(replaced)
}

/// Moves the heteroatoms of a bracketless benzo name onto the cited locants
/// of the numbered fused system, in the order the heteroatom ring listed
/// them.
fn place_benzo_heteroatoms(
    fm: &mut FragmentManager,
    frag: FragmentId,
    elements: &[Element],
    locants: &[String],
) -> Result<(), StructureBuildingError> {
    if elements.len() != locants.len() {
        return Err(StructureBuildingError::LocantNotFound(format!(
            "{} heteroatom locants for {} heteroatoms",
            locants.len(),
            elements.len()
        )));
    }
    let targets = locants
        .iter()
        .map(|l| {
            fm.atom_by_locant(frag, l)
                .ok_or_else(|| StructureBuildingError::LocantNotFound(l.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let current: Vec<AtomId> = fm
        .fragment(frag)
        .atoms()
        .iter()
        .copied()
        .filter(|&a| !fm.atom(a).element.is_carbon())
        .collect();
    let templates: Vec<_> = current.iter().map(|&a| fm.atom(a).clone()).collect();
    for &a in &current {
        let atom = fm.atom_mut(a);
        atom.element = Element::C;
        atom.charge = 0;
        atom.lambda = None;
        atom.explicit_hydrogens = None;
    }
    for ((&target, &element), template) in targets.iter().zip(elements).zip(templates.iter().cycle()) {
        let atom = fm.atom_mut(target);
        atom.element = element;
        atom.charge = template.charge;
        atom.explicit_hydrogens = template.explicit_hydrogens;
    }
    Ok(())
}
