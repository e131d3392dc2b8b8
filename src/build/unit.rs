//! Turning one substituent, root or bracket node into fragments.
//!
//! The children of a substituent or root are read into a [`Plan`] first,
//! which settles what each locant and multiplier applies to. The plan is
//! then carried out in a fixed order: ring components (with any bridge
//! descriptor), fusion, ring assembly, replacement heteroatoms, suffixes,
//! open valences. Multipliers on the whole unit are applied last, by
//! cloning.

use tracing::debug;

use crate::bridge::{build_spiro, build_von_baeyer};
use crate::element::Element;
use crate::error::{BuildError, StructureBuildingError, TreeShapeError};
use crate::fragment::{AtomId, BondOrder, FragmentId, FragmentManager, OutAtom};
use crate::fusion::{assemble_fused, build_ring_assembly, FusionComponent, JunctionLocants};
use crate::smiles::{build_seed, Seed};
use crate::tree::{Group, Heteroatom, NameTree, NodeId, NodeKind};

use super::Session;

/// The structure built for one node of a scope.
#[derive(Debug, Clone)]
pub(super) struct Unit {
    pub node: NodeId,
    /// One fragment per copy.
    pub instances: Vec<FragmentId>,
    /// Attachment locants were given.
    pub locanted: bool,
    /// A root whose copies receive bonds from the unit to its left.
    pub multiplicative: bool,
}

#[derive(Debug, Clone, Copy)]
enum Bridge<'t> {
    Spiro(&'t str),
    VonBaeyer(&'t str),
}

#[derive(Debug)]
struct Component<'t> {
    group: &'t Group,
    fusion: Option<&'t str>,
    multiplier: u32,
    benzo_locants: Vec<String>,
    bridge: Option<Bridge<'t>>,
}

/// A counted feature: replacement atoms, suffixes, open valences.
#[derive(Debug)]
struct Counted<T> {
    what: T,
    locants: Vec<String>,
    count: u32,
}

#[derive(Debug, Default)]
struct Plan<'t> {
    attach: Option<Vec<String>>,
    multiplier: Option<u32>,
    components: Vec<Component<'t>>,
    assembly: Option<(u32, Option<Vec<String>>)>,
    heteroatoms: Vec<Counted<Heteroatom>>,
    suffixes: Vec<Counted<&'t Seed>>,
    open_valences: Vec<Counted<BondOrder>>,
}

/// Count of a feature from its locants and multiplier, which must agree
/// when both are present.
fn count_of(locants: Option<&[String]>, multiplier: Option<u32>) -> Result<u32, TreeShapeError> {
    match (locants, multiplier) {
        (Some(l), Some(m)) if l.len() != m as usize => Err(TreeShapeError::LocantCountMismatch {
            locants: l.len(),
            multiplier: m as usize,
        }),
        (_, Some(m)) => Ok(m),
        (Some(l), None) => Ok(l.len() as u32),
        (None, None) => Ok(1),
    }
}

impl<'a> Session<'a> {
    fn check_multiplier(&self, value: u32) -> Result<u32, TreeShapeError> {
        let max = self.config.max_multiplier;
        if value > max {
            return Err(TreeShapeError::MultiplierTooLarge { value, max });
        }
        Ok(value)
    }

    fn plan(&self, node: NodeId) -> Result<Plan<'a>, TreeShapeError> {
        let tree: &'a NameTree = self.tree;
        let children = tree.children(node);
        let mut plan = Plan::default();
        let mut locants: Option<Vec<String>> = None;
        let mut multiplier: Option<u32> = None;
        let mut bridge: Option<Bridge<'a>> = None;

        for (i, &child) in children.iter().enumerate() {
            let next = children.get(i + 1).map(|&n| tree.kind(n));
            match tree.kind(child) {
                NodeKind::Locant(l) => {
                    if locants.is_some() {
                        return Err(TreeShapeError::UnexpectedNode("locant"));
                    }
                    locants = Some(l.clone());
                }
                NodeKind::Multiplier(m) => {
                    if multiplier.is_some() {
                        return Err(TreeShapeError::UnexpectedNode("multiplier"));
                    }
                    multiplier = Some(self.check_multiplier(*m)?);
                }
                NodeKind::Heteroatom(h) => {
                    let count = count_of(locants.as_deref(), multiplier.take())?;
                    plan.heteroatoms.push(Counted {
                        what: *h,
                        locants: locants.take().unwrap_or_default(),
                        count,
                    });
                }
                NodeKind::Suffix(seed) => {
                    let count = count_of(locants.as_deref(), multiplier.take())?;
                    plan.suffixes.push(Counted {
                        what: seed,
                        locants: locants.take().unwrap_or_default(),
                        count,
                    });
                }
                NodeKind::OpenValence(order) => {
                    let count = count_of(locants.as_deref(), multiplier.take())?;
                    plan.open_valences.push(Counted {
                        what: *order,
                        locants: locants.take().unwrap_or_default(),
                        count,
                    });
                }
                NodeKind::Spiro(d) => bridge = Some(Bridge::Spiro(d)),
                NodeKind::VonBaeyer(d) => bridge = Some(Bridge::VonBaeyer(d)),
                NodeKind::RingAssemblyMultiplier(n) => {
                    if plan.assembly.is_some() {
                        return Err(TreeShapeError::UnexpectedNode("ringAssemblyMultiplier"));
                    }
                    plan.assembly = Some((self.check_multiplier(*n)?, locants.take()));
                }
                NodeKind::Group(group) => {
                    let fused_next = matches!(next, Some(NodeKind::Fusion(_)));
                    let bracketless_benzo = group.benzo && !fused_next && matches!(next, Some(NodeKind::Group(_)));
                    let mut component = Component {
                        group,
                        fusion: None,
                        multiplier: 1,
                        benzo_locants: Vec::new(),
                        bridge: bridge.take(),
                    };
                    if fused_next {
                        if let Some(m) = multiplier.take() {
                            component.multiplier = m;
                        }
                    } else if bracketless_benzo {
                        component.benzo_locants = locants.take().unwrap_or_default();
                    }
                    if let Some(l) = locants.take() {
                        if plan.attach.replace(l).is_some() {
                            return Err(TreeShapeError::UnexpectedNode("locant"));
                        }
                    }
                    if let Some(m) = multiplier.take() {
                        if plan.multiplier.replace(m).is_some() {
                            return Err(TreeShapeError::UnexpectedNode("multiplier"));
                        }
                    }
                    plan.components.push(component);
                }
                NodeKind::Fusion(d) => {
                    let follows_group = i > 0 && matches!(tree.kind(children[i - 1]), NodeKind::Group(_));
                    match plan.components.last_mut() {
                        Some(last) if follows_group => last.fusion = Some(d),
                        _ => {
                            return Err(TreeShapeError::MissingSibling {
                                expected: "group",
                                after: "fusion",
                            })
                        }
                    }
                }
                other => return Err(TreeShapeError::UnexpectedNode(other.name())),
            }
        }

        if let (Some(l), Some(m)) = (&plan.attach, plan.multiplier) {
            if l.len() != m as usize {
                return Err(TreeShapeError::LocantCountMismatch {
                    locants: l.len(),
                    multiplier: m as usize,
                });
            }
        }
        if bridge.is_some() {
            return Err(TreeShapeError::MissingSibling {
                expected: "group",
                after: "ring descriptor",
            });
        }
        if locants.is_some() || multiplier.is_some() {
            return Err(TreeShapeError::MissingSibling {
                expected: "group or suffix",
                after: if locants.is_some() { "locant" } else { "multiplier" },
            });
        }
        Ok(plan)
    }

    /// Builds a substituent or root node.
    pub(super) fn build_group_unit(&mut self, node: NodeId) -> Result<Unit, BuildError> {
        let plan = self.plan(node)?;
        let main = self.build_rings(&plan)?;

        for feature in &plan.heteroatoms {
            for k in 0..feature.count as usize {
                let atom = match feature.locants.get(k) {
                    Some(locant) => self
                        .fm
                        .atom_by_locant(main, locant)
                        .ok_or_else(|| StructureBuildingError::LocantNotFound(locant.clone()))?,
                    None => lowest_carbon(&self.fm, main)?,
                };
                replace_atom(&mut self.fm, atom, &feature.what);
            }
        }

        for feature in &plan.suffixes {
            for k in 0..feature.count as usize {
                self.attach_suffix(main, feature.what, feature.locants.get(k))?;
            }
        }

        for feature in &plan.open_valences {
            for k in 0..feature.count as usize {
                let order = feature.what;
                let (atom, explicit) = match feature.locants.get(k) {
                    Some(locant) => (
                        self.fm
                            .atom_by_locant(main, locant)
                            .ok_or_else(|| StructureBuildingError::LocantNotFound(locant.clone()))?,
                        true,
                    ),
                    None => (first_free(&self.fm, main, order.value())?, false),
                };
                self.fm.fragment_mut(main).add_out_atom(OutAtom {
                    set_explicitly: explicit,
                    ..OutAtom::new(atom, order)
                });
            }
        }

        let is_root = matches!(self.tree.kind(node), NodeKind::Root);
        let copies = plan.multiplier.unwrap_or(1) as usize;
        let multiplicative = is_root && copies > 1;
        let instances = if multiplicative {
            self.multiply_root(main, copies)?
        } else {
            self.copies(main, copies)
        };

        let locanted = match &plan.attach {
            Some(locants) => {
                assign_locants(&mut self.fm, &instances, locants)?;
                true
            }
            None => false,
        };
        debug!(%node, instances = instances.len(), locanted, multiplicative, "built unit");
        Ok(Unit {
            node,
            instances,
            locanted,
            multiplicative,
        })
    }

    /// Seeds, bridge descriptors, fusion and ring assembly.
    fn build_rings(&mut self, plan: &Plan<'_>) -> Result<FragmentId, BuildError> {
        let mut components = Vec::with_capacity(plan.components.len());
        for component in &plan.components {
            let mut frag = build_seed(&mut self.fm, &component.group.seed)?;
            frag = match component.bridge {
                Some(Bridge::Spiro(d)) => build_spiro(&mut self.fm, frag, d)?,
                Some(Bridge::VonBaeyer(d)) => build_von_baeyer(&mut self.fm, frag, d)?,
                None => frag,
            };
            let mut fc = FusionComponent::new(frag).with_multiplier(component.multiplier as usize);
            if let Some(d) = component.fusion {
                fc = fc.with_descriptor(d);
            }
            if component.group.benzo && component.fusion.is_none() {
                fc = fc.benzo();
                fc.benzo_locants = component.benzo_locants.clone();
            }
            components.push(fc);
        }

        let main = match components.as_slice() {
            [] => return Err(TreeShapeError::Empty("substituent").into()),
            [single] if single.descriptor.is_none() && single.multiplier == 1 => single.fragment,
            [_] => {
                return Err(TreeShapeError::MissingSibling {
                    expected: "group",
                    after: "fusion",
                }
                .into())
            }
            _ => assemble_fused(&mut self.fm, &components)?,
        };

        match &plan.assembly {
            Some((count, locants)) => {
                let junctions = locants.as_deref().map(JunctionLocants::from_locants).transpose()?;
                build_ring_assembly(&mut self.fm, main, *count as usize, junctions.as_ref())
            }
            None => Ok(main),
        }
    }

    /// Builds a suffix seed and bonds its open valence to `main`.
    fn attach_suffix(&mut self, main: FragmentId, seed: &Seed, locant: Option<&String>) -> Result<(), BuildError> {
        let suffix = build_seed(&mut self.fm, seed)?;
        let out = self
            .fm
            .fragment(suffix)
            .out_atoms()
            .first()
            .cloned()
            .ok_or(StructureBuildingError::NoSubstitutionTarget)?;
        let order = out.order.value();
        let target = match locant {
            Some(l) => {
                let atom = self
                    .fm
                    .atom_by_locant(main, l)
                    .ok_or_else(|| StructureBuildingError::LocantNotFound(l.clone()))?;
                if self.fm.free_valence(atom) < order as i16 {
                    return Err(StructureBuildingError::NoSubstitutableAtom { order }.into());
                }
                atom
            }
            None => first_free(&self.fm, main, order)?,
        };
        self.fm.create_bond(out.atom, target, out.order)?;
        self.fm.fragment_mut(suffix).take_out_atom(out.atom, out.order);
        self.fm.incorporate(main, suffix);
        debug!(smiles = %seed.smiles, %target, "attached suffix");
        Ok(())
    }

    /// `main` plus `count - 1` plain copies.
    fn copies(&mut self, main: FragmentId, count: usize) -> Vec<FragmentId> {
        let mut instances = vec![main];
        for _ in 1..count {
            instances.push(self.fm.clone_fragment(main, 0));
        }
        instances
    }

    /// Copies of a multiplicative root: copy `i` carries `i` primes and one
    /// in atom waiting for the bridging substituent.
    fn multiply_root(&mut self, main: FragmentId, count: usize) -> Result<Vec<FragmentId>, BuildError> {
        let mut instances = vec![main];
        for primes in 1..count {
            instances.push(self.fm.clone_fragment(main, primes));
        }
        for &copy in &instances {
            let atom = match self.fm.fragment(copy).default_in_atom() {
                Some(atom) => atom,
                None => first_free(&self.fm, copy, 1)?,
            };
            self.fm.fragment_mut(copy).add_in_atom(atom, BondOrder::Single);
        }
        Ok(instances)
    }

    /// Builds a bracket: its body is resolved as a scope of its own, merged
    /// into one fragment, then multiplied.
    pub(super) fn build_bracket(&mut self, node: NodeId) -> Result<Unit, BuildError> {
        let tree = self.tree;
        let mut attach = None;
        let mut multiplier = None;
        let mut body = Vec::new();
        for &child in tree.children(node) {
            match tree.kind(child) {
                NodeKind::Locant(l) => attach = Some(l.clone()),
                NodeKind::Multiplier(m) => multiplier = Some(self.check_multiplier(*m)?),
                NodeKind::Substituent => body.push(self.build_group_unit(child)?),
                NodeKind::Bracket => body.push(self.build_bracket(child)?),
                other => return Err(TreeShapeError::UnexpectedNode(other.name()).into()),
            }
        }
        if let (Some(l), Some(m)) = (&attach, multiplier) {
            if l.len() != m as usize {
                return Err(TreeShapeError::LocantCountMismatch {
                    locants: l.len(),
                    multiplier: m as usize,
                }
                .into());
            }
        }

        self.resolve_scope(&body)?;
        let fragments: Vec<FragmentId> = body.iter().rev().flat_map(|u| u.instances.iter().copied()).collect();
        let Some((&merged, rest)) = fragments.split_first() else {
            return Err(TreeShapeError::Empty("bracket").into());
        };
        for &frag in rest {
            self.fm.incorporate(merged, frag);
        }

        let instances = self.copies(merged, multiplier.unwrap_or(1) as usize);
        let locanted = match &attach {
            Some(locants) => {
                assign_locants(&mut self.fm, &instances, locants)?;
                true
            }
            None => false,
        };
        debug!(%node, instances = instances.len(), locanted, "built bracket");
        Ok(Unit {
            node,
            instances,
            locanted,
            multiplicative: false,
        })
    }
}

/// Gives each out atom of `instances` its target locant: one per copy when
/// the counts match, otherwise in order across all out atoms.
fn assign_locants(fm: &mut FragmentManager, instances: &[FragmentId], locants: &[String]) -> Result<(), TreeShapeError> {
    let total: usize = instances.iter().map(|&f| fm.fragment(f).out_atoms().len()).sum();
    let mismatch = || TreeShapeError::LocantCountMismatch {
        locants: locants.len(),
        multiplier: total,
    };

    if instances.len() > 1 && locants.len() == instances.len() {
        for (&frag, locant) in instances.iter().zip(locants) {
            let out = fm.fragment_mut(frag).out_atoms.first_mut().ok_or_else(mismatch)?;
            out.target_locant = Some(locant.clone());
            out.set_explicitly = true;
        }
        return Ok(());
    }
    if locants.len() > total {
        return Err(mismatch());
    }
    let mut remaining = locants.iter();
    for &frag in instances {
        for out in fm.fragment_mut(frag).out_atoms.iter_mut() {
            match remaining.next() {
                Some(locant) => {
                    out.target_locant = Some(locant.clone());
                    out.set_explicitly = true;
                }
                None => return Ok(()),
            }
        }
    }
    Ok(())
}

/// First atom of `frag`, in atom order, with at least `order` free valence.
pub(super) fn first_free(fm: &FragmentManager, frag: FragmentId, order: u8) -> Result<AtomId, StructureBuildingError> {
    fm.fragment(frag)
        .atoms()
        .iter()
        .copied()
        .find(|&a| fm.free_valence(a) >= order as i16)
        .ok_or(StructureBuildingError::NoSubstitutableAtom { order })
}

fn lowest_carbon(fm: &FragmentManager, frag: FragmentId) -> Result<AtomId, StructureBuildingError> {
    fm.fragment(frag)
        .atoms()
        .iter()
        .copied()
        .find(|&a| fm.atom(a).element == Element::C)
        .ok_or_else(|| StructureBuildingError::LocantNotFound("carbon".into()))
}

/// Replaces the element of `atom`. A spare valency the new element can no
/// longer carry is dropped.
fn replace_atom(fm: &mut FragmentManager, atom: AtomId, with: &Heteroatom) {
    let a = fm.atom_mut(atom);
    a.element = with.element;
    a.charge = with.charge;
    a.lambda = with.lambda;
    let spare = a.spare_valency;
    let lowest = a.allowed_valences().first().copied().unwrap_or(0);
    if spare && fm.used_valence(atom) > lowest {
        fm.atom_mut(atom).spare_valency = false;
    }
    debug!(%atom, element = %with.element, "replaced atom");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_from_locants_and_multiplier() {
        let two = vec!["1".to_string(), "4".to_string()];
        assert_eq!(count_of(Some(&two), Some(2)).unwrap(), 2);
        assert_eq!(count_of(Some(&two), None).unwrap(), 2);
        assert_eq!(count_of(None, Some(3)).unwrap(), 3);
        assert_eq!(count_of(None, None).unwrap(), 1);
        assert_eq!(
            count_of(Some(&two[..1]), Some(2)).unwrap_err(),
            TreeShapeError::LocantCountMismatch {
                locants: 1,
                multiplier: 2
            }
        );
    }

    #[test]
    fn locants_one_per_copy() {
        let mut fm = FragmentManager::new();
        let methyl = build_seed(&mut fm, &Seed::new("-C")).unwrap();
        let copy = fm.clone_fragment(methyl, 0);
        let locants = vec!["2".to_string(), "3".to_string()];
        assign_locants(&mut fm, &[methyl, copy], &locants).unwrap();
        assert_eq!(fm.fragment(copy).out_atoms()[0].target_locant.as_deref(), Some("3"));
        assert!(fm.fragment(methyl).out_atoms()[0].set_explicitly);
    }

    #[test]
    fn locants_in_sequence_on_one_copy() {
        let mut fm = FragmentManager::new();
        let methylene = build_seed(&mut fm, &Seed::new("-C-")).unwrap();
        let locants = vec!["4".to_string(), "4'".to_string()];
        assign_locants(&mut fm, &[methylene], &locants).unwrap();
        let outs = fm.fragment(methylene).out_atoms();
        assert_eq!(outs[1].target_locant.as_deref(), Some("4'"));
    }

    #[test]
    fn too_many_locants() {
        let mut fm = FragmentManager::new();
        let methyl = build_seed(&mut fm, &Seed::new("-C")).unwrap();
        let locants = vec!["2".to_string(), "3".to_string()];
        assert!(matches!(
            assign_locants(&mut fm, &[methyl], &locants),
            Err(TreeShapeError::LocantCountMismatch { locants: 2, multiplier: 1 })
        ));
    }

    #[test]
    fn replacement_drops_spare_valency_nitrogen_can_not_hold() {
        let mut fm = FragmentManager::new();
        let benzene = build_seed(&mut fm, &Seed::new("c1ccccc1")).unwrap();
        let atom = fm.atom_by_locant(benzene, "1").unwrap();
        replace_atom(&mut fm, atom, &Heteroatom::new(Element::N));
        assert!(fm.atom(atom).spare_valency);
        replace_atom(&mut fm, atom, &Heteroatom::new(Element::O));
        assert!(!fm.atom(atom).spare_valency);
    }
}
