//! From a name tree to a finished molecule.
//!
//! Every substituent, bracket and root becomes a [`Unit`](unit::Unit) of
//! one or more fragments. The units of each word are bonded scope by scope,
//! substituent words are joined to the functional atoms of the next full
//! word, and everything is merged into one fragment. The final pass turns
//! spare valencies into double bonds, adds hydrogens and checks every
//! atom's valence.

mod functional;
mod resolve;
mod unit;

use tracing::{debug, instrument, warn};

use crate::config::BuildConfig;
use crate::error::{BuildError, StructureBuildingError};
use crate::fragment::{FragmentId, FragmentManager};
use crate::kekulize::kekulize;
use crate::molecule::Molecule;
use crate::tree::{NameTree, NodeId, NodeKind, WordKind};
use crate::valence::{check_valence, complete_hydrogens};

use functional::Word;

/// Builds molecules from name trees under one configuration.
///
/// Each call to [`build`](Self::build) works on its own
/// [`FragmentManager`], so a builder can be reused and shared freely.
#[derive(Debug, Clone, Copy)]
pub struct StructureBuilder<'c> {
    config: &'c BuildConfig,
}

impl<'c> StructureBuilder<'c> {
    pub fn new(config: &'c BuildConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuildConfig {
        self.config
    }

    #[instrument(skip_all, fields(words = tree.words().len()))]
    pub fn build(&self, tree: &NameTree) -> Result<Molecule, BuildError> {
        let result = Session::new(tree, self.config).run();
        match &result {
            Ok(mol) => debug!(formula = %mol.formula(), "built structure"),
            Err(e) if self.config.detailed_failure_analysis => {
                warn!(error = %e, tree = %tree.describe(), "structure building failed");
            }
            Err(e) => debug!(error = %e, "structure building failed"),
        }
        result
    }
}

/// Builds `tree` with a one-off [`StructureBuilder`].
pub fn build(tree: &NameTree, config: &BuildConfig) -> Result<Molecule, BuildError> {
    StructureBuilder::new(config).build(tree)
}

/// State of one build.
pub(crate) struct Session<'a> {
    fm: FragmentManager,
    tree: &'a NameTree,
    config: &'a BuildConfig,
}

impl<'a> Session<'a> {
    fn new(tree: &'a NameTree, config: &'a BuildConfig) -> Self {
        Self {
            fm: FragmentManager::new(),
            tree,
            config,
        }
    }

    fn run(mut self) -> Result<Molecule, BuildError> {
        let tree = self.tree;
        let mut words = Vec::with_capacity(tree.words().len());
        for &word in tree.words() {
            words.push(self.build_word(word)?);
        }
        self.join_words(&words)?;

        let fragments: Vec<FragmentId> = words.iter().flat_map(|w| w.fragments.iter().copied()).collect();
        let Some((&base, rest)) = fragments.split_first() else {
            return Err(StructureBuildingError::NoSubstitutionTarget.into());
        };
        for &frag in rest {
            self.fm.incorporate(base, frag);
        }
        for frag in self.fm.fragment_ids() {
            if frag != base {
                self.fm.discard_fragment(frag);
            }
        }
        self.finish(base)
    }

    fn build_word(&mut self, word: NodeId) -> Result<Word, BuildError> {
        let tree = self.tree;
        let kind = match tree.kind(word) {
            NodeKind::Word(kind) => *kind,
            _ => WordKind::Full,
        };
        let mut units = Vec::new();
        for &child in tree.children(word) {
            let unit = match tree.kind(child) {
                NodeKind::Bracket => self.build_bracket(child)?,
                _ => self.build_group_unit(child)?,
            };
            units.push(unit);
        }
        self.resolve_scope(&units)?;
        Ok(Word {
            kind,
            fragments: units.iter().flat_map(|u| u.instances.iter().copied()).collect(),
        })
    }

    /// Open valences, double bonds, hydrogens, valence check.
    fn finish(mut self, frag: FragmentId) -> Result<Molecule, BuildError> {
        let open = self.fm.fragment(frag).out_atoms().len() + self.fm.fragment(frag).in_atoms().len();
        if open > 0 {
            if !self.config.allow_radicals {
                return Err(StructureBuildingError::UnresolvedRadicals(open).into());
            }
            let fragment = self.fm.fragment_mut(frag);
            let outs = std::mem::take(&mut fragment.out_atoms);
            let ins = std::mem::take(&mut fragment.in_atoms);
            let electrons = outs
                .iter()
                .map(|o| (o.atom, o.order))
                .chain(ins.iter().map(|i| (i.atom, i.order)));
            for (atom, order) in electrons {
                self.fm.atom_mut(atom).radical_electrons += order.value();
            }
            debug!(open, "open valences kept as radicals");
        }

        kekulize(&mut self.fm, frag)?;
        let hydrogens = complete_hydrogens(&self.fm, frag)?;
        if let Err(errors) = check_valence(&self.fm, frag, &hydrogens) {
            if self.config.detailed_failure_analysis {
                for e in &errors {
                    warn!(error = %e, "valence violation");
                }
            }
            if let Some(first) = errors.into_iter().next() {
                return Err(first.into());
            }
        }
        Ok(Molecule::from_fragment(&self.fm, frag, &hydrogens))
    }
}
