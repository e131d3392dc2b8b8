pub mod bridge;
pub mod build;
pub mod config;
pub mod element;
pub mod error;
pub mod fragment;
pub mod fusion;
pub mod kekulize;
pub mod molecule;
pub mod rings;
pub mod smiles;
pub mod tree;
pub mod valence;

pub use build::{build, StructureBuilder};
pub use config::{BuildConfig, ConfigError};
pub use element::Element;
pub use error::{BuildError, StructureBuildingError, TreeShapeError};
pub use fragment::{Atom, AtomId, BondOrder, FragmentId, FragmentKind, FragmentManager, InAtom, OutAtom};
pub use fusion::{assemble_fused, build_ring_assembly, FusionComponent, JunctionLocants};
pub use kekulize::kekulize;
pub use molecule::{MolAtom, Molecule};
pub use smiles::{build_seed, Labels, Seed, SmilesError};
pub use tree::{Group, Heteroatom, NameTree, NameTreeBuilder, NodeId, NodeKind, NodeSpec, WordKind};

#[cfg(test)]
mod tests;
