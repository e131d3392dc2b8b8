//! The annotated name tree the builder consumes.
//!
//! The tree is immutable once built: an arena of [`Node`]s addressed by
//! [`NodeId`], with the name node at index 0. The structure builder never
//! edits it; fragments built for a node live in a separate node → fragment
//! map.
//!
//! Shape:
//!
//! ```text
//! name
//! └── word*                  full word, or substituent word of a
//!     ├── substituent*       functional-class name ("ethyl acetate")
//!     ├── bracket*
//!     │   ├── locant? multiplier?
//!     │   └── (substituent | bracket)+
//!     └── root               full words only, always last
//! ```
//!
//! A substituent or root holds, in name order, any of locant, multiplier,
//! heteroatom, fusion, spiro, vonBaeyer, ringAssemblyMultiplier, group,
//! suffix and openValence nodes. A locant node applies to the next sibling
//! that is not a locant or multiplier:
//!
//! - a heteroatom: it places the replacement atoms;
//! - a ringAssemblyMultiplier: it lists the junction locant pairs;
//! - a suffix or openValence: it places those;
//! - a benzo group followed directly by another group: it gives the
//!   heteroatom positions of the benzo-fused system;
//! - anything else: it says where the substituent attaches.
//!
//! A multiplier directly before a group that is followed by a fusion node
//! multiplies that fusion component (`dibenzo[b,d]`). Before a heteroatom,
//! suffix or openValence it multiplies those. Otherwise it multiplies the
//! substituent, or, in a root, makes the root multiplicative. A locant and a
//! multiplier that apply to the same node must agree in count.

use std::fmt::{self, Write};

use serde::Deserialize;

use crate::element::Element;
use crate::error::TreeShapeError;
use crate::fragment::BondOrder;
use crate::smiles::Seed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WordKind {
    #[default]
    Full,
    /// Substituents only, joined to the functional atoms of the next full
    /// word.
    Substituent,
}

/// A group with the seed it starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub seed: Seed,
    /// `benzo`/`benz` prefixes fuse by convention when no bracket follows.
    pub benzo: bool,
}

/// A replacement prefix (`oxa`, `aza`, `λ⁴-thia`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heteroatom {
    pub element: Element,
    pub charge: i8,
    pub lambda: Option<u8>,
}

impl Heteroatom {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            charge: 0,
            lambda: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Name,
    Word(WordKind),
    Bracket,
    Substituent,
    Root,
    Group(Group),
    Suffix(Seed),
    Locant(Vec<String>),
    Multiplier(u32),
    Heteroatom(Heteroatom),
    Fusion(String),
    Spiro(String),
    VonBaeyer(String),
    RingAssemblyMultiplier(u32),
    /// An open valence added to the group (`-yl`, `-ylidene`, `-diyl`).
    OpenValence(BondOrder),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Name => "name",
            NodeKind::Word(_) => "word",
            NodeKind::Bracket => "bracket",
            NodeKind::Substituent => "substituent",
            NodeKind::Root => "root",
            NodeKind::Group(_) => "group",
            NodeKind::Suffix(_) => "suffix",
            NodeKind::Locant(_) => "locant",
            NodeKind::Multiplier(_) => "multiplier",
            NodeKind::Heteroatom(_) => "heteroatom",
            NodeKind::Fusion(_) => "fusion",
            NodeKind::Spiro(_) => "spiro",
            NodeKind::VonBaeyer(_) => "vonBaeyer",
            NodeKind::RingAssemblyMultiplier(_) => "ringAssemblyMultiplier",
            NodeKind::OpenValence(_) => "openValence",
        }
    }

    fn is_container(&self) -> bool {
        matches!(
            self,
            NodeKind::Name | NodeKind::Word(_) | NodeKind::Bracket | NodeKind::Substituent | NodeKind::Root
        )
    }

    /// Whether `child` may appear directly under a node of this kind.
    fn accepts(&self, child: &NodeKind) -> bool {
        match self {
            NodeKind::Name => matches!(child, NodeKind::Word(_)),
            NodeKind::Word(_) => matches!(child, NodeKind::Substituent | NodeKind::Bracket | NodeKind::Root),
            NodeKind::Bracket => matches!(
                child,
                NodeKind::Substituent | NodeKind::Bracket | NodeKind::Locant(_) | NodeKind::Multiplier(_)
            ),
            NodeKind::Substituent | NodeKind::Root => !child.is_container(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NameTree {
    nodes: Vec<Node>,
}

impl NameTree {
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// The word nodes, in name order.
    pub fn words(&self) -> &[NodeId] {
        self.children(self.root())
    }

    /// Indented dump of the tree, one node per line.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.describe_into(self.root(), 0, &mut out);
        out
    }

    fn describe_into(&self, id: NodeId, depth: usize, out: &mut String) {
        let kind = self.kind(id);
        let detail = match kind {
            NodeKind::Word(k) => format!(" {k:?}"),
            NodeKind::Group(g) => format!(" {}{}", g.seed.smiles, if g.benzo { " (benzo)" } else { "" }),
            NodeKind::Suffix(s) => format!(" {}", s.smiles),
            NodeKind::Locant(l) => format!(" {}", l.join(",")),
            NodeKind::Multiplier(n) | NodeKind::RingAssemblyMultiplier(n) => format!(" {n}"),
            NodeKind::Heteroatom(h) => format!(" {}", h.element),
            NodeKind::Fusion(d) | NodeKind::Spiro(d) | NodeKind::VonBaeyer(d) => format!(" {d}"),
            NodeKind::OpenValence(order) => format!(" {order:?}"),
            _ => String::new(),
        };
        let _ = writeln!(out, "{:indent$}{id} {}{detail}", "", kind.name(), indent = depth * 2);
        for &child in self.children(id) {
            self.describe_into(child, depth + 1, out);
        }
    }

    /// Checks the container rules every build relies on.
    fn validate(&self) -> Result<(), TreeShapeError> {
        if self.words().is_empty() {
            return Err(TreeShapeError::Empty("name"));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            let id = NodeId(i as u32);
            match &node.kind {
                NodeKind::Word(kind) => {
                    let roots: Vec<usize> = node
                        .children
                        .iter()
                        .enumerate()
                        .filter(|(_, &c)| matches!(self.kind(c), NodeKind::Root))
                        .map(|(pos, _)| pos)
                        .collect();
                    match (kind, roots.as_slice()) {
                        (_, _) if node.children.is_empty() => return Err(TreeShapeError::Empty("word")),
                        (WordKind::Full, [pos]) if *pos + 1 == node.children.len() => {}
                        (WordKind::Full, []) => {
                            return Err(TreeShapeError::MissingSibling {
                                expected: "root",
                                after: "substituents",
                            })
                        }
                        (WordKind::Full, _) => return Err(TreeShapeError::UnexpectedNode("root")),
                        (WordKind::Substituent, []) => {}
                        (WordKind::Substituent, _) => return Err(TreeShapeError::UnexpectedNode("root")),
                    }
                }
                NodeKind::Bracket => {
                    let has_body = node
                        .children
                        .iter()
                        .any(|&c| matches!(self.kind(c), NodeKind::Substituent | NodeKind::Bracket));
                    if !has_body {
                        return Err(TreeShapeError::Empty("bracket"));
                    }
                    let first_body = node
                        .children
                        .iter()
                        .position(|&c| matches!(self.kind(c), NodeKind::Substituent | NodeKind::Bracket))
                        .unwrap_or(0);
                    if node.children[first_body..]
                        .iter()
                        .any(|&c| matches!(self.kind(c), NodeKind::Locant(_) | NodeKind::Multiplier(_)))
                    {
                        return Err(TreeShapeError::UnexpectedNode("locant"));
                    }
                }
                NodeKind::Substituent | NodeKind::Root => {
                    let has_group = node
                        .children
                        .iter()
                        .any(|&c| matches!(self.kind(c), NodeKind::Group(_)));
                    if !has_group {
                        return Err(TreeShapeError::Empty(node.kind.name()));
                    }
                    if let Some(&last) = node.children.last() {
                        if matches!(self.kind(last), NodeKind::Locant(_) | NodeKind::Multiplier(_)) {
                            return Err(TreeShapeError::MissingSibling {
                                expected: "group or suffix",
                                after: self.kind(last).name(),
                            });
                        }
                    }
                }
                _ => {}
            }
            for &child in &node.children {
                if !node.kind.accepts(self.kind(child)) {
                    return Err(TreeShapeError::UnexpectedNode(self.kind(child).name()));
                }
                debug_assert_eq!(self.parent(child), Some(id));
            }
        }
        Ok(())
    }
}

/// Incremental construction of a [`NameTree`].
///
/// ```
/// use namecrab::{NameTreeBuilder, Seed, WordKind};
///
/// // 2-methylpropane
/// let tree = NameTreeBuilder::new()
///     .open_word(WordKind::Full)
///     .open_substituent()
///     .locants(&["2"])
///     .group(Seed::new("-C"))
///     .close()
///     .open_root()
///     .group(Seed::new("CCC"))
///     .close()
///     .close()
///     .build()
///     .unwrap();
/// assert_eq!(tree.words().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct NameTreeBuilder {
    nodes: Vec<Node>,
    stack: Vec<NodeId>,
    error: Option<TreeShapeError>,
}

impl Default for NameTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NameTreeBuilder {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Name,
                parent: None,
                children: Vec::new(),
            }],
            stack: vec![NodeId(0)],
            error: None,
        }
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let parent = self.stack.last().copied();
        if let Some(p) = parent {
            self.nodes[p.index()].children.push(id);
        }
        self.nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
        });
        id
    }

    pub fn open(mut self, kind: NodeKind) -> Self {
        let id = self.push(kind);
        self.stack.push(id);
        self
    }

    pub fn leaf(mut self, kind: NodeKind) -> Self {
        self.push(kind);
        self
    }

    pub fn close(mut self) -> Self {
        if self.stack.len() <= 1 {
            self.error.get_or_insert(TreeShapeError::Unbalanced("close without open"));
        } else {
            self.stack.pop();
        }
        self
    }

    pub fn open_word(self, kind: WordKind) -> Self {
        self.open(NodeKind::Word(kind))
    }

    pub fn open_bracket(self) -> Self {
        self.open(NodeKind::Bracket)
    }

    pub fn open_substituent(self) -> Self {
        self.open(NodeKind::Substituent)
    }

    pub fn open_root(self) -> Self {
        self.open(NodeKind::Root)
    }

    pub fn group(self, seed: Seed) -> Self {
        self.leaf(NodeKind::Group(Group { seed, benzo: false }))
    }

    pub fn benzo(self, seed: Seed) -> Self {
        self.leaf(NodeKind::Group(Group { seed, benzo: true }))
    }

    pub fn suffix(self, seed: Seed) -> Self {
        self.leaf(NodeKind::Suffix(seed))
    }

    pub fn locants(self, locants: &[&str]) -> Self {
        self.leaf(NodeKind::Locant(locants.iter().map(|l| l.to_string()).collect()))
    }

    pub fn multiplier(self, value: u32) -> Self {
        self.leaf(NodeKind::Multiplier(value))
    }

    pub fn heteroatom(self, element: Element) -> Self {
        self.leaf(NodeKind::Heteroatom(Heteroatom::new(element)))
    }

    pub fn fusion(self, descriptor: &str) -> Self {
        self.leaf(NodeKind::Fusion(descriptor.to_string()))
    }

    pub fn spiro(self, descriptor: &str) -> Self {
        self.leaf(NodeKind::Spiro(descriptor.to_string()))
    }

    pub fn von_baeyer(self, descriptor: &str) -> Self {
        self.leaf(NodeKind::VonBaeyer(descriptor.to_string()))
    }

    pub fn ring_assembly(self, count: u32) -> Self {
        self.leaf(NodeKind::RingAssemblyMultiplier(count))
    }

    pub fn open_valence(self, order: BondOrder) -> Self {
        self.leaf(NodeKind::OpenValence(order))
    }

    pub fn build(self) -> Result<NameTree, TreeShapeError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.stack.len() != 1 {
            return Err(TreeShapeError::Unbalanced("node left open"));
        }
        let tree = NameTree { nodes: self.nodes };
        tree.validate()?;
        Ok(tree)
    }
}

/// Serialized form of a name tree, as produced by an external tokenizer.
///
/// ```json
/// {"type": "word", "kind": "full", "children": [
///   {"type": "root", "children": [{"type": "group", "seed": {"smiles": "CCO"}}]}
/// ]}
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeSpec {
    Name {
        children: Vec<NodeSpec>,
    },
    Word {
        #[serde(default)]
        kind: WordKind,
        children: Vec<NodeSpec>,
    },
    Bracket {
        children: Vec<NodeSpec>,
    },
    Substituent {
        children: Vec<NodeSpec>,
    },
    Root {
        children: Vec<NodeSpec>,
    },
    Group {
        seed: Seed,
        #[serde(default)]
        benzo: bool,
    },
    Suffix {
        seed: Seed,
    },
    Locant {
        locants: Vec<String>,
    },
    Multiplier {
        value: u32,
    },
    Heteroatom {
        element: String,
        #[serde(default)]
        charge: i8,
        #[serde(default)]
        lambda: Option<u8>,
    },
    Fusion {
        descriptor: String,
    },
    Spiro {
        descriptor: String,
    },
    VonBaeyer {
        descriptor: String,
    },
    RingAssemblyMultiplier {
        value: u32,
    },
    OpenValence {
        #[serde(default)]
        order: BondOrder,
    },
}

impl TryFrom<&NodeSpec> for NameTree {
    type Error = TreeShapeError;

    /// Accepts a `name` node, or a single `word` which becomes a one-word
    /// name.
    fn try_from(spec: &NodeSpec) -> Result<Self, Self::Error> {
        let builder = match spec {
            NodeSpec::Name { children } => children
                .iter()
                .try_fold(NameTreeBuilder::new(), |b, child| add_spec(b, child))?,
            word @ NodeSpec::Word { .. } => add_spec(NameTreeBuilder::new(), word)?,
            _ => return Err(TreeShapeError::UnexpectedNode("top-level node other than name or word")),
        };
        builder.build()
    }
}

fn add_spec(builder: NameTreeBuilder, spec: &NodeSpec) -> Result<NameTreeBuilder, TreeShapeError> {
    let (kind, children) = match spec {
        NodeSpec::Name { .. } => return Err(TreeShapeError::UnexpectedNode("name")),
        NodeSpec::Word { kind, children } => (NodeKind::Word(*kind), Some(children)),
        NodeSpec::Bracket { children } => (NodeKind::Bracket, Some(children)),
        NodeSpec::Substituent { children } => (NodeKind::Substituent, Some(children)),
        NodeSpec::Root { children } => (NodeKind::Root, Some(children)),
        NodeSpec::Group { seed, benzo } => (
            NodeKind::Group(Group {
                seed: seed.clone(),
                benzo: *benzo,
            }),
            None,
        ),
        NodeSpec::Suffix { seed } => (NodeKind::Suffix(seed.clone()), None),
        NodeSpec::Locant { locants } => (NodeKind::Locant(locants.clone()), None),
        NodeSpec::Multiplier { value } => (NodeKind::Multiplier(*value), None),
        NodeSpec::Heteroatom { element, charge, lambda } => {
            let element =
                Element::from_symbol(element).ok_or_else(|| TreeShapeError::UnknownElement(element.clone()))?;
            (
                NodeKind::Heteroatom(Heteroatom {
                    element,
                    charge: *charge,
                    lambda: *lambda,
                }),
                None,
            )
        }
        NodeSpec::Fusion { descriptor } => (NodeKind::Fusion(descriptor.clone()), None),
        NodeSpec::Spiro { descriptor } => (NodeKind::Spiro(descriptor.clone()), None),
        NodeSpec::VonBaeyer { descriptor } => (NodeKind::VonBaeyer(descriptor.clone()), None),
        NodeSpec::RingAssemblyMultiplier { value } => (NodeKind::RingAssemblyMultiplier(*value), None),
        NodeSpec::OpenValence { order } => (NodeKind::OpenValence(*order), None),
    };
    match children {
        None => Ok(builder.leaf(kind)),
        Some(children) => {
            let opened = children
                .iter()
                .try_fold(builder.open(kind), |b, child| add_spec(b, child))?;
            Ok(opened.close())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ethanol() -> NameTreeBuilder {
        NameTreeBuilder::new()
            .open_word(WordKind::Full)
            .open_root()
            .group(Seed::new("CC"))
            .suffix(Seed::new("-O"))
            .close()
            .close()
    }

    #[test]
    fn builder_links_parents() {
        let tree = ethanol().build().unwrap();
        let word = tree.words()[0];
        let root = tree.children(word)[0];
        assert_eq!(tree.parent(root), Some(word));
        assert_eq!(tree.children(root).len(), 2);
        assert!(matches!(tree.kind(root), NodeKind::Root));
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn unbalanced_is_rejected() {
        let err = NameTreeBuilder::new()
            .open_word(WordKind::Full)
            .open_root()
            .group(Seed::new("C"))
            .build()
            .unwrap_err();
        assert_eq!(err, TreeShapeError::Unbalanced("node left open"));
        let err = ethanol().close().build().unwrap_err();
        assert_eq!(err, TreeShapeError::Unbalanced("close without open"));
    }

    #[test]
    fn full_word_needs_root_last() {
        let err = NameTreeBuilder::new()
            .open_word(WordKind::Full)
            .open_substituent()
            .group(Seed::new("-C"))
            .close()
            .close()
            .build()
            .unwrap_err();
        assert!(matches!(err, TreeShapeError::MissingSibling { expected: "root", .. }));
    }

    #[test]
    fn substituent_needs_group() {
        let err = NameTreeBuilder::new()
            .open_word(WordKind::Full)
            .open_substituent()
            .locants(&["2"])
            .close()
            .open_root()
            .group(Seed::new("C"))
            .close()
            .close()
            .build()
            .unwrap_err();
        assert_eq!(err, TreeShapeError::Empty("substituent"));
    }

    #[test]
    fn trailing_multiplier_is_missing_its_sibling() {
        let err = NameTreeBuilder::new()
            .open_word(WordKind::Full)
            .open_root()
            .group(Seed::new("CC"))
            .multiplier(2)
            .close()
            .close()
            .build()
            .unwrap_err();
        assert!(matches!(err, TreeShapeError::MissingSibling { after: "multiplier", .. }));
    }

    #[test]
    fn group_outside_substituent_rejected() {
        let err = NameTreeBuilder::new()
            .open_word(WordKind::Full)
            .group(Seed::new("C"))
            .open_root()
            .group(Seed::new("C"))
            .close()
            .close()
            .build()
            .unwrap_err();
        assert_eq!(err, TreeShapeError::UnexpectedNode("group"));
    }

    #[test]
    fn describe_lists_every_node() {
        let tree = ethanol().build().unwrap();
        let text = tree.describe();
        assert_eq!(text.lines().count(), tree.len());
        assert!(text.contains("group CC"));
        assert!(text.contains("suffix -O"));
    }

    #[test]
    fn from_json_tree() {
        let json = r#"{
            "type": "name",
            "children": [{
                "type": "word",
                "children": [
                    {"type": "substituent", "children": [
                        {"type": "locant", "locants": ["1", "4"]},
                        {"type": "multiplier", "value": 2},
                        {"type": "heteroatom", "element": "O"}
                    , {"type": "group", "seed": {"smiles": "-C"}}]},
                    {"type": "root", "children": [
                        {"type": "spiro", "descriptor": "spiro[4.5]"},
                        {"type": "group", "seed": {"smiles": "CCCCCCCCCC"}}
                    ]}
                ]
            }]
        }"#;
        let spec: NodeSpec = serde_json::from_str(json).unwrap();
        let tree = NameTree::try_from(&spec).unwrap();
        assert_eq!(tree.words().len(), 1);
        let word = tree.words()[0];
        assert!(matches!(tree.kind(word), NodeKind::Word(WordKind::Full)));
        let root = tree.children(word)[1];
        assert!(matches!(tree.kind(tree.children(root)[0]), NodeKind::Spiro(d) if d == "spiro[4.5]"));
    }

    #[test]
    fn unknown_element_in_json() {
        let json = r#"{"type": "word", "children": [{"type": "root", "children": [
            {"type": "heteroatom", "element": "Xx"},
            {"type": "group", "seed": {"smiles": "CC"}}
        ]}]}"#;
        let spec: NodeSpec = serde_json::from_str(json).unwrap();
        assert_eq!(
            NameTree::try_from(&spec).unwrap_err(),
            TreeShapeError::UnknownElement("Xx".into())
        );
    }
}
