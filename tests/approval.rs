use namecrab::{build, BuildConfig, NameTree, NodeSpec};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Names with known structures
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct NameEntry {
    name: String,
    formula: String,
    #[serde(default)]
    rings: Option<usize>,
    tree: NodeSpec,
}

#[test]
fn approval_names() {
    let data: Vec<NameEntry> = serde_json::from_str(include_str!("approval_data/names.json")).unwrap();
    let config = BuildConfig::default();

    let mut failures = Vec::new();
    for entry in &data {
        let tree = match NameTree::try_from(&entry.tree) {
            Ok(t) => t,
            Err(e) => {
                failures.push(format!("[tree] {}: {e}", entry.name));
                continue;
            }
        };
        let mol = match build(&tree, &config) {
            Ok(m) => m,
            Err(e) => {
                failures.push(format!("[build] {}: {e}", entry.name));
                continue;
            }
        };

        let formula = mol.formula();
        if formula != entry.formula {
            failures.push(format!(
                "[formula] {}: expected {:?}, got {:?}",
                entry.name, entry.formula, formula
            ));
        }

        if let Some(rings) = entry.rings {
            if mol.ring_count() != rings {
                failures.push(format!(
                    "[rings] {}: expected {}, got {}",
                    entry.name,
                    rings,
                    mol.ring_count()
                ));
            }
        }
    }

    if !failures.is_empty() {
        panic!("{} failures:\n{}", failures.len(), failures.join("\n"));
    }
}

// ---------------------------------------------------------------------------
// Malformed trees
// ---------------------------------------------------------------------------

#[test]
fn approval_rejects_bad_trees() {
    let cases = [
        // root before a substituent
        r#"{"type": "word", "children": [
            {"type": "root", "children": [{"type": "group", "seed": {"smiles": "CC"}}]},
            {"type": "substituent", "children": [{"type": "group", "seed": {"smiles": "-C"}}]}
        ]}"#,
        // substituent without a group
        r#"{"type": "word", "children": [
            {"type": "substituent", "children": [{"type": "locant", "locants": ["1"]}]},
            {"type": "root", "children": [{"type": "group", "seed": {"smiles": "CC"}}]}
        ]}"#,
        // unknown element
        r#"{"type": "word", "children": [
            {"type": "root", "children": [
                {"type": "heteroatom", "element": "Xx"},
                {"type": "group", "seed": {"smiles": "CC"}}
            ]}
        ]}"#,
    ];

    let mut failures = Vec::new();
    for (i, case) in cases.iter().enumerate() {
        let spec: NodeSpec = serde_json::from_str(case).unwrap();
        if let Ok(tree) = NameTree::try_from(&spec) {
            failures.push(format!("case {i} accepted: {}", tree.describe()));
        }
    }
    if !failures.is_empty() {
        panic!("{} failures:\n{}", failures.len(), failures.join("\n"));
    }
}
