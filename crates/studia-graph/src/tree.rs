//! Mind-tree payload decoding and flattening.
//!
//! The tree backend is asked for strict JSON, but its output is treated as
//! hostile: the payload is recovered leniently, validated once here, and
//! converted into typed [`TreeNode`]s. Everything past this boundary works
//! on the typed tree.

use serde_json::{Map, Value as JsonValue};

use studia_core::{
    extract_first_json_object, normalize_concept, parse_lenient_object, Error, Result, TreeNode,
};

/// One flattened parent→child relation from a proposed tree.
///
/// The parent keeps its raw trimmed spelling (resolution normalizes it
/// later); the child name is already normalized so the empty/self checks
/// happen against the identity the node store will use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatEdge {
    pub parent: String,
    pub child: String,
    pub child_kind: String,
}

/// Decode a raw model response into a validated tree.
///
/// Accepts prose-wrapped and fenced output. Fails when no object can be
/// recovered, when the object has no `tree` member, or when the root node
/// has no usable name.
pub fn parse_mind_tree(raw: &str) -> Result<TreeNode> {
    let extracted = extract_first_json_object(raw).unwrap_or_else(|| raw.to_string());
    let Some(payload) = parse_lenient_object(&extracted) else {
        return Err(Error::MalformedOutput("mind tree 结果不是对象".to_string()));
    };
    let Some(tree) = payload.get("tree").and_then(JsonValue::as_object) else {
        return Err(Error::MalformedOutput("mind tree 缺少 tree".to_string()));
    };
    let root = node_from_object(tree);
    if root.name.trim().is_empty() {
        return Err(Error::MalformedOutput(
            "mind tree 根节点缺少 name".to_string(),
        ));
    }
    Ok(root)
}

/// Convert one object node, keeping only array-of-object children.
/// Non-object children are dropped; missing fields become empty strings
/// so the walk below can apply its own emptiness rules.
fn node_from_object(obj: &Map<String, JsonValue>) -> TreeNode {
    let children = match obj.get("children") {
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(JsonValue::as_object)
            .map(node_from_object)
            .collect(),
        _ => Vec::new(),
    };
    TreeNode {
        name: text_of(obj.get("name")),
        kind: text_of(obj.get("kind")),
        children,
    }
}

/// Flatten a tree into `(parent, child, kind)` relations, depth-first.
///
/// A relation is emitted only when both names are usable and distinct;
/// recursion always continues, so a nameless intermediate node drops its
/// own relations but not its descendants'.
pub fn flatten_tree(root: &TreeNode) -> Vec<FlatEdge> {
    let mut edges = Vec::new();
    walk(root, &mut edges);
    edges
}

fn walk(node: &TreeNode, edges: &mut Vec<FlatEdge>) {
    let parent = node.name.trim();
    for child in &node.children {
        let name = normalize_concept(&child.name);
        let kind = child.kind.trim();
        let kind = if kind.is_empty() { "concept" } else { kind };
        if !name.is_empty() && !parent.is_empty() && name != parent {
            edges.push(FlatEdge {
                parent: parent.to_string(),
                child: name,
                child_kind: kind.to_string(),
            });
        }
        walk(child, edges);
    }
}

fn text_of(value: Option<&JsonValue>) -> String {
    match value {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
