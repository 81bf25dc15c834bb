use super::types::{CommentNode, FlatEntry};

/// Flatten a tree into pre-order: each node before its children, depth
/// increasing by one per level. Pure with respect to the input tree, and an
/// empty tree flattens to an empty sequence.
pub fn flatten(tree: &[CommentNode]) -> Vec<FlatEntry<'_>> {
    let mut entries = Vec::new();
    let mut stack: Vec<(&CommentNode, usize)> = tree.iter().rev().map(|node| (node, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        entries.push(FlatEntry {
            item: &node.item,
            depth,
        });
        stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
    }
    entries
}

/// Total node count across all depths. Defined through `flatten` so the two
/// can never disagree.
pub fn count(tree: &[CommentNode]) -> usize {
    flatten(tree).len()
}
