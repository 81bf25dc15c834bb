use std::cmp::Reverse;

use super::types::{CommentNode, SortOrder};

/// Reorder siblings at every depth of the tree by the selected order,
/// returning a new tree; the input is left untouched. Sorting is stable, so
/// items with equal creation times keep their relative input order.
pub fn sort(tree: &[CommentNode], order: SortOrder) -> Vec<CommentNode> {
    let mut sorted = tree.to_vec();
    if order == SortOrder::Original {
        return sorted;
    }
    sort_siblings(&mut sorted, order);
    // Depth is data-controlled, so walk with an explicit stack rather than
    // recursing.
    let mut stack: Vec<&mut CommentNode> = sorted.iter_mut().collect();
    while let Some(node) = stack.pop() {
        sort_siblings(&mut node.children, order);
        stack.extend(node.children.iter_mut());
    }
    sorted
}

fn sort_siblings(nodes: &mut [CommentNode], order: SortOrder) {
    match order {
        SortOrder::NewestFirst => nodes.sort_by_key(|node| Reverse(node.item.created_at())),
        SortOrder::OldestFirst => nodes.sort_by_key(|node| node.item.created_at()),
        SortOrder::Original => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::comment;
    use crate::tree::flatten;

    fn node(id: u64, time: i64, children: Vec<CommentNode>) -> CommentNode {
        CommentNode {
            item: comment(id, 0, time, &[]),
            children,
        }
    }

    fn sibling_ids(nodes: &[CommentNode]) -> Vec<u64> {
        nodes.iter().map(|n| n.item.id).collect()
    }

    #[test]
    fn test_sort_newest_first() {
        let tree = vec![node(1, 100, vec![]), node(2, 300, vec![]), node(3, 200, vec![])];
        let sorted = sort(&tree, SortOrder::NewestFirst);
        assert_eq!(sibling_ids(&sorted), vec![2, 3, 1]);
    }

    #[test]
    fn test_sort_oldest_first() {
        let tree = vec![node(1, 100, vec![]), node(2, 300, vec![]), node(3, 200, vec![])];
        let sorted = sort(&tree, SortOrder::OldestFirst);
        assert_eq!(sibling_ids(&sorted), vec![1, 3, 2]);
    }

    #[test]
    fn test_sort_original_keeps_order() {
        let tree = vec![node(2, 300, vec![]), node(1, 100, vec![])];
        let sorted = sort(&tree, SortOrder::Original);
        assert_eq!(sibling_ids(&sorted), vec![2, 1]);
    }

    #[test]
    fn test_sort_applies_at_every_depth() {
        let tree = vec![node(
            1,
            100,
            vec![
                node(10, 50, vec![node(100, 20, vec![]), node(101, 80, vec![])]),
                node(11, 70, vec![]),
            ],
        )];
        let sorted = sort(&tree, SortOrder::NewestFirst);
        assert_eq!(sibling_ids(&sorted[0].children), vec![11, 10]);
        let deep = &sorted[0].children[1].children;
        assert_eq!(sibling_ids(deep), vec![101, 100]);

        // Flattened order reflects the per-level sort.
        let flat: Vec<u64> = flatten(&sorted).iter().map(|e| e.item.id).collect();
        assert_eq!(flat, vec![1, 11, 10, 101, 100]);
    }

    #[test]
    fn test_sort_ties_are_stable() {
        let tree = vec![node(7, 100, vec![]), node(8, 100, vec![]), node(9, 100, vec![])];
        assert_eq!(sibling_ids(&sort(&tree, SortOrder::NewestFirst)), vec![7, 8, 9]);
        assert_eq!(sibling_ids(&sort(&tree, SortOrder::OldestFirst)), vec![7, 8, 9]);
    }

    #[test]
    fn test_sort_does_not_mutate_input() {
        let tree = vec![node(1, 100, vec![]), node(2, 300, vec![])];
        let _ = sort(&tree, SortOrder::NewestFirst);
        assert_eq!(sibling_ids(&tree), vec![1, 2]);
    }
}
