//! Outline (bookmark) tree
//!
//! The outline is a navigable table of contents over the document's
//! pages. It is built at import/creation time, edited by UI actions, and
//! consumed wholesale by the PDF outline encoder at export time.

use serde::{Deserialize, Serialize};

/// Sentinel page number for a bookmark without a resolvable destination
pub const NO_PAGE: i32 = -1;

/// Fractional location on the destination page, measured from the
/// top-left corner (canvas convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlinePosition {
    pub x_frac: f64,
    pub y_frac: f64,
}

/// One entry of the outline tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub title: String,
    /// 1-based index into the document's page sequence, or [`NO_PAGE`]
    pub page_nr: i32,
    /// Whether the entry shows its children by default
    pub expanded: bool,
    /// Optional in-page target; absent means "fit whole page"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<OutlinePosition>,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    pub fn new(title: impl Into<String>, page_nr: i32) -> Self {
        Self {
            title: title.into(),
            page_nr,
            expanded: false,
            position: None,
            children: Vec::new(),
        }
    }

    /// Build a node with children; `expanded` starts true iff there are any.
    pub fn with_children(title: impl Into<String>, page_nr: i32, children: Vec<OutlineNode>) -> Self {
        Self {
            title: title.into(),
            page_nr,
            expanded: !children.is_empty(),
            position: None,
            children,
        }
    }

    pub fn with_position(mut self, x_frac: f64, y_frac: f64) -> Self {
        self.position = Some(OutlinePosition { x_frac, y_frac });
        self
    }

    pub fn collapsed(mut self) -> Self {
        self.expanded = false;
        self
    }

    pub fn push_child(&mut self, child: OutlineNode) {
        self.children.push(child);
        self.expanded = true;
    }

    /// Number of nodes in this subtree, the node itself included
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }
}

/// Total node count over a forest of outline nodes
pub fn outline_node_count(nodes: &[OutlineNode]) -> usize {
    nodes.iter().map(|n| n.node_count()).sum()
}

/// Titles in pre-order over a forest, the order bookmarks appear in a
/// reader's sidebar.
pub fn outline_titles(nodes: &[OutlineNode]) -> Vec<String> {
    fn walk(nodes: &[OutlineNode], out: &mut Vec<String>) {
        for node in nodes {
            out.push(node.title.clone());
            walk(&node.children, out);
        }
    }
    let mut out = Vec::new();
    walk(nodes, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expanded_tracks_children() {
        let leaf = OutlineNode::new("Intro", 1);
        assert!(!leaf.expanded);

        let parent = OutlineNode::with_children("Part I", 1, vec![OutlineNode::new("Intro", 1)]);
        assert!(parent.expanded);

        let mut node = OutlineNode::new("Part II", 4);
        node.push_child(OutlineNode::new("Details", 5));
        assert!(node.expanded);
    }

    #[test]
    fn test_node_count() {
        let tree = vec![
            OutlineNode::with_children(
                "A",
                1,
                vec![OutlineNode::new("A1", 2), OutlineNode::new("A2", 3)],
            ),
            OutlineNode::new("B", 4),
        ];
        assert_eq!(outline_node_count(&tree), 4);
    }

    #[test]
    fn test_pre_order_titles() {
        let tree = vec![
            OutlineNode::with_children(
                "A",
                1,
                vec![
                    OutlineNode::with_children("A1", 2, vec![OutlineNode::new("A1a", 2)]),
                    OutlineNode::new("A2", 3),
                ],
            ),
            OutlineNode::new("B", 4),
        ];
        assert_eq!(outline_titles(&tree), vec!["A", "A1", "A1a", "A2", "B"]);
    }
}
