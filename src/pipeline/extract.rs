//! Asset extraction: collect image references from a document tree.
//!
//! A purely structural walk. References come out in depth-first,
//! left-to-right order (render order) with duplicates preserved; the
//! orchestrator dedups with [`distinct`]. Classification happens later, in
//! [`crate::pipeline::reference`].

use std::collections::HashSet;

use crate::document::{Document, Node};

/// Every non-empty `image.src` in render order, duplicates included.
pub fn extract_references(document: &Document) -> Vec<String> {
    let mut refs = Vec::new();
    collect(&document.root, &mut refs);
    refs
}

fn collect(node: &Node, refs: &mut Vec<String>) {
    if let Node::Image { src, .. } = node {
        if !src.is_empty() {
            refs.push(src.clone());
        }
    }
    for child in node.children() {
        collect(child, refs);
    }
}

/// Order-stable dedup: keeps the first occurrence of each reference.
pub fn distinct(references: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(references.len());
    references
        .iter()
        .filter(|r| seen.insert(r.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_first_left_to_right() {
        let doc = Document::new(vec![
            Node::paragraph(vec![Node::image("a", ""), Node::text("x")]),
            Node::Table {
                children: vec![Node::TableRow {
                    children: vec![Node::TableCell {
                        is_header: false,
                        children: vec![Node::image("b", "")],
                        attributes: Default::default(),
                    }],
                    attributes: Default::default(),
                }],
                attributes: Default::default(),
            },
            Node::image("c", ""),
            Node::Unknown {
                kind: "gallery".into(),
                children: Some(vec![Node::image("d", ""), Node::image("a", "")]),
                attributes: Default::default(),
            },
        ]);
        assert_eq!(extract_references(&doc), vec!["a", "b", "c", "d", "a"]);
    }

    #[test]
    fn empty_src_is_not_a_reference() {
        let doc = Document::new(vec![Node::image("", "missing")]);
        assert!(extract_references(&doc).is_empty());
    }

    #[test]
    fn distinct_keeps_first_occurrence_order() {
        let refs: Vec<String> = ["b", "a", "b", "c", "a"].iter().map(|s| s.to_string()).collect();
        assert_eq!(distinct(&refs), vec!["b", "a", "c"]);
    }
}
