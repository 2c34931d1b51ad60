//! Tree rewriting: substitute resolved asset references.
//!
//! Builds a brand-new tree bottom-up. Only `image.src` values found as keys
//! in the mapping change; everything else is copied by value. References
//! missing from the mapping (failed or left-alone assets) are kept verbatim.
//! The input document is only ever borrowed.

use std::collections::HashMap;

use crate::document::{Document, Node};

/// Raw reference → canonical URL, for successfully resolved assets only.
pub type ReferenceMap = HashMap<String, String>;

/// Return a copy of `document` with image sources replaced per `mapping`.
pub fn rewrite(document: &Document, mapping: &ReferenceMap) -> Document {
    Document {
        version: document.version.clone(),
        root: rewrite_node(&document.root, mapping),
    }
}

fn rewrite_node(node: &Node, mapping: &ReferenceMap) -> Node {
    let children: Vec<Node> = node
        .children()
        .iter()
        .map(|child| rewrite_node(child, mapping))
        .collect();

    match node {
        Node::Image {
            src,
            alt,
            width,
            height,
            attributes,
            ..
        } => match mapping.get(src) {
            Some(url) => {
                // A raw `src` kept alongside the typed one would shadow the new URL.
                let mut attributes = attributes.clone();
                attributes.remove("src");
                Node::Image {
                    src: url.clone(),
                    alt: alt.clone(),
                    width: *width,
                    height: *height,
                    children,
                    attributes,
                }
            }
            None => node.with_children(children),
        },
        other => other.with_children(children),
    }
}
