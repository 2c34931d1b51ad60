//! HTML serializer: document tree → markup fragment.
//!
//! Depth-first recursive descent; every node kind maps to one element rule.
//! The renderer never rejects a tree: structurally odd input (a `table-row`
//! outside a `table`, text under `root`) is emitted tag-by-tag as given, and
//! [`Node::Unknown`] kinds contribute only their children's markup.
//!
//! Output is a fragment (no doctype, no `<body>`). The root node itself emits
//! no element.

use crate::document::{Document, ListType, Node, TextFormat};

const VIDEO_EMBED_BASE: &str = "https://www.youtube.com/embed/";
const VIDEO_EMBED_ALLOW: &str =
    "accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture";

/// Render a document to an HTML fragment.
pub fn render(document: &Document) -> String {
    let mut out = String::with_capacity(256);
    render_node(&document.root, &mut out);
    out
}

/// Render a single subtree, appending to `out`.
pub fn render_node(node: &Node, out: &mut String) {
    match node {
        Node::Text {
            content, format, ..
        } => render_text(content, *format, out),
        Node::LineBreak { .. } => out.push_str("<br>"),
        Node::Root { children, .. } => render_children(children, out),
        Node::Unknown { .. } => render_children(node.children(), out),
        Node::Paragraph { children, .. } => wrap("p", children, out),
        Node::Heading {
            level, children, ..
        } => {
            let tag = match level {
                1 => "h1",
                2 => "h2",
                3 => "h3",
                4 => "h4",
                5 => "h5",
                _ => "h6",
            };
            wrap(tag, children, out);
        }
        Node::Quote { children, .. } => wrap("blockquote", children, out),
        Node::List {
            list_type,
            children,
            ..
        } => {
            let tag = match list_type {
                ListType::Ordered => "ol",
                ListType::Unordered => "ul",
            };
            wrap(tag, children, out);
        }
        Node::ListItem { children, .. } => wrap("li", children, out),
        Node::CodeBlock { children, .. } => {
            out.push_str("<pre><code>");
            for child in children {
                match child {
                    // Inline styles are meaningless inside a code block.
                    Node::Text { content, .. } => escape_into(content, out),
                    other => render_node(other, out),
                }
            }
            out.push_str("</code></pre>");
        }
        Node::Link {
            href,
            target,
            rel,
            children,
            ..
        } => {
            out.push_str("<a href=\"");
            escape_into(href, out);
            out.push('"');
            if let Some(target) = target {
                push_attr("target", target, out);
            }
            if let Some(rel) = rel {
                push_attr("rel", rel, out);
            }
            out.push('>');
            render_children(children, out);
            out.push_str("</a>");
        }
        Node::Image {
            src,
            alt,
            width,
            height,
            ..
        } => {
            out.push_str("<img src=\"");
            escape_into(src, out);
            out.push_str("\" alt=\"");
            escape_into(alt, out);
            out.push('"');
            if let Some(w) = width {
                out.push_str(&format!(" width=\"{w}\""));
            }
            if let Some(h) = height {
                out.push_str(&format!(" height=\"{h}\""));
            }
            out.push_str(" />");
        }
        Node::VideoEmbed { provider_id, .. } => {
            out.push_str("<div class=\"video-embed\"><iframe width=\"560\" height=\"315\" src=\"");
            out.push_str(VIDEO_EMBED_BASE);
            escape_into(provider_id, out);
            out.push_str("\" frameborder=\"0\" allow=\"");
            out.push_str(VIDEO_EMBED_ALLOW);
            out.push_str("\" allowfullscreen></iframe></div>");
        }
        Node::Table { children, .. } => wrap("table", children, out),
        Node::TableRow { children, .. } => wrap("tr", children, out),
        Node::TableCell {
            is_header,
            children,
            ..
        } => wrap(if *is_header { "th" } else { "td" }, children, out),
    }
}

fn render_children(children: &[Node], out: &mut String) {
    for child in children {
        render_node(child, out);
    }
}

fn wrap(tag: &str, children: &[Node], out: &mut String) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    render_children(children, out);
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn push_attr(name: &str, value: &str, out: &mut String) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    escape_into(value, out);
    out.push('"');
}

/// Escape first, then wrap in style tags in [`TextFormat::RENDER_ORDER`].
fn render_text(content: &str, format: TextFormat, out: &mut String) {
    let active = TextFormat::RENDER_ORDER
        .iter()
        .filter(|(flag, _)| format.contains(*flag));

    for (_, tag) in active.clone() {
        out.push('<');
        out.push_str(tag);
        out.push('>');
    }
    escape_into(content, out);
    for (_, tag) in active.rev() {
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }
}

/// Escape the five HTML-significant characters.
fn escape_into(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
}
