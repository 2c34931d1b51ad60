//! The document tree produced by the editor.
//!
//! A [`Document`] is a single `root` [`Node`] plus a format version tag. Nodes
//! are a closed sum type with one [`Node::Unknown`] arm for kinds this crate
//! does not know about yet; those keep their `kind`, children and every other
//! attribute so a canonical document never loses editor data it did not
//! understand.
//!
//! ## Wire shape
//!
//! ```json
//! { "version": "1",
//!   "root": { "kind": "root", "children": [
//!     { "kind": "paragraph", "children": [
//!       { "kind": "text", "content": "Hi", "format": 1 } ] } ] } }
//! ```
//!
//! Deserialisation goes through a permissive intermediate ([`WireNode`]):
//! missing `children` become `[]`, the editor's `"inherit"` width/height
//! sentinel becomes `None`, and heading levels (`2` or `2.0`) are clamped into
//! `1..=6`. Attributes with the wrong JSON type are rejected.
//!
//! Every node keeps the wire attributes its kind does not model in
//! [`Attributes`]. Where a typed field normalised the raw value, the raw value
//! is kept too and is what gets written back, so re-serialising a parsed
//! document reproduces the editor's JSON.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::ops::BitOr;

use crate::error::PublishError;

/// Format version written into documents built by this crate.
pub const FORMAT_VERSION: &str = "1";

/// One piece of rich content: a root node plus a format version tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default = "default_version")]
    pub version: String,
    pub root: Node,
}

fn default_version() -> String {
    FORMAT_VERSION.to_string()
}

impl Document {
    /// Build a document whose root holds `children`.
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            version: default_version(),
            root: Node::Root {
                children,
                attributes: Attributes::new(),
            },
        }
    }

    /// Parse a document from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, PublishError> {
        serde_json::from_str(json).map_err(|e| PublishError::InvalidDocument {
            detail: e.to_string(),
        })
    }

    /// Serialise the document back to its (pretty-printed) wire form.
    pub fn to_json_pretty(&self) -> Result<String, PublishError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PublishError::Internal(format!("document serialisation: {e}")))
    }
}

// ── Text formatting ──────────────────────────────────────────────────────

/// Bitmask of independently combinable inline styles on a text node.
///
/// Unknown high bits are preserved but never rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextFormat(u32);

impl TextFormat {
    pub const BOLD: Self = Self(1);
    pub const ITALIC: Self = Self(1 << 1);
    pub const STRIKETHROUGH: Self = Self(1 << 2);
    pub const UNDERLINE: Self = Self(1 << 3);
    pub const CODE: Self = Self(1 << 4);
    pub const SUBSCRIPT: Self = Self(1 << 5);
    pub const SUPERSCRIPT: Self = Self(1 << 6);

    /// Style bits paired with their element, outermost first.
    ///
    /// Nesting follows this order no matter which bits are set, so the same
    /// node always renders to the same bytes.
    pub const RENDER_ORDER: [(TextFormat, &'static str); 7] = [
        (Self::BOLD, "strong"),
        (Self::ITALIC, "em"),
        (Self::STRIKETHROUGH, "s"),
        (Self::UNDERLINE, "u"),
        (Self::CODE, "code"),
        (Self::SUBSCRIPT, "sub"),
        (Self::SUPERSCRIPT, "sup"),
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` when every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for TextFormat {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ── Nodes ────────────────────────────────────────────────────────────────

/// Ordered vs. unordered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListType {
    Ordered,
    #[default]
    Unordered,
}

impl ListType {
    fn as_str(self) -> &'static str {
        match self {
            ListType::Ordered => "ordered",
            ListType::Unordered => "unordered",
        }
    }
}

/// Wire attributes a node carries beyond the ones its kind models.
///
/// Editors attach state this crate never interprets (`maxWidth` on an image,
/// `indent` on a paragraph). It is kept verbatim and written back out, so a
/// canonical document has the same shape as the tree it came from. A raw
/// value that the typed field normalised (`"width": "inherit"`,
/// `"list_type": "number"`) also stays here and wins on output.
pub type Attributes = Map<String, Value>;

/// A node of the document tree.
///
/// Every variant except [`Node::Text`] and [`Node::LineBreak`] owns an ordered
/// list of children; child order is render order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "WireNode")]
pub enum Node {
    Root {
        children: Vec<Node>,
        attributes: Attributes,
    },
    Paragraph {
        children: Vec<Node>,
        attributes: Attributes,
    },
    Heading {
        /// Always within `1..=6`.
        level: u8,
        children: Vec<Node>,
        attributes: Attributes,
    },
    Quote {
        children: Vec<Node>,
        attributes: Attributes,
    },
    List {
        list_type: ListType,
        children: Vec<Node>,
        attributes: Attributes,
    },
    ListItem {
        children: Vec<Node>,
        attributes: Attributes,
    },
    CodeBlock {
        children: Vec<Node>,
        attributes: Attributes,
    },
    Link {
        href: String,
        target: Option<String>,
        rel: Option<String>,
        children: Vec<Node>,
        attributes: Attributes,
    },
    Image {
        /// The asset reference.
        src: String,
        alt: String,
        width: Option<u32>,
        height: Option<u32>,
        children: Vec<Node>,
        attributes: Attributes,
    },
    VideoEmbed {
        provider_id: String,
        children: Vec<Node>,
        attributes: Attributes,
    },
    Table {
        children: Vec<Node>,
        attributes: Attributes,
    },
    TableRow {
        children: Vec<Node>,
        attributes: Attributes,
    },
    TableCell {
        is_header: bool,
        children: Vec<Node>,
        attributes: Attributes,
    },
    Text {
        content: String,
        format: TextFormat,
        attributes: Attributes,
    },
    LineBreak {
        attributes: Attributes,
    },
    /// A kind this crate does not model. Rendered as its children only.
    ///
    /// `children` is `None` when the wire node had no `children` key, so a
    /// leaf stays a leaf and `"children": []` stays an empty list.
    Unknown {
        kind: String,
        children: Option<Vec<Node>>,
        attributes: Attributes,
    },
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Self::formatted(content, TextFormat::empty())
    }

    pub fn formatted(content: impl Into<String>, format: TextFormat) -> Self {
        Node::Text {
            content: content.into(),
            format,
            attributes: Attributes::new(),
        }
    }

    pub fn line_break() -> Self {
        Node::LineBreak {
            attributes: Attributes::new(),
        }
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Node::Paragraph {
            children,
            attributes: Attributes::new(),
        }
    }

    pub fn heading(level: u8, children: Vec<Node>) -> Self {
        Node::Heading {
            level: level.clamp(1, 6),
            children,
            attributes: Attributes::new(),
        }
    }

    pub fn image(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Node::Image {
            src: src.into(),
            alt: alt.into(),
            width: None,
            height: None,
            children: Vec::new(),
            attributes: Attributes::new(),
        }
    }

    /// The wire discriminant of this node.
    pub fn kind(&self) -> &str {
        match self {
            Node::Root { .. } => "root",
            Node::Paragraph { .. } => "paragraph",
            Node::Heading { .. } => "heading",
            Node::Quote { .. } => "quote",
            Node::List { .. } => "list",
            Node::ListItem { .. } => "list-item",
            Node::CodeBlock { .. } => "code-block",
            Node::Link { .. } => "link",
            Node::Image { .. } => "image",
            Node::VideoEmbed { .. } => "video-embed",
            Node::Table { .. } => "table",
            Node::TableRow { .. } => "table-row",
            Node::TableCell { .. } => "table-cell",
            Node::Text { .. } => "text",
            Node::LineBreak { .. } => "line-break",
            Node::Unknown { kind, .. } => kind,
        }
    }

    /// Child nodes in render order; empty for leaves.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Root { children, .. }
            | Node::Paragraph { children, .. }
            | Node::Heading { children, .. }
            | Node::Quote { children, .. }
            | Node::List { children, .. }
            | Node::ListItem { children, .. }
            | Node::CodeBlock { children, .. }
            | Node::Link { children, .. }
            | Node::Image { children, .. }
            | Node::VideoEmbed { children, .. }
            | Node::Table { children, .. }
            | Node::TableRow { children, .. }
            | Node::TableCell { children, .. } => children,
            Node::Unknown { children, .. } => children.as_deref().unwrap_or(&[]),
            Node::Text { .. } | Node::LineBreak { .. } => &[],
        }
    }

    /// Wire attributes not modelled by this kind.
    pub fn attributes(&self) -> &Attributes {
        match self {
            Node::Root { attributes, .. }
            | Node::Paragraph { attributes, .. }
            | Node::Heading { attributes, .. }
            | Node::Quote { attributes, .. }
            | Node::List { attributes, .. }
            | Node::ListItem { attributes, .. }
            | Node::CodeBlock { attributes, .. }
            | Node::Link { attributes, .. }
            | Node::Image { attributes, .. }
            | Node::VideoEmbed { attributes, .. }
            | Node::Table { attributes, .. }
            | Node::TableRow { attributes, .. }
            | Node::TableCell { attributes, .. }
            | Node::Text { attributes, .. }
            | Node::LineBreak { attributes }
            | Node::Unknown { attributes, .. } => attributes,
        }
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        match self {
            Node::Root { attributes, .. }
            | Node::Paragraph { attributes, .. }
            | Node::Heading { attributes, .. }
            | Node::Quote { attributes, .. }
            | Node::List { attributes, .. }
            | Node::ListItem { attributes, .. }
            | Node::CodeBlock { attributes, .. }
            | Node::Link { attributes, .. }
            | Node::Image { attributes, .. }
            | Node::VideoEmbed { attributes, .. }
            | Node::Table { attributes, .. }
            | Node::TableRow { attributes, .. }
            | Node::TableCell { attributes, .. }
            | Node::Text { attributes, .. }
            | Node::LineBreak { attributes }
            | Node::Unknown { attributes, .. } => attributes,
        }
    }

    /// A new node with the same kind and attributes as `self` but the given
    /// children. Leaves ignore `children` and are returned as a copy.
    pub fn with_children(&self, children: Vec<Node>) -> Node {
        let attributes = self.attributes().clone();
        match self {
            Node::Root { .. } => Node::Root {
                children,
                attributes,
            },
            Node::Paragraph { .. } => Node::Paragraph {
                children,
                attributes,
            },
            Node::Heading { level, .. } => Node::Heading {
                level: *level,
                children,
                attributes,
            },
            Node::Quote { .. } => Node::Quote {
                children,
                attributes,
            },
            Node::List { list_type, .. } => Node::List {
                list_type: *list_type,
                children,
                attributes,
            },
            Node::ListItem { .. } => Node::ListItem {
                children,
                attributes,
            },
            Node::CodeBlock { .. } => Node::CodeBlock {
                children,
                attributes,
            },
            Node::Link {
                href, target, rel, ..
            } => Node::Link {
                href: href.clone(),
                target: target.clone(),
                rel: rel.clone(),
                children,
                attributes,
            },
            Node::Image {
                src,
                alt,
                width,
                height,
                ..
            } => Node::Image {
                src: src.clone(),
                alt: alt.clone(),
                width: *width,
                height: *height,
                children,
                attributes,
            },
            Node::VideoEmbed { provider_id, .. } => Node::VideoEmbed {
                provider_id: provider_id.clone(),
                children,
                attributes,
            },
            Node::Table { .. } => Node::Table {
                children,
                attributes,
            },
            Node::TableRow { .. } => Node::TableRow {
                children,
                attributes,
            },
            Node::TableCell { is_header, .. } => Node::TableCell {
                is_header: *is_header,
                children,
                attributes,
            },
            Node::Text { .. } | Node::LineBreak { .. } => self.clone(),
            Node::Unknown {
                kind,
                children: previous,
                ..
            } => Node::Unknown {
                kind: kind.clone(),
                children: if previous.is_none() && children.is_empty() {
                    None
                } else {
                    Some(children)
                },
                attributes,
            },
        }
    }

    /// Typed fields of this kind in their wire form, in output order.
    fn modelled_fields(&self) -> Vec<(&'static str, Value)> {
        match self {
            Node::Heading { level, .. } => vec![("level", Value::from(*level))],
            Node::List { list_type, .. } => vec![("list_type", Value::from(list_type.as_str()))],
            Node::Link {
                href, target, rel, ..
            } => {
                let mut fields = vec![("href", Value::from(href.as_str()))];
                if let Some(t) = target {
                    fields.push(("target", Value::from(t.as_str())));
                }
                if let Some(r) = rel {
                    fields.push(("rel", Value::from(r.as_str())));
                }
                fields
            }
            Node::Image {
                src,
                alt,
                width,
                height,
                ..
            } => {
                let mut fields = vec![
                    ("src", Value::from(src.as_str())),
                    ("alt", Value::from(alt.as_str())),
                ];
                if let Some(w) = width {
                    fields.push(("width", Value::from(*w)));
                }
                if let Some(h) = height {
                    fields.push(("height", Value::from(*h)));
                }
                fields
            }
            Node::VideoEmbed { provider_id, .. } => {
                vec![("provider_id", Value::from(provider_id.as_str()))]
            }
            Node::TableCell { is_header, .. } => vec![("is_header", Value::from(*is_header))],
            Node::Text {
                content, format, ..
            } => vec![
                ("content", Value::from(content.as_str())),
                ("format", Value::from(format.bits())),
            ],
            _ => Vec::new(),
        }
    }
}

// ── Serialisation ────────────────────────────────────────────────────────

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let attributes = self.attributes();
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("kind", self.kind())?;
        for (key, value) in self.modelled_fields() {
            if !attributes.contains_key(key) {
                map.serialize_entry(key, &value)?;
            }
        }
        for (key, value) in attributes {
            if key != "kind" && key != "children" {
                map.serialize_entry(key, value)?;
            }
        }
        match self {
            Node::Text { .. } | Node::LineBreak { .. } => {}
            Node::Unknown { children: None, .. } => {}
            _ => map.serialize_entry("children", self.children())?,
        }
        map.end()
    }
}

/// Permissive intermediate form every node deserialises through.
#[derive(Deserialize)]
struct WireNode {
    kind: String,
    #[serde(default)]
    children: Option<Vec<Node>>,
    #[serde(flatten)]
    attributes: Attributes,
}

impl TryFrom<WireNode> for Node {
    type Error = String;

    fn try_from(wire: WireNode) -> Result<Self, Self::Error> {
        let WireNode {
            kind,
            children: wire_children,
            attributes: mut attrs,
        } = wire;
        let none = Attributes::new;
        let children = wire_children.clone().unwrap_or_default();

        let mut node = match kind.as_str() {
            "root" => Node::Root {
                children,
                attributes: none(),
            },
            "paragraph" => Node::Paragraph {
                children,
                attributes: none(),
            },
            "heading" => Node::Heading {
                level: heading_level(&attrs)?,
                children,
                attributes: none(),
            },
            "quote" => Node::Quote {
                children,
                attributes: none(),
            },
            "list" => Node::List {
                list_type: match string_attr(&attrs, "list_type")?.as_deref() {
                    Some("ordered") | Some("number") => ListType::Ordered,
                    _ => ListType::Unordered,
                },
                children,
                attributes: none(),
            },
            "list-item" => Node::ListItem {
                children,
                attributes: none(),
            },
            "code-block" => Node::CodeBlock {
                children,
                attributes: none(),
            },
            "link" => Node::Link {
                href: string_attr(&attrs, "href")?.unwrap_or_default(),
                target: string_attr(&attrs, "target")?.filter(|s| !s.is_empty()),
                rel: string_attr(&attrs, "rel")?.filter(|s| !s.is_empty()),
                children,
                attributes: none(),
            },
            "image" => Node::Image {
                src: string_attr(&attrs, "src")?.unwrap_or_default(),
                alt: string_attr(&attrs, "alt")?.unwrap_or_default(),
                width: dimension_attr(&attrs, "width")?,
                height: dimension_attr(&attrs, "height")?,
                children,
                attributes: none(),
            },
            "video-embed" => Node::VideoEmbed {
                provider_id: string_attr(&attrs, "provider_id")?.unwrap_or_default(),
                children,
                attributes: none(),
            },
            "table" => Node::Table {
                children,
                attributes: none(),
            },
            "table-row" => Node::TableRow {
                children,
                attributes: none(),
            },
            "table-cell" => Node::TableCell {
                is_header: match attrs.get("is_header") {
                    None | Some(Value::Null) => false,
                    Some(Value::Bool(b)) => *b,
                    Some(other) => return Err(type_error("is_header", "a boolean", other)),
                },
                children,
                attributes: none(),
            },
            "text" => Node::Text {
                content: string_attr(&attrs, "content")?.unwrap_or_default(),
                format: match attrs.get("format") {
                    None | Some(Value::Null) => TextFormat::empty(),
                    Some(Value::Number(n)) => n
                        .as_u64()
                        .and_then(|v| u32::try_from(v).ok())
                        .map(TextFormat::from_bits)
                        .ok_or_else(|| type_error("format", "a 32-bit bitmask", &attrs["format"]))?,
                    Some(other) => return Err(type_error("format", "an integer", other)),
                },
                attributes: none(),
            },
            "line-break" => Node::LineBreak {
                attributes: none(),
            },
            _ => {
                return Ok(Node::Unknown {
                    kind,
                    children: wire_children,
                    attributes: attrs,
                })
            }
        };

        // A typed field that re-serialises to exactly the raw value owns its
        // key; anything normalised on the way in keeps its raw form.
        for (key, value) in node.modelled_fields() {
            if attrs.get(key) == Some(&value) {
                attrs.remove(key);
            }
        }
        *node.attributes_mut() = attrs;
        Ok(node)
    }
}

fn type_error(field: &str, expected: &str, got: &Value) -> String {
    format!("attribute '{field}' must be {expected}, got {got}")
}

fn string_attr(attrs: &Attributes, field: &str) -> Result<Option<String>, String> {
    match attrs.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(type_error(field, "a string", other)),
    }
}

/// Integral level (`2` or `2.0`), clamped into `1..=6`; absent means 1.
fn heading_level(attrs: &Attributes) -> Result<u8, String> {
    match attrs.get("level") {
        None | Some(Value::Null) => Ok(1),
        Some(Value::Number(n)) => {
            let level = n
                .as_i64()
                .or_else(|| {
                    n.as_f64()
                        .filter(|v| v.is_finite() && v.fract() == 0.0)
                        .map(|v| v.clamp(i64::MIN as f64, i64::MAX as f64) as i64)
                })
                .ok_or_else(|| type_error("level", "an integer", &attrs["level"]))?;
            Ok(level.clamp(1, 6) as u8)
        }
        Some(other) => Err(type_error("level", "an integer", other)),
    }
}

/// Positive pixel size, or `None` for absent / zero / `"inherit"`.
fn dimension_attr(attrs: &Attributes, field: &str) -> Result<Option<u32>, String> {
    match attrs.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s == "inherit" => Ok(None),
        Some(Value::Number(n)) => {
            let px = n
                .as_f64()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .ok_or_else(|| type_error(field, "a non-negative number", &attrs[field]))?;
            let px = px.round().min(u32::MAX as f64) as u32;
            Ok((px > 0).then_some(px))
        }
        Some(other) => Err(type_error(field, "a number or \"inherit\"", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_document() {
        let doc = Document::from_json(
            r#"{"root":{"kind":"root","children":[
                {"kind":"paragraph","children":[{"kind":"text","content":"Hi","format":1}]}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(doc.version, FORMAT_VERSION);
        assert_eq!(
            doc,
            Document::new(vec![Node::paragraph(vec![Node::formatted(
                "Hi",
                TextFormat::BOLD
            )])])
        );
    }

    #[test]
    fn image_dimensions_accept_inherit() {
        let node: Node = serde_json::from_str(
            r#"{"kind":"image","src":"a.png","alt":"x","width":"inherit","height":240}"#,
        )
        .unwrap();
        match node {
            Node::Image { width, height, .. } => {
                assert_eq!(width, None);
                assert_eq!(height, Some(240));
            }
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[test]
    fn heading_level_is_clamped() {
        let node: Node = serde_json::from_str(r#"{"kind":"heading","level":9}"#).unwrap();
        assert!(matches!(node, Node::Heading { level: 6, .. }));
        assert!(node.children().is_empty());
    }

    #[test]
    fn wrong_attribute_type_is_rejected() {
        let err = Document::from_json(r#"{"root":{"kind":"image","src":42}}"#).unwrap_err();
        assert!(err.to_string().contains("'src'"), "got: {err}");
    }

    #[test]
    fn unknown_kind_round_trips_attributes() {
        let json = r#"{"kind":"callout","tone":"warning","children":[{"kind":"text","content":"a","format":0}]}"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.kind(), "callout");
        assert_eq!(node.children().len(), 1);

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["tone"], "warning");
        assert_eq!(value["children"][0]["content"], "a");
    }

    #[test]
    fn heading_level_accepts_integral_floats() {
        let node: Node = serde_json::from_str(r#"{"kind":"heading","level":2.0}"#).unwrap();
        assert!(matches!(node, Node::Heading { level: 2, .. }));
        assert_eq!(serde_json::to_value(&node).unwrap()["level"], serde_json::json!(2.0));

        let err = serde_json::from_str::<Node>(r#"{"kind":"heading","level":2.5}"#).unwrap_err();
        assert!(err.to_string().contains("'level'"), "got: {err}");
    }

    #[test]
    fn known_kinds_keep_unmodelled_attributes() {
        let json = serde_json::json!({
            "kind": "image",
            "src": "a.png",
            "alt": "",
            "width": "inherit",
            "maxWidth": 400,
            "children": []
        });
        let node: Node = serde_json::from_value(json.clone()).unwrap();
        assert!(matches!(node, Node::Image { width: None, .. }));
        assert_eq!(node.attributes().get("maxWidth"), Some(&serde_json::json!(400)));
        assert!(!node.attributes().contains_key("src"));
        assert_eq!(serde_json::to_value(&node).unwrap(), json);
    }

    #[test]
    fn unknown_leaf_and_empty_children_stay_distinct() {
        let leaf: Node = serde_json::from_str(r#"{"kind":"divider"}"#).unwrap();
        let empty: Node = serde_json::from_str(r#"{"kind":"callout","children":[]}"#).unwrap();

        assert!(serde_json::to_value(&leaf).unwrap().get("children").is_none());
        assert_eq!(
            serde_json::to_value(&empty).unwrap()["children"],
            serde_json::json!([])
        );
        assert_eq!(
            serde_json::to_value(leaf.with_children(vec![])).unwrap(),
            serde_json::json!({"kind": "divider"})
        );
    }

    #[test]
    fn serialised_document_parses_back_equal() {
        let doc = Document::new(vec![
            Node::heading(2, vec![Node::text("Title")]),
            Node::List {
                list_type: ListType::Ordered,
                children: vec![Node::ListItem {
                    children: vec![Node::text("one"), Node::line_break()],
                    attributes: Attributes::new(),
                }],
                attributes: Attributes::new(),
            },
            Node::Link {
                href: "https://example.com".into(),
                target: Some("_blank".into()),
                rel: None,
                children: vec![Node::text("site")],
                attributes: Attributes::new(),
            },
            Node::Image {
                src: "data:image/png;base64,AAAA".into(),
                alt: "pixel".into(),
                width: Some(10),
                height: None,
                children: vec![],
                attributes: Attributes::new(),
            },
            Node::TableCell {
                is_header: true,
                children: vec![],
                attributes: Attributes::new(),
            },
        ]);
        let json = doc.to_json_pretty().unwrap();
        assert_eq!(Document::from_json(&json).unwrap(), doc);
    }

    #[test]
    fn with_children_keeps_attributes() {
        let mut extra = Attributes::new();
        extra.insert("data-id".into(), Value::from("l1"));
        let link = Node::Link {
            href: "/a".into(),
            target: None,
            rel: Some("nofollow".into()),
            children: vec![Node::text("old")],
            attributes: extra.clone(),
        };
        let replaced = link.with_children(vec![Node::text("new")]);
        assert_eq!(replaced.attributes(), &extra);
        match replaced {
            Node::Link { rel, children, .. } => {
                assert_eq!(rel.as_deref(), Some("nofollow"));
                assert_eq!(children, vec![Node::text("new")]);
            }
            other => panic!("expected link, got {other:?}"),
        }
    }

    #[test]
    fn format_bits_combine() {
        let f = TextFormat::BOLD | TextFormat::UNDERLINE;
        assert!(f.contains(TextFormat::BOLD));
        assert!(f.contains(TextFormat::UNDERLINE));
        assert!(!f.contains(TextFormat::ITALIC));
        assert_eq!(f.bits(), 0b1001);
    }
}
