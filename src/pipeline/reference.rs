//! Asset references: classification and inline-payload decoding.
//!
//! An asset reference is the `src` of an image node. Its kind is decided
//! structurally from the string alone:
//!
//! | Kind | Rule |
//! |------|------|
//! | [`AssetKind::Canonical`] | starts with the store's public base URL, or is anything not matched below (relative path, `blob:`, empty) |
//! | [`AssetKind::InlineEmbedded`] | starts with `data:` |
//! | [`AssetKind::External`] | absolute `http://` / `https://` URL |
//!
//! The classification is total: every string lands in exactly one kind.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AssetError;

/// Structural kind of an asset reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetKind {
    /// A `data:` URI carrying its bytes inline.
    InlineEmbedded,
    /// Hosted by a third party; rehosted by the pipeline.
    External,
    /// Already durable (or not something the pipeline touches).
    Canonical,
}

/// Classify `reference` against the durable store's public base URL.
pub fn classify(reference: &str, store_base: &str) -> AssetKind {
    if is_under_base(reference, store_base) {
        return AssetKind::Canonical;
    }
    if has_prefix_ignore_case(reference, "data:") {
        AssetKind::InlineEmbedded
    } else if has_prefix_ignore_case(reference, "http://")
        || has_prefix_ignore_case(reference, "https://")
    {
        AssetKind::External
    } else {
        AssetKind::Canonical
    }
}

/// `true` when `url` lives directly under `base` (`<base>/<name>`).
pub fn is_under_base(url: &str, base: &str) -> bool {
    let base = base.trim_end_matches('/');
    !base.is_empty()
        && url
            .strip_prefix(base)
            .is_some_and(|rest| rest.len() > 1 && rest.starts_with('/'))
}

fn has_prefix_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// A short, log-safe form of a reference. Data URIs can be megabytes long.
pub fn preview(reference: &str) -> String {
    const MAX: usize = 64;
    match reference.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}…", &reference[..cut]),
        None => reference.to_string(),
    }
}

// ── Inline (data URI) payloads ───────────────────────────────────────────────

/// Decoded bytes of an inline-embedded reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineAsset {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

// data:[<mime>][;param=value]*;base64,<payload>
static RE_DATA_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^data:(?P<mime>[^;,]*)(?P<params>(?:;[^;,]*)*?)(?P<b64>;base64)?,(?P<data>.*)$")
        .unwrap()
});

/// Decode a `data:` reference into its MIME type and raw bytes.
///
/// Rejects (as [`AssetError::MalformedReference`]):
/// - a missing or non-`image/*` MIME type
/// - a payload that is not base64-encoded
/// - invalid base64 (ASCII whitespace inside the payload is tolerated)
pub fn decode_data_uri(reference: &str) -> Result<InlineAsset, AssetError> {
    let malformed = |detail: &str| AssetError::MalformedReference {
        reference: preview(reference),
        detail: detail.to_string(),
    };

    let caps = RE_DATA_URI
        .captures(reference)
        .ok_or_else(|| malformed("not a data URI"))?;

    let mime = caps["mime"].trim().to_ascii_lowercase();
    if mime.is_empty() {
        return Err(malformed("missing MIME type"));
    }
    if !mime.starts_with("image/") || mime.len() == "image/".len() {
        return Err(malformed(&format!("unsupported MIME type '{mime}'")));
    }
    if caps.name("b64").is_none() {
        return Err(malformed("payload is not base64-encoded"));
    }

    let payload: String = caps["data"]
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| malformed(&format!("invalid base64: {e}")))?;

    Ok(InlineAsset {
        mime_type: mime,
        bytes,
    })
}

// ── Content types ────────────────────────────────────────────────────────────

/// File extension for a MIME type, used to name stored objects.
pub fn extension_for(content_type: &str) -> String {
    let essence = essence(content_type);
    let known = match essence.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/avif" => Some("avif"),
        "image/svg+xml" => Some("svg"),
        "image/bmp" => Some("bmp"),
        "image/tiff" => Some("tiff"),
        "image/x-icon" | "image/vnd.microsoft.icon" => Some("ico"),
        _ => None,
    };
    if let Some(ext) = known {
        return ext.to_string();
    }

    let subtype: String = essence
        .split_once('/')
        .map(|(_, sub)| sub)
        .unwrap_or_default()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    if subtype.is_empty() {
        "jpg".to_string()
    } else {
        subtype
    }
}

/// `Content-Type` header value → bare lowercase `type/subtype`, if usable.
pub fn normalise_content_type(header: &str) -> Option<String> {
    let essence = essence(header);
    match essence.split_once('/') {
        Some((t, s)) if !t.is_empty() && !s.is_empty() => Some(essence),
        _ => None,
    }
}

fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Pick the content type for downloaded bytes.
///
/// The declared header wins unless it is missing or a generic binary type,
/// in which case the bytes are sniffed. `fallback` is the last resort.
pub fn infer_content_type(declared: Option<&str>, bytes: &[u8], fallback: &str) -> String {
    let declared = declared.and_then(normalise_content_type);
    match declared.as_deref() {
        Some("application/octet-stream") | Some("binary/octet-stream") | None => {
            image::guess_format(bytes)
                .map(|format| format.to_mime_type().to_string())
                .unwrap_or_else(|_| fallback.to_string())
        }
        Some(ct) => ct.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://store.example.com/object/public/post-images";

    #[test]
    fn classification_is_total() {
        assert_eq!(classify("data:image/png;base64,AAAA", BASE), AssetKind::InlineEmbedded);
        assert_eq!(classify("DATA:image/png;base64,AAAA", BASE), AssetKind::InlineEmbedded);
        assert_eq!(classify("https://other.com/cat.jpg", BASE), AssetKind::External);
        assert_eq!(classify("http://other.com/cat.jpg", BASE), AssetKind::External);
        assert_eq!(classify(&format!("{BASE}/abc.png"), BASE), AssetKind::Canonical);
        assert_eq!(classify("/uploads/cat.jpg", BASE), AssetKind::Canonical);
        assert_eq!(classify("blob:http://localhost/1234", BASE), AssetKind::Canonical);
        assert_eq!(classify("", BASE), AssetKind::Canonical);
    }

    #[test]
    fn base_prefix_must_end_at_a_path_boundary() {
        assert!(is_under_base(&format!("{BASE}/a.png"), BASE));
        assert!(is_under_base(&format!("{BASE}/a.png"), &format!("{BASE}/")));
        assert!(!is_under_base(&format!("{BASE}-evil/a.png"), BASE));
        assert!(!is_under_base(&format!("{BASE}/"), BASE));
        assert!(!is_under_base("https://x/a.png", ""));
    }

    #[test]
    fn decodes_png_data_uri() {
        let asset = decode_data_uri("data:image/png;base64,AAAA").unwrap();
        assert_eq!(asset.mime_type, "image/png");
        assert_eq!(asset.bytes, vec![0, 0, 0]);
    }

    #[test]
    fn tolerates_params_and_whitespace() {
        let asset = decode_data_uri("data:Image/JPEG;name=a.jpg;base64,AA\nAA").unwrap();
        assert_eq!(asset.mime_type, "image/jpeg");
        assert_eq!(asset.bytes.len(), 3);
    }

    #[test]
    fn rejects_missing_mime() {
        let err = decode_data_uri("data:;base64,AAAA").unwrap_err();
        assert!(matches!(err, AssetError::MalformedReference { .. }));
        assert!(err.to_string().contains("missing MIME type"));
    }

    #[test]
    fn rejects_non_image_and_non_base64() {
        assert!(decode_data_uri("data:text/html;base64,PGI+").is_err());
        assert!(decode_data_uri("data:image/svg+xml,<svg/>").is_err());
        assert!(decode_data_uri("data:image/png;base64").is_err());
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = decode_data_uri("data:image/png;base64,@@@@").unwrap_err();
        assert!(err.to_string().contains("invalid base64"), "got: {err}");
    }

    #[test]
    fn preview_truncates_long_references() {
        let long = format!("data:image/png;base64,{}", "A".repeat(500));
        let p = preview(&long);
        assert!(p.chars().count() <= 65);
        assert!(p.ends_with('…'));
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn extensions_from_mime() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/png; charset=binary"), "png");
        assert_eq!(extension_for("image/svg+xml"), "svg");
        assert_eq!(extension_for("image/heic"), "heic");
        assert_eq!(extension_for("garbage"), "jpg");
    }

    #[test]
    fn content_type_inference() {
        let png_magic = b"\x89PNG\r\n\x1a\n\0\0\0\0";
        assert_eq!(
            infer_content_type(Some("image/webp; q=1"), png_magic, "image/jpeg"),
            "image/webp"
        );
        assert_eq!(
            infer_content_type(Some("application/octet-stream"), png_magic, "image/jpeg"),
            "image/png"
        );
        assert_eq!(infer_content_type(None, b"????", "image/jpeg"), "image/jpeg");
    }
}
