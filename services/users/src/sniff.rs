//! Content sniffing
//!
//! Decides what a file is from its leading bytes. The client-declared
//! content type of an upload is never consulted.

use async_trait::async_trait;
use std::io;
use tokio::{fs::File, io::AsyncReadExt};

/// Bytes inspected from the start of a file
pub const SNIFF_LEN: usize = 512;

/// Detects a MIME type from file contents
#[async_trait]
pub trait ContentSniffer: Send + Sync {
    async fn sniff(&self, file: &mut File) -> io::Result<String>;
}

/// Magic-number sniffer covering the image formats avatars may use plus a
/// few common non-image formats so rejections are logged with a real type.
#[derive(Debug, Clone, Default)]
pub struct MagicSniffer;

#[async_trait]
impl ContentSniffer for MagicSniffer {
    async fn sniff(&self, file: &mut File) -> io::Result<String> {
        let mut head = Vec::with_capacity(SNIFF_LEN);
        file.take(SNIFF_LEN as u64).read_to_end(&mut head).await?;
        Ok(detect_mime_type(&head).to_string())
    }
}

/// Strip parameters and lowercase: `image/PNG; q=1` becomes `image/png`
pub fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase()
}

/// Detect a MIME type from the first bytes of a file
pub fn detect_mime_type(data: &[u8]) -> &'static str {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }

    if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return "image/png";
    }

    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return "image/gif";
    }

    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return "image/webp";
    }

    // ISO base media file: size(4) "ftyp" brand(4)
    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        match &data[8..12] {
            b"heic" | b"heix" | b"hevc" | b"hevx" => return "image/heic",
            b"mif1" | b"msf1" | b"heim" | b"heis" => return "image/heif",
            b"avif" | b"avis" => return "image/avif",
            b"qt  " => return "video/quicktime",
            _ => return "video/mp4",
        }
    }

    if data.starts_with(b"BM") && data.len() >= 14 {
        return "image/bmp";
    }

    if data.starts_with(b"%PDF-") {
        return "application/pdf";
    }

    if data.starts_with(b"PK\x03\x04") {
        return "application/zip";
    }

    if let Some(markup) = sniff_markup(data) {
        return markup;
    }

    if !data.is_empty() && is_text(data) {
        return "text/plain; charset=utf-8";
    }

    "application/octet-stream"
}

/// Classify markup by its first element, after skipping any XML
/// declaration, comments and doctype. Only an `<svg` root is an image.
fn sniff_markup(data: &[u8]) -> Option<&'static str> {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);
    let text = String::from_utf8_lossy(data).to_ascii_lowercase();
    let mut rest = text.trim_start();

    if !rest.starts_with('<') {
        return None;
    }

    let mut xml_declaration = false;
    let mut comment = false;
    let mut html_doctype = false;

    loop {
        if let Some(after) = rest.strip_prefix("<?") {
            xml_declaration |= after.starts_with("xml");
            rest = skip_past(after, "?>");
        } else if let Some(after) = rest.strip_prefix("<!--") {
            comment = true;
            rest = skip_past(after, "-->");
        } else if let Some(after) = rest.strip_prefix("<!doctype") {
            html_doctype |= after.trim_start().starts_with("html");
            rest = skip_past(after, ">");
        } else {
            break;
        }
    }

    if html_doctype || HTML_ROOTS.iter().any(|tag| starts_with_tag(rest, tag)) {
        return Some("text/html; charset=utf-8");
    }

    if starts_with_tag(rest, "svg") {
        return Some("image/svg+xml");
    }

    if comment {
        return Some("text/html; charset=utf-8");
    }

    if xml_declaration {
        return Some("text/xml; charset=utf-8");
    }

    None
}

const HTML_ROOTS: &[&str] = &[
    "html", "head", "body", "script", "iframe", "style", "title", "div", "p", "a", "table",
];

/// Text after the first `end`, or nothing if `end` never appears
fn skip_past<'a>(text: &'a str, end: &str) -> &'a str {
    text.split_once(end).map_or("", |(_, rest)| rest).trim_start()
}

/// `<name` followed by a tag terminator or the end of the window
fn starts_with_tag(text: &str, name: &str) -> bool {
    text.strip_prefix('<')
        .and_then(|rest| rest.strip_prefix(name))
        .is_some_and(|rest| {
            rest.is_empty()
                || rest.starts_with(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
        })
}

fn is_text(data: &[u8]) -> bool {
    data.iter()
        .all(|&b| b == b'\t' || b == b'\n' || b == b'\r' || b == 0x0C || b >= 0x20)
}
