//! Slide-deck (pptx) template rendering
//!
//! A pptx is a zip archive. Slide XML parts under `ppt/slides/` have their
//! `{{placeholder}}` tokens substituted; every other entry is copied as-is.

use std::io::{Cursor, Read, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::RenderError;
use crate::domain::{CertificateData, PlaceholderMapping};

const SLIDE_PREFIX: &str = "ppt/slides/";

/// Largest uncompressed archive entry accepted from a template
pub const MAX_PART_SIZE: u64 = 32 * 1024 * 1024;

fn is_slide_part(name: &str) -> bool {
    name.starts_with(SLIDE_PREFIX)
        && name.ends_with(".xml")
        && !name[SLIDE_PREFIX.len()..].contains('/')
}

/// Fill a pptx template with certificate data
pub fn render_document(
    template: &[u8],
    mapping: &PlaceholderMapping,
    data: &CertificateData,
) -> Result<Vec<u8>, RenderError> {
    let invalid = |e: zip::result::ZipError| RenderError::InvalidTemplate(e.to_string());

    let mut archive = ZipArchive::new(Cursor::new(template)).map_err(invalid)?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut slides = 0usize;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(invalid)?;
        let name = entry.name().to_string();
        let method = match entry.compression() {
            CompressionMethod::Stored => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        };
        let options = FileOptions::default().compression_method(method);

        if entry.is_dir() {
            writer.add_directory(name, options).map_err(invalid)?;
            continue;
        }

        let declared = entry.size();
        let mut contents = read_part(&mut entry, &name, declared, MAX_PART_SIZE)?;

        if is_slide_part(&name) {
            slides += 1;
            let xml = String::from_utf8(contents)
                .map_err(|_| RenderError::InvalidTemplate(format!("{name} is not UTF-8")))?;
            contents = substitute_placeholders(&xml, mapping, data).into_bytes();
        }

        writer.start_file(name, options).map_err(invalid)?;
        writer
            .write_all(&contents)
            .map_err(|e| RenderError::Encode(e.to_string()))?;
    }

    if slides == 0 {
        return Err(RenderError::InvalidTemplate(
            "template has no slides".to_string(),
        ));
    }

    let cursor = writer
        .finish()
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(cursor.into_inner())
}

/// Read one archive entry, refusing more than `limit` bytes.
///
/// The declared size comes from the archive header and only sizes the
/// initial buffer.
fn read_part(
    reader: impl Read,
    name: &str,
    declared: u64,
    limit: u64,
) -> Result<Vec<u8>, RenderError> {
    let mut contents = Vec::with_capacity(declared.min(limit) as usize);
    reader
        .take(limit + 1)
        .read_to_end(&mut contents)
        .map_err(|e| RenderError::InvalidTemplate(format!("{name}: {e}")))?;

    if contents.len() as u64 > limit {
        return Err(RenderError::InvalidTemplate(format!(
            "{name} exceeds {limit} bytes"
        )));
    }
    Ok(contents)
}

/// Replace `{{placeholder}}` tokens in `text`.
///
/// A placeholder resolves through `mapping` to a field name, or is used as
/// the field name itself when unmapped. Tokens whose field is absent from
/// `data` are left verbatim.
pub fn substitute_placeholders(
    text: &str,
    mapping: &PlaceholderMapping,
    data: &CertificateData,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];

        let Some(end) = after_open.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let token = after_open[..end].trim();
        let value = is_token(token)
            .then(|| mapping.get(token).map(String::as_str).unwrap_or(token))
            .and_then(|field| data.field(field));

        match value {
            Some(v) => {
                out.push_str(&escape_xml(v));
                rest = &after_open[end + 2..];
            }
            None if is_token(token) => {
                out.push_str(&rest[start..start + 2 + end + 2]);
                rest = &after_open[end + 2..];
            }
            None => {
                // Not a placeholder; the span may still hold a later `{{`
                out.push_str("{{");
                rest = after_open;
            }
        }
    }

    out.push_str(rest);
    out
}

fn is_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
