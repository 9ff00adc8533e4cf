//! Extraction of frame payloads from `multipart/related` responses.
//!
//! DICOMweb servers answer frame retrieval with a `multipart/related` body
//! holding one part per requested frame:
//!
//! ```text
//! --{boundary}\r\n
//! Content-Type: image/png\r\n
//! \r\n
//! <payload>\r\n
//! --{boundary}--
//! ```
//!
//! Some servers omit the boundary parameter from `Content-Type`. For those,
//! a fixed-length header prefix is skipped instead. This is a compatibility
//! fallback for one server family, not a general rule.

use bytes::Bytes;

use crate::error::TileError;

/// Length of the part header prefix skipped when no boundary is declared.
pub const LEGACY_MULTIPART_HEADER_LEN: usize = 91;

/// Extract the frame payload from a response body.
///
/// - A `multipart/*` body with a boundary yields the payload of its first part
/// - A `multipart/*` body without a boundary loses its first
///   [`LEGACY_MULTIPART_HEADER_LEN`] bytes
/// - Any other body is returned unchanged
pub fn extract_frame(content_type: Option<&str>, body: Bytes) -> Result<Bytes, TileError> {
    let Some(content_type) = content_type else {
        return Ok(body);
    };

    if !is_multipart(content_type) {
        return Ok(body);
    }

    match boundary(content_type) {
        Some(boundary) => first_part(&body, &boundary),
        None => {
            if body.len() <= LEGACY_MULTIPART_HEADER_LEN {
                return Err(TileError::Multipart(format!(
                    "body of {} bytes is shorter than the {} byte part header",
                    body.len(),
                    LEGACY_MULTIPART_HEADER_LEN
                )));
            }
            Ok(body.slice(LEGACY_MULTIPART_HEADER_LEN..))
        }
    }
}

fn is_multipart(content_type: &str) -> bool {
    content_type
        .trim_start()
        .get(..10)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("multipart/"))
}

/// Read the `boundary` parameter of a `Content-Type` value, unquoting it.
pub fn boundary(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|parameter| {
        let (name, value) = parameter.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("boundary") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Payload of the first part delimited by `boundary`.
pub fn first_part(body: &Bytes, boundary: &str) -> Result<Bytes, TileError> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();

    let start = find(body, delimiter, 0)
        .ok_or_else(|| TileError::Multipart(format!("boundary {boundary:?} not found")))?;

    // The delimiter line ends at the next line break
    let headers_start = find(body, b"\n", start + delimiter.len())
        .map(|index| index + 1)
        .ok_or_else(|| TileError::Multipart("truncated part delimiter".to_string()))?;

    let rest = &body[headers_start..];
    let payload_start = if rest.starts_with(b"\r\n") {
        headers_start + 2
    } else if rest.starts_with(b"\n") {
        headers_start + 1
    } else {
        match find(body, b"\r\n\r\n", headers_start) {
            Some(index) => index + 4,
            None => find(body, b"\n\n", headers_start)
                .map(|index| index + 2)
                .ok_or_else(|| TileError::Multipart("missing end of part headers".to_string()))?,
        }
    };

    // The closing delimiter only counts at the start of a line. The line
    // break before it belongs to the delimiter, and for an empty payload it
    // is the one ending the part headers.
    let closing = format!("\n--{boundary}");
    let line_break = find(body, closing.as_bytes(), payload_start.saturating_sub(1))
        .ok_or_else(|| TileError::Multipart("missing closing boundary".to_string()))?;

    let payload_end = if line_break > payload_start && body[line_break - 1] == b'\r' {
        line_break - 1
    } else {
        line_break.max(payload_start)
    };

    Ok(body.slice(payload_start..payload_end))
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|index| index + from)
}
