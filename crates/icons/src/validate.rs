//! Sanity checks on downloaded payloads.
//!
//! The icon host sometimes answers a missing icon with an HTML page instead
//! of a 404, so a successful response isn't proof of an image.

use derive_more::Display;

/// Payloads smaller than this are rejected.
pub const MIN_ICON_BYTES: usize = 256;
/// How much of the payload is searched for an HTML marker.
const SNIFF_BYTES: usize = 512;
const HTML_MARKER: &[u8] = b"<html";

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[display("too small ({_0} bytes)")]
    TooSmall(usize),
    #[display("looks like an HTML page")]
    Html,
}

/// Accept `bytes` as an icon, or say why not.
pub fn validate(bytes: &[u8]) -> Result<(), Rejection> {
    if bytes.len() < MIN_ICON_BYTES {
        return Err(Rejection::TooSmall(bytes.len()));
    }
    let head = &bytes[..bytes.len().min(SNIFF_BYTES)];
    if head.windows(HTML_MARKER.len()).any(|window| window.eq_ignore_ascii_case(HTML_MARKER)) {
        return Err(Rejection::Html);
    }
    Ok(())
}
