//! Self-contained asset references.
//!
//! Uploaded binaries are encoded as `data:` URIs so the backup snapshot is
//! fully self-contained: assets travel inside `saveSnapshot`/`loadSnapshot`
//! and remain valid after a provider switch. Absolute http(s) URLs pass
//! through untouched and are resolved over the network by the UI layer.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Encode raw bytes as a `data:<mime>;base64,<payload>` reference.
#[must_use]
pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
  format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Decode a data-URI reference back into `(mime, bytes)`.
///
/// Returns `None` for anything that is not a well-formed base64 data-URI.
#[must_use]
pub fn decode_data_uri(reference: &str) -> Option<(String, Vec<u8>)> {
  let rest = reference.strip_prefix("data:")?;
  let (mime, payload) = rest.split_once(";base64,")?;
  let bytes = STANDARD.decode(payload).ok()?;
  Some((mime.to_string(), bytes))
}

/// Whether a reference is an absolute http(s) URL (passed through untouched).
#[must_use]
pub fn is_remote_url(reference: &str) -> bool {
  reference.starts_with("http://") || reference.starts_with("https://")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn data_uri_round_trip() {
    let bytes = b"\x89PNG\r\n\x1a\n fake image";
    let uri = encode_data_uri("image/png", bytes);

    assert!(uri.starts_with("data:image/png;base64,"));

    let (mime, decoded) = decode_data_uri(&uri).expect("decode");
    assert_eq!(mime, "image/png");
    assert_eq!(decoded, bytes);
  }

  #[test]
  fn rejects_non_data_references() {
    assert_eq!(decode_data_uri("https://cdn.example.com/a.png"), None);
    assert_eq!(decode_data_uri("data:image/png;base64,!!!"), None);
    assert_eq!(decode_data_uri("plain text"), None);
  }

  #[test]
  fn remote_urls_are_recognized() {
    assert!(is_remote_url("https://cdn.example.com/a.png"));
    assert!(is_remote_url("http://cdn.example.com/a.png"));
    assert!(!is_remote_url("data:image/png;base64,AA=="));
    assert!(!is_remote_url("assets/a.png"));
  }
}
