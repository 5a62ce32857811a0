//! Magnet URI derivation from raw torrent descriptors.

use sha1::{Digest, Sha1};

use super::{codec, MagnetError, Value};

/// Derives a magnet URI from the raw bytes of a `.torrent` descriptor.
///
/// The buffer is decoded, the `info` dictionary is re-encoded canonically
/// and its SHA-1 digest becomes the `xt=urn:btih` content identifier.
/// When present, `info.name` is appended as the percent-encoded display
/// name and the top-level `announce` URL as a tracker hint. Display
/// fields with invalid UTF-8 are rendered lossily rather than rejected:
/// encoding noise must never block the link.
pub fn derive_magnet(raw: &[u8]) -> Result<String, MagnetError> {
    let top = codec::decode(raw)?;
    let info = top.get(b"info").ok_or(MagnetError::NoInfoField)?;

    let canonical = codec::encode(info);
    let digest = Sha1::digest(&canonical);

    let mut magnet = format!("magnet:?xt=urn:btih:{}", hex::encode(digest));

    if let Some(name) = info.get(b"name").and_then(Value::to_text_lossy) {
        if !name.is_empty() {
            magnet.push_str("&dn=");
            magnet.push_str(&urlencoding::encode(&name));
        }
    }

    if let Some(announce) = top.get(b"announce").and_then(Value::to_text_lossy) {
        magnet.push_str("&tr=");
        magnet.push_str(&urlencoding::encode(&announce));
    }

    Ok(magnet)
}
