// Key and Payload Codec
// Text containers for cipher payloads and the three-line key block format

use std::io::{BufRead, Read, Write};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bincode::Options;
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use serde::{de::DeserializeOwned, Serialize};

use super::encrypt::CipherPayload;
use super::keygen::{RsaPrivateKey, RsaPublicKey};
use crate::error::{Result, RsaError};

/// A key that can be stored as a labeled text block
pub trait KeyBlock: Serialize + DeserializeOwned {
    /// "Public" or "Private"
    const LABEL: &'static str;

    fn header() -> String {
        format!("----- Begin {} Key Block -----", Self::LABEL)
    }

    fn footer() -> String {
        format!("----- End {} Key Block -----", Self::LABEL)
    }
}

impl KeyBlock for RsaPublicKey {
    const LABEL: &'static str = "Public";
}

impl KeyBlock for RsaPrivateKey {
    const LABEL: &'static str = "Private";
}

/// Largest serialized payload or key accepted, before and after compression
pub const MAX_DECODED_BYTES: u64 = 64 * 1024 * 1024;

// Fixed-width integers, the layout bincode::serialize has always produced.
// Trailing bytes after the value are an error.
fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
        .with_limit(MAX_DECODED_BYTES)
}

// serialize -> zlib -> base64
fn pack<T: Serialize>(value: &T) -> Result<String> {
    let raw = wire_options()
        .serialize(value)
        .map_err(|e| RsaError::InvalidArgument(e.to_string()))?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw)?;
    let compressed = encoder.finish()?;

    Ok(BASE64.encode(compressed))
}

fn unpack<T: DeserializeOwned>(text: &str) -> std::result::Result<T, String> {
    unpack_limited(text, MAX_DECODED_BYTES)
}

// base64 -> zlib -> deserialize; the error text says which layer failed
fn unpack_limited<T: DeserializeOwned>(text: &str, limit: u64) -> std::result::Result<T, String> {
    let cleaned: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let compressed = BASE64
        .decode(cleaned.as_bytes())
        .map_err(|e| format!("bad base64: {}", e))?;

    // One byte past the limit is enough to tell that it was exceeded
    let mut raw = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .take(limit + 1)
        .read_to_end(&mut raw)
        .map_err(|e| format!("bad compressed data: {}", e))?;
    if raw.len() as u64 > limit {
        return Err(format!("decompressed data exceeds {} bytes", limit));
    }

    wire_options()
        .deserialize(&raw)
        .map_err(|e| format!("bad serialized data: {}", e))
}

/// Encode a payload as single-line base64 text
pub fn encode_payload(payload: &CipherPayload) -> Result<String> {
    pack(payload)
}

/// Inverse of [`encode_payload`]. Whitespace anywhere in the text is ignored.
pub fn decode_payload(text: &str) -> Result<CipherPayload> {
    unpack(text).map_err(RsaError::MalformedPayload)
}

/// Write `key` as header line, encoded body line, footer line
pub fn save_key<K: KeyBlock, W: Write>(key: &K, mut writer: W) -> Result<()> {
    let body = pack(key)?;
    writeln!(writer, "{}", K::header())?;
    writeln!(writer, "{}", body)?;
    writeln!(writer, "{}", K::footer())?;
    writer.flush()?;
    Ok(())
}

/// Read a key written by [`save_key`]
pub fn load_key<K: KeyBlock, R: BufRead>(reader: R) -> Result<K> {
    let mut lines = Vec::with_capacity(3);
    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }

    let [header, body, footer] = <[String; 3]>::try_from(lines).map_err(|lines| {
        RsaError::MalformedKey(format!("expected 3 lines, found {}", lines.len()))
    })?;

    if header != K::header() {
        return Err(RsaError::MalformedKey(format!(
            "expected header {:?}, found {:?}",
            K::header(),
            header
        )));
    }
    if footer != K::footer() {
        return Err(RsaError::MalformedKey(format!(
            "expected footer {:?}, found {:?}",
            K::footer(),
            footer
        )));
    }

    unpack(&body).map_err(RsaError::MalformedKey)
}

/// The key block as a string, trailing newline included
pub fn key_to_string<K: KeyBlock>(key: &K) -> Result<String> {
    let mut buf = Vec::new();
    save_key(key, &mut buf)?;
    String::from_utf8(buf).map_err(|e| RsaError::InvalidArgument(e.to_string()))
}

pub fn key_from_str<K: KeyBlock>(text: &str) -> Result<K> {
    load_key(text.as_bytes())
}
