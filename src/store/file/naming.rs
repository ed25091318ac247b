//! Document id <-> file name mapping.
//!
//! ASCII letters, digits, `-` and `_` are kept; every other byte becomes
//! `%XX`. Encoded names therefore never start with a dot, leaving dot files
//! free for guards and temporary files.

use crate::error::{DocLockError, Result};

pub(super) const DOCUMENT_EXT: &str = "json";

pub(super) fn encode_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

pub(super) fn decode_id(name: &str) -> Result<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name
                .get(i + 1..i + 3)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| invalid_name(name))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| invalid_name(name))
}

fn invalid_name(name: &str) -> DocLockError {
    DocLockError::StoreError(format!("invalid document file name '{}'", name))
}

pub(super) fn document_file_name(id: &str) -> String {
    format!("{}.{}", encode_id(id), DOCUMENT_EXT)
}

pub(super) fn guard_file_name(id: &str) -> String {
    format!(".{}.guard", encode_id(id))
}
