//! Composite key encoding for the key-value store.
//!
//! Every store key is built from typed parts (namespace, id, field, value).
//! Each part is escaped and the parts are joined with [`SEPARATOR`]:
//!
//! 1. percent-encode every byte outside `A-Z a-z 0-9 - _ . ! ~ * ' ( )`
//! 2. escape the glob wildcard `*` as `\*`
//!
//! Step 1 always encodes `:` (as `%3A`) and `\` (as `%5C`), so an escaped part
//! never contains the separator and every backslash in a key belongs to a
//! wildcard escape. The only glob metacharacters left in a stored key are
//! therefore `\` and `*`; [`glob_literal`] escapes both when a key prefix is
//! used in a `KEYS` pattern, so `a\*` is matched by `a\\\*`.
//!
//! ## Key Shapes
//!
//! ```text
//! primary key      {ns}:{id}                              id    at offset 1
//! index registry   $schema:index-key:{ns}                 ns    at offset 2
//! index entry      $schema:index-key:{ns}:{field}:{value} field at 3, value at 4
//! ```
//!
//! The `$schema` prefix is written unescaped; `$` is always percent-encoded
//! in user parts, so no namespace can collide with the internal keys and a
//! `{ns}:*` scan only ever sees primary keys.

use std::fmt::Write;

use crate::errors::{CommonError, Result};
use crate::ids::NamespaceId;
use crate::value::Value;

/// Joins escaped key parts.
pub const SEPARATOR: char = ':';

/// Glob wildcard of the store's pattern scan.
pub const WILDCARD: char = '*';

/// Reserved leading parts of all index keys.
pub const INDEX_PREFIX: &str = "$schema:index-key";

/// Number of parts `INDEX_PREFIX` contributes to a key.
const INDEX_PREFIX_PARTS: usize = 2;

/// The composite key layouts used by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyShape {
    /// `{ns}:{id}`
    Primary,
    /// `$schema:index-key:{ns}`
    IndexRegistry,
    /// `$schema:index-key:{ns}:{field}:{value}`
    IndexEntry,
}

impl KeyShape {
    /// Total number of separator-delimited parts.
    pub const fn arity(self) -> usize {
        match self {
            KeyShape::Primary => 2,
            KeyShape::IndexRegistry => INDEX_PREFIX_PARTS + 1,
            KeyShape::IndexEntry => INDEX_PREFIX_PARTS + 3,
        }
    }

    /// Offset of the namespace part.
    pub const fn namespace_offset(self) -> usize {
        match self {
            KeyShape::Primary => 0,
            KeyShape::IndexRegistry | KeyShape::IndexEntry => INDEX_PREFIX_PARTS,
        }
    }

    fn has_index_prefix(self) -> bool {
        !matches!(self, KeyShape::Primary)
    }
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(b, b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')')
}

/// Escapes a single key part.
pub fn escape_part(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for &b in part.as_bytes() {
        if b == b'*' {
            out.push('\\');
            out.push(WILDCARD);
        } else if is_unreserved(b) {
            out.push(b as char);
        } else {
            let _ = write!(out, "%{:02X}", b);
        }
    }
    out
}

/// Reverses [`escape_part`].
pub fn unescape_part(escaped: &str) -> Result<String> {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                if bytes.get(i + 1) != Some(&b'*') {
                    return Err(CommonError::invalid_key(escaped, "dangling escape"));
                }
                out.push(b'*');
                i += 2;
            }
            b'%' => {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| CommonError::invalid_key(escaped, "bad percent escape"))?;
                out.push(hex);
                i += 3;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|e| CommonError::invalid_key(escaped, e.to_string()))
}

/// Escapes each part and joins them with [`SEPARATOR`].
pub fn encode<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut key = String::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            key.push(SEPARATOR);
        }
        key.push_str(&escape_part(part.as_ref()));
    }
    key
}

/// Splits a key on [`SEPARATOR`] and unescapes every part.
pub fn decode(key: &str) -> Result<Vec<String>> {
    key.split(SEPARATOR).map(unescape_part).collect()
}

/// Extracts the part at `offset` from a key of the given shape.
///
/// Fails if the key does not have the shape's arity or, for index keys, does
/// not start with [`INDEX_PREFIX`].
pub fn decode_part(key: &str, shape: KeyShape, offset: usize) -> Result<String> {
    let raw: Vec<&str> = key.split(SEPARATOR).collect();
    if raw.len() != shape.arity() {
        return Err(CommonError::invalid_key(
            key,
            format!("expected {} parts, found {}", shape.arity(), raw.len()),
        ));
    }
    if shape.has_index_prefix()
        && raw[..INDEX_PREFIX_PARTS].join(SEPARATOR.to_string().as_str()) != INDEX_PREFIX
    {
        return Err(CommonError::invalid_key(key, "missing index prefix"));
    }
    let part = raw
        .get(offset)
        .ok_or_else(|| CommonError::invalid_key(key, format!("no part at offset {}", offset)))?;
    unescape_part(part)
}

/// `{ns}:{id}`
pub fn primary_key(ns: &NamespaceId, id: &Value) -> String {
    encode([ns.as_str(), id.key_part().as_str()])
}

/// Extracts the id part of a primary key.
pub fn primary_key_to_id(key: &str) -> Result<String> {
    decode_part(key, KeyShape::Primary, 1)
}

/// `$schema:index-key:{ns}`: set of indexed field names.
pub fn registry_key(ns: &NamespaceId) -> String {
    format!("{}{}{}", INDEX_PREFIX, SEPARATOR, escape_part(ns.as_str()))
}

/// `$schema:index-key:{ns}:{field}:{value}`: set of primary keys.
pub fn index_entry_key(ns: &NamespaceId, field: &str, value: &Value) -> String {
    format!(
        "{}{}{}",
        INDEX_PREFIX,
        SEPARATOR,
        encode([ns.as_str(), field, value.key_part().as_str()])
    )
}

/// Decoded components of an index entry key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntryKey {
    pub namespace: String,
    pub field: String,
    pub value: String,
}

pub fn parse_index_entry_key(key: &str) -> Result<IndexEntryKey> {
    let shape = KeyShape::IndexEntry;
    Ok(IndexEntryKey {
        namespace: decode_part(key, shape, shape.namespace_offset())?,
        field: decode_part(key, shape, INDEX_PREFIX_PARTS + 1)?,
        value: decode_part(key, shape, INDEX_PREFIX_PARTS + 2)?,
    })
}

/// Makes an encoded key prefix match itself literally in a `KEYS` glob.
pub fn glob_literal(encoded: &str) -> String {
    let mut out = String::with_capacity(encoded.len() + 4);
    for c in encoded.chars() {
        if c == '\\' || c == WILDCARD {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Glob matching every primary key of a namespace.
pub fn namespace_pattern(ns: &NamespaceId) -> String {
    format!("{}{}{}", glob_literal(&escape_part(ns.as_str())), SEPARATOR, WILDCARD)
}

/// Glob matching every index entry of a namespace.
pub fn index_namespace_pattern(ns: &NamespaceId) -> String {
    format!("{}{}{}", glob_literal(&registry_key(ns)), SEPARATOR, WILDCARD)
}

/// Glob matching every index entry of one field.
pub fn index_field_pattern(ns: &NamespaceId, field: &str) -> String {
    let prefix = encode([ns.as_str(), field]);
    format!(
        "{}{}{}{}{}",
        glob_literal(INDEX_PREFIX),
        SEPARATOR,
        glob_literal(&prefix),
        SEPARATOR,
        WILDCARD
    )
}
