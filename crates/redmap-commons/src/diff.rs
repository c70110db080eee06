//! Field-level change detection between two versions of an entity.
//!
//! `diff(previous, next)` reports the entries of `next` whose value is not
//! equal to the corresponding entry of `previous`. Fields that exist only in
//! `previous` are never reported. Index maintenance calls it twice per
//! mutation:
//!
//! ```text
//! diff(next, previous)  → stale (field, value) pairs to unset
//! diff(previous, next)  → new   (field, value) pairs to set
//! ```
//!
//! A deletion passes an empty `next`, so the first call returns every
//! previous value and the second returns nothing.

use crate::value::FieldMap;

/// Entries of `next` that differ from `previous`. Absent maps count as empty.
pub fn diff(previous: Option<&FieldMap>, next: Option<&FieldMap>) -> FieldMap {
    let Some(next) = next else {
        return FieldMap::new();
    };

    next.iter()
        .filter(|(field, value)| previous.and_then(|p| p.get(*field)) != Some(*value))
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect()
}

/// Same as [`diff`], restricted to the `include` fields.
///
/// An included field missing from `next` is not reported.
pub fn diff_fields<S: AsRef<str>>(
    previous: Option<&FieldMap>,
    next: Option<&FieldMap>,
    include: &[S],
) -> FieldMap {
    let Some(next) = next else {
        return FieldMap::new();
    };

    include
        .iter()
        .filter_map(|field| {
            let field = field.as_ref();
            let value = next.get(field)?;
            (previous.and_then(|p| p.get(field)) != Some(value))
                .then(|| (field.to_string(), value.clone()))
        })
        .collect()
}
