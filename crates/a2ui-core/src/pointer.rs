//! JSON Pointer reads and copy-on-write updates over [`DataValue`] trees.
//!
//! Pointers follow RFC 6901 (`~1` is `/`, `~0` is `~`), with one deviation:
//! both `""` and `"/"` address the whole document.
//!
//! Writes never mutate their input. Every container on the path from the
//! root to the written leaf is shallow-copied; everything else is shared
//! with the previous tree, so old snapshots stay valid and cheap to compare.

use crate::error::PointerError;
use crate::value::DataValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Largest gap an array write may pad with `null` before the segment is
/// treated as an object key instead.
const MAX_ARRAY_GAP: usize = 4096;

/// A parsed, unescaped pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Pointer {
    segments: Vec<String>,
}

impl Pointer {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Result<Self, PointerError> {
        if text.is_empty() || text == "/" {
            return Ok(Self::root());
        }
        let Some(rest) = text.strip_prefix('/') else {
            return Err(PointerError::MissingLeadingSlash(text.to_string()));
        };
        let segments = rest
            .split('/')
            .map(|seg| unescape_segment(text, seg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Append one unescaped segment.
    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }
}

impl FromStr for Pointer {
    type Err = PointerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for seg in &self.segments {
            write!(f, "/{}", escape_segment(seg))?;
        }
        Ok(())
    }
}

/// Escape a raw key for use as one pointer segment.
pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn unescape_segment(pointer: &str, segment: &str) -> Result<String, PointerError> {
    if !segment.contains('~') {
        return Ok(segment.to_string());
    }
    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars();
    while let Some(ch) = chars.next() {
        if ch != '~' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => {
                return Err(PointerError::InvalidEscape {
                    pointer: pointer.to_string(),
                    segment: segment.to_string(),
                });
            }
        }
    }
    Ok(out)
}

/// Decimal array index without sign or leading zeros.
fn parse_index(segment: &str) -> Option<usize> {
    let bytes = segment.as_bytes();
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    segment.parse::<usize>().ok()
}

/// Index a write into an array of `len` elements should target, if the
/// segment addresses the array at all.
fn array_write_index(segment: &str, len: usize) -> Option<usize> {
    if segment == "-" {
        return Some(len);
    }
    parse_index(segment).filter(|idx| *idx <= len + MAX_ARRAY_GAP)
}

/// Resolve `pointer` inside `root`.
///
/// Misses (absent keys, out-of-range indices, scalars in the middle of the
/// path, malformed pointer text) return `None`.
pub fn get<'a>(root: &'a DataValue, pointer: &str) -> Option<&'a DataValue> {
    let pointer = Pointer::parse(pointer).ok()?;
    get_at(root, &pointer)
}

pub fn get_at<'a>(root: &'a DataValue, pointer: &Pointer) -> Option<&'a DataValue> {
    let mut current = root;
    for seg in &pointer.segments {
        current = match current {
            DataValue::Object(map) => map.get(seg.as_str())?,
            DataValue::Array(items) => items.get(parse_index(seg)?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Return a new tree with `value` stored at `pointer`.
///
/// A root pointer replaces the whole tree and only accepts objects.
/// Missing ancestors are created as objects. An ancestor holding a scalar,
/// or an array addressed by a non-index segment, is replaced by a fresh
/// object before descending.
pub fn set(root: &DataValue, pointer: &str, value: DataValue) -> Result<DataValue, PointerError> {
    let pointer = Pointer::parse(pointer)?;
    set_at(root, &pointer, value)
}

pub fn set_at(
    root: &DataValue,
    pointer: &Pointer,
    value: DataValue,
) -> Result<DataValue, PointerError> {
    if pointer.is_root() {
        return match value {
            DataValue::Object(_) => Ok(value),
            _ => Err(PointerError::RootNotObject),
        };
    }
    Ok(write(Some(root), &pointer.segments, value))
}

fn write(current: Option<&DataValue>, segments: &[String], value: DataValue) -> DataValue {
    let Some((head, rest)) = segments.split_first() else {
        return value;
    };

    if let Some(DataValue::Array(items)) = current {
        if let Some(idx) = array_write_index(head, items.len()) {
            let mut next: Vec<DataValue> = items.as_ref().clone();
            if idx >= next.len() {
                next.resize(idx + 1, DataValue::Null);
            }
            next[idx] = write(items.get(idx), rest, value);
            return DataValue::Array(Arc::new(next));
        }
    }

    let mut next = match current {
        Some(DataValue::Object(map)) => map.as_ref().clone(),
        Some(DataValue::Null) | None => Default::default(),
        Some(other) => {
            tracing::debug!(
                segment = head.as_str(),
                replaced = %other.display_string(),
                "pointer write through non-object ancestor; replacing with object"
            );
            Default::default()
        }
    };
    let child = write(next.get(head.as_str()), rest, value);
    next.insert(Arc::from(head.as_str()), child);
    DataValue::Object(Arc::new(next))
}

/// Return a new tree without the value at `pointer`.
///
/// Removing a missing path returns the input (sharing all of it). Removing
/// the root yields an empty object.
pub fn remove(root: &DataValue, pointer: &str) -> Result<DataValue, PointerError> {
    let pointer = Pointer::parse(pointer)?;
    if pointer.is_root() {
        return Ok(DataValue::empty_object());
    }
    Ok(delete(root, &pointer.segments).unwrap_or_else(|| root.clone()))
}

fn delete(current: &DataValue, segments: &[String]) -> Option<DataValue> {
    let (head, rest) = segments.split_first()?;
    match current {
        DataValue::Object(map) => {
            let mut next = map.as_ref().clone();
            if rest.is_empty() {
                next.remove(head.as_str())?;
            } else {
                let child = delete(map.get(head.as_str())?, rest)?;
                next.insert(Arc::from(head.as_str()), child);
            }
            Some(DataValue::Object(Arc::new(next)))
        }
        DataValue::Array(items) => {
            let idx = parse_index(head).filter(|idx| *idx < items.len())?;
            let mut next = items.as_ref().clone();
            if rest.is_empty() {
                next.remove(idx);
            } else {
                next[idx] = delete(&items[idx], rest)?;
            }
            Some(DataValue::Array(Arc::new(next)))
        }
        _ => None,
    }
}

/// The data model: a [`DataValue`] whose root is always an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DataValue", into = "DataValue")]
pub struct DataModel {
    root: DataValue,
}

impl DataModel {
    pub fn new() -> Self {
        Self {
            root: DataValue::empty_object(),
        }
    }

    pub fn from_value(value: DataValue) -> Result<Self, PointerError> {
        match value {
            DataValue::Object(_) => Ok(Self { root: value }),
            _ => Err(PointerError::RootNotObject),
        }
    }

    pub fn root(&self) -> &DataValue {
        &self.root
    }

    pub fn get(&self, pointer: &str) -> Option<&DataValue> {
        get(&self.root, pointer)
    }

    pub fn set(&self, pointer: &str, value: DataValue) -> Result<Self, PointerError> {
        Ok(Self {
            root: set(&self.root, pointer, value)?,
        })
    }

    pub fn remove(&self, pointer: &str) -> Result<Self, PointerError> {
        Ok(Self {
            root: remove(&self.root, pointer)?,
        })
    }

    /// Whether both models are the same snapshot.
    pub fn ptr_eq(&self, other: &DataModel) -> bool {
        self.root.ptr_eq(&other.root)
    }
}

impl Default for DataModel {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<DataValue> for DataModel {
    type Error = PointerError;

    fn try_from(value: DataValue) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<DataModel> for DataValue {
    fn from(model: DataModel) -> Self {
        model.root
    }
}
