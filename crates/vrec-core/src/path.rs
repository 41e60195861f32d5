//! # Path Addressing
//!
//! A `Path` names a location inside a nested record as an ordered list of
//! segments. Each segment is either a field name or a non-negative array
//! index.
//!
//! ## String Form
//!
//! ```text
//! user.addresses[2].city     Key("user") Key("addresses") Index(2) Key("city")
//! [0].name                   Index(0) Key("name")
//! (empty string)             the root path
//! *                          the wildcard path ("everything")
//! ```
//!
//! The canonical form writes the first field bare, every following field
//! with a leading `.`, and every index in brackets. `Path::parse` rejects
//! empty segments, leading or trailing separators, non-digit bracket contents
//! and non-canonical indices such as `[01]`, so that `Display` is an exact
//! inverse of `parse` for every string `parse` accepts.
//!
//! The wildcard token is only meaningful as a whole path. A `*` used as a
//! field name inside a longer path is rejected rather than silently treated
//! as a literal key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MalformedPathError;

/// The reserved token meaning "this entire subtree".
pub const WILDCARD: &str = "*";

/// The largest array index a path may address. Writing at an index pads the
/// array up to it, so the bound caps that allocation.
pub const MAX_ARRAY_INDEX: usize = 100_000;

/// A single step into a nested value.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    /// Object field access.
    Key(String),
    /// Array element access.
    Index(usize),
}

impl Segment {
    /// Create a key segment.
    pub fn key(k: impl Into<String>) -> Self {
        Segment::Key(k.into())
    }

    /// The array index this segment addresses, if any.
    ///
    /// A key made only of canonical decimal digits (`"0"`, `"12"`, not
    /// `"01"`) also addresses an array element.
    pub fn array_index(&self) -> Option<usize> {
        match self {
            Segment::Index(i) => Some(*i),
            Segment::Key(k) => canonical_index(k),
        }
    }

    /// The object key this segment addresses. Indices become their decimal
    /// string, matching how a numeric key is stored on an object.
    pub fn object_key(&self) -> String {
        match self {
            Segment::Key(k) => k.clone(),
            Segment::Index(i) => i.to_string(),
        }
    }

    /// The equivalent segment in the other representation, if one exists
    /// (`Index(3)` <-> `Key("3")`).
    pub fn alternate(&self) -> Option<Segment> {
        match self {
            Segment::Index(i) => Some(Segment::Key(i.to_string())),
            Segment::Key(k) => canonical_index(k).map(Segment::Index),
        }
    }

    /// Whether this is an index segment.
    pub fn is_index(&self) -> bool {
        matches!(self, Segment::Index(_))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => f.write_str(k),
            Segment::Index(i) => write!(f, "[{i}]"),
        }
    }
}

impl From<&str> for Segment {
    fn from(s: &str) -> Self {
        Segment::Key(s.to_owned())
    }
}

impl From<usize> for Segment {
    fn from(i: usize) -> Self {
        Segment::Index(i)
    }
}

fn is_canonical_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) && !(s.len() > 1 && s.starts_with('0'))
}

fn canonical_index(s: &str) -> Option<usize> {
    if !is_canonical_digits(s) {
        return None;
    }
    s.parse().ok()
}

/// A location inside a nested value.
///
/// Paths are plain data: cloning is cheap for the short paths records use,
/// and equality is segment-wise. The root path has no segments; the wildcard
/// path also has no segments but answers `true` to [`Path::is_wildcard`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path {
    segments: Vec<Segment>,
    wildcard: bool,
}

impl Path {
    /// The root path (empty segment list).
    pub fn root() -> Self {
        Self::default()
    }

    /// The wildcard path.
    pub fn wildcard() -> Self {
        Self {
            segments: Vec::new(),
            wildcard: true,
        }
    }

    /// Build a path from segments.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            wildcard: false,
        }
    }

    /// Append a key segment (builder style).
    pub fn key(mut self, k: impl Into<String>) -> Self {
        self.segments.push(Segment::Key(k.into()));
        self
    }

    /// Append an index segment (builder style).
    pub fn index(mut self, i: usize) -> Self {
        self.segments.push(Segment::Index(i));
        self
    }

    /// Parse a path string.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPathError` for empty segments, leading or trailing
    /// separators, unterminated or non-numeric brackets, non-canonical
    /// indices, and a wildcard token used as a field name.
    pub fn parse(input: &str) -> Result<Self, MalformedPathError> {
        if input.is_empty() {
            return Ok(Self::root());
        }
        if input == WILDCARD {
            return Ok(Self::wildcard());
        }

        // Every delimiter is ASCII, so byte offsets always land on char
        // boundaries when slicing `input`.
        let bytes = input.as_bytes();
        let mut segments = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            match bytes[pos] {
                b'[' => {
                    let close = input[pos + 1..]
                        .find(']')
                        .map(|i| pos + 1 + i)
                        .ok_or_else(|| {
                            MalformedPathError::new(input, pos, "unterminated index bracket")
                        })?;
                    let digits = &input[pos + 1..close];
                    if digits.is_empty() {
                        return Err(MalformedPathError::new(input, pos, "empty index"));
                    }
                    if !is_canonical_digits(digits) {
                        return Err(MalformedPathError::new(
                            input,
                            pos + 1,
                            format!("'{digits}' is not a canonical array index"),
                        ));
                    }
                    let index = digits
                        .parse::<usize>()
                        .ok()
                        .filter(|i| *i <= MAX_ARRAY_INDEX)
                        .ok_or_else(|| {
                            MalformedPathError::new(
                                input,
                                pos + 1,
                                format!(
                                    "array index {digits} is out of range (maximum {MAX_ARRAY_INDEX})"
                                ),
                            )
                        })?;
                    segments.push(Segment::Index(index));
                    pos = close + 1;
                    if pos < bytes.len() && bytes[pos] != b'.' && bytes[pos] != b'[' {
                        return Err(MalformedPathError::new(
                            input,
                            pos,
                            "expected '.' or '[' after an index",
                        ));
                    }
                }
                b'.' => {
                    if segments.is_empty() {
                        return Err(MalformedPathError::new(
                            input,
                            pos,
                            "path cannot start with a separator",
                        ));
                    }
                    pos += 1;
                    if pos == bytes.len() {
                        return Err(MalformedPathError::new(
                            input,
                            pos,
                            "path cannot end with a separator",
                        ));
                    }
                    pos = read_key(input, pos, &mut segments)?;
                }
                b']' => {
                    return Err(MalformedPathError::new(input, pos, "unmatched ']'"));
                }
                _ => {
                    pos = read_key(input, pos, &mut segments)?;
                }
            }
        }

        Ok(Self::from_segments(segments))
    }

    /// The segments of this path. Empty for both the root and the wildcard.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether this path has no segments (root or wildcard).
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty() && !self.wildcard
    }

    /// Whether this is the wildcard path.
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Check that no segment addresses an array index above
    /// [`MAX_ARRAY_INDEX`]. Numeric keys count, since they address array
    /// elements when the container is an array.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPathError` pointing at the first offending segment.
    pub fn check_index_range(&self) -> Result<(), MalformedPathError> {
        let Some(at) = self
            .segments
            .iter()
            .position(|s| s.array_index().is_some_and(|i| i > MAX_ARRAY_INDEX))
        else {
            return Ok(());
        };
        let prefix = Self::from_segments(self.segments[..at].to_vec()).to_string();
        let offset = if at == 0 && !self.segments[at].is_index() {
            0
        } else {
            prefix.len() + 1
        };
        let index = self.segments[at].object_key();
        Err(MalformedPathError::new(
            &self.to_string(),
            offset,
            format!("array index {index} is out of range (maximum {MAX_ARRAY_INDEX})"),
        ))
    }

    /// The last segment, if any.
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// The path with its last segment removed. `None` for root and wildcard.
    pub fn parent(&self) -> Option<Path> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self::from_segments(
            self.segments[..self.segments.len() - 1].to_vec(),
        ))
    }

    /// Append a segment in place.
    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// A new path with `segment` appended.
    pub fn child(&self, segment: Segment) -> Path {
        let mut out = self.clone();
        out.segments.push(segment);
        out
    }

    /// A new path with all of `other`'s segments appended.
    pub fn join(&self, other: &Path) -> Path {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self::from_segments(segments)
    }

    /// Whether `prefix`'s segments are a (not necessarily strict) prefix of
    /// this path's segments. Index and numeric-key segments compare equal.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        prefix.segments.len() <= self.segments.len()
            && prefix
                .segments
                .iter()
                .zip(&self.segments)
                .all(|(a, b)| same_step(a, b))
    }

    /// The remainder of this path after `prefix`, if `prefix` is a prefix.
    pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
        if self.starts_with(prefix) {
            Some(Self::from_segments(
                self.segments[prefix.segments.len()..].to_vec(),
            ))
        } else {
            None
        }
    }

    /// Whether this path denotes `other` or one of its ancestors. The
    /// wildcard path covers everything.
    pub fn covers(&self, other: &Path) -> bool {
        self.wildcard || other.starts_with(self)
    }
}

fn same_step(a: &Segment, b: &Segment) -> bool {
    a == b || a.alternate().as_ref() == Some(b)
}

/// Read one field name starting at `start`; returns the offset just past it.
fn read_key(
    input: &str,
    start: usize,
    segments: &mut Vec<Segment>,
) -> Result<usize, MalformedPathError> {
    let end = input[start..]
        .find(['.', '[', ']'])
        .map_or(input.len(), |i| start + i);
    let key = &input[start..end];
    if key.is_empty() {
        return Err(MalformedPathError::new(input, start, "empty field name"));
    }
    if key == WILDCARD {
        return Err(MalformedPathError::new(
            input,
            start,
            "the wildcard token is only valid as a whole path",
        ));
    }
    segments.push(Segment::Key(key.to_string()));
    Ok(end)
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wildcard {
            return f.write_str(WILDCARD);
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(k) if i == 0 => f.write_str(k)?,
                Segment::Key(k) => write!(f, ".{k}")?,
                Segment::Index(n) => write!(f, "[{n}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = MalformedPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl TryFrom<String> for Path {
    type Error = MalformedPathError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Path::parse(&s)
    }
}

impl TryFrom<&str> for Path {
    type Error = MalformedPathError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Path::parse(s)
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.to_string()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn segment() -> impl Strategy<Value = Segment> {
        prop_oneof![
            "[a-zA-Z_][a-zA-Z0-9_ -]{0,8}".prop_map(Segment::Key),
            (0usize..1000).prop_map(Segment::Index),
        ]
    }

    fn path_string() -> impl Strategy<Value = String> {
        prop::collection::vec(segment(), 1..6)
            .prop_map(|segs| Path::from_segments(segs).to_string())
    }

    proptest! {
        /// format(parse(p)) == p for every syntactically valid path string.
        #[test]
        fn parse_then_format_is_identity(s in path_string()) {
            let parsed = Path::parse(&s).unwrap();
            prop_assert_eq!(parsed.to_string(), s);
        }

        /// Parsing never panics on arbitrary input.
        #[test]
        fn parse_never_panics(s in "\\PC{0,24}") {
            let _ = Path::parse(&s);
        }

        /// A path always starts with each of its own prefixes.
        #[test]
        fn path_starts_with_its_parent(s in path_string()) {
            let p = Path::parse(&s).unwrap();
            if let Some(parent) = p.parent() {
                prop_assert!(p.starts_with(&parent));
            }
        }
    }
}
