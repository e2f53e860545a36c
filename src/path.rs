//! Edit-script paths
//!
//! A path walks from the diff root through child indices and optionally ends
//! in an attribute name:
//!
//! ```text
//! ""                      root
//! "/children"             root's children list
//! "/children#2"           root's third child
//! "/children#2.title"     title attribute of the third child
//! ```
//!
//! The encoding is bit-exact: `/`, `#` and `.` are reserved and never appear
//! inside a segment.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Separator before a structural segment
pub const PATH_SEP: char = '/';
/// Separator before a child index
pub const INDEX_SEP: char = '#';
/// Separator before an attribute name
pub const ATTR_SEP: char = '.';
/// Name of the children segment
pub const CHILDREN: &str = "children";

/// Characters that may not appear in tag or attribute names.
pub const RESERVED: [char; 3] = [PATH_SEP, INDEX_SEP, ATTR_SEP];

/// Check a name for reserved path characters.
#[inline]
pub fn is_reserved_free(name: &str) -> bool {
    !name.contains(RESERVED)
}

// =============================================================================
// Path
// =============================================================================

/// Encoded location inside a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(String);

impl Path {
    /// The root path (`""`).
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Path of this node's children list.
    pub fn children(&self) -> Self {
        Self(format!("{}{PATH_SEP}{CHILDREN}", self.0))
    }

    /// Path of this node's child at `index`.
    pub fn child(&self, index: usize) -> Self {
        Self(format!("{}{PATH_SEP}{CHILDREN}{INDEX_SEP}{index}", self.0))
    }

    /// Path of one of this node's attributes.
    pub fn attr(&self, name: &str) -> Self {
        Self(format!("{}{ATTR_SEP}{name}", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw attribute name of an attribute path.
    pub fn attribute_name(&self) -> Option<&str> {
        self.0.split_once(ATTR_SEP).map(|(_, name)| name)
    }

    /// True iff the path denotes a whole children list rather than one child.
    pub fn is_children_list(&self) -> bool {
        self.0.ends_with(CHILDREN)
    }

    /// The containing children list of an indexed path.
    ///
    /// `/children#3/children#0` becomes `/children#3/children`. A path without
    /// an index is returned unchanged.
    pub fn parent_container(&self) -> Self {
        match self.0.rfind(INDEX_SEP) {
            Some(pos) => Self(self.0[..pos].to_string()),
            None => self.clone(),
        }
    }

    /// Child index of the last segment, if indexed.
    pub fn last_index(&self) -> Option<usize> {
        match self.segments().last() {
            Some(Segment::Child(index)) => Some(*index),
            _ => None,
        }
    }

    /// Split into structural segments.
    ///
    /// Parsing stops at the attribute segment, which is always last.
    pub fn segments(&self) -> SmallVec<[Segment<'_>; 8]> {
        let (structure, attr) = match self.0.split_once(ATTR_SEP) {
            Some((structure, attr)) => (structure, Some(attr)),
            None => (self.0.as_str(), None),
        };

        let mut segments: SmallVec<[Segment<'_>; 8]> = structure
            .split(PATH_SEP)
            .filter(|part| !part.is_empty())
            .map(Segment::parse)
            .collect();
        if let Some(attr) = attr {
            segments.push(Segment::Attribute(attr));
        }
        segments
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("\"\"")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Path {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Segment
// =============================================================================

/// One parsed step of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// `children`: the whole children list
    Children,
    /// `children#N`: child `N`
    Child(usize),
    /// `.name`: an attribute
    Attribute(&'a str),
    /// Anything else
    Malformed(&'a str),
}

impl<'a> Segment<'a> {
    fn parse(part: &'a str) -> Self {
        match part.split_once(INDEX_SEP) {
            None if part == CHILDREN => Self::Children,
            Some((CHILDREN, index)) => index
                .parse()
                .map(Self::Child)
                .unwrap_or(Self::Malformed(part)),
            _ => Self::Malformed(part),
        }
    }
}
