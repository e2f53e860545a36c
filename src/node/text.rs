//! Text node type
//!
//! Scalar content nodes in the abstract tree.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Content
// =============================================================================

/// Scalar text content: a string or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

macro_rules! content_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Content {
                fn from(n: $ty) -> Self {
                    Self::Number(n.into())
                }
            }
        )*
    };
}

content_from_number!(i32, i64, u32, u64, usize);

// =============================================================================
// AbstractText
// =============================================================================

/// Text node of an abstract tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AbstractText {
    /// Scalar content, `None` for null
    pub content: Option<Content>,
}

impl AbstractText {
    /// Create a text node
    pub fn new(content: impl Into<Content>) -> Self {
        Self {
            content: Some(content.into()),
        }
    }

    /// Create a text node with null content
    pub fn null() -> Self {
        Self { content: None }
    }

    /// Content as a string, `None` for null content
    pub fn to_text(&self) -> Option<Cow<'_, str>> {
        self.content.as_ref().map(|c| match c {
            Content::Text(s) => Cow::Borrowed(s.as_str()),
            Content::Number(n) => Cow::Owned(n.to_string()),
        })
    }

    /// Check if content is null
    pub fn is_null(&self) -> bool {
        self.content.is_none()
    }
}

/// Text nodes are equal when their string forms are, so `3` equals `"3"`.
impl PartialEq for AbstractText {
    fn eq(&self, other: &Self) -> bool {
        self.to_text() == other.to_text()
    }
}
