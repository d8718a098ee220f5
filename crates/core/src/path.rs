//! Dotted paths
//!
//! A `DotPath` addresses a value nested inside a schema instance using
//! dot-separated segments:
//!
//! | Syntax | Meaning | Example |
//! |--------|---------|---------|
//! | `name` | Field or key | `address` |
//! | `n` | Sequence index | `addresses.0` |
//! | `*` | Every sequence element | `addresses.*.city` |
//!
//! Parsing is purely syntactic. Whether a segment is valid depends on the
//! value it is applied to, which is the evaluator's business.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// Errors
// =============================================================================

/// Error type for dotted path parsing and resolution
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Path string was empty
    #[error("empty path")]
    Empty,

    /// Empty segment (`a..b`, leading or trailing dot)
    #[error("empty segment in path at position {0}")]
    EmptySegment(usize),

    /// Key does not exist at this point of the path
    #[error("'{segment}' not found")]
    NotFound {
        /// Segment that failed to resolve
        segment: String,
    },

    /// Numeric or wildcard segment applied to something that is not a sequence
    #[error("'{segment}' addresses a sequence element but the value is {found}")]
    NotASequence {
        /// Offending segment
        segment: String,
        /// Kind of value found
        found: &'static str,
    },

    /// Named segment applied to something that has no named entries
    #[error("type mismatch at '{segment}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Offending segment
        segment: String,
        /// Expected kind
        expected: &'static str,
        /// Kind of value found
        found: &'static str,
    },

    /// Sequence index beyond the end of the sequence
    #[error("index out of bounds: {index} >= {len}")]
    IndexOutOfBounds {
        /// The requested index
        index: usize,
        /// The sequence length
        len: usize,
    },
}

// =============================================================================
// DotPath and PathSegment
// =============================================================================

/// A segment in a dotted path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// Field name or mapping key
    Key(String),
    /// Sequence index
    Index(usize),
    /// Every element of a sequence: `*`
    Wildcard,
}

impl PathSegment {
    fn parse(raw: &str) -> Self {
        if raw == "*" {
            PathSegment::Wildcard
        } else if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            match raw.parse::<usize>() {
                Ok(idx) => PathSegment::Index(idx),
                // Too large for usize: keep it as a key, resolution will reject it
                Err(_) => PathSegment::Key(raw.to_string()),
            }
        } else {
            PathSegment::Key(raw.to_string())
        }
    }

    /// True for index and wildcard segments
    pub fn is_positional(&self) -> bool {
        matches!(self, PathSegment::Index(_) | PathSegment::Wildcard)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "{}", k),
            PathSegment::Index(i) => write!(f, "{}", i),
            PathSegment::Wildcard => write!(f, "*"),
        }
    }
}

/// A parsed dotted path
///
/// # Examples
///
/// ```
/// use stratadoc_core::path::{DotPath, PathSegment};
///
/// let path: DotPath = "addresses.0.city".parse().unwrap();
/// assert_eq!(path.len(), 3);
/// assert_eq!(path.segments()[1], PathSegment::Index(0));
/// assert_eq!(path.to_string(), "addresses.0.city");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDotPath")]
pub struct DotPath {
    segments: Vec<PathSegment>,
}

/// Unchecked wire form of a [`DotPath`]
#[derive(Deserialize)]
struct RawDotPath {
    segments: Vec<PathSegment>,
}

impl TryFrom<RawDotPath> for DotPath {
    type Error = PathError;

    fn try_from(raw: RawDotPath) -> Result<Self, PathError> {
        DotPath::from_segments(raw.segments)
    }
}

impl DotPath {
    /// Create a path from already-parsed segments
    pub fn from_segments(segments: Vec<PathSegment>) -> Result<Self, PathError> {
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(DotPath { segments })
    }

    /// Get the path segments
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments (never zero)
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false: a parsed path has at least one segment
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// First segment and the remainder
    pub fn split_first(&self) -> (&PathSegment, &[PathSegment]) {
        // Invariant: segments is non-empty
        (&self.segments[0], &self.segments[1..])
    }
}

impl FromStr for DotPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        let mut position = 0;
        for raw in s.split('.') {
            if raw.is_empty() {
                return Err(PathError::EmptySegment(position));
            }
            segments.push(PathSegment::parse(raw));
            position += raw.len() + 1;
        }

        Ok(DotPath { segments })
    }
}

impl fmt::Display for DotPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for seg in &self.segments {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{}", seg)?;
            first = false;
        }
        Ok(())
    }
}

/// Render remaining segments for error messages
pub fn render_segments(segments: &[PathSegment]) -> String {
    segments
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_mixed_segments() {
        let path: DotPath = "addresses.*.tags.2".parse().unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("addresses".into()),
                PathSegment::Wildcard,
                PathSegment::Key("tags".into()),
                PathSegment::Index(2),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!("".parse::<DotPath>(), Err(PathError::Empty));
    }

    #[test]
    fn test_parse_rejects_empty_segment() {
        assert_eq!("a..b".parse::<DotPath>(), Err(PathError::EmptySegment(2)));
        assert!(".a".parse::<DotPath>().is_err());
        assert!("a.".parse::<DotPath>().is_err());
    }

    #[test]
    fn test_mixed_alphanumeric_is_key() {
        let path: DotPath = "v2".parse().unwrap();
        assert_eq!(path.segments(), &[PathSegment::Key("v2".into())]);
    }

    #[test]
    fn test_huge_index_stays_key() {
        let path: DotPath = "99999999999999999999999999".parse().unwrap();
        assert!(matches!(path.segments()[0], PathSegment::Key(_)));
    }

    #[test]
    fn test_display_roundtrip() {
        let raw = "a.0.*.b";
        let path: DotPath = raw.parse().unwrap();
        assert_eq!(path.to_string(), raw);
    }

    #[test]
    fn test_split_first() {
        let path: DotPath = "a.b".parse().unwrap();
        let (head, rest) = path.split_first();
        assert_eq!(head, &PathSegment::Key("a".into()));
        assert_eq!(render_segments(rest), "b");
    }

    #[test]
    fn test_deserialize_rejects_empty_segments() {
        let err = serde_json::from_str::<DotPath>(r#"{"segments":[]}"#).unwrap_err();
        assert!(err.to_string().contains("empty path"));
    }

    #[test]
    fn test_serde_roundtrip() {
        let path: DotPath = "addresses.*.city".parse().unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(serde_json::from_str::<DotPath>(&json).unwrap(), path);
    }

    fn segment_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z_][a-z0-9_]{0,8}",
            (0usize..1000).prop_map(|i| i.to_string()),
            Just("*".to_string()),
        ]
    }

    proptest! {
        #[test]
        fn prop_parse_display_roundtrip(parts in prop::collection::vec(segment_strategy(), 1..6)) {
            let raw = parts.join(".");
            let path: DotPath = raw.parse().unwrap();
            prop_assert_eq!(path.len(), parts.len());
            prop_assert_eq!(path.to_string(), raw);
        }
    }
}
