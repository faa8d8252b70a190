//! Version tokens and constraints.
//!
//! The engine never parses or expands version ranges itself; that is the
//! range resolver's job. What lives here is the vocabulary: a concrete
//! `Version`, an opaque `VersionRange` expression, and the `VersionConstraint`
//! a dependency was matched against.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A concrete version token.
///
/// Ordering is generic segment ordering: the token is split into runs of
/// digits and non-digits, digit runs compare numerically, other runs compare
/// lexically, and a missing trailing segment orders before any present one.
/// This gives `1.2 < 1.10` and `1.0 < 1.0.1` without committing to any
/// particular versioning scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version(String);

impl Version {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn segments(&self) -> Vec<Segment<'_>> {
        let mut segments = Vec::new();
        let mut rest = self.0.as_str();
        while !rest.is_empty() {
            let rest2 = rest.trim_start_matches(['.', '-', '_']);
            if rest2.is_empty() {
                break;
            }
            let numeric = rest2.starts_with(|c: char| c.is_ascii_digit());
            let end = rest2
                .find(|c: char| c.is_ascii_digit() != numeric || matches!(c, '.' | '-' | '_'))
                .unwrap_or(rest2.len());
            let (run, tail) = rest2.split_at(end);
            segments.push(if numeric {
                // Runs of digits always fit u64 in practice; saturate if not.
                Segment::Number(run.parse().unwrap_or(u64::MAX))
            } else {
                Segment::Text(run)
            });
            rest = tail;
        }
        segments
    }
}

#[derive(PartialEq, Eq)]
enum Segment<'a> {
    Number(u64),
    Text(&'a str),
}

impl Ord for Segment<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Number(a), Segment::Number(b)) => a.cmp(b),
            (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
            // Numeric segments order after textual ones: 1.0-rc < 1.0.1
            (Segment::Number(_), Segment::Text(_)) => Ordering::Greater,
            (Segment::Text(_), Segment::Number(_)) => Ordering::Less,
        }
    }
}

impl PartialOrd for Segment<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments().cmp(&other.segments())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Version::new(s)
    }
}

/// An unexpanded range expression, e.g. `[1.0,2.0)`.
///
/// The text is opaque to the engine; the range resolver interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionRange(String);

impl VersionRange {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The constraint a dependency's version was matched against.
///
/// A pinned constraint names exactly one version; a range constraint carries
/// the original range expression. Version filters only run for ranges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionConstraint {
    Pinned(Version),
    Range(VersionRange),
}

impl VersionConstraint {
    /// The range expression, if this constraint is one.
    pub fn range(&self) -> Option<&VersionRange> {
        match self {
            VersionConstraint::Pinned(_) => None,
            VersionConstraint::Range(range) => Some(range),
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionConstraint::Pinned(version) => version.fmt(f),
            VersionConstraint::Range(range) => range.fmt(f),
        }
    }
}
