//! Hierarchical symbols and their ending segments.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::DocketError;

/// Separates segments in a symbol's stored string form. It can't appear in
/// source identifiers, so segments never need escaping.
pub const SEPARATOR: char = '\u{1F}';

/// A hierarchical name such as `Namespace.Class.Method`.
///
/// Stored as its segments joined by [`SEPARATOR`]. The empty symbol means
/// "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Build a symbol from individual segments. Segments are trimmed and
    /// empty ones dropped.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut symbol = String::new();
        for segment in segments {
            let segment = segment.as_ref().trim();
            if segment.is_empty() {
                continue;
            }
            if !symbol.is_empty() {
                symbol.push(SEPARATOR);
            }
            symbol.push_str(segment);
        }
        Self(symbol)
    }

    /// Parse a symbol as written in source or documentation, splitting on
    /// `.`, `::` and `->`.
    pub fn from_plain_text(text: &str) -> Self {
        let normalized = text.replace("::", ".").replace("->", ".");
        Self::from_segments(normalized.split('.'))
    }

    /// Rebuild a symbol from its stored string form.
    pub fn from_symbol_string(stored: impl Into<String>) -> Result<Self, DocketError> {
        let stored = stored.into();
        let well_formed = stored.is_empty()
            || stored
                .split(SEPARATOR)
                .all(|segment| !segment.is_empty() && segment.trim() == segment);

        if well_formed {
            Ok(Self(stored))
        } else {
            Err(DocketError::InvalidSymbol(stored.replace(SEPARATOR, ".")))
        }
    }

    /// The stored string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// The final segment, used as a coarse lookup key.
    pub fn last_segment(&self) -> EndingSymbol {
        EndingSymbol(self.segments().last().unwrap_or_default().to_string())
    }
}

/// Formats with `.` between segments.
impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

/// The last segment of a [`Symbol`]. Many topics may share one.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndingSymbol(String);

impl EndingSymbol {
    pub fn new(segment: impl Into<String>) -> Self {
        Self(segment.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EndingSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_splits_on_all_separators() {
        let symbol = Symbol::from_plain_text("std::collections.HashMap->insert");
        assert_eq!(
            symbol.segments().collect::<Vec<_>>(),
            vec!["std", "collections", "HashMap", "insert"]
        );
        assert_eq!(symbol.to_string(), "std.collections.HashMap.insert");
        assert_eq!(symbol.last_segment(), EndingSymbol::new("insert"));
    }

    #[test]
    fn empty_segments_are_dropped() {
        let symbol = Symbol::from_plain_text(" Foo . .Bar ");
        assert_eq!(symbol, Symbol::from_segments(["Foo", "Bar"]));
    }

    #[test]
    fn stored_form_roundtrips() {
        let symbol = Symbol::from_segments(["Outer", "Inner"]);
        let back = Symbol::from_symbol_string(symbol.as_str()).unwrap();
        assert_eq!(back, symbol);
    }

    #[test]
    fn malformed_stored_form_is_rejected() {
        let stored = format!("Outer{SEPARATOR}{SEPARATOR}Inner");
        assert!(Symbol::from_symbol_string(stored).is_err());
    }

    #[test]
    fn empty_symbol_has_empty_ending() {
        let symbol = Symbol::default();
        assert!(symbol.is_empty());
        assert!(symbol.last_segment().is_empty());
    }
}
