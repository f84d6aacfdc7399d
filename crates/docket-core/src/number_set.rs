//! Run-length encoded sets of positive integer IDs.
//!
//! Used for the topic and ending-symbol ID allocators, the set of ending
//! symbols awaiting a deletion check, and the tag IDs applied to a topic.
//! IDs churn as files are reparsed, so the set stores sorted, disjoint,
//! non-adjacent inclusive ranges instead of a dense bitmap.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::DocketError;

/// A set of positive `u32` IDs stored as sorted inclusive ranges.
///
/// Zero is reserved for "unassigned" and is never a member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NumberSet {
    ranges: Vec<(u32, u32)>,
}

impl NumberSet {
    /// String form of the empty set.
    pub const EMPTY_SET_STRING: &'static str = "{}";

    pub fn new() -> Self {
        Self::default()
    }

    /// Add an ID. Returns `false` if it was already present or is zero.
    pub fn add(&mut self, id: u32) -> bool {
        if id == 0 {
            return false;
        }

        // First range that contains `id` or touches it from either side.
        let i = self
            .ranges
            .partition_point(|&(_, end)| end.saturating_add(1) < id);

        if let Some(&(start, end)) = self.ranges.get(i) {
            if start <= id && id <= end {
                return false;
            }

            if end.saturating_add(1) == id {
                self.ranges[i].1 = id;
                if let Some(&(next_start, next_end)) = self.ranges.get(i + 1) {
                    if id.checked_add(1) == Some(next_start) {
                        self.ranges[i].1 = next_end;
                        self.ranges.remove(i + 1);
                    }
                }
                return true;
            }

            if id.checked_add(1) == Some(start) {
                self.ranges[i].0 = id;
                return true;
            }
        }

        self.ranges.insert(i, (id, id));
        true
    }

    /// Add every ID in `start..=end`, merging with any ranges it overlaps or
    /// touches. Zero is skipped.
    pub fn add_range(&mut self, start: u32, end: u32) {
        let start = start.max(1);
        if start > end {
            return;
        }

        // Ranges from `first` up to `last` overlap or touch the new one.
        let first = self
            .ranges
            .partition_point(|&(_, e)| e.saturating_add(1) < start);
        let last = self
            .ranges
            .partition_point(|&(s, _)| s <= end.saturating_add(1));

        let mut merged = (start, end);
        if first < last {
            merged.0 = merged.0.min(self.ranges[first].0);
            merged.1 = merged.1.max(self.ranges[last - 1].1);
        }
        self.ranges.splice(first..last, std::iter::once(merged));
    }

    /// Remove an ID. Returns `false` if it wasn't present.
    pub fn remove(&mut self, id: u32) -> bool {
        let i = self.ranges.partition_point(|&(_, end)| end < id);

        let (start, end) = match self.ranges.get(i) {
            Some(&(start, end)) if start <= id => (start, end),
            _ => return false,
        };

        match (start == id, end == id) {
            (true, true) => {
                self.ranges.remove(i);
            }
            (true, false) => self.ranges[i].0 = id + 1,
            (false, true) => self.ranges[i].1 = id - 1,
            (false, false) => {
                self.ranges[i].1 = id - 1;
                self.ranges.insert(i + 1, (id + 1, end));
            }
        }
        true
    }

    pub fn contains(&self, id: u32) -> bool {
        let i = self.ranges.partition_point(|&(_, end)| end < id);
        matches!(self.ranges.get(i), Some(&(start, _)) if start <= id)
    }

    /// The smallest positive ID not in the set, or `None` if every ID up to
    /// `u32::MAX` is taken.
    pub fn lowest_available(&self) -> Option<u32> {
        match self.ranges.first() {
            Some(&(1, end)) => end.checked_add(1),
            _ => Some(1),
        }
    }

    /// The largest ID in the set, if any.
    pub fn highest(&self) -> Option<u32> {
        self.ranges.last().map(|&(_, end)| end)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of IDs in the set.
    pub fn len(&self) -> usize {
        self.ranges
            .iter()
            .map(|&(start, end)| (end - start) as usize + 1)
            .sum()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Iterate all IDs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.ranges.iter().flat_map(|&(start, end)| start..=end)
    }

    /// The underlying inclusive ranges in ascending order.
    pub fn ranges(&self) -> &[(u32, u32)] {
        &self.ranges
    }
}

impl Extend<u32> for NumberSet {
    fn extend<T: IntoIterator<Item = u32>>(&mut self, iter: T) {
        for id in iter {
            self.add(id);
        }
    }
}

impl FromIterator<u32> for NumberSet {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

/// Formats as `{1-3,5,8-9}`.
impl fmt::Display for NumberSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, &(start, end)) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if start == end {
                write!(f, "{start}")?;
            } else {
                write!(f, "{start}-{end}")?;
            }
        }
        f.write_str("}")
    }
}

impl FromStr for NumberSet {
    type Err = DocketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DocketError::InvalidNumberSet(s.to_string());

        let inner = s
            .trim()
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(invalid)?;

        let mut set = Self::new();
        for part in inner.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (start, end) = match part.split_once('-') {
                Some((a, b)) => (a.trim(), b.trim()),
                None => (part, part),
            };
            let start: u32 = start.parse().map_err(|_| invalid())?;
            let end: u32 = end.parse().map_err(|_| invalid())?;
            if start == 0 || start > end {
                return Err(invalid());
            }
            set.add_range(start, end);
        }
        Ok(set)
    }
}

impl Serialize for NumberSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NumberSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
