//! Module `key` implement the record key model.
//!
//! A [Key] is made up of `row`, `family`, `qualifier`, `visibility`
//! and `timestamp`. Keys are totally ordered by row, family, qualifier and
//! visibility in ascending byte order, followed by timestamp in
//! descending order, so that the newest version of a cell sorts first.
//!
//! Qualifiers come in two forms, refer to [Qualifier]:
//!
//! * raw form, `datatype NUL date`, value is a single count.
//! * aggregated form, `datatype`, value is a serialized
//!   [DateFrequencyMap][crate::DateFrequencyMap].

use std::{
    cmp::Ordering,
    fmt,
    ops::{Bound, RangeBounds},
};

use crate::{util, Result};

/// Separator between datatype and date in a raw-form qualifier.
pub const SEPARATOR: u8 = 0x00;

/// Key type, identifying a single record.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Key {
    pub row: Vec<u8>,
    pub family: Vec<u8>,
    pub qualifier: Vec<u8>,
    pub visibility: Vec<u8>,
    pub timestamp: u64,
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {}:{} [{}] {}",
            String::from_utf8_lossy(&self.row),
            String::from_utf8_lossy(&self.family),
            String::from_utf8_lossy(&self.qualifier).replace('\u{0}', "\\x00"),
            String::from_utf8_lossy(&self.visibility),
            self.timestamp
        )
    }
}

// Visibility sorts ascending, same as the storage layer's native order,
// so a key with empty visibility and newest timestamp is a true lower
// bound for its cell.
impl Ord for Key {
    fn cmp(&self, other: &Key) -> Ordering {
        self.row
            .cmp(&other.row)
            .then_with(|| self.family.cmp(&other.family))
            .then_with(|| self.qualifier.cmp(&other.qualifier))
            .then_with(|| self.visibility.cmp(&other.visibility))
            .then_with(|| other.timestamp.cmp(&self.timestamp))
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Key) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Key {
    pub fn new<R, F, Q, V>(row: R, family: F, qualifier: Q, visibility: V, ts: u64) -> Key
    where
        R: AsRef<[u8]>,
        F: AsRef<[u8]>,
        Q: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        Key {
            row: row.as_ref().to_vec(),
            family: family.as_ref().to_vec(),
            qualifier: qualifier.as_ref().to_vec(),
            visibility: visibility.as_ref().to_vec(),
            timestamp: ts,
        }
    }

    /// Create a key with raw-form qualifier `datatype NUL date`.
    pub fn new_raw<R, F, V>(row: R, family: F, dtype: &str, date: &str, vis: V, ts: u64) -> Key
    where
        R: AsRef<[u8]>,
        F: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let qualifier = raw_qualifier(dtype.as_bytes(), date.as_bytes());
        Key::new(row, family, qualifier, vis, ts)
    }

    /// Smallest possible key for the cell `(row, family, qualifier)`, that
    /// is, empty visibility and the newest timestamp.
    pub fn first_of<R, F, Q>(row: R, family: F, qualifier: Q) -> Key
    where
        R: AsRef<[u8]>,
        F: AsRef<[u8]>,
        Q: AsRef<[u8]>,
    {
        Key::new(row, family, qualifier, b"", u64::MAX)
    }

    /// Smallest key sorting after every key in `(row, family)`.
    pub fn past_family<R, F>(row: R, family: F) -> Key
    where
        R: AsRef<[u8]>,
        F: AsRef<[u8]>,
    {
        let mut family = family.as_ref().to_vec();
        family.push(0);
        Key::first_of(row, family, b"")
    }

    /// Smallest key sorting after every key in `(row, family)` whose
    /// qualifier starts with `prefix`. Falls back to [Key::past_family]
    /// when no such key exists within the family.
    pub fn past_prefix<R, F>(row: R, family: F, prefix: &[u8]) -> Key
    where
        R: AsRef<[u8]>,
        F: AsRef<[u8]>,
    {
        match prefix_successor(prefix) {
            Some(qualifier) => Key::first_of(row, family, qualifier),
            None => Key::past_family(row, family),
        }
    }

    /// Return a copy with the newest possible timestamp, so that the key
    /// sorts before every version of the same cell and visibility.
    pub fn maximize_timestamp(&self) -> Key {
        let mut key = self.clone();
        key.timestamp = u64::MAX;
        key
    }

    #[inline]
    pub fn to_qualifier(&self) -> Qualifier<'_> {
        Qualifier::parse(&self.qualifier)
    }

    /// Return true if both keys share row and family.
    #[inline]
    pub fn is_same_family(&self, other: &Key) -> bool {
        self.row == other.row && self.family == other.family
    }
}

/// Compose a raw-form qualifier.
pub fn raw_qualifier(dtype: &[u8], date: &[u8]) -> Vec<u8> {
    let mut qualifier = Vec::with_capacity(dtype.len() + 1 + date.len());
    qualifier.extend_from_slice(dtype);
    qualifier.push(SEPARATOR);
    qualifier.extend_from_slice(date);
    qualifier
}

/// Smallest byte-string that is greater than every byte-string starting
/// with `prefix`. None if `prefix` is all 0xFF, or empty.
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut succ = prefix.to_vec();
    while let Some(byte) = succ.pop() {
        if byte < 0xff {
            succ.push(byte + 1);
            return Some(succ);
        }
    }
    None
}

/// Parsed view of a qualifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Qualifier<'a> {
    /// Qualifier as `datatype NUL date`.
    Raw { dtype: &'a [u8], date: &'a [u8] },
    /// Qualifier as `datatype`.
    Aggregated { dtype: &'a [u8] },
}

impl<'a> Qualifier<'a> {
    /// Split qualifier at the first NUL byte.
    pub fn parse(qualifier: &'a [u8]) -> Qualifier<'a> {
        match qualifier.iter().position(|b| *b == SEPARATOR) {
            Some(off) => Qualifier::Raw {
                dtype: &qualifier[..off],
                date: &qualifier[off + 1..],
            },
            None => Qualifier::Aggregated { dtype: qualifier },
        }
    }

    /// Parse a qualifier that must be in raw form, return (datatype, date).
    pub fn parse_raw(qualifier: &'a [u8]) -> Result<(&'a [u8], &'a [u8])> {
        match Qualifier::parse(qualifier) {
            Qualifier::Raw { dtype, date } => Ok((dtype, date)),
            Qualifier::Aggregated { .. } => err_at!(
                MalformedKey, msg: "no separator in qualifier {:?}",
                String::from_utf8_lossy(qualifier)
            ),
        }
    }

    pub fn as_dtype(&self) -> &'a [u8] {
        match *self {
            Qualifier::Raw { dtype, .. } => dtype,
            Qualifier::Aggregated { dtype } => dtype,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Qualifier::Raw { .. })
    }
}

/// Range of keys to scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Range {
    pub start: Bound<Key>,
    pub end: Bound<Key>,
}

impl Default for Range {
    fn default() -> Range {
        Range::all()
    }
}

impl RangeBounds<Key> for Range {
    fn start_bound(&self) -> Bound<&Key> {
        as_ref_bound(&self.start)
    }

    fn end_bound(&self) -> Bound<&Key> {
        as_ref_bound(&self.end)
    }
}

impl Range {
    pub fn new<G>(within: G) -> Range
    where
        G: RangeBounds<Key>,
    {
        let (start, end) = util::to_start_end(within);
        Range { start, end }
    }

    /// Range covering every key.
    pub fn all() -> Range {
        Range {
            start: Bound::Unbounded,
            end: Bound::Unbounded,
        }
    }

    /// Range covering every key of `row`.
    pub fn row<R: AsRef<[u8]>>(row: R) -> Range {
        let start = Key::first_of(row.as_ref(), b"", b"");
        let end = {
            let mut next = row.as_ref().to_vec();
            next.push(0);
            Key::first_of(next, b"", b"")
        };
        Range {
            start: Bound::Included(start),
            end: Bound::Excluded(end),
        }
    }

    /// Return true if `key` sorts before the end of this range.
    pub fn is_before_end(&self, key: &Key) -> bool {
        match &self.end {
            Bound::Unbounded => true,
            Bound::Included(end) => key <= end,
            Bound::Excluded(end) => key < end,
        }
    }

    /// Return true if `key` sorts after the start of this range.
    pub fn is_after_start(&self, key: &Key) -> bool {
        match &self.start {
            Bound::Unbounded => true,
            Bound::Included(start) => key >= start,
            Bound::Excluded(start) => key > start,
        }
    }

    /// Return a range starting at `key`, inclusive, ending where this
    /// range ends.
    pub fn restart_at(&self, key: Key) -> Range {
        Range {
            start: Bound::Included(key),
            end: self.end.clone(),
        }
    }
}

fn as_ref_bound(bound: &Bound<Key>) -> Bound<&Key> {
    match bound {
        Bound::Included(key) => Bound::Included(key),
        Bound::Excluded(key) => Bound::Excluded(key),
        Bound::Unbounded => Bound::Unbounded,
    }
}

#[cfg(test)]
#[path = "key_test.rs"]
mod key_test;
