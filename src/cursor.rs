//! Module `cursor` define the pull protocol shared by record sources and
//! the components layered on top of them.
//!
//! A [Cursor] is positioned with `seek()`, and then drained with
//! `has_top()`, `top_key()`, `top_value()` and `advance()`, records are
//! returned in ascending [Key] order. Components in this package, like
//! [SeekingScan][crate::SeekingScan] and [Aggregator][crate::Aggregator],
//! consume a cursor and are themselves a cursor, so they can be stacked
//! in any order.
//!
//! [MemCursor] is an in-memory sorted source, useful for tests and tools.

use log::trace;

use std::{collections::BTreeMap, ops::Bound, sync::Arc};

use crate::{Key, Range, Result};

/// Pull protocol for sorted `{key, value}` records.
pub trait Cursor {
    /// Position the cursor at or after the start of `range`. `families`
    /// project the scan, if empty all families are scanned, if `inclusive`
    /// only listed families are scanned, else listed families are skipped.
    fn seek(&mut self, range: &Range, families: &[Vec<u8>], inclusive: bool) -> Result<()>;

    /// Return true if cursor is positioned on a record.
    fn has_top(&self) -> bool;

    fn top_key(&self) -> Option<&Key>;

    fn top_value(&self) -> Option<&[u8]>;

    /// Move to the next record. Calling this without a top record is an
    /// error.
    fn advance(&mut self) -> Result<()>;

    /// Create an independent cursor over the same data. State already
    /// computed by this cursor is carried over, the underlying source is
    /// forked as well.
    fn fork(&self) -> Result<Self>
    where
        Self: Sized;
}

/// Family projection, shared by cursor implementations.
#[derive(Clone, Debug, Default)]
pub struct Families {
    families: Vec<Vec<u8>>,
    inclusive: bool,
}

impl Families {
    pub fn new(families: &[Vec<u8>], inclusive: bool) -> Families {
        let mut families = families.to_vec();
        families.sort();
        families.dedup();
        Families {
            families,
            inclusive,
        }
    }

    pub fn allows(&self, family: &[u8]) -> bool {
        if self.families.is_empty() {
            return true;
        }
        let found = self
            .families
            .binary_search_by(|f| f.as_slice().cmp(family))
            .is_ok();
        found == self.inclusive
    }

    pub fn as_families(&self) -> &[Vec<u8>] {
        &self.families
    }

    pub fn is_inclusive(&self) -> bool {
        self.inclusive
    }
}

/// Statistics for [MemCursor], used to check how much of the data-set a
/// scan actually touched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Number of `seek()` calls.
    pub n_seeks: usize,
    /// Number of records visited, including those skipped by family
    /// projection.
    pub n_visits: usize,
}

/// In-memory sorted record source.
#[derive(Clone)]
pub struct MemCursor {
    data: Arc<BTreeMap<Key, Vec<u8>>>,
    range: Range,
    families: Families,
    top: Option<(Key, Vec<u8>)>,
    stats: Stats,
}

impl<K, V> std::iter::FromIterator<(K, V)> for MemCursor
where
    K: Into<Key>,
    V: AsRef<[u8]>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let data: BTreeMap<Key, Vec<u8>> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.as_ref().to_vec()))
            .collect();
        MemCursor::new(data)
    }
}

impl MemCursor {
    /// Create a cursor over `data`. Cursor is not positioned until
    /// `seek()` is called.
    pub fn new(data: BTreeMap<Key, Vec<u8>>) -> MemCursor {
        MemCursor {
            data: Arc::new(data),
            range: Range::all(),
            families: Families::default(),
            top: None,
            stats: Stats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn to_stats(&self) -> Stats {
        self.stats
    }

    // position on the first allowed record sorting at or after `from`.
    fn find_top(&mut self, from: Bound<&Key>) {
        self.top = None;
        for (key, value) in self.data.range::<Key, _>((from, Bound::Unbounded)) {
            self.stats.n_visits += 1;
            if !self.range.is_before_end(key) {
                break;
            } else if self.families.allows(&key.family) {
                self.top = Some((key.clone(), value.clone()));
                break;
            }
        }
    }
}

impl Cursor for MemCursor {
    fn seek(&mut self, range: &Range, families: &[Vec<u8>], inclusive: bool) -> Result<()> {
        trace!(target: "datefreq::cursor", "seek {:?}", range);

        self.stats.n_seeks += 1;
        self.range = range.clone();
        self.families = Families::new(families, inclusive);

        let range = self.range.clone();
        match &range.start {
            Bound::Included(key) => self.find_top(Bound::Included(key)),
            Bound::Excluded(key) => self.find_top(Bound::Excluded(key)),
            Bound::Unbounded => self.find_top(Bound::Unbounded),
        }
        Ok(())
    }

    #[inline]
    fn has_top(&self) -> bool {
        self.top.is_some()
    }

    #[inline]
    fn top_key(&self) -> Option<&Key> {
        self.top.as_ref().map(|(key, _)| key)
    }

    #[inline]
    fn top_value(&self) -> Option<&[u8]> {
        self.top.as_ref().map(|(_, value)| value.as_slice())
    }

    fn advance(&mut self) -> Result<()> {
        match self.top.take() {
            Some((key, _)) => {
                self.find_top(Bound::Excluded(&key));
                Ok(())
            }
            None => err_at!(Fatal, msg: "advance on exhausted cursor"),
        }
    }

    fn fork(&self) -> Result<MemCursor> {
        let mut cursor = self.clone();
        cursor.stats = Stats::default();
        Ok(cursor)
    }
}

/// Iterator adapter, drain a positioned cursor as `(key, value)` items.
/// Iteration stops after the first error or once the cursor is
/// exhausted, and stays stopped.
pub struct Entries<C>
where
    C: Cursor,
{
    cursor: C,
    first: bool,
    done: bool,
}

impl<C> Entries<C>
where
    C: Cursor,
{
    pub fn new(cursor: C) -> Entries<C> {
        Entries {
            cursor,
            first: true,
            done: false,
        }
    }

    pub fn unwrap(self) -> C {
        self.cursor
    }
}

impl<C> Iterator for Entries<C>
where
    C: Cursor,
{
    type Item = Result<(Key, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.first {
            if let Err(err) = self.cursor.advance() {
                self.done = true;
                return Some(Err(err));
            }
        }
        self.first = false;

        match self.cursor.top_key() {
            Some(key) => {
                let key = key.clone();
                let value = self.cursor.top_value().unwrap_or(&[]).to_vec();
                Some(Ok((key, value)))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

impl<C> std::iter::FusedIterator for Entries<C> where C: Cursor {}

/// Seek `cursor` over `range` and collect every record.
pub fn scan<C>(cursor: &mut C, range: &Range) -> Result<Vec<(Key, Vec<u8>)>>
where
    C: Cursor,
{
    cursor.seek(range, &[], false)?;
    let mut items = vec![];
    while let Some(key) = cursor.top_key() {
        let value = cursor.top_value().unwrap_or(&[]).to_vec();
        items.push((key.clone(), value));
        cursor.advance()?;
    }
    Ok(items)
}

#[cfg(test)]
#[path = "cursor_test.rs"]
mod cursor_test;
