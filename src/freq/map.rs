use chrono::NaiveDate;

use std::{collections::BTreeMap, convert::TryFrom, fmt, ops::Bound};

use crate::{freq::Frequency, util, Result};

/// Ordered mapping of date-string to [Frequency].
///
/// Dates are expected in fixed width `yyyyMMdd` format, for which
/// lexical order of date-strings is also chronological order. Entries are
/// never removed by merge operations.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct DateFrequencyMap {
    entries: BTreeMap<String, Frequency>,
}

impl fmt::Debug for DateFrequencyMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl fmt::Display for DateFrequencyMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let items: Vec<String> = self
            .entries
            .iter()
            .map(|(date, freq)| format!("{}:{}", date, freq))
            .collect();
        write!(f, "{}", items.join(","))
    }
}

impl<D> std::iter::FromIterator<(D, u64)> for DateFrequencyMap
where
    D: ToString,
{
    fn from_iter<T: IntoIterator<Item = (D, u64)>>(iter: T) -> Self {
        let mut map = DateFrequencyMap::new();
        for (date, addend) in iter {
            map.increment(&date.to_string(), addend);
        }
        map
    }
}

impl DateFrequencyMap {
    pub fn new() -> DateFrequencyMap {
        DateFrequencyMap::default()
    }

    /// Set frequency for `date`, overwriting the existing one.
    pub fn put(&mut self, date: &str, freq: Frequency) -> Option<Frequency> {
        self.entries.insert(date.to_string(), freq)
    }

    /// Add `addend` to `date`'s frequency, create the entry if absent.
    pub fn increment(&mut self, date: &str, addend: u64) {
        match self.entries.get_mut(date) {
            Some(freq) => freq.increment(addend),
            None => {
                self.entries.insert(date.to_string(), Frequency::new(addend));
            }
        }
    }

    /// Same as increment, with `date` formatted as `yyyyMMdd`.
    pub fn increment_date(&mut self, date: &NaiveDate, addend: u64) {
        self.increment(&util::dates::format_date(date), addend)
    }

    /// Merge every entry from `other` into this map.
    pub fn increment_all(&mut self, other: &DateFrequencyMap) {
        for (date, freq) in other.entries.iter() {
            self.increment(date, freq.to_value())
        }
    }

    pub fn remove(&mut self, date: &str) -> Option<Frequency> {
        self.entries.remove(date)
    }

    pub fn clear(&mut self) {
        self.entries.clear()
    }
}

impl DateFrequencyMap {
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, date: &str) -> Option<Frequency> {
        self.entries.get(date).cloned()
    }

    pub fn contains(&self, date: &str) -> bool {
        self.entries.contains_key(date)
    }

    /// Iterate over entries in ascending date order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Frequency)> {
        self.entries.iter().map(|(date, freq)| (date.as_str(), *freq))
    }

    pub fn earliest_date(&self) -> Result<&str> {
        match self.entries.keys().next() {
            Some(date) => Ok(date.as_str()),
            None => err_at!(EmptyMap, msg: "no earliest date in empty map"),
        }
    }

    pub fn latest_date(&self) -> Result<&str> {
        match self.entries.keys().next_back() {
            Some(date) => Ok(date.as_str()),
            None => err_at!(EmptyMap, msg: "no latest date in empty map"),
        }
    }

    /// Sum of all counts in this map.
    pub fn total(&self) -> u64 {
        self.entries
            .values()
            .fold(0_u64, |acc, freq| acc.saturating_add(freq.to_value()))
    }

    /// Return a copy holding entries dated within `start..=end`.
    pub fn sub_map(&self, start: &str, end: &str) -> DateFrequencyMap {
        let entries = if start <= end {
            let within = (Bound::Included(start), Bound::Included(end));
            self.entries
                .range::<str, _>(within)
                .map(|(date, freq)| (date.clone(), *freq))
                .collect()
        } else {
            BTreeMap::new()
        };
        DateFrequencyMap { entries }
    }
}

impl DateFrequencyMap {
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = vec![];
        self.serialize_into(&mut buf);
        buf
    }

    /// Append encoded map to `buf`, return number of bytes appended.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) -> usize {
        let mut n = util::encode_varint(self.entries.len() as u64, buf);
        for (date, freq) in self.entries.iter() {
            n += util::encode_varint(date.len() as u64, buf);
            buf.extend_from_slice(date.as_bytes());
            n += date.len();
            n += freq.encode_into(buf);
        }
        n
    }

    /// Decode map spanning the whole of `buf`.
    pub fn deserialize(buf: &[u8]) -> Result<DateFrequencyMap> {
        let (count, mut n) = util::decode_varint(buf)?;

        let mut entries = BTreeMap::new();
        let mut prev: Option<&str> = None;
        for i in 0..count {
            if n >= buf.len() {
                err_at!(
                    MalformedEncoding, msg: "declared {} entries, found {}", count, i
                )?
            }

            let (len, m) = util::decode_varint(&buf[n..])?;
            n += m;
            let len = err_at!(FailConvert, usize::try_from(len))?;
            check_remaining!(&buf[n..], len, "date")?;
            let date = err_at!(MalformedEncoding, std::str::from_utf8(&buf[n..n + len]))?;
            n += len;

            match prev {
                Some(prev) if prev >= date => {
                    err_at!(MalformedEncoding, msg: "date {:?} after {:?}", date, prev)?
                }
                _ => (),
            }

            let (freq, m) = Frequency::decode(&buf[n..])?;
            n += m;

            entries.insert(date.to_string(), freq);
            prev = Some(date);
        }

        if n != buf.len() {
            err_at!(
                MalformedEncoding, msg: "{} trailing bytes after {} entries", buf.len() - n, count
            )?
        }

        Ok(DateFrequencyMap { entries })
    }
}

impl<'a> arbitrary::Arbitrary<'a> for DateFrequencyMap {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let n = u.arbitrary::<usize>()? % 32;
        let mut map = DateFrequencyMap::new();
        for _ in 0..n {
            let date = format!(
                "{:04}{:02}{:02}",
                2000 + (u.arbitrary::<u16>()? % 30),
                1 + (u.arbitrary::<u8>()? % 12),
                1 + (u.arbitrary::<u8>()? % 28),
            );
            let freq = u.arbitrary::<Frequency>()?;
            map.put(&date, freq);
        }
        Ok(map)
    }
}

#[cfg(test)]
#[path = "map_test.rs"]
mod map_test;
