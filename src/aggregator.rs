//! Module `aggregator` implement streaming aggregation of date frequency
//! records.
//!
//! [Aggregator] is a cursor layered over a source cursor. Consecutive
//! records sharing `(row, family, datatype)` form a group, and each group
//! is collapsed into aggregated-form records whose value is a serialized
//! [DateFrequencyMap]. Input can mix raw-form records, whose value is a
//! single count, and previously aggregated records, which makes
//! re-aggregation of already compacted data idempotent.
//!
//! Two output modes are supported:
//!
//! * per-visibility, default, one output record for every visibility
//!   label seen in the group.
//! * combined, one output record per group, its label computed by the
//!   [Combiner] supplied at construction.
//!
//! Output for a closed group is buffered and drained in key order before
//! any further input is consumed, hence output is in ascending key order
//! as long as the source is.

use log::{debug, info, trace};
use serde::Deserialize;

use std::{
    cmp,
    collections::{BTreeMap, HashMap},
    ops::Bound,
    sync::Arc,
};

use crate::{
    cursor::Cursor,
    freq::{DateFrequencyMap, Frequency},
    key::{Key, Qualifier, Range},
    util,
    visibility::Combiner,
    Result,
};

/// Configuration for [Aggregator].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    /// Fold all visibility labels of a group into a single output record.
    pub combine_visibilities: bool,
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    pub fn set_combine_visibilities(&mut self, combine: bool) -> &mut Self {
        self.combine_visibilities = combine;
        self
    }

    /// Compose configuration from string options, recognised key is
    /// `combine.visibilities`, other keys are ignored.
    pub fn from_options(opts: &HashMap<String, String>) -> Result<Config> {
        let mut config = Config::default();
        if let Some(val) = opts.get("combine.visibilities") {
            config.combine_visibilities = util::parse_bool("combine.visibilities", val)?;
        }
        Ok(config)
    }
}

/// Aggregator configuration as read from a TOML file.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TomlConfig {
    combine_visibilities: Option<bool>,
}

impl From<TomlConfig> for Config {
    fn from(cfg: TomlConfig) -> Config {
        Config {
            combine_visibilities: cfg.combine_visibilities.unwrap_or(false),
        }
    }
}

/// Statistics for [Aggregator].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Number of groups closed.
    pub n_groups: usize,
    /// Number of source records consumed.
    pub n_input: usize,
    pub n_raw: usize,
    pub n_aggregated: usize,
    /// Number of records emitted.
    pub n_output: usize,
}

// accumulator for records sharing row, family and datatype.
struct Group {
    // first key seen, carries row and family for the group.
    head: Key,
    dtype: Vec<u8>,
    // visibility -> (map, max-timestamp)
    labels: BTreeMap<Vec<u8>, (DateFrequencyMap, u64)>,
}

impl Group {
    fn new(key: &Key) -> Group {
        Group {
            head: key.clone(),
            dtype: key.to_qualifier().as_dtype().to_vec(),
            labels: BTreeMap::new(),
        }
    }

    fn is_member(&self, key: &Key) -> bool {
        key.is_same_family(&self.head) && key.to_qualifier().as_dtype() == self.dtype.as_slice()
    }

    fn merge(&mut self, key: &Key, value: &[u8], stats: &mut Stats) -> Result<()> {
        let other = match key.to_qualifier() {
            Qualifier::Raw { date, .. } => {
                let date = err_at!(MalformedKey, std::str::from_utf8(date), "{:?}", key)?;
                let freq = Frequency::from_bytes(value)?;
                stats.n_raw += 1;

                let mut map = DateFrequencyMap::new();
                map.put(date, freq);
                map
            }
            Qualifier::Aggregated { .. } => {
                let map = DateFrequencyMap::deserialize(value)?;
                stats.n_aggregated += 1;
                map
            }
        };
        trace!(target: "datefreq::agg", "merge {:?} {}", key, other);

        let (map, ts) = self
            .labels
            .entry(key.visibility.clone())
            .or_insert_with(|| (DateFrequencyMap::new(), 0));
        map.increment_all(&other);
        *ts = cmp::max(*ts, key.timestamp);
        stats.n_input += 1;

        Ok(())
    }

    // close this group, add output records to `buffer`.
    fn flatten<V>(self, combiner: Option<&V>, buffer: &mut BTreeMap<Key, Vec<u8>>) -> Result<()>
    where
        V: Combiner,
    {
        let (row, family, dtype) = (self.head.row, self.head.family, self.dtype);

        match combiner {
            Some(combiner) => {
                let labels: Vec<Vec<u8>> = self.labels.keys().cloned().collect();
                let visibility = combiner.combine(&labels)?;

                let mut union = DateFrequencyMap::new();
                let mut max_ts = 0;
                for (_, (map, ts)) in self.labels.into_iter() {
                    union.increment_all(&map);
                    max_ts = cmp::max(max_ts, ts);
                }
                let key = Key::new(row, family, dtype, visibility, max_ts);
                buffer.insert(key, union.serialize());
            }
            None => {
                for (visibility, (map, ts)) in self.labels.into_iter() {
                    let key = Key::new(&row, &family, &dtype, visibility, ts);
                    buffer.insert(key, map.serialize());
                }
            }
        }

        Ok(())
    }
}

/// Cursor that aggregates date frequency records read from a source
/// cursor.
///
/// Source records are expected in ascending [Key] order, with raw-form
/// values encoded as a single varint count and aggregated-form values
/// as serialized [DateFrequencyMap].
pub struct Aggregator<C, V>
where
    C: Cursor,
    V: Combiner,
{
    source: C,
    config: Config,
    combiner: Arc<V>,

    buffer: BTreeMap<Key, Vec<u8>>,
    top: Option<(Key, Vec<u8>)>,

    stats: Stats,
}

impl<C, V> Aggregator<C, V>
where
    C: Cursor,
    V: Combiner,
{
    /// Create an aggregator reading from `source`. `combiner` is used
    /// only when `config.combine_visibilities` is true. Aggregator is not
    /// positioned until `seek()` is called.
    pub fn new(source: C, config: Config, combiner: V) -> Aggregator<C, V> {
        info!(target: "datefreq::agg", "new aggregator {:?}", config);

        Aggregator {
            source,
            config,
            combiner: Arc::new(combiner),

            buffer: BTreeMap::new(),
            top: None,

            stats: Stats::default(),
        }
    }

    pub fn to_config(&self) -> Config {
        self.config.clone()
    }

    pub fn to_stats(&self) -> Stats {
        self.stats
    }

    /// Return the source cursor.
    pub fn unwrap(self) -> C {
        self.source
    }

    fn find_top(&mut self) -> Result<()> {
        self.top = None;

        if self.buffer.is_empty() && self.source.has_top() {
            self.aggregate()?;
        }

        let key = self.buffer.keys().next().cloned();
        if let Some(key) = key {
            let value = self.buffer.remove(&key).unwrap_or_else(Vec::new);
            self.stats.n_output += 1;
            self.top = Some((key, value));
        }
        Ok(())
    }

    // consume the next group from source into the output buffer.
    fn aggregate(&mut self) -> Result<()> {
        let mut group = match self.source.top_key() {
            Some(key) => Group::new(key),
            None => return Ok(()),
        };

        loop {
            match self.source.top_key() {
                Some(key) if group.is_member(key) => {
                    let value = self.source.top_value().unwrap_or(&[]);
                    group.merge(key, value, &mut self.stats)?;
                }
                _ => break,
            }
            self.source.advance()?;
        }

        debug!(
            target: "datefreq::agg",
            "close group {:?}:{:?}:{:?} labels:{}",
            String::from_utf8_lossy(&group.head.row),
            String::from_utf8_lossy(&group.head.family),
            String::from_utf8_lossy(&group.dtype),
            group.labels.len()
        );
        self.stats.n_groups += 1;

        let combiner = if self.config.combine_visibilities {
            Some(self.combiner.as_ref())
        } else {
            None
        };
        group.flatten(combiner, &mut self.buffer)
    }
}

impl<C, V> Cursor for Aggregator<C, V>
where
    C: Cursor,
    V: Combiner,
{
    /// Start key of `range` is widened to the newest timestamp, so that
    /// the first group is never split on timestamp.
    fn seek(&mut self, range: &Range, families: &[Vec<u8>], inclusive: bool) -> Result<()> {
        let start = match &range.start {
            Bound::Included(key) => Bound::Included(key.maximize_timestamp()),
            Bound::Excluded(key) => Bound::Excluded(key.clone()),
            Bound::Unbounded => Bound::Unbounded,
        };
        let range = Range {
            start,
            end: range.end.clone(),
        };
        debug!(target: "datefreq::agg", "seek {:?}", range);

        self.buffer.clear();
        self.top = None;

        self.source.seek(&range, families, inclusive)?;
        self.find_top()
    }

    fn has_top(&self) -> bool {
        self.top.is_some()
    }

    fn top_key(&self) -> Option<&Key> {
        self.top.as_ref().map(|(key, _)| key)
    }

    fn top_value(&self) -> Option<&[u8]> {
        self.top.as_ref().map(|(_, value)| value.as_slice())
    }

    fn advance(&mut self) -> Result<()> {
        if self.top.is_none() {
            err_at!(Fatal, msg: "advance on exhausted aggregator")?
        }
        self.find_top()
    }

    fn fork(&self) -> Result<Aggregator<C, V>> {
        Ok(Aggregator {
            source: self.source.fork()?,
            config: self.config.clone(),
            combiner: Arc::clone(&self.combiner),

            buffer: self.buffer.clone(),
            top: self.top.clone(),

            stats: Stats::default(),
        })
    }
}

#[cfg(test)]
#[path = "aggregator_test.rs"]
mod aggregator_test;
