//! Module `filter` implement a seek-ahead filter over raw-form records.
//!
//! [SeekingFilter] accepts records whose datatype is in a configured set
//! and whose date falls within an inclusive `[start_date, end_date]`
//! window. Every rejection comes with a seek hint, the smallest key that
//! could possibly be accepted next, so that a scan can jump over whole
//! key ranges instead of visiting each record in them.
//!
//! [SeekingScan] applies the filter on top of any [Cursor].
//!
//! Configuration can be composed programmatically:
//!
//! ```ignore
//! let mut config = filter::Config::new("20240501", "20240531");
//! config.set_datatypes(&["csv", "json"]).set_max_next_count(2);
//! ```
//!
//! or loaded from a map of options or from a TOML file, refer to
//! [Config::from_options] and [TomlConfig].

use chrono::NaiveDate;
use log::{debug, info, trace};
use serde::Deserialize;

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    ops::Bound,
};

use crate::{
    cursor::Cursor,
    key::{self, Key, Qualifier, Range},
    util::dates,
    Result,
};

/// Configuration for [SeekingFilter] and [SeekingScan].
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Accepted datatypes, empty set accepts any datatype.
    pub datatypes: BTreeSet<Vec<u8>>,
    /// Inclusive start of date window, as `yyyyMMdd`.
    pub start_date: Option<String>,
    /// Inclusive end of date window, as `yyyyMMdd`.
    pub end_date: Option<String>,
    /// Number of plain advances tried on a rejected record before
    /// issuing a seek. Zero means always seek.
    pub max_next_count: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let dts: Vec<String> = self
            .datatypes
            .iter()
            .map(|dt| String::from_utf8_lossy(dt).to_string())
            .collect();
        write!(
            f,
            "filter::Config<datatypes:{:?} window:{:?}..={:?} max_next_count:{}>",
            dts, self.start_date, self.end_date, self.max_next_count
        )
    }
}

impl Config {
    pub fn new(start_date: &str, end_date: &str) -> Config {
        Config {
            datatypes: BTreeSet::new(),
            start_date: Some(start_date.to_string()),
            end_date: Some(end_date.to_string()),
            max_next_count: 0,
        }
    }

    /// Replace the set of accepted datatypes.
    pub fn set_datatypes<D>(&mut self, datatypes: &[D]) -> &mut Self
    where
        D: AsRef<[u8]>,
    {
        self.datatypes = datatypes.iter().map(|d| d.as_ref().to_vec()).collect();
        self
    }

    pub fn set_date_window(&mut self, start_date: &str, end_date: &str) -> &mut Self {
        self.start_date = Some(start_date.to_string());
        self.end_date = Some(end_date.to_string());
        self
    }

    pub fn set_max_next_count(&mut self, max_next_count: usize) -> &mut Self {
        self.max_next_count = max_next_count;
        self
    }

    /// Compose configuration from string options. Recognised keys are
    /// `datatypes` (comma separated), `start.date`, `end.date` and
    /// `max.next.count`, other keys are ignored.
    pub fn from_options(opts: &HashMap<String, String>) -> Result<Config> {
        let mut config = Config::default();
        if let Some(dts) = opts.get("datatypes") {
            let dts: Vec<&str> = dts
                .split(',')
                .map(|dt| dt.trim())
                .filter(|dt| !dt.is_empty())
                .collect();
            config.set_datatypes(&dts);
        }
        config.start_date = opts.get("start.date").map(|s| s.trim().to_string());
        config.end_date = opts.get("end.date").map(|s| s.trim().to_string());
        if let Some(n) = opts.get("max.next.count") {
            config.max_next_count = err_at!(
                InvalidConfig, n.trim().parse::<usize>(), "max.next.count:{:?}", n
            )?;
        }

        config.to_window()?;
        Ok(config)
    }

    /// Validate configuration and return the parsed date window.
    pub fn to_window(&self) -> Result<(NaiveDate, NaiveDate)> {
        let start = match self.start_date.as_ref() {
            Some(s) => err_at!(InvalidConfig, dates::parse_date(s), "start_date")?,
            None => err_at!(InvalidConfig, msg: "missing start_date")?,
        };
        let end = match self.end_date.as_ref() {
            Some(s) => err_at!(InvalidConfig, dates::parse_date(s), "end_date")?,
            None => err_at!(InvalidConfig, msg: "missing end_date")?,
        };
        if start > end {
            err_at!(InvalidConfig, msg: "start_date {} after end_date {}", start, end)?
        }
        for dt in self.datatypes.iter() {
            if dt.is_empty() || dt.contains(&key::SEPARATOR) {
                err_at!(InvalidConfig, msg: "invalid datatype {:?}", dt)?
            }
        }
        Ok((start, end))
    }
}

/// Filter configuration as read from a TOML file.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TomlConfig {
    datatypes: Option<Vec<String>>,
    start_date: Option<String>,
    end_date: Option<String>,
    max_next_count: Option<usize>,
}

impl From<TomlConfig> for Config {
    fn from(cfg: TomlConfig) -> Config {
        Config {
            datatypes: cfg
                .datatypes
                .unwrap_or_else(Vec::new)
                .into_iter()
                .map(|dt| dt.into_bytes())
                .collect(),
            start_date: cfg.start_date,
            end_date: cfg.end_date,
            max_next_count: cfg.max_next_count.unwrap_or(0),
        }
    }
}

/// Outcome of [SeekingFilter::check].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Accept,
    /// Record rejected, no key sorting before the hint can be accepted.
    /// Hint is always greater than the rejected key.
    Reject(Key),
}

/// Accept raw-form records by datatype and inclusive date window.
#[derive(Clone, Debug)]
pub struct SeekingFilter {
    datatypes: BTreeSet<Vec<u8>>,
    start_date: Vec<u8>,
    end_date: Vec<u8>,
}

impl SeekingFilter {
    pub fn new(config: &Config) -> Result<SeekingFilter> {
        let (start, end) = config.to_window()?;
        Ok(SeekingFilter {
            datatypes: config.datatypes.clone(),
            start_date: dates::format_date(&start).into_bytes(),
            end_date: dates::format_date(&end).into_bytes(),
        })
    }

    /// Return true if `dtype` is accepted.
    pub fn accepts_datatype(&self, dtype: &[u8]) -> bool {
        self.datatypes.is_empty() || self.datatypes.contains(dtype)
    }

    /// Decide on a single record key. Keys with an aggregated-form
    /// qualifier fail with `MalformedKey`.
    pub fn check(&self, key: &Key) -> Result<Decision> {
        let (dtype, date) = Qualifier::parse_raw(&key.qualifier)?;

        let decision = if !self.accepts_datatype(dtype) {
            let from = (Bound::Excluded(dtype), Bound::Unbounded);
            let hint = match self.datatypes.range::<[u8], _>(from).next() {
                Some(next) => {
                    let qualifier = key::raw_qualifier(next, &self.start_date);
                    Key::first_of(&key.row, &key.family, qualifier)
                }
                None => Key::past_family(&key.row, &key.family),
            };
            Decision::Reject(hint)
        } else if date < self.start_date.as_slice() {
            let qualifier = key::raw_qualifier(dtype, &self.start_date);
            Decision::Reject(Key::first_of(&key.row, &key.family, qualifier))
        } else if date > self.end_date.as_slice() {
            let prefix = key::raw_qualifier(dtype, b"");
            Decision::Reject(Key::past_prefix(&key.row, &key.family, &prefix))
        } else {
            Decision::Accept
        };

        Ok(decision)
    }
}

/// Statistics for [SeekingScan].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub n_accepted: usize,
    pub n_rejected: usize,
    /// Number of seeks issued on the source at a hint.
    pub n_seeks: usize,
    /// Number of plain advances issued on the source for rejected
    /// records.
    pub n_nexts: usize,
}

/// Cursor that returns only records accepted by [SeekingFilter], reading
/// from a source cursor.
pub struct SeekingScan<C>
where
    C: Cursor,
{
    source: C,
    filter: SeekingFilter,
    max_next_count: usize,

    range: Range,
    families: Vec<Vec<u8>>,
    inclusive: bool,
    // set when a seek hint falls beyond the scan range.
    exhausted: bool,

    stats: Stats,
}

impl<C> SeekingScan<C>
where
    C: Cursor,
{
    /// Wrap `source`. Scan is not positioned until `seek()` is called.
    pub fn new(source: C, config: &Config) -> Result<SeekingScan<C>> {
        let filter = SeekingFilter::new(config)?;
        info!(target: "datefreq::seekflt", "new scan {:?}", config);

        Ok(SeekingScan {
            source,
            filter,
            max_next_count: config.max_next_count,

            range: Range::all(),
            families: vec![],
            inclusive: false,
            exhausted: false,

            stats: Stats::default(),
        })
    }

    pub fn to_stats(&self) -> Stats {
        self.stats
    }

    pub fn as_filter(&self) -> &SeekingFilter {
        &self.filter
    }

    /// Return the source cursor.
    pub fn unwrap(self) -> C {
        self.source
    }

    // skip source records until one is accepted or the source is done.
    fn skip_rejected(&mut self) -> Result<()> {
        let mut n_nexts = 0;
        loop {
            let decision = match self.source.top_key() {
                Some(key) => self.filter.check(key)?,
                None => break Ok(()),
            };

            let hint = match decision {
                Decision::Accept => {
                    self.stats.n_accepted += 1;
                    break Ok(());
                }
                Decision::Reject(hint) => hint,
            };
            self.stats.n_rejected += 1;

            if n_nexts < self.max_next_count {
                trace!(target: "datefreq::seekflt", "next, hint {:?}", hint);
                n_nexts += 1;
                self.stats.n_nexts += 1;
                self.source.advance()?;
            } else if self.range.is_before_end(&hint) {
                debug!(target: "datefreq::seekflt", "seek {:?}", hint);
                n_nexts = 0;
                self.stats.n_seeks += 1;
                let range = self.range.restart_at(hint);
                self.source.seek(&range, &self.families, self.inclusive)?;
            } else {
                debug!(target: "datefreq::seekflt", "hint {:?} beyond range", hint);
                self.exhausted = true;
                break Ok(());
            }
        }
    }
}

impl<C> Cursor for SeekingScan<C>
where
    C: Cursor,
{
    fn seek(&mut self, range: &Range, families: &[Vec<u8>], inclusive: bool) -> Result<()> {
        self.range = range.clone();
        self.families = families.to_vec();
        self.inclusive = inclusive;
        self.exhausted = false;

        self.source.seek(range, families, inclusive)?;
        self.skip_rejected()
    }

    fn has_top(&self) -> bool {
        !self.exhausted && self.source.has_top()
    }

    fn top_key(&self) -> Option<&Key> {
        if self.exhausted {
            None
        } else {
            self.source.top_key()
        }
    }

    fn top_value(&self) -> Option<&[u8]> {
        if self.exhausted {
            None
        } else {
            self.source.top_value()
        }
    }

    fn advance(&mut self) -> Result<()> {
        if !self.has_top() {
            err_at!(Fatal, msg: "advance on exhausted seeking scan")?
        }
        self.source.advance()?;
        self.skip_rejected()
    }

    fn fork(&self) -> Result<SeekingScan<C>> {
        Ok(SeekingScan {
            source: self.source.fork()?,
            filter: self.filter.clone(),
            max_next_count: self.max_next_count,

            range: self.range.clone(),
            families: self.families.clone(),
            inclusive: self.inclusive,
            exhausted: self.exhausted,

            stats: Stats::default(),
        })
    }
}

impl fmt::Display for SeekingFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let dts: Vec<String> = self
            .datatypes
            .iter()
            .map(|dt| String::from_utf8_lossy(dt).to_string())
            .collect();
        write!(
            f,
            "{}..={} [{}]",
            String::from_utf8_lossy(&self.start_date),
            String::from_utf8_lossy(&self.end_date),
            dts.join(",")
        )
    }
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod filter_test;
