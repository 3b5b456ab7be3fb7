//! Package `datefreq` implement streaming aggregation of per-date
//! frequency records, read from a sorted key-value cursor.
//!
//! Records are identified by a [Key] of `row`, `family`, `qualifier`,
//! `visibility` and `timestamp`. A raw-form record has a qualifier of
//! `datatype NUL yyyyMMdd` and counts occurrences of that datatype on
//! that date. An aggregated-form record has a qualifier of `datatype` and
//! its value is a serialized [DateFrequencyMap].
//!
//! Components are stacked as cursors, each consuming the one below it:
//!
//! ```text
//! source cursor -> SeekingScan (optional) -> Aggregator -> consumer
//! ```
//!
//! * [SeekingScan] skips records outside a datatype set and an inclusive
//!   date window, seeking the source ahead instead of reading through
//!   rejected ranges.
//! * [Aggregator] collapses every `(row, family, datatype)` group into
//!   one record per visibility label, or into a single record when
//!   visibility labels are combined, refer to [Combiner].
//!
//! [MemCursor] is an in-memory sorted source for tools and tests.
//! Components are single threaded, independent instances for parallel
//! scans are created with [Cursor::fork].

#[macro_use]
mod error;
#[macro_use]
pub mod util;

pub mod aggregator;
pub mod cursor;
pub mod filter;
mod freq;
mod key;
pub mod visibility;

pub use crate::aggregator::Aggregator;
pub use crate::cursor::{Cursor, Entries, MemCursor};
pub use crate::error::{Error, Result};
pub use crate::filter::{Decision, SeekingFilter, SeekingScan};
pub use crate::freq::{DateFrequencyMap, Frequency};
pub use crate::key::{Key, Qualifier, Range};
pub use crate::visibility::{AndCombiner, Combiner};

/// Key helpers for composing qualifiers and seek keys.
pub mod keys {
    pub use crate::key::{prefix_successor, raw_qualifier, SEPARATOR};
}
