//! Module `freq` implement the counter types persisted as record values.
//!
//! [Frequency] is a single non-negative counter and [DateFrequencyMap]
//! is an ordered mapping of `yyyyMMdd` date-string to Frequency.
//!
//! **Encoding**
//!
//! Frequency is encoded as a little-endian base-128 varint, smaller
//! counts take fewer bytes. DateFrequencyMap is encoded as,
//!
//! ```text
//! varint(entry-count)
//! { varint(date-len) date-bytes varint(count) } * entry-count
//! ```
//!
//! with entries in ascending date order, so that the same logical
//! content always serializes to the same bytes.

mod frequency;
mod map;

pub use frequency::Frequency;
pub use map::DateFrequencyMap;
