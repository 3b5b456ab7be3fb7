//! Module implement common utility functions and types.

use std::ops::{Bound, RangeBounds};

use crate::Result;

pub mod dates;
pub mod files;

/// Maximum number of bytes a varint encoded u64 can take.
pub const MAX_VARINT_LEN: usize = 10;

#[macro_export]
macro_rules! check_remaining {
    ($buf:expr, $want:expr, $msg:expr) => {
        if $buf.len() < $want {
            err_at!(
                MalformedEncoding, msg: "insufficient input {}/{} ({})", $msg, $buf.len(), $want
            )
        } else {
            Ok(())
        }
    };
}

/// Encode `val` as little-endian base-128 varint and append to `buf`.
/// Each byte carries 7 bits of payload, high bit set when more bytes
/// follow. Return the number of bytes appended.
pub fn encode_varint(mut val: u64, buf: &mut Vec<u8>) -> usize {
    let mut n = 1;
    while val >= 0x80 {
        buf.push(((val as u8) & 0x7f) | 0x80);
        val >>= 7;
        n += 1;
    }
    buf.push(val as u8);
    n
}

/// Decode a varint from the head of `buf`. Return (value, bytes-consumed).
pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize)> {
    let mut val: u64 = 0;
    for (i, byte) in buf.iter().enumerate() {
        if i >= MAX_VARINT_LEN {
            break;
        }
        let bits = u64::from(byte & 0x7f);
        // the tenth byte may only carry the single remaining bit.
        if i == MAX_VARINT_LEN - 1 && bits > 1 {
            err_at!(MalformedEncoding, msg: "varint overflows u64 {:?}", &buf[..=i])?
        }
        val |= bits << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((val, i + 1));
        }
    }

    match buf.len() {
        n if n >= MAX_VARINT_LEN => {
            err_at!(MalformedEncoding, msg: "varint longer than {} bytes", MAX_VARINT_LEN)
        }
        n => err_at!(MalformedEncoding, msg: "truncated varint after {} bytes", n),
    }
}

/// Number of bytes `val` shall take when varint encoded.
pub fn varint_len(val: u64) -> usize {
    let bits = 64 - (val | 1).leading_zeros() as usize;
    (bits + 6) / 7
}

pub fn to_start_end<G, K>(within: G) -> (Bound<K>, Bound<K>)
where
    K: Clone,
    G: RangeBounds<K>,
{
    let start = match within.start_bound() {
        Bound::Included(val) => Bound::Included(val.clone()),
        Bound::Excluded(val) => Bound::Excluded(val.clone()),
        Bound::Unbounded => Bound::Unbounded,
    };
    let end = match within.end_bound() {
        Bound::Included(val) => Bound::Included(val.clone()),
        Bound::Excluded(val) => Bound::Excluded(val.clone()),
        Bound::Unbounded => Bound::Unbounded,
    };
    (start, end)
}

/// Parse a boolean option value, accepting `true`/`false` in any case.
pub fn parse_bool(name: &str, val: &str) -> Result<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => err_at!(InvalidConfig, msg: "option {} expects a boolean, got {:?}", name, val),
    }
}
