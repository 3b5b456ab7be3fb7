use std::fmt;

use crate::{util, Result};

/// Frequency type, a single counter value.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frequency {
    val: u64,
}

impl From<u64> for Frequency {
    fn from(val: u64) -> Frequency {
        Frequency { val }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.val)
    }
}

impl Frequency {
    #[inline]
    pub fn new(val: u64) -> Frequency {
        Frequency { val }
    }

    /// Add `addend` to this counter, saturates at u64::MAX.
    #[inline]
    pub fn increment(&mut self, addend: u64) {
        self.val = self.val.saturating_add(addend);
    }

    #[inline]
    pub fn to_value(&self) -> u64 {
        self.val
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(util::varint_len(self.val));
        self.encode_into(&mut buf);
        buf
    }

    /// Append the encoded counter to `buf`, return number of bytes appended.
    #[inline]
    pub fn encode_into(&self, buf: &mut Vec<u8>) -> usize {
        util::encode_varint(self.val, buf)
    }

    /// Decode a counter from the head of `buf`. Return (frequency,
    /// bytes-consumed).
    pub fn decode(buf: &[u8]) -> Result<(Frequency, usize)> {
        let (val, n) = util::decode_varint(buf)?;
        Ok((Frequency { val }, n))
    }

    /// Decode a counter that must span the whole of `buf`, like the
    /// value of a raw record.
    pub fn from_bytes(buf: &[u8]) -> Result<Frequency> {
        match Frequency::decode(buf)? {
            (freq, n) if n == buf.len() => Ok(freq),
            (_, n) => err_at!(
                MalformedEncoding, msg: "{} trailing bytes after frequency", buf.len() - n
            ),
        }
    }
}

impl<'a> arbitrary::Arbitrary<'a> for Frequency {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        // bias towards small counts, which is what most records carry.
        let val = match u.arbitrary::<u8>()? % 4 {
            0 => u64::from(u.arbitrary::<u8>()?),
            1 => u64::from(u.arbitrary::<u16>()?),
            2 => u64::from(u.arbitrary::<u32>()?),
            _ => u.arbitrary::<u64>()? >> 1,
        };
        Ok(Frequency { val })
    }
}

#[cfg(test)]
#[path = "frequency_test.rs"]
mod frequency_test;
