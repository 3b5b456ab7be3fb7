//! Text dump of records, one record per line with tab separated fields:
//!
//! ```text
//! row  family  datatype  date  visibility  timestamp  value
//! ```
//!
//! For raw-form records `date` is `yyyyMMdd` and `value` is a count. For
//! aggregated-form records `date` is empty and `value` is a list of
//! `date:count` pairs separated by comma. Blank lines and lines starting
//! with `#` are skipped.

use std::{
    ffi,
    io::{self, BufRead},
};

use datefreq::{err_at, util::files, DateFrequencyMap, Frequency, Key, Result};

pub fn load(file: &ffi::OsStr) -> Result<Vec<(Key, Vec<u8>)>> {
    let fd = files::open_file_r(file)?;

    let mut records = vec![];
    for (lineno, line) in io::BufReader::new(fd).lines().enumerate() {
        let line = err_at!(IOError, line, "file:{:?}", file)?;
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        records.push(parse_line(line, lineno + 1)?);
    }

    Ok(records)
}

fn parse_line(line: &str, lineno: usize) -> Result<(Key, Vec<u8>)> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 7 {
        err_at!(InvalidFormat, msg: "line {} expects 7 fields, got {}", lineno, fields.len())?
    }
    let (row, family, dtype, date) = (fields[0], fields[1], fields[2], fields[3]);
    let visibility = fields[4];
    let ts = err_at!(InvalidFormat, fields[5].trim().parse::<u64>(), "line {}", lineno)?;

    let (key, value) = if date.is_empty() {
        let map = parse_map(fields[6], lineno)?;
        (Key::new(row, family, dtype, visibility, ts), map.serialize())
    } else {
        let n = err_at!(InvalidFormat, fields[6].trim().parse::<u64>(), "line {}", lineno)?;
        let key = Key::new_raw(row, family, dtype, date, visibility, ts);
        (key, Frequency::new(n).encode())
    };

    Ok((key, value))
}

fn parse_map(text: &str, lineno: usize) -> Result<DateFrequencyMap> {
    let mut map = DateFrequencyMap::new();
    for item in text.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
        match item.split_once(':') {
            Some((date, n)) => {
                let n = err_at!(InvalidFormat, n.parse::<u64>(), "line {}", lineno)?;
                map.increment(date, n);
            }
            None => err_at!(InvalidFormat, msg: "line {} bad entry {:?}", lineno, item)?,
        }
    }
    Ok(map)
}
