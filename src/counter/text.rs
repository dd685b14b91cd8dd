//! Line-oriented `key<TAB>value` persistence.
//!
//! ```text
//! # comment lines start with '#'
//! the	42
//! cat	0.5
//! ```
//!
//! Values are written with Rust's shortest round-trip float formatting, so
//! reading back a written counter reproduces every value bit for bit.  A
//! repeated key keeps the last value read.

use std::fmt::{Display, Write as _};
use std::hash::Hash;
use std::io::{BufRead, Write};
use std::str::FromStr;

use super::{ClassicCounter, Counter};
use crate::error::{Error, Result};

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains(['\t', '\n', '\r']) || key.starts_with('#') {
        return Err(Error::UnencodableKey(key.to_owned()));
    }
    Ok(())
}

/// Renders `counter` as text.  Entries appear in the counter's iteration
/// order.
pub fn to_text<K, C>(counter: &C) -> Result<String>
where
    K: Hash + Eq + Clone + Display,
    C: Counter<K>,
{
    let mut out = String::new();
    let mut bad_key = None;
    counter.for_each_entry(|k, v| {
        if bad_key.is_some() {
            return;
        }
        let key = k.to_string();
        if let Err(e) = check_key(&key) {
            bad_key = Some(e);
            return;
        }
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{key}\t{v}");
    });
    match bad_key {
        Some(e) => Err(e),
        None => Ok(out),
    }
}

/// Writes `counter` to `w`.  Nothing is written if any key is unencodable.
pub fn write_counter<K, C, W>(counter: &C, mut w: W) -> Result<()>
where
    K: Hash + Eq + Clone + Display,
    C: Counter<K>,
    W: Write,
{
    let text = to_text(counter)?;
    w.write_all(text.as_bytes())?;
    w.flush()?;
    Ok(())
}

/// Parses one non-comment line.  `line_no` is 1-based.
fn parse_line<K: FromStr>(line_no: usize, line: &str) -> Result<(K, f64)> {
    let malformed = || Error::MalformedLine {
        line: line_no,
        content: line.to_owned(),
    };
    let mut parts = line.split('\t');
    let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(malformed());
    };
    if key.is_empty() {
        return Err(malformed());
    }
    let key = key.parse::<K>().map_err(|_| malformed())?;
    let value = value.trim().parse::<f64>().map_err(|_| Error::InvalidValue {
        line: line_no,
        value: value.to_owned(),
    })?;
    Ok((key, value))
}

/// Parses text produced by [`to_text`].
///
/// Comment lines are skipped and trailing blank lines are tolerated; any
/// other line that is not exactly one tab-separated pair is an error naming
/// its line number.
pub fn parse_counter<K>(text: &str) -> Result<ClassicCounter<K>>
where
    K: Hash + Eq + Clone + FromStr,
{
    let lines: Vec<&str> = text.lines().collect();
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(0, |i| i + 1);

    let mut counter = ClassicCounter::with_capacity(end);
    for (i, line) in lines[..end].iter().enumerate() {
        if line.starts_with('#') {
            continue;
        }
        let (key, value) = parse_line(i + 1, line)?;
        counter.set_count(key, value);
    }
    Ok(counter)
}

/// Reads a counter from `reader`.  See [`parse_counter`].
pub fn read_counter<K, R>(mut reader: R) -> Result<ClassicCounter<K>>
where
    K: Hash + Eq + Clone + FromStr,
    R: BufRead,
{
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse_counter(&text)
}
