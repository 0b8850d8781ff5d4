// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::rcon::{
    error::{RconError, Result},
    types::Memstats,
};

/// Extracts the first maximal run of ASCII digits found in `line`.
fn first_integer(line: &str) -> Option<i64> {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            return line[start..i].parse().ok();
        }
        i += 1;
    }
    None
}

/// Parses the two-line `memstats` transcript. Any trailing parenthesized
/// human-readable size is ignored because we only ever take the first
/// integer run on each line.
pub fn parse_memstats(lines: &[String]) -> Result<Memstats> {
    let pools_line = lines
        .first()
        .ok_or(RconError::UnexpectedEof("memstats"))?;
    let mut nums = integers(pools_line);
    let pools_count = nums
        .next()
        .ok_or_else(|| RconError::parse("memstats", pools_line, "missing pool count"))?;
    let pools_total = nums
        .next()
        .ok_or_else(|| RconError::parse("memstats", pools_line, "missing pool total"))?;

    let total_line = lines
        .get(1)
        .ok_or(RconError::UnexpectedEof("memstats"))?;
    let total_allocated_size = first_integer(total_line)
        .ok_or_else(|| RconError::parse("memstats", total_line, "missing allocated size"))?;

    Ok(Memstats {
        pools_count: pools_count as i32,
        pools_total,
        total_allocated_size,
    })
}

fn integers(line: &str) -> impl Iterator<Item = i64> + '_ {
    let bytes = line.as_bytes();
    let mut i = 0;
    std::iter::from_fn(move || {
        while i < bytes.len() {
            if bytes[i].is_ascii_digit() {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                if let Ok(v) = line[start..i].parse::<i64>() {
                    return Some(v);
                }
                continue;
            }
            i += 1;
        }
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rcon::parser::split_lines;

    #[test]
    fn parses_canonical_memstats() {
        let transcript = concat!(
            "286 memory pools, totalling 352844962 bytes (336.5MB)\n",
            " total allocated size: 1180312470 bytes (1125.7MB)\n",
        );
        let stats = parse_memstats(&split_lines(transcript.as_bytes())).unwrap();
        assert_eq!(stats.pools_count, 286);
        assert_eq!(stats.pools_total, 352844962);
        assert_eq!(stats.total_allocated_size, 1180312470);
    }
}
