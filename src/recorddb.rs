// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Reader for the DarkPlaces flat-file key/value record database:
//! backslash-delimited `\key\value` pairs, URL-escaped values, merged
//! across files keeping the lower `captimerecord/time` per map.

use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, Result};
use serde::Serialize;

const CAPTIME_NETNAME_SUFFIX: &str = "/captimerecord/netname";
const CAPTIME_TIME_SUFFIX: &str = "/captimerecord/time";

/// Best known capture-the-flag time for one map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordItem {
    pub name: String,
    pub val: f64,
}

/// Map name -> best record, accumulated while reading one or more DB
/// files.
pub type Records = HashMap<String, RecordItem>;

/// Parses one `\key\value\key\value...` flat file into a sequence of
/// `(key, value)` pairs with `value` URL-unescaped. A record terminates
/// at an unescaped newline; a key/value pair is delimited by `\`.
fn parse_entries(content: &[u8]) -> Vec<(String, String)> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        SeenNewline,
        Key,
        Value,
    }

    let mut state = State::SeenNewline;
    let mut key = Vec::new();
    let mut value = Vec::new();
    let mut out = Vec::new();

    let mut consume = |key: &mut Vec<u8>, value: &mut Vec<u8>, out: &mut Vec<(String, String)>| {
        if key.is_empty() && value.is_empty() {
            return;
        }
        let key_str = String::from_utf8_lossy(key).into_owned();
        let value_str = urlencoding::decode(&String::from_utf8_lossy(value))
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(value).into_owned());
        out.push((key_str, value_str));
        key.clear();
        value.clear();
    };

    for &b in content {
        match b {
            b'\n' => {
                consume(&mut key, &mut value, &mut out);
                state = State::SeenNewline;
            },
            b'\\' => match state {
                State::SeenNewline => state = State::Key,
                State::Key => state = State::Value,
                State::Value => {
                    consume(&mut key, &mut value, &mut out);
                    state = State::Key;
                },
            },
            _ => match state {
                State::Key => key.push(b),
                State::Value => value.push(b),
                State::SeenNewline => {},
            },
        }
    }
    out
}

fn apply_entry(records: &mut Records, key: &str, value: &str) {
    if let Some(mapname) = key.strip_suffix(CAPTIME_NETNAME_SUFFIX) {
        records
            .entry(mapname.to_string())
            .or_default()
            .name = value.to_string();
    } else if let Some(mapname) = key.strip_suffix(CAPTIME_TIME_SUFFIX) {
        if let Ok(val) = value.parse::<f64>() {
            records.entry(mapname.to_string()).or_default().val = val;
        }
    }
}

/// Reads one gamedb file into a fresh [`Records`] map.
pub fn read_xonotic_db(path: &Path) -> Result<Records> {
    let content = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut records = Records::new();
    for (key, value) in parse_entries(&content) {
        apply_entry(&mut records, &key, &value);
    }
    Ok(records)
}

/// Merges `incoming` into `main`, keeping the lower `val` (time) per map
/// and the `name` that came with it.
pub fn merge_records(main: &mut Records, incoming: Records) {
    for (mapname, item) in incoming {
        match main.get(&mapname) {
            Some(existing) if existing.val <= item.val => {},
            _ => {
                main.insert(mapname, item);
            },
        }
    }
}

/// Reads and merges every file in `paths`, keeping the lower time per
/// map across all of them.
pub fn read_captime_records(paths: &[String]) -> Result<Records> {
    let mut records = Records::new();
    for path in paths {
        let incoming = read_xonotic_db(Path::new(path))?;
        merge_records(&mut records, incoming);
    }
    Ok(records)
}

/// Filters a merged record set down to the maps present in `known_maps`.
pub fn filter_known_maps(records: Records, known_maps: &std::collections::HashSet<String>) -> Records {
    records
        .into_iter()
        .filter(|(mapname, _)| known_maps.contains(mapname))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_escaped_key_value_pairs() {
        let content = b"\\dustyhill/captimerecord/netname\\Some%20Player\\dustyhill/captimerecord/time\\12.5\n";
        let entries = parse_entries(content);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "dustyhill/captimerecord/netname");
        assert_eq!(entries[0].1, "Some Player");
        assert_eq!(entries[1].1, "12.5");
    }

    #[test]
    fn merge_keeps_lower_time_and_matching_netname() {
        let mut main = Records::new();
        main.insert(
            "dustyhill".to_string(),
            RecordItem { name: "Alice".to_string(), val: 20.0 },
        );
        let mut incoming = Records::new();
        incoming.insert(
            "dustyhill".to_string(),
            RecordItem { name: "Bob".to_string(), val: 15.0 },
        );
        merge_records(&mut main, incoming);
        assert_eq!(main["dustyhill"].name, "Bob");
        assert_eq!(main["dustyhill"].val, 15.0);
    }

    #[test]
    fn merge_keeps_existing_when_it_is_already_lower() {
        let mut main = Records::new();
        main.insert(
            "dustyhill".to_string(),
            RecordItem { name: "Alice".to_string(), val: 10.0 },
        );
        let mut incoming = Records::new();
        incoming.insert(
            "dustyhill".to_string(),
            RecordItem { name: "Bob".to_string(), val: 15.0 },
        );
        merge_records(&mut main, incoming);
        assert_eq!(main["dustyhill"].name, "Alice");
    }

    #[test]
    fn filters_to_known_maps() {
        let mut records = Records::new();
        records.insert("known".to_string(), RecordItem::default());
        records.insert("unknown".to_string(), RecordItem::default());
        let mut known = std::collections::HashSet::new();
        known.insert("known".to_string());
        let filtered = filter_known_maps(records, &known);
        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key("known"));
    }
}
