// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::rcon::{
    error::{RconError, Result},
    types::{Player, ServerStatus, Timing},
};

const HOST_PREFIX: &str = "host:     ";
const VERSION_PREFIX: &str = "version:  ";
const PROTOCOL_PREFIX: &str = "protocol: ";
const MAP_PREFIX: &str = "map:      ";
const PLAYERS_HEADER_PREFIX: &str = "^2IP";

/// Scans `line` left to right, collecting the first `n` maximal numeric
/// runs (optionally signed, optionally containing one `.`) as `f64`.
fn extract_numbers(line: &str, n: usize) -> Option<Vec<f64>> {
    let bytes = line.as_bytes();
    let mut out = Vec::with_capacity(n);
    let mut i = 0;
    while i < bytes.len() && out.len() < n {
        let negative = bytes[i] == b'-' && i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit();
        if bytes[i].is_ascii_digit() || negative {
            let start = i;
            i += if negative { 1 } else { 0 } + 1;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            if let Ok(v) = line[start..i].parse::<f64>() {
                out.push(v);
            }
        } else {
            i += 1;
        }
    }
    (out.len() == n).then_some(out)
}

fn parse_sv_public(line: &str) -> Result<i32> {
    if !line.starts_with("\"sv_public\"") {
        return Err(RconError::parse("status", line, "expected sv_public line"));
    }
    let nums = extract_numbers(line, 1)
        .ok_or_else(|| RconError::parse("status", line, "no integer found"))?;
    Ok(nums[0] as i32)
}

fn parse_prefixed_field<'a>(line: &'a str, prefix: &str, what: &'static str) -> Result<&'a str> {
    line.strip_prefix(prefix)
        .map(str::trim)
        .ok_or_else(|| RconError::parse("status", line, format!("expected {what} line")))
}

fn parse_timing(line: &str) -> Result<Timing> {
    let rest = line
        .strip_prefix("timing:")
        .ok_or_else(|| RconError::parse("status", line, "expected timing line"))?;
    let nums = extract_numbers(rest, 5)
        .ok_or_else(|| RconError::parse("status", line, "expected five timing floats"))?;
    Ok(Timing {
        cpu: nums[0],
        lost: nums[1],
        offset_avg: nums[2],
        offset_max: nums[3],
        offset_sdev: nums[4],
    })
}

fn parse_player_counts(line: &str) -> Result<(i64, i64)> {
    let rest = line
        .strip_prefix("players:")
        .ok_or_else(|| RconError::parse("status", line, "expected players line"))?;
    let nums = extract_numbers(rest, 2)
        .ok_or_else(|| RconError::parse("status", line, "expected active/max counts"))?;
    Ok((nums[0] as i64, nums[1] as i64))
}

fn parse_player_line(line: &str) -> Result<Player> {
    let rest = line
        .strip_prefix("^3")
        .or_else(|| line.strip_prefix("^7"))
        .ok_or_else(|| RconError::parse("status", line, "player line must start with ^3 or ^7"))?;

    let ip_end = rest
        .find(|c: char| c.is_whitespace())
        .ok_or_else(|| RconError::parse("status", line, "missing whitespace after ip"))?;
    let ip = rest[..ip_end].to_string();
    let mut cur = rest[ip_end..].trim_start();

    let mut fields: Vec<&str> = Vec::with_capacity(5);
    for _ in 0..5 {
        let sp = cur
            .find(|c: char| c.is_whitespace())
            .ok_or_else(|| RconError::parse("status", line, "truncated player fields"))?;
        fields.push(&cur[..sp]);
        cur = cur[sp..].trim_start();
    }

    let name = cur
        .strip_prefix("^7")
        .ok_or_else(|| RconError::parse("status", line, "expected ^7 before name"))?
        .to_string();

    let pl: i32 = fields[0]
        .parse()
        .map_err(|_| RconError::parse("status", line, "invalid pl"))?;
    let ping: i32 = fields[1]
        .parse()
        .map_err(|_| RconError::parse("status", line, "invalid ping"))?;
    let time = fields[2].to_string();
    let frags: i64 = fields[3]
        .parse()
        .map_err(|_| RconError::parse("status", line, "invalid frags"))?;
    let number: i32 = fields[4]
        .strip_prefix('#')
        .ok_or_else(|| RconError::parse("status", line, "expected #no"))?
        .parse()
        .map_err(|_| RconError::parse("status", line, "invalid player number"))?;
    let is_bot = ip == "botclient";

    Ok(Player {
        ip,
        pl,
        ping,
        time,
        frags,
        number,
        name,
        is_bot,
    })
}

/// Parses a full `status` transcript (already split into lines) into a
/// [`ServerStatus`]. States S0..S8 as described in the protocol design.
pub fn parse_status(lines: &[String]) -> Result<ServerStatus> {
    let mut idx = 0usize;
    let mut next = || -> Result<&str> {
        let line = lines
            .get(idx)
            .map(String::as_str)
            .ok_or(RconError::UnexpectedEof("status"))?;
        idx += 1;
        Ok(line)
    };

    let mut status = ServerStatus::default();

    // S0
    status.sv_public = parse_sv_public(next()?)?;

    // S1..S4
    status.host = parse_prefixed_field(next()?, HOST_PREFIX, "host")?.to_string();
    status.version = parse_prefixed_field(next()?, VERSION_PREFIX, "version")?.to_string();
    status.protocol = parse_prefixed_field(next()?, PROTOCOL_PREFIX, "protocol")?.to_string();
    status.map = parse_prefixed_field(next()?, MAP_PREFIX, "map")?.to_string();

    // S5
    status.timing = parse_timing(next()?)?;

    // S6
    let (active, max) = parse_player_counts(next()?)?;
    status.players_active = active;
    status.players_max = max;
    status.players = Vec::new();
    if active == 0 {
        return Ok(status);
    }

    // S7
    let header = next()?;
    if !header.starts_with(PLAYERS_HEADER_PREFIX) {
        return Err(RconError::parse("status", header, "expected ^2IP header"));
    }

    // S8
    for _ in 0..active {
        let line = next()?;
        status.players.push(parse_player_line(line)?);
    }

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rcon::parser::split_lines;

    fn lines_for(transcript: &[u8]) -> Vec<String> {
        split_lines(transcript)
    }

    #[test]
    fn parses_empty_server_status() {
        let transcript = concat!(
            "\"sv_public\" is \"1\"\n",
            "host:     [力] TheRegulars ☠ Instagib Server [git]\n",
            "version:  Xonotic build 12:58:11 Oct  6 2019 - (gamename Xonotic)\n",
            "protocol: 3504 (DP7)\n",
            "map:      dusty_v2r1\n",
            "timing:   0.3% CPU,  0.0% lost,  offset avg 0.0ms, max 0.0ms, sdev 0.0ms\n",
            "players:  0 active (24 max)\n",
        );
        let status = parse_status(&lines_for(transcript.as_bytes())).unwrap();
        assert_eq!(status.sv_public, 1);
        assert_eq!(status.map, "dusty_v2r1");
        assert_eq!(status.host, "[力] TheRegulars ☠ Instagib Server [git]");
        assert_eq!(status.timing.cpu, 0.3);
        assert_eq!(status.timing.offset_sdev, 0.0);
        assert_eq!(status.players_max, 24);
        assert_eq!(status.players_active, 0);
        assert_eq!(status.players.len(), 0);
        assert_eq!(
            status.version,
            "Xonotic build 12:58:11 Oct  6 2019 - (gamename Xonotic)"
        );
        assert_eq!(status.protocol, "3504 (DP7)");
    }

    fn six_player_transcript() -> Vec<u8> {
        concat!(
            "\"sv_public\" is \"-1\"\n",
            "host:     TheRegulars Six Player Test\n",
            "version:  Xonotic build 12:58:11 Oct  6 2019\n",
            "protocol: 3504 (DP7)\n",
            "map:      bloodprison_r3\n",
            "timing:   12.0% CPU,  0.1% lost,  offset avg 1.0ms, max 2.0ms, sdev 0.5ms\n",
            "players:  6 active (16 max)\n",
            "^2IP                                             %pl ping  time   frags  no   name\n",
            "^3botclient                                      0   70  0:05        5 #1   ^7bot1\n",
            "^3127.0.0.1:39707                                0   30  0:12     -666 #2   ^7spec1\n",
            "^387.23.1.2:27960                                1   45  1:02        3 #9   ^7player3\n",
            "^3[3b04:4c9:127:7511:8:0:0:16]:38914             0   60  0:50        7 #10  ^7player4\n",
            "^387.23.1.3:27960                                2   70  3:13:22     2 #11  ^7player5\n",
            "^3local                                          0    1  0:00     -666 #13  ^7player6\n",
        ).as_bytes().to_vec()
    }

    #[test]
    fn parses_six_player_status() {
        let transcript = six_player_transcript();
        let status = parse_status(&split_lines(&transcript)).unwrap();
        assert_eq!(status.sv_public, -1);
        assert_eq!(status.players_active, 6);
        assert_eq!(status.players.len(), 6);

        assert!(status.players[0].is_bot);
        assert_eq!(status.players[0].name, "bot1");
        assert_eq!(status.players[0].ping, 70);

        assert_eq!(status.players[1].ip, "127.0.0.1:39707");
        assert_eq!(status.players[1].frags, -666);
        assert_eq!(status.players[1].number, 2);

        assert_eq!(status.players[3].ip, "[3b04:4c9:127:7511:8:0:0:16]:38914");
        assert_eq!(status.players[3].number, 10);

        assert_eq!(status.players[4].time, "3:13:22");

        assert_eq!(status.players[5].ip, "local");
        assert_eq!(status.players[5].frags, -666);
        assert_eq!(status.players[5].number, 13);
    }

    #[test]
    fn rejects_unexpected_line_at_host_state() {
        let transcript = b"\"sv_public\" is \"1\"\nnot-a-host-line\n";
        let err = parse_status(&split_lines(transcript)).unwrap_err();
        assert!(matches!(err, RconError::Parse { .. }));
    }

    #[test]
    fn truncated_transcript_is_an_error_not_a_panic() {
        let transcript = b"\"sv_public\" is \"1\"\n";
        let err = parse_status(&split_lines(transcript)).unwrap_err();
        assert!(matches!(err, RconError::Parse { .. } | RconError::UnexpectedEof(_)));
    }
}
