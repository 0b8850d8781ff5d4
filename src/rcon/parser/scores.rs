// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::BTreeMap;

use crate::rcon::{
    error::{RconError, Result},
    types::{PlayerScore, Scores},
};

const PLAYER_LABELS_PREFIX: &str = ":labels:player:";
const PLAYER_PREFIX: &str = ":player:see-labels:";
const TEAM_LABELS_PREFIX: &str = ":labels:teamscores:";
const TEAMSCORE_PREFIX: &str = ":teamscores:see-labels:";
const END_LINE: &str = ":end";

/// Strips a leading `^<digit>` Quake color code, if present. Scoreboard
/// player lines are sometimes prefixed with one before the `:player:`
/// directive.
fn strip_leading_color(line: &str) -> &str {
    let bytes = line.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'^' && bytes[1].is_ascii_digit() {
        &line[2..]
    } else {
        line
    }
}

/// Parses `:status:<gametype>_<map>:<gametime>`, splitting on the
/// **first** `_` so a map name may itself contain underscores (e.g.
/// `ctf_Spectrum_2` -> gametype `ctf`, map `Spectrum_2`).
fn parse_status_line(line: &str) -> Result<(String, String, i64)> {
    let parts: Vec<&str> = line.splitn(4, ':').collect();
    if parts.len() != 4 || !parts[0].is_empty() || parts[1] != "status" {
        return Err(RconError::parse("scores", line, "expected :status: line"));
    }
    let (gametype, map) = parts[2]
        .split_once('_')
        .ok_or_else(|| RconError::parse("scores", line, "expected gametype_map"))?;
    let game_time = parts[3]
        .parse()
        .map_err(|_| RconError::parse("scores", line, "invalid game time"))?;
    Ok((gametype.to_string(), map.to_string(), game_time))
}

fn parse_csv_labels(line: &str, prefix: &str) -> Result<Vec<String>> {
    line.strip_prefix(prefix)
        .map(|rest| rest.split(',').map(str::to_string).collect())
        .ok_or_else(|| RconError::parse("scores", line, format!("expected {prefix} line")))
}

/// Parses a comma-separated list of i64 values; an empty string yields an
/// empty list rather than a single failed parse of `""` (teams with no
/// recorded score still emit an empty-csv line).
fn parse_csv_i64(csv: &str, line: &str) -> Result<Vec<i64>> {
    if csv.is_empty() {
        return Ok(Vec::new());
    }
    csv.split(',')
        .map(|v| v.parse().map_err(|_| RconError::parse("scores", line, "invalid numeric value")))
        .collect()
}

fn parse_player_line(line: &str) -> Result<PlayerScore> {
    let rest = strip_leading_color(line)
        .strip_prefix(PLAYER_PREFIX)
        .ok_or_else(|| RconError::parse("scores", line, "expected :player:see-labels: line"))?;
    let parts: Vec<&str> = rest.splitn(5, ':').collect();
    if parts.len() != 5 {
        return Err(RconError::parse("scores", line, "expected 5 player fields"));
    }
    Ok(PlayerScore {
        values: parse_csv_i64(parts[0], line)?,
        score_total: parts[1].to_string(),
        team: parts[2].to_string(),
        number: parts[3].to_string(),
        name: parts[4].to_string(),
    })
}

/// Parses `:teamscores:see-labels:<csv>:<team-id>` — the csv comes first,
/// the team id (1..15) last, so the split is anchored on the **last** `:`.
fn parse_teamscore_line(line: &str) -> Result<(i32, Vec<i64>)> {
    let rest = line
        .strip_prefix(TEAMSCORE_PREFIX)
        .ok_or_else(|| RconError::parse("scores", line, "expected :teamscores:see-labels: line"))?;
    let (csv, team) = rest
        .rsplit_once(':')
        .ok_or_else(|| RconError::parse("scores", line, "missing team id"))?;
    let team: i32 = team
        .parse()
        .map_err(|_| RconError::parse("scores", line, "invalid team id"))?;
    Ok((team, parse_csv_i64(csv, line)?))
}

/// Parses a `scores` transcript: a `:status:` record, a player section
/// bracketed by `:labels:player:`/`:labels:teamscores:`, a team section
/// terminated by `:end`.
pub fn parse_scores(lines: &[String]) -> Result<Scores> {
    let mut idx = 0usize;
    let mut next = || -> Result<&str> {
        let line = lines
            .get(idx)
            .map(String::as_str)
            .ok_or(RconError::UnexpectedEof("scores"))?;
        idx += 1;
        Ok(line)
    };

    let (gametype, map, game_time) = parse_status_line(next()?)?;
    let player_labels = parse_csv_labels(next()?, PLAYER_LABELS_PREFIX)?;

    let mut players = Vec::new();
    loop {
        let line = lines
            .get(idx)
            .map(String::as_str)
            .ok_or(RconError::UnexpectedEof("scores"))?;
        if line.starts_with(TEAM_LABELS_PREFIX) {
            break;
        }
        players.push(parse_player_line(line)?);
        idx += 1;
    }

    let team_labels = parse_csv_labels(next()?, TEAM_LABELS_PREFIX)?;

    let mut teams = BTreeMap::new();
    loop {
        let line = lines
            .get(idx)
            .map(String::as_str)
            .ok_or(RconError::UnexpectedEof("scores"))?;
        if line == END_LINE {
            break;
        }
        let (team, values) = parse_teamscore_line(line)?;
        teams.insert(team, values);
        idx += 1;
    }

    Ok(Scores {
        gametype,
        map,
        game_time,
        player_labels,
        team_labels,
        players,
        teams,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rcon::parser::split_lines;

    /// Byte-exact `playerScores` transcript from the original
    /// implementation's rcon test fixtures.
    fn ctf_transcript() -> Vec<u8> {
        concat!(
            ":status:ctf_Spectrum_2:122\n",
            ":labels:player:score!!,caps!,accuracy,,captime<,drops<,fckills,pickups,returns,deaths<,dmg,dmgtaken<,,,elo,,,,,,,,,,,,,,,kills,,,,,,,,,,,,,,spawnkilled,spawnkills,suicides<,,teamkills<\n",
            ":player:see-labels:0,0,0,0,0,0,0,0,0,0,0,0,0,0,-2,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0:117:spectator:1:https://somelink.example\n",
            ":player:see-labels:40,1,9.999999,0,824,5,3,5,0,3,400,300,0,0,707.101013,0,0,0,0,0,0,0,0,0,0,0,0,0,0,4,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0:118:5:2:foobar\n",
            ":player:see-labels:49,1,29,0,499,6,4,8,3,6,400,600,0,0,1630.641602,0,0,0,0,0,0,0,0,0,0,0,0,0,0,4,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0:118:14:3:Player nick\n",
            ":player:see-labels:8,0,4,0,0,1,1,1,1,7,100,700,0,0,535.887085,0,0,0,0,0,0,0,0,0,0,0,0,0,0,1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0:98:14:4:Player3\n",
            ":player:see-labels:8,0,13,0,0,2,1,3,1,2,200,200,0,0,-2,0,0,0,0,0,0,0,0,0,0,0,0,0,0,2,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0:97:5:5:Player4\n",
            "^7:player:see-labels:43,1,22.999998,0,1520,0,2,1,2,0,700,0,0,0,766.241943,0,0,0,0,0,0,0,0,0,0,0,0,0,0,7,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0:116:5:6:Nick\n",
            ":labels:teamscores:caps!!,score\n",
            ":teamscores:see-labels::1\n",
            ":teamscores:see-labels::2\n",
            ":teamscores:see-labels::3\n",
            ":teamscores:see-labels::4\n",
            ":teamscores:see-labels:2,91:5\n",
            ":teamscores:see-labels::6\n",
            ":teamscores:see-labels::7\n",
            ":teamscores:see-labels::8\n",
            ":teamscores:see-labels::9\n",
            ":teamscores:see-labels::10\n",
            ":teamscores:see-labels::11\n",
            ":teamscores:see-labels::12\n",
            ":teamscores:see-labels::13\n",
            ":teamscores:see-labels:1,57:14\n",
            ":teamscores:see-labels::15\n",
            ":end\n",
            "stats dumped.\n",
        )
        .as_bytes()
        .to_vec()
    }

    #[test]
    fn parses_ctf_scores_transcript() {
        let scores = parse_scores(&split_lines(&ctf_transcript())).unwrap();
        assert_eq!(scores.gametype, "ctf");
        assert_eq!(scores.map, "Spectrum_2");
        assert_eq!(scores.game_time, 122);
        assert_eq!(scores.players.len(), 6);
        assert_eq!(scores.players[1].name, "foobar");
        assert_eq!(scores.players[1].team, "5");
        assert_eq!(scores.players[1].number, "2");
        assert_eq!(scores.teams.get(&5), Some(&vec![2, 91]));
        assert_eq!(scores.teams.get(&14), Some(&vec![1, 57]));
        assert_eq!(scores.teams.get(&1), Some(&vec![]));
    }

    #[test]
    fn tolerates_color_coded_player_lines() {
        let transcript = concat!(
            ":status:ctf_Spectrum_2:122\n",
            ":labels:player:caps,pickups,fckills,returns,drops\n",
            "^3:player:see-labels:2,5,1,3,0:91:5:1:Alice\n",
            ":labels:teamscores:caps,score\n",
            ":end\n",
        );
        let scores = parse_scores(&split_lines(transcript.as_bytes())).unwrap();
        assert_eq!(scores.players.len(), 1);
        assert_eq!(scores.players[0].name, "Alice");
    }

    #[test]
    fn rejects_missing_end_marker() {
        let mut transcript = ctf_transcript();
        let end_pos = transcript
            .windows(5)
            .position(|w| w == b":end\n")
            .unwrap();
        transcript.truncate(end_pos);
        let err = parse_scores(&split_lines(&transcript)).unwrap_err();
        assert!(matches!(err, RconError::UnexpectedEof(_)));
    }
}
