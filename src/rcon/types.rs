// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Typed records produced by the line parsers and the query orchestrator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Authentication mode negotiated with one server.
///
/// Serializes as the bare integer DarkPlaces configs use (`rcon_mode: 0|1|2`),
/// not as a variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[repr(u8)]
#[serde(try_from = "u8", into = "u8")]
pub enum AuthMode {
    NonSecure = 0,
    TimeSecure = 1,
    ChallengeSecure = 2,
}

impl TryFrom<u8> for AuthMode {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AuthMode::NonSecure),
            1 => Ok(AuthMode::TimeSecure),
            2 => Ok(AuthMode::ChallengeSecure),
            other => Err(anyhow::anyhow!("invalid rcon_mode: {other}")),
        }
    }
}

impl From<AuthMode> for u8 {
    fn from(mode: AuthMode) -> Self {
        mode as u8
    }
}

impl Default for AuthMode {
    fn default() -> Self {
        AuthMode::TimeSecure
    }
}

/// Immutable description of one RCON-reachable game server.
#[derive(Debug, Clone)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub auth_mode: AuthMode,
}

/// One timing/telemetry sample reported by the `status` command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub cpu: f64,
    pub lost: f64,
    pub offset_avg: f64,
    pub offset_max: f64,
    pub offset_sdev: f64,
}

/// One row of the `status` scoreboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    #[serde(skip)]
    pub ip: String,
    pub pl: i32,
    pub ping: i32,
    pub time: String,
    pub frags: i64,
    #[serde(rename = "no")]
    pub number: i32,
    pub name: String,
    pub is_bot: bool,
}

impl Player {
    pub fn is_spectator(&self) -> bool {
        self.frags == -666
    }
}

/// Result of a successful `status` query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub sv_public: i32,
    pub host: String,
    pub version: String,
    pub protocol: String,
    pub map: String,
    pub timing: Timing,
    #[serde(rename = "players_count")]
    pub players_active: i64,
    pub players_max: i64,
    #[serde(default)]
    pub players: Vec<Player>,
}

/// Result of a successful `prvm_globalget server worldstatus` query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub gametype: String,
    pub version: String,
    pub pure_changes_count: i64,
    pub join_allowed_count: i64,
    pub server_flags: i32,
    pub terms_of_service: String,
    pub mod_name: String,
    pub score_string: String,
}

/// Result of a successful `memstats` query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Memstats {
    pub pools_count: i32,
    pub pools_total: i64,
    pub total_allocated_size: i64,
}

/// Result of a successful scoreboard (`:labels:`/`:player:`/`:teamscores:`)
/// query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub gametype: String,
    pub map: String,
    pub game_time: i64,
    pub player_labels: Vec<String>,
    pub team_labels: Vec<String>,
    pub players: Vec<PlayerScore>,
    /// Team scores keyed by team id (1..=15).
    pub teams: std::collections::BTreeMap<i32, Vec<i64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerScore {
    pub values: Vec<i64>,
    pub score_total: String,
    pub team: String,
    pub number: String,
    pub name: String,
}

/// Bot/spectator/active breakdown derived from a `ServerStatus`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub bots: usize,
    pub spectators: usize,
    pub active: usize,
}

impl PlayerStats {
    pub fn from_players(players: &[Player]) -> Self {
        let mut stats = PlayerStats::default();
        for p in players {
            if p.is_bot {
                stats.bots += 1;
            }
            if p.is_spectator() {
                stats.spectators += 1;
            } else {
                stats.active += 1;
            }
        }
        stats
    }
}

/// Aggregate of the three independent per-server metrics queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerMetrics {
    pub status: Option<ServerStatus>,
    pub players_info: PlayerStats,
    pub memory: Option<Memstats>,
    #[serde(skip)]
    pub ping_duration: Option<Duration>,
    pub ping_seconds: f64,
}
