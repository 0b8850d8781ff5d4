// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Query orchestrator: turns a [`ServerEndpoint`] and a query kind into a
//! typed record, retrying transient failures and fanning out independent
//! queries in parallel.
//!
//! This is the only part of the core most callers need: the HTTP layer
//! never touches [`super::transport`] or [`super::codec`] directly.

use std::{collections::HashMap, future::Future, time::{Duration, SystemTime}};

use tokio::task::JoinSet;
use tracing::warn;

use super::{
    codec,
    error::{RconError, Result},
    parser,
    transport::{Deadline, LineStream, Session},
    types::{AuthMode, Memstats, PlayerStats, ServerEndpoint, ServerInfo, ServerMetrics, ServerStatus},
};

const STATUS_COMMAND: &[u8] = b"sv_public\x00status 1";
const INFO_COMMAND: &[u8] = b"prvm_globalget server worldstatus";
const MEMSTATS_COMMAND: &[u8] = b"memstats";
const SCORES_COMMAND: &[u8] = b"sv_cmd scores";

/// Opens a session, performs the authentication handshake implied by
/// `endpoint.auth_mode`, sends `command`, and drains the demultiplexed
/// reply into lines. Mirrors the `rconExecute` helper of the original
/// implementation, generalized over all three auth modes.
async fn run_rcon_command(
    endpoint: &ServerEndpoint,
    command: &[u8],
    deadline: Deadline,
) -> Result<Vec<String>> {
    let session = Session::connect(&endpoint.host, endpoint.port, deadline).await?;

    let datagram = match endpoint.auth_mode {
        AuthMode::NonSecure => codec::rcon_non_secure(command, &endpoint.password),
        AuthMode::TimeSecure => {
            codec::rcon_secure_time(command, &endpoint.password, SystemTime::now())
        },
        AuthMode::ChallengeSecure => {
            let challenge = session.request_challenge().await?;
            codec::rcon_secure_challenge(command, &endpoint.password, &challenge)
        },
    };
    session.send(&datagram).await?;

    let lines = LineStream::new(&session).collect_lines().await;
    Ok(lines)
}

/// Runs one `status` attempt end to end.
pub async fn query_status_once(endpoint: &ServerEndpoint, deadline: Deadline) -> Result<ServerStatus> {
    let lines = run_rcon_command(endpoint, STATUS_COMMAND, deadline).await?;
    parser::status::parse_status(&lines)
}

/// Runs one `info` (world-status) attempt end to end.
pub async fn query_info_once(endpoint: &ServerEndpoint, deadline: Deadline) -> Result<ServerInfo> {
    let lines = run_rcon_command(endpoint, INFO_COMMAND, deadline).await?;
    let line = lines.first().ok_or(RconError::UnexpectedEof("info"))?;
    parser::info::parse_info(line)
}

/// Runs one `memstats` attempt end to end.
pub async fn query_memstats_once(
    endpoint: &ServerEndpoint,
    deadline: Deadline,
) -> Result<Memstats> {
    let lines = run_rcon_command(endpoint, MEMSTATS_COMMAND, deadline).await?;
    parser::memstats::parse_memstats(&lines)
}

/// Runs one `scores` attempt end to end.
pub async fn query_scores_once(
    endpoint: &ServerEndpoint,
    deadline: Deadline,
) -> Result<super::types::Scores> {
    let lines = run_rcon_command(endpoint, SCORES_COMMAND, deadline).await?;
    parser::scores::parse_scores(&lines)
}

/// Pings `endpoint` once, returning the measured round-trip time.
pub async fn ping_once(endpoint: &ServerEndpoint, deadline: Deadline) -> Result<Duration> {
    let session = Session::connect(&endpoint.host, endpoint.port, deadline).await?;
    session.ping().await
}

/// Runs `attempt` up to `retries` times, each with a fresh `per_attempt`
/// deadline. Succeeds on the first success; returns the last error if
/// every attempt fails. Parse errors are still retried here (a transient
/// truncation can look like a parse error) — the orchestrator's job is
/// only to bound the number of attempts, not to classify them; see
/// [`RconError::is_retryable`] for callers that want to short-circuit.
pub async fn query_with_retries<T, F, Fut>(
    retries: u32,
    per_attempt: Duration,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut(Deadline) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err: Option<RconError> = None;
    for attempt_no in 1..=retries.max(1) {
        let deadline = Deadline::after(per_attempt);
        match attempt(deadline).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(attempt = attempt_no, error = %err, "rcon query attempt failed");
                last_err = Some(err);
            },
        }
    }
    Err(last_err.expect("retries.max(1) guarantees at least one attempt"))
}

/// Launches the three independent metrics queries (status, ping,
/// memstats) in parallel, each with its own retry policy, and aggregates
/// the results. The whole aggregate is considered successful whenever
/// `status` succeeds, regardless of the other two; the first non-nil
/// error is surfaced in priority order `status > ping > memstats`.
pub async fn query_server_metrics(
    endpoint: &ServerEndpoint,
    retries: u32,
    per_attempt: Duration,
) -> (ServerMetrics, Result<()>) {
    let status_fut = query_with_retries(retries, per_attempt, |deadline| {
        query_status_once(endpoint, deadline)
    });
    let ping_fut = query_with_retries(retries, per_attempt, |deadline| ping_once(endpoint, deadline));
    let memstats_fut = query_with_retries(retries, per_attempt, |deadline| {
        query_memstats_once(endpoint, deadline)
    });

    let (status_res, ping_res, memstats_res) = tokio::join!(status_fut, ping_fut, memstats_fut);

    let players_info = status_res
        .as_ref()
        .map(|s| PlayerStats::from_players(&s.players))
        .unwrap_or_default();

    let metrics = ServerMetrics {
        status: status_res.as_ref().ok().cloned(),
        players_info,
        memory: memstats_res.as_ref().ok().cloned(),
        ping_duration: ping_res.as_ref().ok().copied(),
        ping_seconds: ping_res
            .as_ref()
            .ok()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0),
    };

    let outcome = if let Err(status_err) = status_res {
        Err(status_err)
    } else if let Err(ping_err) = ping_res {
        Err(ping_err)
    } else if let Err(memstats_err) = memstats_res {
        Err(memstats_err)
    } else {
        Ok(())
    };

    (metrics, outcome)
}

/// Maps `query_status_once` (with retries) over every server in `servers`
/// in parallel. Per-server failures are silently dropped from the
/// returned map; an absent key signals failure to the caller.
pub async fn query_servers_status(
    servers: &HashMap<String, ServerEndpoint>,
    retries: u32,
    per_attempt: Duration,
) -> HashMap<String, ServerStatus> {
    let mut set = JoinSet::new();
    for (name, endpoint) in servers.clone() {
        set.spawn(async move {
            let result =
                query_with_retries(retries, per_attempt, |deadline| {
                    let endpoint = endpoint.clone();
                    async move { query_status_once(&endpoint, deadline).await }
                })
                .await;
            (name, result)
        });
    }

    let mut out = HashMap::with_capacity(servers.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((name, Ok(status))) => {
                out.insert(name, status);
            },
            Ok((name, Err(err))) => {
                warn!(server = %name, error = %err, "dropping server from fanout result");
            },
            Err(join_err) => {
                warn!(error = %join_err, "rcon fanout task panicked");
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn retries_until_success() {
        let attempts = AtomicU32::new(0);
        let result: Result<i32> = query_with_retries(3, Duration::from_millis(1), |_deadline| {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(RconError::ProtocolMismatch("boom".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_retries_and_returns_last_error() {
        let result: Result<i32> = query_with_retries(2, Duration::from_millis(1), |_deadline| async {
            Err(RconError::ProtocolMismatch("nope".into()))
        })
        .await;
        assert!(result.is_err());
    }
}
