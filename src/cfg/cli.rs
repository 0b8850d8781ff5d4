// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Command-line interface: config path, listen address and graceful
//! shutdown grace period.

use std::{net::IpAddr, path::PathBuf, time::Duration};

use clap::Parser;

fn parse_duration_secs(s: &str) -> Result<Duration, String> {
    let secs: u64 = s.parse().map_err(|_| format!("invalid seconds: {s}"))?;
    Ok(Duration::from_secs(secs))
}

/// HTTP exporter aggregating RCON status from one or more Xonotic servers.
#[derive(Debug, Parser)]
#[command(name = "xonotic-api", version, about)]
pub struct Cli {
    /// Path to the YAML configuration file.
    pub config: PathBuf,

    /// Listen address; binds all interfaces by default.
    #[arg(long = "addr", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// HTTP listen port.
    #[arg(long = "port", default_value_t = 8080)]
    pub port: u16,

    /// Timeout (seconds) for graceful shutdown after SIGINT/SIGTERM/SIGQUIT.
    #[arg(long = "shutdown-timeout", value_parser = parse_duration_secs, default_value = "10")]
    pub shutdown_timeout: Duration,

    /// Per-attempt deadline (milliseconds) for each RCON query.
    #[arg(long = "query-timeout-ms", default_value_t = 1000)]
    pub query_timeout_ms: u64,

    /// Number of attempts per RCON query before giving up.
    #[arg(long = "query-retries", default_value_t = 3)]
    pub query_retries: u32,
}

impl Cli {
    /// Parses `std::env::args`; clap reports usage errors and exits the
    /// process with code 2 on malformed arguments.
    pub fn parse_args() -> Cli {
        Cli::parse()
    }
}
