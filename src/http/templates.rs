// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Prometheus-text and HTML rendering for `/metrics` and `/exporters`.
//!
//! The original implementation drives these from `html/template` and
//! `text/template`; the teacher's dependency set carries no template
//! engine, so both are rendered with plain `format!`, one block per
//! optional sub-record, matching the original's `{{if .Metrics.Status}}`
//! conditional sections.

use std::fmt::Write as _;

use crate::rcon::ServerMetrics;

/// Renders the Prometheus text exposition format for one server's
/// metrics. Each optional sub-block (`status`, `memory`) is rendered
/// only when present, mirroring the partial-success contract of
/// [`crate::rcon::orchestrator::query_server_metrics`].
pub fn render_metrics(name: &str, hostname: &str, metrics: &ServerMetrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# server: {name}");

    if let Some(status) = &metrics.status {
        let _ = writeln!(out, "# hostname: {}", status.host);
        let _ = writeln!(out, "# map: {}", status.map);
        let _ = writeln!(out, "xonotic_sv_public{{instance=\"{name}\"}} {}", status.sv_public);
        let _ = writeln!(out);
        let _ = writeln!(out, "# Players info");
        let _ = writeln!(
            out,
            "xonotic_players_count{{instance=\"{name}\"}} {}",
            status.players_active
        );
        let _ = writeln!(
            out,
            "xonotic_players_max{{instance=\"{name}\"}} {}",
            status.players_max
        );
        let _ = writeln!(
            out,
            "xonotic_players_bots{{instance=\"{name}\"}} {}",
            metrics.players_info.bots
        );
        let _ = writeln!(
            out,
            "xonotic_players_spectators{{instance=\"{name}\"}} {}",
            metrics.players_info.spectators
        );
        let _ = writeln!(
            out,
            "xonotic_players_active{{instance=\"{name}\"}} {}",
            metrics.players_info.active
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "# Performance timings");
        let _ = writeln!(out, "xonotic_timing_cpu{{instance=\"{name}\"}} {}", status.timing.cpu);
        let _ = writeln!(out, "xonotic_timing_lost{{instance=\"{name}\"}} {}", status.timing.lost);
        let _ = writeln!(
            out,
            "xonotic_timing_offset_avg{{instance=\"{name}\"}} {}",
            status.timing.offset_avg
        );
        let _ = writeln!(out, "xonotic_timing_max{{instance=\"{name}\"}} {}", status.timing.offset_max);
        let _ = writeln!(out, "xonotic_timing_sdev{{instance=\"{name}\"}} {}", status.timing.offset_sdev);
        let _ = writeln!(out);
    }

    if let Some(memory) = &metrics.memory {
        let _ = writeln!(out, "# Memory");
        let _ = writeln!(
            out,
            "xonotic_memstats_pools_count{{instance=\"{name}\"}} {}",
            memory.pools_count
        );
        let _ = writeln!(
            out,
            "xonotic_memstats_pools_total{{instance=\"{name}\"}} {}",
            memory.pools_total
        );
        let _ = writeln!(
            out,
            "xonotic_memstats_allocated_size{{instance=\"{name}\"}} {}",
            memory.total_allocated_size
        );
        let _ = writeln!(out);
    }

    let ping_duration = metrics
        .ping_duration
        .map(|d| format!("{d:?}"))
        .unwrap_or_else(|| "n/a".to_string());
    let _ = writeln!(out, "# Network rtt {ping_duration}");
    let _ = writeln!(
        out,
        "xonotic_rtt{{instance=\"{name}\", from=\"{hostname}\"}} {}",
        metrics.ping_seconds
    );

    out
}

/// Renders the `/exporters` HTML index: one link per configured server.
pub fn render_exporters_index(server_names: &[String]) -> String {
    let mut links = String::new();
    for name in server_names {
        let _ = writeln!(
            links,
            "<li><a href=\"/metrics?target={name}\">{name}</a></li>"
        );
    }
    format!(
        "<html>\n  <head>\n    <title>Xonotic Exporter</title>\n  </head>\n  <body>\n    <h1>Xonotic Exporter</h1>\n\t<ul>\n\t{links}\n\t</ul>\n  </body>\n</html>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rcon::{PlayerStats, ServerStatus};

    #[test]
    fn renders_status_block_only_when_present() {
        let metrics = ServerMetrics {
            status: None,
            players_info: PlayerStats::default(),
            memory: None,
            ping_duration: None,
            ping_seconds: 0.0,
        };
        let rendered = render_metrics("regulars", "exporter-host", &metrics);
        assert!(!rendered.contains("xonotic_sv_public"));
        assert!(rendered.contains("xonotic_rtt"));
    }

    #[test]
    fn renders_status_fields_when_present() {
        let metrics = ServerMetrics {
            status: Some(ServerStatus {
                sv_public: 1,
                map: "dusty_v2r1".to_string(),
                ..Default::default()
            }),
            players_info: PlayerStats::default(),
            memory: None,
            ping_duration: None,
            ping_seconds: 0.02,
        };
        let rendered = render_metrics("regulars", "exporter-host", &metrics);
        assert!(rendered.contains("xonotic_sv_public{instance=\"regulars\"} 1"));
        assert!(rendered.contains("# map: dusty_v2r1"));
    }

    #[test]
    fn exporters_index_lists_every_server() {
        let html = render_exporters_index(&["a".to_string(), "b".to_string()]);
        assert!(html.contains("/metrics?target=a"));
        assert!(html.contains("/metrics?target=b"));
    }
}
