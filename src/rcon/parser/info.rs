// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::rcon::{
    error::{RconError, Result},
    types::ServerInfo,
};

const FIELD_COUNT: usize = 9;

fn strip_tag<'a>(field: &'a str, tag: char, line: &str) -> Result<&'a str> {
    field
        .strip_prefix(tag)
        .ok_or_else(|| RconError::parse("info", line, format!("expected {tag}-prefixed field")))
}

/// Parses the single `:`-delimited world-info record produced by
/// `prvm_globalget server worldstatus`.
///
/// The record carries seven named fields, one reserved (always-empty)
/// field, and a free-form remainder that is the score string:
/// `gametype:version:P<n>:S<n>:F<n>:T<url|INVALID>:M<name>::<score_string>`.
pub fn parse_info(line: &str) -> Result<ServerInfo> {
    let parts: Vec<&str> = line.splitn(FIELD_COUNT, ':').collect();
    if parts.len() != FIELD_COUNT {
        return Err(RconError::parse(
            "info",
            line,
            format!("expected {FIELD_COUNT} colon-delimited fields, got {}", parts.len()),
        ));
    }

    let gametype = parts[0].to_string();
    let version = parts[1].to_string();
    let pure_changes_count = strip_tag(parts[2], 'P', line)?
        .parse()
        .map_err(|_| RconError::parse("info", line, "invalid pure changes count"))?;
    let join_allowed_count = strip_tag(parts[3], 'S', line)?
        .parse()
        .map_err(|_| RconError::parse("info", line, "invalid join-allowed count"))?;
    let server_flags = strip_tag(parts[4], 'F', line)?
        .parse()
        .map_err(|_| RconError::parse("info", line, "invalid server flags"))?;
    let terms_raw = strip_tag(parts[5], 'T', line)?;
    let terms_of_service = if terms_raw == "INVALID" {
        String::new()
    } else {
        terms_raw.to_string()
    };
    let mod_name = strip_tag(parts[6], 'M', line)?.to_string();
    let score_string = parts[8].to_string();

    Ok(ServerInfo {
        gametype,
        version,
        pure_changes_count,
        join_allowed_count,
        server_flags,
        terms_of_service,
        mod_name,
        score_string,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_info_record() {
        let info =
            parse_info("nb:git:P19:S11:F3:TINVALID:MXPM::goals!!:goals!!:5:0:14:0").unwrap();
        assert_eq!(info.gametype, "nb");
        assert_eq!(info.version, "git");
        assert_eq!(info.pure_changes_count, 19);
        assert_eq!(info.join_allowed_count, 11);
        assert_eq!(info.server_flags, 3);
        assert_eq!(info.terms_of_service, "");
        assert_eq!(info.mod_name, "XPM");
        assert_eq!(info.score_string, "goals!!:goals!!:5:0:14:0");
    }

    #[test]
    fn keeps_non_invalid_terms_url() {
        let info =
            parse_info("ctf:git:P0:S1:F0:Thttps://example.com/tos:Mvanilla::x").unwrap();
        assert_eq!(info.terms_of_service, "https://example.com/tos");
    }

    #[test]
    fn rejects_too_few_fields() {
        let err = parse_info("nb:git:P19").unwrap_err();
        assert!(matches!(err, RconError::Parse { .. }));
    }
}
