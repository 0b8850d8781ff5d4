// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Line-oriented state-machine parsers for RCON command output.
//!
//! Every parser here is a plain, synchronous function over an already
//! materialized sequence of LF-split lines: the orchestrator drains the
//! demultiplexed [`super::transport::LineStream`] to end-of-stream first
//! (mirroring the `bufio.Scanner` loop of the original implementation),
//! then hands the lines to the matching state machine below. An
//! unexpected line at a given state is a parse error, never a skip.

pub mod info;
pub mod memstats;
pub mod scores;
pub mod status;

/// Splits a fully-buffered RCON payload into UTF-8 lines, lossily
/// decoding any invalid byte sequences (server output is 8-bit clean but
/// the parsers only ever look at ASCII structure).
pub fn split_lines(payload: &[u8]) -> Vec<String> {
    payload
        .split(|&b| b == b'\n')
        .map(|line| String::from_utf8_lossy(line.strip_suffix(b"\r").unwrap_or(line)).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_lines_handles_crlf_and_trailing_newline() {
        let lines = split_lines(b"a\r\nb\nc");
        assert_eq!(lines, vec!["a", "b", "c"]);
    }
}
