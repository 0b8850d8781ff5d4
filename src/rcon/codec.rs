// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Wire framing for the DarkPlaces RCON protocol.
//!
//! Every datagram, in either direction, begins with the four bytes
//! [`QHDR`]. Outbound packets are one of `rcon`, `srcon ... TIME`,
//! `srcon ... CHALLENGE`, `getchallenge` or `ping`; inbound replies are
//! recognized by the prefixes in [`ReplyKind::recognize`].

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::auth::hmac_md4;

/// The four magic bytes that prefix every RCON datagram in both directions.
pub const QHDR: &[u8; 4] = b"\xff\xff\xff\xff";

const RCON_RESPONSE_HEADER: &[u8] = b"\xff\xff\xff\xffn";
const CHALLENGE_REQUEST: &[u8] = b"\xff\xff\xff\xffgetchallenge";
const CHALLENGE_HEADER: &[u8] = b"\xff\xff\xff\xffchallenge ";
const PING_PACKET: &[u8] = b"\xff\xff\xff\xffping";
const PING_RESPONSE: &[u8] = b"\xff\xff\xff\xffack";

/// Builds the `getchallenge` request datagram.
pub fn challenge_request() -> Vec<u8> {
    CHALLENGE_REQUEST.to_vec()
}

/// Builds the `ping` request datagram.
pub fn ping_packet() -> Vec<u8> {
    PING_PACKET.to_vec()
}

/// Builds a non-secure `rcon` datagram: `QHDR rcon <password> <command>`.
pub fn rcon_non_secure(command: &[u8], password: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(QHDR.len() + 5 + password.len() + 1 + command.len());
    buf.extend_from_slice(QHDR);
    buf.extend_from_slice(b"rcon ");
    buf.extend_from_slice(password.as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(command);
    buf
}

/// Formats a `SystemTime` as DarkPlaces expects: seconds since the Unix
/// epoch, fixed-point, six fractional digits, no exponent.
pub fn format_timestamp(ts: SystemTime) -> String {
    let dur = ts.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
    let micros = dur.subsec_micros();
    format!("{}.{:06}", dur.as_secs(), micros)
}

/// Builds a time-secure `srcon HMAC-MD4 TIME` datagram.
///
/// `tag = HMAC-MD4(password, timestamp || ' ' || command)`.
pub fn rcon_secure_time(command: &[u8], password: &str, ts: SystemTime) -> Vec<u8> {
    let timestamp = format_timestamp(ts);

    let mut mac_input = Vec::with_capacity(timestamp.len() + 1 + command.len());
    mac_input.extend_from_slice(timestamp.as_bytes());
    mac_input.push(b' ');
    mac_input.extend_from_slice(command);
    let tag = hmac_md4(password.as_bytes(), &mac_input);

    let mut buf = Vec::with_capacity(
        QHDR.len() + 20 + tag.len() + 1 + timestamp.len() + 1 + command.len(),
    );
    buf.extend_from_slice(QHDR);
    buf.extend_from_slice(b"srcon HMAC-MD4 TIME ");
    buf.extend_from_slice(&tag);
    buf.push(b' ');
    buf.extend_from_slice(timestamp.as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(command);
    buf
}

/// Builds a challenge-secure `srcon HMAC-MD4 CHALLENGE` datagram.
///
/// `tag = HMAC-MD4(password, challenge || ' ' || command)`.
pub fn rcon_secure_challenge(command: &[u8], password: &str, challenge: &[u8]) -> Vec<u8> {
    let mut mac_input = Vec::with_capacity(challenge.len() + 1 + command.len());
    mac_input.extend_from_slice(challenge);
    mac_input.push(b' ');
    mac_input.extend_from_slice(command);
    let tag = hmac_md4(password.as_bytes(), &mac_input);

    let mut buf = Vec::with_capacity(
        QHDR.len() + 25 + tag.len() + 1 + challenge.len() + 1 + command.len(),
    );
    buf.extend_from_slice(QHDR);
    buf.extend_from_slice(b"srcon HMAC-MD4 CHALLENGE ");
    buf.extend_from_slice(&tag);
    buf.push(b' ');
    buf.extend_from_slice(challenge);
    buf.push(b' ');
    buf.extend_from_slice(command);
    buf
}

/// Classification of an inbound datagram, recognized by its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// `QHDR n`: an RCON response; carries the line-oriented payload.
    RconResponse,
    /// `QHDR ack`: the ping reply.
    PingAck,
}

impl ReplyKind {
    /// Recognizes the family of an inbound datagram. Anything that doesn't
    /// match one of the known prefixes (including a too-short datagram)
    /// returns `None` and must be discarded by the caller.
    pub fn recognize(datagram: &[u8]) -> Option<Self> {
        if datagram.starts_with(RCON_RESPONSE_HEADER) {
            Some(ReplyKind::RconResponse)
        } else if datagram.starts_with(PING_RESPONSE) {
            Some(ReplyKind::PingAck)
        } else {
            None
        }
    }
}

/// Extracts the challenge bytes from a `QHDR challenge <bytes>[\0...]`
/// datagram. The challenge runs from the end of the header up to the
/// first NUL byte, or to the end of the datagram if there is none.
pub fn extract_challenge(datagram: &[u8]) -> Option<&[u8]> {
    if !datagram.starts_with(CHALLENGE_HEADER) {
        return None;
    }
    let rest = &datagram[CHALLENGE_HEADER.len()..];
    let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Strips the five-byte `QHDR n` prefix from an accepted RCON response
/// datagram, returning the line-oriented payload.
pub fn strip_response_header(datagram: &[u8]) -> &[u8] {
    &datagram[RCON_RESPONSE_HEADER.len()..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_secure_framing_is_bit_exact() {
        let pkt = rcon_non_secure(b"status", "passw");
        assert_eq!(pkt, b"\xff\xff\xff\xffrcon passw status");
        assert_eq!(pkt.len(), 19);
    }

    #[test]
    fn time_secure_hmac_matches_known_vector() {
        let ts = UNIX_EPOCH + Duration::from_secs(100);
        let pkt = rcon_secure_time(b"status", "passw", ts);
        let expected_tag: [u8; 16] = [
            0x52, 0xcb, 0x76, 0xf0, 0xa7, 0x70, 0xcd, 0xca, 0xf2, 0x21, 0xc3, 0x7e, 0x06,
            0xa9, 0x9f, 0xa8,
        ];
        let prefix_len = QHDR.len() + "srcon HMAC-MD4 TIME ".len();
        assert_eq!(&pkt[prefix_len..prefix_len + 16], &expected_tag);
        assert_eq!(&pkt[prefix_len + 16 + 1..], b"100.000000 status");
    }

    #[test]
    fn challenge_secure_hmac_matches_known_vector() {
        let pkt = rcon_secure_challenge(b"status", "passw", b"11111111111");
        let expected_tag: [u8; 16] = [
            0x44, 0x89, 0xfd, 0x15, 0xcc, 0x5a, 0xea, 0xeb, 0x0e, 0xbf, 0x6c, 0xd6, 0x43,
            0x05, 0x54, 0x12,
        ];
        let prefix_len = QHDR.len() + "srcon HMAC-MD4 CHALLENGE ".len();
        assert_eq!(&pkt[prefix_len..prefix_len + 16], &expected_tag);
        assert_eq!(&pkt[prefix_len + 16 + 1..], b"11111111111 status");
    }

    #[test]
    fn round_trip_time_secure_recovers_timestamp_and_command() {
        let ts = UNIX_EPOCH + Duration::from_micros(1_700_000_123_456);
        let pkt = rcon_secure_time(b"sv_public\x00status 1", "hunter2", ts);
        let prefix_len = QHDR.len() + "srcon HMAC-MD4 TIME ".len() + 16 + 1;
        let rest = &pkt[prefix_len..];
        let space = rest.iter().position(|&b| b == b' ').unwrap();
        let recovered_ts = std::str::from_utf8(&rest[..space]).unwrap();
        let recovered_cmd = &rest[space + 1..];
        assert_eq!(recovered_ts, format_timestamp(ts));
        assert_eq!(recovered_cmd, b"sv_public\x00status 1");
    }

    #[test]
    fn reply_kind_recognizes_known_prefixes() {
        assert_eq!(
            ReplyKind::recognize(b"\xff\xff\xff\xffn\ntext"),
            Some(ReplyKind::RconResponse)
        );
        assert_eq!(
            ReplyKind::recognize(b"\xff\xff\xff\xffack"),
            Some(ReplyKind::PingAck)
        );
        assert_eq!(ReplyKind::recognize(b"garbage"), None);
        assert_eq!(ReplyKind::recognize(b"\xff\xff\xff"), None);
    }

    #[test]
    fn extract_challenge_stops_at_nul_or_end() {
        let mut datagram = CHALLENGE_HEADER.to_vec();
        datagram.extend_from_slice(b"11111111111\x00trailing-garbage");
        assert_eq!(extract_challenge(&datagram), Some(&b"11111111111"[..]));

        let mut no_nul = CHALLENGE_HEADER.to_vec();
        no_nul.extend_from_slice(b"abcdef");
        assert_eq!(extract_challenge(&no_nul), Some(&b"abcdef"[..]));
    }
}
