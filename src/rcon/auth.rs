// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! HMAC-MD4 authentication tag derivation.
//!
//! DarkPlaces mandates MD4 for its secure RCON modes; this is a
//! compatibility requirement of the wire protocol, not a security
//! recommendation.

use hmac::{Hmac, Mac};
use md4::Md4;

type HmacMd4 = Hmac<Md4>;

/// Computes the 16-byte `HMAC-MD4(key, message)` tag used to authenticate
/// secure RCON commands.
pub fn hmac_md4(key: &[u8], message: &[u8]) -> [u8; 16] {
    let mut mac = <HmacMd4 as Mac>::new_from_slice(key)
        .expect("HMAC accepts a key of any length");
    mac.update(message);
    let digest = mac.finalize().into_bytes();
    let mut tag = [0u8; 16];
    tag.copy_from_slice(&digest);
    tag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_md4_matches_time_secure_vector() {
        let tag = hmac_md4(b"passw", b"100.000000 status");
        assert_eq!(
            tag,
            [
                0x52, 0xcb, 0x76, 0xf0, 0xa7, 0x70, 0xcd, 0xca, 0xf2, 0x21, 0xc3, 0x7e,
                0x06, 0xa9, 0x9f, 0xa8,
            ]
        );
    }

    #[test]
    fn hmac_md4_matches_challenge_secure_vector() {
        let tag = hmac_md4(b"passw", b"11111111111 status");
        assert_eq!(
            tag,
            [
                0x44, 0x89, 0xfd, 0x15, 0xcc, 0x5a, 0xea, 0xeb, 0x0e, 0xbf, 0x6c, 0xd6,
                0x43, 0x05, 0x54, 0x12,
            ]
        );
    }
}
