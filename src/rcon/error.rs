// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

/// Error surface of the RCON client core.
///
/// Every variant maps to one of the kinds named in the protocol design:
/// transport/handshake/framing failures are retryable, parse failures are
/// not (they are deterministic on the bytes received).
#[derive(Debug, Error)]
pub enum RconError {
    #[error("socket error talking to {addr}: {source}")]
    Transport {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("challenge handshake with {addr} timed out")]
    HandshakeTimeout { addr: String },

    #[error("protocol mismatch: {0}")]
    ProtocolMismatch(String),

    #[error("failed to parse {what} at {line:?}: {reason}")]
    Parse {
        what: &'static str,
        line: String,
        reason: String,
    },

    #[error("unexpected end of stream while parsing {0}")]
    UnexpectedEof(&'static str),
}

impl RconError {
    /// Whether a fresh attempt is worth retrying. Parse errors are
    /// deterministic on the input bytes and are never retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RconError::Parse { .. })
    }

    pub(crate) fn parse(what: &'static str, line: impl Into<String>, reason: impl Into<String>) -> Self {
        RconError::Parse {
            what,
            line: line.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RconError>;
