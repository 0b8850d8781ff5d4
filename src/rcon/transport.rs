// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! UDP transport, challenge handshake, and the reply demultiplexer.
//!
//! One [`Session`] owns exactly one UDP socket for exactly one query
//! attempt; it is never reused across attempts. The [`LineStream`] built
//! on top concatenates the payloads of successive `QHDR n`-tagged
//! datagrams into a single line-oriented byte stream, discarding any
//! datagram that doesn't carry that prefix.

use std::time::{Duration, Instant};

use tokio::net::UdpSocket;

use super::{
    codec::{self, ReplyKind},
    error::{RconError, Result},
};

/// DarkPlaces' UDP MSS; also the size of the per-attempt read buffer.
pub const XON_MSS: usize = 1460;

/// An absolute wall-clock instant by which an attempt must complete.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Deadline(Instant::now() + timeout)
    }

    /// Remaining time until the deadline, or `Duration::ZERO` if it has
    /// already elapsed.
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    pub fn is_elapsed(&self) -> bool {
        Instant::now() >= self.0
    }
}

/// Owns the UDP socket and scratch buffer for exactly one query attempt.
pub struct Session {
    socket: UdpSocket,
    addr: String,
    deadline: Deadline,
}

impl Session {
    /// Connects a fresh UDP socket to `(host, port)` for one attempt.
    pub async fn connect(host: &str, port: u16, deadline: Deadline) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|source| RconError::Transport {
                addr: addr.clone(),
                source,
            })?;
        socket
            .connect(&addr)
            .await
            .map_err(|source| RconError::Transport {
                addr: addr.clone(),
                source,
            })?;
        Ok(Session {
            socket,
            addr,
            deadline,
        })
    }

    pub async fn send(&self, datagram: &[u8]) -> Result<()> {
        self.socket
            .send(datagram)
            .await
            .map(|_| ())
            .map_err(|source| RconError::Transport {
                addr: self.addr.clone(),
                source,
            })
    }

    /// Reads one datagram, bounded by the session deadline.
    async fn recv_datagram(&self, buf: &mut [u8]) -> Result<usize> {
        if self.deadline.is_elapsed() {
            return Err(RconError::Transport {
                addr: self.addr.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "deadline elapsed",
                ),
            });
        }
        match tokio::time::timeout(self.deadline.remaining(), self.socket.recv(buf)).await
        {
            Ok(Ok(n)) => Ok(n),
            Ok(Err(source)) => Err(RconError::Transport {
                addr: self.addr.clone(),
                source,
            }),
            Err(_elapsed) => Err(RconError::Transport {
                addr: self.addr.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "deadline elapsed",
                ),
            }),
        }
    }

    /// Performs the `getchallenge` round trip, reading datagrams until one
    /// carries the `QHDR challenge ` prefix.
    pub async fn request_challenge(&self) -> Result<Vec<u8>> {
        self.send(&codec::challenge_request()).await?;
        let mut buf = [0u8; XON_MSS];
        loop {
            let n = self.recv_datagram(&mut buf).await.map_err(|e| match e {
                RconError::Transport { addr, .. } => RconError::HandshakeTimeout { addr },
                other => other,
            })?;
            if let Some(challenge) = codec::extract_challenge(&buf[..n]) {
                return Ok(challenge.to_vec());
            }
            // not a challenge datagram, keep waiting
        }
    }

    /// Sends `ping` and waits for the `QHDR ack` reply, returning the
    /// measured round-trip time.
    pub async fn ping(&self) -> Result<Duration> {
        let start = Instant::now();
        self.send(&codec::ping_packet()).await?;
        let mut buf = [0u8; XON_MSS];
        loop {
            let n = self.recv_datagram(&mut buf).await?;
            if ReplyKind::recognize(&buf[..n]) == Some(ReplyKind::PingAck) {
                return Ok(start.elapsed());
            }
        }
    }
}

/// Concatenates the payloads of successive `QHDR n` datagrams into a
/// single line-oriented byte stream, discarding anything else.
pub struct LineStream<'a> {
    session: &'a Session,
    pending: Vec<u8>,
    cursor: usize,
    eof: bool,
}

impl<'a> LineStream<'a> {
    pub fn new(session: &'a Session) -> Self {
        LineStream {
            session,
            pending: Vec::new(),
            cursor: 0,
            eof: false,
        }
    }

    /// Returns the next LF-terminated line (without the newline), or
    /// `None` once the stream has been truncated or the deadline fires.
    pub async fn next_line(&mut self) -> Option<Vec<u8>> {
        loop {
            if let Some(rel) = self.pending[self.cursor..].iter().position(|&b| b == b'\n')
            {
                let line_end = self.cursor + rel;
                let line = self.pending[self.cursor..line_end].to_vec();
                self.cursor = line_end + 1;
                return Some(line);
            }

            if self.eof {
                return None;
            }

            // compact the buffer before refilling
            if self.cursor > 0 {
                self.pending.drain(..self.cursor);
                self.cursor = 0;
            }

            let mut buf = [0u8; XON_MSS];
            match self.session.recv_datagram(&mut buf).await {
                Ok(n) => {
                    if ReplyKind::recognize(&buf[..n]) == Some(ReplyKind::RconResponse) {
                        self.pending
                            .extend_from_slice(codec::strip_response_header(&buf[..n]));
                    }
                    // anything else is discarded and we read again
                },
                Err(_) => {
                    self.eof = true;
                },
            }
        }
    }

    /// Drains the stream to end-of-stream and decodes it as UTF-8 lines,
    /// mirroring the `bufio.Scanner` loop-until-`Err()` pattern of the
    /// original implementation. Used to feed the synchronous parsers in
    /// [`super::parser`].
    pub async fn collect_lines(mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(raw) = self.next_line().await {
            lines.push(String::from_utf8_lossy(&raw).into_owned());
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_remaining_never_negative() {
        let d = Deadline::after(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(d.remaining(), Duration::ZERO);
        assert!(d.is_elapsed());
    }
}
