//! Incremental RESP-2 parsing and reply serialization.
//!
//! A client command is an array of bulk strings on the wire:
//!
//! ```text
//! *<n>\r\n$<k1>\r\n<bytes1>\r\n$<k2>\r\n<bytes2>\r\n...
//! ```
//!
//! [`Session`] consumes raw socket bytes in whatever chunks they arrive and
//! yields complete commands; [`Reply`] is the server's answer, serialized as
//! a RESP simple string, error, integer or bulk string.

use std::mem;

use tracing::warn;

/// One complete client command: the bulk strings of a RESP array.
pub type Command = Vec<Vec<u8>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// expecting `*<n>` introducing a command array
    AwaitArrayHeader,
    /// expecting `$<len>` introducing the next bulk string
    AwaitBulkHeader,
    /// accumulating exactly `bulk_len` body bytes plus the framing `\r\n`
    ReadBulkBody,
}

/// The per-connection RESP parser.
///
/// Feed it raw bytes as they arrive; it buffers partial frames internally
/// and returns every command completed by the latest chunk, in arrival
/// order. Bulk bodies may themselves contain `\r\n`; the parser consumes
/// body bytes by count, never more than the outstanding amount, so a chunk
/// boundary can fall anywhere.
#[derive(Debug)]
pub struct Session {
    buf: Vec<u8>,
    state: State,
    expected_parts: usize,
    bulk_len: usize,
    bulk: Vec<u8>,
    parts: Vec<Vec<u8>>,
}

impl Session {
    /// Creates a parser in its initial state.
    pub fn new() -> Session {
        Session {
            buf: Vec::new(),
            state: State::AwaitArrayHeader,
            expected_parts: 0,
            bulk_len: 0,
            bulk: Vec::new(),
            parts: Vec::new(),
        }
    }

    /// Consumes `input` and returns the commands it completed.
    pub fn feed(&mut self, input: &[u8]) -> Vec<Command> {
        self.buf.extend_from_slice(input);
        let mut commands = Vec::new();

        loop {
            match self.state {
                State::ReadBulkBody => {
                    let outstanding = self.bulk_len - self.bulk.len();
                    let take = outstanding.min(self.buf.len());
                    self.bulk.extend_from_slice(&self.buf[..take]);
                    self.buf.drain(..take);
                    if self.bulk.len() < self.bulk_len {
                        return commands;
                    }
                    // body complete; the framing \r\n is consumed, not kept
                    if self.buf.len() < 2 {
                        return commands;
                    }
                    self.buf.drain(..2);

                    self.parts.push(mem::take(&mut self.bulk));
                    if self.parts.len() < self.expected_parts {
                        self.state = State::AwaitBulkHeader;
                    } else {
                        commands.push(mem::take(&mut self.parts));
                        self.state = State::AwaitArrayHeader;
                    }
                }
                State::AwaitArrayHeader | State::AwaitBulkHeader => {
                    let line = match self.take_line() {
                        Some(line) => line,
                        None => return commands,
                    };
                    if line.is_empty() {
                        continue;
                    }
                    match (self.state, line[0]) {
                        (State::AwaitArrayHeader, b'*') => match parse_count(&line[1..]) {
                            Some(0) => {
                                // an empty array still dispatches, as an empty command
                                commands.push(Vec::new());
                            }
                            Some(n) => {
                                self.expected_parts = n;
                                self.parts.clear();
                                self.state = State::AwaitBulkHeader;
                            }
                            None => {
                                warn!("unexpected input: {}", String::from_utf8_lossy(&line));
                            }
                        },
                        (State::AwaitBulkHeader, b'$') => match parse_count(&line[1..]) {
                            Some(len) => {
                                self.bulk_len = len;
                                self.bulk.clear();
                                self.state = State::ReadBulkBody;
                            }
                            None => {
                                warn!("unexpected input: {}", String::from_utf8_lossy(&line));
                            }
                        },
                        _ => {
                            warn!("unexpected input: {}", String::from_utf8_lossy(&line));
                        }
                    }
                }
            }
        }
    }

    /// Extracts the next `\r\n`-terminated line from the buffer, without the
    /// terminator. Returns `None` if no complete line has arrived yet.
    fn take_line(&mut self) -> Option<Vec<u8>> {
        let end = self.buf.windows(2).position(|w| w == b"\r\n")?;
        let line = self.buf[..end].to_vec();
        self.buf.drain(..end + 2);
        Some(line)
    }
}

impl Default for Session {
    fn default() -> Session {
        Session::new()
    }
}

fn parse_count(digits: &[u8]) -> Option<usize> {
    std::str::from_utf8(digits).ok()?.parse::<usize>().ok()
}

/// A server reply, one of the four RESP-2 reply kinds the store emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// simple string, e.g. `+OK`
    Simple(String),
    /// error string, serialized as `-ERR <message>`
    Error(String),
    /// integer, e.g. `:1`
    Integer(i64),
    /// length-prefixed bulk string
    Bulk(Vec<u8>),
    /// the null bulk string `$-1`, meaning "no value"
    NullBulk,
}

impl Reply {
    /// Serializes the reply into its wire form.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Reply::Simple(s) => format!("+{}\r\n", s).into_bytes(),
            Reply::Error(msg) => format!("-ERR {}\r\n", msg).into_bytes(),
            Reply::Integer(n) => format!(":{}\r\n", n).into_bytes(),
            Reply::NullBulk => b"$-1\r\n".to_vec(),
            Reply::Bulk(value) => {
                let mut out = format!("${}\r\n", value.len()).into_bytes();
                out.extend_from_slice(value);
                out.extend_from_slice(b"\r\n");
                out
            }
        }
    }
}
