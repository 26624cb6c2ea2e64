use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{Result, StoreError};
use crate::resp::Reply;

/// `Client` contains the functionality for talking RESP-2 to a [`Server`](crate::Server).
///
/// Requests are serialized as arrays of bulk strings; replies are parsed by
/// their leading sigil. Bulk reply bodies are read by exact count — each read
/// is capped at the number of outstanding bytes, so a body containing `\r\n`
/// (or a stream that delivers more than one reply per packet) is never
/// over-consumed.
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Client {
    /// Creates a client and establishes a socket connection to the server at
    /// the given `addr`.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Client> {
        let tcp_reader = TcpStream::connect(addr)?;
        let tcp_writer = tcp_reader.try_clone()?;

        Ok(Client {
            reader: BufReader::new(tcp_reader),
            writer: tcp_writer,
        })
    }

    /// Maps `key` to `value` on the server.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        match self.request(&[b"SET", key, value])? {
            Reply::Simple(_) => Ok(()),
            reply => Err(unexpected(reply)),
        }
    }

    /// Fetches the value for `key` from the server.
    ///
    /// Returns `Ok(None)` if the key is absent.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.request(&[b"GET", key])? {
            Reply::Bulk(value) => Ok(Some(value)),
            Reply::NullBulk => Ok(None),
            reply => Err(unexpected(reply)),
        }
    }

    /// Deletes `key` on the server.
    ///
    /// Returns `true` iff the server removed a live entry.
    pub fn del(&mut self, key: &[u8]) -> Result<bool> {
        match self.request(&[b"DEL", key])? {
            Reply::Integer(n) => Ok(n != 0),
            reply => Err(unexpected(reply)),
        }
    }

    fn request(&mut self, parts: &[&[u8]]) -> Result<Reply> {
        let mut frame = format!("*{}\r\n", parts.len()).into_bytes();
        for part in parts {
            frame.extend_from_slice(format!("${}\r\n", part.len()).as_bytes());
            frame.extend_from_slice(part);
            frame.extend_from_slice(b"\r\n");
        }
        self.writer.write_all(&frame)?;
        self.read_reply()
    }

    fn read_reply(&mut self) -> Result<Reply> {
        let line = self.read_line()?;
        if line.is_empty() {
            return Err(StoreError::Protocol("empty reply line".to_string()));
        }
        let text = || String::from_utf8_lossy(&line[1..]).into_owned();
        match line[0] {
            b'+' => Ok(Reply::Simple(text())),
            b'-' => Ok(Reply::Error(text())),
            b':' => {
                let n = text()
                    .parse::<i64>()
                    .map_err(|_| StoreError::Protocol(format!("bad integer reply: {}", text())))?;
                Ok(Reply::Integer(n))
            }
            b'$' => {
                let len = text()
                    .parse::<i64>()
                    .map_err(|_| StoreError::Protocol(format!("bad bulk length: {}", text())))?;
                if len == -1 {
                    return Ok(Reply::NullBulk);
                }
                if len < 0 {
                    return Err(StoreError::Protocol(format!("bad bulk length: {}", len)));
                }
                // read_exact never consumes past the body and its framing
                let mut body = vec![0u8; len as usize + 2];
                self.reader.read_exact(&mut body)?;
                body.truncate(len as usize);
                Ok(Reply::Bulk(body))
            }
            other => Err(StoreError::Protocol(format!(
                "unknown reply sigil: {}",
                other as char
            ))),
        }
    }

    /// Reads one `\r\n`-terminated line, without the terminator.
    fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        let n = self.reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            return Err(StoreError::Protocol("connection closed".to_string()));
        }
        while matches!(line.last(), Some(b'\n') | Some(b'\r')) {
            line.pop();
        }
        Ok(line)
    }
}

fn unexpected(reply: Reply) -> StoreError {
    match reply {
        Reply::Error(msg) => StoreError::Protocol(msg),
        other => StoreError::Protocol(format!("unexpected reply: {:?}", other)),
    }
}
