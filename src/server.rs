use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};

use tracing::{debug, error};

use crate::engine::KvEngine;
use crate::resp::{Reply, Session};
use crate::thread_pool::ThreadPool;
use crate::Result;

/// A TCP server speaking RESP-2 over a key value storage engine.
///
/// The accept loop hands each connection to the thread pool; each session
/// reads raw bytes, feeds them to a [`Session`] parser, executes completed
/// commands against the engine and writes the replies back in request order.
///
/// Each session receives its own clone of the engine, which is thread-safe
/// at shard granularity, so sessions never coordinate with each other.
///
/// # Example
/// Serve a store on "127.0.0.1:6379" with a 4-worker shared-queue pool:
/// ```no_run
/// use bindb::thread_pool::{SharedQueueThreadPool, ThreadPool};
/// use bindb::{Mode, Options, Server, Store};
/// # fn main() -> bindb::Result<()> {
/// let store = Store::open("./data", Mode::Create, Options::default())?;
/// let pool = SharedQueueThreadPool::new(4)?;
/// let server = Server::new(store, pool);
/// server.run("127.0.0.1:6379")?;
/// # Ok(())
/// # }
/// ```
pub struct Server<E: KvEngine, P: ThreadPool> {
    /// the storage engine shared by all sessions
    engine: E,
    /// a pool of threads that drive client sessions
    pool: P,
}

impl<E: KvEngine, P: ThreadPool> Server<E, P> {
    /// Creates a new `Server` over the given engine and pool.
    pub fn new(engine: E, pool: P) -> Self {
        Server { engine, pool }
    }

    /// Binds `addr` and serves connections until the process exits.
    ///
    /// # Errors
    /// Returns an error if the listener cannot be bound; per-connection
    /// failures are logged and do not stop the server.
    pub fn run<A: ToSocketAddrs>(self, addr: A) -> Result<()> {
        let listener = TcpListener::bind(addr)?;
        self.run_listener(listener)
    }

    /// Serves connections from an already-bound listener.
    pub fn run_listener(self, listener: TcpListener) -> Result<()> {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let engine = self.engine.clone();
                    self.pool.spawn(move || {
                        if let Err(e) = serve(engine, stream) {
                            error!("Error on serving client: {}", e);
                        }
                    });
                }
                Err(e) => error!("Connection failed: {}", e),
            }
        }
        Ok(())
    }
}

/// Drives one client session to completion: reads bytes, parses frames,
/// executes commands, writes replies. Returns when the peer disconnects.
fn serve<E: KvEngine>(engine: E, mut stream: TcpStream) -> Result<()> {
    let peer_addr = stream.peer_addr()?;
    debug!("client connected: {}", peer_addr);

    let mut session = Session::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            debug!("client disconnected: {}", peer_addr);
            return Ok(());
        }
        for command in session.feed(&buf[..n]) {
            let reply = execute(&engine, &command);
            stream.write_all(&reply.to_bytes())?;
        }
    }
}

/// Maps one parsed command onto the engine and produces its reply.
fn execute<E: KvEngine>(engine: &E, parts: &[Vec<u8>]) -> Reply {
    if parts.is_empty() {
        return Reply::Error("empty command".to_string());
    }
    match (parts[0].as_slice(), parts.len()) {
        (b"SET", 3) => match engine.insert(&parts[1], &parts[2]) {
            Ok(()) => Reply::Simple("OK".to_string()),
            Err(e) => Reply::Error(e.to_string()),
        },
        (b"GET", 2) => match engine.get(&parts[1]) {
            Ok(Some(value)) => Reply::Bulk(value),
            Ok(None) => Reply::NullBulk,
            Err(e) => Reply::Error(e.to_string()),
        },
        (b"DEL", 2) => match engine.erase(&parts[1]) {
            Ok(true) => Reply::Integer(1),
            Ok(false) => Reply::Integer(0),
            Err(e) => Reply::Error(e.to_string()),
        },
        _ => Reply::Error("unknown command or wrong number of arguments".to_string()),
    }
}
