//! End-to-end tests against a real TCP server.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use bindb::thread_pool::{SharedQueueThreadPool, ThreadPool};
use bindb::{Client, Mode, Options, Server, Store};

/// Starts a server on an OS-assigned port and returns its address. The
/// server thread lives for the rest of the test process.
fn start_server(dir: &std::path::Path, shards: usize) -> SocketAddr {
    let options = Options::default()
        .shard_count(shards)
        .compaction_interval(Duration::from_secs(3600));
    let store = Store::open(dir, Mode::Create, options).unwrap();
    let pool = SharedQueueThreadPool::new(4).unwrap();
    let server = Server::new(store, pool);

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || server.run_listener(listener).unwrap());
    addr
}

/// Writes `frame` and reads until `expected.len()` bytes arrived.
fn roundtrip(stream: &mut TcpStream, frame: &[u8], expected: &[u8]) {
    stream.write_all(frame).unwrap();
    let mut reply = vec![0u8; expected.len()];
    stream.read_exact(&mut reply).unwrap();
    assert_eq!(
        reply,
        expected,
        "got {:?}",
        String::from_utf8_lossy(&reply)
    );
}

#[test]
fn literal_wire_scenarios() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_server(dir.path(), 8);
    let mut stream = TcpStream::connect(addr).unwrap();

    // 1: SET foo bar
    roundtrip(
        &mut stream,
        b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n",
        b"+OK\r\n",
    );
    // 2: GET foo
    roundtrip(
        &mut stream,
        b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n",
        b"$3\r\nbar\r\n",
    );
    // 3: GET of an absent key
    roundtrip(&mut stream, b"*2\r\n$3\r\nGET\r\n$3\r\nabc\r\n", b"$-1\r\n");
    // 4: DEL foo, twice
    roundtrip(&mut stream, b"*2\r\n$3\r\nDEL\r\n$3\r\nfoo\r\n", b":1\r\n");
    roundtrip(&mut stream, b"*2\r\n$3\r\nDEL\r\n$3\r\nfoo\r\n", b":0\r\n");
    // 5: unknown command
    roundtrip(
        &mut stream,
        b"*1\r\n$4\r\nPING\r\n",
        b"-ERR unknown command or wrong number of arguments\r\n",
    );
    // empty array
    roundtrip(&mut stream, b"*0\r\n", b"-ERR empty command\r\n");
}

#[test]
fn frames_split_across_writes() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_server(dir.path(), 4);
    let mut stream = TcpStream::connect(addr).unwrap();

    // dribble a SET out one fragment at a time
    for fragment in [
        b"*3\r\n$3\r" as &[u8],
        b"\nSET\r\n$4\r\nke",
        b"y1\r\n$6\r\nva",
        b"l",
    ] {
        stream.write_all(fragment).unwrap();
        stream.flush().unwrap();
        thread::sleep(Duration::from_millis(5));
    }
    stream.write_all(b"ue1\r\n").unwrap();

    let mut reply = vec![0u8; 5];
    stream.read_exact(&mut reply).unwrap();
    assert_eq!(reply, b"+OK\r\n");

    roundtrip(
        &mut stream,
        b"*2\r\n$3\r\nGET\r\n$4\r\nkey1\r\n",
        b"$6\r\nvalue1\r\n",
    );
}

#[test]
fn pipelined_commands_reply_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_server(dir.path(), 4);
    let mut stream = TcpStream::connect(addr).unwrap();

    let batch = b"*3\r\n$3\r\nSET\r\n$1\r\na\r\n$1\r\n1\r\n\
                  *3\r\n$3\r\nSET\r\n$1\r\nb\r\n$1\r\n2\r\n\
                  *2\r\n$3\r\nGET\r\n$1\r\na\r\n\
                  *2\r\n$3\r\nGET\r\n$1\r\nb\r\n";
    let expected = b"+OK\r\n+OK\r\n$1\r\n1\r\n$1\r\n2\r\n";
    roundtrip(&mut stream, batch, expected);
}

#[test]
fn binary_value_over_the_wire() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_server(dir.path(), 4);
    let mut stream = TcpStream::connect(addr).unwrap();

    // value contains \r\n and a NUL byte; the length prefix carries it
    roundtrip(
        &mut stream,
        b"*3\r\n$3\r\nSET\r\n$3\r\nbin\r\n$6\r\na\r\n\x00b\r\n",
        b"+OK\r\n",
    );
    roundtrip(
        &mut stream,
        b"*2\r\n$3\r\nGET\r\n$3\r\nbin\r\n",
        b"$6\r\na\r\n\x00b\r\n",
    );
}

#[test]
fn sessions_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_server(dir.path(), 4);

    let mut first = TcpStream::connect(addr).unwrap();
    roundtrip(
        &mut first,
        b"*3\r\n$3\r\nSET\r\n$6\r\nshared\r\n$3\r\nyes\r\n",
        b"+OK\r\n",
    );
    // drop the first connection mid-session; the store must be unaffected
    drop(first);

    let mut second = TcpStream::connect(addr).unwrap();
    roundtrip(
        &mut second,
        b"*2\r\n$3\r\nGET\r\n$6\r\nshared\r\n",
        b"$3\r\nyes\r\n",
    );
}

#[test]
fn client_api_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_server(dir.path(), 4);
    let mut client = Client::connect(addr).unwrap();

    client.set(b"foo", b"bar").unwrap();
    assert_eq!(client.get(b"foo").unwrap(), Some(b"bar".to_vec()));
    assert_eq!(client.get(b"missing").unwrap(), None);
    assert!(client.del(b"foo").unwrap());
    assert!(!client.del(b"foo").unwrap());

    // bulk bodies containing the frame delimiter survive the trip back
    client.set(b"tricky", b"line1\r\nline2").unwrap();
    assert_eq!(
        client.get(b"tricky").unwrap(),
        Some(b"line1\r\nline2".to_vec())
    );
}

#[test]
fn concurrent_clients() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_server(dir.path(), 16);

    let mut handles = Vec::new();
    for t in 0..4u32 {
        handles.push(thread::spawn(move || {
            let mut client = Client::connect(addr).unwrap();
            for i in 0..50u32 {
                let key = format!("t{}-{}", t, i);
                client.set(key.as_bytes(), key.as_bytes()).unwrap();
                assert_eq!(
                    client.get(key.as_bytes()).unwrap(),
                    Some(key.clone().into_bytes())
                );
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}
