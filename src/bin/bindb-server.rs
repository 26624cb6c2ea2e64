//! this binary starts the bindb server
//! to see the list of options, type: `bindb-server --help`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::exit;
use std::time::Duration;

use clap::{crate_version, value_t, App, Arg};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use bindb::thread_pool::{SharedQueueThreadPool, ThreadPool};
use bindb::{Mode, Options, Result, Server, Store, StoreError};

const DEFAULT_ADDRESS: &str = "127.0.0.1:6379";
const DEFAULT_DIR: &str = "./data";

/// [`Opt`] holds parsed and validated options from the command line
#[derive(Debug)]
struct Opt {
    addr: SocketAddr,
    dir: PathBuf,
    mode: Mode,
    workers: u32,
    options: Options,
}

impl Opt {
    /// validates the raw command line values
    /// # Errors
    /// returns [`StoreError::Parsing`] if one of the parameters is invalid
    fn build(
        addr: &str,
        dir: &str,
        mode: &str,
        workers: u32,
        shards: usize,
        cache_capacity: usize,
        compaction_interval: u64,
    ) -> Result<Opt> {
        let addr: SocketAddr = addr.parse().map_err(|_| {
            StoreError::Parsing(format!(
                "could not parse {} into an IP address and port",
                addr
            ))
        })?;
        let mode: Mode = mode.parse()?;

        Ok(Opt {
            addr,
            dir: PathBuf::from(dir),
            mode,
            workers,
            options: Options::default()
                .shard_count(shards)
                .cache_capacity(cache_capacity)
                .compaction_interval(Duration::from_secs(compaction_interval)),
        })
    }
}

fn main() {
    // set up a tracing subscriber to log to STDERR
    subscriber_config();

    // parse command line args
    let matches = App::new("bindb-server")
        .version(crate_version!())
        .about("a sharded, disk-persistent key-value store speaking RESP")
        .arg(
            Arg::with_name("addr")
                .long("addr")
                .value_name("IP_ADDR:PORT")
                .help("sets the IP_ADDR:PORT that the server listens on")
                .default_value(DEFAULT_ADDRESS),
        )
        .arg(
            Arg::with_name("dir")
                .long("dir")
                .value_name("PATH")
                .help("sets the directory holding the shard files")
                .default_value(DEFAULT_DIR),
        )
        .arg(
            Arg::with_name("mode")
                .long("mode")
                .value_name("MODE")
                .possible_values(&["create", "open"])
                .help("'create' wipes the data directory, 'open' keeps and recovers it")
                .default_value("create"),
        )
        .arg(
            Arg::with_name("workers")
                .long("workers")
                .value_name("N")
                .help("sets the number of threads driving client sessions")
                .default_value("4"),
        )
        .arg(
            Arg::with_name("shards")
                .long("shards")
                .value_name("N")
                .help("sets the number of shard files (fixed at store creation)")
                .default_value("512"),
        )
        .arg(
            Arg::with_name("cache-capacity")
                .long("cache-capacity")
                .value_name("N")
                .help("sets the per-shard LRU cache capacity in entries")
                .default_value("64"),
        )
        .arg(
            Arg::with_name("compaction-interval")
                .long("compaction-interval")
                .value_name("SECONDS")
                .help("sets the sleep between background compaction passes")
                .default_value("30"),
        )
        .get_matches();

    let opt = Opt::build(
        matches.value_of("addr").unwrap(),
        matches.value_of("dir").unwrap(),
        matches.value_of("mode").unwrap(),
        value_t!(matches, "workers", u32).unwrap_or_else(|e| e.exit()),
        value_t!(matches, "shards", usize).unwrap_or_else(|e| e.exit()),
        value_t!(matches, "cache-capacity", usize).unwrap_or_else(|e| e.exit()),
        value_t!(matches, "compaction-interval", u64).unwrap_or_else(|e| e.exit()),
    );
    let opt = match opt {
        Ok(opt) => opt,
        Err(err) => {
            eprintln!("{:?}", err);
            exit(1);
        }
    };

    // start the server; construction failures are fatal
    if let Err(e) = run(opt) {
        eprintln!("{:?}", e);
        exit(1);
    }
}

fn run(opt: Opt) -> Result<()> {
    info!("bindb-server {}", env!("CARGO_PKG_VERSION"));
    info!(
        "data dir: {:?} ({} mode, {} shards)",
        opt.dir, opt.mode, opt.options.shard_count
    );
    info!("listening on {}", opt.addr);

    let store = Store::open(&opt.dir, opt.mode, opt.options)?;
    let pool = SharedQueueThreadPool::new(opt.workers)?;
    let server = Server::new(store, pool);
    server.run(opt.addr)
}

/// configures a tracing subscriber that will log to STDERR
fn subscriber_config() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        // log to stderr instead of stdout
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting tracing default subscriber failed");
}
