//! this binary starts an interactive REPL talking to a bindb server
//!
//! The REPL grammar is deliberately small:
//!
//! ```text
//! SET <key> "<value>"    value must be double-quoted; quotes are stripped,
//!                        everything between them (spaces included) is sent
//! GET <key>
//! DEL <key>
//! exit
//! ```
//!
//! Input that does not match the grammar is rejected with a message rather
//! than sent to the server.

use std::io::{self, Write};
use std::process::exit;

use clap::{crate_version, App, Arg};

use bindb::{Client, Result, StoreError};

const DEFAULT_ADDRESS: &str = "127.0.0.1:6379";

fn main() {
    let matches = App::new("bindb-client")
        .version(crate_version!())
        .about("an interactive client for a bindb server")
        .arg(
            Arg::with_name("addr")
                .long("addr")
                .value_name("IP_ADDR:PORT")
                .help("sets the IP_ADDR:PORT of the server to connect to")
                .default_value(DEFAULT_ADDRESS),
        )
        .get_matches();

    let addr = matches.value_of("addr").unwrap();
    if let Err(e) = repl(addr) {
        eprintln!("{:?}", e);
        exit(1);
    }
}

fn repl(addr: &str) -> Result<()> {
    let mut client = Client::connect(addr)?;
    println!("Connected to {}. Type 'exit' to quit.", addr);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        match eval(&mut client, line) {
            Ok(output) => println!("{}", output),
            Err(StoreError::Parsing(msg)) => eprintln!("{}", msg),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Parses one REPL line and runs it against the server.
fn eval(client: &mut Client, line: &str) -> Result<String> {
    let mut tokens = line.splitn(3, ' ');
    let command = tokens.next().unwrap_or_default();

    match command {
        "SET" => {
            let key = tokens
                .next()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| usage())?;
            let raw = tokens.next().unwrap_or_default();
            let value = unquote(raw).ok_or_else(|| {
                StoreError::Parsing(format!(
                    "the value of SET must be double-quoted, got: {}",
                    raw
                ))
            })?;
            client.set(key.as_bytes(), value.as_bytes())?;
            Ok("OK".to_string())
        }
        "GET" => {
            let key = single_key(&mut tokens)?;
            match client.get(key.as_bytes())? {
                Some(value) => Ok(String::from_utf8_lossy(&value).into_owned()),
                None => Ok("nil".to_string()),
            }
        }
        "DEL" => {
            let key = single_key(&mut tokens)?;
            let erased = client.del(key.as_bytes())?;
            Ok(if erased { "1" } else { "0" }.to_string())
        }
        _ => Err(usage()),
    }
}

fn single_key<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> Result<&'a str> {
    let key = tokens
        .next()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| usage())?;
    if tokens.next().is_some() {
        return Err(usage());
    }
    Ok(key)
}

/// Strips surrounding double quotes, or `None` if the value is not quoted.
fn unquote(raw: &str) -> Option<&str> {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        Some(&raw[1..raw.len() - 1])
    } else {
        None
    }
}

fn usage() -> StoreError {
    StoreError::Parsing(
        "expected one of: SET <key> \"<value>\" | GET <key> | DEL <key> | exit".to_string(),
    )
}
