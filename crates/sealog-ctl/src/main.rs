//! Operator CLI for sealed-log objects in a local store.
//!
//! Each operation subcommand prints one JSON line holding the stable status
//! code of the invocation and any reply payload. `dump` lists an object's
//! persisted keys through the host-side scan, decoding reserved scalars and
//! position entries.

use anyhow::Context;
use clap::Parser;
use objclass::store::Reply;
use sealog::{client, codec, entry::LogEntry, keys};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(about = "Operate on sealed-log objects in a local object store")]
struct Cli {
    /// Path of the backing store.
    #[arg(long, env = "SEALOG_STORE", default_value = "sealog.db", global = true)]
    store: std::path::PathBuf,

    /// Log verbosity: trace|debug|info|warn|error|off.
    #[arg(long = "log.level", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

// The tool runs one operation and exits, so logging stays simple: events to
// stderr (stdout carries the JSON result lines), filtered by --log.level.
// Interactive terminals get compact text; anything else gets jsonl so logs
// stay machine-readable when the tool runs under a supervisor.
fn init_logging(level: &str) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(level)
        .with_target(false);

    if atty::is(atty::Stream::Stderr) {
        builder.compact().init();
    } else {
        builder.json().flatten_event(true).init();
    }
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Seal an object at a new epoch, refusing lower-epoch mutations.
    Seal {
        object: String,
        epoch: u64,
    },
    /// Write data into an unset position.
    Write {
        object: String,
        epoch: u64,
        position: u64,
        /// Entry data, as a literal string.
        data: String,
    },
    /// Invalidate an unset position so the sequencer can skip it.
    Fill {
        object: String,
        epoch: u64,
        position: u64,
    },
    /// Read the entry at a position.
    Read {
        object: String,
        epoch: u64,
        position: u64,
    },
    /// Report the largest written position.
    MaxPosition {
        object: String,
        epoch: u64,
    },
    /// Report the projection counter.
    GetProjection {
        object: String,
    },
    /// Initialize or bump the projection counter.
    SetProjection {
        object: String,
    },
    /// Dump an object's persisted keys and entries.
    Dump {
        object: String,
    },
}

#[derive(Debug, serde::Serialize)]
struct Outcome {
    status: i32,
    status_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    projection: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
}

impl Outcome {
    fn of(reply: &Reply) -> Outcome {
        Outcome {
            status: reply.status,
            status_name: status_name(reply.status),
            position: None,
            projection: None,
            data: None,
        }
    }
}

fn status_name(status: i32) -> &'static str {
    match status {
        0 => "ok",
        1 => "stale_epoch",
        2 => "invalid_epoch",
        3 => "read_only",
        4 => "not_written",
        5 => "invalidated",
        objclass::NOT_FOUND => "not_found",
        objclass::IO_ERROR => "io_error",
        objclass::MALFORMED => "malformed",
        _ => "unknown",
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut registry = objclass::Registry::new();
    sealog::register(&mut registry);

    let store = objclass::Store::open(&cli.store, registry)
        .with_context(|| format!("opening store at {:?}", cli.store))?;
    tracing::debug!(store = ?cli.store, "opened store");
    let exec = |object: &str, method: &str, input: Vec<u8>| -> anyhow::Result<Reply> {
        Ok(store.exec(object, sealog::CLASS, method, &input)?)
    };

    let outcome = match &cli.command {
        Command::Seal { object, epoch } => {
            Outcome::of(&exec(object, "seal", client::seal(*epoch))?)
        }
        Command::Write {
            object,
            epoch,
            position,
            data,
        } => Outcome::of(&exec(
            object,
            "write",
            client::write(*epoch, *position, data.as_bytes()),
        )?),
        Command::Fill {
            object,
            epoch,
            position,
        } => Outcome::of(&exec(object, "fill", client::fill(*epoch, *position))?),
        Command::Read {
            object,
            epoch,
            position,
        } => {
            let reply = exec(object, "read", client::read(*epoch, *position))?;
            let mut outcome = Outcome::of(&reply);
            if reply.status == 0 {
                outcome.data = Some(String::from_utf8_lossy(&reply.data).into_owned());
            }
            outcome
        }
        Command::MaxPosition { object, epoch } => {
            let reply = exec(object, "max_position", client::max_position(*epoch))?;
            let mut outcome = Outcome::of(&reply);
            if reply.status == 0 {
                outcome.position = Some(client::max_position_reply(&reply.data)?);
            }
            outcome
        }
        Command::GetProjection { object } => {
            let reply = exec(object, "get_projection", client::get_projection())?;
            let mut outcome = Outcome::of(&reply);
            if reply.status == 0 {
                outcome.projection = Some(client::get_projection_reply(&reply.data)?);
            }
            outcome
        }
        Command::SetProjection { object } => {
            Outcome::of(&exec(object, "set_projection", client::set_projection())?)
        }
        Command::Dump { object } => {
            return dump(&store, object);
        }
    };

    println!("{}", serde_json::to_string(&outcome)?);
    Ok(())
}

fn dump(store: &objclass::Store, object: &str) -> anyhow::Result<()> {
    for (key, value) in store.scan(object)? {
        let line = if let Some(position) = keys::parse_position(&key) {
            match LogEntry::decode(&value) {
                Ok(entry) if entry.invalidated() => {
                    json!({"position": position, "state": "invalidated"})
                }
                Ok(entry) => {
                    json!({"position": position, "state": "written", "bytes": entry.data.len()})
                }
                Err(_) => json!({"position": position, "corrupt": true}),
            }
        } else if matches!(key.as_str(), keys::EPOCH | keys::PROJECTION | keys::MAX_POSITION) {
            match codec::decode_u64(&value) {
                Ok(decoded) => json!({"key": key, "value": decoded}),
                Err(_) => json!({"key": key, "corrupt": true}),
            }
        } else {
            json!({"key": key, "bytes": value.len()})
        };
        println!("{line}");
    }
    Ok(())
}
