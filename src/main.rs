//! local-channels console.
//!
//! Reads one command per line from stdin and applies it to a single
//! in-process [`ChannelRegistry`]. Handy for poking at channel semantics
//! by hand.

use std::collections::HashMap;
use std::io::{self, BufRead};
use std::sync::Arc;

use anyhow::{Context, bail};
use tracing_subscriber::EnvFilter;

use local_channels::config::MuxConfig;
use local_channels::domain::{ChannelInput, ChannelRegistry, FnReader, Subscription};

const HELP: &str = "\
commands:
  connect <ch>            connect a channel
  disconnect <ch>         disconnect a channel
  type <ch> <type>        declare the value type
  init <ch> <value>       declare the initial value
  write <ch> <value>      write a value (JSON, or raw text)
  snapshot <ch>           print a channel snapshot
  watch <ch>              print notifications from a channel
  unwatch <ch>            stop printing notifications
  list                    list all channels
  evict                   remove unused channels
  quit                    exit";

const CHANNEL_COMMANDS: [&str; 8] = [
    "connect",
    "disconnect",
    "type",
    "init",
    "write",
    "snapshot",
    "watch",
    "unwatch",
];

enum Flow {
    Continue,
    Quit,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    // Load configuration
    let config = MuxConfig::from_env();
    tracing::info!(
        eviction = ?config.eviction,
        event_bus_capacity = config.event_bus_capacity,
        "starting local-channels console"
    );

    let registry = ChannelRegistry::with_config(&config);
    let mut watches: HashMap<String, Subscription> = HashMap::new();

    for line in io::stdin().lock().lines() {
        let line = line?;
        let mut parts = line.trim().splitn(3, char::is_whitespace);
        let Some(command) = parts.next().filter(|c| !c.is_empty()) else {
            continue;
        };
        let channel = parts.next();
        let argument = parts.next().map(str::trim);

        match run(&registry, &mut watches, command, channel, argument) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(err) => println!("error: {err:#}"),
        }
    }

    for subscription in watches.values() {
        registry.unsubscribe(subscription);
    }
    Ok(())
}

fn run(
    registry: &ChannelRegistry,
    watches: &mut HashMap<String, Subscription>,
    command: &str,
    channel: Option<&str>,
    argument: Option<&str>,
) -> anyhow::Result<Flow> {
    match command {
        "quit" | "exit" => return Ok(Flow::Quit),
        "help" => println!("{HELP}"),
        "list" => {
            for snapshot in registry.snapshots() {
                let value = snapshot
                    .value
                    .map_or_else(|| "-".to_string(), |v| v.to_string());
                let declared = snapshot
                    .declared_type
                    .map_or_else(|| "-".to_string(), |t| t.to_string());
                println!(
                    "{} {} {} {} (readers {}, writers {})",
                    snapshot.name, snapshot.state, declared, value, snapshot.readers, snapshot.writers
                );
            }
        }
        "evict" => println!("evicted {}", registry.evict_unused()),
        other if !CHANNEL_COMMANDS.contains(&other) => {
            bail!("unknown command {other:?}; try `help`")
        }
        _ => {
            let name = channel.context("missing channel name")?;
            let handle = registry.lookup(name);
            match command {
                "connect" => registry.connect(&handle),
                "disconnect" => registry.disconnect(&handle),
                "type" => {
                    let type_name = argument.context("missing type name")?;
                    registry.declare_type(&handle, type_name)?;
                }
                "init" => {
                    let value = argument.context("missing value")?;
                    registry.declare_initial_value(&handle, parse_input(value))?;
                }
                "write" => {
                    let value = argument.context("missing value")?;
                    registry.write_with_callback(&handle, parse_input(value), |result| {
                        match result {
                            Ok(()) => println!("ok"),
                            Err(err) => println!("rejected ({}): {err}", err.kind()),
                        }
                    });
                }
                "snapshot" => {
                    println!("{}", serde_json::to_string_pretty(&handle.snapshot())?);
                }
                "watch" => {
                    if !watches.contains_key(name) {
                        let reader = FnReader::new(|ch, value| println!("[{ch}] {value}"))
                            .with_connection(|ch, state| println!("[{ch}] {state}"));
                        let subscription = registry.subscribe_reader(&handle, Arc::new(reader));
                        watches.insert(name.to_string(), subscription);
                    }
                }
                "unwatch" => {
                    if let Some(subscription) = watches.remove(name) {
                        drop(handle);
                        registry.unsubscribe(&subscription);
                    }
                }
                _ => {}
            }
        }
    }
    Ok(Flow::Continue)
}

/// Values are read as JSON when possible, otherwise as raw text.
fn parse_input(raw: &str) -> ChannelInput {
    serde_json::from_str::<serde_json::Value>(raw)
        .map_or_else(|_| ChannelInput::from(raw), ChannelInput::from)
}
