use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use jms_selector::{DeliveryMode, IndexableKeys, Message, Selector, Value};
use miette::IntoDiagnostic;
use slog::{o, Discard, Drain, Logger};

/// Compile, evaluate and index JMS message selectors
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// log selector compilation and evaluation to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a selector and print its canonical form
    Check { selector: String },

    /// Print the property constraints a broker can index the selector by
    Keys {
        selector: String,

        /// emit JSON instead of one key per line
        #[arg(long)]
        json: bool,
    },

    /// Evaluate a selector against a message; exits 0 on match, 1 otherwise
    Eval {
        selector: String,

        /// message property as NAME=VALUE (numbers, TRUE/FALSE and 'quoted' strings are typed)
        #[arg(short = 'p', long = "property", value_parser = parse_property)]
        properties: Vec<(String, Value)>,

        /// JSON object of message properties ('-' reads stdin)
        #[arg(long)]
        json: Option<PathBuf>,

        #[arg(long)]
        message_id: Option<String>,

        #[arg(long)]
        correlation_id: Option<String>,

        #[arg(long = "type")]
        jms_type: Option<String>,

        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=9))]
        priority: Option<u8>,

        #[arg(long)]
        delivery_mode: Option<DeliveryMode>,

        /// RFC 3339 timestamp or epoch milliseconds
        #[arg(long, value_parser = parse_timestamp)]
        timestamp: Option<i64>,
    },
}

/// Interpret a command-line literal the way a selector literal would read.
fn parse_value(raw: &str) -> Value {
    if let Some(quoted) = raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        return Value::String(quoted.replace("''", "'"));
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return Value::Float(f);
        }
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        _ => Value::String(raw.to_string()),
    }
}

fn parse_property(s: &str) -> Result<(String, Value), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), parse_value(value)))
        }
        _ => Err(format!("expected NAME=VALUE, found '{}'", s)),
    }
}

fn parse_timestamp(s: &str) -> Result<i64, String> {
    if let Ok(millis) = s.parse::<i64>() {
        return Ok(millis);
    }
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|t| t.timestamp_millis())
        .map_err(|e| format!("invalid timestamp '{}': {}", s, e))
}

fn json_to_value(name: &str, json: serde_json::Value) -> anyhow::Result<Option<Value>> {
    Ok(match json {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(Value::Boolean(b)),
        serde_json::Value::String(s) => Some(Value::String(s)),
        serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Some(Value::Integer(i)),
            (None, Some(f)) => Some(Value::Float(f)),
            _ => bail!("property '{}': number {} is out of range", name, n),
        },
        other => bail!(
            "property '{}': only scalar values are allowed, found {}",
            name,
            other
        ),
    })
}

fn load_properties(path: &PathBuf) -> anyhow::Result<BTreeMap<String, Value>> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading properties from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading properties from {}", path.display()))?
    };

    let parsed: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(&text).context("properties must be a JSON object")?;

    let mut properties = BTreeMap::new();
    for (name, json) in parsed {
        if let Some(value) = json_to_value(&name, json)? {
            properties.insert(name, value);
        }
    }
    log::debug!("loaded {} properties from {}", properties.len(), path.display());
    Ok(properties)
}

fn run(args: Args, logger: &Logger) -> miette::Result<ExitCode> {
    match args.command {
        Command::Check { selector } => {
            let selector = Selector::with_logger(&selector, logger)?;
            println!("{}", selector);
            Ok(ExitCode::SUCCESS)
        }
        Command::Keys { selector, json } => {
            let keys = Selector::with_logger(&selector, logger)?.indexable_keys();
            if json {
                println!("{}", serde_json::to_string_pretty(&keys).into_diagnostic()?);
            } else {
                match &keys {
                    IndexableKeys::MatchAll => println!("(no selector: matches every message)"),
                    IndexableKeys::Keys(keys) if keys.is_empty() => {
                        println!("(not indexable)")
                    }
                    IndexableKeys::Keys(keys) => {
                        for key in keys {
                            println!("{}", key);
                        }
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Eval {
            selector,
            properties,
            json,
            message_id,
            correlation_id,
            jms_type,
            priority,
            delivery_mode,
            timestamp,
        } => {
            let selector = Selector::with_logger(&selector, logger)?;

            let mut message = Message::new();
            if let Some(path) = json {
                for (name, value) in load_properties(&path).map_err(|e| miette::miette!("{:#}", e))? {
                    message.set_property(name, value);
                }
            }
            for (name, value) in properties {
                message.set_property(name, value);
            }
            if let Some(id) = message_id {
                message = message.with_message_id(id);
            }
            if let Some(id) = correlation_id {
                message = message.with_correlation_id(id);
            }
            if let Some(t) = jms_type {
                message = message.with_type(t);
            }
            if let Some(p) = priority {
                message = message.with_priority(p);
            }
            if let Some(mode) = delivery_mode {
                message = message.with_delivery_mode(mode);
            }
            if let Some(millis) = timestamp {
                message = message.with_timestamp_millis(millis);
            }

            let result = selector.evaluate(&message);
            log::info!("selector '{}' evaluated to {}", selector, result);
            println!("{}", result);
            Ok(if result.is_true() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
    }
}

pub fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();

    let logger = if args.verbose {
        let plain = slog_term::PlainSyncDecorator::new(std::io::stderr());
        Logger::root(slog_term::FullFormat::new(plain).build().fuse(), o!())
    } else {
        Logger::root(Discard, o!())
    };

    match run(args, &logger) {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{:?}", report);
            ExitCode::from(2)
        }
    }
}
