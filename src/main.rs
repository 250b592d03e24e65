//! cesql - evaluate a filter expression against CloudEvents-style JSON events

use anyhow::{Context, Result};
use cesql::event::{load_events, read_json_lines, EventResult};
use cesql::{EvaluationError, Event, Filter};
use clap::Parser as ClapParser;
use log::{info, warn};
use serde_json::json;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Evaluate a filter expression against events
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Filter expression, e.g. "type LIKE 'order.%' AND amount > 100"
    #[arg(short, long)]
    expression: String,

    /// File holding a JSON object, an array of objects or JSON lines.
    /// Events are read as JSON lines from stdin when omitted.
    #[arg(long)]
    event: Option<PathBuf>,

    /// Print whether each event matches instead of the raw result
    #[arg(short, long)]
    matches: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let filter = Filter::compile(&args.expression)
        .with_context(|| format!("Failed to parse expression `{}`", args.expression))?;

    let events: Box<dyn Iterator<Item = EventResult<Event>>> = match &args.event {
        Some(path) => {
            let events = load_events(path)
                .with_context(|| format!("Failed to load events from {}", path.display()))?;
            Box::new(events.into_iter().map(Ok))
        }
        None => Box::new(read_json_lines(io::stdin().lock())),
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut evaluated = 0usize;
    let mut failed = 0usize;

    for event in events {
        let event = event.context("Failed to read event")?;
        evaluated += 1;

        let line = if args.matches {
            match filter.matches(&event) {
                Ok(matched) => json!({ "matches": matched }),
                Err(err) => {
                    failed += 1;
                    error_json(&err)
                }
            }
        } else {
            match filter.evaluate(&event) {
                Ok(value) => json!({ "result": value }),
                Err(err) => {
                    failed += 1;
                    error_json(&err)
                }
            }
        };

        writeln!(out, "{}", line).context("Failed to write result")?;
    }

    out.flush().context("Failed to flush output")?;

    if failed > 0 {
        warn!("{} of {} event(s) failed to evaluate", failed, evaluated);
    } else {
        info!("Evaluated {} event(s)", evaluated);
    }

    Ok(())
}

fn error_json(err: &EvaluationError) -> serde_json::Value {
    json!({
        "error": {
            "kind": err.kind.as_str(),
            "message": err.message,
            "start": err.span.start(),
            "end": err.span.end(),
            "text": err.span.text(),
        }
    })
}
