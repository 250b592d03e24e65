//! Events as attribute maps, and loading them from JSON.

use crate::runtime::{EvaluationRuntime, FunctionDescriptor, FunctionRegistry};
use crate::value::Value;
use log::{debug, trace};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::BufRead;
use std::path::Path;
use thiserror::Error;

/// Members holding the event payload rather than attributes
const PAYLOAD_MEMBERS: [&str; 2] = ["data", "data_base64"];

/// Errors that can occur while reading events
#[derive(Error, Debug)]
pub enum EventError {
    #[error("event must be a JSON object, found {0}")]
    NotAnObject(String),

    #[error("attribute '{name}' has unsupported value {value}")]
    UnsupportedValue { name: String, value: String },

    #[error("invalid JSON on line {line}: {source}")]
    InvalidLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EventResult<T> = Result<T, EventError>;

/// The attributes of one event, ordered by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Event {
    attributes: BTreeMap<String, Value>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style attribute setter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set an attribute, returning the previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attributes.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Build an event from a JSON object.
    ///
    /// Payload members and nulls are skipped. Numbers must be integers that
    /// fit in 32 bits; arrays and nested objects are rejected.
    pub fn from_json(json: &serde_json::Value) -> EventResult<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| EventError::NotAnObject(json.to_string()))?;

        let mut event = Event::new();
        for (name, member) in object {
            if PAYLOAD_MEMBERS.contains(&name.as_str()) || member.is_null() {
                trace!("skipping event member '{}'", name);
                continue;
            }

            let value = match member {
                serde_json::Value::Bool(b) => Value::Boolean(*b),
                serde_json::Value::String(s) => Value::String(s.clone()),
                serde_json::Value::Number(n) => n
                    .as_i64()
                    .and_then(|n| i32::try_from(n).ok())
                    .map(Value::Integer)
                    .ok_or_else(|| unsupported(name, member))?,
                _ => return Err(unsupported(name, member)),
            };
            event.set(name.clone(), value);
        }

        Ok(event)
    }

    /// Parse a single JSON object
    pub fn from_json_str(text: &str) -> EventResult<Self> {
        let json: serde_json::Value = serde_json::from_str(text)
            .map_err(|source| EventError::InvalidLine { line: 1, source })?;
        Self::from_json(&json)
    }
}

fn unsupported(name: &str, member: &serde_json::Value) -> EventError {
    EventError::UnsupportedValue {
        name: name.to_string(),
        value: member.to_string(),
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Event {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut event = Event::new();
        for (name, value) in iter {
            event.set(name, value);
        }
        event
    }
}

impl EvaluationRuntime for Event {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.attributes.get(name).cloned()
    }
}

/// An event evaluated with a custom function registry
pub struct EventRuntime<'a> {
    event: &'a Event,
    functions: &'a FunctionRegistry,
}

impl<'a> EventRuntime<'a> {
    pub fn new(event: &'a Event, functions: &'a FunctionRegistry) -> Self {
        Self { event, functions }
    }

    pub fn event(&self) -> &Event {
        self.event
    }
}

impl EvaluationRuntime for EventRuntime<'_> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.event.resolve(name)
    }

    fn lookup_function(&self, name: &str) -> Option<&[FunctionDescriptor]> {
        self.functions.lookup(name)
    }
}

/// Parse events from text holding one JSON object, an array of objects, or
/// one object per line.
pub fn parse_events(text: &str) -> EventResult<Vec<Event>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Array(items)) => items.iter().map(Event::from_json).collect(),
        Ok(json) => Ok(vec![Event::from_json(&json)?]),
        Err(_) => read_json_lines(text.as_bytes()).collect(),
    }
}

/// Load events from a file, see [`parse_events`]
pub fn load_events(path: impl AsRef<Path>) -> EventResult<Vec<Event>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let events = parse_events(&text)?;
    debug!("Loaded {} event(s) from {}", events.len(), path.display());
    Ok(events)
}

/// Stream events from newline-delimited JSON. Blank lines are ignored.
pub fn read_json_lines<R: BufRead>(reader: R) -> impl Iterator<Item = EventResult<Event>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(index, line)| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(
                serde_json::from_str::<serde_json::Value>(&line)
                    .map_err(|source| EventError::InvalidLine {
                        line: index + 1,
                        source,
                    })
                    .and_then(|json| Event::from_json(&json)),
            ),
            Err(err) => Some(Err(EventError::Io(err))),
        })
}
