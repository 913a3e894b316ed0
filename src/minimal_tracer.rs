// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use std::{
    env,
    fmt::{self, Write},
    sync::atomic::{AtomicU64, Ordering},
};

use tracing::{field::Visit, Id, Level, Subscriber};
use tracing_core::Field;

use crate::environment;

struct StringVisitor<'a> {
    string: &'a mut String,
}

impl Visit for StringVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        // writing into a String cannot fail
        let _ = if field.name() == "message" {
            write!(self.string, "{value:?} ")
        } else {
            write!(self.string, "{} = {:?}; ", field.name(), value)
        };
    }
}

#[derive(Debug, PartialEq)]
struct LogFilter {
    target: Option<String>,
    level: Option<Level>,
}

impl LogFilter {
    fn matches(&self, metadata: &tracing::Metadata<'_>) -> bool {
        if let Some(level) = &self.level {
            if metadata.level() != level {
                return false;
            }
        }
        if let Some(target) = &self.target {
            if !metadata.target().starts_with(target.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Subscriber printing events to stderr, filtered by `FETCH_PONYFILL_LOG`.
///
/// The variable holds a comma separated list of `level`, `target` or
/// `target=level` entries. Logging is disabled when it is unset.
pub struct MinimalTracer {
    enabled: bool,
    filters: Vec<LogFilter>,
}

fn string_to_level(string: &str) -> Option<Level> {
    match string.to_lowercase().as_str() {
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "warn" | "warning" => Some(Level::WARN),
        "trace" => Some(Level::TRACE),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn parse_filters(value: &str) -> Vec<LogFilter> {
    value
        .split(',')
        .filter(|filter| !filter.is_empty())
        .map(|filter| {
            if let Some((target, level)) = filter.split_once('=') {
                return LogFilter {
                    target: Some(target.to_string()),
                    level: string_to_level(level),
                };
            }
            match string_to_level(filter) {
                Some(level) => LogFilter {
                    target: None,
                    level: Some(level),
                },
                None => LogFilter {
                    target: Some(filter.to_string()),
                    level: None,
                },
            }
        })
        .collect()
}

impl MinimalTracer {
    pub fn register() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
        let tracer = match env::var(environment::ENV_FETCH_PONYFILL_LOG) {
            Ok(value) => MinimalTracer {
                enabled: true,
                filters: parse_filters(&value),
            },
            Err(_) => MinimalTracer {
                enabled: false,
                filters: Vec::new(),
            },
        };
        tracing::subscriber::set_global_default(tracer)
    }
}

static AUTO_ID: AtomicU64 = AtomicU64::new(1);

impl Subscriber for MinimalTracer {
    fn enabled(&self, metadata: &tracing::Metadata<'_>) -> bool {
        if !self.enabled {
            return false;
        }
        self.filters.is_empty() || self.filters.iter().any(|filter| filter.matches(metadata))
    }

    fn new_span(&self, _span: &tracing_core::span::Attributes<'_>) -> tracing_core::span::Id {
        Id::from_u64(AUTO_ID.fetch_add(1, Ordering::Relaxed))
    }

    fn record(&self, _span: &tracing_core::span::Id, _values: &tracing_core::span::Record<'_>) {}

    fn record_follows_from(
        &self,
        _span: &tracing_core::span::Id,
        _follows: &tracing_core::span::Id,
    ) {
    }

    fn event(&self, event: &tracing::Event<'_>) {
        let metadata = event.metadata();

        let mut text = String::new();
        event.record(&mut StringVisitor { string: &mut text });

        eprintln!("{} {}: {}", metadata.level(), metadata.target(), text);
    }

    fn enter(&self, _span: &tracing_core::span::Id) {}

    fn exit(&self, _span: &tracing_core::span::Id) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_levels_and_targets() {
        let filters = parse_filters("debug,fetch_ponyfill::http=trace,hyper");
        assert_eq!(
            filters,
            vec![
                LogFilter {
                    target: None,
                    level: Some(Level::DEBUG),
                },
                LogFilter {
                    target: Some("fetch_ponyfill::http".into()),
                    level: Some(Level::TRACE),
                },
                LogFilter {
                    target: Some("hyper".into()),
                    level: None,
                },
            ]
        );
    }

    #[test]
    fn ignores_empty_entries() {
        assert!(parse_filters("").is_empty());
        assert_eq!(parse_filters("warn,").len(), 1);
    }
}
