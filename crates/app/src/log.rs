use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use serde::{Deserialize, Serialize};

static LOG: Mutex<Option<Sink>> = Mutex::new(None);

#[allow(clippy::missing_errors_doc)]
pub trait Repository: Send + Sync + 'static {
    fn read_entries(&self) -> Result<VecDeque<Entry>, Error>;
    fn write_entry(&self, entry: Entry) -> Result<(), Error>;
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{0}")]
    Unknown(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub time: String,
    #[serde(with = "LevelDef")]
    pub level: Level,
    pub message: String,
}

#[derive(Serialize, Deserialize)]
#[serde(remote = "Level")]
pub enum LevelDef {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Serialize, Deserialize)]
#[serde(remote = "LevelFilter", rename_all = "lowercase")]
pub enum LevelFilterDef {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// The most recent log entries kept in memory, newest first.
pub struct Ring {
    capacity: usize,
    entries: Mutex<VecDeque<Entry>>,
}

impl Ring {
    pub const DEFAULT_CAPACITY: usize = 100;

    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }
}

impl Default for Ring {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl Repository for Ring {
    fn read_entries(&self) -> Result<VecDeque<Entry>, Error> {
        Ok(self
            .entries
            .lock()
            .map_err(|err| Error::Unknown(err.to_string()))?
            .clone())
    }

    fn write_entry(&self, entry: Entry) -> Result<(), Error> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|err| Error::Unknown(err.to_string()))?;
        entries.push_front(entry);
        entries.truncate(self.capacity);
        Ok(())
    }
}

struct Sink {
    repository: Arc<dyn Repository>,
    stderr_level: LevelFilter,
}

static LOGGER: Logger = Logger;

/// Every record is kept in the repository, records up to `stderr_level` are also printed to
/// stderr.
///
/// # Errors
///
/// Returns an error if the logger has already been initialized.
pub fn init(
    repository: Arc<dyn Repository>,
    stderr_level: LevelFilter,
) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    *LOG.lock().unwrap_or_else(PoisonError::into_inner) = Some(Sink {
        repository,
        stderr_level,
    });
    log::set_max_level(LevelFilter::Debug);
    Ok(())
}

/// Changes which records are printed to stderr once the configured level is known.
pub fn set_stderr_level(level: LevelFilter) {
    if let Some(ref mut sink) = *LOG.lock().unwrap_or_else(PoisonError::into_inner) {
        sink.stderr_level = level;
    }
}

struct Logger;

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(ref sink) = *LOG.lock().unwrap_or_else(PoisonError::into_inner) {
            let entry = Entry {
                time: Local::now().format("%b %d %H:%M:%S").to_string(),
                level: record.level(),
                message: record.args().to_string(),
            };
            if entry.level <= sink.stderr_level {
                eprintln!("{} {:<5} {}", entry.time, entry.level, entry.message);
            }
            let _ = sink.repository.write_entry(entry);
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use anyhow::Context;
    use pretty_assertions::assert_eq;

    use super::*;

    fn entry(message: &str) -> Entry {
        Entry {
            time: "Jan 01 00:00:00".to_string(),
            level: Level::Info,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_ring_keeps_newest_entries() {
        let ring = Ring::new(2);

        for message in ["a", "b", "c"] {
            ring.write_entry(entry(message)).unwrap();
        }

        assert_eq!(
            ring.read_entries().unwrap(),
            VecDeque::from([entry("c"), entry("b")])
        );
    }

    #[test]
    fn test_ring_default_capacity() {
        let ring = Ring::default();

        for i in 0..=Ring::DEFAULT_CAPACITY {
            ring.write_entry(entry(&i.to_string())).unwrap();
        }

        let entries = ring.read_entries().unwrap();
        assert_eq!(entries.len(), Ring::DEFAULT_CAPACITY);
        assert_eq!(entries[0], entry(&Ring::DEFAULT_CAPACITY.to_string()));
    }

    #[test]
    fn test_init() {
        let ring = Arc::new(Ring::new(10_000));
        init(Arc::clone(&ring) as Arc<dyn Repository>, LevelFilter::Off).unwrap();
        log::info!("logger initialized");

        let error = init(Arc::new(Ring::default()), LevelFilter::Off)
            .context("failed to initialize logging")
            .unwrap_err();

        assert_eq!(error.to_string(), "failed to initialize logging");
        log::debug!("still logging");
        let messages = ring
            .read_entries()
            .unwrap()
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>();
        assert!(messages.contains(&"logger initialized".to_string()));
        assert!(messages.contains(&"still logging".to_string()));
    }

    #[test]
    fn test_entry_serialize() {
        assert_eq!(
            serde_json::to_string(&entry("foo")).unwrap(),
            r#"{"time":"Jan 01 00:00:00","level":"Info","message":"foo"}"#
        );
    }
}
