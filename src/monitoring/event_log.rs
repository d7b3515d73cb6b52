use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;

use crate::error::SimResult;
use crate::global_variables::{EVENT_LOG_CAPACITY, EXTEND_LOG_INTERVAL_SECS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogCategory {
    Normal,
    Switch,
    Extend,
    Alert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub time: u64,
    pub message: String,
    pub category: LogCategory,
}

/// Ordered observability stream. Engine logic never reads it back.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    /// Simulated wall-clock seconds, advanced by the tick driver.
    clock: f64,
    extend_interval: f64,
    last_extend: Option<f64>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(EVENT_LOG_CAPACITY, EXTEND_LOG_INTERVAL_SECS)
    }
}

impl EventLog {
    pub fn new(capacity: usize, extend_interval: f64) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
            clock: 0.0,
            extend_interval,
            last_extend: None,
        }
    }

    pub fn advance_clock(&mut self, seconds: f64) {
        self.clock += seconds;
    }

    pub fn set_extend_interval(&mut self, seconds: f64) {
        self.extend_interval = seconds;
    }

    /// Appends an entry. Returns false when an `Extend` entry was dropped by the rate limit.
    pub fn push(&mut self, time: u64, message: impl Into<String>, category: LogCategory) -> bool {
        if category == LogCategory::Extend {
            if let Some(last) = self.last_extend {
                if self.clock - last < self.extend_interval {
                    return false;
                }
            }
            self.last_extend = Some(self.clock);
        }

        let message = message.into();
        match category {
            LogCategory::Alert => log::warn!("[t={}] {}", time, message),
            LogCategory::Extend => log::debug!("[t={}] {}", time, message),
            LogCategory::Normal | LogCategory::Switch => log::info!("[t={}] {}", time, message),
        }

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            time,
            message,
            category,
        });
        true
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, category: LogCategory) -> usize {
        self.entries.iter().filter(|e| e.category == category).count()
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> SimResult<()> {
        let mut wtr = csv::WriterBuilder::new().has_headers(true).from_path(path)?;
        for entry in &self.entries {
            wtr.serialize(entry)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
