//! Rolling performance time series.

use super::ConnectionStore;

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Maximum number of samples kept in the series.
pub const METRIC_CAPACITY: usize = 20;

/// One point on the rolling series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub label: String,
    pub value: f64,
}

/// Label used for a sample taken at `at`.
pub fn time_label(at: DateTime<Local>) -> String {
    at.format("%H:%M:%S").to_string()
}

/// Metric series store, gated on the domain connection.
#[derive(Debug)]
pub struct MetricSeries {
    capacity: usize,
    connection: Arc<ConnectionStore>,
    samples: Mutex<VecDeque<MetricSample>>,
}

impl MetricSeries {
    pub fn new(connection: Arc<ConnectionStore>) -> Self {
        Self::with_capacity(connection, METRIC_CAPACITY)
    }

    pub fn with_capacity(connection: Arc<ConnectionStore>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            connection,
            samples: Mutex::new(VecDeque::with_capacity(capacity + 1)),
        }
    }

    /// Append a sample labeled with the current local time.
    ///
    /// No-op while disconnected. Returns whether the sample was kept.
    pub fn record(&self, value: f64) -> bool {
        self.record_labeled(time_label(Local::now()), value)
    }

    pub fn record_labeled(&self, label: String, value: f64) -> bool {
        if !self.connection.is_connected() {
            return false;
        }

        let mut samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        samples.push_back(MetricSample { label, value });
        while samples.len() > self.capacity {
            samples.pop_front();
        }
        true
    }

    /// Samples oldest first.
    pub fn snapshot(&self) -> Vec<MetricSample> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
