// SPDX-License-Identifier: AGPL-3.0-or-later

//! Prometheus text exposition
//!
//! Renders metric families in the Prometheus text format (version 0.0.4) with
//! `# HELP`, `# TYPE` annotations and label support.
//!
//! # Examples
//!
//! ```
//! use std::collections::BTreeMap;
//! use nvme_exporter::prometheus::{render, MetricFamily, MetricType};
//!
//! let mut family = MetricFamily::new("nvme_power_cycles", "Number of power cycles", MetricType::Counter);
//! let mut labels = BTreeMap::new();
//! labels.insert("device".to_string(), "/dev/nvme0n1".to_string());
//! family.add_sample(55.0, labels);
//!
//! let output = render(&[family]);
//! assert!(output.contains("nvme_power_cycles{device=\"/dev/nvme0n1\"} 55"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Content type of the text exposition format
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus metric type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricType {
    /// A gauge is a metric that represents a single numerical value that can go up and down
    Gauge,
    /// A counter is a metric that represents a single monotonically increasing counter
    Counter,
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gauge => write!(f, "gauge"),
            Self::Counter => write!(f, "counter"),
        }
    }
}

/// A single metric sample with labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Label key-value pairs
    pub labels: BTreeMap<String, String>,
    /// Metric value
    pub value: f64,
}

/// A complete metric family with metadata and samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFamily {
    /// Metric name
    pub name: String,
    /// Help text
    pub help: String,
    /// Metric type
    pub metric_type: MetricType,
    /// Samples
    pub samples: Vec<MetricSample>,
}

impl MetricFamily {
    /// Create an empty family
    pub fn new(name: &str, help: &str, metric_type: MetricType) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            metric_type,
            samples: Vec::new(),
        }
    }

    /// Add a labeled sample to this family
    pub fn add_sample(&mut self, value: f64, labels: BTreeMap<String, String>) {
        self.samples.push(MetricSample { labels, value });
    }

    /// Format this metric family in Prometheus exposition format
    pub fn format(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# HELP {} {}\n", self.name, escape_help(&self.help)));
        out.push_str(&format!("# TYPE {} {}\n", self.name, self.metric_type));

        for sample in &self.samples {
            if sample.labels.is_empty() {
                out.push_str(&format!("{} {}\n", self.name, format_value(sample.value)));
            } else {
                let label_str: Vec<String> = sample
                    .labels
                    .iter()
                    .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
                    .collect();
                out.push_str(&format!(
                    "{}{{{}}} {}\n",
                    self.name,
                    label_str.join(","),
                    format_value(sample.value)
                ));
            }
        }

        out
    }
}

/// Render families in order, skipping those without samples
pub fn render(families: &[MetricFamily]) -> String {
    let mut output = String::with_capacity(4096);
    for family in families.iter().filter(|f| !f.samples.is_empty()) {
        output.push_str(&family.format());
    }
    output
}

/// Escape a label value for Prometheus format
fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Escape help text (quotes are legal there)
fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a float value for Prometheus (special handling for NaN, Inf)
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value == value.floor() && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
