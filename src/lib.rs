// SPDX-License-Identifier: AGPL-3.0-or-later

//! # NVMe Exporter
//!
//! Prometheus metrics for NVMe namespaces and controllers, read through
//! nvme-cli's JSON output.
//!
//! Each scrape re-enumerates the machine from scratch:
//!
//! 1. [`topology`] turns `nvme list` output (three layouts across nvme-cli
//!    releases) into one [`DeviceRecord`] per namespace, inferring the owning
//!    controller where the layout leaves it out.
//! 2. [`topology::enrich`] attaches each controller's total capacity from
//!    `nvme id-ctrl`, one call per controller.
//! 3. [`smart`] extracts health samples from every namespace's `nvme smart-log`,
//!    converting temperatures from Kelvin.
//! 4. [`Collector`] checks every sample against the [`MetricCatalogue`] and
//!    [`prometheus`] renders the result.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use nvme_exporter::{Collector, MetricCatalogue, NvmeCli, TemperatureScale};
//!
//! let scale = TemperatureScale::Celsius;
//! let collector = Collector::new(Arc::new(MetricCatalogue::new(&scale)), scale);
//! let text = collector.scrape(&NvmeCli::default()).unwrap();
//! print!("{}", text);
//! ```

pub mod catalogue;
pub mod collector;
pub mod config;
pub mod error;
#[cfg(feature = "cli")]
pub mod http_server;
pub mod json;
pub mod nvme_cli;
pub mod preflight;
pub mod prometheus;
pub mod smart;
pub mod topology;

pub use catalogue::{MetricCatalogue, MetricDescriptor};
pub use collector::Collector;
pub use config::{ExporterConfig, LogLevel};
pub use error::{ExporterError, Result};
#[cfg(feature = "cli")]
pub use http_server::HttpServer;
pub use nvme_cli::{NvmeCli, NvmeSource};
pub use smart::{HealthExtractor, HealthSample, TemperatureScale};
pub use topology::{parse_topology, DeviceRecord, TopologyShape};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
