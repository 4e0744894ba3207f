// SPDX-License-Identifier: AGPL-3.0-or-later

//! Metric descriptor catalogue
//!
//! The fixed set of metric names, help texts, types and label sets the
//! exporter publishes. Built once at startup from the temperature scale and
//! shared read-only with every poll.

use std::collections::{BTreeMap, HashMap};

use crate::error::{ExporterError, Result};
use crate::prometheus::{MetricFamily, MetricType};
use crate::smart::{sensor_metric, TemperatureScale, MAX_TEMPERATURE_SENSORS};

/// Labels of per-device metrics
pub const DEVICE_LABELS: &[&str] = &["device"];
/// Labels of per-namespace capacity metrics
pub const DEVICE_CONTROLLER_LABELS: &[&str] = &["device", "controller"];
/// Labels of per-controller metrics
pub const CONTROLLER_LABELS: &[&str] = &["controller"];

pub const NAMESPACE_PHYSICAL_SIZE: &str = "nvme_namespace_physical_size";
pub const NAMESPACE_MAXIMUM_LBA: &str = "nvme_namespace_maximum_lba";
pub const NAMESPACE_USED_BYTES: &str = "nvme_namespace_used_bytes";
pub const NAMESPACE_SECTOR_SIZE: &str = "nvme_namespace_sector_size";
pub const TOTAL_CAPACITY: &str = "nvme_total_capacity";

/// Name, help, type and label set of one metric
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub kind: MetricType,
    pub labels: &'static [&'static str],
}

impl MetricDescriptor {
    fn new(name: &str, help: &str, kind: MetricType, labels: &'static [&'static str]) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            kind,
            labels,
        }
    }

    /// Whether `labels` has exactly this descriptor's label keys
    pub fn accepts(&self, labels: &BTreeMap<String, String>) -> bool {
        labels.len() == self.labels.len() && self.labels.iter().all(|l| labels.contains_key(*l))
    }
}

/// Immutable table of every exported metric, in exposition order
#[derive(Debug, Clone)]
pub struct MetricCatalogue {
    descriptors: Vec<MetricDescriptor>,
    index: HashMap<String, usize>,
}

impl MetricCatalogue {
    #[rustfmt::skip]
    pub fn new(scale: &TemperatureScale) -> Self {
        use MetricType::{Counter, Gauge};

        // Field descriptions follow the smart-log page of the NVMe base
        // specification 2.0.
        let mut descriptors = vec![
            MetricDescriptor::new("nvme_critical_warning", "Critical warnings for the state of the controller", Gauge, DEVICE_LABELS),
            MetricDescriptor::new("nvme_available_spare_critical", "Has the 'available_spare' value dropped below 'spare_thresh'", Gauge, DEVICE_LABELS),
            MetricDescriptor::new("nvme_temp_threshold_exceeded", "Temperature has exceeded the safe threshold", Gauge, DEVICE_LABELS),
            MetricDescriptor::new("nvme_reliability_degraded", "Device has degraded reliability due to excessive media/internal errors", Gauge, DEVICE_LABELS),
            MetricDescriptor::new("nvme_readonly", "NVMe device is currently read-only", Gauge, DEVICE_LABELS),
            MetricDescriptor::new("nvme_vmbu_failed", "The 'Volatile Memory Backup Device' has failed, if present", Gauge, DEVICE_LABELS),
            MetricDescriptor::new("nvme_pmr_ro", "The Persistent Memory Region is currently read-only", Gauge, DEVICE_LABELS),
            MetricDescriptor::new("nvme_temperature", &format!("Temperature in degrees {}", scale), Gauge, DEVICE_LABELS),
            MetricDescriptor::new("nvme_avail_spare", "Normalized percentage of remaining spare capacity available", Gauge, DEVICE_LABELS),
            MetricDescriptor::new("nvme_spare_thresh", "Async event completion may occur when avail spare < threshold", Gauge, DEVICE_LABELS),
            MetricDescriptor::new("nvme_percent_used", "Vendor specific estimate of the percentage of life used", Gauge, DEVICE_LABELS),
            MetricDescriptor::new("nvme_endurance_grp_critical_warning_summary", "Critical warnings for the state of endurance groups", Gauge, DEVICE_LABELS),
            MetricDescriptor::new("nvme_data_units_read", "Number of 512 byte data units host has read", Counter, DEVICE_LABELS),
            MetricDescriptor::new("nvme_data_units_written", "Number of 512 byte data units the host has written", Counter, DEVICE_LABELS),
            MetricDescriptor::new("nvme_host_read_commands", "Number of read commands completed", Counter, DEVICE_LABELS),
            MetricDescriptor::new("nvme_host_write_commands", "Number of write commands completed", Counter, DEVICE_LABELS),
            MetricDescriptor::new("nvme_controller_busy_time", "Amount of time in minutes controller busy with IO commands", Counter, DEVICE_LABELS),
            MetricDescriptor::new("nvme_power_cycles", "Number of power cycles", Counter, DEVICE_LABELS),
            MetricDescriptor::new("nvme_power_on_hours", "Number of power on hours", Counter, DEVICE_LABELS),
            MetricDescriptor::new("nvme_unsafe_shutdowns", "Number of unsafe shutdowns", Counter, DEVICE_LABELS),
            MetricDescriptor::new("nvme_media_errors", "Number of unrecovered data integrity errors", Counter, DEVICE_LABELS),
            MetricDescriptor::new("nvme_num_err_log_entries", "Lifetime number of error log entries", Counter, DEVICE_LABELS),
            MetricDescriptor::new("nvme_warning_temp_time", "Amount of time in minutes temperature > warning threshold", Counter, DEVICE_LABELS),
            MetricDescriptor::new("nvme_critical_comp_time", "Amount of time in minutes temperature > critical threshold", Counter, DEVICE_LABELS),
        ];

        for index in 1..=MAX_TEMPERATURE_SENSORS {
            descriptors.push(MetricDescriptor::new(
                &sensor_metric(index),
                &format!("Temperature reported by thermal sensor #{} in degrees {}", index, scale),
                Gauge,
                DEVICE_LABELS,
            ));
        }

        descriptors.extend([
            MetricDescriptor::new("nvme_thm_temp1_trans_count", "Number of times controller transitioned to lower power", Counter, DEVICE_LABELS),
            MetricDescriptor::new("nvme_thm_temp2_trans_count", "Number of times controller transitioned to lower power", Counter, DEVICE_LABELS),
            MetricDescriptor::new("nvme_thm_temp1_trans_time", "Total number of seconds controller transitioned to lower power", Counter, DEVICE_LABELS),
            MetricDescriptor::new("nvme_thm_temp2_trans_time", "Total number of seconds controller transitioned to lower power", Counter, DEVICE_LABELS),
            MetricDescriptor::new(NAMESPACE_PHYSICAL_SIZE, "Size of a namespace in bytes", Gauge, DEVICE_CONTROLLER_LABELS),
            MetricDescriptor::new(NAMESPACE_MAXIMUM_LBA, "Maximum LBA of a namespace, in blocks", Gauge, DEVICE_CONTROLLER_LABELS),
            MetricDescriptor::new(NAMESPACE_USED_BYTES, "Number of bytes used in this namespace", Gauge, DEVICE_CONTROLLER_LABELS),
            MetricDescriptor::new(NAMESPACE_SECTOR_SIZE, "Size of a sector in bytes", Gauge, DEVICE_CONTROLLER_LABELS),
            MetricDescriptor::new(TOTAL_CAPACITY, "Total capacity of an nvme device in bytes", Gauge, CONTROLLER_LABELS),
        ]);

        let index = descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.clone(), i))
            .collect();
        Self { descriptors, index }
    }

    pub fn descriptors(&self) -> &[MetricDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Position of `name` in exposition order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&MetricDescriptor> {
        self.position(name).map(|i| &self.descriptors[i])
    }

    /// Check a sample against its descriptor, returning the descriptor's position.
    pub fn check(
        &self,
        name: &str,
        kind: MetricType,
        labels: &BTreeMap<String, String>,
    ) -> Result<usize> {
        let position = self
            .position(name)
            .ok_or_else(|| ExporterError::Catalogue(format!("unknown metric {}", name)))?;
        let descriptor = &self.descriptors[position];
        if descriptor.kind != kind {
            return Err(ExporterError::Catalogue(format!(
                "{} is a {}, sample is a {}",
                name, descriptor.kind, kind
            )));
        }
        if !descriptor.accepts(labels) {
            return Err(ExporterError::Catalogue(format!(
                "{} expects labels {:?}, got {:?}",
                name,
                descriptor.labels,
                labels.keys().collect::<Vec<_>>()
            )));
        }
        Ok(position)
    }

    /// One empty family per descriptor, in exposition order
    pub fn empty_families(&self) -> Vec<MetricFamily> {
        self.descriptors
            .iter()
            .map(|d| MetricFamily::new(&d.name, &d.help, d.kind))
            .collect()
    }
}
