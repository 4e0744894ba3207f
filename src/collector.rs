// SPDX-License-Identifier: AGPL-3.0-or-later

//! One poll: enumerate namespaces, enrich them with controller capacity, read
//! every smart-log and assemble the metric families.
//!
//! Polls are stateless. Every external call happens in sequence and any
//! failure discards the whole poll.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::catalogue::{
    MetricCatalogue, NAMESPACE_MAXIMUM_LBA, NAMESPACE_PHYSICAL_SIZE, NAMESPACE_SECTOR_SIZE,
    NAMESPACE_USED_BYTES, TOTAL_CAPACITY,
};
use crate::error::Result;
use crate::nvme_cli::NvmeSource;
use crate::prometheus::{render, MetricFamily, MetricType};
use crate::smart::{HealthExtractor, TemperatureScale};
use crate::topology::{
    controller_capacity, enrich, parse_controller_capacity, parse_topology, DeviceRecord,
};

/// Turns nvme-cli output into metric families
#[derive(Debug, Clone)]
pub struct Collector {
    catalogue: Arc<MetricCatalogue>,
    extractor: HealthExtractor,
}

impl Collector {
    pub fn new(catalogue: Arc<MetricCatalogue>, scale: TemperatureScale) -> Self {
        Self {
            catalogue,
            extractor: HealthExtractor::new(scale),
        }
    }

    pub fn catalogue(&self) -> &MetricCatalogue {
        &self.catalogue
    }

    /// Enumerate namespaces and attach controller capacities.
    pub fn devices(&self, source: &dyn NvmeSource) -> Result<Vec<DeviceRecord>> {
        let mut devices = parse_topology(&source.list()?)?;
        enrich(&mut devices, |controller| {
            parse_controller_capacity(&source.id_ctrl(controller)?, controller)
        })?;
        Ok(devices)
    }

    /// Run one full poll and return every family, in catalogue order.
    pub fn collect(&self, source: &dyn NvmeSource) -> Result<Vec<MetricFamily>> {
        let devices = self.devices(source)?;
        let mut families = self.catalogue.empty_families();

        for device in &devices {
            let raw = source.smart_log(&device.device_path)?;
            for sample in self.extractor.extract(&raw, &device.device_path)? {
                self.push(
                    &mut families,
                    &sample.metric,
                    sample.kind,
                    sample.value,
                    sample.labels,
                )?;
            }

            let mut labels = BTreeMap::new();
            labels.insert("device".to_string(), device.device_path.clone());
            labels.insert("controller".to_string(), device.controller_id.clone());
            for (metric, value) in [
                (NAMESPACE_MAXIMUM_LBA, device.maximum_lba),
                (NAMESPACE_USED_BYTES, device.used_bytes),
                (NAMESPACE_SECTOR_SIZE, device.sector_size),
                (NAMESPACE_PHYSICAL_SIZE, device.physical_size),
            ] {
                self.push(
                    &mut families,
                    metric,
                    MetricType::Gauge,
                    value as f64,
                    labels.clone(),
                )?;
            }
        }

        let capacities = controller_capacity(&devices);
        for (controller, capacity) in &capacities {
            let mut labels = BTreeMap::new();
            labels.insert("controller".to_string(), controller.clone());
            self.push(
                &mut families,
                TOTAL_CAPACITY,
                MetricType::Gauge,
                *capacity as f64,
                labels,
            )?;
        }

        log::info!(
            "polled {} namespaces on {} controllers",
            devices.len(),
            capacities.len()
        );
        Ok(families)
    }

    /// Run one full poll and render it in the text exposition format.
    pub fn scrape(&self, source: &dyn NvmeSource) -> Result<String> {
        Ok(render(&self.collect(source)?))
    }

    fn push(
        &self,
        families: &mut [MetricFamily],
        metric: &str,
        kind: MetricType,
        value: f64,
        labels: BTreeMap<String, String>,
    ) -> Result<()> {
        let position = self.catalogue.check(metric, kind, &labels)?;
        families[position].add_sample(value, labels);
        Ok(())
    }
}
