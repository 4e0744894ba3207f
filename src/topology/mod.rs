// SPDX-License-Identifier: AGPL-3.0-or-later

//! NVMe topology from `nvme list -o json`.
//!
//! nvme-cli has shipped three incompatible layouts for this document:
//!
//! - **Subsystem namespaces**: `Devices[].Subsystems[].Namespaces[]`, with no
//!   controller layer (remote/fabric namespaces). The controller is inferred
//!   from the namespace name.
//! - **Controller namespaces**: `Devices[].Subsystems[].Controllers[].Namespaces[]`,
//!   where every controller names itself.
//! - **Flat legacy**: `Devices[].DevicePath` only, without any size fields.
//!
//! The two subsystem layouts can share one document (a fabric subsystem next
//! to a local PCIe one), so both contribute. The legacy layout is consulted
//! only when neither of them yields a namespace.
//!
//! # Examples
//!
//! ```
//! use nvme_exporter::topology::parse_topology;
//!
//! let raw = r#"{"Devices":[{"DevicePath":"/dev/nvme0n1"}]}"#;
//! let devices = parse_topology(raw).unwrap();
//! assert_eq!(devices[0].controller_id, "nvme0");
//! assert_eq!(devices[0].physical_size, -1);
//! ```

pub mod capacity;
pub mod controller;

pub use capacity::{
    controller_capacity, distinct_controllers, enrich, parse_controller_capacity,
    ControllerCapacity,
};
pub use controller::infer_controller;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ExporterError, Result};
use crate::json::{array_at, field_i64, field_str, parse_document};

/// Marker for a size field the inventory layout does not carry
pub const UNKNOWN: i64 = -1;

/// One namespace exposed as a block device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Device node (e.g., "/dev/nvme0n1"), unique within one parse
    pub device_path: String,
    /// Owning controller (e.g., "nvme0")
    pub controller_id: String,
    /// Namespace size in bytes, or [`UNKNOWN`]
    pub physical_size: i64,
    /// Bytes in use, or [`UNKNOWN`]
    pub used_bytes: i64,
    /// Sector size in bytes, or [`UNKNOWN`]
    pub sector_size: i64,
    /// Maximum LBA in blocks, or [`UNKNOWN`]
    pub maximum_lba: i64,
    /// Controller capacity in bytes; 0 until [`enrich`] runs
    pub total_capacity: i64,
}

/// Inventory layouts, in detection order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyShape {
    /// Namespaces directly under a subsystem
    SubsystemNamespaces,
    /// Namespaces under a named controller
    ControllerNamespaces,
    /// Bare device paths (nvme-cli before 2.0)
    FlatLegacy,
}

impl TopologyShape {
    /// Order in which layouts are tried
    pub const DETECTION_ORDER: [TopologyShape; 3] = [
        TopologyShape::SubsystemNamespaces,
        TopologyShape::ControllerNamespaces,
        TopologyShape::FlatLegacy,
    ];

    /// Whether the layout hangs namespaces off a subsystem
    pub fn is_hierarchical(self) -> bool {
        !matches!(self, TopologyShape::FlatLegacy)
    }

    fn is_present(self, doc: &Value) -> bool {
        match self {
            TopologyShape::SubsystemNamespaces => {
                subsystems(doc).any(|s| s.get("Namespaces").is_some_and(Value::is_array))
            }
            TopologyShape::ControllerNamespaces => {
                subsystems(doc).any(|s| s.get("Controllers").is_some_and(Value::is_array))
            }
            TopologyShape::FlatLegacy => devices(doc).any(|d| d.get("DevicePath").is_some()),
        }
    }

    fn parse(self, doc: &Value) -> Result<Vec<DeviceRecord>> {
        match self {
            TopologyShape::SubsystemNamespaces => parse_subsystem_namespaces(doc),
            TopologyShape::ControllerNamespaces => parse_controller_namespaces(doc),
            TopologyShape::FlatLegacy => parse_flat_legacy(doc),
        }
    }
}

/// Layouts present in `doc`, in detection order.
pub fn detect_shapes(doc: &Value) -> Vec<TopologyShape> {
    TopologyShape::DETECTION_ORDER
        .into_iter()
        .filter(|shape| shape.is_present(doc))
        .collect()
}

/// Parse `nvme list -o json` output into device records.
///
/// Records are grouped by layout in detection order: every subsystem-level
/// namespace of the document, then every controller-level one. Within a
/// layout they follow document order.
///
/// Fails on invalid JSON, on a controller without a name, on a namespace
/// whose controller cannot be inferred, and when no layout yields a device.
pub fn parse_topology(raw_json: &str) -> Result<Vec<DeviceRecord>> {
    let doc = parse_document(raw_json, "nvme list")?;

    let mut records = Vec::new();
    let mut seen = HashSet::new();
    for shape in detect_shapes(&doc) {
        if !shape.is_hierarchical() && !records.is_empty() {
            break;
        }
        for record in shape.parse(&doc)? {
            if seen.insert(record.device_path.clone()) {
                records.push(record);
            } else {
                log::warn!(
                    "duplicate namespace {} in nvme list output, keeping the first",
                    record.device_path
                );
            }
        }
    }

    if records.is_empty() {
        return Err(ExporterError::NoDevices);
    }
    Ok(records)
}

fn devices(doc: &Value) -> impl Iterator<Item = &Value> {
    array_at(doc, "Devices").iter()
}

fn subsystems(doc: &Value) -> impl Iterator<Item = &Value> {
    devices(doc).flat_map(|d| array_at(d, "Subsystems"))
}

fn namespace_record(namespace: &Value, name: &str, controller_id: String) -> DeviceRecord {
    DeviceRecord {
        device_path: format!("/dev/{}", name),
        controller_id,
        physical_size: field_i64(namespace, "PhysicalSize"),
        used_bytes: field_i64(namespace, "UsedBytes"),
        sector_size: field_i64(namespace, "SectorSize"),
        maximum_lba: field_i64(namespace, "MaximumLBA"),
        total_capacity: 0,
    }
}

fn parse_subsystem_namespaces(doc: &Value) -> Result<Vec<DeviceRecord>> {
    subsystems(doc)
        .flat_map(|s| array_at(s, "Namespaces"))
        .map(|namespace| {
            let name = field_str(namespace, "NameSpace");
            let controller = infer_controller(&name)?;
            Ok(namespace_record(namespace, &name, controller))
        })
        .collect()
}

fn parse_controller_namespaces(doc: &Value) -> Result<Vec<DeviceRecord>> {
    let mut records = Vec::new();
    for subsystem in subsystems(doc) {
        let controllers = array_at(subsystem, "Controllers");
        for controller in controllers {
            let controller_id = field_str(controller, "Controller");
            if controller_id.is_empty() {
                return Err(ExporterError::MissingController(
                    Value::Array(controllers.to_vec()).to_string(),
                ));
            }
            for namespace in array_at(controller, "Namespaces") {
                let name = field_str(namespace, "NameSpace");
                records.push(namespace_record(namespace, &name, controller_id.clone()));
            }
        }
    }
    Ok(records)
}

fn parse_flat_legacy(doc: &Value) -> Result<Vec<DeviceRecord>> {
    devices(doc)
        .filter(|d| d.get("DevicePath").is_some())
        .map(|device| {
            let device_path = field_str(device, "DevicePath");
            Ok(DeviceRecord {
                controller_id: infer_controller(&device_path)?,
                device_path,
                physical_size: UNKNOWN,
                used_bytes: UNKNOWN,
                sector_size: UNKNOWN,
                maximum_lba: UNKNOWN,
                total_capacity: 0,
            })
        })
        .collect()
}
