// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-controller capacity enrichment.

use std::collections::BTreeMap;

use super::DeviceRecord;
use crate::error::{ExporterError, Result};
use crate::json::{field_i64, parse_document};

/// Total NVM capacity per controller, in bytes
pub type ControllerCapacity = BTreeMap<String, i64>;

/// Controllers referenced by `records`, deduplicated, in order of first appearance.
pub fn distinct_controllers(records: &[DeviceRecord]) -> Vec<String> {
    let mut seen = Vec::new();
    for record in records {
        if !seen.contains(&record.controller_id) {
            seen.push(record.controller_id.clone());
        }
    }
    seen
}

/// Attach `total_capacity` to every record, calling `lookup` once per controller.
///
/// Any lookup failure aborts the enrichment; records already touched keep
/// their new value but the caller is expected to discard the whole poll.
pub fn enrich<F>(records: &mut [DeviceRecord], mut lookup: F) -> Result<()>
where
    F: FnMut(&str) -> Result<i64>,
{
    if let Some(orphan) = records.iter().find(|r| r.controller_id.is_empty()) {
        return Err(ExporterError::MissingController(orphan.device_path.clone()));
    }

    for controller in distinct_controllers(records) {
        let capacity = lookup(&controller)?;
        log::debug!("controller {} total capacity {}", controller, capacity);
        for record in records
            .iter_mut()
            .filter(|r| r.controller_id == controller)
        {
            record.total_capacity = capacity;
        }
    }
    Ok(())
}

/// Read `tnvmcap` from an `id-ctrl` document; zero when the field is absent.
pub fn parse_controller_capacity(raw: &str, controller: &str) -> Result<i64> {
    let doc = parse_document(raw, &format!("id-ctrl for {}", controller))?;
    Ok(field_i64(&doc, "tnvmcap"))
}

/// Fold enriched records into one capacity per controller; later records win.
pub fn controller_capacity(records: &[DeviceRecord]) -> ControllerCapacity {
    records
        .iter()
        .map(|r| (r.controller_id.clone(), r.total_capacity))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, controller: &str) -> DeviceRecord {
        DeviceRecord {
            device_path: path.to_string(),
            controller_id: controller.to_string(),
            physical_size: 1,
            used_bytes: 1,
            sector_size: 512,
            maximum_lba: 1,
            total_capacity: 0,
        }
    }

    #[test]
    fn test_shared_controller_looked_up_once() {
        let mut records = vec![record("/dev/nvme0n1", "nvme0"), record("/dev/nvme0n2", "nvme0")];
        let mut calls = Vec::new();
        enrich(&mut records, |c| {
            calls.push(c.to_string());
            Ok(960_197_124_096)
        })
        .unwrap();

        assert_eq!(calls, vec!["nvme0"]);
        assert!(records.iter().all(|r| r.total_capacity == 960_197_124_096));
    }

    #[test]
    fn test_lookup_order_is_first_appearance() {
        let mut records = vec![
            record("/dev/nvme3n1", "nvme3"),
            record("/dev/nvme1n1", "nvme1"),
            record("/dev/nvme3n2", "nvme3"),
        ];
        let mut calls = Vec::new();
        enrich(&mut records, |c| {
            calls.push(c.to_string());
            Ok(if c == "nvme3" { 300 } else { 100 })
        })
        .unwrap();

        assert_eq!(calls, vec!["nvme3", "nvme1"]);
        assert_eq!(records[0].total_capacity, 300);
        assert_eq!(records[1].total_capacity, 100);
        assert_eq!(records[2].total_capacity, 300);
    }

    #[test]
    fn test_lookup_failure_is_fatal() {
        let mut records = vec![record("/dev/nvme0n1", "nvme0"), record("/dev/nvme1n1", "nvme1")];
        let result = enrich(&mut records, |c| {
            if c == "nvme1" {
                Err(ExporterError::CommandFailed("nvme id-ctrl".into()))
            } else {
                Ok(1)
            }
        });
        assert!(matches!(result, Err(ExporterError::CommandFailed(_))));
    }

    #[test]
    fn test_empty_controller_rejected() {
        let mut records = vec![record("/dev/nvme0n1", "")];
        let result = enrich(&mut records, |_| Ok(1));
        assert!(matches!(result, Err(ExporterError::MissingController(_))));
    }

    #[test]
    fn test_parse_controller_capacity() {
        let raw = r#"{"vid": 4932, "tnvmcap": 960197124096, "unvmcap": 0}"#;
        assert_eq!(parse_controller_capacity(raw, "nvme0").unwrap(), 960_197_124_096);
        assert_eq!(parse_controller_capacity("{}", "nvme0").unwrap(), 0);
        assert!(parse_controller_capacity("<html>", "nvme0").is_err());
    }

    #[test]
    fn test_controller_capacity_last_write_wins() {
        let mut a = record("/dev/nvme0n1", "nvme0");
        a.total_capacity = 10;
        let mut b = record("/dev/nvme0n2", "nvme0");
        b.total_capacity = 20;
        let c = record("/dev/nvme1n1", "nvme1");

        let folded = controller_capacity(&[a, b, c]);
        assert_eq!(folded.len(), 2);
        assert_eq!(folded["nvme0"], 20);
        assert_eq!(folded["nvme1"], 0);
    }
}
