// SPDX-License-Identifier: AGPL-3.0-or-later

//! NVMe smart-log health extraction: critical warnings, temperatures, wear,
//! I/O and error counters from `nvme smart-log <dev> -o json`.
//!
//! Two smart-log generations exist. Newer nvme-cli expands `critical_warning`
//! into an object with one member per warning bit and reports the numbered
//! temperature sensors; older releases print the whole bitfield as a single
//! number. All other fields are read the same way in both generations.
//!
//! # Examples
//!
//! ```
//! use nvme_exporter::smart::{HealthExtractor, TemperatureScale};
//!
//! let extractor = HealthExtractor::new(TemperatureScale::Celsius);
//! let samples = extractor
//!     .extract(r#"{"critical_warning": 0, "temperature": 310}"#, "/dev/nvme0n1")
//!     .unwrap();
//! let temp = samples.iter().find(|s| s.metric == "nvme_temperature").unwrap();
//! assert_eq!(temp.value, 37.0);
//! ```

pub mod temperature;

pub use temperature::TemperatureScale;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::json::{as_f64, field_f64, parse_document};
use crate::prometheus::MetricType;

/// NVMe allows up to eight temperature sensors
pub const MAX_TEMPERATURE_SENSORS: usize = 8;

/// Label carried by every health sample
pub const DEVICE_LABEL: &str = "device";

/// A smart-log field and the metric it is exported as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthField {
    /// Key in the smart-log document
    pub key: &'static str,
    /// Exported metric name
    pub metric: &'static str,
    pub kind: MetricType,
}

const fn gauge(key: &'static str, metric: &'static str) -> HealthField {
    HealthField {
        key,
        metric,
        kind: MetricType::Gauge,
    }
}

const fn counter(key: &'static str, metric: &'static str) -> HealthField {
    HealthField {
        key,
        metric,
        kind: MetricType::Counter,
    }
}

/// Members of an expanded `critical_warning` object
pub const CRITICAL_WARNING_FIELDS: [HealthField; 7] = [
    gauge("value", "nvme_critical_warning"),
    gauge("available_spare", "nvme_available_spare_critical"),
    gauge("temp_threshold", "nvme_temp_threshold_exceeded"),
    gauge("reliability_degraded", "nvme_reliability_degraded"),
    gauge("ro", "nvme_readonly"),
    gauge("vmbu_failed", "nvme_vmbu_failed"),
    gauge("pmr_ro", "nvme_pmr_ro"),
];

/// A scalar `critical_warning` bitfield
pub const CRITICAL_WARNING_SCALAR: HealthField =
    gauge("critical_warning", "nvme_critical_warning");

/// Fields read from every smart-log, whatever its generation
pub const COMMON_FIELDS: [HealthField; 21] = [
    gauge("temperature", "nvme_temperature"),
    gauge("avail_spare", "nvme_avail_spare"),
    gauge("spare_thresh", "nvme_spare_thresh"),
    gauge("percent_used", "nvme_percent_used"),
    gauge(
        "endurance_grp_critical_warning_summary",
        "nvme_endurance_grp_critical_warning_summary",
    ),
    counter("data_units_read", "nvme_data_units_read"),
    counter("data_units_written", "nvme_data_units_written"),
    counter("host_read_commands", "nvme_host_read_commands"),
    counter("host_write_commands", "nvme_host_write_commands"),
    counter("controller_busy_time", "nvme_controller_busy_time"),
    counter("power_cycles", "nvme_power_cycles"),
    counter("power_on_hours", "nvme_power_on_hours"),
    counter("unsafe_shutdowns", "nvme_unsafe_shutdowns"),
    counter("media_errors", "nvme_media_errors"),
    counter("num_err_log_entries", "nvme_num_err_log_entries"),
    counter("warning_temp_time", "nvme_warning_temp_time"),
    counter("critical_comp_time", "nvme_critical_comp_time"),
    counter("thm_temp1_trans_count", "nvme_thm_temp1_trans_count"),
    counter("thm_temp2_trans_count", "nvme_thm_temp2_trans_count"),
    // TODO: verify against a drive with populated thermal management
    // counters; earlier exporters read these two from swapped keys.
    counter("thm_temp1_total_time", "nvme_thm_temp1_trans_time"),
    counter("thm_temp2_total_time", "nvme_thm_temp2_trans_time"),
];

/// Smart-log key of temperature sensor `index` (1-based)
pub fn sensor_key(index: usize) -> String {
    format!("temperature_sensor_{}", index)
}

/// Metric name of temperature sensor `index` (1-based)
pub fn sensor_metric(index: usize) -> String {
    format!("nvme_temperature_sensor{}", index)
}

/// Smart-log generation, decided by the JSON kind of `critical_warning`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthLogSchema {
    /// `critical_warning` is an object; numbered sensors may follow
    Expanded,
    /// `critical_warning` is a plain number (or missing)
    Scalar,
}

impl HealthLogSchema {
    pub fn classify(doc: &Value) -> Self {
        match doc.get("critical_warning") {
            Some(Value::Object(_)) => Self::Expanded,
            _ => Self::Scalar,
        }
    }
}

/// One exported value for one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSample {
    /// Metric name (e.g., "nvme_temperature")
    pub metric: String,
    /// Label key-value pairs
    pub labels: BTreeMap<String, String>,
    pub value: f64,
    pub kind: MetricType,
}

/// Turns smart-log documents into samples in a fixed temperature scale
#[derive(Debug, Clone)]
pub struct HealthExtractor {
    scale: TemperatureScale,
}

impl HealthExtractor {
    pub fn new(scale: TemperatureScale) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> &TemperatureScale {
        &self.scale
    }

    /// Extract every health sample for `device_path` from one smart-log.
    ///
    /// Invalid JSON is an error; absent fields read as zero.
    pub fn extract(&self, raw_json: &str, device_path: &str) -> Result<Vec<HealthSample>> {
        let doc = parse_document(raw_json, &format!("smart-log for {}", device_path))?;
        let mut labels = BTreeMap::new();
        labels.insert(DEVICE_LABEL.to_string(), device_path.to_string());

        let mut samples = Vec::with_capacity(
            CRITICAL_WARNING_FIELDS.len() + COMMON_FIELDS.len() + MAX_TEMPERATURE_SENSORS,
        );
        match HealthLogSchema::classify(&doc) {
            HealthLogSchema::Expanded => {
                let warning = &doc["critical_warning"];
                for field in &CRITICAL_WARNING_FIELDS {
                    samples.push(self.sample(
                        field.metric,
                        field.kind,
                        field_f64(warning, field.key),
                        &labels,
                    ));
                }
                for index in 1..=MAX_TEMPERATURE_SENSORS {
                    let key = sensor_key(index);
                    let Some(reading) = doc.get(&key) else {
                        break;
                    };
                    samples.push(self.sample(
                        &sensor_metric(index),
                        MetricType::Gauge,
                        as_f64(reading),
                        &labels,
                    ));
                }
            }
            HealthLogSchema::Scalar => {
                let field = &CRITICAL_WARNING_SCALAR;
                samples.push(self.sample(
                    field.metric,
                    field.kind,
                    field_f64(&doc, field.key),
                    &labels,
                ));
            }
        }

        for field in &COMMON_FIELDS {
            samples.push(self.sample(
                field.metric,
                field.kind,
                field_f64(&doc, field.key),
                &labels,
            ));
        }
        Ok(samples)
    }

    fn sample(
        &self,
        metric: &str,
        kind: MetricType,
        raw: f64,
        labels: &BTreeMap<String, String>,
    ) -> HealthSample {
        let value = if metric.contains("temperature") {
            self.scale.from_kelvin(raw)
        } else {
            raw
        };
        HealthSample {
            metric: metric.to_string(),
            labels: labels.clone(),
            value,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPANDED_LOG: &str = r#"{
      "critical_warning": {
        "value": 0,
        "available_spare": 0,
        "temp_threshold": 1,
        "reliability_degraded": 0,
        "ro": 0,
        "vmbu_failed": 0,
        "pmr_ro": 0
      },
      "temperature": 296,
      "avail_spare": 100,
      "spare_thresh": 10,
      "percent_used": 3,
      "endurance_grp_critical_warning_summary": 0,
      "data_units_read": 53425711,
      "data_units_written": 141237850,
      "host_read_commands": 1043233960,
      "host_write_commands": 2689744003,
      "controller_busy_time": 3022,
      "power_cycles": 55,
      "power_on_hours": 28214,
      "unsafe_shutdowns": 38,
      "media_errors": 0,
      "num_err_log_entries": 104,
      "warning_temp_time": 0,
      "critical_comp_time": 0,
      "temperature_sensor_1": 306,
      "temperature_sensor_2": 300,
      "temperature_sensor_3": 298,
      "thm_temp1_trans_count": 0,
      "thm_temp2_trans_count": 0,
      "thm_temp1_total_time": 12,
      "thm_temp2_total_time": 34
    }"#;

    const SCALAR_LOG: &str = r#"{
      "critical_warning": 4,
      "temperature": 310,
      "avail_spare": 100,
      "spare_thresh": 10,
      "percent_used": 1,
      "data_units_read": 100,
      "data_units_written": 200,
      "power_on_hours": 12,
      "temperature_sensor_1": 320
    }"#;

    fn find<'a>(samples: &'a [HealthSample], metric: &str) -> Option<&'a HealthSample> {
        samples.iter().find(|s| s.metric == metric)
    }

    fn sensor_count(samples: &[HealthSample]) -> usize {
        samples
            .iter()
            .filter(|s| s.metric.starts_with("nvme_temperature_sensor"))
            .count()
    }

    #[test]
    fn test_classify_schema() {
        let doc: Value = serde_json::from_str(EXPANDED_LOG).unwrap();
        assert_eq!(HealthLogSchema::classify(&doc), HealthLogSchema::Expanded);
        let doc: Value = serde_json::from_str(SCALAR_LOG).unwrap();
        assert_eq!(HealthLogSchema::classify(&doc), HealthLogSchema::Scalar);
        assert_eq!(HealthLogSchema::classify(&Value::Null), HealthLogSchema::Scalar);
    }

    #[test]
    fn test_expanded_critical_warning() {
        let extractor = HealthExtractor::new(TemperatureScale::Kelvin);
        let samples = extractor.extract(EXPANDED_LOG, "/dev/nvme0n1").unwrap();

        for field in &CRITICAL_WARNING_FIELDS {
            let sample = find(&samples, field.metric).unwrap();
            assert_eq!(sample.kind, MetricType::Gauge);
        }
        assert_eq!(find(&samples, "nvme_temp_threshold_exceeded").unwrap().value, 1.0);
        assert_eq!(
            samples.len(),
            CRITICAL_WARNING_FIELDS.len() + 3 + COMMON_FIELDS.len()
        );
    }

    #[test]
    fn test_sensor_scan_stops_at_gap() {
        let extractor = HealthExtractor::new(TemperatureScale::Celsius);
        let samples = extractor.extract(EXPANDED_LOG, "/dev/nvme0n1").unwrap();
        assert_eq!(sensor_count(&samples), 3);
        assert_eq!(find(&samples, "nvme_temperature_sensor1").unwrap().value, 33.0);
        assert!(find(&samples, "nvme_temperature_sensor4").is_none());

        let gapped = r#"{"critical_warning":{"value":0},
            "temperature_sensor_1":300,"temperature_sensor_3":300}"#;
        let samples = extractor.extract(gapped, "/dev/nvme0n1").unwrap();
        assert_eq!(sensor_count(&samples), 1);
    }

    #[test]
    fn test_sensor_scan_caps_at_eight() {
        let mut doc = serde_json::json!({ "critical_warning": { "value": 0 } });
        for i in 1..=9 {
            doc[sensor_key(i)] = serde_json::json!(300);
        }
        let extractor = HealthExtractor::new(TemperatureScale::Kelvin);
        let samples = extractor.extract(&doc.to_string(), "/dev/nvme0n1").unwrap();
        assert_eq!(sensor_count(&samples), MAX_TEMPERATURE_SENSORS);
    }

    #[test]
    fn test_scalar_critical_warning() {
        let extractor = HealthExtractor::new(TemperatureScale::Celsius);
        let samples = extractor.extract(SCALAR_LOG, "/dev/nvme1n1").unwrap();

        let warnings: Vec<_> = samples
            .iter()
            .filter(|s| s.metric == "nvme_critical_warning")
            .collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].value, 4.0);
        assert!(find(&samples, "nvme_readonly").is_none());
        assert_eq!(sensor_count(&samples), 0);
        assert_eq!(samples.len(), 1 + COMMON_FIELDS.len());
    }

    #[test]
    fn test_temperature_conversion() {
        let celsius = HealthExtractor::new(TemperatureScale::Celsius)
            .extract(EXPANDED_LOG, "/dev/nvme0n1")
            .unwrap();
        assert_eq!(find(&celsius, "nvme_temperature").unwrap().value, 23.0);

        let fahrenheit = HealthExtractor::new(TemperatureScale::Fahrenheit)
            .extract(EXPANDED_LOG, "/dev/nvme0n1")
            .unwrap();
        let value = find(&fahrenheit, "nvme_temperature").unwrap().value;
        assert!((value - 73.13).abs() < 1e-9);

        let kelvin = HealthExtractor::new(TemperatureScale::Kelvin)
            .extract(EXPANDED_LOG, "/dev/nvme0n1")
            .unwrap();
        assert_eq!(find(&kelvin, "nvme_temperature").unwrap().value, 296.0);
        assert_eq!(find(&kelvin, "nvme_temperature_sensor2").unwrap().value, 300.0);
    }

    #[test]
    fn test_non_temperature_fields_unconverted() {
        let samples = HealthExtractor::new(TemperatureScale::Celsius)
            .extract(EXPANDED_LOG, "/dev/nvme0n1")
            .unwrap();
        assert_eq!(find(&samples, "nvme_avail_spare").unwrap().value, 100.0);
        assert_eq!(find(&samples, "nvme_warning_temp_time").unwrap().value, 0.0);
        assert_eq!(find(&samples, "nvme_power_on_hours").unwrap().kind, MetricType::Counter);
    }

    #[test]
    fn test_thermal_times_follow_field_names() {
        let samples = HealthExtractor::new(TemperatureScale::Kelvin)
            .extract(EXPANDED_LOG, "/dev/nvme0n1")
            .unwrap();
        assert_eq!(find(&samples, "nvme_thm_temp1_trans_time").unwrap().value, 12.0);
        assert_eq!(find(&samples, "nvme_thm_temp2_trans_time").unwrap().value, 34.0);
    }

    #[test]
    fn test_missing_fields_read_zero() {
        let samples = HealthExtractor::new(TemperatureScale::Kelvin)
            .extract(SCALAR_LOG, "/dev/nvme1n1")
            .unwrap();
        assert_eq!(find(&samples, "nvme_media_errors").unwrap().value, 0.0);
        assert_eq!(
            find(&samples, "nvme_endurance_grp_critical_warning_summary").unwrap().value,
            0.0
        );
    }

    #[test]
    fn test_samples_carry_device_label() {
        let samples = HealthExtractor::new(TemperatureScale::Celsius)
            .extract(SCALAR_LOG, "/dev/nvme1n1")
            .unwrap();
        assert!(samples
            .iter()
            .all(|s| s.labels.len() == 1 && s.labels[DEVICE_LABEL] == "/dev/nvme1n1"));
    }

    #[test]
    fn test_invalid_json_is_fatal() {
        let extractor = HealthExtractor::new(TemperatureScale::Celsius);
        assert!(extractor.extract("Error: No such device", "/dev/nvme0n1").is_err());
    }
}
