// SPDX-License-Identifier: AGPL-3.0-or-later

//! Temperature scale selection and Kelvin conversion.

use serde::{Deserialize, Serialize};

/// Scale that smart-log temperatures (reported in Kelvin) are exported in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TemperatureScale {
    #[default]
    Celsius,
    Fahrenheit,
    Kelvin,
    /// Any other name; values pass through in Kelvin under this label
    Unrecognized(String),
}

impl TemperatureScale {
    /// Names accepted as a real conversion target
    pub const RECOGNIZED: [&'static str; 3] = ["celsius", "fahrenheit", "kelvin"];

    /// Map a configured name to a scale. Matching is exact.
    pub fn from_name(name: &str) -> Self {
        match name {
            "celsius" => Self::Celsius,
            "fahrenheit" => Self::Fahrenheit,
            "kelvin" => Self::Kelvin,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Name used in descriptor help text
    pub fn name(&self) -> &str {
        match self {
            Self::Celsius => "celsius",
            Self::Fahrenheit => "fahrenheit",
            Self::Kelvin => "kelvin",
            Self::Unrecognized(name) => name,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    /// Convert a Kelvin reading to this scale.
    pub fn from_kelvin(&self, kelvin: f64) -> f64 {
        match self {
            Self::Celsius => kelvin - 273.0,
            Self::Fahrenheit => (kelvin - 273.15) * 9.0 / 5.0 + 32.0,
            Self::Kelvin | Self::Unrecognized(_) => kelvin,
        }
    }
}

impl From<String> for TemperatureScale {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<TemperatureScale> for String {
    fn from(scale: TemperatureScale) -> Self {
        scale.name().to_string()
    }
}

impl std::fmt::Display for TemperatureScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
