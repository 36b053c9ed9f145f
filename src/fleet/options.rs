//! Options bridge
//!
//! The options form reports `(field id, value)` pairs. Values arrive typed
//! the way the form types them: checkboxes as booleans, anything numeric
//! as a number, everything else as text.

use std::fmt;

use crate::config::defaults::*;

/// A typed value reported by the options form
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl OptionValue {
    /// Type a raw control value
    ///
    /// `control_type` is the form control's type; `checkbox` values are
    /// read as their checked state.
    pub fn parse(control_type: &str, raw: &str) -> Self {
        if control_type.eq_ignore_ascii_case("checkbox") {
            let checked = matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "true" | "on" | "1" | "checked"
            );
            return Self::Bool(checked);
        }
        match raw.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => Self::Number(number),
            _ => Self::Text(raw.to_string()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Non-negative whole number
    pub fn as_count(&self) -> Option<u64> {
        self.as_number()
            .filter(|n| n.fract() == 0.0 && *n >= 0.0 && *n <= u64::MAX as f64)
            .map(|n| n as u64)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "\"{value}\""),
        }
    }
}

/// Form fields the fleet reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionField {
    NumVehicles,
    VehicleImage,
    VehicleImageSize,
    AutomaticSize,
    ShowLabels,
    VehicleSpeed,
    RefreshInterval,
}

impl OptionField {
    /// Every field, in form order
    pub const ALL: [OptionField; 7] = [
        OptionField::NumVehicles,
        OptionField::VehicleImage,
        OptionField::VehicleImageSize,
        OptionField::AutomaticSize,
        OptionField::ShowLabels,
        OptionField::VehicleSpeed,
        OptionField::RefreshInterval,
    ];

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.id() == id)
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::NumVehicles => "num-vehicles",
            Self::VehicleImage => "vehicle-image",
            Self::VehicleImageSize => "vehicle-image-size",
            Self::AutomaticSize => "automatic-size",
            Self::ShowLabels => "show-labels",
            Self::VehicleSpeed => "vehicle-speed",
            Self::RefreshInterval => "refresh-interval",
        }
    }

    /// Value the form shows after a reset
    pub fn default_value(&self) -> OptionValue {
        match self {
            Self::NumVehicles => OptionValue::Number(DEFAULT_NUM_VEHICLES as f64),
            Self::VehicleImage => OptionValue::Text(DEFAULT_VEHICLE_IMAGE.to_string()),
            Self::VehicleImageSize => OptionValue::Number(f64::from(DEFAULT_VEHICLE_IMAGE_SIZE)),
            Self::AutomaticSize => OptionValue::Bool(DEFAULT_AUTOMATIC_SIZE),
            Self::ShowLabels => OptionValue::Bool(DEFAULT_SHOW_LABELS),
            Self::VehicleSpeed => OptionValue::Number(DEFAULT_VEHICLE_SPEED),
            Self::RefreshInterval => OptionValue::Number(DEFAULT_REFRESH_INTERVAL_MS as f64),
        }
    }
}

impl fmt::Display for OptionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
