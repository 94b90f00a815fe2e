//! The authoritative snapshot of the remote model and the edit form.
//!
//! A [`SystemState`] is only ever built from a complete service response and
//! is replaced wholesale, so the spectrum always matches the parameters it was
//! computed from. [`FormValues`] is the other direction: the full set of widget
//! values sent back when the user edits anything.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::catalog::{Catalog, TOPOLOGY};

/// Shape of the compactified extra dimensions.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Compactification {
    /// Enumerated topology name as reported by the service.
    pub topology: String,
    /// One radius per compactified dimension.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub radius: Vec<f64>,
}

/// Snapshot of the remote model.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SystemState {
    /// Numeric parameters keyed by identifier. May contain identifiers the
    /// catalog does not know; renderers skip those.
    #[serde(flatten)]
    pub parameters: BTreeMap<String, f64>,
    pub compactification: Compactification,
    /// Mass of each excitation level; index = level.
    pub mass_spectrum: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl SystemState {
    /// Build a state from the `data` object of a service response.
    ///
    /// Fails with a reason when `compactification.topology` or a valid
    /// `mass_spectrum` is missing. Other numeric fields become parameters;
    /// non-numeric extras are ignored.
    pub fn from_data(data: &Value) -> Result<Self, String> {
        let object = data
            .as_object()
            .ok_or_else(|| "data is not an object".to_string())?;

        let compactification = object
            .get("compactification")
            .ok_or_else(|| "missing compactification".to_string())
            .and_then(parse_compactification)?;

        let mass_spectrum = object
            .get("mass_spectrum")
            .ok_or_else(|| "missing mass_spectrum".to_string())
            .and_then(|v| parse_numbers(v, "mass_spectrum"))?;
        if mass_spectrum.iter().any(|&m| m < 0.0) {
            return Err("mass_spectrum contains negative values".to_string());
        }

        let timestamp = object
            .get("timestamp")
            .and_then(Value::as_str)
            .map(str::to_string);

        let parameters = object
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "compactification" | "mass_spectrum"))
            .filter_map(|(key, value)| value.as_f64().map(|v| (key.clone(), v)))
            .collect();

        Ok(Self {
            parameters,
            compactification,
            mass_spectrum,
            timestamp,
        })
    }

    /// Value of a numeric parameter, if the service reported it.
    pub fn parameter(&self, id: &str) -> Option<f64> {
        self.parameters.get(id).copied()
    }

    pub fn topology(&self) -> &str {
        &self.compactification.topology
    }

    /// True for the placeholder state held before the first response.
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
            && self.mass_spectrum.is_empty()
            && self.compactification.topology.is_empty()
    }

    /// Pretty-printed JSON for the diagnostic view.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("<unprintable state: {e}>"))
    }
}

fn parse_compactification(value: &Value) -> Result<Compactification, String> {
    let object = value
        .as_object()
        .ok_or_else(|| "compactification is not an object".to_string())?;
    let topology = object
        .get("topology")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing compactification.topology".to_string())?
        .to_string();
    let radius = match object.get("radius") {
        Some(v) => parse_numbers(v, "compactification.radius")?,
        None => Vec::new(),
    };
    Ok(Compactification { topology, radius })
}

fn parse_numbers(value: &Value, field: &str) -> Result<Vec<f64>, String> {
    let items = value
        .as_array()
        .ok_or_else(|| format!("{field} is not an array"))?;
    items
        .iter()
        .map(|item| {
            item.as_f64()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("{field} contains a non-numeric entry: {item}"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Form
// ---------------------------------------------------------------------------

/// Every widget value of the panel, in catalog order.
///
/// Serializes to the update body: numeric values as floats, topology as its
/// enumerated value. Parameters with empty widgets are left out.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormValues {
    numeric: Vec<(String, f64)>,
    topology: Option<String>,
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a form from a state, keeping only catalog parameters.
    pub fn from_state(catalog: &Catalog, state: &SystemState) -> Self {
        let mut form = Self::new();
        for descriptor in catalog.iter() {
            if descriptor.is_numeric() {
                if let Some(v) = state.parameter(descriptor.id) {
                    form.set(descriptor.id, v);
                }
            } else if descriptor.id == TOPOLOGY && !state.topology().is_empty() {
                form.set_topology(state.topology());
            }
        }
        form
    }

    /// Set a numeric value, replacing an earlier one in place.
    pub fn set(&mut self, id: &str, value: f64) {
        match self.numeric.iter_mut().find(|(k, _)| k == id) {
            Some(slot) => slot.1 = value,
            None => self.numeric.push((id.to_string(), value)),
        }
    }

    pub fn get(&self, id: &str) -> Option<f64> {
        self.numeric.iter().find(|(k, _)| k == id).map(|(_, v)| *v)
    }

    pub fn set_topology(&mut self, topology: impl Into<String>) {
        self.topology = Some(topology.into());
    }

    pub fn topology(&self) -> Option<&str> {
        self.topology.as_deref()
    }

    pub fn numeric(&self) -> &[(String, f64)] {
        &self.numeric
    }

    pub fn is_empty(&self) -> bool {
        self.numeric.is_empty() && self.topology.is_none()
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for FormValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.numeric.len() + usize::from(self.topology.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (id, value) in &self.numeric {
            map.serialize_entry(id, value)?;
        }
        if let Some(topology) = &self.topology {
            map.serialize_entry(TOPOLOGY, topology)?;
        }
        map.end()
    }
}
