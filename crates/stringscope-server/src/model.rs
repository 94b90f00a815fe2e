//! The string model the service hosts: parameters, compactification and the
//! mass spectrum derived from them.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stringscope_core::catalog::{
    ALPHA_PRIME, COUPLING, Catalog, DEFAULT_TOPOLOGY, DIMENSIONS, TENSION, TOPOLOGY,
};

/// Number of excitation levels in every computed spectrum.
pub const SPECTRUM_LEVELS: usize = 10;

/// Large (non-compact) spacetime dimensions.
pub const LARGE_DIMENSIONS: u32 = 4;

/// Spectra are normalised to the critical superstring dimension.
const REFERENCE_DIMENSIONS: f64 = 10.0;

/// Partial update as posted by clients. Absent or null fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRequest {
    pub dimensions: Option<f64>,
    pub tension: Option<f64>,
    pub coupling: Option<f64>,
    pub alpha_prime: Option<f64>,
    pub compactification_radius: Option<f64>,
    pub topology: Option<String>,
}

/// Why an update was refused. Nothing is applied when this is returned.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct UpdateError(pub String);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompactificationData {
    pub radius: Vec<f64>,
    pub topology: String,
}

/// The `data` object of every response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateData {
    pub dimensions: u32,
    pub tension: f64,
    pub coupling: f64,
    pub alpha_prime: f64,
    pub compactification: CompactificationData,
    pub mass_spectrum: Vec<f64>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringModel {
    dimensions: u32,
    tension: f64,
    coupling: f64,
    alpha_prime: f64,
    topology: String,
    radius: Vec<f64>,
}

impl Default for StringModel {
    fn default() -> Self {
        let dimensions = 10;
        Self {
            dimensions,
            tension: 1.0,
            coupling: 0.1,
            alpha_prime: 1.0,
            topology: DEFAULT_TOPOLOGY.to_string(),
            radius: unit_radii(dimensions),
        }
    }
}

fn unit_radii(dimensions: u32) -> Vec<f64> {
    vec![1.0; dimensions.saturating_sub(LARGE_DIMENSIONS) as usize]
}

impl StringModel {
    pub fn dimensions(&self) -> u32 {
        self.dimensions
    }

    pub fn tension(&self) -> f64 {
        self.tension
    }

    pub fn coupling(&self) -> f64 {
        self.coupling
    }

    pub fn alpha_prime(&self) -> f64 {
        self.alpha_prime
    }

    pub fn topology(&self) -> &str {
        &self.topology
    }

    pub fn radius(&self) -> &[f64] {
        &self.radius
    }

    /// `M_0 = 0`, `M_n = sqrt(n / α′) · sqrt(T) · sqrt(d / 10)`.
    pub fn mass_spectrum(&self) -> Vec<f64> {
        let scale = self.tension.sqrt() * (f64::from(self.dimensions) / REFERENCE_DIMENSIONS).sqrt();
        (0..SPECTRUM_LEVELS)
            .map(|n| match n {
                0 => 0.0,
                n => (n as f64 / self.alpha_prime).sqrt() * scale,
            })
            .collect()
    }

    /// Validate every field of `update`, then apply all of them.
    ///
    /// A dimension change rebuilds the radius list with unit radii (before a
    /// radius in the same update is applied). The topology survives it.
    ///
    /// Resending the current `dimensions` is a no-op here, unlike the Python
    /// service, which resets the compactification on any update carrying it.
    pub fn apply(&mut self, update: &UpdateRequest) -> Result<(), UpdateError> {
        let catalog = Catalog::standard();
        let check = |id: &str, value: Option<f64>| -> Result<Option<f64>, UpdateError> {
            let Some(value) = value else {
                return Ok(None);
            };
            let descriptor = catalog
                .get(id)
                .ok_or_else(|| UpdateError(format!("unknown parameter {id}")))?;
            descriptor.validate(value).map(Some).map_err(UpdateError)
        };

        let dimensions = check(DIMENSIONS, update.dimensions)?;
        let tension = check(TENSION, update.tension)?;
        let coupling = check(COUPLING, update.coupling)?;
        let alpha_prime = check(ALPHA_PRIME, update.alpha_prime)?;

        let radius = match update.compactification_radius {
            Some(r) if !r.is_finite() || r <= 0.0 => {
                return Err(UpdateError(format!(
                    "compactification_radius must be greater than 0, got {r}"
                )));
            }
            other => other,
        };

        let topology = match update.topology.as_deref() {
            Some(value) => {
                let choice = catalog
                    .get(TOPOLOGY)
                    .and_then(|d| d.choice(value))
                    .ok_or_else(|| UpdateError(format!("unknown topology {value:?}")))?;
                Some(choice.value)
            }
            None => None,
        };

        if let Some(d) = dimensions {
            let d = d as u32;
            if d != self.dimensions {
                self.dimensions = d;
                self.radius = unit_radii(d);
            }
        }
        if let Some(t) = tension {
            self.tension = t;
        }
        if let Some(g) = coupling {
            self.coupling = g;
        }
        if let Some(a) = alpha_prime {
            self.alpha_prime = a;
        }
        if let Some(r) = radius {
            self.radius = vec![r; self.radius.len()];
        }
        if let Some(t) = topology {
            self.topology = t.to_string();
        }
        Ok(())
    }

    /// Snapshot for a response, stamped with the current time.
    pub fn to_data(&self) -> StateData {
        StateData {
            dimensions: self.dimensions,
            tension: self.tension,
            coupling: self.coupling,
            alpha_prime: self.alpha_prime,
            compactification: CompactificationData {
                radius: self.radius.clone(),
                topology: self.topology.clone(),
            },
            mass_spectrum: self.mass_spectrum(),
            timestamp: timestamp_now(),
        }
    }
}

/// Unix seconds with millisecond precision.
fn timestamp_now() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    format!("{secs:.3}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn defaults() {
        let m = StringModel::default();
        assert_eq!(m.dimensions(), 10);
        assert_eq!(m.topology(), "Calabi-Yau");
        assert_eq!(m.radius(), &[1.0; 6]);
    }

    #[test]
    fn default_spectrum() {
        let s = StringModel::default().mass_spectrum();
        assert_eq!(s.len(), SPECTRUM_LEVELS);
        assert_eq!(s[0], 0.0);
        assert!(close(s[1], 1.0));
        assert!(close(s[4], 2.0));
        assert!(s.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn tension_scales_excited_levels_by_sqrt() {
        let base = StringModel::default().mass_spectrum();
        let mut m = StringModel::default();
        m.apply(&UpdateRequest {
            tension: Some(4.0),
            ..Default::default()
        })
        .unwrap();
        let scaled = m.mass_spectrum();
        assert_eq!(scaled[0], 0.0);
        for n in 1..SPECTRUM_LEVELS {
            assert!(close(scaled[n], base[n] * 2.0));
        }
    }

    #[test]
    fn alpha_prime_and_dimensions_enter_spectrum() {
        let mut m = StringModel::default();
        m.apply(&UpdateRequest {
            alpha_prime: Some(4.0),
            dimensions: Some(26.0),
            ..Default::default()
        })
        .unwrap();
        let expected = (1.0f64 / 4.0).sqrt() * (26.0f64 / 10.0).sqrt();
        assert!(close(m.mass_spectrum()[1], expected));
    }

    #[test]
    fn dimension_change_resets_radii_and_keeps_topology() {
        let mut m = StringModel::default();
        m.apply(&UpdateRequest {
            topology: Some("K3".into()),
            compactification_radius: Some(2.5),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(m.radius(), &[2.5; 6]);

        m.apply(&UpdateRequest {
            dimensions: Some(6.0),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(m.radius(), &[1.0, 1.0]);
        assert_eq!(m.topology(), "K3");
    }

    #[test]
    fn resending_current_dimensions_keeps_radii() {
        let mut m = StringModel::default();
        m.apply(&UpdateRequest {
            compactification_radius: Some(2.5),
            ..Default::default()
        })
        .unwrap();

        m.apply(&UpdateRequest {
            dimensions: Some(10.0),
            coupling: Some(0.2),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(m.radius(), &[2.5; 6]);
    }

    #[test]
    fn radius_in_same_update_applies_after_dimension_change() {
        let mut m = StringModel::default();
        m.apply(&UpdateRequest {
            dimensions: Some(5.0),
            compactification_radius: Some(3.0),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(m.radius(), &[3.0]);
    }

    #[test]
    fn invalid_update_changes_nothing() {
        let mut m = StringModel::default();
        let before = m.clone();
        let err = m
            .apply(&UpdateRequest {
                tension: Some(2.0),
                coupling: Some(5.0),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.0.contains("coupling"));
        assert_eq!(m, before);
    }

    #[test]
    fn rejects_fractional_dimensions_bad_radius_and_topology() {
        let mut m = StringModel::default();
        for update in [
            UpdateRequest {
                dimensions: Some(10.5),
                ..Default::default()
            },
            UpdateRequest {
                dimensions: Some(3.0),
                ..Default::default()
            },
            UpdateRequest {
                compactification_radius: Some(0.0),
                ..Default::default()
            },
            UpdateRequest {
                topology: Some("Sphere".into()),
                ..Default::default()
            },
        ] {
            assert!(m.apply(&update).is_err(), "accepted {update:?}");
        }
        assert_eq!(m, StringModel::default());
    }

    #[test]
    fn data_serializes_dimensions_as_integer() {
        let value = serde_json::to_value(StringModel::default().to_data()).unwrap();
        assert!(value["dimensions"].is_u64());
        assert_eq!(value["compactification"]["topology"], "Calabi-Yau");
        assert_eq!(value["mass_spectrum"].as_array().unwrap().len(), 10);
        let ts = value["timestamp"].as_str().unwrap();
        assert_eq!(ts.split('.').nth(1).map(str::len), Some(3));
    }
}
