//! Static catalog of the tunable model parameters.
//!
//! The catalog is the single description of every quantity the panel can edit:
//! its identifier on the wire, how it is labelled, and which values it accepts.
//! Display order is the order of [`STANDARD_PARAMETERS`].

/// Identifier of the spacetime dimension count.
pub const DIMENSIONS: &str = "dimensions";
/// Identifier of the string tension.
pub const TENSION: &str = "tension";
/// Identifier of the string coupling.
pub const COUPLING: &str = "coupling";
/// Identifier of the Regge slope.
pub const ALPHA_PRIME: &str = "alpha_prime";
/// Identifier of the compactification topology (the only enumerated parameter).
pub const TOPOLOGY: &str = "topology";

/// Topology the service starts with.
pub const DEFAULT_TOPOLOGY: &str = "Calabi-Yau";

/// Granularity of a numeric parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Whole numbers only.
    Integer,
    /// Any value inside the bounds.
    Any,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer => write!(f, "1"),
            Self::Any => write!(f, "any"),
        }
    }
}

/// One option of an enumerated parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Choice {
    pub value: &'static str,
    pub description: &'static str,
}

/// What kind of values a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterKind {
    /// Inclusive `[min, max]` range with a step granularity.
    Numeric { min: f64, max: f64, step: Step },
    /// One of an ordered set of named choices.
    Enumerated { choices: &'static [Choice] },
}

/// Metadata about one tunable parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterDescriptor {
    /// Wire identifier (e.g. `"alpha_prime"`).
    pub id: &'static str,
    /// Short label for the control.
    pub label: &'static str,
    /// Free-text explanation shown next to the control.
    pub description: &'static str,
    pub kind: ParameterKind,
}

/// Multiplicative nudge applied to continuous parameters. Their ranges span
/// many decades, so a fixed additive step would be useless at one end.
const CONTINUOUS_NUDGE: f64 = 1.1;

impl ParameterDescriptor {
    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, ParameterKind::Numeric { .. })
    }

    /// Inclusive bounds for numeric parameters.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match self.kind {
            ParameterKind::Numeric { min, max, .. } => Some((min, max)),
            ParameterKind::Enumerated { .. } => None,
        }
    }

    /// Choices for enumerated parameters (empty for numeric ones).
    pub fn choices(&self) -> &'static [Choice] {
        match self.kind {
            ParameterKind::Enumerated { choices } => choices,
            ParameterKind::Numeric { .. } => &[],
        }
    }

    /// Look up a choice by its wire value.
    pub fn choice(&self, value: &str) -> Option<&'static Choice> {
        self.choices().iter().find(|c| c.value == value)
    }

    /// Clamp a value into the parameter's range, rounding integer parameters.
    ///
    /// Enumerated parameters return the value unchanged.
    pub fn clamp(&self, value: f64) -> f64 {
        match self.kind {
            ParameterKind::Numeric { min, max, step } => {
                let v = if value.is_nan() { min } else { value };
                let v = match step {
                    Step::Integer => v.round(),
                    Step::Any => v,
                };
                v.clamp(min, max)
            }
            ParameterKind::Enumerated { .. } => value,
        }
    }

    /// Move a numeric value one step up (`up = true`) or down, staying in range.
    ///
    /// Integer parameters move by one; continuous parameters scale by 10%.
    pub fn nudge(&self, value: f64, up: bool) -> f64 {
        match self.kind {
            ParameterKind::Numeric { step: Step::Integer, .. } => {
                self.clamp(if up { value + 1.0 } else { value - 1.0 })
            }
            ParameterKind::Numeric { step: Step::Any, .. } => self.clamp(if up {
                value * CONTINUOUS_NUDGE
            } else {
                value / CONTINUOUS_NUDGE
            }),
            ParameterKind::Enumerated { .. } => value,
        }
    }

    /// The choice after (or before) `current`, wrapping around.
    ///
    /// An unknown `current` selects the first choice.
    pub fn cycle_choice(&self, current: &str, forward: bool) -> Option<&'static str> {
        let choices = self.choices();
        if choices.is_empty() {
            return None;
        }
        let next = match choices.iter().position(|c| c.value == current) {
            Some(i) if forward => (i + 1) % choices.len(),
            Some(i) => (i + choices.len() - 1) % choices.len(),
            None => 0,
        };
        Some(choices[next].value)
    }

    /// Check that `value` is acceptable without adjusting it.
    pub fn validate(&self, value: f64) -> Result<f64, String> {
        let ParameterKind::Numeric { min, max, step } = self.kind else {
            return Err(format!("{} is not numeric", self.id));
        };
        if !value.is_finite() {
            return Err(format!("{} must be a finite number", self.id));
        }
        if step == Step::Integer && value.fract() != 0.0 {
            return Err(format!("{} must be a whole number, got {value}", self.id));
        }
        if value < min || value > max {
            return Err(format!(
                "{} must be between {min} and {max}, got {value}",
                self.id
            ));
        }
        Ok(value)
    }
}

/// Compactification topologies understood by the service.
pub const TOPOLOGIES: &[Choice] = &[
    Choice {
        value: "Calabi-Yau",
        description: "Ricci-flat Kähler manifold; preserves a quarter of the supersymmetry in 4D.",
    },
    Choice {
        value: "Torus",
        description: "Flat torus; simplest compactification, keeps all supersymmetry.",
    },
    Choice {
        value: "Orbifold",
        description: "Torus quotient by a discrete group; fixed points carry twisted sectors.",
    },
    Choice {
        value: "K3",
        description: "Four-dimensional hyper-Kähler surface; halves the supersymmetry.",
    },
];

/// The fixed parameter set, in display order.
pub static STANDARD_PARAMETERS: [ParameterDescriptor; 5] = [
    ParameterDescriptor {
        id: DIMENSIONS,
        label: "Dimensions",
        description: "Total spacetime dimensions. Everything above four is compactified.",
        kind: ParameterKind::Numeric {
            min: 4.0,
            max: 26.0,
            step: Step::Integer,
        },
    },
    ParameterDescriptor {
        id: TENSION,
        label: "String tension",
        description: "Energy per unit length of the string. Masses scale with its square root.",
        kind: ParameterKind::Numeric {
            min: 1e-6,
            max: 1e6,
            step: Step::Any,
        },
    },
    ParameterDescriptor {
        id: COUPLING,
        label: "Coupling",
        description: "String coupling constant. Small values keep the theory perturbative.",
        kind: ParameterKind::Numeric {
            min: 1e-6,
            max: 1.0,
            step: Step::Any,
        },
    },
    ParameterDescriptor {
        id: ALPHA_PRIME,
        label: "α′ (Regge slope)",
        description: "Inverse tension scale. Level n sits at M² = n/α′.",
        kind: ParameterKind::Numeric {
            min: 1e-6,
            max: 100.0,
            step: Step::Any,
        },
    },
    ParameterDescriptor {
        id: TOPOLOGY,
        label: "Topology",
        description: "Shape of the compactified extra dimensions.",
        kind: ParameterKind::Enumerated {
            choices: TOPOLOGIES,
        },
    },
];

/// Ordered mapping from identifier to descriptor.
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    entries: &'static [ParameterDescriptor],
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl Catalog {
    /// The catalog the service understands.
    pub fn standard() -> Self {
        Self {
            entries: &STANDARD_PARAMETERS,
        }
    }

    pub fn get(&self, id: &str) -> Option<&'static ParameterDescriptor> {
        self.entries.iter().find(|d| d.id == id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|d| d.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static ParameterDescriptor> + use<> {
        self.entries.iter()
    }

    pub fn numeric(&self) -> impl Iterator<Item = &'static ParameterDescriptor> + use<> {
        self.entries.iter().filter(|d| d.is_numeric())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Description of a topology choice, if the catalog knows it.
    pub fn topology_description(&self, value: &str) -> Option<&'static str> {
        self.get(TOPOLOGY)
            .and_then(|d| d.choice(value))
            .map(|c| c.description)
    }
}
