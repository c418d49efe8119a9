//! Noise source labels.
//!
//! A noise source is owned by exactly one component. Equality (and hence
//! membership in any set/map) is the canonical label plus the owning
//! component's name -- never a pointer-identity comparison.

use super::node::NodeId;

/// A single noise contributor, owned by the component named in its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoiseSource {
    /// Johnson (thermal) noise of a resistor.
    Johnson { resistor: String },
    /// Op-amp input-referred voltage noise.
    OpAmpVoltage { opamp: String },
    /// Op-amp input-referred current noise, attached to one input node.
    OpAmpCurrent { opamp: String, node: NodeId, node_name: String },
}

impl NoiseSource {
    /// Canonical label: `R(name)`, `V(name)`, `I(name, node)`.
    pub fn label(&self) -> String {
        match self {
            NoiseSource::Johnson { resistor } => format!("R({resistor})"),
            NoiseSource::OpAmpVoltage { opamp } => format!("V({opamp})"),
            NoiseSource::OpAmpCurrent { opamp, node_name, .. } => {
                format!("I({opamp}, {node_name})")
            }
        }
    }

    pub fn owner(&self) -> &str {
        match self {
            NoiseSource::Johnson { resistor } => resistor,
            NoiseSource::OpAmpVoltage { opamp } => opamp,
            NoiseSource::OpAmpCurrent { opamp, .. } => opamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_the_canonical_format() {
        let j = NoiseSource::Johnson { resistor: "r1".into() };
        assert_eq!(j.label(), "R(r1)");

        let v = NoiseSource::OpAmpVoltage { opamp: "u1".into() };
        assert_eq!(v.label(), "V(u1)");

        let i = NoiseSource::OpAmpCurrent {
            opamp: "u1".into(),
            node: NodeId(0),
            node_name: "nin".into(),
        };
        assert_eq!(i.label(), "I(u1, nin)");
    }
}
