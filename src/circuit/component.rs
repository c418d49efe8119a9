//! Component variants.
//!
//! Modeled as a tagged enum rather than a trait-object hierarchy: the set of
//! variants is small and fixed (resistor, capacitor, inductor, op-amp,
//! input), and MNA stamping dispatches on the tag directly (see
//! `solver::mna`).

use std::collections::HashMap;

use super::node::NodeId;
use super::noise::NoiseSource;
use crate::opamp::OpAmpParams;

/// Stable handle into a circuit's inductor array, used to key mutual
/// coupling without inductors holding references to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InductorHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    Voltage,
    Current,
    /// A noise-analysis-only input: no signal is injected, but the port's
    /// impedance still participates in the matrix.
    Noise,
}

#[derive(Debug, Clone)]
pub struct Input {
    pub name: String,
    pub input_type: InputType,
    pub n_plus: Option<NodeId>,
    pub n_minus: Option<NodeId>,
    /// Required for `Noise`, forbidden for `Voltage`, fixed at 1 ohm for
    /// `Current` by the DSL layer.
    pub impedance: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Inductor {
    pub name: String,
    pub inductance: f64,
    pub n1: Option<NodeId>,
    pub n2: Option<NodeId>,
    pub coupling: HashMap<InductorHandle, f64>,
}

#[derive(Debug, Clone)]
pub struct OpAmp {
    pub name: String,
    pub model: String,
    pub params: OpAmpParams,
    pub n_plus: Option<NodeId>,
    pub n_minus: Option<NodeId>,
    pub n_out: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub enum Component {
    Resistor {
        name: String,
        resistance: f64,
        n1: Option<NodeId>,
        n2: Option<NodeId>,
    },
    Capacitor {
        name: String,
        capacitance: f64,
        n1: Option<NodeId>,
        n2: Option<NodeId>,
    },
    Inductor(Inductor),
    OpAmp(OpAmp),
    Input(Input),
}

impl Component {
    pub fn name(&self) -> &str {
        match self {
            Component::Resistor { name, .. } => name,
            Component::Capacitor { name, .. } => name,
            Component::Inductor(l) => &l.name,
            Component::OpAmp(op) => &op.name,
            Component::Input(i) => &i.name,
        }
    }

    /// All node references this component makes, ground entries as `None`,
    /// in declaration order.
    pub fn nodes(&self) -> Vec<Option<NodeId>> {
        match self {
            Component::Resistor { n1, n2, .. } => vec![*n1, *n2],
            Component::Capacitor { n1, n2, .. } => vec![*n1, *n2],
            Component::Inductor(l) => vec![l.n1, l.n2],
            Component::OpAmp(op) => vec![op.n_plus, op.n_minus, op.n_out],
            Component::Input(i) => vec![i.n_plus, i.n_minus],
        }
    }

    /// Every variant in this circuit model owns exactly one branch-current
    /// unknown row in the MNA system; kept as a named predicate rather than
    /// a bare `true` literal because the stamping dispatcher reads as
    /// documentation of that invariant.
    pub fn contributes_branch_row(&self) -> bool {
        true
    }
}

/// Noise sources owned by `component`, in the fixed order: Johnson noise for
/// a resistor; voltage noise then current noise (one entry per non-ground
/// input node, n_plus before n_minus) for an op-amp. Node names are resolved
/// through `interner` since `Component` itself only stores indices.
pub(super) fn noise_sources_of(
    component: &Component,
    interner: &super::node::NodeInterner,
) -> Vec<NoiseSource> {
    match component {
        Component::Resistor { name, .. } => vec![NoiseSource::Johnson {
            resistor: name.clone(),
        }],
        Component::OpAmp(op) => {
            let mut sources = vec![NoiseSource::OpAmpVoltage {
                opamp: op.name.clone(),
            }];
            for node in [op.n_plus, op.n_minus] {
                if let Some(node) = node {
                    sources.push(NoiseSource::OpAmpCurrent {
                        opamp: op.name.clone(),
                        node,
                        node_name: interner.name(node).to_string(),
                    });
                }
            }
            sources
        }
        _ => Vec::new(),
    }
}
