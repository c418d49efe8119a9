//! The circuit graph itself: insertion-ordered components over an interned
//! node set.
//!
//! Enumeration order is part of the public contract: nodes in first-touch
//! order, components in insertion order, noise sources in component
//! insertion order then within-component order (see `noise_sources`).

use crate::error::{CircuitError, Result};
use crate::opamp::{OpAmpLibrary, OpAmpParams};

use super::component::{noise_sources_of, Component, InductorHandle, Input, InputType, Inductor, OpAmp};
use super::node::{NodeId, NodeInterner};
use super::noise::NoiseSource;

/// An electrical circuit: nodes plus an insertion-ordered component list.
#[derive(Debug, Clone, Default)]
pub struct Circuit {
    interner: NodeInterner,
    components: Vec<Component>,
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interner(&self) -> &NodeInterner {
        &self.interner
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Resolve a node name to an id, interning it (first-touch order) if
    /// this is the first component to mention it. Ground returns `None`.
    pub fn touch_node(&mut self, name: &str) -> Option<NodeId> {
        self.interner.intern(name)
    }

    pub fn lookup_node(&self, name: &str) -> Result<NodeId> {
        self.interner
            .lookup(name)
            .ok_or_else(|| CircuitError::not_found("node", name))
    }

    pub fn lookup_component(&self, name: &str) -> Result<&Component> {
        self.components
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| CircuitError::not_found("component", name))
    }

    fn name_taken(&self, name: &str) -> bool {
        self.components.iter().any(|c| c.name().eq_ignore_ascii_case(name))
    }

    /// Add a component, failing with `DuplicateName` (I1) if its name
    /// collides case-insensitively with an existing one, or with
    /// `Topology` if adding a second `Input` would violate I2.
    pub fn add(&mut self, component: Component) -> Result<()> {
        if self.name_taken(component.name()) {
            return Err(CircuitError::duplicate_name(component.name()));
        }
        if matches!(component, Component::Input(_)) && self.input().is_some() {
            return Err(CircuitError::topology(
                "circuit already has an input component",
            ));
        }
        if let Component::OpAmp(op) = &component {
            if op.n_out.is_none() {
                return Err(CircuitError::topology(format!(
                    "op-amp '{}' output node cannot be ground",
                    op.name
                )));
            }
        }
        tracing::debug!(name = component.name(), "added component");
        self.components.push(component);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<Component> {
        let idx = self
            .components
            .iter()
            .position(|c| c.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| CircuitError::not_found("component", name))?;
        Ok(self.components.remove(idx))
    }

    pub fn add_resistor(&mut self, name: &str, resistance: f64, n1: &str, n2: &str) -> Result<()> {
        let n1 = self.touch_node(n1);
        let n2 = self.touch_node(n2);
        self.add(Component::Resistor {
            name: name.to_string(),
            resistance,
            n1,
            n2,
        })
    }

    pub fn add_capacitor(&mut self, name: &str, capacitance: f64, n1: &str, n2: &str) -> Result<()> {
        let n1 = self.touch_node(n1);
        let n2 = self.touch_node(n2);
        self.add(Component::Capacitor {
            name: name.to_string(),
            capacitance,
            n1,
            n2,
        })
    }

    pub fn add_inductor(&mut self, name: &str, inductance: f64, n1: &str, n2: &str) -> Result<()> {
        let n1 = self.touch_node(n1);
        let n2 = self.touch_node(n2);
        self.add(Component::Inductor(Inductor {
            name: name.to_string(),
            inductance,
            n1,
            n2,
            coupling: Default::default(),
        }))
    }

    /// Index of `name` into the circuit's inductor array, in insertion
    /// order among inductors only -- the stable handle mutual coupling is
    /// keyed by.
    pub fn inductor_handle(&self, name: &str) -> Result<InductorHandle> {
        self.components
            .iter()
            .filter_map(|c| match c {
                Component::Inductor(l) => Some(l),
                _ => None,
            })
            .position(|l| l.name.eq_ignore_ascii_case(name))
            .map(InductorHandle)
            .ok_or_else(|| CircuitError::not_found("inductor", name))
    }

    /// Set mutual coupling factor `k` between two inductors, symmetrically
    /// (I4).
    pub fn couple_inductors(&mut self, a: &str, b: &str, k: f64) -> Result<()> {
        let handle_a = self.inductor_handle(a)?;
        let handle_b = self.inductor_handle(b)?;

        let mut inductor_indices = self.components.iter_mut().filter_map(|c| match c {
            Component::Inductor(l) => Some(l),
            _ => None,
        });

        // Two-pass: a HashMap borrow can't span both sides of a symmetric
        // update, so apply each half from a fresh iterator.
        if let Some(l) = inductor_indices.nth(handle_a.0) {
            l.coupling.insert(handle_b, k);
        }
        let mut inductor_indices = self.components.iter_mut().filter_map(|c| match c {
            Component::Inductor(l) => Some(l),
            _ => None,
        });
        if let Some(l) = inductor_indices.nth(handle_b.0) {
            l.coupling.insert(handle_a, k);
        }
        Ok(())
    }

    pub fn add_library_opamp(
        &mut self,
        library: &OpAmpLibrary,
        name: &str,
        model: &str,
        n_plus: &str,
        n_minus: &str,
        n_out: &str,
        overrides: &[(&str, f64)],
    ) -> Result<()> {
        let mut params = library.lookup(model)?;
        for (key, value) in overrides {
            params.apply_override(key, *value)?;
        }
        self.add_opamp(name, model, params, n_plus, n_minus, n_out)
    }

    pub fn add_opamp(
        &mut self,
        name: &str,
        model: &str,
        params: OpAmpParams,
        n_plus: &str,
        n_minus: &str,
        n_out: &str,
    ) -> Result<()> {
        let n_plus_id = self.touch_node(n_plus);
        let n_minus_id = self.touch_node(n_minus);
        let n_out_id = self.touch_node(n_out);
        self.add(Component::OpAmp(OpAmp {
            name: name.to_string(),
            model: model.to_string(),
            params,
            n_plus: n_plus_id,
            n_minus: n_minus_id,
            n_out: n_out_id,
        }))
    }

    pub fn add_input(
        &mut self,
        name: &str,
        input_type: InputType,
        n_plus: &str,
        n_minus: &str,
        impedance: Option<f64>,
    ) -> Result<()> {
        match input_type {
            InputType::Voltage if impedance.is_some() => {
                return Err(CircuitError::topology(
                    "voltage input cannot specify an impedance",
                ))
            }
            InputType::Noise if impedance.is_none() => {
                return Err(CircuitError::topology(
                    "noise input requires an impedance",
                ))
            }
            _ => {}
        }
        let n_plus_id = self.touch_node(n_plus);
        let n_minus_id = self.touch_node(n_minus);
        self.add(Component::Input(Input {
            name: name.to_string(),
            input_type,
            n_plus: n_plus_id,
            n_minus: n_minus_id,
            impedance,
        }))
    }

    pub fn input(&self) -> Option<&Input> {
        self.components.iter().find_map(|c| match c {
            Component::Input(i) => Some(i),
            _ => None,
        })
    }

    /// Number of non-ground nodes.
    pub fn node_count(&self) -> usize {
        self.interner.len()
    }

    /// Number of branch-current unknowns: one per component (every variant
    /// in this model contributes exactly one, §4.3).
    pub fn branch_count(&self) -> usize {
        self.components.len()
    }

    /// Side length of the square MNA matrix at any frequency.
    pub fn matrix_size(&self) -> usize {
        self.node_count() + self.branch_count()
    }

    /// All noise sources, in component-insertion order and then
    /// within-component order.
    pub fn noise_sources(&self) -> Vec<NoiseSource> {
        self.components
            .iter()
            .flat_map(|c| noise_sources_of(c, &self.interner))
            .collect()
    }

    pub fn lookup_noise(&self, label: &str) -> Result<NoiseSource> {
        self.noise_sources()
            .into_iter()
            .find(|n| n.label() == label)
            .ok_or_else(|| CircuitError::not_found("noise source", label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_size_matches_nodes_plus_components() {
        let mut c = Circuit::new();
        c.add_resistor("r1", 1000.0, "nin", "nout").unwrap();
        c.add_capacitor("c1", 1e-6, "nout", "gnd").unwrap();
        // nodes: nin, nout => 2; components: r1, c1 => 2
        assert_eq!(c.matrix_size(), 4);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut c = Circuit::new();
        c.add_resistor("r1", 1000.0, "a", "b").unwrap();
        let err = c.add_resistor("R1", 500.0, "a", "b").unwrap_err();
        assert!(matches!(err, CircuitError::DuplicateName { .. }));
    }

    #[test]
    fn second_input_is_rejected() {
        let mut c = Circuit::new();
        c.add_input("in1", InputType::Voltage, "a", "gnd", None)
            .unwrap();
        let err = c
            .add_input("in2", InputType::Voltage, "b", "gnd", None)
            .unwrap_err();
        assert!(matches!(err, CircuitError::Topology { .. }));
    }

    #[test]
    fn mutual_coupling_is_symmetric() {
        let mut c = Circuit::new();
        c.add_inductor("l1", 1e-3, "a", "b").unwrap();
        c.add_inductor("l2", 2e-3, "c", "d").unwrap();
        c.couple_inductors("l1", "l2", 0.5).unwrap();

        let inductors: Vec<_> = c
            .components()
            .iter()
            .filter_map(|comp| match comp {
                Component::Inductor(l) => Some(l),
                _ => None,
            })
            .collect();
        assert_eq!(inductors[0].coupling[&InductorHandle(1)], 0.5);
        assert_eq!(inductors[1].coupling[&InductorHandle(0)], 0.5);
    }

    #[test]
    fn noise_input_requires_impedance() {
        let mut c = Circuit::new();
        let err = c
            .add_input("in1", InputType::Noise, "a", "gnd", None)
            .unwrap_err();
        assert!(matches!(err, CircuitError::Topology { .. }));
    }
}
