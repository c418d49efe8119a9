//! Complex-valued Modified Nodal Analysis matrix: assembly, LU
//! factorization, forward solve, and adjoint solve.
//!
//! Row/column ordering (fixed, tested): non-ground nodes first in
//! first-touch order, then one branch-current unknown per component in
//! insertion order. See [`crate::circuit::Circuit`] for how that ordering
//! is produced.

use num_complex::Complex64;

use crate::circuit::{Component, InputType, Circuit};
use crate::error::{CircuitError, Result};

const PIVOT_EPSILON: f64 = 1e-15;

/// A square complex coefficient matrix for one frequency, plus its LU
/// factorization once `factor` has been called.
#[derive(Debug, Clone)]
pub struct MnaMatrix {
    size: usize,
    node_count: usize,
    a: Vec<Complex64>,
    lu: Option<Vec<Complex64>>,
    pivots: Vec<usize>,
    /// Reversible per-branch-row/column scale, chosen as a power of two so
    /// undoing it is exact.
    scales: Vec<f64>,
}

impl MnaMatrix {
    fn new(size: usize, node_count: usize) -> Self {
        MnaMatrix {
            size,
            node_count,
            a: vec![Complex64::new(0.0, 0.0); size * size],
            lu: None,
            pivots: (0..size).collect(),
            scales: vec![1.0; size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn at(&self, row: usize, col: usize) -> Complex64 {
        self.a[row * self.size + col]
    }

    fn add(&mut self, row: usize, col: usize, value: Complex64) {
        self.a[row * self.size + col] += value;
    }

    fn branch_row(&self, component_index: usize) -> usize {
        self.node_count + component_index
    }

    /// Row/column index for a node, or `None` for ground -- ground
    /// contributes no row.
    fn node_row(node: Option<crate::circuit::NodeId>) -> Option<usize> {
        node.map(|n| n.0)
    }

    /// Stamp a two-terminal admittance `y` between nodes `a` and `b`, plus
    /// the branch-current row enforcing `Va - Vb - z*I = 0` where `z =
    /// 1/y`. Used for resistor/capacitor/self-inductor terms.
    fn stamp_passive(&mut self, branch: usize, a: Option<usize>, b: Option<usize>, impedance: Complex64) {
        let one = Complex64::new(1.0, 0.0);
        if let Some(a) = a {
            self.add(a, branch, one);
            self.add(branch, a, one);
        }
        if let Some(b) = b {
            self.add(b, branch, -one);
            self.add(branch, b, -one);
        }
        self.add(branch, branch, -impedance);
    }

    fn apply_scale(&mut self, branch: usize, scale: f64) {
        self.scales[branch] = scale;
        for col in 0..self.size {
            self.a[branch * self.size + col] *= scale;
        }
        for row in 0..self.size {
            self.a[row * self.size + branch] *= scale;
        }
    }

    /// Factor in place via Gaussian elimination with partial pivoting.
    pub fn factor(&mut self) -> Result<()> {
        let n = self.size;
        let mut lu = self.a.clone();
        let mut pivots: Vec<usize> = (0..n).collect();

        for k in 0..n {
            let mut max_row = k;
            let mut max_val = lu[k * n + k].norm();
            for i in (k + 1)..n {
                let v = lu[i * n + k].norm();
                if v > max_val {
                    max_val = v;
                    max_row = i;
                }
            }
            if max_val < PIVOT_EPSILON {
                return Err(CircuitError::SingularMatrix { frequency: f64::NAN });
            }
            if max_row != k {
                for col in 0..n {
                    lu.swap(k * n + col, max_row * n + col);
                }
                pivots.swap(k, max_row);
            }
            let pivot = lu[k * n + k];
            for i in (k + 1)..n {
                let factor = lu[i * n + k] / pivot;
                lu[i * n + k] = factor;
                if factor != Complex64::new(0.0, 0.0) {
                    for col in (k + 1)..n {
                        let sub = factor * lu[k * n + col];
                        lu[i * n + col] -= sub;
                    }
                }
            }
        }

        self.lu = Some(lu);
        self.pivots = pivots;
        Ok(())
    }

    /// Forward solve `Ax = rhs` using the stored factorization.
    pub fn solve(&self, rhs: &[Complex64]) -> Result<Vec<Complex64>> {
        let lu = self
            .lu
            .as_ref()
            .ok_or_else(|| CircuitError::topology("matrix not factored"))?;
        let n = self.size;

        let mut b: Vec<Complex64> = self.pivots.iter().map(|&p| rhs[p]).collect();

        for i in 0..n {
            for j in 0..i {
                let l = lu[i * n + j];
                let bj = b[j];
                b[i] -= l * bj;
            }
        }
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                let u = lu[i * n + j];
                let bj = b[j];
                b[i] -= u * bj;
            }
            b[i] /= lu[i * n + i];
        }
        Ok(b)
    }

    /// Solve the adjoint (transpose) system `A^T x = rhs`, used by noise
    /// analysis to recover every unknown's sensitivity to one sink row in a
    /// single factorization (§4.5).
    pub fn solve_transpose(&self, rhs: &[Complex64]) -> Result<Vec<Complex64>> {
        let lu = self
            .lu
            .as_ref()
            .ok_or_else(|| CircuitError::topology("matrix not factored"))?;
        let n = self.size;

        // A = P^T L U  =>  A^T = U^T L^T P
        // Solve U^T y = rhs, then L^T z = y, then permute: x = P^T z.
        let mut y = rhs.to_vec();
        for i in 0..n {
            for j in 0..i {
                let u = lu[j * n + i];
                let yj = y[j];
                y[i] -= u * yj;
            }
            y[i] /= lu[i * n + i];
        }

        let mut z = y;
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                let l = lu[j * n + i];
                let zj = z[j];
                z[i] -= l * zj;
            }
        }

        let mut x = vec![Complex64::new(0.0, 0.0); n];
        for (i, &p) in self.pivots.iter().enumerate() {
            x[p] = z[i];
        }
        Ok(x)
    }
}

/// Open-loop gain `A(omega)` of an op-amp at `frequency` Hz, per §4.3.
pub fn opamp_gain(params: &crate::opamp::OpAmpParams, frequency: f64) -> Complex64 {
    let j = Complex64::new(0.0, 1.0);
    let f = frequency;

    let pole_term = Complex64::new(1.0, 0.0) + j * f * params.a0 / params.gbw;
    let delay_term = if params.delay != 0.0 {
        let phase = -2.0 * std::f64::consts::PI * f * params.delay;
        Complex64::new(phase.cos(), phase.sin())
    } else {
        Complex64::new(1.0, 0.0)
    };

    let mut zero_product = Complex64::new(1.0, 0.0);
    for &z in &params.zeros {
        zero_product *= Complex64::new(1.0, 0.0) + j * f / z;
    }
    let mut pole_product = Complex64::new(1.0, 0.0);
    for &p in &params.poles {
        pole_product *= Complex64::new(1.0, 0.0) + j * f / p;
    }

    (params.a0 / pole_term) * delay_term * zero_product / pole_product
}

/// Assemble the MNA matrix for `circuit` at `frequency`, with optional
/// power-of-two prescaling of branch-current rows/columns.
pub fn stamp(circuit: &Circuit, frequency: f64, prescale: bool) -> Result<MnaMatrix> {
    let omega = 2.0 * std::f64::consts::PI * frequency;
    let j = Complex64::new(0.0, 1.0);
    let node_count = circuit.node_count();
    let size = circuit.matrix_size();
    tracing::trace!(frequency, size, "stamping MNA matrix");
    let mut m = MnaMatrix::new(size, node_count);

    for (idx, component) in circuit.components().iter().enumerate() {
        let branch = m.branch_row(idx);
        match component {
            Component::Resistor { resistance, n1, n2, .. } => {
                let a = MnaMatrix::node_row(*n1);
                let b = MnaMatrix::node_row(*n2);
                m.stamp_passive(branch, a, b, Complex64::new(*resistance, 0.0));
            }
            Component::Capacitor { capacitance, n1, n2, .. } => {
                let a = MnaMatrix::node_row(*n1);
                let b = MnaMatrix::node_row(*n2);
                let impedance = 1.0 / (j * omega * capacitance);
                m.stamp_passive(branch, a, b, impedance);
            }
            Component::Inductor(l) => {
                let a = MnaMatrix::node_row(l.n1);
                let b = MnaMatrix::node_row(l.n2);
                let impedance = j * omega * l.inductance;
                m.stamp_passive(branch, a, b, impedance);

                for (&peer, &k) in &l.coupling {
                    let peer_inductance = inductor_inductance(circuit, peer);
                    let mutual = k * (l.inductance * peer_inductance).sqrt();
                    let peer_idx = inductor_component_index(circuit, peer);
                    let peer_branch = m.branch_row(peer_idx);
                    m.add(branch, peer_branch, -j * omega * mutual);
                }
            }
            Component::OpAmp(op) => {
                let plus = MnaMatrix::node_row(op.n_plus);
                let minus = MnaMatrix::node_row(op.n_minus);
                let out = MnaMatrix::node_row(op.n_out);
                let one = Complex64::new(1.0, 0.0);

                if let Some(plus) = plus {
                    m.add(branch, plus, one);
                }
                if let Some(minus) = minus {
                    m.add(branch, minus, -one);
                }
                let gain = opamp_gain(&op.params, frequency);
                if let Some(out) = out {
                    m.add(branch, out, -one / gain);
                    m.add(out, branch, one);
                }
            }
            Component::Input(input) => {
                let plus = MnaMatrix::node_row(input.n_plus);
                let minus = MnaMatrix::node_row(input.n_minus);
                let one = Complex64::new(1.0, 0.0);

                match input.input_type {
                    InputType::Voltage => {
                        if let Some(plus) = plus {
                            m.add(branch, plus, one);
                            m.add(plus, branch, one);
                        }
                        if let Some(minus) = minus {
                            m.add(branch, minus, -one);
                            m.add(minus, branch, -one);
                        }
                    }
                    InputType::Current => {
                        if let Some(plus) = plus {
                            m.add(plus, branch, one);
                        }
                        if let Some(minus) = minus {
                            m.add(minus, branch, -one);
                        }
                        m.add(branch, branch, one);
                    }
                    InputType::Noise => {
                        let impedance = input.impedance.unwrap_or(f64::INFINITY);
                        if let Some(plus) = plus {
                            m.add(plus, branch, one);
                            m.add(branch, plus, one);
                        }
                        if let Some(minus) = minus {
                            m.add(minus, branch, -one);
                            m.add(branch, minus, -one);
                        }
                        m.add(branch, branch, -Complex64::new(impedance, 0.0));
                    }
                }
            }
        }
    }

    if prescale {
        for idx in 0..circuit.components().len() {
            let branch = m.branch_row(idx);
            let max_magnitude = (0..size)
                .map(|col| m.at(branch, col).norm())
                .fold(0.0_f64, f64::max);
            if max_magnitude > 0.0 && max_magnitude.is_finite() {
                let scale = nearest_power_of_two(1.0 / max_magnitude);
                m.apply_scale(branch, scale);
            }
        }
    }

    Ok(m)
}

fn nearest_power_of_two(value: f64) -> f64 {
    if value <= 0.0 || !value.is_finite() {
        return 1.0;
    }
    2.0_f64.powf(value.log2().round())
}

fn inductor_component_index(circuit: &Circuit, handle: crate::circuit::InductorHandle) -> usize {
    circuit
        .components()
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, Component::Inductor(_)))
        .nth(handle.0)
        .map(|(idx, _)| idx)
        .expect("inductor handle out of range")
}

fn inductor_inductance(circuit: &Circuit, handle: crate::circuit::InductorHandle) -> f64 {
    match &circuit.components()[inductor_component_index(circuit, handle)] {
        Component::Inductor(l) => l.inductance,
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn divider_circuit() -> Circuit {
        let mut c = Circuit::new();
        c.add_input("vin", InputType::Voltage, "nin", "gnd", None)
            .unwrap();
        c.add_resistor("r1", 1000.0, "nin", "nmid").unwrap();
        c.add_resistor("r2", 2000.0, "nmid", "gnd").unwrap();
        c
    }

    #[test]
    fn voltage_divider_ratio_is_frequency_independent() {
        let circuit = divider_circuit();
        for &f in &[1.0, 1000.0, 1e6] {
            let mut m = stamp(&circuit, f, false).unwrap();
            m.factor().unwrap();
            let mut rhs = vec![Complex64::new(0.0, 0.0); m.size()];
            // Input branch row is last (insertion order: input, r1, r2).
            rhs[circuit.node_count() + 0] = Complex64::new(1.0, 0.0);
            let x = m.solve(&rhs).unwrap();
            let mid_idx = circuit.lookup_node("nmid").unwrap().0;
            assert_relative_eq!(x[mid_idx].re, 2.0 / 3.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn prescaling_preserves_transfer_function() {
        let circuit = divider_circuit();
        let mut unscaled = stamp(&circuit, 1000.0, false).unwrap();
        let mut scaled = stamp(&circuit, 1000.0, true).unwrap();
        unscaled.factor().unwrap();
        scaled.factor().unwrap();

        let mut rhs = vec![Complex64::new(0.0, 0.0); unscaled.size()];
        rhs[circuit.node_count()] = Complex64::new(1.0, 0.0);
        let x1 = unscaled.solve(&rhs).unwrap();
        let x2 = scaled.solve(&rhs).unwrap();

        let mid_idx = circuit.lookup_node("nmid").unwrap().0;
        assert_relative_eq!(x1[mid_idx].re, x2[mid_idx].re, epsilon = 1e-9);
    }

    #[test]
    fn empty_zero_pole_lists_give_unity_factor() {
        let params = crate::opamp::OpAmpParams::ideal();
        let gain = opamp_gain(&params, 1000.0);
        assert!(gain.norm() > 0.0);
    }
}
