//! AC transfer-function analysis (§4.4).
//!
//! Builds and factors the MNA matrix once per frequency against a single
//! unit-input right-hand side; every requested sink is read from the same
//! solve, so adding more sinks costs nothing extra per frequency.

use num_complex::Complex64;

use crate::circuit::{Circuit, InputType};
use crate::error::{CircuitError, Result};
use crate::solution::{Function, ScaleKind, Solution};

use super::{stamp, Sink};

/// Run a transfer-function sweep from the circuit's sole input to each of
/// `sinks`, over `frequencies`, with optional prescaling.
pub fn sweep(
    circuit: &Circuit,
    frequencies: &[f64],
    sinks: &[Sink],
    prescale: bool,
) -> Result<Solution> {
    let input = circuit
        .input()
        .ok_or_else(|| CircuitError::topology("circuit has no input component"))?;
    let input_name = input.name.clone();
    let input_unit = match input.input_type {
        InputType::Voltage => "V",
        InputType::Current | InputType::Noise => "A",
    };
    let input_branch = Sink::Branch(input_name.clone()).row(circuit)?;

    let sink_rows: Vec<(usize, &Sink)> = sinks
        .iter()
        .map(|s| s.row(circuit).map(|r| (r, s)))
        .collect::<Result<Vec<_>>>()?;

    let mut values: Vec<Vec<Complex64>> = vec![Vec::with_capacity(frequencies.len()); sinks.len()];

    tracing::debug!(points = frequencies.len(), sinks = sinks.len(), "starting transfer sweep");

    for &frequency in frequencies {
        let _span = tracing::trace_span!("transfer_point", frequency).entered();
        let mut matrix = stamp(circuit, frequency, prescale)?;
        matrix.factor().map_err(|e| match e {
            CircuitError::SingularMatrix { .. } => CircuitError::SingularMatrix { frequency },
            other => other,
        })?;

        let mut rhs = vec![Complex64::new(0.0, 0.0); matrix.size()];
        rhs[input_branch] = Complex64::new(1.0, 0.0);
        let x = matrix.solve(&rhs)?;

        for (slot, &(row, _)) in sink_rows.iter().enumerate() {
            let v = x[row];
            if !v.re.is_finite() || !v.im.is_finite() {
                return Err(CircuitError::numeric(frequency, "non-finite solution entry"));
            }
            values[slot].push(v);
        }
    }

    let mut solution = Solution::new(frequencies.to_vec());
    for (slot, sink) in sinks.iter().enumerate() {
        let sink_unit = match sink {
            Sink::Node(_) => "V",
            Sink::Branch(_) => "A",
        };
        solution.add_function(Function {
            source: input_name.clone(),
            sink: sink.label().to_string(),
            unit: format!("{sink_unit}/{input_unit}"),
            scale: ScaleKind::Magnitude,
            values: std::mem::take(&mut values[slot]),
        })?;
    }
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rc_lowpass() -> Circuit {
        let mut c = Circuit::new();
        c.add_input("vin", InputType::Voltage, "nin", "gnd", None)
            .unwrap();
        c.add_resistor("r1", 1000.0, "nin", "nout").unwrap();
        c.add_capacitor("c1", 1e-6, "nout", "gnd").unwrap();
        c
    }

    #[test]
    fn rc_lowpass_minus_3db_point() {
        let circuit = rc_lowpass();
        let corner = 1.0 / (2.0 * std::f64::consts::PI * 1000.0 * 1e-6);
        let solution = sweep(&circuit, &[corner], &[Sink::Node("nout".into())], false).unwrap();
        let f = solution.get_function("vin", "nout").unwrap();
        assert_relative_eq!(f.values[0].norm(), std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-6);
        assert_relative_eq!(f.values[0].arg(), -std::f64::consts::FRAC_PI_4, epsilon = 1e-6);
    }

    #[test]
    fn inverting_amplifier_midband_gain() {
        let mut c = Circuit::new();
        c.add_input("vin", InputType::Voltage, "nin", "gnd", None)
            .unwrap();
        c.add_resistor("rin", 1000.0, "nin", "nm").unwrap();
        c.add_resistor("rf", 10_000.0, "nm", "nout").unwrap();
        c.add_library_opamp(
            &crate::opamp::OpAmpLibrary::builtin(),
            "u1",
            "op27",
            "gnd",
            "nm",
            "nout",
            &[],
        )
        .unwrap();

        let solution = sweep(&c, &[1000.0], &[Sink::Node("nout".into())], false).unwrap();
        let f = solution.get_function("vin", "nout").unwrap();
        assert_relative_eq!(f.values[0].norm(), 10.0, epsilon = 1e-3);
        assert_relative_eq!(f.values[0].arg().abs(), std::f64::consts::PI, epsilon = 1e-2);
    }

    #[test]
    fn missing_input_fails_before_any_solve() {
        let mut c = Circuit::new();
        c.add_resistor("r1", 1000.0, "a", "gnd").unwrap();
        let err = sweep(&c, &[1000.0], &[Sink::Node("a".into())], false).unwrap_err();
        assert!(matches!(err, CircuitError::Topology { .. }));
    }

    #[test]
    fn single_frequency_point_succeeds() {
        let circuit = rc_lowpass();
        let solution = sweep(&circuit, &[1.0], &[Sink::Node("nout".into())], false).unwrap();
        assert_eq!(solution.frequencies().len(), 1);
    }
}
