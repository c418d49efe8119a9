//! Solution container: frequency-indexed complex functions with algebra.
//!
//! A [`Solution`] maps a `(source, sink)` key to a complex vector aligned
//! with a shared frequency vector. Enumeration order is deterministic:
//! insertion order, never a `HashMap` iteration order.

use num_complex::Complex64;

use crate::error::{CircuitError, Result};

/// Output scale tag carried for display purposes; never affects computed
/// values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleKind {
    Db,
    Magnitude,
    Phase,
    Real,
    Imag,
}

/// One named function over the shared frequency vector.
#[derive(Debug, Clone)]
pub struct Function {
    pub source: String,
    pub sink: String,
    pub unit: String,
    pub scale: ScaleKind,
    pub values: Vec<Complex64>,
}

/// A set of functions sharing one frequency vector.
#[derive(Debug, Clone)]
pub struct Solution {
    frequencies: Vec<f64>,
    functions: Vec<Function>,
}

impl Solution {
    pub fn new(frequencies: Vec<f64>) -> Self {
        Solution {
            frequencies,
            functions: Vec::new(),
        }
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn add_function(&mut self, function: Function) -> Result<()> {
        if function.values.len() != self.frequencies.len() {
            return Err(CircuitError::topology(
                "function length does not match frequency vector",
            ));
        }
        self.functions.push(function);
        Ok(())
    }

    /// Functions in insertion order: deterministic, never a hash order.
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn get_function(&self, source: &str, sink: &str) -> Option<&Function> {
        self.functions
            .iter()
            .find(|f| f.source == source && f.sink == sink)
    }

    /// Merge two solutions sharing a frequency vector. Conflicting
    /// (source, sink) pairs are flagged as an error rather than silently
    /// overwritten.
    pub fn union(mut self, other: Solution) -> Result<Solution> {
        if self.frequencies != other.frequencies {
            return Err(CircuitError::topology(
                "cannot union solutions with different frequency vectors",
            ));
        }
        for f in other.functions {
            if self.get_function(&f.source, &f.sink).is_some() {
                return Err(CircuitError::topology(format!(
                    "conflicting function {} -> {} in union",
                    f.source, f.sink
                )));
            }
            self.functions.push(f);
        }
        Ok(self)
    }

    /// Tabular diff against `other` over the intersection of matching
    /// function keys. `tolerance` is a relative tolerance (default
    /// [`crate::DEFAULT_DIFFERENCE_TOLERANCE`]); entries within tolerance are
    /// omitted.
    ///
    /// `defaults_only` restricts the comparison to functions using the
    /// default display scale ([`ScaleKind::Magnitude`]), skipping any
    /// `:db`/`:deg`/`:re`/`:im`-tagged variant of the same function.
    /// `meta_only` matches functions by sink label alone rather than by
    /// `(source, sink)`, for comparing against a solution whose source
    /// naming convention differs (e.g. a reference binary's own labels).
    pub fn difference(
        &self,
        other: &Solution,
        tolerance: f64,
        defaults_only: bool,
        meta_only: bool,
    ) -> Vec<DifferenceRow> {
        let mut rows = Vec::new();
        for f in &self.functions {
            if defaults_only && f.scale != ScaleKind::Magnitude {
                continue;
            }
            let matched = if meta_only {
                other.functions.iter().find(|g| g.sink == f.sink)
            } else {
                other.get_function(&f.source, &f.sink)
            };
            let Some(g) = matched else {
                continue;
            };
            for (i, (&freq, (a, b))) in self
                .frequencies
                .iter()
                .zip(f.values.iter().zip(g.values.iter()))
                .enumerate()
            {
                let diff = (a - b).norm();
                let scale = a.norm().max(b.norm()).max(1e-30);
                if diff / scale > tolerance {
                    rows.push(DifferenceRow {
                        source: f.source.clone(),
                        sink: f.sink.clone(),
                        frequency_index: i,
                        frequency: freq,
                        expected: *a,
                        actual: *b,
                    });
                }
            }
        }
        rows
    }

    /// Render as a plain-text table: frequency column then one column per
    /// function, in insertion order.
    pub fn to_table(&self) -> String {
        let mut out = String::new();
        out.push_str("freq");
        for f in &self.functions {
            out.push('\t');
            out.push_str(&format!("{}->{}", f.source, f.sink));
        }
        out.push('\n');

        for (i, &freq) in self.frequencies.iter().enumerate() {
            out.push_str(&format!("{freq}"));
            for f in &self.functions {
                let v = f.values[i];
                out.push('\t');
                out.push_str(&format!("{:e}{:+e}i", v.re, v.im));
            }
            out.push('\n');
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct DifferenceRow {
    pub source: String,
    pub sink: String,
    pub frequency_index: usize,
    pub frequency: f64,
    pub expected: Complex64,
    pub actual: Complex64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_solution() -> Solution {
        let mut s = Solution::new(vec![1.0, 10.0, 100.0]);
        s.add_function(Function {
            source: "in".into(),
            sink: "out".into(),
            unit: "V".into(),
            scale: ScaleKind::Magnitude,
            values: vec![
                Complex64::new(1.0, 0.0),
                Complex64::new(0.5, 0.0),
                Complex64::new(0.1, 0.0),
            ],
        })
        .unwrap();
        s
    }

    #[test]
    fn difference_of_solution_with_itself_is_empty() {
        let s = sample_solution();
        assert!(s.difference(&s, 1e-4, false, false).is_empty());
    }

    #[test]
    fn difference_meta_only_matches_by_sink_alone() {
        let mut a = Solution::new(vec![1.0, 10.0, 100.0]);
        a.add_function(Function {
            source: "in".into(),
            sink: "out".into(),
            unit: "V".into(),
            scale: ScaleKind::Magnitude,
            values: vec![Complex64::new(1.0, 0.0); 3],
        })
        .unwrap();
        let mut b = Solution::new(vec![1.0, 10.0, 100.0]);
        b.add_function(Function {
            source: "reference".into(),
            sink: "out".into(),
            unit: "V".into(),
            scale: ScaleKind::Magnitude,
            values: vec![Complex64::new(2.0, 0.0); 3],
        })
        .unwrap();

        // Source names differ ("in" vs "reference"), so a plain (source,
        // sink) match finds nothing and silently misses the real mismatch.
        assert!(a.difference(&b, 1e-4, false, false).is_empty());
        // meta_only matches by sink alone and catches it.
        assert!(!a.difference(&b, 1e-4, false, true).is_empty());
    }

    #[test]
    fn difference_defaults_only_skips_non_magnitude_scales() {
        let mut a = Solution::new(vec![1.0]);
        a.add_function(Function {
            source: "in".into(),
            sink: "out".into(),
            unit: "deg".into(),
            scale: ScaleKind::Phase,
            values: vec![Complex64::new(1.0, 0.0)],
        })
        .unwrap();
        let mut b = Solution::new(vec![1.0]);
        b.add_function(Function {
            source: "in".into(),
            sink: "out".into(),
            unit: "deg".into(),
            scale: ScaleKind::Phase,
            values: vec![Complex64::new(99.0, 0.0)],
        })
        .unwrap();

        assert!(a.difference(&b, 1e-4, true, false).is_empty());
        assert!(!a.difference(&b, 1e-4, false, false).is_empty());
    }

    #[test]
    fn union_is_commutative_on_disjoint_keys() {
        let a = sample_solution();
        let mut b = Solution::new(vec![1.0, 10.0, 100.0]);
        b.add_function(Function {
            source: "in".into(),
            sink: "other".into(),
            unit: "V".into(),
            scale: ScaleKind::Magnitude,
            values: vec![
                Complex64::new(2.0, 0.0),
                Complex64::new(1.0, 0.0),
                Complex64::new(0.2, 0.0),
            ],
        })
        .unwrap();

        let ab = a.clone().union(b.clone()).unwrap();
        let ba = b.union(a).unwrap();
        assert_eq!(ab.functions().len(), ba.functions().len());
    }

    #[test]
    fn union_flags_conflicts() {
        let a = sample_solution();
        let b = sample_solution();
        assert!(a.union(b).is_err());
    }
}
