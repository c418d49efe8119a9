//! Parser for the reference binary's textual output format (C8).
//!
//! Format: a block of `#`-prefixed `key=value` comment lines, a blank line,
//! a header row of column labels, then one whitespace-separated row per
//! frequency. Column order is frequency, then functions in header order.
//! This parser is used only for cross-validation; it never instantiates a
//! circuit.

use num_complex::Complex64;

use crate::error::{CircuitError, Result};
use crate::solution::{Function, ScaleKind, Solution};

/// Header metadata preceding the data block.
#[derive(Debug, Clone, Default)]
pub struct OutputHeader {
    pub fields: Vec<(String, String)>,
}

impl OutputHeader {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse a complete reference-output document into a [`Solution`] plus its
/// header metadata.
pub fn parse(text: &str) -> Result<(OutputHeader, Solution)> {
    let mut lines = text.lines();
    let mut header = OutputHeader::default();

    let mut header_done = false;
    let mut column_line: Option<&str> = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in &mut lines {
        if !header_done {
            if line.trim().is_empty() {
                header_done = true;
                continue;
            }
            let trimmed = line.trim_start_matches('#').trim();
            if let Some((k, v)) = trimmed.split_once('=') {
                header.fields.push((k.trim().to_string(), v.trim().to_string()));
            }
            continue;
        }
        if column_line.is_none() {
            if line.trim().is_empty() {
                continue;
            }
            column_line = Some(line);
            continue;
        }
        if !line.trim().is_empty() {
            data_lines.push(line);
        }
    }

    let column_line = column_line.ok_or_else(|| CircuitError::config("missing column header row"))?;
    let columns: Vec<&str> = column_line.split_whitespace().collect();
    if columns.is_empty() {
        return Err(CircuitError::config("empty column header row"));
    }

    // First column is frequency; remaining columns are "source->sink" or
    // bare sink labels (magnitude-only reference dumps).
    let function_columns = &columns[1..];
    let mut frequencies = Vec::with_capacity(data_lines.len());
    let mut values: Vec<Vec<Complex64>> = vec![Vec::with_capacity(data_lines.len()); function_columns.len()];

    for line in &data_lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != columns.len() {
            return Err(CircuitError::config(format!(
                "row has {} fields, expected {}",
                fields.len(),
                columns.len()
            )));
        }
        let freq: f64 = fields[0]
            .parse()
            .map_err(|_| CircuitError::config(format!("invalid frequency: {}", fields[0])))?;
        frequencies.push(freq);

        for (slot, field) in fields[1..].iter().enumerate() {
            let v: f64 = field
                .parse()
                .map_err(|_| CircuitError::config(format!("invalid value: {field}")))?;
            values[slot].push(Complex64::new(v, 0.0));
        }
    }

    let mut solution = Solution::new(frequencies);
    for (slot, label) in function_columns.iter().enumerate() {
        let (source, sink) = label
            .split_once("->")
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .unwrap_or_else(|| ("reference".to_string(), label.to_string()));
        solution.add_function(Function {
            source,
            sink,
            unit: String::new(),
            scale: ScaleKind::Magnitude,
            values: std::mem::take(&mut values[slot]),
        })?;
    }

    Ok((header, solution))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
#analysis=transfer
#input=vin

freq\tin->nout
1\t0.5
10\t0.6
";

    #[test]
    fn parses_header_and_data() {
        let (header, solution) = parse(SAMPLE).unwrap();
        assert_eq!(header.get("analysis"), Some("transfer"));
        assert_eq!(solution.frequencies(), &[1.0, 10.0]);
        let f = solution.get_function("in", "nout").unwrap();
        assert_eq!(f.values[0].re, 0.5);
    }

    #[test]
    fn rejects_malformed_row() {
        let text = "#x=1\n\nfreq\tin->nout\n1 0.5 extra\n";
        assert!(parse(text).is_err());
    }
}
