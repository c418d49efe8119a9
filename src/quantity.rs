//! SI-prefixed numeric values (component values, frequencies, overrides).
//!
//! Parsing accepts a mantissa followed by an optional SI prefix and an
//! optional unit suffix, both of which may be glued directly onto the
//! number (`4.7p`, `1k`, `50`, `2.2u`, `1kohm`, `4.7uF`). The prefix
//! participates in equality via the expanded magnitude; the unit string
//! participates too, compared case-sensitively -- `1kohm` and `1kF` are
//! never equal, no matter how close their magnitudes are.

use crate::error::{CircuitError, Result};

const RELATIVE_TOLERANCE: f64 = 1e-12;

/// A parsed numeric value tagged with its physical unit, already expanded to
/// its base (unprefixed) magnitude.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    value: f64,
    unit: String,
}

impl Quantity {
    /// A bare, unitless quantity.
    pub fn new(value: f64) -> Self {
        Quantity { value, unit: String::new() }
    }

    pub fn with_unit(value: f64, unit: impl Into<String>) -> Self {
        Quantity { value, unit: unit.into() }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Parse text such as `4.7p`, `10k`, `1e-14`, `50`, `1kohm`.
    ///
    /// Recognized SI prefixes, longest match first so `meg`-style collisions
    /// never arise: y z a f p n u µ m k M G T P. Anything left over after
    /// the prefix is carried as the unit string verbatim.
    pub fn parse(text: &str) -> Option<Quantity> {
        let (value, unit) = parse_value_and_unit(text)?;
        Some(Quantity { value, unit })
    }

    /// Render with the prefix that puts the mantissa in `[1, 1000)`, followed
    /// by the unit string.
    pub fn format(&self) -> String {
        format!("{}{}", format_value(self.value), self.unit)
    }

    /// Equal if both the expanded magnitude (within relative tolerance) and
    /// the unit string (case-sensitive) match. A `1kohm` resistor value and
    /// a `1kF` capacitor value are never equal, regardless of magnitude.
    pub fn approx_eq(&self, other: &Quantity) -> bool {
        if self.unit != other.unit {
            return false;
        }
        let diff = (self.value - other.value).abs();
        let scale = self.value.abs().max(other.value.abs()).max(1.0);
        diff <= RELATIVE_TOLERANCE * scale
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format())
    }
}

/// Parse a bare numeric token, peeling off a trailing SI-prefix letter (and
/// any trailing alphabetic unit text) if the remaining text is numeric.
///
/// Returns `None` if nothing numeric could be recovered.
pub fn parse_value(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    // Fast path: the whole token parses as a plain float (handles `1e-14`,
    // `3.3`, `-5`).
    if let Ok(v) = text.parse::<f64>() {
        return Some(v);
    }

    // Split into a leading numeric mantissa and a trailing alphabetic tail.
    let mut split_at = text.len();
    for (i, c) in text.char_indices() {
        if c.is_ascii_digit() || c == '.' || c == '-' || c == '+' {
            continue;
        }
        if c == 'e' || c == 'E' {
            // Could be exponent notation; only treat as tail if it's not
            // followed by a digit or sign.
            let rest = &text[i + c.len_utf8()..];
            if rest.starts_with(|r: char| r.is_ascii_digit() || r == '+' || r == '-') {
                continue;
            }
        }
        split_at = i;
        break;
    }

    if split_at == 0 {
        return None;
    }

    let mantissa: f64 = text[..split_at].parse().ok()?;
    let tail = &text[split_at..];
    let mut chars = tail.chars();
    let prefix_char = chars.next();

    let multiplier = match prefix_char {
        Some('y') => 1e-24,
        Some('z') => 1e-21,
        Some('a') => 1e-18,
        Some('f') => 1e-15,
        Some('p') => 1e-12,
        Some('n') => 1e-9,
        Some('u') | Some('\u{b5}') => 1e-6,
        Some('m') => {
            // `meg` means mega, not milli, in several SPICE dialects; LISO
            // itself does not use `meg`, so treat a bare `m` as milli.
            if tail.len() >= 3 && tail[..3.min(tail.len())].eq_ignore_ascii_case("meg") {
                1e6
            } else {
                1e-3
            }
        }
        Some('k') | Some('K') => 1e3,
        Some('M') => 1e6,
        Some('G') => 1e9,
        Some('T') => 1e12,
        Some('P') => 1e15,
        None => 1.0,
        Some(_) => 1.0,
    };

    Some(mantissa * multiplier)
}

/// Like [`parse_value`], but also returns the unit text remaining after the
/// SI-prefix character (e.g. `1kohm` -> `(1000.0, "ohm")`, `4.7uF` ->
/// `(4.7e-6, "F")`, `50` -> `(50.0, "")`).
fn parse_value_and_unit(text: &str) -> Option<(f64, String)> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(v) = text.parse::<f64>() {
        return Some((v, String::new()));
    }

    let mut split_at = text.len();
    for (i, c) in text.char_indices() {
        if c.is_ascii_digit() || c == '.' || c == '-' || c == '+' {
            continue;
        }
        if c == 'e' || c == 'E' {
            let rest = &text[i + c.len_utf8()..];
            if rest.starts_with(|r: char| r.is_ascii_digit() || r == '+' || r == '-') {
                continue;
            }
        }
        split_at = i;
        break;
    }

    if split_at == 0 {
        return None;
    }

    let mantissa: f64 = text[..split_at].parse().ok()?;
    let tail = &text[split_at..];
    let mut chars = tail.chars();
    let prefix_char = chars.next();

    let (multiplier, prefix_len) = match prefix_char {
        Some('y') => (1e-24, 'y'.len_utf8()),
        Some('z') => (1e-21, 'z'.len_utf8()),
        Some('a') => (1e-18, 'a'.len_utf8()),
        Some('f') => (1e-15, 'f'.len_utf8()),
        Some('p') => (1e-12, 'p'.len_utf8()),
        Some('n') => (1e-9, 'n'.len_utf8()),
        Some('u') | Some('\u{b5}') => (1e-6, prefix_char.unwrap().len_utf8()),
        Some('m') => {
            if tail.len() >= 3 && tail[..3.min(tail.len())].eq_ignore_ascii_case("meg") {
                (1e6, 3)
            } else {
                (1e-3, 'm'.len_utf8())
            }
        }
        Some('k') | Some('K') => (1e3, 1),
        Some('M') => (1e6, 1),
        Some('G') => (1e9, 1),
        Some('T') => (1e12, 1),
        Some('P') => (1e15, 1),
        _ => (1.0, 0),
    };

    let unit = tail[prefix_len..].to_string();
    Some((mantissa * multiplier, unit))
}

/// Format a value using the SI prefix that puts the mantissa in `[1, 1000)`.
pub fn format_value(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let magnitude = value.abs();

    const PREFIXES: &[(f64, &str)] = &[
        (1e15, "P"),
        (1e12, "T"),
        (1e9, "G"),
        (1e6, "M"),
        (1e3, "k"),
        (1.0, ""),
        (1e-3, "m"),
        (1e-6, "u"),
        (1e-9, "n"),
        (1e-12, "p"),
        (1e-15, "f"),
        (1e-18, "a"),
        (1e-21, "z"),
        (1e-24, "y"),
    ];

    for &(scale, suffix) in PREFIXES {
        if magnitude >= scale {
            let mantissa = magnitude / scale;
            return format!("{sign}{mantissa}{suffix}");
        }
    }

    format!("{sign}{magnitude}y")
}

/// Parse a value or fail with a line-tagged [`CircuitError::Parse`].
pub fn parse_value_or_err(text: &str, line: usize) -> Result<f64> {
    parse_value(text).ok_or_else(|| CircuitError::parse(line, format!("invalid number: {text}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_number() {
        assert_eq!(parse_value("50"), Some(50.0));
    }

    #[test]
    fn parses_si_prefix() {
        assert_eq!(parse_value("1k"), Some(1000.0));
        assert_eq!(parse_value("4.7p"), Some(4.7e-12));
        assert_eq!(parse_value("2.2u"), Some(2.2e-6));
    }

    #[test]
    fn parses_scientific_notation() {
        assert_eq!(parse_value("1e-14"), Some(1e-14));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("abc"), None);
    }

    #[test]
    fn quantity_equality_ignores_prefix_choice() {
        let a = Quantity::parse("1k").unwrap();
        let b = Quantity::parse("1000").unwrap();
        assert!(a.approx_eq(&b));
    }

    #[test]
    fn quantity_parses_trailing_unit_text() {
        let q = Quantity::parse("1kohm").unwrap();
        assert_eq!(q.value(), 1000.0);
        assert_eq!(q.unit(), "ohm");
    }

    #[test]
    fn quantity_equality_requires_matching_unit() {
        let ohms = Quantity::parse("1kohm").unwrap();
        let farads = Quantity::parse("1kF").unwrap();
        assert!(!ohms.approx_eq(&farads));

        let same_ohms = Quantity::parse("1000ohm").unwrap();
        assert!(ohms.approx_eq(&same_ohms));
    }

    #[test]
    fn quantity_unit_comparison_is_case_sensitive() {
        let lower = Quantity::with_unit(1.0, "hz");
        let upper = Quantity::with_unit(1.0, "Hz");
        assert!(!lower.approx_eq(&upper));
    }
}
