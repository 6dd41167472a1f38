//! Kubernetes resource quantity parsing
//!
//! Quantities are `<number><suffix>` where the suffix is a binary SI unit
//! (`Ki`..`Ei`), a decimal SI unit (`n`, `u`, `m`, `k`, `M`..`E`) or a
//! decimal exponent (`e3`, `E-2`). Fractional results round up, matching
//! the API server's integer conversions.

use crate::error::QuantityError;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

/// Parse a quantity into its plain numeric value
pub fn parse(raw: &str) -> Result<f64, QuantityError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(QuantityError::Empty);
    }

    let split = raw
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '+' || *c == '-'))))
        .map(|(i, _)| i)
        .unwrap_or(raw.len());
    let (number, suffix) = raw.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| QuantityError::Invalid(raw.to_string()))?;

    let multiplier = match suffix {
        "" => 1.0,
        "n" => 1e-9,
        "u" => 1e-6,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        "Ki" => 1024f64,
        "Mi" => 1024f64.powi(2),
        "Gi" => 1024f64.powi(3),
        "Ti" => 1024f64.powi(4),
        "Pi" => 1024f64.powi(5),
        "Ei" => 1024f64.powi(6),
        exp if exp.starts_with(['e', 'E']) => {
            let exponent: i32 = exp[1..]
                .parse()
                .map_err(|_| QuantityError::Invalid(raw.to_string()))?;
            10f64.powi(exponent)
        }
        _ => return Err(QuantityError::Invalid(raw.to_string())),
    };

    let parsed = value * multiplier;
    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(QuantityError::Invalid(raw.to_string()))
    }
}

/// Quantity in thousandths of a unit (CPU millicores)
pub fn milli_value(raw: &str) -> Result<i64, QuantityError> {
    parse(raw).map(|v| round_up(v * 1000.0))
}

/// Quantity in whole units (bytes, counts)
pub fn value(raw: &str) -> Result<i64, QuantityError> {
    parse(raw).map(round_up)
}

/// Millicores of a CPU quantity, or 0 when it cannot be parsed
pub fn cpu_milli(quantity: &Quantity) -> i64 {
    milli_value(&quantity.0).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Ignoring unparseable CPU quantity");
        0
    })
}

/// Bytes (or a plain count) of a quantity, or 0 when it cannot be parsed
pub fn whole_value(quantity: &Quantity) -> i64 {
    value(&quantity.0).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Ignoring unparseable quantity");
        0
    })
}

fn round_up(v: f64) -> i64 {
    // Float noise (100.00000000000001 for "0.1" cores) must not round up
    let nearest = v.round();
    if (v - nearest).abs() < 1e-6 {
        nearest as i64
    } else {
        v.ceil() as i64
    }
}
