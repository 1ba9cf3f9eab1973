use crate::error::{Error, Result};
use ethers::types::U256;
use ethers::utils::{format_units, parse_units};

/// Decimal string to fixed point, e.g. "1.5" at 18 decimals. Fractions finer
/// than `decimals` are rejected rather than truncated.
pub fn parse_amount(amount: &str, decimals: u32) -> Result<U256> {
    let amount = amount.trim();
    if let Some((_, fraction)) = amount.split_once('.') {
        if fraction.len() > decimals as usize {
            return Err(Error::ParseError(format!(
                "Amount '{}' has more than {} decimal places",
                amount, decimals
            )));
        }
    }
    let parsed = parse_units(amount, decimals)
        .map_err(|e| Error::ParseError(format!("Invalid amount '{}': {}", amount, e)))?;
    Ok(parsed.into())
}

/// Fixed point to a decimal string with trailing zeros trimmed, keeping at
/// least one fractional digit: 1.5e18 -> "1.5", 1e18 -> "1.0".
pub fn format_amount(value: U256, decimals: u32) -> Result<String> {
    let raw = format_units(value, decimals)
        .map_err(|e| Error::ParseError(format!("Cannot format amount {}: {}", value, e)))?;
    Ok(trim_fraction(&raw))
}

fn trim_fraction(raw: &str) -> String {
    match raw.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{}.0", whole)
            } else {
                format!("{}.{}", whole, fraction)
            }
        }
        None => format!("{}.0", raw),
    }
}
