use crate::error::{Result, Error};
use ethers::types::Address;
use std::str::FromStr;

pub fn validate_address(address: &str) -> Result<Address> {
    let trimmed = address.trim();
    if !trimmed.starts_with("0x") || trimmed.len() != 42 {
        return Err(Error::ValidationError(format!("Invalid address: {}", address)));
    }
    Address::from_str(trimmed)
        .map_err(|e| Error::ValidationError(format!("Invalid address {}: {}", address, e)))
}

/// Decimal token amount as typed by a user, e.g. "12.5".
pub fn validate_amount(amount: &str) -> Result<()> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(Error::ValidationError("Amount cannot be empty".to_string()));
    }
    let malformed = trimmed == "."
        || trimmed.matches('.').count() > 1
        || !trimmed.chars().all(|c| c.is_ascii_digit() || c == '.');
    if malformed {
        return Err(Error::ValidationError(format!(
            "Amount must be a non-negative decimal: {}",
            amount
        )));
    }
    Ok(())
}

pub fn validate_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::ValidationError(format!("{} cannot be empty", field)));
    }
    Ok(())
}

pub fn validate_dimensions(width: f64, height: f64) -> Result<()> {
    if !width.is_finite() || !height.is_finite() || width <= 0.0 || height <= 0.0 {
        return Err(Error::ValidationError(format!(
            "Container dimensions must be positive, got {}x{}",
            width, height
        )));
    }
    if width > 10_000.0 || height > 10_000.0 {
        return Err(Error::ValidationError("Container dimensions are too large".to_string()));
    }
    Ok(())
}
