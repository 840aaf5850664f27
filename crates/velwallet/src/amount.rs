use crate::errors::VelwalletError;
use rust_decimal::Decimal;

/// Parse a plain decimal (optional leading sign, digits, at most one `.`), any sign.
///
/// Exponents, grouping separators and non-finite values are rejected. Input that `Decimal`
/// cannot hold exactly is rejected rather than rounded; trailing fractional zeros do not count.
pub fn parse_plain_decimal(s: &str) -> Result<Decimal, VelwalletError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(VelwalletError::InvalidAmount);
    }

    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (whole, frac) = match digits.split_once('.') {
        Some((a, b)) => (a, b),
        None => (digits, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(VelwalletError::InvalidAmount);
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(VelwalletError::InvalidAmount);
    }

    let sign = if s.starts_with('-') { "-" } else { "" };
    let whole = if whole.is_empty() { "0" } else { whole };
    let frac = frac.trim_end_matches('0');
    let frac = if frac.is_empty() { "0" } else { frac };
    Decimal::from_str_exact(&format!("{sign}{whole}.{frac}"))
        .map_err(|_err| VelwalletError::InvalidAmount)
}

/// Parse a user-entered transfer amount: a plain decimal that must be > 0.
pub fn parse_transfer_amount(s: &str) -> Result<Decimal, VelwalletError> {
    let v = parse_plain_decimal(s)?;
    if v <= Decimal::ZERO {
        return Err(VelwalletError::InvalidAmount);
    }
    Ok(v)
}

/// The one rendering used everywhere an amount becomes text or a wire number: plain decimal,
/// no exponent, no grouping, no trailing fractional zeros.
///
/// Examples:
/// - 10.50 => "10.5"
/// - 10.0 => "10"
/// - 0.000001 => "0.000001"
pub fn canonical_amount(v: Decimal) -> String {
    v.normalize().to_string()
}
