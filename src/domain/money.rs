use std::fmt;

/// Crypto amounts are integer base units with 8 fractional digits.
/// 1 BTC = 100_000_000 units, so 0.5 BTC = 50_000_000.
pub type Units = i64;

/// Card amounts are integer cents. $50.00 = 5000 cents.
pub type Cents = i64;

pub const UNIT_SCALE: u32 = 8;
pub const CENT_SCALE: u32 = 2;

/// Basis points are hundredths of a percent; 10 bps = 0.1%.
pub const BPS_DENOMINATOR: i128 = 10_000;

/// Highest accepted fee rate: 100% of the amount.
pub const MAX_FEE_BPS: u32 = 10_000;

/// Format base units as a coin amount.
/// Example: 150_000_000 -> "1.50000000"
pub fn format_units(units: Units) -> String {
    format_fixed(units, UNIT_SCALE)
}

/// Parse a coin amount into base units.
/// Example: "1.5" -> 150_000_000, "0.0005" -> 50_000
pub fn parse_units(input: &str) -> Result<Units, ParseAmountError> {
    parse_fixed(input, UNIT_SCALE)
}

/// Format cents as a human-readable currency string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    format_fixed(cents, CENT_SCALE)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
pub fn parse_cents(input: &str) -> Result<Cents, ParseAmountError> {
    parse_fixed(input, CENT_SCALE)
}

/// Fee charged on `amount`, rounded half-up to the nearest base unit.
/// Returns None if the fee does not fit in `Units`.
pub fn fee_for(amount: Units, fee_bps: u32) -> Option<Units> {
    let scaled = amount as i128 * fee_bps as i128;
    Units::try_from((scaled + BPS_DENOMINATOR / 2) / BPS_DENOMINATOR).ok()
}

fn format_fixed(value: i64, scale: u32) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let factor = 10_u64.pow(scale);
    let abs = value.unsigned_abs();
    format!(
        "{}{}.{:0width$}",
        sign,
        abs / factor,
        abs % factor,
        width = scale as usize
    )
}

fn parse_fixed(input: &str, scale: u32) -> Result<i64, ParseAmountError> {
    let input = input.trim();
    let negative = input.starts_with('-');
    let input = input.trim_start_matches('-');
    let factor = 10_i64.pow(scale);

    let parts: Vec<&str> = input.split('.').collect();
    let (whole, fraction) = match parts.as_slice() {
        [whole] => (*whole, ""),
        [whole, fraction] => (*whole, *fraction),
        _ => return Err(ParseAmountError::InvalidFormat),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(ParseAmountError::InvalidFormat);
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ParseAmountError::InvalidFormat);
    }
    if fraction.len() > scale as usize {
        return Err(ParseAmountError::TooPrecise { max_digits: scale });
    }

    let whole_units: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| ParseAmountError::Overflow)?
    };

    // Right-pad the fraction so "5" at scale 2 means 50
    let fraction_units: i64 = if fraction.is_empty() {
        0
    } else {
        format!("{:0<width$}", fraction, width = scale as usize)
            .parse()
            .map_err(|_| ParseAmountError::InvalidFormat)?
    };

    let value = whole_units
        .checked_mul(factor)
        .and_then(|v| v.checked_add(fraction_units))
        .ok_or(ParseAmountError::Overflow)?;

    Ok(if negative { -value } else { value })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    InvalidFormat,
    TooPrecise { max_digits: u32 },
    Overflow,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::InvalidFormat => write!(f, "invalid amount format"),
            ParseAmountError::TooPrecise { max_digits } => {
                write!(f, "amount has more than {} fractional digits", max_digits)
            }
            ParseAmountError::Overflow => write!(f, "amount is too large"),
        }
    }
}

impl std::error::Error for ParseAmountError {}
