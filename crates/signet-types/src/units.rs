//! Display formatting for base-unit token amounts

/// Decimals of the native ledger token (e8s)
pub const NATIVE_DECIMALS: u8 = 8;

const DISPLAY_FRACTION_DIGITS: usize = 2;

/// Format a base-unit amount with thousands separators and at most two
/// fractional digits, truncating rather than rounding.
///
/// `format_units(123_456_789_000, 8)` is `"1,234.56"`.
pub fn format_units(amount: u64, decimals: u8) -> String {
    let amount = u128::from(amount);
    // Any u64 is below 10^20, so a scale that overflows u128 leaves no whole part.
    let (whole, fraction) = match 10u128.checked_pow(u32::from(decimals)) {
        Some(scale) => (amount / scale, amount % scale),
        None => (0, amount),
    };

    let mut out = group_thousands(&whole.to_string());

    if decimals > 0 {
        let digits = format!("{:0width$}", fraction, width = usize::from(decimals));
        let shown = digits[..digits.len().min(DISPLAY_FRACTION_DIGITS)].trim_end_matches('0');
        if !shown.is_empty() {
            out.push('.');
            out.push_str(shown);
        }
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
